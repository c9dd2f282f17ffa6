//! Image layout parsing, synchronous and asynchronous.

use super::parse::detail_or_unknown;
use super::Client;
use crate::context::Context;
use crate::error::{normalize_trace_id, Doc2xError};
use crate::poll::{wait_with_polling, Evaluation};
use crate::types::{
    ImageLayoutAsyncResponse, ImageLayoutStatusResponse, ImageLayoutSyncResponse, Operation,
    TaskStatus, ENDPOINT_ASYNC_PARSE_IMAGE_LAYOUT, ENDPOINT_IMAGE_LAYOUT_STATUS,
    ENDPOINT_PARSE_IMAGE_LAYOUT,
};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

impl Client {
    /// Parse a single image and return the layout in the same call.
    pub async fn parse_image_layout(
        &self,
        ctx: &Context,
        image: Vec<u8>,
    ) -> Result<ImageLayoutSyncResponse, Doc2xError> {
        let operation = Operation::ParseImageLayout;
        if image.is_empty() {
            return Err(Doc2xError::EmptyImageData);
        }
        let request = self
            .api
            .post(self.url(ENDPOINT_PARSE_IMAGE_LAYOUT))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image);
        let resp: ImageLayoutSyncResponse = self.send_api(ctx, operation, request).await?;
        if resp.data.is_none() {
            return Err(Doc2xError::MissingData {
                operation,
                what: "response data is empty",
                trace_id: normalize_trace_id(&resp.trace_id),
            });
        }
        Ok(resp)
    }

    /// Submit an image for background parsing; poll with
    /// [`Client::wait_for_image_layout`].
    pub async fn async_parse_image_layout(
        &self,
        ctx: &Context,
        image: Vec<u8>,
    ) -> Result<ImageLayoutAsyncResponse, Doc2xError> {
        let operation = Operation::AsyncParseImageLayout;
        if image.is_empty() {
            return Err(Doc2xError::EmptyImageData);
        }
        let request = self
            .api
            .post(self.url(ENDPOINT_ASYNC_PARSE_IMAGE_LAYOUT))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image);
        let resp: ImageLayoutAsyncResponse = self.send_api(ctx, operation, request).await?;
        match &resp.data {
            Some(data) if !data.uid.is_empty() => Ok(resp),
            _ => Err(Doc2xError::MissingData {
                operation,
                what: "no UID returned",
                trace_id: normalize_trace_id(&resp.trace_id),
            }),
        }
    }

    pub async fn get_image_layout_status(
        &self,
        ctx: &Context,
        uid: &str,
    ) -> Result<ImageLayoutStatusResponse, Doc2xError> {
        if uid.is_empty() {
            return Err(Doc2xError::EmptyUid);
        }
        let request = self
            .api
            .get(self.url(ENDPOINT_IMAGE_LAYOUT_STATUS))
            .query(&[("uid", uid)]);
        self.send_api(ctx, Operation::GetImageLayoutStatus, request)
            .await
    }

    pub async fn wait_for_image_layout(
        &self,
        ctx: &Context,
        uid: &str,
        interval: Duration,
    ) -> Result<ImageLayoutStatusResponse, Doc2xError> {
        if uid.is_empty() {
            return Err(Doc2xError::EmptyUid);
        }
        wait_with_polling(
            ctx,
            uid,
            self.poll_options(Operation::ImageLayout, interval),
            move |ctx, uid| async move { self.get_image_layout_status(&ctx, &uid).await },
            evaluate_image_layout,
        )
        .await
    }
}

pub(crate) fn evaluate_image_layout(
    resp: &ImageLayoutStatusResponse,
) -> Result<Evaluation, Doc2xError> {
    let Some(data) = &resp.data else {
        return Ok(Evaluation::Pending);
    };
    match data.status {
        TaskStatus::Success => Ok(Evaluation::Done),
        TaskStatus::Failed => Err(Doc2xError::TaskFailed {
            operation: Operation::ImageLayout,
            detail: detail_or_unknown(&data.detail),
            trace_id: normalize_trace_id(&resp.trace_id),
        }),
        TaskStatus::Processing | TaskStatus::Unknown => Ok(Evaluation::Pending),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageLayoutStatusData;

    #[test]
    fn evaluation_follows_status() {
        let mut resp = ImageLayoutStatusResponse {
            data: Some(ImageLayoutStatusData::default()),
            ..Default::default()
        };
        assert_eq!(evaluate_image_layout(&resp).unwrap(), Evaluation::Pending);

        if let Some(d) = resp.data.as_mut() {
            d.status = TaskStatus::Success;
        }
        assert_eq!(evaluate_image_layout(&resp).unwrap(), Evaluation::Done);

        if let Some(d) = resp.data.as_mut() {
            d.status = TaskStatus::Failed;
            d.detail = "blurry".into();
        }
        let err = evaluate_image_layout(&resp).unwrap_err();
        assert_eq!(err.to_string(), "image layout failed: blurry (trace-id: unknown)");
    }

    #[tokio::test]
    async fn empty_image_is_rejected() {
        let client = Client::with_api_key("k").unwrap();
        let ctx = Context::background();
        assert!(matches!(
            client.parse_image_layout(&ctx, Vec::new()).await,
            Err(Doc2xError::EmptyImageData)
        ));
        assert!(matches!(
            client.async_parse_image_layout(&ctx, Vec::new()).await,
            Err(Doc2xError::EmptyImageData)
        ));
        assert!(matches!(
            client.get_image_layout_status(&ctx, "").await,
            Err(Doc2xError::EmptyUid)
        ));
    }
}
