//! PDF upload and parse-status endpoints.

use super::{check_status, Client};
use crate::context::Context;
use crate::error::{normalize_trace_id, Doc2xError};
use crate::poll::{wait_with_polling, Evaluation};
use crate::types::{
    Operation, PreUploadResponse, StatusResponse, TaskStatus, UploadResponse, ENDPOINT_PARSE_PDF,
    ENDPOINT_PARSE_STATUS, ENDPOINT_PRE_UPLOAD,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::Body;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

impl Client {
    /// Upload a PDF held in memory for parsing.
    ///
    /// Returns the envelope whose `data.uid` identifies the document.
    pub async fn upload_pdf(
        &self,
        ctx: &Context,
        pdf: Vec<u8>,
    ) -> Result<UploadResponse, Doc2xError> {
        if pdf.is_empty() {
            return Err(Doc2xError::EmptyPdfData);
        }
        self.upload_pdf_body(ctx, Body::from(pdf)).await
    }

    /// Stream a PDF from `reader` without buffering it whole.
    pub async fn upload_pdf_reader<R>(
        &self,
        ctx: &Context,
        reader: R,
    ) -> Result<UploadResponse, Doc2xError>
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        self.upload_pdf_body(ctx, Body::wrap_stream(ReaderStream::new(reader)))
            .await
    }

    async fn upload_pdf_body(
        &self,
        ctx: &Context,
        body: Body,
    ) -> Result<UploadResponse, Doc2xError> {
        let request = self
            .api
            .post(self.url(ENDPOINT_PARSE_PDF))
            .header(CONTENT_TYPE, "application/pdf")
            .body(body);
        let resp: UploadResponse = self.send_api(ctx, Operation::UploadPdf, request).await?;
        if let Some(data) = &resp.data {
            info!(uid = %data.uid, "pdf uploaded");
        }
        Ok(resp)
    }

    /// Ask for a presigned upload slot; the response carries `uid` and `url`.
    pub async fn pre_upload(&self, ctx: &Context) -> Result<PreUploadResponse, Doc2xError> {
        let request = self.api.post(self.url(ENDPOINT_PRE_UPLOAD));
        self.send_api(ctx, Operation::PreUpload, request).await
    }

    /// PUT file bytes to a presigned URL returned by [`Client::pre_upload`].
    ///
    /// Uses the transfer client, so the API key is not sent to the storage host.
    pub async fn upload_to_presigned_url(
        &self,
        ctx: &Context,
        url: &str,
        data: Vec<u8>,
    ) -> Result<(), Doc2xError> {
        if url.is_empty() {
            return Err(Doc2xError::EmptyPresignedUrl);
        }
        if data.is_empty() {
            return Err(Doc2xError::EmptyFileData);
        }
        self.put_presigned(ctx, url, Body::from(data)).await
    }

    /// Streaming variant of [`Client::upload_to_presigned_url`].
    pub async fn upload_to_presigned_url_from<R>(
        &self,
        ctx: &Context,
        url: &str,
        reader: R,
    ) -> Result<(), Doc2xError>
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        if url.is_empty() {
            return Err(Doc2xError::EmptyPresignedUrl);
        }
        self.put_presigned(ctx, url, Body::wrap_stream(ReaderStream::new(reader)))
            .await
    }

    async fn put_presigned(&self, ctx: &Context, url: &str, body: Body) -> Result<(), Doc2xError> {
        let operation = Operation::UploadPresigned;
        let request = self.transfer.put(url).body(body);
        ctx.run(operation, async {
            let response = request
                .send()
                .await
                .map_err(|source| Doc2xError::Http { operation, source })?;
            check_status(operation, response)?;
            debug!("presigned upload finished");
            Ok(())
        })
        .await
    }

    /// Fetch the parse status of `uid` once.
    pub async fn get_status(&self, ctx: &Context, uid: &str) -> Result<StatusResponse, Doc2xError> {
        if uid.is_empty() {
            return Err(Doc2xError::EmptyUid);
        }
        let request = self
            .api
            .get(self.url(ENDPOINT_PARSE_STATUS))
            .query(&[("uid", uid)]);
        self.send_api(ctx, Operation::GetStatus, request).await
    }

    /// Poll the parse status of `uid` until it settles.
    ///
    /// A zero `interval` selects the default of 2 s. When `ctx` has no
    /// deadline the wait is bounded by the configured processing timeout.
    pub async fn wait_for_parsing(
        &self,
        ctx: &Context,
        uid: &str,
        interval: Duration,
    ) -> Result<StatusResponse, Doc2xError> {
        if uid.is_empty() {
            return Err(Doc2xError::EmptyUid);
        }
        wait_with_polling(
            ctx,
            uid,
            self.poll_options(Operation::Parsing, interval),
            move |ctx, uid| async move { self.get_status(&ctx, &uid).await },
            evaluate_parse_status,
        )
        .await
    }
}

/// Settle on `success`, fail on `failed`, keep polling otherwise.
///
/// An envelope without `data` is treated as still processing.
pub(crate) fn evaluate_parse_status(resp: &StatusResponse) -> Result<Evaluation, Doc2xError> {
    let Some(data) = &resp.data else {
        return Ok(Evaluation::Pending);
    };
    match data.status {
        TaskStatus::Success => Ok(Evaluation::Done),
        TaskStatus::Failed => Err(Doc2xError::TaskFailed {
            operation: Operation::Parsing,
            detail: detail_or_unknown(&data.detail),
            trace_id: normalize_trace_id(&resp.trace_id),
        }),
        TaskStatus::Processing | TaskStatus::Unknown => {
            debug!(progress = data.progress, "parse still running");
            Ok(Evaluation::Pending)
        }
    }
}

pub(crate) fn detail_or_unknown(detail: &str) -> String {
    if detail.is_empty() {
        "unknown error".to_string()
    } else {
        detail.to_string()
    }
}
