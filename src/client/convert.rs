//! Conversion of a parsed document into md / tex / docx.

use super::Client;
use crate::context::Context;
use crate::error::{normalize_trace_id, Doc2xError};
use crate::poll::{wait_with_polling, Evaluation};
use crate::types::{
    ConvertRequest, ConvertResponse, ConvertResultResponse, FormulaMode, Operation, TaskStatus,
    ENDPOINT_CONVERT_PARSE, ENDPOINT_CONVERT_RESULT,
};
use std::time::Duration;
use tracing::info;

impl Client {
    /// Start converting a parsed document.
    ///
    /// A request without `formula_mode` is sent with [`FormulaMode::Latex`].
    pub async fn convert_parse(
        &self,
        ctx: &Context,
        mut req: ConvertRequest,
    ) -> Result<ConvertResponse, Doc2xError> {
        if req.uid.is_empty() {
            return Err(Doc2xError::EmptyUid);
        }
        req.formula_mode.get_or_insert(FormulaMode::Latex);

        let request = self.api.post(self.url(ENDPOINT_CONVERT_PARSE)).json(&req);
        let resp = self
            .send_api(ctx, Operation::ConvertParse, request)
            .await?;
        info!(uid = %req.uid, to = %req.to, "conversion submitted");
        Ok(resp)
    }

    /// Fetch the conversion result of `uid` once.
    pub async fn get_convert_result(
        &self,
        ctx: &Context,
        uid: &str,
    ) -> Result<ConvertResultResponse, Doc2xError> {
        if uid.is_empty() {
            return Err(Doc2xError::EmptyUid);
        }
        let request = self
            .api
            .get(self.url(ENDPOINT_CONVERT_RESULT))
            .query(&[("uid", uid)]);
        self.send_api(ctx, Operation::GetConvertResult, request)
            .await
    }

    /// Poll the conversion of `uid` until a download URL is available.
    pub async fn wait_for_conversion(
        &self,
        ctx: &Context,
        uid: &str,
        interval: Duration,
    ) -> Result<ConvertResultResponse, Doc2xError> {
        if uid.is_empty() {
            return Err(Doc2xError::EmptyUid);
        }
        wait_with_polling(
            ctx,
            uid,
            self.poll_options(Operation::Conversion, interval),
            move |ctx, uid| async move { self.get_convert_result(&ctx, &uid).await },
            move |resp| evaluate_conversion(resp, uid),
        )
        .await
    }
}

/// A successful conversion must carry a URL; a failed one has no detail
/// field, so the uid is reported instead.
pub(crate) fn evaluate_conversion(
    resp: &ConvertResultResponse,
    uid: &str,
) -> Result<Evaluation, Doc2xError> {
    let Some(data) = &resp.data else {
        return Ok(Evaluation::Pending);
    };
    match data.status {
        TaskStatus::Success if data.url.is_empty() => Err(Doc2xError::MissingData {
            operation: Operation::Conversion,
            what: "no download URL provided",
            trace_id: normalize_trace_id(&resp.trace_id),
        }),
        TaskStatus::Success => Ok(Evaluation::Done),
        TaskStatus::Failed => Err(Doc2xError::TaskFailed {
            operation: Operation::Conversion,
            detail: format!("uid {uid}"),
            trace_id: normalize_trace_id(&resp.trace_id),
        }),
        TaskStatus::Processing | TaskStatus::Unknown => Ok(Evaluation::Pending),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConvertData;

    fn result(status: TaskStatus, url: &str) -> ConvertResultResponse {
        ConvertResultResponse {
            data: Some(ConvertData {
                status,
                url: url.into(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn success_needs_url() {
        assert_eq!(
            evaluate_conversion(&result(TaskStatus::Success, "https://oss/x.zip"), "u").unwrap(),
            Evaluation::Done
        );
        let err = evaluate_conversion(&result(TaskStatus::Success, ""), "u").unwrap_err();
        assert_eq!(
            err.to_string(),
            "conversion succeeded but no download URL provided (trace-id: unknown)"
        );
    }

    #[test]
    fn failure_names_uid() {
        let err = evaluate_conversion(&result(TaskStatus::Failed, ""), "doc-9").unwrap_err();
        assert!(err.to_string().contains("doc-9"), "got: {err}");
    }

    #[test]
    fn processing_keeps_polling() {
        assert_eq!(
            evaluate_conversion(&result(TaskStatus::Processing, ""), "u").unwrap(),
            Evaluation::Pending
        );
        assert_eq!(
            evaluate_conversion(&ConvertResultResponse::default(), "u").unwrap(),
            Evaluation::Pending
        );
    }

    #[tokio::test]
    async fn empty_uid_is_rejected() {
        let client = Client::with_api_key("k").unwrap();
        let ctx = Context::background();
        let req = ConvertRequest::new("", crate::types::ConvertFormat::Docx);
        assert!(matches!(
            client.convert_parse(&ctx, req).await,
            Err(Doc2xError::EmptyUid)
        ));
        assert!(matches!(
            client.wait_for_conversion(&ctx, "", Duration::ZERO).await,
            Err(Doc2xError::EmptyUid)
        ));
    }
}
