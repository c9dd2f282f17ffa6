//! Error type for the doc2x library.
//!
//! A single [`Doc2xError`] covers every failure the client can surface. The
//! variants are grouped by where the failure originates so callers can match
//! on the class they care about:
//!
//! * **Validation**: the caller passed an empty uid, empty payload, etc.
//!   Nothing was sent over the wire.
//! * **Transport**: the HTTP exchange failed, returned a non-2xx status, or
//!   the envelope carried a non-success `code`.
//! * **Remote task**: the request succeeded but the long-running task itself
//!   reports failure (a failed parse or conversion).
//! * **Interruption**: the ambient [`crate::Context`] was cancelled or its
//!   deadline passed.
//!
//! Only some transport failures are worth retrying; that decision lives in
//! [`crate::poll::is_transient`], not here.

use crate::context::Interrupt;
use crate::types::Operation;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the doc2x library.
#[derive(Debug, Error)]
pub enum Doc2xError {
    // ── Validation errors ─────────────────────────────────────────────────
    #[error("pdf data cannot be empty")]
    EmptyPdfData,

    #[error("image data cannot be empty")]
    EmptyImageData,

    #[error("uid cannot be empty")]
    EmptyUid,

    #[error("file data cannot be empty")]
    EmptyFileData,

    #[error("presigned url cannot be empty")]
    EmptyPresignedUrl,

    #[error("download url cannot be empty")]
    EmptyDownloadUrl,

    #[error("convert_zip cannot be empty")]
    EmptyConvertZip,

    /// A string could not be mapped onto one of the API's enumerations.
    #[error("unsupported {what}: {value}")]
    Unsupported { what: &'static str, value: String },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The HTTP request could not be completed (connect, timeout, body read).
    #[error("{operation} failed: {source}")]
    Http {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("{operation} failed with status {status}: {reason} (trace-id: {trace_id})")]
    Status {
        operation: Operation,
        status: u16,
        reason: String,
        trace_id: String,
    },

    /// The envelope decoded but `code` was not `success`.
    #[error(
        "{} failed with code {}{} (trace-id: {})",
        .operation, .code, msg_suffix(.msg), .trace_id
    )]
    Api {
        operation: Operation,
        code: String,
        msg: String,
        trace_id: String,
    },

    /// The response body was not the JSON we expected.
    #[error("{operation}: malformed response: {source}")]
    MalformedResponse {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },

    // ── Remote task errors ────────────────────────────────────────────────
    /// The remote task reached its `failed` state.
    #[error("{operation} failed: {detail} (trace-id: {trace_id})")]
    TaskFailed {
        operation: Operation,
        detail: String,
        trace_id: String,
    },

    /// The response was successful but a field the caller relies on is absent.
    #[error("{operation} succeeded but {what} (trace-id: {trace_id})")]
    MissingData {
        operation: Operation,
        what: &'static str,
        trace_id: String,
    },

    // ── Interruption ──────────────────────────────────────────────────────
    /// An in-flight request was abandoned because the context ended.
    #[error("{operation} interrupted: {cause}")]
    Cancelled {
        operation: Operation,
        #[source]
        cause: Interrupt,
    },

    /// The poller stopped waiting because the context ended.
    #[error("waiting for {operation} cancelled: {cause}")]
    WaitAborted {
        operation: Operation,
        #[source]
        cause: Interrupt,
    },

    // ── Payload errors ────────────────────────────────────────────────────
    #[error("decode {what} failed: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("{what} is empty")]
    EmptyPayload { what: &'static str },

    // ── I/O errors ────────────────────────────────────────────────────────
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("api key is required (flag --api-key or DOC2X_APIKEY / DOC2X_API_KEY)")]
    MissingApiKey,
}

fn msg_suffix(msg: &str) -> String {
    if msg.is_empty() {
        String::new()
    } else {
        format!(": {msg}")
    }
}

/// Map an empty trace id to `"unknown"`, matching what the server logs use.
pub(crate) fn normalize_trace_id(trace_id: &str) -> String {
    if trace_id.is_empty() {
        "unknown".to_string()
    } else {
        trace_id.to_string()
    }
}

impl Doc2xError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Doc2xError::Io {
            context: context.into(),
            source,
        }
    }

    /// Server trace id attached to this error, if any.
    pub fn trace_id(&self) -> Option<&str> {
        match self {
            Doc2xError::Status { trace_id, .. }
            | Doc2xError::Api { trace_id, .. }
            | Doc2xError::TaskFailed { trace_id, .. }
            | Doc2xError::MissingData { trace_id, .. } => Some(trace_id),
            _ => None,
        }
    }

    /// The interruption cause, when this error came from a cancelled or
    /// expired context.
    pub fn interrupt(&self) -> Option<Interrupt> {
        match self {
            Doc2xError::Cancelled { cause, .. } | Doc2xError::WaitAborted { cause, .. } => {
                Some(*cause)
            }
            _ => None,
        }
    }
}
