//! Wire schemas for the Doc2X v2 REST API.
//!
//! Every endpoint answers with the same `{ code, msg, data }` envelope,
//! so a single generic [`ApiResponse`] carries all of them; the per-endpoint
//! aliases below only fix the `data` payload type. The server trace id is
//! returned in an HTTP header rather than the body, so it is skipped by serde
//! and filled in by the client after decoding.

use crate::error::Doc2xError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Service constants ────────────────────────────────────────────────────

pub const SERVICE_NAME: &str = "doc2x";
pub const API_VERSION: &str = "v2";

/// Response header carrying the server-side correlation id.
pub const TRACE_ID_HEADER: &str = "trace-id";

/// `code` value of a successful envelope.
pub const CODE_SUCCESS: &str = "success";

pub const ENDPOINT_PARSE_PDF: &str = "/api/v2/parse/pdf";
pub const ENDPOINT_PRE_UPLOAD: &str = "/api/v2/parse/preupload";
pub const ENDPOINT_PARSE_STATUS: &str = "/api/v2/parse/status";
pub const ENDPOINT_CONVERT_PARSE: &str = "/api/v2/convert/parse";
pub const ENDPOINT_CONVERT_RESULT: &str = "/api/v2/convert/parse/result";
pub const ENDPOINT_PARSE_IMAGE_LAYOUT: &str = "/api/v2/parse/img/layout";
pub const ENDPOINT_ASYNC_PARSE_IMAGE_LAYOUT: &str = "/api/v2/async/parse/img/layout";
pub const ENDPOINT_IMAGE_LAYOUT_STATUS: &str = "/api/v2/parse/img/layout/status";

// ── Operation labels ─────────────────────────────────────────────────────

/// Named remote operations, used to label errors and log lines.
///
/// The first three are the long-running tasks the poller waits on; the rest
/// are the individual requests issued by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Parsing,
    Conversion,
    ImageLayout,
    UploadPdf,
    PreUpload,
    UploadPresigned,
    GetStatus,
    ConvertParse,
    GetConvertResult,
    ParseImageLayout,
    AsyncParseImageLayout,
    GetImageLayoutStatus,
    Download,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Parsing => "parsing",
            Operation::Conversion => "conversion",
            Operation::ImageLayout => "image layout",
            Operation::UploadPdf => "upload PDF",
            Operation::PreUpload => "preupload",
            Operation::UploadPresigned => "upload to presigned URL",
            Operation::GetStatus => "get status",
            Operation::ConvertParse => "convert parse",
            Operation::GetConvertResult => "get convert result",
            Operation::ParseImageLayout => "parse image layout",
            Operation::AsyncParseImageLayout => "async parse image layout",
            Operation::GetImageLayoutStatus => "get image layout status",
            Operation::Download => "download file",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// State of a remote task (parse, conversion or image layout).
///
/// Statuses the client does not know about decode as [`TaskStatus::Unknown`]
/// and are treated as still pending by the evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Processing,
    Success,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Processing => "processing",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
            TaskStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Conversion target format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConvertFormat {
    #[default]
    #[serde(rename = "md")]
    Markdown,
    #[serde(rename = "tex")]
    Tex,
    #[serde(rename = "docx")]
    Docx,
    #[serde(rename = "md_dollar")]
    MarkdownDollar,
}

impl ConvertFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ConvertFormat::Markdown => "md",
            ConvertFormat::Tex => "tex",
            ConvertFormat::Docx => "docx",
            ConvertFormat::MarkdownDollar => "md_dollar",
        }
    }
}

impl fmt::Display for ConvertFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConvertFormat {
    type Err = Doc2xError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "md" => Ok(ConvertFormat::Markdown),
            "tex" => Ok(ConvertFormat::Tex),
            "docx" => Ok(ConvertFormat::Docx),
            "md_dollar" => Ok(ConvertFormat::MarkdownDollar),
            _ => Err(Doc2xError::Unsupported {
                what: "target format",
                value: s.to_string(),
            }),
        }
    }
}

/// How formulas are rendered in the converted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaMode {
    #[default]
    Normal,
    Dollar,
    Latex,
}

impl FormulaMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FormulaMode::Normal => "normal",
            FormulaMode::Dollar => "dollar",
            FormulaMode::Latex => "latex",
        }
    }
}

impl fmt::Display for FormulaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormulaMode {
    type Err = Doc2xError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(FormulaMode::Normal),
            "dollar" => Ok(FormulaMode::Dollar),
            "latex" => Ok(FormulaMode::Latex),
            _ => Err(Doc2xError::Unsupported {
                what: "formula mode",
                value: s.to_string(),
            }),
        }
    }
}

// ── Envelope ─────────────────────────────────────────────────────────────

/// The `{ code, msg, data }` envelope shared by every endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiResponse<D> {
    /// Value of the `trace-id` response header; `""` when the server sent none.
    #[serde(skip)]
    pub trace_id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub msg: String,
    pub data: Option<D>,
}

impl<D> ApiResponse<D> {
    /// True when the envelope reports success (an absent code counts).
    pub fn is_success(&self) -> bool {
        self.code.is_empty() || self.code == CODE_SUCCESS
    }
}

pub type UploadResponse = ApiResponse<UploadData>;
pub type PreUploadResponse = ApiResponse<PreUploadData>;
pub type StatusResponse = ApiResponse<StatusData>;
pub type ConvertResponse = ApiResponse<ConvertData>;
pub type ConvertResultResponse = ApiResponse<ConvertData>;
pub type ImageLayoutSyncResponse = ApiResponse<ImageLayoutSyncData>;
pub type ImageLayoutAsyncResponse = ApiResponse<ImageLayoutAsyncData>;
pub type ImageLayoutStatusResponse = ApiResponse<ImageLayoutStatusData>;

// ── Parse ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadData {
    /// Document id used by every follow-up call.
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreUploadData {
    #[serde(default)]
    pub uid: String,
    /// Presigned OSS URL the file is PUT to.
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusData {
    /// 0–100.
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub detail: String,
    /// Only present once parsing succeeded.
    pub result: Option<ParseResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseResult {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub pages: Vec<ParsedPage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedPage {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub page_idx: u32,
    #[serde(default)]
    pub page_width: u32,
    #[serde(default)]
    pub page_height: u32,
    #[serde(default)]
    pub md: String,
}

// ── Convert ──────────────────────────────────────────────────────────────

/// Body of `POST /api/v2/convert/parse`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub uid: String,
    pub to: ConvertFormat,
    /// `None` is sent as `latex`.
    pub formula_mode: Option<FormulaMode>,
    /// Output file name without extension (md/tex only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub merge_cross_page_forms: bool,
}

impl ConvertRequest {
    pub fn new(uid: impl Into<String>, to: ConvertFormat) -> Self {
        Self {
            uid: uid.into(),
            to,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertData {
    #[serde(default)]
    pub status: TaskStatus,
    /// Download URL, set once the conversion succeeded.
    #[serde(default)]
    pub url: String,
}

// ── Image layout ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageLayoutPage {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default)]
    pub page_idx: u32,
    #[serde(default)]
    pub page_width: u32,
    #[serde(default)]
    pub page_height: u32,
    #[serde(default)]
    pub md: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageLayoutResult {
    #[serde(default)]
    pub pages: Vec<ImageLayoutPage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageLayoutSyncData {
    /// Base64 zip with the rendered assets, see [`crate::Client::fetch_convert_zip`].
    #[serde(default)]
    pub convert_zip: String,
    pub result: Option<ImageLayoutResult>,
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageLayoutAsyncData {
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageLayoutStatusData {
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub progress: u32,
    pub result: Option<ImageLayoutResult>,
    #[serde(default)]
    pub convert_zip: String,
}
