//! # doc2x
//!
//! Client library for the Doc2X document parsing API (v2).
//!
//! Doc2X turns PDFs and images into structured Markdown, LaTeX or Word
//! documents. All heavy work happens server-side and asynchronously: a
//! submit call returns a `uid`, and a status endpoint is polled until the
//! task settles. This crate wraps that workflow in typed calls that honour
//! cancellation and deadlines.
//!
//! ## Workflow
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Upload    pre_upload + presigned PUT (or upload_pdf)
//!  ├─ 2. Parse     wait_for_parsing  → pages with Markdown
//!  ├─ 3. Convert   convert_parse + wait_for_conversion → download URL
//!  └─ 4. Download  download_to_path (atomic)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2x::{Client, Context};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::with_api_key(std::env::var("DOC2X_APIKEY")?)?;
//!     let ctx = Context::background().with_timeout(Duration::from_secs(600));
//!
//!     let pdf = tokio::fs::read("paper.pdf").await?;
//!     let slot = client.pre_upload(&ctx).await?;
//!     let slot = slot.data.ok_or("preupload returned no data")?;
//!     client.upload_to_presigned_url(&ctx, &slot.url, pdf).await?;
//!
//!     let status = client.wait_for_parsing(&ctx, &slot.uid, Duration::ZERO).await?;
//!     if let Some(result) = status.data.and_then(|d| d.result) {
//!         for page in result.pages {
//!             println!("{}", page.md);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Waiting
//!
//! Every `wait_for_*` method runs [`poll::wait_with_polling`]: a first status
//! fetch right away, then one per interval (2 s when zero is passed). Up to
//! three consecutive transient network failures are retried. When the
//! [`Context`] has no deadline the wait is capped at five minutes; a caller
//! deadline is always respected as-is.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2x` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! doc2x = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod failure_log;
pub mod poll;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::download::{decode_convert_zip, default_download_name};
pub use client::Client;
pub use config::{resolve_api_key, ClientConfig, ClientConfigBuilder};
pub use context::{Context, Interrupt};
pub use error::Doc2xError;
pub use failure_log::FailureLog;
pub use poll::{is_transient, wait_with_polling, Evaluation, PollOptions};
pub use types::{ConvertFormat, ConvertRequest, FormulaMode, Operation, TaskStatus};
