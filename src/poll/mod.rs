//! Long-running-operation polling.
//!
//! Doc2X parses and converts documents asynchronously: a submit call returns
//! a uid, and a status endpoint is queried until the task settles. This
//! module turns that workflow into a single awaited call with a bounded
//! total wait, a small budget of retries for transient network failures, and
//! cooperative cancellation through [`crate::Context`].
//!
//! ```text
//!   fetch ──err──▶ is_transient? ──yes, budget left──▶ tick ──▶ fetch
//!     │                  └──────no / exhausted──────▶ return Err
//!     └──ok──▶ evaluate ──Done──▶ return Ok(result)
//!                  ├─────Err───▶ return Err
//!                  └──Pending──▶ tick ──▶ fetch
//! ```
//!
//! The poller knows nothing about response schemas; callers supply the
//! fetch function and the evaluator.

mod classify;
mod wait;

pub use classify::is_transient;
pub use wait::{wait_with_polling, Evaluation, PollOptions};
