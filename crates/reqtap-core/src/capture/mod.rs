//! Capture listener: records every observed request and correlates headers.
//!
//! The [`CallStore`] holds calls in arrival order and attaches late-arriving
//! header sets. The [`CaptureService`] wraps it in a single task so host events
//! and inspection requests are handled one at a time, to completion.

mod service;
mod store;

pub use service::{CaptureHandle, CaptureService, LocalClient};
pub use store::{CallStore, HeaderOutcome, DEFAULT_CORRELATION_WINDOW_MS};
