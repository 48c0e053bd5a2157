//! Host event feeds: the inbound data source for the capture service.
//!
//! The feed is best-effort and push-only. Nothing downstream assumes it is
//! complete or ordered; malformed input is skipped, not fatal.

mod har;
mod jsonl;

pub use har::{har_events_from_slice, load_har_events};
pub use jsonl::{parse_line, pump_lines, FeedStats};
