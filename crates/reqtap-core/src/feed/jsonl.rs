//! JSON-lines host event feed.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::capture::CaptureHandle;
use crate::event::HostEvent;

/// Parses one feed line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<HostEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Counters for one pumped feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub delivered: usize,
    pub skipped: usize,
}

/// Reads events line by line and delivers them to the capture service until
/// EOF. Lines that are not UTF-8 or not a known event are logged and skipped;
/// stops early if the service goes away.
pub async fn pump_lines<R>(mut reader: R, handle: &CaptureHandle) -> anyhow::Result<FeedStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = FeedStats::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        line_no += 1;
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(line = line_no, "skipping non-UTF-8 feed line: {}", e);
                stats.skipped += 1;
                continue;
            }
        };
        match parse_line(line) {
            Ok(Some(event)) => {
                if handle.observe(event).await.is_err() {
                    tracing::debug!("capture service gone; stopping feed");
                    break;
                }
                stats.delivered += 1;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(line = line_no, "skipping malformed feed line: {}", e);
                stats.skipped += 1;
            }
        }
    }
    tracing::info!(delivered = stats.delivered, skipped = stats.skipped, "feed finished");
    Ok(stats)
}
