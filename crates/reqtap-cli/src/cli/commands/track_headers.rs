//! `reqtap track-headers on|off` – persist the flag and push it to the running service.

use anyhow::Result;
use reqtap_core::config::ReqtapConfig;
use std::path::Path;

use super::open_inspector;

pub async fn run_track_headers(cfg: &ReqtapConfig, enabled: bool, socket: &Path) -> Result<()> {
    let inspector = open_inspector(cfg, socket)?;
    let state = if enabled { "on" } else { "off" };
    match inspector.set_track_headers(enabled).await {
        Ok(()) => println!("Header tracking {state}."),
        // Persisted, but no service to push to; it picks the flag up on start.
        Err(reqtap_core::inspect::InspectError::Channel(e)) => {
            tracing::debug!("push header tracking flag: {}", e);
            println!("Header tracking {state} (saved; capture service not reachable: {e}).");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
