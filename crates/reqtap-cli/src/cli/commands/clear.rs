//! `reqtap clear` – drop all captured calls in the running service.

use anyhow::Result;
use reqtap_core::config::ReqtapConfig;
use std::path::Path;

use super::open_inspector;

pub async fn run_clear(cfg: &ReqtapConfig, socket: &Path) -> Result<()> {
    let mut inspector = open_inspector(cfg, socket)?;
    inspector
        .clear()
        .await
        .map_err(|e| anyhow::anyhow!("Error clearing logs: {e}"))?;
    println!("Cleared captured calls.");
    Ok(())
}
