//! `reqtap export` – write filtered calls as a Postman collection.

use anyhow::Result;
use reqtap_core::config::ReqtapConfig;
use std::path::Path;

use super::{build_filter, open_inspector};
use crate::cli::FilterArgs;

pub async fn run_export(
    cfg: &ReqtapConfig,
    filter: &FilterArgs,
    exclude_cookies: bool,
    out_dir: &Path,
    socket: &Path,
) -> Result<()> {
    let mut inspector = open_inspector(cfg, socket)?;
    inspector.filter = build_filter(filter, cfg)?;
    inspector.exclude_cookies = exclude_cookies;
    inspector.load().await?;
    let count = inspector.visible().len();
    let path = inspector.export(out_dir, &cfg.export_filename)?;
    println!("Exported {count} call(s) to {}", path.display());
    Ok(())
}
