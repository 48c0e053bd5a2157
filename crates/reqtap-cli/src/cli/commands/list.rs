//! `reqtap list` – show captured calls passing the filter.

use anyhow::Result;
use reqtap_core::config::ReqtapConfig;
use std::path::Path;

use super::{build_filter, open_inspector};
use crate::cli::FilterArgs;

pub async fn run_list(cfg: &ReqtapConfig, filter: &FilterArgs, socket: &Path) -> Result<()> {
    let mut inspector = open_inspector(cfg, socket)?;
    inspector.filter = build_filter(filter, cfg)?;
    let total = inspector.load().await?;
    let visible = inspector.visible().len();
    let tracking = if inspector.track_headers()? { "on" } else { "off" };
    println!("Header tracking: {tracking}");
    if visible == 0 {
        println!("No captured calls match ({total} captured).");
    } else {
        print!("{}", inspector.render());
        println!("{visible} of {total} captured call(s) shown.");
    }
    Ok(())
}
