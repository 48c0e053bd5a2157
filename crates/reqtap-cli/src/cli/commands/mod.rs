//! CLI command handlers. Each command is in its own file.

mod clear;
mod export;
mod list;
mod serve;
mod track_headers;

pub use clear::run_clear;
pub use export::run_export;
pub use list::run_list;
pub use serve::run_serve;
pub use track_headers::run_track_headers;

use anyhow::Result;
use reqtap_core::config::ReqtapConfig;
use reqtap_core::filter::{CallFilter, MethodSet};
use reqtap_core::inspect::Inspector;
use reqtap_core::settings::JsonFileStore;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::control_socket::SocketClient;
use super::FilterArgs;

/// Inspection session against the service behind `socket`. Ctrl-C cancels any
/// pending request.
fn open_inspector(cfg: &ReqtapConfig, socket: &Path) -> Result<Inspector<SocketClient>> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });
    let client = SocketClient::new(socket, cfg.request_timeout(), cancel);
    let settings = Arc::new(JsonFileStore::open_default()?);
    Ok(Inspector::new(client, settings))
}

/// Filter from command-line arguments; method toggles fall back to config.
pub(crate) fn build_filter(args: &FilterArgs, cfg: &ReqtapConfig) -> Result<CallFilter> {
    let methods = if args.methods.is_empty() {
        cfg.default_methods()?
    } else {
        MethodSet::from_names(args.methods.as_slice())
            .map_err(|m| anyhow::anyhow!("unknown method {m:?} (expected get, post, put, delete or options)"))?
    };
    Ok(CallFilter::new(args.domain.clone(), methods))
}
