//! `reqtap serve` – run the capture service until Ctrl-C.

use anyhow::{Context, Result};
use reqtap_core::capture::{CaptureHandle, CaptureService};
use reqtap_core::config::ReqtapConfig;
use reqtap_core::feed;
use reqtap_core::settings::{JsonFileStore, SettingsStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use crate::cli::control_socket;

pub async fn run_serve(
    cfg: &ReqtapConfig,
    feed_path: Option<&Path>,
    har: Option<&Path>,
    socket: &Path,
) -> Result<()> {
    let settings: Arc<dyn SettingsStore> = Arc::new(JsonFileStore::open_default()?);
    let shutdown = CancellationToken::new();
    let (handle, service) =
        CaptureService::new(cfg.correlation_window_ms, settings).spawn(shutdown.clone());

    let listener = control_socket::spawn_control_listener(
        handle.clone(),
        socket,
        cfg.request_timeout(),
        shutdown.clone(),
    )?;
    println!("Capture service listening on {}", socket.display());

    if let Some(har) = har {
        let events = feed::load_har_events(har)?;
        let count = events.len() / 2;
        for event in events {
            handle.observe(event).await?;
        }
        println!("Replayed {count} request(s) from {}", har.display());
    }

    let source = match (feed_path, har) {
        (Some(p), _) if p == Path::new("-") => Some(FeedSource::Stdin),
        (Some(p), _) => Some(FeedSource::File(p.to_path_buf())),
        (None, Some(_)) => None,
        (None, None) => Some(FeedSource::Stdin),
    };
    let feed_task = source.map(|src| tokio::spawn(pump(src, handle.clone())));

    tokio::signal::ctrl_c().await.context("wait for Ctrl-C")?;
    tracing::info!("shutting down capture service");
    shutdown.cancel();
    if let Some(task) = feed_task {
        task.abort();
    }
    drop(handle);
    let _ = listener.await;
    let _ = service.await;
    Ok(())
}

enum FeedSource {
    Stdin,
    File(PathBuf),
}

async fn pump(source: FeedSource, handle: CaptureHandle) {
    let result = match source {
        FeedSource::Stdin => feed::pump_lines(BufReader::new(tokio::io::stdin()), &handle).await,
        FeedSource::File(path) => match tokio::fs::File::open(&path).await {
            Ok(file) => feed::pump_lines(BufReader::new(file), &handle).await,
            Err(e) => Err(anyhow::Error::new(e).context(format!("open feed: {}", path.display()))),
        },
    };
    if let Err(e) = result {
        tracing::warn!("feed stopped: {:#}", e);
    }
}
