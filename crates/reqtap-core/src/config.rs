use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::DEFAULT_CORRELATION_WINDOW_MS;
use crate::export::DEFAULT_EXPORT_FILENAME;
use crate::filter::{MethodSet, TOGGLE_METHODS};

/// Default method toggles for `list`/`export` (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Methods checked when the command line names none.
    pub methods: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            methods: TOGGLE_METHODS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Global configuration loaded from `~/.config/reqtap/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReqtapConfig {
    /// Max distance in host-clock milliseconds between a call and the header
    /// event attached to it.
    pub correlation_window_ms: f64,
    /// Timeout for one request to the capture service.
    pub request_timeout_ms: u64,
    /// File name written by `export`.
    pub export_filename: String,
    /// Control socket path; defaults to the XDG state dir when absent.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
    /// Optional default filter; if missing, all methods are checked.
    #[serde(default)]
    pub filter: Option<FilterConfig>,
}

impl Default for ReqtapConfig {
    fn default() -> Self {
        Self {
            correlation_window_ms: DEFAULT_CORRELATION_WINDOW_MS,
            request_timeout_ms: 5000,
            export_filename: DEFAULT_EXPORT_FILENAME.to_string(),
            socket_path: None,
            filter: None,
        }
    }
}

impl ReqtapConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Default method toggles; unknown names in the config are an error.
    pub fn default_methods(&self) -> Result<MethodSet> {
        match &self.filter {
            None => Ok(MethodSet::all()),
            Some(f) => MethodSet::from_names(f.methods.as_slice())
                .map_err(|m| anyhow::anyhow!("config filter: unknown method {m:?}")),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("reqtap")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ReqtapConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ReqtapConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ReqtapConfig = toml::from_str(&data)?;
    Ok(cfg)
}
