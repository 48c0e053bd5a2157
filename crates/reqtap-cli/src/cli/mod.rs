//! CLI for reqtap.

mod commands;
mod control_socket;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use reqtap_core::config::{self, ReqtapConfig};
use std::path::PathBuf;

use commands::{run_clear, run_export, run_list, run_serve, run_track_headers};

/// Top-level CLI for reqtap.
#[derive(Debug, Parser)]
#[command(name = "reqtap")]
#[command(about = "reqtap: capture outgoing requests and export them as a Postman collection", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Domain substring and method toggles shared by `list` and `export`.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Keep calls whose host contains this text (case-insensitive).
    #[arg(long, default_value = "")]
    pub domain: String,

    /// Checked method toggle (get, post, put, delete, options). Repeatable; defaults to config.
    #[arg(long = "method", value_name = "METHOD")]
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the capture service: ingest host events and answer on the control socket.
    Serve {
        /// JSON-lines host event feed ("-" for stdin). Defaults to stdin unless --har is given.
        #[arg(long, value_name = "PATH")]
        feed: Option<PathBuf>,

        /// Replay the requests of a HAR file before reading the feed.
        #[arg(long, value_name = "PATH")]
        har: Option<PathBuf>,

        /// Control socket path.
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Show captured calls passing the filter.
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Control socket path.
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Export filtered calls as a Postman collection.
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Leave Cookie headers out of the export.
        #[arg(long)]
        exclude_cookies: bool,

        /// Directory to write the collection into (default: current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Control socket path.
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Drop all captured calls in the running service.
    Clear {
        /// Control socket path.
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Turn header tracking on or off (persisted and pushed to the running service).
    TrackHeaders {
        #[arg(value_enum)]
        state: Toggle,

        /// Control socket path.
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Serve { feed, har, socket } => {
                let socket = resolve_socket(socket, &cfg)?;
                run_serve(&cfg, feed.as_deref(), har.as_deref(), &socket).await?;
            }
            CliCommand::List { filter, socket } => {
                run_list(&cfg, &filter, &resolve_socket(socket, &cfg)?).await?;
            }
            CliCommand::Export {
                filter,
                exclude_cookies,
                out,
                socket,
            } => {
                let out = match out {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                };
                let socket = resolve_socket(socket, &cfg)?;
                run_export(&cfg, &filter, exclude_cookies, &out, &socket).await?;
            }
            CliCommand::Clear { socket } => run_clear(&cfg, &resolve_socket(socket, &cfg)?).await?,
            CliCommand::TrackHeaders { state, socket } => {
                let socket = resolve_socket(socket, &cfg)?;
                run_track_headers(&cfg, state == Toggle::On, &socket).await?;
            }
        }

        Ok(())
    }
}

/// `--socket` wins, then the config file, then the XDG default.
fn resolve_socket(arg: Option<PathBuf>, cfg: &ReqtapConfig) -> Result<PathBuf> {
    if let Some(path) = arg.or_else(|| cfg.socket_path.clone()) {
        return Ok(path);
    }
    Ok(reqtap_core::default_control_socket_path()?)
}

#[cfg(test)]
mod tests;
