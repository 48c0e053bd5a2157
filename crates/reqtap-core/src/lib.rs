pub mod config;
pub mod logging;

pub mod body;
pub mod capture;
pub mod client;
pub mod event;
pub mod export;
pub mod feed;
pub mod filter;
pub mod inspect;
pub mod model;
pub mod protocol;
pub mod settings;

/// Default path for the control socket (same XDG state dir as the settings file).
pub fn default_control_socket_path() -> std::io::Result<std::path::PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("reqtap")?.get_state_home();
    Ok(dir.join("reqtap").join("control.sock"))
}
