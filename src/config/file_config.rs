//! Configuration file discovery and rendering.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 5000
//! json_response = false
//!
//! [api]
//! base_url = "https://api.cal.com/v2"
//! timeout_secs = 30
//! auth_token = "cal_live_..."   # stdio mode only
//!
//! [logging]
//! level = "INFO"
//! ```

use std::path::PathBuf;

use super::Config;

const FILE_NAME: &str = "calcom-mcp.toml";

/// `<user config dir>/calcom-mcp/config.toml`, when the platform has one
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("calcom-mcp").join("config.toml"))
}

/// First existing config file: `./calcom-mcp.toml`, then the user config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|path| path.is_file())
}

/// Render `config` as TOML with any stored token masked
pub fn render_toml(config: &Config) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.api.auth_token.is_some() {
        shown.api.auth_token = Some("<redacted>".to_string());
    }
    toml::to_string_pretty(&shown)
}
