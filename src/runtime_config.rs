//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for dispatcher behavior.
//!
//! ## Environment Variables
//!
//! ### `TREEROUTE_DIR_REDIRECT`
//!
//! Enables the trailing-slash redirect: when a path misses but `path + "/"`
//! resolves to an exact route, the dispatcher yields a redirect outcome
//! instead of not-found. Accepts `1`/`true`/`yes` (case-insensitive);
//! anything else disables it. Default: disabled.
//!
//! ### `TREEROUTE_STATIC_ROOT`
//!
//! Directory to serve files from when resolution misses entirely. Unset
//! means no static fallback.
//!
//! ## Usage
//!
//! ```rust
//! use treeroute::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("dir redirect: {}", config.dir_redirect);
//! ```

use std::env;
use std::path::PathBuf;

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup with [`RuntimeConfig::from_env()`] and hand it to
/// [`Dispatcher::configure`](crate::dispatcher::Dispatcher::configure).
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Redirect `path` to `path + "/"` when only the latter has an exact
    /// route (default: false).
    pub dir_redirect: bool,
    /// Root directory for the static-file fallback, if any.
    pub static_root: Option<PathBuf>,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let dir_redirect = env::var("TREEROUTE_DIR_REDIRECT")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let static_root = env::var("TREEROUTE_STATIC_ROOT")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        RuntimeConfig {
            dir_redirect,
            static_root,
        }
    }
}
