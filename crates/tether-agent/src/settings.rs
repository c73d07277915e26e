//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TetherSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use tether_handlers::options::{AttachRequest, RequestKind};

/// Persistent configuration for the Tether agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TetherSettings {
    /// Host the debugger-facing listener binds.
    pub host: String,
    /// Port the debugger-facing listener binds (0 for auto-assign).
    pub port: u16,
    /// HTTP port the application's inspector listing is polled on.
    pub application_port: Option<u16>,
    /// Inspector WebSocket URL, bypassing discovery when set.
    pub inspector_url: Option<String>,
    /// Target platform (`android`, `ios`, `browser`, …).
    pub platform: String,
    /// Launch or attach.
    pub request: RequestKind,
    /// Project root directory.
    pub project_root: PathBuf,
    /// Web root searched before the project root.
    pub web_root: Option<PathBuf>,
    /// Whether the project is a live-reload/framework project.
    pub framework_project: bool,
    /// Major version of the framework toolchain, when known.
    pub framework_major_version: Option<u32>,
    /// Whether the session runs with live reload.
    pub live_reload: bool,
    /// Dev-server address for live-reload sessions.
    pub dev_server_address: Option<String>,
    /// Dev-server port for live-reload sessions.
    pub dev_server_port: Option<u16>,
    /// Port of the local simulate server, when simulating.
    pub simulate_port: Option<u16>,
    /// Installed app bundle path on an iOS device.
    pub ios_app_package_path: Option<String>,
    /// iOS version reported by the device, once known.
    pub ios_version: Option<String>,
}

impl Default for TetherSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9222,
            application_port: None,
            inspector_url: None,
            platform: "android".into(),
            request: RequestKind::Attach,
            project_root: PathBuf::from("."),
            web_root: None,
            framework_project: false,
            framework_major_version: None,
            live_reload: false,
            dev_server_address: None,
            dev_server_port: None,
            simulate_port: None,
            ios_app_package_path: None,
            ios_version: None,
        }
    }
}

impl TetherSettings {
    /// Render these settings as the attach request the handler layer
    /// narrows from.
    pub fn attach_request(&self) -> AttachRequest {
        AttachRequest {
            platform: self.platform.clone(),
            request: self.request,
            cwd: self.project_root.clone(),
            web_root: self.web_root.clone(),
            target: None,
            port: self.application_port,
            attach_timeout: None,
            framework_project: self.framework_project,
            framework_major_version: self.framework_major_version,
            live_reload: self.live_reload,
            dev_server_address: self.dev_server_address.clone(),
            dev_server_port: self.dev_server_port,
            simulate_port: self.simulate_port,
            ios_app_package_path: self.ios_app_package_path.clone(),
            ios_version: self.ios_version.clone(),
        }
    }
}

/// Resolve the default settings file path (`~/.tether/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".tether").join("settings.json")
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> anyhow::Result<TetherSettings> {
    let defaults = serde_json::to_value(TetherSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: TetherSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

fn apply_env_overrides(settings: &mut TetherSettings) {
    if let Ok(host) = std::env::var("TETHER_HOST") {
        settings.host = host;
    }
    if let Some(port) = env_u16("TETHER_PORT") {
        settings.port = port;
    }
    if let Some(port) = env_u16("TETHER_APPLICATION_PORT") {
        settings.application_port = Some(port);
    }
    if let Ok(platform) = std::env::var("TETHER_PLATFORM") {
        settings.platform = platform;
    }
}

fn env_u16(name: &str) -> Option<u16> {
    std::env::var(name).ok()?.parse().ok()
}
