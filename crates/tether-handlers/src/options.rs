//! Per-session configuration.
//!
//! The IDE's attach/launch request carries far more than the message handlers
//! need (device targets, timeouts, sourcemap switches, …).
//! [`HandlerOptions::from_attach_request`] is the explicit narrowing boundary:
//! handler internals never see fields they don't use. Options are derived
//! once per session and never mutated.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which inspector dialect family the application speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineKind {
    /// Direct CDP endpoint (Android webviews, simulate servers).
    Chromium,
    /// WebKit remote inspector (iOS webviews).
    WebKit,
}

/// Whether the project serves sources from a bundled `www` copy or straight
/// from a framework dev server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectKind {
    /// Bundled project: sources are copied into `www` at build time.
    Plain,
    /// Live-reload/framework project: a dev server serves sources directly.
    Framework,
}

/// How the debugging session was initiated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Tether started the application itself.
    Launch,
    /// Tether attached to an already-running application.
    Attach,
}

/// The full attach/launch request as the IDE sends it.
///
/// Only a narrow slice of this reaches the handlers; the rest configures
/// process launching and source mapping elsewhere.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRequest {
    /// Target platform (`android`, `ios`, `browser`, …).
    pub platform: String,
    /// Launch or attach.
    pub request: RequestKind,
    /// Project root directory.
    pub cwd: PathBuf,
    /// User-specified web root searched before the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_root: Option<PathBuf>,
    /// Device/emulator target identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Debug port forwarded from the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// How long to keep retrying the initial attach, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_timeout: Option<u64>,
    /// Whether the project is a live-reload/framework project.
    #[serde(default)]
    pub framework_project: bool,
    /// Major version of the framework toolchain, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework_major_version: Option<u32>,
    /// Whether the session runs with live reload.
    #[serde(default)]
    pub live_reload: bool,
    /// Dev-server address for live-reload sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_server_address: Option<String>,
    /// Dev-server port for live-reload sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_server_port: Option<u16>,
    /// Port of the local simulate server, when simulating in a browser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulate_port: Option<u16>,
    /// Path of the installed application bundle on an iOS device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios_app_package_path: Option<String>,
    /// iOS version reported by the device, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios_version: Option<String>,
}

impl AttachRequest {
    /// The project kind this request describes.
    pub fn project_kind(&self) -> ProjectKind {
        if self.framework_project {
            ProjectKind::Framework
        } else {
            ProjectKind::Plain
        }
    }

    /// Whether the framework toolchain no longer bundles sources into `www`
    /// for serve/live-reload sessions (version 4 and newer).
    pub fn serves_outside_www(&self) -> bool {
        self.framework_project
            && self.live_reload
            && self.framework_major_version.is_some_and(|v| v >= 4)
    }
}

/// Immutable configuration a handler sees for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerOptions {
    /// Target platform name.
    pub platform: String,
    /// Launch or attach.
    pub request: RequestKind,
    /// Whether the session runs with live reload.
    pub live_reload: bool,
    /// Dev-server address, when serving from one.
    pub dev_server_address: Option<String>,
    /// Dev-server port, when configured explicitly.
    pub dev_server_port: Option<u16>,
    /// Simulate server port, when simulating.
    pub simulate_port: Option<u16>,
    /// Installed app bundle path on an iOS device.
    pub ios_app_package_path: Option<String>,
    /// iOS version string, once known.
    pub ios_version: Option<String>,
}

impl HandlerOptions {
    /// Narrow a full attach request down to what the handlers need.
    pub fn from_attach_request(request: &AttachRequest) -> Self {
        Self {
            platform: request.platform.clone(),
            request: request.request,
            live_reload: request.live_reload,
            dev_server_address: request.dev_server_address.clone(),
            dev_server_port: request.dev_server_port,
            simulate_port: request.simulate_port,
            ios_app_package_path: request.ios_app_package_path.clone(),
            ios_version: request.ios_version.clone(),
        }
    }

    /// The engine the session debugs against.
    ///
    /// Simulate sessions always run against a local Chromium instance,
    /// whatever the nominal platform.
    pub fn engine_kind(&self) -> EngineKind {
        if self.simulate_port.is_some() {
            return EngineKind::Chromium;
        }
        if self.platform.eq_ignore_ascii_case("ios") {
            EngineKind::WebKit
        } else {
            EngineKind::Chromium
        }
    }

    /// The HTTP origin the application's scripts are served from.
    pub fn application_server_origin(&self) -> String {
        if let Some(port) = self.simulate_port {
            return format!("http://localhost:{port}");
        }
        let address = self.dev_server_address.as_deref().unwrap_or("localhost");
        match self.dev_server_port {
            Some(port) => format!("http://{address}:{port}"),
            None => format!("http://{address}"),
        }
    }
}
