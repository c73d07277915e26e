//! # tether-agent
//!
//! Tether debug bridge server binary — wires settings, handler selection,
//! and the CDP relay together, then runs until interrupted.

#![deny(unsafe_code)]

mod discovery;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tether_handlers::HandlerOptions;
use tether_paths::PathTransformer;
use tether_relay::{CdpRelayServer, RelayConfig, RelayEvent};

use crate::discovery::HttpInspectorDiscovery;

/// Tether debug bridge server.
#[derive(Parser, Debug)]
#[command(name = "tether-agent", about = "CDP relay for hybrid-web app debugging")]
struct Cli {
    /// Host to bind the debugger-facing listener.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the debugger-facing listener (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// HTTP port the application's inspector listing is polled on.
    #[arg(long)]
    application_port: Option<u16>,

    /// Inspector WebSocket URL, bypassing discovery.
    #[arg(long)]
    inspector_url: Option<String>,

    /// Target platform (`android`, `ios`, `browser`, …).
    #[arg(long)]
    platform: Option<String>,

    /// Project root directory.
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Path to the settings file (defaults to `~/.tether/settings.json`).
    #[arg(long)]
    settings_path: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let path = cli.settings_path.unwrap_or_else(settings::settings_path);
    let mut settings = settings::load_settings_from_path(&path)?;
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(port) = cli.application_port {
        settings.application_port = Some(port);
    }
    if let Some(url) = cli.inspector_url {
        settings.inspector_url = Some(url);
    }
    if let Some(platform) = cli.platform {
        settings.platform = platform;
    }
    if let Some(root) = cli.project_root {
        settings.project_root = root;
    }

    let attach = settings.attach_request();
    let options = HandlerOptions::from_attach_request(&attach);

    let mut paths = PathTransformer::new(&attach.cwd, attach.platform.as_str());
    if let Some(web_root) = &attach.web_root {
        paths = paths.with_web_root(web_root);
    }
    if attach.serves_outside_www() {
        paths = paths.without_www_search();
    }

    let (server, mut events) = CdpRelayServer::new(
        RelayConfig {
            host: settings.host.clone(),
            port: settings.port,
        },
        Arc::new(HttpInspectorDiscovery::new()),
    );
    if let Some(port) = settings.application_port {
        server.set_application_port(port);
    }
    if let Some(url) = &settings.inspector_url {
        server.set_inspector_url(url.clone());
    }
    server.configure_handler(options, attach.project_kind(), paths);

    let addr = server.listen().await?;
    info!(%addr, platform = %settings.platform, "tether-agent ready");

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("interrupt received, shutting down");
                server.stop();
                break;
            }
            event = events.recv() => match event {
                Some(RelayEvent::Error(err)) => {
                    // The session is already torn down; keep listening so the
                    // debugger can reattach.
                    error!(error = %err, "debug session failed");
                }
                Some(RelayEvent::Closed) => info!("debug session closed"),
                None => break,
            }
        }
    }
    Ok(())
}
