//! Application-side connection establishment.
//!
//! The session pump only knows the [`ApplicationConnector`] interface; the
//! WebSocket-backed implementation lives here, and tests substitute a
//! channel-backed one.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::connection::{spawn_application_io, Endpoint, Inbound, OutboundSender};
use crate::discovery::{
    resolve_with_retry, InspectorDiscovery, DEFAULT_ATTEMPTS, DEFAULT_POLL_INTERVAL,
};
use crate::errors::RelayError;
use crate::server::RelayShared;

/// The application-side connections a session runs against.
pub struct ApplicationLinks {
    /// The general inspector endpoint.
    pub application: OutboundSender,
    /// The page-specific endpoint, present in simulate mode. The general
    /// endpoint cannot service emulation-domain requests and the page
    /// endpoint cannot service target management, so both are tracked.
    pub simulate_page: Option<OutboundSender>,
}

/// Opens the application side of a session.
#[async_trait]
pub trait ApplicationConnector: Send + Sync {
    /// Open the application connection(s), wiring inbound frames into
    /// `inbound`.
    async fn connect(
        &self,
        inbound: mpsc::Sender<Inbound>,
        cancel: CancellationToken,
    ) -> Result<ApplicationLinks, RelayError>;
}

/// Production connector: discovers the inspector endpoint and attaches over
/// WebSocket.
pub struct WsApplicationConnector {
    shared: Arc<RelayShared>,
}

impl WsApplicationConnector {
    /// Create a connector reading endpoint configuration from the relay.
    pub fn new(shared: Arc<RelayShared>) -> Self {
        Self { shared }
    }

    async fn resolve_endpoint(
        &self,
        discovery: &dyn InspectorDiscovery,
        cancel: &CancellationToken,
    ) -> Result<String, RelayError> {
        if let Some(url) = self.shared.inspector_url() {
            debug!(url, "using explicitly configured inspector URL");
            return Ok(url);
        }
        let port = self
            .shared
            .application_port()
            .ok_or(RelayError::NotConfigured("application port or inspector URL"))?;
        let base = format!("http://127.0.0.1:{port}");
        Ok(resolve_with_retry(discovery, &base, DEFAULT_ATTEMPTS, DEFAULT_POLL_INTERVAL, cancel)
            .await?)
    }

    async fn attach(
        &self,
        url: &str,
        endpoint: Endpoint,
        inbound: mpsc::Sender<Inbound>,
        cancel: CancellationToken,
    ) -> Result<OutboundSender, RelayError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|err| {
            RelayError::ApplicationConnect {
                url: url.to_owned(),
                reason: err.to_string(),
            }
        })?;
        info!(url, ?endpoint, "application connection open");
        Ok(spawn_application_io(stream, endpoint, inbound, cancel))
    }
}

#[async_trait]
impl ApplicationConnector for WsApplicationConnector {
    async fn connect(
        &self,
        inbound: mpsc::Sender<Inbound>,
        cancel: CancellationToken,
    ) -> Result<ApplicationLinks, RelayError> {
        let discovery = self.shared.discovery();

        let url = self.resolve_endpoint(discovery.as_ref(), &cancel).await?;
        let application = self
            .attach(&url, Endpoint::Application, inbound.clone(), cancel.clone())
            .await?;

        let simulate_page = match self.shared.simulate_port() {
            Some(port) => {
                let base = format!("http://127.0.0.1:{port}");
                let page_url = resolve_with_retry(
                    discovery.as_ref(),
                    &base,
                    DEFAULT_ATTEMPTS,
                    DEFAULT_POLL_INTERVAL,
                    &cancel,
                )
                .await?;
                Some(
                    self.attach(&page_url, Endpoint::SimulatePage, inbound, cancel)
                        .await?,
                )
            }
            None => None,
        };

        Ok(ApplicationLinks {
            application,
            simulate_page,
        })
    }
}
