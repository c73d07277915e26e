//! HTTP-polling inspector discovery.
//!
//! Inspector endpoints publish a JSON listing of debuggable pages at
//! `<base>/json`; the first page with a `webSocketDebuggerUrl` wins. The
//! relay retries through this implementation until the application comes up.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use tether_relay::{DiscoveryError, InspectorDiscovery};

/// One entry of the inspector's page listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageListing {
    #[serde(default)]
    web_socket_debugger_url: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Discovery via the inspector's HTTP JSON listing.
pub struct HttpInspectorDiscovery {
    client: reqwest::Client,
}

impl HttpInspectorDiscovery {
    /// Create a discovery client with a short per-request timeout, so the
    /// retry loop stays responsive while the application is still starting.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpInspectorDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InspectorDiscovery for HttpInspectorDiscovery {
    async fn resolve(&self, base_url: &str) -> Result<String, DiscoveryError> {
        let listing_url = format!("{base_url}/json");
        let pages: Vec<PageListing> = self
            .client
            .get(&listing_url)
            .send()
            .await
            .map_err(|err| DiscoveryError::Unreachable {
                base: base_url.to_owned(),
                reason: err.to_string(),
            })?
            .json()
            .await
            .map_err(|err| DiscoveryError::Unreachable {
                base: base_url.to_owned(),
                reason: err.to_string(),
            })?;

        for page in pages {
            if let Some(url) = page.web_socket_debugger_url {
                debug!(title = page.title.as_deref().unwrap_or(""), url, "picked inspector page");
                return Ok(url);
            }
        }
        Err(DiscoveryError::Unreachable {
            base: base_url.to_owned(),
            reason: "no page with a webSocketDebuggerUrl listed".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_listing_parses_devtools_shape() {
        let raw = r#"[
            {"title": "about:blank", "webSocketDebuggerUrl": "ws://127.0.0.1:9221/devtools/page/1"},
            {"title": "no-debug-page"}
        ]"#;
        let pages: Vec<PageListing> = serde_json::from_str(raw).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(
            pages[0].web_socket_debugger_url.as_deref(),
            Some("ws://127.0.0.1:9221/devtools/page/1")
        );
        assert!(pages[1].web_socket_debugger_url.is_none());
    }
}
