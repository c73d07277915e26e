//! `Debugger.scriptParsed` URL rewriting shared by both dialects.

use serde_json::Value;
use tether_cdp::ProtocolMessage;
use tether_paths::to_file_url;

use crate::handler::SessionContext;

/// Event announcing a parsed script and its URL.
pub const SCRIPT_PARSED: &str = "Debugger.scriptParsed";

/// The script URL carried by a `scriptParsed` event, if any.
pub fn script_url(msg: &ProtocolMessage) -> Option<&str> {
    msg.params()?.get("url")?.as_str()
}

/// Resolve a `scriptParsed` URL to a local `file://` URL in place.
///
/// For framework sessions this also lazily captures the dev-server port from
/// the first resolvable URL, and clears URLs that cannot be resolved — except
/// in pure serve/live-reload launches, where there is no local file to show
/// and the remote URL must survive.
pub fn resolve_script_url(ctx: &mut SessionContext, framework: bool, msg: &mut ProtocolMessage) {
    let Some(url) = script_url(msg).map(str::to_owned) else {
        return;
    };

    match ctx.paths.resolve(&url) {
        Some(path) => {
            if framework && ctx.options.dev_server_port.is_none() {
                if let Some(part) = url_port_part(&url) {
                    ctx.state.record_port_part(part);
                }
            }
            set_url(msg, to_file_url(&path));
        }
        None => {
            if framework && !ctx.options.live_reload {
                // A dead remote URL would open a blank editor; clearing it
                // tells the client the script has no viewable source.
                tracing::debug!(url, "clearing unresolvable script URL");
                set_url(msg, String::new());
            }
        }
    }
}

fn set_url(msg: &mut ProtocolMessage, url: String) {
    if let Some(params) = msg.params_mut() {
        params["url"] = Value::String(url);
    }
}

/// The `":port"` suffix of a URL's authority, if one is present.
fn url_port_part(url: &str) -> Option<String> {
    let rest = &url[url.find("://")? + 3..];
    let host = &rest[..rest.find('/').unwrap_or(rest.len())];
    let port = &host[host.rfind(':')? + 1..];
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!(":{port}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use tether_paths::PathTransformer;

    use crate::options::{HandlerOptions, RequestKind};

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let js = dir.path().join("www/js");
        fs::create_dir_all(&js).unwrap();
        fs::write(js.join("index.js"), b"// source").unwrap();
        dir
    }

    fn ctx(dir: &TempDir, live_reload: bool) -> SessionContext {
        let options = HandlerOptions {
            platform: "android".into(),
            request: RequestKind::Attach,
            live_reload,
            dev_server_address: Some("localhost".into()),
            dev_server_port: None,
            simulate_port: None,
            ios_app_package_path: None,
            ios_version: None,
        };
        SessionContext::new(options, PathTransformer::new(dir.path(), "android"))
    }

    fn script_parsed(url: &str) -> ProtocolMessage {
        ProtocolMessage::from_value(json!({
            "method": SCRIPT_PARSED,
            "params": {"url": url, "scriptId": "1"},
        }))
    }

    #[test]
    fn resolvable_url_becomes_file_url() {
        let dir = project();
        let mut ctx = ctx(&dir, false);
        let mut msg = script_parsed("http://localhost/www/js/index.js");
        resolve_script_url(&mut ctx, false, &mut msg);
        let url = script_url(&msg).unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/www/js/index.js"));
    }

    #[test]
    fn framework_captures_port_from_first_resolvable_url() {
        let dir = project();
        let mut ctx = ctx(&dir, false);
        let mut msg = script_parsed("http://localhost:8100/www/js/index.js");
        resolve_script_url(&mut ctx, true, &mut msg);
        assert_eq!(ctx.state.port_part(), Some(":8100"));
    }

    #[test]
    fn configured_port_suppresses_capture() {
        let dir = project();
        let mut ctx = ctx(&dir, false);
        ctx.options.dev_server_port = Some(8100);
        let mut msg = script_parsed("http://localhost:9000/www/js/index.js");
        resolve_script_url(&mut ctx, true, &mut msg);
        assert_eq!(ctx.state.port_part(), None);
    }

    #[test]
    fn framework_clears_unresolvable_url() {
        let dir = project();
        let mut ctx = ctx(&dir, false);
        let mut msg = script_parsed("http://localhost/js/missing.js");
        resolve_script_url(&mut ctx, true, &mut msg);
        assert_eq!(script_url(&msg), Some(""));
    }

    #[test]
    fn live_reload_preserves_unresolvable_url() {
        let dir = project();
        let mut ctx = ctx(&dir, true);
        let mut msg = script_parsed("http://localhost:8100/js/missing.js");
        resolve_script_url(&mut ctx, true, &mut msg);
        assert_eq!(script_url(&msg), Some("http://localhost:8100/js/missing.js"));
    }

    #[test]
    fn plain_project_leaves_unresolvable_url() {
        let dir = project();
        let mut ctx = ctx(&dir, false);
        let mut msg = script_parsed("http://localhost/js/missing.js");
        resolve_script_url(&mut ctx, false, &mut msg);
        assert_eq!(script_url(&msg), Some("http://localhost/js/missing.js"));
    }

    #[test]
    fn port_part_parsing() {
        assert_eq!(
            url_port_part("http://192.168.0.5:8100/js/a.js"),
            Some(":8100".into())
        );
        assert_eq!(url_port_part("http://localhost/js/a.js"), None);
        assert_eq!(url_port_part("nonsense"), None);
    }
}
