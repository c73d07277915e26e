//! Handler selection.
//!
//! A pure 2×2 mapping from session configuration to a concrete handler.
//! Selection has no side effects and no hidden inputs: the same options
//! always produce a behaviorally identical handler.

use tether_paths::PathTransformer;

use crate::handler::{DialectHandler, SessionContext};
use crate::options::{EngineKind, HandlerOptions, ProjectKind};

/// The four concrete handler shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerVariant {
    /// Chromium endpoint, bundled project.
    ChromiumPlain,
    /// Chromium endpoint, live-reload/framework project.
    ChromiumFramework,
    /// WebKit remote inspector, bundled project.
    WebKitPlain,
    /// WebKit remote inspector, live-reload/framework project.
    WebKitFramework,
}

/// Map an engine and project kind to a handler variant.
pub fn select_variant(engine: EngineKind, project: ProjectKind) -> HandlerVariant {
    match (engine, project) {
        (EngineKind::Chromium, ProjectKind::Plain) => HandlerVariant::ChromiumPlain,
        (EngineKind::Chromium, ProjectKind::Framework) => HandlerVariant::ChromiumFramework,
        (EngineKind::WebKit, ProjectKind::Plain) => HandlerVariant::WebKitPlain,
        (EngineKind::WebKit, ProjectKind::Framework) => HandlerVariant::WebKitFramework,
    }
}

/// Build the handler for a session.
pub fn handler_for_session(
    options: HandlerOptions,
    project: ProjectKind,
    paths: PathTransformer,
) -> DialectHandler {
    let variant = select_variant(options.engine_kind(), project);
    let ctx = SessionContext::new(options, paths);
    match variant {
        HandlerVariant::ChromiumPlain => DialectHandler::ChromiumPlain(ctx),
        HandlerVariant::ChromiumFramework => DialectHandler::ChromiumFramework(ctx),
        HandlerVariant::WebKitPlain => DialectHandler::WebKitPlain(ctx),
        HandlerVariant::WebKitFramework => DialectHandler::WebKitFramework(ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tether_cdp::ProtocolMessage;

    use crate::options::RequestKind;

    fn options(platform: &str) -> HandlerOptions {
        HandlerOptions {
            platform: platform.into(),
            request: RequestKind::Attach,
            live_reload: false,
            dev_server_address: None,
            dev_server_port: None,
            simulate_port: None,
            ios_app_package_path: None,
            ios_version: Some("13.0.0".into()),
        }
    }

    #[test]
    fn mapping_covers_all_four_cells() {
        assert_eq!(
            select_variant(EngineKind::Chromium, ProjectKind::Plain),
            HandlerVariant::ChromiumPlain
        );
        assert_eq!(
            select_variant(EngineKind::Chromium, ProjectKind::Framework),
            HandlerVariant::ChromiumFramework
        );
        assert_eq!(
            select_variant(EngineKind::WebKit, ProjectKind::Plain),
            HandlerVariant::WebKitPlain
        );
        assert_eq!(
            select_variant(EngineKind::WebKit, ProjectKind::Framework),
            HandlerVariant::WebKitFramework
        );
    }

    #[test]
    fn ios_options_select_webkit() {
        let dir = TempDir::new().unwrap();
        let handler = handler_for_session(
            options("ios"),
            ProjectKind::Plain,
            PathTransformer::new(dir.path(), "ios"),
        );
        assert!(matches!(handler, DialectHandler::WebKitPlain(_)));
    }

    #[test]
    fn simulate_options_select_chromium_even_on_ios() {
        let dir = TempDir::new().unwrap();
        let mut opts = options("ios");
        opts.simulate_port = Some(8058);
        let handler = handler_for_session(
            opts,
            ProjectKind::Plain,
            PathTransformer::new(dir.path(), "ios"),
        );
        assert!(matches!(handler, DialectHandler::ChromiumPlain(_)));
    }

    #[test]
    fn identical_options_yield_identical_behavior() {
        let dir = TempDir::new().unwrap();
        let build = || {
            handler_for_session(
                options("ios"),
                ProjectKind::Plain,
                PathTransformer::new(dir.path(), "ios"),
            )
        };
        let mut first = build();
        let mut second = build();

        let sequence = [
            json!({"id": 1, "method": "Runtime.enable"}),
            json!({"id": 2, "method": "Debugger.enable"}),
            json!({"id": 3, "method": "Runtime.enable"}),
        ];
        for raw in sequence {
            let a = first
                .process_debugger_message(ProtocolMessage::from_value(raw.clone()))
                .unwrap();
            let b = second
                .process_debugger_message(ProtocolMessage::from_value(raw))
                .unwrap();
            assert_eq!(a, b);
        }
    }
}
