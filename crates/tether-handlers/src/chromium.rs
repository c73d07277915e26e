//! Chromium-dialect message processing.
//!
//! Chromium-style endpoints speak plain CDP, so almost everything forwards
//! untouched. The two rewrites are breakpoint regex re-anchoring on the way
//! out and `scriptParsed` URL resolution on the way in.

use tether_cdp::{ProcessedMessage, ProtocolMessage};

use crate::breakpoints::{apply_breakpoint_fix, SET_BREAKPOINT_BY_URL};
use crate::errors::HandlerError;
use crate::handler::SessionContext;
use crate::scripts::{self, SCRIPT_PARSED};

/// Process a debugger → application message.
///
/// `setBreakpointByUrl` regexes are re-anchored always for framework
/// projects, and only when running against a local simulate server for plain
/// projects (plain device sessions already serve from the bundled copy the
/// regex was computed against).
pub(crate) fn process_debugger_message(
    ctx: &mut SessionContext,
    framework: bool,
    mut message: ProtocolMessage,
) -> Result<ProcessedMessage, HandlerError> {
    if message.is_method(SET_BREAKPOINT_BY_URL)
        && (framework || ctx.options.simulate_port.is_some())
    {
        apply_breakpoint_fix(&mut message, &breakpoint_root(ctx));
    }
    Ok(ProcessedMessage::forward(message))
}

/// Process an application → debugger message.
pub(crate) fn process_application_message(
    ctx: &mut SessionContext,
    framework: bool,
    mut message: ProtocolMessage,
) -> Result<ProcessedMessage, HandlerError> {
    if message.is_method(SCRIPT_PARSED) {
        let origin = ctx.options.application_server_origin();
        if scripts::script_url(&message).is_some_and(|url| url.starts_with(&origin)) {
            scripts::resolve_script_url(ctx, framework, &mut message);
        }
    }
    Ok(ProcessedMessage::forward(message))
}

/// The URL root breakpoint regexes must anchor to for this session.
fn breakpoint_root(ctx: &SessionContext) -> String {
    if let Some(port) = ctx.options.simulate_port {
        return format!("http://localhost:{port}");
    }
    let address = ctx
        .options
        .dev_server_address
        .as_deref()
        .unwrap_or("localhost");
    let port_part = match ctx.options.dev_server_port {
        Some(port) => format!(":{port}"),
        None => ctx.state.port_part().unwrap_or_default().to_owned(),
    };
    format!("http://{address}{port_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use tether_cdp::DispatchDirection;
    use tether_paths::PathTransformer;

    use crate::options::{HandlerOptions, RequestKind};

    fn options() -> HandlerOptions {
        HandlerOptions {
            platform: "android".into(),
            request: RequestKind::Attach,
            live_reload: false,
            dev_server_address: None,
            dev_server_port: None,
            simulate_port: None,
            ios_app_package_path: None,
            ios_version: None,
        }
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let js = dir.path().join("www/js");
        fs::create_dir_all(&js).unwrap();
        fs::write(js.join("index.js"), b"// source").unwrap();
        dir
    }

    fn ctx_with(dir: &TempDir, options: HandlerOptions) -> SessionContext {
        SessionContext::new(options, PathTransformer::new(dir.path(), "android"))
    }

    fn breakpoint_command() -> ProtocolMessage {
        ProtocolMessage::from_value(json!({
            "id": 12,
            "method": SET_BREAKPOINT_BY_URL,
            "params": {"lineNumber": 3, "urlRegex": r"\/proj\/www\/js\/index\.js"},
        }))
    }

    #[test]
    fn plain_without_simulate_leaves_regex() {
        let dir = project();
        let mut ctx = ctx_with(&dir, options());
        let processed = process_debugger_message(&mut ctx, false, breakpoint_command()).unwrap();
        assert_eq!(
            processed.event.params().unwrap()["urlRegex"],
            r"\/proj\/www\/js\/index\.js"
        );
        assert_eq!(processed.direction, DispatchDirection::Forward);
    }

    #[test]
    fn plain_with_simulate_rewrites_regex() {
        let dir = project();
        let mut opts = options();
        opts.simulate_port = Some(8058);
        let mut ctx = ctx_with(&dir, opts);
        let processed = process_debugger_message(&mut ctx, false, breakpoint_command()).unwrap();
        let rewritten = processed.event.params().unwrap()["urlRegex"]
            .as_str()
            .unwrap()
            .to_owned();
        let re = Regex::new(&rewritten).unwrap();
        assert!(re.is_match("http://localhost:8058/js/index.js"));
    }

    #[test]
    fn framework_always_rewrites_regex() {
        let dir = project();
        let mut opts = options();
        opts.dev_server_address = Some("192.168.0.5".into());
        opts.dev_server_port = Some(8100);
        let mut ctx = ctx_with(&dir, opts);
        let processed = process_debugger_message(&mut ctx, true, breakpoint_command()).unwrap();
        let rewritten = processed.event.params().unwrap()["urlRegex"]
            .as_str()
            .unwrap()
            .to_owned();
        let re = Regex::new(&rewritten).unwrap();
        assert!(re.is_match("http://192.168.0.5:8100/js/index.js"));
    }

    #[test]
    fn framework_uses_captured_port_part() {
        let dir = project();
        let mut opts = options();
        opts.dev_server_address = Some("localhost".into());
        let mut ctx = ctx_with(&dir, opts);
        ctx.state.record_port_part(":8100");
        let processed = process_debugger_message(&mut ctx, true, breakpoint_command()).unwrap();
        let rewritten = processed.event.params().unwrap()["urlRegex"]
            .as_str()
            .unwrap()
            .to_owned();
        assert!(Regex::new(&rewritten)
            .unwrap()
            .is_match("http://localhost:8100/js/index.js"));
    }

    #[test]
    fn script_parsed_resolves_to_file_url() {
        let dir = project();
        let mut ctx = ctx_with(&dir, options());
        let msg = ProtocolMessage::from_value(json!({
            "method": SCRIPT_PARSED,
            "params": {"url": "http://localhost/www/js/index.js"},
        }));
        let processed = process_application_message(&mut ctx, false, msg).unwrap();
        assert_eq!(processed.direction, DispatchDirection::Forward);
        let url = processed.event.params().unwrap()["url"].as_str().unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/www/js/index.js"));
    }

    #[test]
    fn script_parsed_outside_origin_is_untouched() {
        let dir = project();
        let mut ctx = ctx_with(&dir, options());
        let msg = ProtocolMessage::from_value(json!({
            "method": SCRIPT_PARSED,
            "params": {"url": "https://cdn.example.com/lib.js"},
        }));
        let processed = process_application_message(&mut ctx, false, msg).unwrap();
        assert_eq!(
            processed.event.params().unwrap()["url"],
            "https://cdn.example.com/lib.js"
        );
    }

    #[test]
    fn unrelated_messages_forward_unchanged() {
        let dir = project();
        let mut ctx = ctx_with(&dir, options());
        let msg = ProtocolMessage::from_value(json!({"id": 3, "method": "Runtime.enable"}));
        let processed = process_debugger_message(&mut ctx, false, msg.clone()).unwrap();
        assert_eq!(processed.event, msg);
        assert_eq!(processed.direction, DispatchDirection::Forward);
        assert!(processed.synthesized.is_empty());
    }
}
