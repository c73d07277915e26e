//! WebKit-dialect message processing.
//!
//! The WebKit remote inspector differs from plain CDP in several ways the
//! debugging client must never see:
//!
//! - On devices at or above the version gate, every message travels inside
//!   the `Target` envelope; the relay wraps outbound traffic and unwraps
//!   inbound `Target.dispatchMessageFromTarget` events.
//! - Older inspectors predate several protocol domains; a one-shot bootstrap
//!   on the first `Runtime.enable` enables the legacy console domain,
//!   activates breakpoints, and synthesizes the `executionContextCreated`
//!   event the client expects but the inspector never sends.
//! - Console output arrives in the deprecated single-message shape and is
//!   converted to the multi-argument console-call shape.

use serde_json::{json, Value};
use tether_cdp::target::{created_target_id, is_target_domain};
use tether_cdp::{unwrap_from_target, wrap_for_target, Peer, ProcessedMessage, ProtocolMessage};

use crate::breakpoints::{apply_breakpoint_fix, SET_BREAKPOINT_BY_URL};
use crate::errors::HandlerError;
use crate::handler::SessionContext;
use crate::scripts::{self, SCRIPT_PARSED};

/// Scheme framework dev servers serve webview content under on iOS.
const DEV_SERVER_SCHEME: &str = "ionic://";

/// Result value older framework webviews return from the client's bootstrap
/// evaluate call when the native bridge is not up yet. Left as-is it makes
/// the client re-issue the same evaluate indefinitely.
const STALE_EVALUATE_RESULT: &str = "native_bridge_not_available";

/// Process a debugger → application message.
pub(crate) fn process_debugger_message(
    ctx: &mut SessionContext,
    framework: bool,
    mut message: ProtocolMessage,
) -> Result<ProcessedMessage, HandlerError> {
    if message.is_method(SET_BREAKPOINT_BY_URL) {
        apply_breakpoint_fix(&mut message, &breakpoint_root(ctx, framework));
    }

    let mut processed = if message.is_method("Runtime.enable") && !ctx.state.is_backcompat_configured
    {
        bootstrap_backcompat(ctx, message)?
    } else {
        ProcessedMessage::forward(message)
    };

    if ctx.state.is_targeted {
        let method = processed.event.method().unwrap_or_default();
        if !is_target_domain(method) {
            processed.event = wrap_for_target(&processed.event, &ctx.state.target_id)?;
        }
    }
    Ok(processed)
}

/// Process an application → debugger message.
pub(crate) fn process_application_message(
    ctx: &mut SessionContext,
    framework: bool,
    message: ProtocolMessage,
) -> Result<ProcessedMessage, HandlerError> {
    if let Some(target_id) = created_target_id(&message).map(str::to_owned) {
        ctx.state.target_id = target_id;
        return Ok(ProcessedMessage::cancel(message).ready());
    }

    if ctx.state.is_targeted {
        // Until traffic is tunneled through the envelope it cannot be routed
        // safely; only unwrapped dispatch events reach the debugger.
        return match unwrap_from_target(&message)? {
            Some(inner) => {
                let inner = post_process(ctx, framework, inner);
                Ok(ProcessedMessage::forward(inner))
            }
            None => Ok(ProcessedMessage::cancel(message)),
        };
    }

    let message = post_process(ctx, framework, message);
    Ok(ProcessedMessage::forward(message))
}

/// Rewrites applied to every message (unwrapped, on the targeted dialect)
/// before it reaches the debugger.
fn post_process(
    ctx: &mut SessionContext,
    framework: bool,
    mut message: ProtocolMessage,
) -> ProtocolMessage {
    if message.is_method(SCRIPT_PARSED) {
        let origin = ctx.options.application_server_origin();
        let candidate = scripts::script_url(&message).is_some_and(|url| {
            url.starts_with("file://")
                || url.starts_with(DEV_SERVER_SCHEME)
                || url.starts_with(&origin)
        });
        if candidate {
            scripts::resolve_script_url(ctx, framework, &mut message);
        }
        return message;
    }

    if let Some(converted) = convert_deprecated_console_event(&message) {
        return converted;
    }

    flatten_properties_reply(&mut message);

    if framework {
        strip_stale_evaluate_result(&mut message);
    }
    message
}

/// The URL root breakpoint regexes must anchor to for this session.
fn breakpoint_root(ctx: &SessionContext, framework: bool) -> String {
    if framework {
        let address = ctx
            .options
            .dev_server_address
            .as_deref()
            .unwrap_or("localhost");
        let port_part = match ctx.options.dev_server_port {
            Some(port) => format!(":{port}"),
            None => ctx.state.port_part().unwrap_or_default().to_owned(),
        };
        return format!("{DEV_SERVER_SCHEME}{address}{port_part}");
    }
    let package = ctx
        .options
        .ios_app_package_path
        .as_deref()
        .unwrap_or_default()
        .trim_end_matches('/');
    format!("file://{package}/www")
}

/// One-shot backward-compatibility bootstrap, run on the first
/// `Runtime.enable` from the debugger.
///
/// Sends `Console.enable` and `Debugger.setBreakpointsActive` to the
/// application (best-effort: the relay swallows send failures) and
/// synthesizes the `Runtime.executionContextCreated` event the client needs
/// before it accepts evaluation requests (delivery failure there is fatal to
/// session setup).
fn bootstrap_backcompat(
    ctx: &mut SessionContext,
    message: ProtocolMessage,
) -> Result<ProcessedMessage, HandlerError> {
    ctx.state.is_backcompat_configured = true;
    tracing::debug!("running backward-compatibility bootstrap");

    let mut console_enable = ProtocolMessage::from_value(json!({
        "id": ctx.state.next_custom_id(),
        "method": "Console.enable",
    }));
    let mut breakpoints_active = ProtocolMessage::from_value(json!({
        "id": ctx.state.next_custom_id(),
        "method": "Debugger.setBreakpointsActive",
        "params": {"active": true},
    }));
    if ctx.state.is_targeted {
        console_enable = wrap_for_target(&console_enable, &ctx.state.target_id)?;
        breakpoints_active = wrap_for_target(&breakpoints_active, &ctx.state.target_id)?;
    }

    let context_created = ProtocolMessage::from_value(json!({
        "method": "Runtime.executionContextCreated",
        "params": {
            "context": {"id": 1, "name": "Global", "origin": ""},
        },
    }));

    Ok(ProcessedMessage::forward(message)
        .with_synthesized(console_enable, Peer::Application)
        .with_synthesized(breakpoints_active, Peer::Application)
        .with_synthesized(context_created, Peer::Debugger))
}

/// Convert the deprecated single-message console event into the standard
/// multi-argument console-call shape.
fn convert_deprecated_console_event(message: &ProtocolMessage) -> Option<ProtocolMessage> {
    if !message.is_method("Console.messageAdded") {
        return None;
    }
    let legacy = message.params()?.get("message")?;
    let level = legacy.get("level").and_then(Value::as_str).unwrap_or("log");
    let kind = match level {
        "error" => "error",
        "warning" => "warning",
        "debug" => "debug",
        _ => "log",
    };
    let args = match legacy.get("parameters") {
        Some(Value::Array(parameters)) if !parameters.is_empty() => {
            Value::Array(parameters.clone())
        }
        _ => json!([{
            "type": "string",
            "value": legacy.get("text").cloned().unwrap_or_else(|| json!("")),
        }]),
    };
    Some(ProtocolMessage::from_value(json!({
        "method": "Runtime.consoleAPICalled",
        "params": {
            "type": kind,
            "args": args,
            "executionContextId": 1,
            "timestamp": 0,
        },
    })))
}

/// Older inspectors answer property lookups with the payload under a
/// `properties` key; the client expects it under `result`.
fn flatten_properties_reply(message: &mut ProtocolMessage) {
    let Some(result) = message.result_mut() else {
        return;
    };
    let Some(object) = result.as_object_mut() else {
        return;
    };
    if let Some(properties) = object.remove("properties") {
        let _ = object.insert("result".into(), properties);
    }
}

/// Replace the stale bootstrap-evaluate result with `undefined` so the
/// client stops re-issuing the call.
fn strip_stale_evaluate_result(message: &mut ProtocolMessage) {
    let Some(inner) = message.result_mut().and_then(|r| r.get_mut("result")) else {
        return;
    };
    let is_stale = inner.get("type").and_then(Value::as_str) == Some("string")
        && inner.get("value").and_then(Value::as_str) == Some(STALE_EVALUATE_RESULT);
    if is_stale {
        *inner = json!({"type": "undefined"});
    }
}
