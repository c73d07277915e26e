//! The WebKit remote-inspector `Target` envelope.
//!
//! Inspectors on devices at or above the version gate refuse direct protocol
//! traffic: every message other than `Target.*` control messages must travel
//! as a JSON string embedded in a `Target.sendMessageToTarget` command, and
//! everything the page emits arrives embedded in
//! `Target.dispatchMessageFromTarget` events. The debugger-facing side of the
//! relay never sees the envelope.

use serde_json::{Value, json};

use crate::errors::CdpError;
use crate::message::ProtocolMessage;

/// Command that tunnels a debugger message to a target.
pub const SEND_MESSAGE_TO_TARGET: &str = "Target.sendMessageToTarget";
/// Event that tunnels a target message to the debugger.
pub const DISPATCH_MESSAGE_FROM_TARGET: &str = "Target.dispatchMessageFromTarget";
/// Event announcing that a debuggable target exists.
pub const TARGET_CREATED: &str = "Target.targetCreated";

/// Whether a method belongs to the `Target` control domain.
pub fn is_target_domain(method: &str) -> bool {
    method.starts_with("Target.")
}

/// Wrap a message in a `Target.sendMessageToTarget` envelope.
///
/// The outer command reuses the inner message's `id` (the relay never invents
/// ids); events wrap without one. The inner message is embedded verbatim as a
/// JSON string.
pub fn wrap_for_target(
    message: &ProtocolMessage,
    target_id: &str,
) -> Result<ProtocolMessage, CdpError> {
    let embedded = message.to_wire()?;
    let mut params = json!({
        "message": embedded,
        "targetId": target_id,
    });
    let mut envelope = json!({ "method": SEND_MESSAGE_TO_TARGET });
    if let Some(id) = message.id() {
        params["id"] = json!(id);
        envelope["id"] = json!(id);
    }
    envelope["params"] = params;
    Ok(ProtocolMessage::from_value(envelope))
}

/// Unwrap the message embedded in a `Target.dispatchMessageFromTarget` event.
///
/// Returns `Ok(None)` when the message is not a dispatch event. Malformed
/// embedded JSON is a protocol error for that message only.
pub fn unwrap_from_target(
    message: &ProtocolMessage,
) -> Result<Option<ProtocolMessage>, CdpError> {
    if !message.is_method(DISPATCH_MESSAGE_FROM_TARGET) {
        return Ok(None);
    }
    let embedded = message
        .params()
        .and_then(|p| p.get("message"))
        .and_then(Value::as_str)
        .ok_or(CdpError::Envelope("missing `message` field"))?;
    Ok(Some(ProtocolMessage::parse(embedded)?))
}

/// The target id announced by a `Target.targetCreated` event, if this is one.
pub fn created_target_id(message: &ProtocolMessage) -> Option<&str> {
    if !message.is_method(TARGET_CREATED) {
        return None;
    }
    message
        .params()
        .and_then(|p| p.get("targetInfo"))
        .and_then(|t| t.get("targetId"))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrap_command_reuses_inner_id() {
        let inner = ProtocolMessage::from_value(json!({"id": 5, "method": "Debugger.enable"}));
        let wrapped = wrap_for_target(&inner, "page-1").unwrap();
        assert_eq!(wrapped.id(), Some(5));
        assert_eq!(wrapped.method(), Some(SEND_MESSAGE_TO_TARGET));
        let params = wrapped.params().unwrap();
        assert_eq!(params["id"], 5);
        assert_eq!(params["targetId"], "page-1");
        assert_eq!(
            params["message"],
            "{\"id\":5,\"method\":\"Debugger.enable\"}"
        );
    }

    #[test]
    fn wrap_event_has_no_id() {
        let inner = ProtocolMessage::from_value(json!({"method": "Runtime.enable"}));
        let wrapped = wrap_for_target(&inner, "page-1").unwrap();
        assert_eq!(wrapped.id(), None);
        assert!(wrapped.params().unwrap().get("id").is_none());
    }

    #[test]
    fn unwrap_round_trips_wrapped_message() {
        let inner = ProtocolMessage::from_value(
            json!({"id": 9, "method": "Runtime.evaluate", "params": {"expression": "1+1"}}),
        );
        let wrapped = wrap_for_target(&inner, "t").unwrap();
        // Simulate the device echoing the envelope back as a dispatch event.
        let dispatched = ProtocolMessage::from_value(json!({
            "method": DISPATCH_MESSAGE_FROM_TARGET,
            "params": {
                "targetId": "t",
                "message": wrapped.params().unwrap()["message"],
            }
        }));
        let unwrapped = unwrap_from_target(&dispatched).unwrap().unwrap();
        assert_eq!(unwrapped, inner);
    }

    #[test]
    fn unwrap_ignores_other_methods() {
        let msg = ProtocolMessage::from_value(json!({"method": "Debugger.scriptParsed"}));
        assert!(unwrap_from_target(&msg).unwrap().is_none());
    }

    #[test]
    fn unwrap_missing_message_field_is_envelope_error() {
        let msg = ProtocolMessage::from_value(
            json!({"method": DISPATCH_MESSAGE_FROM_TARGET, "params": {"targetId": "t"}}),
        );
        assert!(matches!(
            unwrap_from_target(&msg),
            Err(CdpError::Envelope(_))
        ));
    }

    #[test]
    fn unwrap_malformed_embedded_json_is_parse_error() {
        let msg = ProtocolMessage::from_value(json!({
            "method": DISPATCH_MESSAGE_FROM_TARGET,
            "params": {"message": "{broken"},
        }));
        assert!(matches!(unwrap_from_target(&msg), Err(CdpError::Parse(_))));
    }

    #[test]
    fn created_target_id_reads_target_info() {
        let msg = ProtocolMessage::from_value(json!({
            "method": TARGET_CREATED,
            "params": {"targetInfo": {"targetId": "page-7", "type": "page"}},
        }));
        assert_eq!(created_target_id(&msg), Some("page-7"));
    }

    #[test]
    fn created_target_id_none_for_other_events() {
        let msg = ProtocolMessage::from_value(json!({"method": "Target.targetDestroyed"}));
        assert_eq!(created_target_id(&msg), None);
    }

    #[test]
    fn target_domain_detection() {
        assert!(is_target_domain("Target.sendMessageToTarget"));
        assert!(is_target_domain("Target.targetCreated"));
        assert!(!is_target_domain("Debugger.enable"));
        assert!(!is_target_domain("TargetX.enable"));
    }
}
