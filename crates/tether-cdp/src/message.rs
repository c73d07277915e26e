//! Untyped view over a CDP protocol message.
//!
//! The relay never needs the full typed protocol: it forwards most traffic
//! untouched and rewrites a small number of fields in place. Messages are
//! therefore kept as [`serde_json::Value`] with accessors for the envelope
//! fields, the same way the server treats RPC frames as untyped JSON until a
//! handler needs a specific field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CdpError;

/// Classification of a protocol message by its envelope fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// `id` + `method`: a request expecting a reply.
    Command,
    /// `id` + (`result` | `error`): a reply to an earlier command.
    Reply,
    /// `method` without `id`: a notification.
    Event,
    /// Anything else (unknown shapes are forwarded, never dropped here).
    Other,
}

/// A single CDP message.
///
/// Wraps the raw JSON value. The relay only ever rewrites fields inside an
/// existing envelope; it never invents `id`s (synthesized messages draw their
/// ids from the session handler's own counter).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolMessage {
    value: Value,
}

impl ProtocolMessage {
    /// Wrap an already-parsed JSON value.
    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    /// Parse a message from a raw text frame.
    pub fn parse(text: &str) -> Result<Self, CdpError> {
        Ok(Self {
            value: serde_json::from_str(text)?,
        })
    }

    /// Serialize back to a wire frame.
    pub fn to_wire(&self) -> Result<String, CdpError> {
        Ok(serde_json::to_string(&self.value)?)
    }

    /// The command/reply id, if present.
    pub fn id(&self) -> Option<i64> {
        self.value.get("id").and_then(Value::as_i64)
    }

    /// The method name, if present.
    pub fn method(&self) -> Option<&str> {
        self.value.get("method").and_then(Value::as_str)
    }

    /// The `params` object, if present.
    pub fn params(&self) -> Option<&Value> {
        self.value.get("params")
    }

    /// Mutable access to the `params` object, if present.
    pub fn params_mut(&mut self) -> Option<&mut Value> {
        self.value.get_mut("params")
    }

    /// The `result` object of a reply, if present.
    pub fn result(&self) -> Option<&Value> {
        self.value.get("result")
    }

    /// Mutable access to the `result` object, if present.
    pub fn result_mut(&mut self) -> Option<&mut Value> {
        self.value.get_mut("result")
    }

    /// The `error` object of a failed reply, if present.
    pub fn error(&self) -> Option<&Value> {
        self.value.get("error")
    }

    /// Classify the message by its envelope fields.
    pub fn kind(&self) -> MessageKind {
        let has_id = self.value.get("id").is_some();
        let has_method = self.value.get("method").is_some();
        let has_outcome = self.value.get("result").is_some() || self.value.get("error").is_some();
        match (has_id, has_method, has_outcome) {
            (true, true, _) => MessageKind::Command,
            (true, false, true) => MessageKind::Reply,
            (false, true, _) => MessageKind::Event,
            _ => MessageKind::Other,
        }
    }

    /// Whether the method name matches exactly.
    pub fn is_method(&self, method: &str) -> bool {
        self.method() == Some(method)
    }

    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Mutable access to the underlying JSON value.
    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Consume into the underlying JSON value.
    pub fn into_value(self) -> Value {
        self.value
    }
}

impl From<Value> for ProtocolMessage {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_has_id_and_method() {
        let msg = ProtocolMessage::from_value(json!({"id": 5, "method": "Debugger.enable"}));
        assert_eq!(msg.kind(), MessageKind::Command);
        assert_eq!(msg.id(), Some(5));
        assert_eq!(msg.method(), Some("Debugger.enable"));
    }

    #[test]
    fn reply_has_id_and_result() {
        let msg = ProtocolMessage::from_value(json!({"id": 5, "result": {}}));
        assert_eq!(msg.kind(), MessageKind::Reply);
        assert!(msg.result().is_some());
        assert!(msg.method().is_none());
    }

    #[test]
    fn error_reply_classifies_as_reply() {
        let msg =
            ProtocolMessage::from_value(json!({"id": 7, "error": {"code": -32000, "message": "x"}}));
        assert_eq!(msg.kind(), MessageKind::Reply);
        assert!(msg.error().is_some());
    }

    #[test]
    fn event_has_method_without_id() {
        let msg = ProtocolMessage::from_value(
            json!({"method": "Debugger.scriptParsed", "params": {"url": "http://x/a.js"}}),
        );
        assert_eq!(msg.kind(), MessageKind::Event);
        assert_eq!(msg.params().unwrap()["url"], "http://x/a.js");
    }

    #[test]
    fn bare_object_is_other() {
        let msg = ProtocolMessage::from_value(json!({}));
        assert_eq!(msg.kind(), MessageKind::Other);
    }

    #[test]
    fn parse_round_trips_wire_text() {
        let msg = ProtocolMessage::parse(r#"{"id":1,"method":"Runtime.enable"}"#).unwrap();
        let wire = msg.to_wire().unwrap();
        let back = ProtocolMessage::parse(&wire).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn parse_rejects_invalid_json() {
        assert!(ProtocolMessage::parse("{not json").is_err());
    }

    #[test]
    fn params_mut_rewrites_in_place() {
        let mut msg = ProtocolMessage::from_value(
            json!({"method": "Debugger.scriptParsed", "params": {"url": "old"}}),
        );
        msg.params_mut().unwrap()["url"] = json!("new");
        assert_eq!(msg.params().unwrap()["url"], "new");
    }

    #[test]
    fn non_integer_id_reads_as_none() {
        let msg = ProtocolMessage::from_value(json!({"id": "five", "method": "m"}));
        assert_eq!(msg.id(), None);
    }

    #[test]
    fn is_method_matches_exactly() {
        let msg = ProtocolMessage::from_value(json!({"method": "Runtime.enable"}));
        assert!(msg.is_method("Runtime.enable"));
        assert!(!msg.is_method("Runtime"));
    }
}
