//! Mutable per-session handler state.
//!
//! One record per debugging session, owned by the session's handler and
//! mutated only inside the single message-processing path. The relay
//! serializes processing, so no locking happens here.

/// State a handler accumulates over the life of one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerState {
    /// Remote target identifier; empty until announced by the application.
    pub target_id: String,
    /// Monotonic id counter for messages the handler synthesizes itself.
    /// The relay never invents ids for relayed traffic.
    pub custom_message_last_id: i64,
    /// One-shot flag: the backward-compatibility bootstrap has run.
    pub is_backcompat_configured: bool,
    /// Whether the session speaks the `Target`-envelope dialect. Fixed at
    /// session start from the device's OS version.
    pub is_targeted: bool,
    /// Dev-server port suffix (`":8100"`) discovered from script URLs.
    /// Written at most once, then frozen.
    application_port_part: Option<String>,
}

impl HandlerState {
    /// Fresh state for a new session.
    pub fn new(is_targeted: bool) -> Self {
        Self {
            target_id: String::new(),
            custom_message_last_id: 0,
            is_backcompat_configured: false,
            is_targeted,
            application_port_part: None,
        }
    }

    /// Next id for a synthesized message.
    pub fn next_custom_id(&mut self) -> i64 {
        self.custom_message_last_id += 1;
        self.custom_message_last_id
    }

    /// Record the discovered dev-server port suffix. The first write wins;
    /// later calls are ignored.
    pub fn record_port_part(&mut self, part: impl Into<String>) {
        if self.application_port_part.is_none() {
            self.application_port_part = Some(part.into());
        }
    }

    /// The discovered dev-server port suffix, if any.
    pub fn port_part(&self) -> Option<&str> {
        self.application_port_part.as_deref()
    }

    /// Reset the one-shot flags after the debugger connection closed, so a
    /// reconnecting client goes through the bootstrap again.
    pub fn reset_one_shot_flags(&mut self) {
        self.is_backcompat_configured = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_empty() {
        let state = HandlerState::new(true);
        assert!(state.target_id.is_empty());
        assert_eq!(state.custom_message_last_id, 0);
        assert!(!state.is_backcompat_configured);
        assert!(state.is_targeted);
        assert!(state.port_part().is_none());
    }

    #[test]
    fn custom_ids_are_monotonic() {
        let mut state = HandlerState::new(false);
        assert_eq!(state.next_custom_id(), 1);
        assert_eq!(state.next_custom_id(), 2);
        assert_eq!(state.next_custom_id(), 3);
    }

    #[test]
    fn port_part_first_write_wins() {
        let mut state = HandlerState::new(false);
        state.record_port_part(":8100");
        state.record_port_part(":9000");
        assert_eq!(state.port_part(), Some(":8100"));
    }

    #[test]
    fn reset_clears_bootstrap_flag_only() {
        let mut state = HandlerState::new(true);
        state.is_backcompat_configured = true;
        state.target_id = "page-1".into();
        state.record_port_part(":8100");
        state.reset_one_shot_flags();
        assert!(!state.is_backcompat_configured);
        // Target identity and the discovered port survive a debugger
        // reconnect; they describe the application side.
        assert_eq!(state.target_id, "page-1");
        assert_eq!(state.port_part(), Some(":8100"));
    }
}
