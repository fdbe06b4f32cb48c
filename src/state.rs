//! Conversation state carried between turns in the platform's session attributes

use serde::{Deserialize, Serialize};

/// Slot values accumulated over a conversation
///
/// The platform stores this between turns; each turn returns a new value
/// produced by [`ConversationState::merge`], never an in-place edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Where the conversation stands, derived from which fields are set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogStage {
    Idle,
    AwaitingMessage,
    Complete,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipients(to: &str, from: &str) -> Self {
        Self {
            to: Some(to.to_string()),
            from: Some(from.to_string()),
            message: None,
        }
    }

    pub fn with_message(message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Overlay `new_fields` onto `self`; set fields in `new_fields` win, unset ones keep the old value
    pub fn merge(&self, new_fields: &ConversationState) -> ConversationState {
        ConversationState {
            to: new_fields.to.clone().or_else(|| self.to.clone()),
            from: new_fields.from.clone().or_else(|| self.from.clone()),
            message: new_fields.message.clone().or_else(|| self.message.clone()),
        }
    }

    pub fn stage(&self) -> DialogStage {
        match (&self.to, &self.from, &self.message) {
            (Some(_), Some(_), Some(_)) => DialogStage::Complete,
            (Some(_), Some(_), None) => DialogStage::AwaitingMessage,
            _ => DialogStage::Idle,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to.is_none() && self.from.is_none() && self.message.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_merge_overlays_new_values() {
        let prev = ConversationState::with_recipients("Mom", "Alex");
        let merged = prev.merge(&ConversationState::with_message("Running late"));
        assert_eq!(merged.to.as_deref(), Some("Mom"));
        assert_eq!(merged.from.as_deref(), Some("Alex"));
        assert_eq!(merged.message.as_deref(), Some("Running late"));
        // previous value untouched
        assert_eq!(prev.message, None);
    }

    #[test]
    fn test_merge_new_wins_on_conflict() {
        let prev = ConversationState::with_recipients("Mom", "Alex");
        let merged = prev.merge(&ConversationState::with_recipients("Dad", "Sam"));
        assert_eq!(merged, ConversationState::with_recipients("Dad", "Sam"));
    }

    #[test]
    fn test_stage() {
        assert_eq!(ConversationState::new().stage(), DialogStage::Idle);
        assert_eq!(ConversationState::with_message("hi").stage(), DialogStage::Idle);
        let awaiting = ConversationState::with_recipients("Mom", "Alex");
        assert_eq!(awaiting.stage(), DialogStage::AwaitingMessage);
        assert_eq!(
            awaiting.merge(&ConversationState::with_message("hi")).stage(),
            DialogStage::Complete
        );
    }

    #[test]
    fn test_serialize_omits_unset_fields() {
        let json = serde_json::to_value(ConversationState::with_recipients("Mom", "Alex")).unwrap();
        assert_eq!(json, serde_json::json!({"to": "Mom", "from": "Alex"}));
        assert_eq!(
            serde_json::to_value(ConversationState::new()).unwrap(),
            serde_json::json!({})
        );
    }

    #[test]
    fn test_deserialize_ignores_unknown_keys() {
        let state: ConversationState =
            serde_json::from_str(r#"{"to":"Dad","other":1}"#).unwrap();
        assert_eq!(state.to.as_deref(), Some("Dad"));
        assert!(state.from.is_none());
    }

    fn arb_field() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[a-zA-Z ]{1,12}")
    }

    fn arb_state() -> impl Strategy<Value = ConversationState> {
        (arb_field(), arb_field(), arb_field())
            .prop_map(|(to, from, message)| ConversationState { to, from, message })
    }

    proptest! {
        #[test]
        fn prop_merge_never_unsets(prev in arb_state(), new in arb_state()) {
            let merged = prev.merge(&new);
            prop_assert!(prev.to.is_none() || merged.to.is_some());
            prop_assert!(prev.from.is_none() || merged.from.is_some());
            prop_assert!(prev.message.is_none() || merged.message.is_some());
        }

        #[test]
        fn prop_recipient_merge_preserves_message(
            prev in arb_state(),
            to in "[a-zA-Z]{1,10}",
            from in "[a-zA-Z]{1,10}",
        ) {
            let merged = prev.merge(&ConversationState::with_recipients(&to, &from));
            prop_assert_eq!(merged.to.as_deref(), Some(to.as_str()));
            prop_assert_eq!(merged.from.as_deref(), Some(from.as_str()));
            prop_assert_eq!(merged.message, prev.message);
        }
    }
}
