//! Inbound turn events
//!
//! Wire types mirror the platform's request envelope; [`Turn`] is the
//! validated form the dialog works with.

use crate::error::{Error, Result};
use crate::state::ConversationState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const INTENT_TO_FROM: &str = "HeyThereToFrom";
pub const INTENT_MESSAGE_BODY: &str = "MessageBody";
pub const INTENT_LEGACY_SINGLE_STEP: &str = "HeyThere";
pub const INTENT_HELP: &str = "AMAZON.HelpIntent";
pub const INTENT_CANCEL: &str = "AMAZON.CancelIntent";
pub const INTENT_STOP: &str = "AMAZON.StopIntent";

pub const SLOT_TO: &str = "To";
pub const SLOT_FROM: &str = "From";
pub const SLOT_MESSAGE: &str = "Message";

/// Raw invocation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(default)]
    pub version: Option<String>,
    pub session: SessionInfo,
    pub request: RequestBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    #[serde(default)]
    pub new: bool,
    pub session_id: String,
    pub application: Application,
    /// `null` or absent on a fresh session
    #[serde(default)]
    pub attributes: Option<ConversationState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub application_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub request_id: String,
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// An intent as resolved by the platform, with its slot values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    #[serde(default)]
    pub slots: BTreeMap<String, Slot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl Intent {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            slots: BTreeMap::new(),
        }
    }

    pub fn with_slot(mut self, slot: &str, value: &str) -> Self {
        self.slots.insert(
            slot.to_string(),
            Slot {
                name: Some(slot.to_string()),
                value: Some(value.to_string()),
            },
        );
        self
    }

    /// Slot value, treating absent or blank values as missing
    pub fn slot(&self, slot: &str) -> Option<&str> {
        self.slots
            .get(slot)
            .and_then(|s| s.value.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn require_slot(&self, slot: &str) -> Result<&str> {
        self.slot(slot).ok_or_else(|| Error::MissingSlot {
            intent: self.name.clone(),
            slot: slot.to_string(),
        })
    }
}

/// What happened this turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    SessionStart,
    Intent(Intent),
    SessionEnd { reason: Option<String> },
}

/// One validated invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub application_id: String,
    pub session_id: String,
    pub request_id: String,
    pub new_session: bool,
    pub attributes: ConversationState,
    pub event: TurnEvent,
}

impl RequestEnvelope {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn application_id(&self) -> &str {
        &self.session.application.application_id
    }

    /// Convert into a [`Turn`], rejecting unknown request types
    pub fn into_turn(self) -> Result<Turn> {
        let event = match self.request.kind.as_str() {
            "LaunchRequest" => TurnEvent::SessionStart,
            "IntentRequest" => {
                let intent = self
                    .request
                    .intent
                    .ok_or_else(|| Error::InvalidIntent("IntentRequest without intent".to_string()))?;
                TurnEvent::Intent(intent)
            }
            "SessionEndedRequest" => TurnEvent::SessionEnd {
                reason: self.request.reason,
            },
            other => return Err(Error::UnknownRequestType(other.to_string())),
        };

        Ok(Turn {
            application_id: self.session.application.application_id,
            session_id: self.session.session_id,
            request_id: self.request.request_id,
            new_session: self.session.new,
            attributes: self.session.attributes.unwrap_or_default(),
            event,
        })
    }
}
