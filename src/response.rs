//! Platform response envelope

use crate::state::ConversationState;
use serde::{Deserialize, Serialize};

pub const RESPONSE_VERSION: &str = "1.0";
pub const CARD_TITLE: &str = "Hey There!";
pub const CARD_NAMESPACE: &str = "SessionSpeechlet - ";

/// What to say this turn, before it is wrapped for the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    pub title: String,
    pub spoken_text: String,
    pub reprompt_text: Option<String>,
    pub end_session: bool,
}

impl ResponseDescriptor {
    /// Keep the session open and reprompt with `reprompt`
    pub fn ask(spoken_text: impl Into<String>, reprompt: impl Into<String>) -> Self {
        Self {
            title: CARD_TITLE.to_string(),
            spoken_text: spoken_text.into(),
            reprompt_text: Some(reprompt.into()),
            end_session: false,
        }
    }

    /// Speak and end the session
    pub fn tell(spoken_text: impl Into<String>) -> Self {
        Self {
            title: CARD_TITLE.to_string(),
            spoken_text: spoken_text.into(),
            reprompt_text: None,
            end_session: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub version: String,
    pub session_attributes: ConversationState,
    pub response: SpeechletResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechletResponse {
    pub output_speech: OutputSpeech,
    pub card: Card,
    pub reprompt: Reprompt,
    pub should_end_session: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpeech {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl OutputSpeech {
    pub fn plain_text(text: &str) -> Self {
        Self {
            kind: "PlainText".to_string(),
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

/// Render a descriptor and the updated state into the platform envelope
pub fn build(state: &ConversationState, descriptor: &ResponseDescriptor) -> TurnResponse {
    TurnResponse {
        version: RESPONSE_VERSION.to_string(),
        session_attributes: state.clone(),
        response: SpeechletResponse {
            output_speech: OutputSpeech::plain_text(&descriptor.spoken_text),
            card: Card {
                kind: "Simple".to_string(),
                title: format!("{}{}", CARD_NAMESPACE, descriptor.title),
                content: format!("{}{}", CARD_NAMESPACE, descriptor.spoken_text),
            },
            reprompt: Reprompt {
                output_speech: OutputSpeech::plain_text(
                    descriptor.reprompt_text.as_deref().unwrap_or(""),
                ),
            },
            should_end_session: descriptor.end_session,
        },
    }
}

impl TurnResponse {
    pub fn spoken_text(&self) -> &str {
        &self.response.output_speech.text
    }

    pub fn ends_session(&self) -> bool {
        self.response.should_end_session
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
