//! Dialog state machine
//!
//! Each invocation is handled independently: the platform hands back the
//! previous [`ConversationState`], [`transition`] decides the next state and
//! what to say, and [`SkillHandler`] performs the one side effect (the SMS
//! send) before rendering the response.

use crate::config::Config;
use crate::directory::Directory;
use crate::dispatch::{NotificationDispatcher, SmsTransport};
use crate::error::{Error, Result};
use crate::event::*;
use crate::response::{build, ResponseDescriptor, TurnResponse};
use crate::state::{ConversationState, DialogStage};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const WELCOME_REPROMPT: &str = "Start by saying, send a message to Danielle";
pub const MESSAGE_REPROMPT: &str = "What's the message?";
pub const SENT_TEXT: &str = "OK, sending your message!";
pub const CANCEL_TEXT: &str = "Ok, cancelling your message.";

/// Result of applying one event to the conversation
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Speak `descriptor` and hand `state` back to the platform
    Respond {
        state: ConversationState,
        descriptor: ResponseDescriptor,
    },
    /// All slots are filled: send the SMS, then end the session
    Dispatch { state: ConversationState },
    /// Notification-only event, nothing to send back
    Silent,
}

pub fn welcome_text() -> String {
    format!(
        "Hey There! is a simple tool allowing you to send messages to a preconfigured set of friends. {}",
        WELCOME_REPROMPT
    )
}

pub fn recipients_text(to: &str, from: &str) -> String {
    format!(
        "Alright, sending a message to {} from {}. {}",
        to, from, MESSAGE_REPROMPT
    )
}

/// Decide the next state and response for `event`; performs no I/O
pub fn transition(previous: &ConversationState, event: &TurnEvent) -> Result<Transition> {
    match event {
        TurnEvent::SessionStart => Ok(welcome(previous)),
        TurnEvent::SessionEnd { .. } => Ok(Transition::Silent),
        TurnEvent::Intent(intent) => match intent.name.as_str() {
            INTENT_TO_FROM => specify_recipients(previous, intent),
            INTENT_MESSAGE_BODY => {
                let message = intent.require_slot(SLOT_MESSAGE)?;
                Ok(Transition::Dispatch {
                    state: previous.merge(&ConversationState::with_message(message)),
                })
            }
            INTENT_LEGACY_SINGLE_STEP => match intent.slot(SLOT_MESSAGE) {
                Some(message) => {
                    let recipients = recipients_from(intent)?;
                    Ok(Transition::Dispatch {
                        state: previous
                            .merge(&recipients)
                            .merge(&ConversationState::with_message(message)),
                    })
                }
                None => specify_recipients(previous, intent),
            },
            INTENT_HELP => Ok(welcome(previous)),
            INTENT_CANCEL | INTENT_STOP => Ok(Transition::Respond {
                state: previous.clone(),
                descriptor: ResponseDescriptor::tell(CANCEL_TEXT),
            }),
            other => Err(Error::InvalidIntent(other.to_string())),
        },
    }
}

fn welcome(previous: &ConversationState) -> Transition {
    Transition::Respond {
        state: previous.clone(),
        descriptor: ResponseDescriptor::ask(welcome_text(), WELCOME_REPROMPT),
    }
}

fn recipients_from(intent: &Intent) -> Result<ConversationState> {
    let to = intent.require_slot(SLOT_TO)?;
    let from = intent.require_slot(SLOT_FROM)?;
    Ok(ConversationState::with_recipients(to, from))
}

fn specify_recipients(previous: &ConversationState, intent: &Intent) -> Result<Transition> {
    let recipients = recipients_from(intent)?;
    let state = previous.merge(&recipients);
    let descriptor = ResponseDescriptor::ask(
        recipients_text(
            state.to.as_deref().unwrap_or_default(),
            state.from.as_deref().unwrap_or_default(),
        ),
        MESSAGE_REPROMPT,
    );
    Ok(Transition::Respond { state, descriptor })
}

/// Entry point for one platform invocation
#[derive(Clone)]
pub struct SkillHandler {
    expected_application_id: String,
    dispatcher: NotificationDispatcher,
}

impl SkillHandler {
    pub fn new(config: &Config, transport: Arc<dyn SmsTransport>) -> Self {
        Self {
            expected_application_id: config.expected_application_id.clone(),
            dispatcher: NotificationDispatcher::new(Directory::from_config(config), transport),
        }
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Parse and handle a raw JSON event
    ///
    /// The application id is read from the untyped payload and checked before
    /// the rest of the envelope is decoded.
    pub fn handle_json(&self, raw: &str) -> Result<Option<TurnResponse>> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let application_id = value
            .pointer("/session/application/applicationId")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        self.verify_application_id(application_id)?;

        let envelope: RequestEnvelope = serde_json::from_value(value)?;
        self.run_turn(&envelope.into_turn()?)
    }

    /// Handle one invocation; `None` means the event expects no response body
    pub fn handle(&self, envelope: RequestEnvelope) -> Result<Option<TurnResponse>> {
        self.verify_application_id(envelope.application_id())?;
        let turn = envelope.into_turn()?;
        self.run_turn(&turn)
    }

    /// Handle an already decoded turn, gated on its application id
    pub fn handle_turn(&self, turn: &Turn) -> Result<Option<TurnResponse>> {
        self.verify_application_id(&turn.application_id)?;
        self.run_turn(turn)
    }

    fn verify_application_id(&self, application_id: &str) -> Result<()> {
        info!("event.session.application.applicationId={}", application_id);
        if application_id != self.expected_application_id {
            warn!("Rejecting invocation for application {}", application_id);
            return Err(Error::InvalidApplicationId {
                received: application_id.to_string(),
            });
        }
        Ok(())
    }

    fn run_turn(&self, turn: &Turn) -> Result<Option<TurnResponse>> {
        if turn.new_session {
            info!(
                request_id = %turn.request_id,
                session_id = %turn.session_id,
                "onSessionStarted"
            );
        }

        match &turn.event {
            TurnEvent::SessionStart => {
                info!(request_id = %turn.request_id, session_id = %turn.session_id, "onLaunch");
            }
            TurnEvent::Intent(intent) => {
                info!(
                    request_id = %turn.request_id,
                    session_id = %turn.session_id,
                    intent = %intent.name,
                    "onIntent"
                );
            }
            TurnEvent::SessionEnd { reason } => {
                info!(
                    request_id = %turn.request_id,
                    session_id = %turn.session_id,
                    reason = reason.as_deref().unwrap_or("unspecified"),
                    "onSessionEnded"
                );
            }
        }

        match transition(&turn.attributes, &turn.event)? {
            Transition::Respond { state, descriptor } => {
                debug!(?state, stage = ?state.stage(), "Updated session attributes");
                Ok(Some(build(&state, &descriptor)))
            }
            Transition::Dispatch { state } => {
                debug!(?state, stage = ?state.stage(), "Updated session attributes");
                let descriptor = self.dispatch(&state)?;
                Ok(Some(build(&state, &descriptor)))
            }
            Transition::Silent => Ok(None),
        }
    }

    /// Send the SMS; recipient and transport failures become the spoken reply
    fn dispatch(&self, state: &ConversationState) -> Result<ResponseDescriptor> {
        if state.stage() != DialogStage::Complete {
            debug!(stage = ?state.stage(), "Message body arrived before recipients");
        }

        match self.dispatcher.deliver(state) {
            Ok(ack) => {
                info!(?ack, "Message dispatched");
                Ok(ResponseDescriptor::tell(SENT_TEXT))
            }
            Err(e) if e.is_soft() => {
                warn!("Message not sent: {}", e);
                Ok(ResponseDescriptor::tell(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}
