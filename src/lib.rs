//! Hey There - voice skill that relays a spoken message by SMS
//!
//! Collects a recipient and a message across two turns, then texts one of a
//! small fixed set of preconfigured numbers.

pub mod config;
pub mod error;
pub mod directory;
pub mod state;
pub mod event;
pub mod response;
pub mod dispatch;
pub mod dialog;

pub use dialog::SkillHandler;
pub use error::{Error, Result};
