//! Configuration from the environment

use crate::error::{Error, Result};
use std::time::Duration;

/// Relay that accepts `number` + `message` form posts
pub const DEFAULT_RELAY_URL: &str = "http://textbelt.com/text";

/// Upper bound on a single outbound send
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;

/// All configurable values
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Every invocation must carry this application id
    pub expected_application_id: String,
    pub mom_number: String,
    pub dad_number: String,
    pub relay_url: String,
    pub send_timeout: Duration,
}

impl Config {
    /// Read `SKILL_ID`, `M_NUM` and `D_NUM` (required) plus the optional relay overrides
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{} is not set", key)))
        };

        let send_timeout = match lookup("HEY_THERE_SEND_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    Error::Config(format!("HEY_THERE_SEND_TIMEOUT_SECS is not a number: {}", raw))
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
        };

        Ok(Self {
            expected_application_id: required("SKILL_ID")?,
            mom_number: required("M_NUM")?,
            dad_number: required("D_NUM")?,
            relay_url: lookup("HEY_THERE_RELAY_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
            send_timeout,
        })
    }

    /// Create config for testing with fixed values
    pub fn for_test() -> Self {
        Self {
            expected_application_id: "amzn1.ask.skill.test-hey-there".to_string(),
            mom_number: "617-555-0101".to_string(),
            dad_number: "(617) 555-0102".to_string(),
            relay_url: "http://127.0.0.1:9/text".to_string(),
            send_timeout: Duration::from_secs(2),
        }
    }
}

/// Mask all but the last four digits of a number for display
pub fn mask_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 4 {
        return "*".repeat(digits.len());
    }
    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(digits.len() - 4), tail)
}
