//! Recipient directory - maps a spoken name to a configured phone number
//!
//! The alias table is fixed: names are matched case-insensitively against the
//! start of each family's aliases, in order, and the first match wins.

use crate::config::Config;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Which configured number an alias family resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientFamily {
    Mom,
    Dad,
}

impl fmt::Display for RecipientFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipientFamily::Mom => write!(f, "mom"),
            RecipientFamily::Dad => write!(f, "dad"),
        }
    }
}

/// Alias patterns in match order
static ALIAS_PATTERNS: Lazy<Vec<(Regex, RecipientFamily)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)^(mom|mum|mother|ma|dan)").unwrap(),
            RecipientFamily::Mom,
        ),
        (
            Regex::new(r"(?i)^(dad|father|pa|pop|ty)").unwrap(),
            RecipientFamily::Dad,
        ),
    ]
});

/// A delivery address (E.164 phone number)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    pub fn new(number: &str) -> Self {
        Self(normalize_phone(number))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the directory
#[derive(Debug, Clone, PartialEq)]
pub struct RecipientEntry {
    pub family: RecipientFamily,
    pub address: Address,
}

/// Immutable, ordered recipient table
#[derive(Debug, Clone)]
pub struct Directory {
    entries: Vec<RecipientEntry>,
}

impl Directory {
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.mom_number, &config.dad_number)
    }

    pub fn new(mom_number: &str, dad_number: &str) -> Self {
        Self {
            entries: vec![
                RecipientEntry {
                    family: RecipientFamily::Mom,
                    address: Address::new(mom_number),
                },
                RecipientEntry {
                    family: RecipientFamily::Dad,
                    address: Address::new(dad_number),
                },
            ],
        }
    }

    /// Resolve a recipient name to its configured address
    pub fn resolve(&self, name: &str) -> Result<&Address> {
        let family = match_family(name).ok_or_else(|| Error::RecipientNotFound {
            attempted_name: name.to_string(),
        })?;

        self.entries
            .iter()
            .find(|e| e.family == family)
            .map(|e| &e.address)
            .ok_or_else(|| Error::RecipientNotFound {
                attempted_name: name.to_string(),
            })
    }

    pub fn entries(&self) -> &[RecipientEntry] {
        &self.entries
    }
}

/// First alias family whose pattern matches the start of `name`
pub fn match_family(name: &str) -> Option<RecipientFamily> {
    let name = name.trim();
    ALIAS_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(name))
        .map(|(_, family)| *family)
}

/// Normalize phone number to E.164 format
pub fn normalize_phone(phone: &str) -> String {
    let has_plus = phone.trim_start().starts_with('+');
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if !has_plus && digits.len() == 10 {
        // Assume US number
        format!("+1{}", digits)
    } else {
        format!("+{}", digits)
    }
}
