//! Inbound issue report model and validation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Minimum number of non-whitespace characters a description must carry
pub const MIN_DESCRIPTION_CHARS: usize = 10;

/// Priority hint supplied by the reporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait
    Low,
    /// Normal handling
    #[default]
    Medium,
    /// Needs attention soon
    High,
    /// Safety-relevant, handle immediately
    Urgent,
}

/// A resident's issue report as accepted by the analyze endpoint.
///
/// Only `description` is required. Unknown top-level fields are dropped on
/// intake; forward-compatible extras belong in the `context` bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    /// Free-text description of the issue
    pub description: String,

    /// Optional location (address, intersection, landmark)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Optional key/value context forwarded untouched to the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,

    /// Optional priority hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl IssueRequest {
    /// Build a minimal request from a description, for local tooling
    #[must_use]
    pub fn from_description(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            location: None,
            context: None,
            priority: None,
        }
    }

    /// Validate the request before any classification or routing happens.
    ///
    /// Whitespace does not count toward the minimum length, so a padded or
    /// blank description is rejected the same way an empty one is.
    pub fn validate(&self) -> Result<()> {
        let meaningful = self
            .description
            .chars()
            .filter(|c| !c.is_whitespace())
            .count();

        if meaningful == 0 {
            return Err(Error::Validation("Description is required".to_string()));
        }
        if meaningful < MIN_DESCRIPTION_CHARS {
            return Err(Error::Validation(format!(
                "Description too short (minimum {MIN_DESCRIPTION_CHARS} characters)"
            )));
        }

        Ok(())
    }

    /// Priority with the default applied
    #[must_use]
    pub fn priority_or_default(&self) -> Priority {
        self.priority.unwrap_or_default()
    }
}
