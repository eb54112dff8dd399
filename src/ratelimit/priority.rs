//! Priority tiers for admission decisions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The priority tier of a request.
///
/// Both tiers draw from the same bucket; they differ only in the token
/// level required for admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Admitted while at least one token remains
    High,
    /// Admitted only while the bucket holds at least the reserve floor
    Low,
}

/// Returned when a string does not name a known priority tier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown priority: {0:?}")]
pub struct ParsePriorityError(pub String);

impl Priority {
    /// Convert from a raw numeric priority code.
    ///
    /// `0` is high and `1` is low. Any other code is unrecognized.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Priority::High),
            1 => Some(Priority::Low),
            _ => None,
        }
    }

    /// Convert to the raw numeric priority code.
    pub fn code(&self) -> i32 {
        match self {
            Priority::High => 0,
            Priority::Low => 1,
        }
    }

    /// Get the lowercase name of this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("high") {
            Ok(Priority::High)
        } else if s.eq_ignore_ascii_case("low") {
            Ok(Priority::Low)
        } else {
            Err(ParsePriorityError(s.to_string()))
        }
    }
}
