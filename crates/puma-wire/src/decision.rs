//! Decision codes as they travel on the wire.

use puma_types::Decision;
use serde::{Deserialize, Serialize};

/// Binary RPC decision codes.
pub mod code {
    pub const DENY: u32 = 0;
    pub const PERMIT: u32 = 1;
    pub const NOT_APPLICABLE: u32 = 2;
}

/// A decision returned by a central decision point.
///
/// Remote authorities never answer UNKNOWN; anything they send that is not
/// recognized becomes [`RemoteDecision::Indeterminate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteDecision {
    Permit,
    Deny,
    NotApplicable,
    Indeterminate,
}

impl RemoteDecision {
    /// Maps a binary response code. A missing or unrecognized code is
    /// INDETERMINATE.
    pub fn from_code(code: Option<u32>) -> Self {
        match code {
            Some(code::DENY) => Self::Deny,
            Some(code::PERMIT) => Self::Permit,
            Some(code::NOT_APPLICABLE) => Self::NotApplicable,
            _ => Self::Indeterminate,
        }
    }

    /// The binary response code; INDETERMINATE is sent as no code at all.
    pub fn to_code(self) -> Option<u32> {
        match self {
            Self::Deny => Some(code::DENY),
            Self::Permit => Some(code::PERMIT),
            Self::NotApplicable => Some(code::NOT_APPLICABLE),
            Self::Indeterminate => None,
        }
    }

    /// Maps a REST decision string. Unrecognized strings are INDETERMINATE.
    pub fn from_name(name: &str) -> Self {
        match name {
            "PERMIT" => Self::Permit,
            "DENY" => Self::Deny,
            "NOT_APPLICABLE" => Self::NotApplicable,
            _ => Self::Indeterminate,
        }
    }

    pub fn as_name(self) -> &'static str {
        match self {
            Self::Permit => "PERMIT",
            Self::Deny => "DENY",
            Self::NotApplicable => "NOT_APPLICABLE",
            Self::Indeterminate => "INDETERMINATE",
        }
    }
}

impl From<RemoteDecision> for Decision {
    fn from(value: RemoteDecision) -> Self {
        match value {
            RemoteDecision::Permit => Decision::Permit,
            RemoteDecision::Deny => Decision::Deny,
            RemoteDecision::NotApplicable => Decision::NotApplicable,
            RemoteDecision::Indeterminate => Decision::Indeterminate,
        }
    }
}
