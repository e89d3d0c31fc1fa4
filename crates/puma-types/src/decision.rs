//! Normalized decision vocabulary.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Status reported alongside a decision when evaluation went through cleanly.
pub const STATUS_OK: &str = "ok";

/// Raw decision codes produced by a policy evaluation engine.
pub mod raw {
    pub const PERMIT: i32 = 0;
    pub const DENY: i32 = 1;
    pub const INDETERMINATE: i32 = 2;
    pub const NOT_APPLICABLE: i32 = 3;
}

/// The normalized outcome of an authorization question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Permit,
    Deny,
    NotApplicable,
    Indeterminate,
    /// The decision point could not produce a decision at all.
    Unknown,
}

impl Decision {
    /// Maps an engine's raw decision code. Unrecognized codes map to
    /// [`Decision::Unknown`].
    pub fn from_raw(code: i32) -> Self {
        match code {
            raw::PERMIT => Self::Permit,
            raw::DENY => Self::Deny,
            raw::INDETERMINATE => Self::Indeterminate,
            raw::NOT_APPLICABLE => Self::NotApplicable,
            _ => Self::Unknown,
        }
    }

    /// The raw code for this decision; `Unknown` has none.
    pub fn to_raw(self) -> Option<i32> {
        match self {
            Self::Permit => Some(raw::PERMIT),
            Self::Deny => Some(raw::DENY),
            Self::Indeterminate => Some(raw::INDETERMINATE),
            Self::NotApplicable => Some(raw::NOT_APPLICABLE),
            Self::Unknown => None,
        }
    }

    pub fn is_permit(self) -> bool {
        self == Self::Permit
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Permit => "Permit",
            Self::Deny => "Deny",
            Self::NotApplicable => "Not Applicable",
            Self::Indeterminate => "Indeterminate",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// A decision paired with the evaluation status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdpResult {
    pub decision: Decision,
    /// `"ok"` or the error code extracted from the engine status.
    pub status: String,
}

impl PdpResult {
    pub fn ok(decision: Decision) -> Self {
        Self {
            decision,
            status: STATUS_OK.to_string(),
        }
    }

    pub fn failed(decision: Decision, status: impl Into<String>) -> Self {
        Self {
            decision,
            status: status.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Routing key naming a policy held by a remote authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyReference(String);

impl PolicyReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PolicyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PolicyReference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PolicyReference {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_raw_roundtrip() {
        for decision in [
            Decision::Permit,
            Decision::Deny,
            Decision::Indeterminate,
            Decision::NotApplicable,
        ] {
            let code = decision.to_raw().unwrap();
            assert_eq!(Decision::from_raw(code), decision);
        }
        assert_eq!(Decision::Unknown.to_raw(), None);
    }

    #[test]
    fn test_pdp_result_status() {
        assert!(PdpResult::ok(Decision::Deny).is_ok());
        assert!(!PdpResult::failed(Decision::Unknown, "processing-error").is_ok());
    }

    proptest! {
        #[test]
        fn prop_unrecognized_raw_code_is_unknown(code in any::<i32>()) {
            let decision = Decision::from_raw(code);
            if (0..=3).contains(&code) {
                prop_assert_ne!(decision, Decision::Unknown);
            } else {
                prop_assert_eq!(decision, Decision::Unknown);
            }
            prop_assert!(code == raw::PERMIT || decision != Decision::Permit);
        }
    }
}
