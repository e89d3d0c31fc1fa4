//! The policy evaluation engine contract.
//!
//! Interpreting rules and combining algorithms is the engine's business. The
//! decision point hands it an [`EvaluationContext`] and reads back a result
//! list from which exactly one `(decision code, status code)` pair is taken.

use std::sync::Arc;

use puma_types::decision::raw;

use crate::context::EvaluationContext;
use crate::document::PolicyDocument;
use crate::error::PolicyResult;

/// Status code of a successful evaluation.
pub const STATUS_OK: &str = "urn:oasis:names:tc:xacml:1.0:status:ok";
/// Status code of an evaluation that failed inside the engine.
pub const STATUS_PROCESSING_ERROR: &str = "urn:oasis:names:tc:xacml:1.0:status:processing-error";
/// Status code of an evaluation that lacked a required attribute.
pub const STATUS_MISSING_ATTRIBUTE: &str = "urn:oasis:names:tc:xacml:1.0:status:missing-attribute";

/// One result record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineResult {
    /// Raw decision code, see [`puma_types::decision::raw`].
    pub decision: i32,
    /// Status codes, most significant first.
    pub status_codes: Vec<String>,
}

impl EngineResult {
    /// A result with an `ok` status.
    pub fn ok(decision: i32) -> Self {
        Self {
            decision,
            status_codes: vec![STATUS_OK.to_string()],
        }
    }

    /// An INDETERMINATE result carrying `status`.
    pub fn indeterminate(status: &str) -> Self {
        Self {
            decision: raw::INDETERMINATE,
            status_codes: vec![status.to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineResponse {
    pub results: Vec<EngineResult>,
}

impl EngineResponse {
    pub fn single(result: EngineResult) -> Self {
        Self {
            results: vec![result],
        }
    }
}

/// A compiled policy, ready to evaluate requests.
pub trait PolicyEngine: Send + Sync {
    fn evaluate(&self, context: &EvaluationContext<'_>) -> EngineResponse;
}

/// Turns a parsed policy document into an engine.
pub trait PolicyCompiler: Send + Sync {
    fn compile(&self, document: &PolicyDocument) -> PolicyResult<Arc<dyn PolicyEngine>>;
}

impl<F> PolicyCompiler for F
where
    F: Fn(&PolicyDocument) -> PolicyResult<Arc<dyn PolicyEngine>> + Send + Sync,
{
    fn compile(&self, document: &PolicyDocument) -> PolicyResult<Arc<dyn PolicyEngine>> {
        self(document)
    }
}

/// The short form of a status code: its last `:`-separated segment.
pub(crate) fn short_status(code: &str) -> &str {
    code.rsplit(':').next().unwrap_or(code)
}
