//! The evaluation context handed to a policy engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use puma_remote::{Deadline, RemotePolicyEvaluator};
use puma_types::{
    CachedAttributeSet, DataType, Decision, EvaluationRequest, OwnerKind, PolicyReference, Value,
};
use tracing::warn;

use crate::finder::{AttributeFinder, FinderContext};

/// Everything an engine may consult while evaluating one request.
///
/// Borrowed from one decision point snapshot for the duration of one
/// evaluation call.
pub struct EvaluationContext<'a> {
    request: &'a EvaluationRequest,
    attributes: &'a CachedAttributeSet,
    finders: &'a [Arc<dyn AttributeFinder>],
    remote: &'a RemotePolicyEvaluator,
    finder_context: FinderContext,
    deadline: Option<Deadline>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        request: &'a EvaluationRequest,
        attributes: &'a CachedAttributeSet,
        finders: &'a [Arc<dyn AttributeFinder>],
        remote: &'a RemotePolicyEvaluator,
        deadline: Option<Deadline>,
    ) -> Self {
        Self {
            request,
            attributes,
            finders,
            remote,
            finder_context: FinderContext::new(Utc::now()),
            deadline,
        }
    }

    /// Pins "now" for time-dependent policies.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.finder_context = FinderContext::new(now);
        self
    }

    /// The request with placeholder ids.
    pub fn request(&self) -> &EvaluationRequest {
        self.request
    }

    pub fn attributes(&self) -> &CachedAttributeSet {
        self.attributes
    }

    pub fn current_time(&self) -> DateTime<Utc> {
        self.finder_context.now()
    }

    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }

    /// Resolves an attribute: cached attributes first, then each finder in
    /// registration order. A failing finder is logged and skipped.
    pub fn find_attribute(&self, owner: OwnerKind, id: &str, data_type: DataType) -> Option<Vec<Value>> {
        if let Some(cached) = self.attributes.find(owner, id, data_type) {
            return Some(cached.values().to_vec());
        }
        for finder in self.finders {
            match finder.find(owner, id, data_type, &self.finder_context) {
                Ok(Some(values)) => return Some(values),
                Ok(None) => {}
                Err(error) => warn!(%id, %error, "attribute finder failed"),
            }
        }
        None
    }

    pub fn supports_remote(&self, reference: &PolicyReference) -> bool {
        self.remote.supports_id(reference)
    }

    /// Escalates a remote policy reference with this call's cached
    /// attributes.
    pub fn evaluate_remote(&self, reference: &PolicyReference) -> Decision {
        self.remote
            .find_and_evaluate_until(reference, self.attributes, self.deadline)
    }
}
