//! Enforcement façade for application code.

use std::sync::Arc;

use puma_remote::Deadline;
use puma_types::{Action, Decision, Environment, Object, PdpResult, Subject};
use tracing::error;

use crate::pdp::LocalDecisionPoint;

/// Turns decisions into yes/no answers.
///
/// Only a PERMIT with an `ok` status authorizes. Construct one per
/// decision point and pass it to whatever needs it.
#[derive(Debug, Clone)]
pub struct EnforcementPoint {
    pdp: Arc<LocalDecisionPoint>,
}

impl EnforcementPoint {
    pub fn new(pdp: Arc<LocalDecisionPoint>) -> Self {
        Self { pdp }
    }

    pub fn decision_point(&self) -> &Arc<LocalDecisionPoint> {
        &self.pdp
    }

    pub fn is_authorized(
        &self,
        subject: &Subject,
        object: &Object,
        action: &Action,
        environment: &Environment,
    ) -> bool {
        let result = self.pdp.evaluate(subject, object, action, environment);
        Self::authorizes(subject, object, action, &result)
    }

    pub fn is_authorized_until(
        &self,
        subject: &Subject,
        object: &Object,
        action: &Action,
        environment: &Environment,
        deadline: Deadline,
    ) -> bool {
        let result = self
            .pdp
            .evaluate_with_deadline(subject, object, action, environment, deadline);
        Self::authorizes(subject, object, action, &result)
    }

    fn authorizes(subject: &Subject, object: &Object, action: &Action, result: &PdpResult) -> bool {
        if !result.is_ok() {
            error!(
                subject = subject.id(),
                object = object.id(),
                action = action.id(),
                decision = %result.decision,
                status = %result.status,
                "authorization request failed"
            );
            return false;
        }
        result.decision == Decision::Permit
    }
}
