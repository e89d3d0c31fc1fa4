//! Remote evaluator modules and the escalation router.

use puma_types::{CachedAttributeSet, Decision, PolicyReference};
use tracing::debug;

use crate::binary::BinaryConnector;
use crate::connector::Deadline;
use crate::legacy::LegacyConnector;
use crate::module::RemoteModule;
use crate::rest::RestConnector;

/// One remote evaluator module, over one of the supported transports.
#[derive(Debug)]
pub enum EvaluatorModule {
    Legacy(RemoteModule<LegacyConnector>),
    Binary(RemoteModule<BinaryConnector>),
    Rest(RemoteModule<RestConnector>),
}

macro_rules! dispatch {
    ($self:ident, $module:ident => $body:expr) => {
        match $self {
            EvaluatorModule::Legacy($module) => $body,
            EvaluatorModule::Binary($module) => $body,
            EvaluatorModule::Rest($module) => $body,
        }
    };
}

impl EvaluatorModule {
    pub fn transport(&self) -> &'static str {
        match self {
            Self::Legacy(_) => "legacy",
            Self::Binary(_) => "binary",
            Self::Rest(_) => "rest",
        }
    }

    pub fn label(&self) -> &str {
        dispatch!(self, m => m.label())
    }

    pub fn supported_ids(&self) -> &[PolicyReference] {
        dispatch!(self, m => m.supported_ids())
    }

    pub fn is_request_supported(&self) -> bool {
        dispatch!(self, m => m.is_request_supported())
    }

    pub fn is_id_reference_supported(&self) -> bool {
        dispatch!(self, m => m.is_id_reference_supported())
    }

    pub fn supports_id(&self, reference: &PolicyReference) -> bool {
        dispatch!(self, m => m.supports_id(reference))
    }

    pub fn is_connected(&self) -> bool {
        dispatch!(self, m => m.is_connected())
    }

    pub fn find_and_evaluate(
        &self,
        reference: &PolicyReference,
        attributes: &CachedAttributeSet,
    ) -> Decision {
        self.find_and_evaluate_until(reference, attributes, None)
    }

    pub fn find_and_evaluate_until(
        &self,
        reference: &PolicyReference,
        attributes: &CachedAttributeSet,
        deadline: Option<Deadline>,
    ) -> Decision {
        dispatch!(self, m => m.find_and_evaluate_until(reference, attributes, deadline))
    }
}

/// Routes escalations to the first registered module that supports the
/// referenced policy.
///
/// Holds nothing but the module set it was built with.
#[derive(Debug, Default)]
pub struct RemotePolicyEvaluator {
    modules: Vec<EvaluatorModule>,
}

impl RemotePolicyEvaluator {
    pub fn new(modules: Vec<EvaluatorModule>) -> Self {
        Self { modules }
    }

    pub fn modules(&self) -> &[EvaluatorModule] {
        &self.modules
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The module an escalation of `reference` would go to.
    pub fn find_module(&self, reference: &PolicyReference) -> Option<&EvaluatorModule> {
        self.modules
            .iter()
            .find(|m| m.is_id_reference_supported() && m.supports_id(reference))
    }

    pub fn supports_id(&self, reference: &PolicyReference) -> bool {
        self.find_module(reference).is_some()
    }

    pub fn find_and_evaluate(
        &self,
        reference: &PolicyReference,
        attributes: &CachedAttributeSet,
    ) -> Decision {
        self.find_and_evaluate_until(reference, attributes, None)
    }

    pub fn find_and_evaluate_until(
        &self,
        reference: &PolicyReference,
        attributes: &CachedAttributeSet,
        deadline: Option<Deadline>,
    ) -> Decision {
        match self.find_module(reference) {
            Some(module) => module.find_and_evaluate_until(reference, attributes, deadline),
            None => {
                debug!(%reference, "no remote evaluator module supports reference");
                Decision::NotApplicable
            }
        }
    }
}
