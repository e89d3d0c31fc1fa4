//! # PUMA
//!
//! Attribute-based authorization for applications, with escalation to a
//! central decision point.
//!
//! An application asks a local decision point whether a subject may perform
//! an action on an object. The local policy answers on its own where it can
//! and defers named policy references to the central decision point through
//! remote evaluator modules. Whenever the central authority cannot be
//! reached the answer is DENY.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                             Puma                             │
//! │  ┌────────────┐   ┌──────────────┐   ┌─────────────────────┐ │
//! │  │ Enforcement│ → │ Local        │ → │ Remote evaluator    │ │
//! │  │ point      │   │ decision pt. │   │ modules             │ │
//! │  │ (yes / no) │   │ (snapshot)   │   │ legacy/binary/rest  │ │
//! │  └────────────┘   └──────────────┘   └─────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use puma::{Action, Environment, Object, Puma, Subject};
//!
//! let puma = Puma::open(".", my_policy_compiler)?;
//!
//! let mut subject = Subject::new("alice");
//! subject.set_all("roles", DataType::String, vec!["helpdesk".into()])?;
//!
//! if puma.is_authorized(&subject, &Object::new("ticket-1"), &Action::new("read"), &Environment::new()) {
//!     // ...
//! }
//! ```

mod error;
mod modules;
mod puma;

pub use error::{PumaError, Result};
pub use modules::{CentralModules, binary_config, legacy_config, rest_config};
pub use puma::{Puma, PumaBuilder};

// Re-export configuration
pub use puma_config::{ConfigLoader, PumaConfig, TransportKind};

// Re-export the attribute and decision model
pub use puma_types::{
    Action, AttributeError, AttributeValue, AuthzEvent, CachedAttributeSet, DataType, Decision,
    Environment, EvaluationRequest, EventKind, EventSink, Multiplicity, Object, OwnerKind,
    PdpResult, PolicyReference, RecordingSink, Severity, Subject, TracingSink, Value,
    as_cached_attributes,
};

// Re-export the decision point
pub use puma_pdp::{
    AttributeFinder, EngineResponse, EngineResult, EnforcementPoint, EvaluationContext,
    LoadStatus, LocalDecisionPoint, PolicyCompiler, PolicyDocument, PolicyEngine, PolicyError,
    PolicySource,
};

// Re-export remote evaluation
pub use puma_remote::{
    AuthorityRegistry, CentralAuthority, Deadline, EvaluatorModule, InProcessRegistry,
    RemotePolicyEvaluator, TransportError,
};

// Re-export wire-level decisions for central authority implementations
pub use puma_wire::RemoteDecision;
