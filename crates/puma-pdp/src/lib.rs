//! # puma-pdp: application-level decision point
//!
//! Binds an application policy document to a policy evaluation engine and
//! to the remote evaluator modules it escalates to, and answers
//! `evaluate(subject, object, action, environment)`.
//!
//! Interpreting policy rules is left to an injected [`PolicyCompiler`];
//! this crate reads the document header, owns the snapshot lifecycle and
//! reduces whatever the engine answers to one [`Decision`](puma_types::Decision)
//! and status.
//!
//! ```ignore
//! let pdp = LocalDecisionPoint::builder(PolicySource::file(path), compiler)
//!     .modules(central_modules)
//!     .build();
//! let pep = EnforcementPoint::new(Arc::new(pdp));
//! if pep.is_authorized(&subject, &object, &action, &Environment::new()) { ... }
//! ```

mod context;
mod document;
mod enforcement;
mod engine;
mod error;
pub mod finder;
mod pdp;
mod source;

pub use context::EvaluationContext;
pub use document::{PolicyDocument, PolicyKind};
pub use enforcement::EnforcementPoint;
pub use engine::{
    EngineResponse, EngineResult, PolicyCompiler, PolicyEngine, STATUS_MISSING_ATTRIBUTE,
    STATUS_OK, STATUS_PROCESSING_ERROR,
};
pub use error::{FinderError, PolicyError, PolicyResult};
pub use finder::{AttributeFinder, EnvironmentAttributeFinder, FinderContext};
pub use pdp::{
    DEFAULT_POLICY_ID, LoadStatus, LocalDecisionPoint, LocalDecisionPointBuilder, ModuleFactory,
};
pub use source::PolicySource;
