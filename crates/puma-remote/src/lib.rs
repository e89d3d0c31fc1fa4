//! # puma-remote: Remote evaluator modules
//!
//! When a local policy references a policy it cannot evaluate itself, the
//! evaluation is escalated to a central decision point through a remote
//! evaluator module. This crate provides:
//!
//! - [`Connector`]: the transport seam (connect + one remote call)
//! - [`RemoteModule`]: the fail-safe algorithm shared by every transport
//! - Three transports: [`LegacyConnector`] (in-process registry),
//!   [`BinaryConnector`] (length-prefixed frames over TCP) and
//!   [`RestConnector`] (JSON over HTTP)
//! - [`EvaluatorModule`]: the closed set of module variants
//! - [`RemotePolicyEvaluator`]: first-match routing by policy reference
//!
//! Transport failures never escape a module. An unreachable authority, or
//! one that fails twice in a row, yields DENY.

mod binary;
mod connector;
mod error;
mod evaluator;
mod legacy;
mod module;
mod rest;

pub use binary::{BinaryConfig, BinaryConnection, BinaryConnector};
pub use connector::{Connector, Deadline, RemoteResponse};
pub use error::{TransportError, TransportResult};
pub use evaluator::{EvaluatorModule, RemotePolicyEvaluator};
pub use legacy::{
    AuthorityRegistry, CentralAuthority, InProcessRegistry, LegacyConfig, LegacyConnection,
    LegacyConnector,
};
pub use module::RemoteModule;
pub use rest::{RestConfig, RestConnector, RestEndpoint};
