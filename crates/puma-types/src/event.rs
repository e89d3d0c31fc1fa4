//! Authorization event taxonomy.
//!
//! Decision points and remote evaluator modules report what happened as
//! [`AuthzEvent`] values instead of free-form log lines. The default
//! [`TracingSink`] forwards them to `tracing` at the level given by
//! [`AuthzEvent::severity`]; [`RecordingSink`] keeps them for inspection.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::decision::{Decision, PolicyReference};
use crate::party::PartyIds;

/// How loudly an event is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Severe,
}

/// Fieldless discriminant of [`AuthzEvent`], for assertions and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Evaluated,
    NotReady,
    EngineFailure,
    UnrecognizedDecisionCode,
    PolicyLoaded,
    PolicyLoadFailed,
    UnsupportedReference,
    ConnectFailed,
    DefaultDeny,
    RetryingCall,
    RetryExhausted,
    InvalidRemoteResponse,
    RemoteDecision,
}

/// Something observable happened while answering an authorization question.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthzEvent {
    /// The local decision point produced a decision.
    Evaluated {
        ids: PartyIds,
        decision: Decision,
        status: String,
    },
    /// No policy is bound; the evaluation answered UNKNOWN.
    NotReady { ids: PartyIds, reason: String },
    /// The engine returned zero or several result records.
    EngineFailure { ids: PartyIds, results: usize },
    /// The engine returned a decision code outside the known vocabulary.
    UnrecognizedDecisionCode { ids: PartyIds, code: i32 },
    /// A policy was bound (initial load or reload).
    PolicyLoaded { policy_id: String, generation: u64 },
    /// Loading a policy failed; the previous binding (if any) stays.
    PolicyLoadFailed { reason: String },
    /// A module was asked for a reference it does not serve.
    UnsupportedReference {
        module: String,
        reference: PolicyReference,
    },
    /// Establishing a connection to the remote authority failed.
    ConnectFailed { module: String, error: String },
    /// No connection could be established; the module answered DENY.
    DefaultDeny {
        module: String,
        reference: PolicyReference,
    },
    /// The first remote call failed; reconnecting for the single retry.
    RetryingCall { module: String, error: String },
    /// The retry failed as well; the module answered DENY.
    RetryExhausted { module: String, error: String },
    /// The remote answered with zero or several results; DENY.
    InvalidRemoteResponse { module: String, results: usize },
    /// The remote answered; includes the round-trip time.
    RemoteDecision {
        module: String,
        reference: PolicyReference,
        decision: Decision,
        elapsed: Duration,
    },
}

impl AuthzEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Evaluated { .. } => EventKind::Evaluated,
            Self::NotReady { .. } => EventKind::NotReady,
            Self::EngineFailure { .. } => EventKind::EngineFailure,
            Self::UnrecognizedDecisionCode { .. } => EventKind::UnrecognizedDecisionCode,
            Self::PolicyLoaded { .. } => EventKind::PolicyLoaded,
            Self::PolicyLoadFailed { .. } => EventKind::PolicyLoadFailed,
            Self::UnsupportedReference { .. } => EventKind::UnsupportedReference,
            Self::ConnectFailed { .. } => EventKind::ConnectFailed,
            Self::DefaultDeny { .. } => EventKind::DefaultDeny,
            Self::RetryingCall { .. } => EventKind::RetryingCall,
            Self::RetryExhausted { .. } => EventKind::RetryExhausted,
            Self::InvalidRemoteResponse { .. } => EventKind::InvalidRemoteResponse,
            Self::RemoteDecision { .. } => EventKind::RemoteDecision,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Evaluated { decision, .. } => match decision {
                Decision::Permit | Decision::Deny | Decision::NotApplicable => Severity::Info,
                Decision::Indeterminate => Severity::Warning,
                Decision::Unknown => Severity::Severe,
            },
            Self::PolicyLoaded { .. } | Self::RemoteDecision { .. } => Severity::Info,
            Self::UnsupportedReference { .. }
            | Self::ConnectFailed { .. }
            | Self::RetryingCall { .. }
            | Self::RetryExhausted { .. }
            | Self::InvalidRemoteResponse { .. } => Severity::Warning,
            Self::NotReady { .. }
            | Self::EngineFailure { .. }
            | Self::UnrecognizedDecisionCode { .. }
            | Self::PolicyLoadFailed { .. }
            | Self::DefaultDeny { .. } => Severity::Severe,
        }
    }
}

/// Receives authorization events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AuthzEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: AuthzEvent) {
        match &event {
            AuthzEvent::Evaluated {
                ids,
                decision,
                status,
            } => match event.severity() {
                Severity::Info => info!(%ids, %decision, %status, "authorization decision"),
                Severity::Warning => warn!(%ids, %decision, %status, "authorization decision"),
                Severity::Severe => error!(%ids, %decision, %status, "authorization decision"),
            },
            AuthzEvent::NotReady { ids, reason } => {
                error!(%ids, %reason, "decision point not ready");
            }
            AuthzEvent::EngineFailure { ids, results } => {
                error!(%ids, results, "engine must return exactly one result");
            }
            AuthzEvent::UnrecognizedDecisionCode { ids, code } => {
                error!(%ids, code, "unrecognized decision code");
            }
            AuthzEvent::PolicyLoaded {
                policy_id,
                generation,
            } => info!(%policy_id, generation, "policy bound"),
            AuthzEvent::PolicyLoadFailed { reason } => {
                error!(%reason, "policy load failed, keeping previous binding");
            }
            AuthzEvent::UnsupportedReference { module, reference } => {
                warn!(%module, %reference, "asked for an unsupported policy reference");
            }
            AuthzEvent::ConnectFailed { module, error } => {
                warn!(%module, %error, "failed to reach the central decision point");
            }
            AuthzEvent::DefaultDeny { module, reference } => {
                error!(%module, %reference, "no connection to the central decision point, default deny");
            }
            AuthzEvent::RetryingCall { module, error } => {
                warn!(%module, %error, "remote call failed, reconnecting for one retry");
            }
            AuthzEvent::RetryExhausted { module, error } => {
                warn!(%module, %error, "remote call failed again, default deny");
            }
            AuthzEvent::InvalidRemoteResponse { module, results } => {
                warn!(%module, results, "remote returned an invalid number of results, default deny");
            }
            AuthzEvent::RemoteDecision {
                module,
                reference,
                decision,
                elapsed,
            } => info!(
                %module,
                %reference,
                %decision,
                elapsed_ms = elapsed.as_millis() as u64,
                "remote decision"
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AuthzEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of all events recorded so far.
    pub fn events(&self) -> Vec<AuthzEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(AuthzEvent::kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: AuthzEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
