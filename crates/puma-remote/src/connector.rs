//! The transport seam of a remote evaluator module.

use std::time::{Duration, Instant};

use puma_types::CachedAttributeSet;
use puma_wire::RemoteDecision;

use crate::error::{TransportError, TransportResult};

/// A point in time after which a remote call must give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    /// The earlier of a caller deadline and `timeout` from now.
    pub fn capped(deadline: Option<Self>, timeout: Duration) -> Self {
        let own = Self::after(timeout);
        deadline.map_or(own, |d| d.min(own))
    }

    pub fn instant(self) -> Instant {
        self.0
    }

    /// Time left, or `None` once the deadline has passed.
    pub fn remaining(self) -> Option<Duration> {
        self.0
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())
    }

    pub fn is_expired(self) -> bool {
        self.remaining().is_none()
    }

    /// Time left as a socket timeout, or [`TransportError::Timeout`].
    pub fn budget(self) -> TransportResult<Duration> {
        self.remaining().ok_or(TransportError::Timeout)
    }
}

/// What a central decision point answered.
///
/// Exactly one result is expected; the module treats any other count as a
/// structurally invalid response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub results: Vec<RemoteDecision>,
}

impl RemoteResponse {
    pub fn single(decision: RemoteDecision) -> Self {
        Self {
            results: vec![decision],
        }
    }
}

/// Opens connections to a central decision point and performs the remote
/// evaluation call over one of them.
///
/// Implementations only move bytes. Retry, fail-safe defaults and
/// connection bookkeeping belong to [`crate::RemoteModule`].
pub trait Connector: Send + Sync {
    /// A live connection handle, shared by concurrent calls.
    type Connection: Send + Sync;

    /// Human-readable target, used in events.
    fn describe(&self) -> String;

    fn connect(&self, deadline: Option<Deadline>) -> TransportResult<Self::Connection>;

    fn call(
        &self,
        connection: &Self::Connection,
        attributes: &CachedAttributeSet,
        deadline: Option<Deadline>,
    ) -> TransportResult<RemoteResponse>;

    /// Releases a connection that was discarded after a failure.
    fn close(&self, _connection: &Self::Connection) {}
}
