//! The fail-safe remote evaluator module.
//!
//! One algorithm, shared by every transport:
//!
//! 1. A reference the module was not configured for answers NOT_APPLICABLE
//!    without touching the network.
//! 2. Connect lazily. No connection means DENY.
//! 3. Call. On a transport failure drop the connection, reconnect once and
//!    retry once. A second failure means DENY.
//! 4. Anything but exactly one result means DENY.
//!
//! Connection state is `DISCONNECTED -> CONNECTED -> DISCONNECTED`. It is
//! guarded by a mutex that covers connecting and resetting only; remote
//! calls run outside of it. Every published connection gets a new
//! generation so that a thread holding a stale handle cannot tear down a
//! connection another thread has just rebuilt.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use puma_types::{AuthzEvent, CachedAttributeSet, Decision, EventSink, PolicyReference};

use crate::connector::{Connector, Deadline, RemoteResponse};
use crate::error::TransportError;

struct ConnectionState<T> {
    current: Option<Arc<T>>,
    generation: u64,
}

/// A connection checked out for one call.
struct Checkout<T> {
    connection: Arc<T>,
    generation: u64,
}

/// A remote evaluator module over transport `C`.
pub struct RemoteModule<C: Connector> {
    connector: C,
    label: String,
    supported_ids: Vec<PolicyReference>,
    state: Mutex<ConnectionState<C::Connection>>,
    events: Arc<dyn EventSink>,
}

impl<C: Connector> std::fmt::Debug for RemoteModule<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteModule")
            .field("label", &self.label)
            .field("supported_ids", &self.supported_ids)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> RemoteModule<C> {
    pub fn new<I, R>(connector: C, supported_ids: I, events: Arc<dyn EventSink>) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<PolicyReference>,
    {
        let label = connector.describe();
        Self {
            connector,
            label,
            supported_ids: supported_ids.into_iter().map(Into::into).collect(),
            state: Mutex::new(ConnectionState {
                current: None,
                generation: 0,
            }),
            events,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn supported_ids(&self) -> &[PolicyReference] {
        &self.supported_ids
    }

    /// Inline requests cannot be escalated, only named references.
    pub fn is_request_supported(&self) -> bool {
        false
    }

    pub fn is_id_reference_supported(&self) -> bool {
        true
    }

    /// Pure routing predicate. Never touches the connection.
    pub fn supports_id(&self, reference: &PolicyReference) -> bool {
        self.supported_ids.contains(reference)
    }

    pub fn is_connected(&self) -> bool {
        self.lock_state().current.is_some()
    }

    pub fn find_and_evaluate(
        &self,
        reference: &PolicyReference,
        attributes: &CachedAttributeSet,
    ) -> Decision {
        self.find_and_evaluate_until(reference, attributes, None)
    }

    /// Escalates `reference` to the central decision point, giving up at
    /// `deadline`.
    pub fn find_and_evaluate_until(
        &self,
        reference: &PolicyReference,
        attributes: &CachedAttributeSet,
        deadline: Option<Deadline>,
    ) -> Decision {
        if !self.supports_id(reference) {
            self.emit(AuthzEvent::UnsupportedReference {
                module: self.label.clone(),
                reference: reference.clone(),
            });
            return Decision::NotApplicable;
        }

        let Some(checkout) = self.ensure_connected(deadline) else {
            self.emit(AuthzEvent::DefaultDeny {
                module: self.label.clone(),
                reference: reference.clone(),
            });
            return Decision::Deny;
        };

        let started = Instant::now();
        let response = match self.call(&checkout, attributes, deadline) {
            Ok(response) => response,
            Err(first) => match self.retry(first, attributes, deadline) {
                Some(response) => response,
                None => return Decision::Deny,
            },
        };
        let elapsed = started.elapsed();

        let decision = match response.results.as_slice() {
            [decision] => Decision::from(*decision),
            results => {
                self.emit(AuthzEvent::InvalidRemoteResponse {
                    module: self.label.clone(),
                    results: results.len(),
                });
                return Decision::Deny;
            }
        };

        self.emit(AuthzEvent::RemoteDecision {
            module: self.label.clone(),
            reference: reference.clone(),
            decision,
            elapsed,
        });
        decision
    }

    /// The single reconnect-and-retry after a failed first call.
    fn retry(
        &self,
        first: TransportError,
        attributes: &CachedAttributeSet,
        deadline: Option<Deadline>,
    ) -> Option<RemoteResponse> {
        self.emit(AuthzEvent::RetryingCall {
            module: self.label.clone(),
            error: first.to_string(),
        });

        if deadline.is_some_and(Deadline::is_expired) {
            self.exhausted(&TransportError::Timeout);
            return None;
        }

        let Some(checkout) = self.ensure_connected(deadline) else {
            self.exhausted(&first);
            return None;
        };

        match self.call(&checkout, attributes, deadline) {
            Ok(response) => Some(response),
            Err(second) => {
                self.exhausted(&second);
                None
            }
        }
    }

    /// Runs one remote call. A failed call drops the connection it used.
    fn call(
        &self,
        checkout: &Checkout<C::Connection>,
        attributes: &CachedAttributeSet,
        deadline: Option<Deadline>,
    ) -> Result<RemoteResponse, TransportError> {
        self.connector
            .call(&checkout.connection, attributes, deadline)
            .inspect_err(|_| self.reset(checkout.generation))
    }

    fn exhausted(&self, error: &TransportError) {
        self.emit(AuthzEvent::RetryExhausted {
            module: self.label.clone(),
            error: error.to_string(),
        });
    }

    /// Returns the current connection, establishing one if there is none.
    fn ensure_connected(&self, deadline: Option<Deadline>) -> Option<Checkout<C::Connection>> {
        let mut state = self.lock_state();
        if let Some(connection) = &state.current {
            return Some(Checkout {
                connection: Arc::clone(connection),
                generation: state.generation,
            });
        }

        match self.connector.connect(deadline) {
            Ok(connection) => {
                let connection = Arc::new(connection);
                state.generation += 1;
                state.current = Some(Arc::clone(&connection));
                Some(Checkout {
                    connection,
                    generation: state.generation,
                })
            }
            Err(err) => {
                self.emit(AuthzEvent::ConnectFailed {
                    module: self.label.clone(),
                    error: err.to_string(),
                });
                None
            }
        }
    }

    /// Drops the connection of `generation` if it is still the current one.
    fn reset(&self, generation: u64) {
        let mut state = self.lock_state();
        if state.generation != generation {
            return;
        }
        if let Some(connection) = state.current.take() {
            self.connector.close(&connection);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState<C::Connection>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: AuthzEvent) {
        self.events.emit(event);
    }
}
