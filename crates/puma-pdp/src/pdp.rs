//! The application-level decision point.
//!
//! A [`LocalDecisionPoint`] binds one policy document, the engine compiled
//! from it, the remote evaluator modules and the attribute finders into an
//! immutable snapshot. Evaluations clone the snapshot pointer once and use
//! it for the whole call; [`LocalDecisionPoint::reload`] builds a complete
//! replacement off to the side and publishes it with one pointer store.

use std::fmt::{self, Display};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use puma_remote::{Deadline, EvaluatorModule, RemotePolicyEvaluator};
use puma_types::{
    Action, AuthzEvent, Decision, Environment, EvaluationRequest, EventSink, Object, PartyIds,
    PdpResult, Subject, TracingSink, as_cached_attributes,
};
use tracing::{debug, warn};

use crate::context::EvaluationContext;
use crate::document::PolicyDocument;
use crate::engine::{EngineResponse, PolicyCompiler, PolicyEngine, short_status};
use crate::error::{PolicyError, PolicyResult};
use crate::finder::{AttributeFinder, EnvironmentAttributeFinder};
use crate::source::PolicySource;

/// Policy id expected when none is configured.
pub const DEFAULT_POLICY_ID: &str = "application-policy";

// ============================================================================
// Load status
// ============================================================================

/// Outcome of the most recent (re)load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Ready,
    PolicyNotFound,
    LoadFailed(String),
}

impl LoadStatus {
    fn from_error(error: &PolicyError) -> Self {
        match error {
            PolicyError::NotFound { .. } => Self::PolicyNotFound,
            other => Self::LoadFailed(other.to_string()),
        }
    }
}

impl Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("OK"),
            Self::PolicyNotFound => f.write_str("APPLICATION POLICY FILE NOT FOUND"),
            Self::LoadFailed(reason) => write!(f, "LOAD FAILED: {reason}"),
        }
    }
}

// ============================================================================
// Module factory
// ============================================================================

/// Builds the remote evaluator modules for one snapshot.
///
/// Called on every (re)load so a reload also re-registers the modules.
pub trait ModuleFactory: Send + Sync {
    fn build(&self, events: &Arc<dyn EventSink>) -> Vec<EvaluatorModule>;
}

impl<F> ModuleFactory for F
where
    F: Fn(&Arc<dyn EventSink>) -> Vec<EvaluatorModule> + Send + Sync,
{
    fn build(&self, events: &Arc<dyn EventSink>) -> Vec<EvaluatorModule> {
        self(events)
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Everything one evaluation reads, published as a unit.
struct BoundPolicy {
    document: PolicyDocument,
    engine: Arc<dyn PolicyEngine>,
    remote: RemotePolicyEvaluator,
    finders: Vec<Arc<dyn AttributeFinder>>,
    generation: u64,
}

struct State {
    bound: Option<Arc<BoundPolicy>>,
    status: LoadStatus,
}

// ============================================================================
// Builder
// ============================================================================

/// Configures and constructs a [`LocalDecisionPoint`].
pub struct LocalDecisionPointBuilder {
    source: PolicySource,
    compiler: Arc<dyn PolicyCompiler>,
    expected_policy_id: String,
    allow_remote_access: bool,
    modules: Option<Arc<dyn ModuleFactory>>,
    query_finder: Option<Arc<dyn AttributeFinder>>,
    events: Arc<dyn EventSink>,
}

impl LocalDecisionPointBuilder {
    pub fn expected_policy_id(mut self, id: impl Into<String>) -> Self {
        self.expected_policy_id = id.into();
        self
    }

    /// Whether the network-querying finder takes part in evaluations.
    pub fn allow_remote_access(mut self, allow: bool) -> Self {
        self.allow_remote_access = allow;
        self
    }

    pub fn modules(mut self, factory: impl ModuleFactory + 'static) -> Self {
        self.modules = Some(Arc::new(factory));
        self
    }

    /// The finder that queries remote attribute stores.
    pub fn query_finder(mut self, finder: Arc<dyn AttributeFinder>) -> Self {
        self.query_finder = Some(finder);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Builds the decision point and performs the initial load.
    ///
    /// A failed initial load leaves the decision point not ready; the
    /// reason is available from [`LocalDecisionPoint::status`].
    pub fn build(self) -> LocalDecisionPoint {
        let pdp = LocalDecisionPoint {
            source: Mutex::new(self.source),
            compiler: self.compiler,
            expected_policy_id: self.expected_policy_id,
            remote_access: AtomicBool::new(self.allow_remote_access),
            modules: self.modules,
            query_finder: self.query_finder,
            events: self.events,
            state: RwLock::new(State {
                bound: None,
                status: LoadStatus::PolicyNotFound,
            }),
        };
        // The failure is recorded in the status.
        let _ = pdp.reload();
        pdp
    }
}

// ============================================================================
// Decision point
// ============================================================================

/// Answers authorization questions against one bound application policy.
pub struct LocalDecisionPoint {
    /// Held for the whole of a reload, serializing reloads.
    source: Mutex<PolicySource>,
    compiler: Arc<dyn PolicyCompiler>,
    expected_policy_id: String,
    remote_access: AtomicBool,
    modules: Option<Arc<dyn ModuleFactory>>,
    query_finder: Option<Arc<dyn AttributeFinder>>,
    events: Arc<dyn EventSink>,
    state: RwLock<State>,
}

impl fmt::Debug for LocalDecisionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalDecisionPoint")
            .field("expected_policy_id", &self.expected_policy_id)
            .field("status", &self.status())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl LocalDecisionPoint {
    pub fn builder(
        source: PolicySource,
        compiler: impl PolicyCompiler + 'static,
    ) -> LocalDecisionPointBuilder {
        LocalDecisionPointBuilder {
            source,
            compiler: Arc::new(compiler),
            expected_policy_id: DEFAULT_POLICY_ID.to_string(),
            allow_remote_access: false,
            modules: None,
            query_finder: None,
            events: Arc::new(TracingSink),
        }
    }

    /// Evaluates an authorization question.
    ///
    /// Never fails: a decision point without a bound policy answers
    /// UNKNOWN with a descriptive status.
    pub fn evaluate(
        &self,
        subject: &Subject,
        object: &Object,
        action: &Action,
        environment: &Environment,
    ) -> PdpResult {
        self.evaluate_until(subject, object, action, environment, None)
    }

    /// Like [`evaluate`](Self::evaluate), bounding any remote escalation by
    /// `deadline`.
    pub fn evaluate_with_deadline(
        &self,
        subject: &Subject,
        object: &Object,
        action: &Action,
        environment: &Environment,
        deadline: Deadline,
    ) -> PdpResult {
        self.evaluate_until(subject, object, action, environment, Some(deadline))
    }

    fn evaluate_until(
        &self,
        subject: &Subject,
        object: &Object,
        action: &Action,
        environment: &Environment,
        deadline: Option<Deadline>,
    ) -> PdpResult {
        let ids = PartyIds::of(subject, object, action);
        let (bound, status) = {
            let state = self.read_state();
            (state.bound.clone(), state.status.clone())
        };
        let Some(bound) = bound else {
            let reason = format!("not-ready: {status}");
            self.events.emit(AuthzEvent::NotReady {
                ids,
                reason: reason.clone(),
            });
            return PdpResult::failed(Decision::Unknown, reason);
        };

        let attributes = as_cached_attributes(subject, object, action, environment);
        let request = EvaluationRequest::placeholder();
        let context = EvaluationContext::new(
            &request,
            &attributes,
            &bound.finders,
            &bound.remote,
            deadline,
        );
        let response = bound.engine.evaluate(&context);
        debug!(%ids, generation = bound.generation, "engine answered");
        self.interpret(ids, response)
    }

    /// Reduces the engine's result list to one decision and status.
    fn interpret(&self, ids: PartyIds, response: EngineResponse) -> PdpResult {
        let mut results = response.results;
        if results.len() != 1 {
            let count = results.len();
            self.events
                .emit(AuthzEvent::EngineFailure { ids, results: count });
            return if count == 0 {
                PdpResult::failed(Decision::Unknown, "no-result")
            } else {
                PdpResult::failed(Decision::Deny, "multiple-results")
            };
        }
        let result = results.remove(0);

        let status = result
            .status_codes
            .first()
            .map_or("missing-status", |code| short_status(code))
            .to_string();
        let decision = Decision::from_raw(result.decision);
        if decision == Decision::Unknown {
            self.events.emit(AuthzEvent::UnrecognizedDecisionCode {
                ids,
                code: result.decision,
            });
        } else {
            self.events.emit(AuthzEvent::Evaluated {
                ids,
                decision,
                status: status.clone(),
            });
        }
        PdpResult { decision, status }
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Re-reads the policy source and rebinds policy, modules and finders.
    ///
    /// On failure the previous snapshot keeps serving and the status
    /// reports the failure.
    pub fn reload(&self) -> PolicyResult<()> {
        let source = self.lock_source();
        self.reload_from(&source)
    }

    fn reload_from(&self, source: &PolicySource) -> PolicyResult<()> {
        let generation = self.generation() + 1;
        match self.bind(source, generation) {
            Ok(bound) => {
                let policy_id = bound.document.id().to_string();
                {
                    let mut state = self.write_state();
                    state.bound = Some(Arc::new(bound));
                    state.status = LoadStatus::Ready;
                }
                self.events
                    .emit(AuthzEvent::PolicyLoaded { policy_id, generation });
                Ok(())
            }
            Err(error) => {
                self.write_state().status = LoadStatus::from_error(&error);
                self.events.emit(AuthzEvent::PolicyLoadFailed {
                    reason: error.to_string(),
                });
                Err(error)
            }
        }
    }

    fn bind(&self, source: &PolicySource, generation: u64) -> PolicyResult<BoundPolicy> {
        let text = source.read()?;
        let document = PolicyDocument::parse_expecting(text, &self.expected_policy_id)?;
        let engine = self.compiler.compile(&document)?;

        let modules = self
            .modules
            .as_ref()
            .map(|factory| factory.build(&self.events))
            .unwrap_or_default();
        let remote = RemotePolicyEvaluator::new(modules);
        for reference in document.remote_references() {
            if !remote.supports_id(reference) {
                warn!(%reference, "no remote evaluator module supports referenced policy");
            }
        }

        let mut finders: Vec<Arc<dyn AttributeFinder>> = vec![Arc::new(EnvironmentAttributeFinder)];
        if self.remote_access_enabled()
            && let Some(finder) = &self.query_finder
        {
            finders.push(Arc::clone(finder));
        }

        Ok(BoundPolicy {
            document,
            engine,
            remote,
            finders,
            generation,
        })
    }

    /// Replaces the policy text and reloads.
    pub fn load_application_policy(&self, text: &str) -> PolicyResult<()> {
        let mut source = self.lock_source();
        source.write(text)?;
        self.reload_from(&source)
    }

    /// The current policy source text.
    pub fn application_policy(&self) -> PolicyResult<String> {
        self.lock_source().read()
    }

    /// Includes or excludes the network-querying finder, then reloads.
    ///
    /// If the reload fails the flag keeps its previous value, matching the
    /// finders of the snapshot that stays published.
    pub fn set_remote_access(&self, enabled: bool) -> PolicyResult<()> {
        let source = self.lock_source();
        let previous = self.remote_access.swap(enabled, Ordering::SeqCst);
        if let Err(error) = self.reload_from(&source) {
            self.remote_access.store(previous, Ordering::SeqCst);
            return Err(error);
        }
        Ok(())
    }

    pub fn remote_access_enabled(&self) -> bool {
        self.remote_access.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------------

    pub fn status(&self) -> LoadStatus {
        self.read_state().status.clone()
    }

    /// Whether a policy is bound. A failed reload after a successful load
    /// keeps the decision point ready.
    pub fn is_ready(&self) -> bool {
        self.read_state().bound.is_some()
    }

    pub fn supported_policy_ids(&self) -> Vec<String> {
        vec![self.expected_policy_id.clone()]
    }

    pub fn last_loaded_policy_id(&self) -> Option<String> {
        self.read_state()
            .bound
            .as_ref()
            .map(|bound| bound.document.id().to_string())
    }

    /// Number of successful publishes so far.
    pub fn generation(&self) -> u64 {
        self.read_state()
            .bound
            .as_ref()
            .map_or(0, |bound| bound.generation)
    }

    /// Remote references of the bound policy.
    pub fn remote_references(&self) -> Vec<String> {
        self.read_state()
            .bound
            .as_ref()
            .map(|bound| {
                bound
                    .document
                    .remote_references()
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock_source(&self) -> MutexGuard<'_, PolicySource> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
