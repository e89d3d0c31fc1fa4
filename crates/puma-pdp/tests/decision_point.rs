//! End-to-end decision point scenarios: local rules, escalation to a central
//! authority over the in-process transport, reloads and finders.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use puma_pdp::{
    AttributeFinder, EngineResponse, EngineResult, EnforcementPoint, EvaluationContext,
    FinderContext, FinderError, LoadStatus, LocalDecisionPoint, ModuleFactory, PolicyDocument,
    PolicyEngine, PolicyError, PolicyResult, PolicySource,
};
use puma_remote::{
    CentralAuthority, Deadline, EvaluatorModule, InProcessRegistry, LegacyConfig, LegacyConnector,
    RemoteModule, TransportError, TransportResult,
};
use puma_types::decision::raw;
use puma_types::{
    Action, CachedAttributeSet, DataType, Decision, Environment, EvaluationRequest, EventKind,
    EventSink, Object, OwnerKind, PdpResult, PolicyReference, RecordingSink, Subject, Value,
};
use puma_wire::RemoteDecision;

const CENTRAL: &str = "central-puma-policy";

fn policy(id: &str, remote: bool) -> String {
    let reference = if remote {
        format!(r#"<RemotePolicyReference PolicyId="{CENTRAL}"/>"#)
    } else {
        String::new()
    };
    format!(
        r#"<PolicySet xmlns="urn:oasis:names:tc:xacml:2.0:policy:schema:os" PolicySetId="{id}">
  <Policy PolicyId="helpdesk-read"/>
  {reference}
</PolicySet>"#
    )
}

// ============================================================================
// Test engine
// ============================================================================

/// Permits `read` to helpdesk staff, otherwise defers to the remote
/// references of its document in order.
struct HelpdeskEngine {
    references: Vec<PolicyReference>,
}

impl PolicyEngine for HelpdeskEngine {
    fn evaluate(&self, context: &EvaluationContext<'_>) -> EngineResponse {
        let roles = context
            .find_attribute(OwnerKind::Subject, "subject:roles", DataType::String)
            .unwrap_or_default();
        let action = context.find_attribute(OwnerKind::Action, "action:id", DataType::String);
        if action == Some(vec![Value::from("read")]) && roles.contains(&Value::from("helpdesk")) {
            return EngineResponse::single(EngineResult::ok(raw::PERMIT));
        }
        for reference in &self.references {
            if !context.supports_remote(reference) {
                continue;
            }
            let decision = context.evaluate_remote(reference);
            if decision != Decision::NotApplicable {
                let code = decision.to_raw().unwrap_or(raw::INDETERMINATE);
                return EngineResponse::single(EngineResult::ok(code));
            }
        }
        EngineResponse::single(EngineResult::ok(raw::NOT_APPLICABLE))
    }
}

fn helpdesk_compiler(document: &PolicyDocument) -> PolicyResult<Arc<dyn PolicyEngine>> {
    Ok(Arc::new(HelpdeskEngine {
        references: document.remote_references().to_vec(),
    }))
}

// ============================================================================
// Central authority fakes
// ============================================================================

enum Answer {
    Decide(RemoteDecision),
    TimeOut,
}

struct ScriptedAuthority {
    answer: Answer,
    calls: AtomicUsize,
}

impl ScriptedAuthority {
    fn new(answer: Answer) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CentralAuthority for ScriptedAuthority {
    fn evaluate(
        &self,
        _request: &EvaluationRequest,
        _attributes: &CachedAttributeSet,
        _deadline: Deadline,
    ) -> TransportResult<Vec<RemoteDecision>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Answer::Decide(decision) => Ok(vec![*decision]),
            Answer::TimeOut => Err(TransportError::Timeout),
        }
    }
}

fn central_modules(
    registry: &Arc<InProcessRegistry>,
    name: &'static str,
) -> impl ModuleFactory + use<> {
    let registry = Arc::clone(registry);
    move |events: &Arc<dyn EventSink>| {
        vec![EvaluatorModule::Legacy(RemoteModule::new(
            LegacyConnector::new(
                registry.clone(),
                LegacyConfig {
                    registry_name: name.to_string(),
                    ..LegacyConfig::default()
                },
            ),
            [CENTRAL],
            Arc::clone(events),
        ))]
    }
}

fn helpdesk() -> Subject {
    let mut subject = Subject::new("alice");
    subject
        .set_all(
            "roles",
            DataType::String,
            vec![Value::from("helpdesk")],
        )
        .unwrap();
    subject
}

fn evaluate(pdp: &LocalDecisionPoint, action: &str) -> PdpResult {
    pdp.evaluate(
        &helpdesk(),
        &Object::new("ticket-1"),
        &Action::new(action),
        &Environment::new(),
    )
}

fn escalating_pdp(
    authority: Arc<ScriptedAuthority>,
    events: &Arc<RecordingSink>,
) -> LocalDecisionPoint {
    let registry = Arc::new(InProcessRegistry::new());
    registry.bind("central-puma-pdp", authority);
    LocalDecisionPoint::builder(
        PolicySource::inline(policy("application-policy", true)),
        helpdesk_compiler,
    )
    .modules(central_modules(&registry, "central-puma-pdp"))
    .events(events.clone())
    .build()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_helpdesk_may_read() {
    let pdp = LocalDecisionPoint::builder(
        PolicySource::inline(policy("application-policy", false)),
        helpdesk_compiler,
    )
    .build();

    assert_eq!(evaluate(&pdp, "read"), PdpResult::ok(Decision::Permit));
}

#[test]
fn test_unmatched_action_is_not_applicable_and_unauthorized() {
    let pdp = Arc::new(
        LocalDecisionPoint::builder(
            PolicySource::inline(policy("application-policy", false)),
            helpdesk_compiler,
        )
        .build(),
    );

    assert_eq!(
        evaluate(&pdp, "delete"),
        PdpResult::ok(Decision::NotApplicable)
    );
    let pep = EnforcementPoint::new(pdp);
    assert!(!pep.is_authorized(
        &helpdesk(),
        &Object::new("ticket-1"),
        &Action::new("delete"),
        &Environment::new(),
    ));
}

#[test]
fn test_escalation_to_central_permits() {
    let events = Arc::new(RecordingSink::new());
    let authority = ScriptedAuthority::new(Answer::Decide(RemoteDecision::Permit));
    let pdp = escalating_pdp(authority.clone(), &events);

    assert_eq!(evaluate(&pdp, "delete"), PdpResult::ok(Decision::Permit));
    assert_eq!(authority.calls(), 1);
    assert_eq!(events.count(EventKind::RemoteDecision), 1);
}

#[test]
fn test_central_timing_out_twice_denies() {
    let events = Arc::new(RecordingSink::new());
    let authority = ScriptedAuthority::new(Answer::TimeOut);
    let pdp = escalating_pdp(authority.clone(), &events);

    assert_eq!(evaluate(&pdp, "delete"), PdpResult::ok(Decision::Deny));
    assert_eq!(authority.calls(), 2);
    assert_eq!(events.count(EventKind::RetryingCall), 1);
    assert_eq!(events.count(EventKind::RetryExhausted), 1);
}

#[test]
fn test_expired_deadline_skips_retry() {
    let events = Arc::new(RecordingSink::new());
    let authority = ScriptedAuthority::new(Answer::TimeOut);
    let pdp = escalating_pdp(authority.clone(), &events);

    let result = pdp.evaluate_with_deadline(
        &helpdesk(),
        &Object::new("ticket-1"),
        &Action::new("delete"),
        &Environment::new(),
        Deadline::after(Duration::ZERO),
    );

    assert_eq!(result, PdpResult::ok(Decision::Deny));
    assert_eq!(authority.calls(), 1);
}

#[test]
fn test_unbound_central_default_denies() {
    let events = Arc::new(RecordingSink::new());
    let registry = Arc::new(InProcessRegistry::new());
    let pdp = LocalDecisionPoint::builder(
        PolicySource::inline(policy("application-policy", true)),
        helpdesk_compiler,
    )
    .modules(central_modules(&registry, "central-puma-pdp"))
    .events(events.clone())
    .build();

    assert_eq!(evaluate(&pdp, "delete"), PdpResult::ok(Decision::Deny));
    assert_eq!(events.count(EventKind::ConnectFailed), 1);
    assert_eq!(events.count(EventKind::DefaultDeny), 1);
}

#[test]
fn test_reload_with_wrong_id_keeps_previous_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("application-policy.xml");
    std::fs::write(&path, policy("application-policy", false)).unwrap();
    let events = Arc::new(RecordingSink::new());
    let pdp = LocalDecisionPoint::builder(PolicySource::file(&path), helpdesk_compiler)
        .events(events.clone())
        .build();
    assert_eq!(pdp.status(), LoadStatus::Ready);

    std::fs::write(&path, policy("someone-elses-policy", false)).unwrap();
    let err = pdp.reload().unwrap_err();

    assert!(matches!(err, PolicyError::IdMismatch { .. }));
    assert!(matches!(pdp.status(), LoadStatus::LoadFailed(_)));
    assert!(pdp.is_ready());
    assert_eq!(pdp.generation(), 1);
    assert_eq!(
        pdp.last_loaded_policy_id().as_deref(),
        Some("application-policy")
    );
    assert_eq!(evaluate(&pdp, "read"), PdpResult::ok(Decision::Permit));
    assert_eq!(events.count(EventKind::PolicyLoadFailed), 1);
}

#[test]
fn test_unsupported_reference_still_loads() {
    let pdp = LocalDecisionPoint::builder(
        PolicySource::inline(policy("application-policy", true)),
        helpdesk_compiler,
    )
    .build();

    assert!(pdp.is_ready());
    assert_eq!(pdp.remote_references(), vec![CENTRAL.to_string()]);
    assert_eq!(
        evaluate(&pdp, "delete"),
        PdpResult::ok(Decision::NotApplicable)
    );
}

// ============================================================================
// Snapshot atomicity
// ============================================================================

/// Answers DENY unless the remote agrees with the flavor it was compiled for.
struct FlavoredEngine {
    expected: Decision,
}

impl PolicyEngine for FlavoredEngine {
    fn evaluate(&self, context: &EvaluationContext<'_>) -> EngineResponse {
        let remote = context.evaluate_remote(&PolicyReference::new(CENTRAL));
        if remote == self.expected {
            let code = remote.to_raw().unwrap_or(raw::INDETERMINATE);
            EngineResponse::single(EngineResult::ok(code))
        } else {
            EngineResponse::single(EngineResult::ok(99))
        }
    }
}

#[test]
fn test_reload_never_mixes_policy_and_modules() {
    const READERS: usize = 8;
    const RELOADS: usize = 50;

    let registry = Arc::new(InProcessRegistry::new());
    registry.bind(
        "central-old",
        ScriptedAuthority::new(Answer::Decide(RemoteDecision::Permit)),
    );
    registry.bind(
        "central-new",
        ScriptedAuthority::new(Answer::Decide(RemoteDecision::Deny)),
    );

    let use_new = Arc::new(AtomicBool::new(false));
    let compile_flavor = Arc::clone(&use_new);
    let compiler = move |_: &PolicyDocument| -> PolicyResult<Arc<dyn PolicyEngine>> {
        let expected = if compile_flavor.load(Ordering::SeqCst) {
            Decision::Deny
        } else {
            Decision::Permit
        };
        Ok(Arc::new(FlavoredEngine { expected }))
    };
    let module_flavor = Arc::clone(&use_new);
    let old_modules = central_modules(&registry, "central-old");
    let new_modules = central_modules(&registry, "central-new");
    let modules = move |events: &Arc<dyn EventSink>| {
        if module_flavor.load(Ordering::SeqCst) {
            new_modules.build(events)
        } else {
            old_modules.build(events)
        }
    };

    let pdp = Arc::new(
        LocalDecisionPoint::builder(
            PolicySource::inline(policy("application-policy", true)),
            compiler,
        )
        .modules(modules)
        .build(),
    );

    let done = Arc::new(AtomicBool::new(false));
    let start = Arc::new(Barrier::new(READERS + 1));
    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let pdp = Arc::clone(&pdp);
            let done = Arc::clone(&done);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut seen = 0usize;
                while !done.load(Ordering::SeqCst) || seen == 0 {
                    let result = evaluate(&pdp, "delete");
                    assert!(
                        result == PdpResult::ok(Decision::Permit)
                            || result == PdpResult::ok(Decision::Deny),
                        "mixed snapshot observed: {result:?}"
                    );
                    seen += 1;
                }
                seen
            })
        })
        .collect();

    start.wait();
    for round in 0..RELOADS {
        use_new.store(round % 2 == 0, Ordering::SeqCst);
        pdp.reload().unwrap();
    }
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(pdp.generation(), RELOADS as u64 + 1);
}

// ============================================================================
// Finders
// ============================================================================

struct ClearanceDirectory {
    lookups: AtomicUsize,
}

impl AttributeFinder for ClearanceDirectory {
    fn find(
        &self,
        owner: OwnerKind,
        id: &str,
        data_type: DataType,
        _context: &FinderContext,
    ) -> Result<Option<Vec<Value>>, FinderError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if owner == OwnerKind::Subject && id == "subject:clearance" && data_type == DataType::Integer {
            Ok(Some(vec![Value::Integer(3)]))
        } else {
            Ok(None)
        }
    }
}

struct ClearanceEngine;

impl PolicyEngine for ClearanceEngine {
    fn evaluate(&self, context: &EvaluationContext<'_>) -> EngineResponse {
        let clearance =
            context.find_attribute(OwnerKind::Subject, "subject:clearance", DataType::Integer);
        let today =
            context.find_attribute(OwnerKind::Environment, "environment:current-date", DataType::String);
        let code = match (clearance, today) {
            (Some(_), Some(_)) => raw::PERMIT,
            (None, Some(_)) => raw::NOT_APPLICABLE,
            _ => raw::INDETERMINATE,
        };
        EngineResponse::single(EngineResult::ok(code))
    }
}

#[test]
fn test_remote_access_toggles_query_finder() {
    let directory = Arc::new(ClearanceDirectory {
        lookups: AtomicUsize::new(0),
    });
    let compiler = |_: &PolicyDocument| -> PolicyResult<Arc<dyn PolicyEngine>> {
        Ok(Arc::new(ClearanceEngine))
    };
    let pdp = LocalDecisionPoint::builder(
        PolicySource::inline(policy("application-policy", false)),
        compiler,
    )
    .query_finder(directory.clone())
    .build();

    assert_eq!(
        evaluate(&pdp, "read"),
        PdpResult::ok(Decision::NotApplicable)
    );
    assert_eq!(directory.lookups.load(Ordering::SeqCst), 0);

    pdp.set_remote_access(true).unwrap();
    assert!(pdp.remote_access_enabled());
    assert_eq!(pdp.generation(), 2);
    assert_eq!(evaluate(&pdp, "read"), PdpResult::ok(Decision::Permit));
    assert!(directory.lookups.load(Ordering::SeqCst) > 0);

    pdp.set_remote_access(false).unwrap();
    assert_eq!(
        evaluate(&pdp, "read"),
        PdpResult::ok(Decision::NotApplicable)
    );
}

#[test]
fn test_remote_access_unchanged_when_reload_fails() {
    let directory = Arc::new(ClearanceDirectory {
        lookups: AtomicUsize::new(0),
    });
    let compiler = |_: &PolicyDocument| -> PolicyResult<Arc<dyn PolicyEngine>> {
        Ok(Arc::new(ClearanceEngine))
    };
    let pdp = LocalDecisionPoint::builder(
        PolicySource::inline(policy("application-policy", false)),
        compiler,
    )
    .query_finder(directory.clone())
    .allow_remote_access(true)
    .build();
    assert_eq!(evaluate(&pdp, "read"), PdpResult::ok(Decision::Permit));

    assert!(
        pdp.load_application_policy(&policy("someone-elses-policy", false))
            .is_err()
    );
    assert!(pdp.set_remote_access(false).is_err());

    assert!(pdp.remote_access_enabled());
    assert_eq!(evaluate(&pdp, "read"), PdpResult::ok(Decision::Permit));

    pdp.load_application_policy(&policy("application-policy", false))
        .unwrap();
    pdp.set_remote_access(false).unwrap();
    assert!(!pdp.remote_access_enabled());
    assert_eq!(
        evaluate(&pdp, "read"),
        PdpResult::ok(Decision::NotApplicable)
    );
}
