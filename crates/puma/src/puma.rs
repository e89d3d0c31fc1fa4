//! Main entry point for embedding PUMA in an application.
//!
//! The `Puma` struct owns one decision point, wired from a [`PumaConfig`],
//! and the enforcement façade in front of it. Construct it once at startup
//! and hand it (or its [`EnforcementPoint`]) to whatever needs to authorize.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use puma_config::PumaConfig;
use puma_pdp::{
    AttributeFinder, EnforcementPoint, LocalDecisionPoint, PolicyCompiler, PolicyResult,
    PolicySource,
};
use puma_remote::AuthorityRegistry;
use puma_types::{Action, Environment, EventSink, Object, PdpResult, Subject, TracingSink};
use tracing::info;

use crate::error::Result;
use crate::modules::CentralModules;

/// Configures a [`Puma`] instance.
pub struct PumaBuilder<P> {
    config: PumaConfig,
    compiler: P,
    registry: Option<Arc<dyn AuthorityRegistry>>,
    query_finder: Option<Arc<dyn AttributeFinder>>,
    events: Arc<dyn EventSink>,
}

impl<P: PolicyCompiler + 'static> PumaBuilder<P> {
    /// Registry the legacy transport looks the central authority up in.
    pub fn registry(mut self, registry: Arc<dyn AuthorityRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Finder used while remote attribute access is allowed.
    pub fn query_finder(mut self, finder: Arc<dyn AttributeFinder>) -> Self {
        self.query_finder = Some(finder);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Validates the configuration, wires the modules and loads the policy.
    ///
    /// A missing or invalid policy file does not fail the build; the
    /// decision point starts out not ready and reports why.
    pub fn build(self) -> Result<Puma> {
        self.config.validate()?;
        let modules = CentralModules::new(self.config.central.clone(), self.registry)?;
        info!(
            policy = %self.config.policy_path().display(),
            transports = ?modules.transports(),
            "wiring decision point"
        );

        let mut builder = LocalDecisionPoint::builder(
            PolicySource::file(self.config.policy_path()),
            self.compiler,
        )
        .expected_policy_id(self.config.pdp.expected_policy_id.clone())
        .allow_remote_access(self.config.pdp.allow_remote_access)
        .modules(move |events: &Arc<dyn EventSink>| modules.build(events))
        .events(self.events);
        if let Some(finder) = self.query_finder {
            builder = builder.query_finder(finder);
        }

        let pdp = Arc::new(builder.build());
        Ok(Puma {
            config: self.config,
            enforcement: EnforcementPoint::new(Arc::clone(&pdp)),
            pdp,
        })
    }
}

/// A configured decision point plus its enforcement façade.
#[derive(Debug)]
pub struct Puma {
    config: PumaConfig,
    pdp: Arc<LocalDecisionPoint>,
    enforcement: EnforcementPoint,
}

impl Puma {
    pub fn builder<P: PolicyCompiler + 'static>(config: PumaConfig, compiler: P) -> PumaBuilder<P> {
        PumaBuilder {
            config,
            compiler,
            registry: None,
            query_finder: None,
            events: Arc::new(TracingSink),
        }
    }

    /// Loads the layered configuration of `project_dir` and builds from it.
    pub fn open<P: PolicyCompiler + 'static>(
        project_dir: impl AsRef<Path>,
        compiler: P,
    ) -> anyhow::Result<Self> {
        let config = PumaConfig::load_from_dir(project_dir)?;
        Self::builder(config, compiler)
            .build()
            .context("Failed to assemble decision point")
    }

    pub fn config(&self) -> &PumaConfig {
        &self.config
    }

    pub fn decision_point(&self) -> &Arc<LocalDecisionPoint> {
        &self.pdp
    }

    pub fn enforcement(&self) -> &EnforcementPoint {
        &self.enforcement
    }

    pub fn evaluate(
        &self,
        subject: &Subject,
        object: &Object,
        action: &Action,
        environment: &Environment,
    ) -> PdpResult {
        self.pdp.evaluate(subject, object, action, environment)
    }

    pub fn is_authorized(
        &self,
        subject: &Subject,
        object: &Object,
        action: &Action,
        environment: &Environment,
    ) -> bool {
        self.enforcement
            .is_authorized(subject, object, action, environment)
    }

    pub fn reload(&self) -> PolicyResult<()> {
        self.pdp.reload()
    }
}
