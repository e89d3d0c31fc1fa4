//! Legacy in-process transport.
//!
//! The central authority is looked up by name in a registry and handed the
//! full placeholder request together with the cached attributes. The
//! authority answers with its complete result list.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use puma_types::{CachedAttributeSet, EvaluationRequest};
use puma_wire::RemoteDecision;

use crate::connector::{Connector, Deadline, RemoteResponse};
use crate::error::{TransportError, TransportResult};

/// A central decision point reachable by reference.
pub trait CentralAuthority: Send + Sync {
    fn evaluate(
        &self,
        request: &EvaluationRequest,
        attributes: &CachedAttributeSet,
        deadline: Deadline,
    ) -> TransportResult<Vec<RemoteDecision>>;
}

/// Resolves authorities by name.
pub trait AuthorityRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> TransportResult<Arc<dyn CentralAuthority>>;
}

/// A registry of authorities living in this process.
#[derive(Default)]
pub struct InProcessRegistry {
    entries: RwLock<HashMap<String, Arc<dyn CentralAuthority>>>,
}

impl InProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, name: impl Into<String>, authority: Arc<dyn CentralAuthority>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), authority);
    }

    pub fn unbind(&self, name: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}

impl AuthorityRegistry for InProcessRegistry {
    fn lookup(&self, name: &str) -> TransportResult<Arc<dyn CentralAuthority>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| TransportError::connect(name, "not bound in registry"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyConfig {
    pub registry_name: String,
    pub call_timeout: Duration,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            registry_name: "central-puma-pdp".to_string(),
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// A looked-up authority.
pub struct LegacyConnection {
    authority: Arc<dyn CentralAuthority>,
}

pub struct LegacyConnector {
    registry: Arc<dyn AuthorityRegistry>,
    config: LegacyConfig,
}

impl LegacyConnector {
    pub fn new(registry: Arc<dyn AuthorityRegistry>, config: LegacyConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &LegacyConfig {
        &self.config
    }
}

impl Connector for LegacyConnector {
    type Connection = LegacyConnection;

    fn describe(&self) -> String {
        format!("legacy {}", self.config.registry_name)
    }

    fn connect(&self, _deadline: Option<Deadline>) -> TransportResult<LegacyConnection> {
        let authority = self.registry.lookup(&self.config.registry_name)?;
        Ok(LegacyConnection { authority })
    }

    fn call(
        &self,
        connection: &LegacyConnection,
        attributes: &CachedAttributeSet,
        deadline: Option<Deadline>,
    ) -> TransportResult<RemoteResponse> {
        let deadline = Deadline::capped(deadline, self.config.call_timeout);
        let results = connection.authority.evaluate(
            &EvaluationRequest::placeholder(),
            attributes,
            deadline,
        )?;
        Ok(RemoteResponse { results })
    }
}
