//! Remote evaluator modules built from configuration.

use std::sync::Arc;

use puma_config::{
    BinaryTransportConfig, CentralConfig, LegacyTransportConfig, RestTransportConfig,
    TransportKind,
};
use puma_remote::{
    AuthorityRegistry, BinaryConfig, BinaryConnector, EvaluatorModule, LegacyConfig,
    LegacyConnector, RemoteModule, RestConfig, RestConnector,
};
use puma_types::EventSink;

use crate::error::{PumaError, Result};

pub fn binary_config(config: &BinaryTransportConfig) -> BinaryConfig {
    BinaryConfig {
        host: config.host.clone(),
        port: config.port,
        connect_timeout: config.connect_timeout(),
        call_timeout: config.call_timeout(),
    }
}

pub fn rest_config(config: &RestTransportConfig) -> RestConfig {
    RestConfig {
        base_url: config.base_url.clone(),
        timeout: config.timeout(),
    }
}

pub fn legacy_config(config: &LegacyTransportConfig) -> LegacyConfig {
    LegacyConfig {
        registry_name: config.registry_name.clone(),
        call_timeout: config.call_timeout(),
    }
}

/// Builds one module per configured transport, in routing order.
///
/// Every module answers for the configured `supported_policy_ids`.
#[derive(Clone)]
pub struct CentralModules {
    central: CentralConfig,
    registry: Option<Arc<dyn AuthorityRegistry>>,
}

impl CentralModules {
    /// Checks that every configured transport can be wired.
    pub fn new(
        central: CentralConfig,
        registry: Option<Arc<dyn AuthorityRegistry>>,
    ) -> Result<Self> {
        if central.transports.contains(&TransportKind::Legacy) && registry.is_none() {
            return Err(PumaError::MissingCollaborator {
                transport: TransportKind::Legacy,
                missing: "an authority registry",
            });
        }
        Ok(Self { central, registry })
    }

    pub fn transports(&self) -> &[TransportKind] {
        &self.central.transports
    }

    pub fn module(&self, transport: TransportKind, events: &Arc<dyn EventSink>) -> Option<EvaluatorModule> {
        let ids = self.central.supported_policy_ids.iter().cloned();
        let events = Arc::clone(events);
        let module = match transport {
            TransportKind::Binary => EvaluatorModule::Binary(RemoteModule::new(
                BinaryConnector::new(binary_config(&self.central.binary)),
                ids,
                events,
            )),
            TransportKind::Rest => EvaluatorModule::Rest(RemoteModule::new(
                RestConnector::new(rest_config(&self.central.rest)),
                ids,
                events,
            )),
            TransportKind::Legacy => EvaluatorModule::Legacy(RemoteModule::new(
                LegacyConnector::new(
                    Arc::clone(self.registry.as_ref()?),
                    legacy_config(&self.central.legacy),
                ),
                ids,
                events,
            )),
        };
        Some(module)
    }

    pub fn build(&self, events: &Arc<dyn EventSink>) -> Vec<EvaluatorModule> {
        self.central
            .transports
            .iter()
            .filter_map(|&transport| self.module(transport, events))
            .collect()
    }
}

impl std::fmt::Debug for CentralModules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CentralModules")
            .field("transports", &self.central.transports)
            .field("supported_policy_ids", &self.central.supported_policy_ids)
            .field("registry", &self.registry.is_some())
            .finish()
    }
}
