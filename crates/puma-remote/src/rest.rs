//! HTTP/REST transport.
//!
//! The "connection" is the resolved evaluate endpoint; sockets are pooled
//! by the HTTP agent.

use std::time::Duration;

use puma_types::CachedAttributeSet;
use puma_wire::rest::{EVALUATE_PATH, EvaluateBody, EvaluateReply, RestResult};

use crate::connector::{Connector, Deadline, RemoteResponse};
use crate::error::{TransportError, TransportResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://puma-central-puma-pdp:8080".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// The resolved evaluate endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestEndpoint {
    url: String,
}

impl RestEndpoint {
    pub fn url(&self) -> &str {
        &self.url
    }
}

pub struct RestConnector {
    config: RestConfig,
    agent: ureq::Agent,
}

impl std::fmt::Debug for RestConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConnector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RestConnector {
    pub fn new(config: RestConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.timeout)
            .timeout(config.timeout)
            .build();
        Self { config, agent }
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }
}

impl Connector for RestConnector {
    type Connection = RestEndpoint;

    fn describe(&self) -> String {
        format!("rest {}", self.config.base_url)
    }

    fn connect(&self, _deadline: Option<Deadline>) -> TransportResult<RestEndpoint> {
        let base = self.config.base_url.trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(TransportError::connect(base, "base url must be http(s)"));
        }
        Ok(RestEndpoint {
            url: format!("{base}{EVALUATE_PATH}"),
        })
    }

    fn call(
        &self,
        endpoint: &RestEndpoint,
        attributes: &CachedAttributeSet,
        deadline: Option<Deadline>,
    ) -> TransportResult<RemoteResponse> {
        let body = EvaluateBody::from_cache(attributes).to_json()?;
        let budget = Deadline::capped(deadline, self.config.timeout).budget()?;

        let response = self
            .agent
            .post(&endpoint.url)
            .timeout(budget)
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(|err| match err {
                ureq::Error::Status(status, _) => TransportError::HttpStatus { status },
                ureq::Error::Transport(transport) => TransportError::Http(transport.to_string()),
            })?;

        let reply = EvaluateReply::from_json(&response.into_string()?)?;
        Ok(RemoteResponse {
            results: reply.results.iter().map(RestResult::decision).collect(),
        })
    }
}
