//! Binary RPC request and response messages.

use serde::{Deserialize, Serialize};

use crate::decision::RemoteDecision;
use crate::error::WireResult;
use crate::frame::Frame;
use crate::record::AttributeRecord;

/// Correlates a response with the request it answers.
pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: RequestId,
    pub payload: RequestPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestPayload {
    /// Evaluate the central policy against these attributes.
    Evaluate(EvaluateRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub attributes: Vec<AttributeRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub request_id: RequestId,
    pub payload: ResponsePayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponsePayload {
    Evaluate(EvaluateResponse),
    /// The central decision point could not process the request.
    Error(ErrorResponse),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluateResponse {
    /// Raw decision code, see [`crate::decision::code`].
    pub decision: Option<u32>,
}

impl EvaluateResponse {
    pub fn decision(&self) -> RemoteDecision {
        RemoteDecision::from_code(self.decision)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl Request {
    pub fn evaluate(request_id: RequestId, attributes: Vec<AttributeRecord>) -> Self {
        Self {
            request_id,
            payload: RequestPayload::Evaluate(EvaluateRequest { attributes }),
        }
    }

    pub fn to_frame(&self) -> WireResult<Frame> {
        Frame::new(postcard::to_allocvec(self)?)
    }

    pub fn from_frame(frame: &Frame) -> WireResult<Self> {
        Ok(postcard::from_bytes(&frame.payload)?)
    }
}

impl Response {
    pub fn evaluate(request_id: RequestId, decision: RemoteDecision) -> Self {
        Self {
            request_id,
            payload: ResponsePayload::Evaluate(EvaluateResponse {
                decision: decision.to_code(),
            }),
        }
    }

    pub fn error(request_id: RequestId, message: impl Into<String>) -> Self {
        Self {
            request_id,
            payload: ResponsePayload::Error(ErrorResponse {
                message: message.into(),
            }),
        }
    }

    pub fn to_frame(&self) -> WireResult<Frame> {
        Frame::new(postcard::to_allocvec(self)?)
    }

    pub fn from_frame(frame: &Frame) -> WireResult<Self> {
        Ok(postcard::from_bytes(&frame.payload)?)
    }
}
