//! # puma-wire: Wire encodings for PUMA escalation
//!
//! The same logical call, "evaluate the central policy against these
//! attributes", has two byte-level encodings here:
//!
//! - **Binary RPC**: length-prefixed [`Frame`]s carrying postcard-encoded
//!   [`Request`] / [`Response`] messages over a persistent TCP stream.
//! - **REST**: JSON [`rest::EvaluateBody`] / [`rest::EvaluateReply`] posted
//!   to `{base}/evaluate`.
//!
//! Both answer with a [`RemoteDecision`].

mod decision;
mod error;
mod frame;
mod message;
mod record;
pub mod rest;

pub use decision::{RemoteDecision, code};
pub use error::{WireError, WireResult};
pub use frame::{
    FRAME_HEADER_SIZE, Frame, MAGIC, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION, read_frame, write_frame,
};
pub use message::{
    ErrorResponse, EvaluateRequest, EvaluateResponse, Request, RequestId, RequestPayload, Response,
    ResponsePayload,
};
pub use record::{AttributeRecord, RecordValues, encode_attributes};
