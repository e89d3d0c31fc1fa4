//! Binary RPC transport.
//!
//! One persistent TCP stream per module. Calls sharing that stream are
//! serialized by the connection's own mutex; request ids detect a stream
//! that fell out of step with its responses.

use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use puma_types::CachedAttributeSet;
use puma_wire::{Request, Response, ResponsePayload, encode_attributes, read_frame, write_frame};
use tracing::debug;

use crate::connector::{Connector, Deadline, RemoteResponse};
use crate::error::{TransportError, TransportResult};

/// Where and how patiently to reach the central decision point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub call_timeout: Duration,
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            host: "puma-central-puma-pdp".to_string(),
            port: 9091,
            connect_timeout: Duration::from_secs(2),
            call_timeout: Duration::from_secs(5),
        }
    }
}

impl BinaryConfig {
    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// An open stream to the central decision point.
#[derive(Debug)]
pub struct BinaryConnection {
    stream: Mutex<TcpStream>,
    /// Clone of the stream used to shut it down without taking the lock.
    control: TcpStream,
    peer: SocketAddr,
}

impl BinaryConnection {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

#[derive(Debug)]
pub struct BinaryConnector {
    config: BinaryConfig,
    next_request_id: AtomicU64,
}

impl BinaryConnector {
    pub fn new(config: BinaryConfig) -> Self {
        Self {
            config,
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &BinaryConfig {
        &self.config
    }
}

impl Connector for BinaryConnector {
    type Connection = BinaryConnection;

    fn describe(&self) -> String {
        format!("binary://{}", self.config.target())
    }

    fn connect(&self, deadline: Option<Deadline>) -> TransportResult<BinaryConnection> {
        let target = self.config.target();
        let addrs = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::connect(&target, e))?;

        let mut last_error = None;
        for addr in addrs {
            let budget = Deadline::capped(deadline, self.config.connect_timeout).budget()?;
            match TcpStream::connect_timeout(&addr, budget) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    let control = stream.try_clone()?;
                    debug!(peer = %addr, "connected to central decision point");
                    return Ok(BinaryConnection {
                        stream: Mutex::new(stream),
                        control,
                        peer: addr,
                    });
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(match last_error {
            Some(e) => TransportError::connect(target, e),
            None => TransportError::connect(target, "host resolved to no addresses"),
        })
    }

    fn call(
        &self,
        connection: &BinaryConnection,
        attributes: &CachedAttributeSet,
        deadline: Option<Deadline>,
    ) -> TransportResult<RemoteResponse> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let frame = Request::evaluate(request_id, encode_attributes(attributes)?).to_frame()?;

        let deadline = Deadline::capped(deadline, self.config.call_timeout);
        let mut stream = connection
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        stream.set_write_timeout(Some(deadline.budget()?))?;
        write_frame(&mut *stream, &frame)?;

        stream.set_read_timeout(Some(deadline.budget()?))?;
        let response = Response::from_frame(&read_frame(&mut *stream)?)?;
        drop(stream);

        if response.request_id != request_id {
            return Err(TransportError::RequestIdMismatch {
                expected: request_id,
                got: response.request_id,
            });
        }

        match response.payload {
            ResponsePayload::Evaluate(evaluate) => Ok(RemoteResponse::single(evaluate.decision())),
            ResponsePayload::Error(error) => Err(TransportError::Remote(error.message)),
        }
    }

    fn close(&self, connection: &BinaryConnection) {
        // Unblocks any call still waiting on this stream.
        let _ = connection.control.shutdown(Shutdown::Both);
    }
}
