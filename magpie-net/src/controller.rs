//! Tor control-port client
//!
//! Minimal line-oriented control channel: password authentication and the
//! clean-circuit signal. Speaks just enough of the protocol for circuit
//! rotation; descriptor parsing and event subscriptions are out of scope.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::EngineError;

/// Client for the local anonymity daemon's control port.
///
/// The connection is persistent; [`reconnect`] re-establishes and
/// re-authenticates it after an I/O failure.
///
/// [`reconnect`]: CircuitController::reconnect
#[derive(Debug)]
pub struct CircuitController {
    addr: String,
    password: String,
    stream: BufReader<TcpStream>,
}

impl CircuitController {
    /// Connect to `addr` and authenticate. A rejected password is fatal.
    pub async fn connect(addr: &str, password: &str) -> Result<Self, EngineError> {
        let stream = TcpStream::connect(addr).await?;
        let mut controller = Self {
            addr: addr.to_string(),
            password: password.to_string(),
            stream: BufReader::new(stream),
        };
        controller.authenticate().await?;
        debug!("control channel authenticated at {}", addr);
        Ok(controller)
    }

    /// Ask the daemon for clean circuits, so new requests share nothing
    /// with old ones. This is what resets the external address.
    pub async fn new_circuit(&mut self) -> Result<(), EngineError> {
        let reply = self.round_trip("SIGNAL NEWNYM").await?;
        if reply.starts_with("250") {
            Ok(())
        } else {
            Err(EngineError::Control(reply))
        }
    }

    /// Drop and re-establish the control connection.
    pub async fn reconnect(&mut self) -> Result<(), EngineError> {
        let stream = TcpStream::connect(&self.addr).await?;
        self.stream = BufReader::new(stream);
        self.authenticate().await
    }

    async fn authenticate(&mut self) -> Result<(), EngineError> {
        let command = format!("AUTHENTICATE \"{}\"", escape_quoted(&self.password));
        let reply = self.round_trip(&command).await?;
        if reply.starts_with("250") {
            Ok(())
        } else {
            Err(EngineError::AuthRejected(reply))
        }
    }

    async fn round_trip(&mut self, command: &str) -> Result<String, EngineError> {
        self.stream.write_all(command.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;

        let mut reply = String::new();
        let read = self.stream.read_line(&mut reply).await?;
        if read == 0 {
            return Err(EngineError::Control("connection closed".to_string()));
        }
        Ok(reply.trim_end().to_string())
    }
}

/// Escape a password for the control protocol's quoted-string syntax.
fn escape_quoted(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
