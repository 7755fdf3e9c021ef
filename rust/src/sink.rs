//! Outbound sinks: where scheduled sends finally go.

use std::io::{self, Write};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Mutex;

use crate::command::ActionValue;
use crate::lock::lock_or_recover;
use crate::osc::{args_for_value, OscMessage};

/// Fire-and-forget destination for protocol sends.
///
/// Implementations must not block the caller for long: immediate sends run on
/// the matching worker's thread.
pub trait OutboundSink: Send + Sync {
    fn send(&self, address: &str, value: &ActionValue) -> Result<(), SinkError>;
}

/// Errors reported by a sink; callers log them and move on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    Resolve(String),
    Io(String),
    Rejected(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolve(msg) => write!(f, "cannot resolve target: {msg}"),
            Self::Io(msg) => write!(f, "send failed: {msg}"),
            Self::Rejected(msg) => write!(f, "send rejected: {msg}"),
        }
    }
}

impl std::error::Error for SinkError {}

impl From<io::Error> for SinkError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// OSC over UDP to a single target.
#[derive(Debug)]
pub struct OscUdpSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl OscUdpSink {
    pub fn connect(host: &str, port: u16) -> Result<Self, SinkError> {
        let target = (host, port)
            .to_socket_addrs()
            .map_err(|err| SinkError::Resolve(format!("{host}:{port}: {err}")))?
            .next()
            .ok_or_else(|| SinkError::Resolve(format!("{host}:{port}: no addresses")))?;
        let bind_addr: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0_u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;
        tracing::info!(%target, "OSC sender ready");
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl OutboundSink for OscUdpSink {
    fn send(&self, address: &str, value: &ActionValue) -> Result<(), SinkError> {
        let packet = OscMessage::new(address, args_for_value(value)).encode();
        self.socket.send_to(&packet, self.target)?;
        Ok(())
    }
}

/// Prints `address = value` lines instead of transmitting (for `--dry-run`).
pub struct StdoutSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboundSink for StdoutSink {
    fn send(&self, address: &str, value: &ActionValue) -> Result<(), SinkError> {
        let mut out = lock_or_recover(&self.out, "stdout sink");
        writeln!(out, "{address} = {value}")?;
        out.flush()?;
        Ok(())
    }
}

/// In-memory sink that records every send; optionally fails on demand.
#[cfg(any(test, feature = "mutants"))]
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, ActionValue)>>,
    fail_addresses: Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "mutants"))]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `address` fail with [`SinkError::Rejected`].
    pub fn fail_on(&self, address: &str) {
        lock_or_recover(&self.fail_addresses, "recording sink failures").push(address.to_string());
    }

    pub fn sent(&self) -> Vec<(String, ActionValue)> {
        lock_or_recover(&self.sent, "recording sink").clone()
    }
}

#[cfg(any(test, feature = "mutants"))]
impl OutboundSink for RecordingSink {
    fn send(&self, address: &str, value: &ActionValue) -> Result<(), SinkError> {
        if lock_or_recover(&self.fail_addresses, "recording sink failures")
            .iter()
            .any(|failing| failing == address)
        {
            return Err(SinkError::Rejected(address.to_string()));
        }
        lock_or_recover(&self.sent, "recording sink").push((address.to_string(), value.clone()));
        Ok(())
    }
}
