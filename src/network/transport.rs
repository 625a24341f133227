//! Transport
//!
//! Owns one TCP socket to the server and moves raw bytes over it.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use socket2::SockRef;

use crate::config::Config;
use crate::error::{MpdError, Result};

/// Server host and port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Blocking byte pipe to the server
pub trait Transport: Send {
    /// Write `data` followed by a single newline
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read until a short read; empty if the read timed out with nothing received.
    /// A timeout after part of a response has arrived is an error.
    fn receive(&mut self) -> io::Result<Vec<u8>>;

    /// Current read timeout, `None` blocks indefinitely
    fn timeout(&self) -> Option<Duration>;

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Release the socket. Calling it twice is a no-op.
    fn close(&mut self);

    /// Second handle on the socket, used to interrupt a blocked read
    fn interrupt_handle(&self) -> Option<TcpStream> {
        None
    }
}

/// Produces fresh transports to one fixed address
pub trait Connector: Send {
    type Transport: Transport;

    fn connect(&mut self) -> Result<Self::Transport>;

    fn address(&self) -> &Address;
}

// =============================================================================
// TCP Transport
// =============================================================================

/// Transport over a connected `TcpStream`
pub struct TcpTransport {
    stream: Option<TcpStream>,
    timeout: Option<Duration>,
    chunk_size: usize,
}

impl TcpTransport {
    /// Connect to the first reachable address candidate
    ///
    /// Each candidate gets `connect_timeout`; the winning socket keeps it as its
    /// read/write timeout and has keep-alive and `TCP_NODELAY` enabled.
    pub fn connect(address: &Address, connect_timeout: Duration, chunk_size: usize) -> Result<Self> {
        let candidates: Vec<SocketAddr> = (address.host.as_str(), address.port)
            .to_socket_addrs()
            .map_err(|e| MpdError::Connect {
                address: address.to_string(),
                reason: format!("address resolution failed: {}", e),
            })?
            .collect();

        if candidates.is_empty() {
            return Err(MpdError::Connect {
                address: address.to_string(),
                reason: "no address candidates found".to_string(),
            });
        }

        let mut last_error = None;
        for candidate in candidates {
            tracing::debug!("Attempting to connect to {}", candidate);

            match Self::connect_candidate(&candidate, connect_timeout) {
                Ok(stream) => {
                    tracing::debug!("Connected to {}", candidate);
                    return Ok(Self {
                        stream: Some(stream),
                        timeout: Some(connect_timeout),
                        chunk_size,
                    });
                }
                Err(e) => {
                    tracing::debug!("Attempt on {} failed: {}", candidate, e);
                    last_error = Some(e);
                }
            }
        }

        Err(MpdError::Connect {
            address: address.to_string(),
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    fn connect_candidate(candidate: &SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
        let stream = TcpStream::connect_timeout(candidate, timeout)?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        SockRef::from(&stream).set_keepalive(true)?;

        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(stream)
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "transport closed"))
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let stream = self.stream()?;

        let mut line = Vec::with_capacity(data.len() + 1);
        line.extend_from_slice(data);
        line.push(b'\n');

        stream.write_all(&line)?;
        stream.flush()
    }

    fn receive(&mut self) -> io::Result<Vec<u8>> {
        let chunk_size = self.chunk_size;
        let stream = self.stream()?;

        let mut data = Vec::new();
        let mut chunk = vec![0u8; chunk_size];

        // A read shorter than the chunk marks the end of the response. Only a
        // timeout with nothing read yet counts as "no response"; one that cuts
        // off a partial response is an error.
        loop {
            match stream.read(&mut chunk) {
                Ok(n) => {
                    data.extend_from_slice(&chunk[..n]);
                    if n < chunk_size {
                        return Ok(data);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    if data.is_empty() {
                        return Ok(data);
                    }
                    tracing::debug!("Read timed out after {} bytes", data.len());
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let stream = self.stream()?;
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        self.timeout = timeout;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn interrupt_handle(&self) -> Option<TcpStream> {
        self.stream.as_ref().and_then(|s| s.try_clone().ok())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Connector that opens `TcpTransport`s from a config
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: Address,
    connect_timeout: Duration,
    chunk_size: usize,
}

impl TcpConnector {
    pub fn new(config: &Config) -> Self {
        Self {
            address: config.address(),
            connect_timeout: config.connect_timeout(),
            chunk_size: config.chunk_size,
        }
    }
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn connect(&mut self) -> Result<TcpTransport> {
        TcpTransport::connect(&self.address, self.connect_timeout, self.chunk_size)
    }

    fn address(&self) -> &Address {
        &self.address
    }
}
