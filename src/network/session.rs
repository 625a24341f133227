//! Session
//!
//! An authenticated, reconnect-capable connection to the server.

use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::transport::{Connector, TcpConnector, Transport};
use crate::config::Config;
use crate::error::{MpdError, Result};
use crate::protocol::{encode_password, parse_greeting, Ack, AUTH_OK};

/// Logical connection that outlives individual transports
///
/// Holds at most one transport. A failed exchange drops it and the next
/// exchange connects, discards the greeting and authenticates again before
/// resending.
pub struct Session<C: Connector = TcpConnector> {
    connector: C,

    /// Live transport, `None` after a failure until the next reconnect
    transport: Option<C::Transport>,

    password: Option<String>,

    /// Protocol version from the first greeting
    version: String,

    /// Read timeout re-applied to every new transport
    read_timeout: Option<Duration>,

    max_attempts: u32,

    reconnects: u64,

    cancel: CancelHandle,
}

impl Session<TcpConnector> {
    /// Connect over TCP using `config`
    pub fn open(config: &Config) -> Result<Self> {
        Self::with_connector(TcpConnector::new(config), config)
    }
}

impl<C: Connector> Session<C> {
    /// Open a session on transports produced by `connector`
    ///
    /// Consumes the greeting, authenticates if a password is configured and
    /// applies the configured read timeout.
    pub fn with_connector(mut connector: C, config: &Config) -> Result<Self> {
        config.validate()?;

        let mut transport = connector.connect()?;
        let greeting = transport.receive()?;
        if greeting.is_empty() {
            return Err(MpdError::Connect {
                address: connector.address().to_string(),
                reason: "no greeting received".to_string(),
            });
        }
        let version = parse_greeting(&greeting)?;
        tracing::info!("Connected to {} (MPD {})", connector.address(), version);

        let mut session = Self {
            connector,
            transport: None,
            password: config.password.clone(),
            version,
            read_timeout: config.read_timeout(),
            max_attempts: config.max_attempts,
            reconnects: 0,
            cancel: CancelHandle::default(),
        };
        session.install(transport)?;

        Ok(session)
    }

    /// Server protocol version captured at connect time
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Change the read timeout, `None` blocks indefinitely
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.read_timeout = timeout;
        if let Some(transport) = self.transport.as_mut() {
            tracing::debug!("Read timeout {:?} -> {:?}", transport.timeout(), timeout);
            transport.set_timeout(timeout)?;
        }
        Ok(())
    }

    /// Number of times the transport has been replaced
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Handle that can cancel this session from another thread
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Reconnect if the last exchange left the session without a transport
    pub fn ensure_connected(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(MpdError::Cancelled);
        }
        if self.transport.is_none() {
            self.reconnect()?;
        }
        Ok(())
    }

    /// Send one command line and collect the raw response
    ///
    /// Retries up to the configured number of attempts. A send error, a receive
    /// error or an empty response fails the attempt. Returns an empty buffer
    /// once every attempt failed.
    pub fn exchange(&mut self, line: &[u8]) -> Result<Vec<u8>> {
        for attempt in 1..=self.max_attempts {
            match self.try_exchange(line) {
                Ok(response) if !response.is_empty() => return Ok(response),
                Ok(_) => {
                    tracing::warn!(
                        "Attempt {}/{}: no response from {}",
                        attempt,
                        self.max_attempts,
                        self.connector.address()
                    );
                }
                Err(e @ (MpdError::Connect { .. } | MpdError::Auth(_) | MpdError::Cancelled)) => {
                    return Err(e)
                }
                Err(e) => {
                    tracing::warn!("Attempt {}/{} failed: {}", attempt, self.max_attempts, e);
                }
            }

            if self.cancel.is_cancelled() {
                return Err(MpdError::Cancelled);
            }
            self.drop_transport();
        }

        Ok(Vec::new())
    }

    /// Close the transport; the session reconnects on the next exchange
    pub fn close(&mut self) {
        self.drop_transport();
    }

    fn try_exchange(&mut self, line: &[u8]) -> Result<Vec<u8>> {
        self.ensure_connected()?;

        let transport = self.transport.as_mut().ok_or_else(|| {
            MpdError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no transport",
            ))
        })?;

        transport.send(line)?;
        Ok(transport.receive()?)
    }

    fn reconnect(&mut self) -> Result<()> {
        self.drop_transport();
        self.reconnects += 1;
        tracing::warn!("Reconnecting to {}", self.connector.address());

        let mut transport = self.connector.connect()?;

        // Greeting of the new connection is not part of any command's response
        let greeting = transport.receive()?;
        tracing::debug!("Discarded greeting: {:?}", String::from_utf8_lossy(&greeting));

        self.install(transport)
    }

    fn install(&mut self, mut transport: C::Transport) -> Result<()> {
        authenticate(&mut transport, self.password.as_deref())?;
        transport.set_timeout(self.read_timeout)?;

        self.cancel.register(transport.interrupt_handle());
        self.transport = Some(transport);
        Ok(())
    }

    fn drop_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.cancel.register(None);
    }
}

impl<C: Connector> Drop for Session<C> {
    fn drop(&mut self) {
        self.drop_transport();
    }
}

/// Send the password and require a literal `OK`
fn authenticate<T: Transport>(transport: &mut T, password: Option<&str>) -> Result<()> {
    let Some(password) = password else {
        tracing::debug!("No password provided, assuming successful connection");
        return Ok(());
    };

    transport.send(&encode_password(password))?;
    let reply = transport.receive()?;

    if reply == AUTH_OK {
        tracing::info!("Successful authentication");
        return Ok(());
    }

    let text = String::from_utf8_lossy(&reply);
    let text = text.trim_end();
    let message = match text.strip_prefix("ACK") {
        Some(rest) => Ack::parse(rest).message,
        None if text.is_empty() => "no reply to password command".to_string(),
        None => text.to_string(),
    };

    tracing::error!("Failed to authenticate: {}", message);
    Err(MpdError::Auth(message))
}

// =============================================================================
// Cancellation
// =============================================================================

/// Cancels a session from another thread
///
/// Shuts down the live socket so a read blocked in `idle` fails at once, and
/// stops the session from reconnecting afterwards.
#[derive(Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    stream: Mutex<Option<TcpStream>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        if let Some(stream) = self.inner.stream.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    fn register(&self, stream: Option<TcpStream>) {
        let mut slot = self.inner.stream.lock();
        *slot = stream;
        if self.is_cancelled() {
            if let Some(stream) = slot.take() {
                let _ = stream.shutdown(Shutdown::Both);
            }
        }
    }
}
