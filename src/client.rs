//! Client Module
//!
//! Command execution and typed operations on top of a `Session`.
//!
//! ## Responsibilities
//! - Encode commands and classify responses into `Outcome`s
//! - Assemble mappings for the zero-argument status commands
//! - Fetch album art in offset-addressed chunks
//! - Block on `idle` and hand changed subsystems to a caller-supplied sink

use bytes::{Bytes, BytesMut};
use crossbeam::channel::Sender;

use crate::config::Config;
use crate::error::{MpdError, Result};
use crate::network::{CancelHandle, Connector, Session, TcpConnector};
use crate::protocol::{
    encode_command, into_map, parse_response, Arg, Command, Mapping, Outcome, ResponseItem,
    Terminator, BINARY_DATA_KEY, BINARY_KEY,
};

/// Client bound to one session
///
/// Commands are strictly sequential: every call blocks until its response is
/// parsed or the session gave up retrying.
pub struct Client<C: Connector = TcpConnector> {
    session: Session<C>,
}

impl Client<TcpConnector> {
    /// Open a TCP session using `config`
    pub fn open(config: &Config) -> Result<Self> {
        Ok(Self {
            session: Session::open(config)?,
        })
    }

    /// Open a TCP session with default settings for everything but the address
    pub fn connect(host: &str, port: u16, password: Option<&str>) -> Result<Self> {
        let config = Config::builder()
            .host(host)
            .port(port)
            .maybe_password(password.map(str::to_string))
            .build();
        Self::open(&config)
    }
}

impl<C: Connector> Client<C> {
    /// Open a session on transports produced by `connector`
    pub fn with_connector(connector: C, config: &Config) -> Result<Self> {
        Ok(Self {
            session: Session::with_connector(connector, config)?,
        })
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    /// Server protocol version
    pub fn version(&self) -> &str {
        self.session.version()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.session.cancel_handle()
    }

    // =========================================================================
    // Protocol Engine
    // =========================================================================

    /// Send a command and classify its response
    ///
    /// Permission errors are returned as `MpdError::Auth`; any other `ACK`
    /// becomes `Outcome::Error`.
    pub fn execute(&mut self, command: &Command) -> Result<Outcome> {
        let line = encode_command(command);
        tracing::trace!("Sending {:?}", String::from_utf8_lossy(&line));

        let response = self.session.exchange(&line)?;
        if response.is_empty() {
            tracing::debug!("No response to {}", command.name);
            return Ok(Outcome::Empty);
        }

        let parsed = parse_response(&response);
        match parsed.terminator {
            Terminator::Ok => Ok(Outcome::Success(parsed.items)),
            Terminator::Missing => {
                tracing::warn!(
                    "Response to {} ended without OK, keeping {} items",
                    command.name,
                    parsed.items.len()
                );
                Ok(Outcome::Success(parsed.items))
            }
            Terminator::Ack(ack) if ack.is_permission_denied() => {
                tracing::error!("{}", ack);
                Err(MpdError::Auth(ack.message))
            }
            Terminator::Ack(ack) => {
                tracing::error!("{}", ack);
                Ok(Outcome::Error(ack))
            }
        }
    }

    /// Run a command and return its items; empty on error or no response
    pub fn run<I, A>(&mut self, name: &str, args: I) -> Result<Vec<ResponseItem>>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let command = Command::new(name).args(args);
        Ok(self.execute(&command)?.into_items())
    }

    /// Run a zero-argument command and assemble its mapping
    pub fn run_simple(&mut self, name: &str) -> Result<Mapping> {
        let items = self.run(name, std::iter::empty::<Arg>())?;
        Ok(into_map(items))
    }

    // =========================================================================
    // Typed Operations
    // =========================================================================

    /// Database statistics
    pub fn stats(&mut self) -> Result<Mapping> {
        self.run_simple("stats")
    }

    /// Player and volume status
    pub fn status(&mut self) -> Result<Mapping> {
        self.run_simple("status")
    }

    /// Tags of the song currently playing
    pub fn current_song(&mut self) -> Result<Mapping> {
        self.run_simple("currentsong")
    }

    /// Fetch album art for `path`, or for the current song if `None`
    ///
    /// Returns `None` when there is no current song or when any chunk request
    /// yields nothing. A missing cover and a connection that stayed down for
    /// every retry look the same from here.
    pub fn album_art(&mut self, path: Option<&str>) -> Result<Option<Bytes>> {
        let path = match path {
            Some(path) => path.to_string(),
            None => {
                // Raw text, so numeric-looking paths are sent back unchanged
                let song = self.run("currentsong", std::iter::empty::<Arg>())?;
                match song.into_iter().rev().find(|item| item.key == "file") {
                    Some(file) => file.text,
                    None => {
                        tracing::debug!("No current song, no album art");
                        return Ok(None);
                    }
                }
            }
        };

        let mut transfer = BinaryTransfer::default();
        loop {
            let items = self.run("albumart", [Arg::from(&path), Arg::from(transfer.offset)])?;
            if items.is_empty() {
                tracing::debug!("No album art for {}", path);
                return Ok(None);
            }

            transfer.append(into_map(items))?;
            if transfer.is_complete() {
                break;
            }
        }

        tracing::debug!("Fetched {} bytes of album art for {}", transfer.total, path);
        Ok(Some(transfer.data.freeze()))
    }

    /// Block until one of `subsystems` changes and return its name
    ///
    /// Switches the session to unbounded reads first. `None` means the server
    /// ended the idle without a change.
    pub fn wait_for_change(&mut self, subsystems: &[&str]) -> Result<Option<String>> {
        self.session.set_timeout(None)?;

        let command = Command::new("idle").args(subsystems.iter().copied());
        let items = self.execute(&command)?.into_result()?;

        Ok(into_map(items)
            .get("changed")
            .and_then(|value| value.as_str())
            .map(str::to_string))
    }

    /// Deliver every change of `subsystems` to `sink` until stopped
    ///
    /// Returns `Ok(())` once the receiving side hangs up or the session is
    /// cancelled through its `CancelHandle`.
    pub fn watch(&mut self, subsystems: &[&str], sink: &Sender<String>) -> Result<()> {
        loop {
            match self.wait_for_change(subsystems) {
                Ok(Some(subsystem)) => {
                    tracing::debug!("Subsystem change detected: {}", subsystem);
                    if sink.send(subsystem).is_err() {
                        tracing::debug!("Change receiver dropped, stopping watch");
                        return Ok(());
                    }
                }
                Ok(None) => continue,
                Err(MpdError::Cancelled) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Close the session
    pub fn close(mut self) {
        self.session.close();
    }
}

/// Open a client, run `f`, and close the client on every exit path
pub fn with_session<F, R>(config: &Config, f: F) -> Result<R>
where
    F: FnOnce(&mut Client) -> Result<R>,
{
    let mut client = Client::open(config)?;
    let result = f(&mut client);
    client.close();
    result
}

/// State of one chunked album art download
#[derive(Debug, Default)]
struct BinaryTransfer {
    offset: usize,
    total: usize,
    data: BytesMut,
}

impl BinaryTransfer {
    /// Add one chunk response: `size`, `binary` length and `binary_data`
    fn append(&mut self, chunk: Mapping) -> Result<()> {
        let size = chunk
            .get("size")
            .and_then(|v| v.as_int())
            .ok_or_else(|| MpdError::Protocol("album art chunk without size".to_string()))?;
        let length = chunk
            .get(BINARY_KEY)
            .and_then(|v| v.as_int())
            .ok_or_else(|| MpdError::Protocol("album art chunk without length".to_string()))?;
        let data = chunk
            .get(BINARY_DATA_KEY)
            .and_then(|v| v.as_bytes())
            .ok_or_else(|| MpdError::Protocol("album art chunk without data".to_string()))?;

        self.total = size as usize;
        self.offset += length as usize;
        self.data.extend_from_slice(data);

        if length == 0 && !self.is_complete() {
            return Err(MpdError::Protocol(format!(
                "empty album art chunk at offset {} of {}",
                self.offset, self.total
            )));
        }
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.offset >= self.total
    }
}
