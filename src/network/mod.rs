//! Network Module
//!
//! TCP transport and session handling.
//!
//! ## Architecture
//! - `Transport`: one socket, raw send/receive
//! - `Session`: greeting, authentication, bounded retry with reconnect
//! - One outstanding command per session; responses are never pipelined

mod transport;
mod session;

pub use transport::{Address, Connector, TcpConnector, TcpTransport, Transport};
pub use session::{CancelHandle, Session};
