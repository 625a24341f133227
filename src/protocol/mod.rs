//! Protocol Module
//!
//! Defines the line-oriented wire protocol spoken by the music server.
//!
//! ### Request Format
//! ```text
//! <command>[ <arg>]*\n
//! ```
//!
//! ### Response Format
//! ```text
//! <key>: <value>\n          ordinary item
//! binary: <n>\n<n bytes>\n  binary block
//! OK\n | ACK <message>\n    terminator
//! ```
//!
//! ### Outcomes
//! - Success: terminated by `OK` (or by a dropped connection mid-response)
//! - Error: terminated by `ACK`
//! - Empty: no bytes at all

mod command;
mod response;
mod codec;

pub use command::{Arg, Command};
pub use response::{
    into_map, Ack, Mapping, Outcome, ParsedResponse, ResponseItem, Terminator, Value,
    PERMISSION_DENIED,
};
pub use codec::{
    encode_command, encode_password, parse_greeting, parse_item, parse_response, AUTH_OK,
    BINARY_DATA_KEY, BINARY_KEY, GREETING_PREFIX,
};
