//! Protocol codec
//!
//! Encoding of command lines and decoding of raw response bytes.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! <name>[ <arg>]*\n        arguments containing a space are wrapped in "..."
//! ```
//!
//! ### Response Format
//! ```text
//! key: value\n             zero or more items
//! binary: <n>\n            optional, followed by exactly n raw bytes and \n
//! OK\n                     success
//! ACK [code@idx] {cmd} msg error
//! ```
//!
//! A response is decoded by a two-state scanner: `Line` splits on `\n`,
//! `Raw { remaining }` copies a fixed number of bytes verbatim.

use bytes::Bytes;

use super::{Ack, Command, ParsedResponse, ResponseItem, Terminator, Value};
use crate::error::{MpdError, Result};

/// Prefix of the line the server sends on connect
pub const GREETING_PREFIX: &str = "OK MPD ";

/// Reply to a successful `password` command
pub const AUTH_OK: &[u8] = b"OK\n";

pub const BINARY_KEY: &str = "binary";
pub const BINARY_DATA_KEY: &str = "binary_data";

const OK_LINE: &[u8] = b"OK";
const ACK_PREFIX: &[u8] = b"ACK";
const BINARY_PREFIX: &[u8] = b"binary: ";
const BINARY_DATA_PREFIX: &[u8] = b"binary_data: ";

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command to its wire line, without the trailing newline
///
/// Arguments containing a space are wrapped in double quotes; nothing is escaped.
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut line = command.name.clone();

    for arg in &command.args {
        let arg = arg.to_string();
        line.push(' ');
        if arg.contains(' ') {
            line.push('"');
            line.push_str(&arg);
            line.push('"');
        } else {
            line.push_str(&arg);
        }
    }

    line.into_bytes()
}

/// Encode the authentication command; the secret is always quoted
pub fn encode_password(password: &str) -> Vec<u8> {
    format!("password \"{}\"", password).into_bytes()
}

/// Extract the server version from the greeting line
pub fn parse_greeting(bytes: &[u8]) -> Result<String> {
    let line = String::from_utf8_lossy(bytes);
    let line = line.trim_end_matches('\n');

    line.strip_prefix(GREETING_PREFIX)
        .map(str::to_string)
        .ok_or_else(|| MpdError::Protocol(format!("Unexpected greeting: {:?}", line)))
}

// =============================================================================
// Response Decoding
// =============================================================================

/// Scanner state while walking a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Splitting on newlines
    Line,

    /// Inside a binary block
    Raw { remaining: usize },
}

/// Decode a raw response into its items and terminator
///
/// Never fails: malformed lines become empty items and a stream that ends
/// without `OK`/`ACK` reports `Terminator::Missing` with the items seen so far.
pub fn parse_response(bytes: &[u8]) -> ParsedResponse {
    let mut items = Vec::new();
    let mut state = ScanState::Line;
    let mut pos: usize = 0;

    loop {
        match state {
            ScanState::Raw { remaining } => {
                let end = match pos.checked_add(remaining) {
                    Some(end) if end <= bytes.len() => end,
                    _ => break,
                };

                items.push(ResponseItem::new(
                    BINARY_DATA_KEY,
                    Value::Bytes(Bytes::copy_from_slice(&bytes[pos..end])),
                ));
                pos = end;

                // Separator emitted after the block
                if bytes.get(pos) == Some(&b'\n') {
                    pos += 1;
                }
                state = ScanState::Line;
            }
            ScanState::Line => {
                let Some(len) = bytes[pos..].iter().position(|&b| b == b'\n') else {
                    break;
                };
                let segment = &bytes[pos..pos + len];
                pos += len + 1;

                if segment == OK_LINE {
                    return ParsedResponse {
                        items,
                        terminator: Terminator::Ok,
                    };
                }

                if let Some(rest) = segment.strip_prefix(ACK_PREFIX) {
                    let ack = Ack::parse(&String::from_utf8_lossy(rest));
                    return ParsedResponse {
                        items,
                        terminator: Terminator::Ack(ack),
                    };
                }

                if let Some(rest) = segment.strip_prefix(BINARY_PREFIX) {
                    match parse_length(rest) {
                        Some(length) => {
                            items.push(ResponseItem::new(BINARY_KEY, Value::Int(length as i64)));
                            state = ScanState::Raw { remaining: length };
                        }
                        None => items.push(ResponseItem::empty()),
                    }
                    continue;
                }

                items.push(parse_item(segment));
            }
        }
    }

    ParsedResponse {
        items,
        terminator: Terminator::Missing,
    }
}

/// Parse a single `key: value` segment
///
/// Keys are ASCII letters, `-` and `_` only. Values that are all digits become
/// integers, digits with dots become floats, anything else stays a string.
pub fn parse_item(segment: &[u8]) -> ResponseItem {
    if let Some(data) = segment.strip_prefix(BINARY_DATA_PREFIX) {
        return ResponseItem::new(BINARY_DATA_KEY, Value::Bytes(Bytes::copy_from_slice(data)));
    }

    let line = String::from_utf8_lossy(segment);
    let Some((key, value)) = line.split_once(": ") else {
        return ResponseItem::empty();
    };

    let valid_key = key
        .bytes()
        .all(|b| b.is_ascii_alphabetic() || b == b'-' || b == b'_');
    if !valid_key {
        return ResponseItem::empty();
    }

    ResponseItem::with_text(key, coerce_value(value), value)
}

fn coerce_value(value: &str) -> Value {
    if value.is_empty() {
        return Value::Str(String::new());
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(int) = value.parse() {
            return Value::Int(int);
        }
    } else if value.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        if let Ok(float) = value.parse() {
            return Value::Float(float);
        }
    }

    Value::Str(value.to_string())
}

fn parse_length(text: &[u8]) -> Option<usize> {
    std::str::from_utf8(text).ok()?.trim().parse().ok()
}
