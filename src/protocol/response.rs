//! Response definitions
//!
//! Represents items and outcomes parsed from server responses.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

use crate::error::{MpdError, Result};

/// Substring the server uses for authorization failures
pub const PERMISSION_DENIED: &str = "you don't have permission for";

/// Value of a response item
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bytes(Bytes),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// One `key: value` line or binary block of a response
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseItem {
    pub key: String,
    pub value: Value,

    /// Value exactly as received, empty for binary blocks
    pub text: String,
}

impl ResponseItem {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        let text = match &value {
            Value::Bytes(_) => String::new(),
            other => other.to_string(),
        };
        Self::with_text(key, value, text)
    }

    /// Item whose coerced value came from `text`
    pub fn with_text(key: impl Into<String>, value: Value, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value,
            text: text.into(),
        }
    }

    /// Item produced for a line that is not `key: value`
    pub fn empty() -> Self {
        Self::new("", Value::Str(String::new()))
    }
}

/// Key to value mapping built from response items
pub type Mapping = HashMap<String, Value>;

/// Build a mapping in item order; later duplicates overwrite earlier ones
pub fn into_map(items: Vec<ResponseItem>) -> Mapping {
    items.into_iter().map(|item| (item.key, item.value)).collect()
}

/// Server error line: `ACK [code@list_index] {command} message`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Everything after the `ACK` prefix, trimmed
    pub raw: String,
    pub code: Option<u32>,
    pub list_index: Option<u32>,
    pub command: Option<String>,
    pub message: String,
}

impl Ack {
    /// Parse the text following the `ACK` prefix
    pub fn parse(text: &str) -> Self {
        let raw = text.trim().to_string();
        let mut ack = Self {
            raw: raw.clone(),
            code: None,
            list_index: None,
            command: None,
            message: raw.clone(),
        };

        let Some(rest) = raw.strip_prefix('[') else {
            return ack;
        };
        let Some((location, rest)) = rest.split_once(']') else {
            return ack;
        };
        if let Some((code, index)) = location.split_once('@') {
            ack.code = code.parse().ok();
            ack.list_index = index.parse().ok();
        }

        let rest = rest.trim_start();
        let rest = match rest.strip_prefix('{').and_then(|r| r.split_once('}')) {
            Some((command, rest)) => {
                ack.command = Some(command.to_string());
                rest
            }
            None => rest,
        };
        ack.message = rest.trim().to_string();
        ack
    }

    /// Authorization failure rather than a generic command error
    pub fn is_permission_denied(&self) -> bool {
        self.raw.contains(PERMISSION_DENIED)
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// How the byte stream of a response ended
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Ok,
    Ack(Ack),
    /// Stream ran out before `OK` or `ACK`
    Missing,
}

/// Items of a response plus its terminating line
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub items: Vec<ResponseItem>,
    pub terminator: Terminator,
}

/// Terminal classification of one command exchange
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Vec<ResponseItem>),
    Error(Ack),
    /// No bytes at all, even after retrying
    Empty,
}

impl Outcome {
    /// Items of a successful response, nothing otherwise
    pub fn into_items(self) -> Vec<ResponseItem> {
        match self {
            Outcome::Success(items) => items,
            Outcome::Error(_) | Outcome::Empty => Vec::new(),
        }
    }

    /// Turn error and empty outcomes into hard errors
    pub fn into_result(self) -> Result<Vec<ResponseItem>> {
        match self {
            Outcome::Success(items) => Ok(items),
            Outcome::Error(ack) => Err(MpdError::Command(ack)),
            Outcome::Empty => Err(MpdError::EmptyResponse),
        }
    }
}
