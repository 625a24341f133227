//! # mpcover
//!
//! A blocking client for the Music Player Daemon protocol with:
//! - Address resolution with per-candidate connect timeouts
//! - Password authentication and transparent reconnect
//! - Bounded retry of every command (empty result, not an error, when exhausted)
//! - Line and binary-block response parsing
//! - Chunked album art download and `idle` change notifications
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Typed Operations                         │
//! │     status / stats / currentsong / albumart / idle           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Protocol Engine                            │
//! │        encode → exchange → parse → classify (Outcome)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Session                                 │
//! │        greeting, auth, retry (3), reconnect                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Transport                                │
//! │            TcpStream, keep-alive, no delay                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two sessions are expected against one server: one for request/response
//! commands and one parked in `idle` on its own thread.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod network;
pub mod protocol;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MpdError, Result};
pub use config::Config;
pub use client::{with_session, Client};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of mpcover
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
