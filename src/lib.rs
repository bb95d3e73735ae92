//! # respkv
//!
//! An in-memory key-value store with:
//! - A byte-exact RESP2 wire protocol
//! - Scalar, hash and list namespaces under a single store lock
//! - An append-only log (AOF) replayed on startup for crash recovery
//! - A blocking, thread-per-connection TCP server
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │                  (Multiple Clients)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  RESP frames
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Command Engine                            │
//! │          (dispatch table, one command at a time)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Store    │          │     AOF     │
//!   │   (Mutex)   │          │  (Append)   │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use respkv::{Engine, Value};
//!
//! let engine = Engine::in_memory();
//! engine.execute(&Value::request(&["SET", "foo", "bar"]));
//! assert_eq!(engine.execute(&Value::request(&["GET", "foo"])), Value::bulk("bar"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod store;
pub mod commands;
pub mod aof;
pub mod engine;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CommandError, KvError, Result};
pub use config::{AofSyncStrategy, Config};
pub use engine::Engine;
pub use protocol::Value;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of respkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
