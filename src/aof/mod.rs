//! Append-Only File (AOF) Module
//!
//! Durability through a log of executed mutating requests.
//!
//! ## Responsibilities
//! - Append each mutating request exactly as it arrived on the wire
//! - Sync to disk on a background timer, and after every append when asked
//! - Replay the log at startup to rebuild the store
//! - Cut off a torn tail left by a crash mid-append
//! - Rewrite the log as the minimal set of requests for the current state
//!
//! ## File Format
//! ```text
//! *3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n   request 1
//! *2\r\n$4\r\nINCR\r\n$1\r\nn\r\n              request 2
//! ...
//! ```
//! Frames are back to back with no separators or checksums; each RESP frame
//! is self-delimiting.

mod flusher;
mod replay;
mod writer;

pub use replay::ReplayStats;
pub use writer::Aof;
