//! AOF Replay
//!
//! Reads the log from the start and hands each request to a callback.

use std::fs::File;
use std::io::BufReader;

use super::Aof;
use crate::error::{KvError, Result};
use crate::protocol::{RespReader, Value};

/// Result of a replay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayStats {
    /// Number of frames handed to the callback
    pub entries_replayed: u64,

    /// Length of the well-formed prefix of the log
    pub valid_bytes: u64,

    /// Bytes cut from the end of the log (torn or malformed tail)
    pub truncated_bytes: u64,

    /// Whether the log ended in something other than a complete frame
    pub was_truncated: bool,

    /// Parse error that stopped the replay, if any
    pub error: Option<String>,
}

impl Aof {
    /// Replay every frame in the log, oldest first
    ///
    /// Stops at end of file. A malformed or partial frame stops the replay
    /// without failing it: the problem is logged, recorded in the returned
    /// stats, and the file is truncated to the last complete frame so later
    /// appends stay reachable. Only I/O failures are returned as errors.
    ///
    /// Must not run concurrently with appends.
    pub fn replay<F>(&self, mut callback: F) -> Result<ReplayStats>
    where
        F: FnMut(Value),
    {
        let file = File::open(self.path())?;
        let file_len = file.metadata()?.len();
        let mut reader = RespReader::new(BufReader::new(file));
        let mut stats = ReplayStats::default();

        loop {
            match reader.read_value() {
                Ok(Some(value)) => {
                    stats.entries_replayed += 1;
                    callback(value);
                }
                Ok(None) => break,
                Err(KvError::Protocol(msg)) => {
                    tracing::warn!(
                        offset = reader.bytes_consumed(),
                        "AOF contains a malformed frame, ignoring the rest: {}",
                        msg
                    );
                    stats.error = Some(msg);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        stats.valid_bytes = reader.bytes_consumed();
        if stats.valid_bytes < file_len {
            stats.was_truncated = true;
            stats.truncated_bytes = file_len - stats.valid_bytes;
            self.truncate(stats.valid_bytes)?;
            tracing::warn!(
                bytes = stats.truncated_bytes,
                "AOF truncated to last complete frame"
            );
        }

        tracing::info!(
            entries = stats.entries_replayed,
            bytes = stats.valid_bytes,
            "AOF replay finished"
        );
        Ok(stats)
    }
}
