//! AOF Writer
//!
//! Owns the log file: appends, syncs, rewrites, and the background flusher.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::flusher::Flusher;
use crate::config::AofSyncStrategy;
use crate::error::{KvError, Result};
use crate::protocol::Value;

/// Append-only log of mutating requests
///
/// ## Concurrency
/// - `file`: one mutex, shared with the flusher thread. Held only for the
///   duration of a write, sync, truncate or rewrite swap.
/// - The log never calls back into the store.
pub struct Aof {
    path: PathBuf,

    file: Arc<Mutex<File>>,

    sync_strategy: AofSyncStrategy,

    flusher: Mutex<Option<Flusher>>,

    /// Frames appended since open
    appended: AtomicU64,
}

impl Aof {
    /// Open or create the log at `path` and start the background flusher
    pub fn open(path: &Path, sync_strategy: AofSyncStrategy, flush_interval: Duration) -> Result<Self> {
        if flush_interval.is_zero() {
            return Err(KvError::Config(
                "AOF flush interval must be greater than zero".to_string(),
            ));
        }

        let file = open_append(path)?;
        let file = Arc::new(Mutex::new(file));
        let flusher = Flusher::spawn(Arc::clone(&file), flush_interval)?;

        tracing::info!(path = %path.display(), ?sync_strategy, "AOF opened");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            sync_strategy,
            flusher: Mutex::new(Some(flusher)),
            appended: AtomicU64::new(0),
        })
    }

    /// Append one wire-encoded frame
    ///
    /// Syncs before returning under `AofSyncStrategy::EveryWrite`.
    pub fn append(&self, frame: &[u8]) -> Result<()> {
        let mut file = self.file.lock();
        file.write_all(frame)?;
        if self.sync_strategy == AofSyncStrategy::EveryWrite {
            file.sync_data()?;
        }
        self.appended.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Append a value in its wire encoding
    pub fn append_value(&self, value: &Value) -> Result<()> {
        self.append(&value.marshal())
    }

    /// Force the log to disk now
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_data()?;
        Ok(())
    }

    /// Replace the log with `frames`
    ///
    /// The new contents are written to a sibling file, synced, and renamed
    /// over the log. Appends block for the duration. On error the old log
    /// is left in place.
    pub fn rewrite<I>(&self, frames: I) -> Result<u64>
    where
        I: IntoIterator<Item = Value>,
    {
        let tmp_path = self.rewrite_path();
        let mut file = self.file.lock();

        // The new handle is opened before the rename so a failure leaves the
        // old file both in place and still receiving appends.
        let swapped = write_frames(&tmp_path, frames).and_then(|written| {
            let new_file = open_append(&tmp_path)?;
            fs::rename(&tmp_path, &self.path)?;
            Ok((written, new_file))
        });
        let (written, new_file) = match swapped {
            Ok(swapped) => swapped,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };
        *file = new_file;

        tracing::info!(frames = written, path = %self.path.display(), "AOF rewritten");
        Ok(written)
    }

    /// Cut the log back to `len` bytes
    pub(crate) fn truncate(&self, len: u64) -> Result<()> {
        let file = self.file.lock();
        file.set_len(len)?;
        file.sync_all()?;
        Ok(())
    }

    /// Stop the flusher and sync once more
    ///
    /// Further appends still work but are only synced under
    /// `AofSyncStrategy::EveryWrite` or by calling [`Aof::sync`].
    pub fn close(&self) -> Result<()> {
        if let Some(mut flusher) = self.flusher.lock().take() {
            flusher.stop();
        }
        self.sync()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_strategy(&self) -> AofSyncStrategy {
        self.sync_strategy
    }

    /// Number of frames appended since open
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }

    /// Current size of the log file in bytes
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.lock().metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn flusher_running(&self) -> bool {
        self.flusher
            .lock()
            .as_ref()
            .is_some_and(|flusher| flusher.is_running())
    }

    fn rewrite_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".rewrite");
        PathBuf::from(name)
    }
}

impl Drop for Aof {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("AOF close failed: {}", e);
        }
    }
}

fn open_append(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

fn write_frames<I>(path: &Path, frames: I) -> Result<u64>
where
    I: IntoIterator<Item = Value>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let mut count = 0;
    for frame in frames {
        writer.write_all(&frame.marshal())?;
        count += 1;
    }
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(count)
}
