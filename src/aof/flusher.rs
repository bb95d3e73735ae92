//! Background AOF flusher
//!
//! A dedicated thread that fsyncs the log on a fixed interval until told to
//! stop.

use std::fs::File;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;

use crate::error::Result;

/// Handle to the running flusher thread
///
/// Dropping the handle stops and joins the thread.
pub(crate) struct Flusher {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Flusher {
    /// Start syncing `file` every `interval`
    pub(crate) fn spawn(file: Arc<Mutex<File>>, interval: Duration) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);
        let ticker = channel::tick(interval);

        let handle = thread::Builder::new()
            .name("aof-flusher".to_string())
            .spawn(move || {
                tracing::debug!(?interval, "AOF flusher started");
                loop {
                    let stop = channel::select! {
                        recv(ticker) -> _ => {
                            let file = file.lock();
                            match file.sync_data() {
                                Ok(()) => tracing::trace!("AOF synced"),
                                Err(e) => tracing::error!("AOF background sync failed: {}", e),
                            }
                            false
                        }
                        // Fires on an explicit signal or when the sender is dropped
                        recv(shutdown_rx) -> _ => true,
                    };
                    if stop {
                        break;
                    }
                }
                tracing::debug!("AOF flusher stopped");
            })?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Signal the thread and wait for it to exit
    pub(crate) fn stop(&mut self) {
        // Disconnecting the channel wakes the select even mid-interval
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("AOF flusher thread panicked");
            }
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.stop();
    }
}
