//! Engine Module
//!
//! The command engine that coordinates the store and the append-only log.
//!
//! ## Responsibilities
//! - Resolve requests through the dispatch table
//! - Run each command under the store lock
//! - Log successful mutating requests
//! - Rebuild the store from the log on startup
//! - Compact the log on demand

use std::fs;
use std::path::Path;

use crate::aof::{Aof, ReplayStats};
use crate::commands::CommandTable;
use crate::config::Config;
use crate::error::Result;
use crate::protocol::Value;
use crate::store::{Namespaces, Store};

/// The command engine
///
/// ## Concurrency Model
///
/// - Every command runs with the store's exclusive lock held, from argument
///   validation through the reply. Commands are therefore atomic and see a
///   consistent snapshot.
/// - A mutating command is appended to the log before the store lock is
///   released, so the log order is the order in which commands took effect.
/// - Lock order is always store → log. The log never calls into the store.
/// - No network I/O happens under either lock.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Dispatch table
    commands: CommandTable,

    /// In-memory data
    store: Store,

    /// Append-only log, `None` when running memory-only
    aof: Option<Aof>,
}

impl Engine {
    const AOF_FILENAME: &'static str = "appendonly.aof";

    /// Open an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Open the log (on failure, continue without persistence)
    /// 3. Replay the log into an empty store
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        let mut engine = Self::with_config(config);
        if !engine.config.aof_enabled {
            tracing::info!("AOF disabled, running memory-only");
            return Ok(engine);
        }

        fs::create_dir_all(&engine.config.data_dir)?;
        let aof_path = engine.config.data_dir.join(Self::AOF_FILENAME);

        match Aof::open(
            &aof_path,
            engine.config.aof_sync_strategy,
            engine.config.aof_flush_interval,
        ) {
            Ok(aof) => {
                let stats = engine.replay_from(&aof)?;
                if stats.entries_replayed > 0 {
                    tracing::info!(
                        "Restored {} keys from {} logged requests",
                        engine.store.lock().len(),
                        stats.entries_replayed
                    );
                }
                engine.aof = Some(aof);
            }
            Err(e) => {
                tracing::warn!(
                    path = %aof_path.display(),
                    "Could not open AOF, persistence disabled for this run: {}",
                    e
                );
            }
        }

        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// An engine with no log at all
    pub fn in_memory() -> Self {
        Self::with_config(Config::builder().aof_enabled(false).build())
    }

    fn with_config(config: Config) -> Self {
        Self {
            config,
            commands: CommandTable::new(),
            store: Store::new(),
            aof: None,
        }
    }

    /// Execute a client request
    ///
    /// Successful mutating requests are appended to the log. Always returns
    /// a reply; command failures come back as `Value::Error`.
    pub fn execute(&self, request: &Value) -> Value {
        self.dispatch(request, true)
    }

    /// Execute a request without logging it
    ///
    /// Used for replay, where the request is already in the log.
    pub fn apply(&self, request: &Value) -> Value {
        self.dispatch(request, false)
    }

    fn dispatch(&self, request: &Value, log: bool) -> Value {
        let (entry, args) = match self.commands.resolve(request) {
            Ok(resolved) => resolved,
            Err(e) => return Value::Error(e.to_string()),
        };

        let mut namespaces = self.store.lock();

        let reply = match (entry.handler)(&mut namespaces, &args) {
            Ok(reply) => reply,
            Err(e) => return Value::Error(e.to_string()),
        };

        if log && entry.mutating {
            if let Some(aof) = &self.aof {
                // The command already took effect; a log failure only
                // weakens durability
                if let Err(e) = aof.append_value(request) {
                    tracing::error!(command = entry.name, "AOF append failed: {}", e);
                }
            }
        }

        reply
    }

    fn replay_from(&self, aof: &Aof) -> Result<ReplayStats> {
        let mut rejected = 0u64;
        let stats = aof.replay(|request| {
            if let Value::Error(e) = self.apply(&request) {
                rejected += 1;
                tracing::debug!("Logged request rejected on replay: {}", e);
            }
        })?;
        if rejected > 0 {
            tracing::warn!("{} logged requests were rejected on replay", rejected);
        }
        Ok(stats)
    }

    /// Rewrite the log as the minimal requests that rebuild the current state
    ///
    /// Holds the store lock throughout, so no command interleaves with the
    /// rewrite. Does nothing when running memory-only.
    pub fn rewrite_log(&self) -> Result<()> {
        let aof = match &self.aof {
            Some(aof) => aof,
            None => return Ok(()),
        };

        let namespaces = self.store.lock();
        aof.rewrite(rewrite_requests(&namespaces))?;
        Ok(())
    }

    /// Force the log to disk
    pub fn sync_log(&self) -> Result<()> {
        match &self.aof {
            Some(aof) => aof.sync(),
            None => Ok(()),
        }
    }

    /// Close the engine gracefully
    ///
    /// Stops the background flusher and syncs the log.
    pub fn close(self) -> Result<()> {
        if let Some(aof) = &self.aof {
            aof.close()?;
        }
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Copy of the current store contents
    pub fn snapshot(&self) -> Namespaces {
        self.store.snapshot()
    }

    /// Whether mutations are being logged
    pub fn is_persistent(&self) -> bool {
        self.aof.is_some()
    }

    pub fn aof(&self) -> Option<&Aof> {
        self.aof.as_ref()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Requests that rebuild `namespaces` from empty
fn rewrite_requests(namespaces: &Namespaces) -> impl Iterator<Item = Value> + '_ {
    let scalars = namespaces
        .scalars()
        .map(|(key, value)| command(b"SET", [key.clone(), value.clone()]));

    let hashes = namespaces.hashes().map(|(key, hash)| {
        let args = std::iter::once(key.clone())
            .chain(hash.iter().flat_map(|(f, v)| [f.clone(), v.clone()]));
        command(b"HSET", args)
    });

    let lists = namespaces.lists().map(|(key, list)| {
        let args = std::iter::once(key.clone()).chain(list.iter().cloned());
        command(b"RPUSH", args)
    });

    scalars.chain(hashes).chain(lists)
}

fn command<I>(name: &'static [u8], args: I) -> Value
where
    I: IntoIterator<Item = bytes::Bytes>,
{
    Value::Array(
        std::iter::once(Value::bulk(name))
            .chain(args.into_iter().map(Value::bulk))
            .collect(),
    )
}
