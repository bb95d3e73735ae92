//! Commands Module
//!
//! The dispatch table and the handlers behind it.
//!
//! ## Handler Contract
//! A handler receives the store's namespaces (already locked by the caller)
//! and the request arguments without the command name. It returns the reply
//! value or a [`CommandError`], which the engine turns into an `Error` reply.
//! Handlers validate everything before mutating, so an error reply always
//! means the store is unchanged.

mod hashes;
mod keys;
mod lists;
mod strings;

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::CommandError;
use crate::protocol::Value;
use crate::store::Namespaces;

/// Signature shared by every command handler
pub type Handler = fn(&mut Namespaces, &[Bytes]) -> Result<Value, CommandError>;

/// Number of arguments a command accepts, excluding its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
        }
    }
}

/// One entry of the dispatch table
#[derive(Clone, Copy)]
pub struct CommandEntry {
    pub name: &'static str,
    pub arity: Arity,
    /// Whether a successful execution changes the store and must be logged
    pub mutating: bool,
    pub handler: Handler,
}

impl std::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("mutating", &self.mutating)
            .finish()
    }
}

const COMMANDS: &[CommandEntry] = &[
    CommandEntry { name: "PING", arity: Arity::Between(0, 1), mutating: false, handler: keys::ping },
    CommandEntry { name: "DEL", arity: Arity::AtLeast(1), mutating: true, handler: keys::del },
    CommandEntry { name: "SET", arity: Arity::Exact(2), mutating: true, handler: strings::set },
    CommandEntry { name: "GET", arity: Arity::Exact(1), mutating: false, handler: strings::get },
    CommandEntry { name: "APPEND", arity: Arity::Exact(2), mutating: true, handler: strings::append },
    CommandEntry { name: "INCR", arity: Arity::Exact(1), mutating: true, handler: strings::incr },
    CommandEntry { name: "DECR", arity: Arity::Exact(1), mutating: true, handler: strings::decr },
    CommandEntry { name: "HSET", arity: Arity::AtLeast(3), mutating: true, handler: hashes::hset },
    CommandEntry { name: "HGET", arity: Arity::Exact(2), mutating: false, handler: hashes::hget },
    CommandEntry { name: "HGETALL", arity: Arity::Exact(1), mutating: false, handler: hashes::hgetall },
    CommandEntry { name: "LPUSH", arity: Arity::AtLeast(2), mutating: true, handler: lists::lpush },
    CommandEntry { name: "RPUSH", arity: Arity::AtLeast(2), mutating: true, handler: lists::rpush },
    CommandEntry { name: "LPOP", arity: Arity::Exact(1), mutating: true, handler: lists::lpop },
    CommandEntry { name: "RPOP", arity: Arity::Exact(1), mutating: true, handler: lists::rpop },
    CommandEntry { name: "LRANGE", arity: Arity::Exact(3), mutating: false, handler: lists::lrange },
];

/// Dispatch table keyed by uppercase command name
#[derive(Debug, Clone)]
pub struct CommandTable {
    commands: HashMap<&'static str, CommandEntry>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|entry| (entry.name, *entry)).collect(),
        }
    }

    /// Look up a command by name, case-insensitively
    pub fn get(&self, name: &[u8]) -> Option<&CommandEntry> {
        let upper = std::str::from_utf8(name).ok()?.to_ascii_uppercase();
        self.commands.get(upper.as_str())
    }

    /// Split a request into its command entry and arguments
    ///
    /// Fails on anything that is not a non-empty array of bulk strings, on
    /// unknown names, and on argument counts the command does not accept.
    pub fn resolve(&self, request: &Value) -> Result<(&CommandEntry, Vec<Bytes>), CommandError> {
        let items = match request {
            Value::Array(items) if !items.is_empty() => items,
            Value::Array(_) => {
                return Err(CommandError::InvalidRequest("empty request".to_string()))
            }
            _ => {
                return Err(CommandError::InvalidRequest(
                    "expected an array of bulk strings".to_string(),
                ))
            }
        };

        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            match item.as_bytes() {
                Some(b) => parts.push(b.clone()),
                None => {
                    return Err(CommandError::InvalidRequest(
                        "expected an array of bulk strings".to_string(),
                    ))
                }
            }
        }

        let name = parts.remove(0);
        let entry = self
            .get(&name)
            .ok_or_else(|| CommandError::UnknownCommand(String::from_utf8_lossy(&name).into_owned()))?;

        if !entry.arity.accepts(parts.len()) {
            return Err(CommandError::WrongArity(entry.name.to_ascii_lowercase()));
        }

        Ok((entry, parts))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

/// True for commands whose successful execution is written to the log
pub fn is_mutating(name: &[u8]) -> bool {
    let upper = String::from_utf8_lossy(name).to_ascii_uppercase();
    COMMANDS
        .iter()
        .any(|entry| entry.mutating && entry.name == upper)
}

/// Parse a request argument as a base-10 i64
fn parse_int(arg: &Bytes) -> Result<i64, CommandError> {
    crate::store::parse_i64(arg).ok_or(CommandError::NotAnInteger)
}
