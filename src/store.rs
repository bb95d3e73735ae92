//! Store Module
//!
//! In-memory data owned by one engine instance.
//!
//! ## Namespaces
//! Each data kind lives in its own map with its own key space:
//! - scalars: key → bytes
//! - hashes:  key → (field → bytes)
//! - lists:   key → ordered sequence of bytes
//!
//! The same key may exist in several namespaces at once; `SET k` does not
//! touch a hash stored under `k`. Commands only ever look in the namespace
//! of their own data kind. `DEL` is the one operation that spans all three.
//!
//! ## Locking
//! A single `parking_lot::Mutex` guards all three maps. Callers hold the
//! guard for a whole command, so every command is atomic with respect to
//! every other. The guard is released on drop, whatever path the caller
//! leaves by.

use std::collections::{HashMap, VecDeque};

use bytes::{Bytes, BytesMut};
use parking_lot::{Mutex, MutexGuard};

use crate::error::CommandError;

/// The three namespaces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    scalars: HashMap<Bytes, Bytes>,
    hashes: HashMap<Bytes, HashMap<Bytes, Bytes>>,
    lists: HashMap<Bytes, VecDeque<Bytes>>,
}

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Scalars
    // =========================================================================

    pub fn get(&self, key: &[u8]) -> Option<&Bytes> {
        self.scalars.get(key)
    }

    pub fn set(&mut self, key: Bytes, value: Bytes) {
        self.scalars.insert(key, value);
    }

    /// Concatenate `suffix` onto an existing scalar
    ///
    /// Returns the new length, or `None` (and does nothing) if the key is
    /// absent.
    pub fn append(&mut self, key: &[u8], suffix: &[u8]) -> Option<usize> {
        let current = self.scalars.get_mut(key)?;
        let mut joined = BytesMut::with_capacity(current.len() + suffix.len());
        joined.extend_from_slice(current);
        joined.extend_from_slice(suffix);
        *current = joined.freeze();
        Some(current.len())
    }

    /// Add `delta` to the integer stored at `key`
    ///
    /// An absent key counts as 0. On error the stored value is untouched.
    pub fn incr_by(&mut self, key: &[u8], delta: i64) -> Result<i64, CommandError> {
        let current = match self.scalars.get(key) {
            Some(raw) => parse_i64(raw).ok_or(CommandError::NotAnInteger)?,
            None => 0,
        };
        let next = current.checked_add(delta).ok_or(CommandError::Overflow)?;
        self.scalars
            .insert(Bytes::copy_from_slice(key), Bytes::from(next.to_string()));
        Ok(next)
    }

    // =========================================================================
    // Hashes
    // =========================================================================

    /// Merge field/value pairs into the hash at `key`
    ///
    /// Returns the number of fields that did not exist before.
    pub fn hset<I>(&mut self, key: Bytes, pairs: I) -> usize
    where
        I: IntoIterator<Item = (Bytes, Bytes)>,
    {
        let hash = self.hashes.entry(key).or_default();
        pairs
            .into_iter()
            .filter(|(field, value)| hash.insert(field.clone(), value.clone()).is_none())
            .count()
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> Option<&Bytes> {
        self.hashes.get(key)?.get(field)
    }

    pub fn hash(&self, key: &[u8]) -> Option<&HashMap<Bytes, Bytes>> {
        self.hashes.get(key)
    }

    // =========================================================================
    // Lists
    // =========================================================================

    /// Insert each value at the head, in argument order
    ///
    /// Returns the new list length.
    pub fn push_front<I>(&mut self, key: Bytes, values: I) -> usize
    where
        I: IntoIterator<Item = Bytes>,
    {
        let list = self.lists.entry(key).or_default();
        for value in values {
            list.push_front(value);
        }
        list.len()
    }

    /// Insert each value at the tail, in argument order
    pub fn push_back<I>(&mut self, key: Bytes, values: I) -> usize
    where
        I: IntoIterator<Item = Bytes>,
    {
        let list = self.lists.entry(key).or_default();
        list.extend(values);
        list.len()
    }

    pub fn pop_front(&mut self, key: &[u8]) -> Option<Bytes> {
        self.pop_with(key, VecDeque::pop_front)
    }

    pub fn pop_back(&mut self, key: &[u8]) -> Option<Bytes> {
        self.pop_with(key, VecDeque::pop_back)
    }

    fn pop_with(
        &mut self,
        key: &[u8],
        pop: fn(&mut VecDeque<Bytes>) -> Option<Bytes>,
    ) -> Option<Bytes> {
        let list = self.lists.get_mut(key)?;
        let value = pop(list);
        if list.is_empty() {
            self.lists.remove(key);
        }
        value
    }

    /// Inclusive range with negative indexes counted from the end
    ///
    /// Out-of-range bounds are clamped. An empty result is returned when the
    /// key is absent or the clamped range is empty.
    pub fn range(&self, key: &[u8], start: i64, stop: i64) -> Vec<Bytes> {
        let list = match self.lists.get(key) {
            Some(list) => list,
            None => return Vec::new(),
        };

        let len = list.len() as i64;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

        if start > stop || start >= len {
            return Vec::new();
        }

        list.range(start as usize..=stop as usize).cloned().collect()
    }

    pub fn list(&self, key: &[u8]) -> Option<&VecDeque<Bytes>> {
        self.lists.get(key)
    }

    // =========================================================================
    // Cross-namespace
    // =========================================================================

    /// Remove `key` from every namespace
    ///
    /// Returns true if it existed in at least one.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        let scalar = self.scalars.remove(key).is_some();
        let hash = self.hashes.remove(key).is_some();
        let list = self.lists.remove(key).is_some();
        scalar || hash || list
    }

    pub fn scalars(&self) -> impl Iterator<Item = (&Bytes, &Bytes)> {
        self.scalars.iter()
    }

    pub fn hashes(&self) -> impl Iterator<Item = (&Bytes, &HashMap<Bytes, Bytes>)> {
        self.hashes.iter()
    }

    pub fn lists(&self) -> impl Iterator<Item = (&Bytes, &VecDeque<Bytes>)> {
        self.lists.iter()
    }

    /// Total number of keys across namespaces (a key in two counts twice)
    pub fn len(&self) -> usize {
        self.scalars.len() + self.hashes.len() + self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse a stored scalar as a base-10 i64
pub(crate) fn parse_i64(raw: &[u8]) -> Option<i64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

/// Lock-guarded namespaces
#[derive(Debug, Default)]
pub struct Store {
    namespaces: Mutex<Namespaces>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the store's exclusive lock
    ///
    /// The lock is held until the returned guard is dropped.
    pub fn lock(&self) -> MutexGuard<'_, Namespaces> {
        self.namespaces.lock()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Namespaces {
        self.namespaces.lock().clone()
    }
}
