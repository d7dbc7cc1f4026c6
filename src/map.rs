//! Distributed map
//!
//! The public face of one remote map. Every operation returns a
//! [`Deferred`] immediately; call `wait()` to block for the outcome.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use distmap::{Client, Config, Store};
//!
//! let client = Client::local(Arc::new(Store::new()), Config::default())?;
//! let map = client.get_map::<String, i64>("scores");
//!
//! map.put(&"alice".to_string(), &100).wait()?;
//! let total = map.add_and_get(&"alice".to_string(), &12).wait()?;
//! assert_eq!(total, 112);
//! # Ok::<(), distmap::MapError>(())
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::cursor::{EntryIterator, KeyIterator, ScanIterator, ValueIterator};
use crate::deferred::Deferred;
use crate::error::Result;
use crate::handle::MapHandle;
use crate::protocol::{CommandType, Reply};

/// A named map whose entries live in a remote store
pub struct DistributedMap<K, V> {
    handle: Arc<MapHandle<K, V>>,
}

impl<K, V> DistributedMap<K, V> {
    pub(crate) fn new(handle: MapHandle<K, V>) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// The map's name in the store
    pub fn name(&self) -> &str {
        self.handle.name()
    }
}

impl<K, V> DistributedMap<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    // =========================================================================
    // Single-Key Operations
    // =========================================================================

    /// Value stored under `key`, `None` when absent
    pub fn get(&self, key: &K) -> Deferred<Option<V>> {
        let request = self
            .handle
            .codec()
            .encode_key(key)
            .map(|field| self.handle.command(CommandType::HGet, vec![field]));
        self.handle.submit(request, self.handle.optional_value())
    }

    /// Store `value` under `key`, answering the previous value
    pub fn put(&self, key: &K, value: &V) -> Deferred<Option<V>> {
        self.handle.put(key, value)
    }

    /// Remove `key`, answering the removed value
    pub fn remove(&self, key: &K) -> Deferred<Option<V>> {
        self.handle.remove(key)
    }

    /// Remove `key` only if it holds `expected`; answers 1 if removed, else 0
    pub fn remove_if_equals(&self, key: &K, expected: &V) -> Deferred<u64> {
        self.handle.remove_if_equals(key, expected)
    }

    /// Overwrite an existing entry, answering the previous value. Does nothing
    /// when `key` is absent.
    pub fn replace(&self, key: &K, value: &V) -> Deferred<Option<V>> {
        self.handle.replace(key, value)
    }

    /// Swap `expected` for `value`; `true` if the swap happened
    pub fn replace_if_equals(&self, key: &K, expected: &V, value: &V) -> Deferred<bool> {
        self.handle.replace_if_equals(key, expected, value)
    }

    /// Store `value` unless `key` already has an entry; answers the existing
    /// value, or `None` if this call stored it
    pub fn put_if_absent(&self, key: &K, value: &V) -> Deferred<Option<V>> {
        self.handle.put_if_absent(key, value)
    }

    pub fn contains_key(&self, key: &K) -> Deferred<bool> {
        let request = self
            .handle
            .codec()
            .encode_key(key)
            .map(|field| self.handle.command(CommandType::HExists, vec![field]));
        self.handle.submit(request, Reply::into_flag)
    }

    /// Store `value` without reading the previous one; `true` if `key` was new
    pub fn fast_put(&self, key: &K, value: &V) -> Deferred<bool> {
        self.handle.fast_put(key, value)
    }

    /// `true` if `value` was stored because `key` was new
    pub fn fast_put_if_absent(&self, key: &K, value: &V) -> Deferred<bool> {
        self.handle.fast_put_if_absent(key, value)
    }

    /// Add `delta` to a numeric entry and answer the new value.
    ///
    /// A missing entry is created as `delta`.
    ///
    /// The store adds in `i64` (or `f64`) whatever `V` is. For a narrower
    /// integer type, a sum outside `V`'s range is still stored, and this
    /// call and every later read of the entry fail with `MapError::Decode`
    /// until it is overwritten or removed.
    pub fn add_and_get(&self, key: &K, delta: &V) -> Deferred<V> {
        self.handle.add_and_get(key, delta)
    }

    // =========================================================================
    // Multi-Key Operations
    // =========================================================================

    /// Entries for the present keys among `keys`
    pub fn get_all(&self, keys: &[K]) -> Deferred<HashMap<K, V>>
    where
        K: Eq + Hash,
    {
        self.handle.get_all(keys)
    }

    /// Store every entry in one exchange. An empty input is a no-op.
    pub fn put_all<'a, I>(&self, entries: I) -> Deferred<()>
    where
        I: IntoIterator<Item = (&'a K, &'a V)>,
        K: 'a,
        V: 'a,
    {
        let codec = self.handle.codec();
        let mut fields = Vec::new();
        for (key, value) in entries {
            match (codec.encode_key(key), codec.encode_value(value)) {
                (Ok(field), Ok(value)) => {
                    fields.push(field);
                    fields.push(value);
                }
                (Err(e), _) | (_, Err(e)) => return Deferred::failed(e),
            }
        }

        if fields.is_empty() {
            return Deferred::ready(Ok(()));
        }

        let request = self.handle.command(CommandType::HSet, fields);
        self.handle.submit(Ok(request), |reply| reply.into_count().map(|_| ()))
    }

    /// Remove every key in `keys`, answering how many existed
    pub fn fast_remove(&self, keys: &[K]) -> Deferred<u64> {
        self.handle.fast_remove(keys)
    }

    // =========================================================================
    // Whole-Map Operations
    // =========================================================================

    /// `true` if some entry holds `value`. Reads the whole map.
    pub fn contains_value(&self, value: &V) -> Deferred<bool>
    where
        V: PartialEq,
    {
        self.handle.contains_value(value)
    }

    /// Number of entries, null values included
    pub fn size(&self) -> Deferred<u64> {
        let request = self.handle.command(CommandType::HLen, Vec::new());
        self.handle.submit(Ok(request), Reply::into_count)
    }

    pub fn is_empty(&self) -> Deferred<bool> {
        self.size().map(|size| size == 0)
    }

    /// Every key, in one exchange
    pub fn read_all_keys(&self) -> Deferred<Vec<K>> {
        let codec = self.handle.codec().clone();
        let request = self.handle.command(CommandType::HKeys, Vec::new());
        self.handle.submit(Ok(request), move |reply| {
            reply
                .into_bulk_array()?
                .iter()
                .map(|field| codec.decode_key(field))
                .collect()
        })
    }

    /// Every value, in one exchange
    pub fn read_all_values(&self) -> Deferred<Vec<V>> {
        let codec = self.handle.codec().clone();
        let request = self.handle.command(CommandType::HVals, Vec::new());
        self.handle.submit(Ok(request), move |reply| {
            reply
                .into_bulk_array()?
                .iter()
                .map(|value| codec.decode_value(value))
                .collect()
        })
    }

    /// Every entry, in one exchange
    pub fn read_all_map(&self) -> Deferred<HashMap<K, V>>
    where
        K: Eq + Hash,
    {
        let codec = self.handle.codec().clone();
        let request = self.handle.command(CommandType::HGetAll, Vec::new());
        self.handle.submit(Ok(request), move |reply| {
            reply
                .into_pairs()?
                .into_iter()
                .map(|(field, value)| -> Result<(K, V)> {
                    Ok((codec.decode_key(&field)?, codec.decode_value(&value)?))
                })
                .collect()
        })
    }

    /// Drop the whole map; `true` if it existed
    pub fn delete(&self) -> Deferred<bool> {
        let request = self.handle.command(CommandType::Del, Vec::new());
        self.handle.submit(Ok(request), Reply::into_flag)
    }

    /// Remove every entry
    pub fn clear(&self) -> Deferred<()> {
        self.delete().map(|_| ())
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Lazy iterator over the keys, fetched in batches of `scan_count`
    pub fn key_iter(&self) -> KeyIterator<K, V> {
        ScanIterator::new(Arc::clone(&self.handle))
    }

    /// Lazy iterator over the values
    pub fn value_iter(&self) -> ValueIterator<K, V> {
        ScanIterator::new(Arc::clone(&self.handle))
    }

    /// Lazy iterator over the entries
    pub fn entry_iter(&self) -> EntryIterator<K, V> {
        ScanIterator::new(Arc::clone(&self.handle))
    }
}

impl<K, V> Clone for DistributedMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            handle: Arc::clone(&self.handle),
        }
    }
}

impl<K, V> fmt::Debug for DistributedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedMap")
            .field("name", &self.handle.name())
            .finish()
    }
}
