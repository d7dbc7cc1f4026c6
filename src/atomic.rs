//! Atomic operation library
//!
//! Composite map operations, each expressed as exactly one exchange with the
//! store. Conditional operations run as precompiled scripts under the store's
//! write lock; there is never a client-side get-then-put.
//!
//! A condition that does not hold is not an error: it shows up as `false`,
//! `0` or `None` in the result.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use bytes::Bytes;

use crate::cursor::{self, ValueIterator};
use crate::deferred::Deferred;
use crate::error::{MapError, Result};
use crate::handle::MapHandle;
use crate::protocol::{CommandType, Reply, ScriptId};

impl<K, V> MapHandle<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    /// Store `value`, answering the previous value
    pub(crate) fn put(&self, key: &K, value: &V) -> Deferred<Option<V>> {
        let request = self.encode_entry(key, value).map(|(field, value)| {
            self.script(ScriptId::Put, vec![field, value])
        });
        self.submit(request, self.optional_value())
    }

    /// Delete `key`, answering the removed value
    pub(crate) fn remove(&self, key: &K) -> Deferred<Option<V>> {
        let request = self
            .codec()
            .encode_key(key)
            .map(|field| self.script(ScriptId::Remove, vec![field]));
        self.submit(request, self.optional_value())
    }

    /// Store `value` only when `key` has no entry. A stored null counts as an
    /// entry.
    pub(crate) fn put_if_absent(&self, key: &K, value: &V) -> Deferred<Option<V>> {
        let request = self.encode_entry(key, value).map(|(field, value)| {
            self.script(ScriptId::PutIfAbsent, vec![field, value])
        });
        self.submit(request, self.optional_value())
    }

    /// Overwrite only an existing entry
    pub(crate) fn replace(&self, key: &K, value: &V) -> Deferred<Option<V>> {
        let request = self.encode_entry(key, value).map(|(field, value)| {
            self.script(ScriptId::Replace, vec![field, value])
        });
        self.submit(request, self.optional_value())
    }

    /// Swap the value iff the stored bytes equal the encoded `expected`
    pub(crate) fn replace_if_equals(&self, key: &K, expected: &V, value: &V) -> Deferred<bool> {
        let request = self.encode_entry(key, expected).and_then(|(field, expected)| {
            let value = self.codec().encode_value(value)?;
            Ok(self.script(ScriptId::ReplaceIfEquals, vec![field, expected, value]))
        });
        self.submit(request, Reply::into_flag)
    }

    /// Delete iff the stored bytes equal the encoded `expected`; answers 0 or 1
    pub(crate) fn remove_if_equals(&self, key: &K, expected: &V) -> Deferred<u64> {
        let request = self.encode_entry(key, expected).map(|(field, expected)| {
            self.script(ScriptId::RemoveIfEquals, vec![field, expected])
        });
        self.submit(request, |reply| match reply.into_count()? {
            count @ (0 | 1) => Ok(count),
            other => Err(MapError::Protocol(format!(
                "expected 0 or 1 removals, got {}",
                other
            ))),
        })
    }

    /// Increment a numeric entry, creating it as `delta` when missing.
    ///
    /// Integers stay integers; a float on either side makes the result a
    /// float. A non-numeric entry fails with `MapError::Remote`.
    pub(crate) fn add_and_get(&self, key: &K, delta: &V) -> Deferred<V> {
        let request = self.encode_entry(key, delta).map(|(field, delta)| {
            self.script(ScriptId::AddAndGet, vec![field, delta])
        });
        self.submit(request, self.value())
    }

    /// Store `value`; `true` if the key was new
    pub(crate) fn fast_put(&self, key: &K, value: &V) -> Deferred<bool> {
        let request = self.encode_entry(key, value).map(|(field, value)| {
            self.command(CommandType::HSet, vec![field, value])
        });
        self.submit(request, Reply::into_flag)
    }

    /// Store `value` only when the key is new; `true` if it was stored
    pub(crate) fn fast_put_if_absent(&self, key: &K, value: &V) -> Deferred<bool> {
        let request = self.encode_entry(key, value).map(|(field, value)| {
            self.command(CommandType::HSetNx, vec![field, value])
        });
        self.submit(request, Reply::into_flag)
    }

    /// Delete every key in `keys`, answering how many existed.
    ///
    /// No keys means no exchange at all.
    pub(crate) fn fast_remove(&self, keys: &[K]) -> Deferred<u64> {
        if keys.is_empty() {
            return Deferred::ready(Ok(0));
        }

        let request = self
            .encode_keys(keys)
            .map(|fields| self.command(CommandType::HDel, fields));
        self.submit(request, Reply::into_count)
    }

    /// Fetch every present key in `keys` in one exchange; missing keys are
    /// left out of the result
    pub(crate) fn get_all(&self, keys: &[K]) -> Deferred<HashMap<K, V>>
    where
        K: Eq + Hash,
    {
        if keys.is_empty() {
            return Deferred::ready(Ok(HashMap::new()));
        }

        let fields = match self.encode_keys(keys) {
            Ok(fields) => fields,
            Err(e) => return Deferred::failed(e),
        };

        let codec = self.codec().clone();
        let lookup = fields.clone();
        self.submit(
            Ok(self.command(CommandType::HMGet, fields)),
            move |reply| {
                let values = reply.into_array()?;
                if values.len() != lookup.len() {
                    return Err(MapError::Protocol(format!(
                        "asked for {} fields, got {} values",
                        lookup.len(),
                        values.len()
                    )));
                }

                let mut found = HashMap::with_capacity(values.len());
                for (field, value) in lookup.iter().zip(values) {
                    if let Some(bytes) = value.into_optional_bulk()? {
                        found.insert(codec.decode_key(field)?, codec.decode_value(&bytes)?);
                    }
                }
                Ok(found)
            },
        )
    }

    /// Scan the values for one equal to `value`.
    ///
    /// There is no reverse index: the map is paged through with `HSCAN`
    /// until a match turns up, so the cost grows with the map's size. The
    /// first page is queued like any other request; the remaining pages are
    /// fetched by whoever waits on the result.
    pub(crate) fn contains_value(self: &Arc<Self>, value: &V) -> Deferred<bool>
    where
        V: PartialEq,
    {
        let codec = self.codec();
        // Owned copy of the needle without requiring `V: Clone`
        let needle = match codec.encode_value(value).and_then(|bytes| codec.decode_value(&bytes)) {
            Ok(needle) => needle,
            Err(e) => return Deferred::failed(e),
        };

        let handle = Arc::clone(self);
        self.submit(Ok(cursor::first_page(self)), move |reply| {
            for value in ValueIterator::from_first_page(handle, reply)? {
                if value? == needle {
                    return Ok(true);
                }
            }
            Ok(false)
        })
    }

    fn encode_entry(&self, key: &K, value: &V) -> Result<(Bytes, Bytes)> {
        Ok((
            self.codec().encode_key(key)?,
            self.codec().encode_value(value)?,
        ))
    }

    fn encode_keys(&self, keys: &[K]) -> Result<Vec<Bytes>> {
        keys.iter().map(|key| self.codec().encode_key(key)).collect()
    }
}
