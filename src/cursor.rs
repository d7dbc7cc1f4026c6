//! Cursor iteration
//!
//! Lazy, forward-only iteration over a remote map, one `HSCAN` page at a
//! time.
//!
//! ## States
//! ```text
//!   Initial ──fetch──> Scanning(token) ──fetch──> ... ──terminal token──> Exhausted
//!      │                    │
//!      └────── error ───────┴──────────────────────────────────────────> Exhausted
//! ```
//!
//! The terminal token only stops further fetches: entries that arrived with
//! it are still yielded. An error is yielded once and ends the iteration.
//! Nothing is held remotely, so dropping an iterator halfway needs no cleanup.

use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{MapError, Result};
use crate::handle::MapHandle;
use crate::protocol::{CommandType, Reply, Request, CURSOR_INITIAL, CURSOR_TERMINAL};

/// What a scan yields for each (field, value) pair
pub trait ScanMode<K, V> {
    type Item;

    fn decode(handle: &MapHandle<K, V>, field: &[u8], value: &[u8]) -> Result<Self::Item>;
}

/// Yields keys
pub struct Keys;

/// Yields values
pub struct Values;

/// Yields (key, value) entries
pub struct Entries;

impl<K, V> ScanMode<K, V> for Keys {
    type Item = K;

    fn decode(handle: &MapHandle<K, V>, field: &[u8], _value: &[u8]) -> Result<K> {
        handle.codec().decode_key(field)
    }
}

impl<K, V> ScanMode<K, V> for Values {
    type Item = V;

    fn decode(handle: &MapHandle<K, V>, _field: &[u8], value: &[u8]) -> Result<V> {
        handle.codec().decode_value(value)
    }
}

impl<K, V> ScanMode<K, V> for Entries {
    type Item = (K, V);

    fn decode(handle: &MapHandle<K, V>, field: &[u8], value: &[u8]) -> Result<(K, V)> {
        Ok((
            handle.codec().decode_key(field)?,
            handle.codec().decode_value(value)?,
        ))
    }
}

enum ScanState {
    Initial,
    Scanning(Bytes),
    Exhausted,
}

/// Iterator over a remote map, generic over what it yields
pub struct ScanIterator<K, V, M> {
    handle: Arc<MapHandle<K, V>>,
    state: ScanState,
    buffer: VecDeque<(Bytes, Bytes)>,
    failed: bool,
    _mode: PhantomData<fn() -> M>,
}

/// Iterator over the keys of a map
pub type KeyIterator<K, V> = ScanIterator<K, V, Keys>;

/// Iterator over the values of a map
pub type ValueIterator<K, V> = ScanIterator<K, V, Values>;

/// Iterator over the entries of a map
pub type EntryIterator<K, V> = ScanIterator<K, V, Entries>;

impl<K, V, M> ScanIterator<K, V, M>
where
    K: Send + 'static,
    V: Send + 'static,
    M: ScanMode<K, V>,
{
    pub(crate) fn new(handle: Arc<MapHandle<K, V>>) -> Self {
        Self {
            handle,
            state: ScanState::Initial,
            buffer: VecDeque::new(),
            failed: false,
            _mode: PhantomData,
        }
    }

    /// Continue a scan whose first page (the reply to [`first_page`]) is
    /// already in
    pub(crate) fn from_first_page(handle: Arc<MapHandle<K, V>>, reply: Reply) -> Result<Self> {
        let mut iter = Self::new(handle);
        iter.accept(reply)?;
        Ok(iter)
    }

    /// Fetch one page into the buffer and advance the token
    fn fetch(&mut self) -> Result<()> {
        let token = match &self.state {
            ScanState::Initial => Bytes::from_static(CURSOR_INITIAL),
            ScanState::Scanning(token) => token.clone(),
            ScanState::Exhausted => return Ok(()),
        };

        let request = page_request(&self.handle, token);
        let reply = self.handle.submit(Ok(request), Ok).wait()?;
        self.accept(reply)
    }

    /// Buffer a `[cursor, entries]` page and advance the token
    fn accept(&mut self, reply: Reply) -> Result<()> {
        let mut parts = reply.into_array()?.into_iter();
        let (Some(cursor), Some(entries), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(MapError::Protocol(
                "scan reply must be [cursor, entries]".to_string(),
            ));
        };

        let cursor = cursor.into_bulk()?;
        let entries = entries.into_pairs()?;
        tracing::trace!(map = self.handle.name(), entries = entries.len(), "scan page");

        self.buffer.extend(entries);
        self.state = if cursor.as_ref() == CURSOR_TERMINAL {
            ScanState::Exhausted
        } else {
            ScanState::Scanning(cursor)
        };
        Ok(())
    }
}

/// The `HSCAN` request that opens a fresh scan of `handle`'s map
pub(crate) fn first_page<K, V>(handle: &MapHandle<K, V>) -> Request {
    page_request(handle, Bytes::from_static(CURSOR_INITIAL))
}

fn page_request<K, V>(handle: &MapHandle<K, V>, token: Bytes) -> Request {
    let count = Bytes::from(handle.scan_count().to_string());
    handle.command(CommandType::HScan, vec![token, count])
}

impl<K, V, M> Iterator for ScanIterator<K, V, M>
where
    K: Send + 'static,
    V: Send + 'static,
    M: ScanMode<K, V>,
{
    type Item = Result<M::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }

            if let Some((field, value)) = self.buffer.pop_front() {
                let item = M::decode(&self.handle, &field, &value);
                if item.is_err() {
                    self.fail();
                }
                return Some(item);
            }

            if matches!(self.state, ScanState::Exhausted) {
                return None;
            }

            // A page may legitimately come back empty with a live token
            if let Err(e) = self.fetch() {
                self.fail();
                return Some(Err(e));
            }
        }
    }
}

impl<K, V, M> ScanIterator<K, V, M> {
    fn fail(&mut self) {
        self.failed = true;
        self.state = ScanState::Exhausted;
        self.buffer.clear();
    }
}

impl<K, V, M> fmt::Debug for ScanIterator<K, V, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            ScanState::Initial => "initial",
            ScanState::Scanning(_) => "scanning",
            ScanState::Exhausted => "exhausted",
        };
        f.debug_struct("ScanIterator")
            .field("map", &self.handle.name())
            .field("state", &state)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
