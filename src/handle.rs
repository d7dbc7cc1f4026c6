//! Map handle
//!
//! Everything one named map needs to talk to the store: the name, the codec
//! pair fixed at construction, the executor and the scan batch hint. The
//! operation modules build requests through it and decode replies with it.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::codec::MapCodec;
use crate::deferred::Deferred;
use crate::error::Result;
use crate::executor::CommandExecutor;
use crate::protocol::{CommandType, Reply, Request, ScriptId};

/// Identity and plumbing of one remote map
pub struct MapHandle<K, V> {
    name: String,
    raw_name: Bytes,
    codec: MapCodec<K, V>,
    executor: Arc<CommandExecutor>,
    scan_count: usize,
}

impl<K, V> MapHandle<K, V> {
    pub(crate) fn new(
        name: impl Into<String>,
        codec: MapCodec<K, V>,
        executor: Arc<CommandExecutor>,
        scan_count: usize,
    ) -> Self {
        let name = name.into();
        let raw_name = Bytes::copy_from_slice(name.as_bytes());
        Self {
            name,
            raw_name,
            codec,
            executor,
            scan_count: scan_count.max(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn codec(&self) -> &MapCodec<K, V> {
        &self.codec
    }

    pub(crate) fn scan_count(&self) -> usize {
        self.scan_count
    }

    // =========================================================================
    // Request Building
    // =========================================================================

    /// A command whose first argument is this map's name
    pub(crate) fn command(&self, command: CommandType, fields: Vec<Bytes>) -> Request {
        let mut args = Vec::with_capacity(fields.len() + 1);
        args.push(self.raw_name.clone());
        args.extend(fields);
        Request::command(command, args)
    }

    /// A script keyed on this map
    pub(crate) fn script(&self, script: ScriptId, args: Vec<Bytes>) -> Request {
        Request::script(script, vec![self.raw_name.clone()], args)
    }

    /// Queue a request built by the caller.
    ///
    /// A request that could not be built (an encode failure) resolves the
    /// deferred result with that error without touching the store.
    pub(crate) fn submit<T>(
        &self,
        request: Result<Request>,
        then: impl FnOnce(Reply) -> Result<T> + Send + 'static,
    ) -> Deferred<T> {
        match request {
            Ok(request) => self.executor.execute_with(&self.raw_name, request, then),
            Err(e) => Deferred::failed(e),
        }
    }
}

impl<K: 'static, V: 'static> MapHandle<K, V> {
    /// Decode a bulk-or-nil reply as an optional value
    pub(crate) fn optional_value(&self) -> impl FnOnce(Reply) -> Result<Option<V>> + Send + 'static {
        let codec = self.codec.clone();
        move |reply| {
            reply
                .into_optional_bulk()?
                .map(|bytes| codec.decode_value(&bytes))
                .transpose()
        }
    }

    /// Decode a bulk reply as a value
    pub(crate) fn value(&self) -> impl FnOnce(Reply) -> Result<V> + Send + 'static {
        let codec = self.codec.clone();
        move |reply| codec.decode_value(&reply.into_bulk()?)
    }
}

impl<K, V> fmt::Debug for MapHandle<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapHandle")
            .field("name", &self.name)
            .field("scan_count", &self.scan_count)
            .finish()
    }
}
