//! Transport Module
//!
//! The request/reply channel between the client and a store.
//!
//! A transport performs exactly one exchange per `send` and never retries:
//! a failed exchange surfaces as a transport error and the caller decides
//! what to do. Timeouts belong to the transport, not to the map.

mod tcp;

use std::sync::Arc;

use crate::error::Result;
use crate::protocol::{Reply, Request};
use crate::store::Store;

pub use tcp::TcpTransport;

/// Request/response channel to a store
pub trait Transport: Send + Sync {
    /// Send one request and wait for its reply
    ///
    /// `Err` means the exchange itself failed. A store-side failure arrives
    /// as `Ok(Reply::Error(..))`.
    fn send(&self, request: &Request) -> Result<Reply>;
}

/// Transport that calls straight into a store living in this process
#[derive(Clone)]
pub struct LocalTransport {
    store: Arc<Store>,
}

impl LocalTransport {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

impl Transport for LocalTransport {
    fn send(&self, request: &Request) -> Result<Reply> {
        Ok(self.store.execute(request))
    }
}
