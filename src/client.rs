//! Client
//!
//! Entry point for applications: owns the transport and the dispatch lanes,
//! and hands out map handles bound to them.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::MapCodec;
use crate::config::Config;
use crate::deferred::Deferred;
use crate::error::{MapError, Result};
use crate::executor::CommandExecutor;
use crate::handle::MapHandle;
use crate::map::DistributedMap;
use crate::protocol::{CommandType, Request};
use crate::store::Store;
use crate::transport::{LocalTransport, TcpTransport, Transport};

/// A connection to one store, shared by every map created from it
pub struct Client {
    config: Config,
    executor: Arc<CommandExecutor>,
}

impl Client {
    /// Connect to the store at `config.server_addr` over TCP
    pub fn connect(config: Config) -> Result<Self> {
        let transport = TcpTransport::connect(&config)?;
        tracing::info!("Client connected to {}", transport.peer_addr());
        Self::with_transport(config, Arc::new(transport))
    }

    /// Run against an in-process store
    pub fn local(store: Arc<Store>, config: Config) -> Result<Self> {
        Self::with_transport(config, Arc::new(LocalTransport::new(store)))
    }

    /// Run over any transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let executor = CommandExecutor::new(transport, config.dispatch_threads)?;
        Ok(Self {
            config,
            executor: Arc::new(executor),
        })
    }

    /// A map using the default tagged codec for keys and values
    pub fn get_map<K, V>(&self, name: impl Into<String>) -> DistributedMap<K, V>
    where
        K: Serialize + DeserializeOwned + 'static,
        V: Serialize + DeserializeOwned + 'static,
    {
        self.get_map_with_codec(name, MapCodec::typed())
    }

    /// A map using an explicit codec pair
    pub fn get_map_with_codec<K, V>(
        &self,
        name: impl Into<String>,
        codec: MapCodec<K, V>,
    ) -> DistributedMap<K, V> {
        DistributedMap::new(MapHandle::new(
            name,
            codec,
            Arc::clone(&self.executor),
            self.config.scan_count,
        ))
    }

    /// Round trip to the store
    pub fn ping(&self) -> Deferred<()> {
        let request = Request::command(CommandType::Ping, Vec::new());
        self.executor.execute_with(b"", request, |reply| {
            let pong = reply.into_bulk()?;
            if pong.as_ref() == b"PONG" {
                Ok(())
            } else {
                Err(MapError::Protocol(format!(
                    "unexpected ping reply: {}",
                    String::from_utf8_lossy(&pong)
                )))
            }
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("server_addr", &self.config.server_addr)
            .field("lanes", &self.executor.lane_count())
            .finish()
    }
}
