//! Codec Module
//!
//! Converts typed keys and values to and from the byte strings stored
//! remotely.
//!
//! ## Contract
//! - `decode(encode(v)) == v` for every representable `v`
//! - encoding is deterministic: equal values always produce equal bytes,
//!   which key lookups and the compare-and-swap scripts rely on
//! - malformed or foreign bytes fail with `MapError::Decode`
//!
//! ## Codecs
//! - [`TypedCodec`]: default, tagged, numeric-subtype preserving
//! - [`StringCodec`] / [`BytesCodec`]: raw passthrough
//! - [`BincodeCodec`]: untagged bincode

mod number;
mod raw;
mod typed;

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub use number::{WireNumber, FLOAT_TAG, INT_TAG};
pub use raw::{BincodeCodec, BytesCodec, StringCodec};
pub use typed::TypedCodec;

/// Bidirectional converter between `T` and its wire bytes
pub trait Codec<T>: Send + Sync {
    /// Encode a value to its wire representation
    fn encode(&self, value: &T) -> Result<Bytes>;

    /// Decode a value from its wire representation
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

/// The key codec and value codec of one map, fixed at construction.
pub struct MapCodec<K, V> {
    key: Arc<dyn Codec<K>>,
    value: Arc<dyn Codec<V>>,
}

impl<K, V> MapCodec<K, V> {
    pub fn new<KC, VC>(key: KC, value: VC) -> Self
    where
        KC: Codec<K> + 'static,
        VC: Codec<V> + 'static,
    {
        Self {
            key: Arc::new(key),
            value: Arc::new(value),
        }
    }

    pub fn encode_key(&self, key: &K) -> Result<Bytes> {
        self.key.encode(key)
    }

    pub fn decode_key(&self, bytes: &[u8]) -> Result<K> {
        self.key.decode(bytes)
    }

    pub fn encode_value(&self, value: &V) -> Result<Bytes> {
        self.value.encode(value)
    }

    pub fn decode_value(&self, bytes: &[u8]) -> Result<V> {
        self.value.decode(bytes)
    }
}

impl<K, V> MapCodec<K, V>
where
    K: Serialize + DeserializeOwned + 'static,
    V: Serialize + DeserializeOwned + 'static,
{
    /// `TypedCodec` for both keys and values
    pub fn typed() -> Self {
        Self::new(TypedCodec::new(), TypedCodec::new())
    }
}

impl<K, V> Clone for MapCodec<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: Arc::clone(&self.key),
            value: Arc::clone(&self.value),
        }
    }
}

impl<K, V> fmt::Debug for MapCodec<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapCodec").finish_non_exhaustive()
    }
}
