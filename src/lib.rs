//! # distmap
//!
//! A client for named maps held in a shared store, with:
//! - Server-side atomic operations (put-if-absent, compare-and-swap,
//!   numeric increment) instead of client-side locking
//! - Lazy cursor iteration over keys, values and entries
//! - Type-preserving codecs, pluggable per map
//! - Deferred results with one explicit blocking adapter
//! - A TCP server hosting the store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DistributedMap<K, V>                      │
//! │        (facade: atomic ops, cursor iterators, codec)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Deferred<T>
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Command Executor                           │
//! │         (dispatch lanes, ordered per map name)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Request / Reply
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Local    │          │     TCP     │──── TCP Server
//!   │  Transport  │          │  Transport  │         │
//!   └──────┬──────┘          └─────────────┘         │
//!          │                                         │
//!          ▼                                         ▼
//!   ┌─────────────────────────────────────────────────────┐
//!   │                       Store                          │
//!   │        (named hashes, scripts, RwLock SWMR)          │
//!   └─────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod protocol;
pub mod store;
pub mod transport;
pub mod network;

pub mod deferred;
pub mod executor;
pub mod handle;
mod atomic;
pub mod cursor;
pub mod map;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MapError, Result};
pub use config::Config;
pub use codec::{Codec, MapCodec, TypedCodec};
pub use store::Store;
pub use deferred::Deferred;
pub use cursor::{EntryIterator, KeyIterator, ValueIterator};
pub use map::DistributedMap;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of distmap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
