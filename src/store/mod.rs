//! Store Module
//!
//! In-memory reference store: a keyspace of named hashes that executes the
//! hash commands and the precompiled atomic scripts of the protocol.
//!
//! ## Responsibilities
//! - Execute commands under the right lock (read or write)
//! - Run every script under the write lock, so it is indivisible
//! - Page through a hash with resumable cursor tokens
//! - Drop a hash once its last field is removed
//!
//! Nothing is persisted; the store lives as long as the process.

mod keyspace;
mod scan;
mod scripts;

use std::collections::BTreeMap;

use bytes::Bytes;

pub use keyspace::Store;

/// One named hash: field -> value, ordered so scans can resume by field
pub(crate) type Hash = BTreeMap<Bytes, Bytes>;
