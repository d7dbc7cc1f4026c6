//! Keyspace
//!
//! The map of hash name -> hash, and the command router over it.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

use super::{scan, scripts, Hash};
use crate::protocol::{CommandType, Reply, Request, ScriptId};

/// Result of a command handler; the error string becomes an ERROR reply
type CommandResult = std::result::Result<Reply, String>;

/// In-memory store of named hashes
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Reads** (`HGET`, `HLEN`, `HSCAN`, ...): shared read lock
/// - **Writes** (`HSET`, `HDEL`, `DEL`, ...): exclusive write lock
/// - **Scripts**: exclusive write lock for the whole script, which makes each
///   script atomic with respect to every other client
pub struct Store {
    hashes: RwLock<HashMap<Bytes, Hash>>,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            hashes: RwLock::new(HashMap::new()),
        }
    }

    /// Execute a request
    ///
    /// Never fails: problems are reported as `Reply::Error`
    pub fn execute(&self, request: &Request) -> Reply {
        tracing::trace!(request = request.name(), "executing");

        let result = match request {
            Request::Command { command, args } => self.execute_command(*command, args),
            Request::Script { script, keys, args } => self.execute_script(*script, keys, args),
        };

        result.unwrap_or_else(|message| {
            tracing::debug!(request = request.name(), %message, "request failed");
            Reply::Error(message)
        })
    }

    /// Number of hashes in the keyspace
    pub fn hash_count(&self) -> usize {
        self.hashes.read().len()
    }

    /// Number of fields in one hash (0 if it does not exist)
    pub fn hash_len(&self, name: &[u8]) -> usize {
        self.hashes.read().get(name).map_or(0, |hash| hash.len())
    }

    /// Remove every hash
    pub fn flush_all(&self) {
        self.hashes.write().clear();
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn execute_command(&self, command: CommandType, args: &[Bytes]) -> CommandResult {
        match command {
            CommandType::Ping => {
                arity(command, args, 0, false)?;
                Ok(Reply::Bulk(Bytes::from_static(b"PONG")))
            }
            CommandType::HGet => {
                arity(command, args, 2, false)?;
                let hashes = self.hashes.read();
                let value = hashes.get(&args[0]).and_then(|hash| hash.get(&args[1]));
                Ok(value.map_or(Reply::Nil, |v| Reply::Bulk(v.clone())))
            }
            CommandType::HSet => {
                arity(command, args, 3, true)?;
                if (args.len() - 1) % 2 != 0 {
                    return Err("wrong number of arguments for 'hset'".to_string());
                }
                let mut hashes = self.hashes.write();
                let hash = hashes.entry(args[0].clone()).or_default();
                let mut created = 0;
                for pair in args[1..].chunks_exact(2) {
                    if hash.insert(pair[0].clone(), pair[1].clone()).is_none() {
                        created += 1;
                    }
                }
                Ok(Reply::Integer(created))
            }
            CommandType::HSetNx => {
                arity(command, args, 3, false)?;
                let mut hashes = self.hashes.write();
                let hash = hashes.entry(args[0].clone()).or_default();
                if hash.contains_key(&args[1]) {
                    return Ok(Reply::Integer(0));
                }
                hash.insert(args[1].clone(), args[2].clone());
                Ok(Reply::Integer(1))
            }
            CommandType::HDel => {
                arity(command, args, 2, true)?;
                let mut hashes = self.hashes.write();
                let Some(hash) = hashes.get_mut(&args[0]) else {
                    return Ok(Reply::Integer(0));
                };
                let removed = args[1..]
                    .iter()
                    .filter(|field| hash.remove(*field).is_some())
                    .count();
                if hash.is_empty() {
                    hashes.remove(&args[0]);
                }
                Ok(Reply::Integer(removed as i64))
            }
            CommandType::HLen => {
                arity(command, args, 1, false)?;
                Ok(Reply::Integer(self.hash_len(&args[0]) as i64))
            }
            CommandType::HExists => {
                arity(command, args, 2, false)?;
                let hashes = self.hashes.read();
                let exists = hashes
                    .get(&args[0])
                    .is_some_and(|hash| hash.contains_key(&args[1]));
                Ok(Reply::Integer(exists as i64))
            }
            CommandType::HMGet => {
                arity(command, args, 2, true)?;
                let hashes = self.hashes.read();
                let hash = hashes.get(&args[0]);
                let values = args[1..]
                    .iter()
                    .map(|field| {
                        hash.and_then(|h| h.get(field))
                            .map_or(Reply::Nil, |v| Reply::Bulk(v.clone()))
                    })
                    .collect();
                Ok(Reply::Array(values))
            }
            CommandType::HGetAll => {
                arity(command, args, 1, false)?;
                let hashes = self.hashes.read();
                let items = hashes
                    .get(&args[0])
                    .into_iter()
                    .flatten()
                    .flat_map(|(field, value)| {
                        [Reply::Bulk(field.clone()), Reply::Bulk(value.clone())]
                    })
                    .collect();
                Ok(Reply::Array(items))
            }
            CommandType::HKeys => {
                arity(command, args, 1, false)?;
                let hashes = self.hashes.read();
                let items = hashes
                    .get(&args[0])
                    .into_iter()
                    .flat_map(|hash| hash.keys())
                    .map(|field| Reply::Bulk(field.clone()))
                    .collect();
                Ok(Reply::Array(items))
            }
            CommandType::HVals => {
                arity(command, args, 1, false)?;
                let hashes = self.hashes.read();
                let items = hashes
                    .get(&args[0])
                    .into_iter()
                    .flat_map(|hash| hash.values())
                    .map(|value| Reply::Bulk(value.clone()))
                    .collect();
                Ok(Reply::Array(items))
            }
            CommandType::HScan => {
                arity(command, args, 3, false)?;
                let count = parse_count(&args[2])?;
                let hashes = self.hashes.read();
                let page = scan::scan(hashes.get(&args[0]), &args[1], count)?;
                Ok(page.into_reply())
            }
            CommandType::Del => {
                arity(command, args, 1, true)?;
                let mut hashes = self.hashes.write();
                let removed = args
                    .iter()
                    .filter(|name| hashes.remove(*name).is_some())
                    .count();
                Ok(Reply::Integer(removed as i64))
            }
            CommandType::Exists => {
                arity(command, args, 1, true)?;
                let hashes = self.hashes.read();
                let existing = args.iter().filter(|name| hashes.contains_key(*name)).count();
                Ok(Reply::Integer(existing as i64))
            }
        }
    }

    // =========================================================================
    // Scripts
    // =========================================================================

    fn execute_script(&self, script: ScriptId, keys: &[Bytes], args: &[Bytes]) -> CommandResult {
        let [name] = keys else {
            return Err(format!(
                "script '{}' expects 1 key, got {}",
                script.name(),
                keys.len()
            ));
        };

        let mut hashes = self.hashes.write();
        let hash = hashes.entry(name.clone()).or_default();
        let result = scripts::run(script, hash, args);
        if hash.is_empty() {
            hashes.remove(name);
        }
        result
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Check argument count: exactly `expected`, or at least `expected` if `variadic`
fn arity(command: CommandType, args: &[Bytes], expected: usize, variadic: bool) -> Result<(), String> {
    let ok = if variadic {
        args.len() >= expected
    } else {
        args.len() == expected
    };
    if ok {
        Ok(())
    } else {
        Err(format!("wrong number of arguments for '{}'", command.name()))
    }
}

fn parse_count(raw: &[u8]) -> Result<usize, String> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|count| *count > 0)
        .ok_or_else(|| "scan count must be a positive integer".to_string())
}
