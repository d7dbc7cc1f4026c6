//! Atomic scripts
//!
//! Each script is a function from the current hash to the mutated hash plus
//! a reply. The keyspace runs it while holding the write lock, so the
//! read-check-write inside a script can never interleave with another client.
//!
//! Comparisons are byte-for-byte on the encoded values: two values are equal
//! when their codec produced identical bytes.

use bytes::Bytes;

use super::Hash;
use crate::codec::WireNumber;
use crate::protocol::{Reply, ScriptId};

type ScriptResult = Result<Reply, String>;

/// Run `script` against one hash
pub(crate) fn run(script: ScriptId, hash: &mut Hash, args: &[Bytes]) -> ScriptResult {
    match (script, args) {
        (ScriptId::Put, [field, value]) => Ok(put(hash, field, value)),
        (ScriptId::Remove, [field]) => Ok(remove(hash, field)),
        (ScriptId::PutIfAbsent, [field, value]) => Ok(put_if_absent(hash, field, value)),
        (ScriptId::Replace, [field, value]) => Ok(replace(hash, field, value)),
        (ScriptId::ReplaceIfEquals, [field, expected, value]) => {
            Ok(replace_if_equals(hash, field, expected, value))
        }
        (ScriptId::RemoveIfEquals, [field, expected]) => {
            Ok(remove_if_equals(hash, field, expected))
        }
        (ScriptId::AddAndGet, [field, delta]) => add_and_get(hash, field, delta),
        (script, args) => Err(format!(
            "wrong number of arguments for script '{}': {}",
            script.name(),
            args.len()
        )),
    }
}

fn optional(value: Option<Bytes>) -> Reply {
    value.map_or(Reply::Nil, Reply::Bulk)
}

/// Store the value, answer the previous one
fn put(hash: &mut Hash, field: &Bytes, value: &Bytes) -> Reply {
    optional(hash.insert(field.clone(), value.clone()))
}

/// Delete the field, answer the removed value
fn remove(hash: &mut Hash, field: &Bytes) -> Reply {
    optional(hash.remove(field))
}

/// Store only if the field is missing; a stored null counts as present
fn put_if_absent(hash: &mut Hash, field: &Bytes, value: &Bytes) -> Reply {
    match hash.get(field) {
        Some(existing) => Reply::Bulk(existing.clone()),
        None => {
            hash.insert(field.clone(), value.clone());
            Reply::Nil
        }
    }
}

/// Overwrite only if the field exists
fn replace(hash: &mut Hash, field: &Bytes, value: &Bytes) -> Reply {
    match hash.get_mut(field) {
        Some(existing) => Reply::Bulk(std::mem::replace(existing, value.clone())),
        None => Reply::Nil,
    }
}

fn replace_if_equals(hash: &mut Hash, field: &Bytes, expected: &Bytes, value: &Bytes) -> Reply {
    match hash.get_mut(field) {
        Some(existing) if *existing == *expected => {
            *existing = value.clone();
            Reply::Integer(1)
        }
        _ => Reply::Integer(0),
    }
}

fn remove_if_equals(hash: &mut Hash, field: &Bytes, expected: &Bytes) -> Reply {
    if hash.get(field) == Some(expected) {
        hash.remove(field);
        Reply::Integer(1)
    } else {
        Reply::Integer(0)
    }
}

/// Increment a numeric field, creating it as `delta` when missing
fn add_and_get(hash: &mut Hash, field: &Bytes, delta: &Bytes) -> ScriptResult {
    let delta = WireNumber::parse(delta).ok_or("increment is not a number")?;

    let next = match hash.get(field) {
        Some(current) => {
            let current = WireNumber::parse(current).ok_or("hash value is not a number")?;
            current
                .checked_add(delta)
                .ok_or("increment would overflow")?
        }
        None => delta,
    };

    let encoded = next.to_bytes();
    hash.insert(field.clone(), encoded.clone());
    Ok(Reply::Bulk(encoded))
}
