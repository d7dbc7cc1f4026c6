//! Store Tests
//!
//! Tests verify:
//! - Hash commands and their replies
//! - Scan paging and resume tokens
//! - Scripts through the request router
//! - Script atomicity under concurrent writers

use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use distmap::protocol::{CommandType, Reply, Request, ScriptId, CURSOR_INITIAL, CURSOR_TERMINAL};
use distmap::Store;

fn b(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

fn cmd(store: &Store, command: CommandType, args: &[&str]) -> Reply {
    store.execute(&Request::command(command, args.iter().map(|a| b(a)).collect()))
}

fn script(store: &Store, script: ScriptId, name: &str, args: &[&str]) -> Reply {
    store.execute(&Request::script(
        script,
        vec![b(name)],
        args.iter().map(|a| b(a)).collect(),
    ))
}

fn bulk(s: &str) -> Reply {
    Reply::Bulk(b(s))
}

// =============================================================================
// Hash Command Tests
// =============================================================================

#[test]
fn test_ping() {
    let store = Store::new();
    assert_eq!(cmd(&store, CommandType::Ping, &[]), bulk("PONG"));
}

#[test]
fn test_hset_counts_new_fields() {
    let store = Store::new();
    assert_eq!(
        cmd(&store, CommandType::HSet, &["m", "a", "1", "b", "2"]),
        Reply::Integer(2)
    );
    assert_eq!(
        cmd(&store, CommandType::HSet, &["m", "a", "9", "c", "3"]),
        Reply::Integer(1)
    );
    assert_eq!(cmd(&store, CommandType::HGet, &["m", "a"]), bulk("9"));
    assert_eq!(cmd(&store, CommandType::HLen, &["m"]), Reply::Integer(3));
}

#[test]
fn test_hget_missing() {
    let store = Store::new();
    assert_eq!(cmd(&store, CommandType::HGet, &["m", "a"]), Reply::Nil);
    assert_eq!(cmd(&store, CommandType::HExists, &["m", "a"]), Reply::Integer(0));
    assert_eq!(cmd(&store, CommandType::HLen, &["m"]), Reply::Integer(0));
}

#[test]
fn test_hsetnx_keeps_existing() {
    let store = Store::new();
    assert_eq!(cmd(&store, CommandType::HSetNx, &["m", "a", "1"]), Reply::Integer(1));
    assert_eq!(cmd(&store, CommandType::HSetNx, &["m", "a", "2"]), Reply::Integer(0));
    assert_eq!(cmd(&store, CommandType::HGet, &["m", "a"]), bulk("1"));
}

#[test]
fn test_hdel_counts_existing_fields() {
    let store = Store::new();
    cmd(&store, CommandType::HSet, &["m", "1", "x", "3", "x", "5", "x"]);
    assert_eq!(
        cmd(&store, CommandType::HDel, &["m", "1", "3", "7"]),
        Reply::Integer(2)
    );
    assert_eq!(cmd(&store, CommandType::HLen, &["m"]), Reply::Integer(1));
}

#[test]
fn test_hmget_keeps_positions() {
    let store = Store::new();
    cmd(&store, CommandType::HSet, &["m", "a", "1", "b", "2"]);
    assert_eq!(
        cmd(&store, CommandType::HMGet, &["m", "a", "missing", "b"]),
        Reply::Array(vec![bulk("1"), Reply::Nil, bulk("2")])
    );
}

#[test]
fn test_hgetall_hkeys_hvals() {
    let store = Store::new();
    cmd(&store, CommandType::HSet, &["m", "b", "2", "a", "1"]);

    assert_eq!(
        cmd(&store, CommandType::HGetAll, &["m"]),
        Reply::Array(vec![bulk("a"), bulk("1"), bulk("b"), bulk("2")])
    );
    assert_eq!(
        cmd(&store, CommandType::HKeys, &["m"]),
        Reply::Array(vec![bulk("a"), bulk("b")])
    );
    assert_eq!(
        cmd(&store, CommandType::HVals, &["m"]),
        Reply::Array(vec![bulk("1"), bulk("2")])
    );
    assert_eq!(cmd(&store, CommandType::HKeys, &["other"]), Reply::Array(vec![]));
}

#[test]
fn test_del_and_exists() {
    let store = Store::new();
    cmd(&store, CommandType::HSet, &["m1", "a", "1"]);
    cmd(&store, CommandType::HSet, &["m2", "a", "1"]);

    assert_eq!(cmd(&store, CommandType::Exists, &["m1", "m2", "m3"]), Reply::Integer(2));
    assert_eq!(cmd(&store, CommandType::Del, &["m1", "m3"]), Reply::Integer(1));
    assert_eq!(cmd(&store, CommandType::Exists, &["m1"]), Reply::Integer(0));
    assert_eq!(store.hash_count(), 1);
}

#[test]
fn test_maps_are_isolated() {
    let store = Store::new();
    cmd(&store, CommandType::HSet, &["m1", "a", "1"]);
    assert_eq!(cmd(&store, CommandType::HGet, &["m2", "a"]), Reply::Nil);
    assert_eq!(store.hash_len(b"m1"), 1);
    assert_eq!(store.hash_len(b"m2"), 0);
}

#[test]
fn test_flush_all() {
    let store = Store::new();
    cmd(&store, CommandType::HSet, &["m1", "a", "1"]);
    cmd(&store, CommandType::HSet, &["m2", "a", "1"]);
    store.flush_all();
    assert_eq!(store.hash_count(), 0);
}

// =============================================================================
// Scan Tests
// =============================================================================

/// Drive a full scan and return every field seen plus the number of pages
fn scan_all(store: &Store, name: &str, count: usize) -> (Vec<Bytes>, usize) {
    let mut cursor = Bytes::from_static(CURSOR_INITIAL);
    let mut fields = Vec::new();
    let mut pages = 0;

    loop {
        let reply = store.execute(&Request::command(
            CommandType::HScan,
            vec![b(name), cursor.clone(), b(&count.to_string())],
        ));
        let mut parts = reply.into_array().unwrap().into_iter();
        cursor = parts.next().unwrap().into_bulk().unwrap();
        let entries = parts.next().unwrap().into_pairs().unwrap();
        assert!(entries.len() <= count);

        fields.extend(entries.into_iter().map(|(field, _)| field));
        pages += 1;

        if cursor.as_ref() == CURSOR_TERMINAL {
            return (fields, pages);
        }
    }
}

#[test]
fn test_scan_visits_every_field_once() {
    let store = Store::new();
    for i in 0..25 {
        cmd(&store, CommandType::HSet, &["m", &format!("f{:02}", i), "v"]);
    }

    for count in [1, 4, 10, 25, 100] {
        let (fields, _) = scan_all(&store, "m", count);
        let expected: Vec<Bytes> = (0..25).map(|i| b(&format!("f{:02}", i))).collect();
        assert_eq!(fields, expected, "count {}", count);
    }
}

#[test]
fn test_scan_page_count() {
    let store = Store::new();
    for i in 0..10 {
        cmd(&store, CommandType::HSet, &["m", &format!("f{}", i), "v"]);
    }
    assert_eq!(scan_all(&store, "m", 3).1, 4);
    assert_eq!(scan_all(&store, "m", 10).1, 1);
}

#[test]
fn test_scan_missing_map() {
    let store = Store::new();
    let (fields, pages) = scan_all(&store, "nothing", 10);
    assert!(fields.is_empty());
    assert_eq!(pages, 1);
}

#[test]
fn test_scan_rejects_bad_arguments() {
    let store = Store::new();
    assert!(matches!(
        cmd(&store, CommandType::HScan, &["m", "0", "many"]),
        Reply::Error(_)
    ));
    assert!(matches!(
        cmd(&store, CommandType::HScan, &["m", "bogus", "10"]),
        Reply::Error(_)
    ));
}

// =============================================================================
// Script Tests
// =============================================================================

#[test]
fn test_scripts_through_router() {
    let store = Store::new();
    assert_eq!(script(&store, ScriptId::Put, "m", &["k", "v1"]), Reply::Nil);
    assert_eq!(script(&store, ScriptId::Put, "m", &["k", "v2"]), bulk("v1"));
    assert_eq!(script(&store, ScriptId::PutIfAbsent, "m", &["k", "v3"]), bulk("v2"));
    assert_eq!(script(&store, ScriptId::Replace, "m", &["k", "v4"]), bulk("v2"));
    assert_eq!(
        script(&store, ScriptId::ReplaceIfEquals, "m", &["k", "v4", "v5"]),
        Reply::Integer(1)
    );
    assert_eq!(
        script(&store, ScriptId::RemoveIfEquals, "m", &["k", "v4"]),
        Reply::Integer(0)
    );
    assert_eq!(script(&store, ScriptId::Remove, "m", &["k"]), bulk("v5"));
    assert_eq!(store.hash_count(), 0);
}

#[test]
fn test_increment_of_text_is_error_reply() {
    let store = Store::new();
    script(&store, ScriptId::Put, "m", &["k", "shello"]);
    let reply = script(&store, ScriptId::AddAndGet, "m", &["k", "i1"]);
    assert!(matches!(reply, Reply::Error(ref m) if m.contains("not a number")));
    assert_eq!(cmd(&store, CommandType::HGet, &["m", "k"]), bulk("shello"));
}

#[test]
fn test_mixed_increment_becomes_float() {
    let store = Store::new();
    script(&store, ScriptId::Put, "m", &["k", "i1"]);
    assert_eq!(
        script(&store, ScriptId::AddAndGet, "m", &["k", "f0.5"]),
        bulk("f1.5")
    );
}

#[test]
fn test_concurrent_increments_are_atomic() {
    let store = Arc::new(Store::new());
    let threads = 8;
    let per_thread = 200;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..per_thread {
                    let reply = script(&store, ScriptId::AddAndGet, "counters", &["hits", "i1"]);
                    assert!(matches!(reply, Reply::Bulk(_)));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        cmd(&store, CommandType::HGet, &["counters", "hits"]),
        bulk(&format!("i{}", threads * per_thread))
    );
}

#[test]
fn test_concurrent_put_if_absent_has_one_winner() {
    let store = Arc::new(Store::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let value = format!("v{}", i);
                script(&store, ScriptId::PutIfAbsent, "m", &["k", &value]) == Reply::Nil
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
}
