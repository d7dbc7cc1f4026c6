//! Map Tests
//!
//! Tests verify, against an in-process store:
//! - Single-key reads and writes
//! - Atomic conditional operations
//! - Numeric increments keep their subtype
//! - Multi-key operations and zero-work shortcuts
//! - Null values versus absent keys
//! - Issuance order on one map
//! - Error classification

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use distmap::protocol::{Reply, Request};
use distmap::transport::{LocalTransport, Transport};
use distmap::{Client, Config, DistributedMap, MapError, Result, Store};

fn client() -> Client {
    Client::local(Arc::new(Store::new()), Config::default()).unwrap()
}

fn s(value: &str) -> String {
    value.to_string()
}

/// Transport that counts exchanges before passing them to a local store
struct CountingTransport {
    inner: LocalTransport,
    calls: AtomicUsize,
}

impl CountingTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: LocalTransport::new(Arc::new(Store::new())),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for CountingTransport {
    fn send(&self, request: &Request) -> Result<Reply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.send(request)
    }
}

/// Transport whose connection is always down
struct DownTransport {
    calls: AtomicUsize,
}

impl Transport for DownTransport {
    fn send(&self, _request: &Request) -> Result<Reply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MapError::Transport("connection refused".to_string()))
    }
}

// =============================================================================
// Single-Key Tests
// =============================================================================

#[test]
fn test_get_absent_key() {
    let client = client();
    let map: DistributedMap<String, String> = client.get_map("simple");

    assert_eq!(map.get(&s("missing")).wait().unwrap(), None);
    assert!(!map.contains_key(&s("missing")).wait().unwrap());
}

#[test]
fn test_put_get_and_previous_value() {
    let client = client();
    let map: DistributedMap<i64, String> = client.get_map("simple");

    assert_eq!(map.put(&1, &s("2")).wait().unwrap(), None);
    assert_eq!(map.put(&1, &s("3")).wait().unwrap(), Some(s("2")));
    assert_eq!(map.get(&1).wait().unwrap(), Some(s("3")));
    assert!(map.contains_key(&1).wait().unwrap());
}

#[test]
fn test_remove_returns_previous() {
    let client = client();
    let map: DistributedMap<String, i64> = client.get_map("simple");

    map.put(&s("k"), &5).wait().unwrap();
    assert_eq!(map.remove(&s("k")).wait().unwrap(), Some(5));
    assert_eq!(map.remove(&s("k")).wait().unwrap(), None);
    assert_eq!(map.size().wait().unwrap(), 0);
}

#[test]
fn test_fast_put_reports_new_key() {
    let client = client();
    let map: DistributedMap<i64, i64> = client.get_map("simple");

    assert!(map.fast_put(&1, &2).wait().unwrap());
    assert!(!map.fast_put(&1, &3).wait().unwrap());
    assert_eq!(map.get(&1).wait().unwrap(), Some(3));
}

#[test]
fn test_fast_put_if_absent() {
    let client = client();
    let map: DistributedMap<String, String> = client.get_map("simple");

    assert!(map.fast_put_if_absent(&s("k"), &s("first")).wait().unwrap());
    assert!(!map.fast_put_if_absent(&s("k"), &s("second")).wait().unwrap());
    assert_eq!(map.get(&s("k")).wait().unwrap(), Some(s("first")));
}

#[test]
fn test_maps_with_different_names_are_independent() {
    let client = client();
    let left: DistributedMap<String, i64> = client.get_map("left");
    let right: DistributedMap<String, i64> = client.get_map("right");

    left.put(&s("k"), &1).wait().unwrap();
    assert_eq!(right.get(&s("k")).wait().unwrap(), None);
    assert_eq!(left.name(), "left");
}

// =============================================================================
// Atomic Operation Tests
// =============================================================================

#[test]
fn test_put_if_absent_keeps_first_value() {
    let client = client();
    let map: DistributedMap<String, String> = client.get_map("simple");

    assert_eq!(map.put_if_absent(&s("k"), &s("v1")).wait().unwrap(), None);
    assert_eq!(map.put_if_absent(&s("k"), &s("v2")).wait().unwrap(), Some(s("v1")));
    assert_eq!(map.get(&s("k")).wait().unwrap(), Some(s("v1")));
}

#[test]
fn test_replace_only_existing() {
    let client = client();
    let map: DistributedMap<String, String> = client.get_map("simple");

    assert_eq!(map.replace(&s("k"), &s("v")).wait().unwrap(), None);
    assert!(!map.contains_key(&s("k")).wait().unwrap());

    map.put(&s("k"), &s("old")).wait().unwrap();
    assert_eq!(map.replace(&s("k"), &s("new")).wait().unwrap(), Some(s("old")));
    assert_eq!(map.get(&s("k")).wait().unwrap(), Some(s("new")));
}

#[test]
fn test_replace_if_equals_single_swap() {
    let client = client();
    let map: DistributedMap<i64, i64> = client.get_map("simple");

    map.put(&1, &2).wait().unwrap();
    assert!(map.replace_if_equals(&1, &2, &3).wait().unwrap());
    assert!(!map.replace_if_equals(&1, &2, &3).wait().unwrap());
    assert_eq!(map.get(&1).wait().unwrap(), Some(3));
}

#[test]
fn test_replace_if_equals_on_absent_key() {
    let client = client();
    let map: DistributedMap<i64, i64> = client.get_map("simple");

    assert!(!map.replace_if_equals(&1, &2, &3).wait().unwrap());
    assert_eq!(map.size().wait().unwrap(), 0);
}

#[test]
fn test_remove_if_equals() {
    let client = client();
    let map: DistributedMap<i64, i64> = client.get_map("simple");

    map.put(&1, &3).wait().unwrap();
    assert_eq!(map.remove_if_equals(&1, &4).wait().unwrap(), 0);
    assert_eq!(map.remove_if_equals(&1, &3).wait().unwrap(), 1);
    assert_eq!(map.get(&1).wait().unwrap(), None);
    assert_eq!(map.remove_if_equals(&1, &3).wait().unwrap(), 0);
}

#[test]
fn test_add_and_get_integer() {
    let client = client();
    let map: DistributedMap<i64, i64> = client.get_map("counters");

    map.put(&1, &100).wait().unwrap();
    assert_eq!(map.add_and_get(&1, &12).wait().unwrap(), 112);
    assert_eq!(map.get(&1).wait().unwrap(), Some(112));
}

#[test]
fn test_add_and_get_decimal() {
    let client = client();
    let map: DistributedMap<i64, f64> = client.get_map("counters");

    map.put(&1, &100.2).wait().unwrap();
    assert_eq!(map.add_and_get(&1, &12.1).wait().unwrap(), 112.3);
    assert_eq!(map.get(&1).wait().unwrap(), Some(112.3));
}

#[test]
fn test_add_and_get_creates_missing_entry() {
    let client = client();
    let map: DistributedMap<String, i64> = client.get_map("counters");

    assert_eq!(map.add_and_get(&s("fresh"), &-4).wait().unwrap(), -4);
    assert_eq!(map.size().wait().unwrap(), 1);
}

#[test]
fn test_add_and_get_on_text_is_remote_error() {
    let client = client();
    let text: DistributedMap<String, String> = client.get_map("mixed");
    let numbers: DistributedMap<String, i64> = client.get_map("mixed");

    text.put(&s("k"), &s("hello")).wait().unwrap();
    let err = numbers.add_and_get(&s("k"), &1).wait().unwrap_err();
    assert!(matches!(err, MapError::Remote(_)));
    assert_eq!(text.get(&s("k")).wait().unwrap(), Some(s("hello")));
}

#[test]
fn test_add_and_get_overflow_is_remote_error() {
    let client = client();
    let map: DistributedMap<String, i64> = client.get_map("counters");

    map.put(&s("k"), &i64::MAX).wait().unwrap();
    let err = map.add_and_get(&s("k"), &1).wait().unwrap_err();
    assert!(matches!(err, MapError::Remote(_)));
    assert_eq!(map.get(&s("k")).wait().unwrap(), Some(i64::MAX));
}

#[test]
fn test_add_and_get_past_narrow_type_leaves_undecodable_entry() {
    let client = client();
    let narrow: DistributedMap<String, i32> = client.get_map("counters");
    let wide: DistributedMap<String, i64> = client.get_map("counters");

    narrow.put(&s("k"), &i32::MAX).wait().unwrap();
    let err = narrow.add_and_get(&s("k"), &1).wait().unwrap_err();
    assert!(err.is_decode());

    // The sum was stored at full width
    assert!(narrow.get(&s("k")).wait().unwrap_err().is_decode());
    assert_eq!(wide.get(&s("k")).wait().unwrap(), Some(i64::from(i32::MAX) + 1));

    // Overwriting repairs it
    assert!(!narrow.fast_put(&s("k"), &0).wait().unwrap());
    assert_eq!(narrow.get(&s("k")).wait().unwrap(), Some(0));
}

// =============================================================================
// Multi-Key Tests
// =============================================================================

#[test]
fn test_get_all_omits_missing_keys() {
    let client = client();
    let map: DistributedMap<String, String> = client.get_map("getAll");

    map.put(&s("a"), &s("1")).wait().unwrap();
    map.put(&s("b"), &s("2")).wait().unwrap();
    map.put(&s("c"), &s("3")).wait().unwrap();

    let found = map
        .get_all(&[s("a"), s("b"), s("missing")])
        .wait()
        .unwrap();

    let mut expected = HashMap::new();
    expected.insert(s("a"), s("1"));
    expected.insert(s("b"), s("2"));
    assert_eq!(found, expected);
}

#[test]
fn test_put_all_then_read_all_map() {
    let client = client();
    let map: DistributedMap<i64, String> = client.get_map("putAll");

    let mut entries = BTreeMap::new();
    entries.insert(1, s("one"));
    entries.insert(2, s("two"));
    entries.insert(3, s("three"));
    map.put_all(&entries).wait().unwrap();

    let all = map.read_all_map().wait().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all.get(&2), Some(&s("two")));
}

#[test]
fn test_fast_remove_counts_existing_keys() {
    let client = client();
    let map: DistributedMap<i64, i64> = client.get_map("simple");

    for (k, v) in [(1, 3), (3, 5), (4, 6), (7, 8)] {
        map.put(&k, &v).wait().unwrap();
    }

    assert_eq!(map.fast_remove(&[1, 3, 7]).wait().unwrap(), 3);
    for key in [1, 3, 7] {
        assert!(!map.contains_key(&key).wait().unwrap());
    }
    assert_eq!(map.size().wait().unwrap(), 1);
}

#[test]
fn test_fast_remove_nothing_makes_no_call() {
    let transport = CountingTransport::new();
    let client = Client::with_transport(Config::default(), transport.clone()).unwrap();
    let map: DistributedMap<i64, i64> = client.get_map("simple");

    map.put(&1, &1).wait().unwrap();
    let before = transport.calls();

    assert_eq!(map.fast_remove(&[]).wait().unwrap(), 0);
    assert_eq!(transport.calls(), before);
    assert_eq!(map.size().wait().unwrap(), 1);
}

#[test]
fn test_put_all_empty_makes_no_call() {
    let transport = CountingTransport::new();
    let client = Client::with_transport(Config::default(), transport.clone()).unwrap();
    let map: DistributedMap<i64, i64> = client.get_map("simple");

    map.put_all(&HashMap::new()).wait().unwrap();
    assert!(map.get_all(&[]).wait().unwrap().is_empty());
    assert_eq!(transport.calls(), 0);
}

#[test]
fn test_size_tracks_distinct_keys() {
    let client = client();
    let map: DistributedMap<String, i64> = client.get_map("size");

    assert!(map.is_empty().wait().unwrap());
    map.put(&s("a"), &1).wait().unwrap();
    map.put(&s("b"), &2).wait().unwrap();
    map.put(&s("a"), &3).wait().unwrap();
    assert_eq!(map.size().wait().unwrap(), 2);

    map.remove(&s("a")).wait().unwrap();
    assert_eq!(map.size().wait().unwrap(), 1);
    assert!(!map.is_empty().wait().unwrap());
}

#[test]
fn test_contains_value() {
    let client = client();
    let map: DistributedMap<i64, String> = client.get_map("values");

    map.put(&1, &s("x")).wait().unwrap();
    map.put(&2, &s("y")).wait().unwrap();

    assert!(map.contains_value(&s("y")).wait().unwrap());
    assert!(!map.contains_value(&s("z")).wait().unwrap());
}

#[test]
fn test_contains_value_pages_until_found() {
    let transport = CountingTransport::new();
    let config = Config::builder().scan_count(2).build();
    let client = Client::with_transport(config, transport.clone()).unwrap();
    let map: DistributedMap<i64, String> = client.get_map("values");

    for i in 1..=7 {
        map.fast_put(&i, &format!("v{}", i)).wait().unwrap();
    }

    // Seven entries in pages of two
    let before = transport.calls();
    assert!(!map.contains_value(&s("missing")).wait().unwrap());
    assert_eq!(transport.calls() - before, 4);

    let before = transport.calls();
    assert!(map.contains_value(&s("v1")).wait().unwrap());
    assert_eq!(transport.calls() - before, 1);

    assert!(map.contains_value(&s("v7")).wait().unwrap());
}

#[test]
fn test_contains_value_sees_earlier_writes() {
    let client = client();
    let map: DistributedMap<i64, String> = client.get_map("values");

    let _ = map.fast_put(&1, &s("late"));
    assert!(map.contains_value(&s("late")).wait().unwrap());
}

#[test]
fn test_read_all_keys_and_values() {
    let client = client();
    let map: DistributedMap<String, i64> = client.get_map("all");

    map.put(&s("b"), &2).wait().unwrap();
    map.put(&s("a"), &1).wait().unwrap();

    let mut keys = map.read_all_keys().wait().unwrap();
    keys.sort();
    assert_eq!(keys, vec![s("a"), s("b")]);

    let mut values = map.read_all_values().wait().unwrap();
    values.sort();
    assert_eq!(values, vec![1, 2]);
}

#[test]
fn test_delete_and_clear() {
    let client = client();
    let map: DistributedMap<String, i64> = client.get_map("gone");

    assert!(!map.delete().wait().unwrap());
    map.put(&s("a"), &1).wait().unwrap();
    assert!(map.delete().wait().unwrap());
    assert_eq!(map.size().wait().unwrap(), 0);

    map.put(&s("a"), &1).wait().unwrap();
    map.clear().wait().unwrap();
    assert!(map.is_empty().wait().unwrap());
}

// =============================================================================
// Null Value Tests
// =============================================================================

#[test]
fn test_null_value_counts_and_differs_from_absence() {
    let client = client();
    let map: DistributedMap<i64, Option<String>> = client.get_map("nulls");

    map.put(&1, &None).wait().unwrap();
    map.put(&2, &Some(s("v"))).wait().unwrap();

    assert_eq!(map.size().wait().unwrap(), 2);
    assert_eq!(map.get(&1).wait().unwrap(), Some(None));
    assert_eq!(map.get(&3).wait().unwrap(), None);
    assert!(map.contains_key(&1).wait().unwrap());
}

#[test]
fn test_put_if_absent_treats_null_as_present() {
    let client = client();
    let map: DistributedMap<i64, Option<String>> = client.get_map("nulls");

    map.put(&1, &None).wait().unwrap();
    assert_eq!(map.put_if_absent(&1, &Some(s("v"))).wait().unwrap(), Some(None));
    assert_eq!(map.get(&1).wait().unwrap(), Some(None));
}

// =============================================================================
// Ordering and Deferred Tests
// =============================================================================

#[test]
fn test_operations_apply_in_issuance_order() {
    let client = Client::local(
        Arc::new(Store::new()),
        Config::builder().dispatch_threads(4).build(),
    )
    .unwrap();
    let map: DistributedMap<String, i64> = client.get_map("ordered");

    let pending: Vec<_> = (0..200).map(|i| map.fast_put(&s("k"), &i)).collect();
    let last = map.get(&s("k"));

    for deferred in pending {
        deferred.wait().unwrap();
    }
    assert_eq!(last.wait().unwrap(), Some(199));
}

#[test]
fn test_dropped_result_still_applies() {
    let client = client();
    let map: DistributedMap<String, i64> = client.get_map("dropped");

    map.put(&s("k"), &1).cancel();
    assert_eq!(map.get(&s("k")).wait().unwrap(), Some(1));
}

#[test]
fn test_deferred_map_transforms_result() {
    let client = client();
    let map: DistributedMap<String, i64> = client.get_map("deferred");

    map.put(&s("k"), &20).wait().unwrap();
    let doubled = map.get(&s("k")).map(|v| v.map(|n| n * 2));
    assert_eq!(doubled.wait().unwrap(), Some(40));
}

#[test]
fn test_ping() {
    client().ping().wait().unwrap();
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_transport_failure_is_not_retried() {
    let transport = Arc::new(DownTransport {
        calls: AtomicUsize::new(0),
    });
    let client = Client::with_transport(Config::default(), transport.clone()).unwrap();
    let map: DistributedMap<String, i64> = client.get_map("down");

    let err = map.put(&s("k"), &1).wait().unwrap_err();
    assert!(err.is_transport());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stored_bytes_of_wrong_type_are_decode_error() {
    let client = client();
    let text: DistributedMap<String, String> = client.get_map("typed");
    let numbers: DistributedMap<String, i64> = client.get_map("typed");

    text.put(&s("k"), &s("not a number")).wait().unwrap();
    let err = numbers.get(&s("k")).wait().unwrap_err();
    assert!(err.is_decode());
}
