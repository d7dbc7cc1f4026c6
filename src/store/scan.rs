//! Hash scan
//!
//! Stateless paging over one hash. The resume token carries the next field
//! to return (`k` + raw field bytes), so the store keeps no per-scan state and
//! an abandoned scan costs nothing.
//!
//! Because a hash is ordered by field, every field present for the whole
//! duration of a scan is returned exactly once; fields added or removed
//! mid-scan may or may not show up.

use std::ops::Bound;

use bytes::{BufMut, Bytes, BytesMut};

use super::Hash;
use crate::protocol::{Reply, CURSOR_INITIAL, CURSOR_TERMINAL};

const RESUME_PREFIX: u8 = b'k';

/// One page of a scan
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ScanPage {
    pub cursor: Bytes,
    pub entries: Vec<(Bytes, Bytes)>,
}

impl ScanPage {
    /// `[cursor, [field, value, field, value, ...]]`
    pub fn into_reply(self) -> Reply {
        let items = self
            .entries
            .into_iter()
            .flat_map(|(field, value)| [Reply::Bulk(field), Reply::Bulk(value)])
            .collect();
        Reply::Array(vec![Reply::Bulk(self.cursor), Reply::Array(items)])
    }
}

/// Return up to `count` entries starting at `cursor`
pub(crate) fn scan(hash: Option<&Hash>, cursor: &[u8], count: usize) -> Result<ScanPage, String> {
    let start = if cursor == CURSOR_INITIAL {
        Bound::Unbounded
    } else {
        match cursor.split_first() {
            Some((&RESUME_PREFIX, field)) => Bound::Included(field),
            _ => return Err("invalid scan cursor".to_string()),
        }
    };

    let Some(hash) = hash else {
        return Ok(ScanPage {
            cursor: Bytes::from_static(CURSOR_TERMINAL),
            entries: Vec::new(),
        });
    };

    let mut range = hash.range::<[u8], _>((start, Bound::Unbounded));
    let entries: Vec<(Bytes, Bytes)> = range
        .by_ref()
        .take(count)
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();

    let cursor = match range.next() {
        Some((next, _)) => {
            let mut token = BytesMut::with_capacity(1 + next.len());
            token.put_u8(RESUME_PREFIX);
            token.put_slice(next);
            token.freeze()
        }
        None => Bytes::from_static(CURSOR_TERMINAL),
    };

    Ok(ScanPage { cursor, entries })
}
