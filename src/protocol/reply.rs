//! Reply definitions
//!
//! Represents typed replies from the store, plus the shape checks the client
//! applies before trusting a reply.

use bytes::Bytes;

use crate::error::{MapError, Result};

/// A reply from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// No value
    Nil,

    /// Signed integer
    Integer(i64),

    /// Byte string
    Bulk(Bytes),

    /// Ordered list of nested replies
    Array(Vec<Reply>),

    /// The store rejected or failed the request
    Error(String),
}

impl Reply {
    /// Create an ERROR reply
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    /// Reply kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Nil => "nil",
            Reply::Integer(_) => "integer",
            Reply::Bulk(_) => "bulk",
            Reply::Array(_) => "array",
            Reply::Error(_) => "error",
        }
    }

    /// Turn an error reply into `MapError::Remote`
    pub fn into_result(self) -> Result<Reply> {
        match self {
            Reply::Error(message) => Err(MapError::Remote(message)),
            other => Ok(other),
        }
    }

    pub fn into_integer(self) -> Result<i64> {
        match self {
            Reply::Integer(value) => Ok(value),
            other => Err(unexpected("integer", &other)),
        }
    }

    /// An integer that counts something and therefore cannot be negative
    pub fn into_count(self) -> Result<u64> {
        let value = self.into_integer()?;
        u64::try_from(value)
            .map_err(|_| MapError::Protocol(format!("expected a count, got {}", value)))
    }

    /// An integer restricted to 0 or 1
    pub fn into_flag(self) -> Result<bool> {
        match self.into_integer()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(MapError::Protocol(format!(
                "expected 0 or 1, got {}",
                value
            ))),
        }
    }

    pub fn into_bulk(self) -> Result<Bytes> {
        match self {
            Reply::Bulk(bytes) => Ok(bytes),
            other => Err(unexpected("bulk", &other)),
        }
    }

    /// A bulk string, or nil for "no such field"
    pub fn into_optional_bulk(self) -> Result<Option<Bytes>> {
        match self {
            Reply::Bulk(bytes) => Ok(Some(bytes)),
            Reply::Nil => Ok(None),
            other => Err(unexpected("bulk or nil", &other)),
        }
    }

    pub fn into_array(self) -> Result<Vec<Reply>> {
        match self {
            Reply::Array(items) => Ok(items),
            other => Err(unexpected("array", &other)),
        }
    }

    /// An array whose elements are all bulk strings
    pub fn into_bulk_array(self) -> Result<Vec<Bytes>> {
        self.into_array()?.into_iter().map(Reply::into_bulk).collect()
    }

    /// A flat array of bulk strings paired up as (field, value)
    pub fn into_pairs(self) -> Result<Vec<(Bytes, Bytes)>> {
        let items = self.into_bulk_array()?;
        if items.len() % 2 != 0 {
            return Err(MapError::Protocol(format!(
                "expected field/value pairs, got {} elements",
                items.len()
            )));
        }

        let mut pairs = Vec::with_capacity(items.len() / 2);
        let mut items = items.into_iter();
        while let (Some(field), Some(value)) = (items.next(), items.next()) {
            pairs.push((field, value));
        }
        Ok(pairs)
    }
}

fn unexpected(expected: &str, got: &Reply) -> MapError {
    MapError::Protocol(format!("expected {} reply, got {}", expected, got.kind()))
}
