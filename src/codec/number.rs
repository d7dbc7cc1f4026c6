//! Numeric wire format
//!
//! Integers and floats are stored as a one byte tag followed by ASCII
//! decimal text. The tag survives an increment, so an integer entry stays an
//! integer and a float entry stays a float. The same format is understood by
//! the store's `add_and_get` script.
//!
//! ```text
//! i112        integer 112
//! f112.3      float 112.3
//! f1e300      float 1e300
//! ```

use std::fmt;

use bytes::Bytes;

/// Tag byte of an integer value
pub const INT_TAG: u8 = b'i';

/// Tag byte of a floating-point value
pub const FLOAT_TAG: u8 = b'f';

/// A number in its wire form
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WireNumber {
    Int(i64),
    Float(f64),
}

impl WireNumber {
    /// Parse tagged bytes; `None` if they are not a number
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let (&tag, digits) = bytes.split_first()?;
        let digits = std::str::from_utf8(digits).ok()?;
        match tag {
            INT_TAG => digits.parse().ok().map(WireNumber::Int),
            FLOAT_TAG => digits.parse().ok().map(WireNumber::Float),
            _ => None,
        }
    }

    pub fn to_bytes(self) -> Bytes {
        Bytes::from(self.to_string().into_bytes())
    }

    /// Add two numbers.
    ///
    /// Integer plus integer stays an integer; any float operand makes the
    /// result a float. Returns `None` on integer overflow or a non-finite
    /// float result.
    pub fn checked_add(self, other: WireNumber) -> Option<WireNumber> {
        match (self, other) {
            (WireNumber::Int(a), WireNumber::Int(b)) => a.checked_add(b).map(WireNumber::Int),
            (a, b) => {
                let sum = a.as_f64() + b.as_f64();
                sum.is_finite().then_some(WireNumber::Float(sum))
            }
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            WireNumber::Int(value) => value as f64,
            WireNumber::Float(value) => value,
        }
    }
}

impl fmt::Display for WireNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireNumber::Int(value) => write!(f, "{}{}", INT_TAG as char, value),
            // Debug prints the shortest text that parses back to the same f64
            WireNumber::Float(value) => write!(f, "{}{:?}", FLOAT_TAG as char, value),
        }
    }
}
