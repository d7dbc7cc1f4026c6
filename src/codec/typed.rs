//! Tagged default codec
//!
//! Every encoded value starts with a type tag:
//!
//! | Tag | Meaning         | Payload                         |
//! |-----|-----------------|---------------------------------|
//! | `n` | null / `None`   | empty                           |
//! | `b` | boolean         | `0` or `1`                      |
//! | `i` | signed integer  | ASCII decimal `i64`             |
//! | `f` | floating point  | shortest round-trip ASCII `f64` |
//! | `s` | text            | UTF-8                           |
//! | `o` | anything else   | bincode                         |
//!
//! The tag is picked by driving the value's `Serialize` impl through a probe
//! that only accepts scalars; anything the probe rejects is stored as a
//! bincode blob. Transparent wrappers (`Option`, newtype structs) are looked
//! through, so `Some(5i32)` and `UserId(5)` both store as `i5`. A `Some`
//! wrapping something null (`Some(None)`, `Some(())`) is an object, so it
//! never collides with `None`.
//!
//! Structured values are only deterministic if their serialization is: use
//! ordered collections (`BTreeMap`, `Vec`) rather than `HashMap` inside keys.

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::ser::{self, Impossible, Serialize, Serializer};

use super::{Codec, WireNumber, FLOAT_TAG, INT_TAG};
use crate::error::{MapError, Result};

const NULL_TAG: u8 = b'n';
const BOOL_TAG: u8 = b'b';
const TEXT_TAG: u8 = b's';
const OBJECT_TAG: u8 = b'o';

/// Default codec: tagged scalars, bincode for everything else
pub struct TypedCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec<T> for TypedCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Bytes> {
        let mut out = Vec::new();
        match value.serialize(ScalarProbe) {
            Ok(Scalar::Null) => out.push(NULL_TAG),
            Ok(Scalar::Bool(flag)) => {
                out.push(BOOL_TAG);
                out.push(if flag { b'1' } else { b'0' });
            }
            Ok(Scalar::Number(number)) => return Ok(number.to_bytes()),
            Ok(Scalar::Text(text)) => {
                out.push(TEXT_TAG);
                out.extend_from_slice(text.as_bytes());
            }
            Err(NotScalar) => {
                out.push(OBJECT_TAG);
                bincode::serialize_into(&mut out, value)
                    .map_err(|e| MapError::Encode(e.to_string()))?;
            }
        }
        Ok(Bytes::from(out))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        let (&tag, payload) = bytes
            .split_first()
            .ok_or_else(|| MapError::Decode("empty value".to_string()))?;

        let scalar = match tag {
            NULL_TAG if payload.is_empty() => ScalarDeserializer::Null,
            BOOL_TAG => match payload {
                b"0" => ScalarDeserializer::Bool(false),
                b"1" => ScalarDeserializer::Bool(true),
                _ => return Err(MapError::Decode("malformed boolean".to_string())),
            },
            INT_TAG | FLOAT_TAG => match WireNumber::parse(bytes) {
                Some(WireNumber::Int(value)) => ScalarDeserializer::Int(value),
                Some(WireNumber::Float(value)) => ScalarDeserializer::Float(value),
                None => return Err(MapError::Decode("malformed number".to_string())),
            },
            TEXT_TAG => ScalarDeserializer::Text(
                std::str::from_utf8(payload)
                    .map_err(|e| MapError::Decode(format!("text is not UTF-8: {}", e)))?,
            ),
            OBJECT_TAG => {
                return bincode::deserialize(payload)
                    .map_err(|e| MapError::Decode(format!("structured value: {}", e)))
            }
            NULL_TAG => return Err(MapError::Decode("null with payload".to_string())),
            other => {
                return Err(MapError::Decode(format!(
                    "unknown type tag 0x{:02x}",
                    other
                )))
            }
        };

        T::deserialize(scalar).map_err(|e| MapError::Decode(e.0))
    }
}

// =============================================================================
// Encode side: scalar probe
// =============================================================================

enum Scalar {
    Null,
    Bool(bool),
    Number(WireNumber),
    Text(String),
}

/// Rejection from the probe; the value is encoded as an object instead
#[derive(Debug)]
struct NotScalar;

impl fmt::Display for NotScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not a scalar")
    }
}

impl std::error::Error for NotScalar {}

impl ser::Error for NotScalar {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        NotScalar
    }
}

struct ScalarProbe;

impl Serializer for ScalarProbe {
    type Ok = Scalar;
    type Error = NotScalar;

    type SerializeSeq = Impossible<Scalar, NotScalar>;
    type SerializeTuple = Impossible<Scalar, NotScalar>;
    type SerializeTupleStruct = Impossible<Scalar, NotScalar>;
    type SerializeTupleVariant = Impossible<Scalar, NotScalar>;
    type SerializeMap = Impossible<Scalar, NotScalar>;
    type SerializeStruct = Impossible<Scalar, NotScalar>;
    type SerializeStructVariant = Impossible<Scalar, NotScalar>;

    fn serialize_bool(self, v: bool) -> std::result::Result<Scalar, NotScalar> {
        Ok(Scalar::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> std::result::Result<Scalar, NotScalar> {
        self.serialize_i64(v.into())
    }

    fn serialize_i16(self, v: i16) -> std::result::Result<Scalar, NotScalar> {
        self.serialize_i64(v.into())
    }

    fn serialize_i32(self, v: i32) -> std::result::Result<Scalar, NotScalar> {
        self.serialize_i64(v.into())
    }

    fn serialize_i64(self, v: i64) -> std::result::Result<Scalar, NotScalar> {
        Ok(Scalar::Number(WireNumber::Int(v)))
    }

    fn serialize_u8(self, v: u8) -> std::result::Result<Scalar, NotScalar> {
        self.serialize_i64(v.into())
    }

    fn serialize_u16(self, v: u16) -> std::result::Result<Scalar, NotScalar> {
        self.serialize_i64(v.into())
    }

    fn serialize_u32(self, v: u32) -> std::result::Result<Scalar, NotScalar> {
        self.serialize_i64(v.into())
    }

    fn serialize_u64(self, v: u64) -> std::result::Result<Scalar, NotScalar> {
        // values above i64::MAX are stored as objects
        let v = i64::try_from(v).map_err(|_| NotScalar)?;
        self.serialize_i64(v)
    }

    fn serialize_f32(self, v: f32) -> std::result::Result<Scalar, NotScalar> {
        self.serialize_f64(v.into())
    }

    fn serialize_f64(self, v: f64) -> std::result::Result<Scalar, NotScalar> {
        Ok(Scalar::Number(WireNumber::Float(v)))
    }

    fn serialize_char(self, v: char) -> std::result::Result<Scalar, NotScalar> {
        Ok(Scalar::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> std::result::Result<Scalar, NotScalar> {
        Ok(Scalar::Text(v.to_owned()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> std::result::Result<Scalar, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_none(self) -> std::result::Result<Scalar, NotScalar> {
        Ok(Scalar::Null)
    }

    fn serialize_some<T>(self, value: &T) -> std::result::Result<Scalar, NotScalar>
    where
        T: ?Sized + Serialize,
    {
        // `Some(None)` and `Some(())` must not share `None`'s tag
        match value.serialize(self)? {
            Scalar::Null => Err(NotScalar),
            scalar => Ok(scalar),
        }
    }

    fn serialize_unit(self) -> std::result::Result<Scalar, NotScalar> {
        Ok(Scalar::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> std::result::Result<Scalar, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> std::result::Result<Scalar, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> std::result::Result<Scalar, NotScalar>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> std::result::Result<Scalar, NotScalar>
    where
        T: ?Sized + Serialize,
    {
        Err(NotScalar)
    }

    fn serialize_seq(
        self,
        _len: Option<usize>,
    ) -> std::result::Result<Self::SerializeSeq, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_tuple(self, _len: usize) -> std::result::Result<Self::SerializeTuple, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleStruct, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleVariant, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_map(
        self,
        _len: Option<usize>,
    ) -> std::result::Result<Self::SerializeMap, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeStruct, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeStructVariant, NotScalar> {
        Err(NotScalar)
    }
}

// =============================================================================
// Decode side: scalar deserializer
// =============================================================================

#[derive(Debug)]
struct ScalarError(String);

impl fmt::Display for ScalarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ScalarError {}

impl de::Error for ScalarError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ScalarError(msg.to_string())
    }
}

/// Feeds one decoded scalar to the target type's visitor
enum ScalarDeserializer<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(&'a str),
}

impl<'de, 'a> Deserializer<'de> for ScalarDeserializer<'a> {
    type Error = ScalarError;

    fn deserialize_any<V>(self, visitor: V) -> std::result::Result<V::Value, ScalarError>
    where
        V: Visitor<'de>,
    {
        match self {
            ScalarDeserializer::Null => visitor.visit_unit(),
            ScalarDeserializer::Bool(v) => visitor.visit_bool(v),
            ScalarDeserializer::Int(v) => visitor.visit_i64(v),
            ScalarDeserializer::Float(v) => visitor.visit_f64(v),
            ScalarDeserializer::Text(v) => visitor.visit_str(v),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> std::result::Result<V::Value, ScalarError>
    where
        V: Visitor<'de>,
    {
        match self {
            ScalarDeserializer::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, ScalarError>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct enum
        identifier ignored_any
    }
}
