//! Primitive type catalog.
//!
//! Every field of a snapshot is one of a closed set of primitive kinds. The
//! catalog gives each kind a stable lowercase name (used by schema dumps and
//! interchange), a fixed byte width, and a decoder from raw little-endian bytes
//! into a tagged [`VarNumber`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// Primitive kinds usable in a schema field.
///
/// The discriminant order is part of the schema hash contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BasicType {
    Bool = 0,
    Char = 1,
    Int8 = 2,
    UInt8 = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Float32 = 10,
    Float64 = 11,
    /// Anything not natively representable; unsized, decoded as NaN.
    Other = 12,
}

impl BasicType {
    /// Every type, in discriminant order.
    pub const ALL: [BasicType; 13] = [
        BasicType::Bool,
        BasicType::Char,
        BasicType::Int8,
        BasicType::UInt8,
        BasicType::Int16,
        BasicType::UInt16,
        BasicType::Int32,
        BasicType::UInt32,
        BasicType::Int64,
        BasicType::UInt64,
        BasicType::Float32,
        BasicType::Float64,
        BasicType::Other,
    ];

    /// Canonical interchange name.
    pub fn name(&self) -> &'static str {
        match self {
            BasicType::Bool => "bool",
            BasicType::Char => "char",
            BasicType::Int8 => "int8",
            BasicType::UInt8 => "uint8",
            BasicType::Int16 => "int16",
            BasicType::UInt16 => "uint16",
            BasicType::Int32 => "int32",
            BasicType::UInt32 => "uint32",
            BasicType::Int64 => "int64",
            BasicType::UInt64 => "uint64",
            BasicType::Float32 => "float32",
            BasicType::Float64 => "float64",
            BasicType::Other => "other",
        }
    }

    /// Inverse of [`BasicType::name`]. Unknown names resolve to [`BasicType::Other`].
    pub fn from_name(name: &str) -> BasicType {
        BasicType::ALL
            .iter()
            .copied()
            .find(|ty| ty.name() == name)
            .unwrap_or(BasicType::Other)
    }

    /// Fixed width in bytes; zero for [`BasicType::Other`].
    pub fn size(&self) -> usize {
        match self {
            BasicType::Bool | BasicType::Char | BasicType::Int8 | BasicType::UInt8 => 1,
            BasicType::Int16 | BasicType::UInt16 => 2,
            BasicType::Int32 | BasicType::UInt32 | BasicType::Float32 => 4,
            BasicType::Int64 | BasicType::UInt64 | BasicType::Float64 => 8,
            BasicType::Other => 0,
        }
    }

    /// Discriminant as fed into the schema hash.
    pub fn index(&self) -> u64 {
        *self as u8 as u64
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BasicType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(BasicType::from_name(s))
    }
}

impl Serialize for BasicType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for BasicType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(BasicType::from_name(&name))
    }
}

/// One decoded primitive value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum VarNumber {
    Bool(bool),
    /// Raw byte of a `char` field.
    Char(u8),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
}

impl VarNumber {
    /// Catalog type of the held value.
    pub fn basic_type(&self) -> BasicType {
        match self {
            VarNumber::Bool(_) => BasicType::Bool,
            VarNumber::Char(_) => BasicType::Char,
            VarNumber::Int8(_) => BasicType::Int8,
            VarNumber::UInt8(_) => BasicType::UInt8,
            VarNumber::Int16(_) => BasicType::Int16,
            VarNumber::UInt16(_) => BasicType::UInt16,
            VarNumber::Int32(_) => BasicType::Int32,
            VarNumber::UInt32(_) => BasicType::UInt32,
            VarNumber::Int64(_) => BasicType::Int64,
            VarNumber::UInt64(_) => BasicType::UInt64,
            VarNumber::Float32(_) => BasicType::Float32,
            VarNumber::Float64(_) => BasicType::Float64,
        }
    }

    /// Lossy numeric view, for plotting and debug output.
    pub fn as_f64(&self) -> f64 {
        match *self {
            VarNumber::Bool(v) => f64::from(u8::from(v)),
            VarNumber::Char(v) => f64::from(v),
            VarNumber::Int8(v) => f64::from(v),
            VarNumber::UInt8(v) => f64::from(v),
            VarNumber::Int16(v) => f64::from(v),
            VarNumber::UInt16(v) => f64::from(v),
            VarNumber::Int32(v) => f64::from(v),
            VarNumber::UInt32(v) => f64::from(v),
            VarNumber::Int64(v) => v as f64,
            VarNumber::UInt64(v) => v as f64,
            VarNumber::Float32(v) => f64::from(v),
            VarNumber::Float64(v) => v,
        }
    }

    /// Append the little-endian encoding (exactly `basic_type().size()` bytes).
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match *self {
            VarNumber::Bool(v) => buf.push(u8::from(v)),
            VarNumber::Char(v) => buf.push(v),
            VarNumber::Int8(v) => buf.extend_from_slice(&v.to_le_bytes()),
            VarNumber::UInt8(v) => buf.push(v),
            VarNumber::Int16(v) => buf.extend_from_slice(&v.to_le_bytes()),
            VarNumber::UInt16(v) => buf.extend_from_slice(&v.to_le_bytes()),
            VarNumber::Int32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            VarNumber::UInt32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            VarNumber::Int64(v) => buf.extend_from_slice(&v.to_le_bytes()),
            VarNumber::UInt64(v) => buf.extend_from_slice(&v.to_le_bytes()),
            VarNumber::Float32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            VarNumber::Float64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        }
    }

    /// Encoded bytes as a fresh buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.basic_type().size());
        self.encode_into(&mut buf);
        buf
    }
}

impl fmt::Display for VarNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarNumber::Bool(v) => write!(f, "{}", v),
            VarNumber::Char(v) => write!(f, "{}", char::from(*v)),
            VarNumber::Int8(v) => write!(f, "{}", v),
            VarNumber::UInt8(v) => write!(f, "{}", v),
            VarNumber::Int16(v) => write!(f, "{}", v),
            VarNumber::UInt16(v) => write!(f, "{}", v),
            VarNumber::Int32(v) => write!(f, "{}", v),
            VarNumber::UInt32(v) => write!(f, "{}", v),
            VarNumber::Int64(v) => write!(f, "{}", v),
            VarNumber::UInt64(v) => write!(f, "{}", v),
            VarNumber::Float32(v) => write!(f, "{}", v),
            VarNumber::Float64(v) => write!(f, "{}", v),
        }
    }
}

fn take<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Decode the leading `ty.size()` bytes of `bytes` as `ty`.
///
/// [`BasicType::Other`] has no generic decoding and always yields `Float64(NaN)`.
///
/// # Panics
///
/// Panics if `bytes` is shorter than `ty.size()`. Use [`try_decode`] when the
/// length is not already guaranteed by the caller.
pub fn decode(ty: BasicType, bytes: &[u8]) -> VarNumber {
    match ty {
        BasicType::Bool => VarNumber::Bool(bytes[0] != 0),
        BasicType::Char => VarNumber::Char(bytes[0]),
        BasicType::Int8 => VarNumber::Int8(i8::from_le_bytes(take(bytes))),
        BasicType::UInt8 => VarNumber::UInt8(bytes[0]),
        BasicType::Int16 => VarNumber::Int16(i16::from_le_bytes(take(bytes))),
        BasicType::UInt16 => VarNumber::UInt16(u16::from_le_bytes(take(bytes))),
        BasicType::Int32 => VarNumber::Int32(i32::from_le_bytes(take(bytes))),
        BasicType::UInt32 => VarNumber::UInt32(u32::from_le_bytes(take(bytes))),
        BasicType::Int64 => VarNumber::Int64(i64::from_le_bytes(take(bytes))),
        BasicType::UInt64 => VarNumber::UInt64(u64::from_le_bytes(take(bytes))),
        BasicType::Float32 => VarNumber::Float32(f32::from_le_bytes(take(bytes))),
        BasicType::Float64 => VarNumber::Float64(f64::from_le_bytes(take(bytes))),
        BasicType::Other => VarNumber::Float64(f64::NAN),
    }
}

/// Checked form of [`decode`].
pub fn try_decode(ty: BasicType, bytes: &[u8]) -> Result<VarNumber, TypeError> {
    if bytes.len() < ty.size() {
        return Err(TypeError::BufferTooShort {
            ty,
            needed: ty.size(),
            available: bytes.len(),
        });
    }
    Ok(decode(ty, bytes))
}

/// Rust scalar types with a native catalog entry.
pub trait Primitive: Copy {
    const BASIC_TYPE: BasicType;

    fn to_var(self) -> VarNumber;
}

macro_rules! impl_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const BASIC_TYPE: BasicType = BasicType::$variant;

                fn to_var(self) -> VarNumber {
                    VarNumber::$variant(self)
                }
            }
        )*
    };
}

impl_primitive! {
    bool => Bool,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}
