//! Decoded in-memory values
//!
//! [`Value`] mirrors the scalar kinds one-to-one and nests for collections,
//! tuples and user-defined types. SQL null is the distinguished
//! [`Value::Null`], never a default-constructed scalar.

use crate::types::composite::CompositeValue;
use bytes::Bytes;
use std::fmt;
use std::net::IpAddr;
use uuid::Uuid;

/// Arbitrary-precision decimal as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CqlDecimal {
    /// Decimal scale
    pub scale: i32,
    /// Unscaled value, big-endian two's complement
    pub unscaled: Bytes,
}

/// Calendar-aware duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CqlDuration {
    /// Months component
    pub months: i32,
    /// Days component
    pub days: i32,
    /// Nanoseconds component
    pub nanoseconds: i64,
}

/// Decoded value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null, or a field absent from the wire
    Null,
    /// 7-bit ASCII text
    Ascii(String),
    /// 64-bit signed integer
    Bigint(i64),
    /// Opaque bytes
    Blob(Bytes),
    /// Boolean
    Boolean(bool),
    /// Counter column value
    Counter(i64),
    /// Arbitrary-precision decimal
    Decimal(CqlDecimal),
    /// 64-bit float
    Double(f64),
    /// 32-bit float
    Float(f32),
    /// 32-bit signed integer
    Int(i32),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
    /// Any-version UUID
    Uuid(Uuid),
    /// UTF-8 text
    Text(String),
    /// Arbitrary-precision integer, big-endian two's complement
    Varint(Bytes),
    /// Version-1 UUID
    Timeuuid(Uuid),
    /// IPv4 or IPv6 address
    Inet(IpAddr),
    /// Days since -5877641-06-23, with the Unix epoch at 2^31
    Date(u32),
    /// Nanoseconds since midnight
    Time(i64),
    /// 16-bit signed integer
    Smallint(i16),
    /// 8-bit signed integer
    Tinyint(i8),
    /// Months, days and nanoseconds
    Duration(CqlDuration),
    /// `list<T>` elements
    List(Vec<Value>),
    /// `set<T>` elements in wire order
    Set(Vec<Value>),
    /// `map<K, V>` entries in wire order
    Map(Vec<(Value, Value)>),
    /// Tuple value
    Tuple(CompositeValue),
    /// User-defined type value
    Udt(CompositeValue),
    /// Raw body of a custom type
    Custom(Bytes),
}

impl Value {
    /// Short name of this value's kind, used in mismatch errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Ascii(_) => "ascii",
            Value::Bigint(_) => "bigint",
            Value::Blob(_) => "blob",
            Value::Boolean(_) => "boolean",
            Value::Counter(_) => "counter",
            Value::Decimal(_) => "decimal",
            Value::Double(_) => "double",
            Value::Float(_) => "float",
            Value::Int(_) => "int",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Text(_) => "text",
            Value::Varint(_) => "varint",
            Value::Timeuuid(_) => "timeuuid",
            Value::Inet(_) => "inet",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Smallint(_) => "smallint",
            Value::Tinyint(_) => "tinyint",
            Value::Duration(_) => "duration",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Tuple(_) => "tuple",
            Value::Udt(_) => "udt",
            Value::Custom(_) => "custom",
        }
    }

    /// Whether this is the null sentinel
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text content of `ascii` and `text` values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Ascii(s) | Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content of `int`, `smallint` and `tinyint` values
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Smallint(v) => Some(i32::from(*v)),
            Value::Tinyint(v) => Some(i32::from(*v)),
            _ => None,
        }
    }

    /// Integer content of `bigint`, `counter` and `timestamp` values
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bigint(v) | Value::Counter(v) | Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean content
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Floating point content of `double` and `float` values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Bytes of a `blob` value
    pub fn as_blob(&self) -> Option<&Bytes> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// UUID of `uuid` and `timeuuid` values
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) | Value::Timeuuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Elements of a `list` or `set`
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of a `map`
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Tuple or UDT content
    pub fn as_composite(&self) -> Option<&CompositeValue> {
        match self {
            Value::Tuple(c) | Value::Udt(c) => Some(c),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Bigint(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<IpAddr> for Value {
    fn from(ip: IpAddr) -> Self {
        Value::Inet(ip)
    }
}

impl From<CompositeValue> for Value {
    fn from(composite: CompositeValue) -> Self {
        if composite.is_udt() {
            Value::Udt(composite)
        } else {
            Value::Tuple(composite)
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

fn write_seq<'a, I>(f: &mut fmt::Formatter<'_>, open: &str, close: &str, items: I) -> fmt::Result
where
    I: IntoIterator<Item = &'a Value>,
{
    f.write_str(open)?;
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str(close)
}

/// Base-10 digits of a big-endian two's complement integer of any width
fn signed_digits(bytes: &[u8]) -> String {
    let negative = bytes.first().map_or(false, |b| b & 0x80 != 0);
    let mut magnitude = bytes.to_vec();
    if negative {
        for byte in magnitude.iter_mut() {
            *byte = !*byte;
        }
        for byte in magnitude.iter_mut().rev() {
            let (sum, carry) = byte.overflowing_add(1);
            *byte = sum;
            if !carry {
                break;
            }
        }
    }

    // repeated division by 10^9, least significant chunk first
    let mut chunks = Vec::new();
    while magnitude.iter().any(|&b| b != 0) {
        let mut remainder = 0u64;
        for byte in magnitude.iter_mut() {
            let acc = (remainder << 8) | u64::from(*byte);
            *byte = (acc / 1_000_000_000) as u8;
            remainder = acc % 1_000_000_000;
        }
        chunks.push(remainder);
    }

    let mut digits = String::new();
    if negative {
        digits.push('-');
    }
    match chunks.split_last() {
        None => digits.push('0'),
        Some((most, rest)) => {
            digits.push_str(&most.to_string());
            for chunk in rest.iter().rev() {
                digits.push_str(&format!("{:09}", chunk));
            }
        }
    }
    digits
}

/// CQL literal rendering. Decimals use the exponent form `12345E-2`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Ascii(s) | Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Bigint(v) | Value::Counter(v) | Value::Timestamp(v) | Value::Time(v) => write!(f, "{}", v),
            Value::Blob(b) | Value::Custom(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Decimal(d) if d.scale == 0 => f.write_str(&signed_digits(&d.unscaled)),
            Value::Decimal(d) => write!(f, "{}E{}", signed_digits(&d.unscaled), -i64::from(d.scale)),
            Value::Double(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Uuid(u) | Value::Timeuuid(u) => write!(f, "{}", u),
            Value::Varint(b) => f.write_str(&signed_digits(b)),
            Value::Inet(ip) => write!(f, "'{}'", ip),
            Value::Date(d) => write!(f, "{}", i64::from(*d) - (1i64 << 31)),
            Value::Smallint(v) => write!(f, "{}", v),
            Value::Tinyint(v) => write!(f, "{}", v),
            Value::Duration(d) => write!(f, "{}mo{}d{}ns", d.months, d.days, d.nanoseconds),
            Value::List(items) => write_seq(f, "[", "]", items),
            Value::Set(items) => write_seq(f, "{", "}", items),
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Tuple(c) | Value::Udt(c) => write!(f, "{}", c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from("foo").as_str(), Some("foo"));
        assert_eq!(Value::Smallint(-3).as_i32(), Some(-3));
        assert_eq!(Value::Counter(9).as_i64(), Some(9));
        assert_eq!(Value::Int(1).as_str(), None);
        assert!(Value::from(None::<i32>).is_null());
        assert_eq!(Value::from(Some(5)), Value::Int(5));
    }

    #[test]
    fn test_display_literals() {
        assert_eq!(Value::from("it's").to_string(), "'it''s'");
        assert_eq!(Value::Blob(Bytes::from_static(&[0xCA, 0xFE])).to_string(), "0xcafe");
        assert_eq!(Value::Date(1 << 31).to_string(), "0");
        let list = Value::List(vec![Value::Int(1), Value::Null]);
        assert_eq!(list.to_string(), "[1, null]");
        let map = Value::Map(vec![(Value::from("k"), Value::Boolean(true))]);
        assert_eq!(map.to_string(), "{'k': true}");
    }

    #[test]
    fn test_display_numeric_literals() {
        let decimal = |scale, unscaled: &'static [u8]| {
            Value::Decimal(CqlDecimal {
                scale,
                unscaled: Bytes::from_static(unscaled),
            })
        };
        assert_eq!(decimal(2, &[0x30, 0x39]).to_string(), "12345E-2");
        assert_eq!(decimal(0, &[0xCF, 0xC7]).to_string(), "-12345");
        assert_eq!(decimal(-3, &[0x07]).to_string(), "7E3");
        assert_eq!(decimal(1, &[]).to_string(), "0E-1");

        assert_eq!(Value::Varint(Bytes::from_static(&[0xFF])).to_string(), "-1");
        assert_eq!(Value::Varint(Bytes::from_static(&[0x00, 0x80])).to_string(), "128");
        let wide = Value::Varint(Bytes::from_static(&[
            0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ]));
        assert_eq!(wide.to_string(), "340282366920938463463374607431768211456");
        let min = Value::Varint(Bytes::from_static(&[0x80, 0, 0, 0, 0, 0, 0, 0]));
        assert_eq!(min.to_string(), "-9223372036854775808");
    }
}
