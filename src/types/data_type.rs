//! Type descriptors for the CQL type universe
//!
//! A [`DataType`] is an immutable, structurally comparable description of a
//! value's shape. Composite variants keep their children behind `Arc` so a
//! descriptor can be cloned and shared across threads without copying the
//! tree. Equality and hashing are derived, so they cover every structural
//! component recursively and descriptors work directly as cache keys.

use crate::core::error::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::sync::Arc;

/// Wire type codes for scalar kinds - one-to-one with the protocol `[option]` ids
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    /// 7-bit ASCII text
    Ascii = 0x0001,
    /// 64-bit signed integer
    Bigint = 0x0002,
    /// Opaque bytes
    Blob = 0x0003,
    /// Single byte boolean
    Boolean = 0x0004,
    /// Counter column, 64-bit
    Counter = 0x0005,
    /// Scale plus varint unscaled value
    Decimal = 0x0006,
    /// 64-bit IEEE 754 float
    Double = 0x0007,
    /// 32-bit IEEE 754 float
    Float = 0x0008,
    /// 32-bit signed integer
    Int = 0x0009,
    /// Milliseconds since the Unix epoch
    Timestamp = 0x000B,
    /// Any-version UUID
    Uuid = 0x000C,
    /// UTF-8 text
    Text = 0x000D,
    /// Arbitrary-precision integer
    Varint = 0x000E,
    /// Version-1 UUID
    Timeuuid = 0x000F,
    /// IPv4 or IPv6 address
    Inet = 0x0010,
    /// Unsigned days with the epoch at 2^31
    Date = 0x0011,
    /// Nanoseconds since midnight
    Time = 0x0012,
    /// 16-bit signed integer
    Smallint = 0x0013,
    /// 8-bit signed integer
    Tinyint = 0x0014,
    /// Months, days and nanoseconds as vints
    Duration = 0x0015,
}

impl PrimitiveKind {
    /// Number of scalar kinds
    pub const COUNT: usize = 20;

    /// Every scalar kind, in [`PrimitiveKind::index`] order
    pub const ALL: [PrimitiveKind; Self::COUNT] = [
        PrimitiveKind::Ascii,
        PrimitiveKind::Bigint,
        PrimitiveKind::Blob,
        PrimitiveKind::Boolean,
        PrimitiveKind::Counter,
        PrimitiveKind::Decimal,
        PrimitiveKind::Double,
        PrimitiveKind::Float,
        PrimitiveKind::Int,
        PrimitiveKind::Timestamp,
        PrimitiveKind::Uuid,
        PrimitiveKind::Text,
        PrimitiveKind::Varint,
        PrimitiveKind::Timeuuid,
        PrimitiveKind::Inet,
        PrimitiveKind::Date,
        PrimitiveKind::Time,
        PrimitiveKind::Smallint,
        PrimitiveKind::Tinyint,
        PrimitiveKind::Duration,
    ];

    /// Protocol type code
    pub const fn type_code(self) -> u16 {
        self as u16
    }

    /// Map a protocol type code to a scalar kind
    pub fn from_type_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.type_code() == code)
    }

    /// Dense position of this kind, used to index the prebuilt codec table
    pub const fn index(self) -> usize {
        match self {
            PrimitiveKind::Ascii => 0,
            PrimitiveKind::Bigint => 1,
            PrimitiveKind::Blob => 2,
            PrimitiveKind::Boolean => 3,
            PrimitiveKind::Counter => 4,
            PrimitiveKind::Decimal => 5,
            PrimitiveKind::Double => 6,
            PrimitiveKind::Float => 7,
            PrimitiveKind::Int => 8,
            PrimitiveKind::Timestamp => 9,
            PrimitiveKind::Uuid => 10,
            PrimitiveKind::Text => 11,
            PrimitiveKind::Varint => 12,
            PrimitiveKind::Timeuuid => 13,
            PrimitiveKind::Inet => 14,
            PrimitiveKind::Date => 15,
            PrimitiveKind::Time => 16,
            PrimitiveKind::Smallint => 17,
            PrimitiveKind::Tinyint => 18,
            PrimitiveKind::Duration => 19,
        }
    }

    /// CQL spelling of this kind
    pub const fn cql_name(self) -> &'static str {
        match self {
            PrimitiveKind::Ascii => "ascii",
            PrimitiveKind::Bigint => "bigint",
            PrimitiveKind::Blob => "blob",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Counter => "counter",
            PrimitiveKind::Decimal => "decimal",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Timestamp => "timestamp",
            PrimitiveKind::Uuid => "uuid",
            PrimitiveKind::Text => "text",
            PrimitiveKind::Varint => "varint",
            PrimitiveKind::Timeuuid => "timeuuid",
            PrimitiveKind::Inet => "inet",
            PrimitiveKind::Date => "date",
            PrimitiveKind::Time => "time",
            PrimitiveKind::Smallint => "smallint",
            PrimitiveKind::Tinyint => "tinyint",
            PrimitiveKind::Duration => "duration",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cql_name())
    }
}

/// Protocol type codes for non-scalar shapes
pub mod type_code {
    /// Server-side custom type, identified by class name
    pub const CUSTOM: u16 = 0x0000;
    /// `list<T>`
    pub const LIST: u16 = 0x0020;
    /// `map<K, V>`
    pub const MAP: u16 = 0x0021;
    /// `set<T>`
    pub const SET: u16 = 0x0022;
    /// User-defined type
    pub const UDT: u16 = 0x0030;
    /// `tuple<...>`
    pub const TUPLE: u16 = 0x0031;
}

/// Collection shapes and their element types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectionType {
    /// Ordered list of elements
    List(DataType),
    /// Set of elements, kept in wire order
    Set(DataType),
    /// Key/value pairs
    Map(DataType, DataType),
}

/// Named field of a user-defined type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDef {
    /// Field name as reported by the server
    pub name: String,
    /// Field type
    pub data_type: DataType,
}

/// User-defined type definition.
///
/// Identity covers keyspace, name and the exact field order, since field
/// order determines the wire layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserType {
    /// Keyspace the type lives in
    pub keyspace: String,
    /// Type name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldDef>,
}

impl UserType {
    /// Start a definition with no fields
    pub fn new(keyspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field
    pub fn field(mut self, name: impl Into<String>, data_type: impl Into<DataType>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            data_type: data_type.into(),
        });
        self
    }
}

/// Structural type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Scalar kind
    Primitive(PrimitiveKind),
    /// Server-side custom type; only usable through a registered codec
    Custom(Arc<str>),
    /// `list`, `set` or `map`
    Collection(Arc<CollectionType>),
    /// Positional tuple
    Tuple(Arc<[DataType]>),
    /// User-defined type
    Udt(Arc<UserType>),
}

impl From<PrimitiveKind> for DataType {
    fn from(kind: PrimitiveKind) -> Self {
        DataType::Primitive(kind)
    }
}

impl From<UserType> for DataType {
    fn from(udt: UserType) -> Self {
        DataType::Udt(Arc::new(udt))
    }
}

impl DataType {
    /// `list<element>`
    pub fn list(element: impl Into<DataType>) -> Self {
        DataType::Collection(Arc::new(CollectionType::List(element.into())))
    }

    /// `set<element>`
    pub fn set(element: impl Into<DataType>) -> Self {
        DataType::Collection(Arc::new(CollectionType::Set(element.into())))
    }

    /// `map<key, value>`
    pub fn map(key: impl Into<DataType>, value: impl Into<DataType>) -> Self {
        DataType::Collection(Arc::new(CollectionType::Map(key.into(), value.into())))
    }

    /// `tuple<...>`
    pub fn tuple<I>(elements: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<DataType>,
    {
        DataType::Tuple(elements.into_iter().map(Into::into).collect())
    }

    /// Custom type by server class name
    pub fn custom(class_name: impl AsRef<str>) -> Self {
        DataType::Custom(Arc::from(class_name.as_ref()))
    }

    /// Whether this is a scalar kind
    pub fn is_primitive(&self) -> bool {
        matches!(self, DataType::Primitive(_))
    }

    /// Number of positional slots for tuples and UDTs
    pub fn arity(&self) -> Option<usize> {
        match self {
            DataType::Tuple(elements) => Some(elements.len()),
            DataType::Udt(udt) => Some(udt.fields.len()),
            _ => None,
        }
    }

    /// Nesting depth; scalars and custom types are depth 1
    pub fn depth(&self) -> usize {
        let children = match self {
            DataType::Primitive(_) | DataType::Custom(_) => 0,
            DataType::Collection(collection) => match collection.as_ref() {
                CollectionType::List(element) | CollectionType::Set(element) => element.depth(),
                CollectionType::Map(key, value) => key.depth().max(value.depth()),
            },
            DataType::Tuple(elements) => elements.iter().map(DataType::depth).max().unwrap_or(0),
            DataType::Udt(udt) => udt.fields.iter().map(|f| f.data_type.depth()).max().unwrap_or(0),
        };
        children + 1
    }

    /// Parse a descriptor from a protocol `[option]`
    pub fn from_wire(buf: &mut Bytes, max_depth: usize) -> Result<Self> {
        read_option(buf, max_depth)
    }

    /// Write this descriptor as a protocol `[option]`
    pub fn write_wire(&self, out: &mut BytesMut) -> Result<()> {
        match self {
            DataType::Primitive(kind) => out.put_u16(kind.type_code()),
            DataType::Custom(class_name) => {
                out.put_u16(type_code::CUSTOM);
                write_string(class_name, out)?;
            }
            DataType::Collection(collection) => match collection.as_ref() {
                CollectionType::List(element) => {
                    out.put_u16(type_code::LIST);
                    element.write_wire(out)?;
                }
                CollectionType::Set(element) => {
                    out.put_u16(type_code::SET);
                    element.write_wire(out)?;
                }
                CollectionType::Map(key, value) => {
                    out.put_u16(type_code::MAP);
                    key.write_wire(out)?;
                    value.write_wire(out)?;
                }
            },
            DataType::Tuple(elements) => {
                out.put_u16(type_code::TUPLE);
                out.put_u16(short_count(elements.len(), "tuple elements")?);
                for element in elements.iter() {
                    element.write_wire(out)?;
                }
            }
            DataType::Udt(udt) => {
                out.put_u16(type_code::UDT);
                write_string(&udt.keyspace, out)?;
                write_string(&udt.name, out)?;
                out.put_u16(short_count(udt.fields.len(), "udt fields")?);
                for field in &udt.fields {
                    write_string(&field.name, out)?;
                    field.data_type.write_wire(out)?;
                }
            }
        }
        Ok(())
    }
}

fn short_count(len: usize, what: &str) -> Result<u16> {
    u16::try_from(len)
        .map_err(|_| Error::malformed_metadata(format!("{} {} exceed the u16 limit", len, what)))
}

fn read_option(buf: &mut Bytes, depth_left: usize) -> Result<DataType> {
    if depth_left == 0 {
        return Err(Error::malformed_metadata("type nesting exceeds maximum depth"));
    }
    let code = read_u16(buf)?;

    if let Some(kind) = PrimitiveKind::from_type_code(code) {
        return Ok(DataType::Primitive(kind));
    }

    let next = depth_left - 1;
    match code {
        type_code::CUSTOM => Ok(DataType::custom(read_string(buf)?)),
        type_code::LIST => Ok(DataType::list(read_option(buf, next)?)),
        type_code::SET => Ok(DataType::set(read_option(buf, next)?)),
        type_code::MAP => {
            let key = read_option(buf, next)?;
            let value = read_option(buf, next)?;
            Ok(DataType::map(key, value))
        }
        type_code::UDT => {
            let keyspace = read_string(buf)?;
            let name = read_string(buf)?;
            let count = read_u16(buf)?;
            let mut udt = UserType::new(keyspace, name);
            for _ in 0..count {
                let field_name = read_string(buf)?;
                let field_type = read_option(buf, next)?;
                udt = udt.field(field_name, field_type);
            }
            Ok(udt.into())
        }
        type_code::TUPLE => {
            let count = read_u16(buf)?;
            let elements = (0..count)
                .map(|_| read_option(buf, next))
                .collect::<Result<Vec<_>>>()?;
            Ok(DataType::tuple(elements))
        }
        other => Err(Error::unsupported(format!("type code 0x{:04X}", other))),
    }
}

fn read_u16(buf: &mut Bytes) -> Result<u16> {
    if buf.remaining() < 2 {
        return Err(Error::malformed_metadata("truncated type code"));
    }
    Ok(buf.get_u16())
}

pub(crate) fn read_string(buf: &mut Bytes) -> Result<String> {
    let len = read_u16(buf)? as usize;
    if buf.remaining() < len {
        return Err(Error::malformed_metadata(format!(
            "string of {} bytes with {} remaining",
            len,
            buf.remaining()
        )));
    }
    let raw = buf.split_to(len);
    String::from_utf8(raw.to_vec())
        .map_err(|e| Error::malformed_metadata(format!("invalid UTF-8 in name: {}", e)))
}

pub(crate) fn write_string(s: &str, out: &mut BytesMut) -> Result<()> {
    out.put_u16(short_count(s.len(), "string bytes")?);
    out.put_slice(s.as_bytes());
    Ok(())
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Primitive(kind) => write!(f, "{}", kind),
            DataType::Custom(class_name) => write!(f, "'{}'", class_name),
            DataType::Collection(collection) => match collection.as_ref() {
                CollectionType::List(element) => write!(f, "list<{}>", element),
                CollectionType::Set(element) => write!(f, "set<{}>", element),
                CollectionType::Map(key, value) => write!(f, "map<{}, {}>", key, value),
            },
            DataType::Tuple(elements) => {
                f.write_str("frozen<tuple<")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str(">>")
            }
            DataType::Udt(udt) => write!(f, "frozen<{}.{}>", udt.keyspace, udt.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(data_type: &DataType) -> u64 {
        let mut hasher = DefaultHasher::new();
        data_type.hash(&mut hasher);
        hasher.finish()
    }

    fn nested_udt() -> DataType {
        let udt2 = UserType::new("ks", "udt2").field("f2", PrimitiveKind::Text);
        UserType::new("ks", "udt1").field("f1", udt2).into()
    }

    #[test]
    fn test_structural_equality_and_hash() {
        let a = nested_udt();
        let b = nested_udt();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let other_keyspace: DataType = UserType::new("other", "udt1")
            .field("f1", UserType::new("ks", "udt2").field("f2", PrimitiveKind::Text))
            .into();
        assert_ne!(a, other_keyspace);
    }

    #[test]
    fn test_field_order_matters() {
        let ab: DataType = UserType::new("ks", "t")
            .field("a", PrimitiveKind::Int)
            .field("b", PrimitiveKind::Text)
            .into();
        let ba: DataType = UserType::new("ks", "t")
            .field("b", PrimitiveKind::Text)
            .field("a", PrimitiveKind::Int)
            .into();
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_wire_roundtrip_nested() {
        let original = DataType::map(
            PrimitiveKind::Text,
            DataType::tuple([DataType::list(nested_udt()), PrimitiveKind::Int.into()]),
        );
        let mut out = BytesMut::new();
        original.write_wire(&mut out).unwrap();

        let mut buf = out.freeze();
        let parsed = DataType::from_wire(&mut buf, 64).unwrap();
        assert_eq!(parsed, original);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_every_primitive_code_maps() {
        for kind in PrimitiveKind::ALL {
            let mut buf = Bytes::copy_from_slice(&kind.type_code().to_be_bytes());
            assert_eq!(DataType::from_wire(&mut buf, 4).unwrap(), DataType::Primitive(kind));
            assert_eq!(PrimitiveKind::ALL[kind.index()], kind);
        }
    }

    #[test]
    fn test_unknown_code_is_unsupported() {
        // 0x000A was the pre-v3 text code
        let mut buf = Bytes::from_static(&[0x00, 0x0A]);
        assert!(matches!(DataType::from_wire(&mut buf, 4), Err(Error::UnsupportedType(_))));

        let mut buf = Bytes::from_static(&[0x00, 0x20, 0x00, 0x99]);
        assert!(matches!(DataType::from_wire(&mut buf, 4), Err(Error::UnsupportedType(_))));
    }

    #[test]
    fn test_truncated_and_too_deep() {
        let mut buf = Bytes::from_static(&[0x00, 0x31, 0x00, 0x02, 0x00, 0x09]);
        assert!(matches!(DataType::from_wire(&mut buf, 8), Err(Error::MalformedMetadata(_))));

        let deep = DataType::list(DataType::list(DataType::list(PrimitiveKind::Int)));
        let mut out = BytesMut::new();
        deep.write_wire(&mut out).unwrap();
        assert!(DataType::from_wire(&mut out.clone().freeze(), 3).is_err());
        assert_eq!(DataType::from_wire(&mut out.freeze(), 4).unwrap(), deep);
    }

    #[test]
    fn test_write_rejects_oversized_names() {
        let long_name = "f".repeat(usize::from(u16::MAX) + 1);
        let udt: DataType = UserType::new("ks", long_name).field("a", PrimitiveKind::Int).into();
        let mut out = BytesMut::new();
        assert!(matches!(udt.write_wire(&mut out), Err(Error::MalformedMetadata(_))));

        let wide = DataType::tuple(vec![DataType::from(PrimitiveKind::Int); usize::from(u16::MAX) + 1]);
        assert!(matches!(wide.write_wire(&mut BytesMut::new()), Err(Error::MalformedMetadata(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(nested_udt().to_string(), "frozen<ks.udt1>");
        let t = DataType::map(
            PrimitiveKind::Text,
            DataType::tuple([PrimitiveKind::Int, PrimitiveKind::Text]),
        );
        assert_eq!(t.to_string(), "map<text, frozen<tuple<int, text>>>");
    }

    #[test]
    fn test_arity_and_depth() {
        assert_eq!(nested_udt().arity(), Some(1));
        assert_eq!(nested_udt().depth(), 3);
        assert_eq!(DataType::tuple(Vec::<DataType>::new()).arity(), Some(0));
        assert_eq!(DataType::from(PrimitiveKind::Int).arity(), None);
    }
}
