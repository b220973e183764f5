//! Scalar codecs - the base case of codec synthesis.
//!
//! One [`PrimitiveCodec`] exists per [`PrimitiveKind`]; behaviour is an
//! exhaustive match on the kind, so a new scalar is one new arm in `encode`
//! and one in `decode`. Fixed-width kinds are big-endian. An empty body for
//! a fixed-width kind is the protocol's "empty value" and decodes to
//! [`Value::Null`].

use crate::codec::wire::{read_signed_vint, write_signed_vint};
use crate::codec::TypeCodec;
use crate::core::error::{Error, Result};
use crate::types::{CqlDecimal, CqlDuration, DataType, PrimitiveKind, Value};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use uuid::Uuid;

/// Nanoseconds in a day; `time` values must stay below this
const NANOS_PER_DAY: i64 = 86_400_000_000_000;

/// Codec for one scalar kind
#[derive(Debug)]
pub struct PrimitiveCodec {
    kind: PrimitiveKind,
    data_type: DataType,
}

impl PrimitiveCodec {
    /// Codec for `kind`
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            data_type: DataType::Primitive(kind),
        }
    }

    /// Scalar kind handled by this codec
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    fn fixed<const N: usize>(&self, bytes: &Bytes) -> Result<[u8; N]> {
        <[u8; N]>::try_from(bytes.as_ref()).map_err(|_| {
            Error::malformed(format!(
                "{} expects {} bytes, got {}",
                self.kind,
                N,
                bytes.len()
            ))
        })
    }

    fn is_fixed_width(&self) -> bool {
        !matches!(
            self.kind,
            PrimitiveKind::Ascii
                | PrimitiveKind::Text
                | PrimitiveKind::Blob
                | PrimitiveKind::Varint
                | PrimitiveKind::Decimal
                | PrimitiveKind::Inet
                | PrimitiveKind::Duration
        )
    }
}

impl TypeCodec for PrimitiveCodec {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn encode(&self, value: &Value, out: &mut BytesMut) -> Result<()> {
        match (self.kind, value) {
            (PrimitiveKind::Ascii, Value::Ascii(s) | Value::Text(s)) => {
                if !s.is_ascii() {
                    return Err(Error::malformed("non-ASCII text for an ascii value"));
                }
                out.put_slice(s.as_bytes());
            }
            (PrimitiveKind::Text, Value::Text(s) | Value::Ascii(s)) => out.put_slice(s.as_bytes()),
            (PrimitiveKind::Bigint, Value::Bigint(v)) => out.put_i64(*v),
            (PrimitiveKind::Counter, Value::Counter(v) | Value::Bigint(v)) => out.put_i64(*v),
            (PrimitiveKind::Blob, Value::Blob(b)) => out.put_slice(b),
            (PrimitiveKind::Boolean, Value::Boolean(b)) => out.put_u8(u8::from(*b)),
            (PrimitiveKind::Decimal, Value::Decimal(d)) => {
                if d.unscaled.is_empty() {
                    return Err(Error::malformed("decimal with empty unscaled value"));
                }
                out.put_i32(d.scale);
                out.put_slice(&d.unscaled);
            }
            (PrimitiveKind::Double, Value::Double(v)) => out.put_f64(*v),
            (PrimitiveKind::Float, Value::Float(v)) => out.put_f32(*v),
            (PrimitiveKind::Int, Value::Int(v)) => out.put_i32(*v),
            (PrimitiveKind::Timestamp, Value::Timestamp(v)) => out.put_i64(*v),
            (PrimitiveKind::Uuid, Value::Uuid(u) | Value::Timeuuid(u)) => out.put_slice(u.as_bytes()),
            (PrimitiveKind::Timeuuid, Value::Timeuuid(u) | Value::Uuid(u)) => {
                if u.get_version_num() != 1 {
                    return Err(Error::malformed(format!(
                        "timeuuid requires a version 1 UUID, got version {}",
                        u.get_version_num()
                    )));
                }
                out.put_slice(u.as_bytes());
            }
            (PrimitiveKind::Varint, Value::Varint(b)) => {
                if b.is_empty() {
                    return Err(Error::malformed("varint with no bytes"));
                }
                out.put_slice(b);
            }
            (PrimitiveKind::Inet, Value::Inet(IpAddr::V4(ip))) => out.put_slice(&ip.octets()),
            (PrimitiveKind::Inet, Value::Inet(IpAddr::V6(ip))) => out.put_slice(&ip.octets()),
            (PrimitiveKind::Date, Value::Date(d)) => out.put_u32(*d),
            (PrimitiveKind::Time, Value::Time(t)) => {
                if !(0..NANOS_PER_DAY).contains(t) {
                    return Err(Error::malformed(format!("time {} outside a single day", t)));
                }
                out.put_i64(*t);
            }
            (PrimitiveKind::Smallint, Value::Smallint(v)) => out.put_i16(*v),
            (PrimitiveKind::Tinyint, Value::Tinyint(v)) => out.put_i8(*v),
            (PrimitiveKind::Duration, Value::Duration(d)) => {
                write_signed_vint(i64::from(d.months), out);
                write_signed_vint(i64::from(d.days), out);
                write_signed_vint(d.nanoseconds, out);
            }
            (kind, other) => return Err(Error::mismatch(kind.cql_name(), other.kind_name())),
        }
        Ok(())
    }

    fn decode(&self, bytes: Bytes) -> Result<Value> {
        if bytes.is_empty() && self.is_fixed_width() {
            return Ok(Value::Null);
        }

        let value = match self.kind {
            PrimitiveKind::Ascii => {
                if !bytes.is_ascii() {
                    return Err(Error::malformed("non-ASCII byte in ascii value"));
                }
                Value::Ascii(utf8(bytes)?)
            }
            PrimitiveKind::Text => Value::Text(utf8(bytes)?),
            PrimitiveKind::Bigint => Value::Bigint(i64::from_be_bytes(self.fixed(&bytes)?)),
            PrimitiveKind::Counter => Value::Counter(i64::from_be_bytes(self.fixed(&bytes)?)),
            PrimitiveKind::Blob => Value::Blob(bytes),
            PrimitiveKind::Boolean => Value::Boolean(self.fixed::<1>(&bytes)?[0] != 0),
            PrimitiveKind::Decimal => {
                if bytes.len() < 5 {
                    return Err(Error::malformed(format!(
                        "decimal needs at least 5 bytes, got {}",
                        bytes.len()
                    )));
                }
                let mut body = bytes;
                let scale = body.get_i32();
                Value::Decimal(CqlDecimal { scale, unscaled: body })
            }
            PrimitiveKind::Double => Value::Double(f64::from_be_bytes(self.fixed(&bytes)?)),
            PrimitiveKind::Float => Value::Float(f32::from_be_bytes(self.fixed(&bytes)?)),
            PrimitiveKind::Int => Value::Int(i32::from_be_bytes(self.fixed(&bytes)?)),
            PrimitiveKind::Timestamp => Value::Timestamp(i64::from_be_bytes(self.fixed(&bytes)?)),
            PrimitiveKind::Uuid => Value::Uuid(Uuid::from_bytes(self.fixed(&bytes)?)),
            PrimitiveKind::Timeuuid => Value::Timeuuid(Uuid::from_bytes(self.fixed(&bytes)?)),
            PrimitiveKind::Varint => {
                if bytes.is_empty() {
                    return Err(Error::malformed("varint with no bytes"));
                }
                Value::Varint(bytes)
            }
            PrimitiveKind::Inet => match bytes.len() {
                4 => Value::Inet(IpAddr::V4(Ipv4Addr::from(self.fixed::<4>(&bytes)?))),
                16 => Value::Inet(IpAddr::V6(Ipv6Addr::from(self.fixed::<16>(&bytes)?))),
                len => return Err(Error::malformed(format!("inet expects 4 or 16 bytes, got {}", len))),
            },
            PrimitiveKind::Date => Value::Date(u32::from_be_bytes(self.fixed(&bytes)?)),
            PrimitiveKind::Time => {
                let nanos = i64::from_be_bytes(self.fixed(&bytes)?);
                if !(0..NANOS_PER_DAY).contains(&nanos) {
                    return Err(Error::malformed(format!("time {} outside a single day", nanos)));
                }
                Value::Time(nanos)
            }
            PrimitiveKind::Smallint => Value::Smallint(i16::from_be_bytes(self.fixed(&bytes)?)),
            PrimitiveKind::Tinyint => Value::Tinyint(i8::from_be_bytes(self.fixed(&bytes)?)),
            PrimitiveKind::Duration => {
                let mut body = bytes;
                let months = narrow(read_signed_vint(&mut body)?, "months")?;
                let days = narrow(read_signed_vint(&mut body)?, "days")?;
                let nanoseconds = read_signed_vint(&mut body)?;
                if body.has_remaining() {
                    return Err(Error::malformed("trailing bytes after duration"));
                }
                Value::Duration(CqlDuration { months, days, nanoseconds })
            }
        };
        Ok(value)
    }
}

fn utf8(bytes: Bytes) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::malformed(format!("invalid UTF-8: {}", e)))
}

fn narrow(value: i64, component: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| Error::malformed(format!("duration {} {} out of range", component, value)))
}
