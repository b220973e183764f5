//! Codecs for `list`, `set` and `map`.
//!
//! Body layout: `[int]` element count, then one `[bytes]` slot per element
//! (two per map entry). Element codecs are resolved once, when the
//! collection codec is synthesized.

use crate::codec::wire::{read_count, read_slot, write_slot};
use crate::codec::{SharedCodec, TypeCodec};
use crate::core::error::{Error, Result};
use crate::types::{DataType, Value};
use bytes::{Buf, BufMut, Bytes, BytesMut};

#[derive(Debug)]
enum Shape {
    List(SharedCodec),
    Set(SharedCodec),
    Map(SharedCodec, SharedCodec),
}

/// Codec for one collection descriptor
#[derive(Debug)]
pub struct CollectionCodec {
    data_type: DataType,
    shape: Shape,
}

impl CollectionCodec {
    /// `list<element>` codec
    pub fn list(element: SharedCodec) -> Self {
        Self {
            data_type: DataType::list(element.data_type().clone()),
            shape: Shape::List(element),
        }
    }

    /// `set<element>` codec
    pub fn set(element: SharedCodec) -> Self {
        Self {
            data_type: DataType::set(element.data_type().clone()),
            shape: Shape::Set(element),
        }
    }

    /// `map<key, value>` codec
    pub fn map(key: SharedCodec, value: SharedCodec) -> Self {
        Self {
            data_type: DataType::map(key.data_type().clone(), value.data_type().clone()),
            shape: Shape::Map(key, value),
        }
    }
}

fn put_count(len: usize, out: &mut BytesMut) -> Result<()> {
    let count = i32::try_from(len)
        .map_err(|_| Error::malformed(format!("collection of {} elements is too large", len)))?;
    out.put_i32(count);
    Ok(())
}

fn read_elements(codec: &SharedCodec, count: usize, body: &mut Bytes) -> Result<Vec<Value>> {
    let mut elements = Vec::with_capacity(count.min(body.remaining() / 4));
    for _ in 0..count {
        elements.push(match read_slot(body)? {
            Some(bytes) => codec.decode(bytes)?,
            None => Value::Null,
        });
    }
    Ok(elements)
}

impl TypeCodec for CollectionCodec {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn encode(&self, value: &Value, out: &mut BytesMut) -> Result<()> {
        match (&self.shape, value) {
            (Shape::List(element), Value::List(items) | Value::Set(items))
            | (Shape::Set(element), Value::Set(items) | Value::List(items)) => {
                put_count(items.len(), out)?;
                for item in items {
                    write_slot(element.as_ref(), item, out)?;
                }
                Ok(())
            }
            (Shape::Map(key, val), Value::Map(entries)) => {
                put_count(entries.len(), out)?;
                for (k, v) in entries {
                    write_slot(key.as_ref(), k, out)?;
                    write_slot(val.as_ref(), v, out)?;
                }
                Ok(())
            }
            (_, other) => Err(Error::mismatch(self.data_type.to_string(), other.kind_name())),
        }
    }

    fn decode(&self, bytes: Bytes) -> Result<Value> {
        let mut body = bytes;
        let count = read_count(&mut body)?;
        let value = match &self.shape {
            Shape::List(element) => Value::List(read_elements(element, count, &mut body)?),
            Shape::Set(element) => Value::Set(read_elements(element, count, &mut body)?),
            Shape::Map(key, val) => {
                let mut entries = Vec::with_capacity(count.min(body.remaining() / 8));
                for _ in 0..count {
                    let k = match read_slot(&mut body)? {
                        Some(bytes) => key.decode(bytes)?,
                        None => Value::Null,
                    };
                    let v = match read_slot(&mut body)? {
                        Some(bytes) => val.decode(bytes)?,
                        None => Value::Null,
                    };
                    entries.push((k, v));
                }
                Value::Map(entries)
            }
        };
        if body.has_remaining() {
            return Err(Error::malformed(format!(
                "{} trailing bytes after {}",
                body.remaining(),
                self.data_type
            )));
        }
        Ok(value)
    }
}
