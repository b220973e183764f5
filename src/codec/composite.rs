//! Tuple and UDT codec.
//!
//! The body is a concatenation of `[bytes]` slots in field order. Decode
//! checks the framing of every slot up front; field bodies are decoded
//! either right away or on first access, depending on `lazy`. Missing
//! trailing slots decode as null, since servers omit fields added to a UDT
//! after the row was written.

use crate::codec::wire::{read_slot, write_raw_slot, write_slot};
use crate::codec::{SharedCodec, TypeCodec};
use crate::core::error::{Error, Result};
use crate::types::composite::{CompositeValue, SlotRef};
use crate::types::{DataType, Value};
use bytes::{Buf, Bytes, BytesMut};

/// Codec for a single tuple or UDT descriptor
#[derive(Debug)]
pub struct CompositeCodec {
    data_type: DataType,
    fields: Vec<SharedCodec>,
    lazy: bool,
}

impl CompositeCodec {
    /// Codec for `data_type` with one sub-codec per field, in order
    pub fn new(data_type: DataType, fields: Vec<SharedCodec>, lazy: bool) -> Result<Self> {
        match data_type.arity() {
            Some(arity) if arity == fields.len() => Ok(Self {
                data_type,
                fields,
                lazy,
            }),
            Some(arity) => Err(Error::ambiguous(format!(
                "{} has {} fields, {} codecs supplied",
                data_type,
                arity,
                fields.len()
            ))),
            None => Err(Error::mismatch("tuple or udt", data_type.to_string())),
        }
    }

    /// Sub-codecs in field order
    pub fn fields(&self) -> &[SharedCodec] {
        &self.fields
    }

    /// Whether decoded values defer field decoding
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    fn wrap(&self, composite: CompositeValue) -> Value {
        match self.data_type {
            DataType::Udt(_) => Value::Udt(composite),
            _ => Value::Tuple(composite),
        }
    }
}

impl TypeCodec for CompositeCodec {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn encode(&self, value: &Value, out: &mut BytesMut) -> Result<()> {
        let composite = match value {
            Value::Tuple(c) | Value::Udt(c) => c,
            other => return Err(Error::mismatch(self.data_type.to_string(), other.kind_name())),
        };
        if composite.data_type() != &self.data_type {
            return Err(Error::mismatch(
                self.data_type.to_string(),
                composite.data_type().to_string(),
            ));
        }

        for (index, codec) in self.fields.iter().enumerate() {
            match composite.slot(index) {
                SlotRef::Value(field) => write_slot(codec.as_ref(), field, out)?,
                SlotRef::Raw(raw) => write_raw_slot(raw, out)?,
            }
        }
        Ok(())
    }

    fn decode(&self, bytes: Bytes) -> Result<Value> {
        let mut body = bytes;
        let mut raw = Vec::with_capacity(self.fields.len());
        for _ in 0..self.fields.len() {
            if !body.has_remaining() {
                break;
            }
            raw.push(read_slot(&mut body)?);
        }
        if body.has_remaining() {
            return Err(Error::malformed(format!(
                "{} trailing bytes after the last field of {}",
                body.remaining(),
                self.data_type
            )));
        }
        raw.resize(self.fields.len(), None);

        let composite = if self.lazy {
            CompositeValue::from_lazy(
                self.data_type.clone(),
                raw.into_iter().zip(self.fields.iter().cloned()),
            )
        } else {
            let values = raw
                .into_iter()
                .zip(&self.fields)
                .map(|(slot, codec)| match slot {
                    Some(bytes) => codec.decode(bytes),
                    None => Ok(Value::Null),
                })
                .collect::<Result<Vec<_>>>()?;
            CompositeValue::from_decoded(self.data_type.clone(), values)
        };
        Ok(self.wrap(composite))
    }

    fn arity(&self) -> Option<usize> {
        Some(self.fields.len())
    }
}
