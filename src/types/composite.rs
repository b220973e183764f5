//! Tuple and user-defined type values with lazy field decoding.
//!
//! A [`CompositeValue`] keeps its originating [`DataType`], so it always
//! knows each field's name, position and type. Fields produced by a lazy
//! decode hold the raw slot bytes plus the sub-codec resolved for that
//! position; the first `get` decodes and memoizes the result. Decoding is a
//! pure function of immutable bytes, so concurrent first access on a shared
//! value yields equal results. A failed decode leaves the memo unset.

use crate::codec::{SharedCodec, TypeCodec};
use crate::core::error::{Error, Result};
use crate::types::data_type::{DataType, UserType};
use crate::types::value::Value;
use bytes::Bytes;
use once_cell::sync::OnceCell;
use std::fmt;

/// Field selector: position or UDT field name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey<'a> {
    /// Zero-based position
    Index(usize),
    /// UDT field name; double quotes force an exact, case-sensitive match
    Name(&'a str),
}

impl From<usize> for FieldKey<'_> {
    fn from(index: usize) -> Self {
        FieldKey::Index(index)
    }
}

impl<'a> From<&'a str> for FieldKey<'a> {
    fn from(name: &'a str) -> Self {
        FieldKey::Name(name)
    }
}

impl<'a> From<&'a String> for FieldKey<'a> {
    fn from(name: &'a String) -> Self {
        FieldKey::Name(name)
    }
}

impl fmt::Display for FieldKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Index(i) => write!(f, "#{}", i),
            FieldKey::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Clone)]
enum Slot {
    Decoded(Value),
    Lazy {
        raw: Option<Bytes>,
        codec: SharedCodec,
        memo: OnceCell<Value>,
    },
}

/// Slot contents as seen by an encoder
pub(crate) enum SlotRef<'a> {
    Value(&'a Value),
    Raw(Option<&'a Bytes>),
}

/// Decoded tuple or UDT
#[derive(Clone)]
pub struct CompositeValue {
    data_type: DataType,
    slots: Vec<Slot>,
}

impl CompositeValue {
    /// Empty value for a tuple or UDT descriptor, every field null
    pub fn new(data_type: DataType) -> Result<Self> {
        let arity = data_type
            .arity()
            .ok_or_else(|| Error::mismatch("tuple or udt", data_type.to_string()))?;
        Ok(Self {
            data_type,
            slots: vec![Slot::Decoded(Value::Null); arity],
        })
    }

    pub(crate) fn from_decoded(data_type: DataType, values: Vec<Value>) -> Self {
        Self {
            data_type,
            slots: values.into_iter().map(Slot::Decoded).collect(),
        }
    }

    pub(crate) fn from_lazy<I>(data_type: DataType, raw_slots: I) -> Self
    where
        I: IntoIterator<Item = (Option<Bytes>, SharedCodec)>,
    {
        let slots = raw_slots
            .into_iter()
            .map(|(raw, codec)| Slot::Lazy {
                raw,
                codec,
                memo: OnceCell::new(),
            })
            .collect();
        Self { data_type, slots }
    }

    /// Descriptor this value was created from
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Whether this is a user-defined type value
    pub fn is_udt(&self) -> bool {
        matches!(self.data_type, DataType::Udt(_))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the type has no fields
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// UDT field names in declaration order; empty for tuples
    pub fn field_names(&self) -> Vec<&str> {
        match &self.data_type {
            DataType::Udt(udt) => udt.fields.iter().map(|f| f.name.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Resolve a field selector to a position
    pub fn index_of<'k>(&self, key: impl Into<FieldKey<'k>>) -> Result<usize> {
        let key = key.into();
        match key {
            FieldKey::Index(i) if i < self.slots.len() => Ok(i),
            FieldKey::Index(_) => Err(self.no_such_field(key)),
            FieldKey::Name(name) => match &self.data_type {
                DataType::Udt(udt) => find_field(udt, name).ok_or_else(|| self.no_such_field(key)),
                _ => Err(self.no_such_field(key)),
            },
        }
    }

    /// Value of a field, decoding it on first access
    pub fn get<'k>(&self, key: impl Into<FieldKey<'k>>) -> Result<&Value> {
        let index = self.index_of(key)?;
        match &self.slots[index] {
            Slot::Decoded(value) => Ok(value),
            Slot::Lazy { raw, codec, memo } => memo.get_or_try_init(|| match raw {
                None => Ok(Value::Null),
                Some(bytes) => codec.decode(bytes.clone()),
            }),
        }
    }

    /// Text field; `None` when the field is null
    pub fn get_string<'k>(&self, key: impl Into<FieldKey<'k>>) -> Result<Option<&str>> {
        match self.get(key)? {
            Value::Null => Ok(None),
            value => value
                .as_str()
                .map(Some)
                .ok_or_else(|| Error::mismatch("text", value.kind_name())),
        }
    }

    /// 32-bit integer field; `None` when the field is null
    pub fn get_i32<'k>(&self, key: impl Into<FieldKey<'k>>) -> Result<Option<i32>> {
        match self.get(key)? {
            Value::Null => Ok(None),
            value => value
                .as_i32()
                .map(Some)
                .ok_or_else(|| Error::mismatch("int", value.kind_name())),
        }
    }

    /// Nested tuple or UDT field; `None` when the field is null
    pub fn get_composite<'k>(&self, key: impl Into<FieldKey<'k>>) -> Result<Option<&CompositeValue>> {
        match self.get(key)? {
            Value::Null => Ok(None),
            value => value
                .as_composite()
                .map(Some)
                .ok_or_else(|| Error::mismatch("tuple or udt", value.kind_name())),
        }
    }

    /// Replace a field's value
    pub fn set<'k>(&mut self, key: impl Into<FieldKey<'k>>, value: impl Into<Value>) -> Result<()> {
        let index = self.index_of(key)?;
        self.slots[index] = Slot::Decoded(value.into());
        Ok(())
    }

    /// Builder form of [`CompositeValue::set`]
    pub fn with<'k>(mut self, key: impl Into<FieldKey<'k>>, value: impl Into<Value>) -> Result<Self> {
        self.set(key, value)?;
        Ok(self)
    }

    /// Every field, decoded
    pub fn values(&self) -> Result<Vec<Value>> {
        (0..self.slots.len()).map(|i| self.get(i).cloned()).collect()
    }

    pub(crate) fn slot(&self, index: usize) -> SlotRef<'_> {
        match &self.slots[index] {
            Slot::Decoded(value) => SlotRef::Value(value),
            Slot::Lazy { raw, .. } => SlotRef::Raw(raw.as_ref()),
        }
    }

    fn no_such_field(&self, key: FieldKey<'_>) -> Error {
        Error::no_such_field(format!("{} in {}", key, self.data_type))
    }
}

fn find_field(udt: &UserType, name: &str) -> Option<usize> {
    if let Some(exact) = name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) {
        return udt.fields.iter().position(|f| f.name == exact);
    }
    udt.fields
        .iter()
        .position(|f| f.name == name)
        .or_else(|| udt.fields.iter().position(|f| f.name.eq_ignore_ascii_case(name)))
}

impl PartialEq for CompositeValue {
    fn eq(&self, other: &Self) -> bool {
        self.data_type == other.data_type
            && self.slots.len() == other.slots.len()
            && (0..self.slots.len()).all(|i| self.get(i).ok() == other.get(i).ok())
    }
}

impl fmt::Debug for CompositeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<Option<&Value>> = (0..self.slots.len()).map(|i| self.get(i).ok()).collect();
        f.debug_struct("CompositeValue")
            .field("data_type", &self.data_type.to_string())
            .field("fields", &fields)
            .finish()
    }
}

impl fmt::Display for CompositeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.field_names();
        f.write_str(if names.is_empty() { "(" } else { "{" })?;
        for i in 0..self.slots.len() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if let Some(name) = names.get(i) {
                write!(f, "{}: ", name)?;
            }
            match self.get(i) {
                Ok(value) => write!(f, "{}", value)?,
                Err(_) => f.write_str("<malformed>")?,
            }
        }
        f.write_str(if names.is_empty() { ")" } else { "}" })
    }
}
