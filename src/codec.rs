//! Codecs: encode/decode strategies bound to one type descriptor
//!
//! Every codec is immutable once constructed and shared as [`SharedCodec`].
//! Codec bodies never include the outer `[bytes]` length prefix; slot
//! framing lives in [`wire`].

pub mod builder;
pub mod collection;
pub mod composite;
pub mod primitive;
pub mod wire;

use crate::core::error::Result;
use crate::types::{DataType, Value};
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::sync::Arc;

pub use builder::CodecBuilder;
pub use collection::CollectionCodec;
pub use composite::CompositeCodec;
pub use primitive::PrimitiveCodec;

/// Encode/decode strategy for a single [`DataType`]
pub trait TypeCodec: Send + Sync + fmt::Debug {
    /// Descriptor this codec is bound to
    fn data_type(&self) -> &DataType;

    /// Append the body of a non-null value to `out`
    fn encode(&self, value: &Value, out: &mut BytesMut) -> Result<()>;

    /// Decode a non-null body
    fn decode(&self, bytes: Bytes) -> Result<Value>;

    /// Positional slot count for tuple and UDT codecs
    fn arity(&self) -> Option<usize> {
        None
    }
}

/// Codec handle shared between the registry and every composite built on it
pub type SharedCodec = Arc<dyn TypeCodec>;

/// Whether two codecs behave the same: same descriptor and slot count
pub fn equivalent(a: &SharedCodec, b: &SharedCodec) -> bool {
    Arc::ptr_eq(a, b) || (a.data_type() == b.data_type() && a.arity() == b.arity())
}
