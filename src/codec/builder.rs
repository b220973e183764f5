//! Codec synthesis for descriptors that have no cached codec yet.
//!
//! The builder only knows how to assemble one level. Every child descriptor
//! goes back through [`CodecRegistry::resolve`], so nested types reuse cached
//! codecs and registered overrides wherever they appear.
//!
//! When one child fails, siblings resolved before it stay cached; each is a
//! complete codec for its own descriptor. Nothing is cached for the failing
//! descriptor or any of its ancestors.

use crate::codec::{CollectionCodec, CompositeCodec, PrimitiveCodec, SharedCodec};
use crate::core::error::{Error, Result};
use crate::registry::CodecRegistry;
use crate::types::{CollectionType, DataType};
use std::sync::Arc;
use tracing::trace;

/// One-level codec assembler bound to a registry
pub struct CodecBuilder<'r> {
    registry: &'r CodecRegistry,
}

impl<'r> CodecBuilder<'r> {
    /// Builder resolving children through `registry`
    pub fn new(registry: &'r CodecRegistry) -> Self {
        Self { registry }
    }

    /// Assemble a codec for `data_type`
    pub fn build(&self, data_type: &DataType) -> Result<SharedCodec> {
        trace!(data_type = %data_type, "building codec");
        let codec: SharedCodec = match data_type {
            DataType::Primitive(kind) => Arc::new(PrimitiveCodec::new(*kind)),
            DataType::Custom(class_name) => {
                return Err(Error::unsupported(format!(
                    "custom type '{}' has no registered codec",
                    class_name
                )))
            }
            DataType::Collection(collection) => match collection.as_ref() {
                CollectionType::List(element) => {
                    Arc::new(CollectionCodec::list(self.registry.resolve(element)?))
                }
                CollectionType::Set(element) => {
                    Arc::new(CollectionCodec::set(self.registry.resolve(element)?))
                }
                CollectionType::Map(key, value) => Arc::new(CollectionCodec::map(
                    self.registry.resolve(key)?,
                    self.registry.resolve(value)?,
                )),
            },
            DataType::Tuple(elements) => {
                let fields = elements
                    .iter()
                    .map(|element| self.registry.resolve(element))
                    .collect::<Result<Vec<_>>>()?;
                Arc::new(self.composite(data_type, fields)?)
            }
            DataType::Udt(udt) => {
                let fields = udt
                    .fields
                    .iter()
                    .map(|field| self.registry.resolve(&field.data_type))
                    .collect::<Result<Vec<_>>>()?;
                Arc::new(self.composite(data_type, fields)?)
            }
        };
        Ok(codec)
    }

    fn composite(&self, data_type: &DataType, fields: Vec<SharedCodec>) -> Result<CompositeCodec> {
        CompositeCodec::new(
            data_type.clone(),
            fields,
            self.registry.config().lazy_composites,
        )
    }
}
