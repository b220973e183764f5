//! Type descriptors and decoded values

/// Structural type descriptors
pub mod data_type;
/// Decoded values
pub mod value;
/// Tuple and UDT values
pub mod composite;

pub use composite::{CompositeValue, FieldKey};
pub use data_type::{type_code, CollectionType, DataType, FieldDef, PrimitiveKind, UserType};
pub use value::{CqlDecimal, CqlDuration, Value};
