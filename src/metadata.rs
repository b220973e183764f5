//! Rows result metadata.
//!
//! Column types arrive here as `[option]` trees, which is how nested tuple
//! and UDT descriptors are discovered at runtime. Decoding a row resolves
//! each column's codec through the registry, synthesizing whatever has not
//! been seen before.

use crate::codec::wire::{read_count, read_slot, write_raw_slot};
use crate::core::error::{Error, Result};
use crate::registry::CodecRegistry;
use crate::types::data_type::{read_string, write_string};
use crate::types::{DataType, FieldKey, Value};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::sync::Arc;

/// Rows metadata flag bits
pub mod flags {
    /// Keyspace and table are written once for all columns
    pub const GLOBAL_TABLES_SPEC: i32 = 0x0001;
    /// A paging state follows the column count
    pub const HAS_MORE_PAGES: i32 = 0x0002;
    /// Column specs are omitted
    pub const NO_METADATA: i32 = 0x0004;
}

/// One result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Keyspace of the source table
    pub keyspace: String,
    /// Source table
    pub table: String,
    /// Column name
    pub name: String,
    /// Column type
    pub data_type: DataType,
}

impl ColumnSpec {
    /// Column in `keyspace.table`
    pub fn new(
        keyspace: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        data_type: impl Into<DataType>,
    ) -> Self {
        Self {
            keyspace: keyspace.into(),
            table: table.into(),
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Parsed Rows metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMetadata {
    flags: i32,
    column_count: usize,
    columns: Arc<[ColumnSpec]>,
    paging_state: Option<Bytes>,
}

impl ResultMetadata {
    /// Metadata describing `columns`; uses a global table spec when every
    /// column comes from the same table
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        let shared = columns.first().is_some_and(|first| {
            columns
                .iter()
                .all(|c| c.keyspace == first.keyspace && c.table == first.table)
        });
        Self {
            flags: if shared { flags::GLOBAL_TABLES_SPEC } else { 0 },
            column_count: columns.len(),
            columns: columns.into(),
            paging_state: None,
        }
    }

    /// Attach a paging state
    pub fn with_paging_state(mut self, paging_state: Bytes) -> Self {
        self.flags |= flags::HAS_MORE_PAGES;
        self.paging_state = Some(paging_state);
        self
    }

    /// Parse metadata; type trees deeper than `max_depth` are rejected
    pub fn parse(buf: &mut Bytes, max_depth: usize) -> Result<Self> {
        if buf.remaining() < 8 {
            return Err(Error::malformed_metadata("truncated rows metadata header"));
        }
        let bits = buf.get_i32();
        let column_count = buf.get_i32();
        let column_count = usize::try_from(column_count)
            .map_err(|_| Error::malformed_metadata(format!("negative column count {}", column_count)))?;

        let paging_state = if bits & flags::HAS_MORE_PAGES != 0 {
            read_slot(buf).map_err(|e| Error::malformed_metadata(e.to_string()))?
        } else {
            None
        };

        if bits & flags::NO_METADATA != 0 {
            return Ok(Self {
                flags: bits,
                column_count,
                columns: Arc::from(Vec::new()),
                paging_state,
            });
        }

        let global = if bits & flags::GLOBAL_TABLES_SPEC != 0 {
            Some((read_string(buf)?, read_string(buf)?))
        } else {
            None
        };

        let mut columns = Vec::with_capacity(column_count.min(buf.remaining() / 4));
        for _ in 0..column_count {
            let (keyspace, table) = match &global {
                Some((keyspace, table)) => (keyspace.clone(), table.clone()),
                None => (read_string(buf)?, read_string(buf)?),
            };
            let name = read_string(buf)?;
            let data_type = DataType::from_wire(buf, max_depth)?;
            columns.push(ColumnSpec {
                keyspace,
                table,
                name,
                data_type,
            });
        }

        Ok(Self {
            flags: bits,
            column_count,
            columns: columns.into(),
            paging_state,
        })
    }

    /// Serialize in the same layout `parse` reads
    pub fn write(&self, out: &mut BytesMut) -> Result<()> {
        let column_count = i32::try_from(self.column_count).map_err(|_| {
            Error::malformed_metadata(format!("{} columns exceed i32", self.column_count))
        })?;
        out.put_i32(self.flags);
        out.put_i32(column_count);
        if self.flags & flags::HAS_MORE_PAGES != 0 {
            write_raw_slot(self.paging_state.as_ref(), out)?;
        }
        if self.flags & flags::NO_METADATA != 0 {
            return Ok(());
        }

        let global = self.flags & flags::GLOBAL_TABLES_SPEC != 0;
        if global {
            if let Some(first) = self.columns.first() {
                write_string(&first.keyspace, out)?;
                write_string(&first.table, out)?;
            }
        }
        for column in self.columns.iter() {
            if !global {
                write_string(&column.keyspace, out)?;
                write_string(&column.table, out)?;
            }
            write_string(&column.name, out)?;
            column.data_type.write_wire(out)?;
        }
        Ok(())
    }

    /// Raw flag bits
    pub fn flags(&self) -> i32 {
        self.flags
    }

    /// Number of columns per row, known even without column specs
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Column specs; empty when the server omitted them
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Paging state for fetching the next page
    pub fn paging_state(&self) -> Option<&Bytes> {
        self.paging_state.as_ref()
    }

    /// Whether more pages follow
    pub fn has_more_pages(&self) -> bool {
        self.flags & flags::HAS_MORE_PAGES != 0
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        find_column(&self.columns, name)
    }

    /// Decode one row, resolving column codecs through `registry`
    pub fn decode_row(&self, registry: &CodecRegistry, buf: &mut Bytes) -> Result<Row> {
        if self.flags & flags::NO_METADATA != 0 {
            return Err(Error::malformed_metadata(
                "cannot decode rows without column metadata",
            ));
        }
        let values = self
            .columns
            .iter()
            .map(|column| registry.decode(&column.data_type, read_slot(buf)?))
            .collect::<Result<Vec<_>>>()?;
        Ok(Row {
            columns: Arc::clone(&self.columns),
            values,
        })
    }

    /// Decode an `[int]` row count followed by that many rows
    pub fn decode_rows(&self, registry: &CodecRegistry, buf: &mut Bytes) -> Result<Vec<Row>> {
        let count = read_count(buf)?;
        let mut rows = Vec::with_capacity(count.min(buf.remaining() / 4 + 1));
        for _ in 0..count {
            rows.push(self.decode_row(registry, buf)?);
        }
        Ok(rows)
    }
}

fn find_column(columns: &[ColumnSpec], name: &str) -> Option<usize> {
    if let Some(exact) = name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) {
        return columns.iter().position(|c| c.name == exact);
    }
    columns
        .iter()
        .position(|c| c.name == name)
        .or_else(|| columns.iter().position(|c| c.name.eq_ignore_ascii_case(name)))
}

/// One decoded row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[ColumnSpec]>,
    values: Vec<Value>,
}

impl Row {
    /// Column value by position or name
    pub fn get<'k>(&self, key: impl Into<FieldKey<'k>>) -> Result<&Value> {
        let key = key.into();
        let index = match key {
            FieldKey::Index(i) => Some(i),
            FieldKey::Name(name) => find_column(&self.columns, name),
        };
        index
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| Error::no_such_field(format!("column {}", key)))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column specs for this row
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Values in column order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Take ownership of the values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PrimitiveKind, UserType};

    fn users_metadata() -> ResultMetadata {
        let address: DataType = UserType::new("app", "address")
            .field("city", PrimitiveKind::Text)
            .field("zip", PrimitiveKind::Int)
            .into();
        ResultMetadata::new(vec![
            ColumnSpec::new("app", "users", "id", PrimitiveKind::Uuid),
            ColumnSpec::new("app", "users", "Home", address),
        ])
    }

    #[test]
    fn test_write_then_parse() {
        let metadata = users_metadata().with_paging_state(Bytes::from_static(b"page"));
        let mut out = BytesMut::new();
        metadata.write(&mut out).unwrap();

        let mut buf = out.freeze();
        let parsed = ResultMetadata::parse(&mut buf, 64).unwrap();
        assert!(!buf.has_remaining());
        assert_eq!(parsed, metadata);
        assert!(parsed.has_more_pages());
        assert_eq!(parsed.flags() & flags::GLOBAL_TABLES_SPEC, flags::GLOBAL_TABLES_SPEC);
        assert_eq!(parsed.column_index("home"), Some(1));
    }

    #[test]
    fn test_per_column_table_spec() {
        let metadata = ResultMetadata::new(vec![
            ColumnSpec::new("a", "t1", "x", PrimitiveKind::Int),
            ColumnSpec::new("b", "t2", "y", PrimitiveKind::Int),
        ]);
        assert_eq!(metadata.flags(), 0);
        let mut out = BytesMut::new();
        metadata.write(&mut out).unwrap();
        let parsed = ResultMetadata::parse(&mut out.freeze(), 64).unwrap();
        assert_eq!(parsed.columns()[1].keyspace, "b");
    }

    #[test]
    fn test_write_rejects_oversized_column_name() {
        let name = "c".repeat(usize::from(u16::MAX) + 1);
        let metadata = ResultMetadata::new(vec![ColumnSpec::new("ks", "t", name, PrimitiveKind::Int)]);
        let err = metadata.write(&mut BytesMut::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedMetadata(_)));
    }

    #[test]
    fn test_no_metadata() {
        let mut buf = Bytes::from_static(&[0, 0, 0, 4, 0, 0, 0, 3]);
        let parsed = ResultMetadata::parse(&mut buf, 64).unwrap();
        assert_eq!(parsed.column_count(), 3);
        assert!(parsed.columns().is_empty());

        let registry = CodecRegistry::new().unwrap();
        let err = parsed.decode_row(&registry, &mut Bytes::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedMetadata(_)));
    }

    #[test]
    fn test_unsupported_column_type() {
        // one column of type code 0x000A
        let mut buf = Bytes::from_static(&[
            0, 0, 0, 1, 0, 0, 0, 1, 0, 1, b'k', 0, 1, b't', 0, 1, b'c', 0x00, 0x0A,
        ]);
        let err = ResultMetadata::parse(&mut buf, 64).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(_)));
    }

    #[test]
    fn test_decode_row() {
        let registry = CodecRegistry::new().unwrap();
        let metadata = users_metadata();

        let mut body = BytesMut::new();
        body.put_i32(1);
        body.put_i32(16);
        body.put_slice(&[7u8; 16]);
        body.put_i32(-1);

        let rows = metadata.decode_rows(&registry, &mut body.freeze()).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.len(), 2);
        assert!(row.get("id").unwrap().as_uuid().is_some());
        assert!(row.get("Home").unwrap().is_null());
        assert!(matches!(row.get(2), Err(Error::NoSuchField(_))));
        assert!(matches!(row.get("missing"), Err(Error::NoSuchField(_))));
    }
}
