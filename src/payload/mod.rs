//! File payload codecs
//!
//! A codec owns the column layout of the payload table and converts between a
//! fetched row and its in-memory payload. Files call into a codec to read and
//! write their single payload row; directories never do.

pub mod simple;

use crate::error::FsError;
use crate::store::schema::{PAYLOAD_ID_COLUMN, PAYLOAD_ID_TYPE};
use crate::store::{ColumnDef, Record};
use rusqlite::types::Value;

pub use simple::SimpleFileData;

/// Contract for payload serialization
pub trait FileDataCodec {
    /// Payload table columns, starting with the identifier column.
    fn schema(&self) -> Vec<ColumnDef>;

    /// Populate from a fetched payload row.
    fn load(&mut self, row: &Record) -> Result<(), FsError>;

    /// Column values to persist, excluding the identifier column.
    fn to_values(&self) -> Vec<(String, Value)>;

    /// Payload size recorded on the owning file
    fn size_in_bytes(&self) -> u64;
}

/// Identifier column definition for payload schemas
pub fn id_column() -> ColumnDef {
    ColumnDef::new(PAYLOAD_ID_COLUMN, PAYLOAD_ID_TYPE)
}

/// Codec schema with the identifier column guaranteed first
pub fn table_schema(codec: &dyn FileDataCodec) -> Vec<ColumnDef> {
    let mut columns: Vec<ColumnDef> = codec
        .schema()
        .into_iter()
        .filter(|c| !c.name.eq_ignore_ascii_case(PAYLOAD_ID_COLUMN))
        .collect();
    columns.insert(0, id_column());
    columns
}
