//! Default payload codec holding either text or raw bytes.

use super::{id_column, FileDataCodec};
use crate::error::FsError;
use crate::store::{ColumnDef, Record};
use rusqlite::types::Value;

const TYPE_COLUMN: &str = "dFileType";
const TEXT_COLUMN: &str = "dTextData";
const BINARY_COLUMN: &str = "dRawBinData";

const TYPE_TEXT: i64 = 0;
const TYPE_BINARY: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Text(String),
    Binary(Vec<u8>),
}

/// Text or binary payload. Setting one kind clears the other.
///
/// Text size is accounted as UTF-16 code units × 2.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleFileData {
    content: Option<Content>,
}

impl SimpleFileData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let mut data = Self::new();
        data.set_text(text);
        data
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let mut data = Self::new();
        data.set_binary(bytes);
        data
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content = Some(Content::Text(text.into()));
    }

    pub fn set_binary(&mut self, bytes: impl Into<Vec<u8>>) {
        self.content = Some(Content::Binary(bytes.into()));
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(Content::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn binary(&self) -> Option<&[u8]> {
        match &self.content {
            Some(Content::Binary(b)) => Some(b),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.content, Some(Content::Text(_)))
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }
}

impl FileDataCodec for SimpleFileData {
    fn schema(&self) -> Vec<ColumnDef> {
        vec![
            id_column(),
            ColumnDef::new(TYPE_COLUMN, "integer"),
            ColumnDef::new(TEXT_COLUMN, "text"),
            ColumnDef::new(BINARY_COLUMN, "blob"),
        ]
    }

    fn load(&mut self, row: &Record) -> Result<(), FsError> {
        match row.int(TYPE_COLUMN) {
            Some(TYPE_TEXT) => {
                let text = row.text(TEXT_COLUMN).unwrap_or_default();
                self.content = Some(Content::Text(text.to_string()));
            }
            Some(TYPE_BINARY) => {
                let bytes = row.blob(BINARY_COLUMN).unwrap_or_default();
                self.content = Some(Content::Binary(bytes.to_vec()));
            }
            other => {
                return Err(FsError::ReadPayload(format!(
                    "unknown payload type {:?}",
                    other
                )))
            }
        }
        Ok(())
    }

    fn to_values(&self) -> Vec<(String, Value)> {
        let (kind, text, binary) = match &self.content {
            Some(Content::Text(s)) => (TYPE_TEXT, Value::Text(s.clone()), Value::Null),
            Some(Content::Binary(b)) => (TYPE_BINARY, Value::Null, Value::Blob(b.clone())),
            None => (TYPE_BINARY, Value::Null, Value::Blob(Vec::new())),
        };
        vec![
            (TYPE_COLUMN.to_string(), Value::Integer(kind)),
            (TEXT_COLUMN.to_string(), text),
            (BINARY_COLUMN.to_string(), binary),
        ]
    }

    fn size_in_bytes(&self) -> u64 {
        match &self.content {
            Some(Content::Text(s)) => s.encode_utf16().count() as u64 * 2,
            Some(Content::Binary(b)) => b.len() as u64,
            None => 0,
        }
    }
}
