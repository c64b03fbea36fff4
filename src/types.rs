//! Core types for the SqlFs tree: node identifiers and node kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Native integer behind a [`FsId`]. Width is fixed per build.
#[cfg(not(feature = "wide-ids"))]
pub type RawId = i32;

/// Native integer behind a [`FsId`]. Width is fixed per build.
#[cfg(feature = "wide-ids")]
pub type RawId = i64;

/// FsId: identifier of a node row or payload row
///
/// Ordered and comparable. Encodes to a fixed-width little-endian field of
/// [`FsId::WIDTH`] bytes. Mixing widths against one store is refused at open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FsId(RawId);

impl FsId {
    /// Encoded width in bytes (4 or 8)
    pub const WIDTH: usize = std::mem::size_of::<RawId>();

    /// Invalid identifier; also the parent of the root directory
    pub const INVALID: FsId = FsId(0);

    /// File payload slot value meaning "no payload row yet"
    pub const NO_PAYLOAD: FsId = FsId(-1);

    /// The root directory
    pub const ROOT: FsId = FsId(1);

    /// Parent recorded on the root row
    pub const ROOT_PARENT: FsId = FsId::INVALID;

    pub const fn new(raw: RawId) -> Self {
        FsId(raw)
    }

    /// Build from a store integer. Values outside the configured width map to
    /// [`FsId::INVALID`].
    pub fn from_i64(value: i64) -> Self {
        RawId::try_from(value).map(FsId).unwrap_or(FsId::INVALID)
    }

    pub fn get(self) -> i64 {
        self.0 as i64
    }

    /// True for ids that can name an existing row (strictly positive).
    pub fn is_valid(self) -> bool {
        self.0 > 0
    }

    pub fn is_root(self) -> bool {
        self == FsId::ROOT
    }

    /// Append the little-endian encoding to `out`.
    pub fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_le_bytes());
    }

    /// Decode one identifier from exactly [`FsId::WIDTH`] bytes.
    pub fn read_le(field: &[u8]) -> Option<Self> {
        let bytes: [u8; FsId::WIDTH] = field.try_into().ok()?;
        Some(FsId(RawId::from_le_bytes(bytes)))
    }
}

impl fmt::Display for FsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RawId> for FsId {
    fn from(raw: RawId) -> Self {
        FsId(raw)
    }
}

/// Node kind as persisted in the node table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Dir,
    File,
}

impl NodeKind {
    pub fn code(self) -> i64 {
        match self {
            NodeKind::Dir => 0,
            NodeKind::File => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(NodeKind::Dir),
            1 => Some(NodeKind::File),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Dir => "dir",
            NodeKind::File => "file",
        }
    }
}

/// Kind filter for child queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    Any,
    Only(NodeKind),
}
