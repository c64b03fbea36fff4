//! Persisted layout: table and column names, node-table fields.

use crate::store::ColumnDef;

/// Node table, one row per directory or file
pub const NODE_TABLE: &str = "FsBlock";

/// Key/value table holding store metadata
pub const INFO_TABLE: &str = "FsInfo";

/// Payload table, columns defined by the codec
pub const PAYLOAD_TABLE: &str = "DataBlock";

/// Identifier column every payload schema starts with
pub const PAYLOAD_ID_COLUMN: &str = "dID";
pub const PAYLOAD_ID_TYPE: &str = "integer primary key autoincrement";

/// Tables a complete store contains
pub const EXPECTED_TABLES: [&str; 3] = [NODE_TABLE, INFO_TABLE, PAYLOAD_TABLE];

pub const NODE_ID_COLUMN: &str = "fsID";
pub const INFO_NAME_COLUMN: &str = "infoName";
pub const INFO_VALUE_COLUMN: &str = "infoVal";

/// Name stored on the root row. Contains reserved characters so no child can collide.
pub const ROOT_NAME: &str = "___?root?___";

/// Logical node-table field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Kind,
    CreatedAt,
    ModifiedAt,
    Size,
    Name,
    Parent,
    Children,
    /// Number of entries in the child list; reads the `Children` column
    ChildCount,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Field::Id => NODE_ID_COLUMN,
            Field::Kind => "fsType",
            Field::CreatedAt => "fsCreateTime",
            Field::ModifiedAt => "fsLastModTime",
            Field::Size => "fsFileSize",
            Field::Name => "fsName",
            Field::Parent => "fsParent",
            Field::Children | Field::ChildCount => "fsChild",
        }
    }
}

pub fn node_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new(Field::Id.column(), "integer primary key autoincrement"),
        ColumnDef::new(Field::Kind.column(), "integer"),
        ColumnDef::new(Field::CreatedAt.column(), "integer"),
        ColumnDef::new(Field::ModifiedAt.column(), "integer"),
        ColumnDef::new(Field::Size.column(), "integer"),
        ColumnDef::new(Field::Name.column(), "varchar(512)"),
        ColumnDef::new(Field::Parent.column(), "integer"),
        ColumnDef::new(Field::Children.column(), "blob"),
    ]
}

pub fn info_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new(INFO_NAME_COLUMN, "varchar(128) primary key"),
        ColumnDef::new(INFO_VALUE_COLUMN, "varchar(128)"),
    ]
}

/// Well-known info entries written at bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoField {
    Version,
    CreateTimeUtc,
    Label,
    IdSize,
}

impl InfoField {
    pub const ALL: [InfoField; 4] = [
        InfoField::Version,
        InfoField::CreateTimeUtc,
        InfoField::Label,
        InfoField::IdSize,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InfoField::Version => "version",
            InfoField::CreateTimeUtc => "createTimeUtc",
            InfoField::Label => "fsLabel",
            InfoField::IdSize => "IDSize",
        }
    }
}
