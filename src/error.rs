//! Error types for tree, store and bootstrap operations.

use crate::types::FsId;
use thiserror::Error;

/// Error category, one per failure family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Integrity,
    Store,
    Payload,
    Info,
    Config,
}

#[derive(Debug, Error)]
pub enum FsError {
    #[error("Name is empty")]
    EmptyName,

    #[error("Path is empty")]
    EmptyPath,

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Path must be absolute: {0}")]
    MustUseAbsolutePath(String),

    #[error("Path must be relative: {0}")]
    MustUseRelativePath(String),

    #[error("Path must not start or end with a separator: {0}")]
    MustNotStartOrEndWithSeparator(String),

    #[error("Child not found: {0}")]
    ChildNotFound(String),

    #[error("Not a directory in path: {0}")]
    NotDirInPath(String),

    #[error("Node {0} has no parent")]
    NoParent(FsId),

    #[error("Destination directory not found: {0}")]
    DestDirNotFound(String),

    #[error("Root directory is not accessible")]
    RootUnavailable,

    #[error("Name already exists: {0}")]
    NameAlreadyExists(String),

    #[error("Root directory cannot be renamed")]
    CannotRenameRoot,

    #[error("Root directory cannot be moved")]
    CannotMoveRoot,

    #[error("Cannot move a node into itself")]
    CannotMoveToSelf,

    #[error("Cannot move a directory into one of its descendants")]
    CannotMoveToSubdir,

    #[error("Child list of node {0} not updated")]
    ChildListNotUpdated(FsId),

    #[error("Store returned no identifier for the new node")]
    NoNewId,

    #[error("Cannot delete row {id} from {table}")]
    CannotDeleteEntry { table: &'static str, id: FsId },

    #[error("Invalid payload identifier: {0}")]
    InvalidPayloadId(FsId),

    #[error("Corrupt child list: {len} bytes is not a multiple of {width}")]
    CorruptChildList { len: usize, width: usize },

    #[error("Node {id} holds {entries} relation entries, its kind allows one")]
    RelationArity { id: FsId, entries: usize },

    #[error("Store uses {stored}-byte identifiers, this build uses {expected}")]
    IdWidthMismatch { stored: String, expected: usize },

    #[error("Field {field} of node {id} not updated")]
    FieldNotUpdated { field: &'static str, id: FsId },

    #[error("Cannot open store {location}: {reason}")]
    CannotOpen { location: String, reason: String },

    #[error("Store {op} failed: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot read payload: {0}")]
    ReadPayload(String),

    #[error("Cannot save payload: {0}")]
    SavePayload(String),

    #[error("Cannot read info {name}: {source}")]
    ReadInfo {
        name: String,
        #[source]
        source: Box<FsError>,
    },

    #[error("Cannot write info {name}: {source}")]
    WriteInfo {
        name: String,
        #[source]
        source: Box<FsError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FsError {
    pub fn store(op: &'static str, source: rusqlite::Error) -> Self {
        FsError::Store { op, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::EmptyName
            | FsError::EmptyPath
            | FsError::InvalidName(_)
            | FsError::MustUseAbsolutePath(_)
            | FsError::MustUseRelativePath(_)
            | FsError::MustNotStartOrEndWithSeparator(_) => ErrorKind::Validation,
            FsError::ChildNotFound(_)
            | FsError::NotDirInPath(_)
            | FsError::NoParent(_)
            | FsError::DestDirNotFound(_)
            | FsError::RootUnavailable => ErrorKind::NotFound,
            FsError::NameAlreadyExists(_)
            | FsError::CannotRenameRoot
            | FsError::CannotMoveRoot
            | FsError::CannotMoveToSelf
            | FsError::CannotMoveToSubdir => ErrorKind::Conflict,
            FsError::ChildListNotUpdated(_)
            | FsError::NoNewId
            | FsError::CannotDeleteEntry { .. }
            | FsError::InvalidPayloadId(_)
            | FsError::CorruptChildList { .. }
            | FsError::RelationArity { .. }
            | FsError::IdWidthMismatch { .. }
            | FsError::FieldNotUpdated { .. } => ErrorKind::Integrity,
            FsError::CannotOpen { .. } | FsError::Store { .. } | FsError::Io(_) => {
                ErrorKind::Store
            }
            FsError::ReadPayload(_) | FsError::SavePayload(_) => ErrorKind::Payload,
            FsError::ReadInfo { .. } | FsError::WriteInfo { .. } => ErrorKind::Info,
            FsError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<config::ConfigError> for FsError {
    fn from(err: config::ConfigError) -> Self {
        FsError::Config(err.to_string())
    }
}
