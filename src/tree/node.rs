//! Node identity, field access and the structural operations shared by
//! directories and files (rename, move, ancestry).

use super::dir::Directory;
use super::file::File;
use super::path::{is_absolute, normalize_name, trim_separators};
use super::relation::{Arity, ChildOp, RelationList};
use crate::error::{ErrorKind, FsError};
use crate::fs::SqlFs;
use crate::store::schema::{Field, NODE_TABLE};
use crate::store::{Condition, Record};
use crate::time::{from_file_time, now_file_time};
use crate::types::{FsId, NodeKind};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

/// Decoded value of one node-table field
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldValue {
    Int(i64),
    Text(String),
    Id(FsId),
    List(RelationList),
    Count(usize),
}

impl FieldValue {
    /// Value reported when the row is missing or the column cannot be decoded
    fn default_for(field: Field) -> Self {
        match field {
            Field::Id | Field::Parent => FieldValue::Id(FsId::INVALID),
            Field::Kind | Field::CreatedAt | Field::ModifiedAt | Field::Size => FieldValue::Int(0),
            Field::Name => FieldValue::Text(String::new()),
            Field::Children => FieldValue::List(RelationList::new()),
            Field::ChildCount => FieldValue::Count(0),
        }
    }

    fn decode(field: Field, value: &Value) -> Result<Option<Self>, FsError> {
        let decoded = match (field, value) {
            (_, Value::Null) => None,
            (Field::Id | Field::Parent, Value::Integer(n)) => Some(FieldValue::Id(FsId::from_i64(*n))),
            (Field::Kind | Field::CreatedAt | Field::ModifiedAt | Field::Size, Value::Integer(n)) => {
                Some(FieldValue::Int(*n))
            }
            (Field::Name, Value::Text(s)) => Some(FieldValue::Text(s.clone())),
            (Field::Children, Value::Blob(b)) => Some(FieldValue::List(RelationList::decode(b)?)),
            (Field::ChildCount, Value::Blob(b)) => {
                Some(FieldValue::Count(RelationList::count_encoded(b)?))
            }
            _ => None,
        };
        Ok(decoded)
    }

    fn into_sql(self) -> Value {
        match self {
            FieldValue::Int(n) => Value::Integer(n),
            FieldValue::Text(s) => Value::Text(s),
            FieldValue::Id(id) => id.into(),
            FieldValue::List(list) if list.is_empty() => Value::Null,
            FieldValue::List(list) => Value::Blob(list.encode()),
            FieldValue::Count(n) => Value::Integer(n as i64),
        }
    }

    pub(crate) fn into_int(self) -> i64 {
        match self {
            FieldValue::Int(n) => n,
            FieldValue::Count(n) => n as i64,
            FieldValue::Id(id) => id.get(),
            _ => 0,
        }
    }

    pub(crate) fn into_text(self) -> String {
        match self {
            FieldValue::Text(s) => s,
            _ => String::new(),
        }
    }

    pub(crate) fn into_id(self) -> FsId {
        match self {
            FieldValue::Id(id) => id,
            _ => FsId::INVALID,
        }
    }

    pub(crate) fn into_list(self) -> RelationList {
        match self {
            FieldValue::List(list) => list,
            _ => RelationList::new(),
        }
    }
}

/// Identity of one node row plus the store it lives in
#[derive(Clone, Copy)]
pub struct NodeHandle<'fs> {
    pub(crate) fs: &'fs SqlFs,
    pub(crate) id: FsId,
}

impl std::fmt::Debug for NodeHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle").field("id", &self.id).finish()
    }
}

impl<'fs> NodeHandle<'fs> {
    pub(crate) fn new(fs: &'fs SqlFs, id: FsId) -> Self {
        Self { fs, id }
    }

    pub fn id(&self) -> FsId {
        self.id
    }

    fn row_condition(&self) -> Condition {
        Condition::eq(Field::Id.column(), self.id)
    }

    /// Read one field. A missing row or undecodable value yields the field default.
    pub(crate) fn get_field(&self, field: Field) -> Result<FieldValue, FsError> {
        self.fs.with_lock(|| {
            let row = self
                .fs
                .db()
                .query_one(NODE_TABLE, &[field.column()], &self.row_condition())?;
            let Some(value) = row.as_ref().and_then(|r| r.value_at(0)) else {
                return Ok(FieldValue::default_for(field));
            };
            match FieldValue::decode(field, value) {
                Ok(Some(decoded)) => Ok(decoded),
                Ok(None) => Ok(FieldValue::default_for(field)),
                Err(err) => {
                    warn!(id = %self.id, column = field.column(), error = %err, "undecodable field");
                    Ok(FieldValue::default_for(field))
                }
            }
        })
    }

    /// Write one field and refresh the modification time. Returns whether a row changed.
    pub(crate) fn set_field(&self, field: Field, value: FieldValue) -> Result<bool, FsError> {
        let column = match field {
            Field::ChildCount => Field::Children.column(),
            other => other.column(),
        };
        let mut values = vec![(column.to_string(), value.into_sql())];
        if field != Field::ModifiedAt {
            values.push((
                Field::ModifiedAt.column().to_string(),
                Value::Integer(now_file_time()),
            ));
        }
        self.fs.with_lock(|| {
            let affected = self
                .fs
                .db()
                .update(NODE_TABLE, &values, &self.row_condition())?;
            Ok(affected > 0)
        })
    }

    /// Like [`NodeHandle::set_field`] but an untouched row is an error.
    pub(crate) fn require_set(&self, field: Field, value: FieldValue) -> Result<(), FsError> {
        if self.set_field(field, value)? {
            Ok(())
        } else {
            Err(FsError::FieldNotUpdated {
                field: field.column(),
                id: self.id,
            })
        }
    }

    /// Replace the relation list, refusing lists longer than `arity` allows.
    pub(crate) fn set_relations(&self, list: RelationList, arity: Arity) -> Result<bool, FsError> {
        if !list.fits(arity) {
            return Err(FsError::RelationArity {
                id: self.id,
                entries: list.len(),
            });
        }
        self.set_field(Field::Children, FieldValue::List(list))
    }

    pub(crate) fn parent_id(&self) -> Result<FsId, FsError> {
        Ok(self.get_field(Field::Parent)?.into_id())
    }

    pub(crate) fn parent_dir(&self) -> Result<Option<Directory<'fs>>, FsError> {
        let parent = self.parent_id()?;
        if !parent.is_valid() {
            return Ok(None);
        }
        Ok(self.fs.node_by_id(parent)?.and_then(Node::into_dir))
    }

    /// Walk parent pointers from this node up to the root looking for `candidate`.
    pub(crate) fn has_ancestor(&self, candidate: FsId) -> Result<bool, FsError> {
        self.fs.with_lock(|| {
            let mut seen = HashSet::new();
            let mut current = *self;
            loop {
                let parent = current.parent_id()?;
                if !parent.is_valid() || !seen.insert(parent) {
                    return Ok(false);
                }
                if parent == candidate {
                    return Ok(true);
                }
                if parent.is_root() {
                    return Ok(false);
                }
                current = NodeHandle::new(self.fs, parent);
            }
        })
    }

    fn rename(&self, new_name: &str) -> Result<(), FsError> {
        self.fs.scoped_mutation("rename", || {
            let name = normalize_name(new_name)?;
            if self.id.is_root() {
                return Err(FsError::CannotRenameRoot);
            }
            let parent = self.parent_dir()?.ok_or(FsError::NoParent(self.id))?;
            if parent.has_other_child(&name, self.id)? {
                return Err(FsError::NameAlreadyExists(name));
            }
            self.require_set(Field::Name, FieldValue::Text(name))
        })
    }

    fn move_to(&self, dest: &Directory<'fs>, kind: NodeKind) -> Result<(), FsError> {
        self.fs.scoped_mutation("move", || {
            if self.id.is_root() {
                return Err(FsError::CannotMoveRoot);
            }
            if self.id == dest.id() {
                return Err(FsError::CannotMoveToSelf);
            }
            if kind == NodeKind::Dir && dest.handle().has_ancestor(self.id)? {
                return Err(FsError::CannotMoveToSubdir);
            }
            let name = self.get_field(Field::Name)?.into_text();
            if dest.contains(&name)? {
                return Err(FsError::NameAlreadyExists(name));
            }

            let parent = self.parent_dir()?.ok_or(FsError::NoParent(self.id))?;
            parent.update_child_list(ChildOp::Delete(self.id))?;
            self.require_set(Field::Parent, FieldValue::Id(dest.id()))?;
            dest.update_child_list(ChildOp::Add(self.id))
        })
    }

    fn move_to_path(&self, dest_path: &str, kind: NodeKind) -> Result<(), FsError> {
        self.fs.scoped_mutation("move", || {
            if dest_path.is_empty() {
                return Err(FsError::EmptyPath);
            }
            let not_found = |err: FsError| match err.kind() {
                ErrorKind::NotFound | ErrorKind::Validation => {
                    FsError::DestDirNotFound(dest_path.to_string())
                }
                _ => err,
            };
            let dest = if is_absolute(dest_path) {
                let root = self.fs.root()?;
                let relative = trim_separators(dest_path);
                if relative.is_empty() {
                    root
                } else {
                    root.resolve_dir(relative).map_err(not_found)?
                }
            } else {
                let parent = self
                    .parent_dir()?
                    .ok_or_else(|| FsError::DestDirNotFound(dest_path.to_string()))?;
                parent.resolve_dir(dest_path).map_err(not_found)?
            };
            self.move_to(&dest, kind)
        })
    }
}

/// A directory or a file, chosen by the persisted kind column
#[derive(Debug, Clone, Copy)]
pub enum Node<'fs> {
    Dir(Directory<'fs>),
    File(File<'fs>),
}

impl<'fs> Node<'fs> {
    /// Build the typed node for a row id and stored kind code.
    pub(crate) fn materialize(fs: &'fs SqlFs, id: FsId, kind_code: i64) -> Option<Self> {
        match NodeKind::from_code(kind_code) {
            Some(NodeKind::Dir) => Some(Node::Dir(Directory::new(fs, id))),
            Some(NodeKind::File) => Some(Node::File(File::new(fs, id))),
            None => {
                warn!(%id, kind_code, "node row has unknown kind");
                None
            }
        }
    }

    /// Build from a row carrying at least the id and kind columns.
    pub(crate) fn from_record(fs: &'fs SqlFs, record: &Record) -> Option<Self> {
        let id = FsId::from_i64(record.int(Field::Id.column())?);
        let kind = record.int(Field::Kind.column())?;
        Self::materialize(fs, id, kind)
    }

    pub fn into_dir(self) -> Option<Directory<'fs>> {
        match self {
            Node::Dir(dir) => Some(dir),
            Node::File(_) => None,
        }
    }

    pub fn into_file(self) -> Option<File<'fs>> {
        match self {
            Node::File(file) => Some(file),
            Node::Dir(_) => None,
        }
    }

    pub fn as_dir(&self) -> Option<&Directory<'fs>> {
        match self {
            Node::Dir(dir) => Some(dir),
            Node::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&File<'fs>> {
        match self {
            Node::File(file) => Some(file),
            Node::Dir(_) => None,
        }
    }
}

/// Point-in-time metadata of a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStat {
    pub id: FsId,
    pub kind: NodeKind,
    pub name: String,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub parent: Option<FsId>,
}

/// Operations shared by every node
pub trait FsNode<'fs> {
    fn handle(&self) -> NodeHandle<'fs>;

    fn kind(&self) -> NodeKind;

    /// Remove this node (recursively for directories) as one transaction.
    fn delete(&self) -> Result<(), FsError>;

    fn id(&self) -> FsId {
        self.handle().id
    }

    fn is_dir(&self) -> bool {
        self.kind() == NodeKind::Dir
    }

    fn is_root(&self) -> bool {
        self.id().is_root()
    }

    fn name(&self) -> Result<String, FsError> {
        Ok(self.handle().get_field(Field::Name)?.into_text())
    }

    fn created(&self) -> Result<DateTime<Utc>, FsError> {
        Ok(from_file_time(self.handle().get_field(Field::CreatedAt)?.into_int()))
    }

    fn modified(&self) -> Result<DateTime<Utc>, FsError> {
        Ok(from_file_time(self.handle().get_field(Field::ModifiedAt)?.into_int()))
    }

    fn size(&self) -> Result<u64, FsError> {
        Ok(self.handle().get_field(Field::Size)?.into_int().max(0) as u64)
    }

    /// Containing directory; `None` for the root.
    fn parent(&self) -> Result<Option<Directory<'fs>>, FsError> {
        self.handle().parent_dir()
    }

    fn rename(&self, new_name: &str) -> Result<(), FsError> {
        self.handle().rename(new_name)
    }

    fn move_to(&self, dest: &Directory<'fs>) -> Result<(), FsError> {
        self.handle().move_to(dest, self.kind())
    }

    /// Move into the directory at `dest_path`: absolute from the root,
    /// otherwise relative to this node's current parent.
    fn move_to_path(&self, dest_path: &str) -> Result<(), FsError> {
        self.handle().move_to_path(dest_path, self.kind())
    }

    /// Whether `dir` lies on this node's parent chain.
    fn is_ancestor(&self, dir: &Directory<'fs>) -> Result<bool, FsError> {
        self.handle().has_ancestor(dir.id())
    }

    fn stat(&self) -> Result<NodeStat, FsError> {
        let handle = self.handle();
        handle.fs.with_lock(|| {
            let parent = handle.parent_id()?;
            Ok(NodeStat {
                id: handle.id,
                kind: self.kind(),
                name: self.name()?,
                size: self.size()?,
                created: self.created()?,
                modified: self.modified()?,
                parent: parent.is_valid().then_some(parent),
            })
        })
    }
}

impl<'fs> FsNode<'fs> for Node<'fs> {
    fn handle(&self) -> NodeHandle<'fs> {
        match self {
            Node::Dir(dir) => dir.handle(),
            Node::File(file) => file.handle(),
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            Node::Dir(_) => NodeKind::Dir,
            Node::File(_) => NodeKind::File,
        }
    }

    fn delete(&self) -> Result<(), FsError> {
        match self {
            Node::Dir(dir) => dir.delete(),
            Node::File(file) => file.delete(),
        }
    }
}
