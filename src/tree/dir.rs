//! Directory nodes: child management, path resolution and recursive delete.

use super::file::File;
use super::node::{FieldValue, FsNode, Node, NodeHandle};
use super::path::{
    check_relative, normalize_name, segments, NameCase, CURRENT_DIR, PARENT_DIR, SEPARATOR,
};
use super::relation::{Arity, ChildOp, RelationList};
use crate::error::FsError;
use crate::fs::SqlFs;
use crate::store::schema::{Field, NODE_TABLE};
use crate::store::{values, Condition, Record};
use crate::time::now_file_time;
use crate::types::{FsId, KindFilter, NodeKind};
use rusqlite::types::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct Directory<'fs> {
    node: NodeHandle<'fs>,
}

impl<'fs> Directory<'fs> {
    pub(crate) fn new(fs: &'fs SqlFs, id: FsId) -> Self {
        Self {
            node: NodeHandle::new(fs, id),
        }
    }

    fn fs(&self) -> &'fs SqlFs {
        self.node.fs
    }

    /// Number of entries in the persisted child list
    pub fn child_count(&self) -> Result<usize, FsError> {
        Ok(self.node.get_field(Field::ChildCount)?.into_int().max(0) as usize)
    }

    /// Whether a child with this name exists
    pub fn contains(&self, name: &str) -> Result<bool, FsError> {
        Ok(!self.query_children(Some(name), KindFilter::Any)?.is_empty())
    }

    /// Whether a child other than `except` is named `name`.
    pub(crate) fn has_other_child(&self, name: &str, except: FsId) -> Result<bool, FsError> {
        Ok(self
            .query_children(Some(name), KindFilter::Any)?
            .iter()
            .any(|r| r.int(Field::Id.column()).map(FsId::from_i64) != Some(except)))
    }

    /// Child rows (id, kind, name) ordered by id, optionally filtered by name and kind.
    fn query_children(
        &self,
        name: Option<&str>,
        filter: KindFilter,
    ) -> Result<Vec<Record>, FsError> {
        let case = self.fs().options().name_case;
        let mut cond = Condition::eq(Field::Parent.column(), self.node.id);
        if let KindFilter::Only(kind) = filter {
            cond = cond.and(Field::Kind.column(), kind.code());
        }
        if let (Some(name), NameCase::Sensitive) = (name, case) {
            cond = cond.and(Field::Name.column(), name.to_string());
        }

        let columns = [Field::Id.column(), Field::Kind.column(), Field::Name.column()];
        let rows = self.fs().with_lock(|| {
            self.fs()
                .db()
                .query(NODE_TABLE, &columns, &cond, Some(Field::Id.column()))
        })?;

        Ok(match (name, case) {
            (Some(name), NameCase::Insensitive) => rows
                .into_iter()
                .filter(|r| {
                    r.text(Field::Name.column())
                        .is_some_and(|stored| case.matches(stored, name))
                })
                .collect(),
            _ => rows,
        })
    }

    /// Apply one edit to this directory's child list.
    pub(crate) fn update_child_list(&self, op: ChildOp) -> Result<(), FsError> {
        self.fs().with_lock(|| {
            let mut list = self.node.get_field(Field::Children)?.into_list();
            if !list.apply(op) {
                return Err(FsError::ChildListNotUpdated(self.node.id));
            }
            if !self.node.set_relations(list, Arity::of(NodeKind::Dir))? {
                return Err(FsError::ChildListNotUpdated(self.node.id));
            }
            Ok(())
        })
    }

    pub fn add_dir(&self, name: &str) -> Result<Directory<'fs>, FsError> {
        let id = self.add_child(NodeKind::Dir, name)?;
        Ok(Directory::new(self.fs(), id))
    }

    /// Create an empty file. Its payload slot starts as [`FsId::NO_PAYLOAD`].
    pub fn add_file(&self, name: &str) -> Result<File<'fs>, FsError> {
        let id = self.add_child(NodeKind::File, name)?;
        Ok(File::new(self.fs(), id))
    }

    fn add_child(&self, kind: NodeKind, name: &str) -> Result<FsId, FsError> {
        let fs = self.fs();
        fs.scoped_mutation("add", || {
            let name = normalize_name(name)?;
            if self.contains(&name)? {
                return Err(FsError::NameAlreadyExists(name));
            }

            let now = now_file_time();
            let row = values([
                (Field::Kind.column(), Value::Integer(kind.code())),
                (Field::CreatedAt.column(), Value::Integer(now)),
                (Field::ModifiedAt.column(), Value::Integer(now)),
                (Field::Size.column(), Value::Integer(0)),
                (Field::Name.column(), Value::Text(name.clone())),
                (Field::Parent.column(), self.node.id.into()),
            ]);
            fs.db().insert(NODE_TABLE, &row)?;
            let id = fs.db().last_insert_id();
            if !id.is_valid() {
                return Err(FsError::NoNewId);
            }

            if let Err(err) = self.update_child_list(ChildOp::Add(id)) {
                let orphan = Condition::eq(Field::Id.column(), id);
                if let Err(cleanup) = fs.db().delete(NODE_TABLE, &orphan) {
                    warn!(%id, error = %cleanup, "could not remove unattached node");
                }
                return Err(err);
            }

            if kind == NodeKind::File {
                File::new(fs, id).set_payload_id(FsId::NO_PAYLOAD)?;
            }
            debug!(parent = %self.node.id, %id, kind = kind.as_str(), name = %name, "added node");
            Ok(id)
        })
    }

    /// Direct child by name. `.` is this directory; `..` is the parent (the root for the root).
    pub fn get_child(&self, name: &str) -> Result<Node<'fs>, FsError> {
        match name {
            CURRENT_DIR => Ok(Node::Dir(*self)),
            PARENT_DIR if self.node.id.is_root() => Ok(Node::Dir(*self)),
            PARENT_DIR => self
                .node
                .parent_dir()?
                .map(Node::Dir)
                .ok_or(FsError::NoParent(self.node.id)),
            _ => self
                .query_children(Some(name), KindFilter::Any)?
                .iter()
                .find_map(|r| Node::from_record(self.fs(), r))
                .ok_or_else(|| FsError::ChildNotFound(name.to_string())),
        }
    }

    fn children_of(&self, filter: KindFilter) -> Result<Vec<Node<'fs>>, FsError> {
        Ok(self
            .query_children(None, filter)?
            .iter()
            .filter_map(|r| Node::from_record(self.fs(), r))
            .collect())
    }

    /// All children ordered by id. Empty when there are none.
    pub fn children(&self) -> Result<Vec<Node<'fs>>, FsError> {
        self.children_of(KindFilter::Any)
    }

    pub fn subdirectories(&self) -> Result<Vec<Directory<'fs>>, FsError> {
        Ok(self
            .children_of(KindFilter::Only(NodeKind::Dir))?
            .into_iter()
            .filter_map(Node::into_dir)
            .collect())
    }

    pub fn files(&self) -> Result<Vec<File<'fs>>, FsError> {
        Ok(self
            .children_of(KindFilter::Only(NodeKind::File))?
            .into_iter()
            .filter_map(Node::into_file)
            .collect())
    }

    /// Resolve a relative path to a node of either kind.
    pub fn resolve(&self, path: &str) -> Result<Node<'fs>, FsError> {
        check_relative(path)?;
        self.fs().with_lock(|| {
            let mut current = Node::Dir(*self);
            let mut walked = CURRENT_DIR;
            for segment in segments(path) {
                let dir = current
                    .into_dir()
                    .ok_or_else(|| FsError::NotDirInPath(walked.to_string()))?;
                current = dir.get_child(segment)?;
                walked = segment;
            }
            Ok(current)
        })
    }

    pub fn resolve_dir(&self, path: &str) -> Result<Directory<'fs>, FsError> {
        match self.resolve(path)? {
            Node::Dir(dir) => Ok(dir),
            Node::File(_) => Err(FsError::NotDirInPath(last_segment(path))),
        }
    }

    /// Resolve a relative path that must end at a file. Leading or trailing
    /// separators are rejected.
    pub fn resolve_file(&self, path: &str) -> Result<File<'fs>, FsError> {
        if path.is_empty() {
            return Err(FsError::EmptyPath);
        }
        if path.starts_with(SEPARATOR) || path.ends_with(SEPARATOR) {
            return Err(FsError::MustNotStartOrEndWithSeparator(path.to_string()));
        }
        match self.resolve(path)? {
            Node::File(file) => Ok(file),
            Node::Dir(_) => Err(FsError::ChildNotFound(last_segment(path))),
        }
    }

    /// Detach from the parent, delete every child, then the own row.
    /// The root keeps its row and ends with an empty child list.
    fn delete_tree(&self) -> Result<(), FsError> {
        let id = self.node.id;
        if !id.is_root() {
            let parent = self.node.parent_dir()?.ok_or(FsError::NoParent(id))?;
            parent.update_child_list(ChildOp::Delete(id))?;
        }

        for child in self.children()? {
            child.delete()?;
        }

        if id.is_root() {
            return self
                .node
                .require_set(Field::Children, FieldValue::List(RelationList::new()));
        }
        let removed = self
            .fs()
            .db()
            .delete(NODE_TABLE, &Condition::eq(Field::Id.column(), id))?;
        if removed == 0 {
            return Err(FsError::CannotDeleteEntry {
                table: NODE_TABLE,
                id,
            });
        }
        debug!(%id, "deleted directory");
        Ok(())
    }
}

fn last_segment(path: &str) -> String {
    segments(path).last().copied().unwrap_or(path).to_string()
}

impl<'fs> FsNode<'fs> for Directory<'fs> {
    fn handle(&self) -> NodeHandle<'fs> {
        self.node
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Dir
    }

    fn delete(&self) -> Result<(), FsError> {
        self.fs().scoped_mutation("delete", || self.delete_tree())
    }
}
