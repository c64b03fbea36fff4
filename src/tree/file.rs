//! File nodes and their single payload row.

use super::node::{FieldValue, FsNode, NodeHandle};
use super::relation::{Arity, ChildOp, RelationList};
use crate::error::FsError;
use crate::fs::SqlFs;
use crate::payload::FileDataCodec;
use crate::store::schema::{Field, NODE_TABLE, PAYLOAD_ID_COLUMN, PAYLOAD_TABLE};
use crate::store::Condition;
use crate::types::{FsId, NodeKind};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct File<'fs> {
    node: NodeHandle<'fs>,
}

impl<'fs> File<'fs> {
    pub(crate) fn new(fs: &'fs SqlFs, id: FsId) -> Self {
        Self {
            node: NodeHandle::new(fs, id),
        }
    }

    fn fs(&self) -> &'fs SqlFs {
        self.node.fs
    }

    /// Payload row id, [`FsId::NO_PAYLOAD`] before the first write, or
    /// [`FsId::INVALID`] when the slot is missing or unreadable.
    /// A slot holding more than one id is corrupt.
    pub fn payload_id(&self) -> Result<FsId, FsError> {
        let slot = self.node.get_field(Field::Children)?.into_list();
        if !slot.fits(Arity::of(NodeKind::File)) {
            warn!(id = %self.node.id, entries = slot.len(), "file payload slot holds several ids");
            return Err(FsError::RelationArity {
                id: self.node.id,
                entries: slot.len(),
            });
        }
        Ok(slot.first().unwrap_or(FsId::INVALID))
    }

    pub fn has_payload(&self) -> Result<bool, FsError> {
        Ok(self.payload_id()?.is_valid())
    }

    pub(crate) fn set_payload_id(&self, payload: FsId) -> Result<(), FsError> {
        let list = RelationList::single(payload);
        if self.node.set_relations(list, Arity::of(NodeKind::File))? {
            Ok(())
        } else {
            Err(FsError::FieldNotUpdated {
                field: Field::Children.column(),
                id: self.node.id,
            })
        }
    }

    /// Load the payload row into `codec`.
    pub fn read_payload(&self, codec: &mut dyn FileDataCodec) -> Result<(), FsError> {
        self.fs().with_lock(|| {
            let payload = self.payload_id()?;
            if !payload.is_valid() {
                return Err(FsError::InvalidPayloadId(payload));
            }
            let row = self
                .fs()
                .db()
                .query_one(PAYLOAD_TABLE, &[], &Condition::eq(PAYLOAD_ID_COLUMN, payload))?
                .ok_or_else(|| FsError::ReadPayload(format!("payload row {} is missing", payload)))?;
            codec.load(&row)
        })
    }

    /// Store `codec` as this file's payload, creating the row on first write,
    /// then record the payload size on the file.
    pub fn write_payload(&self, codec: &dyn FileDataCodec) -> Result<(), FsError> {
        let fs = self.fs();
        fs.scoped_mutation("write payload", || {
            let current = self.payload_id()?;
            if current == FsId::INVALID {
                return Err(FsError::InvalidPayloadId(current));
            }

            let row = codec.to_values();
            let stored = if current.is_valid() {
                let cond = Condition::eq(PAYLOAD_ID_COLUMN, current);
                if fs.db().update(PAYLOAD_TABLE, &row, &cond)? == 0 {
                    return Err(FsError::SavePayload(format!(
                        "payload row {} is missing",
                        current
                    )));
                }
                current
            } else {
                fs.db().insert(PAYLOAD_TABLE, &row)?;
                let created = fs.db().last_insert_id();
                if !created.is_valid() {
                    return Err(FsError::SavePayload(
                        "store returned no payload id".to_string(),
                    ));
                }
                created
            };

            let size = i64::try_from(codec.size_in_bytes()).unwrap_or(i64::MAX);
            self.node.require_set(Field::Size, FieldValue::Int(size))?;
            self.set_payload_id(stored)?;
            debug!(id = %self.node.id, payload = %stored, size, "wrote payload");
            Ok(())
        })
    }

    fn delete_file(&self) -> Result<(), FsError> {
        let id = self.node.id;
        let parent = self.node.parent_dir()?.ok_or(FsError::NoParent(id))?;
        parent.update_child_list(ChildOp::Delete(id))?;

        let payload = self.payload_id()?;
        if payload == FsId::INVALID {
            return Err(FsError::InvalidPayloadId(payload));
        }
        if payload.is_valid() {
            let removed = self
                .fs()
                .db()
                .delete(PAYLOAD_TABLE, &Condition::eq(PAYLOAD_ID_COLUMN, payload))?;
            if removed == 0 {
                return Err(FsError::CannotDeleteEntry {
                    table: PAYLOAD_TABLE,
                    id: payload,
                });
            }
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
        debug!(%id, "deleted file");
        Ok(())
    }
}

impl<'fs> FsNode<'fs> for File<'fs> {
    fn handle(&self) -> NodeHandle<'fs> {
        self.node
    }

    fn kind(&self) -> NodeKind {
        NodeKind::File
    }

    fn delete(&self) -> Result<(), FsError> {
        self.fs().scoped_mutation("delete", || self.delete_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::SimpleFileData;
    use crate::store::values;
    use rusqlite::types::Value;

    #[test]
    fn test_first_write_creates_payload_row() {
        let fs = SqlFs::open_in_memory().unwrap();
        let file = fs.root().unwrap().add_file("a.txt").unwrap();
        assert!(!file.has_payload().unwrap());

        file.write_payload(&SimpleFileData::from_text("hello")).unwrap();
        assert!(file.has_payload().unwrap());
        assert_eq!(file.size().unwrap(), 10);

        let mut loaded = SimpleFileData::new();
        file.read_payload(&mut loaded).unwrap();
        assert_eq!(loaded.text(), Some("hello"));
    }

    #[test]
    fn test_rewrite_updates_same_row() {
        let fs = SqlFs::open_in_memory().unwrap();
        let file = fs.root().unwrap().add_file("bin").unwrap();
        file.write_payload(&SimpleFileData::from_text("first")).unwrap();
        let first = file.payload_id().unwrap();

        file.write_payload(&SimpleFileData::from_bytes(vec![1, 2, 3])).unwrap();
        assert_eq!(file.payload_id().unwrap(), first);
        assert_eq!(file.size().unwrap(), 3);

        let mut loaded = SimpleFileData::new();
        file.read_payload(&mut loaded).unwrap();
        assert_eq!(loaded.binary(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_read_before_write_is_invalid_payload() {
        let fs = SqlFs::open_in_memory().unwrap();
        let file = fs.root().unwrap().add_file("empty").unwrap();
        let err = file.read_payload(&mut SimpleFileData::new()).unwrap_err();
        assert!(matches!(err, FsError::InvalidPayloadId(id) if id == FsId::NO_PAYLOAD));
    }

    #[test]
    fn test_missing_slot_refuses_write() {
        let fs = SqlFs::open_in_memory().unwrap();
        let file = fs.root().unwrap().add_file("broken").unwrap();
        file.node
            .require_set(Field::Children, FieldValue::List(RelationList::new()))
            .unwrap();
        assert_eq!(file.payload_id().unwrap(), FsId::INVALID);
        let err = file.write_payload(&SimpleFileData::from_text("x")).unwrap_err();
        assert!(matches!(err, FsError::InvalidPayloadId(_)));
    }

    fn overwrite_slot(fs: &SqlFs, file: &File<'_>, blob: Vec<u8>) {
        fs.db()
            .update(
                NODE_TABLE,
                &values([(Field::Children.column(), Value::Blob(blob))]),
                &Condition::eq(Field::Id.column(), file.id()),
            )
            .unwrap();
    }

    #[test]
    fn test_payload_slot_holds_one_id() {
        let fs = SqlFs::open_in_memory().unwrap();
        let file = fs.root().unwrap().add_file("slot").unwrap();
        let two = RelationList::from_ids(vec![FsId::new(5), FsId::new(6)]);

        let err = file.node.set_relations(two.clone(), Arity::Single).unwrap_err();
        assert!(matches!(err, FsError::RelationArity { entries: 2, .. }));
        assert_eq!(file.payload_id().unwrap(), FsId::NO_PAYLOAD);

        overwrite_slot(&fs, &file, two.encode());
        let err = file.payload_id().unwrap_err();
        assert!(matches!(err, FsError::RelationArity { entries: 2, .. }));
        assert!(file.read_payload(&mut SimpleFileData::new()).is_err());
    }

    #[test]
    fn test_undecodable_slot_reads_as_invalid() {
        let fs = SqlFs::open_in_memory().unwrap();
        let file = fs.root().unwrap().add_file("garbled").unwrap();
        file.write_payload(&SimpleFileData::from_text("data")).unwrap();
        overwrite_slot(&fs, &file, vec![1, 2, 3]);

        assert_eq!(file.payload_id().unwrap(), FsId::INVALID);
        assert!(!file.has_payload().unwrap());
        let err = file.read_payload(&mut SimpleFileData::new()).unwrap_err();
        assert!(matches!(err, FsError::InvalidPayloadId(id) if id == FsId::INVALID));
    }

    #[test]
    fn test_delete_removes_payload_row() {
        let fs = SqlFs::open_in_memory().unwrap();
        let root = fs.root().unwrap();
        let file = root.add_file("gone").unwrap();
        file.write_payload(&SimpleFileData::from_text("bye")).unwrap();

        file.delete().unwrap();
        assert!(!root.contains("gone").unwrap());
        let payloads = fs
            .db()
            .query(PAYLOAD_TABLE, &[], &Condition::new(), None)
            .unwrap();
        assert!(payloads.is_empty());

        // The row is gone, so the parent can no longer be found.
        assert!(matches!(file.delete(), Err(FsError::NoParent(_))));
    }

    #[test]
    fn test_delete_without_payload() {
        let fs = SqlFs::open_in_memory().unwrap();
        let root = fs.root().unwrap();
        root.add_file("never-written").unwrap().delete().unwrap();
        assert_eq!(root.child_count().unwrap(), 0);
    }
}
