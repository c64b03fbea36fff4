//! Ordered relation list stored in a node's child-list column
//!
//! Directories keep their children here (0..N entries, insertion order).
//! Files keep exactly one slot: the payload row id, or [`FsId::NO_PAYLOAD`].
//! The column holds `count × FsId::WIDTH` little-endian bytes, or NULL when empty.

use crate::error::FsError;
use crate::types::{FsId, NodeKind};

/// Allowed number of entries for a node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Many,
    Single,
}

impl Arity {
    pub fn of(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Dir => Arity::Many,
            NodeKind::File => Arity::Single,
        }
    }
}

/// Edit applied to a relation list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOp {
    /// Append if absent
    Add(FsId),
    /// Swap `old` for `new` at its position
    Replace { old: FsId, new: FsId },
    /// Remove the first occurrence
    Delete(FsId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationList {
    ids: Vec<FsId>,
}

impl RelationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-slot list used by files
    pub fn single(id: FsId) -> Self {
        Self { ids: vec![id] }
    }

    pub fn from_ids(ids: Vec<FsId>) -> Self {
        Self { ids }
    }

    pub fn ids(&self) -> &[FsId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn first(&self) -> Option<FsId> {
        self.ids.first().copied()
    }

    pub fn contains(&self, id: FsId) -> bool {
        self.ids.contains(&id)
    }

    pub fn fits(&self, arity: Arity) -> bool {
        match arity {
            Arity::Many => true,
            Arity::Single => self.ids.len() <= 1,
        }
    }

    /// Apply an edit. Returns false when nothing changed.
    pub fn apply(&mut self, op: ChildOp) -> bool {
        match op {
            ChildOp::Add(id) => {
                if self.ids.contains(&id) {
                    return false;
                }
                self.ids.push(id);
                true
            }
            ChildOp::Replace { old, new } => match self.ids.iter().position(|i| *i == old) {
                Some(pos) => {
                    self.ids[pos] = new;
                    true
                }
                None => false,
            },
            ChildOp::Delete(id) => match self.ids.iter().position(|i| *i == id) {
                Some(pos) => {
                    self.ids.remove(pos);
                    true
                }
                None => false,
            },
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(self.ids.len() * FsId::WIDTH);
        for id in &self.ids {
            id.write_le(&mut blob);
        }
        blob
    }

    /// Decode a child-list blob. A length that is not a multiple of the id width is corruption.
    pub fn decode(blob: &[u8]) -> Result<Self, FsError> {
        if blob.len() % FsId::WIDTH != 0 {
            return Err(FsError::CorruptChildList {
                len: blob.len(),
                width: FsId::WIDTH,
            });
        }
        let ids = blob
            .chunks_exact(FsId::WIDTH)
            .filter_map(FsId::read_le)
            .collect();
        Ok(Self { ids })
    }

    /// Entry count of an encoded blob without decoding it
    pub fn count_encoded(blob: &[u8]) -> Result<usize, FsError> {
        if blob.len() % FsId::WIDTH != 0 {
            return Err(FsError::CorruptChildList {
                len: blob.len(),
                width: FsId::WIDTH,
            });
        }
        Ok(blob.len() / FsId::WIDTH)
    }
}
