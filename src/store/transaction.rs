//! Transaction scope over the backing store
//!
//! Begins on construction. Commits only if [`TransactionScope::mark_success`]
//! was called before [`TransactionScope::finish`]; every other exit path,
//! including dropping the scope early, rolls back.

use crate::error::FsError;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

pub struct TransactionScope<'c> {
    tx: Transaction<'c>,
    succeeded: bool,
}

impl<'c> TransactionScope<'c> {
    pub fn begin(conn: &'c Connection) -> Result<Self, FsError> {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
            .map_err(|e| FsError::store("begin", e))?;
        debug!("transaction begun");
        Ok(Self {
            tx,
            succeeded: false,
        })
    }

    pub fn mark_success(&mut self) {
        self.succeeded = true;
    }

    /// Commit if marked successful, else roll back. Consumes the scope so it runs once.
    pub fn finish(self) -> Result<bool, FsError> {
        if self.succeeded {
            self.tx.commit().map_err(|e| FsError::store("commit", e))?;
            debug!("transaction committed");
            Ok(true)
        } else {
            self.tx
                .rollback()
                .map_err(|e| FsError::store("rollback", e))?;
            debug!("transaction rolled back");
            Ok(false)
        }
    }
}
