//! Store handle: opening and bootstrapping a store, absolute-path entry
//! points, info table access, and the lock + transaction pairing every
//! mutation runs under.

use crate::concurrency::{location_key, normalize_location, LockRegistry, PathLock};
use crate::config::StoreOptions;
use crate::error::FsError;
use crate::payload::{table_schema, FileDataCodec, SimpleFileData};
use crate::store::schema::{
    info_columns, node_columns, Field, InfoField, EXPECTED_TABLES, INFO_NAME_COLUMN, INFO_TABLE,
    INFO_VALUE_COLUMN, NODE_TABLE, PAYLOAD_TABLE, ROOT_NAME,
};
use crate::store::{values, Condition, Database, TransactionScope};
use crate::time::{now_file_time, readable_utc};
use crate::tree::path::{strip_absolute, SEPARATOR};
use crate::tree::{Directory, File, Node};
use crate::types::{FsId, NodeKind};
use chrono::Utc;
use rusqlite::types::Value;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Format version written to new stores
pub const FORMAT_VERSION: &str = "0.10.0";

/// Tracks how deep the current thread is inside `scoped_mutation`.
struct DepthGuard<'a>(&'a Cell<u32>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Handle on one store
///
/// Nodes borrow the handle, so they cannot outlive it. A handle is used from
/// one thread at a time; open another handle on the same location for
/// concurrent access. Handles on one location share a [`PathLock`].
pub struct SqlFs {
    db: Database,
    location: Option<PathBuf>,
    registry: Arc<LockRegistry>,
    lock: Arc<PathLock>,
    options: StoreOptions,
    tx_depth: Cell<u32>,
    newly_created: bool,
    released: bool,
}

impl SqlFs {
    /// Open or create a store with the default payload codec and options.
    pub fn open(location: impl AsRef<Path>, registry: &Arc<LockRegistry>) -> Result<Self, FsError> {
        Self::open_with(
            location,
            registry,
            &SimpleFileData::new(),
            StoreOptions::default(),
        )
    }

    /// Open or create a store.
    ///
    /// A file holding only some of the expected tables is renamed aside as a
    /// timestamped backup and a fresh store is created in its place (unless
    /// `options.backup_partial_store` is off, in which case opening fails).
    pub fn open_with(
        location: impl AsRef<Path>,
        registry: &Arc<LockRegistry>,
        codec: &dyn FileDataCodec,
        options: StoreOptions,
    ) -> Result<Self, FsError> {
        let normalized = normalize_location(location.as_ref())?;
        let key = location_key(&normalized);
        let lock = registry.acquire(&key);
        let held = Arc::clone(&lock);
        let _guard = held.lock();

        let db = match open_database(&normalized, &options) {
            Ok(db) => db,
            Err(err) => {
                registry.release(&lock);
                return Err(err);
            }
        };
        let mut fs = SqlFs {
            db,
            location: Some(normalized),
            registry: Arc::clone(registry),
            lock,
            options,
            tx_depth: Cell::new(0),
            newly_created: false,
            released: false,
        };
        fs.newly_created = fs.bootstrap(codec)?;
        info!(
            location = %fs.location.as_deref().unwrap_or(Path::new("")).display(),
            created = fs.newly_created,
            "store opened"
        );
        Ok(fs)
    }

    /// Private in-memory store with its own lock registry.
    pub fn open_in_memory() -> Result<Self, FsError> {
        Self::open_in_memory_with(StoreOptions::default())
    }

    pub fn open_in_memory_with(options: StoreOptions) -> Result<Self, FsError> {
        let registry = LockRegistry::shared();
        let lock = registry.acquire(&registry.anonymous_key());
        let mut fs = SqlFs {
            db: Database::open_in_memory()?,
            location: None,
            registry,
            lock,
            options,
            tx_depth: Cell::new(0),
            newly_created: false,
            released: false,
        };
        fs.newly_created = fs.bootstrap(&SimpleFileData::new())?;
        Ok(fs)
    }

    /// Release this handle's lock reference and connection.
    pub fn close(mut self) {
        self.release_lock();
        info!(key = self.lock.key(), "store closed");
    }

    fn release_lock(&mut self) {
        if !self.released {
            self.registry.release(&self.lock);
            self.released = true;
        }
    }

    fn bootstrap(&self, codec: &dyn FileDataCodec) -> Result<bool, FsError> {
        self.scoped_mutation("bootstrap", || {
            let present = present_tables(&self.db)?;
            if present == EXPECTED_TABLES.len() {
                self.check_id_width()?;
                return Ok(false);
            }
            if present != 0 {
                return Err(FsError::CannotOpen {
                    location: self.describe_location(),
                    reason: format!(
                        "store holds {} of {} expected tables",
                        present,
                        EXPECTED_TABLES.len()
                    ),
                });
            }

            self.db.create_table(NODE_TABLE, &node_columns())?;
            self.db.create_table(PAYLOAD_TABLE, &table_schema(codec))?;
            self.db.create_table(INFO_TABLE, &info_columns())?;
            self.create_root()?;

            let bootstrap_info = [
                (InfoField::Version, FORMAT_VERSION.to_string()),
                (InfoField::CreateTimeUtc, readable_utc(Utc::now())),
                (InfoField::Label, self.options.label.clone()),
                (InfoField::IdSize, FsId::WIDTH.to_string()),
            ];
            for (field, value) in bootstrap_info {
                self.write_info(field.as_str(), &value)?;
            }
            info!(location = %self.describe_location(), "created store tables");
            Ok(true)
        })
    }

    fn create_root(&self) -> Result<(), FsError> {
        let now = now_file_time();
        let row = values([
            (Field::Id.column(), FsId::ROOT.into()),
            (Field::Kind.column(), Value::Integer(NodeKind::Dir.code())),
            (Field::CreatedAt.column(), Value::Integer(now)),
            (Field::ModifiedAt.column(), Value::Integer(now)),
            (Field::Size.column(), Value::Integer(0)),
            (Field::Name.column(), Value::Text(ROOT_NAME.to_string())),
            (Field::Parent.column(), FsId::ROOT_PARENT.into()),
        ]);
        self.db.insert(NODE_TABLE, &row)?;
        if self.db.last_insert_id() != FsId::ROOT {
            return Err(FsError::RootUnavailable);
        }
        Ok(())
    }

    fn check_id_width(&self) -> Result<(), FsError> {
        match self.info(InfoField::IdSize)? {
            Some(stored) if stored.trim() != FsId::WIDTH.to_string() => Err(FsError::IdWidthMismatch {
                stored,
                expected: FsId::WIDTH,
            }),
            Some(_) => Ok(()),
            None => {
                warn!(location = %self.describe_location(), "store does not record its id width");
                Ok(())
            }
        }
    }

    fn describe_location(&self) -> String {
        match &self.location {
            Some(path) => path.display().to_string(),
            None => self.lock.key().to_string(),
        }
    }

    /// Run `f` while holding the location lock, without a transaction.
    pub fn with_lock<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.lock.lock();
        f()
    }

    /// Run `step` under the location lock inside one transaction. Commits
    /// only if `step` succeeds. Calls nested inside another scoped mutation
    /// on this handle join the outer transaction.
    pub(crate) fn scoped_mutation<T>(
        &self,
        op: &'static str,
        step: impl FnOnce() -> Result<T, FsError>,
    ) -> Result<T, FsError> {
        let _guard = self.lock.lock();
        if self.tx_depth.get() > 0 {
            let _depth = DepthGuard::enter(&self.tx_depth);
            return step();
        }

        let mut scope = TransactionScope::begin(self.db.conn())?;
        let outcome = {
            let _depth = DepthGuard::enter(&self.tx_depth);
            step()
        };
        match outcome {
            Ok(value) => {
                scope.mark_success();
                scope.finish()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = scope.finish() {
                    warn!(op, error = %rollback, "rollback failed");
                }
                debug!(op, error = %err, "mutation aborted");
                Err(err)
            }
        }
    }

    /// Run several operations as one serialized, all-or-nothing unit.
    pub fn atomically<T>(&self, f: impl FnOnce(&Self) -> Result<T, FsError>) -> Result<T, FsError> {
        self.scoped_mutation("atomically", || f(self))
    }

    pub fn root(&self) -> Result<Directory<'_>, FsError> {
        match self.node_by_id(FsId::ROOT)? {
            Some(Node::Dir(root)) => Ok(root),
            _ => Err(FsError::RootUnavailable),
        }
    }

    /// Materialize any node from its identifier. `None` when no such row exists.
    pub fn node_by_id(&self, id: FsId) -> Result<Option<Node<'_>>, FsError> {
        let row = self.with_lock(|| {
            self.db.query_one(
                NODE_TABLE,
                &[Field::Id.column(), Field::Kind.column()],
                &Condition::eq(Field::Id.column(), id),
            )
        })?;
        Ok(row.and_then(|r| Node::from_record(self, &r)))
    }

    /// Resolve an absolute path. `/` alone is the root.
    pub fn resolve(&self, path: &str) -> Result<Node<'_>, FsError> {
        let relative = strip_absolute(path)?;
        let root = self.root()?;
        if relative.is_empty() {
            return Ok(Node::Dir(root));
        }
        root.resolve(relative)
    }

    pub fn resolve_dir(&self, path: &str) -> Result<Directory<'_>, FsError> {
        let relative = strip_absolute(path)?;
        let root = self.root()?;
        if relative.is_empty() {
            return Ok(root);
        }
        root.resolve_dir(relative)
    }

    pub fn resolve_file(&self, path: &str) -> Result<File<'_>, FsError> {
        if path.len() > 1 && path.ends_with(SEPARATOR) {
            return Err(FsError::MustNotStartOrEndWithSeparator(path.to_string()));
        }
        let relative = strip_absolute(path)?;
        if relative.is_empty() {
            return Err(FsError::ChildNotFound(path.to_string()));
        }
        self.root()?.resolve_file(relative)
    }

    /// Whether an absolute path names an existing node. Malformed paths are errors.
    pub fn exists(&self, path: &str) -> Result<bool, FsError> {
        match self.resolve(path) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Value of an info entry, `None` if absent.
    pub fn get_info(&self, name: &str) -> Result<Option<String>, FsError> {
        self.with_lock(|| {
            let row = self
                .db
                .query_one(
                    INFO_TABLE,
                    &[INFO_VALUE_COLUMN],
                    &Condition::eq(INFO_NAME_COLUMN, name.to_string()),
                )
                .map_err(|e| FsError::ReadInfo {
                    name: name.to_string(),
                    source: Box::new(e),
                })?;
            Ok(row.and_then(|r| r.text(INFO_VALUE_COLUMN).map(str::to_string)))
        })
    }

    pub fn info(&self, field: InfoField) -> Result<Option<String>, FsError> {
        self.get_info(field.as_str())
    }

    /// Update or insert an info entry.
    pub fn set_info(&self, name: &str, value: &str) -> Result<(), FsError> {
        self.scoped_mutation("set info", || self.write_info(name, value))
    }

    fn write_info(&self, name: &str, value: &str) -> Result<(), FsError> {
        let wrap = |e: FsError| FsError::WriteInfo {
            name: name.to_string(),
            source: Box::new(e),
        };
        let row = values([(INFO_VALUE_COLUMN, Value::Text(value.to_string()))]);
        let cond = Condition::eq(INFO_NAME_COLUMN, name.to_string());
        let updated = self.db.update(INFO_TABLE, &row, &cond).map_err(wrap)?;
        if updated == 0 {
            let row = values([
                (INFO_NAME_COLUMN, Value::Text(name.to_string())),
                (INFO_VALUE_COLUMN, Value::Text(value.to_string())),
            ]);
            self.db.insert(INFO_TABLE, &row).map_err(wrap)?;
        }
        debug!(name, value, "info written");
        Ok(())
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Normalized store path; `None` for in-memory stores
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Registry key of this handle's lock
    pub fn lock_key(&self) -> &str {
        self.lock.key()
    }

    /// Whether opening this handle created the store tables
    pub fn is_newly_created(&self) -> bool {
        self.newly_created
    }
}

impl Drop for SqlFs {
    fn drop(&mut self) {
        self.release_lock();
    }
}

/// Open the database file, moving a partially initialized store aside first.
fn open_database(location: &Path, options: &StoreOptions) -> Result<Database, FsError> {
    let timeout = Duration::from_millis(options.busy_timeout_ms);
    let db = Database::open(location, timeout)?;
    let present = present_tables(&db)?;
    if present == 0 || present == EXPECTED_TABLES.len() || !options.backup_partial_store {
        return Ok(db);
    }

    drop(db);
    let backup = backup_location(location);
    std::fs::rename(location, &backup)?;
    warn!(
        location = %location.display(),
        backup = %backup.display(),
        present,
        "partial store moved aside"
    );
    Database::open(location, timeout)
}

fn present_tables(db: &Database) -> Result<usize, FsError> {
    let names = db.table_names()?;
    Ok(EXPECTED_TABLES
        .iter()
        .filter(|expected| names.iter().any(|n| n.eq_ignore_ascii_case(expected)))
        .count())
}

/// Sibling path stamped with the current UTC time, e.g. `store-20240102-030405.db`
fn backup_location(location: &Path) -> PathBuf {
    let stem = location
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let mut backup = location.with_file_name(format!("{}-{}.db", stem, stamp));
    let mut n = 1;
    while backup.exists() {
        backup = location.with_file_name(format!("{}-{}-{}.db", stem, stamp, n));
        n += 1;
    }
    backup
}
