//! Backing relational store
//!
//! A thin adapter over a SQLite connection exposing the operations the tree
//! engine needs: table creation, row queries with an equality-conjunction
//! condition, insert, update, delete and last-inserted-id. Failures are logged
//! here and translated into [`FsError::Store`].

pub mod schema;
pub mod transaction;

use crate::error::FsError;
use crate::types::FsId;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub use transaction::TransactionScope;

/// Column name and SQL type used for table creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// Conjunction of `column = value` terms
#[derive(Debug, Clone, Default)]
pub struct Condition {
    terms: Vec<(String, Value)>,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-term condition
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::new().and(column, value)
    }

    pub fn and(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.terms.push((column.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn render(&self) -> String {
        if self.terms.is_empty() {
            return String::new();
        }
        let clauses: Vec<String> = self
            .terms
            .iter()
            .map(|(column, _)| format!("{} = ?", quote(column)))
            .collect();
        format!(" WHERE {}", clauses.join(" AND "))
    }

    fn values(&self) -> impl Iterator<Item = &Value> {
        self.terms.iter().map(|(_, v)| v)
    }
}

/// One fetched row: column names with their values
#[derive(Debug, Clone, Default)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn int(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn blob(&self, column: &str) -> Option<&[u8]> {
        match self.get(column)? {
            Value::Blob(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn is_null(&self, column: &str) -> bool {
        matches!(self.get(column), None | Some(Value::Null))
    }
}

impl From<FsId> for Value {
    fn from(id: FsId) -> Self {
        Value::Integer(id.get())
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn store_err(op: &'static str, err: rusqlite::Error) -> FsError {
    debug!(op, error = %err, "store call failed");
    FsError::store(op, err)
}

/// Connection to the backing store
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, FsError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(|e| FsError::CannotOpen {
            location: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::init(conn, busy_timeout)
    }

    pub fn open_in_memory() -> Result<Self, FsError> {
        let conn = Connection::open_in_memory().map_err(|e| FsError::CannotOpen {
            location: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        Self::init(conn, Duration::ZERO)
    }

    fn init(conn: Connection, busy_timeout: Duration) -> Result<Self, FsError> {
        conn.busy_timeout(busy_timeout)
            .map_err(|e| store_err("busy_timeout", e))?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Create a table if it does not exist yet.
    pub fn create_table(&self, table: &str, columns: &[ColumnDef]) -> Result<(), FsError> {
        let cols: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", quote(&c.name), c.sql_type))
            .collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote(table),
            cols.join(", ")
        );
        debug!(table, "create table");
        self.conn
            .execute(&sql, [])
            .map(|_| ())
            .map_err(|e| store_err("create table", e))
    }

    /// Names of all user tables
    pub fn table_names(&self) -> Result<Vec<String>, FsError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
            .map_err(|e| store_err("list tables", e))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| store_err("list tables", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| store_err("list tables", e))?;
        Ok(names)
    }

    /// Fetch rows. An empty `columns` slice selects every column.
    pub fn query(
        &self,
        table: &str,
        columns: &[&str],
        cond: &Condition,
        order_by: Option<&str>,
    ) -> Result<Vec<Record>, FsError> {
        let projection = if columns.is_empty() {
            "*".to_string()
        } else {
            columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ")
        };
        let mut sql = format!("SELECT {} FROM {}{}", projection, quote(table), cond.render());
        if let Some(order) = order_by {
            sql.push_str(&format!(" ORDER BY {}", quote(order)));
        }

        let mut stmt = self.conn.prepare(&sql).map_err(|e| store_err("query", e))?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let width = names.len();
        let rows = stmt
            .query_map(params_from_iter(cond.values()), |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|e| store_err("query", e))?;

        let mut records = Vec::new();
        for row in rows {
            let values = row.map_err(|e| store_err("query", e))?;
            records.push(Record {
                columns: names.clone(),
                values,
            });
        }
        Ok(records)
    }

    /// First matching row, if any
    pub fn query_one(
        &self,
        table: &str,
        columns: &[&str],
        cond: &Condition,
    ) -> Result<Option<Record>, FsError> {
        Ok(self.query(table, columns, cond, None)?.into_iter().next())
    }

    /// Insert one row, returning the number of rows inserted.
    pub fn insert(&self, table: &str, values: &[(String, Value)]) -> Result<usize, FsError> {
        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote(table))
        } else {
            let cols: Vec<String> = values.iter().map(|(c, _)| quote(c)).collect();
            let marks = vec!["?"; values.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(table),
                cols.join(", "),
                marks
            )
        };
        self.conn
            .execute(&sql, params_from_iter(values.iter().map(|(_, v)| v)))
            .map_err(|e| store_err("insert", e))
    }

    /// Update matching rows, returning the affected count.
    pub fn update(
        &self,
        table: &str,
        values: &[(String, Value)],
        cond: &Condition,
    ) -> Result<usize, FsError> {
        if values.is_empty() {
            return Ok(0);
        }
        let sets: Vec<String> = values
            .iter()
            .map(|(c, _)| format!("{} = ?", quote(c)))
            .collect();
        let sql = format!(
            "UPDATE {} SET {}{}",
            quote(table),
            sets.join(", "),
            cond.render()
        );
        let params = values.iter().map(|(_, v)| v).chain(cond.values());
        self.conn
            .execute(&sql, params_from_iter(params))
            .map_err(|e| store_err("update", e))
    }

    /// Delete matching rows, returning the affected count.
    pub fn delete(&self, table: &str, cond: &Condition) -> Result<usize, FsError> {
        let sql = format!("DELETE FROM {}{}", quote(table), cond.render());
        self.conn
            .execute(&sql, params_from_iter(cond.values()))
            .map_err(|e| store_err("delete", e))
    }

    /// Row id assigned by the most recent successful insert on this connection
    pub fn last_insert_id(&self) -> FsId {
        FsId::from_i64(self.conn.last_insert_rowid())
    }
}

/// Build an owned column/value list for insert and update calls.
pub fn values<const N: usize>(pairs: [(&str, Value); N]) -> Vec<(String, Value)> {
    pairs
        .into_iter()
        .map(|(c, v)| (c.to_string(), v))
        .collect()
}
