//! rusqlite-backed executor.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, Transaction};
use serde_json::{Number, Value};

use super::{Executor, ReadSession, Record};
use crate::error::QueryResult;
use crate::sql::Dialect;

/// Executes compiled queries against a SQLite database.
pub struct SqliteExecutor {
    conn: Connection,
}

impl SqliteExecutor {
    pub fn open(path: impl AsRef<Path>) -> QueryResult<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> QueryResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Executor for SqliteExecutor {
    type Session<'a> = SqliteSession<'a>;

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn begin_read(&self) -> QueryResult<SqliteSession<'_>> {
        Ok(SqliteSession {
            tx: self.conn.unchecked_transaction()?,
        })
    }
}

/// All queries of one request, inside one transaction.
pub struct SqliteSession<'conn> {
    tx: Transaction<'conn>,
}

impl ReadSession for SqliteSession<'_> {
    fn fetch(&mut self, sql: &str) -> QueryResult<Vec<Record>> {
        let mut stmt = self.tx.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), to_json(row.get_ref(idx)?));
            }
            records.push(record);
        }
        Ok(records)
    }

    fn fetch_count(&mut self, sql: &str) -> QueryResult<u64> {
        let count: i64 = self.tx.query_row(sql, [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn finish(self) -> QueryResult<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::from(n),
        // NaN and infinities have no JSON form.
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
