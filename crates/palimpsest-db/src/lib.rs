pub mod edit_records;
pub mod edits;
pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod revisions;
mod scope;

pub use error::{DbError, Result};
pub use scope::{ReadScope, ReadTx, WriteTx};

use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn, &path.display().to_string())
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, ":memory:")
    }

    fn init(conn: Connection, label: &str) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", label);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Raw connection access outside any transaction scope.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` inside a read-only transaction.
    pub fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTx<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;

        conn.pragma_update(None, "query_only", true)?;
        let result = run_read(&mut conn, f);
        conn.pragma_update(None, "query_only", false)?;

        result
    }

    /// Runs `f` inside a write transaction. Commits on `Ok`; any `Err`
    /// (or panic) drops the transaction, which rolls it back.
    pub fn write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&WriteTx<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;

        // IMMEDIATE takes the write lock up front so two writers never
        // interleave on the same chain.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&WriteTx::new(&tx))?;
        tx.commit()?;

        Ok(value)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::LockPoisoned(e.to_string()))
    }
}

fn run_read<F, T>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&ReadTx<'_>) -> Result<T>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
    let value = f(&ReadTx::new(&tx))?;
    tx.commit()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_scope_rejects_raw_writes() {
        let db = Database::open_in_memory().unwrap();

        let result = db.read(|tx| {
            use crate::scope::Sealed;
            tx.conn().execute(
                "INSERT INTO interactions (kind, timestamp) VALUES ('info', 1)",
                [],
            )?;
            Ok(())
        });
        assert!(matches!(result, Err(DbError::Storage(_))));

        // The flag is cleared again once the read scope ends.
        db.write(|tx| {
            use crate::scope::Sealed;
            tx.conn().execute(
                "INSERT INTO interactions (kind, timestamp) VALUES ('info', 1)",
                [],
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn failed_write_rolls_back() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.write(|tx| {
            use crate::scope::Sealed;
            tx.conn().execute(
                "INSERT INTO interactions (kind, timestamp) VALUES ('info', 1)",
                [],
            )?;
            Err(DbError::SelfEdit(palimpsest_types::MessageId::new(1)))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM interactions", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
