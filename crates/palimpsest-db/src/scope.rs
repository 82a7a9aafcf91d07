use rusqlite::Connection;

use crate::error::Result;

/// Grants read access to the store. Implemented by both transaction
/// kinds; cannot be implemented outside this crate.
pub trait ReadScope: Sealed {}

pub trait Sealed {
    fn conn(&self) -> &Connection;
}

/// A read-only transaction. Opened by [`crate::Database::read`].
///
/// The connection runs with `query_only` set for the lifetime of the scope,
/// so a write through it fails instead of being committed. Mutating
/// operations take a [`WriteTx`] and do not accept a read scope at all:
///
/// ```compile_fail
/// use palimpsest_db::{Database, revisions};
/// use palimpsest_types::MessageId;
///
/// let db = Database::open_in_memory().unwrap();
/// db.read(|tx| revisions::append_edit(tx, MessageId::new(1), MessageId::new(2)))
///     .unwrap();
/// ```
pub struct ReadTx<'a> {
    conn: &'a Connection,
}

/// A read-write transaction. Opened by [`crate::Database::write`]; commits
/// when the closure returns `Ok`, rolls back otherwise.
pub struct WriteTx<'a> {
    conn: &'a Connection,
}

impl<'a> ReadTx<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl<'a> WriteTx<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Runs `f` under a savepoint: either every statement it issued is kept
    /// or none is, even if the caller swallows the error and commits.
    pub(crate) fn atomically<T>(&self, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.conn.execute_batch(&format!("SAVEPOINT {name}"))?;
        match f() {
            Ok(value) => {
                self.conn.execute_batch(&format!("RELEASE {name}"))?;
                Ok(value)
            }
            Err(e) => {
                self.conn
                    .execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))?;
                Err(e)
            }
        }
    }
}

impl Sealed for ReadTx<'_> {
    fn conn(&self) -> &Connection {
        self.conn
    }
}

impl Sealed for WriteTx<'_> {
    fn conn(&self) -> &Connection {
        self.conn
    }
}

impl ReadScope for ReadTx<'_> {}
impl ReadScope for WriteTx<'_> {}
