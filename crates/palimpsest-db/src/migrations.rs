use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS interactions (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            kind        TEXT NOT NULL,
            timestamp   INTEGER NOT NULL,
            author      TEXT,
            body        TEXT,
            inserted_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_interactions_timestamp
            ON interactions(timestamp, author);

        -- No foreign keys: records may outlive a deleted revision until the
        -- deletion flow purges them, and such leftovers must stay visible.
        CREATE TABLE IF NOT EXISTS edit_records (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            latest_revision_id  INTEGER NOT NULL,
            past_revision_id    INTEGER NOT NULL UNIQUE
        );

        CREATE INDEX IF NOT EXISTS idx_edit_records_latest
            ON edit_records(latest_revision_id, past_revision_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
