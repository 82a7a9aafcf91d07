//! The edit record table.
//!
//! Every record of a chain carries the chain's current head in
//! `latest_revision_id`, so a whole history is one indexed equality scan.
//! The head rewrite and the insert that advance a chain are only exposed
//! together, through `revisions::append_edit`.

use palimpsest_types::{EditRecord, EditRecordId, MessageId};
use rusqlite::Connection;

use crate::error::Result;
use crate::models::{EDIT_RECORD_COLUMNS, EditRecordRow};
use crate::queries::OptionalExt;
use crate::scope::{ReadScope, Sealed, WriteTx};

/// All records whose head is `head`, most recent edit first.
pub fn records_for_head(tx: &impl ReadScope, head: MessageId) -> Result<Vec<EditRecord>> {
    collect_records(
        tx.conn(),
        &format!(
            "SELECT {EDIT_RECORD_COLUMNS} FROM edit_records
             WHERE latest_revision_id = ?1
             ORDER BY past_revision_id DESC"
        ),
        head,
    )
}

/// The record commemorating `past`, if `past` was ever superseded.
pub fn record_for_past(tx: &impl ReadScope, past: MessageId) -> Result<Option<EditRecord>> {
    let row = tx
        .conn()
        .query_row(
            &format!(
                "SELECT {EDIT_RECORD_COLUMNS} FROM edit_records
                 WHERE past_revision_id = ?1
                 LIMIT 1"
            ),
            [past.get()],
            EditRecordRow::from_row,
        )
        .optional()?;

    Ok(row.map(EditRecord::from))
}

/// Every record touching the chain that `revision` belongs to: records
/// naming it as head or as past revision, plus the rest of its chain when
/// it is a past revision. One statement, so both arms see the same
/// snapshot.
pub fn records_touching(tx: &impl ReadScope, revision: MessageId) -> Result<Vec<EditRecord>> {
    collect_records(
        tx.conn(),
        &format!(
            "SELECT {EDIT_RECORD_COLUMNS} FROM edit_records
             WHERE latest_revision_id = ?1
                OR past_revision_id = ?1
                OR latest_revision_id = (
                    SELECT latest_revision_id FROM edit_records
                    WHERE past_revision_id = ?1
                )
             ORDER BY past_revision_id DESC"
        ),
        revision,
    )
}

pub fn count_for_head(tx: &impl ReadScope, head: MessageId) -> Result<u64> {
    let count = tx.conn().query_row(
        "SELECT COUNT(*) FROM edit_records WHERE latest_revision_id = ?1",
        [head.get()],
        |row| row.get::<_, u64>(0),
    )?;

    Ok(count)
}

/// Records that name an interaction row which no longer exists.
pub fn orphaned_records(tx: &impl ReadScope) -> Result<Vec<EditRecord>> {
    let mut stmt = tx.conn().prepare(&format!(
        "SELECT {EDIT_RECORD_COLUMNS} FROM edit_records e
         WHERE NOT EXISTS (SELECT 1 FROM interactions i WHERE i.id = e.latest_revision_id)
            OR NOT EXISTS (SELECT 1 FROM interactions i WHERE i.id = e.past_revision_id)
         ORDER BY e.id"
    ))?;

    let rows = stmt
        .query_map([], EditRecordRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().map(EditRecord::from).collect())
}

pub fn delete_record(tx: &WriteTx<'_>, id: EditRecordId) -> Result<bool> {
    let removed = tx
        .conn()
        .execute("DELETE FROM edit_records WHERE id = ?1", [id.get()])?;
    Ok(removed > 0)
}

/// Repoints every record of the chain headed by `old_head` at `new_head`.
/// Returns the number of records rewritten.
pub(crate) fn rewrite_head(
    tx: &WriteTx<'_>,
    old_head: MessageId,
    new_head: MessageId,
) -> Result<usize> {
    let rewritten = tx.conn().execute(
        "UPDATE edit_records SET latest_revision_id = ?1 WHERE latest_revision_id = ?2",
        [new_head.get(), old_head.get()],
    )?;
    Ok(rewritten)
}

pub(crate) fn insert_record(
    tx: &WriteTx<'_>,
    latest: MessageId,
    past: MessageId,
) -> Result<EditRecord> {
    let row = tx.conn().query_row(
        &format!(
            "INSERT INTO edit_records (latest_revision_id, past_revision_id) VALUES (?1, ?2)
             RETURNING {EDIT_RECORD_COLUMNS}"
        ),
        [latest.get(), past.get()],
        EditRecordRow::from_row,
    )?;

    Ok(row.into())
}

fn collect_records(conn: &Connection, sql: &str, id: MessageId) -> Result<Vec<EditRecord>> {
    let mut stmt = conn.prepare_cached(sql)?;

    let rows = stmt
        .query_map([id.get()], EditRecordRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().map(EditRecord::from).collect())
}
