use palimpsest_types::{AuthorIdentity, Interaction, Message, MessageId, NewInteraction};
use rusqlite::Connection;

use crate::error::{DbError, Result};
use crate::models::{INTERACTION_COLUMNS, InteractionRow, author_column};
use crate::scope::{ReadScope, Sealed, WriteTx};

// -- Interactions --

pub fn insert_interaction(tx: &WriteTx<'_>, new: &NewInteraction) -> Result<Interaction> {
    let timestamp =
        i64::try_from(new.timestamp).map_err(|_| DbError::TimestampOutOfRange(new.timestamp))?;

    let row = tx.conn().query_row(
        &format!(
            "INSERT INTO interactions (kind, timestamp, author, body) VALUES (?1, ?2, ?3, ?4)
             RETURNING {INTERACTION_COLUMNS}"
        ),
        rusqlite::params![
            new.kind.as_str(),
            timestamp,
            author_column(&new.author),
            new.body
        ],
        InteractionRow::from_row,
    )?;

    row.into_interaction()
}

pub fn interaction_by_id(tx: &impl ReadScope, id: MessageId) -> Result<Option<Interaction>> {
    query_interaction_by_id(tx.conn(), id)
}

/// Convenience over [`interaction_by_id`] for callers that only care about
/// editable rows. Non-message rows read as `None`.
pub fn message_by_id(tx: &impl ReadScope, id: MessageId) -> Result<Option<Message>> {
    Ok(interaction_by_id(tx, id)?.and_then(Interaction::into_message))
}

/// First interaction in store order with exactly this timestamp and author.
/// A local author matches only NULL-author rows.
pub fn interaction_by_timestamp_author(
    tx: &impl ReadScope,
    timestamp: i64,
    author: &AuthorIdentity,
) -> Result<Option<Interaction>> {
    let conn = tx.conn();
    let row = match author_column(author) {
        None => conn
            .query_row(
                &format!(
                    "SELECT {INTERACTION_COLUMNS} FROM interactions
                     WHERE timestamp = ?1 AND author IS NULL
                     ORDER BY id
                     LIMIT 1"
                ),
                [timestamp],
                InteractionRow::from_row,
            )
            .optional()?,
        Some(remote) => conn
            .query_row(
                &format!(
                    "SELECT {INTERACTION_COLUMNS} FROM interactions
                     WHERE timestamp = ?1 AND author = ?2
                     ORDER BY id
                     LIMIT 1"
                ),
                rusqlite::params![timestamp, remote],
                InteractionRow::from_row,
            )
            .optional()?,
    };

    row.map(InteractionRow::into_interaction).transpose()
}

/// Removes one interaction row. Returns false if it was already gone.
pub fn delete_interaction(tx: &WriteTx<'_>, id: MessageId) -> Result<bool> {
    let removed = tx
        .conn()
        .execute("DELETE FROM interactions WHERE id = ?1", [id.get()])?;
    Ok(removed > 0)
}

fn query_interaction_by_id(conn: &Connection, id: MessageId) -> Result<Option<Interaction>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {INTERACTION_COLUMNS} FROM interactions WHERE id = ?1"
    ))?;

    let row = stmt
        .query_row([id.get()], InteractionRow::from_row)
        .optional()?;

    row.map(InteractionRow::into_interaction).transpose()
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
