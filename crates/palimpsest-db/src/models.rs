//! Database row types. These map directly to SQLite rows.
//! Conversion into palimpsest-types models validates every column, so a
//! malformed row surfaces as `DbError::CorruptRow` instead of a panic.

use palimpsest_types::{
    AuthorIdentity, EditRecord, EditRecordId, Interaction, InteractionKind, Message, MessageId,
    MessageKind, Notice,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::error::{DbError, Result};

pub(crate) const INTERACTION_COLUMNS: &str = "id, kind, timestamp, author, body, inserted_at";
pub(crate) const EDIT_RECORD_COLUMNS: &str = "id, latest_revision_id, past_revision_id";

pub struct InteractionRow {
    pub id: i64,
    pub kind: String,
    pub timestamp: i64,
    pub author: Option<String>,
    pub body: Option<String>,
    pub inserted_at: String,
}

pub struct EditRecordRow {
    pub id: i64,
    pub latest_revision_id: i64,
    pub past_revision_id: i64,
}

impl InteractionRow {
    /// Expects the columns in `INTERACTION_COLUMNS` order.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            timestamp: row.get(2)?,
            author: row.get(3)?,
            body: row.get(4)?,
            inserted_at: row.get(5)?,
        })
    }

    pub fn into_interaction(self) -> Result<Interaction> {
        let kind: InteractionKind = self.kind.parse().map_err(|_| DbError::CorruptRow {
            column: "kind",
            value: self.kind.clone(),
        })?;
        let timestamp = u64::try_from(self.timestamp).map_err(|_| DbError::CorruptRow {
            column: "timestamp",
            value: self.timestamp.to_string(),
        })?;
        let id = MessageId::new(self.id);

        let interaction = match kind {
            InteractionKind::IncomingMessage => {
                Interaction::Message(self.into_message(id, MessageKind::Incoming, timestamp)?)
            }
            InteractionKind::OutgoingMessage => {
                Interaction::Message(self.into_message(id, MessageKind::Outgoing, timestamp)?)
            }
            InteractionKind::Info => Interaction::Info(self.into_notice(id, timestamp)),
            InteractionKind::Call => Interaction::Call(self.into_notice(id, timestamp)),
        };

        Ok(interaction)
    }

    fn into_message(self, id: MessageId, kind: MessageKind, timestamp: u64) -> Result<Message> {
        Ok(Message {
            id,
            kind,
            timestamp,
            author: parse_author(self.author)?,
            body: self.body,
            inserted_at: self.inserted_at,
        })
    }

    fn into_notice(self, id: MessageId, timestamp: u64) -> Notice {
        Notice {
            id,
            timestamp,
            body: self.body,
            inserted_at: self.inserted_at,
        }
    }
}

impl EditRecordRow {
    /// Expects the columns in `EDIT_RECORD_COLUMNS` order.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            latest_revision_id: row.get(1)?,
            past_revision_id: row.get(2)?,
        })
    }
}

impl From<EditRecordRow> for EditRecord {
    fn from(row: EditRecordRow) -> Self {
        EditRecord {
            id: EditRecordId::new(row.id),
            latest_revision_id: MessageId::new(row.latest_revision_id),
            past_revision_id: MessageId::new(row.past_revision_id),
        }
    }
}

fn parse_author(raw: Option<String>) -> Result<AuthorIdentity> {
    match raw {
        None => Ok(AuthorIdentity::Local),
        Some(text) => match text.parse::<Uuid>() {
            Ok(id) => Ok(AuthorIdentity::Remote(id)),
            Err(_) => Err(DbError::CorruptRow {
                column: "author",
                value: text,
            }),
        },
    }
}

/// Column value for an author. Local authors are stored as NULL.
pub(crate) fn author_column(author: &AuthorIdentity) -> Option<String> {
    author.remote_id().map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str, timestamp: i64, author: Option<&str>) -> InteractionRow {
        InteractionRow {
            id: 5,
            kind: kind.into(),
            timestamp,
            author: author.map(str::to_string),
            body: Some("hi".into()),
            inserted_at: "2026-01-01 00:00:00".into(),
        }
    }

    #[test]
    fn null_author_is_local() {
        let interaction = row("outgoing", 1000, None).into_interaction().unwrap();
        let message = interaction.into_message().unwrap();
        assert_eq!(message.author, AuthorIdentity::Local);
        assert_eq!(message.kind, MessageKind::Outgoing);
    }

    #[test]
    fn call_rows_become_notices() {
        let interaction = row("call", 1000, None).into_interaction().unwrap();
        assert!(matches!(interaction, Interaction::Call(_)));
    }

    #[test]
    fn malformed_columns_are_reported() {
        assert!(matches!(
            row("sticker", 1000, None).into_interaction(),
            Err(DbError::CorruptRow { column: "kind", .. })
        ));
        assert!(matches!(
            row("incoming", -1, None).into_interaction(),
            Err(DbError::CorruptRow { column: "timestamp", .. })
        ));
        assert!(matches!(
            row("incoming", 1000, Some("not-a-uuid")).into_interaction(),
            Err(DbError::CorruptRow { column: "author", .. })
        ));
    }
}
