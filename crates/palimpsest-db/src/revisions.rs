//! Revision index: locating edit targets, chain heads and edit histories.
//!
//! Read operations accept any [`ReadScope`]; only [`append_edit`] mutates
//! and it requires a [`WriteTx`].

use palimpsest_types::{EditRecord, HistoryEntry, Interaction, Message, MessageId, SenderAddress};
use tracing::{debug, warn};

use crate::edit_records;
use crate::error::{DbError, Result};
use crate::queries;
use crate::scope::{ReadScope, WriteTx};

/// Outcome of looking up the message an inbound edit applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResolution {
    Found(Message),
    NotFound,
    /// The sender address could not be normalized to a stored author.
    UnresolvableAuthor,
}

/// Outcome of looking up the current head of a message's chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadLookup {
    Head(Message),
    /// A record names this head but no live message has that id.
    MissingHead(MessageId),
}

/// Finds the original message targeted by an edit sent at `timestamp` by
/// `sender`. Matching is exact on both; the first row in store order wins.
pub fn resolve_edit_target(
    tx: &impl ReadScope,
    timestamp: u64,
    sender: &SenderAddress,
) -> Result<TargetResolution> {
    let Some(author) = sender.author_identity() else {
        debug!("Edit sender {:?} has no service id", sender);
        return Ok(TargetResolution::UnresolvableAuthor);
    };

    // Nothing above i64::MAX can have been stored.
    let Ok(timestamp) = i64::try_from(timestamp) else {
        return Ok(TargetResolution::NotFound);
    };

    match queries::interaction_by_timestamp_author(tx, timestamp, &author)? {
        None => Ok(TargetResolution::NotFound),
        Some(Interaction::Message(message)) => Ok(TargetResolution::Found(message)),
        Some(other) => {
            warn!(
                "Unexpected {} interaction {} found for edit",
                other.kind(),
                other.id()
            );
            Ok(TargetResolution::NotFound)
        }
    }
}

/// Returns the head of the chain `message` belongs to. A message that was
/// never superseded is its own head.
pub fn find_current_head(tx: &impl ReadScope, message: &Message) -> Result<HeadLookup> {
    let Some(record) = edit_records::record_for_past(tx, message.id)? else {
        return Ok(HeadLookup::Head(message.clone()));
    };

    match queries::message_by_id(tx, record.latest_revision_id)? {
        Some(head) => Ok(HeadLookup::Head(head)),
        None => {
            warn!(
                "Edit record {} points at missing head {}",
                record.id, record.latest_revision_id
            );
            Ok(HeadLookup::MissingHead(record.latest_revision_id))
        }
    }
}

/// Full edit history of the chain headed by `head`, most recent edit
/// first. Past revisions that cannot be loaded are returned as `None`.
pub fn history_of(tx: &impl ReadScope, head: &Message) -> Result<Vec<HistoryEntry>> {
    let records = edit_records::records_for_head(tx, head.id)?;
    pair_with_revisions(tx, records)
}

/// Every record that has to go when `revision` is deleted, wherever it
/// sits in its chain. Ordered and paired like [`history_of`].
pub fn records_to_purge(tx: &impl ReadScope, revision: &Message) -> Result<Vec<HistoryEntry>> {
    let records = edit_records::records_touching(tx, revision.id)?;
    pair_with_revisions(tx, records)
}

/// Number of edits applied to the chain headed by `head`.
pub fn count_edits(tx: &impl ReadScope, head: &Message) -> Result<u64> {
    edit_records::count_for_head(tx, head.id)
}

/// Advances the chain headed by `old_head` to `new_head`: repoints every
/// existing record, then records `old_head` as superseded. Both steps are
/// applied or neither is.
pub fn append_edit(
    tx: &WriteTx<'_>,
    old_head: MessageId,
    new_head: MessageId,
) -> Result<EditRecord> {
    if old_head == new_head {
        return Err(DbError::SelfEdit(old_head));
    }

    tx.atomically("append_edit", || {
        let rewritten = edit_records::rewrite_head(tx, old_head, new_head)?;
        let record = edit_records::insert_record(tx, new_head, old_head)?;

        debug!(
            "Chain head {} -> {} ({} records repointed)",
            old_head, new_head, rewritten
        );
        Ok(record)
    })
}

/// Records whose head or past revision no longer exists.
pub fn find_anomalies(tx: &impl ReadScope) -> Result<Vec<EditRecord>> {
    let orphans = edit_records::orphaned_records(tx)?;
    for record in &orphans {
        warn!(
            "Edit record {} is orphaned (latest {}, past {})",
            record.id, record.latest_revision_id, record.past_revision_id
        );
    }
    Ok(orphans)
}

fn pair_with_revisions(
    tx: &impl ReadScope,
    records: Vec<EditRecord>,
) -> Result<Vec<HistoryEntry>> {
    records
        .into_iter()
        .map(|record| -> Result<HistoryEntry> {
            let message = load_past_revision(tx, &record)?;
            Ok(HistoryEntry { record, message })
        })
        .collect()
}

/// Loads the past revision a record names. Missing, non-message and
/// malformed rows are logged and read as `None` so one bad row does not
/// hide the rest of the chain; storage failures still propagate.
fn load_past_revision(tx: &impl ReadScope, record: &EditRecord) -> Result<Option<Message>> {
    match queries::interaction_by_id(tx, record.past_revision_id) {
        Ok(Some(Interaction::Message(message))) => Ok(Some(message)),
        Ok(Some(other)) => {
            warn!(
                "Edit record {} names {} interaction {} as a past revision",
                record.id,
                other.kind(),
                other.id()
            );
            Ok(None)
        }
        Ok(None) => {
            warn!(
                "Edit record {} names missing past revision {}",
                record.id, record.past_revision_id
            );
            Ok(None)
        }
        Err(DbError::CorruptRow { column, value }) => {
            warn!(
                "Past revision {} is corrupt ({} = {:?})",
                record.past_revision_id, column, value
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use palimpsest_types::NewInteraction;

    fn outgoing(db: &Database, timestamp: u64, body: &str) -> Message {
        db.write(|tx| {
            let inserted =
                queries::insert_interaction(tx, &NewInteraction::outgoing(timestamp, body))?;
            Ok(inserted.into_message().unwrap())
        })
        .unwrap()
    }

    #[test]
    fn self_edit_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let m1 = outgoing(&db, 1000, "one");

        let result = db.write(|tx| append_edit(tx, m1.id, m1.id));
        assert!(matches!(result, Err(DbError::SelfEdit(id)) if id == m1.id));
    }

    #[test]
    fn never_edited_message_is_its_own_head() {
        let db = Database::open_in_memory().unwrap();
        let m1 = outgoing(&db, 1000, "one");

        let head = db.read(|tx| find_current_head(tx, &m1)).unwrap();
        assert_eq!(head, HeadLookup::Head(m1.clone()));
        assert_eq!(db.read(|tx| count_edits(tx, &m1)).unwrap(), 0);
        assert!(db.read(|tx| history_of(tx, &m1)).unwrap().is_empty());
    }

    #[test]
    fn stale_head_is_rejected_without_partial_rewrite() {
        let db = Database::open_in_memory().unwrap();
        let m1 = outgoing(&db, 1000, "one");
        let m2 = outgoing(&db, 1000, "two");
        let m3 = outgoing(&db, 1000, "three");

        db.write(|tx| append_edit(tx, m1.id, m2.id)).unwrap();

        // m1 is already superseded; recording it again breaks uniqueness.
        let result = db.write(|tx| append_edit(tx, m1.id, m3.id));
        assert!(matches!(result, Err(DbError::Storage(_))));

        let history = db.read(|tx| history_of(tx, &m2)).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].record.latest_revision_id, m2.id);
    }
}
