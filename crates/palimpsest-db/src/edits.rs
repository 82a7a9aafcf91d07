//! Applying inbound edits and deleting edited messages on top of the
//! revision index.

use std::collections::BTreeSet;

use palimpsest_types::{EditRecord, Interaction, Message, MessageId, NewInteraction, SenderAddress};
use tracing::{debug, info};

use crate::edit_records;
use crate::error::{DbError, Result};
use crate::queries;
use crate::revisions::{self, HeadLookup, TargetResolution};
use crate::scope::WriteTx;

/// An edit received from a sender: which message it replaces (by the
/// original send time and author) and the new body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEdit {
    pub timestamp: u64,
    pub sender: SenderAddress,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied { head: Message, record: EditRecord },
    TargetNotFound,
    UnresolvableAuthor,
    MissingHead(MessageId),
}

/// What a chain deletion removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletedChain {
    pub records: usize,
    pub interactions: usize,
}

/// Stores `edit` as the new head of the target message's chain.
///
/// The new revision keeps the original kind, author and timestamp. Edits
/// that arrive against an already-edited message extend the existing
/// chain rather than starting a second one.
pub fn apply_inbound_edit(tx: &WriteTx<'_>, edit: &InboundEdit) -> Result<EditOutcome> {
    let target = match revisions::resolve_edit_target(tx, edit.timestamp, &edit.sender)? {
        TargetResolution::Found(message) => message,
        TargetResolution::NotFound => return Ok(EditOutcome::TargetNotFound),
        TargetResolution::UnresolvableAuthor => return Ok(EditOutcome::UnresolvableAuthor),
    };

    let current = match revisions::find_current_head(tx, &target)? {
        HeadLookup::Head(head) => head,
        HeadLookup::MissingHead(id) => return Ok(EditOutcome::MissingHead(id)),
    };

    let revision = NewInteraction::revision_of(&current, edit.body.clone());
    let head = match queries::insert_interaction(tx, &revision)? {
        Interaction::Message(message) => message,
        other => {
            return Err(DbError::CorruptRow {
                column: "kind",
                value: other.kind().to_string(),
            });
        }
    };

    let record = revisions::append_edit(tx, current.id, head.id)?;

    debug!(
        "Applied edit to {} (target {}, new head {})",
        current.id, target.id, head.id
    );
    Ok(EditOutcome::Applied { head, record })
}

/// Deletes `message` together with the rest of its chain: every edit
/// record touching it, every revision those records name, and the
/// message row itself.
pub fn delete_message(tx: &WriteTx<'_>, message: &Message) -> Result<DeletedChain> {
    let entries = revisions::records_to_purge(tx, message)?;

    let mut revision_ids = BTreeSet::from([message.id]);
    let mut deleted = DeletedChain::default();

    for entry in &entries {
        if edit_records::delete_record(tx, entry.record.id)? {
            deleted.records += 1;
        }
        revision_ids.insert(entry.record.latest_revision_id);
        revision_ids.insert(entry.record.past_revision_id);
    }

    for id in revision_ids {
        if queries::delete_interaction(tx, id)? {
            deleted.interactions += 1;
        }
    }

    info!(
        "Deleted message {}: {} edit records, {} revisions",
        message.id, deleted.records, deleted.interactions
    );
    Ok(deleted)
}
