use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::ids::{EditRecordId, MessageId};

// -- Authors --

/// Who wrote an interaction, as recorded in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AuthorIdentity {
    /// The local user. Stored as a NULL author.
    Local,
    Remote(Uuid),
}

impl AuthorIdentity {
    pub fn remote_id(&self) -> Option<Uuid> {
        match self {
            AuthorIdentity::Local => None,
            AuthorIdentity::Remote(id) => Some(*id),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, AuthorIdentity::Local)
    }
}

/// Sender address as it arrives on an inbound edit, before normalization.
///
/// A remote address may be known only by phone number, in which case it
/// cannot be matched against stored authors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SenderAddress {
    Local,
    Remote {
        service_id: Option<Uuid>,
        e164: Option<String>,
    },
}

impl SenderAddress {
    pub fn remote(service_id: Uuid) -> Self {
        SenderAddress::Remote {
            service_id: Some(service_id),
            e164: None,
        }
    }

    /// Normalizes to a stored author identity. `None` when the address has
    /// no service id to match on.
    pub fn author_identity(&self) -> Option<AuthorIdentity> {
        match self {
            SenderAddress::Local => Some(AuthorIdentity::Local),
            SenderAddress::Remote { service_id, .. } => service_id.map(AuthorIdentity::Remote),
        }
    }
}

impl From<&AuthorIdentity> for SenderAddress {
    fn from(author: &AuthorIdentity) -> Self {
        match author {
            AuthorIdentity::Local => SenderAddress::Local,
            AuthorIdentity::Remote(id) => SenderAddress::remote(*id),
        }
    }
}

// -- Interactions --

/// Storage tag for an interaction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    IncomingMessage,
    OutgoingMessage,
    Info,
    Call,
}

#[derive(Debug, Error)]
#[error("unknown interaction kind: {0}")]
pub struct ParseKindError(pub String);

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::IncomingMessage => "incoming",
            InteractionKind::OutgoingMessage => "outgoing",
            InteractionKind::Info => "info",
            InteractionKind::Call => "call",
        }
    }

    pub fn is_editable(self) -> bool {
        matches!(
            self,
            InteractionKind::IncomingMessage | InteractionKind::OutgoingMessage
        )
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incoming" => Ok(InteractionKind::IncomingMessage),
            "outgoing" => Ok(InteractionKind::OutgoingMessage),
            "info" => Ok(InteractionKind::Info),
            "call" => Ok(InteractionKind::Call),
            other => Err(ParseKindError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Incoming,
    Outgoing,
}

impl From<MessageKind> for InteractionKind {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Incoming => InteractionKind::IncomingMessage,
            MessageKind::Outgoing => InteractionKind::OutgoingMessage,
        }
    }
}

/// An editable chat message. One revision of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub kind: MessageKind,
    /// Sender-assigned time of the original send. Preserved across edits.
    pub timestamp: u64,
    pub author: AuthorIdentity,
    pub body: Option<String>,
    pub inserted_at: String,
}

/// A non-editable interaction (info line, call event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: MessageId,
    pub timestamp: u64,
    pub body: Option<String>,
    pub inserted_at: String,
}

/// Any row of the interaction store, discriminated by whether it can be
/// the target of an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    Message(Message),
    Info(Notice),
    Call(Notice),
}

impl Interaction {
    pub fn id(&self) -> MessageId {
        match self {
            Interaction::Message(m) => m.id,
            Interaction::Info(n) | Interaction::Call(n) => n.id,
        }
    }

    pub fn kind(&self) -> InteractionKind {
        match self {
            Interaction::Message(m) => m.kind.into(),
            Interaction::Info(_) => InteractionKind::Info,
            Interaction::Call(_) => InteractionKind::Call,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Interaction::Message(m) => m.timestamp,
            Interaction::Info(n) | Interaction::Call(n) => n.timestamp,
        }
    }

    pub fn into_message(self) -> Option<Message> {
        match self {
            Interaction::Message(m) => Some(m),
            Interaction::Info(_) | Interaction::Call(_) => None,
        }
    }
}

/// An interaction about to be inserted; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInteraction {
    pub kind: InteractionKind,
    pub timestamp: u64,
    pub author: AuthorIdentity,
    pub body: Option<String>,
}

impl NewInteraction {
    pub fn incoming(timestamp: u64, author: Uuid, body: impl Into<String>) -> Self {
        Self {
            kind: InteractionKind::IncomingMessage,
            timestamp,
            author: AuthorIdentity::Remote(author),
            body: Some(body.into()),
        }
    }

    pub fn outgoing(timestamp: u64, body: impl Into<String>) -> Self {
        Self {
            kind: InteractionKind::OutgoingMessage,
            timestamp,
            author: AuthorIdentity::Local,
            body: Some(body.into()),
        }
    }

    pub fn info(timestamp: u64, body: impl Into<String>) -> Self {
        Self {
            kind: InteractionKind::Info,
            timestamp,
            author: AuthorIdentity::Local,
            body: Some(body.into()),
        }
    }

    /// A new revision of `message`: same kind, author and original
    /// timestamp, new body.
    pub fn revision_of(message: &Message, body: Option<String>) -> Self {
        Self {
            kind: message.kind.into(),
            timestamp: message.timestamp,
            author: message.author.clone(),
            body,
        }
    }
}

// -- Edit records --

/// Links one superseded revision to the current head of its chain.
///
/// `past_revision_id` is fixed at creation. `latest_revision_id` is
/// rewritten every time the chain's head advances, so all records of a
/// chain always point at the same head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditRecord {
    pub id: EditRecordId,
    pub latest_revision_id: MessageId,
    pub past_revision_id: MessageId,
}

/// One step of an edit history: the record and the past revision it
/// names, if that revision could still be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record: EditRecord,
    pub message: Option<Message>,
}
