use palimpsest_types::MessageId;
use thiserror::Error;

/// Storage-level failures. Expected outcomes (no target, unresolvable
/// author, missing head) are not errors and are returned as values.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("DB lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("corrupt row: column {column} holds {value:?}")]
    CorruptRow { column: &'static str, value: String },

    #[error("timestamp {0} does not fit the store")]
    TimestampOutOfRange(u64),

    #[error("message {0} cannot supersede itself")]
    SelfEdit(MessageId),
}

pub type Result<T> = std::result::Result<T, DbError>;
