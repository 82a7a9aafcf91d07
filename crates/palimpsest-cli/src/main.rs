use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use palimpsest_db::edits::{self, EditOutcome, InboundEdit};
use palimpsest_db::revisions::{self, HeadLookup};
use palimpsest_db::{Database, queries};
use palimpsest_types::{
    AuthorIdentity, Interaction, InteractionKind, Message, MessageId, NewInteraction,
    SenderAddress,
};

const USAGE: &str = "usage: palimpsest <command>

commands:
  insert <kind> <timestamp> <local|uuid> <body>   store an interaction
  edit <timestamp> <local|uuid|phone> <body>      apply an inbound edit
  head <id>                                       current head of a message's chain
  history <id>                                    edit history, most recent first
  count <id>                                      number of edits to a head
  purge <id>                                      edit records a deletion would remove
  delete <id>                                     delete a message and its chain
  check                                           list orphaned edit records";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Insert(NewInteraction),
    Edit(InboundEdit),
    Head(MessageId),
    History(MessageId),
    Count(MessageId),
    Purge(MessageId),
    Delete(MessageId),
    Check,
}

fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging; stdout is reserved for JSON output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "palimpsest_cli=info,palimpsest_db=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Config
    let db_path =
        std::env::var("PALIMPSEST_DB_PATH").unwrap_or_else(|_| "palimpsest.db".into());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_command(&args).map_err(|e| anyhow!("{e}\n\n{USAGE}"))?;

    let db = Database::open(&PathBuf::from(&db_path))
        .with_context(|| format!("opening store at {db_path}"))?;

    let output = run(&db, command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn run(db: &Database, command: Command) -> Result<Value> {
    let output = match command {
        Command::Insert(new) => {
            let interaction = db.write(|tx| queries::insert_interaction(tx, &new))?;
            info!("Stored {} interaction {}", interaction.kind(), interaction.id());
            serde_json::to_value(interaction)?
        }
        Command::Edit(edit) => match db.write(|tx| edits::apply_inbound_edit(tx, &edit))? {
            EditOutcome::Applied { head, record } => {
                json!({ "applied": { "head": head, "record": record } })
            }
            EditOutcome::TargetNotFound => json!({ "rejected": "target_not_found" }),
            EditOutcome::UnresolvableAuthor => json!({ "rejected": "unresolvable_author" }),
            EditOutcome::MissingHead(id) => json!({ "rejected": "missing_head", "head": id }),
        },
        Command::Head(id) => {
            let message = load_message(db, id)?;
            match db.read(|tx| revisions::find_current_head(tx, &message))? {
                HeadLookup::Head(head) => json!({ "head": head }),
                HeadLookup::MissingHead(id) => json!({ "missing_head": id }),
            }
        }
        Command::History(id) => {
            let message = load_message(db, id)?;
            serde_json::to_value(db.read(|tx| revisions::history_of(tx, &message))?)?
        }
        Command::Count(id) => {
            let message = load_message(db, id)?;
            json!({ "edits": db.read(|tx| revisions::count_edits(tx, &message))? })
        }
        Command::Purge(id) => {
            let message = load_message(db, id)?;
            serde_json::to_value(db.read(|tx| revisions::records_to_purge(tx, &message))?)?
        }
        Command::Delete(id) => {
            let message = load_message(db, id)?;
            let deleted = db.write(|tx| edits::delete_message(tx, &message))?;
            json!({ "records": deleted.records, "interactions": deleted.interactions })
        }
        Command::Check => serde_json::to_value(db.read(|tx| revisions::find_anomalies(tx))?)?,
    };

    Ok(output)
}

fn load_message(db: &Database, id: MessageId) -> Result<Message> {
    match db.read(|tx| queries::interaction_by_id(tx, id))? {
        Some(Interaction::Message(message)) => Ok(message),
        Some(other) => bail!("interaction {} is a {} row, not a message", id, other.kind()),
        None => bail!("no interaction with id {}", id),
    }
}

fn parse_command(args: &[String]) -> Result<Command> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let command = match args.as_slice() {
        ["insert", kind, timestamp, author, body @ ..] => Command::Insert(NewInteraction {
            kind: kind.parse::<InteractionKind>()?,
            timestamp: parse_timestamp(timestamp)?,
            author: parse_author(author)?,
            body: join_body(body),
        }),
        ["edit", timestamp, sender, body @ ..] => Command::Edit(InboundEdit {
            timestamp: parse_timestamp(timestamp)?,
            sender: parse_sender(sender),
            body: join_body(body),
        }),
        ["head", id] => Command::Head(parse_id(id)?),
        ["history", id] => Command::History(parse_id(id)?),
        ["count", id] => Command::Count(parse_id(id)?),
        ["purge", id] => Command::Purge(parse_id(id)?),
        ["delete", id] => Command::Delete(parse_id(id)?),
        ["check"] => Command::Check,
        [] => bail!("missing command"),
        [other, ..] => bail!("unknown or incomplete command: {other}"),
    };

    Ok(command)
}

fn parse_id(raw: &str) -> Result<MessageId> {
    raw.parse()
        .with_context(|| format!("invalid message id: {raw}"))
}

fn parse_timestamp(raw: &str) -> Result<u64> {
    raw.parse()
        .with_context(|| format!("invalid timestamp: {raw}"))
}

fn parse_author(raw: &str) -> Result<AuthorIdentity> {
    if raw == "local" {
        return Ok(AuthorIdentity::Local);
    }
    let id: Uuid = raw
        .parse()
        .with_context(|| format!("author must be 'local' or a uuid: {raw}"))?;
    Ok(AuthorIdentity::Remote(id))
}

/// Anything that is neither `local` nor a uuid is taken as a phone number,
/// which leaves the sender without a matchable identity.
fn parse_sender(raw: &str) -> SenderAddress {
    if raw == "local" {
        return SenderAddress::Local;
    }
    match raw.parse::<Uuid>() {
        Ok(id) => SenderAddress::remote(id),
        Err(_) => SenderAddress::Remote {
            service_id: None,
            e164: Some(raw.to_string()),
        },
    }
}

fn join_body(words: &[&str]) -> Option<String> {
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}
