//! Argument parsing for `lotto-admin`.

use lotto_core::types::EventId;
use thiserror::Error;
use uuid::Uuid;

/// Usage text printed on bad arguments.
pub const USAGE: &str = "\
Usage: lotto-admin <command>

Commands:
  migrate                              Apply database migrations
  create-event <name> <winner-phone>   Create a READY event (open now, announce in 8 days)
  generate-pool <event-id>             Generate the outcome pool and activate the event
  stats <event-id>                     Show per-tier slot counts";

/// An admin command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Apply database migrations.
    Migrate,
    /// Create a READY event whose designated winner is `winner_phone`.
    CreateEvent {
        /// Display name
        name: String,
        /// Raw phone number of the designated winner
        winner_phone: String,
    },
    /// Generate the pool of an event.
    GeneratePool(EventId),
    /// Print per-tier slot counts.
    Stats(EventId),
}

/// Bad command line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// No command given.
    #[error("missing command")]
    MissingCommand,
    /// Unknown command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// Wrong number of arguments for a command.
    #[error("{command} expects {expected} argument(s)")]
    Arity {
        /// Command name
        command: &'static str,
        /// Expected argument count
        expected: usize,
    },
    /// Event id is not a UUID.
    #[error("invalid event id: {0}")]
    EventId(String),
}

impl Command {
    /// Parse arguments that follow the program name.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError`] if the command or its arguments are wrong.
    pub fn parse<I, S>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Err(UsageError::MissingCommand);
        }
        let command = args.remove(0);

        match command.as_str() {
            "migrate" => {
                expect_args("migrate", &args, 0)?;
                Ok(Self::Migrate)
            }
            "create-event" => {
                expect_args("create-event", &args, 2)?;
                let winner_phone = args.pop().unwrap_or_default();
                let name = args.pop().unwrap_or_default();
                Ok(Self::CreateEvent { name, winner_phone })
            }
            "generate-pool" => {
                expect_args("generate-pool", &args, 1)?;
                Ok(Self::GeneratePool(event_id(&args[0])?))
            }
            "stats" => {
                expect_args("stats", &args, 1)?;
                Ok(Self::Stats(event_id(&args[0])?))
            }
            _ => Err(UsageError::UnknownCommand(command)),
        }
    }
}

const fn expect_args(command: &'static str, args: &[String], expected: usize) -> Result<(), UsageError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(UsageError::Arity { command, expected })
    }
}

fn event_id(raw: &str) -> Result<EventId, UsageError> {
    Uuid::parse_str(raw)
        .map(EventId::from_uuid)
        .map_err(|_| UsageError::EventId(raw.to_string()))
}
