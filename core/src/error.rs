//! Error types for the lotto engine.
//!
//! Two layers:
//!
//! - [`StoreError`] is what storage implementations return. Uniqueness
//!   violations are a typed signal so the engine can recover from races
//!   without parsing driver messages.
//! - [`LottoError`] is the classified outcome handed to the calling layer
//!   (HTTP handlers, admin tools). Every variant maps to a distinct message
//!   that never includes raw storage text.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, LottoError>;

/// Named uniqueness constraints the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// One registration per (event, fingerprint)
    ParticipantIdentity,
    /// One participant per (event, ticket sequence)
    TicketSequence,
    /// One ticket per participant
    TicketOwner,
    /// Any other unique index
    Other,
}

/// Errors raised at the storage boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("Unique constraint violated: {constraint:?}")]
    UniqueViolation {
        /// Which constraint fired
        constraint: Constraint,
    },

    /// A row the write depends on does not exist.
    #[error("Row not found")]
    NotFound,

    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(String),
}

/// Resources that may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Lotto event
    Event,
    /// Registered participant
    Participant,
    /// Issued ticket
    Ticket,
}

impl Resource {
    const fn noun(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Participant => "participant",
            Self::Ticket => "ticket",
        }
    }
}

/// [`LottoError::Conflict`] reason: the identity is already registered.
pub const ALREADY_PARTICIPATED: &str = "already participated";

/// [`LottoError::Conflict`] reason: the participant already holds a ticket.
pub const TICKET_ALREADY_ISSUED: &str = "ticket already issued";

/// Classified failure of an engine operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LottoError {
    // ═══════════════════════════════════════════════════════════
    // Taxonomy
    // ═══════════════════════════════════════════════════════════

    /// Referenced event, participant or ticket does not exist.
    #[error("{} not found", .0.noun())]
    NotFound(Resource),

    /// Operation attempted outside its window or lifecycle stage.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// A one-per-identity or one-per-participant write was repeated.
    ///
    /// The reason is [`ALREADY_PARTICIPATED`] or [`TICKET_ALREADY_ISSUED`].
    #[error("Conflict: {0}")]
    Conflict(&'static str),

    /// No unused slot remains for the participant's eligible tiers.
    #[error("No eligible slot left")]
    Exhausted,

    /// Retry budget for a race-prone write ran out.
    #[error("Transient failure after {attempts} attempts")]
    Transient {
        /// Attempts made before giving up
        attempts: u32,
    },

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Invalid configuration passed to the engine.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Storage or crypto failure (never shown to users).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LottoError {
    /// Message that is safe to show to an end user.
    ///
    /// # Examples
    ///
    /// ```
    /// use lotto_core::error::LottoError;
    ///
    /// let err = LottoError::Internal("relation \"participants\" does not exist".into());
    /// assert!(!err.user_message().contains("participants"));
    /// ```
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound(Resource::Event) => "The event does not exist.",
            Self::NotFound(Resource::Participant) => "No participation record was found.",
            Self::NotFound(Resource::Ticket) => "No ticket has been issued.",
            Self::InvalidState(_) => "This action is not available right now.",
            Self::Conflict(reason) if *reason == TICKET_ALREADY_ISSUED => {
                "A ticket has already been issued for this participation."
            }
            Self::Conflict(_) => "This phone number has already participated.",
            Self::Exhausted => "All tickets for this event have been handed out.",
            Self::Transient { .. } => "We could not complete your request. Please try again.",
            Self::Config(_) | Self::Internal(_) => "Something went wrong.",
        }
    }

    /// `true` if the caller should surface a "try again" response.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Short stable label for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::Conflict(_) => "conflict",
            Self::Exhausted => "exhausted",
            Self::Transient { .. } => "transient",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for LottoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation {
                constraint: Constraint::ParticipantIdentity,
            } => Self::Conflict(ALREADY_PARTICIPATED),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_distinct() {
        let errors = [
            LottoError::NotFound(Resource::Event),
            LottoError::NotFound(Resource::Participant),
            LottoError::NotFound(Resource::Ticket),
            LottoError::InvalidState("x"),
            LottoError::Conflict(ALREADY_PARTICIPATED),
            LottoError::Conflict(TICKET_ALREADY_ISSUED),
            LottoError::Exhausted,
            LottoError::Transient { attempts: 3 },
            LottoError::Internal("boom".into()),
        ];
        let mut messages: Vec<_> = errors.iter().map(LottoError::user_message).collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), errors.len());
    }

    #[test]
    fn conflict_messages_follow_the_reason() {
        assert_eq!(
            LottoError::Conflict(ALREADY_PARTICIPATED).user_message(),
            "This phone number has already participated."
        );
        assert_eq!(
            LottoError::Conflict(TICKET_ALREADY_ISSUED).user_message(),
            "A ticket has already been issued for this participation."
        );
        assert_eq!(LottoError::Conflict(TICKET_ALREADY_ISSUED).kind(), "conflict");
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(LottoError::Transient { attempts: 3 }.is_retryable());
        assert!(!LottoError::Exhausted.is_retryable());
        assert!(!LottoError::Conflict(ALREADY_PARTICIPATED).is_retryable());
    }

    #[test]
    fn identity_violation_maps_to_conflict() {
        let err: LottoError = StoreError::UniqueViolation {
            constraint: Constraint::ParticipantIdentity,
        }
        .into();
        assert_eq!(err.kind(), "conflict");

        let err: LottoError = StoreError::Database("connection reset".into()).into();
        assert_eq!(err.kind(), "internal");
        assert_eq!(err.user_message(), "Something went wrong.");
    }

    #[test]
    fn display_names_resource() {
        assert_eq!(
            LottoError::NotFound(Resource::Ticket).to_string(),
            "ticket not found"
        );
    }
}
