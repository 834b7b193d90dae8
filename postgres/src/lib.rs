//! `PostgreSQL` storage for the lotto engine.
//!
//! [`PostgresLottoStore`] implements every store trait of `lotto-core` on one
//! connection pool. The race-prone operations are single statements:
//!
//! - slot claims pick a random unused row with `FOR UPDATE SKIP LOCKED`, mark
//!   it and insert the ticket in one statement of data-modifying CTEs
//! - participant uniqueness is enforced by the
//!   `uq_lotto_participants_identity` and `uq_lotto_participants_seq` indexes
//! - result views are an `INSERT ... ON CONFLICT DO UPDATE ... RETURNING`
//!
//! Pool installs run in a transaction that locks the event row, so two
//! concurrent installs for one event cannot both write.
//!
//! # Example
//!
//! ```no_run
//! use lotto_postgres::PostgresLottoStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresLottoStore::connect("postgres://localhost/lotto").await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

mod events;
mod participants;
mod rows;
mod slots;

use lotto_core::error::{Constraint, StoreError};
use sqlx::PgPool;

/// `PostgreSQL` implementation of [`LottoStore`](lotto_core::store::LottoStore).
#[derive(Clone, Debug)]
pub struct PostgresLottoStore {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

impl PostgresLottoStore {
    /// Wrap an existing connection pool.
    ///
    /// # Arguments
    ///
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be reached.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;
        Ok(Self::from_pool(pool))
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

/// Map a unique index name to the constraint the engine reacts to.
fn constraint_named(name: Option<&str>) -> Constraint {
    match name {
        Some("uq_lotto_participants_identity") => Constraint::ParticipantIdentity,
        Some("uq_lotto_participants_seq") => Constraint::TicketSequence,
        Some("pk_lotto_tickets") => Constraint::TicketOwner,
        _ => Constraint::Other,
    }
}

/// Convert a driver error, turning unique violations into a typed signal.
fn store_error(context: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation {
                    constraint: constraint_named(db_err.constraint()),
                };
            }
        }
        StoreError::Database(format!("{context}: {e}"))
    }
}
