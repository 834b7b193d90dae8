//! # Lotto Runtime
//!
//! The engine that runs a phone-verified promotional lotto on top of any
//! [`LottoStore`](lotto_core::store::LottoStore).
//!
//! ## Core Components
//!
//! - [`LottoService`]: pool generation, registration, allocation, result disclosure
//! - [`retry`]: bounded retry with backoff for registration races
//! - [`metrics`]: business metrics and the Prometheus exporter
//!
//! ## Example
//!
//! ```
//! use lotto_core::config::PoolConfig;
//! use lotto_core::store::EventRepository;
//! use lotto_runtime::{LottoService, PoolGeneration};
//! use lotto_testing::{InMemoryLottoStore, ManualClock, PlainIdentity, fixtures};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryLottoStore::new();
//! let event = fixtures::event("W");
//! store.insert_event(&event).await.unwrap();
//!
//! let clock = ManualClock::new(fixtures::during_participation());
//! let service = LottoService::new(store, PlainIdentity, clock.clone())
//!     .with_pool_config(PoolConfig::new(10, 1, 1, 2, 3));
//!
//! let generated = service.generate_pool(event.id).await.unwrap();
//! assert_eq!(generated, PoolGeneration::Generated { slots: 10 });
//!
//! let receipt = service.participate(event.id, "01012345678").await.unwrap();
//! assert_eq!(receipt.ticket_seq, 1);
//!
//! clock.set(fixtures::during_announcement());
//! let first = service.check_result(receipt.participant_id).await.unwrap();
//! assert!(first.is_first_check);
//! let again = service.check_result(receipt.participant_id).await.unwrap();
//! assert!(again.detail.is_none());
//! # });
//! ```

pub mod metrics;
pub mod retry;
mod service;

pub use service::{
    LottoService, ParticipateReceipt, PoolGeneration, ResultCheck, ResultDetail,
};
