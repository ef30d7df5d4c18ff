//! Postgres data access for the media pipeline.
//!
//! Repository methods run against an explicit connection/transaction handle
//! and never commit; callers own transaction boundaries, so several calls
//! within one logical unit of work stay atomic.

mod error;
mod media_repository;
mod transaction;

pub use error::RepositoryError;
pub use media_repository::{MediaFilter, MediaRepository, NewMedia};
pub use transaction::with_transaction;
