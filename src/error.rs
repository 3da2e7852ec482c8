//! Engine error taxonomy.
//!
//! Every failure the engine can surface is a value of `EngineError`; nothing
//! in the core panics across the module boundary. Handlers map these to
//! status codes in `routes::http`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
  /// The country catalog is empty. Fatal setup/data problem.
  #[error("no eligible countries in the catalog")]
  NoEligibleEntities,

  /// Submission after the ledger reached SOLVED or EXHAUSTED.
  #[error("challenge already resolved")]
  ChallengeAlreadyResolved,

  /// No validator registered for this question format.
  #[error("unsupported format: {0}")]
  UnsupportedFormat(String),

  /// No question builder registered for this category.
  #[error("unknown category: {0}")]
  UnknownCategory(String),

  /// Optimistic version check lost too many times in a row.
  #[error("store conflict, try again")]
  TransientStoreConflict,

  /// A store access did not complete within its deadline.
  #[error("store timeout, try again")]
  StoreTimeout,
}

impl EngineError {
  /// Whether the caller may simply retry the same request.
  pub fn is_retryable(&self) -> bool {
    matches!(self, EngineError::TransientStoreConflict | EngineError::StoreTimeout)
  }
}
