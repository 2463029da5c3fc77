use servwatch_core::error::CoreError;

/// Error returned by [`AlertStore`](crate::store::AlertStore) and the engine.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
