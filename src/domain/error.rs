use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("position {position} is out of range (len {len})")]
    OutOfRange { position: usize, len: usize },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] anyhow::Error),

    #[error("you can only edit one item at a time (item {open} is already open)")]
    ConcurrentEditConflict { open: usize },

    #[error("persisted entry `{key}` is not valid")]
    CorruptEntry {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
