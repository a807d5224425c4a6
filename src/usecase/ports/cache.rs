#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt cache entry for {key}: {message}")]
    Corrupt { key: String, message: String },
}

/// External key-value store for total-row counts.
///
/// The grid never relies on it for correctness: a failed lookup is a miss
/// and a failed store is ignored.
pub trait CountCache: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<u64>, CacheError>;

    fn store(&self, key: &str, total: u64) -> Result<(), CacheError>;
}
