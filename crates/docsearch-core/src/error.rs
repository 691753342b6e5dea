use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Search engine not initialized")]
    EngineNotInitialized,

    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("Keyword index failed: {0}")]
    KeywordIndex(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Document store failed: {0}")]
    Store(String),

    #[error("Cache unavailable: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, Error>;
