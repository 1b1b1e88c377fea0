use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no results for query")]
    NoResults,

    #[error("{0} already registered")]
    Conflict(&'static str),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("{0}")]
    Other(String),
}
