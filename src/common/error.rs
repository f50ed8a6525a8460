use thiserror::Error;

use super::types::{PageId, TableId, TransactionId};

/// Database error types
#[derive(Error, Debug)]
pub enum MarlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is beyond the end of the file")]
    InvalidPage(PageId),

    #[error("corrupt page {0}: {1}")]
    CorruptPage(PageId, String),

    #[error("{0} has no empty slot")]
    PageFull(PageId),

    #[error("tuple is not stored on {0}")]
    TupleNotOnPage(PageId),

    #[error("tuple descriptor does not match the page schema")]
    TupleDescMismatch,

    #[error("child schema does not match table {0}")]
    SchemaMismatch(TableId),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unsupported aggregate: {0}")]
    UnsupportedOp(String),

    #[error("{0} aborted: lock wait timed out on {1}")]
    TransactionAborted(TransactionId, PageId),

    #[error("buffer pool is full and every resident page is dirty")]
    BufferFull,

    #[error("table {0} not found")]
    NoSuchTable(TableId),

    #[error("no field named {0}")]
    NoSuchField(String),

    #[error("operator has no more tuples")]
    NoMoreTuples,
}

pub type Result<T> = std::result::Result<T, MarlError>;
