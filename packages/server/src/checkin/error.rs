use sea_orm::DbErr;
use thiserror::Error;

/// Failures of the check-in core that are not scan rejections.
///
/// Scan rejections are ordinary outcomes and are returned as
/// [`ScanRejection`](super::validator::ScanRejection) values instead.
#[derive(Debug, Error)]
pub enum CheckinError {
    /// A record store call failed. Nothing from the failed call is assumed committed.
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(#[from] DbErr),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Invalid(String),

    /// A concurrent writer won a natural-key race. Resubmitting is safe.
    #[error("{0}")]
    Conflict(String),

    /// A chunked cascade delete stopped after some chunks were committed.
    #[error("Cascade delete stopped in '{collection}' after {deleted} deleted documents: {source}")]
    PartialCascadeFailure {
        collection: &'static str,
        deleted: u64,
        source: DbErr,
    },
}
