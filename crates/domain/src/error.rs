/// Shared error type used across all trust broker crates.
///
/// Variant names follow the error *kinds* from the design rather than
/// implementation details, so callers can match on them regardless of
/// which crate raised the error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Configuration(String),

    #[error("opening store: {0}")]
    StoreOpen(String),

    #[error("resetting store: {0}")]
    StoreReset(String),

    #[error("query is in error state, cannot extract result")]
    QueryInErrorState,

    #[error("query does not have a current result")]
    NoCurrentResult,

    #[error("unable to determine a conclusive answer from the user")]
    InconclusiveAnswer,

    #[error("potential privilege escalation attack detected")]
    PrivilegeEscalation,

    #[error("spoofing detected: requesting process identity changed mid-request")]
    SpoofingDetected,

    #[error("transport lost: peer disconnected")]
    TransportLost,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
