use thiserror::Error;

/// Coarse classification of a [`LedgerError`], for callers that only need to
/// know which family of failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Replay,
    State,
    Paused,
    Collaborator,
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("asset identifier is empty")]
    MissingAsset,
    #[error("provider identifier is empty")]
    MissingProvider,
    #[error("bridging asset identifier is empty")]
    MissingBridgeAsset,
    #[error("recipient identity is unset")]
    MissingRecipient,
    #[error("destination descriptor is empty")]
    EmptyDestination,
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    #[error("amount overflows when scaling from {from} to {to} decimals")]
    ScaleOverflow { from: u32, to: u32 },
    #[error("malformed {field}: {reason}")]
    Malformed { field: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("caller lacks role {0}")]
    MissingRole(&'static str),
    #[error("signature does not verify against the signed message")]
    InvalidSignature,
    #[error("signer is not the route recipient")]
    SignerMismatch,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("route not configured")]
    RouteNotConfigured,
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },
    #[error("insufficient bridging-asset liquidity: required {required}, held {held}")]
    InsufficientLiquidity { required: u128, held: u128 },
    #[error("amount exceeds cap {cap}")]
    CapExceeded { cap: u128 },
    #[error("balance overflow")]
    Overflow,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("authorization error: {0}")]
    Authorization(#[from] AuthorizationError),
    #[error("signature already used")]
    Replay,
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("paused")]
    Paused,
    #[error("asset transfer failed: {0}")]
    AssetTransfer(String),
    #[error("bridge dispatch failed: {0}")]
    Dispatch(String),
    #[error("storage error: {0}")]
    Storage(String),
    /// The key was debited and committed but neither dispatched nor restored.
    #[error(
        "settlement on {key} debited without dispatch: dispatch failed ({dispatch}), rollback failed ({storage})"
    )]
    RollbackFailed {
        key: String,
        dispatch: String,
        storage: String,
    },
    #[error("internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Replay => ErrorKind::Replay,
            Self::State(_) => ErrorKind::State,
            Self::Paused => ErrorKind::Paused,
            Self::AssetTransfer(_) | Self::Dispatch(_) => ErrorKind::Collaborator,
            Self::Storage(_) | Self::RollbackFailed { .. } | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
