//! Domain errors for the QA agent.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::ports::{BackendError, StoreError};

/// Errors that can end an asset's trajectory or the whole run.
///
/// Only `CatalogParseEmpty` is fatal to a run; the rest are scoped to the
/// asset that raised them.
#[derive(Debug, Error)]
pub enum QaError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend returned a malformed response: {0}")]
    BackendMalformedResponse(String),

    #[error("Mock process failed to start: {0}")]
    ProcessStartFailure(String),

    #[error("Process exceeded its {0:?} timeout")]
    ProcessTimeout(Duration),

    #[error("No usable services found in catalog text")]
    CatalogParseEmpty,

    #[error("Repair response contained no actionable patch")]
    PatchUnparseable,

    #[error("Tests still failing after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Serializable discriminant of [`QaError`], carried in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BackendUnavailable,
    BackendMalformedResponse,
    ProcessStartFailure,
    ProcessTimeout,
    CatalogParseEmpty,
    PatchUnparseable,
    RetriesExhausted,
    Store,
    Config,
}

impl QaError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            Self::BackendMalformedResponse(_) => ErrorKind::BackendMalformedResponse,
            Self::ProcessStartFailure(_) => ErrorKind::ProcessStartFailure,
            Self::ProcessTimeout(_) => ErrorKind::ProcessTimeout,
            Self::CatalogParseEmpty => ErrorKind::CatalogParseEmpty,
            Self::PatchUnparseable => ErrorKind::PatchUnparseable,
            Self::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            Self::Store(_) => ErrorKind::Store,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<BackendError> for QaError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Malformed(msg) => Self::BackendMalformedResponse(msg),
            other => Self::BackendUnavailable(other.to_string()),
        }
    }
}

pub type QaResult<T> = Result<T, QaError>;
