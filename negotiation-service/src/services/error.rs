use serde::Serialize;
use thiserror::Error;

/// Stable reason codes surfaced to tool callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    NotFound,
    InvalidState,
    ConsentRequired,
    Expired,
    SignatureInvalid,
    SchemaInvalid,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NotFound",
            ErrorCode::InvalidState => "InvalidState",
            ErrorCode::ConsentRequired => "ConsentRequired",
            ErrorCode::Expired => "Expired",
            ErrorCode::SignatureInvalid => "SignatureInvalid",
            ErrorCode::SchemaInvalid => "SchemaInvalid",
            ErrorCode::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Concurrent modification of {entity} {id}")]
    Conflict { entity: &'static str, id: String },

    #[error("Duplicate {entity} {id}")]
    Duplicate { entity: &'static str, id: String },

    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        StorageError::Backend(anyhow::Error::new(err))
    }
}

#[derive(Error, Debug)]
pub enum NegotiationError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Supplier not found: {0}")]
    SupplierNotFound(String),

    #[error("Mandate not found: {0}")]
    MandateNotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Supplier {0} has no received offer in this session")]
    NoValidOffer(String),

    #[error("User consent is required to create a payment mandate")]
    ConsentRequired,

    #[error("Mandate {0} has expired")]
    Expired(String),

    #[error("Mandate signature is invalid: {0}")]
    SignatureInvalid(String),

    #[error("Invalid arguments: {0}")]
    SchemaInvalid(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl NegotiationError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        NegotiationError::InvalidState(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            NegotiationError::SessionNotFound(_)
            | NegotiationError::SupplierNotFound(_)
            | NegotiationError::MandateNotFound(_) => ErrorCode::NotFound,
            NegotiationError::InvalidState(_) | NegotiationError::NoValidOffer(_) => {
                ErrorCode::InvalidState
            }
            NegotiationError::ConsentRequired => ErrorCode::ConsentRequired,
            NegotiationError::Expired(_) => ErrorCode::Expired,
            NegotiationError::SignatureInvalid(_) => ErrorCode::SignatureInvalid,
            NegotiationError::SchemaInvalid(_) => ErrorCode::SchemaInvalid,
            NegotiationError::Storage(_)
            | NegotiationError::Signing(_)
            | NegotiationError::Internal(_) => ErrorCode::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, NegotiationError>;
