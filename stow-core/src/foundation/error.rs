use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("malformed envelope: {0}")]
    EnvelopeDecode(String),

    #[error("block not found for link {link}")]
    BlockMissing { link: String },

    #[error("block digest mismatch: expected {expected}, computed {computed}")]
    BlockDigestMismatch { expected: String, computed: String },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("key decode failed: {details}")]
    KeyDecode { details: String },

    #[error("signature verification failed for issuer {issuer}")]
    SignatureInvalid { issuer: String },

    #[error("unknown issuer: {0}")]
    UnknownIssuer(String),

    #[error("{issuer} is not authorized to invoke {ability} on {resource}")]
    NotAuthorized { issuer: String, ability: String, resource: String },

    #[error("capability {ability} caveats invalid: {details}")]
    CaveatsInvalid { ability: String, details: String },

    #[error("no storage provider available")]
    NoProvider,

    #[error("{operation} failed: {details}")]
    UpstreamFailure { operation: String, details: String },

    #[error("receipt not found for invocation {invocation}")]
    ReceiptMissing { invocation: String },

    #[error("storage error during {operation}: {details}")]
    StorageError { operation: String, details: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("{format} serialization error: {details}")]
    SerializationError { format: String, details: String },

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, UploadError>;

impl UploadError {
    pub fn block_missing(link: impl Into<String>) -> Self {
        UploadError::BlockMissing { link: link.into() }
    }

    pub fn key_decode(details: impl Into<String>) -> Self {
        UploadError::KeyDecode { details: details.into() }
    }

    pub fn caveats_invalid(ability: impl Into<String>, details: impl Into<String>) -> Self {
        UploadError::CaveatsInvalid { ability: ability.into(), details: details.into() }
    }

    pub fn upstream(operation: impl Into<String>, details: impl Into<String>) -> Self {
        UploadError::UpstreamFailure { operation: operation.into(), details: details.into() }
    }

    pub fn storage(operation: impl Into<String>, details: impl Into<String>) -> Self {
        UploadError::StorageError { operation: operation.into(), details: details.into() }
    }
}

impl From<hex::FromHexError> for UploadError {
    fn from(err: hex::FromHexError) -> Self {
        UploadError::InvalidIdentifier(format!("hex decode error: {}", err))
    }
}

impl From<serde_cbor::Error> for UploadError {
    fn from(err: serde_cbor::Error) -> Self {
        UploadError::SerializationError { format: "cbor".to_string(), details: err.to_string() }
    }
}

impl From<serde_json::Error> for UploadError {
    fn from(err: serde_json::Error) -> Self {
        UploadError::SerializationError { format: "json".to_string(), details: err.to_string() }
    }
}

impl From<io::Error> for UploadError {
    fn from(err: io::Error) -> Self {
        UploadError::StorageError { operation: "io".to_string(), details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_render() {
        let err = UploadError::NoProvider;
        assert_eq!(err.to_string(), "no storage provider available");

        let err = UploadError::NotAuthorized {
            issuer: "did:key:fabc".to_string(),
            ability: "space/blob/add".to_string(),
            resource: "did:key:fdef".to_string(),
        };
        assert!(err.to_string().contains("not authorized"));

        let err = UploadError::upstream("blob/allocate", "boom");
        assert_eq!(err.to_string(), "blob/allocate failed: boom");
    }
}
