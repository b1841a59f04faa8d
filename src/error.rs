#[allow(unused)]
pub use anyhow::{anyhow, bail, ensure, Error};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JWTError {
    #[error("Internal error: [{0}]")]
    InternalError(String),
    #[error("Invalid key size")]
    InvalidKeySize,
    #[error("Unsupported algorithm: [{0}]")]
    UnsupportedAlgorithm(String),
    #[error("Malformed key encoding")]
    MalformedKeyEncoding,
    #[error("Authentication failed")]
    AuthenticationFailure,
    #[error("Object has been disposed")]
    DisposedAccess,
    #[error("Missing private key")]
    MissingPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid nonce size")]
    InvalidNonce,
    #[error("Missing ephemeral public key")]
    MissingEphemeralKey,
    #[error("Invalid ephemeral public key")]
    InvalidEphemeralKey,
    #[error("Invalid key wrap input")]
    InvalidKeyWrapInput,
}

impl JWTError {
    /// Returns the `JWTError` carried by an `anyhow::Error`, if any.
    pub fn kind_of(err: &Error) -> Option<&JWTError> {
        err.downcast_ref::<JWTError>()
    }
}

impl From<&str> for JWTError {
    fn from(e: &str) -> JWTError {
        JWTError::InternalError(e.into())
    }
}
