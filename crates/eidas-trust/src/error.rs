#![forbid(unsafe_code)]

//! Pipeline error wrapping the three failure families and the parser error.

use eidas_trust_core::{CertificateError, DecryptionError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] eidas_trust_core::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error("no metadata certificate matches the message signature")]
    SignatureCertificateNotFound,

    #[error("invalid XML signature: {0}")]
    InvalidSignature(String),

    #[error("InResponseTo does not match the request")]
    InResponseToMismatch,

    #[error("{0}")]
    LevelOfAssurance(&'static str),
}
