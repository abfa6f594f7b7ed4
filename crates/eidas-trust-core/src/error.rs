#![forbid(unsafe_code)]

use std::borrow::Cow;

/// Low-level errors from XML handling, key decoding and crypto primitives.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("certificate error: {0}")]
    Certificate(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A protocol message failed a structural or semantic check.
///
/// `Display` renders the literal message only; callers and logs match on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    field: &'static str,
    message: Cow<'static, str>,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// Name of the offending message field (e.g. `"ID"`, `"Consent"`).
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Certificate trust and matching failures.
///
/// Revoked, untrusted and missing-revocation-data are kept apart because
/// operators react to each differently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertificateError {
    #[error("untrusted certificate: {0}")]
    UntrustedCertificate(String),

    #[error("certificate revoked: {0}")]
    CertificateRevoked(String),

    #[error("missing revocation data: {0}")]
    MissingRevocationData(String),

    #[error("no unique match")]
    NoUniqueMatch,

    #[error("malformed certificate: {0}")]
    Malformed(String),
}

/// Failures while decrypting the encrypted assertions of a response.
#[derive(Debug, thiserror::Error)]
pub enum DecryptionError {
    #[error("Response is not encrypted")]
    NotEncrypted,

    #[error("No EncryptedAssertion.EncryptedKey in Response.")]
    MissingEncryptedKey,

    #[error("Encryption method algorithm could not be inferred")]
    MissingAlgorithm,

    #[error("No known algorithm class could be inferred.")]
    UnknownAlgorithmClass,

    #[error("No EncryptedAssertion.KeyInfo.AgreementMethod in Response.")]
    MissingAgreementMethod,

    #[error("No public key or certificate found in the SAML Response.")]
    MissingKeyMaterial,

    #[error("No valid credential for decryption")]
    NoValidCredential,

    #[error("No matching public key was found for a given SAML Response.")]
    NoMatchingCredential,

    #[error("Algorithm is not allowed: {0}")]
    AlgorithmNotAllowed(String),

    #[error("malformed encrypted assertion: {0}")]
    Malformed(String),

    #[error("cannot decrypt assertion")]
    Cipher(#[source] Error),

    #[error("cannot parse decrypted response")]
    Reparse(#[source] Error),
}
