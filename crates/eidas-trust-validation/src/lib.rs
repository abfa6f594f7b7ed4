#![forbid(unsafe_code)]

//! Validation of inbound eIDAS protocol messages.
//!
//! - [`RequestValidator`] and [`ResponseValidator`] run an ordered list of
//!   field checks and stop at the first failure, so the reported message is
//!   deterministic.
//! - [`loa`] holds the Level-of-Assurance comparison rules and the shape
//!   rules for the LoA list of a request.
//! - [`SignaturePolicy`] restricts signature algorithms and key lengths.

pub mod config;
pub mod loa;
pub mod request;
pub mod response;
pub mod signature;

pub use config::{ValidationConfig, CONSENT_URIS, DEFAULT_MAX_MESSAGE_SIZE, SAML_VERSION};
pub use loa::{LevelOfAssurance, NotifiedLoa};
pub use request::RequestValidator;
pub use response::ResponseValidator;
pub use signature::SignaturePolicy;

use eidas_trust_core::ValidationError;

/// Build a validation failure and record the rejection.
pub(crate) fn rejected(field: &'static str, message: &'static str) -> ValidationError {
    tracing::warn!(field, message, "rejected protocol message");
    ValidationError::new(field, message)
}

pub(crate) fn is_present(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.trim().is_empty())
}
