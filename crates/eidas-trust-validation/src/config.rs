#![forbid(unsafe_code)]

//! Validation settings shared by the request and response validators.

use crate::signature::SignaturePolicy;

/// Default upper bound on a serialized protocol message, in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 131_072;

/// The only protocol version accepted.
pub const SAML_VERSION: &str = "2.0";

/// The SAML 2.0 consent identifiers.
pub const CONSENT_URIS: &[&str] = &[
    "urn:oasis:names:tc:SAML:2.0:consent:obtained",
    "urn:oasis:names:tc:SAML:2.0:consent:prior",
    "urn:oasis:names:tc:SAML:2.0:consent:current-implicit",
    "urn:oasis:names:tc:SAML:2.0:consent:current-explicit",
    "urn:oasis:names:tc:SAML:2.0:consent:unspecified",
    "urn:oasis:names:tc:SAML:2.0:consent:unavailable",
    "urn:oasis:names:tc:SAML:2.0:consent:inapplicable",
];

/// Immutable validation settings, built once and passed by reference.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Largest accepted serialized AuthnRequest.
    pub max_request_size: usize,
    /// Largest accepted serialized Response.
    pub max_response_size: usize,
    /// Exact `Version` attribute value required.
    pub supported_version: String,
    /// Accepted `Consent` values; an absent consent is always accepted.
    pub allowed_consents: Vec<String>,
    pub signature_policy: SignaturePolicy,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_request_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_response_size: DEFAULT_MAX_MESSAGE_SIZE,
            supported_version: SAML_VERSION.to_owned(),
            allowed_consents: CONSENT_URIS.iter().map(|s| (*s).to_owned()).collect(),
            signature_policy: SignaturePolicy::default(),
        }
    }
}

impl ValidationConfig {
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_request_size = size;
        self.max_response_size = size;
        self
    }

    pub(crate) fn is_consent_allowed(&self, consent: &str) -> bool {
        self.allowed_consents.iter().any(|c| c == consent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ValidationConfig::default();
        assert_eq!(config.max_request_size, 131_072);
        assert_eq!(config.max_response_size, 131_072);
        assert_eq!(config.supported_version, "2.0");
        assert_eq!(config.allowed_consents.len(), 7);
        assert!(config.is_consent_allowed("urn:oasis:names:tc:SAML:2.0:consent:obtained"));
        assert!(!config.is_consent_allowed("urn:oasis:names:tc:SAML:2.0:consent:invalid"));
    }

    #[test]
    fn max_size_applies_to_both_directions() {
        let config = ValidationConfig::default().with_max_message_size(1024);
        assert_eq!(config.max_request_size, 1024);
        assert_eq!(config.max_response_size, 1024);
    }
}
