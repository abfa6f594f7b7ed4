#![forbid(unsafe_code)]

//! Ordered validation of an inbound `AuthnRequest`.

use crate::config::ValidationConfig;
use crate::{is_present, loa, rejected};
use eidas_trust_core::ValidationError;
use eidas_trust_saml::AuthnRequest;

pub const BINDING_HTTP_POST: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";
pub const BINDING_HTTP_REDIRECT: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect";
pub const BINDING_SOAP: &str = "urn:oasis:names:tc:SAML:2.0:bindings:SOAP";

/// NameIDPolicy formats a request may ask for.
pub const NAME_ID_FORMATS: &[&str] = &[
    "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent",
    "urn:oasis:names:tc:SAML:2.0:nameid-format:transient",
    "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified",
];

/// Validates AuthnRequests against a [`ValidationConfig`].
///
/// Checks run in a fixed order and the first failure is returned:
///
/// 1. serialized size
/// 2. `ID`, `Version`, `IssueInstant`, `Consent`
/// 3. `ForceAuthn` (must be true) and `IsPassive` (must be false)
/// 4. `ProtocolBinding`, then `Destination` for browser bindings
/// 5. `ProviderName`, `Issuer`, signature, `Extensions`, `NameIDPolicy`
/// 6. the shape of the requested LoA list
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator<'a> {
    config: &'a ValidationConfig,
}

impl<'a> RequestValidator<'a> {
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    /// Size guard, usable on the raw message before parsing.
    pub fn check_size(&self, serialized_len: usize) -> Result<(), ValidationError> {
        if serialized_len > self.config.max_request_size {
            return Err(rejected("Size", "SAML AuthnRequest exceeds max size."));
        }
        Ok(())
    }

    pub fn validate(&self, request: &AuthnRequest) -> Result<(), ValidationError> {
        self.check_size(request.serialized_len)?;

        if !is_present(&request.id) {
            return Err(rejected("ID", "ID is required"));
        }
        match request.version.as_deref() {
            None => return Err(rejected("Version", "Version is required")),
            Some(v) if v != self.config.supported_version => {
                return Err(rejected("Version", "Version is invalid."))
            }
            Some(_) => {}
        }
        if !is_present(&request.issue_instant) {
            return Err(rejected("IssueInstant", "IssueInstant is required"));
        }
        if let Some(consent) = &request.consent {
            if !self.config.is_consent_allowed(consent) {
                return Err(rejected("Consent", "Consent is invalid"));
            }
        }

        match request.force_authn {
            None => return Err(rejected("ForceAuthn", "ForceAuthn is required.")),
            Some(false) => return Err(rejected("ForceAuthn", "ForceAuthn is invalid.")),
            Some(true) => {}
        }
        match request.is_passive {
            None => return Err(rejected("IsPassive", "IsPassive is required.")),
            Some(true) => return Err(rejected("IsPassive", "IsPassive is invalid.")),
            Some(false) => {}
        }

        if let Some(binding) = request.protocol_binding.as_deref() {
            let browser = binding == BINDING_HTTP_POST || binding == BINDING_HTTP_REDIRECT;
            if !browser && binding != BINDING_SOAP {
                return Err(rejected("ProtocolBinding", "ProtocolBinding is invalid."));
            }
            if browser && !is_present(&request.destination) {
                return Err(rejected("Destination", "Destination is required."));
            }
        }

        if !is_present(&request.provider_name) {
            return Err(rejected("ProviderName", "ProviderName is required."));
        }
        if !is_present(&request.issuer) {
            return Err(rejected("Issuer", "Issuer is required."));
        }
        if request.signature.is_none() {
            return Err(rejected("Signature", "Signature is required"));
        }
        if !request.has_extensions {
            return Err(rejected("Extensions", "Extensions is required."));
        }
        if let Some(format) = request.name_id_policy_format.as_deref() {
            if !NAME_ID_FORMATS.contains(&format) {
                return Err(rejected("NameIDPolicy", "NameIDPolicy format is invalid."));
            }
        }

        loa::validate_requested_loas(request)
    }
}
