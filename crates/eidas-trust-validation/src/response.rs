#![forbid(unsafe_code)]

//! Ordered validation of an inbound `Response`.

use crate::config::ValidationConfig;
use crate::{is_present, rejected};
use eidas_trust_core::ValidationError;
use eidas_trust_saml::Response;

/// Validates Responses against a [`ValidationConfig`].
///
/// Checks run in this order and the first failure is returned: size, `ID`,
/// `InResponseTo`, `Version`, `IssueInstant`, `Destination`, `Consent`,
/// `Issuer`, `Status`, signature, assertions. Encrypted assertions count as
/// assertions.
#[derive(Debug, Clone, Copy)]
pub struct ResponseValidator<'a> {
    config: &'a ValidationConfig,
}

impl<'a> ResponseValidator<'a> {
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    /// Size guard, usable on the raw message before parsing.
    pub fn check_size(&self, serialized_len: usize) -> Result<(), ValidationError> {
        if serialized_len > self.config.max_response_size {
            return Err(rejected("Size", "SAML Response exceeds max size."));
        }
        Ok(())
    }

    pub fn validate(&self, response: &Response) -> Result<(), ValidationError> {
        self.check_size(response.serialized_len)?;

        if !is_present(&response.id) {
            return Err(rejected("ID", "ID is required"));
        }
        if !is_present(&response.in_response_to) {
            return Err(rejected("InResponseTo", "InResponseTo is required"));
        }
        match response.version.as_deref() {
            None => return Err(rejected("Version", "Version is required")),
            Some(v) if v != self.config.supported_version => {
                return Err(rejected("Version", "Version is invalid."))
            }
            Some(_) => {}
        }
        if !is_present(&response.issue_instant) {
            return Err(rejected("IssueInstant", "IssueInstant is required"));
        }
        if !is_present(&response.destination) {
            return Err(rejected("Destination", "Destination is required"));
        }
        if let Some(consent) = &response.consent {
            if !self.config.is_consent_allowed(consent) {
                return Err(rejected("Consent", "Consent is invalid"));
            }
        }
        if !is_present(&response.issuer) {
            return Err(rejected("Issuer", "Issuer is required"));
        }
        if !response.status.as_ref().map_or(false, |s| is_present(&s.code)) {
            return Err(rejected("Status", "Status is required"));
        }
        if response.signature.is_none() {
            return Err(rejected("Signature", "Signature is required"));
        }
        if !response.has_assertions() {
            return Err(rejected("Assertion", "Assertion is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eidas_trust_saml::{Assertion, EncryptedAssertion, Signature, Status};

    fn valid_response() -> Response {
        let mut response = Response::default();
        response.id = Some("_resp".into());
        response.in_response_to = Some("_req".into());
        response.version = Some("2.0".into());
        response.issue_instant = Some("2024-05-01T10:00:05Z".into());
        response.destination = Some("https://connector.example/ColleagueResponse".into());
        response.issuer = Some("https://proxy.example/metadata".into());
        response.status = Some(Status {
            code: Some(Status::SUCCESS.into()),
            ..Status::default()
        });
        response.signature = Some(Signature::default());
        response.assertions = vec![Assertion::default()];
        response.serialized_len = 8192;
        response
    }

    fn error(response: &Response) -> String {
        ResponseValidator::new(&ValidationConfig::default())
            .validate(response)
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn accepts_valid_response() {
        ResponseValidator::new(&ValidationConfig::default())
            .validate(&valid_response())
            .unwrap();
    }

    #[test]
    fn oversized_response_wins_over_other_failures() {
        let mut response = Response::default();
        response.serialized_len = 131_073;
        assert_eq!(error(&response), "SAML Response exceeds max size.");

        let config = ValidationConfig::default().with_max_message_size(100);
        let err = ResponseValidator::new(&config)
            .validate(&valid_response())
            .unwrap_err();
        assert_eq!(err.field(), "Size");
    }

    #[test]
    fn id_is_checked_before_in_response_to() {
        let mut response = valid_response();
        response.id = None;
        response.in_response_to = None;
        assert_eq!(error(&response), "ID is required");

        response.id = Some("_resp".into());
        assert_eq!(error(&response), "InResponseTo is required");
    }

    #[test]
    fn header_fields_in_order() {
        let mut response = valid_response();
        response.version = Some("3.0".into());
        response.destination = None;
        assert_eq!(error(&response), "Version is invalid.");

        response.version = None;
        assert_eq!(error(&response), "Version is required");

        let mut response = valid_response();
        response.issue_instant = None;
        assert_eq!(error(&response), "IssueInstant is required");

        let mut response = valid_response();
        response.destination = None;
        assert_eq!(error(&response), "Destination is required");

        let mut response = valid_response();
        response.consent = Some("urn:oasis:names:tc:SAML:2.0:consent:unknown".into());
        assert_eq!(error(&response), "Consent is invalid");

        let mut response = valid_response();
        response.issuer = None;
        assert_eq!(error(&response), "Issuer is required");
    }

    #[test]
    fn status_signature_assertion() {
        let mut response = valid_response();
        response.status = Some(Status::default());
        assert_eq!(error(&response), "Status is required");

        let mut response = valid_response();
        response.signature = None;
        assert_eq!(error(&response), "Signature is required");

        let mut response = valid_response();
        response.assertions.clear();
        assert_eq!(error(&response), "Assertion is required");

        response.encrypted_assertions = vec![EncryptedAssertion::default()];
        ResponseValidator::new(&ValidationConfig::default())
            .validate(&response)
            .unwrap();
    }
}
