#![forbid(unsafe_code)]

//! Inbound message pipeline.

use crate::context::{NodeContext, TrustMode};
use crate::error::Error;
use eidas_trust_dsig::{verify_enveloped, VerifyResult};
use eidas_trust_keys::{
    check_chain_trust, check_explicit_trust, match_signature_certificate, PeerRole, SignedMessage,
};
use eidas_trust_saml::{parse_authn_request, parse_response, AuthnRequest, Response, Signature};
use eidas_trust_validation::loa::{self, LevelOfAssurance};
use eidas_trust_validation::{RequestValidator, ResponseValidator};

/// Runs inbound requests and responses through validation, signer lookup,
/// trust, signature verification, decryption and LoA checks, in that order.
#[derive(Debug, Clone, Copy)]
pub struct ResponseProcessor<'a> {
    ctx: &'a NodeContext,
}

impl<'a> ResponseProcessor<'a> {
    pub fn new(ctx: &'a NodeContext) -> Self {
        Self { ctx }
    }

    /// Accept a Response answering `request`.
    ///
    /// The returned response has its assertions decrypted and re-parsed.
    /// Signed assertions, plain or decrypted, are verified like the
    /// response itself.
    pub fn process(&self, xml: &str, request: &AuthnRequest) -> Result<Response, Error> {
        let validator = ResponseValidator::new(&self.ctx.validation);
        validator.check_size(xml.len())?;
        let response = parse_response(xml)?;
        validator.validate(&response)?;

        match (response.in_response_to.as_deref(), request.id.as_deref()) {
            (Some(answered), Some(asked)) if answered == asked => {}
            (answered, asked) => {
                tracing::warn!(?answered, ?asked, "response does not answer the request");
                return Err(Error::InResponseToMismatch);
            }
        }

        self.check_signer(
            xml,
            response.id.as_deref(),
            &response,
            response.signature.as_ref(),
            PeerRole::IdentityProvider,
        )?;

        let response = if response.is_encrypted() {
            eidas_trust_enc::decrypt(&response, &self.ctx.decryption)?
        } else {
            response
        };

        for assertion in &response.assertions {
            if assertion.signature.is_some() {
                self.check_signer(
                    response.xml(),
                    assertion.id.as_deref(),
                    assertion,
                    assertion.signature.as_ref(),
                    PeerRole::IdentityProvider,
                )?;
            }
        }

        for assertion in &response.assertions {
            let asserted = assertion.level_of_assurance.as_deref().unwrap_or_default();
            if !asserted_loa_satisfies(request, asserted) {
                tracing::warn!(
                    asserted,
                    requested = ?request.loas(),
                    "asserted LoA does not satisfy the request"
                );
                return Err(Error::LevelOfAssurance("Invalid level of assurance in response"));
            }
        }

        tracing::debug!(id = ?response.id, "response accepted");
        Ok(response)
    }

    /// Accept an AuthnRequest this node is asked to serve.
    pub fn process_request(&self, xml: &str) -> Result<AuthnRequest, Error> {
        let validator = RequestValidator::new(&self.ctx.validation);
        validator.check_size(xml.len())?;
        let request = parse_authn_request(xml)?;
        validator.validate(&request)?;

        self.check_signer(
            xml,
            request.id.as_deref(),
            &request,
            request.signature.as_ref(),
            PeerRole::ServiceProvider,
        )?;

        if !loa::is_request_loa_valid(Some(&request), Some(&self.ctx.allowed_loas)) {
            tracing::warn!(requested = ?request.loas(), "requested LoA cannot be served");
            return Err(Error::LevelOfAssurance("Invalid level of assurance in request"));
        }

        tracing::debug!(id = ?request.id, "request accepted");
        Ok(request)
    }

    /// Signature policy, signer lookup in the peer's metadata, key length,
    /// trust of the signing certificate and finally the enveloped signature
    /// of the element `id` in `xml` under that certificate's key.
    fn check_signer<M: SignedMessage>(
        &self,
        xml: &str,
        id: Option<&str>,
        message: &M,
        signature: Option<&Signature>,
        role: PeerRole,
    ) -> Result<(), Error> {
        let policy = &self.ctx.validation.signature_policy;
        if let Some(signature) = signature {
            policy.check_signature(signature)?;
        }

        let signer = match_signature_certificate(message, self.ctx.metadata.for_role(role))?
            .ok_or_else(|| {
                tracing::warn!(?role, "no metadata certificate matches the signature");
                Error::SignatureCertificateNotFound
            })?;
        policy.check_key(signer.public_key())?;

        let anchors = self.ctx.anchors_for(role);
        match self.ctx.trust_mode {
            TrustMode::Chain => check_chain_trust(signer, anchors, &self.ctx.trust)?,
            TrustMode::Explicit => check_explicit_trust(signer, anchors)?,
        }
        tracing::debug!(subject = %signer.subject(), ?role, "signing certificate trusted");

        let id = id.ok_or_else(|| Error::InvalidSignature("signed element has no ID".into()))?;
        match verify_enveloped(xml, id, signer.public_key()) {
            Ok(VerifyResult::Valid) => Ok(()),
            Ok(VerifyResult::Invalid { reason }) => Err(Error::InvalidSignature(reason)),
            Err(e) => {
                tracing::warn!(id, error = %e, "cannot verify XML signature");
                Err(Error::InvalidSignature(e.to_string()))
            }
        }
    }
}

/// Notified values are compared against the request's notified LoAs under
/// its comparison mode; non-notified values must be among the requested
/// ones.
fn asserted_loa_satisfies(request: &AuthnRequest, asserted: &str) -> bool {
    let mode = request.comparison_mode();
    match LevelOfAssurance::parse(asserted) {
        Some(LevelOfAssurance::Notified(_)) => request
            .loas()
            .iter()
            .any(|requested| loa::is_loa_valid(mode, requested, asserted)),
        Some(LevelOfAssurance::NonNotified(_)) => {
            loa::is_non_notified_loa_valid(mode, request.loas(), asserted)
        }
        None => false,
    }
}
