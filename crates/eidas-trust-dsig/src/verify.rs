#![forbid(unsafe_code)]

//! Enveloped signature verification.
//!
//! 1. Locate the element by `ID` (exactly one) and its `<ds:Signature>` child
//! 2. Check the single `Reference` points at that element
//! 3. Canonicalize the element without the signature and compare the digest
//! 4. Canonicalize `<SignedInfo>` and verify `<SignatureValue>` with the key

use eidas_trust_c14n::C14nMode;
use eidas_trust_core::{algorithm, ns, Error};
use eidas_trust_crypto::{EcdsaEncoding, HashAlgorithm, SignatureAlgorithm};
use eidas_trust_keys::PublicKey;
use eidas_trust_xml::{find_child, find_children};

use crate::{algorithm_of, decode_base64_text, inclusive_prefixes};

/// Result of signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid,
    Invalid { reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid)
    }

    fn invalid(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(%reason, "XML signature rejected");
        Self::Invalid { reason }
    }
}

/// Verify the enveloped signature of the element whose `ID` is `element_id`.
///
/// `Err` means the signature could not be processed (missing elements,
/// unsupported algorithms, a key of the wrong type); `Invalid` means it was
/// processed and does not hold.
pub fn verify_enveloped(
    xml: &str,
    element_id: &str,
    key: &PublicKey,
) -> Result<VerifyResult, Error> {
    let doc = eidas_trust_xml::parse(xml)?;

    let mut carriers = doc
        .descendants()
        .filter(|n| n.is_element() && n.attribute(ns::attr::ID) == Some(element_id));
    let element = carriers
        .next()
        .ok_or_else(|| Error::MissingElement(format!("element with ID {element_id}")))?;
    if carriers.next().is_some() {
        return Ok(VerifyResult::invalid(format!("ID {element_id} is not unique")));
    }

    let signature = find_child(element, ns::DSIG, ns::node::SIGNATURE)
        .ok_or_else(|| Error::MissingElement("Signature".into()))?;
    let signed_info = find_child(signature, ns::DSIG, ns::node::SIGNED_INFO)
        .ok_or_else(|| Error::MissingElement("SignedInfo".into()))?;

    let c14n_method = find_child(signed_info, ns::DSIG, ns::node::CANONICALIZATION_METHOD)
        .ok_or_else(|| Error::MissingElement("CanonicalizationMethod".into()))?;
    let c14n_uri = algorithm_of(c14n_method)?;
    let c14n_mode = C14nMode::from_uri(c14n_uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {c14n_uri}")))?;

    let sig_method = find_child(signed_info, ns::DSIG, ns::node::SIGNATURE_METHOD)
        .ok_or_else(|| Error::MissingElement("SignatureMethod".into()))?;
    let sig_alg = SignatureAlgorithm::from_uri(algorithm_of(sig_method)?)?;

    // Reference: exactly one, to the enclosing element.
    let references = find_children(signed_info, ns::DSIG, ns::node::REFERENCE);
    let [reference] = references.as_slice() else {
        return Ok(VerifyResult::invalid(format!(
            "expected one Reference, found {}",
            references.len()
        )));
    };
    let expected_uri = format!("#{element_id}");
    if reference.attribute(ns::attr::URI) != Some(expected_uri.as_str()) {
        return Ok(VerifyResult::invalid(format!(
            "Reference URI {:?} does not point at {expected_uri}",
            reference.attribute(ns::attr::URI).unwrap_or("")
        )));
    }

    let mut enveloped = false;
    let mut ref_mode = None;
    let mut ref_prefixes = Vec::new();
    if let Some(transforms) = find_child(*reference, ns::DSIG, ns::node::TRANSFORMS) {
        for transform in find_children(transforms, ns::DSIG, ns::node::TRANSFORM) {
            match algorithm_of(transform)? {
                algorithm::ENVELOPED_SIGNATURE => enveloped = true,
                uri => {
                    let mode = C14nMode::from_uri(uri).ok_or_else(|| {
                        Error::UnsupportedAlgorithm(format!("transform: {uri}"))
                    })?;
                    ref_mode = Some(mode);
                    ref_prefixes = inclusive_prefixes(transform);
                }
            }
        }
    }
    if !enveloped {
        return Ok(VerifyResult::invalid(
            "Reference lacks the enveloped-signature transform",
        ));
    }

    let digest_method = find_child(*reference, ns::DSIG, ns::node::DIGEST_METHOD)
        .ok_or_else(|| Error::MissingElement("DigestMethod".into()))?;
    let hash = HashAlgorithm::from_uri(algorithm_of(digest_method)?)?;
    let digest_value = find_child(*reference, ns::DSIG, ns::node::DIGEST_VALUE)
        .ok_or_else(|| Error::MissingElement("DigestValue".into()))?;
    let expected_digest = decode_base64_text(digest_value)?;

    let referenced = eidas_trust_c14n::canonicalize(
        element,
        ref_mode.unwrap_or(C14nMode::Exclusive),
        Some(signature.id()),
        &ref_prefixes,
    )?;
    if hash.digest(&referenced) != expected_digest {
        return Ok(VerifyResult::invalid(format!(
            "digest mismatch for Reference {expected_uri}"
        )));
    }

    let signature_value = find_child(signature, ns::DSIG, ns::node::SIGNATURE_VALUE)
        .ok_or_else(|| Error::MissingElement("SignatureValue".into()))?;
    let signature_bytes = decode_base64_text(signature_value)?;
    let canonical_signed_info = eidas_trust_c14n::canonicalize(
        signed_info,
        c14n_mode,
        None,
        &inclusive_prefixes(c14n_method),
    )?;

    if !key.verify(
        &sig_alg,
        &canonical_signed_info,
        &signature_bytes,
        EcdsaEncoding::Concatenated,
    )? {
        return Ok(VerifyResult::invalid("SignatureValue does not verify"));
    }

    tracing::debug!(id = element_id, algorithm = sig_alg.uri(), "XML signature verified");
    Ok(VerifyResult::Valid)
}
