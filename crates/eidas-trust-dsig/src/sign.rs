#![forbid(unsafe_code)]

//! Enveloped signature creation.
//!
//! The `<ds:Signature>` is inserted right after the `<saml:Issuer>` child of
//! the signed element, where the SAML schema places it.

use base64::Engine;
use eidas_trust_c14n::C14nMode;
use eidas_trust_core::{algorithm, ns, Error};
use eidas_trust_crypto::{HashAlgorithm, SignatureAlgorithm};
use eidas_trust_keys::Credential;
use eidas_trust_xml::find_child;

/// Sign the element whose `ID` is `element_id` with `credential`'s private
/// key and return the document with the signature in place.
pub fn sign_enveloped(
    xml: &str,
    element_id: &str,
    credential: &Credential,
    signature_method: &str,
    digest_method: &str,
) -> Result<String, Error> {
    let private_key = credential
        .private_key()
        .ok_or_else(|| Error::Key(format!("no private key for {}", credential.subject())))?;
    let sig_alg = SignatureAlgorithm::from_uri(signature_method)?;
    let hash = HashAlgorithm::from_uri(digest_method)?;

    let doc = eidas_trust_xml::parse(xml)?;
    let element = doc
        .descendants()
        .find(|n| n.is_element() && n.attribute(ns::attr::ID) == Some(element_id))
        .ok_or_else(|| Error::MissingElement(format!("element with ID {element_id}")))?;
    if find_child(element, ns::DSIG, ns::node::SIGNATURE).is_some() {
        return Err(Error::XmlStructure(format!("{element_id} is already signed")));
    }
    let issuer = find_child(element, ns::SAML, ns::node::ISSUER)
        .ok_or_else(|| Error::MissingElement(format!("Issuer of {element_id}")))?;
    let insert_at = issuer.range().end;

    // Nothing else is enveloped yet, so the element as it stands is what
    // the verifier will see once the signature is removed.
    let canonical = eidas_trust_c14n::canonicalize(element, C14nMode::Exclusive, None, &[])?;
    let engine = base64::engine::general_purpose::STANDARD;
    let digest_value = engine.encode(hash.digest(&canonical));

    let signed_info = format!(
        concat!(
            r#"<ds:SignedInfo xmlns:ds="{dsig}">"#,
            r#"<ds:CanonicalizationMethod Algorithm="{c14n}"/>"#,
            r#"<ds:SignatureMethod Algorithm="{sig}"/>"#,
            r##"<ds:Reference URI="#{id}">"##,
            r#"<ds:Transforms>"#,
            r#"<ds:Transform Algorithm="{enveloped}"/>"#,
            r#"<ds:Transform Algorithm="{c14n}"/>"#,
            r#"</ds:Transforms>"#,
            r#"<ds:DigestMethod Algorithm="{digest}"/>"#,
            r#"<ds:DigestValue>{digest_value}</ds:DigestValue>"#,
            r#"</ds:Reference>"#,
            r#"</ds:SignedInfo>"#,
        ),
        dsig = ns::DSIG,
        c14n = algorithm::EXC_C14N,
        sig = signature_method,
        id = element_id,
        enveloped = algorithm::ENVELOPED_SIGNATURE,
        digest = digest_method,
        digest_value = digest_value,
    );

    // Exclusive C14N of SignedInfo only depends on its own subtree.
    let signed_info_doc = eidas_trust_xml::parse(&signed_info)?;
    let canonical_signed_info = eidas_trust_c14n::canonicalize(
        signed_info_doc.root_element(),
        C14nMode::Exclusive,
        None,
        &[],
    )?;
    let signature_value = engine.encode(private_key.sign(&sig_alg, &canonical_signed_info)?);

    let signature = format!(
        concat!(
            r#"<ds:Signature xmlns:ds="{dsig}">"#,
            "{signed_info}",
            r#"<ds:SignatureValue>{signature_value}</ds:SignatureValue>"#,
            r#"<ds:KeyInfo><ds:X509Data><ds:X509Certificate>{cert}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>"#,
            r#"</ds:Signature>"#,
        ),
        dsig = ns::DSIG,
        signed_info = signed_info.replacen(&format!(r#" xmlns:ds="{}""#, ns::DSIG), "", 1),
        signature_value = signature_value,
        cert = engine.encode(credential.der()),
    );

    tracing::debug!(id = element_id, algorithm = signature_method, "signed element");
    let mut out = String::with_capacity(xml.len() + signature.len());
    out.push_str(&xml[..insert_at]);
    out.push_str(&signature);
    out.push_str(&xml[insert_at..]);
    Ok(out)
}
