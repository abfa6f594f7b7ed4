#![forbid(unsafe_code)]

//! Enveloped XML-DSig over SAML protocol messages and assertions.
//!
//! A SAML signature is a `<ds:Signature>` child of the signed element with a
//! single `Reference` to that element's `ID`, the enveloped-signature
//! transform and exclusive C14N. Only that shape is produced and accepted.

pub mod sign;
pub mod verify;

pub use sign::sign_enveloped;
pub use verify::{verify_enveloped, VerifyResult};

use eidas_trust_core::{ns, Error};

/// Base64 content of an element, whitespace removed.
fn decode_base64_text(node: roxmltree::Node<'_, '_>) -> Result<Vec<u8>, Error> {
    use base64::Engine;
    let text: String = node
        .text()
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map_err(|e| Error::Base64(format!("{}: {e}", node.tag_name().name())))
}

fn algorithm_of<'a>(node: roxmltree::Node<'a, '_>) -> Result<&'a str, Error> {
    node.attribute(ns::attr::ALGORITHM).ok_or_else(|| {
        Error::MissingAttribute(format!("Algorithm on {}", node.tag_name().name()))
    })
}

/// `PrefixList` of an `ec:InclusiveNamespaces` child, if any.
fn inclusive_prefixes(method: roxmltree::Node<'_, '_>) -> Vec<String> {
    eidas_trust_xml::find_child(method, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|n| n.attribute(ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}
