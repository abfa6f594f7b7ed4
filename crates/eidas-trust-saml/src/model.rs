#![forbid(unsafe_code)]

//! Message types. All values are built once by the parser and only read.

use eidas_trust_keys::{KeyMaterial, SignedMessage};
use std::collections::HashMap;
use std::ops::Range;

/// How requested and asserted levels of assurance are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonMode {
    Minimum,
    Exact,
}

impl ComparisonMode {
    /// Parse the `Comparison` attribute value.
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value {
            "minimum" => Some(Self::Minimum),
            "exact" => Some(Self::Exact),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimum => "minimum",
            Self::Exact => "exact",
        }
    }
}

impl std::fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An enveloped `<ds:Signature>` as far as policy checks need it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub signature_method: Option<String>,
    pub digest_methods: Vec<String>,
    /// `URI` of the first `Reference`.
    pub reference_uri: Option<String>,
    pub key_material: Option<KeyMaterial>,
}

/// Identifier index: `ID` attribute value to the element's byte range in the
/// serialized message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdIndex {
    entries: HashMap<String, IdTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IdTarget {
    element: String,
    range: Range<usize>,
}

impl IdIndex {
    pub(crate) fn insert(&mut self, id: String, element: &str, range: Range<usize>) {
        self.entries.entry(id).or_insert(IdTarget {
            element: element.to_owned(),
            range,
        });
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Local name of the element carrying `id`.
    pub fn element_name(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|t| t.element.as_str())
    }

    fn range(&self, id: &str) -> Option<Range<usize>> {
        self.entries.get(id).map(|t| t.range.clone())
    }
}

/// Resolve a same-document reference (`#id`) against `xml`.
fn resolve<'a>(xml: &'a str, ids: &IdIndex, uri: &str) -> Option<&'a str> {
    let id = uri.strip_prefix('#')?;
    xml.get(ids.range(id)?)
}

/// An `eidas:RequestedAttribute`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedAttribute {
    pub name: String,
    pub friendly_name: Option<String>,
    pub name_format: Option<String>,
    pub is_required: bool,
}

/// `samlp:RequestedAuthnContext`: the requested LoAs and how to compare them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedAuthnContext {
    /// Raw `Comparison` attribute; SAML's default is `exact` when absent.
    pub comparison: Option<String>,
    pub loas: Vec<String>,
}

impl RequestedAuthnContext {
    pub fn comparison_mode(&self) -> Option<ComparisonMode> {
        match self.comparison.as_deref() {
            None => Some(ComparisonMode::Exact),
            Some(value) => ComparisonMode::from_attribute(value),
        }
    }

    /// The comparison as written, `exact` when absent.
    pub fn comparison_str(&self) -> &str {
        self.comparison.as_deref().unwrap_or("exact")
    }
}

/// A parsed `samlp:AuthnRequest`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthnRequest {
    pub id: Option<String>,
    pub version: Option<String>,
    pub issue_instant: Option<String>,
    pub destination: Option<String>,
    pub consent: Option<String>,
    pub force_authn: Option<bool>,
    pub is_passive: Option<bool>,
    pub protocol_binding: Option<String>,
    pub provider_name: Option<String>,
    pub issuer: Option<String>,
    pub assertion_consumer_service_url: Option<String>,
    pub has_extensions: bool,
    pub requested_attributes: Vec<RequestedAttribute>,
    pub name_id_policy_format: Option<String>,
    pub requested_authn_context: Option<RequestedAuthnContext>,
    pub signature: Option<Signature>,
    /// Length in bytes of the serialized message.
    pub serialized_len: usize,
    pub ids: IdIndex,
    pub(crate) xml: String,
}

impl AuthnRequest {
    /// Requested LoAs, empty when there is no `RequestedAuthnContext`.
    pub fn loas(&self) -> &[String] {
        self.requested_authn_context
            .as_ref()
            .map(|c| c.loas.as_slice())
            .unwrap_or(&[])
    }

    pub fn comparison_mode(&self) -> Option<ComparisonMode> {
        self.requested_authn_context
            .as_ref()
            .and_then(RequestedAuthnContext::comparison_mode)
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Serialized element referenced by a same-document URI (`#id`).
    pub fn resolve_reference(&self, uri: &str) -> Option<&str> {
        resolve(&self.xml, &self.ids, uri)
    }
}

/// `samlp:Status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub code: Option<String>,
    pub sub_code: Option<String>,
    pub message: Option<String>,
}

impl Status {
    pub const SUCCESS: &'static str = "urn:oasis:names:tc:SAML:2.0:status:Success";

    pub fn is_success(&self) -> bool {
        self.code.as_deref() == Some(Self::SUCCESS)
    }
}

/// A `saml:Attribute` and its values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub friendly_name: Option<String>,
    pub values: Vec<String>,
}

/// A plain `saml:Assertion`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assertion {
    pub id: Option<String>,
    pub issuer: Option<String>,
    pub subject_name_id: Option<String>,
    /// `AuthnStatement/AuthnContext/AuthnContextClassRef`.
    pub level_of_assurance: Option<String>,
    pub attributes: Vec<Attribute>,
    pub signature: Option<Signature>,
}

/// A `saml:EncryptedAssertion` before decryption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedAssertion {
    pub data_algorithm: Option<String>,
    /// `EncryptionMethod` algorithms of every `EncryptedKey` inside.
    pub key_algorithms: Vec<String>,
}

/// A parsed `samlp:Response`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub id: Option<String>,
    pub in_response_to: Option<String>,
    pub version: Option<String>,
    pub issue_instant: Option<String>,
    pub destination: Option<String>,
    pub consent: Option<String>,
    pub issuer: Option<String>,
    pub status: Option<Status>,
    pub signature: Option<Signature>,
    pub assertions: Vec<Assertion>,
    pub encrypted_assertions: Vec<EncryptedAssertion>,
    pub serialized_len: usize,
    pub ids: IdIndex,
    pub(crate) xml: String,
}

impl Response {
    /// Plain or encrypted assertions are present.
    pub fn has_assertions(&self) -> bool {
        !self.assertions.is_empty() || !self.encrypted_assertions.is_empty()
    }

    pub fn is_encrypted(&self) -> bool {
        !self.encrypted_assertions.is_empty()
    }

    /// The serialized message this value was parsed from.
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Serialized element referenced by a same-document URI (`#id`).
    pub fn resolve_reference(&self, uri: &str) -> Option<&str> {
        resolve(&self.xml, &self.ids, uri)
    }
}

impl SignedMessage for AuthnRequest {
    fn signature_key_material(&self) -> Option<&KeyMaterial> {
        self.signature.as_ref()?.key_material.as_ref()
    }
}

impl SignedMessage for Response {
    fn signature_key_material(&self) -> Option<&KeyMaterial> {
        self.signature.as_ref()?.key_material.as_ref()
    }
}

impl SignedMessage for Assertion {
    fn signature_key_material(&self) -> Option<&KeyMaterial> {
        self.signature.as_ref()?.key_material.as_ref()
    }
}
