#![forbid(unsafe_code)]

//! roxmltree-backed parser for `AuthnRequest` and `Response`.
//!
//! The parser records what is present and leaves judgement to the
//! validators: a missing mandatory attribute parses to `None`. Only XML that
//! cannot be read at all, or a root element of the wrong kind, is an error.

use crate::model::{
    Assertion, Attribute, AuthnRequest, EncryptedAssertion, IdIndex, RequestedAttribute,
    RequestedAuthnContext, Response, Signature, Status,
};
use eidas_trust_core::{ns, Error};
use eidas_trust_keys::keyinfo;
use eidas_trust_xml::{build_id_map, child_text, find_child, find_children, find_descendants};
use roxmltree::{Document, Node};

/// Parse a serialized `samlp:AuthnRequest`.
pub fn parse_authn_request(xml: &str) -> Result<AuthnRequest, Error> {
    let doc = eidas_trust_xml::parse(xml)?;
    let root = expect_root(&doc, ns::node::AUTHN_REQUEST)?;

    let requested_attributes = find_child(root, ns::SAMLP, ns::node::EXTENSIONS)
        .and_then(|ext| find_child(ext, ns::EIDAS, ns::node::REQUESTED_ATTRIBUTES))
        .map(|list| {
            find_children(list, ns::EIDAS, ns::node::REQUESTED_ATTRIBUTE)
                .into_iter()
                .map(read_requested_attribute)
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    let requested_authn_context =
        find_child(root, ns::SAMLP, ns::node::REQUESTED_AUTHN_CONTEXT).map(|ctx| {
            RequestedAuthnContext {
                comparison: attr(ctx, ns::attr::COMPARISON),
                loas: find_children(ctx, ns::SAML, ns::node::AUTHN_CONTEXT_CLASS_REF)
                    .into_iter()
                    .filter_map(text)
                    .collect(),
            }
        });

    let request = AuthnRequest {
        id: attr(root, ns::attr::ID),
        version: attr(root, ns::attr::VERSION),
        issue_instant: attr(root, ns::attr::ISSUE_INSTANT),
        destination: attr(root, ns::attr::DESTINATION),
        consent: attr(root, ns::attr::CONSENT),
        force_authn: bool_attr(root, ns::attr::FORCE_AUTHN)?,
        is_passive: bool_attr(root, ns::attr::IS_PASSIVE)?,
        protocol_binding: attr(root, ns::attr::PROTOCOL_BINDING),
        provider_name: attr(root, ns::attr::PROVIDER_NAME),
        issuer: child_text(root, ns::SAML, ns::node::ISSUER),
        assertion_consumer_service_url: attr(root, ns::attr::ASSERTION_CONSUMER_SERVICE_URL),
        has_extensions: find_child(root, ns::SAMLP, ns::node::EXTENSIONS).is_some(),
        requested_attributes,
        name_id_policy_format: find_child(root, ns::SAMLP, ns::node::NAME_ID_POLICY)
            .and_then(|n| attr(n, ns::attr::FORMAT)),
        requested_authn_context,
        signature: read_signature(root)?,
        serialized_len: xml.len(),
        ids: index_ids(&doc),
        xml: xml.to_owned(),
    };

    tracing::debug!(
        id = request.id.as_deref().unwrap_or(""),
        loas = request.loas().len(),
        "parsed AuthnRequest"
    );
    Ok(request)
}

/// Parse a serialized `samlp:Response`.
pub fn parse_response(xml: &str) -> Result<Response, Error> {
    let doc = eidas_trust_xml::parse(xml)?;
    let root = expect_root(&doc, ns::node::RESPONSE)?;

    let status = find_child(root, ns::SAMLP, ns::node::STATUS).map(|s| {
        let code = find_child(s, ns::SAMLP, ns::node::STATUS_CODE);
        Status {
            code: code.and_then(|c| attr(c, ns::attr::VALUE)),
            sub_code: code
                .and_then(|c| find_child(c, ns::SAMLP, ns::node::STATUS_CODE))
                .and_then(|c| attr(c, ns::attr::VALUE)),
            message: child_text(s, ns::SAMLP, ns::node::STATUS_MESSAGE),
        }
    });

    let assertions = find_children(root, ns::SAML, ns::node::ASSERTION)
        .into_iter()
        .map(read_assertion)
        .collect::<Result<Vec<_>, _>>()?;

    let encrypted_assertions = find_children(root, ns::SAML, ns::node::ENCRYPTED_ASSERTION)
        .into_iter()
        .map(read_encrypted_assertion)
        .collect();

    let response = Response {
        id: attr(root, ns::attr::ID),
        in_response_to: attr(root, ns::attr::IN_RESPONSE_TO),
        version: attr(root, ns::attr::VERSION),
        issue_instant: attr(root, ns::attr::ISSUE_INSTANT),
        destination: attr(root, ns::attr::DESTINATION),
        consent: attr(root, ns::attr::CONSENT),
        issuer: child_text(root, ns::SAML, ns::node::ISSUER),
        status,
        signature: read_signature(root)?,
        assertions,
        encrypted_assertions,
        serialized_len: xml.len(),
        ids: index_ids(&doc),
        xml: xml.to_owned(),
    };

    tracing::debug!(
        id = response.id.as_deref().unwrap_or(""),
        assertions = response.assertions.len(),
        encrypted = response.encrypted_assertions.len(),
        "parsed Response"
    );
    Ok(response)
}

fn expect_root<'a, 'input>(
    doc: &'a Document<'input>,
    local_name: &str,
) -> Result<Node<'a, 'input>, Error> {
    let root = doc.root_element();
    let tag = root.tag_name();
    if tag.name() != local_name || tag.namespace() != Some(ns::SAMLP) {
        return Err(Error::XmlStructure(format!(
            "expected samlp:{local_name}, found {}",
            tag.name()
        )));
    }
    Ok(root)
}

/// Attribute value, `None` when absent or blank.
fn attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn bool_attr(node: Node<'_, '_>, name: &str) -> Result<Option<bool>, Error> {
    match node.attribute(name).map(str::trim) {
        None => Ok(None),
        Some("true" | "1") => Ok(Some(true)),
        Some("false" | "0") => Ok(Some(false)),
        Some(other) => Err(Error::XmlStructure(format!(
            "{name} is not an xs:boolean: {other}"
        ))),
    }
}

fn text(node: Node<'_, '_>) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

fn index_ids(doc: &Document<'_>) -> IdIndex {
    let mut index = IdIndex::default();
    for (id, node_id) in build_id_map(doc) {
        if let Some(node) = doc.get_node(node_id) {
            index.insert(id, node.tag_name().name(), node.range());
        }
    }
    index
}

fn read_signature(parent: Node<'_, '_>) -> Result<Option<Signature>, Error> {
    let Some(sig) = find_child(parent, ns::DSIG, ns::node::SIGNATURE) else {
        return Ok(None);
    };
    let signed_info = find_child(sig, ns::DSIG, ns::node::SIGNED_INFO);
    let references = signed_info
        .map(|si| find_children(si, ns::DSIG, ns::node::REFERENCE))
        .unwrap_or_default();

    let key_material = match find_child(sig, ns::DSIG, ns::node::KEY_INFO) {
        Some(ki) => keyinfo::extract_key_material(ki)?,
        None => None,
    };

    Ok(Some(Signature {
        signature_method: signed_info
            .and_then(|si| find_child(si, ns::DSIG, ns::node::SIGNATURE_METHOD))
            .and_then(|m| attr(m, ns::attr::ALGORITHM)),
        digest_methods: references
            .iter()
            .filter_map(|r| find_child(*r, ns::DSIG, ns::node::DIGEST_METHOD))
            .filter_map(|m| attr(m, ns::attr::ALGORITHM))
            .collect(),
        reference_uri: references
            .first()
            .and_then(|r| r.attribute(ns::attr::URI))
            .map(str::to_owned),
        key_material,
    }))
}

fn read_requested_attribute(node: Node<'_, '_>) -> Result<RequestedAttribute, Error> {
    Ok(RequestedAttribute {
        name: attr(node, ns::attr::NAME)
            .ok_or_else(|| Error::MissingAttribute("Name on RequestedAttribute".into()))?,
        friendly_name: attr(node, ns::attr::FRIENDLY_NAME),
        name_format: attr(node, ns::attr::NAME_FORMAT),
        is_required: bool_attr(node, ns::attr::IS_REQUIRED)?.unwrap_or(false),
    })
}

fn read_assertion(node: Node<'_, '_>) -> Result<Assertion, Error> {
    let level_of_assurance = find_child(node, ns::SAML, ns::node::AUTHN_STATEMENT)
        .and_then(|s| find_child(s, ns::SAML, ns::node::AUTHN_CONTEXT))
        .and_then(|c| child_text(c, ns::SAML, ns::node::AUTHN_CONTEXT_CLASS_REF));

    let attributes = find_children(node, ns::SAML, ns::node::ATTRIBUTE_STATEMENT)
        .into_iter()
        .flat_map(|s| find_children(s, ns::SAML, ns::node::ATTRIBUTE))
        .map(|a| {
            Ok(Attribute {
                name: attr(a, ns::attr::NAME)
                    .ok_or_else(|| Error::MissingAttribute("Name on Attribute".into()))?,
                friendly_name: attr(a, ns::attr::FRIENDLY_NAME),
                values: find_children(a, ns::SAML, ns::node::ATTRIBUTE_VALUE)
                    .into_iter()
                    .filter_map(text)
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(Assertion {
        id: attr(node, ns::attr::ID),
        issuer: child_text(node, ns::SAML, ns::node::ISSUER),
        subject_name_id: find_child(node, ns::SAML, ns::node::SUBJECT)
            .and_then(|s| child_text(s, ns::SAML, ns::node::NAME_ID)),
        level_of_assurance,
        attributes,
        signature: read_signature(node)?,
    })
}

fn read_encrypted_assertion(node: Node<'_, '_>) -> EncryptedAssertion {
    let data_algorithm = find_child(node, ns::ENC, ns::node::ENCRYPTED_DATA)
        .and_then(|d| find_child(d, ns::ENC, ns::node::ENCRYPTION_METHOD))
        .and_then(|m| attr(m, ns::attr::ALGORITHM));
    let key_algorithms = find_descendants(node, ns::ENC, ns::node::ENCRYPTED_KEY)
        .into_iter()
        .filter_map(|k| find_child(k, ns::ENC, ns::node::ENCRYPTION_METHOD))
        .filter_map(|m| attr(m, ns::attr::ALGORITHM))
        .collect();
    EncryptedAssertion {
        data_algorithm,
        key_algorithms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComparisonMode;
    use eidas_trust_keys::{KeyMaterial, SignedMessage};

    const REQUEST: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<saml2p:AuthnRequest xmlns:saml2p="urn:oasis:names:tc:SAML:2.0:protocol"
    xmlns:saml2="urn:oasis:names:tc:SAML:2.0:assertion"
    xmlns:ds="http://www.w3.org/2000/09/xmldsig#"
    xmlns:eidas="http://eidas.europa.eu/saml-extensions"
    ID="_req1" Version="2.0" IssueInstant="2024-05-01T10:00:00Z"
    Destination="https://proxy.example/ColleagueRequest"
    Consent="urn:oasis:names:tc:SAML:2.0:consent:unspecified"
    ForceAuthn="true" IsPassive="false"
    ProtocolBinding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST"
    ProviderName="DEMO-SP"
    AssertionConsumerServiceURL="https://connector.example/ColleagueResponse">
  <saml2:Issuer>https://connector.example/metadata</saml2:Issuer>
  <ds:Signature>
    <ds:SignedInfo>
      <ds:SignatureMethod Algorithm="http://www.w3.org/2001/04/xmldsig-more#rsa-sha256"/>
      <ds:Reference URI="#_req1">
        <ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>
      </ds:Reference>
    </ds:SignedInfo>
    <ds:KeyInfo><ds:X509Data><ds:X509Certificate>AQID</ds:X509Certificate></ds:X509Data></ds:KeyInfo>
  </ds:Signature>
  <saml2p:Extensions>
    <eidas:RequestedAttributes>
      <eidas:RequestedAttribute Name="http://eidas.europa.eu/attributes/naturalperson/PersonIdentifier"
          FriendlyName="PersonIdentifier" isRequired="true"/>
      <eidas:RequestedAttribute Name="http://eidas.europa.eu/attributes/naturalperson/BirthName"/>
    </eidas:RequestedAttributes>
  </saml2p:Extensions>
  <saml2p:NameIDPolicy AllowCreate="true" Format="urn:oasis:names:tc:SAML:2.0:nameid-format:persistent"/>
  <saml2p:RequestedAuthnContext Comparison="minimum">
    <saml2:AuthnContextClassRef>http://eidas.europa.eu/LoA/substantial</saml2:AuthnContextClassRef>
  </saml2p:RequestedAuthnContext>
</saml2p:AuthnRequest>"##;

    #[test]
    fn parses_authn_request() {
        let req = parse_authn_request(REQUEST).unwrap();
        assert_eq!(req.id.as_deref(), Some("_req1"));
        assert_eq!(req.version.as_deref(), Some("2.0"));
        assert_eq!(req.force_authn, Some(true));
        assert_eq!(req.is_passive, Some(false));
        assert_eq!(req.provider_name.as_deref(), Some("DEMO-SP"));
        assert_eq!(req.issuer.as_deref(), Some("https://connector.example/metadata"));
        assert!(req.has_extensions);
        assert_eq!(req.requested_attributes.len(), 2);
        assert!(req.requested_attributes[0].is_required);
        assert!(!req.requested_attributes[1].is_required);
        assert_eq!(
            req.name_id_policy_format.as_deref(),
            Some("urn:oasis:names:tc:SAML:2.0:nameid-format:persistent")
        );
        assert_eq!(req.loas(), ["http://eidas.europa.eu/LoA/substantial"]);
        assert_eq!(req.comparison_mode(), Some(ComparisonMode::Minimum));
        assert_eq!(req.serialized_len, REQUEST.len());
    }

    #[test]
    fn request_signature_and_reference() {
        let req = parse_authn_request(REQUEST).unwrap();
        let sig = req.signature.as_ref().unwrap();
        assert_eq!(
            sig.signature_method.as_deref(),
            Some("http://www.w3.org/2001/04/xmldsig-more#rsa-sha256")
        );
        assert_eq!(sig.digest_methods, ["http://www.w3.org/2001/04/xmlenc#sha256"]);
        assert_eq!(
            req.signature_key_material(),
            Some(&KeyMaterial::Certificate(vec![1, 2, 3]))
        );

        let signed = req.resolve_reference(sig.reference_uri.as_deref().unwrap()).unwrap();
        assert!(signed.starts_with("<saml2p:AuthnRequest"));
        assert!(req.resolve_reference("#missing").is_none());
        assert!(req.resolve_reference("_req1").is_none());
    }

    #[test]
    fn absent_comparison_defaults_to_exact() {
        let xml = REQUEST.replace(r#" Comparison="minimum""#, "");
        let req = parse_authn_request(&xml).unwrap();
        assert_eq!(req.comparison_mode(), Some(ComparisonMode::Exact));
        assert_eq!(
            req.requested_authn_context.as_ref().unwrap().comparison_str(),
            "exact"
        );
    }

    #[test]
    fn missing_fields_parse_to_none() {
        let xml = REQUEST
            .replace(r#"ID="_req1" "#, "")
            .replace(r#"ForceAuthn="true" "#, "");
        let req = parse_authn_request(&xml).unwrap();
        assert!(req.id.is_none());
        assert!(req.force_authn.is_none());
    }

    #[test]
    fn wrong_root_is_rejected() {
        let err = parse_response(REQUEST).unwrap_err();
        assert!(matches!(err, Error::XmlStructure(_)));
        assert!(parse_authn_request("<a/>").is_err());
    }

    const RESPONSE: &str = r#"<saml2p:Response xmlns:saml2p="urn:oasis:names:tc:SAML:2.0:protocol"
    xmlns:saml2="urn:oasis:names:tc:SAML:2.0:assertion"
    ID="_resp1" InResponseTo="_req1" Version="2.0" IssueInstant="2024-05-01T10:00:05Z"
    Destination="https://connector.example/ColleagueResponse">
  <saml2:Issuer>https://proxy.example/metadata</saml2:Issuer>
  <saml2p:Status>
    <saml2p:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Responder">
      <saml2p:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:AuthnFailed"/>
    </saml2p:StatusCode>
    <saml2p:StatusMessage>202007 - Consent not given</saml2p:StatusMessage>
  </saml2p:Status>
  <saml2:Assertion ID="_a1">
    <saml2:Issuer>https://proxy.example/metadata</saml2:Issuer>
    <saml2:Subject><saml2:NameID>CZ/BE/12345</saml2:NameID></saml2:Subject>
    <saml2:AuthnStatement>
      <saml2:AuthnContext>
        <saml2:AuthnContextClassRef>http://eidas.europa.eu/LoA/high</saml2:AuthnContextClassRef>
      </saml2:AuthnContext>
    </saml2:AuthnStatement>
    <saml2:AttributeStatement>
      <saml2:Attribute Name="http://eidas.europa.eu/attributes/naturalperson/CurrentFamilyName" FriendlyName="FamilyName">
        <saml2:AttributeValue>Garcia</saml2:AttributeValue>
      </saml2:Attribute>
    </saml2:AttributeStatement>
  </saml2:Assertion>
</saml2p:Response>"#;

    #[test]
    fn parses_response_status_and_assertion() {
        let resp = parse_response(RESPONSE).unwrap();
        assert_eq!(resp.in_response_to.as_deref(), Some("_req1"));
        let status = resp.status.as_ref().unwrap();
        assert!(!status.is_success());
        assert_eq!(
            status.sub_code.as_deref(),
            Some("urn:oasis:names:tc:SAML:2.0:status:AuthnFailed")
        );
        assert_eq!(status.message.as_deref(), Some("202007 - Consent not given"));
        assert!(resp.signature.is_none());
        assert!(resp.signature_key_material().is_none());

        assert!(resp.has_assertions());
        assert!(!resp.is_encrypted());
        let assertion = &resp.assertions[0];
        assert_eq!(assertion.subject_name_id.as_deref(), Some("CZ/BE/12345"));
        assert_eq!(
            assertion.level_of_assurance.as_deref(),
            Some("http://eidas.europa.eu/LoA/high")
        );
        assert_eq!(assertion.attributes[0].values, ["Garcia"]);
        assert_eq!(resp.ids.element_name("_a1"), Some("Assertion"));
        assert_eq!(resp.ids.len(), 2);
    }

    #[test]
    fn records_encrypted_assertion_algorithms() {
        let xml = RESPONSE.replace(
            "</saml2p:Status>",
            r#"</saml2p:Status>
  <saml2:EncryptedAssertion>
    <xenc:EncryptedData xmlns:xenc="http://www.w3.org/2001/04/xmlenc#">
      <xenc:EncryptionMethod Algorithm="http://www.w3.org/2009/xmlenc11#aes256-gcm"/>
    </xenc:EncryptedData>
    <xenc:EncryptedKey xmlns:xenc="http://www.w3.org/2001/04/xmlenc#">
      <xenc:EncryptionMethod Algorithm="http://www.w3.org/2009/xmlenc11#rsa-oaep"/>
    </xenc:EncryptedKey>
  </saml2:EncryptedAssertion>"#,
        );
        let resp = parse_response(&xml).unwrap();
        assert!(resp.is_encrypted());
        let enc = &resp.encrypted_assertions[0];
        assert_eq!(
            enc.data_algorithm.as_deref(),
            Some("http://www.w3.org/2009/xmlenc11#aes256-gcm")
        );
        assert_eq!(enc.key_algorithms, ["http://www.w3.org/2009/xmlenc11#rsa-oaep"]);
    }

    #[test]
    fn invalid_boolean_is_a_parse_error() {
        let xml = REQUEST.replace(r#"IsPassive="false""#, r#"IsPassive="maybe""#);
        assert!(matches!(
            parse_authn_request(&xml),
            Err(Error::XmlStructure(_))
        ));
    }
}
