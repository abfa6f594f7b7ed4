//! End-to-end processing of signed and encrypted messages.

use eidas_trust::core::{algorithm, CertificateError};
use eidas_trust::dsig::sign_enveloped;
use eidas_trust::enc::{encrypt_assertions, DecryptionContext};
use eidas_trust::keys::loader::load_private_key_pkcs8_der;
use eidas_trust::keys::{Credential, MetadataCertificateSet, PeerRole, TrustAnchorSet};
use eidas_trust::saml::{AuthnRequest, RequestedAuthnContext};
use eidas_trust::{Error, NodeContext, ResponseProcessor, TrustMode};
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};

const HIGH: &str = "http://eidas.europa.eu/LoA/high";
const SUBSTANTIAL: &str = "http://eidas.europa.eu/LoA/substantial";

struct Issued {
    cert: rcgen::Certificate,
    key: KeyPair,
}

impl Issued {
    fn credential(&self) -> Credential {
        Credential::from_der(self.cert.der()).unwrap()
    }

    fn private_credential(&self) -> Credential {
        let key = load_private_key_pkcs8_der(&self.key.serialize_der()).unwrap();
        self.credential().with_private_key(key).unwrap()
    }

    fn sign(&self, xml: &str, id: &str) -> String {
        sign_enveloped(
            xml,
            id,
            &self.private_credential(),
            algorithm::ECDSA_SHA256,
            algorithm::SHA256,
        )
        .unwrap()
    }
}

fn params(cn: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, cn);
    params
}

fn root(cn: &str) -> Issued {
    let key = KeyPair::generate().unwrap();
    let mut params = params(cn);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = params.self_signed(&key).unwrap();
    Issued { cert, key }
}

fn issue(cn: &str, issuer: &Issued) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = params(cn).signed_by(&key, &issuer.cert, &issuer.key).unwrap();
    Issued { cert, key }
}

fn unsigned_response(asserted_loa: &str) -> String {
    format!(
        r#"<saml2p:Response xmlns:saml2p="urn:oasis:names:tc:SAML:2.0:protocol"
    xmlns:saml2="urn:oasis:names:tc:SAML:2.0:assertion"
    ID="_resp" InResponseTo="_req" Version="2.0" IssueInstant="2024-05-01T10:00:05Z"
    Destination="https://connector.example/ColleagueResponse"
    Consent="urn:oasis:names:tc:SAML:2.0:consent:obtained">
  <saml2:Issuer>https://proxy.example/metadata</saml2:Issuer>
  <saml2p:Status><saml2p:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></saml2p:Status>
  <saml2:Assertion ID="_a1" Version="2.0" IssueInstant="2024-05-01T10:00:05Z">
    <saml2:Issuer>https://proxy.example/metadata</saml2:Issuer>
    <saml2:Subject><saml2:NameID>ES/BE/0001</saml2:NameID></saml2:Subject>
    <saml2:AuthnStatement><saml2:AuthnContext>
      <saml2:AuthnContextClassRef>{asserted_loa}</saml2:AuthnContextClassRef>
    </saml2:AuthnContext></saml2:AuthnStatement>
    <saml2:AttributeStatement>
      <saml2:Attribute Name="http://eidas.europa.eu/attributes/naturalperson/CurrentFamilyName">
        <saml2:AttributeValue>Garcia</saml2:AttributeValue>
      </saml2:Attribute>
    </saml2:AttributeStatement>
  </saml2:Assertion>
</saml2p:Response>"#
    )
}

/// A response with its assertion and then the response itself signed.
fn response_xml(signer: &Issued, asserted_loa: &str) -> String {
    let xml = signer.sign(&unsigned_response(asserted_loa), "_a1");
    signer.sign(&xml, "_resp")
}

fn request_xml(signer: &Issued, loa: &str) -> String {
    let xml = format!(
        r#"<saml2p:AuthnRequest xmlns:saml2p="urn:oasis:names:tc:SAML:2.0:protocol"
    xmlns:saml2="urn:oasis:names:tc:SAML:2.0:assertion"
    xmlns:eidas="http://eidas.europa.eu/saml-extensions"
    ID="_req" Version="2.0" IssueInstant="2024-05-01T10:00:00Z"
    Destination="https://proxy.example/ColleagueRequest"
    ForceAuthn="true" IsPassive="false" ProviderName="DEMO-SP">
  <saml2:Issuer>https://connector.example/metadata</saml2:Issuer>
  <saml2p:Extensions><eidas:SPType>public</eidas:SPType></saml2p:Extensions>
  <saml2p:RequestedAuthnContext Comparison="minimum">
    <saml2:AuthnContextClassRef>{loa}</saml2:AuthnContextClassRef>
  </saml2p:RequestedAuthnContext>
</saml2p:AuthnRequest>"#
    );
    signer.sign(&xml, "_req")
}

/// Replace the first `SignatureValue` in document order.
fn forge_signature_value(xml: &str) -> String {
    let start = xml.find("<ds:SignatureValue>").unwrap() + "<ds:SignatureValue>".len();
    let end = start + xml[start..].find("</ds:SignatureValue>").unwrap();
    format!("{}Zm9yZ2Vk{}", &xml[..start], &xml[end..])
}

fn authn_request(comparison: &str, loas: &[&str]) -> AuthnRequest {
    let mut request = AuthnRequest::default();
    request.id = Some("_req".into());
    request.requested_authn_context = Some(RequestedAuthnContext {
        comparison: Some(comparison.into()),
        loas: loas.iter().map(|s| (*s).to_owned()).collect(),
    });
    request
}

/// A proxy service signing with a certificate issued by its root CA, and a
/// connector owning an EC decryption key.
struct Federation {
    root: Issued,
    proxy_signer: Issued,
    connector_signer: Issued,
    connector_encryption: Issued,
}

impl Federation {
    fn new() -> Self {
        let root = root("Federation Root CA");
        let proxy_signer = issue("Proxy Service Signing", &root);
        let connector_signer = issue("Connector Signing", &root);
        let connector_encryption = root_less("Connector Encryption");
        Self {
            root,
            proxy_signer,
            connector_signer,
            connector_encryption,
        }
    }

    fn context(&self) -> NodeContext {
        let anchors = TrustAnchorSet::new(vec![self.root.credential()]);
        NodeContext {
            identity_provider_anchors: anchors.clone(),
            service_provider_anchors: anchors,
            metadata: MetadataCertificateSet::new()
                .with_role(PeerRole::IdentityProvider, vec![self.proxy_signer.credential()])
                .with_role(PeerRole::ServiceProvider, vec![self.connector_signer.credential()]),
            decryption: DecryptionContext::new(vec![self.connector_encryption.private_credential()]),
            allowed_loas: vec![HIGH.to_owned()],
            ..NodeContext::default()
        }
    }

    /// Sign the assertion, encrypt it, then sign the response.
    fn encrypted_response(&self, asserted_loa: &str) -> String {
        let signed_assertion = self.proxy_signer.sign(&unsigned_response(asserted_loa), "_a1");
        self.seal(&signed_assertion)
    }

    fn seal(&self, xml: &str) -> String {
        let encrypted = encrypt_assertions(
            xml,
            &self.connector_encryption.credential(),
            algorithm::AES256_GCM,
        )
        .unwrap();
        self.proxy_signer.sign(&encrypted, "_resp")
    }
}

fn root_less(cn: &str) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = params(cn).self_signed(&key).unwrap();
    Issued { cert, key }
}

#[test]
fn encrypted_response_is_accepted_and_decrypted() {
    let federation = Federation::new();
    let ctx = federation.context();
    let xml = federation.encrypted_response(HIGH);

    let response = ResponseProcessor::new(&ctx)
        .process(&xml, &authn_request("minimum", &[SUBSTANTIAL]))
        .unwrap();

    assert!(!response.is_encrypted());
    assert_eq!(response.assertions.len(), 1);
    let assertion = &response.assertions[0];
    assert_eq!(assertion.subject_name_id.as_deref(), Some("ES/BE/0001"));
    assert_eq!(assertion.attributes[0].values, vec!["Garcia".to_owned()]);
    assert!(response.resolve_reference("#_a1").is_some());
}

#[test]
fn plain_response_is_accepted() {
    let federation = Federation::new();
    let ctx = federation.context();
    let xml = response_xml(&federation.proxy_signer, "loa:nonNotified");

    let response = ResponseProcessor::new(&ctx)
        .process(&xml, &authn_request("exact", &["loa:nonNotified"]))
        .unwrap();
    assert_eq!(response.assertions.len(), 1);
}

#[test]
fn insufficient_asserted_loa_is_rejected() {
    let federation = Federation::new();
    let ctx = federation.context();
    let xml = federation.encrypted_response(SUBSTANTIAL);

    let err = ResponseProcessor::new(&ctx)
        .process(&xml, &authn_request("minimum", &[HIGH]))
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid level of assurance in response");
}

#[test]
fn validation_failure_stops_the_pipeline() {
    let federation = Federation::new();
    let ctx = federation.context();
    let xml = response_xml(&federation.proxy_signer, HIGH).replacen(
        "<saml2:Issuer>https://proxy.example/metadata</saml2:Issuer><ds:Signature",
        "<ds:Signature",
        1,
    );

    let err = ResponseProcessor::new(&ctx)
        .process(&xml, &authn_request("minimum", &[HIGH]))
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.to_string(), "Issuer is required");
}

#[test]
fn disallowed_signature_algorithm() {
    let federation = Federation::new();
    let ctx = federation.context();
    let xml = response_xml(&federation.proxy_signer, HIGH)
        .replace(algorithm::ECDSA_SHA256, algorithm::ECDSA_SHA1);

    let err = ResponseProcessor::new(&ctx)
        .process(&xml, &authn_request("minimum", &[HIGH]))
        .unwrap_err();
    assert_eq!(err.to_string(), "Signature algorithm is not allowed.");
}

#[test]
fn signer_missing_from_metadata() {
    let federation = Federation::new();
    let ctx = federation.context();
    let stranger = issue("Stranger", &federation.root);
    let xml = response_xml(&stranger, HIGH);

    let err = ResponseProcessor::new(&ctx)
        .process(&xml, &authn_request("minimum", &[HIGH]))
        .unwrap_err();
    assert!(matches!(err, Error::SignatureCertificateNotFound));
}

#[test]
fn signer_outside_the_trust_anchors() {
    let federation = Federation::new();
    let ctx = NodeContext {
        identity_provider_anchors: TrustAnchorSet::new(vec![root("Other Root").credential()]),
        ..federation.context()
    };
    let xml = response_xml(&federation.proxy_signer, HIGH);

    let err = ResponseProcessor::new(&ctx)
        .process(&xml, &authn_request("minimum", &[HIGH]))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Certificate(CertificateError::UntrustedCertificate(_))
    ));
}

#[test]
fn explicit_trust_needs_the_signer_itself() {
    let federation = Federation::new();
    let xml = response_xml(&federation.proxy_signer, HIGH);
    let request = authn_request("minimum", &[HIGH]);

    let root_only = NodeContext {
        trust_mode: TrustMode::Explicit,
        ..federation.context()
    };
    assert!(matches!(
        ResponseProcessor::new(&root_only).process(&xml, &request),
        Err(Error::Certificate(_))
    ));

    let pinned = NodeContext {
        trust_mode: TrustMode::Explicit,
        identity_provider_anchors: TrustAnchorSet::new(vec![federation.proxy_signer.credential()]),
        ..federation.context()
    };
    ResponseProcessor::new(&pinned).process(&xml, &request).unwrap();
}

#[test]
fn wrong_decryption_key() {
    let federation = Federation::new();
    let ctx = NodeContext {
        decryption: DecryptionContext::new(vec![root_less("Other").private_credential()]),
        ..federation.context()
    };
    let xml = federation.encrypted_response(HIGH);

    let err = ResponseProcessor::new(&ctx)
        .process(&xml, &authn_request("minimum", &[HIGH]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "No matching public key was found for a given SAML Response."
    );
}

#[test]
fn request_within_allowed_loas() {
    let federation = Federation::new();
    let ctx = federation.context();

    let request = ResponseProcessor::new(&ctx)
        .process_request(&request_xml(&federation.connector_signer, SUBSTANTIAL))
        .unwrap();
    assert_eq!(request.loas(), [SUBSTANTIAL.to_owned()]);
}

#[test]
fn request_above_allowed_loas() {
    let federation = Federation::new();
    let ctx = NodeContext {
        allowed_loas: vec![SUBSTANTIAL.to_owned()],
        ..federation.context()
    };

    let err = ResponseProcessor::new(&ctx)
        .process_request(&request_xml(&federation.connector_signer, HIGH))
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid level of assurance in request");
}

#[test]
fn request_signed_by_identity_provider_certificate_is_not_matched() {
    let federation = Federation::new();
    let ctx = federation.context();

    let err = ResponseProcessor::new(&ctx)
        .process_request(&request_xml(&federation.proxy_signer, HIGH))
        .unwrap_err();
    assert!(matches!(err, Error::SignatureCertificateNotFound));
}

#[test]
fn tampered_name_id_is_rejected() {
    let federation = Federation::new();
    let ctx = federation.context();
    let request = authn_request("minimum", &[HIGH]);
    let tampered =
        response_xml(&federation.proxy_signer, HIGH).replace("ES/BE/0001", "ES/BE/ATTACKER");

    let err = ResponseProcessor::new(&ctx)
        .process(&tampered, &request)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSignature(ref reason) if reason.contains("digest")));

    let forged = forge_signature_value(&tampered);
    let err = ResponseProcessor::new(&ctx).process(&forged, &request).unwrap_err();
    assert!(matches!(err, Error::InvalidSignature(_)));
}

#[test]
fn forged_response_signature_is_rejected() {
    let federation = Federation::new();
    let ctx = federation.context();
    let xml = forge_signature_value(&response_xml(&federation.proxy_signer, HIGH));

    let err = ResponseProcessor::new(&ctx)
        .process(&xml, &authn_request("minimum", &[HIGH]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSignature(ref reason) if reason.contains("SignatureValue")));
}

#[test]
fn assertion_signature_is_checked_under_a_valid_response_signature() {
    let federation = Federation::new();
    let ctx = federation.context();
    let request = authn_request("minimum", &[HIGH]);
    let tampered_assertion = federation
        .proxy_signer
        .sign(&unsigned_response(HIGH), "_a1")
        .replace("ES/BE/0001", "ES/BE/ATTACKER");

    let plain = federation.proxy_signer.sign(&tampered_assertion, "_resp");
    let err = ResponseProcessor::new(&ctx).process(&plain, &request).unwrap_err();
    assert!(matches!(err, Error::InvalidSignature(_)));

    let encrypted = federation.seal(&tampered_assertion);
    let err = ResponseProcessor::new(&ctx)
        .process(&encrypted, &request)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSignature(_)));
}

#[test]
fn response_to_another_request_is_rejected() {
    let federation = Federation::new();
    let ctx = federation.context();
    let xml = response_xml(&federation.proxy_signer, HIGH);

    let mut request = authn_request("minimum", &[HIGH]);
    request.id = Some("_other".into());
    let err = ResponseProcessor::new(&ctx).process(&xml, &request).unwrap_err();
    assert!(matches!(err, Error::InResponseToMismatch));

    request.id = None;
    let err = ResponseProcessor::new(&ctx).process(&xml, &request).unwrap_err();
    assert!(matches!(err, Error::InResponseToMismatch));
}

#[test]
fn forged_request_signature_is_rejected() {
    let federation = Federation::new();
    let ctx = federation.context();
    let xml = forge_signature_value(&request_xml(&federation.connector_signer, SUBSTANTIAL));

    let err = ResponseProcessor::new(&ctx).process_request(&xml).unwrap_err();
    assert!(matches!(err, Error::InvalidSignature(_)));
}
