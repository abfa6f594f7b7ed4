//! Enveloped signatures over generated credentials: round trips, tampering
//! and signature wrapping.

use eidas_trust_core::{algorithm, Error};
use eidas_trust_dsig::{sign_enveloped, verify_enveloped, VerifyResult};
use eidas_trust_keys::loader::load_private_key_pkcs8_der;
use eidas_trust_keys::{Credential, PrivateKey};

const RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<saml2p:Response xmlns:saml2p="urn:oasis:names:tc:SAML:2.0:protocol"
    xmlns:saml2="urn:oasis:names:tc:SAML:2.0:assertion"
    ID="_resp" InResponseTo="_req" Version="2.0" IssueInstant="2024-05-01T10:00:05Z">
  <saml2:Issuer>https://proxy.example/metadata</saml2:Issuer>
  <saml2p:Status><saml2p:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></saml2p:Status>
  <saml2:Assertion ID="_a1" Version="2.0">
    <saml2:Issuer>https://proxy.example/metadata</saml2:Issuer>
    <saml2:Subject><saml2:NameID>ES/BE/0001</saml2:NameID></saml2:Subject>
  </saml2:Assertion>
</saml2p:Response>"#;

fn certificate(kp: &rcgen::KeyPair, cn: &str) -> Vec<u8> {
    let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(rcgen::DnType::CommonName, cn);
    params.self_signed(kp).unwrap().der().to_vec()
}

fn ec_credential(cn: &str) -> Credential {
    let kp = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
    let key = load_private_key_pkcs8_der(&kp.serialize_der()).unwrap();
    Credential::from_der(&certificate(&kp, cn))
        .unwrap()
        .with_private_key(key)
        .unwrap()
}

fn rsa_credential(cn: &str) -> Credential {
    use pkcs8::EncodePrivateKey;
    let key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
    let pem = key.to_pkcs8_pem(pkcs8::LineEnding::LF).unwrap();
    let kp = rcgen::KeyPair::from_pem_and_sign_algo(&pem, &rcgen::PKCS_RSA_SHA256).unwrap();
    Credential::from_der(&certificate(&kp, cn))
        .unwrap()
        .with_private_key(PrivateKey::Rsa(key))
        .unwrap()
}

fn signed(cred: &Credential) -> String {
    let xml = sign_enveloped(RESPONSE, "_a1", cred, algorithm::ECDSA_SHA256, algorithm::SHA256)
        .unwrap();
    sign_enveloped(&xml, "_resp", cred, algorithm::ECDSA_SHA384, algorithm::SHA384).unwrap()
}

fn assert_invalid(result: VerifyResult, expected: &str) {
    match result {
        VerifyResult::Invalid { reason } => {
            assert!(reason.contains(expected), "unexpected reason: {reason}")
        }
        VerifyResult::Valid => panic!("expected an invalid signature"),
    }
}

#[test]
fn nested_signatures_verify() {
    let cred = ec_credential("signer");
    let xml = signed(&cred);

    assert_eq!(xml.matches("<ds:Signature ").count(), 2);
    assert!(verify_enveloped(&xml, "_resp", cred.public_key()).unwrap().is_valid());
    assert!(verify_enveloped(&xml, "_a1", cred.public_key()).unwrap().is_valid());
}

#[test]
fn rsa_signatures_verify() {
    let cred = rsa_credential("signer");
    for method in [algorithm::RSA_SHA256, algorithm::RSA_PSS_SHA512] {
        let xml = sign_enveloped(RESPONSE, "_resp", &cred, method, algorithm::SHA256).unwrap();
        assert!(
            verify_enveloped(&xml, "_resp", cred.public_key()).unwrap().is_valid(),
            "{method}"
        );
    }
}

#[test]
fn signature_follows_the_issuer() {
    let xml = signed(&ec_credential("signer"));
    let issuer_end = xml.find("</saml2:Issuer>").unwrap() + "</saml2:Issuer>".len();
    assert!(xml[issuer_end..].starts_with("<ds:Signature "));
}

#[test]
fn changed_content_breaks_the_digest() {
    let cred = ec_credential("signer");
    let xml = signed(&cred).replace("ES/BE/0001", "ES/BE/ATTACKER");

    assert_invalid(
        verify_enveloped(&xml, "_a1", cred.public_key()).unwrap(),
        "digest mismatch",
    );
    assert_invalid(
        verify_enveloped(&xml, "_resp", cred.public_key()).unwrap(),
        "digest mismatch",
    );
}

#[test]
fn forged_signature_value_is_rejected() {
    let cred = ec_credential("signer");
    let xml = signed(&cred);
    let start = xml.rfind("<ds:SignatureValue>").unwrap() + "<ds:SignatureValue>".len();
    let end = start + xml[start..].find("</ds:SignatureValue>").unwrap();
    let forged = format!("{}Zm9yZ2Vk{}", &xml[..start], &xml[end..]);

    // The last SignatureValue in document order belongs to the assertion.
    assert_invalid(
        verify_enveloped(&forged, "_a1", cred.public_key()).unwrap(),
        "SignatureValue",
    );
}

#[test]
fn other_key_is_rejected() {
    let xml = signed(&ec_credential("signer"));
    let other = ec_credential("other");
    assert_invalid(
        verify_enveloped(&xml, "_resp", other.public_key()).unwrap(),
        "SignatureValue",
    );
}

#[test]
fn reference_to_another_element_is_rejected() {
    let cred = ec_credential("signer");
    let xml = sign_enveloped(RESPONSE, "_a1", &cred, algorithm::ECDSA_SHA256, algorithm::SHA256)
        .unwrap()
        .replace(r##"URI="#_a1""##, r##"URI="#_resp""##);
    assert_invalid(
        verify_enveloped(&xml, "_a1", cred.public_key()).unwrap(),
        "does not point at #_a1",
    );
}

#[test]
fn duplicate_id_is_rejected() {
    let cred = ec_credential("signer");
    let xml = signed(&cred).replace(
        "<saml2p:Status>",
        r#"<saml2:Assertion ID="_a1"><saml2:Issuer>evil</saml2:Issuer></saml2:Assertion><saml2p:Status>"#,
    );
    assert_invalid(
        verify_enveloped(&xml, "_a1", cred.public_key()).unwrap(),
        "not unique",
    );
}

#[test]
fn unsigned_or_missing_elements_are_errors() {
    let cred = ec_credential("signer");
    assert!(matches!(
        verify_enveloped(RESPONSE, "_resp", cred.public_key()),
        Err(Error::MissingElement(_))
    ));
    assert!(matches!(
        verify_enveloped(RESPONSE, "_nowhere", cred.public_key()),
        Err(Error::MissingElement(_))
    ));
}

#[test]
fn signing_requires_a_private_key_and_an_unsigned_element() {
    let cred = ec_credential("signer");
    let public_only = Credential::from_der(cred.der()).unwrap();
    assert!(matches!(
        sign_enveloped(RESPONSE, "_resp", &public_only, algorithm::ECDSA_SHA256, algorithm::SHA256),
        Err(Error::Key(_))
    ));

    let xml = signed(&cred);
    assert!(matches!(
        sign_enveloped(&xml, "_resp", &cred, algorithm::ECDSA_SHA256, algorithm::SHA256),
        Err(Error::XmlStructure(_))
    ));
}
