#![forbid(unsafe_code)]

//! Credential loading from PEM and DER (certificates, PKCS#8, PKCS#1, SEC1).

use crate::credential::{Credential, PrivateKey};
use der::Encode;
use eidas_trust_core::Error;
use x509_cert::Certificate;

/// DER bytes of a single PEM `CERTIFICATE` block.
pub fn load_certificate_pem(pem_data: &str) -> Result<Vec<u8>, Error> {
    let (label, der_bytes) = der::pem::decode_vec(pem_data.trim().as_bytes())
        .map_err(|e| Error::Certificate(format!("failed to decode certificate PEM: {e}")))?;
    if label != "CERTIFICATE" {
        return Err(Error::Certificate(format!(
            "expected CERTIFICATE PEM label, got: {label}"
        )));
    }
    Ok(der_bytes)
}

/// DER bytes of every certificate in a concatenated PEM bundle, in order.
pub fn load_certificate_chain_pem(pem_data: &str) -> Result<Vec<Vec<u8>>, Error> {
    Certificate::load_pem_chain(pem_data.as_bytes())
        .map_err(|e| Error::Certificate(format!("failed to decode certificate chain: {e}")))?
        .iter()
        .map(|c| {
            c.to_der()
                .map_err(|e| Error::Certificate(format!("failed to encode certificate: {e}")))
        })
        .collect()
}

/// Load an unencrypted PKCS#8 private key (RSA, P-256, P-384 or P-521).
pub fn load_private_key_pkcs8_der(der_bytes: &[u8]) -> Result<PrivateKey, Error> {
    use pkcs8::DecodePrivateKey;

    if let Ok(k) = rsa::RsaPrivateKey::from_pkcs8_der(der_bytes) {
        return Ok(PrivateKey::Rsa(k));
    }
    if let Ok(k) = p256::SecretKey::from_pkcs8_der(der_bytes) {
        return Ok(PrivateKey::EcP256(k));
    }
    if let Ok(k) = p384::SecretKey::from_pkcs8_der(der_bytes) {
        return Ok(PrivateKey::EcP384(k));
    }
    p521::SecretKey::from_pkcs8_der(der_bytes)
        .map(PrivateKey::EcP521)
        .map_err(|_| Error::Key("unsupported PKCS#8 private key".into()))
}

/// Load a private key from PEM, dispatching on the block label.
pub fn load_private_key_pem(pem_data: &str) -> Result<PrivateKey, Error> {
    let (label, der_bytes) = der::pem::decode_vec(pem_data.trim().as_bytes())
        .map_err(|e| Error::Key(format!("failed to decode private key PEM: {e}")))?;

    match label {
        "PRIVATE KEY" => load_private_key_pkcs8_der(&der_bytes),
        "RSA PRIVATE KEY" => {
            use pkcs1::DecodeRsaPrivateKey;
            rsa::RsaPrivateKey::from_pkcs1_der(&der_bytes)
                .map(PrivateKey::Rsa)
                .map_err(|e| Error::Key(format!("failed to parse RSA private key: {e}")))
        }
        "EC PRIVATE KEY" => {
            if let Ok(k) = p256::SecretKey::from_sec1_der(&der_bytes) {
                return Ok(PrivateKey::EcP256(k));
            }
            if let Ok(k) = p384::SecretKey::from_sec1_der(&der_bytes) {
                return Ok(PrivateKey::EcP384(k));
            }
            p521::SecretKey::from_sec1_der(&der_bytes)
                .map(PrivateKey::EcP521)
                .map_err(|e| Error::Key(format!("failed to parse EC private key: {e}")))
        }
        "ENCRYPTED PRIVATE KEY" => Err(Error::Key(
            "encrypted private keys are not supported".into(),
        )),
        _ => Err(Error::Key(format!("unsupported PEM label: {label}"))),
    }
}

/// Build a credential from a PEM bundle (leaf first, then issuers) and an
/// optional PEM private key.
pub fn load_credential_pem(cert_pem: &str, key_pem: Option<&str>) -> Result<Credential, Error> {
    let mut certs = load_certificate_chain_pem(cert_pem)?.into_iter();
    let leaf = certs
        .next()
        .ok_or_else(|| Error::Certificate("no certificate in PEM data".into()))?;

    let mut credential = Credential::from_der(&leaf)?.with_chain(certs.collect());
    if let Some(key_pem) = key_pem {
        credential = credential.with_private_key(load_private_key_pem(key_pem)?)?;
    }
    Ok(credential)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_ec_credential_with_key() {
        let issued = rcgen::generate_simple_self_signed(vec!["node.example".to_string()]).unwrap();
        let cert_pem = issued.cert.pem();
        let key_pem = issued.key_pair.serialize_pem();

        let cred = load_credential_pem(&cert_pem, Some(&key_pem)).unwrap();
        assert_eq!(cred.der(), issued.cert.der().as_ref());
        assert!(cred.private_key().is_some());
        assert!(cred.chain().is_empty());
    }

    #[test]
    fn loads_bundle_with_chain() {
        let a = rcgen::generate_simple_self_signed(vec!["a.example".to_string()]).unwrap();
        let b = rcgen::generate_simple_self_signed(vec!["b.example".to_string()]).unwrap();
        let bundle = format!("{}{}", a.cert.pem(), b.cert.pem());

        let cred = load_credential_pem(&bundle, None).unwrap();
        assert_eq!(cred.der(), a.cert.der().as_ref());
        assert_eq!(cred.chain(), &[b.cert.der().to_vec()]);
    }

    #[test]
    fn loads_pkcs1_rsa_key() {
        use pkcs1::EncodeRsaPrivateKey;
        let key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
        let pem = key.to_pkcs1_pem(pkcs1::LineEnding::LF).unwrap();
        let loaded = load_private_key_pem(&pem).unwrap();
        assert!(matches!(loaded, PrivateKey::Rsa(_)));
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let a = rcgen::generate_simple_self_signed(vec!["a.example".to_string()]).unwrap();
        let other = rcgen::KeyPair::generate().unwrap();
        assert!(load_credential_pem(&a.cert.pem(), Some(&other.serialize_pem())).is_err());
    }

    #[test]
    fn wrong_label_is_rejected() {
        let kp = rcgen::KeyPair::generate().unwrap();
        assert!(load_certificate_pem(&kp.serialize_pem()).is_err());
        assert!(load_private_key_pem("not pem").is_err());
    }
}
