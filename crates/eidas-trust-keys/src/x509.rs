#![forbid(unsafe_code)]

//! X.509 primitives: verification time, validity windows, CA constraints
//! and issuer signature checks over certificates and CRLs.

use der::asn1::ObjectIdentifier;
use der::{Decode, Encode};
use eidas_trust_core::Error;
use eidas_trust_crypto::{EcdsaEncoding, HashAlgorithm, SignatureAlgorithm, SignatureFamily};
use x509_cert::ext::pkix::{BasicConstraints, KeyUsage, KeyUsages};
use x509_cert::Certificate;

use crate::credential::PublicKey;

const SHA1_RSA: &str = "1.2.840.113549.1.1.5";
const SHA224_RSA: &str = "1.2.840.113549.1.1.14";
const SHA256_RSA: &str = "1.2.840.113549.1.1.11";
const SHA384_RSA: &str = "1.2.840.113549.1.1.12";
const SHA512_RSA: &str = "1.2.840.113549.1.1.13";
const ECDSA_SHA1: &str = "1.2.840.10045.4.1";
const ECDSA_SHA224: &str = "1.2.840.10045.4.3.1";
const ECDSA_SHA256: &str = "1.2.840.10045.4.3.2";
const ECDSA_SHA384: &str = "1.2.840.10045.4.3.3";
const ECDSA_SHA512: &str = "1.2.840.10045.4.3.4";

const BASIC_CONSTRAINTS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.19");
const KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.15");

/// The override, or the current system time.
pub fn resolve_verification_time(
    override_time: Option<der::DateTime>,
) -> Result<der::DateTime, Error> {
    if let Some(time) = override_time {
        return Ok(time);
    }
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| Error::Certificate(format!("system time error: {e}")))?;
    der::DateTime::from_unix_duration(now)
        .map_err(|e| Error::Certificate(format!("time conversion error: {e}")))
}

/// Check that `cert` is inside its validity window at `at`.
pub fn check_validity(cert: &Certificate, at: &der::DateTime) -> Result<(), Error> {
    let validity = &cert.tbs_certificate.validity;
    let not_before = validity.not_before.to_date_time();
    let not_after = validity.not_after.to_date_time();

    if *at < not_before {
        return Err(Error::Certificate(format!(
            "certificate is not yet valid (notBefore: {not_before})"
        )));
    }
    if *at > not_after {
        return Err(Error::Certificate(format!(
            "certificate has expired (notAfter: {not_after})"
        )));
    }
    Ok(())
}

/// Subject and issuer are the same name.
pub fn is_self_issued(cert: &Certificate) -> bool {
    cert.tbs_certificate.subject == cert.tbs_certificate.issuer
}

/// Whether `issuer` issued `cert`: names chain and the signature verifies
/// under the issuer's key.
pub fn is_issued_by(cert: &Certificate, issuer: &Certificate) -> bool {
    cert.tbs_certificate.issuer == issuer.tbs_certificate.subject
        && verify_certificate_signature(cert, &issuer.tbs_certificate.subject_public_key_info)
            .is_ok()
}

/// Verify a certificate's signature using the issuer's SPKI.
pub fn verify_certificate_signature(
    cert: &Certificate,
    issuer_spki: &spki::SubjectPublicKeyInfoOwned,
) -> Result<(), Error> {
    let tbs_der = cert
        .tbs_certificate
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode TBS: {e}")))?;
    let signature = cert
        .signature
        .as_bytes()
        .ok_or_else(|| Error::Certificate("no signature bytes".into()))?;
    verify_signed_data(&tbs_der, &cert.signature_algorithm.oid, signature, issuer_spki)
}

/// Verify the signature over a DER `TBSCertList` with the issuer's SPKI.
pub fn verify_crl_signature(
    crl: &x509_cert::crl::CertificateList,
    issuer_spki: &spki::SubjectPublicKeyInfoOwned,
) -> Result<(), Error> {
    let tbs_der = crl
        .tbs_cert_list
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode CRL TBS: {e}")))?;
    let signature = crl
        .signature
        .as_bytes()
        .ok_or_else(|| Error::Certificate("no CRL signature bytes".into()))?;
    verify_signed_data(&tbs_der, &crl.signature_algorithm.oid, signature, issuer_spki)
}

/// The digest comes from the signature OID, never from the key: a P-256
/// issuer may sign with ecdsa-with-SHA384.
fn verify_signed_data(
    tbs_der: &[u8],
    algorithm: &ObjectIdentifier,
    signature: &[u8],
    issuer_spki: &spki::SubjectPublicKeyInfoOwned,
) -> Result<(), Error> {
    use HashAlgorithm::*;
    use SignatureFamily::*;

    let oid = algorithm.to_string();
    let (family, hash) = match oid.as_str() {
        SHA1_RSA => (RsaPkcs1v15, Sha1),
        SHA224_RSA => (RsaPkcs1v15, Sha224),
        SHA256_RSA => (RsaPkcs1v15, Sha256),
        SHA384_RSA => (RsaPkcs1v15, Sha384),
        SHA512_RSA => (RsaPkcs1v15, Sha512),
        ECDSA_SHA1 => (Ecdsa, Sha1),
        ECDSA_SHA224 => (Ecdsa, Sha224),
        ECDSA_SHA256 => (Ecdsa, Sha256),
        ECDSA_SHA384 => (Ecdsa, Sha384),
        ECDSA_SHA512 => (Ecdsa, Sha512),
        _ => {
            return Err(Error::Certificate(format!(
                "unsupported signature algorithm: {oid}"
            )))
        }
    };

    let spki_der = issuer_spki
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode issuer SPKI: {e}")))?;
    let key = PublicKey::from_spki_der(&spki_der)
        .map_err(|e| Error::Certificate(format!("invalid issuer key: {e}")))?;
    let verified = key
        .verify(
            &SignatureAlgorithm::new(family, hash),
            tbs_der,
            signature,
            EcdsaEncoding::Der,
        )
        .map_err(|e| Error::Certificate(format!("signature verification failed: {e}")))?;
    if verified {
        Ok(())
    } else {
        Err(Error::Certificate("signature verification failed".into()))
    }
}

/// The CA-related extensions of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaConstraints {
    /// basicConstraints cA.
    pub is_ca: bool,
    pub path_len: Option<u8>,
    /// keyCertSign is set, or keyUsage is absent.
    pub may_sign_certificates: bool,
}

impl CaConstraints {
    pub fn of(cert: &Certificate) -> Result<Self, Error> {
        let mut constraints = Self {
            is_ca: false,
            path_len: None,
            may_sign_certificates: true,
        };
        for ext in cert.tbs_certificate.extensions.iter().flatten() {
            if ext.extn_id == BASIC_CONSTRAINTS {
                let bc = BasicConstraints::from_der(ext.extn_value.as_bytes())
                    .map_err(|e| Error::Certificate(format!("invalid basicConstraints: {e}")))?;
                constraints.is_ca = bc.ca;
                constraints.path_len = bc.path_len_constraint;
            } else if ext.extn_id == KEY_USAGE {
                let ku = KeyUsage::from_der(ext.extn_value.as_bytes())
                    .map_err(|e| Error::Certificate(format!("invalid keyUsage: {e}")))?;
                constraints.may_sign_certificates = ku.0.contains(KeyUsages::KeyCertSign);
            }
        }
        Ok(constraints)
    }
}

/// Check that `issuer` may issue certificates with `intermediates_below`
/// non-self-issued intermediates between it and the end entity.
pub fn check_issuer_constraints(
    issuer: &Certificate,
    intermediates_below: usize,
) -> Result<(), Error> {
    let subject = &issuer.tbs_certificate.subject;
    let constraints = CaConstraints::of(issuer)?;
    if !constraints.is_ca {
        return Err(Error::Certificate(format!(
            "{subject} is not a certification authority"
        )));
    }
    if !constraints.may_sign_certificates {
        return Err(Error::Certificate(format!(
            "{subject} key usage does not allow certificate signing"
        )));
    }
    if let Some(limit) = constraints.path_len {
        if intermediates_below > usize::from(limit) {
            return Err(Error::Certificate(format!(
                "{subject} path length constraint {limit} exceeded"
            )));
        }
    }
    Ok(())
}
