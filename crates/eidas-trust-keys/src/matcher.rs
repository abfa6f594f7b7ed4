#![forbid(unsafe_code)]

//! Which metadata certificate actually signed a message.

use crate::credential::{Credential, PublicKey};
use crate::keyinfo::KeyMaterial;
use eidas_trust_core::CertificateError;

/// A protocol message that may carry signature key material.
pub trait SignedMessage {
    /// Key material from the signature's `KeyInfo`, if any.
    fn signature_key_material(&self) -> Option<&KeyMaterial>;
}

impl SignedMessage for Option<KeyMaterial> {
    fn signature_key_material(&self) -> Option<&KeyMaterial> {
        self.as_ref()
    }
}

impl SignedMessage for KeyMaterial {
    fn signature_key_material(&self) -> Option<&KeyMaterial> {
        Some(self)
    }
}

/// Pick the candidate credential whose key signed `message`.
///
/// An embedded certificate must match a candidate byte-for-byte. A bare
/// public key (DER or RSA components) matches by key value. Without key
/// material the candidates must share a single key; duplicates of the same
/// key are not ambiguous.
pub fn match_signature_certificate<'a, M>(
    message: &M,
    candidates: &'a [Credential],
) -> Result<Option<&'a Credential>, CertificateError>
where
    M: SignedMessage + ?Sized,
{
    let found = match message.signature_key_material() {
        Some(KeyMaterial::Certificate(der)) => {
            candidates.iter().find(|c| c.der() == der.as_slice())
        }
        Some(material) => {
            let key = material
                .public_key()
                .map_err(|e| CertificateError::Malformed(e.to_string()))?;
            candidates.iter().find(|c| *c.public_key() == key)
        }
        None => {
            let mut distinct: Vec<&PublicKey> = Vec::new();
            for candidate in candidates {
                if !distinct.contains(&candidate.public_key()) {
                    distinct.push(candidate.public_key());
                }
            }
            if distinct.len() > 1 {
                tracing::warn!(
                    candidates = candidates.len(),
                    distinct_keys = distinct.len(),
                    "signature carries no key material and candidates disagree"
                );
                return Err(CertificateError::NoUniqueMatch);
            }
            candidates.first()
        }
    };

    match found {
        Some(c) => tracing::debug!(subject = %c.subject(), "matched signature certificate"),
        None => tracing::debug!("no candidate matches the signature key"),
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(kp: &rcgen::KeyPair, cn: &str) -> Credential {
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        params.distinguished_name.push(rcgen::DnType::CommonName, cn);
        let cert = params.self_signed(kp).unwrap();
        Credential::from_der(cert.der()).unwrap()
    }

    #[test]
    fn embedded_certificate_matches_by_bytes() {
        let kp = rcgen::KeyPair::generate().unwrap();
        let c = credential(&kp, "signer");
        let other = credential(&rcgen::KeyPair::generate().unwrap(), "other");
        let candidates = vec![other, c.clone()];

        let msg = Some(KeyMaterial::Certificate(c.der().to_vec()));
        let found = match_signature_certificate(&msg, &candidates).unwrap();
        assert_eq!(found.map(|f| f.der()), Some(c.der()));
    }

    #[test]
    fn reissued_certificate_is_not_a_byte_match() {
        let kp = rcgen::KeyPair::generate().unwrap();
        let published = credential(&kp, "signer");
        let reissued = credential(&kp, "signer reissued");

        let msg = Some(KeyMaterial::Certificate(reissued.der().to_vec()));
        let found = match_signature_certificate(&msg, std::slice::from_ref(&published)).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn der_public_key_matches_by_value() {
        let kp = rcgen::KeyPair::generate().unwrap();
        let c = credential(&kp, "signer");
        let candidates = vec![credential(&rcgen::KeyPair::generate().unwrap(), "x"), c];

        let msg = Some(KeyMaterial::DerPublicKey(kp.public_key_der()));
        let found = match_signature_certificate(&msg, &candidates).unwrap();
        assert_eq!(found.map(|f| f.subject()), Some("CN=signer".to_string()));
    }

    #[test]
    fn no_key_material_with_distinct_keys_is_ambiguous() {
        let a = credential(&rcgen::KeyPair::generate().unwrap(), "a");
        let b = credential(&rcgen::KeyPair::generate().unwrap(), "b");
        let msg: Option<KeyMaterial> = None;
        let candidates = [a, b];
        let err = match_signature_certificate(&msg, &candidates).unwrap_err();
        assert_eq!(err, CertificateError::NoUniqueMatch);
        assert_eq!(err.to_string(), "no unique match");
    }

    #[test]
    fn no_key_material_with_duplicate_keys_is_not_ambiguous() {
        let kp = rcgen::KeyPair::generate().unwrap();
        let a = credential(&kp, "first");
        let b = credential(&kp, "second");
        let msg: Option<KeyMaterial> = None;
        let candidates = [a, b];
        let found = match_signature_certificate(&msg, &candidates).unwrap();
        assert_eq!(found.map(|f| f.subject()), Some("CN=first".to_string()));
    }

    #[test]
    fn no_candidates_and_no_key_material_is_none() {
        let msg: Option<KeyMaterial> = None;
        assert!(match_signature_certificate(&msg, &[]).unwrap().is_none());
    }

    #[test]
    fn undecodable_key_is_malformed() {
        let msg = Some(KeyMaterial::DerPublicKey(vec![0x30, 0x03, 0x01]));
        let err = match_signature_certificate(&msg, &[]).unwrap_err();
        assert!(matches!(err, CertificateError::Malformed(_)));
    }
}
