#![forbid(unsafe_code)]

//! Signature algorithm and key-length policy for inbound messages.

use eidas_trust_core::{algorithm, ValidationError};
use eidas_trust_keys::PublicKey;
use eidas_trust_saml::Signature;

/// Minimum RSA modulus length accepted for message signatures.
pub const MIN_RSA_KEY_BITS: usize = 3072;

/// Minimum EC field size accepted for message signatures.
pub const MIN_EC_KEY_BITS: usize = 256;

/// Which signature and digest algorithms, and how strong a key, a peer may
/// use to sign protocol messages.
#[derive(Debug, Clone)]
pub struct SignaturePolicy {
    pub allowed_signature_algorithms: Vec<String>,
    pub allowed_digest_algorithms: Vec<String>,
    pub min_rsa_key_bits: usize,
    pub min_ec_key_bits: usize,
}

impl Default for SignaturePolicy {
    fn default() -> Self {
        Self {
            allowed_signature_algorithms: owned(algorithm::DEFAULT_SIGNATURE),
            allowed_digest_algorithms: owned(algorithm::DEFAULT_DIGEST),
            min_rsa_key_bits: MIN_RSA_KEY_BITS,
            min_ec_key_bits: MIN_EC_KEY_BITS,
        }
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

impl SignaturePolicy {
    /// Reject a signature whose method or any reference digest is outside
    /// the allowed lists. A signature without a method is rejected too.
    pub fn check_signature(&self, signature: &Signature) -> Result<(), ValidationError> {
        let method = signature.signature_method.as_deref().unwrap_or_default();
        if !self.allowed_signature_algorithms.iter().any(|a| a == method) {
            tracing::warn!(algorithm = method, "rejected signature algorithm");
            return Err(ValidationError::new(
                "SignatureMethod",
                "Signature algorithm is not allowed.",
            ));
        }

        for digest in &signature.digest_methods {
            if !self.allowed_digest_algorithms.iter().any(|a| a == digest) {
                tracing::warn!(algorithm = %digest, "rejected digest algorithm");
                return Err(ValidationError::new(
                    "DigestMethod",
                    "Digest algorithm is not allowed.",
                ));
            }
        }
        Ok(())
    }

    /// Reject RSA keys shorter than `min_rsa_key_bits` and EC keys on a
    /// field smaller than `min_ec_key_bits`.
    pub fn check_key(&self, key: &PublicKey) -> Result<(), ValidationError> {
        let minimum = if key.is_rsa() {
            self.min_rsa_key_bits
        } else {
            self.min_ec_key_bits
        };
        if key.key_bits() < minimum {
            tracing::warn!(key = ?key, minimum, "rejected short signature key");
            return Err(ValidationError::new("Signature", "Signature key is too short."));
        }
        Ok(())
    }
}
