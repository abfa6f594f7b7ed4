#![forbid(unsafe_code)]

//! Signature algorithms (RSA PKCS#1 v1.5, RSA-PSS, ECDSA) selected by URI.
//!
//! ECDSA works on a prehash so that any digest can be paired with any curve;
//! XML-DSig carries `r || s` while X.509 carries a DER `Ecdsa-Sig-Value`.

use eidas_trust_core::{algorithm, Error};
use signature::SignatureEncoding;

use crate::digest::HashAlgorithm;

/// Expand `$body!(hasher)` for the algorithm's digest.
macro_rules! dispatch_hash {
    ($hash:expr, $body:ident) => {
        match $hash {
            HashAlgorithm::Sha1 => $body!(sha1::Sha1),
            HashAlgorithm::Sha224 => $body!(sha2::Sha224),
            HashAlgorithm::Sha256 => $body!(sha2::Sha256),
            HashAlgorithm::Sha384 => $body!(sha2::Sha384),
            HashAlgorithm::Sha512 => $body!(sha2::Sha512),
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFamily {
    RsaPkcs1v15,
    RsaPss,
    Ecdsa,
}

/// A signature method: key family plus digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureAlgorithm {
    uri: &'static str,
    family: SignatureFamily,
    hash: HashAlgorithm,
}

impl SignatureAlgorithm {
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        use HashAlgorithm::*;
        use SignatureFamily::*;
        let (uri, family, hash) = match uri {
            algorithm::RSA_SHA1 => (algorithm::RSA_SHA1, RsaPkcs1v15, Sha1),
            algorithm::RSA_SHA256 => (algorithm::RSA_SHA256, RsaPkcs1v15, Sha256),
            algorithm::RSA_SHA384 => (algorithm::RSA_SHA384, RsaPkcs1v15, Sha384),
            algorithm::RSA_SHA512 => (algorithm::RSA_SHA512, RsaPkcs1v15, Sha512),
            algorithm::RSA_PSS_SHA256 => (algorithm::RSA_PSS_SHA256, RsaPss, Sha256),
            algorithm::RSA_PSS_SHA384 => (algorithm::RSA_PSS_SHA384, RsaPss, Sha384),
            algorithm::RSA_PSS_SHA512 => (algorithm::RSA_PSS_SHA512, RsaPss, Sha512),
            algorithm::ECDSA_SHA1 => (algorithm::ECDSA_SHA1, Ecdsa, Sha1),
            algorithm::ECDSA_SHA256 => (algorithm::ECDSA_SHA256, Ecdsa, Sha256),
            algorithm::ECDSA_SHA384 => (algorithm::ECDSA_SHA384, Ecdsa, Sha384),
            algorithm::ECDSA_SHA512 => (algorithm::ECDSA_SHA512, Ecdsa, Sha512),
            _ => {
                return Err(Error::UnsupportedAlgorithm(format!(
                    "signature algorithm: {uri}"
                )))
            }
        };
        Ok(Self { uri, family, hash })
    }

    /// RSA PKCS#1 v1.5 or ECDSA with an explicit digest, for X.509
    /// signature OIDs that have no URI of their own here.
    pub fn new(family: SignatureFamily, hash: HashAlgorithm) -> Self {
        Self {
            uri: "",
            family,
            hash,
        }
    }

    pub fn uri(&self) -> &'static str {
        self.uri
    }

    pub fn family(&self) -> SignatureFamily {
        self.family
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn rsa_sign(&self, key: &rsa::RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        match self.family {
            SignatureFamily::RsaPkcs1v15 => {
                use signature::Signer;
                macro_rules! do_sign {
                    ($hasher:ty) => {{
                        let sk = rsa::pkcs1v15::SigningKey::<$hasher>::new(key.clone());
                        sk.try_sign(data)
                            .map(|s| s.to_vec())
                            .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))
                    }};
                }
                dispatch_hash!(self.hash, do_sign)
            }
            SignatureFamily::RsaPss => {
                use signature::RandomizedSigner;
                let mut rng = rand::thread_rng();
                macro_rules! do_sign {
                    ($hasher:ty) => {{
                        let sk = rsa::pss::SigningKey::<$hasher>::new(key.clone());
                        sk.try_sign_with_rng(&mut rng, data)
                            .map(|s| s.to_vec())
                            .map_err(|e| Error::Crypto(format!("RSA-PSS signing failed: {e}")))
                    }};
                }
                dispatch_hash!(self.hash, do_sign)
            }
            SignatureFamily::Ecdsa => Err(Error::Key("EC private key required".into())),
        }
    }

    /// `Ok(false)` on a well-formed but wrong signature.
    pub fn rsa_verify(
        &self,
        key: &rsa::RsaPublicKey,
        data: &[u8],
        sig_bytes: &[u8],
    ) -> Result<bool, Error> {
        use signature::Verifier;
        match self.family {
            SignatureFamily::RsaPkcs1v15 => {
                let sig = rsa::pkcs1v15::Signature::try_from(sig_bytes)
                    .map_err(|e| Error::Crypto(format!("invalid RSA signature: {e}")))?;
                macro_rules! do_verify {
                    ($hasher:ty) => {{
                        let vk = rsa::pkcs1v15::VerifyingKey::<$hasher>::new(key.clone());
                        Ok(vk.verify(data, &sig).is_ok())
                    }};
                }
                dispatch_hash!(self.hash, do_verify)
            }
            SignatureFamily::RsaPss => {
                let sig = rsa::pss::Signature::try_from(sig_bytes)
                    .map_err(|e| Error::Crypto(format!("invalid RSA-PSS signature: {e}")))?;
                macro_rules! do_verify {
                    ($hasher:ty) => {{
                        let vk = rsa::pss::VerifyingKey::<$hasher>::new(key.clone());
                        Ok(vk.verify(data, &sig).is_ok())
                    }};
                }
                dispatch_hash!(self.hash, do_verify)
            }
            SignatureFamily::Ecdsa => Err(Error::Key("EC public key required".into())),
        }
    }

    pub fn ecdsa_sign(
        &self,
        curve: EcCurve,
        secret_scalar: &[u8],
        data: &[u8],
        encoding: EcdsaEncoding,
    ) -> Result<Vec<u8>, Error> {
        use signature::hazmat::PrehashSigner;
        self.require_ecdsa()?;
        let prehash = self.hash.digest(data);
        macro_rules! do_sign {
            ($curve:ident) => {{
                let sk = $curve::ecdsa::SigningKey::from_slice(secret_scalar)
                    .map_err(|e| Error::Key(format!("invalid {} key: {e}", curve.name())))?;
                let sig: $curve::ecdsa::Signature = sk
                    .sign_prehash(&prehash)
                    .map_err(|e| Error::Crypto(format!("ECDSA signing failed: {e}")))?;
                Ok(match encoding {
                    EcdsaEncoding::Concatenated => sig.to_bytes().to_vec(),
                    EcdsaEncoding::Der => sig.to_der().as_bytes().to_vec(),
                })
            }};
        }
        match curve {
            EcCurve::P256 => do_sign!(p256),
            EcCurve::P384 => do_sign!(p384),
            EcCurve::P521 => Err(Error::UnsupportedAlgorithm(
                "ECDSA signing on P-521".into(),
            )),
        }
    }

    /// Verify an ECDSA signature against an uncompressed or compressed SEC1
    /// point. `Ok(false)` on a wrong signature.
    pub fn ecdsa_verify(
        &self,
        curve: EcCurve,
        sec1_point: &[u8],
        data: &[u8],
        sig_bytes: &[u8],
        encoding: EcdsaEncoding,
    ) -> Result<bool, Error> {
        use signature::hazmat::PrehashVerifier;
        self.require_ecdsa()?;
        let prehash = self.hash.digest(data);
        macro_rules! do_verify {
            ($curve:ident) => {{
                let vk = $curve::ecdsa::VerifyingKey::from_sec1_bytes(sec1_point)
                    .map_err(|e| Error::Key(format!("invalid {} key: {e}", curve.name())))?;
                let sig = match encoding {
                    EcdsaEncoding::Concatenated => $curve::ecdsa::Signature::from_slice(sig_bytes),
                    EcdsaEncoding::Der => $curve::ecdsa::Signature::from_der(sig_bytes),
                };
                let Ok(sig) = sig else {
                    return Ok(false);
                };
                Ok(vk.verify_prehash(&prehash, &sig).is_ok())
            }};
        }
        match curve {
            EcCurve::P256 => do_verify!(p256),
            EcCurve::P384 => do_verify!(p384),
            EcCurve::P521 => do_verify!(p521),
        }
    }

    fn require_ecdsa(&self) -> Result<(), Error> {
        if self.family == SignatureFamily::Ecdsa {
            Ok(())
        } else {
            Err(Error::Key("RSA key required".into()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    pub fn name(&self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }
}

/// Wire form of an ECDSA signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcdsaEncoding {
    /// Fixed-width `r || s`, as in `<ds:SignatureValue>`.
    Concatenated,
    /// DER `SEQUENCE { r, s }`, as in X.509 and CRLs.
    Der,
}
