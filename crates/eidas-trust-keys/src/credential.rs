#![forbid(unsafe_code)]

//! Credential model: certificate, public key and optional private key.

use der::asn1::ObjectIdentifier;
use der::{Decode, Encode};
use eidas_trust_core::Error;
use eidas_trust_crypto::{EcCurve, EcdsaEncoding, SignatureAlgorithm, SignatureFamily};
use x509_cert::Certificate;

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// A public key recovered from a certificate, a SPKI blob or RSA components.
///
/// Equality compares the decoded key values, so the same key carried by two
/// differently-encoded certificates compares equal.
#[derive(Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(rsa::RsaPublicKey),
    EcP256(p256::PublicKey),
    EcP384(p384::PublicKey),
    EcP521(p521::PublicKey),
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} public key ({} bits)", self.algorithm_name(), self.key_bits())
    }
}

impl PublicKey {
    /// Decode a DER `SubjectPublicKeyInfo`.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, Error> {
        use spki::DecodePublicKey;

        let info = spki::SubjectPublicKeyInfoRef::try_from(der)
            .map_err(|e| Error::Key(format!("invalid SubjectPublicKeyInfo: {e}")))?;

        let oid = info.algorithm.oid;
        if oid == RSA_ENCRYPTION {
            rsa::RsaPublicKey::from_public_key_der(der)
                .map(Self::Rsa)
                .map_err(|e| Error::Key(format!("invalid RSA public key: {e}")))
        } else if oid == EC_PUBLIC_KEY {
            p256::PublicKey::from_public_key_der(der)
                .map(Self::EcP256)
                .or_else(|_| p384::PublicKey::from_public_key_der(der).map(Self::EcP384))
                .or_else(|_| p521::PublicKey::from_public_key_der(der).map(Self::EcP521))
                .map_err(|e| Error::Key(format!("unsupported EC public key: {e}")))
        } else {
            Err(Error::Key(format!("unsupported public key algorithm: {oid}")))
        }
    }

    /// Public key of an X.509 certificate.
    pub fn from_certificate(cert: &Certificate) -> Result<Self, Error> {
        let spki_der = cert
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| Error::Certificate(format!("failed to encode SPKI: {e}")))?;
        Self::from_spki_der(&spki_der)
    }

    /// Build an RSA key from big-endian modulus and exponent bytes.
    pub fn from_rsa_components(modulus: &[u8], exponent: &[u8]) -> Result<Self, Error> {
        let n = rsa::BigUint::from_bytes_be(modulus);
        let e = rsa::BigUint::from_bytes_be(exponent);
        rsa::RsaPublicKey::new(n, e)
            .map(Self::Rsa)
            .map_err(|e| Error::Key(format!("invalid RSA key components: {e}")))
    }

    /// DER `SubjectPublicKeyInfo` encoding.
    pub fn to_spki_der(&self) -> Result<Vec<u8>, Error> {
        use spki::EncodePublicKey;

        let doc = match self {
            Self::Rsa(k) => k.to_public_key_der(),
            Self::EcP256(k) => k.to_public_key_der(),
            Self::EcP384(k) => k.to_public_key_der(),
            Self::EcP521(k) => k.to_public_key_der(),
        }
        .map_err(|e| Error::Key(format!("failed to encode public key: {e}")))?;
        Ok(doc.as_bytes().to_vec())
    }

    /// Uncompressed SEC1 point of an EC key.
    pub fn to_sec1_bytes(&self) -> Option<Vec<u8>> {
        use p256::elliptic_curve::sec1::ToEncodedPoint;
        match self {
            Self::Rsa(_) => None,
            Self::EcP256(k) => Some(k.to_encoded_point(false).as_bytes().to_vec()),
            Self::EcP384(k) => Some(k.to_encoded_point(false).as_bytes().to_vec()),
            Self::EcP521(k) => Some(k.to_encoded_point(false).as_bytes().to_vec()),
        }
    }

    /// RSA modulus size or EC field size, in bits.
    pub fn key_bits(&self) -> usize {
        use rsa::traits::PublicKeyParts;
        match self {
            Self::Rsa(k) => k.n().bits(),
            Self::EcP256(_) => 256,
            Self::EcP384(_) => 384,
            Self::EcP521(_) => 521,
        }
    }

    pub fn algorithm_name(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "RSA",
            Self::EcP256(_) => "EC P-256",
            Self::EcP384(_) => "EC P-384",
            Self::EcP521(_) => "EC P-521",
        }
    }

    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::Rsa(_))
    }

    pub fn as_rsa(&self) -> Option<&rsa::RsaPublicKey> {
        match self {
            Self::Rsa(k) => Some(k),
            _ => None,
        }
    }

    fn curve(&self) -> Option<EcCurve> {
        match self {
            Self::Rsa(_) => None,
            Self::EcP256(_) => Some(EcCurve::P256),
            Self::EcP384(_) => Some(EcCurve::P384),
            Self::EcP521(_) => Some(EcCurve::P521),
        }
    }

    /// Verify `signature` over `data`. `Ok(false)` means the signature is
    /// well-formed for this key type but does not verify.
    pub fn verify(
        &self,
        algorithm: &SignatureAlgorithm,
        data: &[u8],
        signature: &[u8],
        encoding: EcdsaEncoding,
    ) -> Result<bool, Error> {
        match (self, algorithm.family()) {
            (Self::Rsa(k), SignatureFamily::RsaPkcs1v15 | SignatureFamily::RsaPss) => {
                algorithm.rsa_verify(k, data, signature)
            }
            (_, SignatureFamily::Ecdsa) => {
                let (Some(curve), Some(point)) = (self.curve(), self.to_sec1_bytes()) else {
                    return Err(Error::Key("EC key required".into()));
                };
                algorithm.ecdsa_verify(curve, &point, data, signature, encoding)
            }
            _ => Err(Error::Key(format!(
                "{} key cannot verify {}",
                self.algorithm_name(),
                algorithm.uri()
            ))),
        }
    }
}

/// A decryption (or signing) private key.
#[derive(Clone)]
pub enum PrivateKey {
    Rsa(rsa::RsaPrivateKey),
    EcP256(p256::SecretKey),
    EcP384(p384::SecretKey),
    EcP521(p521::SecretKey),
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Rsa(_) => "RSA",
            Self::EcP256(_) => "EC P-256",
            Self::EcP384(_) => "EC P-384",
            Self::EcP521(_) => "EC P-521",
        };
        write!(f, "{name} private key")
    }
}

impl PrivateKey {
    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Rsa(k) => PublicKey::Rsa(k.to_public_key()),
            Self::EcP256(k) => PublicKey::EcP256(k.public_key()),
            Self::EcP384(k) => PublicKey::EcP384(k.public_key()),
            Self::EcP521(k) => PublicKey::EcP521(k.public_key()),
        }
    }

    /// Sign `data`; ECDSA output is `r || s` as XML-DSig expects.
    pub fn sign(&self, algorithm: &SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>, Error> {
        let concatenated = EcdsaEncoding::Concatenated;
        match (self, algorithm.family()) {
            (Self::Rsa(k), SignatureFamily::RsaPkcs1v15 | SignatureFamily::RsaPss) => {
                algorithm.rsa_sign(k, data)
            }
            (Self::EcP256(k), SignatureFamily::Ecdsa) => {
                algorithm.ecdsa_sign(EcCurve::P256, &k.to_bytes(), data, concatenated)
            }
            (Self::EcP384(k), SignatureFamily::Ecdsa) => {
                algorithm.ecdsa_sign(EcCurve::P384, &k.to_bytes(), data, concatenated)
            }
            (Self::EcP521(k), SignatureFamily::Ecdsa) => {
                algorithm.ecdsa_sign(EcCurve::P521, &k.to_bytes(), data, concatenated)
            }
            _ => Err(Error::Key(format!(
                "{} key cannot sign {}",
                self.public_key().algorithm_name(),
                algorithm.uri()
            ))),
        }
    }
}

/// An X.509 certificate, its decoded public key, an optional private key
/// and an optional issuer chain (issuer first, root last).
///
/// Built once and never mutated; the `with_*` methods consume and return.
#[derive(Clone)]
pub struct Credential {
    der: Vec<u8>,
    certificate: Certificate,
    public_key: PublicKey,
    private_key: Option<PrivateKey>,
    chain: Vec<Vec<u8>>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("subject", &self.subject())
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key)
            .field("chain_len", &self.chain.len())
            .finish()
    }
}

impl Credential {
    /// Parse a DER certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        let certificate = Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("failed to parse certificate: {e}")))?;
        let public_key = PublicKey::from_certificate(&certificate)?;
        Ok(Self {
            der: der.to_vec(),
            certificate,
            public_key,
            private_key: None,
            chain: Vec::new(),
        })
    }

    /// Attach the private key; it must belong to the certificate.
    pub fn with_private_key(mut self, key: PrivateKey) -> Result<Self, Error> {
        if key.public_key() != self.public_key {
            return Err(Error::Key(format!(
                "private key does not match certificate {}",
                self.subject()
            )));
        }
        self.private_key = Some(key);
        Ok(self)
    }

    /// Attach DER issuer certificates, issuer first.
    pub fn with_chain(mut self, chain: Vec<Vec<u8>>) -> Self {
        self.chain = chain;
        self
    }

    /// The certificate's DER encoding, byte-for-byte as supplied.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    pub fn chain(&self) -> &[Vec<u8>] {
        &self.chain
    }

    pub fn subject(&self) -> String {
        self.certificate.tbs_certificate.subject.to_string()
    }

    /// Same public key, regardless of certificate encoding.
    pub fn is_key_equal(&self, other: &Credential) -> bool {
        self.public_key == other.public_key
    }
}
