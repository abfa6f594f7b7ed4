#![forbid(unsafe_code)]

//! RSA key transport (PKCS#1 v1.5 and RSA-OAEP).

use eidas_trust_core::{algorithm, Error};

/// Trait for key transport algorithms.
pub trait KeyTransportAlgorithm: Send + Sync {
    fn uri(&self) -> &'static str;
    fn encrypt(&self, public_key: &rsa::RsaPublicKey, key_data: &[u8]) -> Result<Vec<u8>, Error>;
    fn decrypt(&self, private_key: &rsa::RsaPrivateKey, encrypted: &[u8])
        -> Result<Vec<u8>, Error>;
}

/// RSA-OAEP parameters read from the `EncryptionMethod` element.
#[derive(Debug, Clone, Default)]
pub struct OaepParams {
    /// `DigestMethod` URI (SHA-1 when absent).
    pub digest_uri: Option<String>,
    /// `MGF` URI (XML Enc 1.1 only).
    pub mgf_uri: Option<String>,
    /// Decoded `OAEPparams` label.
    pub label: Option<Vec<u8>>,
}

/// Create a key transport algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn KeyTransportAlgorithm>, Error> {
    from_uri_with_params(uri, OaepParams::default())
}

/// Create a key transport algorithm from its URI with RSA-OAEP parameters.
pub fn from_uri_with_params(
    uri: &str,
    params: OaepParams,
) -> Result<Box<dyn KeyTransportAlgorithm>, Error> {
    match uri {
        algorithm::RSA_PKCS1 => Ok(Box::new(RsaPkcs1Transport)),
        algorithm::RSA_OAEP => Ok(Box::new(RsaOaepTransport {
            uri: algorithm::RSA_OAEP,
            params,
        })),
        algorithm::RSA_OAEP_ENC11 => Ok(Box::new(RsaOaepTransport {
            uri: algorithm::RSA_OAEP_ENC11,
            params,
        })),
        _ => Err(Error::UnsupportedAlgorithm(format!("key transport: {uri}"))),
    }
}

/// Whether `uri` names an RSA key transport algorithm.
pub fn is_key_transport(uri: &str) -> bool {
    matches!(
        uri,
        algorithm::RSA_PKCS1 | algorithm::RSA_OAEP | algorithm::RSA_OAEP_ENC11
    )
}

struct RsaPkcs1Transport;

impl KeyTransportAlgorithm for RsaPkcs1Transport {
    fn uri(&self) -> &'static str {
        algorithm::RSA_PKCS1
    }

    fn encrypt(&self, public_key: &rsa::RsaPublicKey, key_data: &[u8]) -> Result<Vec<u8>, Error> {
        public_key
            .encrypt(&mut rand::thread_rng(), rsa::Pkcs1v15Encrypt, key_data)
            .map_err(|e| Error::Crypto(format!("RSA PKCS#1 encrypt: {e}")))
    }

    fn decrypt(
        &self,
        private_key: &rsa::RsaPrivateKey,
        encrypted: &[u8],
    ) -> Result<Vec<u8>, Error> {
        private_key
            .decrypt(rsa::Pkcs1v15Encrypt, encrypted)
            .map_err(|e| Error::Crypto(format!("RSA PKCS#1 decrypt: {e}")))
    }
}

struct RsaOaepTransport {
    uri: &'static str,
    params: OaepParams,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Hash {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

fn digest_hash(uri: Option<&str>) -> Result<Hash, Error> {
    match uri {
        None | Some(algorithm::SHA1) => Ok(Hash::Sha1),
        Some(algorithm::SHA224) => Ok(Hash::Sha224),
        Some(algorithm::SHA256) => Ok(Hash::Sha256),
        Some(algorithm::SHA384) => Ok(Hash::Sha384),
        Some(algorithm::SHA512) => Ok(Hash::Sha512),
        Some(other) => Err(Error::UnsupportedAlgorithm(format!("OAEP digest: {other}"))),
    }
}

/// MGF1 hash: an explicit `MGF` wins; otherwise `rsa-oaep-mgf1p` fixes
/// SHA-1 and XML Enc 1.1 `rsa-oaep` follows the digest.
fn mgf_hash(uri: &str, params: &OaepParams, digest: Hash) -> Result<Hash, Error> {
    match params.mgf_uri.as_deref() {
        Some(algorithm::MGF1_SHA1) => Ok(Hash::Sha1),
        Some(algorithm::MGF1_SHA224) => Ok(Hash::Sha224),
        Some(algorithm::MGF1_SHA256) => Ok(Hash::Sha256),
        Some(algorithm::MGF1_SHA384) => Ok(Hash::Sha384),
        Some(algorithm::MGF1_SHA512) => Ok(Hash::Sha512),
        Some(other) => Err(Error::UnsupportedAlgorithm(format!("OAEP MGF: {other}"))),
        None if uri == algorithm::RSA_OAEP => Ok(Hash::Sha1),
        None => Ok(digest),
    }
}

impl RsaOaepTransport {
    fn padding(&self) -> Result<rsa::Oaep, Error> {
        let digest = digest_hash(self.params.digest_uri.as_deref())?;
        let mgf = mgf_hash(self.uri, &self.params, digest)?;

        macro_rules! with_mgf {
            ($d:ty) => {
                match mgf {
                    Hash::Sha1 => rsa::Oaep::new_with_mgf_hash::<$d, sha1::Sha1>(),
                    Hash::Sha224 => rsa::Oaep::new_with_mgf_hash::<$d, sha2::Sha224>(),
                    Hash::Sha256 => rsa::Oaep::new_with_mgf_hash::<$d, sha2::Sha256>(),
                    Hash::Sha384 => rsa::Oaep::new_with_mgf_hash::<$d, sha2::Sha384>(),
                    Hash::Sha512 => rsa::Oaep::new_with_mgf_hash::<$d, sha2::Sha512>(),
                }
            };
        }
        let mut padding = match digest {
            Hash::Sha1 => with_mgf!(sha1::Sha1),
            Hash::Sha224 => with_mgf!(sha2::Sha224),
            Hash::Sha256 => with_mgf!(sha2::Sha256),
            Hash::Sha384 => with_mgf!(sha2::Sha384),
            Hash::Sha512 => with_mgf!(sha2::Sha512),
        };
        if let Some(label) = &self.params.label {
            padding.label = Some(String::from_utf8_lossy(label).into_owned());
        }
        Ok(padding)
    }
}

impl KeyTransportAlgorithm for RsaOaepTransport {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn encrypt(&self, public_key: &rsa::RsaPublicKey, key_data: &[u8]) -> Result<Vec<u8>, Error> {
        public_key
            .encrypt(&mut rand::thread_rng(), self.padding()?, key_data)
            .map_err(|e| Error::Crypto(format!("RSA-OAEP encrypt: {e}")))
    }

    fn decrypt(
        &self,
        private_key: &rsa::RsaPrivateKey,
        encrypted: &[u8],
    ) -> Result<Vec<u8>, Error> {
        private_key
            .decrypt(self.padding()?, encrypted)
            .map_err(|e| Error::Crypto(format!("RSA-OAEP decrypt: {e}")))
    }
}
