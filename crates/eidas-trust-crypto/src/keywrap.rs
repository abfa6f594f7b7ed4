#![forbid(unsafe_code)]

//! AES key wrap (RFC 3394), used to protect the content key under a
//! key-agreement derived KEK.

use aes_kw::Kek;
use eidas_trust_core::{algorithm, Error};

/// Trait for key wrap algorithms.
pub trait KeyWrapAlgorithm: Send + Sync {
    fn uri(&self) -> &'static str;
    fn kek_size(&self) -> usize;
    fn wrap(&self, kek: &[u8], key_data: &[u8]) -> Result<Vec<u8>, Error>;
    fn unwrap(&self, kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Create a key wrap algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn KeyWrapAlgorithm>, Error> {
    let (kek_size, uri) = match uri {
        algorithm::KW_AES128 => (16, algorithm::KW_AES128),
        algorithm::KW_AES192 => (24, algorithm::KW_AES192),
        algorithm::KW_AES256 => (32, algorithm::KW_AES256),
        _ => return Err(Error::UnsupportedAlgorithm(format!("key wrap: {uri}"))),
    };
    Ok(Box::new(AesKeyWrap { kek_size, uri }))
}

/// Whether `uri` names a symmetric key wrap algorithm.
pub fn is_key_wrap(uri: &str) -> bool {
    matches!(
        uri,
        algorithm::KW_AES128 | algorithm::KW_AES192 | algorithm::KW_AES256
    )
}

struct AesKeyWrap {
    kek_size: usize,
    uri: &'static str,
}

impl AesKeyWrap {
    fn check_kek(&self, kek: &[u8]) -> Result<(), Error> {
        if kek.len() != self.kek_size {
            return Err(Error::Crypto(format!(
                "expected {} byte KEK, got {}",
                self.kek_size,
                kek.len()
            )));
        }
        Ok(())
    }
}

impl KeyWrapAlgorithm for AesKeyWrap {
    fn uri(&self) -> &'static str {
        self.uri
    }
    fn kek_size(&self) -> usize {
        self.kek_size
    }

    fn wrap(&self, kek_bytes: &[u8], key_data: &[u8]) -> Result<Vec<u8>, Error> {
        self.check_kek(kek_bytes)?;
        let mut out = vec![0u8; key_data.len() + 8];
        macro_rules! run {
            ($aes:ty) => {
                Kek::<$aes>::new(kek_bytes.into())
                    .wrap(key_data, &mut out)
                    .map_err(|e| Error::Crypto(format!("AES-KW wrap: {e}")))?
            };
        }
        match self.kek_size {
            16 => run!(aes::Aes128),
            24 => run!(aes::Aes192),
            _ => run!(aes::Aes256),
        }
        Ok(out)
    }

    fn unwrap(&self, kek_bytes: &[u8], wrapped: &[u8]) -> Result<Vec<u8>, Error> {
        self.check_kek(kek_bytes)?;
        if wrapped.len() < 16 || wrapped.len() % 8 != 0 {
            return Err(Error::Crypto("wrapped key has invalid length".into()));
        }
        let mut out = vec![0u8; wrapped.len() - 8];
        macro_rules! run {
            ($aes:ty) => {
                Kek::<$aes>::new(kek_bytes.into())
                    .unwrap(wrapped, &mut out)
                    .map_err(|e| Error::Crypto(format!("AES-KW unwrap: {e}")))?
            };
        }
        match self.kek_size {
            16 => run!(aes::Aes128),
            24 => run!(aes::Aes192),
            _ => run!(aes::Aes256),
        }
        Ok(out)
    }
}
