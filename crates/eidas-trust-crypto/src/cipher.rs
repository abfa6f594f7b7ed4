#![forbid(unsafe_code)]

//! Content-encryption ciphers (AES-GCM and AES-CBC).

use eidas_trust_core::{algorithm, Error};

const GCM_NONCE_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;
const AES_BLOCK: usize = 16;

/// Trait for content-encryption algorithms.
pub trait CipherAlgorithm: Send + Sync {
    fn uri(&self) -> &'static str;
    fn key_size(&self) -> usize;
    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error>;
    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Create a cipher algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn CipherAlgorithm>, Error> {
    let (mode, key_size, uri) = match uri {
        algorithm::AES128_GCM => (Mode::Gcm, 16, algorithm::AES128_GCM),
        algorithm::AES192_GCM => (Mode::Gcm, 24, algorithm::AES192_GCM),
        algorithm::AES256_GCM => (Mode::Gcm, 32, algorithm::AES256_GCM),
        algorithm::AES128_CBC => (Mode::Cbc, 16, algorithm::AES128_CBC),
        algorithm::AES192_CBC => (Mode::Cbc, 24, algorithm::AES192_CBC),
        algorithm::AES256_CBC => (Mode::Cbc, 32, algorithm::AES256_CBC),
        _ => return Err(Error::UnsupportedAlgorithm(format!("cipher: {uri}"))),
    };
    Ok(match mode {
        Mode::Gcm => Box::new(AesGcm { key_size, uri }),
        Mode::Cbc => Box::new(AesCbc { key_size, uri }),
    })
}

enum Mode {
    Gcm,
    Cbc,
}

fn ensure_key_len(expected: usize, key: &[u8]) -> Result<(), Error> {
    if key.len() != expected {
        return Err(Error::Crypto(format!(
            "expected {expected} byte key, got {}",
            key.len()
        )));
    }
    Ok(())
}

// ── AES-GCM ──────────────────────────────────────────────────────────

/// AES-GCM as used by XML Encryption 1.1: `nonce(12) || ciphertext || tag(16)`.
struct AesGcm {
    key_size: usize,
    uri: &'static str,
}

macro_rules! gcm_op {
    ($key:expr, $op:ident, $nonce:expr, $data:expr) => {{
        use aes_gcm::{aead::Aead, KeyInit};
        let result = match $key.len() {
            16 => aes_gcm::Aes128Gcm::new_from_slice($key)
                .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?
                .$op($nonce, $data),
            24 => aes_gcm::AesGcm::<aes::Aes192, aes_gcm::aead::consts::U12>::new_from_slice($key)
                .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?
                .$op($nonce, $data),
            32 => aes_gcm::Aes256Gcm::new_from_slice($key)
                .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?
                .$op($nonce, $data),
            n => return Err(Error::Crypto(format!("unsupported AES-GCM key size {n}"))),
        };
        result.map_err(|e| Error::Crypto(format!("AES-GCM {}: {e}", stringify!($op))))
    }};
}

impl CipherAlgorithm for AesGcm {
    fn uri(&self) -> &'static str {
        self.uri
    }
    fn key_size(&self) -> usize {
        self.key_size
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        use rand::RngCore;
        ensure_key_len(self.key_size, key)?;

        let mut nonce = [0u8; GCM_NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ct = gcm_op!(key, encrypt, aes_gcm::Nonce::from_slice(&nonce), plaintext)?;

        let mut out = Vec::with_capacity(GCM_NONCE_LEN + ct.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ct);
        Ok(out)
    }

    fn decrypt(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
        ensure_key_len(self.key_size, key)?;
        if data.len() < GCM_NONCE_LEN + GCM_TAG_LEN {
            return Err(Error::Crypto("AES-GCM data too short".into()));
        }
        let (nonce, ct_and_tag) = data.split_at(GCM_NONCE_LEN);
        gcm_op!(key, decrypt, aes_gcm::Nonce::from_slice(nonce), ct_and_tag)
    }
}

// ── AES-CBC ──────────────────────────────────────────────────────────

/// AES-CBC as used by XML Encryption 1.0: `iv(16) || ciphertext`.
struct AesCbc {
    key_size: usize,
    uri: &'static str,
}

impl CipherAlgorithm for AesCbc {
    fn uri(&self) -> &'static str {
        self.uri
    }
    fn key_size(&self) -> usize {
        self.key_size
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        use cbc::cipher::{block_padding::NoPadding, BlockEncryptMut, KeyIvInit};
        use rand::RngCore;
        ensure_key_len(self.key_size, key)?;

        let mut iv = [0u8; AES_BLOCK];
        rand::thread_rng().fill_bytes(&mut iv);
        let mut buf = pkcs7_pad(plaintext, AES_BLOCK);
        let buf_len = buf.len();

        macro_rules! run {
            ($aes:ty) => {
                cbc::Encryptor::<$aes>::new_from_slices(key, &iv)
                    .map_err(|e| Error::Crypto(format!("AES-CBC init: {e}")))?
                    .encrypt_padded_mut::<NoPadding>(&mut buf, buf_len)
                    .map(|_| ())
                    .map_err(|e| Error::Crypto(format!("AES-CBC encrypt: {e}")))?
            };
        }
        match self.key_size {
            16 => run!(aes::Aes128),
            24 => run!(aes::Aes192),
            _ => run!(aes::Aes256),
        }

        let mut out = Vec::with_capacity(AES_BLOCK + buf.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&buf);
        Ok(out)
    }

    fn decrypt(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
        use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
        ensure_key_len(self.key_size, key)?;
        if data.len() < 2 * AES_BLOCK || data.len() % AES_BLOCK != 0 {
            return Err(Error::Crypto("AES-CBC data invalid length".into()));
        }

        let (iv, ciphertext) = data.split_at(AES_BLOCK);
        let mut buf = ciphertext.to_vec();

        macro_rules! run {
            ($aes:ty) => {
                cbc::Decryptor::<$aes>::new_from_slices(key, iv)
                    .map_err(|e| Error::Crypto(format!("AES-CBC init: {e}")))?
                    .decrypt_padded_mut::<NoPadding>(&mut buf)
                    .map(|_| ())
                    .map_err(|e| Error::Crypto(format!("AES-CBC decrypt: {e}")))?
            };
        }
        match self.key_size {
            16 => run!(aes::Aes128),
            24 => run!(aes::Aes192),
            _ => run!(aes::Aes256),
        }

        xmlenc_unpad(&buf, AES_BLOCK)
    }
}

fn pkcs7_pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let pad_len = block_size - (data.len() % block_size);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.extend(std::iter::repeat(pad_len as u8).take(pad_len));
    padded
}

/// Strip XML Encryption padding; only the final length byte is significant
/// (covers both PKCS#7 and ISO 10126 filler).
fn xmlenc_unpad(data: &[u8], block_size: usize) -> Result<Vec<u8>, Error> {
    let Some(&pad_byte) = data.last() else {
        return Ok(Vec::new());
    };
    let pad_len = pad_byte as usize;
    if pad_len == 0 || pad_len > block_size || pad_len > data.len() {
        return Err(Error::Crypto("invalid padding".into()));
    }
    Ok(data[..data.len() - pad_len].to_vec())
}
