#![forbid(unsafe_code)]

//! ConcatKDF (NIST SP 800-56A section 5.8.1) as profiled by XML Encryption 1.1.

use digest::Digest;
use eidas_trust_core::{algorithm, Error};

/// `ConcatKDFParams` from the `KeyDerivationMethod` element.
///
/// The three info fields are the hex-decoded attribute values with the
/// leading padding-bits byte already removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcatKdfParams {
    /// Digest algorithm URI (SHA-256 when absent).
    pub digest_uri: Option<String>,
    pub algorithm_id: Option<Vec<u8>>,
    pub party_u_info: Option<Vec<u8>>,
    pub party_v_info: Option<Vec<u8>>,
}

impl ConcatKdfParams {
    /// `OtherInfo = AlgorithmID || PartyUInfo || PartyVInfo`.
    fn other_info(&self) -> Vec<u8> {
        [&self.algorithm_id, &self.party_u_info, &self.party_v_info]
            .into_iter()
            .flatten()
            .flat_map(|v| v.iter().copied())
            .collect()
    }
}

/// Derive `key_len` bytes from `shared_secret`.
pub fn concat_kdf(
    shared_secret: &[u8],
    key_len: usize,
    params: &ConcatKdfParams,
) -> Result<Vec<u8>, Error> {
    let other_info = params.other_info();
    match params.digest_uri.as_deref().unwrap_or(algorithm::SHA256) {
        algorithm::SHA256 => Ok(derive::<sha2::Sha256>(shared_secret, &other_info, key_len)),
        algorithm::SHA384 => Ok(derive::<sha2::Sha384>(shared_secret, &other_info, key_len)),
        algorithm::SHA512 => Ok(derive::<sha2::Sha512>(shared_secret, &other_info, key_len)),
        other => Err(Error::UnsupportedAlgorithm(format!(
            "ConcatKDF digest: {other}"
        ))),
    }
}

fn derive<H: Digest>(shared_secret: &[u8], other_info: &[u8], key_len: usize) -> Vec<u8> {
    let hash_len = <H as Digest>::output_size();
    let reps = key_len.div_ceil(hash_len);
    let mut derived = Vec::with_capacity(reps * hash_len);

    for counter in 1..=(reps as u32) {
        let mut hasher = H::new();
        hasher.update(counter.to_be_bytes());
        hasher.update(shared_secret);
        hasher.update(other_info);
        derived.extend_from_slice(&hasher.finalize());
    }

    derived.truncate(key_len);
    derived
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_block_matches_manual_hash() {
        let params = ConcatKdfParams {
            algorithm_id: Some(b"alg".to_vec()),
            party_u_info: Some(b"u".to_vec()),
            party_v_info: None,
            ..ConcatKdfParams::default()
        };
        let out = concat_kdf(b"secret", 16, &params).unwrap();

        let mut h = sha2::Sha256::new();
        h.update(1u32.to_be_bytes());
        h.update(b"secret");
        h.update(b"algu");
        assert_eq!(out, h.finalize()[..16].to_vec());
    }

    #[test]
    fn spans_multiple_blocks() {
        let out = concat_kdf(b"z", 48, &ConcatKdfParams::default()).unwrap();
        assert_eq!(out.len(), 48);
        assert_ne!(out[..32], out[32..48]);
    }

    #[test]
    fn sha1_is_not_accepted() {
        let params = ConcatKdfParams {
            digest_uri: Some(algorithm::SHA1.into()),
            ..ConcatKdfParams::default()
        };
        assert!(matches!(
            concat_kdf(b"z", 16, &params),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
