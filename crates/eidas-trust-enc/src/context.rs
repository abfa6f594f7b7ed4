#![forbid(unsafe_code)]

//! Decryption context: node credentials and algorithm whitelists.

use eidas_trust_core::algorithm;
use eidas_trust_keys::Credential;

/// Immutable settings for [`crate::decrypt`].
#[derive(Debug, Clone)]
pub struct DecryptionContext {
    /// The node's own decryption credentials; only those with a private key
    /// are considered.
    pub credentials: Vec<Credential>,
    /// Accepted `EncryptedData` algorithms.
    pub allowed_data_algorithms: Vec<String>,
    /// Accepted `EncryptedKey` key-transport algorithms.
    pub allowed_key_transport: Vec<String>,
    /// Accepted `EncryptedKey` key-wrap algorithms (with ECDH-ES).
    pub allowed_key_wrap: Vec<String>,
    /// Skip credentials whose certificate is outside its validity window.
    pub check_validity_period: bool,
    /// Time used for the validity check; the current time when `None`.
    pub verification_time: Option<der::DateTime>,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

impl Default for DecryptionContext {
    fn default() -> Self {
        Self {
            credentials: Vec::new(),
            allowed_data_algorithms: owned(algorithm::DEFAULT_DATA_ENCRYPTION),
            allowed_key_transport: owned(algorithm::DEFAULT_KEY_TRANSPORT),
            allowed_key_wrap: owned(algorithm::DEFAULT_KEY_WRAP),
            check_validity_period: true,
            verification_time: None,
        }
    }
}

impl DecryptionContext {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }

    pub fn with_verification_time(mut self, time: der::DateTime) -> Self {
        self.verification_time = Some(time);
        self
    }

    pub(crate) fn allows_data_algorithm(&self, uri: &str) -> bool {
        self.allowed_data_algorithms.iter().any(|a| a == uri)
    }

    pub(crate) fn allows_key_transport(&self, uri: &str) -> bool {
        self.allowed_key_transport.iter().any(|a| a == uri)
    }

    pub(crate) fn allows_key_wrap(&self, uri: &str) -> bool {
        self.allowed_key_wrap.iter().any(|a| a == uri)
    }
}
