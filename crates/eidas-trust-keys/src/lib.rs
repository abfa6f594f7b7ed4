#![forbid(unsafe_code)]

//! Credentials and certificate trust for the eIDAS trust layer.
//!
//! - [`Credential`]: an X.509 certificate with optional private key and chain.
//! - [`KeyMaterial`]: the key representations found in `<ds:KeyInfo>`.
//! - [`trust`]: chain and explicit trust verification with revocation.
//! - [`matcher`]: which metadata certificate actually signed a message.

pub mod credential;
pub mod keyinfo;
pub mod loader;
pub mod matcher;
pub mod revocation;
pub mod store;
pub mod trust;
pub mod x509;

pub use credential::{Credential, PrivateKey, PublicKey};
pub use keyinfo::KeyMaterial;
pub use matcher::{match_signature_certificate, SignedMessage};
pub use revocation::{CrlRevocationSource, NoRevocationSource, RevocationSource, RevocationStatus};
pub use store::{MetadataCertificateSet, PeerRole, TrustAnchorSet};
pub use trust::{check_chain_trust, check_explicit_trust, RevocationPolicy, TrustContext};
