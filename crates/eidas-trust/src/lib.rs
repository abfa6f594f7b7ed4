#![forbid(unsafe_code)]

//! Trust and validation layer of an eIDAS node.
//!
//! The member crates are re-exported under short names. [`ResponseProcessor`]
//! ties them together: it validates an inbound message, finds and trusts
//! the certificate that signed it, verifies the signature, decrypts its assertions and checks the
//! asserted level of assurance against what was requested.

pub use eidas_trust_core as core;
pub use eidas_trust_crypto as crypto;
pub use eidas_trust_dsig as dsig;
pub use eidas_trust_enc as enc;
pub use eidas_trust_keys as keys;
pub use eidas_trust_saml as saml;
pub use eidas_trust_validation as validation;
pub use eidas_trust_xml as xml;

pub mod context;
pub mod error;
pub mod processor;

pub use context::{NodeContext, TrustMode};
pub use error::Error;
pub use processor::ResponseProcessor;
