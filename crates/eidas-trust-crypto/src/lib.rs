#![forbid(unsafe_code)]

//! Cryptographic primitives for eIDAS SAML messages.
//!
//! Content ciphers (AES-GCM, AES-CBC), RSA key transport, ECDH-ES key
//! agreement with ConcatKDF and AES key wrap open encrypted assertions;
//! digests and RSA/ECDSA signature methods back XML-DSig and X.509. Each
//! family is selected by its algorithm URI through a `from_uri` constructor.

pub mod cipher;
pub mod digest;
pub mod kdf;
pub mod keyagreement;
pub mod keytransport;
pub mod keywrap;
pub mod sign;

pub use cipher::CipherAlgorithm;
pub use digest::HashAlgorithm;
pub use kdf::ConcatKdfParams;
pub use keytransport::{KeyTransportAlgorithm, OaepParams};
pub use keywrap::KeyWrapAlgorithm;
pub use sign::{EcCurve, EcdsaEncoding, SignatureAlgorithm, SignatureFamily};
