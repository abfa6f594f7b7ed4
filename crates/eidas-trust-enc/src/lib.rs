#![forbid(unsafe_code)]

//! Encrypted assertions in eIDAS SAML responses.
//!
//! [`decrypt`] selects the node credential the assertion key was actually
//! encrypted for, decrypts every `EncryptedAssertion`, splices the plaintext
//! back into a copy of the response and parses the result again.
//! [`encrypt_assertions`] is the responding side of the same exchange.

pub mod context;
pub mod decrypt;
pub mod encrypt;

pub use context::DecryptionContext;
pub use decrypt::decrypt;
pub use encrypt::encrypt_assertions;
