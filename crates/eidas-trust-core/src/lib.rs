#![forbid(unsafe_code)]

//! Core types shared by every crate of the eIDAS trust-and-validation layer.
//!
//! Holds the error families, algorithm URI constants and the XML namespace
//! and element-name tables used by the message parser and the decrypter.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{CertificateError, DecryptionError, Error, Result, ValidationError};
