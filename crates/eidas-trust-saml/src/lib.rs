#![forbid(unsafe_code)]

//! SAML 2.0 protocol messages as seen by the eIDAS trust layer.
//!
//! [`parse_authn_request`] and [`parse_response`] turn wire XML into
//! immutable values. A [`Response`] keeps its serialized form so that the
//! decrypter can splice decrypted assertions back in and parse it again.

pub mod model;
pub mod parse;

pub use model::{
    Assertion, Attribute, AuthnRequest, ComparisonMode, EncryptedAssertion, IdIndex,
    RequestedAttribute, RequestedAuthnContext, Response, Signature, Status,
};
pub use parse::{parse_authn_request, parse_response};
