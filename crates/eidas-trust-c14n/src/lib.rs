#![forbid(unsafe_code)]

//! Exclusive XML Canonicalization 1.0 over `roxmltree` subtrees.
//!
//! SAML signatures reference an element by ID and apply the enveloped
//! signature transform, so the input here is always one element subtree,
//! optionally minus one excluded descendant (the `<ds:Signature>` itself).

pub mod exclusive;
pub mod render;
pub mod tag;

use eidas_trust_core::algorithm;

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Parse a C14N mode from an algorithm URI. Inclusive C14N is not
    /// accepted: its output depends on ancestors outside the signed element.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    pub fn with_comments(&self) -> bool {
        matches!(self, Self::ExclusiveWithComments)
    }
}

pub use exclusive::canonicalize;
