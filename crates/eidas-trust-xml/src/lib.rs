#![forbid(unsafe_code)]

//! XML helpers over `roxmltree` shared by the SAML parser and the
//! assertion decrypter.

pub mod document;

pub use document::{
    build_id_map, child_text, find_child, find_children, find_descendant, find_descendants,
    parse,
};

/// Maximum number of nodes accepted in a single protocol message.
pub const NODES_LIMIT: u32 = 100_000;

/// Return roxmltree parsing options for untrusted protocol messages.
///
/// DTDs are rejected outright: a SAML message never needs one and entity
/// declarations are a classic amplification vector.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: false,
        nodes_limit: NODES_LIMIT,
        ..roxmltree::ParsingOptions::default()
    }
}
