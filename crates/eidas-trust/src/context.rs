#![forbid(unsafe_code)]

//! Per-node settings consumed by the processing pipeline.

use eidas_trust_enc::DecryptionContext;
use eidas_trust_keys::{MetadataCertificateSet, PeerRole, TrustAnchorSet, TrustContext};
use eidas_trust_validation::ValidationConfig;

/// How a matched signing certificate is trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrustMode {
    /// Build a certification path to one of the anchors.
    #[default]
    Chain,
    /// Require the certificate itself to be one of the anchors.
    Explicit,
}

/// Everything a node needs to accept messages from one peer.
///
/// Built once from configuration and shared read-only between concurrent
/// calls.
#[derive(Debug, Default)]
pub struct NodeContext {
    pub validation: ValidationConfig,
    /// Anchors for certificates of peers acting as identity provider
    /// (they sign responses).
    pub identity_provider_anchors: TrustAnchorSet,
    /// Anchors for certificates of peers acting as service provider
    /// (they sign requests).
    pub service_provider_anchors: TrustAnchorSet,
    pub metadata: MetadataCertificateSet,
    pub trust_mode: TrustMode,
    pub trust: TrustContext,
    pub decryption: DecryptionContext,
    /// LoAs this node can serve.
    pub allowed_loas: Vec<String>,
}

impl NodeContext {
    pub fn anchors_for(&self, role: PeerRole) -> &TrustAnchorSet {
        match role {
            PeerRole::IdentityProvider => &self.identity_provider_anchors,
            PeerRole::ServiceProvider => &self.service_provider_anchors,
        }
    }
}
