#![forbid(unsafe_code)]

//! Configured credential collections: trust anchors and peer metadata.

use crate::credential::Credential;

/// Ordered set of credentials trusted for one role.
///
/// Supplied by configuration and only read during a validation call.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorSet {
    anchors: Vec<Credential>,
}

impl TrustAnchorSet {
    pub fn new(anchors: Vec<Credential>) -> Self {
        Self { anchors }
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Credential> {
        self.anchors.iter()
    }

    /// The anchor whose DER encoding is byte-identical to `der`.
    pub fn find_by_der(&self, der: &[u8]) -> Option<&Credential> {
        self.anchors.iter().find(|a| a.der() == der)
    }
}

impl FromIterator<Credential> for TrustAnchorSet {
    fn from_iter<I: IntoIterator<Item = Credential>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TrustAnchorSet {
    type Item = &'a Credential;
    type IntoIter = std::slice::Iter<'a, Credential>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Role a peer plays in the federation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerRole {
    IdentityProvider,
    ServiceProvider,
}

/// Certificates a peer publishes in its metadata, per role.
///
/// The same key may appear under several certificate instances; that is
/// legal and is not ambiguity.
#[derive(Debug, Clone, Default)]
pub struct MetadataCertificateSet {
    identity_provider: Vec<Credential>,
    service_provider: Vec<Credential>,
}

impl MetadataCertificateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: PeerRole, credentials: Vec<Credential>) -> Self {
        match role {
            PeerRole::IdentityProvider => self.identity_provider = credentials,
            PeerRole::ServiceProvider => self.service_provider = credentials,
        }
        self
    }

    pub fn for_role(&self, role: PeerRole) -> &[Credential] {
        match role {
            PeerRole::IdentityProvider => &self.identity_provider,
            PeerRole::ServiceProvider => &self.service_provider,
        }
    }
}
