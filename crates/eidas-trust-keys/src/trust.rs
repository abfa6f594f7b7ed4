#![forbid(unsafe_code)]

//! Certificate trust verification.
//!
//! Explicit trust is a byte-for-byte DER match against an anchor. Chain
//! trust builds a path from the target through the credential's own chain
//! to an anchor, verifying every issuer signature, then checks revocation
//! for the certificates below the anchor.

use crate::credential::Credential;
use crate::revocation::{NoRevocationSource, RevocationSource, RevocationStatus};
use crate::store::TrustAnchorSet;
use crate::x509;
use der::Decode;
use eidas_trust_core::CertificateError;
use x509_cert::Certificate;

/// Maximum number of certificates above the target on a built path,
/// anchor included.
pub const MAX_CHAIN_DEPTH: usize = 5;

/// Revocation checking policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevocationPolicy {
    /// Check revocation at all.
    pub enabled: bool,
    /// Missing revocation data fails the check instead of being logged.
    pub missing_data_fatal: bool,
}

impl Default for RevocationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            missing_data_fatal: false,
        }
    }
}

impl RevocationPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            missing_data_fatal: false,
        }
    }

    pub fn strict() -> Self {
        Self {
            enabled: true,
            missing_data_fatal: true,
        }
    }
}

/// Immutable settings for trust checks.
pub struct TrustContext {
    pub revocation: RevocationPolicy,
    pub revocation_source: Box<dyn RevocationSource>,
    /// Fixed verification time; the current time when `None`.
    pub verification_time: Option<der::DateTime>,
    pub skip_time_checks: bool,
}

impl Default for TrustContext {
    fn default() -> Self {
        Self {
            revocation: RevocationPolicy::default(),
            revocation_source: Box::new(NoRevocationSource),
            verification_time: None,
            skip_time_checks: false,
        }
    }
}

impl std::fmt::Debug for TrustContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustContext")
            .field("revocation", &self.revocation)
            .field("verification_time", &self.verification_time)
            .field("skip_time_checks", &self.skip_time_checks)
            .finish_non_exhaustive()
    }
}

impl TrustContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_revocation(
        mut self,
        policy: RevocationPolicy,
        source: impl RevocationSource + 'static,
    ) -> Self {
        self.revocation = policy;
        self.revocation_source = Box::new(source);
        self
    }

    pub fn with_verification_time(mut self, time: der::DateTime) -> Self {
        self.verification_time = Some(time);
        self
    }
}

/// Succeeds iff `target` is byte-identical to one of `anchors`.
pub fn check_explicit_trust(
    target: &Credential,
    anchors: &TrustAnchorSet,
) -> Result<(), CertificateError> {
    if anchors.find_by_der(target.der()).is_some() {
        tracing::debug!(subject = %target.subject(), "certificate explicitly trusted");
        return Ok(());
    }
    tracing::warn!(subject = %target.subject(), "certificate is not an explicit trust anchor");
    Err(CertificateError::UntrustedCertificate(format!(
        "{} is not a trust anchor",
        target.subject()
    )))
}

/// Build and verify a certification path from `target` to one of `anchors`.
pub fn check_chain_trust(
    target: &Credential,
    anchors: &TrustAnchorSet,
    ctx: &TrustContext,
) -> Result<(), CertificateError> {
    let subject = target.subject();
    if anchors.is_empty() {
        tracing::warn!(%subject, "empty trust anchor set");
        return Err(CertificateError::UntrustedCertificate(
            "trust anchor set is empty".into(),
        ));
    }

    let at = x509::resolve_verification_time(ctx.verification_time)
        .map_err(|e| CertificateError::Malformed(e.to_string()))?;
    let check_time = |cert: &Certificate| -> Result<(), CertificateError> {
        if ctx.skip_time_checks {
            return Ok(());
        }
        x509::check_validity(cert, &at).map_err(|e| {
            CertificateError::UntrustedCertificate(format!(
                "{}: {e}",
                cert.tbs_certificate.subject
            ))
        })
    };

    let leaf = target.certificate();
    check_time(leaf)?;

    // A target that is itself an anchor ends the path: no revocation check.
    if anchors.find_by_der(target.der()).is_some() {
        tracing::debug!(%subject, "target is a trust anchor");
        return Ok(());
    }

    let intermediates = target
        .chain()
        .iter()
        .filter(|der| der.as_slice() != target.der())
        .map(|der| {
            Certificate::from_der(der)
                .map(|c| (c, der.as_slice()))
                .map_err(|e| CertificateError::Malformed(format!("chain certificate: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut path: Vec<&Certificate> = vec![leaf];
    let mut visited: Vec<&[u8]> = vec![target.der()];

    loop {
        let current = path[path.len() - 1];

        if let Some(anchor) = anchors
            .iter()
            .find(|a| x509::is_issued_by(current, a.certificate()))
        {
            check_time(anchor.certificate())?;
            // A self-signed anchor is trusted as configured; a non-root
            // anchor still has to be a CA.
            if !x509::is_self_issued(anchor.certificate()) {
                check_issuer(anchor.certificate(), &path)?;
            }
            tracing::debug!(
                %subject,
                anchor = %anchor.subject(),
                depth = path.len(),
                "certification path reaches trust anchor"
            );
            return check_path_revocation(&path, anchor.certificate(), &at, ctx);
        }

        if x509::is_self_issued(current) {
            tracing::warn!(%subject, "path ends in a self-issued non-anchor certificate");
            return Err(CertificateError::UntrustedCertificate(format!(
                "{} is self-issued and not a trust anchor",
                current.tbs_certificate.subject
            )));
        }

        // One more intermediate plus the anchor must still fit.
        if path.len() >= MAX_CHAIN_DEPTH {
            tracing::warn!(%subject, "certification path too long");
            return Err(CertificateError::UntrustedCertificate(
                "certificate chain too long".into(),
            ));
        }

        let Some((issuer, issuer_der)) = intermediates
            .iter()
            .find(|(c, der)| !visited.contains(der) && x509::is_issued_by(current, c))
        else {
            tracing::warn!(%subject, issuer = %current.tbs_certificate.issuer, "no issuer found");
            return Err(CertificateError::UntrustedCertificate(format!(
                "cannot build a path from {} to a trust anchor",
                subject
            )));
        };

        check_time(issuer)?;
        check_issuer(issuer, &path)?;
        visited.push(*issuer_der);
        path.push(issuer);
    }
}

/// `issuer` signs the last certificate of `path`; everything on the path
/// after the target is an intermediate below it.
fn check_issuer(issuer: &Certificate, path: &[&Certificate]) -> Result<(), CertificateError> {
    let below = path
        .iter()
        .skip(1)
        .filter(|c| !x509::is_self_issued(c))
        .count();
    x509::check_issuer_constraints(issuer, below).map_err(|e| {
        tracing::warn!(issuer = %issuer.tbs_certificate.subject, "issuer constraints not met");
        CertificateError::UntrustedCertificate(e.to_string())
    })
}

/// Revocation for every path certificate below `anchor`.
fn check_path_revocation(
    path: &[&Certificate],
    anchor: &Certificate,
    at: &der::DateTime,
    ctx: &TrustContext,
) -> Result<(), CertificateError> {
    if !ctx.revocation.enabled {
        return Ok(());
    }

    for (i, cert) in path.iter().enumerate() {
        let issuer = path.get(i + 1).copied().unwrap_or(anchor);
        let name = cert.tbs_certificate.subject.to_string();
        match ctx.revocation_source.status(cert, issuer, at) {
            RevocationStatus::Good => {}
            RevocationStatus::Revoked => {
                tracing::warn!(subject = %name, "certificate on path is revoked");
                return Err(CertificateError::CertificateRevoked(name));
            }
            RevocationStatus::Unknown if ctx.revocation.missing_data_fatal => {
                tracing::warn!(subject = %name, "no revocation data for certificate on path");
                return Err(CertificateError::MissingRevocationData(name));
            }
            RevocationStatus::Unknown => {
                tracing::warn!(subject = %name, "no revocation data, continuing (soft-fail)");
            }
        }
    }
    Ok(())
}
