#![forbid(unsafe_code)]

//! Revocation status sources.

use crate::x509;
use der::Decode;
use eidas_trust_core::Error;
use x509_cert::crl::CertificateList;
use x509_cert::Certificate;

/// Revocation status of one certificate as seen by a [`RevocationSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationStatus {
    Good,
    Revoked,
    /// No authoritative answer (no CRL, stale CRL, lookup timed out).
    Unknown,
}

/// Answers revocation queries for a certificate and its issuer.
///
/// Implementations backed by network lookups must bound their own latency
/// and report [`RevocationStatus::Unknown`] on timeout.
pub trait RevocationSource: Send + Sync {
    fn status(&self, cert: &Certificate, issuer: &Certificate, at: &der::DateTime)
        -> RevocationStatus;
}

/// A source with no revocation data at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRevocationSource;

impl RevocationSource for NoRevocationSource {
    fn status(&self, _: &Certificate, _: &Certificate, _: &der::DateTime) -> RevocationStatus {
        RevocationStatus::Unknown
    }
}

/// Revocation answers from a fixed set of CRLs.
///
/// A CRL only speaks for certificates of the issuer that signed it; a CRL
/// whose `nextUpdate` has passed is ignored.
#[derive(Debug, Clone, Default)]
pub struct CrlRevocationSource {
    crls: Vec<CertificateList>,
}

impl CrlRevocationSource {
    pub fn new(crls: Vec<CertificateList>) -> Self {
        Self { crls }
    }

    /// Parse DER-encoded CRLs.
    pub fn from_der<T: AsRef<[u8]>>(crls: &[T]) -> Result<Self, Error> {
        let crls = crls
            .iter()
            .map(|der| {
                CertificateList::from_der(der.as_ref())
                    .map_err(|e| Error::Certificate(format!("failed to parse CRL: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { crls })
    }

    pub fn len(&self) -> usize {
        self.crls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crls.is_empty()
    }
}

impl RevocationSource for CrlRevocationSource {
    fn status(
        &self,
        cert: &Certificate,
        issuer: &Certificate,
        at: &der::DateTime,
    ) -> RevocationStatus {
        let issuer_spki = &issuer.tbs_certificate.subject_public_key_info;
        let serial = &cert.tbs_certificate.serial_number;
        let mut answered = false;

        for crl in &self.crls {
            let tbs = &crl.tbs_cert_list;
            if tbs.issuer != issuer.tbs_certificate.subject {
                continue;
            }
            if let Err(e) = x509::verify_crl_signature(crl, issuer_spki) {
                tracing::debug!(issuer = %tbs.issuer, error = %e, "ignoring unverifiable CRL");
                continue;
            }
            if let Some(next_update) = &tbs.next_update {
                if next_update.to_date_time() < *at {
                    tracing::debug!(issuer = %tbs.issuer, "ignoring stale CRL");
                    continue;
                }
            }

            let revoked = tbs.revoked_certificates.iter().flatten().any(|entry| {
                entry.serial_number == *serial && entry.revocation_date.to_date_time() <= *at
            });
            if revoked {
                return RevocationStatus::Revoked;
            }
            answered = true;
        }

        if answered {
            RevocationStatus::Good
        } else {
            RevocationStatus::Unknown
        }
    }
}
