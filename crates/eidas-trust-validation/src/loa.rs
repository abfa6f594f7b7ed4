#![forbid(unsafe_code)]

//! Level-of-Assurance values and comparison rules.
//!
//! Notified LoAs (`low`, `substantial`, `high` under the eIDAS namespace)
//! are ordered. Any other URI is a non-notified LoA, compared only by exact
//! string equality. The two kinds are never compared with each other.
//!
//! Comparison helpers return `bool`: a missing or unparsable input is "not
//! valid", never an error. [`validate_requested_loas`] is the exception; it
//! checks the shape of a request's LoA list and reports why it is rejected.

use eidas_trust_core::ValidationError;
use eidas_trust_saml::{AuthnRequest, ComparisonMode};
use std::fmt;

/// Namespace prefix of the notified levels.
pub const EIDAS_LOA_PREFIX: &str = "http://eidas.europa.eu/LoA/";

/// A notified Level of Assurance. Ordered `Low < Substantial < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NotifiedLoa {
    Low,
    Substantial,
    High,
}

impl NotifiedLoa {
    pub const ALL: [NotifiedLoa; 3] = [Self::Low, Self::Substantial, Self::High];

    pub fn uri(&self) -> &'static str {
        match self {
            Self::Low => "http://eidas.europa.eu/LoA/low",
            Self::Substantial => "http://eidas.europa.eu/LoA/substantial",
            Self::High => "http://eidas.europa.eu/LoA/high",
        }
    }

    pub fn from_uri(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|loa| loa.uri() == value)
    }

    /// Position on the notified scale, starting at 1 for `Low`.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Substantial => 2,
            Self::High => 3,
        }
    }
}

impl fmt::Display for NotifiedLoa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

/// A single LoA value from a request, a response or configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LevelOfAssurance {
    Notified(NotifiedLoa),
    NonNotified(String),
}

impl LevelOfAssurance {
    /// Classify a LoA URI. Blank values have no LoA.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(match NotifiedLoa::from_uri(value) {
            Some(notified) => Self::Notified(notified),
            None => Self::NonNotified(value.to_owned()),
        })
    }

    pub fn is_notified(&self) -> bool {
        matches!(self, Self::Notified(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Notified(loa) => loa.uri(),
            Self::NonNotified(uri) => uri,
        }
    }
}

impl fmt::Display for LevelOfAssurance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn notified(values: &[String]) -> impl Iterator<Item = NotifiedLoa> + '_ {
    values.iter().filter_map(|v| NotifiedLoa::from_uri(v))
}

fn non_notified(values: &[String]) -> impl Iterator<Item = &str> + '_ {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && NotifiedLoa::from_uri(v).is_none())
}

/// Whether a node configured with `allowed` LoAs can serve `request`.
///
/// A notified requested LoA is servable when it does not exceed the highest
/// notified LoA in `allowed`; a non-notified one when `allowed` contains it.
/// One servable requested LoA is enough.
pub fn is_request_loa_valid(request: Option<&AuthnRequest>, allowed: Option<&[String]>) -> bool {
    let (Some(request), Some(allowed)) = (request, allowed) else {
        return false;
    };
    let max_allowed = highest_notified(allowed);

    let valid = request
        .loas()
        .iter()
        .filter_map(|v| LevelOfAssurance::parse(v))
        .any(|loa| match loa {
            LevelOfAssurance::Notified(requested) => {
                max_allowed.map_or(false, |max| requested <= max)
            }
            LevelOfAssurance::NonNotified(uri) => non_notified(allowed).any(|a| a == uri),
        });
    tracing::debug!(requested = ?request.loas(), ?allowed, valid, "request LoA check");
    valid
}

/// Compare two notified LoAs under `mode`.
///
/// `Minimum` accepts an asserted level at or above the requested one;
/// `Exact` only the same level. No mode, or a value that is not a notified
/// LoA, is never valid.
pub fn is_loa_valid(mode: Option<ComparisonMode>, requested: &str, asserted: &str) -> bool {
    let (Some(mode), Some(requested), Some(asserted)) = (
        mode,
        NotifiedLoa::from_uri(requested),
        NotifiedLoa::from_uri(asserted),
    ) else {
        return false;
    };
    match mode {
        ComparisonMode::Minimum => asserted >= requested,
        ComparisonMode::Exact => asserted == requested,
    }
}

/// Whether the asserted non-notified LoA is one of the requested ones.
/// Only `Exact` comparison is defined for non-notified LoAs.
pub fn is_non_notified_loa_valid(
    mode: Option<ComparisonMode>,
    requested: &[String],
    asserted: &str,
) -> bool {
    let asserted = asserted.trim();
    if mode != Some(ComparisonMode::Exact) || asserted.is_empty() {
        return false;
    }
    requested.iter().any(|r| r.trim() == asserted)
}

/// Whether `candidate` is at least as strong as `reference`.
///
/// Holds when every notified LoA of `reference` is met or exceeded by a
/// notified LoA of `candidate`, or when the two lists share a non-notified
/// LoA. Non-notified LoAs have no order, so only a shared value counts.
pub fn is_equal_or_better_loas(candidate: &[String], reference: &[String]) -> bool {
    let mut reference_notified = notified(reference).peekable();
    let notified_covered = reference_notified.peek().is_some()
        && reference_notified.all(|r| notified(candidate).any(|c| c >= r));

    notified_covered || non_notified(candidate).any(|c| non_notified(reference).any(|r| r == c))
}

/// Whether the two lists share any LoA, compared as strings.
pub fn has_common_loa(first: &[String], second: &[String]) -> bool {
    first.iter().any(|a| second.iter().any(|b| a.trim() == b.trim()))
}

/// The highest notified LoA in `values`, if any.
pub fn highest_notified(values: &[String]) -> Option<NotifiedLoa> {
    notified(values).max()
}

/// Whether the first entry of `values` is the highest notified LoA listed.
pub fn is_first_loa_highest_notified(values: &[String]) -> bool {
    match (values.first(), highest_notified(values)) {
        (Some(first), Some(highest)) => first.trim() == highest.uri(),
        _ => false,
    }
}

fn has_invalid_eidas_prefix(value: &str) -> bool {
    let value = value.trim();
    value
        .get(..EIDAS_LOA_PREFIX.len())
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case(EIDAS_LOA_PREFIX))
        && NotifiedLoa::from_uri(value).is_none()
}

fn loa_error(message: impl Into<std::borrow::Cow<'static, str>>) -> ValidationError {
    let err = ValidationError::new("LevelOfAssurance", message);
    tracing::warn!(error = %err, "rejected requested LoA");
    err
}

fn invalid_list(values: &[String]) -> ValidationError {
    loa_error(format!("Invalid level of assurance: \"[{}]\"", values.join(", ")))
}

/// Check the shape of the LoA list of an AuthnRequest.
///
/// - Values under the eIDAS prefix must be one of the notified levels.
/// - A single notified LoA must be compared with `minimum`.
/// - Non-notified LoAs alone must be compared with `exact`.
/// - A mixed list must be compared with `exact` and carry at most three
///   notified levels, filled from `high` downwards.
pub fn validate_requested_loas(request: &AuthnRequest) -> Result<(), ValidationError> {
    let values = request.loas();

    if let Some(value) = values.iter().find(|v| has_invalid_eidas_prefix(v)) {
        return Err(loa_error(format!("Invalid level of assurance: \"{value}\"")));
    }
    if values.iter().any(|v| v.trim().is_empty()) {
        return Err(invalid_list(values));
    }

    let levels: Vec<NotifiedLoa> = notified(values).collect();
    let non_notified_count = values.len() - levels.len();
    let mode = request.comparison_mode();
    let comparison = request
        .requested_authn_context
        .as_ref()
        .map_or("exact", |c| c.comparison_str());
    let require = |expected: ComparisonMode| {
        if mode == Some(expected) {
            Ok(())
        } else {
            Err(loa_error(format!(
                "Invalid level of assurance comparison: \"{comparison}\""
            )))
        }
    };

    match (levels.len(), non_notified_count) {
        (0, 0) => Err(loa_error("Loa list can not be empty")),
        (1, 0) => require(ComparisonMode::Minimum),
        (0, _) => require(ComparisonMode::Exact),
        (count, 0) => Err(match mode {
            Some(ComparisonMode::Minimum) if count > 1 => {
                loa_error("Too many notified levels of assurance for comparison type")
            }
            Some(ComparisonMode::Exact) if count > 1 => loa_error(
                "Comparison exact can only be used if non notified levels of assurance are present",
            ),
            _ => invalid_list(values),
        }),
        (count, _) => {
            let required = &NotifiedLoa::ALL[3 - count.min(3)..];
            if count > 3 || !required.iter().all(|r| levels.contains(r)) {
                return Err(invalid_list(values));
            }
            require(ComparisonMode::Exact)
        }
    }
}
