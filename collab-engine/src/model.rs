use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A research lab as supplied by the Labs service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lab {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    /// Free-text domain tag, e.g. "machine learning".
    pub focus_area: String,
    #[serde(default)]
    pub description: String,
}

/// A researcher attached to a lab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Researcher {
    pub id: String,
    pub lab_id: String,
    pub name: String,
    /// Expertise tags; compared case-insensitively.
    #[serde(default)]
    pub expertise: BTreeSet<String>,
}

/// Whether suggestions may pair labs across organization boundaries.
///
/// The boundary is part of the public contract: within-organization scope
/// never pairs labs belonging to different tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationScope {
    WithinOrganization,
    AcrossOrganizations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Suggested,
    Accepted,
}

/// Canonical unordered pair of lab ids. The smaller id always sits first so
/// `(a, b)` and `(b, a)` name the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub lab_a: String,
    pub lab_b: String,
}

impl PairKey {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        let (first, second) = (first.into(), second.into());
        if first <= second {
            Self {
                lab_a: first,
                lab_b: second,
            }
        } else {
            Self {
                lab_a: second,
                lab_b: first,
            }
        }
    }
}

/// A ranked pairwise suggestion. Derived data: recomputed from the current
/// lab/researcher snapshot on every request, never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationSuggestion {
    pub lab_a_id: String,
    pub lab_a_name: String,
    pub lab_b_id: String,
    pub lab_b_name: String,
    pub score: u32,
    pub status: SuggestionStatus,
    pub reason: String,
}
