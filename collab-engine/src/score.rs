//! Pairwise compatibility scoring.

use crate::model::{Lab, Researcher};
use serde::Serialize;
use std::collections::BTreeSet;

pub const BASE_SCORE: u32 = 30;
pub const IDENTICAL_FOCUS_BONUS: u32 = 40;
pub const RELATED_FOCUS_BONUS: u32 = 20;
pub const RESEARCHER_PAIR_BONUS: u32 = 15;
pub const MAX_SCORE: u32 = 100;

/// How the two labs' focus areas relate. The tiers are mutually exclusive:
/// only the higher-qualifying one contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusRelation {
    Identical,
    SharedKeyword,
    Unrelated,
}

impl FocusRelation {
    fn bonus(self) -> u32 {
        match self {
            FocusRelation::Identical => IDENTICAL_FOCUS_BONUS,
            FocusRelation::SharedKeyword => RELATED_FOCUS_BONUS,
            FocusRelation::Unrelated => 0,
        }
    }
}

/// The components of a pair's score, kept separate so the email template can
/// explain the rationale.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub focus_relation: FocusRelation,
    pub domain_bonus: u32,
    /// Number of (researcher on A, researcher on B) pairs with intersecting
    /// expertise tags. Each contributes RESEARCHER_PAIR_BONUS.
    pub intersecting_researcher_pairs: u32,
    pub expertise_bonus: u32,
    /// min(100, base + domain + expertise). The clamp is authoritative; there
    /// is deliberately no sub-cap on the expertise bonus.
    pub total: u32,
}

/// Score a lab pair from the current snapshot. Deterministic and symmetric:
/// `score_pair(a, b, ..)` and `score_pair(b, a, ..)` produce the same total.
pub fn score_pair(a: &Lab, b: &Lab, researchers: &[Researcher]) -> ScoreBreakdown {
    let focus_relation = relate_focus(&a.focus_area, &b.focus_area);
    let domain_bonus = focus_relation.bonus();

    let a_expertise = expertise_of(researchers, &a.id);
    let b_expertise = expertise_of(researchers, &b.id);

    let mut intersecting_researcher_pairs = 0u32;
    for left in &a_expertise {
        for right in &b_expertise {
            if !left.is_disjoint(right) {
                intersecting_researcher_pairs += 1;
            }
        }
    }

    let expertise_bonus = intersecting_researcher_pairs * RESEARCHER_PAIR_BONUS;
    let total = (BASE_SCORE + domain_bonus + expertise_bonus).min(MAX_SCORE);

    ScoreBreakdown {
        focus_relation,
        domain_bonus,
        intersecting_researcher_pairs,
        expertise_bonus,
        total,
    }
}

fn relate_focus(a: &str, b: &str) -> FocusRelation {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return FocusRelation::Unrelated;
    }

    if a == b {
        return FocusRelation::Identical;
    }

    let a_tokens: BTreeSet<&str> = a.split_whitespace().collect();
    let b_tokens: BTreeSet<&str> = b.split_whitespace().collect();

    if a_tokens.intersection(&b_tokens).next().is_some() {
        FocusRelation::SharedKeyword
    } else {
        FocusRelation::Unrelated
    }
}

/// Normalized expertise sets for every researcher in the given lab.
fn expertise_of(researchers: &[Researcher], lab_id: &str) -> Vec<BTreeSet<String>> {
    researchers
        .iter()
        .filter(|r| r.lab_id == lab_id)
        .map(|r| {
            r.expertise
                .iter()
                .map(|tag| tag.trim().to_lowercase())
                .filter(|tag| !tag.is_empty())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lab(id: &str, focus: &str) -> Lab {
        Lab {
            id: id.to_string(),
            organization_id: "org-1".to_string(),
            name: format!("Lab {}", id),
            focus_area: focus.to_string(),
            description: String::new(),
        }
    }

    fn researcher(id: &str, lab_id: &str, tags: &[&str]) -> Researcher {
        Researcher {
            id: id.to_string(),
            lab_id: lab_id.to_string(),
            name: format!("Researcher {}", id),
            expertise: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn identical_focus_no_overlap_scores_seventy() {
        let a = lab("a", "Quantum Computing");
        let b = lab("b", "quantum computing");
        let breakdown = score_pair(&a, &b, &[]);
        assert_eq!(breakdown.focus_relation, FocusRelation::Identical);
        assert_eq!(breakdown.total, 70);
    }

    #[test]
    fn unrelated_focus_no_overlap_scores_base_only() {
        let a = lab("a", "marine biology");
        let b = lab("b", "compiler design");
        let breakdown = score_pair(&a, &b, &[]);
        assert_eq!(breakdown.focus_relation, FocusRelation::Unrelated);
        assert_eq!(breakdown.total, 30);
    }

    #[test]
    fn shared_keyword_earns_twenty_not_forty() {
        let a = lab("a", "applied machine learning");
        let b = lab("b", "machine vision");
        let breakdown = score_pair(&a, &b, &[]);
        assert_eq!(breakdown.focus_relation, FocusRelation::SharedKeyword);
        assert_eq!(breakdown.domain_bonus, 20);
        assert_eq!(breakdown.total, 50);
    }

    #[test]
    fn domain_tiers_are_mutually_exclusive() {
        // Identical focus also shares every token; only the higher tier counts.
        let a = lab("a", "systems security");
        let b = lab("b", "systems security");
        let breakdown = score_pair(&a, &b, &[]);
        assert_eq!(breakdown.domain_bonus, IDENTICAL_FOCUS_BONUS);
        assert_eq!(breakdown.total, 70);
    }

    #[test]
    fn fifteen_per_intersecting_researcher_pair() {
        let a = lab("a", "marine biology");
        let b = lab("b", "compiler design");
        let researchers = vec![
            researcher("r1", "a", &["statistics", "genomics"]),
            researcher("r2", "a", &["optics"]),
            researcher("r3", "b", &["Statistics"]),
            researcher("r4", "b", &["optics", "lasers"]),
        ];
        // r1-r3 intersect on statistics, r2-r4 on optics: two pairs.
        let breakdown = score_pair(&a, &b, &researchers);
        assert_eq!(breakdown.intersecting_researcher_pairs, 2);
        assert_eq!(breakdown.expertise_bonus, 30);
        assert_eq!(breakdown.total, 60);
    }

    #[test]
    fn expertise_bonus_is_uncapped_but_total_clamps_at_hundred() {
        // Boundary case: the additive bonus has no documented sub-cap, so two
        // large labs blow straight past the clamp. The clamp wins.
        let a = lab("a", "marine biology");
        let b = lab("b", "compiler design");
        let mut researchers = Vec::new();
        for i in 0..4 {
            researchers.push(researcher(&format!("a{}", i), "a", &["shared"]));
            researchers.push(researcher(&format!("b{}", i), "b", &["shared"]));
        }
        // 4 x 4 = 16 intersecting pairs -> 240 bonus before the clamp.
        let breakdown = score_pair(&a, &b, &researchers);
        assert_eq!(breakdown.intersecting_researcher_pairs, 16);
        assert_eq!(breakdown.expertise_bonus, 240);
        assert_eq!(breakdown.total, MAX_SCORE);
    }

    #[test]
    fn scoring_is_symmetric() {
        let a = lab("a", "applied machine learning");
        let b = lab("b", "machine vision");
        let researchers = vec![
            researcher("r1", "a", &["robotics"]),
            researcher("r2", "b", &["robotics"]),
        ];
        assert_eq!(
            score_pair(&a, &b, &researchers).total,
            score_pair(&b, &a, &researchers).total
        );
    }

    #[test]
    fn empty_focus_is_unrelated() {
        let a = lab("a", "");
        let b = lab("b", "");
        assert_eq!(score_pair(&a, &b, &[]).focus_relation, FocusRelation::Unrelated);
    }
}
