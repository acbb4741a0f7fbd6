//! Ranked pairwise suggestions over a lab snapshot.

use crate::ledger::CollaborationLedger;
use crate::model::{
    CollaborationScope, CollaborationSuggestion, Lab, PairKey, Researcher, SuggestionStatus,
};
use crate::score::{FocusRelation, ScoreBreakdown, score_pair};

/// Pairs scoring below this are not worth surfacing.
pub const SUGGESTION_THRESHOLD: u32 = 60;

/// Compute suggestions for every qualifying unordered lab pair.
///
/// Results are sorted by descending score; ties break toward the
/// lexicographically smaller `(lab_a, lab_b)` id pair so the output is fully
/// deterministic. Already-accepted pairs keep their `Accepted` status
/// regardless of the score computed from the current snapshot.
pub fn suggestions(
    labs: &[Lab],
    researchers: &[Researcher],
    scope: CollaborationScope,
    ledger: &CollaborationLedger,
) -> Vec<CollaborationSuggestion> {
    let mut out = Vec::new();

    for (i, first) in labs.iter().enumerate() {
        for second in &labs[i + 1..] {
            if first.id == second.id {
                continue;
            }
            if scope == CollaborationScope::WithinOrganization
                && first.organization_id != second.organization_id
            {
                continue;
            }

            let breakdown = score_pair(first, second, researchers);
            if breakdown.total < SUGGESTION_THRESHOLD {
                continue;
            }

            let key = PairKey::new(first.id.clone(), second.id.clone());
            // Canonical ordering: the lab with the smaller id reports as A.
            let (a, b) = if first.id <= second.id {
                (first, second)
            } else {
                (second, first)
            };

            let status = if ledger.is_accepted(&key) {
                SuggestionStatus::Accepted
            } else {
                SuggestionStatus::Suggested
            };

            out.push(CollaborationSuggestion {
                lab_a_id: a.id.clone(),
                lab_a_name: a.name.clone(),
                lab_b_id: b.id.clone(),
                lab_b_name: b.name.clone(),
                score: breakdown.total,
                status,
                reason: rationale(a, b, &breakdown),
            });
        }
    }

    out.sort_by(|x, y| {
        y.score
            .cmp(&x.score)
            .then_with(|| x.lab_a_id.cmp(&y.lab_a_id))
            .then_with(|| x.lab_b_id.cmp(&y.lab_b_id))
    });

    out
}

fn rationale(a: &Lab, b: &Lab, breakdown: &ScoreBreakdown) -> String {
    let mut parts = Vec::new();

    match breakdown.focus_relation {
        FocusRelation::Identical => {
            parts.push(format!("identical research focus ({})", a.focus_area))
        }
        FocusRelation::SharedKeyword => parts.push(format!(
            "related research focus ({} / {})",
            a.focus_area, b.focus_area
        )),
        FocusRelation::Unrelated => {}
    }

    if breakdown.intersecting_researcher_pairs > 0 {
        parts.push(format!(
            "{} researcher pair(s) with shared expertise",
            breakdown.intersecting_researcher_pairs
        ));
    }

    if parts.is_empty() {
        "baseline compatibility".to_string()
    } else {
        parts.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn lab(id: &str, org: &str, focus: &str) -> Lab {
        Lab {
            id: id.to_string(),
            organization_id: org.to_string(),
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
            expertise: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn only_pairs_at_or_above_threshold_are_suggested() {
        let labs = vec![
            lab("a", "org-1", "genomics"),
            lab("b", "org-1", "genomics"),
            lab("c", "org-1", "medieval history"),
        ];
        let got = suggestions(
            &labs,
            &[],
            CollaborationScope::WithinOrganization,
            &CollaborationLedger::new(),
        );
        // Only (a, b) reaches 70; the other two pairs sit at the base 30.
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].lab_a_id, "a");
        assert_eq!(got[0].lab_b_id, "b");
        assert_eq!(got[0].score, 70);
        assert_eq!(got[0].status, SuggestionStatus::Suggested);
    }

    #[test]
    fn sorted_by_score_then_id_pair() {
        let labs = vec![
            lab("d", "org-1", "genomics"),
            lab("c", "org-1", "genomics"),
            lab("a", "org-1", "proteomics"),
            lab("b", "org-1", "proteomics"),
        ];
        let researchers = vec![
            researcher("r1", "c", &["sequencing"]),
            researcher("r2", "d", &["sequencing"]),
        ];
        let got = suggestions(
            &labs,
            &researchers,
            CollaborationScope::WithinOrganization,
            &CollaborationLedger::new(),
        );
        // (c, d) scores 85, (a, b) scores 70.
        assert_eq!(got.len(), 2);
        assert_eq!((got[0].lab_a_id.as_str(), got[0].lab_b_id.as_str()), ("c", "d"));
        assert_eq!(got[0].score, 85);
        assert_eq!((got[1].lab_a_id.as_str(), got[1].lab_b_id.as_str()), ("a", "b"));
    }

    #[test]
    fn equal_scores_tie_break_lexicographically() {
        let labs = vec![
            lab("b", "org-1", "optics"),
            lab("a", "org-1", "optics"),
            lab("c", "org-1", "optics"),
        ];
        let got = suggestions(
            &labs,
            &[],
            CollaborationScope::WithinOrganization,
            &CollaborationLedger::new(),
        );
        let pairs: Vec<(&str, &str)> = got
            .iter()
            .map(|s| (s.lab_a_id.as_str(), s.lab_b_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "b"), ("a", "c"), ("b", "c")]);
    }

    #[test]
    fn within_organization_scope_never_crosses_tenants() {
        let labs = vec![
            lab("a", "org-1", "genomics"),
            lab("b", "org-2", "genomics"),
        ];
        let got = suggestions(
            &labs,
            &[],
            CollaborationScope::WithinOrganization,
            &CollaborationLedger::new(),
        );
        assert!(got.is_empty());

        let got = suggestions(
            &labs,
            &[],
            CollaborationScope::AcrossOrganizations,
            &CollaborationLedger::new(),
        );
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn accepted_pairs_keep_accepted_status() {
        let labs = vec![
            lab("a", "org-1", "genomics"),
            lab("b", "org-1", "genomics"),
        ];
        let ledger = CollaborationLedger::new();
        ledger.accept("b", "a");

        let got = suggestions(&labs, &[], CollaborationScope::WithinOrganization, &ledger);
        assert_eq!(got[0].status, SuggestionStatus::Accepted);
    }
}
