//! Collaboration outreach email templating.

use crate::model::Lab;
use crate::score::ScoreBreakdown;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CollaborationEmail {
    pub subject: String,
    pub body: String,
}

/// Render an outreach email for a scored lab pair. Pure templating over the
/// two lab records and the score rationale; no side effects.
pub fn collaboration_email(a: &Lab, b: &Lab, breakdown: &ScoreBreakdown) -> CollaborationEmail {
    let subject = format!("Collaboration opportunity: {} and {}", a.name, b.name);

    let mut rationale = vec![format!("compatibility score {} / 100", breakdown.total)];
    if breakdown.domain_bonus > 0 {
        rationale.push(format!(
            "research focus alignment ({} / {})",
            a.focus_area, b.focus_area
        ));
    }
    if breakdown.intersecting_researcher_pairs > 0 {
        rationale.push(format!(
            "{} researcher pair(s) with overlapping expertise",
            breakdown.intersecting_researcher_pairs
        ));
    }

    let body = format!(
        "Hello,\n\n\
         We identified a strong collaboration opportunity between {} and {}.\n\n\
         Why these labs match:\n{}\n\n\
         This collaboration could lead to:\n\
         - Shared research resources\n\
         - Joint publications\n\
         - Cross-training of researchers\n\
         - Combined grant opportunities\n\n\
         Please let us know if you are interested.\n\n\
         Regards,\n\
         Research Collaboration System\n",
        a.name,
        b.name,
        rationale
            .iter()
            .map(|line| format!("- {}", line))
            .collect::<Vec<_>>()
            .join("\n"),
    );

    CollaborationEmail { subject, body }
}
