//! collab-engine: deterministic collaboration scoring between research labs.
//!
//! The Labs service links this crate and runs it inside its own request path.
//! Scoring is a pure function over the current snapshot of labs and
//! researchers; nothing here touches the network or a database. The only
//! persisted state is the acceptance ledger, which records the one durable
//! transition a suggestion can make.

pub mod email;
pub mod ledger;
pub mod model;
pub mod score;
pub mod suggest;

pub use email::{CollaborationEmail, collaboration_email};
pub use ledger::CollaborationLedger;
pub use model::{
    CollaborationScope, CollaborationSuggestion, Lab, PairKey, Researcher, SuggestionStatus,
};
pub use score::{FocusRelation, ScoreBreakdown, score_pair};
pub use suggest::{SUGGESTION_THRESHOLD, suggestions};
