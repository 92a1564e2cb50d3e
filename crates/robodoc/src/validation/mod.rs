//! Business-rule validation and the final review gate

mod review;
mod rules;

pub use review::{review_gate, BASELINE_CONFIDENCE};
pub use rules::{RuleValidator, VALID_INCOTERMS};
