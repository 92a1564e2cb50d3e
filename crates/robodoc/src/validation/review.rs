//! Final review gate applied by the supervisor stage

use crate::types::{SupervisorVerdict, VerdictStatus};

/// Confidence reported on an approved verdict
pub const BASELINE_CONFIDENCE: f64 = 0.99;

/// Decide whether a classification can be approved without a human
///
/// Confidence strictly below `threshold` (or not a number) is flagged.
pub fn review_gate(classification_confidence: f64, threshold: f64) -> SupervisorVerdict {
    if classification_confidence >= threshold {
        return SupervisorVerdict {
            status: VerdictStatus::Approved,
            warnings: Vec::new(),
            confidence: BASELINE_CONFIDENCE,
            reasoning: "All data points are consistent; classification confidence meets the review threshold."
                .to_string(),
        };
    }

    SupervisorVerdict {
        status: VerdictStatus::NeedsReview,
        warnings: vec![format!(
            "Tariff classification confidence ({:.2}) is below the {:.0}% threshold; human review recommended",
            classification_confidence,
            threshold * 100.0
        )],
        confidence: classification_confidence,
        reasoning: "Low confidence in the proposed tariff classification.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_confidence_is_approved() {
        let verdict = review_gate(0.98, 0.95);
        assert!(verdict.is_approved());
        assert!(verdict.warnings.is_empty());
        assert_eq!(verdict.confidence, BASELINE_CONFIDENCE);

        assert!(review_gate(0.95, 0.95).is_approved());
    }

    #[test]
    fn test_low_confidence_needs_review() {
        let verdict = review_gate(0.8, 0.95);
        assert_eq!(verdict.status, VerdictStatus::NeedsReview);
        assert_eq!(verdict.confidence, 0.8);
        assert!(verdict.warnings[0].contains("0.80"));
    }

    #[test]
    fn test_nan_needs_review() {
        assert_eq!(review_gate(f64::NAN, 0.95).status, VerdictStatus::NeedsReview);
    }
}
