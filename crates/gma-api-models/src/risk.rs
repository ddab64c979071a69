//! Risk buckets derived from classifier scores.
//!
//! # Design
//! - One threshold function for every consumer (results view, history, totals).
//! - Upper bounds are inclusive: a score of exactly 70 is high risk, 40 is uncertain.

use serde::{Deserialize, Serialize};

/// Scores at or above this value are high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 70.0;
/// Scores at or above this value (and below [`HIGH_RISK_THRESHOLD`]) are uncertain.
pub const UNCERTAIN_THRESHOLD: f64 = 40.0;

/// Coarse risk classification for a single video outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum RiskBucket {
    /// Final score below 40.
    LowRisk,
    /// Final score in `[40, 70)`.
    Uncertain,
    /// Final score of 70 or more.
    HighRisk,
}

impl RiskBucket {
    /// Map a final score onto its bucket.
    ///
    /// Non-finite scores are treated as low risk.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() {
            Self::LowRisk
        } else if score >= HIGH_RISK_THRESHOLD {
            Self::HighRisk
        } else if score >= UNCERTAIN_THRESHOLD {
            Self::Uncertain
        } else {
            Self::LowRisk
        }
    }

    /// Wire label (`high-risk`, `uncertain`, `low-risk`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LowRisk => "low-risk",
            Self::Uncertain => "uncertain",
            Self::HighRisk => "high-risk",
        }
    }

    /// Human-readable label for tables and notices.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LowRisk => "Low Risk",
            Self::Uncertain => "Uncertain",
            Self::HighRisk => "High Risk",
        }
    }
}

/// Bucket counts for a collection of outcomes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskSummary {
    /// Number of outcomes counted.
    pub videos_processed: usize,
    /// Outcomes bucketed high risk.
    pub high_risk: usize,
    /// Outcomes bucketed uncertain.
    pub uncertain: usize,
    /// Outcomes bucketed low risk.
    pub low_risk: usize,
}

impl RiskSummary {
    /// Count one outcome in the given bucket.
    pub const fn record(&mut self, bucket: RiskBucket) {
        self.videos_processed += 1;
        match bucket {
            RiskBucket::HighRisk => self.high_risk += 1,
            RiskBucket::Uncertain => self.uncertain += 1,
            RiskBucket::LowRisk => self.low_risk += 1,
        }
    }

    /// Fold another summary into this one.
    pub const fn merge(&mut self, other: &Self) {
        self.videos_processed += other.videos_processed;
        self.high_risk += other.high_risk;
        self.uncertain += other.uncertain;
        self.low_risk += other.low_risk;
    }

    /// Summarise a sequence of final scores.
    #[must_use]
    pub fn from_scores(scores: impl IntoIterator<Item = f64>) -> Self {
        let mut summary = Self::default();
        for score in scores {
            summary.record(RiskBucket::from_score(score));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive_on_the_upper_bucket() {
        assert_eq!(RiskBucket::from_score(70.0), RiskBucket::HighRisk);
        assert_eq!(RiskBucket::from_score(69.999), RiskBucket::Uncertain);
        assert_eq!(RiskBucket::from_score(40.0), RiskBucket::Uncertain);
        assert_eq!(RiskBucket::from_score(39.999), RiskBucket::LowRisk);
        assert_eq!(RiskBucket::from_score(100.0), RiskBucket::HighRisk);
        assert_eq!(RiskBucket::from_score(0.0), RiskBucket::LowRisk);
    }

    #[test]
    fn non_finite_scores_are_low_risk() {
        assert_eq!(RiskBucket::from_score(f64::NAN), RiskBucket::LowRisk);
        assert_eq!(RiskBucket::from_score(f64::NEG_INFINITY), RiskBucket::LowRisk);
        assert_eq!(RiskBucket::from_score(f64::INFINITY), RiskBucket::LowRisk);
    }

    #[test]
    fn bucket_serialises_as_kebab_case() {
        let encoded = serde_json::to_string(&RiskBucket::HighRisk).expect("encode");
        assert_eq!(encoded, "\"high-risk\"");
        let decoded: RiskBucket = serde_json::from_str("\"low-risk\"").expect("decode");
        assert_eq!(decoded, RiskBucket::LowRisk);
        assert_eq!(RiskBucket::Uncertain.as_str(), "uncertain");
    }

    #[test]
    fn summary_counts_and_merges() {
        let mut first = RiskSummary::from_scores([85.0, 55.0, 12.0, 70.0]);
        assert_eq!(first.videos_processed, 4);
        assert_eq!(first.high_risk, 2);
        assert_eq!(first.uncertain, 1);
        assert_eq!(first.low_risk, 1);

        let second = RiskSummary::from_scores([40.0]);
        first.merge(&second);
        assert_eq!(first.videos_processed, 5);
        assert_eq!(first.uncertain, 2);
    }
}
