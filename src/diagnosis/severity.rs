//! Severity classification from the numeric health score
//!
//! One canonical breakpoint table applied everywhere:
//! - 70..=100 → healthy
//! - 50..=69  → warning
//! - 30..=49  → medium
//! - 0..=29   → critical
//!
//! The mapping is total and monotonic: a higher score never classifies
//! as more severe than a lower one. `Unknown` is reserved for degraded
//! results where no score exists and is never produced by the table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores at or above this are healthy
pub const HEALTHY_MIN: u8 = 70;
/// Scores at or above this (below healthy) are a warning
pub const WARNING_MIN: u8 = 50;
/// Scores at or above this (below warning) are moderate; below is critical
pub const MODERATE_MIN: u8 = 30;

/// Ordered severity tiers; greater means more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Healthy,
    Warning,
    /// Serialized as "medium", the vocabulary the mobile clients expect
    #[serde(rename = "medium")]
    Moderate,
    High,
    Critical,
    /// Degraded results only; carries no position in the score table
    Unknown,
}

impl Severity {
    /// Classify a 0-100 health score. Total over u8; inputs above 100
    /// are clamped.
    pub fn from_health_score(score: u8) -> Severity {
        let score = score.min(100);

        if score >= HEALTHY_MIN {
            Severity::Healthy
        } else if score >= WARNING_MIN {
            Severity::Warning
        } else if score >= MODERATE_MIN {
            Severity::Moderate
        } else {
            Severity::Critical
        }
    }

    /// Wire label for this tier
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Healthy => "healthy",
            Severity::Warning => "warning",
            Severity::Moderate => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Unknown => "unknown",
        }
    }

    /// True for tiers that demand the front-loaded crisis care plan
    pub fn requires_crisis_plan(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_breakpoints() {
        assert_eq!(Severity::from_health_score(100), Severity::Healthy);
        assert_eq!(Severity::from_health_score(85), Severity::Healthy);
        assert_eq!(Severity::from_health_score(70), Severity::Healthy);
        assert_eq!(Severity::from_health_score(69), Severity::Warning);
        assert_eq!(Severity::from_health_score(50), Severity::Warning);
        assert_eq!(Severity::from_health_score(49), Severity::Moderate);
        assert_eq!(Severity::from_health_score(30), Severity::Moderate);
        assert_eq!(Severity::from_health_score(29), Severity::Critical);
        assert_eq!(Severity::from_health_score(20), Severity::Critical);
        assert_eq!(Severity::from_health_score(0), Severity::Critical);
    }

    #[test]
    fn test_over_100_clamps_to_healthy() {
        assert_eq!(Severity::from_health_score(255), Severity::Healthy);
    }

    #[test]
    fn test_ordering_tracks_severity() {
        assert!(Severity::Healthy < Severity::Warning);
        assert!(Severity::Warning < Severity::Moderate);
        assert!(Severity::Moderate < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Severity::Moderate.label(), "medium");
        assert_eq!(Severity::Unknown.label(), "unknown");
        assert_eq!(Severity::Critical.to_string(), "critical");
    }

    #[test]
    fn test_serde_labels_match() {
        let json = serde_json::to_string(&Severity::Moderate).unwrap();
        assert_eq!(json, "\"medium\"");
        let back: Severity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(back, Severity::Critical);
    }

    #[test]
    fn test_crisis_plan_tiers() {
        assert!(Severity::Critical.requires_crisis_plan());
        assert!(Severity::High.requires_crisis_plan());
        assert!(!Severity::Warning.requires_crisis_plan());
        assert!(!Severity::Unknown.requires_crisis_plan());
    }

    #[quickcheck]
    fn prop_classification_is_total_and_known(score: u8) -> bool {
        !matches!(Severity::from_health_score(score), Severity::Unknown)
    }

    #[quickcheck]
    fn prop_higher_score_never_more_severe(a: u8, b: u8) -> bool {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Severity::from_health_score(hi) <= Severity::from_health_score(lo)
    }

    #[quickcheck]
    fn prop_deterministic(score: u8) -> bool {
        Severity::from_health_score(score) == Severity::from_health_score(score)
    }
}
