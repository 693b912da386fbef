//! Adaptive communication layer
//!
//! Rewrites a diagnosis for the user's expertise tier: technical terms
//! take tier-appropriate surface forms, beginners get icon prefixes
//! and a simple-explanation marker, and every response carries a pair
//! of educational tips. The findings themselves never change.

pub mod glossary;
pub mod tips;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

use crate::diagnosis::DiagnosisResult;

/// Highest diagnosis count that still counts as beginner
const BEGINNER_MAX: u32 = 2;
/// Highest diagnosis count that still counts as intermediate
const INTERMEDIATE_MAX: u32 = 10;

/// Marker prepended to beginner summaries
const SIMPLE_EXPLANATION_PREFIX: &str = "💡 Explicación simple: ";

/// Keyword groups and the icon each earns on a beginner
/// recommendation; first matching group wins.
const CATEGORY_ICONS: [(&[&str], &str); 4] = [
    (&["regar", "agua"], "💧"),
    (&["luz", "sol"], "☀️"),
    (&["fertiliz", "abono"], "🌱"),
    (&["poda", "cortar"], "✂️"),
];

/// User expertise tier, derived from the lifetime diagnosis count
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExpertiseTier {
    Beginner,
    Intermediate,
    Expert,
}

impl ExpertiseTier {
    /// Derive the tier from a lifetime diagnosis count.
    ///
    /// A pure step function: 0-2 beginner, 3-10 intermediate, 11 and
    /// up expert.
    pub fn from_diagnosis_count(count: u32) -> Self {
        if count <= BEGINNER_MAX {
            ExpertiseTier::Beginner
        } else if count <= INTERMEDIATE_MAX {
            ExpertiseTier::Intermediate
        } else {
            ExpertiseTier::Expert
        }
    }

    /// Visual badge shown next to the user's name
    pub fn badge(&self) -> &'static str {
        match self {
            ExpertiseTier::Beginner => "🌱 Principiante",
            ExpertiseTier::Intermediate => "🌿 Intermedio",
            ExpertiseTier::Expert => "🌳 Experto",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExpertiseTier::Beginner => "beginner",
            ExpertiseTier::Intermediate => "intermediate",
            ExpertiseTier::Expert => "expert",
        }
    }

    /// Tier reached next on the ladder, if any
    pub fn next(&self) -> Option<ExpertiseTier> {
        match self {
            ExpertiseTier::Beginner => Some(ExpertiseTier::Intermediate),
            ExpertiseTier::Intermediate => Some(ExpertiseTier::Expert),
            ExpertiseTier::Expert => None,
        }
    }
}

impl fmt::Display for ExpertiseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Where a user sits on the expertise ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationProfile {
    pub tier: ExpertiseTier,
    pub badge: String,
    pub diagnosis_count: u32,
    pub next_tier: Option<ExpertiseTier>,
    /// Diagnoses still needed to reach `next_tier`
    pub diagnoses_to_next: Option<u32>,
}

impl CommunicationProfile {
    /// Build the profile for a lifetime diagnosis count
    pub fn for_diagnosis_count(count: u32) -> Self {
        let tier = ExpertiseTier::from_diagnosis_count(count);
        let diagnoses_to_next = match tier {
            ExpertiseTier::Beginner => Some(BEGINNER_MAX + 1 - count),
            ExpertiseTier::Intermediate => Some(INTERMEDIATE_MAX + 1 - count),
            ExpertiseTier::Expert => None,
        };

        CommunicationProfile {
            tier,
            badge: tier.badge().to_string(),
            diagnosis_count: count,
            next_tier: tier.next(),
            diagnoses_to_next,
        }
    }
}

/// Tier-adjusted presentation of a diagnosis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptedDiagnosis {
    /// The diagnosis with rewritten summary and recommendations
    pub diagnosis: DiagnosisResult,
    pub tier: ExpertiseTier,
    pub badge: String,
    pub educational_tips: Vec<String>,
}

/// Rewrites diagnoses for an expertise tier
pub struct CommunicationAdapter {
    rng: Mutex<StdRng>,
}

impl CommunicationAdapter {
    /// Create an adapter with an entropy-seeded tip generator
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create an adapter with a fixed tip seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Adapt a diagnosis to the given tier.
    ///
    /// Only the wording of `summary` and `recommendations` changes;
    /// confidence, health score, severity and the primary issue pass
    /// through untouched. Applying the adapter to already-adapted text
    /// adds nothing twice.
    pub fn adapt(&self, diagnosis: &DiagnosisResult, tier: ExpertiseTier) -> AdaptedDiagnosis {
        let mut adapted = diagnosis.clone();

        adapted.summary = glossary::rewrite_terms(&adapted.summary, tier);
        adapted.recommendations = adapted
            .recommendations
            .iter()
            .map(|rec| glossary::rewrite_terms(rec, tier))
            .collect();

        if tier == ExpertiseTier::Beginner {
            adapted.summary = prefix_simple_explanation(&adapted.summary);
            adapted.recommendations = adapted
                .recommendations
                .iter()
                .map(|rec| prefix_category_icon(rec))
                .collect();
        }

        let educational_tips = {
            let mut rng = self.rng.lock().unwrap();
            tips::select(&mut rng, tier)
        };

        tracing::debug!(tier = %tier, "diagnosis adapted");

        AdaptedDiagnosis {
            diagnosis: adapted,
            tier,
            badge: tier.badge().to_string(),
            educational_tips,
        }
    }
}

impl Default for CommunicationAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn prefix_simple_explanation(summary: &str) -> String {
    if summary.starts_with(SIMPLE_EXPLANATION_PREFIX) {
        summary.to_string()
    } else {
        format!("{}{}", SIMPLE_EXPLANATION_PREFIX, summary)
    }
}

fn prefix_category_icon(recommendation: &str) -> String {
    let lower = recommendation.to_lowercase();

    for (keywords, icon) in &CATEGORY_ICONS {
        if keywords.iter().any(|keyword| lower.contains(keyword)) {
            if recommendation.starts_with(icon) {
                return recommendation.to_string();
            }
            return format!("{} {}", icon, recommendation);
        }
    }

    recommendation.to_string()
}
