//! Typed intermediate payloads for model replies
//!
//! The single boundary where loose model JSON becomes typed data. Every
//! field is optional or defaulted so a partial reply still parses; the
//! mapping into pipeline results happens afterwards in total functions.
//! Numeric fields tolerate quoted numbers, which the models emit often.

use serde::{Deserialize, Deserializer};

use crate::errors::{PipelineError, Result};
use crate::extract::fences::strip_code_fences;

/// Structured reply to the photo-validation prompt.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualityPayload {
    #[serde(default)]
    pub is_centered: bool,
    #[serde(default)]
    pub plant_detected: bool,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub recommendations: FramingAdvice,
    #[serde(default)]
    pub voice_guidance: Option<String>,
}

/// Categorical framing advice; a missing field means that axis is fine.
#[derive(Debug, Clone, Deserialize)]
pub struct FramingAdvice {
    #[serde(default = "default_center")]
    pub direction: String,
    #[serde(default = "default_ok")]
    pub distance: String,
    #[serde(default = "default_ok")]
    pub lighting: String,
    #[serde(default = "default_ok")]
    pub focus: String,
}

impl Default for FramingAdvice {
    fn default() -> Self {
        FramingAdvice {
            direction: default_center(),
            distance: default_ok(),
            lighting: default_ok(),
            focus: default_ok(),
        }
    }
}

fn default_ok() -> String {
    "ok".to_string()
}

fn default_center() -> String {
    "center".to_string()
}

/// Structured reply to the diagnosis prompt. Only the fields the
/// pipeline consumes are declared; everything else is skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagnosisPayload {
    #[serde(default)]
    pub species: Option<SpeciesInfo>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub health_score: Option<f64>,
    #[serde(default)]
    pub issues: Vec<IssueReport>,
    #[serde(default)]
    pub immediate_actions: Vec<ActionItem>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Present only in follow-up replies
    #[serde(default)]
    pub comparison: Option<ComparisonPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeciesInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueReport {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionItem {
    /// 1 is most urgent; missing priorities sort last
    #[serde(default, deserialize_with = "lenient_f64")]
    pub priority: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
}

/// Comparison section of a follow-up reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComparisonPayload {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub improvement_percentage: Option<f64>,
    #[serde(default)]
    pub trend: Option<String>,
    #[serde(default)]
    pub new_issues: Vec<String>,
    #[serde(default)]
    pub resolved_issues: Vec<String>,
    #[serde(default)]
    pub persistent_issues: Vec<String>,
    #[serde(default)]
    pub progress_summary: Option<String>,
}

/// Structured reply to the quick-tips prompt.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CareTipsPayload {
    #[serde(default)]
    pub plant_name: Option<String>,
    #[serde(default)]
    pub quick_tips: Vec<String>,
    #[serde(default)]
    pub common_mistakes: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Parse a photo-validation reply, stripping fences first.
pub fn parse_quality(text: &str) -> Result<QualityPayload> {
    from_model_json(text)
}

/// Parse a diagnosis or follow-up reply, stripping fences first.
pub fn parse_diagnosis(text: &str) -> Result<DiagnosisPayload> {
    from_model_json(text)
}

/// Parse a quick-tips reply, stripping fences first.
pub fn parse_care_tips(text: &str) -> Result<CareTipsPayload> {
    from_model_json(text)
}

fn from_model_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(cleaned)
        .map_err(|e| PipelineError::MalformedReply(format!("Failed to parse model JSON: {}", e)))
}

/// Accept a JSON number or a quoted number; anything else becomes None.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Numberish {
        Num(f64),
        Text(String),
    }

    Ok(match Option::<Numberish>::deserialize(deserializer)? {
        Some(Numberish::Num(n)) => Some(n),
        Some(Numberish::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_quality_payload() {
        let text = r#"{
            "is_centered": true,
            "confidence": 0.85,
            "plant_detected": true,
            "issues": [],
            "recommendations": {
                "direction": "center",
                "distance": "ok",
                "lighting": "more_light",
                "focus": "ok"
            },
            "voice_guidance": "Busca un lugar con más luz"
        }"#;

        let payload = parse_quality(text).unwrap();
        assert!(payload.is_centered);
        assert!(payload.plant_detected);
        assert_eq!(payload.confidence, Some(0.85));
        assert_eq!(payload.recommendations.lighting, "more_light");
        assert_eq!(
            payload.voice_guidance.as_deref(),
            Some("Busca un lugar con más luz")
        );
    }

    #[test]
    fn test_empty_object_defaults() {
        let payload = parse_quality("{}").unwrap();
        assert!(!payload.is_centered);
        assert!(!payload.plant_detected);
        assert!(payload.confidence.is_none());
        assert!(payload.issues.is_empty());
        assert_eq!(payload.recommendations.lighting, "ok");
        assert_eq!(payload.recommendations.direction, "center");
    }

    #[test]
    fn test_fenced_diagnosis_payload() {
        let text = "```json\n{\"health_score\": 85, \"summary\": \"Planta sana\"}\n```";
        let payload = parse_diagnosis(text).unwrap();
        assert_eq!(payload.health_score, Some(85.0));
        assert_eq!(payload.summary.as_deref(), Some("Planta sana"));
    }

    #[test]
    fn test_quoted_numbers_accepted() {
        let text = r#"{"health_score": "42", "species": {"name": "Ficus", "confidence": "0.8"}}"#;
        let payload = parse_diagnosis(text).unwrap();
        assert_eq!(payload.health_score, Some(42.0));
        assert_eq!(payload.species.unwrap().confidence, Some(0.8));
    }

    #[test]
    fn test_unparseable_quoted_number_becomes_none() {
        let text = r#"{"health_score": "alto"}"#;
        let payload = parse_diagnosis(text).unwrap();
        assert!(payload.health_score.is_none());
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let text = r#"{"health_score": 60, "status": "warning", "long_term_care": {"watering": "poca"}}"#;
        let payload = parse_diagnosis(text).unwrap();
        assert_eq!(payload.health_score, Some(60.0));
    }

    #[test]
    fn test_actions_and_issues() {
        let text = r#"{
            "issues": [
                {"name": "Clorosis", "severity": "medium"},
                {"name": "Antracnosis", "severity": "high"}
            ],
            "immediate_actions": [
                {"priority": 2, "action": "Regar"},
                {"priority": 1, "action": "Podar hojas"}
            ]
        }"#;
        let payload = parse_diagnosis(text).unwrap();
        assert_eq!(payload.issues.len(), 2);
        assert_eq!(payload.issues[1].severity.as_deref(), Some("high"));
        assert_eq!(payload.immediate_actions[1].priority, Some(1.0));
    }

    #[test]
    fn test_comparison_section() {
        let text = r#"{
            "health_score": 55,
            "comparison": {
                "improvement_percentage": 30,
                "trend": "improving",
                "persistent_issues": ["clorosis leve"]
            }
        }"#;
        let payload = parse_diagnosis(text).unwrap();
        let cmp = payload.comparison.unwrap();
        assert_eq!(cmp.improvement_percentage, Some(30.0));
        assert_eq!(cmp.trend.as_deref(), Some("improving"));
        assert_eq!(cmp.persistent_issues, vec!["clorosis leve"]);
    }

    #[test]
    fn test_care_tips_payload() {
        let text = r#"{
            "plant_name": "Monstera deliciosa",
            "quick_tips": ["Riego moderado", "Luz indirecta"],
            "common_mistakes": ["Exceso de riego"],
            "difficulty": "easy"
        }"#;
        let payload = parse_care_tips(text).unwrap();
        assert_eq!(payload.quick_tips.len(), 2);
        assert_eq!(payload.difficulty.as_deref(), Some("easy"));
    }

    #[test]
    fn test_plain_prose_is_an_error() {
        let err = parse_diagnosis("La planta se ve bien en general.").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedReply(_)));
    }
}
