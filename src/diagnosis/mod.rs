//! Diagnosis extraction engine
//!
//! Turns the raw model outcome for the diagnosis prompt into an
//! immutable `DiagnosisResult`: tolerant extraction, severity scoring,
//! primary-issue selection, recommendation compilation and weekly-plan
//! synthesis. Transport and parse failures degrade into well-formed
//! results here and never escape as errors.

pub mod plan;
pub mod severity;

pub use plan::{synthesize_weekly_plan, PlanEntry, PlanPriority};
pub use severity::Severity;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::Result;
use crate::extract::{self, ActionItem, ComparisonPayload, DiagnosisPayload, IssueReport};
use crate::gateway::{ModelReply, ModelUsage};

/// Characters of raw model text carried into a degraded summary
const RAW_SUMMARY_LIMIT: usize = 500;
/// Recommendations surfaced to the caller, at most
const MAX_RECOMMENDATIONS: usize = 5;
/// Confidence assumed when the model omits species confidence
const DEFAULT_CONFIDENCE: f64 = 0.7;
/// Health score assumed when the model omits one
const DEFAULT_HEALTH_SCORE: f64 = 50.0;

/// Shown when the model reply parses but carries no summary
const DEFAULT_SUMMARY: &str = "Diagnóstico completado";
/// Summary for the transport-failure fallback; invites a retry
const TRANSPORT_FAILURE_SUMMARY: &str =
    "Error al analizar la imagen. Por favor intenta nuevamente.";

/// Opaque identifier minted for each diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosisId(Uuid);

impl DiagnosisId {
    /// Mint a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DiagnosisId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DiagnosisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Complete outcome of one diagnosis call. Immutable once built;
/// persistence is the caller's concern, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub id: DiagnosisId,
    pub summary: String,
    /// Species-identification confidence in [0, 1]; 0 on degraded paths
    pub confidence: f64,
    pub severity: Severity,
    /// Name of the dominant reported issue, if any
    pub primary_issue: Option<String>,
    /// Never empty; at most five entries
    pub recommendations: Vec<String>,
    /// Never empty
    pub weekly_plan: Vec<PlanEntry>,
    /// Absent when the model reply never produced a usable score
    pub health_score: Option<u8>,
    /// Token usage of the underlying call; absent on transport failure
    pub usage: Option<ModelUsage>,
}

impl DiagnosisResult {
    /// Render the block describing this result inside a follow-up
    /// prompt.
    pub fn prompt_context(&self) -> String {
        let health = self
            .health_score
            .map(|s| format!("{}/100", s))
            .unwrap_or_else(|| "desconocida".to_string());
        let issue = self.primary_issue.as_deref().unwrap_or("ninguno identificado");

        format!(
            "Resumen: {}\nSalud: {}\nSeveridad: {}\nProblema principal: {}",
            self.summary, health, self.severity, issue
        )
    }
}

/// Recovery trend reported by a follow-up comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        };
        write!(f, "{}", label)
    }
}

/// Comparison against an earlier diagnosis, from a follow-up reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Recovery progress in [0, 100]
    pub improvement_percentage: f64,
    pub trend: Trend,
    pub new_issues: Vec<String>,
    pub resolved_issues: Vec<String>,
    pub persistent_issues: Vec<String>,
    pub progress_summary: Option<String>,
}

impl ComparisonSummary {
    fn from_payload(payload: ComparisonPayload) -> Self {
        let trend = match payload.trend.as_deref() {
            Some("improving") => Trend::Improving,
            Some("declining") => Trend::Declining,
            _ => Trend::Stable,
        };

        ComparisonSummary {
            improvement_percentage: payload
                .improvement_percentage
                .unwrap_or(0.0)
                .clamp(0.0, 100.0),
            trend,
            new_issues: payload.new_issues,
            resolved_issues: payload.resolved_issues,
            persistent_issues: payload.persistent_issues,
            progress_summary: payload.progress_summary,
        }
    }
}

/// Follow-up diagnosis: a fresh result plus the model's comparison
/// against the previous one, when it produced a parseable section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpResult {
    pub diagnosis: DiagnosisResult,
    pub comparison: Option<ComparisonSummary>,
}

/// Interpret the model outcome for the diagnosis prompt.
///
/// Total over both arms of the outcome: transport failures and
/// unparseable replies yield degraded results with retry guidance.
pub fn interpret(outcome: Result<ModelReply>) -> DiagnosisResult {
    build(outcome).0
}

/// Interpret a follow-up outcome, additionally extracting the
/// comparison section. Degraded paths carry `comparison: None`.
pub fn interpret_follow_up(outcome: Result<ModelReply>) -> FollowUpResult {
    let (diagnosis, comparison) = build(outcome);
    FollowUpResult {
        diagnosis,
        comparison,
    }
}

fn build(outcome: Result<ModelReply>) -> (DiagnosisResult, Option<ComparisonSummary>) {
    let reply = match outcome {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "model transport failed, returning degraded diagnosis");
            return (transport_fallback(), None);
        }
    };

    match extract::parse_diagnosis(&reply.text) {
        Ok(payload) => {
            let comparison = payload.comparison.clone().map(ComparisonSummary::from_payload);
            let diagnosis = from_payload(payload, reply.usage);
            tracing::info!(
                severity = %diagnosis.severity,
                health_score = diagnosis.health_score.unwrap_or(0),
                "diagnosis completed"
            );
            (diagnosis, comparison)
        }
        Err(e) => {
            tracing::warn!(error = %e, "model reply was not valid JSON, degrading to raw summary");
            (parse_fallback(&reply.text, reply.usage), None)
        }
    }
}

fn from_payload(payload: DiagnosisPayload, usage: ModelUsage) -> DiagnosisResult {
    let score = payload
        .health_score
        .unwrap_or(DEFAULT_HEALTH_SCORE)
        .clamp(0.0, 100.0)
        .round() as u8;
    let severity = Severity::from_health_score(score);

    let confidence = payload
        .species
        .as_ref()
        .and_then(|s| s.confidence)
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);

    if let Some(name) = payload.species.as_ref().and_then(|s| s.name.as_deref()) {
        tracing::debug!(species = name, "species identified");
    }

    let summary = payload
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SUMMARY.to_string());

    let primary_issue = select_primary_issue(&payload.issues);
    let actions = sorted_actions(payload.immediate_actions);
    let top_action = actions.first().cloned();
    let recommendations = compile_recommendations(&actions);
    let weekly_plan = synthesize_weekly_plan(severity, top_action.as_deref());

    DiagnosisResult {
        id: DiagnosisId::new(),
        summary,
        confidence,
        severity,
        primary_issue,
        recommendations,
        weekly_plan,
        health_score: Some(score),
        usage: Some(usage),
    }
}

/// Among reported issues, a high-severity one wins; otherwise the
/// first reported issue names the problem.
fn select_primary_issue(issues: &[IssueReport]) -> Option<String> {
    if let Some(severe) = issues
        .iter()
        .find(|issue| issue.severity.as_deref() == Some("high"))
    {
        return severe.name.clone();
    }

    issues.first().and_then(|issue| issue.name.clone())
}

/// Actions sorted ascending by priority (1 is most urgent); entries
/// without a priority keep their reported order at the end. Blank
/// actions are dropped.
fn sorted_actions(mut actions: Vec<ActionItem>) -> Vec<String> {
    actions.sort_by(|a, b| {
        let pa = a.priority.unwrap_or(f64::INFINITY);
        let pb = b.priority.unwrap_or(f64::INFINITY);
        pa.total_cmp(&pb)
    });

    actions
        .into_iter()
        .filter_map(|item| item.action)
        .map(|action| action.trim().to_string())
        .filter(|action| !action.is_empty())
        .collect()
}

fn compile_recommendations(actions: &[String]) -> Vec<String> {
    let recommendations: Vec<String> = actions
        .iter()
        .take(MAX_RECOMMENDATIONS)
        .cloned()
        .collect();

    if recommendations.is_empty() {
        vec![
            "Monitorear la planta diariamente".to_string(),
            "Mantener condiciones de cuidado actuales".to_string(),
        ]
    } else {
        recommendations
    }
}

fn transport_fallback() -> DiagnosisResult {
    DiagnosisResult {
        id: DiagnosisId::new(),
        summary: TRANSPORT_FAILURE_SUMMARY.to_string(),
        confidence: 0.0,
        severity: Severity::Unknown,
        primary_issue: None,
        recommendations: vec![
            "Intenta tomar otra foto con mejor iluminación".to_string(),
            "Verifica tu conexión a internet".to_string(),
            "Intenta nuevamente en unos momentos".to_string(),
        ],
        weekly_plan: synthesize_weekly_plan(Severity::Unknown, None),
        health_score: None,
        usage: None,
    }
}

fn parse_fallback(raw: &str, usage: ModelUsage) -> DiagnosisResult {
    let summary: String = raw.chars().take(RAW_SUMMARY_LIMIT).collect();

    DiagnosisResult {
        id: DiagnosisId::new(),
        summary,
        confidence: 0.5,
        severity: Severity::Warning,
        primary_issue: None,
        recommendations: vec![
            "Consulta el diagnóstico completo para más detalles".to_string(),
            "Monitorear la planta diariamente".to_string(),
        ],
        weekly_plan: synthesize_weekly_plan(Severity::Warning, None),
        health_score: None,
        usage: Some(usage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PipelineError;

    fn reply(text: &str) -> Result<ModelReply> {
        Ok(ModelReply {
            text: text.to_string(),
            usage: ModelUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            },
            model: "llama-3.2-11b-vision-preview".to_string(),
        })
    }

    #[test]
    fn test_healthy_diagnosis() {
        let text = r#"{
            "species": {"name": "Monstera deliciosa", "confidence": 0.92},
            "health_score": 85,
            "issues": [],
            "immediate_actions": [],
            "summary": "La planta está sana y vigorosa."
        }"#;

        let result = interpret(reply(text));

        assert_eq!(result.severity, Severity::Healthy);
        assert_eq!(result.health_score, Some(85));
        assert_eq!(result.confidence, 0.92);
        assert_eq!(result.summary, "La planta está sana y vigorosa.");
        assert!(result.primary_issue.is_none());
        // Empty actions still yield a non-empty fallback
        assert_eq!(result.recommendations[0], "Monitorear la planta diariamente");
        assert_eq!(result.weekly_plan.len(), 4);
        assert_eq!(result.weekly_plan[0].day, "Lunes");
        assert_eq!(result.usage.unwrap().total_tokens, 150);
    }

    #[test]
    fn test_critical_diagnosis_front_loads_top_action() {
        let text = r#"{
            "health_score": 20,
            "issues": [{"name": "Antracnosis", "severity": "high"}],
            "immediate_actions": [{"priority": 1, "action": "Remove affected leaves"}],
            "summary": "Infección fúngica avanzada."
        }"#;

        let result = interpret(reply(text));

        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.primary_issue.as_deref(), Some("Antracnosis"));
        assert_eq!(result.weekly_plan[0].task, "Remove affected leaves");
        assert_eq!(result.weekly_plan[0].priority, PlanPriority::High);
        assert_eq!(result.recommendations, vec!["Remove affected leaves"]);
    }

    #[test]
    fn test_recommendations_sorted_by_priority() {
        let text = r#"{
            "health_score": 55,
            "immediate_actions": [
                {"priority": 3, "action": "Fertilizar"},
                {"priority": 1, "action": "Regar de inmediato"},
                {"action": "Observar evolución"},
                {"priority": 2, "action": "Mover a media sombra"}
            ]
        }"#;

        let result = interpret(reply(text));

        assert_eq!(
            result.recommendations,
            vec![
                "Regar de inmediato",
                "Mover a media sombra",
                "Fertilizar",
                "Observar evolución"
            ]
        );
        assert_eq!(result.weekly_plan[0].task, "Regar de inmediato");
    }

    #[test]
    fn test_recommendations_capped_at_five() {
        let text = r#"{
            "health_score": 45,
            "immediate_actions": [
                {"priority": 1, "action": "a1"},
                {"priority": 2, "action": "a2"},
                {"priority": 3, "action": "a3"},
                {"priority": 4, "action": "a4"},
                {"priority": 5, "action": "a5"},
                {"priority": 6, "action": "a6"}
            ]
        }"#;

        let result = interpret(reply(text));
        assert_eq!(result.recommendations.len(), 5);
        assert_eq!(result.recommendations[4], "a5");
    }

    #[test]
    fn test_primary_issue_prefers_high_severity() {
        let text = r#"{
            "health_score": 40,
            "issues": [
                {"name": "Clorosis", "severity": "low"},
                {"name": "Pudrición de raíz", "severity": "high"}
            ]
        }"#;

        let result = interpret(reply(text));
        assert_eq!(result.primary_issue.as_deref(), Some("Pudrición de raíz"));
    }

    #[test]
    fn test_primary_issue_falls_back_to_first() {
        let text = r#"{
            "health_score": 60,
            "issues": [
                {"name": "Clorosis", "severity": "low"},
                {"name": "Araña roja", "severity": "medium"}
            ]
        }"#;

        let result = interpret(reply(text));
        assert_eq!(result.primary_issue.as_deref(), Some("Clorosis"));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let result = interpret(reply("{}"));

        assert_eq!(result.health_score, Some(50));
        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(result.summary, DEFAULT_SUMMARY);
    }

    #[test]
    fn test_transport_failure_degrades() {
        let result = interpret(Err(PipelineError::Timeout { duration_ms: 30_000 }));

        assert_eq!(result.severity, Severity::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert!(result.health_score.is_none());
        assert!(result.usage.is_none());
        assert_eq!(
            result.recommendations[0],
            "Intenta tomar otra foto con mejor iluminación"
        );
        assert!(!result.weekly_plan.is_empty());
        assert_eq!(result.summary, TRANSPORT_FAILURE_SUMMARY);
    }

    #[test]
    fn test_parse_failure_truncates_raw_text() {
        let long_text = "La planta parece tener ".repeat(40);
        assert!(long_text.chars().count() > RAW_SUMMARY_LIMIT);

        let result = interpret(reply(&long_text));

        assert_eq!(result.summary.chars().count(), RAW_SUMMARY_LIMIT);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.severity, Severity::Warning);
        assert!(result.health_score.is_none());
        assert!(!result.recommendations.is_empty());
        assert!(!result.weekly_plan.is_empty());
        // Transport succeeded, so usage is still known
        assert_eq!(result.usage.unwrap().total_tokens, 150);
    }

    #[test]
    fn test_fenced_reply_is_parsed() {
        let text = "```json\n{\"health_score\": 75, \"summary\": \"Bien\"}\n```";
        let result = interpret(reply(text));

        assert_eq!(result.severity, Severity::Healthy);
        assert_eq!(result.summary, "Bien");
    }

    #[test]
    fn test_each_diagnosis_gets_a_fresh_id() {
        let a = interpret(reply("{}"));
        let b = interpret(reply("{}"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_follow_up_with_comparison() {
        let text = r#"{
            "health_score": 65,
            "summary": "Mejora visible.",
            "comparison": {
                "improvement_percentage": 35,
                "trend": "improving",
                "resolved_issues": ["manchas en hojas bajas"],
                "persistent_issues": ["clorosis leve"],
                "progress_summary": "La planta responde al tratamiento."
            }
        }"#;

        let result = interpret_follow_up(reply(text));
        let comparison = result.comparison.unwrap();

        assert_eq!(result.diagnosis.severity, Severity::Warning);
        assert_eq!(comparison.trend, Trend::Improving);
        assert_eq!(comparison.improvement_percentage, 35.0);
        assert_eq!(comparison.persistent_issues, vec!["clorosis leve"]);
    }

    #[test]
    fn test_follow_up_without_comparison_section() {
        let result = interpret_follow_up(reply(r#"{"health_score": 80}"#));
        assert!(result.comparison.is_none());
        assert_eq!(result.diagnosis.severity, Severity::Healthy);
    }

    #[test]
    fn test_follow_up_degrades_without_comparison() {
        let result =
            interpret_follow_up(Err(PipelineError::Transport("503".to_string())));
        assert!(result.comparison.is_none());
        assert_eq!(result.diagnosis.severity, Severity::Unknown);
    }

    #[test]
    fn test_unrecognized_trend_is_stable() {
        let text = r#"{"comparison": {"trend": "sideways"}}"#;
        let result = interpret_follow_up(reply(text));
        assert_eq!(result.comparison.unwrap().trend, Trend::Stable);
    }

    #[test]
    fn test_prompt_context_renders_fields() {
        let result = interpret(reply(
            r#"{"health_score": 40, "summary": "Hongos en tallo", "issues": [{"name": "Mildiu", "severity": "high"}]}"#,
        ));

        let context = result.prompt_context();
        assert!(context.contains("Hongos en tallo"));
        assert!(context.contains("40/100"));
        assert!(context.contains("medium"));
        assert!(context.contains("Mildiu"));
    }
}
