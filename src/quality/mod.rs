//! Photo quality gate
//!
//! Scores a photo's framing before any diagnosis is attempted and
//! turns the model's verdict into voice-ready guidance. Every failure
//! path degrades to a rejection with retry guidance; nothing here
//! raises once a model outcome is in hand.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::extract::{self, QualityPayload};
use crate::gateway::ModelReply;

/// Default acceptance threshold on the overall score
pub const DEFAULT_THRESHOLD: f64 = 0.70;

/// Axis score when the model marks that aspect acceptable
const AXIS_OK: f64 = 0.9;
/// Lighting score when the model asks for better light
const LIGHTING_LOW: f64 = 0.4;
/// Focus and distance score when the model asks for adjustment
const AXIS_LOW: f64 = 0.5;
/// Angle score when the subject is off-center
const ANGLE_LOW: f64 = 0.45;
/// Floor under penalized overall scores
const OVERALL_FLOOR: f64 = 0.3;
/// Confidence multiplier when framing problems were reported
const PENALTY_FACTOR: f64 = 0.6;

const ACCEPTED_GUIDANCE: &str = "✅ ¡Excelente! Tu foto está lista para el diagnóstico";
const DEFAULT_REJECTION_GUIDANCE: &str = "No se pudo analizar la imagen";
const TRANSPORT_FAILURE_GUIDANCE: &str =
    "Error al analizar la foto. Por favor intenta de nuevo.";
const PARSE_FAILURE_GUIDANCE: &str =
    "La imagen necesita ajustes. Asegúrate de que la planta esté bien centrada y enfocada.";

/// Per-axis framing scores in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisScores {
    pub lighting: f64,
    pub focus: f64,
    pub distance: f64,
    pub angle: f64,
}

impl AxisScores {
    fn uniform(score: f64) -> Self {
        AxisScores {
            lighting: score,
            focus: score,
            distance: score,
            angle: score,
        }
    }
}

/// Verdict of the quality gate for one photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub accepted: bool,
    pub overall_score: f64,
    pub axis_scores: AxisScores,
    pub centered: bool,
    pub plant_detected: bool,
    pub issues: Vec<String>,
    /// Voice-ready guidance telling the user what to do next
    pub guidance: String,
}

/// Photo quality gate with a configurable acceptance threshold
#[derive(Debug, Clone)]
pub struct QualityGate {
    threshold: f64,
}

impl QualityGate {
    /// Create a gate with the default threshold
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_THRESHOLD)
    }

    /// Create a gate with a custom acceptance threshold
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Interpret the model outcome for the photo-validation prompt.
    ///
    /// Total over both arms of the outcome: transport failures and
    /// unparseable replies reject the photo with retry guidance.
    pub fn assess(&self, outcome: Result<ModelReply>) -> QualityAssessment {
        let reply = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "photo validation transport failed");
                return QualityAssessment {
                    accepted: false,
                    overall_score: 0.0,
                    axis_scores: AxisScores::uniform(0.0),
                    centered: false,
                    plant_detected: false,
                    issues: Vec::new(),
                    guidance: TRANSPORT_FAILURE_GUIDANCE.to_string(),
                };
            }
        };

        match extract::parse_quality(&reply.text) {
            Ok(payload) => self.score(payload),
            Err(e) => {
                tracing::warn!(error = %e, "photo validation reply was not valid JSON");
                QualityAssessment {
                    accepted: false,
                    overall_score: 0.5,
                    axis_scores: AxisScores::uniform(0.5),
                    centered: false,
                    plant_detected: false,
                    issues: Vec::new(),
                    guidance: PARSE_FAILURE_GUIDANCE.to_string(),
                }
            }
        }
    }

    fn score(&self, payload: QualityPayload) -> QualityAssessment {
        let advice = &payload.recommendations;
        let axis_scores = AxisScores {
            lighting: if advice.lighting == "ok" { AXIS_OK } else { LIGHTING_LOW },
            focus: if advice.focus == "ok" { AXIS_OK } else { AXIS_LOW },
            distance: if advice.distance == "ok" { AXIS_OK } else { AXIS_LOW },
            angle: if advice.direction == "center" { AXIS_OK } else { ANGLE_LOW },
        };

        let confidence = payload.confidence.unwrap_or(0.0).clamp(0.0, 1.0);
        let framing_ok =
            payload.is_centered && payload.plant_detected && payload.issues.is_empty();
        let overall_score = if framing_ok {
            confidence
        } else {
            (confidence * PENALTY_FACTOR).max(OVERALL_FLOOR)
        };

        let accepted = overall_score >= self.threshold;
        let guidance = if accepted {
            ACCEPTED_GUIDANCE.to_string()
        } else {
            payload
                .voice_guidance
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION_GUIDANCE.to_string())
        };

        tracing::info!(accepted, overall_score, "photo quality assessed");

        QualityAssessment {
            accepted,
            overall_score,
            axis_scores,
            centered: payload.is_centered,
            plant_detected: payload.plant_detected,
            issues: payload.issues,
            guidance,
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new()
    }
}
