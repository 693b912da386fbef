//! Diagnosis pipeline facade
//!
//! Wires the model gateway, retry policy, quality gate, extraction
//! engine and telemetry into the operations callers use: photo check,
//! diagnosis, follow-up, content moderation and quick care tips. Each
//! operation is one logical unit of work whose only suspension point
//! is the model call.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::diagnosis::{self, DiagnosisResult, FollowUpResult};
use crate::errors::{PipelineError, Result};
use crate::extract;
use crate::gateway::{CallOptions, ModelGateway, ModelReply, RetryPolicy, VisionModelClient};
use crate::prompts::PromptLibrary;
use crate::quality::{QualityAssessment, QualityGate};
use crate::telemetry::{PipelineEvent, TelemetryCollector};

/// Moderation ruling on a piece of user text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub allowed: bool,
    /// The classifier's word, normalized
    pub label: String,
}

const ALLOWED_LABEL: &str = "APROPIADO";
const BLOCKED_LABEL: &str = "INAPROPIADO";

/// Quick care advice for one plant type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareTips {
    pub plant_name: String,
    pub quick_tips: Vec<String>,
    pub common_mistakes: Vec<String>,
    pub difficulty: String,
}

/// The full photo-diagnosis pipeline
pub struct DiagnosisPipeline {
    gateway: Arc<dyn ModelGateway>,
    config: PipelineConfig,
    retry: RetryPolicy,
    gate: QualityGate,
    telemetry: TelemetryCollector,
}

impl DiagnosisPipeline {
    /// Build a pipeline talking to the configured API
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let gateway = Arc::new(VisionModelClient::new(&config)?);
        Ok(Self::with_gateway(gateway, config))
    }

    /// Build a pipeline over any gateway, real or canned
    pub fn with_gateway(gateway: Arc<dyn ModelGateway>, config: PipelineConfig) -> Self {
        let retry = RetryPolicy::with_config(
            config.tuning.max_retries,
            config.tuning.retry_base_delay_ms,
        );
        let gate = QualityGate::with_threshold(config.tuning.quality_threshold);

        Self {
            gateway,
            config,
            retry,
            gate,
            telemetry: TelemetryCollector::new(),
        }
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Rule on a photo's framing before committing to a diagnosis.
    ///
    /// # Errors
    ///
    /// `InvalidImage` for an empty or oversized buffer. Transport and
    /// parse problems reject the photo instead of raising.
    pub async fn assess_photo(&self, image: &[u8]) -> Result<QualityAssessment> {
        self.validate_image(image)?;

        let outcome = self
            .call_image(
                image,
                PromptLibrary::photo_validation(),
                CallOptions::PHOTO_VALIDATION,
                "photo_validation",
            )
            .await;
        let assessment = self.gate.assess(outcome);

        self.telemetry.record(PipelineEvent::QualityVerdict {
            accepted: assessment.accepted,
            timestamp: Instant::now(),
        });

        Ok(assessment)
    }

    /// Produce a full diagnosis for a plant photo.
    ///
    /// # Errors
    ///
    /// `InvalidImage` for an empty or oversized buffer. Transport and
    /// parse problems degrade into a well-formed result.
    pub async fn diagnose(
        &self,
        image: &[u8],
        symptoms: Option<&str>,
    ) -> Result<DiagnosisResult> {
        self.validate_image(image)?;

        let prompt = PromptLibrary::diagnosis(symptoms);
        let outcome = self
            .call_image(image, &prompt, CallOptions::DIAGNOSIS, "diagnosis")
            .await;

        let transported = outcome.is_ok();
        let result = diagnosis::interpret(outcome);
        self.note_diagnosis(&result, transported, "diagnosis");

        Ok(result)
    }

    /// Diagnose a newer photo of the same plant, comparing against an
    /// earlier result.
    pub async fn follow_up(
        &self,
        image: &[u8],
        previous: &DiagnosisResult,
    ) -> Result<FollowUpResult> {
        self.validate_image(image)?;

        let prompt = PromptLibrary::follow_up(&previous.prompt_context());
        let outcome = self
            .call_image(image, &prompt, CallOptions::DIAGNOSIS, "follow_up")
            .await;

        let transported = outcome.is_ok();
        let result = diagnosis::interpret_follow_up(outcome);
        self.note_diagnosis(&result.diagnosis, transported, "follow_up");

        Ok(result)
    }

    /// Classify user text as appropriate for the community.
    ///
    /// Fails open: when the classifier cannot be reached or answers
    /// nonsense, the text is allowed.
    pub async fn moderate_text(&self, text: &str) -> Result<Verdict> {
        let prompt = PromptLibrary::moderation(text);
        let outcome = self
            .call_text(&prompt, CallOptions::MODERATION, "moderation")
            .await;

        let verdict = match outcome {
            Ok(reply) => {
                let normalized = reply.text.trim().to_uppercase();
                if normalized.contains(BLOCKED_LABEL) {
                    Verdict {
                        allowed: false,
                        label: BLOCKED_LABEL.to_string(),
                    }
                } else {
                    Verdict {
                        allowed: true,
                        label: ALLOWED_LABEL.to_string(),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "moderation unavailable, allowing text");
                Verdict {
                    allowed: true,
                    label: ALLOWED_LABEL.to_string(),
                }
            }
        };

        tracing::info!(allowed = verdict.allowed, "moderation verdict");
        Ok(verdict)
    }

    /// Quick care tips for a plant type. Degrades to generic advice
    /// when the model is unavailable or answers prose.
    pub async fn quick_tips(&self, plant: &str) -> Result<CareTips> {
        let prompt = PromptLibrary::quick_tips(plant);
        let outcome = self
            .call_text(&prompt, CallOptions::QUICK_TIPS, "quick_tips")
            .await;

        let tips = match outcome {
            Ok(reply) => match extract::parse_care_tips(&reply.text) {
                Ok(payload) => CareTips {
                    plant_name: payload
                        .plant_name
                        .filter(|name| !name.trim().is_empty())
                        .unwrap_or_else(|| plant.to_string()),
                    quick_tips: if payload.quick_tips.is_empty() {
                        generic_care_tips(plant).quick_tips
                    } else {
                        payload.quick_tips
                    },
                    common_mistakes: payload.common_mistakes,
                    difficulty: payload.difficulty.unwrap_or_else(|| "medium".to_string()),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "care tips reply was not valid JSON");
                    self.telemetry.record(PipelineEvent::ParseFallback {
                        purpose: "quick_tips".to_string(),
                        timestamp: Instant::now(),
                    });
                    generic_care_tips(plant)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "care tips unavailable, serving generic advice");
                generic_care_tips(plant)
            }
        };

        Ok(tips)
    }

    /// Reject buffers the gateway should never see
    fn validate_image(&self, image: &[u8]) -> Result<()> {
        if image.is_empty() {
            return Err(PipelineError::InvalidImage(
                "image buffer is empty".to_string(),
            ));
        }

        let limit = self.config.tuning.max_image_bytes;
        if image.len() > limit {
            return Err(PipelineError::InvalidImage(format!(
                "image is {} bytes, limit is {}",
                image.len(),
                limit
            )));
        }

        Ok(())
    }

    async fn call_image(
        &self,
        image: &[u8],
        prompt: &str,
        opts: CallOptions,
        purpose: &str,
    ) -> Result<ModelReply> {
        let started = Instant::now();
        let attempts = AtomicU32::new(0);

        let outcome = self
            .retry
            .execute_with_retry(|| {
                let attempt = attempts.fetch_add(1, Ordering::Relaxed);
                if attempt > 0 {
                    self.telemetry.record(PipelineEvent::RetryAttempt {
                        attempt,
                        timestamp: Instant::now(),
                    });
                }
                self.gateway.analyze_image(image, prompt, opts)
            })
            .await;

        self.observe(purpose, started, &outcome);
        outcome
    }

    async fn call_text(
        &self,
        prompt: &str,
        opts: CallOptions,
        purpose: &str,
    ) -> Result<ModelReply> {
        let started = Instant::now();
        let attempts = AtomicU32::new(0);

        let outcome = self
            .retry
            .execute_with_retry(|| {
                let attempt = attempts.fetch_add(1, Ordering::Relaxed);
                if attempt > 0 {
                    self.telemetry.record(PipelineEvent::RetryAttempt {
                        attempt,
                        timestamp: Instant::now(),
                    });
                }
                self.gateway.analyze_text(prompt, opts)
            })
            .await;

        self.observe(purpose, started, &outcome);
        outcome
    }

    fn observe(&self, purpose: &str, started: Instant, outcome: &Result<ModelReply>) {
        match outcome {
            Ok(reply) => self.telemetry.record(PipelineEvent::ModelCall {
                purpose: purpose.to_string(),
                duration_ms: started.elapsed().as_millis() as u64,
                total_tokens: reply.usage.total_tokens,
                timestamp: Instant::now(),
            }),
            Err(_) => self.telemetry.record(PipelineEvent::TransportFailure {
                purpose: purpose.to_string(),
                timestamp: Instant::now(),
            }),
        }
    }

    fn note_diagnosis(&self, result: &DiagnosisResult, transported: bool, purpose: &str) {
        // A parsed diagnosis always carries a health score; a reply
        // that survived transport without one went through the
        // raw-text fallback.
        if transported && result.health_score.is_none() {
            self.telemetry.record(PipelineEvent::ParseFallback {
                purpose: purpose.to_string(),
                timestamp: Instant::now(),
            });
        }

        self.telemetry.record(PipelineEvent::DiagnosisCompleted {
            severity: result.severity,
            timestamp: Instant::now(),
        });
    }
}

fn generic_care_tips(plant: &str) -> CareTips {
    CareTips {
        plant_name: plant.to_string(),
        quick_tips: vec![
            "Riega cuando la capa superior de la tierra esté seca".to_string(),
            "Ubica la planta donde reciba luz natural indirecta".to_string(),
            "Revisa las hojas cada semana en busca de plagas".to_string(),
        ],
        common_mistakes: vec![
            "Regar en exceso".to_string(),
            "Cambiar la planta de lugar con demasiada frecuencia".to_string(),
        ],
        difficulty: "medium".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ModelUsage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Gateway double that replays canned outcomes
    struct CannedGateway {
        replies: Mutex<Vec<Result<ModelReply>>>,
    }

    impl CannedGateway {
        fn new(replies: Vec<Result<ModelReply>>) -> Self {
            Self {
                replies: Mutex::new(replies),
            }
        }

        fn next(&self) -> Result<ModelReply> {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Err(PipelineError::Transport("no canned reply left".to_string()))
            } else {
                replies.remove(0)
            }
        }
    }

    #[async_trait]
    impl ModelGateway for CannedGateway {
        async fn analyze_image(
            &self,
            _image: &[u8],
            _prompt: &str,
            _opts: CallOptions,
        ) -> Result<ModelReply> {
            self.next()
        }

        async fn analyze_text(&self, _prompt: &str, _opts: CallOptions) -> Result<ModelReply> {
            self.next()
        }
    }

    fn reply(text: &str) -> Result<ModelReply> {
        Ok(ModelReply {
            text: text.to_string(),
            usage: ModelUsage {
                prompt_tokens: 10,
                completion_tokens: 10,
                total_tokens: 20,
            },
            model: "test-model".to_string(),
        })
    }

    fn pipeline_with(replies: Vec<Result<ModelReply>>) -> DiagnosisPipeline {
        let mut config = PipelineConfig::default();
        // Backoff floor keeps retry tests quick
        config.tuning.max_retries = 0;
        config.tuning.retry_base_delay_ms = 1;
        DiagnosisPipeline::with_gateway(Arc::new(CannedGateway::new(replies)), config)
    }

    #[tokio::test]
    async fn test_empty_image_is_rejected_upfront() {
        let pipeline = pipeline_with(vec![]);
        let err = pipeline.assess_photo(&[]).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImage(_)));
    }

    #[tokio::test]
    async fn test_oversized_image_is_rejected_upfront() {
        let mut config = PipelineConfig::default();
        config.tuning.max_image_bytes = 4;
        let pipeline = DiagnosisPipeline::with_gateway(
            Arc::new(CannedGateway::new(vec![])),
            config,
        );

        let err = pipeline.diagnose(&[0u8; 5], None).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImage(_)));
    }

    #[tokio::test]
    async fn test_moderation_blocks_flagged_text() {
        let pipeline = pipeline_with(vec![reply("INAPROPIADO")]);
        let verdict = pipeline.moderate_text("spam spam spam").await.unwrap();

        assert!(!verdict.allowed);
        assert_eq!(verdict.label, "INAPROPIADO");
    }

    #[tokio::test]
    async fn test_moderation_allows_clean_text() {
        let pipeline = pipeline_with(vec![reply("APROPIADO")]);
        let verdict = pipeline.moderate_text("mi planta tiene hojas amarillas").await.unwrap();

        assert!(verdict.allowed);
        assert_eq!(verdict.label, "APROPIADO");
    }

    #[tokio::test]
    async fn test_moderation_fails_open() {
        let pipeline = pipeline_with(vec![Err(PipelineError::Timeout {
            duration_ms: 30_000,
        })]);
        let verdict = pipeline.moderate_text("anything").await.unwrap();
        assert!(verdict.allowed);
    }

    #[tokio::test]
    async fn test_quick_tips_parses_model_reply() {
        let text = r#"{
            "plant_name": "Monstera deliciosa",
            "quick_tips": ["Riego moderado", "Luz indirecta"],
            "common_mistakes": ["Exceso de agua"],
            "difficulty": "easy"
        }"#;

        let pipeline = pipeline_with(vec![reply(text)]);
        let tips = pipeline.quick_tips("monstera").await.unwrap();

        assert_eq!(tips.plant_name, "Monstera deliciosa");
        assert_eq!(tips.quick_tips.len(), 2);
        assert_eq!(tips.difficulty, "easy");
    }

    #[tokio::test]
    async fn test_quick_tips_degrades_to_generic_advice() {
        let pipeline = pipeline_with(vec![reply("these are some tips in prose")]);
        let tips = pipeline.quick_tips("ficus").await.unwrap();

        assert_eq!(tips.plant_name, "ficus");
        assert!(!tips.quick_tips.is_empty());
        assert_eq!(tips.difficulty, "medium");
    }

    #[tokio::test]
    async fn test_telemetry_counts_the_round_trips() {
        let pipeline = pipeline_with(vec![
            reply(r#"{"is_centered": true, "plant_detected": true, "confidence": 0.9}"#),
            reply(r#"{"health_score": 80}"#),
        ]);

        pipeline.assess_photo(&[1, 2, 3]).await.unwrap();
        pipeline.diagnose(&[1, 2, 3], None).await.unwrap();

        let stats = pipeline.telemetry().get_stats();
        assert_eq!(stats.model_calls, 2);
        assert_eq!(stats.tokens_consumed, 40);
        assert_eq!(stats.photos_accepted, 1);
        assert_eq!(stats.diagnoses_completed, 1);
    }

    #[tokio::test]
    async fn test_transport_failure_still_yields_a_diagnosis() {
        let pipeline = pipeline_with(vec![Err(PipelineError::Transport(
            "connection refused".to_string(),
        ))]);

        let result = pipeline.diagnose(&[1, 2, 3], None).await.unwrap();
        assert_eq!(result.confidence, 0.0);
        assert!(!result.recommendations.is_empty());

        let stats = pipeline.telemetry().get_stats();
        assert_eq!(stats.transport_failures, 1);
    }

    #[tokio::test]
    async fn test_parse_fallback_is_counted() {
        let pipeline = pipeline_with(vec![reply("not json at all")]);
        pipeline.diagnose(&[1, 2, 3], None).await.unwrap();

        let stats = pipeline.telemetry().get_stats();
        assert_eq!(stats.parse_fallbacks, 1);
    }

    #[tokio::test]
    async fn test_follow_up_passes_previous_context() {
        let first = reply(r#"{"health_score": 35, "summary": "Hongos activos"}"#);
        let second = reply(
            r#"{"health_score": 60, "comparison": {"trend": "improving", "improvement_percentage": 40}}"#,
        );

        let pipeline = pipeline_with(vec![first, second]);
        let original = pipeline.diagnose(&[1, 2, 3], None).await.unwrap();
        let follow = pipeline.follow_up(&[1, 2, 3], &original).await.unwrap();

        assert!(follow.comparison.is_some());
        assert_eq!(
            follow.comparison.unwrap().trend,
            crate::diagnosis::Trend::Improving
        );
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let mut config = PipelineConfig::default();
        config.tuning.max_retries = 2;
        config.tuning.retry_base_delay_ms = 1;

        let gateway = CannedGateway::new(vec![
            Err(PipelineError::Transport("503".to_string())),
            reply(r#"{"health_score": 90}"#),
        ]);
        let pipeline = DiagnosisPipeline::with_gateway(Arc::new(gateway), config);

        let result = pipeline.diagnose(&[1, 2, 3], None).await.unwrap();
        assert_eq!(result.health_score, Some(90));

        let stats = pipeline.telemetry().get_stats();
        assert_eq!(stats.retry_attempts, 1);
        assert_eq!(stats.model_calls, 1);
        assert_eq!(stats.transport_failures, 0);
    }
}
