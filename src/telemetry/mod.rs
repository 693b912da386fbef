//! Pipeline telemetry
//!
//! In-process counters for model calls, degraded paths and verdicts.
//! Nothing leaves the process; the CLI renders a summary at exit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::diagnosis::Severity;

/// Pipeline event types
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A model round trip completed
    ModelCall {
        purpose: String,
        duration_ms: u64,
        total_tokens: u32,
        timestamp: Instant,
    },
    /// A model call failed at the transport layer after retries
    TransportFailure {
        purpose: String,
        timestamp: Instant,
    },
    /// A model reply could not be parsed and a fallback was served
    ParseFallback {
        purpose: String,
        timestamp: Instant,
    },
    /// A transient failure triggered a retry
    RetryAttempt {
        attempt: u32,
        timestamp: Instant,
    },
    /// The quality gate ruled on a photo
    QualityVerdict {
        accepted: bool,
        timestamp: Instant,
    },
    /// A diagnosis was produced
    DiagnosisCompleted {
        severity: Severity,
        timestamp: Instant,
    },
}

/// Pipeline statistics
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub model_calls: usize,
    pub tokens_consumed: u64,
    pub transport_failures: usize,
    pub parse_fallbacks: usize,
    pub retry_attempts: usize,
    pub photos_accepted: usize,
    pub photos_rejected: usize,
    pub diagnoses_completed: usize,
    pub diagnoses_by_severity: HashMap<Severity, usize>,
}

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
    stats: Arc<Mutex<PipelineStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(PipelineStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: PipelineEvent) {
        {
            let mut stats = self.stats.lock().unwrap();
            match &event {
                PipelineEvent::ModelCall { total_tokens, .. } => {
                    stats.model_calls += 1;
                    stats.tokens_consumed += u64::from(*total_tokens);
                }
                PipelineEvent::TransportFailure { .. } => {
                    stats.transport_failures += 1;
                }
                PipelineEvent::ParseFallback { .. } => {
                    stats.parse_fallbacks += 1;
                }
                PipelineEvent::RetryAttempt { .. } => {
                    stats.retry_attempts += 1;
                }
                PipelineEvent::QualityVerdict { accepted, .. } => {
                    if *accepted {
                        stats.photos_accepted += 1;
                    } else {
                        stats.photos_rejected += 1;
                    }
                }
                PipelineEvent::DiagnosisCompleted { severity, .. } => {
                    stats.diagnoses_completed += 1;
                    *stats.diagnoses_by_severity.entry(*severity).or_insert(0) += 1;
                }
            }
        }

        let mut events = self.events.lock().unwrap();
        events.push(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> PipelineStats {
        self.stats.lock().unwrap().clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<PipelineEvent> {
        let events = self.events.lock().unwrap();
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Share of checked photos that passed the gate
    pub fn acceptance_rate(&self) -> f64 {
        let stats = self.stats.lock().unwrap();
        let total = stats.photos_accepted + stats.photos_rejected;
        if total == 0 {
            1.0
        } else {
            stats.photos_accepted as f64 / total as f64
        }
    }

    /// Render the session summary block for the CLI
    pub fn render_summary(&self) -> String {
        let stats = self.get_stats();
        let elapsed = self.elapsed();

        let mut severities: Vec<(Severity, usize)> = stats
            .diagnoses_by_severity
            .iter()
            .map(|(severity, count)| (*severity, *count))
            .collect();
        severities.sort_by_key(|(severity, _)| *severity);
        let by_severity = severities
            .iter()
            .map(|(severity, count)| format!("{} {}", severity, count))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "\n📊 Session Summary\n\
             ─────────────────────────────────────\n\
             Duration:           {:?}\n\
             Model calls:        {}\n\
             Tokens consumed:    {}\n\
             Transport failures: {}\n\
             Parse fallbacks:    {}\n\
             Retries:            {}\n\
             Photos accepted:    {} ({:.0}% of checked)\n\
             Diagnoses:          {}{}\n",
            elapsed,
            stats.model_calls,
            stats.tokens_consumed,
            stats.transport_failures,
            stats.parse_fallbacks,
            stats.retry_attempts,
            stats.photos_accepted,
            self.acceptance_rate() * 100.0,
            stats.diagnoses_completed,
            if by_severity.is_empty() {
                String::new()
            } else {
                format!(" ({})", by_severity)
            }
        )
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}
