//! Active-learning feedback recorder
//!
//! Stores user verdicts on past diagnoses and aggregates them into
//! accuracy summaries. Storage sits behind async traits so the
//! in-memory stores used here and in tests can be swapped for a real
//! database without touching the recorder. The scope is deliberately
//! store-and-report; no retraining is triggered from here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::diagnosis::DiagnosisId;
use crate::errors::{PipelineError, Result};

/// One user's verdict on one diagnosis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub diagnosis_id: DiagnosisId,
    pub user_id: String,
    pub is_correct: bool,
    /// What the user believes the right label was
    pub corrected_label: Option<String>,
    pub note: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Outcome of a submission: the stored record plus whether an earlier
/// one was replaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReceipt {
    pub record: FeedbackRecord,
    pub updated: bool,
}

/// Aggregated verdicts for one diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub correct_count: usize,
    pub incorrect_count: usize,
    /// correct / total; 0 when no feedback exists
    pub accuracy_ratio: f64,
}

/// Lookup of known diagnoses, owned by whoever persists results
#[async_trait]
pub trait DiagnosisDirectory: Send + Sync {
    /// Whether a diagnosis with this id is on record
    async fn contains(&self, id: DiagnosisId) -> Result<bool>;
}

/// Feedback persistence with atomic upsert semantics
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Insert or replace the record for its `(diagnosis, user)` pair,
    /// returning true when an earlier record was replaced. The
    /// replace-or-create decision must be atomic with the write.
    async fn upsert(&self, record: FeedbackRecord) -> Result<bool>;

    /// All records for a diagnosis
    async fn records_for(&self, id: DiagnosisId) -> Result<Vec<FeedbackRecord>>;
}

/// In-memory diagnosis directory
#[derive(Default)]
pub struct MemoryDirectory {
    known: Mutex<HashSet<DiagnosisId>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a diagnosis so feedback on it is accepted
    pub async fn insert(&self, id: DiagnosisId) {
        self.known.lock().await.insert(id);
    }
}

#[async_trait]
impl DiagnosisDirectory for MemoryDirectory {
    async fn contains(&self, id: DiagnosisId) -> Result<bool> {
        Ok(self.known.lock().await.contains(&id))
    }
}

/// In-memory feedback store keyed by `(diagnosis, user)`
#[derive(Default)]
pub struct MemoryFeedbackStore {
    records: Mutex<HashMap<(DiagnosisId, String), FeedbackRecord>>,
}

impl MemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackStore for MemoryFeedbackStore {
    async fn upsert(&self, record: FeedbackRecord) -> Result<bool> {
        // One lock spans the lookup and the write, so concurrent
        // submissions for the same pair cannot both create.
        let mut records = self.records.lock().await;
        let key = (record.diagnosis_id, record.user_id.clone());
        Ok(records.insert(key, record).is_some())
    }

    async fn records_for(&self, id: DiagnosisId) -> Result<Vec<FeedbackRecord>> {
        let records = self.records.lock().await;
        let mut matching: Vec<FeedbackRecord> = records
            .values()
            .filter(|record| record.diagnosis_id == id)
            .cloned()
            .collect();
        matching.sort_by_key(|record| record.submitted_at);
        Ok(matching)
    }
}

/// Records and aggregates diagnosis feedback
pub struct FeedbackRecorder {
    directory: Arc<dyn DiagnosisDirectory>,
    store: Arc<dyn FeedbackStore>,
}

impl FeedbackRecorder {
    pub fn new(directory: Arc<dyn DiagnosisDirectory>, store: Arc<dyn FeedbackStore>) -> Self {
        Self { directory, store }
    }

    /// Record a user's verdict on a diagnosis.
    ///
    /// A second submission for the same `(diagnosis, user)` pair
    /// replaces the first, timestamp included, and reports
    /// `updated: true`.
    ///
    /// # Errors
    ///
    /// `UnknownDiagnosis` when the diagnosis id is not on record.
    pub async fn submit(
        &self,
        diagnosis_id: DiagnosisId,
        user_id: &str,
        is_correct: bool,
        corrected_label: Option<String>,
        note: Option<String>,
    ) -> Result<FeedbackReceipt> {
        if !self.directory.contains(diagnosis_id).await? {
            return Err(PipelineError::UnknownDiagnosis(diagnosis_id));
        }

        let record = FeedbackRecord {
            diagnosis_id,
            user_id: user_id.to_string(),
            is_correct,
            corrected_label,
            note,
            submitted_at: Utc::now(),
        };

        let updated = self.store.upsert(record.clone()).await?;

        tracing::info!(
            diagnosis_id = %diagnosis_id,
            user_id,
            is_correct,
            updated,
            "feedback recorded"
        );

        Ok(FeedbackReceipt { record, updated })
    }

    /// Aggregate all verdicts for one diagnosis. A diagnosis nobody
    /// has judged yet aggregates to zero counts and ratio 0.
    pub async fn summary(&self, diagnosis_id: DiagnosisId) -> Result<FeedbackSummary> {
        let records = self.store.records_for(diagnosis_id).await?;
        Ok(aggregate(&records))
    }

    /// All stored records for one diagnosis, oldest first
    pub async fn records(&self, diagnosis_id: DiagnosisId) -> Result<Vec<FeedbackRecord>> {
        self.store.records_for(diagnosis_id).await
    }
}

fn aggregate(records: &[FeedbackRecord]) -> FeedbackSummary {
    let correct_count = records.iter().filter(|record| record.is_correct).count();
    let incorrect_count = records.len() - correct_count;
    let accuracy_ratio = if records.is_empty() {
        0.0
    } else {
        correct_count as f64 / records.len() as f64
    };

    FeedbackSummary {
        correct_count,
        incorrect_count,
        accuracy_ratio,
    }
}
