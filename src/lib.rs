//! PlantDoc v0.3.0 - Plant Health Diagnosis Pipeline
//!
//! Turns a phone photo of a plant into a trust-calibrated diagnosis.
//! A cheap quality gate screens photos before the expensive model
//! call, the extraction engine tolerates whatever the model answers,
//! and the communication layer rewrites findings for the owner's
//! experience level.
//!
//! # Architecture
//!
//! - **Quality gate**: framing check before spending a diagnosis
//! - **Diagnosis engine**: prompt, parse, score, weekly plan
//! - **Communication**: expertise-tiered wording and care tips
//! - **Feedback**: per-user verdicts on past diagnoses

// Core pipeline stages
pub mod errors;
pub mod config;
pub mod prompts;
pub mod gateway;
pub mod extract;
pub mod quality;
pub mod diagnosis;
pub mod communication;
pub mod feedback;
pub mod pipeline;

// Re-export commonly used types
pub use errors::{PipelineError, Result};
pub use pipeline::DiagnosisPipeline;

// Operations and interface layer
pub mod telemetry;
pub mod doctor;
pub mod cli;
