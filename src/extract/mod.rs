//! Tolerant extraction of structured data from model replies
//!
//! Everything that touches loosely-shaped model output lives here:
//! fence stripping and the typed, defaulted payload parse. Downstream
//! modules only see typed payloads or a `MalformedReply` error.

pub mod fences;
pub mod payload;

pub use fences::strip_code_fences;
pub use payload::{
    parse_care_tips, parse_diagnosis, parse_quality, ActionItem, CareTipsPayload,
    ComparisonPayload, DiagnosisPayload, FramingAdvice, IssueReport, QualityPayload, SpeciesInfo,
};
