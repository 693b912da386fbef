//! Weekly care-plan synthesis
//!
//! A fixed state machine keyed by severity tier. Three Spanish
//! templates: a front-loaded crisis plan, a mid-week attention plan,
//! and a weekday maintenance plan. Only the first slot of the crisis
//! and attention templates takes the model's top-priority action; the
//! rest is deterministic.

use serde::{Deserialize, Serialize};

use crate::diagnosis::severity::Severity;

/// Priority of a single plan entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanPriority {
    Low,
    Medium,
    High,
}

/// One day-labeled task in the weekly plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub day: String,
    pub task: String,
    pub priority: PlanPriority,
}

impl PlanEntry {
    fn new(day: &str, task: &str, priority: PlanPriority) -> Self {
        PlanEntry {
            day: day.to_string(),
            task: task.to_string(),
            priority,
        }
    }
}

/// Build the weekly plan for a severity tier.
///
/// `top_action` is the model's most urgent immediate action; blank or
/// missing actions fall back to the template's fixed first task. The
/// result is never empty for any tier, `Unknown` included.
pub fn synthesize_weekly_plan(severity: Severity, top_action: Option<&str>) -> Vec<PlanEntry> {
    let top_action = top_action
        .map(str::trim)
        .filter(|action| !action.is_empty());

    if severity.requires_crisis_plan() {
        crisis_plan(top_action)
    } else if severity == Severity::Healthy {
        maintenance_plan()
    } else {
        // Warning, Moderate and Unknown all get the attention plan
        attention_plan(top_action)
    }
}

fn crisis_plan(top_action: Option<&str>) -> Vec<PlanEntry> {
    vec![
        PlanEntry::new(
            "Hoy",
            top_action.unwrap_or("Aplicar tratamiento urgente"),
            PlanPriority::High,
        ),
        PlanEntry::new("Mañana", "Revisar progreso y síntomas", PlanPriority::High),
        PlanEntry::new(
            "En 3 días",
            "Segunda aplicación de tratamiento",
            PlanPriority::High,
        ),
        PlanEntry::new("En 5 días", "Evaluar efectividad", PlanPriority::Medium),
        PlanEntry::new(
            "En 7 días",
            "Fotografiar para comparar",
            PlanPriority::Medium,
        ),
    ]
}

fn attention_plan(top_action: Option<&str>) -> Vec<PlanEntry> {
    vec![
        PlanEntry::new(
            "Hoy",
            top_action.unwrap_or("Iniciar tratamiento"),
            PlanPriority::Medium,
        ),
        PlanEntry::new("En 2 días", "Regar según recomendado", PlanPriority::Medium),
        PlanEntry::new("En 4 días", "Aplicar fertilizante", PlanPriority::Low),
        PlanEntry::new("En 7 días", "Monitoreo de progreso", PlanPriority::Low),
    ]
}

fn maintenance_plan() -> Vec<PlanEntry> {
    vec![
        PlanEntry::new("Lunes", "Riego regular", PlanPriority::Low),
        PlanEntry::new("Miércoles", "Revisar hojas y tallo", PlanPriority::Low),
        PlanEntry::new("Viernes", "Fertilizar si corresponde", PlanPriority::Low),
        PlanEntry::new("Domingo", "Inspección general", PlanPriority::Low),
    ]
}
