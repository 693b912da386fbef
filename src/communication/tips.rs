//! Educational tip pools
//!
//! One fixed pool of three tips per expertise tier. Selection picks
//! two at random without replacement; a seeded generator keeps the
//! choice deterministic under test.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::communication::ExpertiseTier;

/// Tips attached to each adapted diagnosis
pub const TIPS_PER_DIAGNOSIS: usize = 2;

const BEGINNER_TIPS: [&str; 3] = [
    "💡 Tip: Toma fotos con luz natural para mejores diagnósticos",
    "📚 Aprende: El riego depende del tipo de planta y clima",
    "🌡️ Importante: La temperatura afecta el crecimiento de las plantas",
];

const INTERMEDIATE_TIPS: [&str; 3] = [
    "💡 Tip: Observa el envés de las hojas para detectar plagas",
    "📊 Dato: El pH ideal varía entre 6.0-7.0 para la mayoría de plantas",
    "🔄 Recuerda: Rota tus plantas cada semana para crecimiento uniforme",
];

const EXPERT_TIPS: [&str; 3] = [
    "🔬 Avanzado: Considera análisis de suelo para diagnóstico preciso",
    "📈 Dato: Lleva registro de fertilización para optimizar nutrición",
    "🌐 Recurso: Consulta índices especializados de plagas en tu región",
];

/// Fixed tip pool for a tier
pub fn pool(tier: ExpertiseTier) -> &'static [&'static str] {
    match tier {
        ExpertiseTier::Beginner => &BEGINNER_TIPS,
        ExpertiseTier::Intermediate => &INTERMEDIATE_TIPS,
        ExpertiseTier::Expert => &EXPERT_TIPS,
    }
}

/// Pick tips for a tier without replacement. Always non-empty; at
/// most [`TIPS_PER_DIAGNOSIS`] entries.
pub fn select(rng: &mut StdRng, tier: ExpertiseTier) -> Vec<String> {
    pool(tier)
        .choose_multiple(rng, TIPS_PER_DIAGNOSIS)
        .map(|tip| tip.to_string())
        .collect()
}
