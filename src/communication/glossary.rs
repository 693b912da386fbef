//! Technical-term glossary
//!
//! Maps each plant-care term to the surface form each expertise tier
//! should read. Matching is case-insensitive on whole terms; an
//! occurrence that already carries its gloss is left untouched, so the
//! rewrite is safe to apply twice.

use crate::communication::ExpertiseTier;

/// One technical term and its per-tier surface forms
#[derive(Debug, Clone, Copy)]
pub struct GlossaryEntry {
    /// Bare technical term, as experts read it
    pub term: &'static str,
    /// Plain-language gloss shown to beginners
    pub beginner: &'static str,
    /// Term plus parenthetical gloss shown to intermediates
    pub intermediate: &'static str,
}

impl GlossaryEntry {
    /// Surface form of this term for the given tier
    pub fn surface_form(&self, tier: ExpertiseTier) -> &'static str {
        match tier {
            ExpertiseTier::Beginner => self.beginner,
            ExpertiseTier::Intermediate => self.intermediate,
            ExpertiseTier::Expert => self.term,
        }
    }
}

/// Plant-care terms the adapter knows how to rewrite
pub const GLOSSARY: [GlossaryEntry; 8] = [
    GlossaryEntry {
        term: "clorosis",
        beginner: "hojas amarillas (falta de nutrientes)",
        intermediate: "clorosis (hojas amarillas por falta de nutrientes)",
    },
    GlossaryEntry {
        term: "necrosis",
        beginner: "manchas marrones o negras (tejido muerto)",
        intermediate: "necrosis (muerte del tejido de la hoja)",
    },
    GlossaryEntry {
        term: "antracnosis",
        beginner: "manchas oscuras en hojas (enfermedad por hongos)",
        intermediate: "antracnosis (infección fúngica)",
    },
    GlossaryEntry {
        term: "mildiu",
        beginner: "polvo blanco en hojas (hongos por humedad)",
        intermediate: "mildiu (hongo causado por alta humedad)",
    },
    GlossaryEntry {
        term: "pH del suelo",
        beginner: "acidez de la tierra",
        intermediate: "pH del suelo (nivel de acidez)",
    },
    GlossaryEntry {
        term: "fertilizante NPK",
        beginner: "abono con nitrógeno, fósforo y potasio",
        intermediate: "fertilizante NPK (nitrógeno, fósforo, potasio)",
    },
    GlossaryEntry {
        term: "poda apical",
        beginner: "cortar la punta de la planta",
        intermediate: "poda apical (corte de la punta principal)",
    },
    GlossaryEntry {
        term: "fotosíntesis",
        beginner: "proceso de producción de alimento de la planta",
        intermediate: "fotosíntesis (proceso de producción de energía)",
    },
];

/// Rewrite every known technical term in `text` to the surface form
/// for `tier`. Everything around the terms is preserved.
pub fn rewrite_terms(text: &str, tier: ExpertiseTier) -> String {
    let mut rewritten = text.to_string();

    for entry in &GLOSSARY {
        let replacement = entry.surface_form(tier);
        if replacement == entry.term {
            // Experts keep the bare term with its original casing
            continue;
        }
        rewritten = replace_term(&rewritten, entry.term, replacement);
    }

    rewritten
}

fn replace_term(text: &str, term: &str, replacement: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let term_chars: Vec<char> = term.chars().collect();
    let replacement_chars: Vec<char> = replacement.chars().collect();

    let mut rewritten = String::with_capacity(text.len() + replacement.len());
    let mut i = 0;

    while i < chars.len() {
        // An occurrence already carrying the gloss passes through,
        // which keeps the rewrite idempotent.
        if let Some(end) = match_at(&chars, i, &replacement_chars) {
            if is_whole_match(&chars, i, end) {
                rewritten.extend(chars[i..end].iter());
                i = end;
                continue;
            }
        }

        if let Some(end) = match_at(&chars, i, &term_chars) {
            if is_whole_match(&chars, i, end) {
                rewritten.push_str(replacement);
                i = end;
                continue;
            }
        }

        rewritten.push(chars[i]);
        i += 1;
    }

    rewritten
}

/// Case-insensitive match of `needle` at `start`; returns the end index
fn match_at(chars: &[char], start: usize, needle: &[char]) -> Option<usize> {
    let end = start.checked_add(needle.len())?;
    if end > chars.len() {
        return None;
    }

    let matched = chars[start..end]
        .iter()
        .zip(needle)
        .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()));
    matched.then_some(end)
}

/// Neither neighbor may continue a word
fn is_whole_match(chars: &[char], start: usize, end: usize) -> bool {
    let left_ok = start == 0 || !chars[start - 1].is_alphanumeric();
    let right_ok = end == chars.len() || !chars[end].is_alphanumeric();
    left_ok && right_ok
}
