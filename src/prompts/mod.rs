//! Prompt library for the remote vision and text models
//!
//! Pure data: fixed Spanish prompt templates instructing the model to
//! answer in a strict JSON shape. Builders only concatenate; nothing
//! here talks to the network or holds state.

/// Header under which caller-reported symptoms are appended verbatim
/// to the diagnosis prompt.
const SYMPTOM_HEADER: &str = "SÍNTOMAS ADICIONALES REPORTADOS POR EL USUARIO:";

const PHOTO_VALIDATION_PROMPT: &str = r#"Eres un asistente de fotografía especializado en plantas.
Analiza esta imagen y determina si la planta está correctamente centrada y lista para un diagnóstico preciso.

CRITERIOS DE EVALUACIÓN:
1. **Centrado**: La planta debe ocupar al menos el 60% del área central de la imagen
2. **Visibilidad**: La planta debe estar completamente visible, sin partes cortadas importantes
3. **Enfoque**: El enfoque debe estar en la planta, no en el fondo
4. **Iluminación**: La iluminación debe ser adecuada (ni sobreexpuesta ni subexpuesta)
5. **Distancia**: La distancia debe permitir ver detalles (ni muy cerca ni muy lejos)

RESPONDE ESTRICTAMENTE EN FORMATO JSON (sin markdown, sin texto adicional):
{
    "is_centered": true/false,
    "confidence": 0.85,
    "plant_detected": true/false,
    "issues": ["lista de problemas detectados"],
    "recommendations": {
        "direction": "center/up/down/left/right",
        "distance": "closer/farther/ok",
        "lighting": "more_light/less_light/ok",
        "focus": "refocus/ok"
    },
    "voice_guidance": "Mensaje de máximo 15 palabras en español para guiar al usuario"
}

EJEMPLOS DE VOICE GUIDANCE según el problema:
- Si planta está arriba: "Mueve la cámara un poco hacia arriba"
- Si planta está abajo: "Baja la cámara un poco"
- Si está a la izquierda: "Mueve la cámara hacia la izquierda"
- Si está a la derecha: "Mueve la cámara hacia la derecha"
- Si muy lejos: "Acércate más a la planta"
- Si muy cerca: "Aléjate un poco de la planta"
- Si poca luz: "Busca un lugar con más luz"
- Si mucha luz: "Evita la luz directa del sol"
- Si desenfocada: "Toca la pantalla para enfocar la planta"
- Si está bien: "Perfecto, la planta está bien encuadrada"

IMPORTANTE:
- Sé conciso en el mensaje de voz
- Prioriza el problema más importante
- Usa lenguaje simple y directo
- La confianza debe reflejar qué tan seguro estás del análisis
"#;

const DIAGNOSIS_PROMPT: &str = r#"Eres un botánico experto especializado en el diagnóstico de enfermedades y problemas en plantas.
Analiza esta imagen de planta y proporciona un diagnóstico detallado, preciso y accionable.

ANÁLISIS REQUERIDO:
1. **Identificación**: Determina la especie de la planta
2. **Salud general**: Evalúa el estado general (0-100%)
3. **Problemas**: Identifica enfermedades, plagas o deficiencias
4. **Síntomas**: Lista los síntomas visibles específicos
5. **Causas**: Determina las posibles causas de los problemas
6. **Acciones inmediatas**: Plan de acción prioritizado
7. **Cuidado a largo plazo**: Recomendaciones de mantenimiento

RESPONDE ESTRICTAMENTE EN FORMATO JSON (sin markdown, sin código adicional):
{
    "species": {
        "name": "Nombre común en español",
        "scientific_name": "Nombre científico",
        "confidence": 0.0-1.0
    },
    "health_score": 0-100,
    "status": "healthy/warning/critical",
    "issues": [
        {
            "type": "disease/pest/deficiency/environmental",
            "name": "Nombre específico del problema",
            "severity": "low/medium/high",
            "confidence": 0.0-1.0,
            "description": "Descripción detallada del problema"
        }
    ],
    "symptoms": [
        "Lista detallada de síntomas visibles en la imagen"
    ],
    "causes": [
        "Posibles causas de cada problema identificado"
    ],
    "immediate_actions": [
        {
            "priority": 1-5,
            "action": "Acción específica y clara a tomar",
            "urgency": "immediate/today/this_week"
        }
    ],
    "long_term_care": {
        "watering": "Frecuencia específica y cantidad recomendada",
        "light": "Tipo de luz y horas recomendadas",
        "fertilizer": "Tipo de fertilizante y frecuencia",
        "temperature": "Rango de temperatura óptimo en °C",
        "humidity": "Nivel de humedad recomendado (%)"
    },
    "summary": "Resumen ejecutivo del diagnóstico en 2-3 frases máximo",
    "empathetic_message": "Mensaje motivador y empático para animar al usuario a cuidar su planta"
}

GUÍAS DE CALIDAD:
- Sé específico: Di "regar cada 3 días con 200ml" en vez de "regar regularmente"
- Sé práctico: Recomienda acciones que el usuario promedio puede hacer
- Sé honesto: Si no estás seguro, refleja baja confianza
- Sé empático: El mensaje debe motivar, no desanimar
- Prioriza: Ordena las acciones por urgencia real
- Sé completo: Incluye toda la información relevante visible en la imagen

VALORES DE HEALTH SCORE:
- 90-100: Planta excelente, sin problemas visibles
- 70-89: Planta saludable con problemas menores
- 50-69: Planta con problemas moderados, necesita atención
- 30-49: Planta enferma, requiere acción urgente
- 0-29: Planta en estado crítico

IMPORTANTE:
- NO uses markdown en el JSON
- NO agregues comentarios en el JSON
- Asegúrate de que el JSON sea válido y parseable
- Todos los textos deben estar en español
"#;

/// Builders for every prompt the pipeline sends to the remote model.
pub struct PromptLibrary;

impl PromptLibrary {
    /// Prompt asking the model to judge framing, focus and lighting
    /// before an expensive diagnosis call.
    pub fn photo_validation() -> &'static str {
        PHOTO_VALIDATION_PROMPT
    }

    /// Full diagnosis prompt. Caller-reported symptoms, when present,
    /// are appended verbatim under a fixed header.
    ///
    /// # Arguments
    /// * `symptoms` - Free-form symptom text reported by the user
    pub fn diagnosis(symptoms: Option<&str>) -> String {
        match symptoms {
            Some(text) if !text.trim().is_empty() => {
                format!("{}\n\n{} {}", DIAGNOSIS_PROMPT, SYMPTOM_HEADER, text)
            }
            _ => DIAGNOSIS_PROMPT.to_string(),
        }
    }

    /// Follow-up prompt comparing a new photo against an earlier
    /// diagnosis. `previous` is a pre-rendered block describing the
    /// earlier result (summary, health score, severity).
    pub fn follow_up(previous: &str) -> String {
        format!(
            r#"Eres un botánico experto. Esta es una foto de SEGUIMIENTO de una planta
que previamente diagnosticaste con los siguientes problemas:

DIAGNÓSTICO ANTERIOR:
{previous}

TAREA:
Analiza la nueva imagen y compara el estado actual con el diagnóstico anterior.

DETERMINA:
1. ¿Han mejorado los síntomas identificados anteriormente?
2. ¿Hay nuevos problemas que no estaban antes?
3. ¿Las acciones recomendadas están siendo efectivas?
4. ¿Qué ajustes se necesitan en el plan de cuidado?
5. ¿Cuál es el progreso general de la recuperación?

RESPONDE EN EL MISMO FORMATO JSON que un diagnóstico normal, pero AGREGA la sección "comparison":

{{
    ... (todos los campos del diagnóstico normal),
    "comparison": {{
        "improvement_percentage": 0-100,
        "trend": "improving/stable/declining",
        "new_issues": ["lista de problemas nuevos no vistos antes"],
        "resolved_issues": ["lista de problemas que ya no están presentes"],
        "persistent_issues": ["lista de problemas que continúan"],
        "progress_summary": "Resumen del progreso en 2-3 frases"
    }}
}}

IMPORTANTE:
- Sé honesto sobre el progreso, positivo pero realista
- Si el usuario está haciendo bien, celébralo y motívalo
- Si algo no funciona, sugiere alternativas constructivas
- Mantén el tono empático y motivador
"#
        )
    }

    /// Quick care-tips prompt for a named plant, answered by the text
    /// model.
    pub fn quick_tips(plant_type: &str) -> String {
        format!(
            r#"Eres un experto en jardinería. Proporciona consejos rápidos y prácticos
sobre el cuidado de: {plant_type}

Responde en formato JSON:
{{
    "plant_name": "Nombre común y científico",
    "quick_tips": [
        "5-7 consejos concisos y accionables"
    ],
    "common_mistakes": [
        "3-5 errores comunes que los principiantes cometen"
    ],
    "difficulty": "easy/medium/hard"
}}
"#
        )
    }

    /// One-word moderation prompt for community text. The model is
    /// expected to answer APROPIADO or INAPROPIADO.
    pub fn moderation(text: &str) -> String {
        format!(
            r#"Eres un moderador de contenido para una comunidad de jardinería.
Analiza si el siguiente texto es apropiado (sin spam, insultos, contenido ofensivo, o información peligrosa).

TEXTO A MODERAR:
{text}

Responde SOLO con una palabra: APROPIADO o INAPROPIADO"#
        )
    }
}
