//! Markdown code-fence stripping
//!
//! Vision models regularly wrap the JSON they were told not to wrap in
//! markdown fences. This module removes them in a single pass:
//! - ```json fence: take everything between the marker and the next fence
//! - bare ``` fence: take the first fenced block
//! - missing closing fence: take everything after the opening marker
//! - no fence: return the input untouched

const JSON_FENCE: &str = "```json";
const BARE_FENCE: &str = "```";

/// Remove markdown code fences around a model reply, returning the
/// enclosed body trimmed of surrounding whitespace.
///
/// The ```json marker wins over a bare fence wherever it appears; an
/// unterminated fence yields everything after the opening marker.
///
/// # Arguments
/// * `text` - Raw model reply, possibly fenced
///
/// # Returns
/// Borrowed slice of the body with fences removed
pub fn strip_code_fences(text: &str) -> &str {
    if let Some(open) = text.find(JSON_FENCE) {
        let body = &text[open + JSON_FENCE.len()..];
        let body = match body.find(BARE_FENCE) {
            Some(close) => &body[..close],
            None => body,
        };
        return body.trim();
    }

    if let Some(open) = text.find(BARE_FENCE) {
        let body = &text[open + BARE_FENCE.len()..];
        let body = match body.find(BARE_FENCE) {
            Some(close) => &body[..close],
            None => body,
        };
        return body.trim();
    }

    text.trim()
}
