//! Persona prompt for the conversation engine
//!
//! The built-in prompt can be replaced by a file so the wording can change
//! without a rebuild. It is loaded once at startup.

use std::path::Path;

/// Base system prompt establishing the companion's role
const BASE_PROMPT: &str = "Eres un asistente emocional empático. Estás diseñado para apoyar a \
estudiantes universitarios que enfrentan estrés, ansiedad, tristeza o sobrecarga académica. \
Responde con amabilidad, escucha activa, sin emitir juicios, ni brindar diagnósticos clínicos.";

/// Load the persona prompt from `path`, or the built-in one when `None`.
/// A file that is empty after trimming falls back to the built-in prompt.
pub fn load_system_prompt(path: Option<&Path>) -> std::io::Result<String> {
    let Some(path) = path else {
        return Ok(BASE_PROMPT.to_string());
    };

    let content = std::fs::read_to_string(path)?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        tracing::warn!(path = %path.display(), "System prompt file is empty, using built-in prompt");
        return Ok(BASE_PROMPT.to_string());
    }
    Ok(trimmed.to_string())
}
