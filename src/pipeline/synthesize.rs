//! Flashcard synthesis: one generation call, strict JSON recovery.
//!
//! ## Why is JSON recovery necessary?
//!
//! The prompt says "valid JSON only, no extra commentary", and the model
//! usually complies — wrapped in a ```json fence it was never asked for.
//! Sometimes the fence is missing, sometimes unbalanced, sometimes the JSON
//! sits in the middle of a polite sentence. Rather than substring-splitting
//! on fence markers, recovery runs three explicit, individually testable
//! steps, first match wins:
//!
//! 1. the interior of a fenced block labeled `json`;
//! 2. the first well-formed top-level JSON value, found by a string-aware
//!    brace scan;
//! 3. the whole response body.
//!
//! Whatever survives must parse into the `{"params": {"notes": […]}}`
//! envelope AND pass note-schema validation; anything less is a `Schema`
//! error carrying the raw response for diagnostics. Parse failures are
//! terminal for the run — no retry, no partial note salvage.

use crate::config::GenerationConfig;
use crate::error::Doc2AnkiError;
use crate::llm::{ContentPart, ModelCallError, ModelClient};
use crate::note::{NotePayload, PayloadEnvelope};
use crate::prompts::build_synthesis_prompt;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

/// Synthesize a validated note payload from extracted document text.
pub async fn synthesize(
    model: &dyn ModelClient,
    text: &str,
    config: &GenerationConfig,
) -> Result<NotePayload, Doc2AnkiError> {
    let prompt = build_synthesis_prompt(config.prompt, text);
    debug!(
        "Synthesis prompt: {} chars ({:?} variant)",
        prompt.len(),
        config.prompt
    );

    let response = model
        .generate(&config.text_model, &[ContentPart::Text(prompt)])
        .await
        .map_err(|e| match e {
            ModelCallError::Auth(detail) => Doc2AnkiError::Auth { detail },
            ModelCallError::Api(detail) => Doc2AnkiError::Synthesis { detail },
        })?;

    let payload = parse_payload(&response)?;
    info!(
        "Synthesized {} note(s) for deck '{}'",
        payload.notes.len(),
        payload.deck_name()
    );
    Ok(payload)
}

/// Recover, parse, and validate a note payload from a raw model response.
pub fn parse_payload(response: &str) -> Result<NotePayload, Doc2AnkiError> {
    let candidate = extract_json(response);

    let envelope: PayloadEnvelope =
        serde_json::from_str(candidate).map_err(|e| Doc2AnkiError::Schema {
            detail: format!("JSON parse failed: {e}"),
            raw_response: response.to_string(),
        })?;

    let payload = NotePayload::from(envelope);
    payload.validate().map_err(|detail| Doc2AnkiError::Schema {
        detail,
        raw_response: response.to_string(),
    })?;
    Ok(payload)
}

// ── JSON recovery steps ──────────────────────────────────────────────────

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)```").unwrap());

/// Apply the three recovery steps; the result still has to survive parsing.
fn extract_json(response: &str) -> &str {
    if let Some(interior) = fenced_json_block(response) {
        return interior;
    }
    if let Some(value) = first_top_level_json(response) {
        return value;
    }
    response
}

/// Step 1: the interior of the first ```json fence, if both markers exist.
fn fenced_json_block(response: &str) -> Option<&str> {
    RE_JSON_FENCE
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Step 2: the first balanced top-level JSON object or array.
///
/// The scan is string-aware: braces inside string literals (and escaped
/// quotes inside those strings) do not affect nesting depth.
fn first_top_level_json(response: &str) -> Option<&str> {
    let bytes = response.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{' || b == b'[')?;
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_NOTES: &str = r#"{"params": {"notes": [
        {"deckName": "Chem", "modelName": "AllInOne (kprim, mc, sc)",
         "fields": {"Question": "At what temperature does water boil? (From Content)",
                    "QType (0=kprim,1=mc,2=sc)": "2",
                    "Q_1": "100C", "Q_2": "50C", "Q_3": "", "Q_4": "", "Q_5": "",
                    "Answers": "1 0", "Sources": "Water boils at 100C.",
                    "Extra 1": "", "Title": "Boiling point"}},
        {"deckName": "Chem", "modelName": "AllInOne (kprim, mc, sc)",
         "fields": {"Question": "Which factor raises the boiling point? (AI-generated)",
                    "QType (0=kprim,1=mc,2=sc)": "1",
                    "Q_1": "Salt", "Q_2": "Stirring", "Q_3": "", "Q_4": "", "Q_5": "",
                    "Answers": "1 0", "Sources": "",
                    "Extra 1": "Dissolved salt elevates the boiling point.", "Title": "Elevation"}}
    ]}}"#;

    #[test]
    fn fenced_response_round_trips() {
        let response = format!("Here you go!\n```json\n{VALID_NOTES}\n```\nEnjoy.");
        let payload = parse_payload(&response).unwrap();
        assert_eq!(payload.notes.len(), 2);
        assert_eq!(payload.deck_name(), "Chem");
    }

    #[test]
    fn bare_json_body_round_trips() {
        let payload = parse_payload(VALID_NOTES).unwrap();
        assert_eq!(payload.notes.len(), 2);
    }

    #[test]
    fn unbalanced_fence_still_parses_via_brace_scan() {
        // Opening fence, no closing fence: step 1 fails, step 2 finds the value.
        let response = format!("```json\n{VALID_NOTES}");
        let payload = parse_payload(&response).unwrap();
        assert_eq!(payload.deck_name(), "Chem");
    }

    #[test]
    fn json_embedded_in_prose_is_recovered() {
        let response = format!("Sure — here are your flashcards: {VALID_NOTES} Let me know!");
        let payload = parse_payload(&response).unwrap();
        assert_eq!(payload.notes.len(), 2);
    }

    #[test]
    fn braces_inside_strings_do_not_break_the_scan() {
        let response = r#"{"params": {"notes": [
            {"deckName": "Sym{bols}", "modelName": "AllInOne (kprim, mc, sc)",
             "fields": {"Question": "What does \"{\" open? (From Content)",
                        "QType (0=kprim,1=mc,2=sc)": "2",
                        "Q_1": "A block", "Q_2": "A loop",
                        "Answers": "1 0", "Sources": "", "Extra 1": "", "Title": "t"}}
        ]}} trailing prose"#;
        let payload = parse_payload(response).unwrap();
        assert_eq!(payload.deck_name(), "Sym{bols}");
    }

    #[test]
    fn refusal_text_is_a_schema_error_with_raw_attached() {
        let err = parse_payload("I cannot generate flashcards from this.").unwrap_err();
        match err {
            Doc2AnkiError::Schema { raw_response, .. } => {
                assert!(raw_response.contains("cannot generate"));
            }
            other => panic!("expected Schema, got {other:?}"),
        }
    }

    #[test]
    fn valid_json_with_invalid_notes_is_a_schema_error() {
        let response = r#"{"params": {"notes": [
            {"deckName": "Chem", "modelName": "AllInOne (kprim, mc, sc)",
             "fields": {"Question": "Q?", "QType (0=kprim,1=mc,2=sc)": "9",
                        "Q_1": "a", "Q_2": "b", "Answers": "1 0",
                        "Sources": "", "Extra 1": "", "Title": "t"}}
        ]}}"#;
        let err = parse_payload(response).unwrap_err();
        match err {
            Doc2AnkiError::Schema { detail, .. } => assert!(detail.contains("QType")),
            other => panic!("expected Schema, got {other:?}"),
        }
    }

    #[test]
    fn empty_notes_array_is_a_schema_error() {
        let err = parse_payload(r#"{"params": {"notes": []}}"#).unwrap_err();
        assert!(matches!(err, Doc2AnkiError::Schema { .. }));
    }

    #[test]
    fn fence_extraction_prefers_the_labeled_block() {
        let response = "prose\n```json\n{\"a\": 1}\n```\nmore";
        assert_eq!(fenced_json_block(response).unwrap(), r#"{"a": 1}"#);
    }

    #[test]
    fn top_level_scan_returns_first_value_only() {
        let s = r#"x {"a": {"b": 2}} y {"c": 3}"#;
        assert_eq!(first_top_level_json(s).unwrap(), r#"{"a": {"b": 2}}"#);
    }

    #[test]
    fn top_level_scan_handles_arrays() {
        let s = r#"take [1, {"a": 2}, 3] please"#;
        assert_eq!(first_top_level_json(s).unwrap(), r#"[1, {"a": 2}, 3]"#);
    }

    #[test]
    fn top_level_scan_gives_up_on_unclosed_value() {
        assert!(first_top_level_json(r#"{"a": 1"#).is_none());
    }
}
