//! The note payload: the unit of output delivered to Anki.
//!
//! Field names here are the *external* AnkiConnect shape, bit-for-bit: the
//! note template ("model" in Anki terms) defines its field keys, including
//! the awkward `"QType (0=kprim,1=mc,2=sc)"` and `"Extra 1"`, and the store
//! silently drops anything it does not recognise. All serde renames in this
//! module are therefore contract, not style.
//!
//! Validation lives here too: the synthesizer guarantees only *structural*
//! validity of what it forwards (the question text may still be nonsense),
//! and [`NotePayload::validate`] is that guarantee.

use serde::{Deserialize, Serialize};

/// The fixed note template the destination deck uses.
///
/// Every generated note names this template; a deck whose Anki profile lacks
/// the "AllInOne (kprim, mc, sc)" note type will reject the whole payload.
pub const NOTE_MODEL_NAME: &str = "AllInOne (kprim, mc, sc)";

/// The per-note field set of the AllInOne template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFields {
    #[serde(rename = "Question")]
    pub question: String,

    /// "0" = kprim, "1" = multiple choice, "2" = single choice. A string,
    /// not a number — the template stores it as text.
    #[serde(rename = "QType (0=kprim,1=mc,2=sc)")]
    pub qtype: String,

    #[serde(rename = "Q_1", default)]
    pub q_1: String,
    #[serde(rename = "Q_2", default)]
    pub q_2: String,
    #[serde(rename = "Q_3", default)]
    pub q_3: String,
    #[serde(rename = "Q_4", default)]
    pub q_4: String,
    #[serde(rename = "Q_5", default)]
    pub q_5: String,

    /// Space-separated binary markers, one per populated option, e.g. "1 0 0".
    #[serde(rename = "Answers")]
    pub answers: String,

    /// Source snippet the question was derived from. May be empty.
    #[serde(rename = "Sources", default)]
    pub sources: String,

    /// Free-form explanation field. May be empty.
    #[serde(rename = "Extra 1", default)]
    pub extra_1: String,

    #[serde(rename = "Title", default)]
    pub title: String,
}

impl NoteFields {
    /// The option strings that are actually populated (non-blank), in order.
    pub fn populated_options(&self) -> Vec<&str> {
        [&self.q_1, &self.q_2, &self.q_3, &self.q_4, &self.q_5]
            .into_iter()
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
            .collect()
    }

    /// Check this note's fields against the template's structural rules.
    fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("note has an empty Question".into());
        }
        if !matches!(self.qtype.as_str(), "0" | "1" | "2") {
            return Err(format!(
                "QType must be \"0\", \"1\" or \"2\", got {:?}",
                self.qtype
            ));
        }
        let options = self.populated_options();
        if options.len() < 2 {
            return Err(format!(
                "note needs at least 2 answer options, got {}",
                options.len()
            ));
        }
        let markers: Vec<&str> = self.answers.split_whitespace().collect();
        if markers.len() != options.len() {
            return Err(format!(
                "Answers has {} markers but {} options are populated",
                markers.len(),
                options.len()
            ));
        }
        if let Some(bad) = markers.iter().find(|m| !matches!(**m, "0" | "1")) {
            return Err(format!("Answers markers must be 0 or 1, got {:?}", bad));
        }
        Ok(())
    }
}

/// One flashcard, in the external AnkiConnect note shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardNote {
    pub deck_name: String,
    pub model_name: String,
    pub fields: NoteFields,
}

/// The ordered set of notes from one synthesis call, submitted atomically.
///
/// The deck name is taken from the first note and implicitly applies to the
/// whole payload — the destination deck is created (idempotently) before
/// submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePayload {
    pub notes: Vec<FlashcardNote>,
}

/// The JSON envelope the synthesis prompt mandates: `{"params": {"notes": […]}}`.
///
/// This mirrors the AnkiConnect `addNotes` request body so a well-behaved
/// model response can be forwarded with no reshaping.
#[derive(Debug, Deserialize)]
pub(crate) struct PayloadEnvelope {
    pub params: PayloadParams,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PayloadParams {
    pub notes: Vec<FlashcardNote>,
}

impl NotePayload {
    /// The destination deck, taken from the first note.
    pub fn deck_name(&self) -> &str {
        &self.notes[0].deck_name
    }

    /// Validate the payload's structure: at least one note, a usable deck
    /// name, and every note well-formed per the template rules.
    pub fn validate(&self) -> Result<(), String> {
        if self.notes.is_empty() {
            return Err("payload contains no notes".into());
        }
        if self.notes[0].deck_name.trim().is_empty() {
            return Err("first note has an empty deckName".into());
        }
        for (i, note) in self.notes.iter().enumerate() {
            note.fields
                .validate()
                .map_err(|detail| format!("note {}: {}", i + 1, detail))?;
        }
        Ok(())
    }
}

impl From<PayloadEnvelope> for NotePayload {
    fn from(envelope: PayloadEnvelope) -> Self {
        NotePayload {
            notes: envelope.params.notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> NoteFields {
        NoteFields {
            question: "At what temperature does water boil? (From Content)".into(),
            qtype: "2".into(),
            q_1: "100C".into(),
            q_2: "50C".into(),
            q_3: String::new(),
            q_4: String::new(),
            q_5: String::new(),
            answers: "1 0".into(),
            sources: "Water boils at 100C.".into(),
            extra_1: String::new(),
            title: "Boiling point".into(),
        }
    }

    fn sample_note() -> FlashcardNote {
        FlashcardNote {
            deck_name: "Chem".into(),
            model_name: NOTE_MODEL_NAME.into(),
            fields: sample_fields(),
        }
    }

    #[test]
    fn serializes_external_field_names() {
        let json = serde_json::to_value(sample_note()).unwrap();
        assert_eq!(json["deckName"], "Chem");
        assert_eq!(json["modelName"], NOTE_MODEL_NAME);
        assert_eq!(json["fields"]["QType (0=kprim,1=mc,2=sc)"], "2");
        assert_eq!(json["fields"]["Extra 1"], "");
        assert_eq!(json["fields"]["Q_1"], "100C");
    }

    #[test]
    fn envelope_parses_and_converts() {
        let raw = r#"{"params": {"notes": [
            {"deckName": "Bio", "modelName": "AllInOne (kprim, mc, sc)",
             "fields": {"Question": "Q? (From Content)", "QType (0=kprim,1=mc,2=sc)": "1",
                        "Q_1": "a", "Q_2": "b", "Q_3": "c", "Q_4": "", "Q_5": "",
                        "Answers": "1 1 0", "Sources": "s", "Extra 1": "", "Title": "t"}}
        ]}}"#;
        let envelope: PayloadEnvelope = serde_json::from_str(raw).unwrap();
        let payload = NotePayload::from(envelope);
        assert_eq!(payload.notes.len(), 1);
        assert_eq!(payload.deck_name(), "Bio");
        payload.validate().unwrap();
    }

    #[test]
    fn missing_optional_fields_default_to_empty() {
        let raw = r#"{"Question": "Q?", "QType (0=kprim,1=mc,2=sc)": "2",
                      "Q_1": "a", "Q_2": "b", "Answers": "1 0"}"#;
        let fields: NoteFields = serde_json::from_str(raw).unwrap();
        assert_eq!(fields.sources, "");
        assert_eq!(fields.q_5, "");
        fields.validate().unwrap();
    }

    #[test]
    fn rejects_unknown_qtype() {
        let mut fields = sample_fields();
        fields.qtype = "3".into();
        let err = fields.validate().unwrap_err();
        assert!(err.contains("QType"), "got: {err}");
    }

    #[test]
    fn rejects_single_option() {
        let mut fields = sample_fields();
        fields.q_2 = String::new();
        fields.answers = "1".into();
        let err = fields.validate().unwrap_err();
        assert!(err.contains("at least 2"), "got: {err}");
    }

    #[test]
    fn rejects_marker_count_mismatch() {
        let mut fields = sample_fields();
        fields.answers = "1 0 0".into();
        let err = fields.validate().unwrap_err();
        assert!(err.contains("2 options"), "got: {err}");
    }

    #[test]
    fn rejects_non_binary_markers() {
        let mut fields = sample_fields();
        fields.answers = "1 x".into();
        let err = fields.validate().unwrap_err();
        assert!(err.contains("0 or 1"), "got: {err}");
    }

    #[test]
    fn payload_rejects_blank_deck_name() {
        let mut note = sample_note();
        note.deck_name = "  ".into();
        let payload = NotePayload { notes: vec![note] };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn options_count_ignores_blanks_in_the_middle() {
        let mut fields = sample_fields();
        fields.q_2 = String::new();
        fields.q_3 = "50C".into();
        assert_eq!(fields.populated_options(), vec!["100C", "50C"]);
        fields.validate().unwrap();
    }
}
