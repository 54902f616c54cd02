//! Instruction templates for image description and flashcard synthesis.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the schema instructions or the
//!    grounding rules requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the assembled prompt directly
//!    without a live model, making template regressions easy to catch.
//!
//! The synthesis template exists in two variants selected by
//! [`crate::config::PromptVariant`]: the grounded variant demands provenance
//! tags on every question; the simple variant omits them. Both demand the
//! same JSON output shape, which must parse into
//! [`crate::note::NotePayload`].

use crate::config::PromptVariant;

/// Instruction sent with each image batch to the vision model.
pub const DESCRIBE_IMAGES_INSTRUCTION: &str = "Explain the images in detail";

/// The JSON shape both synthesis variants demand, shown to the model as a
/// literal example. `params.notes` mirrors the AnkiConnect `addNotes` body.
const OUTPUT_FORMAT_EXAMPLE: &str = r#"```json
{
  "params": {
    "notes": [
      {
        "deckName": "<suitable deck name>",
        "modelName": "AllInOne (kprim, mc, sc)",
        "fields": {
          "Question": "your question here",
          "QType (0=kprim,1=mc,2=sc)": "2",
          "Q_1": "Option 1",
          "Q_2": "Option 2",
          "Q_3": "Option 3",
          "Q_4": "",
          "Q_5": "",
          "Answers": "1 0 0",
          "Sources": "Relevant content snippet, or empty",
          "Extra 1": "Explanation, or empty",
          "Title": "Short card title"
        }
      }
    ]
  }
}
```"#;

/// Synthesis instruction requiring provenance tags on every question.
pub const GROUNDED_SYSTEM_PROMPT: &str = r#"You are an expert assistant for generating high-quality Anki flashcards from input text.

Your task:
- Read the input content and generate a balanced set of flashcards.
- Include both:
  1. Questions taken directly from the input content (clearly marked as "From Content").
  2. Related questions inferred by you that are relevant but not directly present in the text (clearly marked as "AI-generated"). Do not generate AI questions if unsure.
- Ensure AI-generated questions are grounded, educational, and do not speculate.

Requirements:
- Avoid hallucination — keep AI-generated content clearly connected to the source topic.
- Avoid giving away the correct answer by making it much longer or more specific than the incorrect options. Keep all options similar in tone and length.
- Always cite the relevant text snippet from the content in the `Sources` field for "From Content" questions.
- For AI-generated questions, include a brief explanation in the `Extra 1` field justifying the correct answer.
- If no meaningful AI-generated question can be made, skip it — don't guess.
- Use simple, clear, and concise language. Add examples where helpful.

Format:
- `Question`: the actual question, ending with either "(From Content)" or "(AI-generated)"
- `QType (0=kprim,1=mc,2=sc)`: use "1" or "2" as a string
- `Q_1` to `Q_5`: answer options (min. 2, max. 5)
- `Answers`: a string like "1 0 0 0 0" marking correct answers, one marker per populated option
- `Sources`: paste the part of the content that inspired the question (or leave blank if AI-generated)
- `Extra 1`: leave blank for "From Content", or add explanation if "AI-generated"
- `Title`: short and meaningful for the card

Final output must be valid JSON only, no extra commentary."#;

/// Synthesis instruction without the provenance requirement.
pub const SIMPLE_SYSTEM_PROMPT: &str = r#"You are an expert assistant for generating high-quality Anki flashcards from input text.

Your task:
- Read the input content and generate a balanced set of flashcards covering its key facts and ideas.
- Use simple, clear, and concise language. Add examples where helpful.
- Avoid giving away the correct answer by making it much longer or more specific than the incorrect options. Keep all options similar in tone and length.

Format:
- `Question`: the actual question
- `QType (0=kprim,1=mc,2=sc)`: use "1" or "2" as a string
- `Q_1` to `Q_5`: answer options (min. 2, max. 5)
- `Answers`: a string like "1 0 0 0 0" marking correct answers, one marker per populated option
- `Sources`: the part of the content the question came from, or empty
- `Extra 1`: optional explanation of the correct answer
- `Title`: short and meaningful for the card

Final output must be valid JSON only, no extra commentary."#;

/// Assemble the full synthesis prompt for one run: instruction template,
/// output-shape example, and the literal extracted text.
///
/// The whole document goes into one prompt — no chunking. Extremely long
/// documents risk model-side truncation; that is an accepted constraint of
/// the design, surfaced as a `Schema` error when the response is cut off
/// mid-JSON.
pub fn build_synthesis_prompt(variant: PromptVariant, text: &str) -> String {
    let instruction = match variant {
        PromptVariant::Grounded => GROUNDED_SYSTEM_PROMPT,
        PromptVariant::Simple => SIMPLE_SYSTEM_PROMPT,
    };
    format!(
        "{instruction}\n\n{OUTPUT_FORMAT_EXAMPLE}\n\nNow generate flashcards from the following text:\n\n{text}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grounded_prompt_demands_provenance() {
        let prompt = build_synthesis_prompt(PromptVariant::Grounded, "some text");
        assert!(prompt.contains("(From Content)"));
        assert!(prompt.contains("(AI-generated)"));
        assert!(prompt.contains("some text"));
    }

    #[test]
    fn simple_prompt_omits_provenance() {
        let prompt = build_synthesis_prompt(PromptVariant::Simple, "some text");
        assert!(!prompt.contains("(From Content)"));
        assert!(!prompt.contains("AI-generated"));
        assert!(prompt.contains("some text"));
    }

    #[test]
    fn both_variants_show_the_schema_example() {
        for variant in [PromptVariant::Grounded, PromptVariant::Simple] {
            let prompt = build_synthesis_prompt(variant, "");
            assert!(prompt.contains(r#""params""#));
            assert!(prompt.contains("AllInOne (kprim, mc, sc)"));
            assert!(prompt.contains("QType (0=kprim,1=mc,2=sc)"));
        }
    }

    #[test]
    fn text_is_embedded_literally_at_the_end() {
        let prompt = build_synthesis_prompt(PromptVariant::Grounded, "α β <html> {json}");
        assert!(prompt.ends_with("α β <html> {json}"));
    }
}
