//! Speaker-notes enhancement: structured talking points rewritten into a
//! script a presenter can read aloud.
//!
//! Works on the raw checkpoint JSON so fields this crate does not model
//! survive the rewrite.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::models::enums::SpeakerStyle;
use crate::models::plan::SpeakerNotes;
use crate::pipeline::generation::TextClient;

/// Slide content passed to the model as context is cut to this many chars.
const CONTEXT_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum NotesError {
    #[error("Checkpoint not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid checkpoint format: {0}")]
    InvalidCheckpoint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn system_prompt(style: SpeakerStyle) -> &'static str {
    match style {
        SpeakerStyle::Conversational => {
            "You write speaker scripts in a relaxed first-person voice. Short sentences, \
direct address (\"here's the thing\"), the occasional parenthetical aside, no filler. \
Return only the script."
        }
        SpeakerStyle::Generic => {
            "You write clear, professional speaker scripts for conference talks. \
Return only the script."
        }
    }
}

/// User message describing one slide's notes.
pub fn narrative_request(title: &str, content: &str, notes: &SpeakerNotes) -> String {
    let context: String = content.chars().take(CONTEXT_CHARS).collect();
    let points = notes
        .talking_points
        .iter()
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "# Speaker notes for: {title}\n\n\
## Talking points\n{points}\n\n\
## Key terms to emphasize\n{terms}\n\n\
## Transition\n{transition}\n\n\
## Slide content\n{context}\n\n\
## Duration: {duration} minutes\n\n\
---\n\n\
Rewrite the talking points as a script the speaker can read aloud. Work the key terms in \
naturally, fit the {duration}-minute slot, and end with the transition.",
        terms = notes.key_terms.join(", "),
        transition = notes.transition,
        duration = notes.duration_minutes,
    )
}

/// Deterministic script built from the notes alone.
pub fn fallback_narrative(title: &str, notes: &SpeakerNotes) -> String {
    let mut parts = vec![format!("## {title}\n")];
    let points: Vec<String> = notes
        .talking_points
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.ends_with(['.', '!', '?']) {
                p.to_string()
            } else {
                format!("{p}.")
            }
        })
        .collect();
    parts.push(points.join("\n\n"));
    if !notes.key_terms.is_empty() {
        parts.push(format!("\n**Key terms to emphasize:** {}", notes.key_terms.join(", ")));
    }
    if !notes.transition.is_empty() {
        parts.push(format!("\n**Transition to next slide:** {}", notes.transition));
    }
    parts.push(format!("\n*(Estimated time: {} minutes)*", notes.duration_minutes));
    parts.join("\n")
}

/// Ask the model for a script; fall back to the deterministic one on failure.
pub fn narrate(
    client: &dyn TextClient,
    style: SpeakerStyle,
    title: &str,
    content: &str,
    notes: &SpeakerNotes,
) -> String {
    let request = narrative_request(title, content, notes);
    match client.complete_text(Some(system_prompt(style)), &request, false) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            tracing::warn!(title, "Empty narrative from model, using fallback");
            fallback_narrative(title, notes)
        }
        Err(e) => {
            tracing::warn!(title, error = %e, "Narrative generation failed, using fallback");
            fallback_narrative(title, notes)
        }
    }
}

/// Add `speaker_notes_narrative` to every section with talking points.
///
/// The structured notes are kept. The file is rewritten only when at least
/// one section changed. Returns the number of sections enhanced.
pub fn enhance_speaker_notes(
    checkpoint_path: &Path,
    client: &dyn TextClient,
    style: SpeakerStyle,
) -> Result<usize, NotesError> {
    if !checkpoint_path.is_file() {
        return Err(NotesError::NotFound(checkpoint_path.to_path_buf()));
    }
    let _span = tracing::info_span!("enhance_notes", path = %checkpoint_path.display(), style = %style).entered();

    let raw = std::fs::read_to_string(checkpoint_path)?;
    let mut checkpoint: Value = serde_json::from_str(&raw)?;

    let sections = checkpoint
        .get_mut("plan")
        .ok_or_else(|| NotesError::InvalidCheckpoint("missing 'plan' key".into()))?
        .get_mut("sections")
        .and_then(Value::as_array_mut);
    let Some(sections) = sections else {
        tracing::warn!("No sections found in checkpoint");
        return Ok(0);
    };

    let total = sections.len();
    let mut enhanced = 0;
    for (idx, section) in sections.iter_mut().enumerate() {
        let Some(obj) = section.as_object_mut() else {
            continue;
        };
        let slide_id = obj
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("slide_{:02}", idx + 1));

        let notes: Option<SpeakerNotes> = obj
            .get("speaker_notes")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok());
        let Some(notes) = notes.filter(SpeakerNotes::has_talking_points) else {
            tracing::debug!("[{}/{}] {}: no structured notes, skipping", idx + 1, total, slide_id);
            continue;
        };

        let title = obj.get("title").and_then(Value::as_str).unwrap_or_default();
        let content = obj.get("content").and_then(Value::as_str).unwrap_or_default();
        let narrative = narrate(client, style, title, content, &notes);

        obj.insert("speaker_notes_narrative".into(), Value::String(narrative));
        enhanced += 1;
        tracing::info!("[{}/{}] {}: notes enhanced", idx + 1, total, slide_id);
    }

    if enhanced > 0 {
        std::fs::write(checkpoint_path, serde_json::to_string_pretty(&checkpoint)?)?;
    }
    Ok(enhanced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::generation::MockTextClient;

    fn notes() -> SpeakerNotes {
        SpeakerNotes {
            talking_points: vec!["Accuracy rose".into(), "Latency fell!".into()],
            key_terms: vec!["F1".into()],
            transition: "Now the ablations.".into(),
            duration_minutes: 3,
        }
    }

    fn write_checkpoint(dir: &Path) -> PathBuf {
        let path = dir.join("checkpoint_plan.json");
        std::fs::write(
            &path,
            r#"{"origin": {"extra": 1}, "plan": {"sections": [
                {"id": "slide_01", "title": "Results", "content": "Numbers",
                 "speaker_notes": {"talking_points": ["Accuracy rose"], "key_terms": [], "transition": "", "duration_minutes": 2}},
                {"id": "slide_02", "title": "Outro", "content": "Bye"}
            ]}}"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn fallback_format() {
        let text = fallback_narrative("Results", &notes());
        assert_eq!(
            text,
            "## Results\n\nAccuracy rose.\n\nLatency fell!\n\n\
**Key terms to emphasize:** F1\n\n\
**Transition to next slide:** Now the ablations.\n\n\
*(Estimated time: 3 minutes)*"
        );
    }

    #[test]
    fn request_truncates_context() {
        let long = "x".repeat(2000);
        let request = narrative_request("T", &long, &notes());
        assert!(request.contains("- Accuracy rose\n- Latency fell!"));
        assert!(!request.contains(&"x".repeat(CONTEXT_CHARS + 1)));
        assert!(request.contains("3-minute"));
    }

    #[test]
    fn model_failure_uses_fallback() {
        let client = MockTextClient::failing("down");
        let text = narrate(&client, SpeakerStyle::Generic, "Results", "", &notes());
        assert!(text.starts_with("## Results"));
    }

    #[test]
    fn profile_selects_system_prompt() {
        let client = MockTextClient::replying("  Here's the thing.  ");
        let text = narrate(&client, SpeakerStyle::Conversational, "T", "", &notes());
        assert_eq!(text, "Here's the thing.");
        assert_eq!(
            client.calls()[0].system.as_deref(),
            Some(system_prompt(SpeakerStyle::Conversational))
        );
    }

    #[test]
    fn enhances_only_sections_with_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_checkpoint(dir.path());
        let client = MockTextClient::replying("Script.");

        let count = enhance_speaker_notes(&path, &client, SpeakerStyle::Generic).unwrap();
        assert_eq!(count, 1);
        assert_eq!(client.call_count(), 1);

        let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let sections = saved["plan"]["sections"].as_array().unwrap();
        assert_eq!(sections[0]["speaker_notes_narrative"], "Script.");
        assert!(sections[0]["speaker_notes"].is_object());
        assert!(sections[1].get("speaker_notes_narrative").is_none());
        assert_eq!(saved["origin"]["extra"], 1);
    }

    #[test]
    fn nothing_to_enhance_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint_plan.json");
        let original = r#"{"plan": {"sections": [{"id": "a"}]}}"#;
        std::fs::write(&path, original).unwrap();
        let client = MockTextClient::replying("unused");
        assert_eq!(enhance_speaker_notes(&path, &client, SpeakerStyle::Generic).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn missing_plan_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        std::fs::write(&path, "{}").unwrap();
        let client = MockTextClient::replying("x");
        assert!(matches!(
            enhance_speaker_notes(&path, &client, SpeakerStyle::Generic),
            Err(NotesError::InvalidCheckpoint(_))
        ));
        assert!(matches!(
            enhance_speaker_notes(&dir.path().join("none.json"), &client, SpeakerStyle::Generic),
            Err(NotesError::NotFound(_))
        ));
    }
}
