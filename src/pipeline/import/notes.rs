//! Sidecar plan discovery and speaker-notes recovery.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::PLAN_CHECKPOINT_FILENAME;
use crate::models::plan::{PlanCheckpoint, SectionDocument};

use super::ImportError;

static SLIDE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^slide_(\d+)").unwrap());

/// What the sidecar knows about one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarSlide {
    pub number: usize,
    pub section_id: String,
    pub title: String,
    pub notes: String,
}

/// `checkpoint_plan.json` next to the prompt directory, or one level higher.
pub fn find_sidecar(prompt_dir: &Path) -> Option<PathBuf> {
    prompt_dir
        .ancestors()
        .skip(1)
        .take(2)
        .map(|dir| dir.join(PLAN_CHECKPOINT_FILENAME))
        .find(|candidate| candidate.is_file())
}

/// Notes text for a section: narrative first, then structured notes, then
/// title and body.
pub fn render_notes(section: &SectionDocument) -> String {
    if let Some(narrative) = section
        .speaker_notes_narrative
        .as_deref()
        .filter(|n| !n.trim().is_empty())
    {
        return narrative.to_string();
    }

    if let Some(notes) = section.speaker_notes.as_ref().filter(|n| n.has_talking_points()) {
        let mut lines = vec![format!("## {}", section.title), String::new()];
        lines.push("### Key Points:".to_string());
        lines.extend(notes.talking_points.iter().map(|p| format!("• {p}")));
        lines.push(String::new());
        if !notes.key_terms.is_empty() {
            lines.push(format!("**Emphasize:** {}", notes.key_terms.join(", ")));
            lines.push(String::new());
        }
        if !notes.transition.is_empty() {
            lines.push(format!("**Transition:** {}", notes.transition));
            lines.push(String::new());
        }
        lines.push(format!("⏱️ ~{} minutes", notes.duration_minutes));
        return lines.join("\n");
    }

    if section.title.is_empty() {
        section.content.clone()
    } else {
        format!("{}\n\n{}", section.title, section.content)
    }
}

/// Read the sidecar. Sections named `slide_<NN>` map to slide NN; any other
/// id maps by 1-based position.
pub fn load_sidecar(path: &Path) -> Result<Vec<SidecarSlide>, ImportError> {
    let raw = std::fs::read_to_string(path)?;
    let checkpoint: PlanCheckpoint = serde_json::from_str(&raw)?;

    let slides = checkpoint
        .plan
        .sections
        .iter()
        .enumerate()
        .map(|(position, section)| {
            let number = SLIDE_ID_PATTERN
                .captures(&section.id)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(position + 1);
            SidecarSlide {
                number,
                section_id: section.id.clone(),
                title: section.title.clone(),
                notes: render_notes(section),
            }
        })
        .collect::<Vec<_>>();

    tracing::info!(path = %path.display(), slides = slides.len(), "Loaded sidecar plan");
    Ok(slides)
}
