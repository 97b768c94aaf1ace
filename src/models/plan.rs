//! Content plan: the ordered outline the orchestrator consumes.
//!
//! The planner writes a checkpoint document (`checkpoint_plan.json`) holding the
//! origin assets (tables, figures) and the ordered sections. This module owns the
//! serde shape of that document and its conversion into a `ContentPlan`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::{OutputKind, SectionType};

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("I/O error reading plan: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plan JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Plan has no sections")]
    Empty,

    #[error("Duplicate {kind} id in plan: {id}")]
    DuplicateId { kind: &'static str, id: String },
}

// ──────────────────────────────────────────────
// Checkpoint document (serde)
// ──────────────────────────────────────────────

/// Top-level planner checkpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanCheckpoint {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub origin: OriginDocument,
    #[serde(default)]
    pub plan: PlanDocument,
}

/// Source-document assets extracted before planning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OriginDocument {
    #[serde(default)]
    pub tables: Vec<OriginTable>,
    #[serde(default)]
    pub figures: Vec<OriginFigure>,
    /// Directory figure paths are relative to.
    #[serde(default)]
    pub base_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginTable {
    pub id: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub html: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginFigure {
    pub id: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(default = "default_output_kind")]
    pub output_type: OutputKind,
    #[serde(default)]
    pub sections: Vec<SectionDocument>,
}

fn default_output_kind() -> OutputKind {
    OutputKind::Slides
}

impl Default for OutputKind {
    fn default() -> Self {
        default_output_kind()
    }
}

/// One planned section as written by the planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default = "default_section_type")]
    pub section_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tables: Vec<TableRef>,
    #[serde(default)]
    pub figures: Vec<FigureRef>,
    #[serde(default)]
    pub speaker_notes: Option<SpeakerNotes>,
    #[serde(default)]
    pub speaker_notes_narrative: Option<String>,
}

fn default_section_type() -> String {
    SectionType::Content.as_str().to_string()
}

/// Structured talking-point notes attached to a section by the planner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakerNotes {
    #[serde(default)]
    pub talking_points: Vec<String>,
    #[serde(default)]
    pub key_terms: Vec<String>,
    #[serde(default)]
    pub transition: String,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
}

fn default_duration_minutes() -> u32 {
    2
}

impl SpeakerNotes {
    pub fn has_talking_points(&self) -> bool {
        self.talking_points.iter().any(|p| !p.trim().is_empty())
    }
}

// ──────────────────────────────────────────────
// Content plan (consumed by the orchestrator)
// ──────────────────────────────────────────────

/// Reference from a section to a table, with an optional excerpt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRef {
    pub table_id: String,
    /// Pre-extracted excerpt; when absent the full table content is rendered.
    #[serde(default)]
    pub extract: Option<String>,
    #[serde(default)]
    pub focus: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FigureRef {
    pub figure_id: String,
    #[serde(default)]
    pub focus: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    pub table_id: String,
    pub caption: String,
    pub html_content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FigureInfo {
    pub figure_id: String,
    pub caption: Option<String>,
    pub image_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    pub title: String,
    /// Free-form type tag; see `SectionType::from_tag` for layout selection.
    pub section_type: String,
    pub body: String,
    pub tables: Vec<TableRef>,
    pub figures: Vec<FigureRef>,
}

/// Ordered outline. Section order is presentation order.
#[derive(Debug, Clone)]
pub struct ContentPlan {
    pub output: OutputKind,
    pub sections: Vec<Section>,
    pub tables: HashMap<String, TableInfo>,
    pub figures: HashMap<String, FigureInfo>,
    /// Directory figure paths resolve against.
    pub base_path: PathBuf,
}

impl ContentPlan {
    /// Read and convert a planner checkpoint from disk.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let raw = std::fs::read_to_string(path)?;
        let checkpoint: PlanCheckpoint = serde_json::from_str(&raw)?;
        Self::from_checkpoint(checkpoint)
    }

    pub fn from_checkpoint(checkpoint: PlanCheckpoint) -> Result<Self, PlanError> {
        let PlanCheckpoint { origin, plan, .. } = checkpoint;

        let mut tables = HashMap::with_capacity(origin.tables.len());
        for t in origin.tables {
            if tables.contains_key(&t.id) {
                return Err(PlanError::DuplicateId { kind: "table", id: t.id });
            }
            tables.insert(
                t.id.clone(),
                TableInfo {
                    table_id: t.id,
                    caption: t.caption,
                    html_content: t.html,
                },
            );
        }

        let mut figures = HashMap::with_capacity(origin.figures.len());
        for f in origin.figures {
            if figures.contains_key(&f.id) {
                return Err(PlanError::DuplicateId { kind: "figure", id: f.id });
            }
            figures.insert(
                f.id.clone(),
                FigureInfo {
                    figure_id: f.id,
                    caption: f.caption,
                    image_path: PathBuf::from(f.path),
                },
            );
        }

        if plan.sections.is_empty() {
            return Err(PlanError::Empty);
        }

        let mut section_ids = HashSet::with_capacity(plan.sections.len());
        for s in plan.sections.iter().filter(|s| !s.id.is_empty()) {
            if !section_ids.insert(s.id.as_str()) {
                return Err(PlanError::DuplicateId { kind: "section", id: s.id.clone() });
            }
        }

        let sections = plan
            .sections
            .into_iter()
            .map(|s| Section {
                id: s.id,
                title: s.title,
                section_type: s.section_type,
                body: s.content,
                tables: s.tables,
                figures: s.figures,
            })
            .collect();

        Ok(Self {
            output: plan.output_type,
            sections,
            tables,
            figures,
            base_path: PathBuf::from(origin.base_path),
        })
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
