//! Export mode: a durable work queue handed to a human operator.
//!
//! `plan_work_item` turns a job into the files an operator needs (pure);
//! `ExportWorkItem::write` puts them on disk. The import bridge reads the
//! same layout back.
//!
//! ```text
//! prompts/
//! ├── INSTRUCTIONS.md
//! ├── manifest.json
//! ├── slide_01_prompt.txt
//! ├── slide_01_images/
//! │   ├── ref_00_Figure_1.png
//! │   └── generated.png        (operator creates)
//! └── ...
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::placeholder::render_placeholder;
use super::reference::ANCHOR_CAPTION;
use super::types::{BackendMode, GenerationJob, ImageBackend, ImagePayload};
use super::GenerationError;

pub const GENERATED_IMAGE_FILENAME: &str = "generated.png";

/// Accepted on import when the canonical file is absent, in this order.
pub const ALTERNATE_IMAGE_FILENAMES: &[&str] = &[
    "generated.jpg",
    "generated.jpeg",
    "slide.png",
    "slide.jpg",
    "output.png",
];

pub const INSTRUCTIONS_FILENAME: &str = "INSTRUCTIONS.md";
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Operator effort per slide, in minutes (low, high).
pub const MINUTES_PER_SLIDE: (f64, f64) = (2.5, 3.0);

pub fn slide_dir_name(slide_number: usize) -> String {
    format!("slide_{slide_number:02}_images")
}

pub fn slide_prompt_filename(slide_number: usize) -> String {
    format!("slide_{slide_number:02}_prompt.txt")
}

/// Keep ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Per-position chain-of-custody text for the operator.
pub fn chain_instruction(slide_number: usize, total: usize) -> String {
    match slide_number {
        1 => "## REFERENCE CHAIN INSTRUCTION\n\
This is SLIDE 1: no reference image needed.\n\
Keep the result. It is the reference for slide 2."
            .to_string(),
        2 => "## REFERENCE CHAIN INSTRUCTION\n\
Attach the generated image from SLIDE 1 as a reference.\n\
Ask for: \"Use the same visual style, colors, and icon design as this reference image.\"\n\
Keep the result. It is the STYLE ANCHOR for every remaining slide."
            .to_string(),
        _ => format!(
            "## REFERENCE CHAIN INSTRUCTION\n\
Attach the generated image from SLIDE 2 (the style anchor) as a reference.\n\
Ask for: \"{ANCHOR_CAPTION}\"\n\
This keeps all {total} slides visually consistent."
        ),
    }
}

// ──────────────────────────────────────────────
// Work items
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceFile {
    pub filename: String,
    pub data: Arc<[u8]>,
}

/// Everything written for one slide.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportWorkItem {
    pub slide_number: usize,
    pub total: usize,
    pub section_id: String,
    pub title: String,
    pub dir_name: String,
    pub prompt_filename: String,
    pub prompt_text: String,
    pub references: Vec<ReferenceFile>,
}

/// One manifest row; lets the import bridge restore section ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub slide: usize,
    pub section_id: String,
    #[serde(default)]
    pub title: String,
    pub prompt_file: String,
    pub images_dir: String,
    #[serde(default)]
    pub reference_images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub exported_at: DateTime<Utc>,
    pub total_slides: usize,
    pub slides: Vec<ManifestEntry>,
}

impl ExportManifest {
    pub fn load(prompt_dir: &Path) -> Result<Self, GenerationError> {
        let raw = std::fs::read_to_string(prompt_dir.join(MANIFEST_FILENAME))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn section_id_for(&self, slide_number: usize) -> Option<&str> {
        self.slides
            .iter()
            .find(|e| e.slide == slide_number)
            .map(|e| e.section_id.as_str())
    }
}

/// Build the operator files for one job. Pure.
pub fn plan_work_item(job: &GenerationJob) -> ExportWorkItem {
    let slide_number = job.slide_number();
    let dir_name = slide_dir_name(slide_number);

    let references: Vec<ReferenceFile> = job
        .references
        .iter()
        .filter(|r| !r.data.is_empty())
        .enumerate()
        .map(|(i, r)| ReferenceFile {
            filename: format!("ref_{i:02}_{}.{}", sanitize_id(&r.id), r.extension()),
            data: Arc::clone(&r.data),
        })
        .collect();

    let mut text = format!("# Slide {slide_number:02} of {}\n", job.total);
    if !job.title.is_empty() {
        text.push_str(&format!("## {}\n", job.title));
    }
    text.push('\n');
    text.push_str(&chain_instruction(slide_number, job.total));
    text.push_str("\n\n## REFERENCE IMAGES TO UPLOAD\n");
    text.push_str(&format!("Directory: {dir_name}/\n"));
    if references.is_empty() {
        text.push_str("- (No reference images for this slide)\n");
    } else {
        for r in &references {
            text.push_str(&format!("- {}\n", r.filename));
        }
    }
    text.push_str("\n## RAW PROMPT\nPaste everything between the rules into the image model chat:\n\n---\n\n");
    text.push_str(&job.prompt);
    text.push_str("\n\n---\n\n## AFTER GENERATION\n");
    text.push_str("1. Download the generated image\n");
    text.push_str(&format!("2. Save it as: {dir_name}/{GENERATED_IMAGE_FILENAME}\n"));
    text.push_str("3. Continue with the next slide prompt\n");

    ExportWorkItem {
        slide_number,
        total: job.total,
        section_id: job.section_id.clone(),
        title: job.title.clone(),
        prompt_filename: slide_prompt_filename(slide_number),
        dir_name,
        prompt_text: text,
        references,
    }
}

impl ExportWorkItem {
    /// Write the slide directory, reference copies and prompt file under `root`.
    pub fn write(&self, root: &Path) -> Result<(), GenerationError> {
        let dir = root.join(&self.dir_name);
        std::fs::create_dir_all(&dir)?;
        for r in &self.references {
            std::fs::write(dir.join(&r.filename), &r.data)?;
        }
        std::fs::write(root.join(&self.prompt_filename), &self.prompt_text)?;
        Ok(())
    }

    pub fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry {
            slide: self.slide_number,
            section_id: self.section_id.clone(),
            title: self.title.clone(),
            prompt_file: self.prompt_filename.clone(),
            images_dir: self.dir_name.clone(),
            reference_images: self.references.iter().map(|r| r.filename.clone()).collect(),
        }
    }
}

/// Workflow summary written once after the last slide.
pub fn render_instructions(total: usize, prompt_dir: &Path) -> String {
    let (low, high) = MINUTES_PER_SLIDE;
    let later = if total >= 3 {
        format!("- **Slides 3-{total}**: attach slide 2 as the reference\n")
    } else {
        String::new()
    };
    format!(
        "# Manual Image Generation Workflow\n\
\n\
This directory holds {total} slide prompts for manual generation.\n\
\n\
## 1. Generate slides in order\n\
\n\
Go from slide 1 to slide {total}. The reference chain depends on it:\n\
- **Slide 1**: no reference, sets the base style\n\
- **Slide 2**: attach slide 1; the result becomes the style anchor\n\
{later}\
\n\
## 2. For each slide\n\
\n\
1. Open `slide_NN_prompt.txt`\n\
2. Follow its REFERENCE CHAIN INSTRUCTION\n\
3. Upload the files listed under REFERENCE IMAGES TO UPLOAD from `slide_NN_images/`\n\
4. Paste the RAW PROMPT into the image model chat and generate\n\
5. Save the result as `slide_NN_images/{GENERATED_IMAGE_FILENAME}`\n\
\n\
Also accepted: {alternates}.\n\
\n\
## 3. Import\n\
\n\
```bash\n\
deckgen import {dir}\n\
```\n\
\n\
Slides without an image are reported as missing; the rest are assembled.\n\
\n\
## File structure\n\
\n\
```\n\
{INSTRUCTIONS_FILENAME}          (this file)\n\
{MANIFEST_FILENAME}            (slide to section mapping)\n\
slide_01_prompt.txt\n\
slide_01_images/\n\
├── ref_00_*.png             (reference images)\n\
└── {GENERATED_IMAGE_FILENAME}            (you create this)\n\
...\n\
slide_{total:02}_prompt.txt\n\
```\n\
\n\
## Tips\n\
\n\
- If colors drift, name the palette explicitly and attach the anchor again\n\
- Regenerate a slide that does not match before moving on\n\
\n\
## Estimated time\n\
\n\
About {low_total:.0}-{high_total:.0} minutes ({low}-{high} minutes per slide).\n",
        alternates = ALTERNATE_IMAGE_FILENAMES
            .iter()
            .map(|f| format!("`{f}`"))
            .collect::<Vec<_>>()
            .join(", "),
        dir = prompt_dir.display(),
        low_total = total as f64 * low,
        high_total = total as f64 * high,
    )
}

// ──────────────────────────────────────────────
// Backend
// ──────────────────────────────────────────────

/// Writes prompt files instead of calling the model; returns placeholders.
pub struct ExportBackend {
    root: PathBuf,
    entries: Mutex<Vec<ManifestEntry>>,
}

impl ExportBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageBackend for ExportBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Export
    }

    fn generate(&self, job: &GenerationJob) -> Result<ImagePayload, GenerationError> {
        let item = plan_work_item(job);
        item.write(&self.root)?;
        tracing::info!(
            slide = item.slide_number,
            prompt_file = %item.prompt_filename,
            references = item.references.len(),
            "Exported prompt"
        );

        self.entries
            .lock()
            .map_err(|_| GenerationError::Config("export manifest lock poisoned".into()))?
            .push(item.manifest_entry());

        render_placeholder(item.slide_number, &item.title)
    }

    fn finish(&self, total: usize) -> Result<(), GenerationError> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(
            self.root.join(INSTRUCTIONS_FILENAME),
            render_instructions(total, &self.root),
        )?;

        let mut slides = self
            .entries
            .lock()
            .map_err(|_| GenerationError::Config("export manifest lock poisoned".into()))?
            .clone();
        slides.sort_by_key(|e| e.slide);
        let manifest = ExportManifest {
            exported_at: Utc::now(),
            total_slides: total,
            slides,
        };
        std::fs::write(
            self.root.join(MANIFEST_FILENAME),
            serde_json::to_string_pretty(&manifest)?,
        )?;

        tracing::info!(total, dir = %self.root.display(), "Wrote export instructions");
        Ok(())
    }
}
