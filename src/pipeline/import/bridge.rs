use std::collections::HashMap;
use std::path::Path;

use crate::pipeline::generation::export::{ExportManifest, MANIFEST_FILENAME};
use crate::pipeline::generation::types::{GeneratedImage, ImagePayload};

use super::format::detect_image_mime;
use super::notes::{find_sidecar, load_sidecar, SidecarSlide};
use super::scan::{find_generated_image, scan_slide_dirs};
use super::ImportError;

/// What the scan found for one slide directory.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundSlide {
    pub number: usize,
    pub image: Option<ImagePayload>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedSlide {
    /// One-based slide number from the directory name.
    pub number: usize,
    pub image: GeneratedImage,
    pub notes: Option<String>,
}

/// Ordered slides plus the numbers that had no image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedDeck {
    pub slides: Vec<ImportedSlide>,
    pub missing: Vec<usize>,
}

impl ImportedDeck {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn images(&self) -> Vec<GeneratedImage> {
        self.slides.iter().map(|s| s.image.clone()).collect()
    }
}

/// Turn scan results into an ordered deck. Pure.
///
/// Section ids come from the export manifest, then the sidecar plan, then
/// `slide_NN`. Zero imported slides is an error; gaps are reported in
/// `missing`.
pub fn assemble(
    mut found: Vec<FoundSlide>,
    manifest: Option<&ExportManifest>,
    sidecar: &[SidecarSlide],
) -> Result<ImportedDeck, ImportError> {
    found.sort_by_key(|f| f.number);
    let by_number: HashMap<usize, &SidecarSlide> = sidecar.iter().map(|s| (s.number, s)).collect();

    let mut slides = Vec::with_capacity(found.len());
    let mut missing = Vec::new();

    for slide in found {
        let Some(payload) = slide.image else {
            missing.push(slide.number);
            continue;
        };
        let sidecar_entry = by_number.get(&slide.number);
        let section_id = manifest
            .and_then(|m| m.section_id_for(slide.number))
            .map(str::to_string)
            .or_else(|| sidecar_entry.map(|s| s.section_id.clone()).filter(|id| !id.is_empty()))
            .unwrap_or_else(|| format!("slide_{:02}", slide.number));

        slides.push(ImportedSlide {
            number: slide.number,
            image: GeneratedImage::new(&section_id, payload),
            notes: sidecar_entry.map(|s| s.notes.clone()).filter(|n| !n.is_empty()),
        });
    }

    if slides.is_empty() {
        return Err(ImportError::NothingImported { missing });
    }
    Ok(ImportedDeck { slides, missing })
}

fn read_image(path: &Path) -> Result<ImagePayload, ImportError> {
    let data = std::fs::read(path)?;
    let mime_type = detect_image_mime(&data)
        .map(str::to_string)
        .or_else(|| mime_guess::from_path(path).first().map(|m| m.essence_str().to_string()))
        .unwrap_or_else(|| "image/png".to_string());
    Ok(ImagePayload { data, mime_type })
}

/// Import an export directory after the operator has filled it in.
///
/// `sidecar` overrides sidecar discovery. An unreadable manifest or sidecar
/// only costs the section ids or notes it would have provided.
pub fn import_deck(prompt_dir: &Path, sidecar: Option<&Path>) -> Result<ImportedDeck, ImportError> {
    let _span = tracing::info_span!("import_deck", dir = %prompt_dir.display()).entered();

    let dirs = scan_slide_dirs(prompt_dir)?;
    let mut found = Vec::with_capacity(dirs.len());
    for dir in &dirs {
        let image = match find_generated_image(&dir.path) {
            Some(path) => {
                tracing::debug!(slide = dir.number, file = %path.display(), "Found generated image");
                Some(read_image(&path)?)
            }
            None => {
                tracing::warn!(slide = dir.number, "No generated image");
                None
            }
        };
        found.push(FoundSlide {
            number: dir.number,
            image,
        });
    }

    let manifest = if prompt_dir.join(MANIFEST_FILENAME).is_file() {
        match ExportManifest::load(prompt_dir) {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read export manifest");
                None
            }
        }
    } else {
        None
    };

    let sidecar_path = sidecar.map(Path::to_path_buf).or_else(|| find_sidecar(prompt_dir));
    let sidecar_slides = match sidecar_path {
        Some(path) => load_sidecar(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Could not load speaker notes");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let deck = assemble(found, manifest.as_ref(), &sidecar_slides)?;
    if deck.missing.is_empty() {
        tracing::info!(imported = deck.slides.len(), "All slides imported");
    } else {
        tracing::warn!(
            imported = deck.slides.len(),
            missing = ?deck.missing,
            "Some slides have no generated image"
        );
    }
    Ok(deck)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PLAN_CHECKPOINT_FILENAME;
    use crate::models::enums::OutputKind;
    use crate::models::plan::{ContentPlan, Section};
    use crate::pipeline::generation::export::slide_dir_name;
    use crate::pipeline::generation::{ExportBackend, NullSink, Orchestrator, StyleSpec};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    fn payload() -> Option<ImagePayload> {
        Some(ImagePayload {
            data: PNG.to_vec(),
            mime_type: "image/png".into(),
        })
    }

    fn plan(ids: &[&str]) -> ContentPlan {
        ContentPlan {
            output: OutputKind::Slides,
            sections: ids
                .iter()
                .map(|id| Section {
                    id: id.to_string(),
                    title: format!("Title {id}"),
                    section_type: "content".into(),
                    body: String::new(),
                    tables: vec![],
                    figures: vec![],
                })
                .collect(),
            tables: HashMap::new(),
            figures: HashMap::new(),
            base_path: PathBuf::new(),
        }
    }

    fn export(root: &Path, ids: &[&str]) {
        let backend = ExportBackend::new(root);
        Orchestrator::new(Arc::new(backend), StyleSpec::default())
            .generate(&plan(ids), &HashMap::new(), &mut NullSink)
            .unwrap();
    }

    #[test]
    fn assemble_reports_gaps_in_order() {
        let found = vec![
            FoundSlide { number: 2, image: payload() },
            FoundSlide { number: 3, image: None },
            FoundSlide { number: 1, image: payload() },
        ];
        let deck = assemble(found, None, &[]).unwrap();
        assert_eq!(deck.missing, vec![3]);
        let ids: Vec<_> = deck.slides.iter().map(|s| s.image.section_id.as_str()).collect();
        assert_eq!(ids, ["slide_01", "slide_02"]);
        assert!(!deck.is_complete());
    }

    #[test]
    fn assemble_nothing_is_error() {
        let found = vec![FoundSlide { number: 1, image: None }];
        match assemble(found, None, &[]) {
            Err(ImportError::NothingImported { missing }) => assert_eq!(missing, vec![1]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn assemble_uses_sidecar_ids_and_notes() {
        let sidecar = vec![SidecarSlide {
            number: 1,
            section_id: "intro".into(),
            title: "Intro".into(),
            notes: "Say hello".into(),
        }];
        let deck = assemble(vec![FoundSlide { number: 1, image: payload() }], None, &sidecar).unwrap();
        assert_eq!(deck.slides[0].image.section_id, "intro");
        assert_eq!(deck.slides[0].notes.as_deref(), Some("Say hello"));
    }

    #[test]
    fn five_slide_export_missing_third() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("prompts");
        export(&root, &["a", "b", "c", "d", "e"]);

        for n in [1, 2, 4, 5] {
            std::fs::write(root.join(slide_dir_name(n)).join("generated.png"), PNG).unwrap();
        }
        let deck = import_deck(&root, None).unwrap();
        assert_eq!(deck.missing, vec![3]);
        assert_eq!(deck.slides.len(), 4);
        let ids: Vec<_> = deck.slides.iter().map(|s| s.image.section_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "d", "e"]);
    }

    #[test]
    fn export_then_import_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("prompts");
        export(&root, &["a", "b", "c"]);

        std::fs::write(root.join(slide_dir_name(1)).join("generated.png"), PNG).unwrap();
        std::fs::write(root.join(slide_dir_name(2)).join("generated.png"), PNG).unwrap();
        // Alternate name with JPEG bytes.
        std::fs::write(root.join(slide_dir_name(3)).join("slide.jpg"), [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

        let deck = import_deck(&root, None).unwrap();
        assert!(deck.is_complete());
        let ids: Vec<_> = deck.images().into_iter().map(|i| i.section_id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(deck.slides[2].image.mime_type, "image/jpeg");
    }

    #[test]
    fn import_picks_up_sidecar_notes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("prompts");
        std::fs::create_dir_all(root.join("slide_01_images")).unwrap();
        std::fs::write(root.join("slide_01_images/generated.png"), PNG).unwrap();
        std::fs::write(
            dir.path().join(PLAN_CHECKPOINT_FILENAME),
            r#"{"plan": {"sections": [{"id": "slide_01", "title": "Hi", "content": "Body",
                "speaker_notes_narrative": "Welcome everyone."}]}}"#,
        )
        .unwrap();

        let deck = import_deck(&root, None).unwrap();
        assert_eq!(deck.slides[0].notes.as_deref(), Some("Welcome everyone."));
        assert_eq!(deck.slides[0].image.section_id, "slide_01");
    }

    #[test]
    fn broken_sidecar_is_only_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("prompts");
        std::fs::create_dir_all(root.join("slide_01_images")).unwrap();
        std::fs::write(root.join("slide_01_images/generated.png"), PNG).unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "not json").unwrap();

        let deck = import_deck(&root, Some(&bad)).unwrap();
        assert_eq!(deck.slides.len(), 1);
        assert!(deck.slides[0].notes.is_none());
    }
}
