//! Reference chain: which images ride along with each slide request.
//!
//! Slides 1 and 2 carry only their own figures. Slide 2's output becomes the
//! anchor and is prepended to every later request together with a fixed
//! instruction caption, since the model keeps no memory between calls.

use std::collections::HashMap;

use crate::models::plan::Section;

use super::types::{GeneratedImage, ReferenceImage};

pub const ANCHOR_ID: &str = "Reference Slide";

pub const ANCHOR_CAPTION: &str = "STRICTLY MAINTAIN: same background color, same accent color, \
same font style, same chart/icon style. Keep visual consistency.";

/// Zero-based index whose output becomes the anchor.
pub const ANCHOR_SOURCE_INDEX: usize = 1;

/// Figures referenced by a section, in reference order. Unloaded ids are skipped.
pub fn section_figures(
    section: &Section,
    figures: &HashMap<String, ReferenceImage>,
) -> Vec<ReferenceImage> {
    section
        .figures
        .iter()
        .filter_map(|r| figures.get(&r.figure_id).cloned())
        .collect()
}

/// Figures referenced anywhere in the plan, deduplicated, first use wins.
pub fn plan_figures<'a>(
    sections: impl IntoIterator<Item = &'a Section>,
    figures: &HashMap<String, ReferenceImage>,
) -> Vec<ReferenceImage> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for section in sections {
        for r in &section.figures {
            if seen.insert(r.figure_id.as_str()) {
                if let Some(img) = figures.get(&r.figure_id) {
                    out.push(img.clone());
                }
            }
        }
    }
    out
}

/// Anchor state for one deck. Written once, read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct ReferenceChain {
    anchor: Option<ReferenceImage>,
}

impl ReferenceChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchor(&self) -> Option<&ReferenceImage> {
        self.anchor.as_ref()
    }

    /// Record the anchor from the output of slide `index`. Only the anchor
    /// source index is accepted and only the first capture sticks.
    pub fn capture(&mut self, index: usize, image: &GeneratedImage) -> bool {
        if index != ANCHOR_SOURCE_INDEX || self.anchor.is_some() {
            return false;
        }
        self.anchor = Some(ReferenceImage::new(
            ANCHOR_ID,
            Some(ANCHOR_CAPTION),
            image.image_data.clone(),
            &image.mime_type,
        ));
        tracing::debug!(section_id = %image.section_id, "Style anchor captured");
        true
    }

    /// References for slide `index`: the anchor first (index >= 2, when set),
    /// then the section's own figures.
    pub fn images_for(&self, index: usize, section_figures: Vec<ReferenceImage>) -> Vec<ReferenceImage> {
        let mut refs = Vec::with_capacity(section_figures.len() + 1);
        if index > ANCHOR_SOURCE_INDEX {
            if let Some(anchor) = &self.anchor {
                refs.push(anchor.clone());
            }
        }
        refs.extend(section_figures);
        refs
    }
}
