//! Import bridge: the way back in after export mode.
//!
//! An operator fills `slide_NN_images/generated.png` by hand; this module
//! reads the directory back into an ordered image set, tolerating gaps, and
//! recovers speaker notes from the sidecar plan when one is found.

pub mod format;
pub mod scan;
pub mod notes;
pub mod bridge;

pub use format::detect_image_mime;
pub use scan::{find_generated_image, scan_slide_dirs, SlideDir};
pub use notes::{find_sidecar, load_sidecar, render_notes, SidecarSlide};
pub use bridge::{assemble, import_deck, FoundSlide, ImportedDeck, ImportedSlide};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Prompt directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("No slide directories found in {}", .0.display())]
    NoSlideDirectories(PathBuf),

    #[error("No generated images found (missing slides: {missing:?})")]
    NothingImported { missing: Vec<usize> },

    #[error("Sidecar plan is malformed: {0}")]
    Json(#[from] serde_json::Error),
}
