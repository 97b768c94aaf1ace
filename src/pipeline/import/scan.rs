//! Filesystem scan of an export directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::generation::export::{ALTERNATE_IMAGE_FILENAMES, GENERATED_IMAGE_FILENAME};

use super::ImportError;

/// One `slide_NN_images` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideDir {
    pub number: usize,
    pub path: PathBuf,
}

static SLIDE_DIR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^slide_(\d+)_images$").unwrap());

/// Parse the slide number out of a directory name.
pub fn parse_slide_number(dir_name: &str) -> Option<usize> {
    SLIDE_DIR_PATTERN
        .captures(dir_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Slide directories under `prompt_dir`, sorted by slide number.
pub fn scan_slide_dirs(prompt_dir: &Path) -> Result<Vec<SlideDir>, ImportError> {
    if !prompt_dir.is_dir() {
        return Err(ImportError::DirectoryNotFound(prompt_dir.to_path_buf()));
    }

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(prompt_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if let Some(number) = name.to_str().and_then(parse_slide_number) {
            dirs.push(SlideDir {
                number,
                path: entry.path(),
            });
        }
    }

    if dirs.is_empty() {
        return Err(ImportError::NoSlideDirectories(prompt_dir.to_path_buf()));
    }
    dirs.sort_by_key(|d| d.number);
    Ok(dirs)
}

/// The canonical filename first, then the accepted alternates, in order.
pub fn find_generated_image(slide_dir: &Path) -> Option<PathBuf> {
    std::iter::once(GENERATED_IMAGE_FILENAME)
        .chain(ALTERNATE_IMAGE_FILENAMES.iter().copied())
        .map(|name| slide_dir.join(name))
        .find(|path| path.is_file())
}
