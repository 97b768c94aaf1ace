//! Persistence sinks: called once per completed image, before the batch ends.

use std::path::{Path, PathBuf};

use super::export::sanitize_id;
use super::types::GeneratedImage;

/// Receives each completed image as soon as it exists.
///
/// `index` is the zero-based slide position, `total` the deck size.
pub trait PersistenceSink {
    fn persist(&mut self, image: &GeneratedImage, index: usize, total: usize) -> std::io::Result<()>;
}

impl<F> PersistenceSink for F
where
    F: FnMut(&GeneratedImage, usize, usize) -> std::io::Result<()>,
{
    fn persist(&mut self, image: &GeneratedImage, index: usize, total: usize) -> std::io::Result<()> {
        self(image, index, total)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PersistenceSink for NullSink {
    fn persist(&mut self, _image: &GeneratedImage, _index: usize, _total: usize) -> std::io::Result<()> {
        Ok(())
    }
}

/// Writes `<dir>/<section_id>.<ext>` for every image.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far, in completion order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl PersistenceSink for DirectorySink {
    fn persist(&mut self, image: &GeneratedImage, index: usize, total: usize) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut stem = sanitize_id(&image.section_id);
        if stem.is_empty() {
            stem = format!("section_{:02}", index + 1);
        }
        let filename = format!("{stem}.{}", image.extension());
        let path = self.dir.join(&filename);
        std::fs::write(&path, &image.image_data)?;
        tracing::info!("[{}/{}] Saved: {}", index + 1, total, filename);
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str, mime: &str) -> GeneratedImage {
        GeneratedImage {
            section_id: id.into(),
            image_data: b"bytes".to_vec(),
            mime_type: mime.into(),
        }
    }

    #[test]
    fn directory_sink_writes_by_section_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out"));
        sink.persist(&image("slide_01", "image/png"), 0, 2).unwrap();
        sink.persist(&image("slide_02", "image/jpeg"), 1, 2).unwrap();
        sink.persist(&image("poster", "image/gif"), 0, 1).unwrap();

        assert_eq!(std::fs::read(dir.path().join("out/slide_01.png")).unwrap(), b"bytes");
        assert!(dir.path().join("out/slide_02.jpg").exists());
        assert!(dir.path().join("out/poster.png").exists());
        assert_eq!(sink.written().len(), 3);
    }

    #[test]
    fn section_ids_are_made_filename_safe() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        sink.persist(&image("results/v2", "image/png"), 2, 4).unwrap();
        sink.persist(&image("", "image/png"), 3, 4).unwrap();

        assert!(dir.path().join("results_v2.png").is_file());
        assert!(!dir.path().join("results").exists());
        assert!(dir.path().join("section_04.png").is_file());
        assert!(sink.written().iter().all(|p| p.parent() == Some(sink.dir())));
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |img: &GeneratedImage, i: usize, n: usize| -> std::io::Result<()> {
                seen.push((img.section_id.clone(), i, n));
                Ok(())
            };
            sink.persist(&image("a", "image/png"), 0, 1).unwrap();
        }
        assert_eq!(seen, [("a".to_string(), 0, 1)]);
    }

    #[test]
    fn null_sink_accepts_everything() {
        assert!(NullSink.persist(&image("a", "image/png"), 0, 1).is_ok());
    }
}
