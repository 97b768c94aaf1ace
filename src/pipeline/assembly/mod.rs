//! Document assembly: ordered images (and optional notes) into one PDF or
//! PowerPoint deck.
//!
//! PDF generation via `printpdf`. One page per image, sized from the image's
//! pixels at a fixed DPI, image placed full-bleed. Speaker notes have no place
//! in a PDF page, so they go to a Markdown file next to it. The PPTX writer
//! lives in `pptx` and puts them on each slide's notes page.

pub mod pptx;

pub use pptx::PptxAssembler;

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use printpdf::image_crate::{self, DynamicImage};
use printpdf::{Image, ImageTransform, Mm, PdfDocument};
use thiserror::Error;

use crate::pipeline::generation::GeneratedImage;

pub const NOTES_FILENAME: &str = "speaker_notes.md";
pub const DEFAULT_DPI: f32 = 100.0;

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("No images to assemble")]
    NoImages,

    #[error("Could not decode image for {section_id}: {reason}")]
    Decode { section_id: String, reason: String },

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("PPTX archive error: {0}")]
    Archive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One page of the output document.
#[derive(Debug, Clone, Copy)]
pub struct DeckPage<'a> {
    /// One-based slide number shown in the notes file.
    pub number: usize,
    pub image: &'a GeneratedImage,
    pub notes: Option<&'a str>,
}

impl<'a> DeckPage<'a> {
    /// Pages numbered by position, without notes.
    pub fn from_images(images: &'a [GeneratedImage]) -> Vec<DeckPage<'a>> {
        images
            .iter()
            .enumerate()
            .map(|(i, image)| DeckPage {
                number: i + 1,
                image,
                notes: None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    pub path: PathBuf,
    pub pages: usize,
    pub notes_path: Option<PathBuf>,
}

/// Writes a paginated container from ordered pages.
pub trait DocumentAssembler {
    fn assemble(&self, pages: &[DeckPage<'_>], output: &Path) -> Result<AssembledDocument, AssemblyError>;
}

pub struct PdfAssembler {
    title: String,
    dpi: f32,
}

impl PdfAssembler {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            dpi: DEFAULT_DPI,
        }
    }
}

fn px_to_mm(px: u32, dpi: f32) -> Mm {
    Mm(px as f32 * 25.4 / dpi)
}

fn full_bleed(dpi: f32) -> ImageTransform {
    ImageTransform {
        dpi: Some(dpi),
        ..Default::default()
    }
}

/// Decode with the crate's own `image` (WebP included) and hand printpdf
/// flattened RGB pixels.
fn decode(generated: &GeneratedImage) -> Result<DynamicImage, AssemblyError> {
    let decode_err = |reason: String| AssemblyError::Decode {
        section_id: generated.section_id.clone(),
        reason,
    };
    let rgb = image::load_from_memory(&generated.image_data)
        .map_err(|e| decode_err(e.to_string()))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    image_crate::RgbImage::from_raw(width, height, rgb.into_raw())
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| decode_err("pixel buffer size mismatch".into()))
}

/// Render the PDF in memory. Returns PDF bytes.
pub fn render_pdf(pages: &[DeckPage<'_>], title: &str, dpi: f32) -> Result<Vec<u8>, AssemblyError> {
    let (first, rest) = pages.split_first().ok_or(AssemblyError::NoImages)?;

    let first_image = decode(first.image)?;
    let (doc, page1, layer1) = PdfDocument::new(
        title,
        px_to_mm(first_image.width(), dpi),
        px_to_mm(first_image.height(), dpi),
        "Slide 1",
    );
    Image::from_dynamic_image(&first_image)
        .add_to_layer(doc.get_page(page1).get_layer(layer1), full_bleed(dpi));

    for page in rest {
        let decoded = decode(page.image)?;
        let (page_idx, layer_idx) = doc.add_page(
            px_to_mm(decoded.width(), dpi),
            px_to_mm(decoded.height(), dpi),
            format!("Slide {}", page.number),
        );
        Image::from_dynamic_image(&decoded)
            .add_to_layer(doc.get_page(page_idx).get_layer(layer_idx), full_bleed(dpi));
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| AssemblyError::Pdf(format!("save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| AssemblyError::Pdf(format!("buffer error: {e}")))
}

/// Markdown notes document, or `None` when no page carries notes.
pub fn render_notes_markdown(pages: &[DeckPage<'_>]) -> Option<String> {
    if pages.iter().all(|p| p.notes.map_or(true, |n| n.trim().is_empty())) {
        return None;
    }
    let mut out = String::from("# Speaker Notes\n");
    for page in pages {
        let Some(notes) = page.notes.filter(|n| !n.trim().is_empty()) else {
            continue;
        };
        out.push_str(&format!(
            "\n---\n\n# Slide {} ({})\n\n{}\n",
            page.number,
            page.image.section_id,
            notes.trim_end()
        ));
    }
    Some(out)
}

impl DocumentAssembler for PdfAssembler {
    fn assemble(&self, pages: &[DeckPage<'_>], output: &Path) -> Result<AssembledDocument, AssemblyError> {
        let bytes = render_pdf(pages, &self.title, self.dpi)?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, &bytes)?;

        let notes_path = match render_notes_markdown(pages) {
            Some(markdown) => {
                let path = output.with_file_name(NOTES_FILENAME);
                std::fs::write(&path, markdown)?;
                Some(path)
            }
            None => None,
        };

        tracing::info!(
            path = %output.display(),
            pages = pages.len(),
            bytes = bytes.len(),
            notes = notes_path.is_some(),
            "Assembled PDF"
        );
        Ok(AssembledDocument {
            path: output.to_path_buf(),
            pages: pages.len(),
            notes_path,
        })
    }
}
