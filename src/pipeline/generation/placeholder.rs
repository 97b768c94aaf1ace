//! Placeholder slide returned by export mode, telling the operator where the
//! real image goes.

use std::io::Cursor;
use std::path::PathBuf;

use ab_glyph::{FontArc, FontRef, FontVec, PxScale};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use super::export::{slide_dir_name, slide_prompt_filename, GENERATED_IMAGE_FILENAME};
use super::types::ImagePayload;
use super::GenerationError;

pub const PLACEHOLDER_WIDTH: u32 = 1920;
pub const PLACEHOLDER_HEIGHT: u32 = 1080;

const BACKGROUND: Rgb<u8> = Rgb([0xF3, 0xF4, 0xF6]);
const BORDER: Rgb<u8> = Rgb([0x25, 0x63, 0xEB]);
const HEADING: Rgb<u8> = Rgb([0x25, 0x63, 0xEB]);
const TEXT: Rgb<u8> = Rgb([0x1F, 0x29, 0x37]);
const BORDER_INSET: u32 = 10;
const BORDER_WIDTH: u32 = 4;

const HEADING_SIZE: f32 = 48.0;
const BODY_SIZE: f32 = 32.0;
const TOP: i32 = 200;
const HEADING_STEP: i32 = 60;
const LINE_STEP: i32 = 45;

const BOLD_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:/Windows/Fonts/arialbd.ttf",
    "C:/Windows/Fonts/segoeui.ttf",
];

const REGULAR_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:/Windows/Fonts/arial.ttf",
    "C:/Windows/Fonts/segoeui.ttf",
];

static EMBEDDED_BOLD: &[u8] = include_bytes!("../../../assets/fonts/DejaVuSans-Bold.ttf");
static EMBEDDED_REGULAR: &[u8] = include_bytes!("../../../assets/fonts/DejaVuSans.ttf");

/// Heading and body faces used to draw the placeholder text.
struct PlaceholderFonts {
    heading: FontArc,
    body: FontArc,
}

impl PlaceholderFonts {
    /// System fonts where available, the bundled DejaVu faces otherwise.
    fn load() -> Result<Self, GenerationError> {
        Ok(Self {
            heading: system_or_embedded(BOLD_FONTS, "DejaVuSans-Bold.ttf", EMBEDDED_BOLD)?,
            body: system_or_embedded(REGULAR_FONTS, "DejaVuSans.ttf", EMBEDDED_REGULAR)?,
        })
    }

    #[cfg(test)]
    fn embedded() -> Result<Self, GenerationError> {
        Ok(Self {
            heading: embedded_font(EMBEDDED_BOLD)?,
            body: embedded_font(EMBEDDED_REGULAR)?,
        })
    }
}

fn embedded_font(bytes: &'static [u8]) -> Result<FontArc, GenerationError> {
    let font = FontRef::try_from_slice(bytes)
        .map_err(|e| GenerationError::Image(format!("bundled font: {e}")))?;
    Ok(FontArc::new(font))
}

fn system_or_embedded(
    candidates: &[&str],
    user_font_name: &str,
    embedded: &'static [u8],
) -> Result<FontArc, GenerationError> {
    match load_font(candidates, user_font_name) {
        Some(font) => Ok(FontArc::new(font)),
        None => {
            tracing::debug!(font = user_font_name, "No system font found, using bundled font");
            embedded_font(embedded)
        }
    }
}

/// First readable font from the candidate list, then the user font directory.
fn load_font(candidates: &[&str], user_font_name: &str) -> Option<FontVec> {
    let user = dirs::font_dir().map(|d| d.join(user_font_name));
    candidates
        .iter()
        .map(PathBuf::from)
        .chain(user)
        .find_map(|path| {
            let bytes = std::fs::read(&path).ok()?;
            FontVec::try_from_vec(bytes).ok()
        })
}

/// Text lines drawn on the placeholder, heading first.
pub fn placeholder_lines(slide_number: usize, title: &str) -> Vec<String> {
    let mut lines = vec![format!("SLIDE {slide_number:02}")];
    if !title.is_empty() {
        lines.push(format!("({title})"));
    }
    lines.extend([
        String::new(),
        "Placeholder Image".to_string(),
        String::new(),
        "Generate this slide manually using:".to_string(),
        slide_prompt_filename(slide_number),
        String::new(),
        "Then place the generated image as:".to_string(),
        format!("{}/{}", slide_dir_name(slide_number), GENERATED_IMAGE_FILENAME),
    ]);
    lines
}

/// Render a 1920x1080 PNG with a blue frame and centered text.
pub fn render_placeholder(slide_number: usize, title: &str) -> Result<ImagePayload, GenerationError> {
    let fonts = PlaceholderFonts::load()?;
    render_with_fonts(slide_number, title, &fonts)
}

fn render_with_fonts(
    slide_number: usize,
    title: &str,
    fonts: &PlaceholderFonts,
) -> Result<ImagePayload, GenerationError> {
    let mut img = RgbImage::from_pixel(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, BACKGROUND);

    for t in 0..BORDER_WIDTH {
        let inset = BORDER_INSET + t;
        let rect = Rect::at(inset as i32, inset as i32).of_size(
            PLACEHOLDER_WIDTH - 2 * inset,
            PLACEHOLDER_HEIGHT - 2 * inset,
        );
        draw_hollow_rect_mut(&mut img, rect, BORDER);
    }

    let mut y = TOP;
    for (i, line) in placeholder_lines(slide_number, title).iter().enumerate() {
        let (font, size, color, step) = if i == 0 {
            (&fonts.heading, HEADING_SIZE, HEADING, HEADING_STEP)
        } else {
            (&fonts.body, BODY_SIZE, TEXT, LINE_STEP)
        };
        if !line.is_empty() {
            let scale = PxScale::from(size);
            let (width, _) = text_size(scale, font, line);
            let x = (PLACEHOLDER_WIDTH.saturating_sub(width) / 2) as i32;
            draw_text_mut(&mut img, color, x, y, scale, font, line);
        }
        y += step;
    }

    let mut data = Vec::new();
    img.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .map_err(|e| GenerationError::Image(e.to_string()))?;

    Ok(ImagePayload {
        data,
        mime_type: "image/png".to_string(),
    })
}
