//! PowerPoint output: one 16:9 slide per image, picture stretched over the
//! whole slide, speaker notes on the slide's notes page.
//!
//! Writes a minimal OOXML package directly (`zip` + `quick-xml` escaping):
//! one master, one blank layout, one notes master, shared theme.

use std::io::{Cursor, Write};
use std::path::Path;

use chrono::Utc;
use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::APP_NAME;

use super::{AssembledDocument, AssemblyError, DeckPage, DocumentAssembler};

/// 13.333in x 7.5in.
pub const SLIDE_WIDTH_EMU: u64 = 12_192_000;
pub const SLIDE_HEIGHT_EMU: u64 = 6_858_000;
const NOTES_WIDTH_EMU: u64 = 6_858_000;
const NOTES_HEIGHT_EMU: u64 = 9_144_000;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const CT_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_NOTES: &str = "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";

pub struct PptxAssembler {
    title: String,
}

impl PptxAssembler {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
        }
    }
}

impl DocumentAssembler for PptxAssembler {
    fn assemble(&self, pages: &[DeckPage<'_>], output: &Path) -> Result<AssembledDocument, AssemblyError> {
        let bytes = render_pptx(pages, &self.title)?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, &bytes)?;

        tracing::info!(
            path = %output.display(),
            slides = pages.len(),
            bytes = bytes.len(),
            "Assembled PPTX"
        );
        Ok(AssembledDocument {
            path: output.to_path_buf(),
            pages: pages.len(),
            notes_path: None,
        })
    }
}

/// Media bytes and extension as stored in the package. PowerPoint reads PNG
/// and JPEG; anything else is re-encoded as PNG.
fn slide_media(page: &DeckPage<'_>) -> Result<(Vec<u8>, &'static str), AssemblyError> {
    let generated = page.image;
    match generated.mime_type.as_str() {
        "image/png" => Ok((generated.image_data.clone(), "png")),
        "image/jpeg" | "image/jpg" => Ok((generated.image_data.clone(), "jpg")),
        _ => {
            let decoded = image::load_from_memory(&generated.image_data).map_err(|e| AssemblyError::Decode {
                section_id: generated.section_id.clone(),
                reason: e.to_string(),
            })?;
            let mut png = Vec::new();
            decoded
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(|e| AssemblyError::Decode {
                    section_id: generated.section_id.clone(),
                    reason: e.to_string(),
                })?;
            Ok((png, "png"))
        }
    }
}

fn notes_text<'a>(page: &DeckPage<'a>) -> Option<&'a str> {
    page.notes.map(str::trim).filter(|n| !n.is_empty())
}

/// Build the package in memory. Returns PPTX bytes.
pub fn render_pptx(pages: &[DeckPage<'_>], title: &str) -> Result<Vec<u8>, AssemblyError> {
    if pages.is_empty() {
        return Err(AssemblyError::NoImages);
    }

    let mut package = Package::new();
    let mut overrides = Vec::new();

    for (i, page) in pages.iter().enumerate() {
        let n = i + 1;
        let (media, ext) = slide_media(page)?;
        package.add(&format!("ppt/media/image{n}.{ext}"), &media)?;

        let notes = notes_text(page);
        let mut rels = vec![
            rel(1, "slideLayout", "../slideLayouts/slideLayout1.xml"),
            rel(2, "image", &format!("../media/image{n}.{ext}")),
        ];
        if let Some(notes) = notes {
            rels.push(rel(3, "notesSlide", &format!("../notesSlides/notesSlide{n}.xml")));
            package.add_str(&format!("ppt/notesSlides/notesSlide{n}.xml"), &notes_slide_xml(notes))?;
            package.add_str(
                &format!("ppt/notesSlides/_rels/notesSlide{n}.xml.rels"),
                &relationships(&[
                    rel(1, "notesMaster", "../notesMasters/notesMaster1.xml"),
                    rel(2, "slide", &format!("../slides/slide{n}.xml")),
                ]),
            )?;
            overrides.push((format!("/ppt/notesSlides/notesSlide{n}.xml"), CT_NOTES));
        }

        package.add_str(&format!("ppt/slides/slide{n}.xml"), &slide_xml(n))?;
        package.add_str(&format!("ppt/slides/_rels/slide{n}.xml.rels"), &relationships(&rels))?;
        overrides.push((format!("/ppt/slides/slide{n}.xml"), CT_SLIDE));
    }

    package.add_str("[Content_Types].xml", &content_types(&overrides))?;
    package.add_str(
        "_rels/.rels",
        &format!(
            r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL}/officeDocument" Target="ppt/presentation.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#
        ),
    )?;
    package.add_str("docProps/core.xml", &core_properties(title))?;
    package.add_str("ppt/presentation.xml", &presentation_xml(pages.len()))?;

    let mut presentation_rels = vec![
        rel(1, "slideMaster", "slideMasters/slideMaster1.xml"),
        rel(2, "notesMaster", "notesMasters/notesMaster1.xml"),
        rel(3, "theme", "theme/theme1.xml"),
    ];
    presentation_rels.extend((1..=pages.len()).map(|n| rel(n + 3, "slide", &format!("slides/slide{n}.xml"))));
    package.add_str("ppt/_rels/presentation.xml.rels", &relationships(&presentation_rels))?;

    package.add_str("ppt/slideMasters/slideMaster1.xml", &slide_master_xml())?;
    package.add_str(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        &relationships(&[
            rel(1, "slideLayout", "../slideLayouts/slideLayout1.xml"),
            rel(2, "theme", "../theme/theme1.xml"),
        ]),
    )?;
    package.add_str("ppt/slideLayouts/slideLayout1.xml", &slide_layout_xml())?;
    package.add_str(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        &relationships(&[rel(1, "slideMaster", "../slideMasters/slideMaster1.xml")]),
    )?;
    package.add_str("ppt/notesMasters/notesMaster1.xml", &notes_master_xml())?;
    package.add_str(
        "ppt/notesMasters/_rels/notesMaster1.xml.rels",
        &relationships(&[rel(1, "theme", "../theme/theme2.xml")]),
    )?;
    package.add_str("ppt/theme/theme1.xml", &theme_xml())?;
    package.add_str("ppt/theme/theme2.xml", &theme_xml())?;

    package.finish()
}

// ──────────────────────────────────────────────
// Package writer
// ──────────────────────────────────────────────

struct Package {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl Package {
    fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    fn add(&mut self, name: &str, data: &[u8]) -> Result<(), AssemblyError> {
        self.zip
            .start_file(name, self.options)
            .map_err(|e| AssemblyError::Archive(e.to_string()))?;
        self.zip.write_all(data)?;
        Ok(())
    }

    fn add_str(&mut self, name: &str, xml: &str) -> Result<(), AssemblyError> {
        self.add(name, xml.as_bytes())
    }

    fn finish(self) -> Result<Vec<u8>, AssemblyError> {
        let cursor = self
            .zip
            .finish()
            .map_err(|e| AssemblyError::Archive(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

// ──────────────────────────────────────────────
// Parts
// ──────────────────────────────────────────────

fn rel(id: usize, kind: &str, target: &str) -> String {
    format!(r#"<Relationship Id="rId{id}" Type="{REL}/{kind}" Target="{target}"/>"#)
}

fn relationships(rels: &[String]) -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        rels.concat()
    )
}

fn content_types(overrides: &[(String, &str)]) -> String {
    let fixed = [
        ("/ppt/presentation.xml", CT_PRESENTATION),
        (
            "/ppt/slideMasters/slideMaster1.xml",
            "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml",
        ),
        (
            "/ppt/slideLayouts/slideLayout1.xml",
            "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml",
        ),
        (
            "/ppt/notesMasters/notesMaster1.xml",
            "application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml",
        ),
        ("/ppt/theme/theme1.xml", "application/vnd.openxmlformats-officedocument.theme+xml"),
        ("/ppt/theme/theme2.xml", "application/vnd.openxmlformats-officedocument.theme+xml"),
        ("/docProps/core.xml", "application/vnd.openxmlformats-package.core-properties+xml"),
    ];
    let parts: String = fixed
        .iter()
        .map(|(name, ct)| (name.to_string(), *ct))
        .chain(overrides.iter().cloned())
        .map(|(name, ct)| format!(r#"<Override PartName="{name}" ContentType="{ct}"/>"#))
        .collect();
    format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpg" ContentType="image/jpeg"/>{parts}</Types>"#
    )
}

fn core_properties(title: &str) -> String {
    format!(
        r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>{APP_NAME}</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created></cp:coreProperties>"#,
        escape(title),
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    )
}

fn presentation_xml(slides: usize) -> String {
    let ids: String = (1..=slides)
        .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 3))
        .collect();
    format!(
        r#"{XML_DECL}<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:notesMasterIdLst><p:notesMasterId r:id="rId2"/></p:notesMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{SLIDE_WIDTH_EMU}" cy="{SLIDE_HEIGHT_EMU}"/><p:notesSz cx="{NOTES_WIDTH_EMU}" cy="{NOTES_HEIGHT_EMU}"/></p:presentation>"#
    )
}

const GROUP_PROPS: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

const CLR_MAP: &str = r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#;

const MASTER_BG: &str = r#"<p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>"#;

fn slide_xml(n: usize) -> String {
    format!(
        r#"{XML_DECL}<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree>{GROUP_PROPS}<p:pic><p:nvPicPr><p:cNvPr id="2" name="Slide Image {n}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{SLIDE_WIDTH_EMU}" cy="{SLIDE_HEIGHT_EMU}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

/// One `<a:p>` per line; blank lines stay as empty paragraphs.
fn paragraphs(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#.to_string()
            } else {
                format!(
                    r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                    escape(line)
                )
            }
        })
        .collect()
}

fn notes_slide_xml(notes: &str) -> String {
    format!(
        r#"{XML_DECL}<p:notes xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree>{GROUP_PROPS}<p:sp><p:nvSpPr><p:cNvPr id="2" name="Notes Placeholder 1"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:notes>"#,
        paragraphs(notes)
    )
}

fn slide_master_xml() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld>{MASTER_BG}<p:spTree>{GROUP_PROPS}</p:spTree></p:cSld>{CLR_MAP}<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_layout_xml() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{GROUP_PROPS}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn notes_master_xml() -> String {
    format!(
        r#"{XML_DECL}<p:notesMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld>{MASTER_BG}<p:spTree>{GROUP_PROPS}</p:spTree></p:cSld>{CLR_MAP}</p:notesMaster>"#
    )
}

fn theme_xml() -> String {
    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = r#"<a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#;
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    let font = r#"<a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/>"#;
    let accents: String = ["2563EB", "F59E0B", "10B981", "EF4444", "8B5CF6", "06B6D4"]
        .iter()
        .enumerate()
        .map(|(i, rgb)| format!(r#"<a:accent{n}><a:srgbClr val="{rgb}"/></a:accent{n}>"#, n = i + 1))
        .collect();
    format!(
        r#"{XML_DECL}<a:theme xmlns:a="{NS_A}" name="{APP_NAME}"><a:themeElements><a:clrScheme name="{APP_NAME}"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F2937"/></a:dk2><a:lt2><a:srgbClr val="F3F4F6"/></a:lt2>{accents}<a:hlink><a:srgbClr val="2563EB"/></a:hlink><a:folHlink><a:srgbClr val="7C3AED"/></a:folHlink></a:clrScheme><a:fontScheme name="{APP_NAME}"><a:majorFont>{font}</a:majorFont><a:minorFont>{font}</a:minorFont></a:fontScheme><a:fmtScheme name="{APP_NAME}"><a:fillStyleLst>{solid}{solid}{solid}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{solid}{solid}{solid}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::generation::GeneratedImage;
    use crate::pipeline::generation::ImagePayload;
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use std::io::Read;

    fn encoded(id: &str, format: image::ImageFormat, mime: &str) -> GeneratedImage {
        let img = image::RgbImage::from_pixel(16, 9, image::Rgb([200, 30, 30]));
        let mut data = Vec::new();
        img.write_to(&mut Cursor::new(&mut data), format).unwrap();
        GeneratedImage::new(
            id,
            ImagePayload {
                data,
                mime_type: mime.to_string(),
            },
        )
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut out = String::new();
        part.read_to_string(&mut out).unwrap();
        out
    }

    /// Visible text of a DrawingML part, one line per paragraph.
    fn text_of(xml: &str) -> String {
        let mut reader = Reader::from_str(xml);
        let mut out = String::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Text(t) => out.push_str(&t.unescape().unwrap()),
                Event::End(e) if e.name().as_ref() == b"a:p" => out.push('\n'),
                Event::Empty(e) if e.name().as_ref() == b"a:p" => out.push('\n'),
                Event::Eof => break,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn deck_has_one_slide_per_page_and_notes() {
        let images = [
            encoded("intro", image::ImageFormat::Png, "image/png"),
            encoded("results", image::ImageFormat::Jpeg, "image/jpeg"),
            encoded("outro", image::ImageFormat::Png, "image/png"),
        ];
        let notes = "Results & caveats\n\n• F1 < 0.9 on <small> sets";
        let pages = vec![
            DeckPage { number: 1, image: &images[0], notes: None },
            DeckPage { number: 2, image: &images[1], notes: Some(notes) },
            DeckPage { number: 3, image: &images[2], notes: Some("  ") },
        ];

        let bytes = render_pptx(&pages, "Talk <draft>").unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        let slides = names
            .iter()
            .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
            .count();
        let notes_slides = names
            .iter()
            .filter(|n| n.starts_with("ppt/notesSlides/notesSlide") && n.ends_with(".xml"))
            .count();
        assert_eq!(slides, 3);
        assert_eq!(notes_slides, 1);
        assert!(names.contains(&"ppt/media/image2.jpg"));

        let text = text_of(&read_part(&bytes, "ppt/notesSlides/notesSlide2.xml"));
        assert_eq!(text, "Results & caveats\n\n• F1 < 0.9 on <small> sets\n");

        let rels = read_part(&bytes, "ppt/slides/_rels/slide2.xml.rels");
        assert!(rels.contains("../notesSlides/notesSlide2.xml"));
        assert!(!read_part(&bytes, "ppt/slides/_rels/slide1.xml.rels").contains("notesSlide"));

        let presentation = read_part(&bytes, "ppt/presentation.xml");
        assert!(presentation.contains(r#"<p:sldSz cx="12192000" cy="6858000"/>"#));
        assert!(read_part(&bytes, "docProps/core.xml").contains("Talk &lt;draft&gt;"));
    }

    #[test]
    fn picture_covers_whole_slide() {
        let images = [encoded("a", image::ImageFormat::Png, "image/png")];
        let bytes = render_pptx(&DeckPage::from_images(&images), "t").unwrap();
        let slide = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide.contains(r#"<a:off x="0" y="0"/><a:ext cx="12192000" cy="6858000"/>"#));
    }

    #[test]
    fn webp_is_stored_as_png() {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 255, 255]));
        let mut data = Vec::new();
        img.write_to(&mut Cursor::new(&mut data), image::ImageFormat::WebP).unwrap();
        let images = [GeneratedImage::new(
            "w",
            ImagePayload {
                data,
                mime_type: "image/webp".into(),
            },
        )];
        let bytes = render_pptx(&DeckPage::from_images(&images), "t").unwrap();
        let media = {
            let mut archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
            let mut part = archive.by_name("ppt/media/image1.png").unwrap();
            let mut buf = Vec::new();
            part.read_to_end(&mut buf).unwrap();
            buf
        };
        assert_eq!(&media[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn empty_deck_is_rejected() {
        assert!(matches!(render_pptx(&[], "t"), Err(AssemblyError::NoImages)));
    }

    #[test]
    fn assembler_writes_file_without_sidecar_notes() {
        let dir = tempfile::tempdir().unwrap();
        let images = [
            encoded("a", image::ImageFormat::Png, "image/png"),
            encoded("b", image::ImageFormat::Png, "image/png"),
        ];
        let mut pages = DeckPage::from_images(&images);
        pages[0].notes = Some("Say hello");
        let out = dir.path().join("deck").join("slides.pptx");

        let doc = PptxAssembler::new("Deck").assemble(&pages, &out).unwrap();
        assert_eq!(doc.pages, 2);
        assert!(doc.notes_path.is_none());
        assert!(out.is_file());
        assert!(!dir.path().join("deck").join(crate::pipeline::assembly::NOTES_FILENAME).exists());
    }
}
