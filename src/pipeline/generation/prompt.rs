//! Prompt building. Every function here is pure: same inputs, same text.

use crate::models::enums::{SectionType, StylePreset};
use crate::models::plan::{ContentPlan, Section};

use super::style::{ResolvedCustomStyle, StyleSpec};

pub const FORMAT_POSTER: &str = "Create a single academic poster image in landscape orientation. \
Organise the content below into clearly separated panels that read left to right, top to bottom. \
The title spans the full width at the top.";

pub const FORMAT_SLIDE: &str = "Create one presentation slide image in 16:9 landscape format. \
The slide title sits at the top; keep generous margins and never let text touch the edges.";

pub const POSTER_STYLE_ACADEMIC: &str = "Style: clean academic conference poster. White or very light background, \
one deep blue accent color, dark gray body text, sans-serif fonts, thin dividers between panels, no decorative clutter.";

pub const POSTER_STYLE_PLAYFUL: &str = "Style: friendly hand-drawn poster. Soft pastel background, \
rounded sans-serif fonts, a cheerful round cartoon mascot that points at or reacts to key results, \
simple doodle icons next to headings.";

pub const SLIDE_STYLE_ACADEMIC: &str = "Style: professional academic slide. White background, \
deep blue accent color for titles and highlights, dark gray body text, sans-serif fonts, \
flat vector icons, minimal decoration.";

pub const SLIDE_STYLE_PLAYFUL: &str = "Style: playful illustrated slide. Soft pastel background, \
rounded sans-serif fonts, a cheerful round cartoon mascot that reacts to the content, \
doodle-style icons and hand-drawn arrows.";

pub const POSTER_COMMON_STYLE_RULES: &str = "Keep every panel readable from two meters away; \
body text never smaller than the caption size used for figures.";

pub const SLIDE_COMMON_STYLE_RULES: &str = "At most six short lines of text per slide; \
prefer icons and diagrams over paragraphs.";

pub const VISUALIZATION_HINTS: &str = "Visualization: turn numbers into charts, sequences into arrows or timelines, \
comparisons into side-by-side layouts, and key terms into bold callouts. Never invent data that is not in the content.";

pub const CONSISTENCY_HINT: &str = "Consistency: if a reference slide image is attached, copy its background color, \
accent color, font style, title placement, and icon style exactly. Only the content changes.";

pub const SLIDE_FIGURE_HINT: &str = "Figures: each attached image is preceded by a label such as [Figure 1]. \
Place the image that matches a **Figure** label in the content unchanged; do not redraw it.";

pub const POSTER_FIGURE_HINT: &str = "Figures: each attached image is preceded by a label such as [Figure 1]. \
Place every labelled image in the panel whose content mentions it; do not redraw it.";

/// Marker written in place of an inlined figure.
pub const IMAGE_ATTACHED_MARKER: &str = "[Image attached]";

/// Separator between rendered sections.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

// ──────────────────────────────────────────────
// Layout tables
// ──────────────────────────────────────────────

fn academic_layout(section_type: SectionType) -> &'static str {
    match section_type {
        SectionType::Opening => "Layout: title slide. Large centered title, subtitle with authors and venue below, \
a thin accent line, nothing else.",
        SectionType::Content => "Layout: title at top, three to five bullet points on the left two thirds, \
one supporting icon or small diagram on the right.",
        SectionType::Figure => "Layout: the attached figure fills the center at least 60% of the slide, \
a one-line takeaway below it.",
        SectionType::Table => "Layout: render the table as a clean grid or bar chart in the center, \
highlight the best row or column with the accent color.",
        SectionType::Ending => "Layout: closing slide. Three key takeaways as large numbered cards, \
a short thank-you line at the bottom.",
    }
}

fn playful_layout(section_type: SectionType) -> &'static str {
    match section_type {
        SectionType::Opening => "Layout: big bubbly title in the center, the mascot waving beside it, \
confetti-like doodles in the corners.",
        SectionType::Content => "Layout: the mascot on one side explaining, speech-bubble style cards with \
the key points on the other side.",
        SectionType::Figure => "Layout: the attached figure in a rounded frame, the mascot pointing at the \
most important part.",
        SectionType::Table => "Layout: the table redrawn as colorful blocks or a simple chart, the mascot \
reacting to the winning value.",
        SectionType::Ending => "Layout: the mascot celebrating, takeaways as sticky notes, a friendly thank-you.",
    }
}

fn default_layout(section_type: SectionType) -> &'static str {
    match section_type {
        SectionType::Opening => "Layout: title slide with a large centered title and a short subtitle.",
        SectionType::Figure => "Layout: the attached figure is the focal point, with a one-line caption.",
        SectionType::Ending => "Layout: closing slide with the main takeaways and a short thank-you.",
        SectionType::Content | SectionType::Table => "Layout: title at top, key points as short bullets or \
cards, one supporting visual.",
    }
}

/// Layout rule for a section tag under the given style. Unknown tags use the
/// content layout.
pub fn layout_rule(style: &StyleSpec, section_tag: &str) -> &'static str {
    let section_type = SectionType::from_tag(section_tag);
    match style {
        StyleSpec::Custom(_) | StyleSpec::Preset(StylePreset::Custom) => default_layout(section_type),
        StyleSpec::Preset(StylePreset::Playful) => playful_layout(section_type),
        StyleSpec::Preset(StylePreset::Academic) => academic_layout(section_type),
    }
}

// ──────────────────────────────────────────────
// Style blocks
// ──────────────────────────────────────────────

fn format_custom_style(style: &ResolvedCustomStyle, common_rules: &str) -> String {
    let mut parts = vec![
        format!("{}.", style.style_name),
        "English text only.".to_string(),
        "Use ROUNDED sans-serif fonts for ALL text.".to_string(),
        "Characters react to or interact with the content with fitting poses and sizes, not as decoration."
            .to_string(),
        format!("LIMITED COLOR PALETTE (3-4 colors max): {}.", style.color_tone),
        common_rules.to_string(),
    ];
    if !style.special_elements.is_empty() {
        parts.push(format!("{}.", style.special_elements));
    }
    format!("Style: {}", parts.join(" "))
}

fn poster_style_block(style: &StyleSpec) -> String {
    match style {
        StyleSpec::Custom(custom) => format_custom_style(custom, POSTER_COMMON_STYLE_RULES),
        StyleSpec::Preset(StylePreset::Playful) => POSTER_STYLE_PLAYFUL.to_string(),
        StyleSpec::Preset(_) => POSTER_STYLE_ACADEMIC.to_string(),
    }
}

fn slide_style_block(style: &StyleSpec) -> String {
    match style {
        StyleSpec::Custom(custom) => format_custom_style(custom, SLIDE_COMMON_STYLE_RULES),
        StyleSpec::Preset(StylePreset::Playful) => SLIDE_STYLE_PLAYFUL.to_string(),
        StyleSpec::Preset(_) => SLIDE_STYLE_ACADEMIC.to_string(),
    }
}

fn decorations_line(style: &StyleSpec) -> Option<String> {
    style
        .custom()
        .filter(|c| !c.decorations.is_empty())
        .map(|c| format!("Decorations: {}", c.decorations))
}

// ──────────────────────────────────────────────
// Content rendering
// ──────────────────────────────────────────────

fn focus_suffix(focus: Option<&str>) -> String {
    match focus.filter(|f| !f.is_empty()) {
        Some(f) => format!(" (focus: {f})"),
        None => String::new(),
    }
}

/// Render one section: heading, body, then a labelled entry per known table
/// and figure reference. Unknown ids are left out.
pub fn render_section(section: &Section, plan: &ContentPlan) -> String {
    let mut lines = vec![format!("## {}", section.title), String::new(), section.body.clone()];

    for table_ref in &section.tables {
        let Some(table) = plan.tables.get(&table_ref.table_id) else {
            continue;
        };
        lines.push(String::new());
        lines.push(format!(
            "**{}**{}:",
            table_ref.table_id,
            focus_suffix(table_ref.focus.as_deref())
        ));
        let excerpt = table_ref
            .extract
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(&table.html_content);
        lines.push(excerpt.to_string());
    }

    for figure_ref in &section.figures {
        let Some(figure) = plan.figures.get(&figure_ref.figure_id) else {
            continue;
        };
        let caption = match figure.caption.as_deref().filter(|c| !c.is_empty()) {
            Some(c) => format!(": {c}"),
            None => String::new(),
        };
        lines.push(String::new());
        lines.push(format!(
            "**{}**{}{}",
            figure_ref.figure_id,
            focus_suffix(figure_ref.focus.as_deref()),
            caption
        ));
        lines.push(IMAGE_ATTACHED_MARKER.to_string());
    }

    lines.join("\n")
}

/// Render every section in order, separated by horizontal rules.
pub fn render_plan(plan: &ContentPlan) -> String {
    plan.sections
        .iter()
        .map(|s| render_section(s, plan))
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

// ──────────────────────────────────────────────
// Prompts
// ──────────────────────────────────────────────

pub fn build_poster_prompt(style: &StyleSpec, rendered_plan: &str) -> String {
    let mut parts = vec![FORMAT_POSTER.to_string(), poster_style_block(style)];
    if let Some(decorations) = decorations_line(style) {
        parts.push(decorations);
    }
    parts.push(VISUALIZATION_HINTS.to_string());
    parts.push(POSTER_FIGURE_HINT.to_string());
    parts.push(format!("---\nContent:\n{rendered_plan}"));
    parts.join("\n\n")
}

/// Build the instruction text for one slide.
///
/// `index` is zero-based; `deck_context` is the full rendered plan and
/// `section_text` the rendered current section.
pub fn build_slide_prompt(
    style: &StyleSpec,
    section_tag: &str,
    index: usize,
    total: usize,
    deck_context: &str,
    section_text: &str,
) -> String {
    let mut parts = vec![
        FORMAT_SLIDE.to_string(),
        slide_style_block(style),
        layout_rule(style, section_tag).to_string(),
    ];
    if let Some(decorations) = decorations_line(style) {
        parts.push(decorations);
    }
    parts.push(VISUALIZATION_HINTS.to_string());
    parts.push(CONSISTENCY_HINT.to_string());
    parts.push(SLIDE_FIGURE_HINT.to_string());
    parts.push(format!("Slide {} of {}", index + 1, total));
    parts.push(format!("---\nFull presentation context:\n{deck_context}"));
    parts.push(format!("---\nThis slide content:\n{section_text}"));
    parts.join("\n\n")
}
