//! Command-line surface: `generate`, `import`, `enhance-notes`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config::{
    self, GenerationSettings, PLAN_CHECKPOINT_FILENAME, SLIDES_PDF_FILENAME, SLIDES_PPTX_FILENAME,
};
use crate::models::enums::{OutputKind, SpeakerStyle};
use crate::models::plan::{ContentPlan, PlanError};
use crate::pipeline::assembly::{
    AssemblyError, DeckPage, DocumentAssembler, PdfAssembler, PptxAssembler,
};
use crate::pipeline::generation::{
    load_figure_images, BatchOutcome, ChatClient, DirectorySink, ExportBackend, GenerationError,
    ImageBackend, InteractiveBackend, Orchestrator, StyleRequest, StyleSpec, DEFAULT_WORKERS,
};
use crate::pipeline::import::{find_sidecar, import_deck, load_sidecar, ImportError, SidecarSlide};
use crate::pipeline::speaker_notes::{enhance_speaker_notes, NotesError};

/// Directory under the output dir that receives exported prompts.
pub const PROMPTS_DIRNAME: &str = "prompts";

#[derive(Parser, Debug)]
#[command(name = "deckgen", version, about = "Generate posters and slide decks from a content plan")]
pub struct Cli {
    /// Verbose logging (ignored when RUST_LOG is set)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate images for every section of a plan
    Generate {
        /// Planner checkpoint (checkpoint_plan.json)
        #[arg(long)]
        plan: PathBuf,

        /// Where images go (defaults to the plan's directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// `academic`, `playful` (alias `doraemon`), or a free-form style description
        #[arg(long, default_value = "academic")]
        style: String,

        /// Concurrent requests after the style anchor is set
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        parallel: usize,

        /// Write prompts for manual generation instead of calling the model
        #[arg(long)]
        export_prompts: bool,

        /// Write the deck as slides.pptx (with speaker notes) instead of slides.pdf
        #[arg(long)]
        pptx: bool,
    },

    /// Assemble images placed by hand into an exported prompt directory
    Import {
        /// The exported prompt directory
        dir: PathBuf,

        /// Plan to read speaker notes from (default: discovered next to DIR)
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Output file (default: DIR/../slides.pdf, or slides.pptx with --pptx)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write a PowerPoint deck instead of a PDF
        #[arg(long)]
        pptx: bool,
    },

    /// Rewrite structured speaker notes into narrative scripts
    EnhanceNotes {
        checkpoint: PathBuf,

        #[arg(long, default_value = "conversational")]
        speaker_style: SpeakerStyle,
    },
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Notes(#[from] NotesError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{count} slide(s) failed: {slides:?}")]
    Incomplete { count: usize, slides: Vec<usize> },
}

impl CliError {
    /// 2 for configuration problems caught before any generation call, else 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Generation(e) if e.is_configuration() => 2,
            _ => 1,
        }
    }
}

impl Cli {
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            config::debug_log_filter()
        } else {
            config::default_log_filter()
        }
    }
}

pub fn execute(cli: Cli) -> Result<(), CliError> {
    let settings = GenerationSettings::from_env();
    match cli.command {
        Command::Generate {
            plan,
            output_dir,
            style,
            parallel,
            export_prompts,
            pptx,
        } => {
            let output_dir = output_dir.unwrap_or_else(|| default_output_dir(&plan));
            let run = GenerateRun {
                style: &style,
                parallel,
                export_prompts,
                format: DeckFormat::from_flag(pptx),
            };
            generate(&settings, &plan, &output_dir, &run)
        }
        Command::Import {
            dir,
            plan,
            output,
            pptx,
        } => import(&dir, plan.as_deref(), output, DeckFormat::from_flag(pptx)),
        Command::EnhanceNotes {
            checkpoint,
            speaker_style,
        } => {
            let endpoint = settings.resolve_text()?;
            let client = ChatClient::new(&endpoint, settings.timeout())?;
            let count = enhance_speaker_notes(&checkpoint, &client, speaker_style)?;
            tracing::info!(count, path = %checkpoint.display(), "Speaker notes enhanced");
            Ok(())
        }
    }
}

/// Container the assembled deck is written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckFormat {
    Pdf,
    Pptx,
}

impl DeckFormat {
    fn from_flag(pptx: bool) -> Self {
        if pptx {
            DeckFormat::Pptx
        } else {
            DeckFormat::Pdf
        }
    }

    pub fn filename(self) -> &'static str {
        match self {
            DeckFormat::Pdf => SLIDES_PDF_FILENAME,
            DeckFormat::Pptx => SLIDES_PPTX_FILENAME,
        }
    }

    fn assembler(self) -> Box<dyn DocumentAssembler> {
        match self {
            DeckFormat::Pdf => Box::new(PdfAssembler::new(config::APP_NAME)),
            DeckFormat::Pptx => Box::new(PptxAssembler::new(config::APP_NAME)),
        }
    }
}

/// Options of one `generate` invocation.
struct GenerateRun<'a> {
    style: &'a str,
    parallel: usize,
    export_prompts: bool,
    format: DeckFormat,
}

fn default_output_dir(plan: &Path) -> PathBuf {
    plan.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_output_dir)
}

fn resolve_style(settings: &GenerationSettings, arg: &str) -> Result<StyleSpec, GenerationError> {
    let request = StyleRequest::parse(arg);
    if !request.needs_resolution() {
        return Ok(request.resolve(&NoTextClient));
    }
    let endpoint = settings.resolve_text()?;
    let client = ChatClient::new(&endpoint, settings.timeout())?;
    let style = request.resolve(&client);
    style.ensure_usable()?;
    if let Some(custom) = style.custom() {
        tracing::info!(name = %custom.style_name, "Custom style resolved");
    }
    Ok(style)
}

/// Presets never reach the text model.
struct NoTextClient;

impl crate::pipeline::generation::TextClient for NoTextClient {
    fn complete_text(
        &self,
        _system: Option<&str>,
        _user: &str,
        _json_object: bool,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Config("no text model configured".into()))
    }
}

fn generate(
    settings: &GenerationSettings,
    plan_path: &Path,
    output_dir: &Path,
    run: &GenerateRun<'_>,
) -> Result<(), CliError> {
    let plan = ContentPlan::load(plan_path)?;
    if run.export_prompts && plan.output == OutputKind::Poster {
        return Err(GenerationError::UnsupportedMode(
            "prompt export only supports slide output".into(),
        )
        .into());
    }

    let (backend, prompt_dir): (Arc<dyn ImageBackend>, Option<PathBuf>) = if run.export_prompts {
        let export = ExportBackend::new(output_dir.join(PROMPTS_DIRNAME));
        let prompt_dir = export.root().to_path_buf();
        (Arc::new(export), Some(prompt_dir))
    } else {
        let endpoint = settings.require_image()?;
        let client = ChatClient::new(endpoint, settings.timeout())?;
        tracing::info!(model = client.model(), "Using image model");
        (Arc::new(InteractiveBackend::new(Arc::new(client))), None)
    };
    let style = resolve_style(settings, run.style)?;

    std::fs::create_dir_all(output_dir)?;
    if run.export_prompts {
        copy_sidecar(plan_path, output_dir)?;
    }

    let figures = load_figure_images(&plan);
    let orchestrator = Orchestrator::new(backend, style).with_workers(run.parallel);
    let mut sink = DirectorySink::new(output_dir);
    let outcome = orchestrator.generate(&plan, &figures, &mut sink)?;
    tracing::info!(dir = %sink.dir().display(), images = sink.written().len(), "Images saved");

    if let Some(prompt_dir) = prompt_dir {
        tracing::info!(
            dir = %prompt_dir.display(),
            "Prompts exported. Generate images by hand, then run `deckgen import`"
        );
        return Ok(());
    }

    if plan.output == OutputKind::Slides && outcome.images.len() > 1 {
        let notes = load_sidecar(plan_path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read speaker notes from plan");
            Vec::new()
        });
        write_deck(&outcome, &notes, run.format, &output_dir.join(run.format.filename()))?;
    }

    report(&outcome)
}

/// Import looks for the plan next to the prompt directory.
fn copy_sidecar(plan_path: &Path, output_dir: &Path) -> std::io::Result<()> {
    let target = output_dir.join(PLAN_CHECKPOINT_FILENAME);
    let same = match (plan_path.canonicalize(), target.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if !same {
        std::fs::copy(plan_path, &target)?;
    }
    Ok(())
}

fn write_deck(
    outcome: &BatchOutcome,
    notes: &[SidecarSlide],
    format: DeckFormat,
    path: &Path,
) -> Result<(), CliError> {
    let by_id: HashMap<&str, &str> = notes
        .iter()
        .filter(|s| !s.notes.is_empty())
        .map(|s| (s.section_id.as_str(), s.notes.as_str()))
        .collect();
    let pages: Vec<DeckPage<'_>> = DeckPage::from_images(&outcome.images)
        .into_iter()
        .map(|mut page| {
            page.notes = by_id.get(page.image.section_id.as_str()).copied();
            page
        })
        .collect();

    let doc = format.assembler().assemble(&pages, path)?;
    tracing::info!(path = %doc.path.display(), pages = doc.pages, "Deck written");
    Ok(())
}

fn report(outcome: &BatchOutcome) -> Result<(), CliError> {
    if outcome.is_complete() {
        return Ok(());
    }
    for failure in &outcome.failures {
        tracing::error!(
            slide = failure.index + 1,
            section = %failure.section_id,
            error = %failure.error,
            "Slide failed"
        );
    }
    Err(CliError::Incomplete {
        count: outcome.failures.len(),
        slides: outcome.failed_slides(),
    })
}

fn import(
    dir: &Path,
    plan: Option<&Path>,
    output: Option<PathBuf>,
    format: DeckFormat,
) -> Result<(), CliError> {
    let sidecar = plan.map(Path::to_path_buf).or_else(|| find_sidecar(dir));
    let deck = import_deck(dir, sidecar.as_deref())?;

    let output = output.unwrap_or_else(|| {
        dir.parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format.filename())
    });
    let images = deck.images();
    let pages: Vec<DeckPage<'_>> = deck
        .slides
        .iter()
        .zip(&images)
        .map(|(slide, image)| DeckPage {
            number: slide.number,
            image,
            notes: slide.notes.as_deref(),
        })
        .collect();

    let doc = format.assembler().assemble(&pages, &output)?;
    tracing::info!(path = %doc.path.display(), pages = doc.pages, "Imported deck written");
    if !deck.is_complete() {
        tracing::warn!(missing = ?deck.missing, "Deck is missing slides");
    }
    Ok(())
}
