//! Batch scheduling.
//!
//! Posters are one synchronous job. Slide decks run in two phases: slides 1
//! and 2 strictly in order (slide 2's output becomes the style anchor), then
//! every later slide on a bounded worker pool that receives the anchor as an
//! explicit, read-only value. Results are keyed by slide index, so completion
//! order never changes output order.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::enums::OutputKind;
use crate::models::plan::ContentPlan;

use super::prompt::{build_poster_prompt, build_slide_prompt, render_plan, render_section};
use super::reference::{plan_figures, section_figures, ReferenceChain, ANCHOR_SOURCE_INDEX};
use super::sink::PersistenceSink;
use super::style::StyleSpec;
use super::types::{
    BackendMode, GeneratedImage, GenerationJob, ImageBackend, ReferenceImage, POSTER_SECTION_ID,
};
use super::GenerationError;

pub const DEFAULT_WORKERS: usize = 4;

/// A slide that could not be produced. The rest of the batch is unaffected.
#[derive(Debug)]
pub struct SlideFailure {
    pub index: usize,
    pub section_id: String,
    pub error: GenerationError,
}

/// Result of one batch: successful images in section order plus failures.
#[derive(Debug)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub mode: BackendMode,
    pub images: Vec<GeneratedImage>,
    pub failures: Vec<SlideFailure>,
}

impl BatchOutcome {
    fn new(batch_id: Uuid, mode: BackendMode) -> Self {
        Self {
            batch_id,
            started_at: Utc::now(),
            mode,
            images: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-based slide numbers that failed, for re-running just those.
    pub fn failed_slides(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index + 1).collect()
    }
}

pub struct Orchestrator {
    backend: Arc<dyn ImageBackend>,
    style: StyleSpec,
    workers: usize,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn ImageBackend>, style: StyleSpec) -> Self {
        Self {
            backend,
            style,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Size of the phase-2 pool. Zero is treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Run one batch. Configuration problems fail before any job is
    /// dispatched; `sink` sees every image as soon as it is produced.
    pub fn generate(
        &self,
        plan: &ContentPlan,
        figures: &HashMap<String, ReferenceImage>,
        sink: &mut dyn PersistenceSink,
    ) -> Result<BatchOutcome, GenerationError> {
        self.style.ensure_usable()?;
        let mode = self.backend.mode();
        if plan.output == OutputKind::Poster && mode == BackendMode::Export {
            return Err(GenerationError::UnsupportedMode(
                "prompt export only supports slide output".into(),
            ));
        }

        let batch_id = Uuid::new_v4();
        let _span = tracing::info_span!(
            "generation_batch",
            batch_id = %batch_id,
            output = %plan.output,
            style = self.style.name(),
            sections = plan.len()
        )
        .entered();

        let outcome = match (plan.output, mode) {
            (OutputKind::Poster, _) => self.generate_poster(batch_id, plan, figures, sink)?,
            (OutputKind::Slides, BackendMode::Export) => {
                self.export_slides(batch_id, plan, figures, sink)?
            }
            (OutputKind::Slides, BackendMode::Interactive) => {
                self.generate_slides(batch_id, plan, figures, sink)?
            }
        };

        tracing::info!(
            generated = outcome.images.len(),
            failed = outcome.failures.len(),
            "Batch finished"
        );
        Ok(outcome)
    }

    fn generate_poster(
        &self,
        batch_id: Uuid,
        plan: &ContentPlan,
        figures: &HashMap<String, ReferenceImage>,
        sink: &mut dyn PersistenceSink,
    ) -> Result<BatchOutcome, GenerationError> {
        let job = GenerationJob {
            index: 0,
            total: 1,
            section_id: POSTER_SECTION_ID.to_string(),
            title: String::new(),
            prompt: build_poster_prompt(&self.style, &render_plan(plan)),
            references: plan_figures(&plan.sections, figures),
        };

        let payload = self.backend.generate(&job)?;
        let image = GeneratedImage::new(POSTER_SECTION_ID, payload);
        persist(sink, &image, 0, 1);

        let mut outcome = BatchOutcome::new(batch_id, BackendMode::Interactive);
        outcome.images.push(image);
        Ok(outcome)
    }

    fn job_for(
        &self,
        plan: &ContentPlan,
        index: usize,
        deck_context: &str,
        figures: &HashMap<String, ReferenceImage>,
        chain: &ReferenceChain,
    ) -> GenerationJob {
        let section = &plan.sections[index];
        let total = plan.len();
        let prompt = build_slide_prompt(
            &self.style,
            &section.section_type,
            index,
            total,
            deck_context,
            &render_section(section, plan),
        );
        GenerationJob {
            index,
            total,
            section_id: section.id.clone(),
            title: section.title.clone(),
            prompt,
            references: chain.images_for(index, section_figures(section, figures)),
        }
    }

    /// Export mode: every slide in order, then the consolidated instructions.
    fn export_slides(
        &self,
        batch_id: Uuid,
        plan: &ContentPlan,
        figures: &HashMap<String, ReferenceImage>,
        sink: &mut dyn PersistenceSink,
    ) -> Result<BatchOutcome, GenerationError> {
        let total = plan.len();
        let context = render_plan(plan);
        let chain = ReferenceChain::new();
        let mut outcome = BatchOutcome::new(batch_id, BackendMode::Export);

        for index in 0..total {
            let job = self.job_for(plan, index, &context, figures, &chain);
            let payload = self.backend.generate(&job)?;
            let image = GeneratedImage::new(&job.section_id, payload);
            persist(sink, &image, index, total);
            outcome.images.push(image);
        }

        self.backend.finish(total)?;
        Ok(outcome)
    }

    fn generate_slides(
        &self,
        batch_id: Uuid,
        plan: &ContentPlan,
        figures: &HashMap<String, ReferenceImage>,
        sink: &mut dyn PersistenceSink,
    ) -> Result<BatchOutcome, GenerationError> {
        let total = plan.len();
        let context = render_plan(plan);
        let mut outcome = BatchOutcome::new(batch_id, BackendMode::Interactive);

        // Phase 1: slides 1 and 2, in order. Any failure ends the batch.
        let mut chain = ReferenceChain::new();
        for index in 0..total.min(ANCHOR_SOURCE_INDEX + 1) {
            let job = self.job_for(plan, index, &context, figures, &chain);
            let payload = self.backend.generate(&job).map_err(|e| {
                tracing::error!(slide = index + 1, error = %e, "Sequential slide failed, aborting batch");
                GenerationError::AnchorPhase {
                    index,
                    source: Box::new(e),
                }
            })?;
            let image = GeneratedImage::new(&job.section_id, payload);
            chain.capture(index, &image);
            persist(sink, &image, index, total);
            outcome.images.push(image);
        }

        if total <= ANCHOR_SOURCE_INDEX + 1 {
            return Ok(outcome);
        }

        // Phase 2: the anchor is fixed from here on.
        let chain = &chain;
        let context = context.as_str();
        let workers = self.workers.min(total - outcome.images.len());
        tracing::info!(remaining = total - outcome.images.len(), workers, "Starting parallel phase");

        let mut completed: BTreeMap<usize, GeneratedImage> = BTreeMap::new();
        let mut failures = Vec::new();
        let cursor = AtomicUsize::new(ANCHOR_SOURCE_INDEX + 1);

        std::thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                scope.spawn(move || loop {
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    if index >= total {
                        break;
                    }
                    let job = self.job_for(plan, index, context, figures, chain);
                    let result = self.backend.generate(&job);
                    if tx.send((index, job.section_id, result)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for (index, section_id, result) in rx {
                match result {
                    Ok(payload) => {
                        let image = GeneratedImage::new(&section_id, payload);
                        persist(sink, &image, index, total);
                        completed.insert(index, image);
                    }
                    Err(error) => {
                        tracing::error!(slide = index + 1, section_id = %section_id, error = %error, "Slide failed");
                        failures.push(SlideFailure {
                            index,
                            section_id,
                            error,
                        });
                    }
                }
            }
        });

        failures.sort_by_key(|f| f.index);
        outcome.images.extend(completed.into_values());
        outcome.failures = failures;
        Ok(outcome)
    }
}

/// A failed write is logged; the image stays in the outcome.
fn persist(sink: &mut dyn PersistenceSink, image: &GeneratedImage, index: usize, total: usize) {
    if let Err(e) = sink.persist(image, index, total) {
        tracing::warn!(section_id = %image.section_id, error = %e, "Failed to persist image");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::StylePreset;
    use crate::models::plan::{FigureInfo, FigureRef, Section};
    use crate::pipeline::generation::backend::InteractiveBackend;
    use crate::pipeline::generation::client::MockImageClient;
    use crate::pipeline::generation::export::ExportBackend;
    use crate::pipeline::generation::reference::ANCHOR_ID;
    use crate::pipeline::generation::retry::RetryPolicy;
    use crate::pipeline::generation::sink::NullSink;
    use crate::pipeline::generation::style::ResolvedCustomStyle;
    use crate::pipeline::generation::types::ImagePayload;
    use crate::pipeline::generation::wire::{ChatResponse, ContentPart, MultimodalRequest};
    use std::path::PathBuf;
    use std::time::Duration;

    fn plan(n: usize, output: OutputKind) -> ContentPlan {
        let sections = (0..n)
            .map(|i| Section {
                id: format!("s{i}"),
                title: format!("Title {i}"),
                section_type: "content".into(),
                body: format!("Body {i}"),
                tables: vec![],
                figures: if i == 3 {
                    vec![FigureRef {
                        figure_id: "Figure 1".into(),
                        focus: None,
                    }]
                } else {
                    vec![]
                },
            })
            .collect();
        let mut figures = HashMap::new();
        figures.insert(
            "Figure 1".to_string(),
            FigureInfo {
                figure_id: "Figure 1".into(),
                caption: Some("Plot".into()),
                image_path: PathBuf::from("fig.png"),
            },
        );
        ContentPlan {
            output,
            sections,
            tables: HashMap::new(),
            figures,
            base_path: PathBuf::new(),
        }
    }

    fn figures() -> HashMap<String, ReferenceImage> {
        let mut m = HashMap::new();
        m.insert(
            "Figure 1".to_string(),
            ReferenceImage::new("Figure 1", Some("Plot"), vec![5, 5], "image/png"),
        );
        m
    }

    fn prompt_of(request: &MultimodalRequest) -> &str {
        match &request.parts[0] {
            ContentPart::Text { text } => text,
            _ => "",
        }
    }

    fn slide_marker(n: usize, total: usize) -> String {
        format!("\n\nSlide {n} of {total}\n\n")
    }

    fn orchestrator(client: Arc<MockImageClient>, workers: usize) -> Orchestrator {
        let backend = InteractiveBackend::new(client).with_retry(RetryPolicy::immediate());
        Orchestrator::new(Arc::new(backend), StyleSpec::Preset(StylePreset::Academic))
            .with_workers(workers)
    }

    /// Later slides finish first: slide i sleeps (total - i) * 15ms.
    fn reverse_latency_client(total: usize) -> Arc<MockImageClient> {
        Arc::new(MockImageClient::new(move |request, _| {
            let prompt = prompt_of(request).to_string();
            if let Some(i) = (0..total).find(|i| prompt.contains(&slide_marker(i + 1, total))) {
                std::thread::sleep(Duration::from_millis(((total - i) * 15) as u64));
            }
            Some(ChatResponse::with_image("image/png", prompt.as_bytes()))
        }))
    }

    #[test]
    fn output_order_matches_sections_despite_completion_order() {
        for total in [3, 6, 9] {
            let client = reverse_latency_client(total);
            let mut completion = Vec::new();
            let mut sink = |img: &GeneratedImage, i: usize, _n: usize| -> std::io::Result<()> {
                completion.push((i, img.section_id.clone()));
                Ok(())
            };
            let outcome = orchestrator(client, 4)
                .generate(&plan(total, OutputKind::Slides), &figures(), &mut sink)
                .unwrap();

            let ids: Vec<_> = outcome.images.iter().map(|i| i.section_id.clone()).collect();
            let expected: Vec<_> = (0..total).map(|i| format!("s{i}")).collect();
            assert_eq!(ids, expected);
            assert!(outcome.is_complete());
            assert_eq!(completion.len(), total);
            assert_eq!(completion[0].0, 0);
            assert_eq!(completion[1].0, 1);
        }
    }

    #[test]
    fn anchor_attached_only_from_third_slide() {
        let total = 5;
        let client = Arc::new(MockImageClient::echo_prompt());
        orchestrator(client.clone(), 2)
            .generate(&plan(total, OutputKind::Slides), &figures(), &mut NullSink)
            .unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), total);
        for n in 1..=total {
            let request = requests
                .iter()
                .find(|r| prompt_of(r).contains(&slide_marker(n, total)))
                .unwrap();
            let anchor_label = ContentPart::Text {
                text: format!("[{ANCHOR_ID}]: {}", crate::pipeline::generation::ANCHOR_CAPTION),
            };
            let has_anchor = request.parts.contains(&anchor_label);
            assert_eq!(has_anchor, n >= 3, "slide {n}");
            if n >= 3 {
                assert_eq!(request.parts[1], anchor_label);
            }
        }

        // Anchor bytes are slide 2's output.
        let third = requests
            .iter()
            .find(|r| prompt_of(r).contains(&slide_marker(3, total)))
            .unwrap();
        let second_prompt = requests
            .iter()
            .map(prompt_of)
            .find(|p| p.contains(&slide_marker(2, total)))
            .unwrap();
        let anchor = ReferenceImage::new("x", None, second_prompt.as_bytes().to_vec(), "image/png");
        assert!(matches!(
            &third.parts[2],
            ContentPart::ImageUrl { image_url } if image_url.url == anchor.data_url()
        ));

        // Slide 4 carries the anchor then its own figure.
        let fourth = requests
            .iter()
            .find(|r| prompt_of(r).contains(&slide_marker(4, total)))
            .unwrap();
        assert_eq!(fourth.image_count(), 2);
        assert_eq!(fourth.parts[3], ContentPart::Text { text: "[Figure 1]: Plot".into() });
    }

    #[test]
    fn two_slide_deck_stops_after_phase_one() {
        let client = Arc::new(MockImageClient::always(b"img"));
        let outcome = orchestrator(client.clone(), 4)
            .generate(&plan(2, OutputKind::Slides), &figures(), &mut NullSink)
            .unwrap();
        assert_eq!(outcome.images.len(), 2);
        assert_eq!(client.call_count(), 2);
    }

    #[test]
    fn phase_one_failure_aborts_batch() {
        let client = Arc::new(MockImageClient::scripted(vec![], None));
        let mut persisted = 0;
        let mut sink = |_: &GeneratedImage, _: usize, _: usize| -> std::io::Result<()> {
            persisted += 1;
            Ok(())
        };
        let err = orchestrator(client.clone(), 4)
            .generate(&plan(5, OutputKind::Slides), &figures(), &mut sink)
            .unwrap_err();
        assert!(matches!(err, GenerationError::AnchorPhase { index: 0, .. }));
        assert!(err.to_string().contains("Slide 1"));
        assert_eq!(client.call_count(), 3);
        assert_eq!(persisted, 0);
    }

    #[test]
    fn phase_two_failure_is_isolated() {
        let total = 6;
        let client = Arc::new(MockImageClient::new(move |request, _| {
            let prompt = prompt_of(request);
            if prompt.contains(&slide_marker(4, total)) {
                None
            } else {
                Some(ChatResponse::with_image("image/png", b"ok"))
            }
        }));
        let outcome = orchestrator(client.clone(), 3)
            .generate(&plan(total, OutputKind::Slides), &figures(), &mut NullSink)
            .unwrap();

        assert!(!outcome.is_complete());
        assert_eq!(outcome.failed_slides(), vec![4]);
        assert_eq!(outcome.failures[0].section_id, "s3");
        assert!(matches!(
            outcome.failures[0].error,
            GenerationError::RetriesExhausted { attempts: 3, .. }
        ));
        let ids: Vec<_> = outcome.images.iter().map(|i| i.section_id.as_str()).collect();
        assert_eq!(ids, ["s0", "s1", "s2", "s4", "s5"]);
        assert_eq!(client.call_count(), total - 1 + 3);
    }

    #[test]
    fn invalid_custom_style_fails_before_dispatch() {
        let client = Arc::new(MockImageClient::always(b"img"));
        let backend = InteractiveBackend::new(client.clone());
        let style = StyleSpec::Custom(ResolvedCustomStyle::invalid("not a style"));
        let err = Orchestrator::new(Arc::new(backend), style)
            .generate(&plan(3, OutputKind::Slides), &figures(), &mut NullSink)
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidStyle(_)));
        assert!(err.is_configuration());
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn poster_with_export_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("prompts");
        let backend = ExportBackend::new(&root);
        let mut persisted = false;
        let mut sink = |_: &GeneratedImage, _: usize, _: usize| -> std::io::Result<()> {
            persisted = true;
            Ok(())
        };
        let err = Orchestrator::new(Arc::new(backend), StyleSpec::default())
            .generate(&plan(3, OutputKind::Poster), &figures(), &mut sink)
            .unwrap_err();
        assert!(matches!(err, GenerationError::UnsupportedMode(_)));
        assert!(!root.exists());
        assert!(!persisted);
    }

    #[test]
    fn poster_is_single_job_with_all_figures() {
        let client = Arc::new(MockImageClient::always(b"poster-bytes"));
        let outcome = orchestrator(client.clone(), 4)
            .generate(&plan(5, OutputKind::Poster), &figures(), &mut NullSink)
            .unwrap();
        assert_eq!(outcome.images.len(), 1);
        assert_eq!(outcome.images[0].section_id, "poster");
        assert_eq!(client.call_count(), 1);
        let request = &client.requests()[0];
        assert!(prompt_of(request).contains("## Title 4"));
        assert_eq!(request.image_count(), 1);
    }

    #[test]
    fn export_deck_writes_work_queue() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("prompts");
        let backend = ExportBackend::new(&root);
        let outcome = Orchestrator::new(Arc::new(backend), StyleSpec::default())
            .generate(&plan(5, OutputKind::Slides), &figures(), &mut NullSink)
            .unwrap();

        assert_eq!(outcome.mode, BackendMode::Export);
        assert_eq!(outcome.images.len(), 5);
        let entries: Vec<_> = std::fs::read_dir(&root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        let prompts = entries.iter().filter(|n| n.ends_with("_prompt.txt")).count();
        let dirs = entries.iter().filter(|n| n.ends_with("_images")).count();
        assert_eq!(prompts, 5);
        assert_eq!(dirs, 5);
        assert!(root.join("INSTRUCTIONS.md").exists());

        // No anchor in export mode; slide 4 lists only its figure.
        let fourth = std::fs::read_to_string(root.join("slide_04_prompt.txt")).unwrap();
        assert!(fourth.contains("- ref_00_Figure_1.png"));
        assert!(!fourth.contains("Reference_Slide"));
    }

    #[test]
    fn sink_failure_does_not_abort() {
        let client = Arc::new(MockImageClient::always(b"img"));
        let mut sink = |_: &GeneratedImage, _: usize, _: usize| -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        };
        let outcome = orchestrator(client, 2)
            .generate(&plan(4, OutputKind::Slides), &figures(), &mut sink)
            .unwrap();
        assert_eq!(outcome.images.len(), 4);
    }

    /// Records the highest number of `generate` calls running at once.
    #[derive(Default)]
    struct ConcurrencyTracker {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ImageBackend for ConcurrencyTracker {
        fn mode(&self) -> BackendMode {
            BackendMode::Interactive
        }

        fn generate(&self, _job: &GenerationJob) -> Result<ImagePayload, GenerationError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ImagePayload {
                data: b"img".to_vec(),
                mime_type: "image/png".into(),
            })
        }
    }

    #[test]
    fn phase_two_respects_worker_limit() {
        let backend = Arc::new(ConcurrencyTracker::default());
        let outcome = Orchestrator::new(backend.clone(), StyleSpec::Preset(StylePreset::Academic))
            .with_workers(3)
            .generate(&plan(12, OutputKind::Slides), &figures(), &mut NullSink)
            .unwrap();

        assert_eq!(outcome.images.len(), 12);
        assert!(outcome.is_complete());
        let peak = backend.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight {peak} exceeds worker limit");
        assert!(peak >= 2, "phase two never overlapped calls (peak {peak})");
        assert_eq!(backend.in_flight.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_workers_still_progresses() {
        let client = Arc::new(MockImageClient::always(b"img"));
        let outcome = orchestrator(client, 0)
            .generate(&plan(4, OutputKind::Slides), &figures(), &mut NullSink)
            .unwrap();
        assert_eq!(outcome.images.len(), 4);
    }
}
