use crate::capability::Capabilities;
use crate::common::scene_image::SceneImage;
use crate::error::{AppError, StageError};
use crate::pipeline::domain::findings::FindingsRecord;
use crate::pipeline::domain::pipeline_result::{PipelineResult, StageWarning};
use crate::pipeline::domain::report_document::{RenderedReport, ReportSink};
use crate::pipeline::domain::request::{AnalysisRequest, Jurisdiction, LanguageMode};
use crate::pipeline::orchestration::phase_timings::PhaseTimings;
use crate::pipeline::orchestration::pipeline_phase::PipelinePhase;
use crate::pipeline::orchestration::processing_step::ImageStep;
use crate::pipeline::services::findings_service::FindingsService;
use crate::pipeline::services::image::{SceneAnnotationService, SceneDiagramService};
use crate::pipeline::services::report::ReportRenderService;
use image::DynamicImage;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

/// What a single stage handed back, with how long it took.
struct StageOutcome<T> {
    result: Result<T, StageError>,
    elapsed: Duration,
}

/// Runs the four stages for one request and gathers whatever they produced.
///
/// Annotation, reconstruction and findings do not depend on one another and
/// may run concurrently; rendering needs the findings and runs last. A stage
/// that fails, panics or lacks its capability leaves its slot empty and adds a
/// warning. Only a request that fails validation is rejected outright.
#[derive(Clone)]
pub struct ReportPipeline {
    annotator: Arc<dyn ImageStep>,
    reconstructor: Arc<dyn ImageStep>,
    findings: FindingsService,
    renderer: ReportRenderService,
    parallel_stages: bool,
}

impl ReportPipeline {
    pub fn new(capabilities: &Capabilities) -> Self {
        Self::builder(capabilities).build()
    }

    pub fn builder(capabilities: &Capabilities) -> ReportPipelineBuilder {
        ReportPipelineBuilder::new(capabilities)
    }

    pub fn parallel_stages(&self) -> bool {
        self.parallel_stages
    }

    pub async fn run(&self, request: AnalysisRequest) -> Result<PipelineResult, AppError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("analysis", request_id = %request_id);
        self.execute(request_id, request).instrument(span).await
    }

    async fn execute(
        &self,
        request_id: Uuid,
        request: AnalysisRequest,
    ) -> Result<PipelineResult, AppError> {
        let started = Instant::now();
        let request = request.validate().map_err(|failure| {
            error!("Request rejected: {}", failure);
            AppError::from(failure)
        })?;

        let (width, height) = request.image.dimensions();
        info!(
            "Analyzing {} ({}x{}) for {} [{}]",
            request.image.source(),
            width,
            height,
            request.jurisdiction,
            request.language
        );

        let (annotated, diagram, findings) = self
            .run_independent_stages(&request.image, request.jurisdiction)
            .await;

        let mut phase = PipelinePhase::Idle;
        let mut timings = PhaseTimings::new();
        let mut warnings = Vec::new();

        advance(&mut phase);
        let annotated_image = collect(phase, annotated, &mut timings, &mut warnings);

        advance(&mut phase);
        let diagram_image = collect(phase, diagram, &mut timings, &mut warnings);

        advance(&mut phase);
        let findings = collect(phase, findings, &mut timings, &mut warnings);

        advance(&mut phase);
        let rendered = match &findings {
            Some(findings) => {
                self.render_report(
                    request_id,
                    findings.clone(),
                    request.language,
                    request.sink.clone(),
                )
                .await
            }
            None => StageOutcome {
                result: Err(StageError::failure("no findings to render")),
                elapsed: Duration::ZERO,
            },
        };
        let report = collect(phase, rendered, &mut timings, &mut warnings);

        advance(&mut phase);
        debug_assert!(phase.is_terminal());
        timings.finish(started.elapsed());

        let result = PipelineResult {
            request_id,
            annotated_image,
            diagram_image,
            findings,
            report,
            warnings,
            timings,
        };
        info!(
            "Analysis finished in {:?} with {} warning(s)",
            started.elapsed(),
            result.warnings.len()
        );
        Ok(result)
    }

    async fn run_independent_stages(
        &self,
        scene: &SceneImage,
        jurisdiction: Jurisdiction,
    ) -> (
        StageOutcome<DynamicImage>,
        StageOutcome<DynamicImage>,
        StageOutcome<FindingsRecord>,
    ) {
        let annotate = run_image_step(self.annotator.clone(), scene.clone());
        let reconstruct = run_image_step(self.reconstructor.clone(), scene.clone());
        let findings = self.findings.clone();
        let analyze = run_blocking(move || Ok(findings.generate_findings(jurisdiction)));

        if self.parallel_stages {
            tokio::join!(annotate, reconstruct, analyze)
        } else {
            let annotated = annotate.await;
            let diagram = reconstruct.await;
            let findings = analyze.await;
            (annotated, diagram, findings)
        }
    }

    async fn render_report(
        &self,
        request_id: Uuid,
        findings: FindingsRecord,
        language: LanguageMode,
        sink: ReportSink,
    ) -> StageOutcome<RenderedReport> {
        let renderer = self.renderer.clone();
        run_blocking(move || renderer.render(request_id, &findings, language, &sink)).await
    }
}

fn advance(phase: &mut PipelinePhase) {
    let next = phase.next();
    debug!("Phase {} -> {}", phase, next);
    *phase = next;
}

fn collect<T>(
    phase: PipelinePhase,
    outcome: StageOutcome<T>,
    timings: &mut PhaseTimings,
    warnings: &mut Vec<StageWarning>,
) -> Option<T> {
    timings.record(phase, outcome.elapsed);
    debug!("{} took {:?}", phase, outcome.elapsed);
    match outcome.result {
        Ok(value) => Some(value),
        Err(e) => {
            let warning = StageWarning::from_error(phase, e);
            warn!("{}", warning);
            warnings.push(warning);
            None
        }
    }
}

async fn run_image_step(step: Arc<dyn ImageStep>, scene: SceneImage) -> StageOutcome<DynamicImage> {
    run_blocking(move || {
        debug!("Running {}", step.name());
        step.process(&scene)
    })
    .await
}

/// Runs `work` on the blocking pool. A panic ends up as a stage failure rather
/// than tearing down the request.
async fn run_blocking<T, F>(work: F) -> StageOutcome<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StageError> + Send + 'static,
{
    let started = Instant::now();
    let result = match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(join_error) if join_error.is_panic() => Err(StageError::failure(format!(
            "stage panicked: {}",
            panic_message(join_error.into_panic())
        ))),
        Err(join_error) => Err(StageError::failure(format!(
            "stage did not complete: {}",
            join_error
        ))),
    };
    StageOutcome {
        result,
        elapsed: started.elapsed(),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

pub struct ReportPipelineBuilder {
    annotator: Arc<dyn ImageStep>,
    reconstructor: Arc<dyn ImageStep>,
    renderer: ReportRenderService,
    parallel_stages: bool,
}

impl ReportPipelineBuilder {
    pub fn new(capabilities: &Capabilities) -> Self {
        Self {
            annotator: Arc::new(SceneAnnotationService::new(capabilities.graphics.clone())),
            reconstructor: Arc::new(SceneDiagramService::new(capabilities.graphics.clone())),
            renderer: ReportRenderService::new(capabilities.document.clone()),
            parallel_stages: true,
        }
    }

    // Replaces the annotation stage.
    pub fn annotator(mut self, annotator: Arc<dyn ImageStep>) -> Self {
        self.annotator = annotator;
        self
    }

    // Replaces the diagram stage.
    pub fn reconstructor(mut self, reconstructor: Arc<dyn ImageStep>) -> Self {
        self.reconstructor = reconstructor;
        self
    }

    pub fn parallel_stages(mut self, parallel_stages: bool) -> Self {
        self.parallel_stages = parallel_stages;
        self
    }

    pub fn build(self) -> ReportPipeline {
        ReportPipeline {
            annotator: self.annotator,
            reconstructor: self.reconstructor,
            findings: FindingsService::new(),
            renderer: self.renderer,
            parallel_stages: self.parallel_stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        Capability, CapabilityKind, DocumentBackend, GraphicsBackend, LoadedFont,
    };
    use crate::error::PreconditionFailure;
    use crate::pipeline::domain::pipeline_result::{RunStatus, WarningReason};
    use crate::pipeline::domain::report_document::TextDirection;
    use image::{ImageBuffer, Rgb};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct PanickingStep;

    impl ImageStep for PanickingStep {
        fn process(&self, _scene: &SceneImage) -> Result<DynamicImage, StageError> {
            panic!("renderer exploded")
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    fn scene(width: u32, height: u32) -> SceneImage {
        SceneImage::new(
            DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([40, 40, 40]))),
            "test.jpg",
        )
    }

    fn capabilities(dir: &TempDir) -> Capabilities {
        Capabilities::new(
            Capability::Available(GraphicsBackend::new(LoadedFont::bundled().unwrap())),
            Capability::Available(DocumentBackend::new(dir.path())),
        )
    }

    fn written_reports(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn full_run_produces_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ReportPipeline::new(&capabilities(&dir));
        let request = AnalysisRequest::new(
            scene(800, 600),
            Jurisdiction::Uae,
            LanguageMode::ArabicAndEnglish,
        );

        let result = pipeline.run(request).await.unwrap();

        assert_eq!(result.status(), RunStatus::Complete);
        let annotated = result.annotated_image.as_ref().unwrap();
        assert_eq!((annotated.width(), annotated.height()), (800, 600));
        let diagram = result.diagram_image.as_ref().unwrap();
        assert_eq!((diagram.width(), diagram.height()), (600, 400));

        let findings = result.findings.as_ref().unwrap();
        assert_eq!(findings.law_reference(), "Local Traffic Law");
        assert_eq!(findings.confidence().value(), 87);

        let report = result.report.as_ref().unwrap();
        assert_eq!(report.document.page_count(), 2);
        assert_eq!(report.document.pages()[1].direction, TextDirection::RightToLeft);
        assert!(result.report_path().unwrap().exists());
        assert_eq!(written_reports(&dir), 1);
    }

    #[tokio::test]
    async fn missing_graphics_still_yields_findings_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let capabilities = Capabilities::new(
            Capability::unavailable("forced off"),
            Capability::Available(DocumentBackend::new(dir.path())),
        );
        let pipeline = ReportPipeline::new(&capabilities);
        let request = AnalysisRequest::new(scene(64, 48), Jurisdiction::SaudiArabia, LanguageMode::English);

        let result = pipeline.run(request).await.unwrap();

        assert_eq!(result.status(), RunStatus::Partial);
        assert!(result.annotated_image.is_none());
        assert!(result.diagram_image.is_none());
        assert!(result.findings.is_some());
        assert!(result.report_path().is_some());

        let warning = result.warning_for(PipelinePhase::Annotating).unwrap();
        assert!(warning.is_capability_unavailable());
        assert_eq!(
            warning.reason,
            WarningReason::CapabilityUnavailable {
                capability: CapabilityKind::Graphics,
                detail: "forced off".to_string(),
            }
        );
        assert!(result.warning_for(PipelinePhase::Reconstructing).is_some());
        assert!(result.warning_for(PipelinePhase::Rendering).is_none());
    }

    #[tokio::test]
    async fn missing_document_capability_skips_report() {
        let capabilities = Capabilities::new(
            Capability::Available(GraphicsBackend::new(LoadedFont::bundled().unwrap())),
            Capability::unavailable("disabled by configuration"),
        );
        let result = ReportPipeline::new(&capabilities)
            .run(AnalysisRequest::new(scene(32, 32), Jurisdiction::Kuwait, LanguageMode::English))
            .await
            .unwrap();

        assert!(result.report.is_none());
        assert!(result.annotated_image.is_some());
        assert!(result.findings.is_some());
        assert!(result
            .warning_for(PipelinePhase::Rendering)
            .unwrap()
            .is_capability_unavailable());
    }

    #[tokio::test]
    async fn missing_image_is_rejected_before_any_stage() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ReportPipeline::new(&capabilities(&dir));
        let request = AnalysisRequest::without_image(Jurisdiction::Uae, LanguageMode::English);

        let err = pipeline.run(request).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Precondition(PreconditionFailure::MissingImage)
        ));
        assert_eq!(written_reports(&dir), 0);
    }

    #[tokio::test]
    async fn empty_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ReportPipeline::new(&capabilities(&dir));
        let empty = SceneImage::new(DynamicImage::ImageRgb8(ImageBuffer::new(0, 0)), "empty");
        let request = AnalysisRequest::new(empty, Jurisdiction::Uae, LanguageMode::English);

        assert!(matches!(
            pipeline.run(request).await,
            Err(AppError::Precondition(PreconditionFailure::EmptyImage { .. }))
        ));
        assert_eq!(written_reports(&dir), 0);
    }

    #[tokio::test]
    async fn panicking_stage_becomes_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ReportPipeline::builder(&capabilities(&dir))
            .annotator(Arc::new(PanickingStep))
            .build();
        let request = AnalysisRequest::new(scene(50, 50), Jurisdiction::Uae, LanguageMode::English);

        let result = pipeline.run(request).await.unwrap();

        assert!(result.annotated_image.is_none());
        assert!(result.diagram_image.is_some());
        assert!(result.report.is_some());
        let warning = result.warning_for(PipelinePhase::Annotating).unwrap();
        match &warning.reason {
            WarningReason::StageFailure { detail } => assert!(detail.contains("renderer exploded")),
            other => panic!("unexpected warning {:?}", other),
        }
    }

    #[tokio::test]
    async fn sequential_and_parallel_runs_agree() {
        let dir = tempfile::tempdir().unwrap();
        let capabilities = capabilities(&dir);
        let run = |parallel: bool| {
            let pipeline = ReportPipeline::builder(&capabilities)
                .parallel_stages(parallel)
                .build();
            async move {
                pipeline
                    .run(
                        AnalysisRequest::new(scene(120, 90), Jurisdiction::SaudiArabia, LanguageMode::English)
                            .with_sink(ReportSink::Memory),
                    )
                    .await
                    .unwrap()
            }
        };

        let parallel = run(true).await;
        let sequential = run(false).await;

        assert_eq!(
            parallel.annotated_image.unwrap().as_bytes(),
            sequential.annotated_image.unwrap().as_bytes()
        );
        assert_eq!(
            parallel.diagram_image.unwrap().as_bytes(),
            sequential.diagram_image.unwrap().as_bytes()
        );
        assert_eq!(parallel.findings, sequential.findings);
        assert_eq!(
            parallel.report.unwrap().document,
            sequential.report.unwrap().document
        );
        assert_eq!(written_reports(&dir), 0);
    }

    #[test]
    fn advance_steps_through_the_stages_in_order() {
        let mut phase = PipelinePhase::Idle;
        for expected in PipelinePhase::STAGES {
            advance(&mut phase);
            assert_eq!(phase, expected);
        }
        advance(&mut phase);
        assert!(phase.is_terminal());
        advance(&mut phase);
        assert_eq!(phase, PipelinePhase::Done);
    }

    #[tokio::test]
    async fn timings_cover_every_stage() {
        let dir = tempfile::tempdir().unwrap();
        let result = ReportPipeline::new(&capabilities(&dir))
            .run(AnalysisRequest::new(scene(10, 10), Jurisdiction::Uae, LanguageMode::English))
            .await
            .unwrap();

        let phases: Vec<_> = result.timings.phase_durations().keys().copied().collect();
        assert_eq!(phases, PipelinePhase::STAGES.to_vec());
        assert!(result.timings.total().is_some());
    }
}
