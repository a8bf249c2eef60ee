use crate::{
    capability::Capabilities,
    common::scene_image::SceneImage,
    config::Settings,
    error::AppError,
    pipeline::{
        domain::{pipeline_result::PipelineResult, request::AnalysisRequest},
        orchestration::{
            processing_step::ImageStep,
            report_pipeline::ReportPipeline,
            service::report_service::{AnalysisService, ReportServiceBuilder, into_app_error},
        },
    },
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::warn;

/// Entry point for callers: owns the probed capabilities and the service
/// stack, and bounds every analysis by the configured timeout and by
/// cancellation.
pub struct Coordinator {
    settings: Settings,
    capabilities: Arc<Capabilities>,
    service: AnalysisService,
    timeout: Option<Duration>,
    cancel_token: CancellationToken,
}

impl Coordinator {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// A request for `image` using the configured default jurisdiction and
    /// language.
    pub fn request(&self, image: SceneImage) -> AnalysisRequest {
        AnalysisRequest::new(
            image,
            self.settings.pipeline.default_jurisdiction,
            self.settings.pipeline.default_language,
        )
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> Result<PipelineResult, AppError> {
        self.analyze_with_cancel(request, self.cancel_token.child_token())
            .await
    }

    /// Like [`Coordinator::analyze`], but also gives up as soon as `cancel`
    /// fires. Stopping the coordinator cancels every in-flight analysis too.
    pub async fn analyze_with_cancel(
        &self,
        request: AnalysisRequest,
        cancel: CancellationToken,
    ) -> Result<PipelineResult, AppError> {
        let call = self.service.clone().oneshot(request);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Analysis cancelled by caller");
                Err(AppError::Cancelled)
            }
            _ = self.cancel_token.cancelled() => {
                warn!("Analysis cancelled, coordinator is stopping");
                Err(AppError::Cancelled)
            }
            result = call => result.map_err(|e| into_app_error(e, self.timeout)),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    settings: Settings,
    capabilities: Option<Arc<Capabilities>>,
    annotator: Option<Arc<dyn ImageStep>>,
    reconstructor: Option<Arc<dyn ImageStep>>,
}

impl CoordinatorBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            capabilities: None,
            annotator: None,
            reconstructor: None,
        }
    }

    // Uses already probed capabilities instead of probing at build time.
    pub fn capabilities(mut self, capabilities: Arc<Capabilities>) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    // Sets the per-request timeout, this will override the configuration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.pipeline.timeout_ms = timeout.as_millis() as u64;
        self
    }

    // Runs the independent stages concurrently or one after the other.
    pub fn parallel_stages(mut self, parallel_stages: bool) -> Self {
        self.settings.pipeline.parallel_stages = parallel_stages;
        self
    }

    pub fn annotator(mut self, annotator: Arc<dyn ImageStep>) -> Self {
        self.annotator = Some(annotator);
        self
    }

    pub fn reconstructor(mut self, reconstructor: Arc<dyn ImageStep>) -> Self {
        self.reconstructor = Some(reconstructor);
        self
    }

    pub fn build(self) -> Result<Coordinator, AppError> {
        self.settings.validate()?;
        let capabilities = match self.capabilities {
            Some(capabilities) => capabilities,
            None => Arc::new(Capabilities::probe(&self.settings)?),
        };

        let mut pipeline = ReportPipeline::builder(&capabilities)
            .parallel_stages(self.settings.pipeline.parallel_stages);
        if let Some(annotator) = self.annotator {
            pipeline = pipeline.annotator(annotator);
        }
        if let Some(reconstructor) = self.reconstructor {
            pipeline = pipeline.reconstructor(reconstructor);
        }

        let timeout = self.settings.timeout();
        let service = ReportServiceBuilder::new(pipeline.build())
            .timeout(timeout)
            .build();

        Ok(Coordinator {
            settings: self.settings,
            capabilities,
            service,
            timeout: Some(timeout),
            cancel_token: CancellationToken::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, DocumentBackend, GraphicsBackend, LoadedFont};
    use crate::error::StageError;
    use crate::pipeline::domain::pipeline_result::RunStatus;
    use crate::pipeline::domain::request::{Jurisdiction, LanguageMode};
    use image::{DynamicImage, ImageBuffer, Rgb};

    struct SlowStep(Duration);

    impl ImageStep for SlowStep {
        fn process(&self, scene: &SceneImage) -> Result<DynamicImage, StageError> {
            std::thread::sleep(self.0);
            Ok(scene.image().clone())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    fn scene() -> SceneImage {
        SceneImage::new(
            DynamicImage::ImageRgb8(ImageBuffer::from_pixel(80, 60, Rgb([10, 20, 30]))),
            "scene.png",
        )
    }

    fn capabilities(dir: &tempfile::TempDir) -> Arc<Capabilities> {
        Arc::new(Capabilities::new(
            Capability::Available(GraphicsBackend::new(LoadedFont::bundled().unwrap())),
            Capability::Available(DocumentBackend::new(dir.path())),
        ))
    }

    #[tokio::test]
    async fn test_coordinator() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = CoordinatorBuilder::new(Settings::default())
            .capabilities(capabilities(&dir))
            .timeout(Duration::from_secs(30))
            .parallel_stages(false)
            .build()
            .expect("Failed to build coordinator");

        let request = coordinator.request(scene());
        assert_eq!(request.jurisdiction, Jurisdiction::SaudiArabia);
        assert_eq!(request.language, LanguageMode::ArabicAndEnglish);

        let result = coordinator.analyze(request).await.unwrap();
        assert_eq!(result.status(), RunStatus::Complete);
        assert!(result.report_path().unwrap().starts_with(dir.path()));
        coordinator.stop();
    }

    #[tokio::test]
    async fn slow_analysis_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = CoordinatorBuilder::new(Settings::default())
            .capabilities(capabilities(&dir))
            .timeout(Duration::from_millis(50))
            .annotator(Arc::new(SlowStep(Duration::from_millis(500))))
            .build()
            .unwrap();

        let err = coordinator.analyze(coordinator.request(scene())).await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(d) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn caller_cancellation_aborts_the_request() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = CoordinatorBuilder::new(Settings::default())
            .capabilities(capabilities(&dir))
            .annotator(Arc::new(SlowStep(Duration::from_millis(500))))
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = coordinator
            .analyze_with_cancel(coordinator.request(scene()), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }

    #[tokio::test]
    async fn stopped_coordinator_rejects_work() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = CoordinatorBuilder::new(Settings::default())
            .capabilities(capabilities(&dir))
            .build()
            .unwrap();
        coordinator.stop();

        let err = coordinator.analyze(coordinator.request(scene())).await.unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }

    #[test]
    fn invalid_settings_fail_the_build() {
        let mut settings = Settings::default();
        settings.pipeline.timeout_ms = 0;
        assert!(matches!(
            CoordinatorBuilder::new(settings).build(),
            Err(AppError::InvalidConfig(_))
        ));
    }
}
