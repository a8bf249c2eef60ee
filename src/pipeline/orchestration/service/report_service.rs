use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;
use crate::pipeline::domain::pipeline_result::PipelineResult;
use crate::pipeline::domain::request::AnalysisRequest;
use crate::pipeline::orchestration::report_pipeline::ReportPipeline;
use futures::Future;
use futures::task::Context;
use futures::task::Poll;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower::util::BoxCloneService;
use tower::{BoxError, Service, ServiceBuilder};

pub type AnalysisService = BoxCloneService<AnalysisRequest, PipelineResult, BoxError>;

/// Exposes a [`ReportPipeline`] as a tower service.
#[derive(Clone)]
pub struct ReportService {
    inner: Arc<ReportPipeline>,
}

impl ReportService {
    pub fn new(pipeline: ReportPipeline) -> Self {
        Self {
            inner: Arc::new(pipeline),
        }
    }
}

impl Service<AnalysisRequest> for ReportService {
    type Response = PipelineResult;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: AnalysisRequest) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move { inner.run(req).await.map_err(BoxError::from) })
    }
}

pub struct ReportServiceBuilder {
    pipeline: ReportPipeline,
    timeout: Option<Duration>,
}

impl ReportServiceBuilder {
    pub fn new(pipeline: ReportPipeline) -> Self {
        Self {
            pipeline,
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> AnalysisService {
        let service = ServiceBuilder::new()
            .option_layer(self.timeout.map(TimeoutLayer::new))
            .service(ReportService::new(self.pipeline));

        BoxCloneService::new(service)
    }
}

/// Recovers the request-level error from whatever the service stack returned.
pub fn into_app_error(err: BoxError, timeout: Option<Duration>) -> AppError {
    if err.is::<Elapsed>() {
        return AppError::Timeout(timeout.unwrap_or_default());
    }
    match err.downcast::<AppError>() {
        Ok(app_error) => *app_error,
        Err(other) => AppError::Service(other.to_string()),
    }
}
