pub mod phase_timings;
pub mod pipeline_phase;
pub mod processing_step;
pub mod report_pipeline;
pub mod service;

pub use phase_timings::PhaseTimings;
pub use pipeline_phase::PipelinePhase;
pub use processing_step::ImageStep;
pub use report_pipeline::{ReportPipeline, ReportPipelineBuilder};
pub use service::{AnalysisService, ReportService, ReportServiceBuilder};
