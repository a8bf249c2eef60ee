pub mod domain;
pub mod orchestration;
pub mod services;

pub use domain::{AnalysisRequest, Jurisdiction, LanguageMode, PipelineResult, StageWarning};
pub use orchestration::{ReportPipeline, ReportPipelineBuilder};
