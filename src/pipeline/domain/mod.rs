pub mod findings;
pub mod pipeline_result;
pub mod report_document;
pub mod request;

pub use findings::{Confidence, FindingsRecord, SceneEnvironment};
pub use pipeline_result::{PipelineResult, ResultSummary, RunStatus, StageWarning, WarningReason};
pub use report_document::{
    RenderedReport, ReportDocument, ReportLocation, ReportPage, ReportSink, TextBlock, TextDirection,
};
pub use request::{AnalysisRequest, Jurisdiction, LanguageMode, ValidatedRequest};
