pub mod report_service;

pub use report_service::{AnalysisService, ReportService, ReportServiceBuilder};
