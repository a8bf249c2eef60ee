pub mod findings_service;
pub mod image;
pub mod report;

pub use findings_service::FindingsService;
pub use image::{SceneAnnotationService, SceneDiagramService};
pub use report::ReportRenderService;
