pub mod diagram_service;
pub mod painter;
pub mod scene_annotation_service;

pub use diagram_service::SceneDiagramService;
pub use scene_annotation_service::SceneAnnotationService;
