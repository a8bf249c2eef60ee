use crate::common::scene_image::SceneImage;
use crate::error::StageError;
use crate::pipeline::services::image::{SceneAnnotationService, SceneDiagramService};
use image::DynamicImage;

/// A stage that derives one image from the uploaded scene.
///
/// Steps run on the blocking pool, so they are plain synchronous calls.
pub trait ImageStep: Send + Sync {
    fn process(&self, scene: &SceneImage) -> Result<DynamicImage, StageError>;
    fn name(&self) -> &'static str;
}

impl ImageStep for SceneAnnotationService {
    fn process(&self, scene: &SceneImage) -> Result<DynamicImage, StageError> {
        self.annotate(scene)
    }

    fn name(&self) -> &'static str {
        "scene-annotation"
    }
}

impl ImageStep for SceneDiagramService {
    fn process(&self, scene: &SceneImage) -> Result<DynamicImage, StageError> {
        self.render_diagram(scene)
    }

    fn name(&self) -> &'static str {
        "scene-diagram"
    }
}
