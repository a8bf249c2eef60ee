use super::painter::{Painter, GREEN, ORANGE, RED};
use crate::capability::{Capability, CapabilityKind, GraphicsBackend};
use crate::common::scene_image::SceneImage;
use crate::error::StageError;
use image::DynamicImage;

/// Overlays simulated detections on the uploaded photo.
///
/// No detection model runs here. Every marker sits at a fixed fraction of the
/// image size, so two photos with the same dimensions get identical overlays
/// regardless of what they show:
///
/// * vehicle box spanning `[0.3w, 0.6w] × [0.4h, 0.8h]`, labelled "Vehicle 1"
/// * filled damage marker (radius 30) centred on `(0.55w, 0.5h)`, labelled
///   "Severe Damage"
/// * a "STOP SIGN" tag near the top-left at `(0.1w, 0.2h)`
#[derive(Debug, Clone)]
pub struct SceneAnnotationService {
    graphics: Capability<GraphicsBackend>,
}

impl SceneAnnotationService {
    const BOX_THICKNESS: u32 = 2;
    const DAMAGE_RADIUS: i32 = 30;

    pub fn new(graphics: Capability<GraphicsBackend>) -> Self {
        Self { graphics }
    }

    /// Returns a new image with the overlays; the input is left untouched and
    /// the output has the same dimensions.
    pub fn annotate(&self, scene: &SceneImage) -> Result<DynamicImage, StageError> {
        let backend = self.graphics.get(CapabilityKind::Graphics)?;
        let (width, height) = scene.dimensions();
        let mut painter = Painter::over(backend, scene.image().to_rgb8())?;

        let at = |fx: f32, fy: f32| -> (i32, i32) {
            ((width as f32 * fx) as i32, (height as f32 * fy) as i32)
        };

        // Simulated vehicle detection
        painter.outlined_rect(at(0.3, 0.4), at(0.6, 0.8), RED, Self::BOX_THICKNESS);
        painter.label("Vehicle 1", at(0.3, 0.38), 0.7, RED);

        // Simulated damage zone
        let (damage_x, damage_y) = at(0.55, 0.5);
        painter.filled_circle((damage_x, damage_y), Self::DAMAGE_RADIUS, ORANGE);
        painter.label("Severe Damage", (damage_x - 50, damage_y + 40), 0.5, ORANGE);

        // Simulated traffic sign
        painter.label("STOP SIGN", at(0.1, 0.2), 0.7, GREEN);

        tracing::debug!(
            "Annotated {} ({}x{}) with simulated overlays",
            scene.source(),
            width,
            height
        );
        Ok(DynamicImage::ImageRgb8(painter.into_image()))
    }
}
