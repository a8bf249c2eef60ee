use super::painter::{Painter, BACKGROUND_GRAY, BLUE, DARK_GREEN, RED, ROAD_GRAY, WHITE};
use crate::capability::{Capability, CapabilityKind, GraphicsBackend};
use crate::common::scene_image::SceneImage;
use crate::error::StageError;
use image::DynamicImage;

pub const DIAGRAM_WIDTH: u32 = 600;
pub const DIAGRAM_HEIGHT: u32 = 400;

/// Draws the top-down scene schematic.
///
/// This is a static illustration, not a reconstruction: the layout (road,
/// lane divider, the two vehicles and their labels) is the same for every
/// request, and the uploaded photo is never inspected.
#[derive(Debug, Clone)]
pub struct SceneDiagramService {
    graphics: Capability<GraphicsBackend>,
}

impl SceneDiagramService {
    pub fn new(graphics: Capability<GraphicsBackend>) -> Self {
        Self { graphics }
    }

    pub fn render_diagram(&self, _scene: &SceneImage) -> Result<DynamicImage, StageError> {
        let backend = self.graphics.get(CapabilityKind::Graphics)?;
        let mut painter = Painter::blank(backend, DIAGRAM_WIDTH, DIAGRAM_HEIGHT, BACKGROUND_GRAY)?;

        // Road and lane divider
        painter.filled_rect((150, 100), (450, 300), ROAD_GRAY);
        painter.line((300, 100), (300, 300), WHITE, 2);

        // Vehicles
        painter.filled_rect((200, 150), (300, 250), RED);
        painter.filled_rect((300, 200), (400, 300), BLUE);

        painter.label("Vehicle 1 (At Fault)", (200, 140), 0.5, RED);
        painter.label("Vehicle 2", (300, 190), 0.5, BLUE);
        painter.label("Stop Sign", (50, 200), 0.5, DARK_GREEN);

        Ok(DynamicImage::ImageRgb8(painter.into_image()))
    }
}
