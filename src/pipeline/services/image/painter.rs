use crate::capability::{GraphicsBackend, LoadedFont};
use crate::error::StageError;
use ab_glyph::{Font, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_text_mut,
};
use imageproc::rect::Rect;

/// Pixel height of a label drawn at scale 1.0.
const LABEL_PX_PER_SCALE: f32 = 30.0;

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const ORANGE: Rgb<u8> = Rgb([255, 165, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const DARK_GREEN: Rgb<u8> = Rgb([0, 100, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const ROAD_GRAY: Rgb<u8> = Rgb([100, 100, 100]);
pub const BACKGROUND_GRAY: Rgb<u8> = Rgb([230, 230, 230]);

/// Thin drawing layer over `imageproc` shared by the annotation and diagram
/// services.
///
/// Coordinates follow the corner-to-corner convention: a rectangle is given by
/// two opposite corners, a label by the left end of its baseline.
pub struct Painter<'a> {
    canvas: RgbImage,
    font: &'a LoadedFont,
}

impl<'a> Painter<'a> {
    /// Allocate a blank canvas, refusing sizes beyond the backend's limit.
    pub fn blank(
        backend: &'a GraphicsBackend,
        width: u32,
        height: u32,
        fill: Rgb<u8>,
    ) -> Result<Self, StageError> {
        check_canvas(backend, width, height)?;
        Ok(Self {
            canvas: RgbImage::from_pixel(width, height, fill),
            font: &backend.label_font,
        })
    }

    /// Start from an existing raster; the caller keeps its own copy.
    pub fn over(backend: &'a GraphicsBackend, canvas: RgbImage) -> Result<Self, StageError> {
        check_canvas(backend, canvas.width(), canvas.height())?;
        Ok(Self {
            canvas,
            font: &backend.label_font,
        })
    }

    pub fn filled_rect(&mut self, top_left: (i32, i32), bottom_right: (i32, i32), color: Rgb<u8>) {
        draw_filled_rect_mut(&mut self.canvas, rect_between(top_left, bottom_right), color);
    }

    /// Outline whose border grows inwards to `thickness` pixels.
    pub fn outlined_rect(
        &mut self,
        top_left: (i32, i32),
        bottom_right: (i32, i32),
        color: Rgb<u8>,
        thickness: u32,
    ) {
        for inset in 0..thickness.max(1) as i32 {
            let corner_a = (top_left.0 + inset, top_left.1 + inset);
            let corner_b = (bottom_right.0 - inset, bottom_right.1 - inset);
            if corner_a.0 >= corner_b.0 || corner_a.1 >= corner_b.1 {
                break;
            }
            draw_hollow_rect_mut(&mut self.canvas, rect_between(corner_a, corner_b), color);
        }
    }

    pub fn filled_circle(&mut self, center: (i32, i32), radius: i32, color: Rgb<u8>) {
        draw_filled_circle_mut(&mut self.canvas, center, radius, color);
    }

    /// Straight line widened sideways to `thickness` pixels.
    pub fn line(&mut self, start: (i32, i32), end: (i32, i32), color: Rgb<u8>, thickness: u32) {
        let vertical = (end.0 - start.0).abs() < (end.1 - start.1).abs();
        for offset in 0..thickness.max(1) as i32 {
            let shift = offset - (thickness as i32 - 1) / 2;
            let (dx, dy) = if vertical { (shift, 0) } else { (0, shift) };
            draw_line_segment_mut(
                &mut self.canvas,
                ((start.0 + dx) as f32, (start.1 + dy) as f32),
                ((end.0 + dx) as f32, (end.1 + dy) as f32),
                color,
            );
        }
    }

    /// Draw `text` with its baseline starting at `origin`.
    pub fn label(&mut self, text: &str, origin: (i32, i32), scale: f32, color: Rgb<u8>) {
        let font = self.font.font();
        let px = PxScale::from(LABEL_PX_PER_SCALE * scale);
        let top = origin.1 - font.as_scaled(px).ascent().round() as i32;
        draw_text_mut(&mut self.canvas, color, origin.0, top, px, font, text);
    }

    pub fn into_image(self) -> RgbImage {
        self.canvas
    }
}

fn check_canvas(backend: &GraphicsBackend, width: u32, height: u32) -> Result<(), StageError> {
    if width == 0 || height == 0 {
        return Err(StageError::failure(format!(
            "cannot draw on an empty {}x{} canvas",
            width, height
        )));
    }
    let pixels = width as u64 * height as u64;
    if pixels > backend.max_canvas_pixels {
        return Err(StageError::failure(format!(
            "canvas of {}x{} exceeds the {} pixel limit",
            width, height, backend.max_canvas_pixels
        )));
    }
    Ok(())
}

// Inclusive of both corners, so the size is never zero.
fn rect_between(a: (i32, i32), b: (i32, i32)) -> Rect {
    let (left, right) = (a.0.min(b.0), a.0.max(b.0));
    let (top, bottom) = (a.1.min(b.1), a.1.max(b.1));
    Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32)
}
