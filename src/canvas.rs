//! Paint surface abstraction.
//!
//! The paint phase walks the render tree and emits draw calls against a
//! [`Canvas`]. Production embedders back this with a real rasterizer; tests
//! use [`RecordingCanvas`], which captures the command stream so assertions
//! can check what was (and was not) painted.

use crate::types::{Offset, Rect};

// =============================================================================
// Color
// =============================================================================

/// Packed 8-bit ARGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Color = Color(0x0000_0000);
    pub const BLACK: Color = Color(0xFF00_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    pub const RED: Color = Color(0xFFFF_0000);
    pub const GREEN: Color = Color(0xFF00_FF00);
    pub const BLUE: Color = Color(0xFF00_00FF);

    /// Opaque color from 8-bit channels.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color(0xFF00_0000 | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b))
    }

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }
}

// =============================================================================
// Canvas
// =============================================================================

/// Draw-call sink for the paint phase.
///
/// Coordinates handed to a canvas are absolute window coordinates; the render
/// tree resolves its parent-relative offsets before emitting.
pub trait Canvas {
    fn draw_rect(&mut self, rect: Rect, color: Color);
    fn draw_text(&mut self, origin: Offset, content: &str, color: Color);
}

/// One captured draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    Rect { rect: Rect, color: Color },
    Text { origin: Offset, content: String, color: Color },
}

/// Canvas that records its command stream, in emission order.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    commands: Vec<PaintCommand>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[PaintCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Rects painted with `color`, in paint order.
    pub fn rects_with_color(&self, color: Color) -> Vec<Rect> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                PaintCommand::Rect { rect, color: c } if *c == color => Some(*rect),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn draw_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(PaintCommand::Rect { rect, color });
    }

    fn draw_text(&mut self, origin: Offset, content: &str, color: Color) {
        self.commands.push(PaintCommand::Text {
            origin,
            content: content.to_string(),
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Size;

    #[test]
    fn test_color_rgb_packs_opaque() {
        let c = Color::rgb(0x12, 0x34, 0x56);
        assert_eq!(c.0, 0xFF12_3456);
        assert_eq!(c.alpha(), 0xFF);
    }

    #[test]
    fn test_recording_canvas_preserves_order() {
        let mut canvas = RecordingCanvas::new();
        canvas.draw_rect(Rect::from_offset_size(Offset::ZERO, Size::new(1.0, 1.0)), Color::RED);
        canvas.draw_text(Offset::new(2.0, 3.0), "hi", Color::BLACK);

        assert_eq!(canvas.commands().len(), 2);
        assert!(matches!(canvas.commands()[0], PaintCommand::Rect { .. }));
        assert!(matches!(canvas.commands()[1], PaintCommand::Text { .. }));
    }

    #[test]
    fn test_rects_with_color_filters() {
        let mut canvas = RecordingCanvas::new();
        let r1 = Rect::from_offset_size(Offset::ZERO, Size::new(4.0, 4.0));
        let r2 = Rect::from_offset_size(Offset::new(5.0, 0.0), Size::new(4.0, 4.0));
        canvas.draw_rect(r1, Color::RED);
        canvas.draw_rect(r2, Color::BLUE);

        assert_eq!(canvas.rects_with_color(Color::RED), vec![r1]);
        assert_eq!(canvas.rects_with_color(Color::BLUE), vec![r2]);
    }
}
