//! Property bags for the built-in component kinds.

use crate::canvas::Color;
use crate::types::{Axis, Size};

/// Linear container (row/column) properties.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlexProps {
    /// Main-axis gap between adjacent children.
    pub gap: f32,
}

/// Split container properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitProps {
    /// Axis along which children are arranged and dividers dragged.
    pub axis: Axis,
    /// Whether dividers respond to drag.
    pub resizable: bool,
    /// Painted divider thickness along the main axis.
    pub divider_thickness: f32,
}

impl Default for SplitProps {
    fn default() -> Self {
        Self { axis: Axis::Horizontal, resizable: true, divider_thickness: 1.0 }
    }
}

/// Fixed-size colored leaf properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxProps {
    /// Preferred size, clamped by the incoming constraints at layout time.
    pub size: Size,
    pub color: Color,
}

impl Default for BoxProps {
    fn default() -> Self {
        Self { size: Size::ZERO, color: Color::WHITE }
    }
}

/// Text leaf properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextProps {
    pub content: String,
}
