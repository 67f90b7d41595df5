//! Core types for ember-ui.
//!
//! Geometry primitives and the layout constraint box that flow through the
//! pipeline: parents hand a [`LayoutParam`] down, children resolve a [`Size`]
//! within it, and positions come back as [`Offset`]s.

// =============================================================================
// Size
// =============================================================================

/// A width/height pair in logical units.
///
/// Infinity is a legal width or height inside constraint maxima ("unbounded"),
/// but a resolved layout size must always be finite.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Self = Self { width: 0.0, height: 0.0 };

    /// Both axes unbounded. Only meaningful as a constraint maximum.
    pub const INFINITE: Self = Self { width: f32::INFINITY, height: f32::INFINITY };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// A size is valid when both extents are finite and non-negative.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }

    /// True if either axis has no area.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }
}

// =============================================================================
// Offset
// =============================================================================

/// A position relative to some origin (parent content box or window root).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl Offset {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

impl std::ops::Add for Offset {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Offset {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

// =============================================================================
// Rect
// =============================================================================

/// An axis-aligned rectangle, origin plus extent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub const fn from_offset_size(offset: Offset, size: Size) -> Self {
        Self { x: offset.x, y: offset.y, width: size.width, height: size.height }
    }

    /// Check if a point is inside this rect (left/top inclusive).
    #[inline]
    pub fn contains(&self, point: Offset) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

// =============================================================================
// EdgeInsets
// =============================================================================

/// Per-edge spacing (padding or margins).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeInsets {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl EdgeInsets {
    pub const ZERO: Self = Self { left: 0.0, top: 0.0, right: 0.0, bottom: 0.0 };

    pub const fn all(value: f32) -> Self {
        Self { left: value, top: value, right: value, bottom: value }
    }

    #[inline]
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    #[inline]
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

// =============================================================================
// LayoutParam - parent→child constraint box
// =============================================================================

/// The min/max size box a parent passes to a child's layout.
///
/// Both axes are bounded independently: a child's resolved size must satisfy
/// `min <= size <= max` component-wise. The pipeline never trusts a layout
/// policy to honor this on its own; [`LayoutParam::constrain`] is applied to
/// every resolved size on the way out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParam {
    pub min: Size,
    pub max: Size,
}

impl Default for LayoutParam {
    fn default() -> Self {
        Self { min: Size::ZERO, max: Size::INFINITE }
    }
}

impl LayoutParam {
    /// No minimum, unbounded maximum.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// No minimum, the given maximum.
    pub fn loose(max: Size) -> Self {
        Self { min: Size::ZERO, max }
    }

    /// Exactly the given size on both axes.
    pub fn tight(size: Size) -> Self {
        Self { min: size, max: size }
    }

    /// Zero on both axes. Used to collapse hidden children.
    pub fn zero() -> Self {
        Self { min: Size::ZERO, max: Size::ZERO }
    }

    /// Clamp a size into this constraint box, component-wise.
    ///
    /// Non-finite or negative inputs are treated as zero before clamping, so
    /// the result is always a valid size.
    pub fn constrain(&self, size: Size) -> Size {
        let w = if size.width.is_finite() { size.width.max(0.0) } else { 0.0 };
        let h = if size.height.is_finite() { size.height.max(0.0) } else { 0.0 };
        Size {
            width: w.clamp(self.min.width, self.max.width.max(self.min.width)),
            height: h.clamp(self.min.height, self.max.height.max(self.min.height)),
        }
    }

    /// Check whether a size already satisfies this constraint box.
    pub fn is_satisfied_by(&self, size: Size) -> bool {
        size.width >= self.min.width
            && size.width <= self.max.width
            && size.height >= self.min.height
            && size.height <= self.max.height
    }

    /// Drop the minimum, keep the maximum.
    pub fn loosen(&self) -> Self {
        Self { min: Size::ZERO, max: self.max }
    }

    /// Shrink the maximum by the given insets. The minimum is re-clamped so
    /// it never exceeds the new maximum.
    pub fn deflate(&self, insets: EdgeInsets) -> Self {
        let max = Size {
            width: (self.max.width - insets.horizontal()).max(0.0),
            height: (self.max.height - insets.vertical()).max(0.0),
        };
        Self {
            min: Size {
                width: self.min.width.min(max.width),
                height: self.min.height.min(max.height),
            },
            max,
        }
    }

    /// True when min == max on both axes.
    pub fn is_tight(&self) -> bool {
        self.min == self.max
    }
}

// =============================================================================
// Axis
// =============================================================================

/// Main axis for linear and split containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    #[default]
    Horizontal,
    Vertical,
}

impl Axis {
    /// Extract the main-axis extent of a size.
    #[inline]
    pub fn main(&self, size: Size) -> f32 {
        match self {
            Self::Horizontal => size.width,
            Self::Vertical => size.height,
        }
    }

    /// Extract the cross-axis extent of a size.
    #[inline]
    pub fn cross(&self, size: Size) -> f32 {
        match self {
            Self::Horizontal => size.height,
            Self::Vertical => size.width,
        }
    }

    /// Build a size from main/cross extents.
    #[inline]
    pub fn pack(&self, main: f32, cross: f32) -> Size {
        match self {
            Self::Horizontal => Size::new(main, cross),
            Self::Vertical => Size::new(cross, main),
        }
    }

    /// Build an offset placed `main` along this axis, `cross` across it.
    #[inline]
    pub fn offset(&self, main: f32, cross: f32) -> Offset {
        match self {
            Self::Horizontal => Offset::new(main, cross),
            Self::Vertical => Offset::new(cross, main),
        }
    }
}

// =============================================================================
// Node flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Per-render-node state flags.
    ///
    /// Combine with bitwise OR: `NodeFlags::NEEDS_LAYOUT | NodeFlags::HIDDEN`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        const NONE = 0;
        /// Geometry is stale; a layout pass must visit this node.
        const NEEDS_LAYOUT = 1 << 0;
        /// Content is stale; a paint pass must visit this node.
        const NEEDS_PAINT = 1 << 1;
        /// Dirty-layout propagation stops here; this node is a relayout root.
        const LAYOUT_BOUNDARY = 1 << 2;
        /// Excluded from paint and hit-testing, children included.
        const HIDDEN = 1 << 3;
        /// Hit-testing does not descend into children.
        const INTERCEPT = 1 << 4;
    }
}

bitflags::bitflags! {
    /// Restrictions applied to a touch-test walk.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TouchRestrict: u8 {
        const NONE = 0;
        /// Collect hit nodes only, skip gesture recognizers.
        const NO_GESTURES = 1 << 0;
    }
}

// =============================================================================
// Tests
// =============================================================================
