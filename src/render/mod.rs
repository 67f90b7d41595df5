//! Render tree - geometry, layout, and paint.
//!
//! Render nodes are the retained visual tree behind the elements. They live
//! in a generational arena ([`RenderTree`]): a [`RenderId`] is a slot index
//! plus a generation, so an id held across a removal goes stale instead of
//! aliasing a recycled slot. Every lookup is fallible; callers holding an id
//! from an earlier frame get `None` and skip.
//!
//! Per-kind behavior (layout policy, paint, self hit-test) is dispatched
//! through a static [`NodeOps`] table per [`RenderKind`] rather than a trait
//! object per node, keeping the node struct plain data and the set of kinds
//! closed.

pub mod linear;
pub mod split;
pub mod stack;

pub use split::SplitState;

use std::rc::Rc;

use crate::canvas::{Canvas, Color};
use crate::component::{BoxProps, Component, ComponentKind, FlexProps, Props, SplitProps, TextProps};
use crate::event::GestureRecognizer;
use crate::types::{LayoutParam, NodeFlags, Offset, Rect, Size};

/// Logical advance of one glyph in the toy text metric.
pub(crate) const GLYPH_ADVANCE: f32 = 8.0;
/// Logical height of one text line.
pub(crate) const LINE_HEIGHT: f32 = 16.0;

// =============================================================================
// RenderId - generational handle
// =============================================================================

/// Handle to a render node: slot index plus generation.
///
/// Safe to store across frames and in async callbacks; after the node is
/// removed the generation no longer matches and lookups return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderId {
    idx: u32,
    generation: u32,
}

impl RenderId {
    pub fn index(&self) -> u32 {
        self.idx
    }
}

// =============================================================================
// Node kind + props snapshot
// =============================================================================

/// Closed set of render node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Root,
    Row,
    Column,
    Stack,
    Split,
    Box,
    Text,
}

/// Props snapshot held by a render node, copied from the component on
/// inflate and on every in-place update.
#[derive(Debug, Clone, Default)]
pub enum RenderProps {
    #[default]
    None,
    Flex(FlexProps),
    Split(SplitProps),
    Box(BoxProps),
    Text(TextProps),
}

impl RenderProps {
    /// Snapshot the render-relevant props of a component. `None` kind for
    /// custom components, which never own a render node.
    pub fn from_component(component: &Component) -> (Option<RenderKind>, RenderProps) {
        let kind = match component.kind() {
            ComponentKind::Root => RenderKind::Root,
            ComponentKind::Row => RenderKind::Row,
            ComponentKind::Column => RenderKind::Column,
            ComponentKind::Stack => RenderKind::Stack,
            ComponentKind::Split => RenderKind::Split,
            ComponentKind::Box => RenderKind::Box,
            ComponentKind::Text => RenderKind::Text,
            ComponentKind::Custom => return (None, RenderProps::None),
        };
        let props = match component.props() {
            Props::Flex(p) => RenderProps::Flex(*p),
            Props::Split(p) => RenderProps::Split(*p),
            Props::Box(p) => RenderProps::Box(*p),
            Props::Text(p) => RenderProps::Text(p.clone()),
            Props::None | Props::Custom(_) => RenderProps::None,
        };
        (Some(kind), props)
    }
}

/// Kind-specific mutable state carried by a node across frames.
#[derive(Debug, Clone, Default)]
pub enum KindState {
    #[default]
    None,
    Split(SplitState),
}

// =============================================================================
// RenderNode
// =============================================================================

/// One node of the retained render tree.
#[derive(Default)]
pub struct RenderNode {
    pub kind: Option<RenderKind>,
    pub props: RenderProps,
    /// Constraints from the most recent layout, replayed for relayout roots.
    pub constraints: LayoutParam,
    pub size: Size,
    /// Position relative to the parent's origin.
    pub position: Offset,
    pub parent: Option<RenderId>,
    pub children: Vec<RenderId>,
    pub flags: NodeFlags,
    /// Priority used by split containers when deciding which children fit.
    pub display_index: i32,
    pub state: KindState,
    pub recognizers: Vec<Rc<dyn GestureRecognizer>>,
}

impl std::fmt::Debug for RenderNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderNode")
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("position", &self.position)
            .field("flags", &self.flags)
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}

impl RenderNode {
    /// Parent-relative bounds.
    pub fn rect(&self) -> Rect {
        Rect::from_offset_size(self.position, self.size)
    }

    fn kind_or_root(&self) -> RenderKind {
        self.kind.unwrap_or(RenderKind::Root)
    }
}

// =============================================================================
// Capability table
// =============================================================================

/// Per-kind behavior, dispatched by [`RenderKind`].
pub(crate) struct NodeOps {
    /// Lay out children and return the node's unconstrained size. The tree
    /// clamps the result into the incoming constraints afterwards.
    pub layout: fn(&mut RenderTree, RenderId, LayoutParam) -> Size,
    /// Paint this node only (children are walked by the tree).
    pub paint: fn(&RenderTree, RenderId, Offset, &mut dyn Canvas),
    /// Whether a point in local coordinates hits this node itself.
    pub hit_self: fn(&RenderTree, RenderId, Offset) -> bool,
}

fn bounds_hit(tree: &RenderTree, id: RenderId, local: Offset) -> bool {
    tree.get(id)
        .map(|node| Rect::from_offset_size(Offset::ZERO, node.size).contains(local))
        .unwrap_or(false)
}

fn paint_nothing(_: &RenderTree, _: RenderId, _: Offset, _: &mut dyn Canvas) {}

fn root_layout(tree: &mut RenderTree, id: RenderId, param: LayoutParam) -> Size {
    let children = tree.children_of(id);
    for child in children {
        tree.layout(child, param.loosen());
        if let Some(node) = tree.get_mut(child) {
            node.position = Offset::ZERO;
        }
    }
    // The window root always fills its constraints.
    param.constrain(param.max)
}

fn box_layout(tree: &mut RenderTree, id: RenderId, param: LayoutParam) -> Size {
    match tree.get(id).map(|n| &n.props) {
        Some(RenderProps::Box(props)) => param.constrain(props.size),
        _ => param.constrain(Size::ZERO),
    }
}

fn box_paint(tree: &RenderTree, id: RenderId, origin: Offset, canvas: &mut dyn Canvas) {
    if let Some(node) = tree.get(id) {
        if let RenderProps::Box(props) = &node.props {
            canvas.draw_rect(Rect::from_offset_size(origin, node.size), props.color);
        }
    }
}

fn text_layout(tree: &mut RenderTree, id: RenderId, param: LayoutParam) -> Size {
    let measured = match tree.get(id).map(|n| &n.props) {
        Some(RenderProps::Text(props)) => {
            let mut lines = 0u32;
            let mut widest = 0usize;
            for line in props.content.lines() {
                lines += 1;
                widest = widest.max(line.chars().count());
            }
            Size::new(widest as f32 * GLYPH_ADVANCE, lines.max(1) as f32 * LINE_HEIGHT)
        }
        _ => Size::ZERO,
    };
    param.constrain(measured)
}

fn text_paint(tree: &RenderTree, id: RenderId, origin: Offset, canvas: &mut dyn Canvas) {
    if let Some(node) = tree.get(id) {
        if let RenderProps::Text(props) = &node.props {
            canvas.draw_text(origin, &props.content, Color::BLACK);
        }
    }
}

static ROOT_OPS: NodeOps = NodeOps { layout: root_layout, paint: paint_nothing, hit_self: bounds_hit };
static BOX_OPS: NodeOps = NodeOps { layout: box_layout, paint: box_paint, hit_self: bounds_hit };
static TEXT_OPS: NodeOps = NodeOps { layout: text_layout, paint: text_paint, hit_self: bounds_hit };

pub(crate) fn ops(kind: RenderKind) -> &'static NodeOps {
    match kind {
        RenderKind::Root => &ROOT_OPS,
        RenderKind::Row | RenderKind::Column => &linear::OPS,
        RenderKind::Stack => &stack::OPS,
        RenderKind::Split => &split::OPS,
        RenderKind::Box => &BOX_OPS,
        RenderKind::Text => &TEXT_OPS,
    }
}

// =============================================================================
// RenderTree
// =============================================================================

struct Slot {
    generation: u32,
    node: Option<RenderNode>,
}

/// Generational arena of render nodes plus the dirty bookkeeping that feeds
/// the frame driver's layout phase.
#[derive(Default)]
pub struct RenderTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Minimal relayout roots accumulated by [`RenderTree::mark_needs_layout`].
    dirty_roots: Vec<RenderId>,
}

impl Default for Slot {
    fn default() -> Self {
        Self { generation: 0, node: None }
    }
}

impl RenderTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node built from a component snapshot. New nodes start
    /// needing both layout and paint; the window root is a layout boundary.
    pub fn insert(&mut self, kind: RenderKind, props: RenderProps, display_index: i32) -> RenderId {
        let mut flags = NodeFlags::NEEDS_LAYOUT | NodeFlags::NEEDS_PAINT;
        if kind == RenderKind::Root {
            flags |= NodeFlags::LAYOUT_BOUNDARY;
        }
        let state = match kind {
            RenderKind::Split => KindState::Split(SplitState::default()),
            _ => KindState::None,
        };
        let split_props = match (kind, &props) {
            (RenderKind::Split, RenderProps::Split(p)) => Some(*p),
            _ => None,
        };
        let node = RenderNode {
            kind: Some(kind),
            props,
            flags,
            display_index,
            state,
            ..RenderNode::default()
        };

        let id = match self.free.pop() {
            Some(idx) => {
                let slot = &mut self.slots[idx as usize];
                slot.node = Some(node);
                RenderId { idx, generation: slot.generation }
            }
            None => {
                let idx = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, node: Some(node) });
                RenderId { idx, generation: 0 }
            }
        };

        // Resizable splits come with their divider drag recognizer attached.
        if let Some(props) = split_props {
            if props.resizable {
                if let Some(node) = self.get_mut(id) {
                    node.recognizers
                        .push(Rc::new(crate::event::SplitDragRecognizer::new(id, props.axis)));
                }
            }
        }
        id
    }

    pub fn get(&self, id: RenderId) -> Option<&RenderNode> {
        let slot = self.slots.get(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: RenderId) -> Option<&mut RenderNode> {
        let slot = self.slots.get_mut(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn contains(&self, id: RenderId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Child ids, cloned out so callers can walk while mutating.
    pub fn children_of(&self, id: RenderId) -> Vec<RenderId> {
        self.get(id).map(|n| n.children.clone()).unwrap_or_default()
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Append `child` under `parent`.
    pub fn add_child(&mut self, parent: RenderId, child: RenderId) {
        if !self.contains(parent) || !self.contains(child) {
            tracing::warn!(?parent, ?child, "add_child on stale render id");
            return;
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Replace `parent`'s child list wholesale, fixing each child's back-id.
    /// Used to resync render order from element order after reconciliation.
    pub fn set_children(&mut self, parent: RenderId, children: Vec<RenderId>) {
        if !self.contains(parent) {
            tracing::warn!(?parent, "set_children on stale render id");
            return;
        }
        for &child in &children {
            if let Some(node) = self.get_mut(child) {
                node.parent = Some(parent);
            }
        }
        if let Some(node) = self.get_mut(parent) {
            node.children = children;
        }
    }

    /// Remove a node and every descendant. Detaches from the parent's child
    /// list; all ids into the subtree go stale. No-op on a stale id.
    pub fn remove_subtree(&mut self, id: RenderId) {
        let Some(parent) = self.get(id).map(|n| n.parent) else {
            return;
        };
        if let Some(parent) = parent {
            if let Some(node) = self.get_mut(parent) {
                node.children.retain(|&c| c != id);
            }
        }
        self.free_recursive(id);
    }

    fn free_recursive(&mut self, id: RenderId) {
        let children = self.children_of(id);
        for child in children {
            self.free_recursive(child);
        }
        if let Some(slot) = self.slots.get_mut(id.idx as usize) {
            if slot.generation == id.generation && slot.node.is_some() {
                slot.node = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.idx);
            }
        }
        self.dirty_roots.retain(|&r| r != id);
    }

    // =========================================================================
    // Dirty tracking
    // =========================================================================

    /// Mark `id` as needing layout and propagate up to (and including) the
    /// nearest layout-boundary ancestor, which is recorded as a relayout
    /// root. Returns the root, or `None` for a stale id.
    pub fn mark_needs_layout(&mut self, id: RenderId) -> Option<RenderId> {
        if !self.contains(id) {
            tracing::debug!(?id, "mark_needs_layout on stale render id");
            return None;
        }
        let mut current = id;
        loop {
            let node = self.get_mut(current)?;
            node.flags |= NodeFlags::NEEDS_LAYOUT;
            let is_boundary = node.flags.contains(NodeFlags::LAYOUT_BOUNDARY);
            let parent = node.parent;
            if is_boundary || parent.is_none() {
                if !self.dirty_roots.contains(&current) {
                    self.dirty_roots.push(current);
                }
                return Some(current);
            }
            current = parent.unwrap_or(current);
        }
    }

    pub fn mark_needs_paint(&mut self, id: RenderId) {
        if let Some(node) = self.get_mut(id) {
            node.flags |= NodeFlags::NEEDS_PAINT;
        }
    }

    /// Drain the accumulated relayout roots.
    pub fn take_dirty_roots(&mut self) -> Vec<RenderId> {
        std::mem::take(&mut self.dirty_roots)
    }

    pub fn has_dirty_roots(&self) -> bool {
        !self.dirty_roots.is_empty()
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Lay the subtree out under the given constraints.
    ///
    /// Stores the constraints, dispatches to the kind's layout policy, then
    /// clamps whatever came back into the constraint box. A policy that
    /// resolves an out-of-bounds size is corrected and logged here; the
    /// violation never propagates to the parent.
    pub fn layout(&mut self, id: RenderId, param: LayoutParam) {
        let Some(node) = self.get_mut(id) else {
            tracing::warn!(?id, "layout on stale render id");
            return;
        };
        node.constraints = param;
        let kind = node.kind_or_root();

        let size = (ops(kind).layout)(self, id, param);
        let clamped = param.constrain(size);
        if !param.is_satisfied_by(size) {
            tracing::debug!(?id, ?kind, ?size, ?clamped, "layout size clamped to constraints");
        }
        if let Some(node) = self.get_mut(id) {
            node.size = clamped;
            node.flags.remove(NodeFlags::NEEDS_LAYOUT);
            node.flags.insert(NodeFlags::NEEDS_PAINT);
        }
    }

    pub fn set_position(&mut self, id: RenderId, position: Offset) {
        if let Some(node) = self.get_mut(id) {
            node.position = position;
        }
    }

    // =========================================================================
    // Paint
    // =========================================================================

    /// Paint the subtree in tree order (parents under children, later
    /// children over earlier). Hidden and zero-area subtrees are skipped
    /// without descending.
    pub fn paint(&mut self, id: RenderId, origin: Offset, canvas: &mut dyn Canvas) {
        let Some(node) = self.get(id) else {
            tracing::warn!(?id, "paint on stale render id");
            return;
        };
        if node.flags.contains(NodeFlags::HIDDEN) || node.size.is_degenerate() {
            return;
        }
        let global = origin + node.position;
        let kind = node.kind_or_root();
        (ops(kind).paint)(self, id, global, canvas);
        if let Some(node) = self.get_mut(id) {
            node.flags.remove(NodeFlags::NEEDS_PAINT);
        }
        for child in self.children_of(id) {
            self.paint(child, global, canvas);
        }
    }

    /// Kind-dispatched self hit check, in node-local coordinates.
    pub fn hit_self(&self, id: RenderId, local: Offset) -> bool {
        match self.get(id) {
            Some(node) => (ops(node.kind_or_root()).hit_self)(self, id, local),
            None => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RecordingCanvas;

    fn tree_with_box(size: Size) -> (RenderTree, RenderId) {
        let mut tree = RenderTree::new();
        let id = tree.insert(
            RenderKind::Box,
            RenderProps::Box(BoxProps { size, color: Color::RED }),
            0,
        );
        (tree, id)
    }

    #[test]
    fn test_stale_id_after_remove() {
        let (mut tree, id) = tree_with_box(Size::new(10.0, 10.0));
        assert!(tree.contains(id));

        tree.remove_subtree(id);
        assert!(!tree.contains(id));
        assert!(tree.get(id).is_none());

        // The slot is recycled under a new generation; the old id stays stale.
        let new_id = tree.insert(RenderKind::Stack, RenderProps::None, 0);
        assert_eq!(new_id.index(), id.index());
        assert!(!tree.contains(id));
        assert!(tree.contains(new_id));
    }

    #[test]
    fn test_remove_subtree_frees_descendants() {
        let mut tree = RenderTree::new();
        let root = tree.insert(RenderKind::Stack, RenderProps::None, 0);
        let child = tree.insert(RenderKind::Box, RenderProps::Box(BoxProps::default()), 0);
        let grand = tree.insert(RenderKind::Box, RenderProps::Box(BoxProps::default()), 0);
        tree.add_child(root, child);
        tree.add_child(child, grand);

        tree.remove_subtree(child);
        assert!(tree.contains(root));
        assert!(!tree.contains(child));
        assert!(!tree.contains(grand));
        assert!(tree.children_of(root).is_empty());
    }

    #[test]
    fn test_layout_clamps_oversized_result() {
        let (mut tree, id) = tree_with_box(Size::new(500.0, 500.0));
        let param = LayoutParam::loose(Size::new(100.0, 100.0));

        tree.layout(id, param);
        let node = tree.get(id).unwrap();
        assert!(param.is_satisfied_by(node.size));
        assert_eq!(node.size, Size::new(100.0, 100.0));
        assert!(!node.flags.contains(NodeFlags::NEEDS_LAYOUT));
    }

    #[test]
    fn test_mark_needs_layout_stops_at_boundary() {
        let mut tree = RenderTree::new();
        let root = tree.insert(RenderKind::Root, RenderProps::None, 0);
        let boundary = tree.insert(RenderKind::Stack, RenderProps::None, 0);
        let leaf = tree.insert(RenderKind::Box, RenderProps::Box(BoxProps::default()), 0);
        tree.add_child(root, boundary);
        tree.add_child(boundary, leaf);
        if let Some(node) = tree.get_mut(boundary) {
            node.flags |= NodeFlags::LAYOUT_BOUNDARY;
            node.flags.remove(NodeFlags::NEEDS_LAYOUT);
        }
        if let Some(node) = tree.get_mut(root) {
            node.flags.remove(NodeFlags::NEEDS_LAYOUT);
        }

        let dirty_root = tree.mark_needs_layout(leaf);
        assert_eq!(dirty_root, Some(boundary));
        assert!(tree.get(boundary).unwrap().flags.contains(NodeFlags::NEEDS_LAYOUT));
        // Propagation stopped at the boundary.
        assert!(!tree.get(root).unwrap().flags.contains(NodeFlags::NEEDS_LAYOUT));
        assert_eq!(tree.take_dirty_roots(), vec![boundary]);
    }

    #[test]
    fn test_mark_needs_layout_dedupes_roots() {
        let mut tree = RenderTree::new();
        let root = tree.insert(RenderKind::Root, RenderProps::None, 0);
        let a = tree.insert(RenderKind::Box, RenderProps::Box(BoxProps::default()), 0);
        let b = tree.insert(RenderKind::Box, RenderProps::Box(BoxProps::default()), 0);
        tree.add_child(root, a);
        tree.add_child(root, b);

        tree.mark_needs_layout(a);
        tree.mark_needs_layout(b);
        assert_eq!(tree.take_dirty_roots(), vec![root]);
    }

    #[test]
    fn test_mark_needs_layout_stale_id_is_noop() {
        let (mut tree, id) = tree_with_box(Size::new(1.0, 1.0));
        tree.remove_subtree(id);
        assert_eq!(tree.mark_needs_layout(id), None);
        assert!(!tree.has_dirty_roots());
    }

    #[test]
    fn test_paint_skips_hidden_and_degenerate() {
        let mut tree = RenderTree::new();
        let root = tree.insert(RenderKind::Root, RenderProps::None, 0);
        let visible = tree.insert(
            RenderKind::Box,
            RenderProps::Box(BoxProps { size: Size::new(5.0, 5.0), color: Color::RED }),
            0,
        );
        let hidden = tree.insert(
            RenderKind::Box,
            RenderProps::Box(BoxProps { size: Size::new(5.0, 5.0), color: Color::BLUE }),
            0,
        );
        let flat = tree.insert(
            RenderKind::Box,
            RenderProps::Box(BoxProps { size: Size::new(5.0, 0.0), color: Color::GREEN }),
            0,
        );
        tree.add_child(root, visible);
        tree.add_child(root, hidden);
        tree.add_child(root, flat);
        if let Some(node) = tree.get_mut(hidden) {
            node.flags |= NodeFlags::HIDDEN;
        }
        tree.layout(root, LayoutParam::tight(Size::new(50.0, 50.0)));

        let mut canvas = RecordingCanvas::new();
        tree.paint(root, Offset::ZERO, &mut canvas);

        assert_eq!(canvas.rects_with_color(Color::RED).len(), 1);
        assert!(canvas.rects_with_color(Color::BLUE).is_empty());
        assert!(canvas.rects_with_color(Color::GREEN).is_empty());
    }

    #[test]
    fn test_text_measures_lines() {
        let mut tree = RenderTree::new();
        let id = tree.insert(
            RenderKind::Text,
            RenderProps::Text(TextProps { content: "hello\nhi".into() }),
            0,
        );
        tree.layout(id, LayoutParam::unbounded());

        let size = tree.get(id).unwrap().size;
        assert_eq!(size, Size::new(5.0 * GLYPH_ADVANCE, 2.0 * LINE_HEIGHT));
    }
}
