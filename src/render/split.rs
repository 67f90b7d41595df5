//! Split container layout policy.
//!
//! Children are arranged along one axis with draggable dividers between
//! them. Each child carries a display index: a priority used when the
//! container cannot fit everyone. Children marked [`DISABLE_HIDE`] are
//! always visible and allocated first; the rest are grouped by display
//! index and admitted group by group in ascending index order until the
//! next group would overflow the available extent. Admission stops at the
//! first overflowing group, so exclusion always happens from the highest
//! display index downwards.
//!
//! Hidden children are collapsed with zero constraints rather than removed,
//! so a later resize can bring them back without re-inflating. Divider hit
//! rects are recorded each layout for the drag recognizer; the rect is
//! wider than the painted divider so the divider stays grabbable.

use std::collections::BTreeMap;

use crate::canvas::{Canvas, Color};
use crate::component::{SplitProps, DISABLE_HIDE};
use crate::render::{KindState, NodeOps, RenderId, RenderProps, RenderTree};
use crate::types::{Axis, LayoutParam, NodeFlags, Offset, Rect, Size};

/// Main-axis width of a divider's hit rect, centered on the divider line.
pub const DIVIDER_RESPOND_WIDTH: f32 = 25.0;

/// Per-container state surviving across layouts.
#[derive(Debug, Clone, Default)]
pub struct SplitState {
    /// Extra main extent granted to each child by divider drags,
    /// index-aligned with the child list.
    pub drag_offsets: Vec<f32>,
    /// Hit rects of the dividers between visible children, container-local.
    pub divider_rects: Vec<Rect>,
}

pub(crate) static OPS: NodeOps = NodeOps {
    layout: perform_layout,
    paint: paint_dividers,
    hit_self: hit_self,
};

fn props_of(tree: &RenderTree, id: RenderId) -> SplitProps {
    match tree.get(id).map(|n| &n.props) {
        Some(RenderProps::Split(p)) => *p,
        _ => SplitProps::default(),
    }
}

fn state_of(tree: &RenderTree, id: RenderId) -> SplitState {
    match tree.get(id).map(|n| &n.state) {
        Some(KindState::Split(s)) => s.clone(),
        _ => SplitState::default(),
    }
}

fn store_state(tree: &mut RenderTree, id: RenderId, state: SplitState) {
    if let Some(node) = tree.get_mut(id) {
        node.state = KindState::Split(state);
    }
}

// =============================================================================
// Visibility
// =============================================================================

/// Decide which children fit. Returns one bool per child, in child order.
///
/// `DISABLE_HIDE` children are pre-allocated and always visible. The rest
/// are grouped by display index; groups are admitted in ascending order
/// while the running total (including one divider per additional visible
/// child) still fits, and admission stops at the first group that would
/// overflow.
fn compute_visible(
    extents: &[(i32, f32)],
    available: f32,
    divider_thickness: f32,
) -> Vec<bool> {
    let mut visible = vec![false; extents.len()];
    if !available.is_finite() {
        visible.fill(true);
        return visible;
    }

    let mut allocated = 0.0f32;
    let mut count = 0usize;
    for (i, &(index, extent)) in extents.iter().enumerate() {
        if index == DISABLE_HIDE {
            visible[i] = true;
            allocated += extent;
            count += 1;
        }
    }

    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &(index, _)) in extents.iter().enumerate() {
        if index != DISABLE_HIDE {
            groups.entry(index).or_default().push(i);
        }
    }

    for members in groups.values() {
        let group_extent: f32 = members.iter().map(|&i| extents[i].1).sum();
        let total_count = count + members.len();
        let dividers = divider_thickness * total_count.saturating_sub(1) as f32;
        if allocated + group_extent + dividers > available {
            break;
        }
        for &i in members {
            visible[i] = true;
        }
        allocated += group_extent;
        count = total_count;
    }

    visible
}

// =============================================================================
// Layout
// =============================================================================

fn perform_layout(tree: &mut RenderTree, id: RenderId, param: LayoutParam) -> Size {
    let props = props_of(tree, id);
    let mut state = state_of(tree, id);
    let axis = props.axis;

    let children = tree.children_of(id);
    state.drag_offsets.resize(children.len(), 0.0);

    // Measure everyone against the container's loosened constraints first;
    // visibility depends on the measured extents.
    let mut extents: Vec<(i32, f32)> = Vec::with_capacity(children.len());
    for &child in &children {
        tree.layout(child, param.loosen());
        let (index, size) = tree
            .get(child)
            .map(|n| (n.display_index, n.size))
            .unwrap_or((0, Size::ZERO));
        extents.push((index, axis.main(size)));
    }

    let available = axis.main(param.max);
    let visible = compute_visible(&extents, available, props.divider_thickness);

    // Collapse the losers, un-hide the survivors.
    for (i, &child) in children.iter().enumerate() {
        let Some(node) = tree.get_mut(child) else { continue };
        if visible[i] {
            node.flags.remove(NodeFlags::HIDDEN);
        } else {
            node.flags.insert(NodeFlags::HIDDEN);
            tree.layout(child, LayoutParam::zero());
        }
    }

    // Position survivors in child order, dividers between them.
    let mut main = 0.0f32;
    let mut cross = 0.0f32;
    state.divider_rects.clear();
    let visible_children: Vec<usize> =
        (0..children.len()).filter(|&i| visible[i]).collect();
    for (slot, &i) in visible_children.iter().enumerate() {
        let child = children[i];
        let child_size = tree.get(child).map(|n| n.size).unwrap_or(Size::ZERO);
        tree.set_position(child, axis.offset(main, 0.0));
        main += (axis.main(child_size) + state.drag_offsets[i]).max(0.0);
        cross = cross.max(axis.cross(child_size));

        if slot + 1 < visible_children.len() {
            let respond_start = main + props.divider_thickness / 2.0 - DIVIDER_RESPOND_WIDTH / 2.0;
            state.divider_rects.push(match axis {
                Axis::Horizontal => Rect::new(respond_start, 0.0, DIVIDER_RESPOND_WIDTH, cross),
                Axis::Vertical => Rect::new(0.0, respond_start, cross, DIVIDER_RESPOND_WIDTH),
            });
            main += props.divider_thickness;
        }
    }

    store_state(tree, id, state);
    axis.pack(main, cross)
}

// =============================================================================
// Paint + hit
// =============================================================================

fn paint_dividers(tree: &RenderTree, id: RenderId, origin: Offset, canvas: &mut dyn Canvas) {
    let props = props_of(tree, id);
    let Some(node) = tree.get(id) else { return };
    let KindState::Split(state) = &node.state else { return };

    for rect in &state.divider_rects {
        // Paint the thin divider line at the center of the respond rect.
        let line = match props.axis {
            Axis::Horizontal => Rect::new(
                rect.x + (rect.width - props.divider_thickness) / 2.0,
                rect.y,
                props.divider_thickness,
                rect.height,
            ),
            Axis::Vertical => Rect::new(
                rect.x,
                rect.y + (rect.height - props.divider_thickness) / 2.0,
                rect.width,
                props.divider_thickness,
            ),
        };
        canvas.draw_rect(
            Rect::new(origin.x + line.x, origin.y + line.y, line.width, line.height),
            Color::BLACK,
        );
    }
}

fn hit_self(tree: &RenderTree, id: RenderId, local: Offset) -> bool {
    let Some(node) = tree.get(id) else { return false };
    if Rect::from_offset_size(Offset::ZERO, node.size).contains(local) {
        return true;
    }
    // The respond rect can stick out past the content edge.
    match &node.state {
        KindState::Split(state) => state.divider_rects.iter().any(|r| r.contains(local)),
        KindState::None => false,
    }
}

// =============================================================================
// Drag plumbing
// =============================================================================

/// Divider index under a container-local point, if any.
pub fn divider_at(tree: &RenderTree, id: RenderId, local: Offset) -> Option<usize> {
    match tree.get(id).map(|n| &n.state) {
        Some(KindState::Split(state)) => {
            state.divider_rects.iter().position(|r| r.contains(local))
        }
        _ => None,
    }
}

/// Grow the child left/above divider `divider` by `delta` main-axis units.
/// Negative deltas shrink an earlier positive offset, but the stored offset
/// is floored at zero so a divider can never be pulled past the child's
/// measured extent. No-op when the container is not resizable or the id is
/// stale; re-marks layout on success.
pub fn apply_drag(tree: &mut RenderTree, id: RenderId, divider: usize, delta: f32) {
    if !props_of(tree, id).resizable {
        return;
    }
    let children = tree.children_of(id);
    let visible: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|&(_, &c)| {
            tree.get(c).map(|n| !n.flags.contains(NodeFlags::HIDDEN)).unwrap_or(false)
        })
        .map(|(i, _)| i)
        .collect();
    let Some(&child_index) = visible.get(divider) else {
        tracing::debug!(?id, divider, "drag on unknown divider");
        return;
    };

    let mut state = state_of(tree, id);
    state.drag_offsets.resize(children.len(), 0.0);
    state.drag_offsets[child_index] = (state.drag_offsets[child_index] + delta).max(0.0);
    store_state(tree, id, state);
    tree.mark_needs_layout(id);
}

// =============================================================================
// Tests
// =============================================================================
