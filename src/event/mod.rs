//! Input: hit-testing and gesture collection.
//!
//! A touch walks the render tree depth-first in reverse child order, so the
//! topmost painted node is visited first. Every node under the point
//! contributes its gesture recognizers to the result with children before
//! parents; a [`GestureArena`] then resolves which recognizer owns the
//! touch sequence.
//!
//! Recognizers never hold tree references. They react to an event by
//! returning a UI task that re-enters the pipeline with only generational
//! ids captured; a task arriving after its node was unmounted is a logged
//! no-op inside the tree accessors.

use std::cell::Cell;
use std::rc::Rc;

use crate::render::{split, RenderId, RenderTree};
use crate::task::UiTask;
use crate::types::{Axis, NodeFlags, Offset, TouchRestrict};

// =============================================================================
// Touch events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// One pointer event in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub position: Offset,
    pub phase: TouchPhase,
}

impl TouchEvent {
    pub fn new(phase: TouchPhase, x: f32, y: f32) -> Self {
        Self { position: Offset::new(x, y), phase }
    }
}

// =============================================================================
// Recognizers
// =============================================================================

/// A per-node gesture participant.
pub trait GestureRecognizer {
    /// React to an event this recognizer won. Any pipeline mutation comes
    /// back as a UI task so the recognizer itself stays tree-free.
    fn on_touch(&self, event: &TouchEvent) -> Option<UiTask>;

    /// Window-coordinates origin of the owning node, refreshed on every
    /// touch test so the recognizer can map events into local space.
    fn set_coordinate_offset(&self, _offset: Offset) {}
}

/// Resolves which of the collected recognizers owns a touch sequence.
pub trait GestureArena {
    fn resolve(
        &self,
        recognizers: &[Rc<dyn GestureRecognizer>],
    ) -> Option<Rc<dyn GestureRecognizer>>;
}

/// Trivial arena: the first collected recognizer (the topmost, innermost
/// node's) wins outright.
#[derive(Debug, Default)]
pub struct FirstWinsArena;

impl GestureArena for FirstWinsArena {
    fn resolve(
        &self,
        recognizers: &[Rc<dyn GestureRecognizer>],
    ) -> Option<Rc<dyn GestureRecognizer>> {
        recognizers.first().cloned()
    }
}

// =============================================================================
// Touch test
// =============================================================================

/// Everything a touch test collected, children before parents.
#[derive(Default)]
pub struct TouchTestResult {
    /// Nodes under the point, innermost/topmost first.
    pub hits: Vec<RenderId>,
    /// Recognizers of the hit nodes, in the same order.
    pub recognizers: Vec<Rc<dyn GestureRecognizer>>,
}

impl TouchTestResult {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Walk the subtree under `id` collecting hits for a point.
///
/// `local` is the point in `id`'s coordinates, `global` the same point in
/// window coordinates. Children are visited in reverse order (last painted
/// first); a node flagged `INTERCEPT` keeps the point to itself and its
/// children are never consulted. Returns whether anything in the subtree
/// was hit.
pub fn touch_test(
    tree: &RenderTree,
    id: RenderId,
    local: Offset,
    global: Offset,
    restrict: TouchRestrict,
    result: &mut TouchTestResult,
) -> bool {
    let Some(node) = tree.get(id) else {
        tracing::debug!(?id, "touch test on stale render id");
        return false;
    };
    if node.flags.contains(NodeFlags::HIDDEN) {
        return false;
    }
    if !tree.hit_self(id, local) {
        return false;
    }

    if !node.flags.contains(NodeFlags::INTERCEPT) {
        for &child in node.children.iter().rev() {
            let child_position =
                tree.get(child).map(|n| n.position).unwrap_or(Offset::ZERO);
            touch_test(tree, child, local - child_position, global, restrict, result);
        }
    }

    result.hits.push(id);
    if !restrict.contains(TouchRestrict::NO_GESTURES) {
        let origin = global - local;
        for recognizer in &node.recognizers {
            recognizer.set_coordinate_offset(origin);
            result.recognizers.push(recognizer.clone());
        }
    }
    true
}

// =============================================================================
// Split divider drag
// =============================================================================

#[derive(Default)]
struct DragState {
    divider: Cell<Option<usize>>,
    last_main: Cell<f32>,
}

/// Drag recognizer a split container registers over its divider rects.
///
/// Captures only the container's generational id; every reaction is a UI
/// task that re-resolves the id, so dragging a divider of a since-removed
/// container falls through harmlessly.
pub struct SplitDragRecognizer {
    container: RenderId,
    axis: Axis,
    offset: Cell<Offset>,
    state: Rc<DragState>,
}

impl SplitDragRecognizer {
    pub fn new(container: RenderId, axis: Axis) -> Self {
        Self {
            container,
            axis,
            offset: Cell::new(Offset::ZERO),
            state: Rc::new(DragState::default()),
        }
    }

    fn main_of(&self, offset: Offset) -> f32 {
        match self.axis {
            Axis::Horizontal => offset.x,
            Axis::Vertical => offset.y,
        }
    }
}

impl GestureRecognizer for SplitDragRecognizer {
    fn set_coordinate_offset(&self, offset: Offset) {
        self.offset.set(offset);
    }

    fn on_touch(&self, event: &TouchEvent) -> Option<UiTask> {
        let local = event.position - self.offset.get();
        let main = self.main_of(local);
        let container = self.container;
        let state = self.state.clone();

        match event.phase {
            TouchPhase::Down => Some(Box::new(move |ctx| {
                match split::divider_at(&ctx.renders, container, local) {
                    Some(divider) => {
                        state.divider.set(Some(divider));
                        state.last_main.set(main);
                    }
                    None => state.divider.set(None),
                }
            })),
            TouchPhase::Move => Some(Box::new(move |ctx| {
                if let Some(divider) = state.divider.get() {
                    let delta = main - state.last_main.get();
                    state.last_main.set(main);
                    split::apply_drag(&mut ctx.renders, container, divider, delta);
                }
            })),
            TouchPhase::Up | TouchPhase::Cancel => Some(Box::new(move |_ctx| {
                state.divider.set(None);
            })),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
