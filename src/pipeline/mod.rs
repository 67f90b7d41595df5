//! Frame driver - owns the trees and runs the per-frame phases.
//!
//! A [`PipelineContext`] is built per window and holds everything mutable:
//! the element tree, the render tree, the dirty queues, and the queued
//! input. Nothing here is global; two windows are two contexts.
//!
//! Work arrives between frames (dirty marks, touch events, a new root
//! description) and is deferred: the first piece of pending work asks the
//! embedder's [`FrameScheduler`] for a frame, and the embedder eventually
//! answers by calling [`PipelineContext::flush_frame`], which runs the
//! phases in fixed order:
//!
//! 1. flush queued touch events (gesture tasks run before building),
//! 2. **Building** - drain the dirty-element queue, reconciling; marks
//!    enqueued while draining are handled in the same drain,
//! 3. **LayingOut** - drain the minimal relayout roots,
//! 4. **Painting** - walk the render tree into the canvas.
//!
//! Every phase is total: a stale id encountered anywhere is logged and
//! skipped, and the frame completes for everything else.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::canvas::Canvas;
use crate::component::{Component, ComponentKind};
use crate::element::{self, ElementId, ElementTree, UpdateOutcome};
use crate::event::{self, FirstWinsArena, GestureArena, TouchEvent, TouchTestResult};
use crate::render::{RenderId, RenderTree};
use crate::types::{LayoutParam, Offset, Size, TouchRestrict};

/// Where the pipeline currently is within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePhase {
    #[default]
    Idle,
    Building,
    LayingOut,
    Painting,
}

/// Embedder hook asked for a frame when work becomes pending. Called at
/// most once per frame, on the first piece of pending work.
pub trait FrameScheduler {
    fn request_frame(&self);
}

/// Clonable handle for raising dirty marks without borrowing the pipeline,
/// so build closures and other `'static` callbacks can hold one. Marks are
/// absorbed into the build drain: one raised while a rebuild is running
/// joins the same frame. Intended for callers already inside a frame;
/// anything raised between frames rides along with the next requested one.
#[derive(Clone, Default)]
pub struct DirtyNotifier {
    inbox: Rc<RefCell<Vec<ElementId>>>,
}

impl DirtyNotifier {
    pub fn mark(&self, id: ElementId) {
        self.inbox.borrow_mut().push(id);
    }

    fn take(&self) -> Vec<ElementId> {
        self.inbox.take()
    }
}

// =============================================================================
// PipelineContext
// =============================================================================

/// Per-window pipeline state.
pub struct PipelineContext {
    pub elements: ElementTree,
    pub renders: RenderTree,

    root_element: Option<ElementId>,
    root_render: Option<RenderId>,
    root_size: Size,
    /// Root description waiting to be diffed in the next Building phase.
    pending_root: Option<Rc<Component>>,

    dirty_elements: VecDeque<ElementId>,
    touch_queue: VecDeque<TouchEvent>,

    phase: FramePhase,
    partial_update: bool,
    frame_requested: bool,

    arena: Box<dyn GestureArena>,
    scheduler: Option<Box<dyn FrameScheduler>>,
    notifier: DirtyNotifier,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineContext {
    pub fn new() -> Self {
        Self {
            elements: ElementTree::new(),
            renders: RenderTree::new(),
            root_element: None,
            root_render: None,
            root_size: Size::ZERO,
            pending_root: None,
            dirty_elements: VecDeque::new(),
            touch_queue: VecDeque::new(),
            phase: FramePhase::Idle,
            partial_update: false,
            frame_requested: false,
            arena: Box::new(FirstWinsArena),
            scheduler: None,
            notifier: DirtyNotifier::default(),
        }
    }

    /// Handle build closures can capture to mark siblings dirty mid-build.
    pub fn dirty_notifier(&self) -> DirtyNotifier {
        self.notifier.clone()
    }

    pub fn set_scheduler(&mut self, scheduler: Box<dyn FrameScheduler>) {
        self.scheduler = Some(scheduler);
    }

    pub fn set_arena(&mut self, arena: Box<dyn GestureArena>) {
        self.arena = arena;
    }

    /// Switch the reconciler's composed-element policy. Under partial
    /// update, composed components diff by type and may carry an explicit
    /// unchanged marker; otherwise only the identical instance is reused.
    pub fn set_partial_update(&mut self, enabled: bool) {
        self.partial_update = enabled;
    }

    pub fn partial_update(&self) -> bool {
        self.partial_update
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn root_element(&self) -> Option<ElementId> {
        self.root_element
    }

    pub fn root_render(&self) -> Option<RenderId> {
        self.root_render
    }

    // =========================================================================
    // Intake
    // =========================================================================

    /// Install (or schedule a diff against) the window's root description.
    /// The description is wrapped in an implicit root when needed.
    pub fn set_root(&mut self, component: Rc<Component>) {
        let component = if component.kind() == ComponentKind::Root {
            component
        } else {
            Component::root(component)
        };
        match self.root_element {
            Some(_) => self.pending_root = Some(component),
            None => {
                let id = element::inflate(&mut self.elements, &mut self.renders, component, None);
                self.root_element = Some(id);
                self.root_render = self.elements.get(id).and_then(|e| e.render);
                if let Some(root) = self.root_render {
                    self.renders.mark_needs_layout(root);
                }
            }
        }
        self.request_frame();
    }

    /// Window (root) size in logical units; the root is laid out tight to it.
    pub fn set_root_size(&mut self, size: Size) {
        if self.root_size == size {
            return;
        }
        self.root_size = size;
        if let Some(root) = self.root_render {
            self.renders.mark_needs_layout(root);
        }
        self.request_frame();
    }

    /// Queue a composed element for rebuild in the next Building phase.
    /// Safe to call while a build drain is running; the mark joins the
    /// same drain. Duplicate marks collapse.
    pub fn mark_element_dirty(&mut self, id: ElementId) {
        let Some(el) = self.elements.get_mut(id) else {
            tracing::debug!(?id, "dirty mark on stale element id");
            return;
        };
        if el.dirty {
            return;
        }
        el.dirty = true;
        self.dirty_elements.push_back(id);
        if self.phase != FramePhase::Building {
            self.request_frame();
        }
    }

    /// Queue a touch event; delivered at the start of the next frame.
    pub fn on_touch(&mut self, event: TouchEvent) {
        self.touch_queue.push_back(event);
        self.request_frame();
    }

    fn request_frame(&mut self) {
        if self.frame_requested {
            return;
        }
        self.frame_requested = true;
        if let Some(scheduler) = &self.scheduler {
            scheduler.request_frame();
        }
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Run one frame: touch flush, build, layout, paint.
    pub fn flush_frame(&mut self, canvas: &mut dyn Canvas) {
        self.flush_touch_events();

        self.phase = FramePhase::Building;
        self.elements.reset_stats();
        self.flush_build();

        self.phase = FramePhase::LayingOut;
        self.flush_layout();

        self.phase = FramePhase::Painting;
        if let Some(root) = self.root_render {
            self.renders.paint(root, Offset::ZERO, canvas);
        }

        self.phase = FramePhase::Idle;
        self.frame_requested = false;
    }

    fn flush_build(&mut self) {
        if let Some(pending) = self.pending_root.take() {
            if let Some(root) = self.root_element {
                let (id, outcome) = element::reconcile_slot(
                    &mut self.elements,
                    &mut self.renders,
                    root,
                    pending,
                    self.partial_update,
                );
                if outcome == UpdateOutcome::Replaced {
                    self.root_element = Some(id);
                    self.root_render = self.elements.get(id).and_then(|e| e.render);
                    if let Some(render) = self.root_render {
                        self.renders.mark_needs_layout(render);
                    }
                }
            }
        }

        // Marks pushed while draining are picked up by the same loop, so a
        // rebuild that raises one through the notifier lands in this frame.
        loop {
            self.absorb_notified_marks();
            let Some(id) = self.dirty_elements.pop_front() else { break };
            let Some(el) = self.elements.get_mut(id) else {
                tracing::debug!(?id, "dirty element went stale before build");
                continue;
            };
            el.dirty = false;
            element::rebuild(&mut self.elements, &mut self.renders, id, self.partial_update);
        }
    }

    fn absorb_notified_marks(&mut self) {
        for id in self.notifier.take() {
            self.mark_element_dirty(id);
        }
    }

    fn flush_layout(&mut self) {
        for root in self.renders.take_dirty_roots() {
            let param = if Some(root) == self.root_render {
                LayoutParam::tight(self.root_size)
            } else {
                match self.renders.get(root) {
                    Some(node) => node.constraints,
                    None => {
                        tracing::warn!(?root, "relayout root went stale");
                        continue;
                    }
                }
            };
            self.renders.layout(root, param);
        }
    }

    fn flush_touch_events(&mut self) {
        while let Some(event) = self.touch_queue.pop_front() {
            let Some(root) = self.root_render else { continue };

            let winner = {
                let mut result = TouchTestResult::new();
                event::touch_test(
                    &self.renders,
                    root,
                    event.position,
                    event.position,
                    TouchRestrict::NONE,
                    &mut result,
                );
                self.arena.resolve(&result.recognizers)
            };
            if let Some(recognizer) = winner {
                if let Some(task) = recognizer.on_touch(&event) {
                    task(&mut *self);
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Color, PaintCommand, RecordingCanvas};
    use crate::component::{BoxProps, SplitProps};
    use crate::event::TouchPhase;
    use crate::task::{LocalRunner, TaskRunner};
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingScheduler {
        requests: Rc<Cell<u32>>,
    }

    impl FrameScheduler for CountingScheduler {
        fn request_frame(&self) {
            self.requests.set(self.requests.get() + 1);
        }
    }

    fn red_box(w: f32, h: f32) -> Rc<Component> {
        Component::boxed(BoxProps { size: Size::new(w, h), color: Color::RED })
    }

    fn flush(ctx: &mut PipelineContext) -> RecordingCanvas {
        let mut canvas = RecordingCanvas::new();
        ctx.flush_frame(&mut canvas);
        canvas
    }

    #[test]
    fn test_two_child_row_end_to_end() {
        let mut ctx = PipelineContext::new();
        ctx.set_root_size(Size::new(100.0, 100.0));
        ctx.set_root(Component::row(vec![red_box(30.0, 10.0), red_box(20.0, 40.0)]));

        flush(&mut ctx);

        let row = ctx
            .renders
            .children_of(ctx.root_render().unwrap())
            .first()
            .copied()
            .unwrap();
        let kids = ctx.renders.children_of(row);
        assert_eq!(ctx.renders.get(row).unwrap().size, Size::new(50.0, 40.0));
        assert_eq!(ctx.renders.get(kids[1]).unwrap().position, Offset::new(30.0, 0.0));
        assert_eq!(ctx.phase(), FramePhase::Idle);
    }

    #[test]
    fn test_root_diff_reuses_structure() {
        let mut ctx = PipelineContext::new();
        ctx.set_root_size(Size::new(100.0, 100.0));
        ctx.set_root(Component::row(vec![red_box(30.0, 10.0)]));
        flush(&mut ctx);

        ctx.set_root(Component::row(vec![red_box(60.0, 10.0)]));
        flush(&mut ctx);

        assert_eq!(ctx.elements.stats.replaced, 0);
        let row = ctx
            .renders
            .children_of(ctx.root_render().unwrap())
            .first()
            .copied()
            .unwrap();
        let child = ctx.renders.children_of(row)[0];
        assert_eq!(ctx.renders.get(child).unwrap().size.width, 60.0);
    }

    #[test]
    fn test_root_type_change_replaces_root() {
        let mut ctx = PipelineContext::new();
        ctx.set_root_size(Size::new(100.0, 100.0));
        ctx.set_root(Component::row(vec![red_box(10.0, 10.0)]));
        flush(&mut ctx);
        let before = ctx.root_element().unwrap();

        // The implicit root reuses but the row below becomes a stack.
        ctx.set_root(Component::stack(vec![red_box(10.0, 10.0)]));
        flush(&mut ctx);

        assert!(ctx.elements.stats.replaced > 0);
        assert_eq!(ctx.root_element(), Some(before));
        assert!(ctx.elements.contains(before));
    }

    #[test]
    fn test_scheduler_asked_once_per_frame() {
        let requests = Rc::new(Cell::new(0));
        let mut ctx = PipelineContext::new();
        ctx.set_scheduler(Box::new(CountingScheduler { requests: requests.clone() }));

        ctx.set_root_size(Size::new(50.0, 50.0));
        ctx.set_root(red_box(10.0, 10.0));
        assert_eq!(requests.get(), 1);

        flush(&mut ctx);
        ctx.set_root(red_box(20.0, 20.0));
        ctx.set_root_size(Size::new(60.0, 60.0));
        assert_eq!(requests.get(), 2);
    }

    #[test]
    fn test_dirty_mark_dedupes() {
        let mut ctx = PipelineContext::new();
        ctx.set_root_size(Size::new(100.0, 100.0));
        ctx.set_root(Component::custom("Panel", || {
            Component::boxed(BoxProps { size: Size::new(10.0, 10.0), color: Color::RED })
        }));
        flush(&mut ctx);

        let root = ctx.root_element().unwrap();
        let panel = ctx.elements.get(root).unwrap().children[0];
        ctx.mark_element_dirty(panel);
        ctx.mark_element_dirty(panel);
        assert_eq!(ctx.dirty_elements.len(), 1);

        flush(&mut ctx);
        assert!(ctx.dirty_elements.is_empty());
        assert!(!ctx.elements.get(panel).unwrap().dirty);
    }

    #[test]
    fn test_dirty_element_rebuild_lays_out_and_paints() {
        thread_local! {
            static WIDTH: Cell<f32> = const { Cell::new(10.0) };
        }
        let mut ctx = PipelineContext::new();
        ctx.set_root_size(Size::new(100.0, 100.0));
        ctx.set_root(Component::custom("Panel", || {
            Component::boxed(BoxProps {
                size: Size::new(WIDTH.with(|w| w.get()), 10.0),
                color: Color::RED,
            })
        }));
        let canvas = flush(&mut ctx);
        assert_eq!(canvas.rects_with_color(Color::RED)[0].width, 10.0);

        WIDTH.with(|w| w.set(40.0));
        let panel = ctx.elements.get(ctx.root_element().unwrap()).unwrap().children[0];
        ctx.mark_element_dirty(panel);
        let canvas = flush(&mut ctx);

        assert_eq!(canvas.rects_with_color(Color::RED)[0].width, 40.0);
    }

    #[test]
    fn test_mark_raised_during_build_rebuilds_same_frame() {
        thread_local! {
            static LEFT_WIDTH: Cell<f32> = const { Cell::new(10.0) };
            static RIGHT_WIDTH: Cell<f32> = const { Cell::new(10.0) };
        }
        let mut ctx = PipelineContext::new();
        ctx.set_root_size(Size::new(200.0, 100.0));

        // Rebuilding the left panel discovers the right one is out of date
        // and marks it through the notifier, mid-drain.
        let notifier = ctx.dirty_notifier();
        let sibling: Rc<Cell<Option<ElementId>>> = Rc::new(Cell::new(None));
        let sibling_for_left = sibling.clone();
        let left = Component::custom("Left", move || {
            if let Some(id) = sibling_for_left.get() {
                notifier.mark(id);
            }
            Component::boxed(BoxProps {
                size: Size::new(LEFT_WIDTH.with(|w| w.get()), 10.0),
                color: Color::RED,
            })
        });
        let right = Component::custom("Right", || {
            Component::boxed(BoxProps {
                size: Size::new(RIGHT_WIDTH.with(|w| w.get()), 10.0),
                color: Color::BLUE,
            })
        });
        ctx.set_root(Component::row(vec![left, right]));
        flush(&mut ctx);

        let row = ctx.elements.get(ctx.root_element().unwrap()).unwrap().children[0];
        let panels = ctx.elements.get(row).unwrap().children.clone();
        sibling.set(Some(panels[1]));

        LEFT_WIDTH.with(|w| w.set(40.0));
        RIGHT_WIDTH.with(|w| w.set(60.0));
        ctx.mark_element_dirty(panels[0]);
        let canvas = flush(&mut ctx);

        // Both panels repainted in one frame even though only the left
        // was queued when the drain started.
        assert_eq!(canvas.rects_with_color(Color::RED)[0].width, 40.0);
        assert_eq!(canvas.rects_with_color(Color::BLUE)[0].width, 60.0);
        assert!(ctx.dirty_elements.is_empty());
    }

    #[test]
    fn test_stale_dirty_mark_skipped() {
        let mut ctx = PipelineContext::new();
        ctx.set_root_size(Size::new(100.0, 100.0));
        ctx.set_root(Component::custom("Panel", || red_box(10.0, 10.0)));
        flush(&mut ctx);

        let panel = ctx.elements.get(ctx.root_element().unwrap()).unwrap().children[0];
        ctx.mark_element_dirty(panel);
        // The root swap below unmounts the panel while it sits in the queue.
        ctx.set_root(red_box(5.0, 5.0));
        flush(&mut ctx);

        assert!(!ctx.elements.contains(panel));
    }

    #[test]
    fn test_callback_after_unmount_is_noop() {
        let mut ctx = PipelineContext::new();
        ctx.set_root_size(Size::new(100.0, 100.0));
        ctx.set_root(Component::row(vec![red_box(30.0, 10.0)]));
        flush(&mut ctx);

        let row = ctx
            .renders
            .children_of(ctx.root_render().unwrap())
            .first()
            .copied()
            .unwrap();
        let target = ctx.renders.children_of(row)[0];

        // A platform completion captured only the generational id...
        let runner = LocalRunner::new();
        runner.post_ui(Box::new(move |ctx| {
            // ...and the node is gone by the time it lands.
            if ctx.renders.mark_needs_layout(target).is_none() {
                tracing::debug!(?target, "layout request for unmounted node dropped");
            }
        }));

        ctx.set_root(Component::stack(vec![]));
        flush(&mut ctx);
        assert!(!ctx.renders.contains(target));
        ctx.renders.take_dirty_roots();

        runner.drain_ui(&mut ctx);
        assert!(!ctx.renders.has_dirty_roots());
    }

    #[test]
    fn test_touch_drag_resizes_split() {
        let mut ctx = PipelineContext::new();
        ctx.set_root_size(Size::new(100.0, 50.0));
        ctx.set_root(Component::split(
            SplitProps::default(),
            vec![red_box(30.0, 20.0), red_box(30.0, 20.0)],
        ));
        flush(&mut ctx);

        let split = ctx
            .renders
            .children_of(ctx.root_render().unwrap())
            .first()
            .copied()
            .unwrap();
        let second = ctx.renders.children_of(split)[1];
        let before = ctx.renders.get(second).unwrap().position.x;

        // Grab the divider (at x = 30.5) and pull it 10 to the right.
        ctx.on_touch(TouchEvent::new(TouchPhase::Down, 30.5, 10.0));
        ctx.on_touch(TouchEvent::new(TouchPhase::Move, 40.5, 10.0));
        ctx.on_touch(TouchEvent::new(TouchPhase::Up, 40.5, 10.0));
        flush(&mut ctx);

        let after = ctx.renders.get(second).unwrap().position.x;
        assert_eq!(after, before + 10.0);
    }

    #[test]
    fn test_resize_relayouts_root() {
        let mut ctx = PipelineContext::new();
        ctx.set_root_size(Size::new(100.0, 100.0));
        ctx.set_root(red_box(500.0, 500.0));
        flush(&mut ctx);

        let root = ctx.root_render().unwrap();
        assert_eq!(ctx.renders.get(root).unwrap().size, Size::new(100.0, 100.0));

        ctx.set_root_size(Size::new(200.0, 150.0));
        flush(&mut ctx);
        assert_eq!(ctx.renders.get(root).unwrap().size, Size::new(200.0, 150.0));
        let child = ctx.renders.children_of(root)[0];
        assert_eq!(ctx.renders.get(child).unwrap().size, Size::new(200.0, 150.0));
    }

    #[test]
    fn test_paint_emits_text() {
        let mut ctx = PipelineContext::new();
        ctx.set_root_size(Size::new(200.0, 100.0));
        ctx.set_root(Component::text("hello"));
        let canvas = flush(&mut ctx);

        assert!(canvas
            .commands()
            .iter()
            .any(|c| matches!(c, PaintCommand::Text { content, .. } if content == "hello")));
    }

    #[test]
    fn test_task_runner_posts_back_to_pipeline() {
        let runner = Rc::new(LocalRunner::new());
        let mut ctx = PipelineContext::new();
        ctx.set_root_size(Size::new(100.0, 100.0));
        ctx.set_root(Component::custom("Panel", || red_box(10.0, 10.0)));
        flush(&mut ctx);

        let panel = ctx.elements.get(ctx.root_element().unwrap()).unwrap().children[0];

        // Background work completes, posts a UI task that dirties the panel.
        let ui = runner.clone();
        runner.post(
            crate::task::TaskQueue::Background,
            Box::new(move || {
                ui.post_ui(Box::new(move |ctx| ctx.mark_element_dirty(panel)));
            }),
        );
        runner.drain(crate::task::TaskQueue::Background);
        runner.drain_ui(&mut ctx);

        assert_eq!(ctx.dirty_elements.len(), 1);
    }
}
