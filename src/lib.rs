//! # ember-ui
//!
//! A retained-tree declarative UI pipeline: immutable component
//! descriptions are reconciled into a persistent element tree, which backs
//! a render tree that is measured, positioned, painted, and hit-tested
//! frame by frame.
//!
//! ## The three trees
//!
//! - [`component`] - what the application *describes*. Immutable,
//!   `Rc`-shared, rebuilt (wholly or partially) every declarative
//!   evaluation and thrown away after the diff.
//! - [`element`] - what the framework *retains*. Each element holds the
//!   component it last saw and decides per update whether to skip, reuse in
//!   place, or replace its subtree.
//! - [`render`] - what gets *measured and drawn*. Constraint-box layout
//!   (min/max per axis), dirty propagation to the nearest layout boundary,
//!   and per-kind policies dispatched through a capability table.
//!
//! ## Driving frames
//!
//! A [`pipeline::PipelineContext`] per window owns all three trees plus
//! the dirty queues. Embedders feed it touch events and dirty marks, get a
//! `request_frame()` callback when work is pending, and answer by calling
//! [`pipeline::PipelineContext::flush_frame`] with a [`canvas::Canvas`] to
//! paint into.
//!
//! ```
//! use ember_ui::canvas::RecordingCanvas;
//! use ember_ui::component::Component;
//! use ember_ui::pipeline::PipelineContext;
//! use ember_ui::types::Size;
//!
//! let mut ctx = PipelineContext::new();
//! ctx.set_root_size(Size::new(320.0, 240.0));
//! ctx.set_root(Component::row(vec![
//!     Component::sized(100.0, 50.0),
//!     Component::text("hello"),
//! ]));
//!
//! let mut canvas = RecordingCanvas::new();
//! ctx.flush_frame(&mut canvas);
//! assert!(!canvas.commands().is_empty());
//! ```
//!
//! Everything that leaves the single pipeline thread goes through
//! [`task::TaskRunner`] queues and comes back holding generational ids
//! only, so a completion landing after its target was unmounted is a
//! logged no-op rather than a crash.

pub mod canvas;
pub mod component;
pub mod element;
pub mod event;
pub mod pipeline;
pub mod platform;
pub mod render;
pub mod task;
pub mod types;

pub use canvas::{Canvas, Color, PaintCommand, RecordingCanvas};
pub use component::{ChildMatching, Component, ComponentKind, DISABLE_HIDE};
pub use element::{ElementId, ElementKind, ElementTree, ReconcileStats, UpdateOutcome};
pub use event::{
    FirstWinsArena, GestureArena, GestureRecognizer, TouchEvent, TouchPhase, TouchTestResult,
};
pub use pipeline::{DirtyNotifier, FramePhase, FrameScheduler, PipelineContext};
pub use render::{RenderId, RenderKind, RenderNode, RenderTree};
pub use task::{LocalRunner, TaskQueue, TaskRunner, UiTask};
pub use types::{Axis, EdgeInsets, LayoutParam, NodeFlags, Offset, Rect, Size, TouchRestrict};
