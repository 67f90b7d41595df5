//! Task posting across the embedder's serial queues.
//!
//! The pipeline itself is single-threaded; anything that leaves it (platform
//! calls, background work) goes through a [`TaskRunner`] the embedder
//! provides, and anything that comes back re-enters as a UI task holding
//! `&mut PipelineContext` for exactly its own execution. Tasks on one queue
//! run in posting order.
//!
//! Callbacks crossing queues must not capture tree references; they capture
//! generational ids and re-look them up on delivery, so a callback landing
//! after its target was unmounted degrades to a logged no-op.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::pipeline::PipelineContext;

/// Serial queues an embedder exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskQueue {
    /// The pipeline's own thread.
    Ui,
    /// Platform services (I/O, clipboard, resources).
    Platform,
    /// CPU-bound work.
    Background,
}

/// A task re-entering the pipeline.
pub type UiTask = Box<dyn FnOnce(&mut PipelineContext)>;

/// A task leaving the pipeline.
pub type PlainTask = Box<dyn FnOnce()>;

/// Posting surface the embedder implements. FIFO per queue.
pub trait TaskRunner {
    /// Post onto the UI queue; the task runs with exclusive pipeline access.
    fn post_ui(&self, task: UiTask);
    /// Post onto a non-UI queue.
    fn post(&self, queue: TaskQueue, task: PlainTask);
}

// =============================================================================
// LocalRunner
// =============================================================================

/// In-process runner for tests and single-threaded embedders: queues are
/// plain deques drained explicitly by the caller.
#[derive(Default)]
pub struct LocalRunner {
    ui: RefCell<VecDeque<UiTask>>,
    platform: RefCell<VecDeque<PlainTask>>,
    background: RefCell<VecDeque<PlainTask>>,
}

impl LocalRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every queued UI task, including ones queued while draining.
    pub fn drain_ui(&self, ctx: &mut PipelineContext) {
        loop {
            let task = self.ui.borrow_mut().pop_front();
            match task {
                Some(task) => task(&mut *ctx),
                None => break,
            }
        }
    }

    /// Run every queued task on a non-UI queue.
    pub fn drain(&self, queue: TaskQueue) {
        let cell = match queue {
            TaskQueue::Platform => &self.platform,
            TaskQueue::Background => &self.background,
            TaskQueue::Ui => {
                tracing::warn!("drain(Ui) needs pipeline access; use drain_ui");
                return;
            }
        };
        loop {
            let task = cell.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    pub fn pending_ui(&self) -> usize {
        self.ui.borrow().len()
    }

    pub fn pending(&self, queue: TaskQueue) -> usize {
        match queue {
            TaskQueue::Ui => self.ui.borrow().len(),
            TaskQueue::Platform => self.platform.borrow().len(),
            TaskQueue::Background => self.background.borrow().len(),
        }
    }
}

impl TaskRunner for LocalRunner {
    fn post_ui(&self, task: UiTask) {
        self.ui.borrow_mut().push_back(task);
    }

    fn post(&self, queue: TaskQueue, task: PlainTask) {
        match queue {
            TaskQueue::Platform => self.platform.borrow_mut().push_back(task),
            TaskQueue::Background => self.background.borrow_mut().push_back(task),
            TaskQueue::Ui => {
                // A plain task has no pipeline access but still runs in order.
                self.ui.borrow_mut().push_back(Box::new(|_ctx| task()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_queue_runs_in_posting_order() {
        let runner = LocalRunner::new();
        let log: Rc<RefCell<Vec<u32>>> = Rc::default();

        for i in 0..3 {
            let log = log.clone();
            runner.post(TaskQueue::Platform, Box::new(move || log.borrow_mut().push(i)));
        }
        runner.drain(TaskQueue::Platform);

        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_queues_are_independent() {
        let runner = LocalRunner::new();
        let hits: Rc<RefCell<Vec<&'static str>>> = Rc::default();

        let h = hits.clone();
        runner.post(TaskQueue::Background, Box::new(move || h.borrow_mut().push("bg")));
        let h = hits.clone();
        runner.post(TaskQueue::Platform, Box::new(move || h.borrow_mut().push("plat")));

        runner.drain(TaskQueue::Platform);
        assert_eq!(*hits.borrow(), vec!["plat"]);
        assert_eq!(runner.pending(TaskQueue::Background), 1);
    }

    #[test]
    fn test_ui_tasks_see_pipeline() {
        let runner = LocalRunner::new();
        let mut ctx = PipelineContext::new();

        runner.post_ui(Box::new(|ctx| {
            ctx.set_root_size(crate::types::Size::new(10.0, 10.0));
        }));
        runner.drain_ui(&mut ctx);

        assert_eq!(runner.pending_ui(), 0);
    }
}
