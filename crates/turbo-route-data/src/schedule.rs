//! Deferral of client-side side effects.
//!
//! Redirect handling on the client must not run inside the turn that
//! resolves the fetch. A [`Scheduler`] pushes that work to a later turn.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Runs work on a later turn.
pub trait Scheduler {
    /// Run `task` after the current turn has finished.
    fn defer(&self, task: Task);

    /// Run `task` as a transition: state changes it causes are applied as
    /// one batch without tearing the current render.
    fn transition(&self, task: Task) {
        task();
    }
}

/// An explicit macrotask queue.
///
/// Tasks run only when the host calls [`TaskQueue::run_pending`], which
/// makes the "next turn" boundary visible and deterministic.
#[derive(Default)]
pub struct TaskQueue {
    queue: RefCell<VecDeque<Task>>,
    transitions: Cell<u64>,
    in_transition: Cell<bool>,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Number of transitions started so far.
    pub fn transitions(&self) -> u64 {
        self.transitions.get()
    }

    /// Whether a transition is running right now.
    pub fn in_transition(&self) -> bool {
        self.in_transition.get()
    }

    /// Run queued tasks until the queue is empty. Tasks queued while
    /// draining run in the same call. Returns how many tasks ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl Scheduler for TaskQueue {
    fn defer(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }

    fn transition(&self, task: Task) {
        self.transitions.set(self.transitions.get() + 1);
        let outer = self.in_transition.replace(true);
        task();
        self.in_transition.set(outer);
    }
}

/// Defers onto the current tokio `LocalSet`.
///
/// Must be used from inside a `LocalSet`; `spawn_local` panics elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalScheduler;

impl Scheduler for LocalScheduler {
    fn defer(&self, task: Task) {
        tokio::task::spawn_local(async move {
            tokio::task::yield_now().await;
            task();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_task_queue_defers_until_run() {
        let queue = TaskQueue::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        queue.defer(Box::new(move || h.set(h.get() + 1)));

        assert_eq!(hits.get(), 0);
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.run_pending(), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_task_queue_runs_tasks_queued_while_draining() {
        let queue = Rc::new(TaskQueue::new());
        let order = Rc::new(RefCell::new(Vec::new()));

        let (q, o) = (Rc::clone(&queue), Rc::clone(&order));
        queue.defer(Box::new(move || {
            o.borrow_mut().push("first");
            let o = Rc::clone(&o);
            q.defer(Box::new(move || o.borrow_mut().push("second")));
        }));

        assert_eq!(queue.run_pending(), 2);
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_task_queue_transition_flag() {
        let queue = Rc::new(TaskQueue::new());
        let seen = Rc::new(Cell::new(false));
        let (q, s) = (Rc::clone(&queue), Rc::clone(&seen));

        queue.transition(Box::new(move || s.set(q.in_transition())));

        assert!(seen.get());
        assert!(!queue.in_transition());
        assert_eq!(queue.transitions(), 1);
    }

    #[tokio::test]
    async fn test_local_scheduler_runs_on_local_set() {
        let hits = Rc::new(Cell::new(0));
        let local = tokio::task::LocalSet::new();

        let h = Rc::clone(&hits);
        local
            .run_until(async move {
                LocalScheduler.defer(Box::new(move || h.set(h.get() + 1)));
            })
            .await;
        assert_eq!(hits.get(), 0);

        local.await;
        assert_eq!(hits.get(), 1);
    }
}
