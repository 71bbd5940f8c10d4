use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use parse_display::Display;
use slabmap::SlabMap;
use tracing::debug;

use crate::{listeners::Listeners, subscription::Subscription};

#[cfg(test)]
mod tests;

/// The apply or revert half of an [`Operation`].
pub type Capability = Rc<dyn Fn()>;

/// One historized, named, reversible operation.
///
/// The stack owns the record exclusively once pushed. The capabilities are
/// opaque to the stack: it never knows which state manager an operation
/// belongs to.
pub struct Operation {
    label: Rc<str>,
    forward: Capability,
    backward: Capability,
}

impl Operation {
    /// Bundles a label with its apply (`forward`) and revert (`backward`)
    /// actions.
    pub fn new(
        label: impl Into<Rc<str>>,
        forward: impl Fn() + 'static,
        backward: impl Fn() + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            forward: Rc::new(forward),
            backward: Rc::new(backward),
        }
    }

    /// The sentinel occupying `present` before any dispatch.
    fn begin() -> Self {
        Self::new("begin", || {}, || {})
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Which segment of the history a [`StackEntry`] belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Display)]
#[display(style = "lowercase")]
pub enum Segment {
    Past,
    Present,
    Future,
}

/// One row of [`UndoStack::view`], oldest to newest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackEntry {
    pub label: Rc<str>,
    pub segment: Segment,
}

struct RawStack {
    /// Slot arena holding every live operation. Segments store arena keys;
    /// keys of a discarded future are released immediately.
    ops: SlabMap<Operation>,
    /// Oldest to newest.
    past: Vec<usize>,
    /// The most recently applied or redone operation.
    present: usize,
    /// Nearest to farthest.
    future: VecDeque<usize>,
}

/// An undo/redo history shared by every state manager of a project.
///
/// Cheap to clone; clones refer to the same history. The three segments form
/// a single linear timeline: pushing after an undo abandons the previous
/// future permanently.
#[derive(Clone)]
pub struct UndoStack(Rc<UndoStackNode>);

struct UndoStackNode {
    stack: RefCell<RawStack>,
    listeners: Listeners,
    limit: Option<usize>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A stack keeping at most `limit` past entries; the oldest entry is
    /// dropped when a push would exceed it.
    pub fn with_limit(limit: usize) -> Self {
        Self::build(Some(limit))
    }

    fn build(limit: Option<usize>) -> Self {
        let mut ops = SlabMap::new();
        let present = ops.insert(Operation::begin());
        Self(Rc::new(UndoStackNode {
            stack: RefCell::new(RawStack {
                ops,
                past: Vec::new(),
                present,
                future: VecDeque::new(),
            }),
            listeners: Listeners::new(),
            limit,
        }))
    }

    /// Adds an operation to the history and notifies stack subscribers.
    ///
    /// Any redoable future is discarded: after a push the only timeline is
    /// the one ending in `op`.
    pub fn push(&self, op: Operation) {
        debug!(op = %op.label, "push");
        {
            let stack = &mut *self.0.stack.borrow_mut();
            for key in stack.future.drain(..) {
                stack.ops.remove(key);
            }
            let key = stack.ops.insert(op);
            let prev = std::mem::replace(&mut stack.present, key);
            stack.past.push(prev);
            if let Some(limit) = self.0.limit {
                while stack.past.len() > limit {
                    let oldest = stack.past.remove(0);
                    stack.ops.remove(oldest);
                }
            }
        }
        self.0.listeners.notify();
    }

    /// Undoes the present operation and notifies stack subscribers.
    ///
    /// Runs the outgoing present's backward capability; the newly installed
    /// present (formerly last in past) is not re-applied, it was never
    /// reverted. Returns `false` without running anything or notifying when
    /// there is nothing to undo.
    pub fn undo(&self) -> bool {
        let backward = {
            let stack = self.0.stack.borrow();
            if stack.past.is_empty() {
                return false;
            }
            let Some(op) = stack.ops.get(stack.present) else {
                return false;
            };
            debug!(op = %op.label, "undo");
            op.backward.clone()
        };
        // No borrow is held here: the capability notifies its state manager,
        // whose listeners may read `view()`.
        backward();
        {
            let stack = &mut *self.0.stack.borrow_mut();
            if let Some(prev) = stack.past.pop() {
                let outgoing = std::mem::replace(&mut stack.present, prev);
                stack.future.push_front(outgoing);
            }
        }
        self.0.listeners.notify();
        true
    }

    /// Redoes the nearest future operation and notifies stack subscribers.
    ///
    /// Returns `false` without running anything or notifying when there is
    /// nothing to redo.
    pub fn redo(&self) -> bool {
        let forward = {
            let stack = &mut *self.0.stack.borrow_mut();
            let Some(&next) = stack.future.front() else {
                return false;
            };
            let Some(op) = stack.ops.get(next) else {
                return false;
            };
            debug!(op = %op.label, "redo");
            let forward = op.forward.clone();
            stack.future.pop_front();
            let outgoing = std::mem::replace(&mut stack.present, next);
            stack.past.push(outgoing);
            forward
        };
        forward();
        self.0.listeners.notify();
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.0.stack.borrow().past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.0.stack.borrow().future.is_empty()
    }

    /// Registers `f` to run after every successful push, undo, or redo.
    pub fn subscribe(&self, f: impl Fn() + 'static) -> Subscription {
        self.0.listeners.subscribe(f)
    }

    /// A flattened, oldest-to-newest view of the history, tagged by segment.
    /// For display only.
    pub fn view(&self) -> Vec<StackEntry> {
        let stack = self.0.stack.borrow();
        let mut view = Vec::with_capacity(stack.past.len() + 1 + stack.future.len());
        let entry = |key: usize, segment: Segment| {
            stack.ops.get(key).map(|op| StackEntry {
                label: op.label.clone(),
                segment,
            })
        };
        view.extend(stack.past.iter().filter_map(|&key| entry(key, Segment::Past)));
        view.extend(entry(stack.present, Segment::Present));
        view.extend(
            stack
                .future
                .iter()
                .filter_map(|&key| entry(key, Segment::Future)),
        );
        view
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.stack.try_borrow() {
            Ok(stack) => f
                .debug_struct("UndoStack")
                .field("past", &stack.past.len())
                .field("future", &stack.future.len())
                .finish(),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}
