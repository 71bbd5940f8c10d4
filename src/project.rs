use std::{cell::RefCell, collections::HashMap, rc::Rc};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::{
    protocol::ProtocolError,
    stack::UndoStack,
    state::{AnyState, DispatchError, StateDescriptor, StateManager},
};


/// The owner of one shared [`UndoStack`] and the set of state managers built
/// against it.
///
/// The registry is an explicit context object: independent registries (one
/// per test, per session) never share history or routing tables.
pub struct ProjectState {
    undo_stack: UndoStack,
    states: RefCell<HashMap<Rc<str>, Rc<dyn AnyState>>>,
}

impl ProjectState {
    pub fn new() -> Self {
        Self::with_stack(UndoStack::new())
    }

    /// A registry whose history keeps at most `limit` past entries.
    pub fn with_history_limit(limit: usize) -> Self {
        Self::with_stack(UndoStack::with_limit(limit))
    }

    fn with_stack(undo_stack: UndoStack) -> Self {
        Self {
            undo_stack,
            states: RefCell::new(HashMap::new()),
        }
    }

    /// The history shared by every state created from this registry.
    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo_stack
    }

    /// Builds a state manager bound to the shared history and registers it
    /// under the descriptor name for remote routing.
    ///
    /// Registering a name twice replaces the previous table entry; handles
    /// to the replaced manager keep working, it is only no longer reachable
    /// by name.
    pub fn create_state<A, S>(&self, desc: StateDescriptor<A, S>) -> StateManager<A, S>
    where
        A: Default + 'static,
        S: Serialize + 'static,
    {
        let manager = StateManager::build(desc, self.undo_stack.clone());
        let name = manager.name_rc();
        let replaced = self
            .states
            .borrow_mut()
            .insert(name.clone(), manager.node());
        if replaced.is_some() {
            warn!(state = %name, "state name re-registered, previous manager replaced");
        }
        manager
    }

    /// Notifies every registered state's subscribers, skipping the stack's
    /// own. For bulk out-of-band changes (e.g. a full snapshot replace) that
    /// bypass the dispatcher path and therefore record no history entry.
    pub fn force_update_all(&self) {
        let states: Vec<Rc<dyn AnyState>> = self.states.borrow().values().cloned().collect();
        for state in states {
            state.notify();
        }
    }

    /// Routes an externally-received operation to the right dispatcher.
    ///
    /// Absence of the state or the dispatcher is a validation failure;
    /// nothing is invoked.
    pub fn dispatch_remote(
        &self,
        state: &str,
        dispatcher: &str,
        args: Vec<Value>,
    ) -> Result<(), DispatchError> {
        self.lookup(state)?.dispatch_json(dispatcher, args)
    }

    /// Serializes the current value of a registered state.
    pub fn snapshot(&self, state: &str) -> Result<Value, ProtocolError> {
        let node = self.lookup(state)?;
        node.snapshot().map_err(|source| ProtocolError::Snapshot {
            state: state.to_string(),
            source,
        })
    }

    pub(crate) fn registered(&self) -> Vec<(Rc<str>, Rc<dyn AnyState>)> {
        self.states
            .borrow()
            .iter()
            .map(|(name, state)| (name.clone(), state.clone()))
            .collect()
    }

    fn lookup(&self, state: &str) -> Result<Rc<dyn AnyState>, DispatchError> {
        self.states
            .borrow()
            .get(state)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownState(state.to_string()))
    }
}

impl Default for ProjectState {
    fn default() -> Self {
        Self::new()
    }
}
