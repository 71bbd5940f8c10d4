use std::{
    any::Any,
    collections::HashMap,
    rc::Rc,
};

use derive_ex::derive_ex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{
    listeners::{Listeners, WeakListeners},
    stack::{Operation, UndoStack},
    subscription::Subscription,
};


/// The inverse returned by a mutation: calling it reverts exactly the effect
/// the mutation just performed.
pub type Revert = Box<dyn Fn()>;

/// Errors produced when resolving or invoking a dispatcher at a boundary.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown state `{0}`")]
    UnknownState(String),
    #[error("unknown dispatcher `{0}`")]
    UnknownDispatcher(String),
    #[error("dispatcher `{name}` does not take this argument type")]
    ArgumentType { name: String },
    #[error("invalid arguments for dispatcher `{name}`: {source}")]
    InvalidArgs {
        name: String,
        source: serde_json::Error,
    },
}

/// Declares a state: a unique name, an accessor over externally-owned data,
/// and a sealed set of named mutations.
///
/// `A` is the accessor's argument tuple (often `()`), `S` the shape the
/// accessor returns. A mutation performs a side effect on the external data
/// and returns the closure that reverts it; the framework never inspects a
/// mutation beyond calling it.
pub struct StateDescriptor<A, S> {
    name: Rc<str>,
    get_state: Rc<dyn Fn(A) -> S>,
    dispatchers: Vec<(Rc<str>, DispatcherDecl)>,
}

impl<A: 'static, S: 'static> StateDescriptor<A, S> {
    pub fn new(name: impl Into<Rc<str>>, get_state: impl Fn(A) -> S + 'static) -> Self {
        Self {
            name: name.into(),
            get_state: Rc::new(get_state),
            dispatchers: Vec::new(),
        }
    }

    /// Declares a named mutation.
    ///
    /// `Args` is the mutation's argument tuple; it is also the type remote
    /// argument lists are deserialized into, so an invalid remote request
    /// fails at the boundary instead of being applied half-typed.
    pub fn dispatcher<Args>(
        mut self,
        name: impl Into<Rc<str>>,
        f: impl Fn(Args) -> Revert + 'static,
    ) -> Self
    where
        Args: DeserializeOwned + Clone + 'static,
    {
        self.dispatchers.push((name.into(), DispatcherDecl::new(f)));
        self
    }
}

/// A reversible mutation entry point bound to a state manager.
///
/// Invoking it runs the mutation, records the operation in the shared
/// history, and notifies the manager's subscribers.
#[derive_ex(Clone, bound())]
pub struct Dispatcher<Args>(Rc<dyn Fn(Args)>);

impl<Args> Dispatcher<Args> {
    pub fn dispatch(&self, args: Args) {
        (self.0)(args)
    }
}

struct DispatcherSlot {
    /// `Rc<Dispatcher<Args>>` behind `Any`; downcast on typed retrieval.
    typed: Rc<dyn Any>,
    json: Rc<dyn Fn(Vec<Value>) -> Result<(), DispatchError>>,
}

/// A declared mutation, waiting for the stack and listener set it will be
/// wired to at `create_state` time.
struct DispatcherDecl(Box<dyn FnOnce(Rc<str>, UndoStack, WeakListeners) -> DispatcherSlot>);

impl DispatcherDecl {
    fn new<Args>(f: impl Fn(Args) -> Revert + 'static) -> Self
    where
        Args: DeserializeOwned + Clone + 'static,
    {
        Self(Box::new(move |name, stack, listeners| {
            let f = Rc::new(f);
            let dispatch: Rc<dyn Fn(Args)> = Rc::new({
                let name = name.clone();
                move |args: Args| {
                    debug!(dispatcher = %name, "dispatch");
                    let revert: Rc<dyn Fn()> = Rc::from(f(args.clone()));
                    let forward = {
                        let f = f.clone();
                        let args = args.clone();
                        let listeners = listeners.clone();
                        move || {
                            // Redo re-runs the mutation; the fresh inverse it
                            // returns is discarded, the stored one stays
                            // authoritative.
                            drop(f(args.clone()));
                            listeners.notify();
                        }
                    };
                    let backward = {
                        let listeners = listeners.clone();
                        move || {
                            revert();
                            listeners.notify();
                        }
                    };
                    stack.push(Operation::new(name.clone(), forward, backward));
                    listeners.notify();
                }
            });
            let json = Rc::new({
                let dispatch = dispatch.clone();
                let name = name.clone();
                move |args: Vec<Value>| {
                    let args: Args = serde_json::from_value(Value::Array(args)).map_err(
                        |source| DispatchError::InvalidArgs {
                            name: name.to_string(),
                            source,
                        },
                    )?;
                    dispatch(args);
                    Ok(())
                }
            });
            DispatcherSlot {
                typed: Rc::new(Dispatcher(dispatch)),
                json,
            }
        }))
    }
}

pub(crate) struct StateNode<A, S> {
    name: Rc<str>,
    get_state: Rc<dyn Fn(A) -> S>,
    listeners: Listeners,
    dispatchers: HashMap<Rc<str>, DispatcherSlot>,
}

impl<A, S> StateNode<A, S> {
    fn dispatch_json(&self, name: &str, args: Vec<Value>) -> Result<(), DispatchError> {
        let slot = self
            .dispatchers
            .get(name)
            .ok_or_else(|| DispatchError::UnknownDispatcher(name.to_string()))?;
        (slot.json)(args)
    }
}

/// Registry-facing face of a state manager, erased over `A` and `S`.
pub(crate) trait AnyState {
    fn notify(&self);
    fn subscribe(&self, f: Box<dyn Fn()>) -> Subscription;
    fn dispatch_json(&self, name: &str, args: Vec<Value>) -> Result<(), DispatchError>;
    fn snapshot(&self) -> Result<Value, serde_json::Error>;
}

impl<A, S> AnyState for StateNode<A, S>
where
    A: Default + 'static,
    S: Serialize + 'static,
{
    fn notify(&self) {
        self.listeners.notify();
    }

    fn subscribe(&self, f: Box<dyn Fn()>) -> Subscription {
        self.listeners.subscribe(f)
    }

    fn dispatch_json(&self, name: &str, args: Vec<Value>) -> Result<(), DispatchError> {
        StateNode::dispatch_json(self, name, args)
    }

    fn snapshot(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value((self.get_state)(A::default()))
    }
}

/// A subscribable view over one named piece of application state.
///
/// Built from a [`StateDescriptor`] by
/// [`ProjectState::create_state`](crate::ProjectState::create_state); never
/// owns the domain data, only the accessor/mutation indirection over it.
/// Cheap to clone; clones refer to the same manager.
#[derive_ex(Clone, bound())]
pub struct StateManager<A, S>(Rc<StateNode<A, S>>);

impl<A: 'static, S: 'static> StateManager<A, S> {
    pub(crate) fn build(desc: StateDescriptor<A, S>, stack: UndoStack) -> Self {
        let listeners = Listeners::new();
        let weak = listeners.downgrade();
        let mut dispatchers = HashMap::new();
        for (name, decl) in desc.dispatchers {
            let slot = (decl.0)(name.clone(), stack.clone(), weak.clone());
            dispatchers.insert(name, slot);
        }
        Self(Rc::new(StateNode {
            name: desc.name,
            get_state: desc.get_state,
            listeners,
            dispatchers,
        }))
    }

    /// The registry name of this state.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub(crate) fn name_rc(&self) -> Rc<str> {
        self.0.name.clone()
    }

    pub(crate) fn node(&self) -> Rc<dyn AnyState>
    where
        A: Default,
        S: Serialize,
    {
        self.0.clone()
    }

    /// Reads the current value through the accessor. Pure read.
    pub fn get_state(&self, args: A) -> S {
        (self.0.get_state)(args)
    }

    /// Registers `f` to run after every change to this state.
    ///
    /// Listeners run synchronously over a snapshot of the set, in
    /// unspecified order.
    pub fn subscribe(&self, f: impl Fn() + 'static) -> Subscription {
        self.0.listeners.subscribe(f)
    }

    /// Notifies subscribers that the underlying data changed outside of any
    /// dispatcher. No history entry is recorded.
    pub fn force_update(&self) {
        self.0.listeners.notify();
    }

    /// Calls `f` with the current value immediately and again after every
    /// change.
    pub fn watch(&self, args: A, f: impl Fn(&S) + 'static) -> Subscription
    where
        A: Clone,
    {
        let get_state = self.0.get_state.clone();
        let run = move || f(&get_state(args.clone()));
        run();
        self.0.listeners.subscribe(run)
    }

    /// Resolves the typed handle for a declared mutation.
    ///
    /// Fails when no mutation of that name was declared, or when `Args` is
    /// not the argument tuple it was declared with.
    pub fn dispatcher<Args: 'static>(&self, name: &str) -> Result<Dispatcher<Args>, DispatchError> {
        let slot = self
            .0
            .dispatchers
            .get(name)
            .ok_or_else(|| DispatchError::UnknownDispatcher(name.to_string()))?;
        match slot.typed.clone().downcast::<Dispatcher<Args>>() {
            Ok(d) => Ok((*d).clone()),
            Err(_) => Err(DispatchError::ArgumentType {
                name: name.to_string(),
            }),
        }
    }

    /// Invokes a declared mutation with a JSON argument list. This is the
    /// boundary remotely-originated operations are routed through.
    pub fn dispatch_json(&self, name: &str, args: Vec<Value>) -> Result<(), DispatchError> {
        self.0.dispatch_json(name, args)
    }
}

impl<A, S> std::fmt::Debug for StateManager<A, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("name", &self.0.name)
            .field("dispatchers", &self.0.dispatchers.len())
            .finish()
    }
}
