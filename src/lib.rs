//! `unredo` is a command-based state management library with a shared
//! undo/redo history, designed to back collaborative editors.
//!
//! State lives wherever the application keeps it; `unredo` adds the
//! indirection that makes it observable and reversible:
//!
//! - [`StateDescriptor`]: a name, an accessor, and a sealed set of named
//!   mutations over externally-owned data. A mutation performs its effect
//!   and returns the closure that reverts it.
//! - [`StateManager`]: the subscribable view built from a descriptor. Every
//!   mutation goes through a [`Dispatcher`], which records the operation in
//!   the history and notifies subscribers.
//! - [`UndoStack`]: one past/present/future history shared by *all* states
//!   of a project. Undoing unwinds operations across states in the order
//!   they happened; pushing after an undo discards the abandoned future.
//! - [`ProjectState`]: the explicit context object owning the stack and the
//!   name-keyed routing table used for remotely-originated operations
//!   ([`Relay`], [`ClientEvent`], [`ServerEvent`]).
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//! use unredo::{ProjectState, Revert, StateDescriptor};
//!
//! let project = ProjectState::new();
//!
//! let name = Rc::new(RefCell::new(String::from("foo")));
//! let state = project.create_state(
//!     StateDescriptor::new("name", {
//!         let name = name.clone();
//!         move |()| name.borrow().clone()
//!     })
//!     .dispatcher("set", {
//!         let name = name.clone();
//!         move |(value,): (String,)| -> Revert {
//!             let old = name.borrow().clone();
//!             *name.borrow_mut() = value;
//!             let name = name.clone();
//!             Box::new(move || *name.borrow_mut() = old.clone())
//!         }
//!     }),
//! );
//!
//! let set = state.dispatcher::<(String,)>("set").unwrap();
//! set.dispatch(("bar".into(),));
//! assert_eq!(state.get_state(()), "bar");
//!
//! assert!(project.undo_stack().undo());
//! assert_eq!(state.get_state(()), "foo");
//! assert!(project.undo_stack().redo());
//! assert_eq!(state.get_state(()), "bar");
//! ```
//!
//! Everything is single-threaded and synchronous: dispatch, undo, redo, and
//! notification fan-out run to completion once invoked. Listeners must not
//! re-enter the history from inside a notification.

mod listeners;
mod project;
mod protocol;
mod relay;
mod stack;
mod state;
mod subscription;

pub use project::ProjectState;
pub use protocol::{ClientEvent, ProtocolError, ServerEvent};
pub use relay::Relay;
pub use stack::{Capability, Operation, Segment, StackEntry, UndoStack};
pub use state::{DispatchError, Dispatcher, Revert, StateDescriptor, StateManager};
pub use subscription::Subscription;
