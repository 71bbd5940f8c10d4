//! A minimal session: one state, a few dispatches, undo/redo, and the
//! history view a stack viewer would render.

use std::{cell::RefCell, rc::Rc};

use unredo::{ProjectState, Revert, StateDescriptor};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let registry = ProjectState::new();
    let todos: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let state = registry.create_state(
        StateDescriptor::new("todos", {
            let todos = todos.clone();
            move |()| todos.borrow().clone()
        })
        .dispatcher("add", {
            let todos = todos.clone();
            move |(item,): (String,)| -> Revert {
                todos.borrow_mut().push(item);
                let todos = todos.clone();
                Box::new(move || {
                    todos.borrow_mut().pop();
                })
            }
        }),
    );

    let _watch = state.watch((), |todos| println!("todos: {todos:?}"));

    let add = state.dispatcher::<(String,)>("add").unwrap();
    add.dispatch(("water the plants".into(),));
    add.dispatch(("file the report".into(),));

    let stack = registry.undo_stack();
    stack.undo();
    stack.redo();
    stack.undo();
    add.dispatch(("call the plumber".into(),));

    println!("history:");
    for entry in stack.view() {
        println!("  {} [{}]", entry.label, entry.segment);
    }
}
