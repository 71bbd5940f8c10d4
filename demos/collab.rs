//! Two peers sharing one project through the wire contract.
//!
//! A real deployment puts a socket server between the peers and the relay;
//! here the JSON messages are handed over directly.

use std::{cell::RefCell, rc::Rc};

use futures::{FutureExt, StreamExt};
use unredo::{ProjectState, Relay, Revert, StateDescriptor};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let registry = ProjectState::new();
    let name = Rc::new(RefCell::new(String::from("Untitled")));
    let _state = registry.create_state(
        StateDescriptor::new("projectName", {
            let name = name.clone();
            move |()| name.borrow().clone()
        })
        .dispatcher("set", {
            let name = name.clone();
            move |(value,): (String,)| -> Revert {
                let old = name.borrow().clone();
                *name.borrow_mut() = value;
                let name = name.clone();
                Box::new(move || *name.borrow_mut() = old.clone())
            }
        }),
    );

    let mut relay = Relay::new(&registry);

    // Peer A connects and asks for the current value.
    let reply = relay.handle_text(r#"{"type":"requestUpdate","state":"projectName"}"#);
    println!("reply to peer A: {}", reply.unwrap());

    // Peer B renames the project.
    relay.handle_text(
        r#"{"type":"dispatch","state":"projectName","dispatcher":"set","args":["Fortress"]}"#,
    );
    drain_broadcasts(&mut relay);

    // A local undo reaches the peers the same way.
    registry.undo_stack().undo();
    drain_broadcasts(&mut relay);

    // Garbage on the wire is logged and dropped.
    assert_eq!(relay.handle_text("not json"), None);
}

fn drain_broadcasts(relay: &mut Relay<'_>) {
    while let Some(Some(update)) = relay.next().now_or_never() {
        println!(
            "broadcast to all peers: {}",
            serde_json::to_string(&update).unwrap()
        );
    }
}
