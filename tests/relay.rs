use std::{cell::RefCell, rc::Rc};

use futures::{FutureExt, StreamExt};
use serde_json::json;
use unredo::{ClientEvent, ProjectState, Relay, Revert, ServerEvent, StateDescriptor, StateManager};

fn name_state(registry: &ProjectState, data: &Rc<RefCell<String>>) -> StateManager<(), String> {
    registry.create_state(
        StateDescriptor::new("projectName", {
            let data = data.clone();
            move |()| data.borrow().clone()
        })
        .dispatcher("set", {
            let data = data.clone();
            move |(value,): (String,)| -> Revert {
                let old = data.borrow().clone();
                *data.borrow_mut() = value;
                let data = data.clone();
                Box::new(move || *data.borrow_mut() = old.clone())
            }
        }),
    )
}

fn fixture() -> (ProjectState, Rc<RefCell<String>>, StateManager<(), String>) {
    let registry = ProjectState::new();
    let data = Rc::new(RefCell::new(String::from("Foo")));
    let state = name_state(&registry, &data);
    (registry, data, state)
}

#[test]
fn request_update_replies_with_snapshot() {
    let (registry, _data, _state) = fixture();
    let relay = Relay::new(&registry);

    let reply = relay
        .handle_event(ClientEvent::RequestUpdate {
            state: "projectName".into(),
        })
        .unwrap();
    assert_eq!(
        reply,
        Some(ServerEvent::StateUpdate {
            state_name: "projectName".into(),
            new_state: json!("Foo"),
        })
    );
}

#[test]
fn remote_dispatch_mutates_and_records_history() {
    let (registry, data, _state) = fixture();
    let relay = Relay::new(&registry);

    let reply = relay
        .handle_text(r#"{"type":"dispatch","state":"projectName","dispatcher":"set","args":["Bar"]}"#);
    assert_eq!(reply, None);
    assert_eq!(*data.borrow(), "Bar");
    assert!(registry.undo_stack().can_undo());
}

#[test]
fn request_update_reply_is_wire_compatible() {
    let (registry, _data, _state) = fixture();
    let relay = Relay::new(&registry);

    let reply = relay
        .handle_text(r#"{"type":"requestUpdate","state":"projectName"}"#)
        .unwrap();
    let reply: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(
        reply,
        json!({"type": "stateUpdate", "stateName": "projectName", "newState": "Foo"})
    );
}

#[test]
fn invalid_messages_are_dropped() {
    let (registry, data, _state) = fixture();
    let relay = Relay::new(&registry);

    assert_eq!(relay.handle_text("not json"), None);
    assert_eq!(relay.handle_text(r#"{"type":"bogus"}"#), None);
    assert_eq!(
        relay.handle_text(r#"{"type":"dispatch","state":"nope","dispatcher":"set","args":[]}"#),
        None
    );
    assert_eq!(
        relay.handle_text(r#"{"type":"dispatch","state":"projectName","dispatcher":"set","args":[1]}"#),
        None
    );

    assert_eq!(*data.borrow(), "Foo");
    assert!(!registry.undo_stack().can_undo());
}

#[test]
fn state_changes_are_broadcast() {
    let (registry, _data, state) = fixture();
    let mut relay = Relay::new(&registry);

    let set = state.dispatcher::<(String,)>("set").unwrap();
    set.dispatch(("Bar".into(),));

    let update = relay.next().now_or_never().flatten().unwrap();
    assert_eq!(
        update,
        ServerEvent::StateUpdate {
            state_name: "projectName".into(),
            new_state: json!("Bar"),
        }
    );
    assert!(relay.next().now_or_never().is_none());

    // undo reaches peers the same way
    registry.undo_stack().undo();
    let update = relay.next().now_or_never().flatten().unwrap();
    assert_eq!(
        update,
        ServerEvent::StateUpdate {
            state_name: "projectName".into(),
            new_state: json!("Foo"),
        }
    );
}
