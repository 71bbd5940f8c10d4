use std::{cell::RefCell, rc::Rc};

use assert_call::{call, CallRecorder};

use super::*;
use crate::listeners::Listeners;

#[test]
fn drop_unregisters() {
    let mut cr = CallRecorder::new();
    let listeners = Listeners::new();
    let s = listeners.subscribe(|| call!("f"));

    listeners.notify();
    cr.verify("f");

    drop(s);
    listeners.notify();
    cr.verify(());
}

#[test]
fn empty_is_noop() {
    drop(Subscription::empty());
}

#[test]
fn drop_after_owner_gone_is_noop() {
    let listeners = Listeners::new();
    let s = listeners.subscribe(|| {});
    drop(listeners);
    drop(s);
}

#[test]
fn listener_may_unsubscribe_itself_during_notify() {
    let mut cr = CallRecorder::new();
    let listeners = Listeners::new();
    let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let s = listeners.subscribe({
        let slot = slot.clone();
        move || {
            call!("once");
            slot.borrow_mut().take();
        }
    });
    *slot.borrow_mut() = Some(s);

    listeners.notify();
    listeners.notify();
    cr.verify("once");
}
