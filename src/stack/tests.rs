use std::{cell::Cell, rc::Rc};

use assert_call::{call, CallRecorder};
use rstest::rstest;

use super::*;

fn counter_op(label: &str, value: &Rc<Cell<i32>>, delta: i32) -> Operation {
    let forward = {
        let value = value.clone();
        move || value.set(value.get() + delta)
    };
    let backward = {
        let value = value.clone();
        move || value.set(value.get() - delta)
    };
    Operation::new(label, forward, backward)
}

/// Applies the effect and records it, the way a dispatcher does.
fn apply_and_push(stack: &UndoStack, label: &str, value: &Rc<Cell<i32>>, delta: i32) {
    value.set(value.get() + delta);
    stack.push(counter_op(label, value, delta));
}

#[test]
fn begin_sentinel() {
    let stack = UndoStack::new();
    let view = stack.view();
    assert_eq!(view.len(), 1);
    assert_eq!(&*view[0].label, "begin");
    assert_eq!(view[0].segment, Segment::Present);
    assert!(!stack.can_undo());
    assert!(!stack.can_redo());
}

#[test]
fn undo_runs_backward_of_present() {
    let stack = UndoStack::new();
    let value = Rc::new(Cell::new(0));
    apply_and_push(&stack, "inc", &value, 1);
    apply_and_push(&stack, "inc", &value, 10);
    assert_eq!(value.get(), 11);

    assert!(stack.undo());
    assert_eq!(value.get(), 1);
    assert!(stack.undo());
    assert_eq!(value.get(), 0);

    assert!(stack.redo());
    assert_eq!(value.get(), 1);
    assert!(stack.redo());
    assert_eq!(value.get(), 11);
}

#[test]
fn push_discards_future() {
    let stack = UndoStack::new();
    let value = Rc::new(Cell::new(0));
    apply_and_push(&stack, "a", &value, 1);
    apply_and_push(&stack, "b", &value, 2);
    assert!(stack.undo());
    assert!(stack.can_redo());

    apply_and_push(&stack, "c", &value, 4);
    assert!(!stack.can_redo());
    assert!(!stack.redo());

    let view = stack.view();
    let labels: Vec<&str> = view.iter().map(|e| &*e.label).collect();
    assert_eq!(labels, ["begin", "a", "c"]);
    assert_eq!(value.get(), 5);
}

#[test]
fn undo_empty_is_silent() {
    let mut cr = CallRecorder::new();
    let stack = UndoStack::new();
    let _s = stack.subscribe(|| call!("stack"));

    assert!(!stack.undo());
    cr.verify(());
    assert_eq!(stack.view().len(), 1);
}

#[test]
fn redo_empty_is_silent() {
    let mut cr = CallRecorder::new();
    let stack = UndoStack::new();
    let value = Rc::new(Cell::new(0));
    apply_and_push(&stack, "a", &value, 1);
    let _s = stack.subscribe(|| call!("stack"));

    assert!(!stack.redo());
    cr.verify(());
    assert_eq!(stack.view().len(), 2);
}

#[rstest]
#[case(0, 0)]
#[case(3, 0)]
#[case(3, 2)]
#[case(5, 5)]
fn view_covers_all_segments(#[case] pushes: usize, #[case] undos: usize) {
    let stack = UndoStack::new();
    let value = Rc::new(Cell::new(0));
    for i in 0..pushes {
        apply_and_push(&stack, &format!("op{i}"), &value, 1);
    }
    for _ in 0..undos {
        assert!(stack.undo());
    }
    // past + present + future never loses an entry to undo/redo cursor moves
    assert_eq!(stack.view().len(), pushes + 1);
    assert_eq!(
        stack
            .view()
            .iter()
            .filter(|e| e.segment == Segment::Present)
            .count(),
        1
    );
    assert_eq!(
        stack
            .view()
            .iter()
            .filter(|e| e.segment == Segment::Future)
            .count(),
        undos
    );
}

#[test]
fn notifies_once_per_operation() {
    let mut cr = CallRecorder::new();
    let stack = UndoStack::new();
    let value = Rc::new(Cell::new(0));
    let _s = stack.subscribe(|| call!("stack"));

    apply_and_push(&stack, "a", &value, 1);
    cr.verify("stack");

    stack.undo();
    cr.verify("stack");

    stack.redo();
    cr.verify("stack");
}

#[test]
fn undo_runs_capability_before_stack_notification() {
    let mut cr = CallRecorder::new();
    let stack = UndoStack::new();
    let _s = stack.subscribe(|| call!("stack"));

    stack.push(Operation::new("a", || call!("redo:a"), || call!("undo:a")));
    cr.verify("stack");

    stack.undo();
    cr.verify(["undo:a", "stack"]);

    stack.redo();
    cr.verify(["redo:a", "stack"]);
}

#[test]
fn limit_drops_oldest_past_entry() {
    let stack = UndoStack::with_limit(2);
    let value = Rc::new(Cell::new(0));
    apply_and_push(&stack, "a", &value, 1);
    apply_and_push(&stack, "b", &value, 2);
    apply_and_push(&stack, "c", &value, 4);

    let view = stack.view();
    let labels: Vec<&str> = view.iter().map(|e| &*e.label).collect();
    assert_eq!(labels, ["a", "b", "c"]);

    assert!(stack.undo());
    assert!(stack.undo());
    assert!(!stack.undo());
    // the dropped entries ("begin", then the effect of "a") stay applied
    assert_eq!(value.get(), 1);
}

#[test]
fn dropped_subscription_stops_notifications() {
    let mut cr = CallRecorder::new();
    let stack = UndoStack::new();
    let value = Rc::new(Cell::new(0));
    let s = stack.subscribe(|| call!("stack"));

    apply_and_push(&stack, "a", &value, 1);
    cr.verify("stack");

    drop(s);
    apply_and_push(&stack, "b", &value, 1);
    cr.verify(());
}
