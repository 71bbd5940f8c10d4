use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use slabmap::SlabMap;

use crate::subscription::Subscription;

pub(crate) type ListenerTable = RefCell<SlabMap<Rc<dyn Fn()>>>;

/// The callback table behind [`UndoStack`](crate::UndoStack) and every state
/// manager.
///
/// Notification iterates over a snapshot of the table, so a callback may
/// register or unregister listeners (including itself) while the fan-out is
/// in progress.
pub(crate) struct Listeners(Rc<ListenerTable>);

impl Listeners {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(SlabMap::new())))
    }

    pub fn subscribe(&self, f: impl Fn() + 'static) -> Subscription {
        let key = self.0.borrow_mut().insert(Rc::new(f));
        Subscription::keyed(Rc::downgrade(&self.0), key)
    }

    pub fn notify(&self) {
        notify_table(&self.0);
    }

    pub fn downgrade(&self) -> WeakListeners {
        WeakListeners(Rc::downgrade(&self.0))
    }
}

/// Handle held by history entries: an operation must be able to notify the
/// manager it belongs to without keeping a dead manager alive.
#[derive(Clone)]
pub(crate) struct WeakListeners(Weak<ListenerTable>);

impl WeakListeners {
    pub fn notify(&self) {
        if let Some(table) = self.0.upgrade() {
            notify_table(&table);
        }
    }
}

fn notify_table(table: &Rc<ListenerTable>) {
    let snapshot: Vec<Rc<dyn Fn()>> = table.borrow().values().cloned().collect();
    for f in snapshot {
        f();
    }
}
