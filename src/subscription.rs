use std::{mem::take, rc::Weak};

use crate::listeners::ListenerTable;

#[cfg(test)]
mod tests;

/// RAII guard for a registered callback.
///
/// Dropping the guard unregisters the callback, matching the mount/teardown
/// contract of observation bridges. A guard that outlives the stack or state
/// manager it was registered on is a silent no-op.
#[derive(Default)]
#[must_use]
pub struct Subscription(RawSubscription);

impl Subscription {
    /// A guard that is not attached to anything.
    pub fn empty() -> Self {
        Subscription(RawSubscription::Empty)
    }

    pub(crate) fn keyed(table: Weak<ListenerTable>, key: usize) -> Self {
        Subscription(RawSubscription::Keyed { table, key })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        match take(&mut self.0) {
            RawSubscription::Empty => {}
            RawSubscription::Keyed { table, key } => {
                if let Some(table) = table.upgrade() {
                    table.borrow_mut().remove(key);
                }
            }
        }
    }
}

#[derive(Default)]
enum RawSubscription {
    #[default]
    Empty,
    Keyed {
        table: Weak<ListenerTable>,
        key: usize,
    },
}
