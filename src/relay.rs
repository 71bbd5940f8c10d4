use std::{
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    Stream,
};
use tracing::{info, warn};

use crate::{
    project::ProjectState,
    protocol::{ClientEvent, ProtocolError, ServerEvent},
    state::AnyState,
    subscription::Subscription,
};

/// In-process half of a collaboration relay.
///
/// Routes inbound wire events through a registry and collects the outbound
/// `stateUpdate` broadcasts every connected peer should receive, exposed as
/// a [`Stream`]. The socket loop that actually carries these events lives
/// outside this crate; it only consumes this contract.
pub struct Relay<'a> {
    project: &'a ProjectState,
    rx: UnboundedReceiver<ServerEvent>,
    _subscriptions: Vec<Subscription>,
}

impl<'a> Relay<'a> {
    /// Subscribes to every state currently registered on `project` and
    /// starts collecting broadcasts. States registered later are not picked
    /// up; build the relay after the registry is populated.
    pub fn new(project: &'a ProjectState) -> Self {
        let (tx, rx) = mpsc::unbounded();
        let subscriptions = project
            .registered()
            .into_iter()
            .map(|(name, state)| broadcast_on_change(name, state, tx.clone()))
            .collect();
        Self {
            project,
            rx,
            _subscriptions: subscriptions,
        }
    }

    /// Handles one inbound event, returning the direct reply when one is
    /// due. Broadcasts triggered by a dispatch arrive through the stream,
    /// not the return value.
    pub fn handle_event(&self, event: ClientEvent) -> Result<Option<ServerEvent>, ProtocolError> {
        match event {
            ClientEvent::RequestUpdate { state } => {
                let new_state = self.project.snapshot(&state)?;
                Ok(Some(ServerEvent::StateUpdate {
                    state_name: state,
                    new_state,
                }))
            }
            ClientEvent::Dispatch {
                state,
                dispatcher,
                args,
            } => {
                self.project.dispatch_remote(&state, &dispatcher, args)?;
                Ok(None)
            }
        }
    }

    /// Parses and handles one inbound JSON message.
    ///
    /// Malformed or invalid messages are logged and dropped; nothing
    /// surfaces into the caller's event loop.
    pub fn handle_text(&self, text: &str) -> Option<String> {
        let event = match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => event,
            Err(err) => {
                warn!(%err, "received invalid event");
                return None;
            }
        };
        match self.handle_event(event) {
            Ok(reply) => reply.and_then(|reply| serde_json::to_string(&reply).ok()),
            Err(err) => {
                warn!(%err, "dropping event");
                None
            }
        }
    }
}

impl Stream for Relay<'_> {
    type Item = ServerEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().rx).poll_next(cx)
    }
}

fn broadcast_on_change(
    name: Rc<str>,
    state: Rc<dyn AnyState>,
    tx: UnboundedSender<ServerEvent>,
) -> Subscription {
    // The callback lives in the state's own listener table; capture the
    // state weakly so the table does not keep itself alive through us.
    let weak = Rc::downgrade(&state);
    state.subscribe(Box::new(move || {
        let Some(state) = weak.upgrade() else { return };
        match state.snapshot() {
            Ok(new_state) => {
                info!(state = %name, "state changed, broadcasting");
                let _ = tx.unbounded_send(ServerEvent::StateUpdate {
                    state_name: name.to_string(),
                    new_state,
                });
            }
            Err(err) => warn!(state = %name, %err, "skipping broadcast of unserializable state"),
        }
    }))
}
