use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::{ChannelEvent, ClientInner, User};
use crate::casemap::irc_to_lower;
use crate::event::{EventBus, Observable};

/// A channel the local client joined.
///
/// Membership is not stored here; [`Channel::names`] filters the client's
/// user registry instead.
pub struct Channel {
    name: String,
    key: String,
    password: Option<String>,
    joined: AtomicBool,
    events: EventBus<ChannelEvent>,
    client: Weak<ClientInner>,
}

impl Channel {
    pub(crate) fn new(name: &str, password: Option<&str>, client: Weak<ClientInner>) -> Self {
        Self {
            name: name.to_owned(),
            key: irc_to_lower(name),
            password: password.map(str::to_owned),
            joined: AtomicBool::new(false),
            events: EventBus::new(),
            client,
        }
    }

    /// Name as passed to `join`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The folded registry key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Channel key (password) used to join, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Whether the server finished sending the member list.
    pub fn is_joined(&self) -> bool {
        self.joined.load(Ordering::Acquire)
    }

    /// Known members.
    pub fn names(&self) -> Vec<Arc<User>> {
        self.client
            .upgrade()
            .map(|client| client.members_of(&self.key))
            .unwrap_or_default()
    }

    /// Leave the channel.
    pub fn part(&self) {
        if let Some(client) = self.client.upgrade() {
            client.send(format!("PART {}", self.name));
        }
    }

    /// Send a message to the channel.
    pub fn message(&self, text: &str) {
        if let Some(client) = self.client.upgrade() {
            client.send(format!("PRIVMSG {} :{text}", self.name));
        }
    }

    pub(crate) fn mark_joined(&self) {
        self.joined.store(true, Ordering::Release);
    }

    pub(crate) fn emit(&self, event: ChannelEvent) {
        self.events.emit(event.name(), &event);
    }
}

impl Observable for Channel {
    type Event = ChannelEvent;

    fn events(&self) -> &EventBus<ChannelEvent> {
        &self.events
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("joined", &self.is_joined())
            .finish()
    }
}
