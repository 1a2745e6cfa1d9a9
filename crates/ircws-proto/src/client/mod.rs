//! Channel and user tracking on top of a [`Connection`].
//!
//! The [`Client`] registers handlers for the commands that change channel or
//! user state and turns them into [`ChannelEvent`]s, [`UserEvent`]s and
//! [`ClientEvent`]s. Commands it issues (`join`, `part`, `message`, ...) are
//! fire-and-forget: their outcome shows up later as events, never as a return
//! value.
//!
//! Registry keys are folded with [`irc_to_lower`], so `#Rust` and `#rust` are
//! the same channel.

mod channel;
mod events;
mod handlers;
mod user;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

pub use self::channel::Channel;
pub use self::events::{ChannelEvent, ClientError, ClientEvent, Target, UserEvent};
pub use self::user::{User, UserInfo};

use crate::casemap::irc_to_lower;
use crate::connection::{ConnectError, Connection};
use crate::event::{EventBus, Observable};
use crate::transport::Transport;

#[derive(Default)]
struct Registry {
    channels: HashMap<String, Arc<Channel>>,
    users: HashMap<String, Arc<User>>,
}

pub(crate) struct ClientInner {
    connection: Connection,
    registry: Mutex<Registry>,
    events: EventBus<ClientEvent>,
}

/// An IRC client that tracks channels and users.
///
/// Cloning is cheap; clones share the registry and the connection.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("Client")
            .field("connection", &self.inner.connection)
            .field("channels", &registry.channels.len())
            .field("users", &registry.users.len())
            .finish()
    }
}

impl Client {
    /// Client that will register as `nick` over `transport`.
    pub fn new(nick: impl Into<String>, transport: impl Transport) -> Self {
        Self::with_connection(Connection::new(nick, transport))
    }

    /// Client on top of an existing, unopened connection.
    pub fn with_connection(connection: Connection) -> Self {
        let inner = Arc::new(ClientInner {
            connection,
            registry: Mutex::new(Registry::default()),
            events: EventBus::new(),
        });
        handlers::register(&inner);
        Self { inner }
    }

    /// Open the connection and wait for registration to complete.
    pub async fn connect(&self) -> Result<(), ConnectError> {
        self.inner.connection.open().await
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// Join `name`, or return the record if it is already tracked.
    ///
    /// The record is created immediately; its `ready` event fires once the
    /// server finishes the NAMES listing.
    pub fn join(&self, name: &str, key: Option<&str>) -> Arc<Channel> {
        let (channel, created) = self.inner.channel_entry(name, key);
        if created {
            match key {
                Some(key) => self.inner.send(format!("JOIN {name} {key}")),
                None => self.inner.send(format!("JOIN {name}")),
            }
        }
        channel
    }

    /// Leave `name`.
    pub fn part(&self, name: &str) {
        self.inner.send(format!("PART {name}"));
    }

    /// Disconnect from the network.
    pub fn quit(&self, message: Option<&str>) {
        match message {
            Some(message) => self.inner.send(format!("QUIT :{message}")),
            None => self.inner.send("QUIT".to_owned()),
        }
    }

    /// Send a PRIVMSG to a channel or nick.
    pub fn message(&self, target: &str, text: &str) {
        self.inner.send(format!("PRIVMSG {target} :{text}"));
    }

    /// Send a raw command line.
    pub fn send(&self, line: impl Into<String>) {
        self.inner.send(line.into());
    }

    /// The record for `nick`, created if unknown, and request WHOIS for it.
    pub fn user(&self, nick: &str) -> Arc<User> {
        let user = self.inner.user_entry(nick);
        user.whois();
        user
    }

    /// A tracked channel.
    pub fn channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.inner.find_channel(name)
    }

    /// A known user, without issuing WHOIS.
    pub fn find_user(&self, nick: &str) -> Option<Arc<User>> {
        self.inner.find_user(nick)
    }

    /// All tracked channels.
    pub fn channels(&self) -> Vec<Arc<Channel>> {
        self.inner.registry.lock().channels.values().cloned().collect()
    }

    /// All known users.
    pub fn users(&self) -> Vec<Arc<User>> {
        self.inner.registry.lock().users.values().cloned().collect()
    }
}

impl Observable for Client {
    type Event = ClientEvent;

    fn events(&self) -> &EventBus<ClientEvent> {
        &self.inner.events
    }
}

impl ClientInner {
    fn send(&self, line: String) {
        if let Err(e) = self.connection.send(line) {
            debug!(error = %e, "command dropped");
        }
    }

    fn emit(&self, event: ClientEvent) {
        self.events.emit(event.name(), &event);
    }

    /// Tracked channel for `name`, and whether it was just created.
    fn channel_entry(self: &Arc<Self>, name: &str, key: Option<&str>) -> (Arc<Channel>, bool) {
        let mut registry = self.registry.lock();
        let folded = irc_to_lower(name);
        if let Some(existing) = registry.channels.get(&folded) {
            return (Arc::clone(existing), false);
        }
        let channel = Arc::new(Channel::new(name, key, Arc::downgrade(self)));
        registry.channels.insert(folded, Arc::clone(&channel));
        (channel, true)
    }

    /// Forget a channel we left, and every membership recorded for it.
    /// Members left sharing no tracked channel with us are forgotten too.
    fn drop_channel(&self, key: &str) -> Option<Arc<Channel>> {
        let (channel, members) = {
            let mut registry = self.registry.lock();
            let channel = registry.channels.remove(key)?;
            let members: Vec<Arc<User>> = registry
                .users
                .values()
                .filter(|user| user.is_in(key))
                .cloned()
                .collect();
            (channel, members)
        };
        for user in &members {
            user.update(|info| {
                info.channels.remove(key);
            });
        }
        self.prune(&members);
        Some(channel)
    }

    /// Evict those of `users` that are in no tracked channel.
    fn prune(&self, users: &[Arc<User>]) {
        let mut registry = self.registry.lock();
        for user in users {
            let info = user.info();
            if info
                .channels
                .iter()
                .any(|key| registry.channels.contains_key(key))
            {
                continue;
            }
            let folded = irc_to_lower(&info.nick);
            if registry
                .users
                .get(&folded)
                .is_some_and(|entry| Arc::ptr_eq(entry, user))
            {
                debug!(nick = %info.nick, "forgetting user outside tracked channels");
                registry.users.remove(&folded);
            }
        }
    }

    fn find_channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.registry.lock().channels.get(&irc_to_lower(name)).cloned()
    }

    fn find_user(&self, nick: &str) -> Option<Arc<User>> {
        self.registry.lock().users.get(&irc_to_lower(nick)).cloned()
    }

    fn user_entry(self: &Arc<Self>, nick: &str) -> Arc<User> {
        let mut registry = self.registry.lock();
        Arc::clone(
            registry
                .users
                .entry(irc_to_lower(nick))
                .or_insert_with(|| Arc::new(User::new(nick, Arc::downgrade(self)))),
        )
    }

    fn remove_user(&self, nick: &str) -> Option<Arc<User>> {
        self.registry.lock().users.remove(&irc_to_lower(nick))
    }

    fn members_of(&self, channel_key: &str) -> Vec<Arc<User>> {
        let users: Vec<Arc<User>> = self.registry.lock().users.values().cloned().collect();
        users
            .into_iter()
            .filter(|user| user.is_in(channel_key))
            .collect()
    }

    /// Strip membership sigils such as `@` and `+` from a NAMES token.
    fn strip_nick_sigils<'a>(&self, token: &'a str) -> &'a str {
        self.connection.with_features(|features| {
            let symbols = features.prefix_symbols();
            let token = token.trim_start_matches(|c: char| symbols.contains(c) || c == '@' || c == '+');
            // userhost-in-names sends full masks
            token.split('!').next().unwrap_or(token)
        })
    }

    /// Strip membership sigils from a WHOIS channel token.
    fn strip_channel_sigils<'a>(&self, token: &'a str) -> &'a str {
        self.connection
            .with_features(|features| features.membership_channel(token))
    }

    /// The channel a PRIVMSG target addresses, including STATUSMSG targets
    /// such as `@#chan`.
    fn message_channel<'a>(&self, target: &'a str) -> Option<&'a str> {
        self.connection
            .with_features(|features| features.message_channel(target))
    }
}
