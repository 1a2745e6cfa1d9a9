use std::collections::BTreeSet;
use std::fmt;
use std::sync::Weak;

use parking_lot::RwLock;

use super::{ClientInner, UserEvent};
use crate::casemap::irc_to_lower;
use crate::event::{EventBus, Observable};

/// What is known about a user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserInfo {
    /// Nickname as last seen on the wire.
    pub nick: String,
    /// Username, from a prefix or WHOIS.
    pub ident: Option<String>,
    /// Hostname, from a prefix or WHOIS.
    pub host: Option<String>,
    /// Real name, from WHOIS.
    pub real_name: Option<String>,
    /// Folded names of the channels the user is known to be in.
    pub channels: BTreeSet<String>,
}

/// A user in the client's registry.
///
/// Records are created on first reference and dropped on QUIT, when the
/// server reports the nick no longer exists, or when a PART leaves the user
/// in no channel we track. A `User` held past its eviction
/// stays readable but is no longer updated.
pub struct User {
    info: RwLock<UserInfo>,
    events: EventBus<UserEvent>,
    client: Weak<ClientInner>,
}

impl User {
    pub(crate) fn new(nick: &str, client: Weak<ClientInner>) -> Self {
        Self {
            info: RwLock::new(UserInfo {
                nick: nick.to_owned(),
                ..UserInfo::default()
            }),
            events: EventBus::new(),
            client,
        }
    }

    /// A record not attached to any client; used for users that were never
    /// tracked.
    pub(crate) fn detached(nick: &str) -> Self {
        Self::new(nick, Weak::new())
    }

    /// Current nickname.
    pub fn nick(&self) -> String {
        self.info.read().nick.clone()
    }

    /// Snapshot of everything known about the user.
    pub fn info(&self) -> UserInfo {
        self.info.read().clone()
    }

    /// Whether the user is known to be in `channel`.
    pub fn is_in(&self, channel: &str) -> bool {
        self.info.read().channels.contains(&irc_to_lower(channel))
    }

    /// Request WHOIS; the `whois` event fires when it completes.
    pub fn whois(&self) {
        let nick = self.nick();
        if let Some(client) = self.client.upgrade() {
            client.send(format!("WHOIS {nick}"));
        }
    }

    /// Send a private message.
    pub fn message(&self, text: &str) {
        let nick = self.nick();
        if let Some(client) = self.client.upgrade() {
            client.send(format!("PRIVMSG {nick} :{text}"));
        }
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut UserInfo)) {
        f(&mut self.info.write());
    }

    pub(crate) fn emit(&self, event: UserEvent) {
        self.events.emit(event.name(), &event);
    }
}

impl Observable for User {
    type Event = UserEvent;

    fn events(&self) -> &EventBus<UserEvent> {
        &self.events
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User").field("info", &*self.info.read()).finish()
    }
}
