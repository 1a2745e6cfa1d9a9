//! Domain events published by the client, channels and users.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::{Channel, User, UserInfo};

/// What a numeric error reply referred to.
#[derive(Clone, Debug)]
pub enum Target {
    /// A tracked channel.
    Channel(Arc<Channel>),
    /// A known user.
    User(Arc<User>),
}

impl Target {
    /// Channel name or nick.
    pub fn name(&self) -> String {
        match self {
            Target::Channel(channel) => channel.name().to_owned(),
            Target::User(user) => user.nick(),
        }
    }
}

/// A numeric error reply, resolved against the registry.
///
/// Published as an event; client commands never return it.
#[derive(Clone, Debug, Error)]
#[error("{code} {}: {message}", target_name(.target))]
pub struct ClientError {
    /// The numeric, e.g. 401.
    pub code: u16,
    /// The channel or user named by the reply, when tracked.
    pub target: Option<Target>,
    /// Human-readable text from the server.
    pub message: String,
}

fn target_name(target: &Option<Target>) -> String {
    target.as_ref().map_or_else(|| "*".to_owned(), Target::name)
}

/// Events on [`Client`](super::Client).
#[derive(Clone, Debug)]
pub enum ClientEvent {
    /// `quit`: a user left the network.
    Quit {
        /// Who quit. No longer in the registry.
        user: Arc<User>,
        /// Quit message, if any.
        message: Option<String>,
    },
    /// `error`: a numeric error reply.
    Error(ClientError),
}

impl ClientEvent {
    /// Event name this is published under.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Quit { .. } => "quit",
            ClientEvent::Error(_) => "error",
        }
    }
}

/// Events on a [`Channel`].
#[derive(Clone, Debug)]
pub enum ChannelEvent {
    /// `join`: someone joined.
    Join {
        /// Who joined.
        user: Arc<User>,
    },
    /// `part`: someone left.
    Part {
        /// Who left.
        user: Arc<User>,
        /// Part message, if any.
        message: Option<String>,
    },
    /// `message`: a PRIVMSG to the channel.
    Message {
        /// Sender.
        user: Arc<User>,
        /// Message text.
        text: String,
    },
    /// `ready`: the NAMES listing finished and the member list is complete.
    Ready,
}

impl ChannelEvent {
    /// Event name this is published under.
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::Join { .. } => "join",
            ChannelEvent::Part { .. } => "part",
            ChannelEvent::Message { .. } => "message",
            ChannelEvent::Ready => "ready",
        }
    }
}

/// Events on a [`User`].
#[derive(Clone, Debug)]
pub enum UserEvent {
    /// `message`: a private message from this user.
    Message {
        /// Message text.
        text: String,
    },
    /// `whois`: WHOIS finished; carries what was learned.
    Whois(UserInfo),
    /// `nick`: the user changed nick.
    Nick {
        /// Previous nick.
        old: String,
        /// New nick.
        new: String,
    },
    /// `error`: a numeric error naming this user.
    Error(ClientError),
}

impl UserEvent {
    /// Event name this is published under.
    pub fn name(&self) -> &'static str {
        match self {
            UserEvent::Message { .. } => "message",
            UserEvent::Whois(_) => "whois",
            UserEvent::Nick { .. } => "nick",
            UserEvent::Error(_) => "error",
        }
    }
}

impl fmt::Display for ChannelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelEvent::Join { user } => write!(f, "{} joined", user.nick()),
            ChannelEvent::Part { user, .. } => write!(f, "{} left", user.nick()),
            ChannelEvent::Message { user, text } => write!(f, "<{}> {}", user.nick(), text),
            ChannelEvent::Ready => f.write_str("names complete"),
        }
    }
}
