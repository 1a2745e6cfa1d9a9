//! Connection handlers that maintain the client registry.
//!
//! Registry locks are always released before an event is emitted, so
//! listeners may call back into the client.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::{ChannelEvent, ClientError, ClientEvent, ClientInner, Target, User, UserEvent};
use crate::casemap::irc_to_lower;
use crate::event::Observable;
use crate::message::Message;
use crate::response::Response;

type Handler = fn(&Arc<ClientInner>, &Message);

pub(super) fn register(inner: &Arc<ClientInner>) {
    let table: [(&str, Handler); 10] = [
        ("JOIN", on_join),
        ("PART", on_part),
        ("PRIVMSG", on_privmsg),
        ("QUIT", on_quit),
        ("NICK", on_nick),
        ("353", on_names),
        ("366", on_end_of_names),
        ("311", on_whois_user),
        ("319", on_whois_channels),
        ("318", on_end_of_whois),
    ];
    for (command, handler) in table {
        attach(inner, command, handler);
    }
    for response in Response::TARGET_ERRORS {
        attach(inner, &response.command(), on_target_error);
    }
}

fn attach(inner: &Arc<ClientInner>, command: &str, handler: Handler) {
    let weak = Arc::downgrade(inner);
    inner.connection.on(command, move |message| {
        if let Some(inner) = weak.upgrade() {
            handler(&inner, message);
        }
    });
}

fn on_join(inner: &Arc<ClientInner>, message: &Message) {
    let (Some(nick), Some(name)) = (message.source_nickname(), message.param(0)) else {
        return;
    };
    let channel = match inner.find_channel(name) {
        Some(channel) => channel,
        // A join we did not ask for, e.g. forced by services.
        None if inner.connection.is_me(nick) => inner.channel_entry(name, None).0,
        None => {
            debug!(channel = %name, nick = %nick, "JOIN for untracked channel");
            return;
        }
    };
    let key = irc_to_lower(name);
    let source = message.source();

    let user = inner.user_entry(nick);
    user.update(|info| {
        if let Some(ident) = source.as_ref().and_then(|p| p.ident()) {
            info.ident = Some(ident.to_owned());
        }
        if let Some(host) = source.as_ref().and_then(|p| p.host()) {
            info.host = Some(host.to_owned());
        }
        info.channels.insert(key);
    });
    channel.emit(ChannelEvent::Join { user });
}

fn on_part(inner: &Arc<ClientInner>, message: &Message) {
    let (Some(nick), Some(name)) = (message.source_nickname(), message.param(0)) else {
        return;
    };
    let key = irc_to_lower(name);
    let reason = message.param(1).map(str::to_owned);

    let user = inner
        .find_user(nick)
        .unwrap_or_else(|| Arc::new(User::detached(nick)));
    user.update(|info| {
        info.channels.remove(&key);
    });

    let channel = if inner.connection.is_me(nick) {
        inner.drop_channel(&key)
    } else {
        inner.prune(std::slice::from_ref(&user));
        inner.find_channel(name)
    };
    if let Some(channel) = channel {
        channel.emit(ChannelEvent::Part {
            user,
            message: reason,
        });
    }
}

fn on_privmsg(inner: &Arc<ClientInner>, message: &Message) {
    let (Some(nick), Some(target), Some(text)) = (
        message.source_nickname(),
        message.param(0),
        message.param(1),
    ) else {
        return;
    };
    let text = text.to_owned();

    let Some(name) = inner.message_channel(target) else {
        inner.user_entry(nick).emit(UserEvent::Message { text });
        return;
    };
    match inner.find_channel(name) {
        Some(channel) => {
            let user = inner.user_entry(nick);
            channel.emit(ChannelEvent::Message { user, text });
        }
        None => debug!(channel = %target, "PRIVMSG for untracked channel"),
    }
}

fn on_quit(inner: &Arc<ClientInner>, message: &Message) {
    let Some(nick) = message.source_nickname() else {
        return;
    };
    let user = inner
        .remove_user(nick)
        .unwrap_or_else(|| Arc::new(User::detached(nick)));
    inner.emit(ClientEvent::Quit {
        user,
        message: message.param(0).map(str::to_owned),
    });
}

fn on_nick(inner: &Arc<ClientInner>, message: &Message) {
    let (Some(old), Some(new)) = (message.source_nickname(), message.last_param()) else {
        return;
    };

    let user = {
        let mut registry = inner.registry.lock();
        let Some(user) = registry.users.remove(&irc_to_lower(old)) else {
            return;
        };
        registry.users.insert(irc_to_lower(new), Arc::clone(&user));
        user
    };
    user.update(|info| info.nick = new.to_owned());
    user.emit(UserEvent::Nick {
        old: old.to_owned(),
        new: new.to_owned(),
    });
}

/// `:server 353 me = #chan :@alice +bob carol`
fn on_names(inner: &Arc<ClientInner>, message: &Message) {
    let [.., name, names] = message.params.as_slice() else {
        return;
    };
    let key = irc_to_lower(name);

    for token in names.split_whitespace() {
        let nick = inner.strip_nick_sigils(token);
        if nick.is_empty() {
            continue;
        }
        inner.user_entry(nick).update(|info| {
            info.channels.insert(key.clone());
        });
    }
}

/// `:server 366 me #chan :End of /NAMES list.`
fn on_end_of_names(inner: &Arc<ClientInner>, message: &Message) {
    let Some(channel) = message.param(1).and_then(|name| inner.find_channel(name)) else {
        return;
    };
    channel.mark_joined();
    channel.emit(ChannelEvent::Ready);
}

/// `:server 311 me nick ident host * :real name`
fn on_whois_user(inner: &Arc<ClientInner>, message: &Message) {
    let Some(nick) = message.param(1) else {
        return;
    };
    let ident = message.param(2).map(str::to_owned);
    let host = message.param(3).map(str::to_owned);
    let real_name = message.param(5).map(str::to_owned);

    inner.user_entry(nick).update(|info| {
        info.ident = ident;
        info.host = host;
        info.real_name = real_name;
    });
}

/// `:server 319 me nick :@#ops +#rust #lobby`
fn on_whois_channels(inner: &Arc<ClientInner>, message: &Message) {
    let (Some(nick), Some(list)) = (message.param(1), message.param(2)) else {
        return;
    };
    let channels: BTreeSet<String> = list
        .split_whitespace()
        .map(|token| irc_to_lower(inner.strip_channel_sigils(token)))
        .filter(|name| !name.is_empty())
        .collect();

    // Long lists arrive over several 319s, so this only adds.
    inner.user_entry(nick).update(|info| info.channels.extend(channels));
}

/// `:server 318 me nick :End of /WHOIS list.`
fn on_end_of_whois(inner: &Arc<ClientInner>, message: &Message) {
    let Some(user) = message.param(1).and_then(|nick| inner.find_user(nick)) else {
        return;
    };
    user.emit(UserEvent::Whois(user.info()));
}

/// `:server 474 me #chan :Cannot join channel (+b)`
fn on_target_error(inner: &Arc<ClientInner>, message: &Message) {
    let Some(code) = message.numeric() else {
        return;
    };
    let name = message.param(1).unwrap_or_default();
    let target = inner
        .find_channel(name)
        .map(Target::Channel)
        .or_else(|| inner.find_user(name).map(Target::User));

    let error = ClientError {
        code,
        target: target.clone(),
        message: message.last_param().unwrap_or_default().to_owned(),
    };
    debug!(code, target = %name, "numeric error");

    if code == Response::ERR_NOSUCHNICK.code() {
        if let Some(Target::User(user)) = &target {
            user.emit(UserEvent::Error(error.clone()));
            inner.remove_user(name);
        }
    }
    inner.emit(ClientEvent::Error(error));
}
