//! Built-in message handling for [`Connection`](super::Connection).
//!
//! `track` runs for every message before dispatch and keeps the session
//! bookkeeping current. The defaults run only when nobody registered a
//! handler for the command.

use std::sync::atomic::Ordering;

use tracing::{debug, info, warn};

use super::{ConnectError, ConnectionState, Shared};
use crate::message::Message;
use crate::response::Response;

impl Shared {
    pub(super) fn track(&self, message: &Message) {
        match message.numeric().and_then(Response::from_code) {
            Some(Response::RPL_WELCOME) => {
                if let Some(nick) = message.param(0) {
                    *self.current_nick.write() = nick.to_owned();
                }
            }
            Some(Response::RPL_ENDOFMOTD | Response::ERR_NOMOTD) => {
                if *self.state.borrow() == ConnectionState::Handshaking {
                    self.finish_handshake(Ok(()));
                }
            }
            _ => {}
        }

        if message.command == "NICK" {
            let Some(new) = message.last_param() else {
                return;
            };
            let mut current = self.current_nick.write();
            if message
                .source_nickname()
                .is_some_and(|old| crate::casemap::irc_eq(old, &current))
            {
                debug!(old = %*current, new = %new, "own nick changed");
                *current = new.to_owned();
            }
        }
    }

    /// Returns `false` when the command has no default behaviour.
    pub(super) fn default_handler(&self, message: &Message) -> bool {
        match message.command.as_str() {
            "PING" => self.on_ping(message),
            "ERROR" => self.on_error(message),
            _ => match message.numeric().and_then(Response::from_code) {
                Some(Response::ERR_NICKNAMEINUSE) => self.on_nick_in_use(),
                Some(Response::RPL_ISUPPORT) => {
                    self.features.write().absorb(message.params.as_slice());
                }
                _ => return false,
            },
        }
        true
    }

    /// The token goes back as a trailing parameter so spaces survive.
    fn on_ping(&self, message: &Message) {
        let token = message.last_param().unwrap_or_default();
        if self.send(format!("PONG :{token}")).is_err() {
            debug!("PONG dropped, connection closing");
        }
    }

    /// One retry with an underscore appended, then give up.
    fn on_nick_in_use(&self) {
        let fallback = format!("{}_", self.nick);

        if !self.nick_retried.swap(true, Ordering::SeqCst) {
            info!(nick = %self.nick, fallback = %fallback, "nickname in use, retrying");
            *self.current_nick.write() = fallback.clone();
            if self.send(format!("NICK {fallback}")).is_err() {
                debug!("NICK retry dropped, connection closing");
            }
            return;
        }

        warn!(nick = %fallback, "fallback nickname in use too");
        if self.handshake_pending() {
            self.finish_handshake(Err(ConnectError::NicknameInUse(fallback)));
            self.shutdown.notify_one();
        }
    }

    fn on_error(&self, message: &Message) {
        let text = message.last_param().unwrap_or("closing link").to_owned();
        warn!(reason = %text, "server sent ERROR");
        self.finish_handshake(Err(ConnectError::Server(text)));
        self.shutdown.notify_one();
    }
}
