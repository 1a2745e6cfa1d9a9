//! The numeric replies this crate acts on.
//!
//! Only the registration, NAMES, WHOIS and error numerics that drive channel
//! and user tracking are modelled; everything else is passed through as a
//! plain [`Message`](crate::Message).
//!
//! # Reference
//! - RFC 2812 Section 5: Replies

#![allow(non_camel_case_types)]

/// IRC server numeric reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    /// 001 - Welcome; the first parameter is our accepted nick
    RPL_WELCOME = 1,
    /// 005 - Server supported features
    RPL_ISUPPORT = 5,
    /// 311 - WHOIS user: nick, ident, host, real name
    RPL_WHOISUSER = 311,
    /// 318 - End of WHOIS
    RPL_ENDOFWHOIS = 318,
    /// 319 - WHOIS channels
    RPL_WHOISCHANNELS = 319,
    /// 353 - NAMES reply
    RPL_NAMREPLY = 353,
    /// 366 - End of NAMES
    RPL_ENDOFNAMES = 366,
    /// 376 - End of MOTD
    RPL_ENDOFMOTD = 376,
    /// 401 - No such nick/channel
    ERR_NOSUCHNICK = 401,
    /// 403 - No such channel
    ERR_NOSUCHCHANNEL = 403,
    /// 404 - Cannot send to channel
    ERR_CANNOTSENDTOCHAN = 404,
    /// 405 - Too many channels
    ERR_TOOMANYCHANNELS = 405,
    /// 407 - Too many targets
    ERR_TOOMANYTARGETS = 407,
    /// 422 - MOTD file is missing
    ERR_NOMOTD = 422,
    /// 433 - Nickname is already in use
    ERR_NICKNAMEINUSE = 433,
    /// 437 - Nick/channel is temporarily unavailable
    ERR_UNAVAILRESOURCE = 437,
    /// 471 - Channel is full
    ERR_CHANNELISFULL = 471,
    /// 473 - Invite only channel
    ERR_INVITEONLYCHAN = 473,
    /// 474 - Banned from channel
    ERR_BANNEDFROMCHAN = 474,
    /// 475 - Bad channel key
    ERR_BADCHANNELKEY = 475,
    /// 476 - Bad channel mask
    ERR_BADCHANMASK = 476,
}

impl Response {
    /// Numeric errors that name a channel or nick in their second parameter
    /// and are surfaced as domain errors.
    pub const TARGET_ERRORS: [Response; 11] = [
        Response::ERR_NOSUCHNICK,
        Response::ERR_NOSUCHCHANNEL,
        Response::ERR_CANNOTSENDTOCHAN,
        Response::ERR_TOOMANYCHANNELS,
        Response::ERR_TOOMANYTARGETS,
        Response::ERR_UNAVAILRESOURCE,
        Response::ERR_CHANNELISFULL,
        Response::ERR_INVITEONLYCHAN,
        Response::ERR_BANNEDFROMCHAN,
        Response::ERR_BADCHANNELKEY,
        Response::ERR_BADCHANMASK,
    ];

    /// The numeric value.
    #[inline]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Map a numeric to a modelled reply.
    pub fn from_code(code: u16) -> Option<Response> {
        use Response::*;
        Some(match code {
            1 => RPL_WELCOME,
            5 => RPL_ISUPPORT,
            311 => RPL_WHOISUSER,
            318 => RPL_ENDOFWHOIS,
            319 => RPL_WHOISCHANNELS,
            353 => RPL_NAMREPLY,
            366 => RPL_ENDOFNAMES,
            376 => RPL_ENDOFMOTD,
            401 => ERR_NOSUCHNICK,
            403 => ERR_NOSUCHCHANNEL,
            404 => ERR_CANNOTSENDTOCHAN,
            405 => ERR_TOOMANYCHANNELS,
            407 => ERR_TOOMANYTARGETS,
            422 => ERR_NOMOTD,
            433 => ERR_NICKNAMEINUSE,
            437 => ERR_UNAVAILRESOURCE,
            471 => ERR_CHANNELISFULL,
            473 => ERR_INVITEONLYCHAN,
            474 => ERR_BANNEDFROMCHAN,
            475 => ERR_BADCHANNELKEY,
            476 => ERR_BADCHANMASK,
            _ => return None,
        })
    }

    /// Whether this is a 4xx/5xx error reply.
    #[inline]
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.code())
    }

    /// Whether this error is one of [`Response::TARGET_ERRORS`].
    pub fn is_target_error(&self) -> bool {
        Self::TARGET_ERRORS.contains(self)
    }

    /// The command string as it appears on the wire, e.g. `"005"`.
    ///
    /// Also the event name the connection dispatches this reply under.
    pub fn command(&self) -> String {
        format!("{:03}", self.code())
    }
}
