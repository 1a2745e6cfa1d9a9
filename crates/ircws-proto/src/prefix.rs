//! Message origin.

use std::fmt;

/// Where a message came from: a server, or a user's `nick!ident@host` mask.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// A server name such as `irc.example.net`.
    Server(String),
    /// A user mask. Ident and host are absent when the server omits them.
    User {
        /// Nickname.
        nick: String,
        /// Username reported by the server, after `!`.
        ident: Option<String>,
        /// Hostname, after `@`.
        host: Option<String>,
    },
}

impl Prefix {
    /// Parse a prefix without its leading `:`.
    ///
    /// Lenient: any string yields a prefix. A bare token containing a dot is
    /// taken to be a server name.
    pub fn parse(s: &str) -> Self {
        let (front, host) = match s.split_once('@') {
            Some((front, host)) => (front, Some(host)),
            None => (s, None),
        };
        let (nick, ident) = match front.split_once('!') {
            Some((nick, ident)) => (nick, Some(ident)),
            None => (front, None),
        };

        if ident.is_none() && host.is_none() && nick.contains('.') {
            return Prefix::Server(nick.to_owned());
        }

        Prefix::User {
            nick: nick.to_owned(),
            ident: ident.filter(|i| !i.is_empty()).map(str::to_owned),
            host: host.filter(|h| !h.is_empty()).map(str::to_owned),
        }
    }

    /// The nickname, for user prefixes.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::User { nick, .. } if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// The ident, for user prefixes that carry one.
    pub fn ident(&self) -> Option<&str> {
        match self {
            Prefix::User { ident, .. } => ident.as_deref(),
            Prefix::Server(_) => None,
        }
    }

    /// The host: the server name itself, or the user's host.
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::Server(name) => Some(name),
            Prefix::User { host, .. } => host.as_deref(),
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => f.write_str(name),
            Prefix::User { nick, ident, host } => {
                f.write_str(nick)?;
                if let Some(ident) = ident {
                    write!(f, "!{ident}")?;
                }
                if let Some(host) = host {
                    write!(f, "@{host}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_user_mask() {
        let prefix = Prefix::parse("alice!~al@example.org");
        assert_eq!(prefix.nick(), Some("alice"));
        assert_eq!(prefix.ident(), Some("~al"));
        assert_eq!(prefix.host(), Some("example.org"));
        assert_eq!(prefix.to_string(), "alice!~al@example.org");
    }

    #[test]
    fn server_name() {
        let prefix = Prefix::parse("irc.example.net");
        assert_eq!(prefix, Prefix::Server("irc.example.net".into()));
        assert_eq!(prefix.nick(), None);
    }

    #[test]
    fn nick_only() {
        let prefix = Prefix::parse("bob");
        assert_eq!(prefix.nick(), Some("bob"));
        assert_eq!(prefix.host(), None);
    }
}
