//! ISUPPORT (RPL_ISUPPORT / 005) feature map.
//!
//! Servers advertise their capabilities as `KEY=value` or bare `KEY` tokens
//! spread over one or more 005 replies. [`Features`] accumulates them for the
//! lifetime of a connection; it only ever grows.
//!
//! # Reference
//! - Modern IRC documentation: <https://modern.ircdocs.horse/isupport.html>

use std::collections::HashMap;

/// Value of one advertised feature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeatureValue {
    /// Token without `=`.
    Flag,
    /// Token with `=`; the text after the first `=` (possibly empty).
    Value(String),
}

impl FeatureValue {
    /// String value, or `None` for flags.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Flag => None,
            FeatureValue::Value(v) => Some(v),
        }
    }
}

/// Accumulated server features, keyed by the token name as sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Features {
    entries: HashMap<String, FeatureValue>,
}

impl Features {
    /// Empty feature map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the tokens of one 005 reply.
    ///
    /// `params` are the reply's parameters: the first (our nick) is skipped,
    /// as is a final human-readable trailer such as `are supported by this
    /// server`. Negated `-KEY` tokens are ignored so the map never shrinks.
    pub fn absorb<S: AsRef<str>>(&mut self, params: &[S]) {
        let mut tokens: &[S] = params.get(1..).unwrap_or_default();
        if let Some((last, head)) = tokens.split_last() {
            if last.as_ref().contains(' ') {
                tokens = head;
            }
        }

        for token in tokens {
            let token = token.as_ref();
            if token.is_empty() || token.starts_with('-') {
                continue;
            }
            match token.split_once('=') {
                Some((key, value)) => {
                    self.entries
                        .insert(key.to_owned(), FeatureValue::Value(value.to_owned()));
                }
                None => {
                    self.entries.insert(token.to_owned(), FeatureValue::Flag);
                }
            }
        }
    }

    /// Look up a feature.
    pub fn get(&self, key: &str) -> Option<&FeatureValue> {
        self.entries.get(key)
    }

    /// The value of a `KEY=value` feature.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FeatureValue::as_str)
    }

    /// Whether the server advertised `key` in either form.
    pub fn is_supported(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of advertised features.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been advertised yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all features.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Channel name prefixes, `#&` when not advertised.
    pub fn chantypes(&self) -> &str {
        self.value("CHANTYPES").unwrap_or("#&")
    }

    /// Membership prefix symbols from `PREFIX=(modes)symbols`, `@+` when not
    /// advertised.
    pub fn prefix_symbols(&self) -> &str {
        self.value("PREFIX")
            .and_then(|value| match value.split_once(')') {
                Some((_, symbols)) => Some(symbols),
                None if !value.starts_with('(') => Some(value),
                None => None,
            })
            .filter(|s| !s.is_empty())
            .unwrap_or("@+")
    }

    /// Whether `name` starts with one of the advertised channel types.
    pub fn is_channel_name(&self, name: &str) -> bool {
        name.chars()
            .next()
            .is_some_and(|c| self.chantypes().contains(c))
    }

    /// Symbols that may precede a channel in a PRIVMSG/NOTICE target, from
    /// `STATUSMSG`; the membership prefix symbols when not advertised.
    pub fn statusmsg(&self) -> &str {
        self.value("STATUSMSG")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.prefix_symbols())
    }

    /// The channel a message target addresses, with any STATUSMSG prefix
    /// removed: `@#chan` gives `#chan`. `None` for nicks.
    pub fn message_channel<'a>(&self, target: &'a str) -> Option<&'a str> {
        let name = self.strip_before_channel(target, self.statusmsg());
        self.is_channel_name(name).then_some(name)
    }

    /// The bare channel of a membership-prefixed token such as `@#ops` from
    /// WHOIS.
    pub fn membership_channel<'a>(&self, token: &'a str) -> &'a str {
        self.strip_before_channel(token, self.prefix_symbols())
    }

    /// Drop the longest run of leading `symbols` that still leaves a channel
    /// name. A symbol doubling as a channel type is kept when nothing but a
    /// nick would remain: `&#chan` gives `#chan`, `&chan` stays.
    fn strip_before_channel<'a>(&self, name: &'a str, symbols: &str) -> &'a str {
        let mut start = None;
        for (i, c) in name.char_indices() {
            if self.is_channel_name(&name[i..]) {
                start = Some(i);
            }
            if !symbols.contains(c) {
                break;
            }
        }
        start.map_or(name, |i| &name[i..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_and_values() {
        let mut features = Features::new();
        features.absorb(&["me", "CHANTYPES=#", "EXCEPTS", "PREFIX=(ov)@+", "are supported by this server"]);

        assert_eq!(features.value("CHANTYPES"), Some("#"));
        assert_eq!(features.get("EXCEPTS"), Some(&FeatureValue::Flag));
        assert_eq!(features.value("PREFIX"), Some("(ov)@+"));
        assert!(!features.is_supported("are supported by this server"));
        assert_eq!(features.len(), 3);
    }

    #[test]
    fn accumulates_across_replies() {
        let mut features = Features::new();
        features.absorb(&["me", "NETWORK=Example"]);
        features.absorb(&["me", "NICKLEN=30", "-NETWORK"]);

        assert_eq!(features.value("NETWORK"), Some("Example"));
        assert_eq!(features.value("NICKLEN"), Some("30"));
    }

    #[test]
    fn value_may_contain_equals() {
        let mut features = Features::new();
        features.absorb(&["me", "EXTBAN=~,qjncrRa", "CLIENTTAGDENY=*,-draft/react=x"]);
        assert_eq!(features.value("CLIENTTAGDENY"), Some("*,-draft/react=x"));
    }

    #[test]
    fn prefix_and_chantypes_defaults() {
        let mut features = Features::new();
        assert_eq!(features.prefix_symbols(), "@+");
        assert!(features.is_channel_name("&local"));

        features.absorb(&["me", "PREFIX=(qaohv)~&@%+", "CHANTYPES=#"]);
        assert_eq!(features.prefix_symbols(), "~&@%+");
        assert!(!features.is_channel_name("&local"));
        assert!(features.is_channel_name("#rust"));
    }

    #[test]
    fn statusmsg_targets_resolve_to_channel() {
        let mut features = Features::new();
        assert_eq!(features.message_channel("@#chan"), Some("#chan"));
        assert_eq!(features.message_channel("#chan"), Some("#chan"));
        assert_eq!(features.message_channel("&local"), Some("&local"));
        assert_eq!(features.message_channel("alice"), None);
        assert_eq!(features.message_channel("@alice"), None);

        features.absorb(&["me", "PREFIX=(qaohv)~&@%+", "STATUSMSG=~&@%+", "CHANTYPES=#&"]);
        assert_eq!(features.statusmsg(), "~&@%+");
        assert_eq!(features.message_channel("%#chan"), Some("#chan"));
        assert_eq!(features.message_channel("&#chan"), Some("#chan"));
        assert_eq!(features.message_channel("@&local"), Some("&local"));
        assert_eq!(features.message_channel("&local"), Some("&local"));
    }

    #[test]
    fn membership_prefix_that_is_also_a_chantype() {
        let mut features = Features::new();
        features.absorb(&["me", "PREFIX=(qaohv)~&@%+", "CHANTYPES=#&"]);

        assert_eq!(features.membership_channel("&#ops"), "#ops");
        assert_eq!(features.membership_channel("~@#ops"), "#ops");
        assert_eq!(features.membership_channel("&local"), "&local");
        assert_eq!(features.membership_channel("@&local"), "&local");
        assert_eq!(features.membership_channel("#plain"), "#plain");
    }
}
