//! IRC message type and parsing.

mod parser;

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;
use crate::prefix::Prefix;

use self::parser::ParsedLine;

/// One parsed IRC line.
///
/// `command` is uppercased so handlers can compare it directly; numerics are
/// kept as their three digits. The trailing parameter, if any, is the last
/// element of `params` with its leading `:` removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Sender, without the leading `:`.
    pub prefix: Option<String>,
    /// Command keyword or numeric.
    pub command: String,
    /// Parameters in wire order.
    pub params: Vec<String>,
}

impl Message {
    /// Build an outgoing message with no prefix.
    pub fn new<I, S>(command: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: None,
            command: command.to_ascii_uppercase(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Parameter `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Final parameter, if any.
    pub fn last_param(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// The numeric reply code, when the command is one.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Parsed form of the prefix.
    pub fn source(&self) -> Option<Prefix> {
        self.prefix.as_deref().map(Prefix::parse)
    }

    /// Nickname of the sender, when the prefix names a user.
    pub fn source_nickname(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        let end = prefix.find(['!', '@']).unwrap_or(prefix.len());
        let nick = &prefix[..end];
        if nick.is_empty() || (end == prefix.len() && nick.contains('.')) {
            None
        } else {
            Some(nick)
        }
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = ParsedLine::parse(s).map_err(|cause| ProtocolError::InvalidMessage {
            string: s.trim_end_matches(['\r', '\n']).to_owned(),
            cause,
        })?;

        Ok(Message {
            prefix: parsed.prefix.map(str::to_owned),
            command: parsed.command.to_ascii_uppercase(),
            params: parsed.params.iter().map(|p| (*p).to_owned()).collect(),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;

        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                write!(f, " {param}")?;
            }
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{last}")?;
            } else {
                write!(f, " {last}")?;
            }
        }
        Ok(())
    }
}
