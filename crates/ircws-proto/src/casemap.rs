//! Case folding for registry keys.
//!
//! Channel and nick lookups are case-insensitive. Servers advertise
//! `CASEMAPPING=rfc1459` by default, under which `[]\~` are the uppercase
//! forms of `{}|^`, so the fold covers those four characters on top of ASCII.

/// Fold one character under the rfc1459 mapping.
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        'A'..='Z' => c.to_ascii_lowercase(),
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        _ => c,
    }
}

/// Fold a nick or channel name into its registry key.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Case-insensitive comparison under the rfc1459 mapping.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .chars()
            .zip(b.chars())
            .all(|(x, y)| irc_lower_char(x) == irc_lower_char(y))
}
