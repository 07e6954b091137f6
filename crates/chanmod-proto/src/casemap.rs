//! RFC 1459 casemapping.
//!
//! Nicknames and channel names compare case-insensitively on IRC, and the
//! `rfc1459` mapping also folds `[]\~` onto `{}|^`. Every map keyed by a nick
//! or channel in this workspace is keyed by [`irc_to_lower`].

/// Fold a single character under `rfc1459`.
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        'A'..='Z' => (c as u8 + 32) as char,
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        _ => c,
    }
}

/// Fold a whole string under `rfc1459`.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Case-insensitive comparison under `rfc1459`.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .chars()
            .zip(b.chars())
            .all(|(x, y)| irc_lower_char(x) == irc_lower_char(y))
}
