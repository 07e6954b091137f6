//! Message source (prefix) types.

use std::fmt;

/// The origin of a message: a server, or a user's `nick!user@host`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// Server name (e.g. `irc.libera.chat`).
    ServerName(String),
    /// User source: (nickname, username, hostname). Missing parts are empty.
    Nickname(String, String, String),
}

impl Prefix {
    /// Parse a prefix leniently.
    ///
    /// A bare word containing a dot and neither `!` nor `@` is a server name;
    /// anything else is split on the first `!` and the first following `@`.
    pub fn parse(s: &str) -> Self {
        if !s.contains(['!', '@']) && s.contains('.') {
            return Prefix::ServerName(s.to_owned());
        }

        let (nick, rest) = match s.find(['!', '@']) {
            Some(i) => (&s[..i], &s[i..]),
            None => (s, ""),
        };
        let (user, host) = match rest.strip_prefix('!') {
            Some(after) => match after.split_once('@') {
                Some((u, h)) => (u, h),
                None => (after, ""),
            },
            None => ("", rest.strip_prefix('@').unwrap_or("")),
        };

        Prefix::Nickname(nick.to_owned(), user.to_owned(), host.to_owned())
    }

    /// Create a user prefix.
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Prefix::Nickname(nick.into(), user.into(), host.into())
    }

    /// The nickname, for user prefixes.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// The username, for user prefixes that carry one.
    pub fn user(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, user, _) if !user.is_empty() => Some(user),
            _ => None,
        }
    }

    /// The hostname, or the server name.
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::ServerName(name) => Some(name),
            Prefix::Nickname(_, _, host) if !host.is_empty() => Some(host),
            _ => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{}", user)?;
                }
                if !host.is_empty() {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}
