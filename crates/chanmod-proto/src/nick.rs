//! Nickname validation.
//!
//! Servers disagree on the exact nickname grammar. Moderation targets are
//! validated against the permissive charset accepted by ircd-seven/solanum
//! style networks: letters, digits and `-[]{}\`|_^\\`, at most
//! [`DEFAULT_NICK_MAX_LEN`] characters. Leading digits are tolerated because
//! the check exists to tell nicks apart from masks, not to police the server.

/// Default maximum nickname length.
pub const DEFAULT_NICK_MAX_LEN: usize = 30;

/// Extension trait for checking whether a string looks like a nickname.
pub trait NickExt {
    /// Check against the default length limit.
    ///
    /// ```
    /// use chanmod_proto::NickExt;
    ///
    /// assert!("alice".is_valid_nick());
    /// assert!("[away]`".is_valid_nick());
    /// assert!(!"*!*@host".is_valid_nick());
    /// assert!(!"".is_valid_nick());
    /// ```
    fn is_valid_nick(&self) -> bool;

    /// Check against a server-advertised `NICKLEN`.
    fn is_valid_nick_len(&self, max_len: usize) -> bool;
}

#[inline]
fn is_nick_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '-' | '[' | ']' | '{' | '}' | '`' | '|' | '_' | '^' | '\\')
}

impl NickExt for str {
    fn is_valid_nick(&self) -> bool {
        self.is_valid_nick_len(DEFAULT_NICK_MAX_LEN)
    }

    fn is_valid_nick_len(&self, max_len: usize) -> bool {
        !self.is_empty() && self.chars().count() <= max_len && self.chars().all(is_nick_char)
    }
}

impl NickExt for String {
    fn is_valid_nick(&self) -> bool {
        self.as_str().is_valid_nick()
    }

    fn is_valid_nick_len(&self, max_len: usize) -> bool {
        self.as_str().is_valid_nick_len(max_len)
    }
}
