//! Channel name utilities.

/// Extension trait for checking if a string is an IRC channel name.
pub trait ChannelExt {
    /// Check if this string is a channel name.
    ///
    /// Channel names start with `#`, `&`, `+`, `!` or `~` (the latter is
    /// used by some networks for forward targets), are at most 50 characters
    /// and contain no space, comma, BEL or other control characters.
    fn is_channel_name(&self) -> bool;
}

impl ChannelExt for str {
    fn is_channel_name(&self) -> bool {
        let mut chars = self.chars();
        if !matches!(chars.next(), Some('#' | '&' | '+' | '!' | '~')) {
            return false;
        }
        if self.chars().count() > 50 {
            return false;
        }
        chars.all(|c| c != ' ' && c != ',' && !c.is_control())
    }
}

impl ChannelExt for String {
    fn is_channel_name(&self) -> bool {
        self.as_str().is_channel_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes() {
        assert!("#rust".is_channel_name());
        assert!("##offtopic".is_channel_name());
        assert!("~overflow".is_channel_name());
        assert!(!"rust".is_channel_name());
        assert!(!"".is_channel_name());
    }

    #[test]
    fn forbidden_characters() {
        assert!(!"#a b".is_channel_name());
        assert!(!"#a,b".is_channel_name());
        assert!(!"#bell\x07".is_channel_name());
        assert!(!format!("#{}", "x".repeat(50)).is_channel_name());
    }
}
