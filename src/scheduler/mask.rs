//! Ban and quiet mask matching.
//!
//! Masks arrive from the server exactly as stored in the channel lists:
//! plain `nick!ident@host` wildcards, `$a:`/`$r:` extbans, any of them with
//! a `$#channel` forward suffix.

use regex::Regex;

use super::action::ResolvedTarget;

/// IRC glob (`*`, `?`) compiled to an anchored, case-insensitive regex.
#[derive(Debug, Clone)]
pub struct WildcardPattern(Regex);

impl WildcardPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut re = String::with_capacity(pattern.len() + 8);
        re.push_str("(?i)^");
        for c in pattern.chars() {
            match c {
                '*' => re.push_str(".*"),
                '?' => re.push('.'),
                _ => re.push_str(&regex::escape(&c.to_string())),
            }
        }
        re.push('$');
        Regex::new(&re).map(Self)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

/// A compiled list entry.
#[derive(Debug, Clone)]
pub enum Mask {
    /// `$a:pattern`; a bare `$a` matches anyone logged in.
    Account(Option<WildcardPattern>),
    /// `$r:pattern`
    Realname(WildcardPattern),
    /// `nick!ident@host`
    Hostmask(WildcardPattern),
    /// Any other extban; never matches a resolved identity.
    Extban,
}

impl Mask {
    pub fn compile(entry: &str) -> Result<Self, regex::Error> {
        let entry = match entry.find("$#") {
            Some(idx) => &entry[..idx],
            None => entry,
        };

        if entry == "$a" {
            return Ok(Self::Account(None));
        }
        if let Some(pattern) = entry.strip_prefix("$a:") {
            return Ok(Self::Account(Some(WildcardPattern::new(pattern)?)));
        }
        if let Some(pattern) = entry.strip_prefix("$r:") {
            return Ok(Self::Realname(WildcardPattern::new(pattern)?));
        }
        if entry.starts_with('$') {
            return Ok(Self::Extban);
        }
        Ok(Self::Hostmask(WildcardPattern::new(entry)?))
    }

    pub fn matches(&self, target: &ResolvedTarget) -> bool {
        match self {
            Self::Account(None) => target.account.is_some(),
            Self::Account(Some(p)) => target.account.as_deref().is_some_and(|a| p.is_match(a)),
            Self::Realname(p) => target.realname.as_deref().is_some_and(|r| p.is_match(r)),
            Self::Hostmask(p) => target.hostmask().is_some_and(|h| p.is_match(&h)),
            Self::Extban => false,
        }
    }
}
