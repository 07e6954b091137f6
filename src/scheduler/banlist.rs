//! Per-channel ban and quiet list collection.
//!
//! `MODE #chan +bq` makes the server stream 367 entries, a 368, then 728
//! entries and a 729. Collection for a channel runs from the request until
//! that final 729. A collection whose 729 never comes is treated as stale
//! once it is older than the action timeout, and the next request starts over.

use chanmod_proto::irc_to_lower;
use std::collections::HashMap;
use std::time::Duration;

use super::action::ListMode;

/// One entry of a ban or quiet list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub mask: String,
    pub set_by: Option<String>,
    /// Unix timestamp.
    pub set_at: Option<i64>,
}

impl ListEntry {
    pub fn new(mask: impl Into<String>) -> Self {
        Self {
            mask: mask.into(),
            set_by: None,
            set_at: None,
        }
    }

    pub fn set_by(mut self, setter: impl Into<String>, at: Option<i64>) -> Self {
        self.set_by = Some(setter.into());
        self.set_at = at;
        self
    }
}

#[derive(Debug, Default)]
struct ChannelLists {
    bans: Vec<ListEntry>,
    quiets: Vec<ListEntry>,
}

#[derive(Debug, Default)]
pub struct BanListCollector {
    /// Channel to the time its request went out.
    collecting: HashMap<String, Duration>,
    lists: HashMap<String, ChannelLists>,
}

impl BanListCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget what was collected for `channel` and start over.
    pub fn start(&mut self, channel: &str, now: Duration) {
        let key = irc_to_lower(channel);
        self.lists.insert(key.clone(), ChannelLists::default());
        self.collecting.insert(key, now);
    }

    /// Append an entry. Returns `false` if `channel` is not being collected.
    pub fn record(&mut self, channel: &str, mode: ListMode, entry: ListEntry) -> bool {
        let key = irc_to_lower(channel);
        if !self.collecting.contains_key(&key) {
            return false;
        }
        let lists = self.lists.entry(key).or_default();
        match mode {
            ListMode::Ban => lists.bans.push(entry),
            ListMode::Quiet => lists.quiets.push(entry),
        }
        true
    }

    /// Stop collecting. Returns whether `channel` was being collected.
    pub fn end(&mut self, channel: &str) -> bool {
        self.collecting.remove(&irc_to_lower(channel)).is_some()
    }

    pub fn is_collecting(&self, channel: &str) -> bool {
        self.collecting.contains_key(&irc_to_lower(channel))
    }

    /// Whether a collection for `channel` has been running longer than `max_age`.
    pub fn is_stale(&self, channel: &str, now: Duration, max_age: Duration) -> bool {
        self.collecting
            .get(&irc_to_lower(channel))
            .is_some_and(|&started| now.saturating_sub(started) > max_age)
    }

    pub fn bans(&self, channel: &str) -> &[ListEntry] {
        self.lists
            .get(&irc_to_lower(channel))
            .map(|l| l.bans.as_slice())
            .unwrap_or_default()
    }

    pub fn quiets(&self, channel: &str) -> &[ListEntry] {
        self.lists
            .get(&irc_to_lower(channel))
            .map(|l| l.quiets.as_slice())
            .unwrap_or_default()
    }
}
