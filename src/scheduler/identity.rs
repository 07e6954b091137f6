//! Short-lived WHOIS cache.
//!
//! Entries are keyed by casemapped nick and trusted for a fixed TTL. The cache
//! also tracks which lookups are outstanding so that several actions against
//! the same nick cost a single WHOIS.

use chanmod_proto::irc_to_lower;
use std::collections::HashMap;
use std::time::Duration;

/// What a WHOIS (or WHOWAS) told us about a nick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub nick: String,
    pub ident: String,
    pub host: String,
    pub realname: String,
    /// Filled in by a later 330, if the user is logged in.
    pub account: Option<String>,
    pub fetched_at: Duration,
}

/// Result of [`IdentityCache::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Fresh(Identity),
    /// No usable entry. `request` tells the caller to issue a lookup; the
    /// cache has already marked it in flight.
    Missing { request: bool },
}

#[derive(Debug)]
pub struct IdentityCache {
    ttl: Duration,
    entries: HashMap<String, Identity>,
    in_flight: HashMap<String, Duration>,
}

impl IdentityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
            in_flight: HashMap::new(),
        }
    }

    pub fn lookup(&mut self, nick: &str, now: Duration, allow_request: bool) -> Lookup {
        let key = irc_to_lower(nick);

        if let Some(started) = self.in_flight.get(&key)
            && now.saturating_sub(*started) > self.ttl
        {
            self.in_flight.remove(&key);
        }
        let in_flight = self.in_flight.contains_key(&key);

        if let Some(entry) = self.entries.get(&key) {
            if now.saturating_sub(entry.fetched_at) > self.ttl {
                tracing::trace!(nick = %nick, "Dropping stale identity");
                self.entries.remove(&key);
            } else if !in_flight {
                return Lookup::Fresh(entry.clone());
            }
        }

        let request = allow_request && !in_flight;
        if request {
            self.in_flight.insert(key, now);
        }
        Lookup::Missing { request }
    }

    pub fn store(&mut self, nick: &str, ident: &str, host: &str, realname: &str, now: Duration) {
        self.entries.insert(
            irc_to_lower(nick),
            Identity {
                nick: nick.to_owned(),
                ident: ident.to_owned(),
                host: host.to_owned(),
                realname: realname.to_owned(),
                account: None,
                fetched_at: now,
            },
        );
    }

    /// Attach an account to an existing entry. Returns whether one existed.
    pub fn store_account(&mut self, nick: &str, account: &str) -> bool {
        match self.entries.get_mut(&irc_to_lower(nick)) {
            Some(entry) => {
                entry.account = Some(account.to_owned());
                true
            }
            None => false,
        }
    }

    pub fn finish_request(&mut self, nick: &str) {
        self.in_flight.remove(&irc_to_lower(nick));
    }

    pub fn is_in_flight(&self, nick: &str) -> bool {
        self.in_flight.contains_key(&irc_to_lower(nick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(10);

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn fresh_entry_is_reused_without_request() {
        let mut cache = IdentityCache::new(TTL);
        cache.store("Alice", "~al", "host.example", "Alice", secs(0));
        match cache.lookup("alice", secs(10), true) {
            Lookup::Fresh(id) => assert_eq!(id.host, "host.example"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn stale_entry_is_purged_and_requested_once() {
        let mut cache = IdentityCache::new(TTL);
        cache.store("alice", "~al", "host.example", "Alice", secs(0));

        assert_eq!(cache.lookup("alice", secs(11), true), Lookup::Missing { request: true });
        assert!(cache.entries.is_empty());
        assert_eq!(cache.lookup("alice", secs(11), true), Lookup::Missing { request: false });
    }

    #[test]
    fn passive_lookup_never_requests() {
        let mut cache = IdentityCache::new(TTL);
        assert_eq!(cache.lookup("bob", secs(0), false), Lookup::Missing { request: false });
        assert!(!cache.is_in_flight("bob"));
    }

    #[test]
    fn entry_is_withheld_until_the_listing_ends() {
        let mut cache = IdentityCache::new(TTL);
        assert_eq!(cache.lookup("bob", secs(0), true), Lookup::Missing { request: true });
        cache.store("bob", "b", "h", "Bob", secs(1));
        assert_eq!(cache.lookup("bob", secs(1), false), Lookup::Missing { request: false });

        assert!(cache.store_account("BOB", "bobby"));
        cache.finish_request("bob");
        match cache.lookup("bob", secs(1), false) {
            Lookup::Fresh(id) => assert_eq!(id.account.as_deref(), Some("bobby")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn lost_request_expires() {
        let mut cache = IdentityCache::new(TTL);
        assert_eq!(cache.lookup("bob", secs(0), true), Lookup::Missing { request: true });
        assert_eq!(cache.lookup("bob", secs(5), true), Lookup::Missing { request: false });
        assert_eq!(cache.lookup("bob", secs(11), true), Lookup::Missing { request: true });
    }

    #[test]
    fn account_for_unknown_nick_is_dropped() {
        let mut cache = IdentityCache::new(TTL);
        assert!(!cache.store_account("ghost", "ghost"));
    }
}
