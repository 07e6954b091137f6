//! The pending action queue.
//!
//! A moderation action rarely runs the moment it is typed. A ban needs
//! operator status, which ChanServ grants a round-trip later, and the
//! target's ident and host, which a WHOIS returns another round-trip later.
//! An unban additionally needs the channel's current ban and quiet lists.
//! The [`Scheduler`] holds every admitted action until all of that has
//! arrived, runs it exactly once, then hands operator status back and
//! optionally arms a timed reversal.
//!
//! Nothing here blocks. Requests are fire-and-forget through the
//! [`Connection`], replies come back as `notify_*` calls from the router,
//! and every notification ends in a [`sweep`](Scheduler::sweep) that runs
//! whatever became ready, in admission order.

pub mod action;
pub mod banlist;
pub mod identity;
pub mod mask;


use chanmod_proto::{Command, irc_eq};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::commands::{self, CommandContext};
use crate::config::{Config, KickCommand};
use crate::connection::{Connection, DisplayLine};
use crate::metrics;
use crate::telemetry::spans;

pub use action::{
    Action, ActionId, ActionKind, BanPolicy, Dimensions, Invitee, ListChange, ListMode,
    MaskTarget, Pending, PrivilegeChange, ResolvedTarget, Target,
};
pub use banlist::{BanListCollector, ListEntry};
pub use identity::{Identity, IdentityCache, Lookup};
pub use mask::{Mask, WildcardPattern};

/// Scheduler policy, usually derived from [`Config`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub chanserv: String,
    pub gateway_marker: String,
    pub kick_command: KickCommand,
    pub default_reason: String,
    pub action_timeout: Duration,
    pub identity_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chanserv: "ChanServ".to_string(),
            gateway_marker: "gateway/".to_string(),
            kick_command: KickCommand::Remove,
            default_reason: "Goodbye".to_string(),
            action_timeout: Duration::from_secs(10),
            identity_ttl: Duration::from_secs(10),
        }
    }
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            chanserv: config.services.chanserv.clone(),
            gateway_marker: config.services.gateway_marker.clone(),
            kick_command: config.services.kick_command,
            default_reason: config.services.default_reason.clone(),
            action_timeout: config.timeouts.action(),
            identity_ttl: config.timeouts.identity_ttl(),
        }
    }
}

/// Whether [`Scheduler::submit`] took the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Admitted, or rejected with an error already shown.
    Consumed,
    /// Not a moderation command.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Abandon {
    Timeout,
    NotFound,
}

impl Abandon {
    fn label(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::NotFound => "not_found",
        }
    }
}

/// A reversal waiting for its delay to elapse.
#[derive(Debug, Clone)]
pub struct Reversal {
    /// The action whose changes this undoes.
    pub source: ActionId,
    pub due: Duration,
    pub action: Action,
}

pub struct Scheduler<C> {
    conn: C,
    clock: Arc<dyn Clock>,
    settings: Settings,
    queue: Vec<Pending>,
    cache: IdentityCache,
    collector: BanListCollector,
    reversals: Vec<Reversal>,
    next_id: ActionId,
}

impl<C: Connection> Scheduler<C> {
    pub fn new(conn: C, clock: Arc<dyn Clock>, settings: Settings) -> Self {
        Self {
            conn,
            clock,
            cache: IdentityCache::new(settings.identity_ttl),
            settings,
            queue: Vec::new(),
            collector: BanListCollector::new(),
            reversals: Vec::new(),
            next_id: 1,
        }
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Queued actions, in admission order.
    pub fn pending(&self) -> &[Pending] {
        &self.queue
    }

    pub fn reversals(&self) -> &[Reversal] {
        &self.reversals
    }

    pub fn collector(&self) -> &BanListCollector {
        &self.collector
    }

    /// Whether replies about `nick` answer one of our own lookups.
    pub fn is_awaiting(&self, nick: &str) -> bool {
        self.cache.is_in_flight(nick)
            || self
                .queue
                .iter()
                .any(|p| p.awaited_nick().is_some_and(|n| irc_eq(n, nick)))
    }

    /// Parse a moderator command line for `channel` and admit the result.
    ///
    /// Validation errors are shown to the user and still count as handled.
    pub fn submit(&mut self, channel: &str, line: &str) -> Handled {
        let members = self.conn.members(channel);
        let me = self.conn.nick().to_owned();
        let ctx = CommandContext {
            channel,
            me: &me,
            members: &members,
            default_reason: &self.settings.default_reason,
        };

        match commands::parse(&ctx, line) {
            Ok(Some(action)) => {
                self.admit(action);
                Handled::Consumed
            }
            Ok(None) => Handled::Ignored,
            Err(e) => {
                debug!(channel = %channel, error = %e, "Rejected moderator command");
                metrics::record_command_error(e.error_code());
                self.conn.display(DisplayLine::error(e.to_string()));
                Handled::Consumed
            }
        }
    }

    /// Queue an action, request whatever it is missing, then sweep.
    pub fn admit(&mut self, action: Action) -> ActionId {
        let id = self.next_id;
        self.next_id += 1;
        let kind = action.kind.name();
        let _span = spans::action(id, kind, &action.channel).entered();

        let opped = self.holds_privilege(&action.channel);
        let mut pending = Pending {
            id,
            admitted_at: self.clock.now(),
            resolved: None,
            has_privilege: opped,
            relinquish: action.relinquish && !opped,
            whowas_requested: false,
            action,
        };

        if pending.awaits_privilege() {
            let channel = &pending.action.channel;
            let requested = self
                .queue
                .iter()
                .any(|p| irc_eq(&p.action.channel, channel) && p.awaits_privilege());
            if !requested {
                self.services(format!("OP {}", channel));
            }
        }

        match pending.action.kind.target() {
            Some(Target::Mask(mask)) => pending.resolved = Some(ResolvedTarget::from_mask(mask)),
            Some(Target::Nick(nick)) => {
                let nick = nick.clone();
                pending.resolved = self.resolve_nick(&nick, true);
            }
            None => {}
        }

        if pending.action.kind.needs_ban_list() {
            let channel = pending.action.channel.clone();
            let now = pending.admitted_at;
            let stale = self
                .collector
                .is_stale(&channel, now, self.settings.action_timeout);
            if stale {
                debug!(channel = %channel, "Ban lists never completed, requesting again");
            }
            if stale || !self.collector.is_collecting(&channel) {
                self.collector.start(&channel, now);
                self.conn
                    .send(Command::MODE(channel, vec!["+bq".to_string()]));
            }
        }

        debug!(
            privileged = pending.has_privilege,
            resolved = pending.resolved.is_some(),
            "Admitted action"
        );
        metrics::record_action_admitted(kind);
        self.queue.push(pending);
        self.sweep();
        id
    }

    /// Run every ready action and drop every expired one, in admission order.
    pub fn sweep(&mut self) {
        let now = self.clock.now();
        let mut i = 0;
        while i < self.queue.len() {
            if let Some(nick) = self.queue[i].awaited_nick().map(str::to_owned) {
                self.queue[i].resolved = self.resolve_nick(&nick, false);
            }

            if now.saturating_sub(self.queue[i].admitted_at) > self.settings.action_timeout {
                let pending = self.queue.remove(i);
                self.abandon(pending, Abandon::Timeout);
                continue;
            }

            if self.is_ready(&self.queue[i]) {
                let pending = self.queue.remove(i);
                self.execute(pending);
                continue;
            }
            i += 1;
        }
        metrics::set_pending_actions(self.queue.len());
    }

    /// Admit reversals that have come due, then sweep.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        let (mut due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.reversals)
            .into_iter()
            .partition(|r| r.due <= now);
        self.reversals = later;

        due.sort_by_key(|r| (r.due, r.source));
        for reversal in due {
            debug!(source = reversal.source, channel = %reversal.action.channel, "Reversal due");
            self.admit(reversal.action);
        }
        self.sweep();
    }

    /// We were opped in `channel`.
    pub fn notify_privilege_granted(&mut self, channel: &str) {
        for p in self.queue.iter_mut().filter(|p| irc_eq(&p.action.channel, channel)) {
            p.has_privilege = true;
        }
        self.sweep();
    }

    /// We were deopped in `channel`.
    pub fn notify_privilege_revoked(&mut self, channel: &str) {
        for p in self.queue.iter_mut().filter(|p| irc_eq(&p.action.channel, channel)) {
            p.has_privilege = false;
        }
    }

    /// Cache a 311/314 reply.
    pub fn store_identity(&mut self, nick: &str, ident: &str, host: &str, realname: &str) {
        let now = self.clock.now();
        self.cache.store(nick, ident, host, realname, now);
    }

    /// Cache a 330 reply.
    pub fn store_account(&mut self, nick: &str, account: &str) -> bool {
        self.cache.store_account(nick, account)
    }

    /// A WHOIS or WHOWAS listing for `nick` ended.
    pub fn notify_identity_resolved(&mut self, nick: &str) {
        self.cache.finish_request(nick);
        for i in 0..self.queue.len() {
            let waiting = self.queue[i].awaited_nick().is_some_and(|n| irc_eq(n, nick));
            if waiting {
                self.queue[i].resolved = self.resolve_nick(nick, false);
            }
        }
        self.sweep();
    }

    /// WHOIS found nobody; the user may have just left, so try WHOWAS once.
    pub fn notify_no_such_nick(&mut self, nick: &str) {
        let mut waiting = self
            .queue
            .iter_mut()
            .filter(|p| p.awaited_nick().is_some_and(|n| irc_eq(n, nick)))
            .peekable();
        if waiting.peek().is_none() {
            return;
        }

        let mut already = false;
        for p in waiting {
            already |= p.whowas_requested;
            p.whowas_requested = true;
        }
        if !already {
            self.conn.send(Command::WHOWAS(nick.to_owned()));
            metrics::record_identity_request("WHOWAS");
        }
    }

    /// WHOWAS found nobody either. Drop everything waiting on `nick`.
    pub fn notify_lookup_exhausted(&mut self, nick: &str) {
        self.cache.finish_request(nick);
        let (gone, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.queue)
            .into_iter()
            .partition(|p| p.awaited_nick().is_some_and(|n| irc_eq(n, nick)));
        self.queue = keep;

        if gone.is_empty() {
            return;
        }
        self.conn
            .display(DisplayLine::error(format!("{} could not be found", nick)));
        for pending in gone {
            self.abandon(pending, Abandon::NotFound);
        }
        metrics::set_pending_actions(self.queue.len());
    }

    /// Feed a 367/728 entry. Returns `false` if nobody asked for the list.
    pub fn record_list_entry(&mut self, channel: &str, mode: ListMode, entry: ListEntry) -> bool {
        self.collector.record(channel, mode, entry)
    }

    /// The 729 arrived. Returns whether a collection was running.
    pub fn end_ban_list(&mut self, channel: &str) -> bool {
        let was_collecting = self.collector.end(channel);
        if was_collecting {
            self.sweep();
        }
        was_collecting
    }

    /// Someone lifted `mask` from a list; a pending reversal need not.
    pub fn notify_list_entry_removed(&mut self, channel: &str, mode: ListMode, mask: &str) {
        let mut cancelled = 0;
        for reversal in self
            .reversals
            .iter_mut()
            .filter(|r| irc_eq(&r.action.channel, channel))
        {
            if let ActionKind::Revert { changes } = &mut reversal.action.kind {
                let before = changes.len();
                changes.retain(|c| !(c.mode == mode && irc_eq(&c.mask, mask)));
                cancelled += before - changes.len();
            }
        }
        self.reversals.retain(|r| match &r.action.kind {
            ActionKind::Revert { changes } => !changes.is_empty(),
            _ => true,
        });
        if cancelled > 0 {
            debug!(channel = %channel, mask = %mask, "Cancelled reversal of lifted entry");
        }
    }

    fn is_ready(&self, p: &Pending) -> bool {
        let resolved = !p.action.needs_resolution() || p.resolved.is_some();
        let lists = !p.action.kind.needs_ban_list() || !self.collector.is_collecting(&p.action.channel);
        resolved && lists && !p.awaits_privilege()
    }

    fn holds_privilege(&self, channel: &str) -> bool {
        let me = self.conn.nick();
        self.conn
            .members(channel)
            .iter()
            .any(|m| irc_eq(&m.nick, me) && m.is_op())
    }

    fn resolve_nick(&mut self, nick: &str, allow_request: bool) -> Option<ResolvedTarget> {
        match self.cache.lookup(nick, self.clock.now(), allow_request) {
            Lookup::Fresh(identity) => Some(ResolvedTarget {
                nick: Some(identity.nick),
                ident: Some(identity.ident),
                host: Some(identity.host),
                realname: Some(identity.realname),
                account: identity.account,
            }),
            Lookup::Missing { request: true } => {
                self.conn.send(Command::WHOIS(nick.to_owned()));
                metrics::record_identity_request("WHOIS");
                None
            }
            Lookup::Missing { request: false } => None,
        }
    }

    fn services(&mut self, text: String) {
        let chanserv = self.settings.chanserv.clone();
        self.conn.send(Command::PRIVMSG(chanserv, text));
    }

    fn kick(&mut self, channel: &str, nick: &str, reason: &str) {
        let (channel, nick, reason) = (channel.to_owned(), nick.to_owned(), Some(reason.to_owned()));
        self.conn.send(match self.settings.kick_command {
            KickCommand::Remove => Command::REMOVE(channel, nick, reason),
            KickCommand::Kick => Command::KICK(channel, nick, reason),
        });
    }

    fn matching(&self, channel: &str, mode: ListMode, target: &ResolvedTarget) -> Vec<ListEntry> {
        let entries = match mode {
            ListMode::Ban => self.collector.bans(channel),
            ListMode::Quiet => self.collector.quiets(channel),
        };
        entries
            .iter()
            .filter(|entry| match Mask::compile(&entry.mask) {
                Ok(mask) => mask.matches(target),
                Err(e) => {
                    warn!(mask = %entry.mask, error = %e, "Unusable list entry");
                    false
                }
            })
            .cloned()
            .collect()
    }

    fn execute(&mut self, pending: Pending) {
        let _span = spans::action(pending.id, pending.action.kind.name(), &pending.action.channel).entered();
        let channel = pending.action.channel.clone();
        let resolved = pending.resolved.clone().unwrap_or_default();
        let mut applied = Vec::new();

        match &pending.action.kind {
            ActionKind::Privilege { change, nick } => {
                self.services(format!("{} {} {}", change.verb(), channel, nick));
            }
            ActionKind::Topic { text } => {
                self.services(format!("TOPIC {} {}", channel, text));
            }
            ActionKind::ModeChange { modes } => {
                let args = modes.split_whitespace().map(str::to_owned).collect();
                self.conn.send(Command::MODE(channel.clone(), args));
            }
            ActionKind::Invite(Invitee::Nick(nick)) => {
                self.conn.send(Command::INVITE(nick.clone(), channel.clone()));
            }
            ActionKind::Invite(Invitee::Channel(other)) => {
                self.services(format!("INVITE {}", other));
            }
            ActionKind::Kick { nick, reason } => self.kick(&channel, nick, reason),
            ActionKind::Ban {
                target,
                policy,
                kick,
            } => {
                if let Some(reason) = kick
                    && let Some(nick) = resolved.nick.as_deref().or(target.nick())
                {
                    self.kick(&channel, nick, reason);
                }
                if policy.dimensions.account && resolved.account.is_none() {
                    self.conn.display(DisplayLine::text(format!(
                        "{} is not logged in, skipping account ban",
                        target
                    )));
                }
                for mask in policy.masks(target, &resolved, &self.settings.gateway_marker) {
                    let change = ListChange::new(policy.mode, mask);
                    self.conn.send(change.apply(&channel));
                    applied.push(change);
                }
            }
            ActionKind::Unban { .. } => {
                for mode in [ListMode::Ban, ListMode::Quiet] {
                    for entry in self.matching(&channel, mode, &resolved) {
                        self.conn.send(ListChange::new(mode, entry.mask).undo(&channel));
                    }
                }
            }
            ActionKind::ShowBans { .. } => {
                self.conn
                    .display(DisplayLine::text(format!("Bans matching {}", resolved)));
                for mode in [ListMode::Ban, ListMode::Quiet] {
                    for entry in self.matching(&channel, mode, &resolved) {
                        let mut line = describe_entry(&entry);
                        if mode == ListMode::Quiet {
                            line.push_str(" (quiet)");
                        }
                        self.conn.display(DisplayLine::text(line));
                    }
                }
            }
            ActionKind::Revert { changes } => {
                for change in changes {
                    self.conn.send(change.undo(&channel));
                }
            }
        }

        info!(requester = %pending.action.requester, "Executed action");
        metrics::record_action_executed(pending.action.kind.name());
        self.cleanup(pending, applied);
    }

    fn abandon(&mut self, pending: Pending, reason: Abandon) {
        debug!(
            action = pending.id,
            kind = pending.action.kind.name(),
            channel = %pending.action.channel,
            reason = reason.label(),
            "Abandoning action"
        );
        metrics::record_action_abandoned(reason.label());
        self.release_privilege(&pending);
    }

    fn cleanup(&mut self, pending: Pending, applied: Vec<ListChange>) {
        let relinquish = self.release_privilege(&pending);

        if let Some(delay) = pending.action.revert_after
            && !applied.is_empty()
        {
            let mut action = Action::new(
                pending.action.channel.clone(),
                pending.action.requester.clone(),
                ActionKind::Revert { changes: applied },
            );
            action.relinquish = relinquish;
            let due = self.clock.now() + delay;
            debug!(action = pending.id, delay_secs = delay.as_secs(), "Scheduled reversal");
            self.reversals.push(Reversal {
                source: pending.id,
                due,
                action,
            });
        }
    }

    /// Deop if this action was the last one on its channel that needed op.
    /// Returns whether op was (or would have been) handed back.
    fn release_privilege(&mut self, pending: &Pending) -> bool {
        if !(pending.has_privilege && pending.action.requires_privilege) {
            return pending.relinquish;
        }
        let channel = &pending.action.channel;
        let still_needed = self.queue.iter().any(|p| {
            irc_eq(&p.action.channel, channel) && (p.action.requires_privilege || !p.relinquish)
        });
        let relinquish = pending.relinquish && !still_needed;
        if relinquish {
            self.services(format!("DEOP {}", channel));
        }
        relinquish
    }
}

fn describe_entry(entry: &ListEntry) -> String {
    let when = entry
        .set_at
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    match (&entry.set_by, when) {
        (Some(by), Some(when)) => format!("{} (set by {} on {})", entry.mask, by, when),
        (Some(by), None) => format!("{} (set by {})", entry.mask, by),
        _ => entry.mask.clone(),
    }
}
