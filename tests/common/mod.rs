//! Integration test common infrastructure.
//!
//! A [`Harness`] wires a [`Scheduler`] to a recording connection with a real
//! [`Roster`], so tests can replay raw server lines and moderator input and
//! assert on the lines that would have gone out.

use chanmod::client::Roster;
use chanmod::clock::ManualClock;
use chanmod::connection::{Connection, DisplayLine, Member};
use chanmod::router::{self, Dispatch};
use chanmod::scheduler::{Handled, Scheduler, Settings};
use chanmod_proto::{Command, Message};
use std::sync::Arc;
use std::time::Duration;

pub struct RecordingConnection {
    pub nick: String,
    pub roster: Roster,
    pub sent: Vec<String>,
    pub shown: Vec<DisplayLine>,
}

impl Connection for RecordingConnection {
    fn send(&mut self, command: Command) {
        self.sent.push(command.to_string());
    }

    fn nick(&self) -> &str {
        &self.nick
    }

    fn members(&self, channel: &str) -> Vec<Member> {
        self.roster.members(channel)
    }

    fn display(&mut self, line: DisplayLine) {
        self.shown.push(line);
    }
}

pub struct Harness {
    pub scheduler: Scheduler<RecordingConnection>,
    pub clock: ManualClock,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(nick: &str) -> Self {
        Self::with_settings(nick, Settings::default())
    }

    pub fn with_settings(nick: &str, settings: Settings) -> Self {
        let conn = RecordingConnection {
            nick: nick.to_string(),
            roster: Roster::new(),
            sent: Vec::new(),
            shown: Vec::new(),
        };
        let clock = ManualClock::new();
        let scheduler = Scheduler::new(conn, Arc::new(clock.clone()), settings);
        Self { scheduler, clock }
    }

    /// Replay one server line the way the client does: roster first, then router.
    pub fn feed(&mut self, line: &str) -> Dispatch {
        let msg: Message = line.parse().expect("test line should parse");
        let conn = self.scheduler.connection_mut();
        let me = conn.nick.clone();
        conn.roster.observe(&me, &msg);
        router::dispatch(&mut self.scheduler, &msg)
    }

    pub fn feed_all(&mut self, lines: &[&str]) {
        for line in lines {
            self.feed(line);
        }
    }

    /// Moderator input for `channel`.
    pub fn type_line(&mut self, channel: &str, line: &str) -> Handled {
        self.scheduler.submit(channel, line)
    }

    /// Outbound lines since the last call.
    pub fn take_sent(&mut self) -> Vec<String> {
        std::mem::take(&mut self.scheduler.connection_mut().sent)
    }

    pub fn shown(&self) -> Vec<String> {
        self.scheduler
            .connection()
            .shown
            .iter()
            .map(|l| l.text.clone())
            .collect()
    }

    /// Let time pass and run the housekeeping tick.
    pub fn advance(&mut self, secs: u64) {
        self.clock.advance(Duration::from_secs(secs));
        self.scheduler.tick();
    }

    /// Join `channel` with the given NAMES list.
    pub fn join(&mut self, channel: &str, names: &str) {
        let me = self.scheduler.connection().nick.clone();
        self.feed(&format!(":{me}!u@h JOIN {channel}"));
        self.feed(&format!(":irc.example.net 353 {me} = {channel} :{names}"));
        self.feed(&format!(":irc.example.net 366 {me} {channel} :End of /NAMES list."));
    }

    /// The WHOIS reply block a server sends for a user.
    pub fn whois_reply(&mut self, nick: &str, ident: &str, host: &str, account: Option<&str>) {
        let me = self.scheduler.connection().nick.clone();
        self.feed(&format!(":irc.example.net 311 {me} {nick} {ident} {host} * :{nick} realname"));
        if let Some(account) = account {
            self.feed(&format!(":irc.example.net 330 {me} {nick} {account} :is logged in as"));
        }
        self.feed(&format!(":irc.example.net 318 {me} {nick} :End of /WHOIS list."));
    }
}
