//! Channel membership as seen from our side of the connection.

use chanmod_proto::{ChannelMode, Command, Message, Mode, Response, irc_eq, irc_to_lower};
use std::collections::HashMap;

use crate::connection::Member;

/// Membership prefixes, highest first.
const PREFIXES: &str = "~&@%+";

fn prefix_char(mode: ChannelMode) -> Option<char> {
    match mode {
        ChannelMode::Oper => Some('@'),
        ChannelMode::Halfop => Some('%'),
        ChannelMode::Voice => Some('+'),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct Roster {
    /// Keyed by casemapped channel name.
    channels: HashMap<String, Vec<Member>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(&self, channel: &str) -> Vec<Member> {
        self.channels
            .get(&irc_to_lower(channel))
            .cloned()
            .unwrap_or_default()
    }

    /// Update from one server line. `me` is our current nick.
    pub fn observe(&mut self, me: &str, msg: &Message) {
        let source = msg.source_nickname();
        match &msg.command {
            Command::Response(Response::RPL_NAMREPLY, args) => {
                // <me> <type> <channel> :<prefixed nicks>
                if let (Some(channel), Some(names)) = (args.get(2), args.get(3)) {
                    self.names(channel, names);
                }
            }
            Command::JOIN(channels, _) => {
                if let Some(nick) = source {
                    for channel in channels.split(',') {
                        self.join(me, channel, nick);
                    }
                }
            }
            Command::PART(channels, _) => {
                if let Some(nick) = source {
                    for channel in channels.split(',') {
                        self.leave(me, channel, nick);
                    }
                }
            }
            Command::KICK(channel, nick, _) | Command::REMOVE(channel, nick, _) => {
                self.leave(me, channel, nick)
            }
            Command::QUIT(_) => {
                if let Some(nick) = source {
                    self.quit(nick);
                }
            }
            Command::NICK(new) => {
                if let Some(old) = source {
                    self.rename(old, new);
                }
            }
            Command::MODE(target, args) => {
                let pieces: Vec<&str> = args.iter().map(String::as_str).collect();
                if let Ok(modes) = Mode::parse_channel(&pieces) {
                    self.modes(target, &modes);
                }
            }
            _ => {}
        }
    }

    fn entry(&mut self, channel: &str) -> &mut Vec<Member> {
        self.channels.entry(irc_to_lower(channel)).or_default()
    }

    fn names(&mut self, channel: &str, names: &str) {
        let members = self.entry(channel);
        for token in names.split_whitespace() {
            let nick = token.trim_start_matches(|c| PREFIXES.contains(c));
            let prefix = &token[..token.len() - nick.len()];
            members.retain(|m| !irc_eq(&m.nick, nick));
            members.push(Member::new(nick, prefix));
        }
    }

    fn join(&mut self, me: &str, channel: &str, nick: &str) {
        if irc_eq(nick, me) {
            self.channels.insert(irc_to_lower(channel), Vec::new());
        }
        let members = self.entry(channel);
        if !members.iter().any(|m| irc_eq(&m.nick, nick)) {
            members.push(Member::new(nick, ""));
        }
    }

    fn leave(&mut self, me: &str, channel: &str, nick: &str) {
        if irc_eq(nick, me) {
            self.channels.remove(&irc_to_lower(channel));
        } else if let Some(members) = self.channels.get_mut(&irc_to_lower(channel)) {
            members.retain(|m| !irc_eq(&m.nick, nick));
        }
    }

    fn quit(&mut self, nick: &str) {
        for members in self.channels.values_mut() {
            members.retain(|m| !irc_eq(&m.nick, nick));
        }
    }

    fn rename(&mut self, old: &str, new: &str) {
        for member in self.channels.values_mut().flatten() {
            if irc_eq(&member.nick, old) {
                member.nick = new.to_owned();
            }
        }
    }

    fn modes(&mut self, channel: &str, modes: &[Mode]) {
        let Some(members) = self.channels.get_mut(&irc_to_lower(channel)) else {
            return;
        };
        for mode in modes {
            let (Some(c), Some(nick)) = (prefix_char(mode.mode()), mode.arg()) else {
                continue;
            };
            let Some(member) = members.iter_mut().find(|m| irc_eq(&m.nick, nick)) else {
                continue;
            };
            if mode.is_plus() {
                if !member.prefix.contains(c) {
                    member.prefix.push(c);
                }
            } else {
                member.prefix.retain(|p| p != c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(roster: &mut Roster, line: &str) {
        roster.observe("me", &line.parse().unwrap());
    }

    fn nicks(roster: &Roster, channel: &str) -> Vec<String> {
        roster.members(channel).into_iter().map(|m| m.nick).collect()
    }

    #[test]
    fn names_reply_keeps_prefixes() {
        let mut roster = Roster::new();
        feed(&mut roster, ":me!u@h JOIN #c");
        feed(&mut roster, ":srv 353 me = #c :@me +alice bob");
        let members = roster.members("#C");
        assert_eq!(members.len(), 3);
        assert!(members[0].is_op());
        assert_eq!(members[1], Member::new("alice", "+"));
        assert_eq!(members[2], Member::new("bob", ""));
    }

    #[test]
    fn joins_parts_kicks_and_quits() {
        let mut roster = Roster::new();
        feed(&mut roster, ":me!u@h JOIN #c");
        feed(&mut roster, ":alice!a@h JOIN #c");
        feed(&mut roster, ":bob!b@h JOIN #c");
        feed(&mut roster, ":carol!c@h JOIN #c");
        feed(&mut roster, ":alice!a@h PART #c :bye");
        feed(&mut roster, ":op!o@h KICK #c bob :spam");
        assert_eq!(nicks(&roster, "#c"), vec!["me", "carol"]);

        feed(&mut roster, ":carol!c@h QUIT :gone");
        assert_eq!(nicks(&roster, "#c"), vec!["me"]);
    }

    #[test]
    fn our_own_part_forgets_channel() {
        let mut roster = Roster::new();
        feed(&mut roster, ":me!u@h JOIN #c");
        feed(&mut roster, ":me!u@h PART #c");
        assert!(roster.channels.is_empty());
        assert!(roster.members("#c").is_empty());
    }

    #[test]
    fn nick_change_follows_member() {
        let mut roster = Roster::new();
        feed(&mut roster, ":srv 353 me = #c :me alice");
        feed(&mut roster, ":alice!a@h NICK alice_");
        assert_eq!(nicks(&roster, "#c"), vec!["me", "alice_"]);
    }

    #[test]
    fn op_and_voice_modes_update_prefixes() {
        let mut roster = Roster::new();
        feed(&mut roster, ":srv 353 me = #c :me alice");
        feed(&mut roster, ":ChanServ!s@services MODE #c +ov me alice");
        let members = roster.members("#c");
        assert!(members[0].is_op());
        assert_eq!(members[1].prefix, "+");

        feed(&mut roster, ":ChanServ!s@services MODE #c -o+b me *!*@x");
        assert!(!roster.members("#c")[0].is_op());
    }
}
