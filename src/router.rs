//! Routes server lines into the scheduler.
//!
//! Every inbound [`Message`] passes through [`dispatch`] after the roster has
//! seen it. Replies to our own lookups and list queries are consumed; anything
//! the user should see comes back as [`Dispatch::PassThrough`].

use chanmod_proto::{ChannelMode, Command, Message, Mode, Response, irc_eq};
use tracing::{debug, trace};

use crate::connection::{Connection, DisplayLine};
use crate::scheduler::{ListEntry, ListMode, Scheduler};

/// What the display layer should do with a line after routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handled here; do not echo.
    Consumed,
    /// Show it as usual.
    PassThrough,
}

impl Dispatch {
    fn from_bool(consumed: bool) -> Self {
        if consumed {
            Self::Consumed
        } else {
            Self::PassThrough
        }
    }
}

pub fn dispatch<C: Connection>(scheduler: &mut Scheduler<C>, msg: &Message) -> Dispatch {
    match &msg.command {
        Command::MODE(target, args) => {
            channel_mode(scheduler, target, args);
            Dispatch::PassThrough
        }
        Command::Response(response, args) => numeric(scheduler, *response, args),
        _ => Dispatch::PassThrough,
    }
}

fn arg(args: &[String], idx: usize) -> Option<&str> {
    args.get(idx).map(String::as_str)
}

fn numeric<C: Connection>(scheduler: &mut Scheduler<C>, response: Response, args: &[String]) -> Dispatch {
    match response {
        Response::RPL_WHOISUSER | Response::RPL_WHOWASUSER => {
            // <me> <nick> <user> <host> * :<realname>
            let (Some(nick), Some(ident), Some(host)) = (arg(args, 1), arg(args, 2), arg(args, 3))
            else {
                return Dispatch::PassThrough;
            };
            let realname = arg(args, 5).unwrap_or_default();
            let ours = scheduler.is_awaiting(nick);
            scheduler.store_identity(nick, ident, host, realname);
            Dispatch::from_bool(ours)
        }
        Response::RPL_WHOISACCOUNT => {
            let (Some(nick), Some(account)) = (arg(args, 1), arg(args, 2)) else {
                return Dispatch::PassThrough;
            };
            let ours = scheduler.is_awaiting(nick);
            scheduler.store_account(nick, account);
            Dispatch::from_bool(ours)
        }
        Response::RPL_ENDOFWHOIS | Response::RPL_ENDOFWHOWAS => {
            let Some(nick) = arg(args, 1) else {
                return Dispatch::PassThrough;
            };
            let ours = scheduler.is_awaiting(nick);
            scheduler.notify_identity_resolved(nick);
            Dispatch::from_bool(ours)
        }
        Response::ERR_NOSUCHNICK => {
            let Some(nick) = arg(args, 1) else {
                return Dispatch::PassThrough;
            };
            let ours = scheduler.is_awaiting(nick);
            scheduler.notify_no_such_nick(nick);
            Dispatch::from_bool(ours)
        }
        Response::ERR_WASNOSUCHNICK => {
            let Some(nick) = arg(args, 1) else {
                return Dispatch::PassThrough;
            };
            let ours = scheduler.is_awaiting(nick);
            scheduler.notify_lookup_exhausted(nick);
            Dispatch::from_bool(ours)
        }
        Response::RPL_BANLIST => {
            // <me> <channel> <mask> [<setter> <ts>]
            let (Some(channel), Some(mask)) = (arg(args, 1), arg(args, 2)) else {
                return Dispatch::PassThrough;
            };
            let entry = list_entry(mask, arg(args, 3), arg(args, 4));
            Dispatch::from_bool(scheduler.record_list_entry(channel, ListMode::Ban, entry))
        }
        Response::RPL_QUIETLIST => {
            // <me> <channel> q <mask> [<setter> <ts>]
            let (Some(channel), Some(mask)) = (arg(args, 1), arg(args, 3)) else {
                return Dispatch::PassThrough;
            };
            let entry = list_entry(mask, arg(args, 4), arg(args, 5));
            Dispatch::from_bool(scheduler.record_list_entry(channel, ListMode::Quiet, entry))
        }
        Response::RPL_ENDOFBANLIST => {
            let collecting = arg(args, 1).is_some_and(|c| scheduler.collector().is_collecting(c));
            Dispatch::from_bool(collecting)
        }
        Response::RPL_ENDOFQUIETLIST => match arg(args, 1) {
            Some(channel) => Dispatch::from_bool(scheduler.end_ban_list(channel)),
            None => Dispatch::PassThrough,
        },
        Response::ERR_CHANOPRIVSNEEDED => {
            let (Some(channel), Some(text)) = (arg(args, 1), args.last()) else {
                return Dispatch::PassThrough;
            };
            scheduler
                .connection_mut()
                .display(DisplayLine::error(format!("{} in {}", text, channel)));
            Dispatch::Consumed
        }
        other => {
            trace!(numeric = other.code(), "Not routed");
            Dispatch::PassThrough
        }
    }
}

fn list_entry(mask: &str, setter: Option<&str>, at: Option<&str>) -> ListEntry {
    let entry = ListEntry::new(mask);
    match setter {
        Some(setter) => entry.set_by(setter, at.and_then(|ts| ts.parse().ok())),
        None => entry,
    }
}

fn channel_mode<C: Connection>(scheduler: &mut Scheduler<C>, channel: &str, args: &[String]) {
    let pieces: Vec<&str> = args.iter().map(String::as_str).collect();
    let modes = match Mode::parse_channel(&pieces) {
        Ok(modes) => modes,
        Err(e) => {
            debug!(channel = %channel, error = %e, "Unparseable MODE");
            return;
        }
    };

    for mode in modes {
        let Some(arg) = mode.arg() else { continue };
        match (mode.mode(), mode.is_plus()) {
            (ChannelMode::Oper, plus) if irc_eq(arg, scheduler.connection().nick()) => {
                if plus {
                    scheduler.notify_privilege_granted(channel);
                } else {
                    scheduler.notify_privilege_revoked(channel);
                }
            }
            (ChannelMode::Ban, false) => {
                scheduler.notify_list_entry_removed(channel, ListMode::Ban, arg)
            }
            (ChannelMode::Quiet, false) => {
                scheduler.notify_list_entry_removed(channel, ListMode::Quiet, arg)
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::connection::Member;
    use crate::scheduler::Settings;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<String>,
        shown: Vec<DisplayLine>,
    }

    impl Connection for Recorder {
        fn send(&mut self, command: Command) {
            self.sent.push(command.to_string());
        }

        fn nick(&self) -> &str {
            "me"
        }

        fn members(&self, _channel: &str) -> Vec<Member> {
            vec![Member::new("me", "@"), Member::new("alice", "")]
        }

        fn display(&mut self, line: DisplayLine) {
            self.shown.push(line);
        }
    }

    fn scheduler() -> Scheduler<Recorder> {
        Scheduler::new(
            Recorder::default(),
            Arc::new(ManualClock::new()),
            Settings::default(),
        )
    }

    fn feed(s: &mut Scheduler<Recorder>, line: &str) -> Dispatch {
        dispatch(s, &line.parse().unwrap())
    }

    #[test]
    fn whois_reply_resolves_pending_ban() {
        let mut s = scheduler();
        s.submit("#c", "ban alice");
        assert_eq!(
            feed(&mut s, ":srv 311 me alice ~al host.example * :Alice L."),
            Dispatch::Consumed
        );
        feed(&mut s, ":srv 330 me alice alice_acct :is logged in as");
        assert_eq!(feed(&mut s, ":srv 318 me alice :End of /WHOIS list."), Dispatch::Consumed);
        assert_eq!(
            s.connection().sent,
            vec!["WHOIS alice", "MODE #c +b *!*@host.example"]
        );
    }

    #[test]
    fn unrelated_whois_passes_through() {
        let mut s = scheduler();
        assert_eq!(
            feed(&mut s, ":srv 311 me bob ~b b.example * :Bob"),
            Dispatch::PassThrough
        );
        assert_eq!(feed(&mut s, ":srv 318 me bob :End of /WHOIS list."), Dispatch::PassThrough);
    }

    #[test]
    fn ban_list_lines_are_consumed_only_while_collecting() {
        let mut s = scheduler();
        assert_eq!(feed(&mut s, ":srv 367 me #c *!*@x op 1700000000"), Dispatch::PassThrough);

        s.submit("#c", "unban *!*@x");
        assert_eq!(feed(&mut s, ":srv 367 me #c *!*@x op 1700000000"), Dispatch::Consumed);
        assert_eq!(feed(&mut s, ":srv 368 me #c :End of Channel Ban List"), Dispatch::Consumed);
        assert_eq!(feed(&mut s, ":srv 728 me #c q $a:spam op 1700000000"), Dispatch::Consumed);
        assert_eq!(
            feed(&mut s, ":srv 729 me #c q :End of Channel Quiet List"),
            Dispatch::Consumed
        );
        assert_eq!(s.connection().sent, vec!["MODE #c +bq", "MODE #c -b *!*@x"]);
    }

    #[test]
    fn self_op_mode_grants_privilege() {
        let mut s = Scheduler::new(
            NotOpped(Recorder::default()),
            Arc::new(ManualClock::new()),
            Settings::default(),
        );
        s.submit("#c", "kick alice");
        dispatch(&mut s, &":ChanServ!cs@services MODE #c +o alice".parse().unwrap());
        assert_eq!(s.pending().len(), 1);

        dispatch(&mut s, &":ChanServ!cs@services MODE #c +o ME".parse().unwrap());
        assert_eq!(
            s.connection().0.sent,
            vec![
                "PRIVMSG ChanServ :OP #c",
                "REMOVE #c alice :Goodbye",
                "PRIVMSG ChanServ :DEOP #c",
            ]
        );
    }

    struct NotOpped(Recorder);

    impl Connection for NotOpped {
        fn send(&mut self, command: Command) {
            self.0.send(command);
        }

        fn nick(&self) -> &str {
            "me"
        }

        fn members(&self, _channel: &str) -> Vec<Member> {
            vec![Member::new("me", ""), Member::new("alice", "")]
        }

        fn display(&mut self, line: DisplayLine) {
            self.0.display(line);
        }
    }

    #[test]
    fn unban_by_others_cancels_reversal() {
        let mut s = scheduler();
        s.submit("#c", "ban -t60 *!*@spam.example");
        assert_eq!(s.reversals().len(), 1);
        feed(&mut s, ":op!o@h MODE #c -b *!*@spam.example");
        assert!(s.reversals().is_empty());
    }

    #[test]
    fn missing_privileges_are_shown_with_channel() {
        let mut s = scheduler();
        assert_eq!(
            feed(&mut s, ":srv 482 me #c :You're not a channel operator"),
            Dispatch::Consumed
        );
        assert_eq!(
            s.connection().shown[0].text,
            "You're not a channel operator in #c"
        );
    }

    #[test]
    fn whowas_fallback_and_exhaustion() {
        let mut s = scheduler();
        s.submit("#c", "ban ghost");
        assert_eq!(feed(&mut s, ":srv 401 me ghost :No such nick"), Dispatch::Consumed);
        feed(&mut s, ":srv 318 me ghost :End of /WHOIS list.");
        assert_eq!(s.pending().len(), 1);
        assert_eq!(
            feed(&mut s, ":srv 406 me ghost :There was no such nickname"),
            Dispatch::Consumed
        );
        assert!(s.pending().is_empty());
        assert_eq!(s.connection().sent, vec!["WHOIS ghost", "WHOWAS ghost"]);
        assert_eq!(s.connection().shown[0].text, "ghost could not be found");
    }

    #[test]
    fn channel_errors_pass_through() {
        let mut s = scheduler();
        assert_eq!(
            feed(&mut s, ":srv 474 me #c :Cannot join channel (+b)"),
            Dispatch::PassThrough
        );
        assert_eq!(feed(&mut s, ":a!b@c PRIVMSG #c :hi"), Dispatch::PassThrough);
    }
}
