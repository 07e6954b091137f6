//! Moderator command grammar.
//!
//! A command line is a verb followed by its arguments, e.g.
//! `kb -nah -t600 spammer go away`. Ban-family verbs accept leading flag
//! tokens: `-t<secs>` schedules a reversal and `-<nihra>` picks the ban
//! dimensions.

use chanmod_proto::{ChannelExt, irc_eq};
use std::time::Duration;

use crate::connection::Member;
use crate::error::CommandError;
use crate::scheduler::action::{
    Action, ActionKind, BanPolicy, Dimensions, Invitee, ListMode, PrivilegeChange, Target,
};

/// What the parser needs to know about the session.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub channel: &'a str,
    pub me: &'a str,
    pub members: &'a [Member],
    pub default_reason: &'a str,
}

impl CommandContext<'_> {
    fn is_member(&self, nick: &str) -> bool {
        self.members.iter().any(|m| irc_eq(&m.nick, nick))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Privilege(PrivilegeChange),
    Kick,
    Ban,
    KickBan,
    Forward,
    KickForward,
    Mute,
    /// `m`: a mode change when the argument looks like one, otherwise mute.
    ModeOrMute,
    Mode,
    Lart,
    Unban,
    Topic,
    Invite,
    Bans,
}

impl Verb {
    fn from_word(word: &str) -> Option<Self> {
        let verb = match word {
            "op" | "o" => Self::Privilege(PrivilegeChange::Op),
            "deop" | "d" => Self::Privilege(PrivilegeChange::Deop),
            "voice" | "v" => Self::Privilege(PrivilegeChange::Voice),
            "devoice" | "dv" => Self::Privilege(PrivilegeChange::Devoice),
            "kick" | "k" => Self::Kick,
            "ban" | "b" => Self::Ban,
            "kickban" | "kb" => Self::KickBan,
            "forward" | "f" => Self::Forward,
            "kickforward" | "kf" => Self::KickForward,
            "mute" => Self::Mute,
            "m" => Self::ModeOrMute,
            "mode" => Self::Mode,
            "lart" | "l" => Self::Lart,
            "unban" | "u" => Self::Unban,
            "topic" | "t" => Self::Topic,
            "invite" | "i" => Self::Invite,
            "bans" => Self::Bans,
            _ => return None,
        };
        Some(verb)
    }

    fn kicks(self) -> bool {
        matches!(self, Self::KickBan | Self::KickForward | Self::Lart)
    }

    fn forwards(self) -> bool {
        matches!(self, Self::Forward | Self::KickForward)
    }
}

/// Split off the first whitespace-delimited token.
fn next_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim_start()),
        None => (s, ""),
    }
}

fn is_mode_change(s: &str) -> bool {
    s.starts_with(['+', '-', '='])
}

/// Parse a command line into an action.
///
/// `Ok(None)` means the verb is not a moderation verb and the line belongs
/// to someone else.
pub fn parse(ctx: &CommandContext<'_>, line: &str) -> Result<Option<Action>, CommandError> {
    let (word, rest) = next_token(line);
    let Some(verb) = Verb::from_word(&word.to_ascii_lowercase()) else {
        return Ok(None);
    };
    let rest = rest.trim_end();

    if rest.is_empty() && !matches!(verb, Verb::Privilege(_)) {
        return Err(CommandError::NotEnoughArguments(word.to_owned()));
    }

    let kind = match verb {
        Verb::Privilege(change) => return Ok(Some(privilege(ctx, change, rest))),
        Verb::Topic => ActionKind::Topic {
            text: rest.to_owned(),
        },
        Verb::Mode | Verb::ModeOrMute if is_mode_change(rest) => ActionKind::ModeChange {
            modes: rest.to_owned(),
        },
        Verb::Mode => return Err(CommandError::InvalidModes(rest.to_owned())),
        Verb::Invite => invite(ctx, rest)?,
        Verb::Kick => {
            let (nick, reason) = next_token(rest);
            let nick = present_nick(ctx, nick)?;
            ActionKind::Kick {
                nick,
                reason: reason_or_default(ctx, reason),
            }
        }
        Verb::Unban | Verb::Bans => {
            let (word, _) = next_token(rest);
            let target =
                Target::parse(word).ok_or_else(|| CommandError::InvalidTarget(word.to_owned()))?;
            if verb == Verb::Unban {
                ActionKind::Unban { target }
            } else {
                ActionKind::ShowBans { target }
            }
        }
        Verb::Ban
        | Verb::KickBan
        | Verb::Forward
        | Verb::KickForward
        | Verb::Mute
        | Verb::ModeOrMute
        | Verb::Lart => return ban(ctx, verb, word, rest).map(Some),
    };

    Ok(Some(Action::new(ctx.channel, ctx.me, kind)))
}

/// Op/voice changes go through services and default to ourselves.
fn privilege(ctx: &CommandContext<'_>, change: PrivilegeChange, rest: &str) -> Action {
    let (nick, _) = next_token(rest);
    let nick = if nick.is_empty() { ctx.me } else { nick };
    let mut action = Action::new(
        ctx.channel,
        ctx.me,
        ActionKind::Privilege {
            change,
            nick: nick.to_owned(),
        },
    );
    action.relinquish = !irc_eq(nick, ctx.me);
    action
}

fn reason_or_default(ctx: &CommandContext<'_>, reason: &str) -> String {
    if reason.is_empty() {
        ctx.default_reason.to_owned()
    } else {
        reason.to_owned()
    }
}

/// A kick target has to be a nick that is currently in the channel.
fn present_nick(ctx: &CommandContext<'_>, word: &str) -> Result<String, CommandError> {
    if Target::parse(word).is_none() {
        return Err(CommandError::InvalidTarget(word.to_owned()));
    }
    if !ctx.is_member(word) {
        return Err(CommandError::NotInChannel {
            nick: word.to_owned(),
            channel: ctx.channel.to_owned(),
        });
    }
    Ok(word.to_owned())
}

fn invite(ctx: &CommandContext<'_>, rest: &str) -> Result<ActionKind, CommandError> {
    let (target, _) = next_token(rest);
    if target.starts_with('#') {
        if !target.is_channel_name() {
            return Err(CommandError::InvalidChannel(target.to_owned()));
        }
        return Ok(ActionKind::Invite(Invitee::Channel(target.to_owned())));
    }
    match Target::parse(target) {
        Some(Target::Nick(nick)) => {
            if ctx.is_member(&nick) {
                return Err(CommandError::AlreadyInChannel {
                    nick,
                    channel: ctx.channel.to_owned(),
                });
            }
            Ok(ActionKind::Invite(Invitee::Nick(nick)))
        }
        _ => Err(CommandError::InvalidTarget(target.to_owned())),
    }
}

fn ban(ctx: &CommandContext<'_>, verb: Verb, word: &str, rest: &str) -> Result<Action, CommandError> {
    let mut rest = rest;
    let mut revert_secs = 0u64;
    let mut letters: Option<String> = None;

    loop {
        let (token, after) = next_token(rest);
        let Some(flag) = token.strip_prefix('-') else {
            break;
        };
        if let Some(secs) = flag.strip_prefix('t') {
            // A malformed delay is ignored rather than rejected.
            if let Ok(secs) = secs.parse() {
                revert_secs = secs;
            }
        } else {
            letters = Some(flag.to_owned());
        }
        rest = after;
    }
    if verb == Verb::Lart {
        letters = Some("nihra".to_owned());
    }

    let (target_word, mut rest) = next_token(rest);
    if target_word.is_empty() {
        return Err(CommandError::NotEnoughArguments(word.to_owned()));
    }
    let target = Target::parse(target_word)
        .ok_or_else(|| CommandError::InvalidTarget(target_word.to_owned()))?;

    let explicit = letters
        .as_deref()
        .map(Dimensions::from_letters)
        .filter(|d| !d.is_empty());
    let dimensions = match (&target, explicit) {
        (Target::Mask(_), Some(_)) => return Err(CommandError::DimensionsWithMask),
        (Target::Mask(_), None) => Dimensions::FULL,
        (Target::Nick(_), Some(dims)) => dims,
        (Target::Nick(_), None) => Dimensions::HOST,
    };

    let mode = match verb {
        Verb::Mute | Verb::ModeOrMute => ListMode::Quiet,
        _ => ListMode::Ban,
    };
    let mut policy = BanPolicy::new(dimensions, mode);

    if verb.forwards() {
        let (channel, after) = next_token(rest);
        if channel.is_empty() {
            return Err(CommandError::NotEnoughArguments(word.to_owned()));
        }
        if !channel.starts_with(['#', '~']) || !channel.is_channel_name() {
            return Err(CommandError::InvalidChannel(channel.to_owned()));
        }
        policy = policy.with_forward(channel);
        rest = after;
    }

    let kick = if verb.kicks() {
        present_nick(ctx, target_word)?;
        Some(reason_or_default(ctx, rest))
    } else {
        None
    };

    let mut action = Action::new(
        ctx.channel,
        ctx.me,
        ActionKind::Ban {
            target,
            policy,
            kick,
        },
    );
    if revert_secs > 0 {
        action = action.revert_after(Duration::from_secs(revert_secs));
    }
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> Vec<Member> {
        vec![
            Member::new("me", ""),
            Member::new("Spammer", ""),
            Member::new("alice", "+"),
        ]
    }

    fn run(line: &str) -> Result<Option<Action>, CommandError> {
        let members = members();
        let ctx = CommandContext {
            channel: "#c",
            me: "me",
            members: &members,
            default_reason: "Goodbye",
        };
        parse(&ctx, line)
    }

    fn kind(line: &str) -> ActionKind {
        run(line).unwrap().unwrap().kind
    }

    #[test]
    fn unknown_verbs_are_not_ours() {
        assert_eq!(run("whois bob"), Ok(None));
        assert_eq!(run(""), Ok(None));
    }

    #[test]
    fn privilege_defaults_to_self() {
        let action = run("op").unwrap().unwrap();
        assert_eq!(
            action.kind,
            ActionKind::Privilege {
                change: PrivilegeChange::Op,
                nick: "me".into()
            }
        );
        assert!(!action.requires_privilege);
        assert!(!action.relinquish);

        let action = run("dv alice").unwrap().unwrap();
        assert!(matches!(
            action.kind,
            ActionKind::Privilege { change: PrivilegeChange::Devoice, ref nick } if nick == "alice"
        ));
    }

    #[test]
    fn missing_arguments() {
        assert_eq!(run("kb"), Err(CommandError::NotEnoughArguments("kb".into())));
        assert_eq!(run("kb -nah"), Err(CommandError::NotEnoughArguments("kb".into())));
        assert_eq!(
            run("forward spammer"),
            Err(CommandError::NotEnoughArguments("forward".into()))
        );
    }

    #[test]
    fn flags_and_reversal_delay() {
        let action = run("ban -nah -t600 spammer").unwrap().unwrap();
        assert_eq!(action.revert_after, Some(Duration::from_secs(600)));
        let ActionKind::Ban { policy, kick, .. } = action.kind else {
            panic!("expected ban");
        };
        assert_eq!(policy.dimensions, Dimensions::from_letters("nah"));
        assert_eq!(policy.mode, ListMode::Ban);
        assert_eq!(kick, None);

        let action = run("b -tsoon spammer").unwrap().unwrap();
        assert_eq!(action.revert_after, None);
    }

    #[test]
    fn default_dimensions() {
        let ActionKind::Ban { policy, .. } = kind("b spammer") else {
            panic!("expected ban");
        };
        assert_eq!(policy.dimensions, Dimensions::HOST);

        let ActionKind::Ban { policy, .. } = kind("b *!*@spam.example") else {
            panic!("expected ban");
        };
        assert_eq!(policy.dimensions, Dimensions::FULL);
    }

    #[test]
    fn dimensions_reject_masks() {
        assert_eq!(run("b -n *!*@x"), Err(CommandError::DimensionsWithMask));
        assert_eq!(run("lart $a:spam"), Err(CommandError::DimensionsWithMask));
    }

    #[test]
    fn kickforward_reason_follows_channel() {
        let ActionKind::Ban { policy, kick, .. } = kind("kf Spammer ##fix please fix your client") else {
            panic!("expected ban");
        };
        assert_eq!(policy.forward.as_deref(), Some("##fix"));
        assert_eq!(kick.as_deref(), Some("please fix your client"));
    }

    #[test]
    fn forward_channel_is_validated() {
        assert_eq!(
            run("f spammer notachannel"),
            Err(CommandError::InvalidChannel("notachannel".into()))
        );
    }

    #[test]
    fn kick_requires_presence() {
        assert_eq!(
            run("kb ghost"),
            Err(CommandError::NotInChannel {
                nick: "ghost".into(),
                channel: "#c".into()
            })
        );
        assert_eq!(
            kind("k spammer"),
            ActionKind::Kick {
                nick: "spammer".into(),
                reason: "Goodbye".into()
            }
        );
        assert_eq!(run("k *!*@x"), Err(CommandError::NotInChannel {
            nick: "*!*@x".into(),
            channel: "#c".into()
        }));
    }

    #[test]
    fn lart_bans_everything_and_kicks() {
        let ActionKind::Ban { policy, kick, .. } = kind("l spammer") else {
            panic!("expected ban");
        };
        assert_eq!(policy.dimensions, Dimensions::ALL);
        assert_eq!(kick.as_deref(), Some("Goodbye"));
    }

    #[test]
    fn m_is_mode_or_mute() {
        assert_eq!(
            kind("m +m-i"),
            ActionKind::ModeChange {
                modes: "+m-i".into()
            }
        );
        let ActionKind::Ban { policy, .. } = kind("m spammer") else {
            panic!("expected mute");
        };
        assert_eq!(policy.mode, ListMode::Quiet);
        assert_eq!(run("mode spammer"), Err(CommandError::InvalidModes("spammer".into())));
    }

    #[test]
    fn invites() {
        assert_eq!(
            kind("i #other"),
            ActionKind::Invite(Invitee::Channel("#other".into()))
        );
        assert_eq!(kind("i bob"), ActionKind::Invite(Invitee::Nick("bob".into())));
        assert_eq!(
            run("i ALICE"),
            Err(CommandError::AlreadyInChannel {
                nick: "ALICE".into(),
                channel: "#c".into()
            })
        );
    }

    #[test]
    fn topic_keeps_the_whole_line() {
        assert_eq!(
            kind("t Welcome to #c | be nice"),
            ActionKind::Topic {
                text: "Welcome to #c | be nice".into()
            }
        );
    }

    #[test]
    fn unban_and_bans_take_masks() {
        assert!(matches!(kind("u $a:spam*"), ActionKind::Unban { target: Target::Mask(_) }));
        assert!(matches!(kind("bans bob"), ActionKind::ShowBans { target: Target::Nick(_) }));
        assert_eq!(run("u #chan"), Err(CommandError::InvalidTarget("#chan".into())));
    }
}
