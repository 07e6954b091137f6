//! IRC commands, in both directions.
//!
//! Inbound lines are mapped onto typed variants when the command is one a
//! moderation client reacts to; everything else (and any typed command that
//! arrives short of parameters) is preserved verbatim as [`Command::Raw`].
//! [`Display`](fmt::Display) renders the wire form without CRLF.

use std::fmt;

use crate::response::Response;

/// An IRC command with its parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Command {
    /// `PASS password`
    PASS(String),
    /// `NICK nickname`
    NICK(String),
    /// `USER username mode * :realname`
    USER(String, String, String),
    /// `PING token [server]`
    PING(String, Option<String>),
    /// `PONG token [server]`
    PONG(String, Option<String>),
    /// `JOIN channels [keys]`
    JOIN(String, Option<String>),
    /// `PART channels [:message]`
    PART(String, Option<String>),
    /// `QUIT [:message]`
    QUIT(Option<String>),
    /// `PRIVMSG target :text`
    PRIVMSG(String, String),
    /// `NOTICE target :text`
    NOTICE(String, String),
    /// `MODE target modestring [args...]`, args already split.
    MODE(String, Vec<String>),
    /// `TOPIC channel [:topic]`
    TOPIC(String, Option<String>),
    /// `INVITE nickname channel`
    INVITE(String, String),
    /// `KICK channel nickname [:reason]`
    KICK(String, String, Option<String>),
    /// `REMOVE channel nickname [:reason]`: a forced part that keeps
    /// auto-rejoin scripts from firing.
    REMOVE(String, String, Option<String>),
    /// `WHOIS nickname`
    WHOIS(String),
    /// `WHOWAS nickname`
    WHOWAS(String),
    /// A numeric reply this crate knows by name.
    Response(Response, Vec<String>),
    /// Anything else: command word (or unknown numeric) and parameters.
    Raw(String, Vec<String>),
}

impl Command {
    /// Build a command from a command word and its parameters.
    pub fn new(name: &str, params: Vec<&str>) -> Command {
        let owned = |i: usize| params[i].to_owned();
        let opt = |i: usize| params.get(i).map(|s| (*s).to_owned());
        let n = params.len();

        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "PASS" if n >= 1 => Command::PASS(owned(0)),
            "NICK" if n >= 1 => Command::NICK(owned(0)),
            "USER" if n >= 4 => Command::USER(owned(0), owned(1), owned(3)),
            "PING" if n >= 1 => Command::PING(owned(0), opt(1)),
            "PONG" if n >= 1 => Command::PONG(owned(0), opt(1)),
            "JOIN" if n >= 1 => Command::JOIN(owned(0), opt(1)),
            "PART" if n >= 1 => Command::PART(owned(0), opt(1)),
            "QUIT" => Command::QUIT(opt(0)),
            "PRIVMSG" if n >= 2 => Command::PRIVMSG(owned(0), owned(1)),
            "NOTICE" if n >= 2 => Command::NOTICE(owned(0), owned(1)),
            "MODE" if n >= 1 => Command::MODE(
                owned(0),
                params[1..].iter().map(|s| (*s).to_owned()).collect(),
            ),
            "TOPIC" if n >= 1 => Command::TOPIC(owned(0), opt(1)),
            "INVITE" if n >= 2 => Command::INVITE(owned(0), owned(1)),
            "KICK" if n >= 2 => Command::KICK(owned(0), owned(1), opt(2)),
            "REMOVE" if n >= 2 => Command::REMOVE(owned(0), owned(1), opt(2)),
            "WHOIS" if n >= 1 => Command::WHOIS(owned(n - 1)),
            "WHOWAS" if n >= 1 => Command::WHOWAS(owned(0)),
            _ => {
                let args = params.iter().map(|s| (*s).to_owned()).collect();
                match upper.parse::<u16>().ok().and_then(Response::from_code) {
                    Some(resp) => Command::Response(resp, args),
                    None => Command::Raw(upper, args),
                }
            }
        }
    }

    /// The command word as it appears on the wire.
    pub fn name(&self) -> String {
        match self {
            Command::PASS(_) => "PASS".into(),
            Command::NICK(_) => "NICK".into(),
            Command::USER(..) => "USER".into(),
            Command::PING(..) => "PING".into(),
            Command::PONG(..) => "PONG".into(),
            Command::JOIN(..) => "JOIN".into(),
            Command::PART(..) => "PART".into(),
            Command::QUIT(_) => "QUIT".into(),
            Command::PRIVMSG(..) => "PRIVMSG".into(),
            Command::NOTICE(..) => "NOTICE".into(),
            Command::MODE(..) => "MODE".into(),
            Command::TOPIC(..) => "TOPIC".into(),
            Command::INVITE(..) => "INVITE".into(),
            Command::KICK(..) => "KICK".into(),
            Command::REMOVE(..) => "REMOVE".into(),
            Command::WHOIS(_) => "WHOIS".into(),
            Command::WHOWAS(_) => "WHOWAS".into(),
            Command::Response(resp, _) => resp.to_string(),
            Command::Raw(name, _) => name.clone(),
        }
    }
}

/// Write `args` space-separated; the last one becomes a trailing parameter
/// when it could not otherwise be read back.
fn write_params(f: &mut fmt::Formatter<'_>, args: &[String]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        let last = i + 1 == args.len();
        if last && (arg.is_empty() || arg.contains(' ') || arg.starts_with(':')) {
            write!(f, " :{}", arg)?;
        } else {
            write!(f, " {}", arg)?;
        }
    }
    Ok(())
}

fn write_trailing(f: &mut fmt::Formatter<'_>, text: &Option<String>) -> fmt::Result {
    match text {
        Some(t) => write!(f, " :{}", t),
        None => Ok(()),
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PASS(p) => write!(f, "PASS {}", p),
            Command::NICK(n) => write!(f, "NICK {}", n),
            Command::USER(user, mode, real) => write!(f, "USER {} {} * :{}", user, mode, real),
            Command::PING(a, b) | Command::PONG(a, b) => {
                write!(f, "{} {}", self.name(), a)?;
                match b {
                    Some(server) => write!(f, " {}", server),
                    None => Ok(()),
                }
            }
            Command::JOIN(chans, keys) => {
                write!(f, "JOIN {}", chans)?;
                match keys {
                    Some(k) => write!(f, " {}", k),
                    None => Ok(()),
                }
            }
            Command::PART(chan, msg) => {
                write!(f, "PART {}", chan)?;
                write_trailing(f, msg)
            }
            Command::QUIT(msg) => {
                f.write_str("QUIT")?;
                write_trailing(f, msg)
            }
            Command::PRIVMSG(target, text) => write!(f, "PRIVMSG {} :{}", target, text),
            Command::NOTICE(target, text) => write!(f, "NOTICE {} :{}", target, text),
            Command::MODE(target, args) => {
                write!(f, "MODE {}", target)?;
                write_params(f, args)
            }
            Command::TOPIC(chan, topic) => {
                write!(f, "TOPIC {}", chan)?;
                write_trailing(f, topic)
            }
            Command::INVITE(nick, chan) => write!(f, "INVITE {} {}", nick, chan),
            Command::KICK(chan, nick, reason) | Command::REMOVE(chan, nick, reason) => {
                write!(f, "{} {} {}", self.name(), chan, nick)?;
                write_trailing(f, reason)
            }
            Command::WHOIS(nick) => write!(f, "WHOIS {}", nick),
            Command::WHOWAS(nick) => write!(f, "WHOWAS {}", nick),
            Command::Response(resp, args) => {
                write!(f, "{}", resp)?;
                write_params(f, args)
            }
            Command::Raw(name, args) => {
                f.write_str(name)?;
                write_params(f, args)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_variants_from_params() {
        assert_eq!(
            Command::new("mode", vec!["#c", "+o", "me"]),
            Command::MODE("#c".into(), vec!["+o".into(), "me".into()])
        );
        assert_eq!(
            Command::new("KICK", vec!["#c", "bob"]),
            Command::KICK("#c".into(), "bob".into(), None)
        );
        assert_eq!(
            Command::new("WHOIS", vec!["server", "bob"]),
            Command::WHOIS("bob".into())
        );
    }

    #[test]
    fn short_typed_command_stays_raw() {
        assert_eq!(
            Command::new("PRIVMSG", vec!["#c"]),
            Command::Raw("PRIVMSG".into(), vec!["#c".into()])
        );
    }

    #[test]
    fn numerics_known_and_unknown() {
        assert!(matches!(
            Command::new("367", vec!["me", "#c", "*!*@x"]),
            Command::Response(Response::RPL_BANLIST, _)
        ));
        assert_eq!(
            Command::new("312", vec!["me", "bob", "srv", "info"]),
            Command::Raw(
                "312".into(),
                vec!["me".into(), "bob".into(), "srv".into(), "info".into()]
            )
        );
    }

    #[test]
    fn serializes_moderation_commands() {
        assert_eq!(
            Command::REMOVE("#c".into(), "bob".into(), Some("Goodbye".into())).to_string(),
            "REMOVE #c bob :Goodbye"
        );
        assert_eq!(
            Command::MODE("#c".into(), vec!["+bq".into()]).to_string(),
            "MODE #c +bq"
        );
        assert_eq!(
            Command::PRIVMSG("ChanServ".into(), "OP #c".into()).to_string(),
            "PRIVMSG ChanServ :OP #c"
        );
        assert_eq!(
            Command::USER("chanmod".into(), "0".into(), "mod helper".into()).to_string(),
            "USER chanmod 0 * :mod helper"
        );
    }

    #[test]
    fn raw_trailing_only_when_needed() {
        let cmd = Command::Raw("CAP".into(), vec!["REQ".into(), "multi-prefix".into()]);
        assert_eq!(cmd.to_string(), "CAP REQ multi-prefix");
        let cmd = Command::Raw("AWAY".into(), vec!["gone fishing".into()]);
        assert_eq!(cmd.to_string(), "AWAY :gone fishing");
    }
}
