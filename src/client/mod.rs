//! The live IRC session.
//!
//! One task owns the [`Scheduler`] and multiplexes three event sources with
//! `tokio::select!`: server lines, moderator input on stdin, and the
//! housekeeping tick. Outbound lines go through an unbounded channel to a
//! writer task that owns the sink half of the framed socket.

mod roster;

pub use roster::Roster;

use anyhow::Context;
use chanmod_proto::{Command, IrcCodec, Message, Response, irc_eq};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::codec::Framed;
use tracing::{Instrument, debug, info, trace, warn};

use crate::clock::SystemClock;
use crate::config::Config;
use crate::connection::{Connection, DisplayLine, Member};
use crate::router::{self, Dispatch};
use crate::scheduler::{Handled, Scheduler, Settings};
use crate::telemetry::spans;

/// [`Connection`] over a live session.
pub struct ClientConnection {
    tx: mpsc::UnboundedSender<Message>,
    nick: String,
    roster: Roster,
}

impl ClientConnection {
    pub fn new(tx: mpsc::UnboundedSender<Message>, nick: impl Into<String>) -> Self {
        Self {
            tx,
            nick: nick.into(),
            roster: Roster::new(),
        }
    }
}

impl Connection for ClientConnection {
    fn send(&mut self, command: Command) {
        trace!(line = %command, "Queueing outbound line");
        if self.tx.send(Message::from(command)).is_err() {
            debug!("Writer gone, dropping outbound line");
        }
    }

    fn nick(&self) -> &str {
        &self.nick
    }

    fn members(&self, channel: &str) -> Vec<Member> {
        self.roster.members(channel)
    }

    fn display(&mut self, line: DisplayLine) {
        println!("{}", line);
    }
}

/// Connect, register and run until the server or stdin goes away.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let span = spans::connection(&config.server.address, &config.server.nick);
    session(config).instrument(span).await
}

async fn session(config: Config) -> anyhow::Result<()> {
    let stream = TcpStream::connect(&config.server.address)
        .await
        .with_context(|| format!("failed to connect to {}", config.server.address))?;
    info!("Connected");

    let (mut sink, mut lines_in) = Framed::new(stream, IrcCodec::new()).split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(
        async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    warn!(error = %e, "Write failed");
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let conn = ClientConnection::new(tx, config.server.nick.clone());
    let mut scheduler = Scheduler::new(conn, Arc::new(SystemClock::new()), Settings::from(&config));
    register(scheduler.connection_mut(), &config);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(config.timeouts.tick());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            frame = lines_in.next() => match frame {
                Some(Ok(msg)) => on_server_line(&mut scheduler, &config, msg),
                Some(Err(e)) => break Err(anyhow::Error::new(e).context("failed to read from server")),
                None => {
                    info!("Server closed the connection");
                    break Ok(());
                }
            },
            line = stdin.next_line() => match line {
                Ok(Some(line)) => on_input(&mut scheduler, &config, line.trim()),
                Ok(None) => {
                    info!("Input closed, quitting");
                    scheduler.connection_mut().send(Command::QUIT(None));
                    break Ok(());
                }
                Err(e) => break Err(anyhow::Error::new(e).context("failed to read input")),
            },
            _ = ticker.tick() => scheduler.tick(),
        }
    };

    drop(scheduler);
    if let Err(e) = writer.await {
        warn!(error = %e, "Writer task failed");
    }
    result
}

fn register(conn: &mut ClientConnection, config: &Config) {
    let server = &config.server;
    if let Some(password) = &server.password {
        conn.send(Command::PASS(password.clone()));
    }
    conn.send(Command::NICK(server.nick.clone()));
    conn.send(Command::USER(
        server.username.clone(),
        "0".to_string(),
        server.realname.clone(),
    ));
}

fn on_server_line(scheduler: &mut Scheduler<ClientConnection>, config: &Config, msg: Message) {
    trace!(line = %msg, "Received");

    match &msg.command {
        Command::PING(token, _) => {
            scheduler
                .connection_mut()
                .send(Command::PONG(token.clone(), None));
            return;
        }
        Command::Response(Response::RPL_WELCOME, args) => {
            let conn = scheduler.connection_mut();
            if let Some(nick) = args.first() {
                conn.nick = nick.clone();
            }
            info!(nick = %conn.nick, "Registered");
            if !config.server.channels.is_empty() {
                conn.send(Command::JOIN(config.server.channels.join(","), None));
            }
        }
        Command::Response(Response::ERR_NICKNAMEINUSE, args) => {
            let conn = scheduler.connection_mut();
            // Before 001 the target is `*`; afterwards it is our current nick.
            if args.first().is_some_and(|a| a == "*") {
                let attempted = args.get(1).cloned().unwrap_or_else(|| conn.nick.clone());
                conn.nick = format!("{}_", attempted);
                warn!(nick = %conn.nick, "Nickname in use, retrying");
                let nick = conn.nick.clone();
                conn.send(Command::NICK(nick));
                return;
            }
        }
        Command::NICK(new) => {
            let conn = scheduler.connection_mut();
            if msg.source_nickname().is_some_and(|old| irc_eq(old, &conn.nick)) {
                conn.nick = new.clone();
            }
        }
        _ => {}
    }

    {
        let conn = scheduler.connection_mut();
        let me = conn.nick.clone();
        conn.roster.observe(&me, &msg);
    }

    if router::dispatch(scheduler, &msg) == Dispatch::PassThrough {
        show(scheduler.connection_mut(), &msg);
    }
}

/// Echo what a user would want to see from a passed-through line.
fn show(conn: &mut ClientConnection, msg: &Message) {
    let from = msg.source_nickname().unwrap_or("server");
    match &msg.command {
        Command::Response(response, args) if response.is_error() => {
            let text = args.iter().skip(1).cloned().collect::<Vec<_>>().join(" ");
            conn.display(DisplayLine::error(text));
        }
        Command::PRIVMSG(target, text) | Command::NOTICE(target, text) => {
            conn.display(DisplayLine::text(format!("<{}:{}> {}", from, target, text)));
        }
        Command::KICK(channel, nick, reason) | Command::REMOVE(channel, nick, reason) => {
            let reason = reason.as_deref().unwrap_or_default();
            conn.display(DisplayLine::text(format!(
                "{} removed {} from {} ({})",
                from, nick, channel, reason
            )));
        }
        Command::MODE(target, args) => {
            conn.display(DisplayLine::text(format!(
                "{} sets mode {} {}",
                from,
                target,
                args.join(" ")
            )));
        }
        _ => trace!(line = %msg, "Not shown"),
    }
}

/// Split `[#channel] rest`, falling back to the default channel.
fn split_channel<'a>(line: &'a str, default: Option<&'a str>) -> Option<(&'a str, &'a str)> {
    if line.starts_with(['#', '&', '!', '+']) {
        let (channel, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        return Some((channel, rest.trim_start()));
    }
    default.map(|channel| (channel, line))
}

fn on_input(scheduler: &mut Scheduler<ClientConnection>, config: &Config, line: &str) {
    if line.is_empty() {
        return;
    }

    if let Some(raw) = line.strip_prefix("/quote ") {
        match raw.parse::<Message>() {
            Ok(msg) => scheduler.connection_mut().send(msg.command),
            Err(e) => scheduler
                .connection_mut()
                .display(DisplayLine::error(e.to_string())),
        }
        return;
    }

    let default = config.server.channels.first().map(String::as_str);
    let Some((channel, command)) = split_channel(line, default) else {
        scheduler
            .connection_mut()
            .display(DisplayLine::error("No channel given and none configured"));
        return;
    };

    if scheduler.submit(channel, command) == Handled::Ignored {
        let verb = command.split_whitespace().next().unwrap_or(command);
        scheduler
            .connection_mut()
            .display(DisplayLine::error(format!("Unknown command: {}", verb)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_prefix_is_optional() {
        assert_eq!(split_channel("#ops ban bob", Some("#c")), Some(("#ops", "ban bob")));
        assert_eq!(split_channel("ban bob", Some("#c")), Some(("#c", "ban bob")));
        assert_eq!(split_channel("ban bob", None), None);
        assert_eq!(split_channel("#ops", None), Some(("#ops", "")));
    }

    #[test]
    fn connection_forwards_commands_and_tracks_roster() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut conn = ClientConnection::new(tx, "me");
        conn.send(Command::WHOIS("bob".into()));
        assert_eq!(rx.try_recv().unwrap().to_string(), "WHOIS bob");

        conn.roster
            .observe("me", &":srv 353 me = #c :@me bob".parse().unwrap());
        let members = conn.members("#c");
        assert_eq!(members.len(), 2);
        assert!(members[0].is_op());
    }
}
