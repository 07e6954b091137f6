//! # chanmod-proto
//!
//! The slice of the IRC client protocol that a channel moderation helper needs:
//! parsing server lines, serializing the handful of commands it sends, numeric
//! replies, channel mode changes and RFC 1459 casemapping.
//!
//! ```rust
//! use chanmod_proto::{Command, Message, Response};
//!
//! let msg: Message = ":irc.example.net 311 me alice ~al host.example * :Alice".parse().unwrap();
//! assert!(matches!(msg.command, Command::Response(Response::RPL_WHOISUSER, _)));
//!
//! let out = Command::MODE("#rust".into(), vec!["+b".into(), "*!*@spam.example".into()]);
//! assert_eq!(out.to_string(), "MODE #rust +b *!*@spam.example");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod chan;
#[cfg(feature = "tokio")]
pub mod codec;
pub mod command;
pub mod error;
pub mod message;
pub mod mode;
pub mod nick;
mod parser;
pub mod prefix;
pub mod response;

pub use self::casemap::{irc_eq, irc_lower_char, irc_to_lower};
pub use self::chan::ChannelExt;
#[cfg(feature = "tokio")]
pub use self::codec::IrcCodec;
pub use self::command::Command;
pub use self::message::Message;
pub use self::mode::{ChannelMode, Mode};
pub use self::nick::{NickExt, DEFAULT_NICK_MAX_LEN};
pub use self::prefix::Prefix;
pub use self::response::Response;
