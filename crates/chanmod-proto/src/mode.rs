//! Channel mode changes.
//!
//! A moderation client only needs to understand two families of channel
//! modes in incoming `MODE` lines: membership prefixes (to notice it was
//! opped) and list modes (to notice a ban or quiet was lifted). Argument
//! consumption follows the charybdis/solanum `CHANMODES` layout so a mixed
//! change like `+kl-b key 10 *!*@x` still lines up.

use std::fmt;
use std::iter::Peekable;

use crate::error::MessageParseError;

/// A channel mode letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ChannelMode {
    /// 'b' - Ban mask
    Ban,
    /// 'q' - Quiet mask
    Quiet,
    /// 'e' - Ban exception
    Exception,
    /// 'I' - Invite exception
    InviteException,
    /// 'o' - Channel operator
    Oper,
    /// 'h' - Half-operator
    Halfop,
    /// 'v' - Voice
    Voice,
    /// 'k' - Channel key
    Key,
    /// 'l' - Member limit (argument only when set)
    Limit,
    /// 'f' - Forward channel (argument only when set)
    Forward,
    /// 'j' - Join throttle (argument only when set)
    JoinThrottle,
    /// Any other letter; assumed to take no argument.
    Unknown(char),
}

impl ChannelMode {
    /// Map a mode letter.
    pub fn from_char(c: char) -> Self {
        match c {
            'b' => Self::Ban,
            'q' => Self::Quiet,
            'e' => Self::Exception,
            'I' => Self::InviteException,
            'o' => Self::Oper,
            'h' => Self::Halfop,
            'v' => Self::Voice,
            'k' => Self::Key,
            'l' => Self::Limit,
            'f' => Self::Forward,
            'j' => Self::JoinThrottle,
            other => Self::Unknown(other),
        }
    }

    /// The mode letter.
    pub fn as_char(&self) -> char {
        match self {
            Self::Ban => 'b',
            Self::Quiet => 'q',
            Self::Exception => 'e',
            Self::InviteException => 'I',
            Self::Oper => 'o',
            Self::Halfop => 'h',
            Self::Voice => 'v',
            Self::Key => 'k',
            Self::Limit => 'l',
            Self::Forward => 'f',
            Self::JoinThrottle => 'j',
            Self::Unknown(c) => *c,
        }
    }

    /// Type A modes: masks kept in a list.
    pub fn is_list_mode(&self) -> bool {
        matches!(
            self,
            Self::Ban | Self::Quiet | Self::Exception | Self::InviteException
        )
    }

    /// Membership prefix modes.
    pub fn is_prefix_mode(&self) -> bool {
        matches!(self, Self::Oper | Self::Halfop | Self::Voice)
    }

    fn takes_arg(&self, adding: bool) -> bool {
        match self {
            Self::Ban
            | Self::Quiet
            | Self::Exception
            | Self::InviteException
            | Self::Oper
            | Self::Halfop
            | Self::Voice
            | Self::Key => true,
            Self::Limit | Self::Forward | Self::JoinThrottle => adding,
            Self::Unknown(_) => false,
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One change within a `MODE` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Mode being set, with its argument if it takes one.
    Plus(ChannelMode, Option<String>),
    /// Mode being unset, with its argument if it takes one.
    Minus(ChannelMode, Option<String>),
}

impl Mode {
    /// Parse `["+ob-v", "alice", "*!*@x", "bob"]` style pieces.
    ///
    /// A list mode without an argument is a list query (`MODE #c +b`) and
    /// parses with `None`. Leftover arguments are an error.
    pub fn parse_channel(pieces: &[&str]) -> Result<Vec<Mode>, MessageParseError> {
        let Some((first, rest)) = pieces.split_first() else {
            return Ok(Vec::new());
        };

        let mut args = rest.iter().copied().peekable();
        let mut adding = true;
        let mut out = Vec::new();

        for c in first.chars() {
            match c {
                '+' => adding = true,
                '-' => adding = false,
                _ => {
                    let mode = ChannelMode::from_char(c);
                    let arg = take_arg(&mode, adding, &mut args, first)?;
                    out.push(if adding {
                        Mode::Plus(mode, arg)
                    } else {
                        Mode::Minus(mode, arg)
                    });
                }
            }
        }

        if args.peek().is_some() {
            return Err(MessageParseError::InvalidModeString(pieces.join(" ")));
        }
        Ok(out)
    }

    /// The mode letter being changed.
    pub fn mode(&self) -> ChannelMode {
        match self {
            Mode::Plus(m, _) | Mode::Minus(m, _) => *m,
        }
    }

    /// The argument, if any.
    pub fn arg(&self) -> Option<&str> {
        match self {
            Mode::Plus(_, arg) | Mode::Minus(_, arg) => arg.as_deref(),
        }
    }

    /// Whether this change sets the mode.
    pub fn is_plus(&self) -> bool {
        matches!(self, Mode::Plus(..))
    }
}

fn take_arg<'a, I>(
    mode: &ChannelMode,
    adding: bool,
    args: &mut Peekable<I>,
    modestring: &str,
) -> Result<Option<String>, MessageParseError>
where
    I: Iterator<Item = &'a str>,
{
    if !mode.takes_arg(adding) {
        return Ok(None);
    }
    match args.next() {
        Some(arg) => Ok(Some(arg.to_owned())),
        None if mode.is_list_mode() => Ok(None),
        None => Err(MessageParseError::InvalidModeString(format!(
            "'{}' in {} needs an argument",
            mode, modestring
        ))),
    }
}
