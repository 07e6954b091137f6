//! Numeric replies observed by a moderation client.
//!
//! Only the numerics some component reacts to are named; anything else is
//! surfaced as [`Command::Raw`](crate::Command::Raw) with its three-digit code.

#![allow(non_camel_case_types)]

use std::fmt;

/// IRC server numeric reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    /// 001 - Registration complete
    RPL_WELCOME = 1,
    /// 005 - Server supported features
    RPL_ISUPPORT = 5,
    /// 311 - WHOIS user info: `<me> <nick> <user> <host> * :<realname>`
    RPL_WHOISUSER = 311,
    /// 314 - WHOWAS user info, same shape as 311
    RPL_WHOWASUSER = 314,
    /// 318 - End of WHOIS
    RPL_ENDOFWHOIS = 318,
    /// 330 - WHOIS account: `<me> <nick> <account> :is logged in as`
    RPL_WHOISACCOUNT = 330,
    /// 353 - NAMES reply: `<me> <type> <channel> :<prefixed nicks>`
    RPL_NAMREPLY = 353,
    /// 366 - End of NAMES
    RPL_ENDOFNAMES = 366,
    /// 367 - Ban list entry: `<me> <channel> <mask> [<setter> <ts>]`
    RPL_BANLIST = 367,
    /// 368 - End of ban list
    RPL_ENDOFBANLIST = 368,
    /// 369 - End of WHOWAS
    RPL_ENDOFWHOWAS = 369,
    /// 376 - End of MOTD
    RPL_ENDOFMOTD = 376,
    /// 401 - No such nick
    ERR_NOSUCHNICK = 401,
    /// 403 - No such channel
    ERR_NOSUCHCHANNEL = 403,
    /// 404 - Cannot send to channel
    ERR_CANNOTSENDTOCHAN = 404,
    /// 406 - There was no such nickname
    ERR_WASNOSUCHNICK = 406,
    /// 422 - MOTD missing
    ERR_NOMOTD = 422,
    /// 433 - Nickname in use
    ERR_NICKNAMEINUSE = 433,
    /// 441 - They aren't on that channel
    ERR_USERNOTINCHANNEL = 441,
    /// 442 - You're not on that channel
    ERR_NOTONCHANNEL = 442,
    /// 471 - Channel is full (+l)
    ERR_CHANNELISFULL = 471,
    /// 473 - Invite only (+i)
    ERR_INVITEONLYCHAN = 473,
    /// 474 - Banned (+b)
    ERR_BANNEDFROMCHAN = 474,
    /// 475 - Bad channel key (+k)
    ERR_BADCHANNELKEY = 475,
    /// 482 - You're not channel operator
    ERR_CHANOPRIVSNEEDED = 482,
    /// 728 - Quiet list entry: `<me> <channel> q <mask> [<setter> <ts>]`
    RPL_QUIETLIST = 728,
    /// 729 - End of quiet list: `<me> <channel> q :End of Channel Quiet List`
    RPL_ENDOFQUIETLIST = 729,
}

impl Response {
    /// The numeric code.
    #[inline]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Look up a known numeric.
    pub fn from_code(code: u16) -> Option<Response> {
        use Response::*;
        Some(match code {
            1 => RPL_WELCOME,
            5 => RPL_ISUPPORT,
            311 => RPL_WHOISUSER,
            314 => RPL_WHOWASUSER,
            318 => RPL_ENDOFWHOIS,
            330 => RPL_WHOISACCOUNT,
            353 => RPL_NAMREPLY,
            366 => RPL_ENDOFNAMES,
            367 => RPL_BANLIST,
            368 => RPL_ENDOFBANLIST,
            369 => RPL_ENDOFWHOWAS,
            376 => RPL_ENDOFMOTD,
            401 => ERR_NOSUCHNICK,
            403 => ERR_NOSUCHCHANNEL,
            404 => ERR_CANNOTSENDTOCHAN,
            406 => ERR_WASNOSUCHNICK,
            422 => ERR_NOMOTD,
            433 => ERR_NICKNAMEINUSE,
            441 => ERR_USERNOTINCHANNEL,
            442 => ERR_NOTONCHANNEL,
            471 => ERR_CHANNELISFULL,
            473 => ERR_INVITEONLYCHAN,
            474 => ERR_BANNEDFROMCHAN,
            475 => ERR_BADCHANNELKEY,
            482 => ERR_CHANOPRIVSNEEDED,
            728 => RPL_QUIETLIST,
            729 => RPL_ENDOFQUIETLIST,
            _ => return None,
        })
    }

    /// Error numerics (4xx and 5xx).
    #[inline]
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.code())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}
