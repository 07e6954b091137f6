//! Moderation intents and the state the scheduler derives for them.

use chanmod_proto::{Command, NickExt};
use std::fmt;
use std::time::Duration;

/// Queue-unique action identifier, assigned on admission.
pub type ActionId = u64;

/// Services-driven membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeChange {
    Op,
    Deop,
    Voice,
    Devoice,
}

impl PrivilegeChange {
    /// The services verb.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Op => "OP",
            Self::Deop => "DEOP",
            Self::Voice => "VOICE",
            Self::Devoice => "DEVOICE",
        }
    }
}

/// Which list a ban-family mode change lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListMode {
    Ban,
    Quiet,
}

impl ListMode {
    pub fn letter(self) -> char {
        match self {
            Self::Ban => 'b',
            Self::Quiet => 'q',
        }
    }
}

/// Which parts of a resolved identity a ban covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub nick: bool,
    pub ident: bool,
    pub host: bool,
    pub realname: bool,
    pub account: bool,
    /// The target as given; only meaningful when the target is already a mask.
    pub full: bool,
}

impl Dimensions {
    /// The default for a nick target.
    pub const HOST: Self = Self {
        nick: false,
        ident: false,
        host: true,
        realname: false,
        account: false,
        full: false,
    };

    /// Everything a nick can be banned on.
    pub const ALL: Self = Self {
        nick: true,
        ident: true,
        host: true,
        realname: true,
        account: true,
        full: false,
    };

    /// The only choice for a mask target.
    pub const FULL: Self = Self {
        nick: false,
        ident: false,
        host: false,
        realname: false,
        account: false,
        full: true,
    };

    /// Parse a `nihra` letter set. Unknown letters are ignored.
    pub fn from_letters(letters: &str) -> Self {
        let mut dims = Self::default();
        for c in letters.chars() {
            match c {
                'n' => dims.nick = true,
                'i' => dims.ident = true,
                'h' => dims.host = true,
                'r' => dims.realname = true,
                'a' => dims.account = true,
                _ => {}
            }
        }
        dims
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A target that is already a mask and needs no lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskTarget {
    /// `$a:pattern`
    Account(String),
    /// `$r:pattern`
    Realname(String),
    /// `nick!ident@host`, each part possibly wildcarded.
    Hostmask {
        nick: String,
        ident: String,
        host: String,
    },
}

impl MaskTarget {
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(account) = s.strip_prefix("$a:") {
            return Some(Self::Account(account.to_owned()));
        }
        if let Some(realname) = s.strip_prefix("$r:") {
            return Some(Self::Realname(realname.to_owned()));
        }
        let (nick, rest) = s.split_once('!')?;
        let (ident, host) = rest.split_once('@')?;
        let nick_ok = nick.len() <= chanmod_proto::DEFAULT_NICK_MAX_LEN
            && nick
                .chars()
                .all(|c| matches!(c, '*' | '?') || nick_char(c));
        if !nick_ok {
            return None;
        }
        Some(Self::Hostmask {
            nick: nick.to_owned(),
            ident: ident.to_owned(),
            host: host.to_owned(),
        })
    }
}

fn nick_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-[]{}`|_^\\".contains(c)
}

impl fmt::Display for MaskTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(a) => write!(f, "$a:{}", a),
            Self::Realname(r) => write!(f, "$r:{}", r),
            Self::Hostmask { nick, ident, host } => write!(f, "{}!{}@{}", nick, ident, host),
        }
    }
}

/// Who an action is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Nick(String),
    Mask(MaskTarget),
}

impl Target {
    /// A nickname if it looks like one, otherwise a mask, otherwise nothing.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_valid_nick() {
            Some(Self::Nick(s.to_owned()))
        } else {
            MaskTarget::parse(s).map(Self::Mask)
        }
    }

    pub fn nick(&self) -> Option<&str> {
        match self {
            Self::Nick(n) => Some(n),
            Self::Mask(_) => None,
        }
    }

    pub fn is_mask(&self) -> bool {
        matches!(self, Self::Mask(_))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nick(n) => f.write_str(n),
            Self::Mask(m) => m.fmt(f),
        }
    }
}

/// Identity fields known about a target once it is resolved.
///
/// A nick target resolves from a WHOIS/WHOWAS reply; a mask target resolves
/// on the spot to whatever parts the mask names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub nick: Option<String>,
    pub ident: Option<String>,
    pub host: Option<String>,
    pub realname: Option<String>,
    pub account: Option<String>,
}

impl ResolvedTarget {
    pub fn from_mask(mask: &MaskTarget) -> Self {
        match mask {
            MaskTarget::Account(a) => Self {
                account: Some(a.clone()),
                ..Self::default()
            },
            MaskTarget::Realname(r) => Self {
                realname: Some(r.clone()),
                ..Self::default()
            },
            MaskTarget::Hostmask { nick, ident, host } => Self {
                nick: Some(nick.clone()),
                ident: Some(ident.clone()),
                host: Some(host.clone()),
                ..Self::default()
            },
        }
    }

    /// Realname with every non-alphanumeric replaced by `?`, safe for `$r:`.
    pub fn realname_bannable(&self) -> Option<String> {
        self.realname.as_ref().map(|r| {
            r.chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '?' })
                .collect()
        })
    }

    /// `nick!ident@host`, only when all three are known.
    pub fn hostmask(&self) -> Option<String> {
        match (&self.nick, &self.ident, &self.host) {
            (Some(n), Some(i), Some(h)) => Some(format!("{}!{}@{}", n, i, h)),
            _ => None,
        }
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "*".to_owned());
        write!(
            f,
            "{}!{}@{} (r:{}, a:{})",
            show(&self.nick),
            show(&self.ident),
            show(&self.host),
            show(&self.realname),
            show(&self.account)
        )
    }
}

/// How a ban-family action renders its masks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanPolicy {
    pub dimensions: Dimensions,
    pub mode: ListMode,
    /// Forward channel, rendered as a `$#chan` suffix on every mask.
    pub forward: Option<String>,
}

impl BanPolicy {
    pub fn new(dimensions: Dimensions, mode: ListMode) -> Self {
        Self {
            dimensions,
            mode,
            forward: None,
        }
    }

    pub fn with_forward(mut self, channel: impl Into<String>) -> Self {
        self.forward = Some(channel.into());
        self
    }

    /// Masks to set, in `n i h r a f` order.
    ///
    /// A dimension whose field is unknown is skipped. A host inside
    /// `gateway_marker` under host-only policy is banned by ident instead,
    /// since the host is shared by every user of the gateway.
    pub fn masks(&self, target: &Target, resolved: &ResolvedTarget, gateway_marker: &str) -> Vec<String> {
        let dims = &self.dimensions;
        let suffix = self
            .forward
            .as_ref()
            .map(|f| format!("${}", f))
            .unwrap_or_default();
        let mut out = Vec::new();

        if dims.nick && let Some(nick) = &resolved.nick {
            out.push(format!("{}!*@*{}", nick, suffix));
        }
        if dims.ident && let Some(ident) = &resolved.ident {
            out.push(format!("*!{}@*{}", ident, suffix));
        }
        if dims.host && let Some(host) = &resolved.host {
            let gateway = !gateway_marker.is_empty()
                && host.contains(gateway_marker)
                && *dims == Dimensions::HOST;
            match (&resolved.ident, gateway) {
                (Some(ident), true) => {
                    out.push(format!("*!{}@{}*{}", ident, gateway_marker, suffix))
                }
                _ => out.push(format!("*!*@{}{}", host, suffix)),
            }
        }
        if dims.realname && let Some(bannable) = resolved.realname_bannable() {
            out.push(format!("$r:{}{}", bannable, suffix));
        }
        if dims.account && let Some(account) = &resolved.account {
            out.push(format!("$a:{}{}", account, suffix));
        }
        if dims.full && let Target::Mask(mask) = target {
            out.push(format!("{}{}", mask, suffix));
        }
        out
    }
}

/// Channel invite: a nick into our channel, or ourselves into another one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invitee {
    Nick(String),
    Channel(String),
}

/// One list mode change, as set and as undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChange {
    pub mode: ListMode,
    pub mask: String,
}

impl ListChange {
    pub fn new(mode: ListMode, mask: impl Into<String>) -> Self {
        Self {
            mode,
            mask: mask.into(),
        }
    }

    pub fn apply(&self, channel: &str) -> Command {
        mode_command(channel, '+', self.mode, &self.mask)
    }

    pub fn undo(&self, channel: &str) -> Command {
        mode_command(channel, '-', self.mode, &self.mask)
    }
}

fn mode_command(channel: &str, sign: char, mode: ListMode, mask: &str) -> Command {
    Command::MODE(
        channel.to_owned(),
        vec![format!("{}{}", sign, mode.letter()), mask.to_owned()],
    )
}

/// What to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Privilege { change: PrivilegeChange, nick: String },
    Topic { text: String },
    ModeChange { modes: String },
    Invite(Invitee),
    Kick { nick: String, reason: String },
    Ban {
        target: Target,
        policy: BanPolicy,
        /// Kick reason, when the ban comes with a kick.
        kick: Option<String>,
    },
    Unban { target: Target },
    ShowBans { target: Target },
    /// Undo of an earlier ban; masks are already rendered.
    Revert { changes: Vec<ListChange> },
}

impl ActionKind {
    /// Stable label for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Privilege { .. } => "privilege",
            Self::Topic { .. } => "topic",
            Self::ModeChange { .. } => "mode",
            Self::Invite(_) => "invite",
            Self::Kick { .. } => "kick",
            Self::Ban { .. } => "ban",
            Self::Unban { .. } => "unban",
            Self::ShowBans { .. } => "bans",
            Self::Revert { .. } => "revert",
        }
    }

    /// The target that has to be resolved before running.
    pub fn target(&self) -> Option<&Target> {
        match self {
            Self::Ban { target, .. } | Self::Unban { target } | Self::ShowBans { target } => {
                Some(target)
            }
            _ => None,
        }
    }

    pub fn needs_ban_list(&self) -> bool {
        matches!(self, Self::Unban { .. } | Self::ShowBans { .. })
    }

    fn requires_privilege(&self) -> bool {
        match self {
            Self::Privilege { .. } | Self::Topic { .. } | Self::ShowBans { .. } => false,
            Self::Invite(Invitee::Channel(_)) => false,
            Self::Invite(Invitee::Nick(_))
            | Self::ModeChange { .. }
            | Self::Kick { .. }
            | Self::Ban { .. }
            | Self::Unban { .. }
            | Self::Revert { .. } => true,
        }
    }
}

/// A moderation intent, as admitted to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub channel: String,
    pub requester: String,
    pub kind: ActionKind,
    /// Needs channel operator status to run.
    pub requires_privilege: bool,
    /// Give operator status back afterwards.
    pub relinquish: bool,
    /// Undo the list changes this long after running.
    pub revert_after: Option<Duration>,
}

impl Action {
    pub fn new(channel: impl Into<String>, requester: impl Into<String>, kind: ActionKind) -> Self {
        let requires_privilege = kind.requires_privilege();
        Self {
            channel: channel.into(),
            requester: requester.into(),
            kind,
            requires_privilege,
            relinquish: true,
            revert_after: None,
        }
    }

    pub fn revert_after(mut self, delay: Duration) -> Self {
        self.revert_after = Some(delay);
        self
    }

    pub fn needs_resolution(&self) -> bool {
        self.kind.target().is_some()
    }
}

/// An admitted action and what the scheduler has learned for it so far.
#[derive(Debug, Clone)]
pub struct Pending {
    pub id: ActionId,
    pub action: Action,
    pub admitted_at: Duration,
    pub resolved: Option<ResolvedTarget>,
    pub has_privilege: bool,
    pub relinquish: bool,
    pub whowas_requested: bool,
}

impl Pending {
    /// Nick whose lookup this action waits on, if any.
    pub fn awaited_nick(&self) -> Option<&str> {
        if self.resolved.is_some() {
            return None;
        }
        self.action.kind.target().and_then(Target::nick)
    }

    pub fn awaits_privilege(&self) -> bool {
        self.action.requires_privilege && !self.has_privilege
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> ResolvedTarget {
        ResolvedTarget {
            nick: Some("alice".into()),
            ident: Some("~al".into()),
            host: Some("host.example".into()),
            realname: Some("Alice L.".into()),
            account: Some("alice".into()),
        }
    }

    #[test]
    fn target_parsing() {
        assert_eq!(Target::parse("alice"), Some(Target::Nick("alice".into())));
        assert_eq!(
            Target::parse("*!*@spam.example"),
            Some(Target::Mask(MaskTarget::Hostmask {
                nick: "*".into(),
                ident: "*".into(),
                host: "spam.example".into()
            }))
        );
        assert_eq!(
            Target::parse("$a:spammer"),
            Some(Target::Mask(MaskTarget::Account("spammer".into())))
        );
        assert_eq!(Target::parse("not a nick"), None);
        assert_eq!(Target::parse("#channel"), None);
    }

    #[test]
    fn dimension_letters() {
        let dims = Dimensions::from_letters("nah");
        assert!(dims.nick && dims.account && dims.host);
        assert!(!dims.ident && !dims.realname && !dims.full);
        assert!(Dimensions::from_letters("xyz").is_empty());
        assert_eq!(Dimensions::from_letters("nihra"), Dimensions::ALL);
    }

    #[test]
    fn nick_and_host_with_forward_gives_two_suffixed_masks() {
        let policy = BanPolicy::new(Dimensions::from_letters("nh"), ListMode::Ban).with_forward("#x");
        let masks = policy.masks(&Target::Nick("alice".into()), &alice(), "gateway/");
        assert_eq!(masks, vec!["alice!*@*$#x", "*!*@host.example$#x"]);
    }

    #[test]
    fn all_dimensions_in_order() {
        let policy = BanPolicy::new(Dimensions::ALL, ListMode::Quiet);
        let masks = policy.masks(&Target::Nick("alice".into()), &alice(), "gateway/");
        assert_eq!(
            masks,
            vec![
                "alice!*@*",
                "*!~al@*",
                "*!*@host.example",
                "$r:Alice?L?",
                "$a:alice"
            ]
        );
    }

    #[test]
    fn gateway_host_bans_by_ident() {
        let mut target = alice();
        target.host = Some("gateway/web/irccloud.com/x-abc".into());
        target.ident = Some("uid123".into());
        let policy = BanPolicy::new(Dimensions::HOST, ListMode::Ban);
        let masks = policy.masks(&Target::Nick("alice".into()), &target, "gateway/");
        assert_eq!(masks, vec!["*!uid123@gateway/*"]);

        // Explicit multi-dimension policy keeps the literal host.
        let policy = BanPolicy::new(Dimensions::from_letters("nh"), ListMode::Ban);
        let masks = policy.masks(&Target::Nick("alice".into()), &target, "gateway/");
        assert_eq!(masks[1], "*!*@gateway/web/irccloud.com/x-abc");
    }

    #[test]
    fn unknown_account_is_skipped() {
        let mut target = alice();
        target.account = None;
        let policy = BanPolicy::new(Dimensions::from_letters("a"), ListMode::Ban);
        assert!(policy.masks(&Target::Nick("alice".into()), &target, "gateway/").is_empty());
    }

    #[test]
    fn full_mask_target() {
        let target = Target::parse("*!*@spam.example").unwrap();
        let Target::Mask(mask) = &target else { unreachable!() };
        let resolved = ResolvedTarget::from_mask(mask);
        let policy = BanPolicy::new(Dimensions::FULL, ListMode::Ban).with_forward("##fix");
        assert_eq!(
            policy.masks(&target, &resolved, "gateway/"),
            vec!["*!*@spam.example$##fix"]
        );
    }

    #[test]
    fn privilege_requirements_by_kind() {
        let topic = Action::new("#c", "me", ActionKind::Topic { text: "hi".into() });
        assert!(!topic.requires_privilege);
        let invite = Action::new("#c", "me", ActionKind::Invite(Invitee::Nick("bob".into())));
        assert!(invite.requires_privilege);
        let invite = Action::new("#c", "me", ActionKind::Invite(Invitee::Channel("#d".into())));
        assert!(!invite.requires_privilege);
        let bans = Action::new("#c", "me", ActionKind::ShowBans { target: Target::Nick("bob".into()) });
        assert!(!bans.requires_privilege);
        assert!(bans.needs_resolution());
        assert!(bans.kind.needs_ban_list());
    }

    #[test]
    fn list_change_commands() {
        let change = ListChange::new(ListMode::Quiet, "$a:spam");
        assert_eq!(change.apply("#c").to_string(), "MODE #c +q $a:spam");
        assert_eq!(change.undo("#c").to_string(), "MODE #c -q $a:spam");
    }
}
