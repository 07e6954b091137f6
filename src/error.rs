//! Moderator command errors.
//!
//! These never reach the server. They are shown to the user as they happen
//! and the command is dropped before admission.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Not enough arguments for {0}")]
    NotEnoughArguments(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    #[error("Invalid mode change: {0}")]
    InvalidModes(String),

    #[error("Ban types and lart can only be used with nicks, not with complete masks")]
    DimensionsWithMask,

    #[error("{nick} is already in {channel}")]
    AlreadyInChannel { nick: String, channel: String },

    #[error("{nick} is not in {channel}")]
    NotInChannel { nick: String, channel: String },
}

impl CommandError {
    /// Static label for metrics.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotEnoughArguments(_) => "not_enough_arguments",
            Self::InvalidTarget(_) => "invalid_target",
            Self::InvalidChannel(_) => "invalid_channel",
            Self::InvalidModes(_) => "invalid_modes",
            Self::DimensionsWithMask => "dimensions_with_mask",
            Self::AlreadyInChannel { .. } => "already_in_channel",
            Self::NotInChannel { .. } => "not_in_channel",
        }
    }
}
