//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use chanmod_proto::{ChannelExt, NickExt};
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.address is required")]
    MissingAddress,
    #[error("server.address must be host:port, got '{0}'")]
    InvalidAddress(String),
    #[error("server.nick is not a valid nickname: '{0}'")]
    InvalidNick(String),
    #[error("server.channels contains an invalid channel name: '{0}'")]
    InvalidChannel(String),
    #[error("services.chanserv is required")]
    MissingChanServ,
    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let address = &config.server.address;
    if address.is_empty() {
        errors.push(ValidationError::MissingAddress);
    } else if !address
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
    {
        errors.push(ValidationError::InvalidAddress(address.clone()));
    }

    if !config.server.nick.is_valid_nick() {
        errors.push(ValidationError::InvalidNick(config.server.nick.clone()));
    }

    for channel in &config.server.channels {
        if !channel.is_channel_name() {
            errors.push(ValidationError::InvalidChannel(channel.clone()));
        }
    }

    if config.services.chanserv.trim().is_empty() {
        errors.push(ValidationError::MissingChanServ);
    }

    let timeouts = &config.timeouts;
    if timeouts.action_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("action_secs"));
    }
    if timeouts.identity_ttl_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("identity_ttl_secs"));
    }
    if timeouts.tick_millis == 0 {
        errors.push(ValidationError::ZeroTimeout("tick_millis"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid_config() -> String {
        r###"
[server]
address = "irc.libera.chat:6667"
nick = "modhelper"
channels = ["#example", "##chat"]
"###
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_bad_nick_and_channel_both_reported() {
        let toml = r#"
[server]
address = "irc.libera.chat:6667"
nick = "mod helper"
channels = ["example"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidNick(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidChannel(c) if c == "example")));
    }

    #[test]
    fn test_address_needs_port() {
        let toml = r#"
[server]
address = "irc.libera.chat"
nick = "modhelper"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidAddress(_))));
    }

    #[test]
    fn test_zero_timeouts_fail() {
        let toml = r#"
[server]
address = "irc.libera.chat:6667"
nick = "modhelper"

[services]
chanserv = " "

[timeouts]
action_secs = 0
tick_millis = 0
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingChanServ)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroTimeout("action_secs"))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroTimeout("tick_millis"))));
        assert!(!errors.iter().any(|e| matches!(e, ValidationError::ZeroTimeout("identity_ttl_secs"))));
    }
}
