//! chanmod: an IRC channel moderation assistant.
//!
//! Moderator commands such as `kb -t600 spammer flooding` become
//! [`scheduler::Action`]s. The [`scheduler::Scheduler`] holds each one until
//! operator status, the target's identity and, where needed, the channel's
//! ban lists have arrived, then runs it once and cleans up after it.

pub mod client;
pub mod clock;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod metrics;
pub mod router;
pub mod scheduler;
pub mod telemetry;
