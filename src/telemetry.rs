//! Tracing span helpers.

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for the server session.
    pub fn connection(address: &str, nick: &str) -> Span {
        info_span!("connection", address = %address, nick = %nick)
    }

    /// Span for one action, from admission to execution.
    pub fn action(id: u64, kind: &str, channel: &str) -> Span {
        info_span!("action", id = id, kind = %kind, channel = %channel)
    }
}
