//! Tokio codec for IRC lines.
//!
//! Decodes CRLF- (or bare LF-) terminated lines into [`Message`]s and
//! encodes [`Message`]s with a CRLF terminator. Blank lines are skipped.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProtocolError, Result};
use crate::message::Message;

/// Default line limit: 512 bytes of message plus room for IRCv3 tags.
pub const DEFAULT_MAX_LINE_LEN: usize = 512 + 8191;

/// Line-oriented IRC codec.
#[derive(Debug)]
pub struct IrcCodec {
    next_index: usize,
    max_len: usize,
}

impl Default for IrcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl IrcCodec {
    /// Codec with [`DEFAULT_MAX_LINE_LEN`].
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }

    /// Codec with a custom line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    /// Reject outgoing text that would break framing.
    fn sanitize(line: &str) -> Result<()> {
        match line.chars().find(|c| matches!(c, '\r' | '\n' | '\0')) {
            Some(c) => Err(ProtocolError::IllegalControlChar(c)),
            None => Ok(()),
        }
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                self.next_index = src.len();
                if src.len() > self.max_len {
                    return Err(ProtocolError::LineTooLong {
                        actual: src.len(),
                        limit: self.max_len,
                    });
                }
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::LineTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let text = std::str::from_utf8(&line).map_err(|e| ProtocolError::InvalidUtf8 {
                valid_up_to: e.valid_up_to(),
            })?;
            if text.trim().is_empty() {
                continue;
            }

            return text.parse::<Message>().map(Some);
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<()> {
        let line = msg.to_string();
        Self::sanitize(&line)?;
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
