//! Byte transports to the device CLI.
//!
//! Whatever the wire protocol, a session only ever sees a [`ShellChannels`]
//! pair: text it writes goes to the device, text the device prints comes
//! back. Each transport runs one background I/O task that owns the socket
//! and ends when either side goes away. A closed receiver means the
//! connection is gone.

use std::fmt;

use async_ssh2_tokio::client::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{Receiver, Sender};

pub use security::{ConnectionSecurityOptions, SecurityLevel};

mod security;
pub(crate) mod ssh;
pub(crate) mod telnet;

/// Capacity of the channels between a session and its I/O task.
pub(crate) const CHANNEL_CAPACITY: usize = 256;

/// Decodes device bytes, carrying an incomplete trailing character over
/// to the next read in `pending`.
///
/// Invalid sequences become U+FFFD.
pub(crate) fn decode_utf8(pending: &mut Vec<u8>, bytes: &[u8]) -> String {
    pending.extend_from_slice(bytes);
    let mut text = String::with_capacity(pending.len());
    let mut rest: &[u8] = pending;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                rest = &[];
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                text.push_str(&String::from_utf8_lossy(valid));
                match e.error_len() {
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        rest = &after[len..];
                    }
                    // Cut off mid-character; the rest comes with the next read.
                    None => {
                        rest = after;
                        break;
                    }
                }
            }
        }
    }
    let carry = rest.to_vec();
    *pending = carry;
    text
}

/// Wire protocol used to reach the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Ssh,
    Telnet,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Ssh => f.write_str("SSH"),
            Transport::Telnet => f.write_str("Telnet"),
        }
    }
}

/// Text pipe to an interactive CLI.
pub struct ShellChannels {
    pub(crate) sender: Sender<String>,
    pub(crate) receiver: Receiver<String>,
    /// Keeps the SSH connection open for as long as the channels live.
    _ssh_client: Option<Client>,
}

impl ShellChannels {
    /// Wraps a channel pair that is not backed by a network connection.
    ///
    /// `sender` carries what the session types, `receiver` what the CLI prints.
    pub fn new(sender: Sender<String>, receiver: Receiver<String>) -> Self {
        Self {
            sender,
            receiver,
            _ssh_client: None,
        }
    }

    pub(crate) fn with_ssh_client(
        sender: Sender<String>,
        receiver: Receiver<String>,
        client: Client,
    ) -> Self {
        Self {
            sender,
            receiver,
            _ssh_client: Some(client),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_split_across_reads_is_joined() {
        let mut pending = Vec::new();
        let e_acute = "é".as_bytes();

        assert_eq!(decode_utf8(&mut pending, b"description caf"), "description caf");
        assert_eq!(decode_utf8(&mut pending, &e_acute[..1]), "");
        assert_eq!(pending, &e_acute[..1]);
        assert_eq!(decode_utf8(&mut pending, &e_acute[1..]), "é");
        assert!(pending.is_empty());
    }

    #[test]
    fn invalid_bytes_are_replaced_and_truncated_tail_is_kept() {
        let mut pending = Vec::new();
        let euro = "€".as_bytes();
        let mut input = vec![b'a', 0xFF, b'b'];
        input.extend_from_slice(&euro[..2]);

        assert_eq!(decode_utf8(&mut pending, &input), "a\u{FFFD}b");
        assert_eq!(decode_utf8(&mut pending, &euro[2..]), "€");
    }
}
