//! Minimal telnet client transport.
//!
//! Only as much of RFC 854/855 as a router's vty line needs: the server may
//! echo and suppress go-ahead, every other option is refused, and
//! subnegotiations are skipped.

use log::{debug, trace};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use super::{CHANNEL_CAPACITY, ShellChannels, decode_utf8};
use crate::error::ConnectError;
use crate::settings::DeviceProfile;

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParseState {
    #[default]
    Data,
    /// Saw IAC in the data stream.
    Iac,
    /// Saw IAC WILL/WONT/DO/DONT, waiting for the option byte.
    Negotiate(u8),
    /// Inside IAC SB ... IAC SE.
    Sub,
    SubIac,
}

/// Incremental telnet stream decoder.
///
/// Command sequences may be split across reads, so the parse state carries
/// over between calls to [`TelnetCodec::decode`].
#[derive(Debug, Default)]
pub(crate) struct TelnetCodec {
    state: ParseState,
    last_was_cr: bool,
}

impl TelnetCodec {
    /// Splits raw bytes into payload (appended to `data`) and the
    /// negotiation replies owed to the server (appended to `replies`).
    pub(crate) fn decode(&mut self, input: &[u8], data: &mut Vec<u8>, replies: &mut Vec<u8>) {
        for &byte in input {
            self.state = match self.state {
                ParseState::Data => {
                    if byte == IAC {
                        ParseState::Iac
                    } else {
                        // NVT sends a bare CR as CR NUL.
                        if !(byte == 0 && self.last_was_cr) {
                            data.push(byte);
                        }
                        self.last_was_cr = byte == b'\r';
                        ParseState::Data
                    }
                }
                ParseState::Iac => match byte {
                    IAC => {
                        data.push(IAC);
                        self.last_was_cr = false;
                        ParseState::Data
                    }
                    WILL | WONT | DO | DONT => ParseState::Negotiate(byte),
                    SB => ParseState::Sub,
                    // NOP, GA, and friends carry no payload.
                    _ => ParseState::Data,
                },
                ParseState::Negotiate(command) => {
                    if let Some(reply) = negotiation_reply(command, byte) {
                        trace!("telnet reply {:?} to {} {}", reply, command, byte);
                        replies.extend_from_slice(&reply);
                    }
                    ParseState::Data
                }
                ParseState::Sub => {
                    if byte == IAC {
                        ParseState::SubIac
                    } else {
                        ParseState::Sub
                    }
                }
                ParseState::SubIac => {
                    if byte == SE {
                        ParseState::Data
                    } else {
                        ParseState::Sub
                    }
                }
            };
        }
    }

    /// Encodes session text for the wire: `\n` becomes CR LF.
    ///
    /// UTF-8 never contains 0xFF, so there is no IAC to escape.
    pub(crate) fn encode(text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() + 2);
        for &byte in text.as_bytes() {
            if byte == b'\n' {
                out.extend_from_slice(b"\r\n");
            } else {
                out.push(byte);
            }
        }
        out
    }
}

/// Server offers to echo or suppress go-ahead: accept. Anything else: refuse.
/// WONT/DONT need no acknowledgement.
fn negotiation_reply(command: u8, option: u8) -> Option<[u8; 3]> {
    match command {
        WILL if option == OPT_ECHO || option == OPT_SGA => Some([IAC, DO, option]),
        WILL => Some([IAC, DONT, option]),
        DO => Some([IAC, WONT, option]),
        _ => None,
    }
}

/// Connects to the telnet port and starts the I/O task.
pub(crate) async fn open_shell(profile: &DeviceProfile) -> Result<ShellChannels, ConnectError> {
    let addr = format!("{}:{}", profile.host, profile.telnet_port);
    let stream = tokio::time::timeout(
        profile.connect_timeout(),
        TcpStream::connect((profile.host.as_str(), profile.telnet_port)),
    )
    .await
    .map_err(|_| ConnectError::ConnectTimeout { addr: addr.clone() })??;
    stream.set_nodelay(true)?;
    debug!("{} Telnet TCP connection successful", addr);

    let (mut reader, mut writer) = stream.into_split();
    let (sender_to_shell, mut receiver_from_user) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (sender_to_user, receiver_from_shell) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut codec = TelnetCodec::default();
        let mut buf = [0u8; 4096];
        let mut data = Vec::new();
        let mut replies = Vec::new();
        let mut pending = Vec::new();
        loop {
            tokio::select! {
                text = receiver_from_user.recv() => {
                    let Some(text) = text else {
                        debug!("{} Session dropped, closing socket.", addr);
                        let _ = writer.shutdown().await;
                        break;
                    };
                    if let Err(e) = writer.write_all(&TelnetCodec::encode(&text)).await {
                        debug!("{} Failed to send data: {:?}", addr, e);
                        break;
                    }
                },
                read = reader.read(&mut buf) => {
                    let n = match read {
                        Ok(0) => {
                            debug!("{} Telnet peer closed the connection.", addr);
                            break;
                        }
                        Ok(n) => n,
                        Err(e) => {
                            debug!("{} Telnet read failed: {:?}", addr, e);
                            break;
                        }
                    };
                    data.clear();
                    replies.clear();
                    codec.decode(&buf[..n], &mut data, &mut replies);
                    if !replies.is_empty() && writer.write_all(&replies).await.is_err() {
                        break;
                    }
                    let text = decode_utf8(&mut pending, &data);
                    if !text.is_empty() && sender_to_user.send(text).await.is_err() {
                        debug!("{} Output receiver dropped. Closing task.", addr);
                        break;
                    }
                }
            }
        }
        debug!("{} Telnet I/O task ended.", addr);
    });

    Ok(ShellChannels::new(sender_to_shell, receiver_from_shell))
}
