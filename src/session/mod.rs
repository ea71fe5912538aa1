//! Interactive CLI sessions and command execution.
//!
//! A [`DeviceSession`] wraps one login on one device. It writes commands,
//! reads until the device shows a prompt again, answers password and pager
//! prompts on the way, and moves between CLI modes using the handler's
//! transition graph. Sessions are not shared or cached: every operation
//! opens one, uses it, and closes it.
//!
//! # Main Components
//!
//! - [`DeviceSession`] - One CLI login with state tracking
//! - [`Command`] - Command configuration for device execution
//! - [`Output`] - Command execution results

use std::time::Duration;

use log::{debug, trace, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{Receiver, Sender};

use crate::device::{DeviceHandler, IGNORE_START_LINE};
use crate::error::ConnectError;
use crate::settings::DeviceProfile;
use crate::templates::{self, PASSWORD_PARAM, USERNAME_PARAM, mode};
use crate::transport::{ShellChannels, Transport, ssh, telnet};

/// Per-command timeout used when the caller does not pick one.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// One interactive CLI session with state machine tracking.
pub struct DeviceSession {
    channels: ShellChannels,
    handler: DeviceHandler,
    /// Last prompt text seen.
    prompt: String,
    /// `user@host:port`, used in log lines.
    device_addr: String,
    command_timeout: Duration,
}

/// Configuration for a command to execute on a device.
#[derive(Default, Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Command {
    /// Mode the command must run in, e.g. "login", "enable", "config".
    /// Empty means "wherever the session currently is".
    pub mode: String,

    /// The actual command content to execute on the device
    pub command: String,

    /// Single command timeout (seconds).
    /// If None, the session's command timeout applies.
    pub timeout: Option<u64>,
}

/// The output result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    /// No error line was seen and the expected prompt came back.
    pub success: bool,
    /// Device output without the command echo and the trailing prompt.
    pub content: String,
    /// Everything printed, including echo and prompts.
    pub all: String,
    /// Prompt captured by the state machine after command execution.
    pub prompt: Option<String>,
}

mod client;
