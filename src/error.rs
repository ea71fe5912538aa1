//! Error types for device sessions, settings, and menu operations.
//!
//! `ConnectError` covers everything that can go wrong between opening a
//! transport and reading the last prompt. `SettingsError` covers loading the
//! device profile. `OpsError` is what a menu operation hands back to the loop.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

/// Errors that can occur during connection and device state management.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The target state cannot be reached from the current state.
    #[error("unreachable state {0}")]
    UnreachableState(String),

    /// The channel was disconnected while waiting for a prompt.
    ///
    /// This typically happens when the remote device closes the connection
    /// during login or in the middle of a command.
    #[error("channel disconnect on wait prompt")]
    ChannelDisconnectError,

    /// The connection has already been closed.
    #[error("connect closed")]
    ConnectClosedError,

    /// No prompt was seen before the connect timeout expired.
    ///
    /// Carries whatever the device printed so far.
    #[error("timed out waiting for initial prompt: {0}")]
    InitTimeout(String),

    /// Command execution timed out.
    ///
    /// The error contains the partial output received before the timeout.
    #[error("exec command timeout: {0}")]
    ExecTimeout(String),

    /// The device asked for credentials again after rejecting the ones sent.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Privileged mode could not be entered (wrong secret, no enable edge, ...).
    #[error("failed to enter enable mode: {0}")]
    EnableFailed(String),

    /// A device handler was built from an invalid configuration.
    #[error("invalid device handler config: {0}")]
    InvalidDeviceHandlerConfig(String),

    /// No template is registered for the requested device type.
    #[error("device type not supported: {0}")]
    TemplateNotFound(String),

    /// The TCP or SSH handshake did not finish within the connect timeout.
    #[error("connect to {addr} timed out")]
    ConnectTimeout { addr: String },

    #[error("internal error: {0}")]
    InternalServerError(String),

    /// An error occurred in the async-ssh2-tokio library.
    #[error("async ssh2 error: {0}")]
    Ssh2Error(#[from] async_ssh2_tokio::Error),

    /// An error occurred in the russh library.
    #[error("russh error: {0}")]
    RusshError(#[from] russh::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to send data through the channel.
    #[error("Failed to send data: {0}")]
    SendDataError(#[from] SendError<String>),
}

/// Errors raised while loading or validating settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Errors returned by the menu operations.
#[derive(Error, Debug)]
pub enum OpsError {
    /// The ACL command file does not exist.
    ///
    /// This is the only failure the menu reports with its own wording.
    #[error("ACL file {} not found", .0.display())]
    AclFileNotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open event log {}: {source}", path.display())]
    EventLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
