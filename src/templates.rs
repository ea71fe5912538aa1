//! Predefined device templates.
//!
//! Factory functions that build a [`DeviceHandler`] for the device types the
//! tool understands, pre-configured with their prompts, error messages, and
//! mode transitions.

use crate::device::{
    DeviceHandler, HandlerConfig, InputState, PromptState, StateMachineDiagnostics, Transition,
};
use crate::error::ConnectError;
use crate::transport::Transport;

/// Device types with a built-in template.
pub const BUILTIN_DEVICE_TYPES: &[&str] = &["cisco_ios", "cisco_ios_telnet"];

/// Parameter key answered at `Username:` prompts.
pub const USERNAME_PARAM: &str = "Username";
/// Parameter key answered at `Password:` prompts (login password, then enable secret).
pub const PASSWORD_PARAM: &str = "Password";

/// CLI mode names used by the Cisco template.
pub mod mode {
    pub const LOGIN: &str = "login";
    pub const ENABLE: &str = "enable";
    pub const CONFIG: &str = "config";
}

/// Returns the handler for a device type (case-insensitive).
pub fn by_device_type(device_type: &str) -> Result<DeviceHandler, ConnectError> {
    match device_type.to_ascii_lowercase().as_str() {
        "cisco_ios" | "cisco_ios_telnet" => cisco_ios(),
        _ => Err(ConnectError::TemplateNotFound(device_type.to_string())),
    }
}

/// Transport a device type connects over unless the caller picks one.
pub fn default_transport(device_type: &str) -> Result<Transport, ConnectError> {
    match device_type.to_ascii_lowercase().as_str() {
        "cisco_ios" => Ok(Transport::Ssh),
        "cisco_ios_telnet" => Ok(Transport::Telnet),
        _ => Err(ConnectError::TemplateNotFound(device_type.to_string())),
    }
}

/// Builds a template by device type and runs state machine diagnostics on it.
pub fn diagnose_template(device_type: &str) -> Result<StateMachineDiagnostics, ConnectError> {
    Ok(by_device_type(device_type)?.diagnose())
}

/// Returns a `DeviceHandler` configured for Cisco IOS/IOS-XE devices.
///
/// Works for both SSH and Telnet: the `Username:`/`Password:` inputs only
/// fire when the device asks, which over SSH happens only for `enable`.
pub fn cisco_ios() -> Result<DeviceHandler, ConnectError> {
    DeviceHandler::new(HandlerConfig {
        prompts: vec![
            // Covers sub-modes too: (config-if)#, (config-isakmp)#, (config-crypto-map)#
            PromptState::new(mode::CONFIG, &[r"^[^\s#>]+\([\w.-]+\)#\s*$"]),
            PromptState::new(mode::ENABLE, &[r"^[^\s#>()]+#\s*$"]),
            PromptState::new(mode::LOGIN, &[r"^[^\s#>()]+>\s*$"]),
        ],
        inputs: vec![
            InputState::param(
                USERNAME_PARAM,
                USERNAME_PARAM,
                &[r"^\x00*\r?(User Access Verification\s*)?(Username|Login|login):\s*$"],
            ),
            InputState::param(
                PASSWORD_PARAM,
                PASSWORD_PARAM,
                &[r"^\x00*\r?(Enable )?[Pp]assword:\s*$"],
            ),
        ],
        more_patterns: vec![r"^\s*-+\s*More\s*-+\s*$".to_string()],
        error_patterns: [
            r"^% ?Invalid input detected at '\^' marker\.",
            r"^% ?Incomplete command\.",
            r"^% ?Ambiguous command",
            r"^% ?Unknown command",
            r"^% ?Bad secrets",
            r"^% ?Access denied",
            r"^% ?Authentication failed",
            r"^% ?Login invalid",
            r"^\s*\^\s*$",
            r"^%.+",
            r"^Command authorization failed.*",
            r"^Command rejected:.*",
            r"^ERROR:.+",
        ]
        .iter()
        .map(|p| p.to_string())
        .collect(),
        // Informational syslog-style notices IOS prints with a leading '%'.
        ignore_errors: vec![
            r"^%SYS-\d-CONFIG_I".to_string(),
            r"^%LINK-\d-UPDOWN".to_string(),
            r"^%LINEPROTO-\d-UPDOWN".to_string(),
            r"^% Warning:".to_string(),
            r"^% NOTE:".to_string(),
        ],
        transitions: vec![
            Transition::enter(mode::LOGIN, "enable", mode::ENABLE),
            Transition::enter(mode::ENABLE, "configure terminal", mode::CONFIG),
            Transition::exit(mode::CONFIG, "end", mode::ENABLE),
            Transition::exit(mode::ENABLE, "disable", mode::LOGIN),
        ],
        ..Default::default()
    })
}
