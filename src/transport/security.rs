use std::borrow::Cow;

use async_ssh2_tokio::ServerCheckMethod;
use russh::Preferred;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::settings::DeviceProfile;

/// Security level used for SSH algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    /// Strict modern algorithms.
    Secure,
    /// Good security with broader compatibility.
    Balanced,
    /// Maximum compatibility with legacy devices.
    LegacyCompatible,
}

/// Connection security options for SSH establishment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSecurityOptions {
    /// SSH algorithm policy.
    pub level: SecurityLevel,
    /// Server host key verification method.
    pub server_check: ServerCheckMethod,
}

impl ConnectionSecurityOptions {
    /// Options described by a device profile.
    ///
    /// Host keys are only checked when the profile asks for it; lab routers
    /// regenerate their keys on every `crypto key generate rsa`.
    pub fn from_profile(profile: &DeviceProfile) -> Self {
        let server_check = match (&profile.known_hosts_file, profile.strict_host_key_checking) {
            (_, false) => ServerCheckMethod::NoCheck,
            (Some(path), true) => {
                ServerCheckMethod::KnownHostsFile(path.to_string_lossy().into_owned())
            }
            (None, true) => ServerCheckMethod::DefaultKnownHostsFile,
        };
        Self {
            level: profile.security,
            server_check,
        }
    }

    pub(crate) fn preferred(&self) -> Preferred {
        match self.level {
            SecurityLevel::Secure => Preferred {
                kex: Cow::Borrowed(config::SECURE_KEX_ORDER),
                key: Cow::Borrowed(config::SECURE_KEY_TYPES),
                cipher: Cow::Borrowed(config::SECURE_CIPHERS),
                mac: Cow::Borrowed(config::SECURE_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
            SecurityLevel::Balanced => Preferred {
                kex: Cow::Borrowed(config::BALANCED_KEX_ORDER),
                key: Cow::Borrowed(config::BALANCED_KEY_TYPES),
                cipher: Cow::Borrowed(config::BALANCED_CIPHERS),
                mac: Cow::Borrowed(config::BALANCED_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
            SecurityLevel::LegacyCompatible => Preferred {
                kex: Cow::Borrowed(config::LEGACY_KEX_ORDER),
                key: Cow::Borrowed(config::LEGACY_KEY_TYPES),
                cipher: Cow::Borrowed(config::LEGACY_CIPHERS),
                mac: Cow::Borrowed(config::LEGACY_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
        }
    }
}
