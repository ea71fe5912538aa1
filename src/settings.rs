//! Device profile and operation parameters.
//!
//! Settings come from a JSON file when one is present; every field has a
//! default, so a partial file only overrides what it names. Credentials can
//! also be supplied through `ROUTERCTL_PASSWORD` / `ROUTERCTL_SECRET` so
//! they need not sit in the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::templates::BUILTIN_DEVICE_TYPES;
use crate::transport::SecurityLevel;

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "ROUTERCTL_CONFIG";
pub const PASSWORD_ENV: &str = "ROUTERCTL_PASSWORD";
pub const SECRET_ENV: &str = "ROUTERCTL_SECRET";
/// Settings file looked up in the working directory when `ROUTERCTL_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "routerctl.json";

/// Diffie-Hellman groups IOS accepts in an ISAKMP policy.
const SUPPORTED_DH_GROUPS: &[u8] = &[1, 2, 5, 14, 15, 16, 19, 20, 21, 24];

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Settings {
    pub device: DeviceProfile,
    pub ipsec: IpsecSettings,
    pub logging: LoggingSettings,
    pub hardening: HardeningSettings,
}

/// How to reach and log in to the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DeviceProfile {
    /// Template name, e.g. `cisco_ios` (SSH) or `cisco_ios_telnet`.
    pub device_type: String,
    pub host: String,
    pub ssh_port: u16,
    pub telnet_port: u16,
    pub username: String,
    pub password: String,
    /// Enable secret.
    pub secret: String,
    /// Per-command timeout in seconds.
    pub timeout_secs: u64,
    /// Connect and login timeout in seconds.
    pub connect_timeout_secs: u64,
    pub security: SecurityLevel,
    /// Verify the SSH host key against the known-hosts file.
    pub strict_host_key_checking: bool,
    /// Known-hosts file to use instead of `~/.ssh/known_hosts`.
    pub known_hosts_file: Option<PathBuf>,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            device_type: "cisco_ios".to_string(),
            host: "192.168.56.101".to_string(),
            ssh_port: 22,
            telnet_port: 23,
            username: "prne".to_string(),
            password: "cisco123!".to_string(),
            secret: "class123!".to_string(),
            timeout_secs: 60,
            connect_timeout_secs: 30,
            security: SecurityLevel::Balanced,
            strict_host_key_checking: false,
            known_hosts_file: None,
        }
    }
}

impl DeviceProfile {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// IKE phase 1 policy, pre-shared key, and crypto map parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IpsecSettings {
    /// ISAKMP policy priority; lower numbers are tried first.
    pub isakmp_policy: u16,
    pub encryption: String,
    pub hash: String,
    pub authentication: String,
    pub dh_group: u8,
    /// SA lifetime in seconds.
    pub lifetime_secs: u32,
    pub shared_key: String,
    /// Peer address the pre-shared key is bound to.
    pub key_address: String,
    pub crypto_map: String,
    pub crypto_map_seq: u16,
    pub peer: String,
    pub transform_set: String,
    /// ACL selecting the traffic to protect.
    pub match_address: String,
}

impl Default for IpsecSettings {
    fn default() -> Self {
        Self {
            isakmp_policy: 10,
            encryption: "aes-256".to_string(),
            hash: "sha256".to_string(),
            authentication: "pre-share".to_string(),
            dh_group: 14,
            lifetime_secs: 28800,
            shared_key: "Th3cra!c$f@rfr0mm!ghty".to_string(),
            key_address: "0.0.0.0".to_string(),
            crypto_map: "VPN_MAP".to_string(),
            crypto_map_seq: 10,
            peer: "0.0.0.0".to_string(),
            transform_set: "myset".to_string(),
            match_address: "100".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingSettings {
    /// File the event log is appended to once enabled from the menu.
    pub event_log_path: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            event_log_path: PathBuf::from("syslog_events_monitoring.txt"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct HardeningSettings {
    /// Baseline to compare against; the built-in IOS baseline when unset.
    pub baseline_path: Option<PathBuf>,
}

impl Settings {
    /// Loads settings from `ROUTERCTL_CONFIG`, `./routerctl.json`, or defaults,
    /// then applies credential overrides from the environment.
    pub fn load() -> Result<Settings, SettingsError> {
        let mut settings = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No settings file found, using defaults");
                Settings::default()
            }
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Reads a JSON settings file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Settings, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_json(text: &str) -> Result<Settings, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Replaces credentials with values found by `lookup` (the environment in production).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(password) = lookup(PASSWORD_ENV) {
            self.device.password = password;
        }
        if let Some(secret) = lookup(SECRET_ENV) {
            self.device.secret = secret;
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let device = &self.device;
        if device.host.trim().is_empty() {
            return Err(SettingsError::Invalid("device.host is empty".to_string()));
        }
        if device.username.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "device.username is empty".to_string(),
            ));
        }
        let device_type = device.device_type.to_ascii_lowercase();
        if !BUILTIN_DEVICE_TYPES.contains(&device_type.as_str()) {
            return Err(SettingsError::Invalid(format!(
                "device.device_type '{}' is not one of {:?}",
                device.device_type, BUILTIN_DEVICE_TYPES
            )));
        }
        if device.timeout_secs == 0 || device.connect_timeout_secs == 0 {
            return Err(SettingsError::Invalid(
                "device timeouts must be at least one second".to_string(),
            ));
        }
        if !(1..=10000).contains(&self.ipsec.isakmp_policy) {
            return Err(SettingsError::Invalid(format!(
                "ipsec.isakmp_policy {} is outside 1..=10000",
                self.ipsec.isakmp_policy
            )));
        }
        if !SUPPORTED_DH_GROUPS.contains(&self.ipsec.dh_group) {
            return Err(SettingsError::Invalid(format!(
                "ipsec.dh_group {} is not supported",
                self.ipsec.dh_group
            )));
        }
        if self.ipsec.crypto_map.contains(char::is_whitespace) {
            return Err(SettingsError::Invalid(
                "ipsec.crypto_map must be a single word".to_string(),
            ));
        }
        Ok(())
    }
}

/// JSON Schema of the settings file, pretty-printed.
pub fn settings_schema_json() -> Result<String, SettingsError> {
    let schema = schemars::schema_for!(Settings);
    serde_json::to_string_pretty(&schema)
        .map_err(|e| SettingsError::Invalid(format!("encode settings schema: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_describe_the_lab_router() {
        let settings = Settings::default();

        assert_eq!(settings.device.device_type, "cisco_ios");
        assert_eq!(settings.device.host, "192.168.56.101");
        assert_eq!(settings.device.ssh_port, 22);
        assert_eq!(settings.ipsec.isakmp_policy, 10);
        assert_eq!(settings.ipsec.crypto_map, "VPN_MAP");
        assert_eq!(
            settings.logging.event_log_path,
            PathBuf::from("syslog_events_monitoring.txt")
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let settings = Settings::from_json(
            r#"{"device": {"host": "10.0.0.1", "security": "legacy_compatible"},
                "ipsec": {"crypto_map": "BRANCH"}}"#,
        )
        .unwrap();

        assert_eq!(settings.device.host, "10.0.0.1");
        assert_eq!(settings.device.security, SecurityLevel::LegacyCompatible);
        assert_eq!(settings.device.username, "prne");
        assert_eq!(settings.ipsec.crypto_map, "BRANCH");
        assert_eq!(settings.ipsec.isakmp_policy, 10);
    }

    #[test]
    fn from_file_reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        match Settings::from_file(file.path()) {
            Err(SettingsError::Parse { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn from_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");

        assert!(matches!(
            Settings::from_file(&missing),
            Err(SettingsError::Read { .. })
        ));
    }

    #[test]
    fn env_overrides_replace_credentials() {
        let mut settings = Settings::default();
        settings.apply_env_overrides(|key| match key {
            PASSWORD_ENV => Some("from-env".to_string()),
            _ => None,
        });

        assert_eq!(settings.device.password, "from-env");
        assert_eq!(settings.device.secret, "class123!");
    }

    #[test]
    fn validate_rejects_unknown_device_type_and_bad_ipsec() {
        let mut settings = Settings::default();
        settings.device.device_type = "juniper_junos".to_string();
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));

        let mut settings = Settings::default();
        settings.ipsec.isakmp_policy = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.ipsec.dh_group = 3;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.ipsec.crypto_map = "VPN MAP".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn schema_lists_top_level_sections() {
        let schema = settings_schema_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&schema).unwrap();
        let properties = value["properties"].as_object().unwrap();

        for section in ["device", "ipsec", "logging", "hardening"] {
            assert!(properties.contains_key(section), "missing {section}");
        }
    }
}
