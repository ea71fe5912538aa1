//! The operations behind the menu entries.
//!
//! Every operation opens its own session, does one thing, and closes the
//! session again, whether the work succeeded or not. Command lists are
//! built by plain functions so they can be checked without a device.

use std::fs;
use std::io;
use std::path::Path;

use log::{info, warn};

use crate::diff::{self, ConfigDiff, ConfigSnapshot};
use crate::error::{ConnectError, OpsError};
use crate::event_log;
use crate::hardening;
use crate::session::{DeviceSession, Output};
use crate::settings::{IpsecSettings, Settings};
use crate::templates;
use crate::transport::Transport;

/// Comment line sent to confirm an SSH login works end to end.
pub const SSH_MARKER: &str = "! SSH Connection established.";
/// Comment line sent to confirm a Telnet login works end to end.
pub const TELNET_MARKER: &str = "! Telnet connection established.";

pub fn hostname_commands(new_hostname: &str) -> Vec<String> {
    vec![format!("hostname {}", new_hostname.trim())]
}

/// ISAKMP policy, pre-shared key, and crypto map blocks, in that order.
pub fn ipsec_commands(ipsec: &IpsecSettings) -> Vec<String> {
    vec![
        format!("crypto isakmp policy {}", ipsec.isakmp_policy),
        format!("encryption {}", ipsec.encryption),
        format!("hash {}", ipsec.hash),
        format!("authentication {}", ipsec.authentication),
        format!("group {}", ipsec.dh_group),
        format!("lifetime {}", ipsec.lifetime_secs),
        format!(
            "crypto isakmp key {} address {}",
            ipsec.shared_key, ipsec.key_address
        ),
        format!(
            "crypto map {} {} ipsec-isakmp",
            ipsec.crypto_map, ipsec.crypto_map_seq
        ),
        format!("set peer {}", ipsec.peer),
        format!("set transform-set {}", ipsec.transform_set),
        format!("match address {}", ipsec.match_address),
    ]
}

/// One config line per non-blank line. Indentation is kept for sub-mode lines.
pub fn parse_acl_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads an ACL command file.
///
/// # Errors
///
/// `AclFileNotFound` when the path does not exist; `ReadFile` for any other
/// I/O problem.
pub fn read_acl_file(path: &Path) -> Result<Vec<String>, OpsError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_acl_lines(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(OpsError::AclFileNotFound(path.to_path_buf()))
        }
        Err(source) => Err(OpsError::ReadFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub struct DeviceOps {
    settings: Settings,
}

impl DeviceOps {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Transport for configuration work: whatever the device type implies.
    fn config_transport(&self) -> Result<Transport, ConnectError> {
        templates::default_transport(&self.settings.device.device_type)
    }

    async fn open(&self, transport: Transport) -> Result<DeviceSession, ConnectError> {
        info!(
            "Connecting to {} over {}",
            self.settings.device.host, transport
        );
        DeviceSession::open(&self.settings.device, transport).await
    }

    /// Enables, pushes `commands` from config mode, and closes the session.
    async fn push_config(&self, commands: &[String]) -> Result<Output, OpsError> {
        let mut session = self.open(self.config_transport()?).await?;
        let result = async {
            session.enable().await?;
            session.send_config_set(commands).await
        }
        .await;
        session.close().await;
        let output = result?;
        if !output.success {
            warn!(
                "{} rejected part of the configuration",
                self.settings.device.host
            );
        }
        Ok(output)
    }

    pub async fn change_hostname(&self, new_hostname: &str) -> Result<Output, OpsError> {
        let output = self.push_config(&hostname_commands(new_hostname)).await?;
        info!("Hostname changed to {}", new_hostname.trim());
        Ok(output)
    }

    /// Logs in over SSH, enters enable mode, and sends a comment line.
    pub async fn connect_ssh(&self) -> Result<Output, OpsError> {
        let mut session = self.open(Transport::Ssh).await?;
        let result = async {
            session.enable().await?;
            session.send_command(SSH_MARKER).await
        }
        .await;
        session.close().await;
        let output = result?;
        info!("SSH connection to {} verified", self.settings.device.host);
        Ok(output)
    }

    /// Logs in over Telnet and sends a comment line.
    pub async fn connect_telnet(&self) -> Result<Output, OpsError> {
        let mut session = self.open(Transport::Telnet).await?;
        let result = session.send_command(TELNET_MARKER).await;
        session.close().await;
        let output = result?;
        info!("Telnet connection to {} verified", self.settings.device.host);
        Ok(output)
    }

    pub async fn running_config(&self) -> Result<ConfigSnapshot, OpsError> {
        let mut session = self.open(self.config_transport()?).await?;
        let result = async {
            session.enable().await?;
            session.send_command("show running-config").await
        }
        .await;
        session.close().await;
        let output = result?;
        if !output.success {
            warn!("show running-config reported an error");
        }
        let snapshot = ConfigSnapshot::new(output.content);
        info!(
            "Retrieved running configuration ({} bytes, sha256 {})",
            snapshot.text.len(),
            snapshot.short_fingerprint()
        );
        Ok(snapshot)
    }

    /// Diffs `device_config` against the hardening baseline.
    pub fn compare_with_baseline(&self, device_config: &str) -> Result<ConfigDiff, OpsError> {
        let baseline = hardening::load_baseline(&self.settings.hardening)?;
        let diff = diff::compare(device_config, &baseline);
        info!(
            "Compared configuration with baseline: {} missing, {} extra",
            diff.additions().count(),
            diff.removals().count()
        );
        Ok(diff)
    }

    /// Starts the event log file. Returns false if it was already running.
    pub fn enable_event_logging(&self) -> Result<bool, OpsError> {
        let path = &self.settings.logging.event_log_path;
        let newly_enabled = event_log::init()
            .enable_file(path)
            .map_err(|source| OpsError::EventLog {
                path: path.clone(),
                source,
            })?;
        if newly_enabled {
            info!("Event logging enabled");
        }
        Ok(newly_enabled)
    }

    /// Pushes the commands in `path`. The file is read before connecting.
    pub async fn apply_acl(&self, path: &Path) -> Result<Output, OpsError> {
        let commands = read_acl_file(path)?;
        let output = self.push_config(&commands).await?;
        info!(
            "Applied {} ACL lines from {}",
            commands.len(),
            path.display()
        );
        Ok(output)
    }

    pub async fn configure_ipsec(&self) -> Result<Output, OpsError> {
        let output = self
            .push_config(&ipsec_commands(&self.settings.ipsec))
            .await?;
        info!(
            "IPsec policy {} and crypto map {} configured",
            self.settings.ipsec.isakmp_policy, self.settings.ipsec.crypto_map
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hostname_command_trims_input() {
        assert_eq!(hostname_commands("  LAB-R1 \n"), vec!["hostname LAB-R1"]);
    }

    #[test]
    fn ipsec_commands_follow_policy_key_map_order() {
        let commands = ipsec_commands(&IpsecSettings::default());

        assert_eq!(
            commands,
            vec![
                "crypto isakmp policy 10",
                "encryption aes-256",
                "hash sha256",
                "authentication pre-share",
                "group 14",
                "lifetime 28800",
                "crypto isakmp key Th3cra!c$f@rfr0mm!ghty address 0.0.0.0",
                "crypto map VPN_MAP 10 ipsec-isakmp",
                "set peer 0.0.0.0",
                "set transform-set myset",
                "match address 100",
            ]
        );
    }

    #[test]
    fn ipsec_commands_use_configured_values() {
        let ipsec = IpsecSettings {
            isakmp_policy: 20,
            crypto_map: "BRANCH".to_string(),
            peer: "203.0.113.1".to_string(),
            ..Default::default()
        };
        let commands = ipsec_commands(&ipsec);

        assert_eq!(commands[0], "crypto isakmp policy 20");
        assert_eq!(commands[7], "crypto map BRANCH 10 ipsec-isakmp");
        assert_eq!(commands[8], "set peer 203.0.113.1");
    }

    #[test]
    fn acl_lines_skip_blanks_and_keep_indentation() {
        let text = "ip access-list extended MGMT\r\n permit tcp any any eq 22\r\n\r\n deny ip any any log\n";

        assert_eq!(
            parse_acl_lines(text),
            vec![
                "ip access-list extended MGMT",
                " permit tcp any any eq 22",
                " deny ip any any log",
            ]
        );
    }

    #[test]
    fn missing_acl_file_is_distinguished() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acl.txt");

        match read_acl_file(&path) {
            Err(OpsError::AclFileNotFound(p)) => assert_eq!(p, path),
            other => panic!("expected AclFileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn acl_directory_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            read_acl_file(dir.path()),
            Err(OpsError::ReadFile { .. })
        ));
    }

    #[test]
    fn acl_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "access-list 100 permit ip any any").unwrap();

        assert_eq!(
            read_acl_file(file.path()).unwrap(),
            vec!["access-list 100 permit ip any any"]
        );
    }

    #[tokio::test]
    async fn apply_acl_fails_before_connecting_when_file_is_missing() {
        let mut settings = Settings::default();
        // Nothing listens here; reaching the network would fail differently.
        settings.device.host = "127.0.0.1".to_string();
        settings.device.ssh_port = 1;
        let ops = DeviceOps::new(settings);

        let err = ops
            .apply_acl(Path::new("/nonexistent/routerctl/acl.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::AclFileNotFound(_)));
    }

    #[test]
    fn empty_config_differs_from_builtin_baseline() {
        let ops = DeviceOps::new(Settings::default());

        let diff = ops.compare_with_baseline("").unwrap();
        assert_eq!(diff.removals().count(), 0);
        assert_eq!(
            diff.additions().count(),
            hardening::BUILTIN_IOS_BASELINE.lines().count()
        );
    }

    #[test]
    fn baseline_equal_config_has_no_differences() {
        let ops = DeviceOps::new(Settings::default());

        let diff = ops
            .compare_with_baseline(hardening::BUILTIN_IOS_BASELINE)
            .unwrap();
        assert!(diff.is_identical());
    }
}
