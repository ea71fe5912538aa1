//! Reference configuration the running config is compared against.

use std::fs;

use log::debug;

use crate::error::OpsError;
use crate::settings::HardeningSettings;

/// Cisco IOS hardening baseline used when no baseline file is configured.
///
/// Lines are written the way `show running-config` prints them so that a
/// compliant device diffs cleanly on these lines.
pub const BUILTIN_IOS_BASELINE: &str = "\
service timestamps debug datetime msec localtime show-timezone
service timestamps log datetime msec localtime show-timezone
service password-encryption
no service pad
no service tcp-small-servers
no service udp-small-servers
no service finger
!
logging buffered 16384 informational
logging console critical
!
no ip source-route
no ip bootp server
no ip http server
no ip http secure-server
no ip domain lookup
ip ssh version 2
ip ssh time-out 60
ip ssh authentication-retries 3
!
login block-for 120 attempts 3 within 60
login on-failure log
login on-success log
!
banner motd ^C Authorized access only. ^C
!
line con 0
 exec-timeout 5 0
 logging synchronous
line vty 0 4
 exec-timeout 10 0
 transport input ssh
!
";

/// Returns the configured baseline file's contents, or the built-in one.
pub fn load_baseline(settings: &HardeningSettings) -> Result<String, OpsError> {
    let Some(path) = &settings.baseline_path else {
        return Ok(BUILTIN_IOS_BASELINE.to_string());
    };
    let text = fs::read_to_string(path).map_err(|source| OpsError::ReadFile {
        path: path.clone(),
        source,
    })?;
    debug!("Loaded hardening baseline from {}", path.display());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_baseline_is_used_without_a_path() {
        let baseline = load_baseline(&HardeningSettings::default()).unwrap();

        assert_eq!(baseline, BUILTIN_IOS_BASELINE);
        assert!(baseline.lines().any(|l| l == "no ip http server"));
        assert!(baseline.lines().any(|l| l == " transport input ssh"));
    }

    #[test]
    fn baseline_file_replaces_builtin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "service password-encryption").unwrap();

        let settings = HardeningSettings {
            baseline_path: Some(file.path().to_path_buf()),
        };
        assert_eq!(
            load_baseline(&settings).unwrap(),
            "service password-encryption\n"
        );
    }

    #[test]
    fn missing_baseline_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = HardeningSettings {
            baseline_path: Some(dir.path().join("baseline.cfg")),
        };

        assert!(matches!(
            load_baseline(&settings),
            Err(OpsError::ReadFile { .. })
        ));
    }
}
