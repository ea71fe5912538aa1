//! Line diff between a device configuration and a reference text.
//!
//! The comparison is purely textual. Lines are compared as the device
//! printed them, so reordered or reformatted commands show up as changes.

use std::fmt;

use sha2::{Digest, Sha256};
use similar::{ChangeTag, TextDiff};

/// How a line relates the device config to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffTag {
    /// Present in both.
    Equal,
    /// Only on the device.
    Removed,
    /// Only in the reference.
    Added,
}

impl DiffTag {
    fn prefix(self) -> &'static str {
        match self {
            DiffTag::Equal => "  ",
            DiffTag::Removed => "- ",
            DiffTag::Added => "+ ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub tag: DiffTag,
    pub text: String,
}

/// Ordered result of [`compare`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiff {
    pub lines: Vec<DiffLine>,
}

impl ConfigDiff {
    /// Lines the reference has and the device lacks.
    pub fn additions(&self) -> impl Iterator<Item = &DiffLine> {
        self.lines.iter().filter(|l| l.tag == DiffTag::Added)
    }

    /// Lines the device has and the reference lacks.
    pub fn removals(&self) -> impl Iterator<Item = &DiffLine> {
        self.lines.iter().filter(|l| l.tag == DiffTag::Removed)
    }

    pub fn is_identical(&self) -> bool {
        self.lines.iter().all(|l| l.tag == DiffTag::Equal)
    }

    /// Renders every line with a two-character marker: `"  "`, `"- "` or `"+ "`.
    ///
    /// Only whole lines are compared, so there are no `"? "` hint lines
    /// pointing at the changed characters.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConfigDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}{}", line.tag.prefix(), line.text)?;
        }
        Ok(())
    }
}

/// Diffs `device_config` against `reference` line by line.
///
/// Both texts are split on line endings (`\n` or `\r\n`), so a missing
/// final newline does not count as a change.
pub fn compare(device_config: &str, reference: &str) -> ConfigDiff {
    let old: Vec<&str> = device_config.lines().collect();
    let new: Vec<&str> = reference.lines().collect();
    let diff = TextDiff::from_slices(&old[..], &new[..]);

    let lines = diff
        .iter_all_changes()
        .map(|change| DiffLine {
            tag: match change.tag() {
                ChangeTag::Equal => DiffTag::Equal,
                ChangeTag::Delete => DiffTag::Removed,
                ChangeTag::Insert => DiffTag::Added,
            },
            text: change.value().to_string(),
        })
        .collect();
    ConfigDiff { lines }
}

/// A running configuration as retrieved from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub text: String,
    /// Hex SHA-256 of `text`.
    pub fingerprint: String,
}

impl ConfigSnapshot {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let fingerprint = fingerprint(&text);
        Self { text, fingerprint }
    }

    /// First 12 hex digits, enough to tell snapshots apart in logs.
    pub fn short_fingerprint(&self) -> &str {
        self.fingerprint.get(..12).unwrap_or(&self.fingerprint)
    }
}

fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNNING: &str = "hostname R1\n!\nservice password-encryption\nip http server\n!\nend\n";

    #[test]
    fn identical_configs_have_no_additions_or_removals() {
        let diff = compare(RUNNING, RUNNING);

        assert!(diff.is_identical());
        assert_eq!(diff.additions().count(), 0);
        assert_eq!(diff.removals().count(), 0);
        assert_eq!(diff.lines.len(), 6);
    }

    #[test]
    fn missing_and_extra_lines_are_tagged() {
        let reference = "hostname R1\n!\nservice password-encryption\nno ip http server\n!\nend\n";
        let diff = compare(RUNNING, reference);

        let removed: Vec<_> = diff.removals().map(|l| l.text.as_str()).collect();
        let added: Vec<_> = diff.additions().map(|l| l.text.as_str()).collect();
        assert_eq!(removed, vec!["ip http server"]);
        assert_eq!(added, vec!["no ip http server"]);
        assert!(!diff.is_identical());
    }

    #[test]
    fn line_endings_do_not_count_as_changes() {
        let crlf = RUNNING.replace('\n', "\r\n");
        assert!(compare(&crlf, RUNNING.trim_end()).is_identical());
    }

    #[test]
    fn render_uses_two_character_markers() {
        let diff = compare("a\nb\n", "a\nc\n");
        assert_eq!(diff.render(), "  a\n- b\n+ c\n");
    }

    #[test]
    fn empty_device_config_adds_every_reference_line() {
        let diff = compare("", "no ip http server\nservice password-encryption\n");
        assert_eq!(diff.additions().count(), 2);
        assert_eq!(diff.removals().count(), 0);
    }

    #[test]
    fn snapshot_fingerprint_is_sha256_hex() {
        let snapshot = ConfigSnapshot::new("");
        assert_eq!(
            snapshot.fingerprint,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(snapshot.short_fingerprint(), "e3b0c44298fc");
        assert_ne!(ConfigSnapshot::new("a").fingerprint, snapshot.fingerprint);
    }

    #[test]
    fn edited_line_renders_as_removal_then_addition() {
        let rendered = compare("hostname R1\nend\n", "hostname R2\nend\n").render();

        assert_eq!(rendered, "- hostname R1\n+ hostname R2\n  end\n");
        assert!(rendered.lines().all(|line| !line.starts_with("? ")));
    }
}
