//! Interactive numeric menu.
//!
//! Reads one choice per line, runs the matching operation, prints its result
//! or error, and shows the menu again. Only `0` or the end of input stops it.

use std::io::{self, Write};
use std::path::Path;

use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::OpsError;
use crate::ops::DeviceOps;
use crate::session::Output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    ChangeHostname,
    ConnectSsh,
    ConnectTelnet,
    RunningConfig,
    CompareConfig,
    EventLogging,
    ApplyAcl,
    ConfigureIpsec,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<MenuChoice> {
        let choice = match input.trim() {
            "1" => MenuChoice::ChangeHostname,
            "2" => MenuChoice::ConnectSsh,
            "3" => MenuChoice::ConnectTelnet,
            "4" => MenuChoice::RunningConfig,
            "5" => MenuChoice::CompareConfig,
            "6" => MenuChoice::EventLogging,
            "7" => MenuChoice::ApplyAcl,
            "8" => MenuChoice::ConfigureIpsec,
            "0" => MenuChoice::Exit,
            _ => return None,
        };
        Some(choice)
    }
}

const MENU: &str = "\nMain Menu:
1. Change Hostname
2. Establish SSH Connection
3. Establish Telnet Connection
4. Retrieve Running Configuration
5. Compare Configurations
6. Configure Event Logging
7. Apply ACL Configuration
8. Configure IPsec
0. Exit";

/// Prints `prompt` and reads one line without its line ending.
/// `None` at end of input.
async fn ask<R, W>(input: &mut R, out: &mut W, prompt: &str) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "{prompt}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn print_config_output<W: Write>(out: &mut W, heading: &str, output: &Output) -> io::Result<()> {
    writeln!(out, "{heading}")?;
    writeln!(out, "{}", output.all)?;
    if !output.success {
        writeln!(out, "Warning: the device rejected one or more commands.")?;
    }
    Ok(())
}

/// Runs the menu until the user picks `0` or `input` is exhausted.
///
/// Operation failures are printed and the loop goes on; only I/O errors on
/// `input` or `out` end it early.
pub async fn run_menu<R, W>(ops: &DeviceOps, input: &mut R, out: &mut W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        writeln!(out, "{MENU}")?;
        let Some(line) = ask(input, out, "Enter your choice: ").await? else {
            debug!("End of input, leaving menu");
            writeln!(out)?;
            return Ok(());
        };
        let Some(choice) = MenuChoice::parse(&line) else {
            writeln!(out, "Invalid choice. Please try again.")?;
            continue;
        };
        debug!("Menu choice {:?}", choice);

        match choice {
            MenuChoice::ChangeHostname => {
                let Some(hostname) = ask(input, out, "Enter new hostname: ").await? else {
                    return Ok(());
                };
                match ops.change_hostname(&hostname).await {
                    Ok(output) => print_config_output(out, "Hostname changed successfully:", &output)?,
                    Err(e) => writeln!(out, "Error changing hostname: {e}")?,
                }
            }
            MenuChoice::ConnectSsh => match ops.connect_ssh().await {
                Ok(_) => writeln!(out, "SSH connection successful")?,
                Err(e) => writeln!(out, "Error establishing SSH connection: {e}")?,
            },
            MenuChoice::ConnectTelnet => match ops.connect_telnet().await {
                Ok(_) => writeln!(out, "Telnet connection successful")?,
                Err(e) => writeln!(out, "Error establishing Telnet connection: {e}")?,
            },
            MenuChoice::RunningConfig => match ops.running_config().await {
                Ok(snapshot) => writeln!(out, "Running Configuration:\n{}", snapshot.text)?,
                Err(e) => writeln!(out, "Error retrieving running configuration: {e}")?,
            },
            MenuChoice::CompareConfig => {
                // A failed retrieval is reported and compared as an empty config.
                let device_config = match ops.running_config().await {
                    Ok(snapshot) => snapshot.text,
                    Err(e) => {
                        writeln!(out, "Error retrieving running configuration: {e}")?;
                        String::new()
                    }
                };
                match ops.compare_with_baseline(&device_config) {
                    Ok(diff) => {
                        writeln!(out, "\nConfiguration Differences:")?;
                        write!(out, "{}", diff.render())?;
                    }
                    Err(e) => writeln!(out, "Error comparing configurations: {e}")?,
                }
            }
            MenuChoice::EventLogging => {
                let path = ops.settings().logging.event_log_path.display().to_string();
                match ops.enable_event_logging() {
                    Ok(true) => writeln!(out, "Event logging enabled: {path}")?,
                    Ok(false) => writeln!(out, "Event logging already enabled: {path}")?,
                    Err(e) => writeln!(out, "Error configuring event logging: {e}")?,
                }
            }
            MenuChoice::ApplyAcl => {
                let Some(acl_file) = ask(input, out, "Enter the path to the ACL file: ").await?
                else {
                    return Ok(());
                };
                match ops.apply_acl(Path::new(&acl_file)).await {
                    Ok(output) => print_config_output(out, "ACL configuration applied:", &output)?,
                    Err(OpsError::AclFileNotFound(_)) => {
                        writeln!(out, "Error: ACL file {acl_file} not found.")?
                    }
                    Err(e) => writeln!(out, "Error applying ACL configuration: {e}")?,
                }
            }
            MenuChoice::ConfigureIpsec => match ops.configure_ipsec().await {
                Ok(output) => {
                    print_config_output(out, "IPsec configuration applied successfully:", &output)?
                }
                Err(e) => writeln!(out, "Error configuring IPsec: {e}")?,
            },
            MenuChoice::Exit => {
                writeln!(out, "Exiting program.")?;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    async fn run(ops: &DeviceOps, script: &str) -> String {
        let mut input = script.as_bytes();
        let mut out = Vec::new();
        run_menu(ops, &mut input, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    fn offline_ops() -> DeviceOps {
        DeviceOps::new(Settings::default())
    }

    #[test]
    fn choices_parse_from_digits() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::ChangeHostname));
        assert_eq!(MenuChoice::parse("8\r\n"), Some(MenuChoice::ConfigureIpsec));
        assert_eq!(MenuChoice::parse(" 0 "), Some(MenuChoice::Exit));
        assert_eq!(MenuChoice::parse("9"), None);
        assert_eq!(MenuChoice::parse(""), None);
        assert_eq!(MenuChoice::parse("exit"), None);
    }

    #[tokio::test]
    async fn exit_choice_ends_the_loop() {
        let text = run(&offline_ops(), "0\n4\n").await;

        assert!(text.starts_with("\nMain Menu:\n1. Change Hostname\n"));
        assert!(text.contains("0. Exit\nEnter your choice: Exiting program.\n"));
        assert_eq!(text.matches("Main Menu:").count(), 1);
    }

    #[tokio::test]
    async fn invalid_choice_redisplays_menu() {
        let text = run(&offline_ops(), "9\nabc\n0\n").await;

        assert_eq!(text.matches("Invalid choice. Please try again.").count(), 2);
        assert_eq!(text.matches("Main Menu:").count(), 3);
        assert!(text.ends_with("Exiting program.\n"));
    }

    #[tokio::test]
    async fn end_of_input_ends_the_loop() {
        let text = run(&offline_ops(), "").await;

        assert_eq!(text.matches("Main Menu:").count(), 1);
        assert!(!text.contains("Exiting program."));
    }

    #[tokio::test]
    async fn missing_acl_file_is_reported_and_loop_continues() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("acl.txt");
        let script = format!("7\n{}\n0\n", missing.display());

        let text = run(&offline_ops(), &script).await;

        assert!(text.contains("Enter the path to the ACL file: "));
        assert!(text.contains(&format!("Error: ACL file {} not found.\n", missing.display())));
        assert!(text.ends_with("Exiting program.\n"));
    }

    #[tokio::test]
    async fn event_logging_is_enabled_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.txt");
        let mut settings = Settings::default();
        settings.logging.event_log_path = path.clone();

        let text = run(&DeviceOps::new(settings), "6\n6\n0\n").await;

        assert!(text.contains(&format!("Event logging enabled: {}", path.display())));
        assert!(text.contains(&format!("Event logging already enabled: {}", path.display())));
        let events = std::fs::read_to_string(&path).unwrap();
        assert!(events.contains(" - INFO - Event logging enabled"), "{events}");
    }
}
