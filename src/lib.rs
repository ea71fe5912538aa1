//! # routerctl - Cisco IOS configuration from an interactive menu
//!
//! `routerctl` logs in to a Cisco IOS router over SSH or Telnet, pushes
//! configuration (hostname, ACLs, IPsec/IKE policy), pulls the running
//! configuration, and diffs it against a hardening baseline. Every operation
//! opens its own session and closes it when done.
//!
//! ## Features
//!
//! - **State Machine Management**: prompts, pager and password prompts are
//!   recognized by a regex state machine built from a device template
//! - **Mode Switching**: shortest command path between user exec, privileged
//!   exec and global config
//! - **Two Transports**: SSH with selectable algorithm sets, and Telnet with
//!   minimal option negotiation
//! - **Config Diff**: line diff of the running config against a baseline
//! - **Event Log**: optional timestamped log file next to console logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routerctl::session::DeviceSession;
//! use routerctl::settings::Settings;
//! use routerctl::transport::Transport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load()?;
//!     let mut session = DeviceSession::open(&settings.device, Transport::Ssh).await?;
//!
//!     session.enable().await?;
//!     let output = session.send_config_set(&["hostname LAB-R1"]).await?;
//!     println!("{}", output.all);
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`device::DeviceHandler`] - Prompt state machine and mode transitions
//! - [`session::DeviceSession`] - One CLI login with command execution
//! - [`ops::DeviceOps`] - The operations behind the menu
//! - [`menu::run_menu`] - The interactive loop
//! - [`error::ConnectError`] - Error types for connection and state operations
//! - [`config`] - SSH algorithm lists per security level

pub mod config;
pub mod device;
pub mod diff;
pub mod error;
pub mod event_log;
pub mod hardening;
pub mod menu;
pub mod ops;
pub mod session;
pub mod settings;
pub mod templates;
pub mod transport;
