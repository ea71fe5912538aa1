use async_ssh2_tokio::Config;
use async_ssh2_tokio::client::{AuthMethod, Client};
use log::debug;
use russh::ChannelMsg;
use tokio::sync::mpsc;

use super::{CHANNEL_CAPACITY, ConnectionSecurityOptions, ShellChannels, decode_utf8};
use crate::error::ConnectError;
use crate::settings::DeviceProfile;

/// Logs in over SSH, requests a PTY shell, and starts the I/O task.
pub(crate) async fn open_shell(profile: &DeviceProfile) -> Result<ShellChannels, ConnectError> {
    let device_addr = format!("{}@{}:{}", profile.username, profile.host, profile.ssh_port);
    let security_options = ConnectionSecurityOptions::from_profile(profile);

    let config = Config {
        preferred: security_options.preferred(),
        inactivity_timeout: Some(profile.command_timeout().max(profile.connect_timeout())),
        ..Default::default()
    };

    let client = tokio::time::timeout(
        profile.connect_timeout(),
        Client::connect_with_config(
            (profile.host.clone(), profile.ssh_port),
            &profile.username,
            AuthMethod::with_password(&profile.password),
            security_options.server_check.clone(),
            config,
        ),
    )
    .await
    .map_err(|_| ConnectError::ConnectTimeout {
        addr: device_addr.clone(),
    })??;
    debug!("{} TCP connection successful", device_addr);

    let mut channel = client.get_channel().await?;
    channel
        .request_pty(false, "xterm", 800, 600, 0, 0, &[])
        .await?;
    channel.request_shell(false).await?;
    debug!("{} Shell request successful", device_addr);

    let (sender_to_shell, mut receiver_from_user) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (sender_to_user, receiver_from_shell) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    let io_task_device_addr = device_addr;
    tokio::spawn(async move {
        let mut pending = Vec::new();
        loop {
            tokio::select! {
                data = receiver_from_user.recv() => {
                    let Some(data) = data else {
                        debug!("{} Session dropped, closing shell.", io_task_device_addr);
                        let _ = channel.eof().await;
                        break;
                    };
                    if let Err(e) = channel.data(data.as_bytes()).await {
                        debug!("{} Failed to send data to shell: {:?}", io_task_device_addr, e);
                        break;
                    }
                },
                msg = channel.wait() => {
                    match msg {
                        Some(ChannelMsg::Data { ref data }) => {
                            let text = decode_utf8(&mut pending, data);
                            if !text.is_empty() && sender_to_user.send(text).await.is_err() {
                                debug!("{} Shell output receiver dropped. Closing task.", io_task_device_addr);
                                break;
                            }
                        }
                        Some(ChannelMsg::ExitStatus { exit_status }) => {
                            debug!("{} Shell exited with status code: {}", io_task_device_addr, exit_status);
                            let _ = channel.eof().await;
                            break;
                        }
                        Some(ChannelMsg::Eof) | None => {
                            debug!("{} Shell sent EOF.", io_task_device_addr);
                            break;
                        }
                        Some(_) => {}
                    }
                }
            }
        }
        debug!("{} SSH I/O task ended.", io_task_device_addr);
    });

    Ok(ShellChannels::with_ssh_client(
        sender_to_shell,
        receiver_from_shell,
        client,
    ))
}
