use super::*;

/// Reads device output until a prompt shows up.
///
/// Complete lines go through the state machine and into `clean_output`
/// with `\n` line endings. The unterminated tail is checked for a prompt or
/// an input request (password, pager) and answered through `sender`.
/// Returns whether no error line was seen, and the prompt text.
///
/// `line_buffer` belongs to the caller so the unanswered tail is still
/// there when the read is cut short by a timeout.
async fn read_until_prompt(
    handler: &mut DeviceHandler,
    sender: &Sender<String>,
    recv: &mut Receiver<String>,
    clean_output: &mut String,
    line_buffer: &mut String,
) -> Result<(bool, String), ConnectError> {
    let mut is_error = false;
    loop {
        let Some(data) = recv.recv().await else {
            return Err(ConnectError::ChannelDisconnectError);
        };
        trace!("{:?}", data);
        line_buffer.push_str(&data);

        while let Some(newline_pos) = line_buffer.find('\n') {
            let line = line_buffer.drain(..=newline_pos).collect::<String>();
            let trim_start = IGNORE_START_LINE.replace(&line, "");
            let trimmed_line = trim_start.trim_end_matches(['\r', '\n']);
            handler.read(trimmed_line.trim_end());
            if handler.error() {
                is_error = true;
            }
            clean_output.push_str(trimmed_line);
            clean_output.push('\n');
        }

        // Prompts and input requests arrive without a trailing newline.
        if line_buffer.is_empty() {
            continue;
        }
        if handler.read_prompt(line_buffer) {
            handler.read(line_buffer);
            clean_output.push_str(line_buffer);
            return Ok((!is_error, std::mem::take(line_buffer)));
        }
        if let Some((input, is_record)) = handler.read_need_write(line_buffer) {
            if is_error && is_record {
                // Asked for credentials again right after an error line.
                clean_output.push_str(&std::mem::take(line_buffer));
                return Err(ConnectError::AuthenticationFailed(clean_output.clone()));
            }
            handler.read(line_buffer);
            if is_record {
                clean_output.push_str(line_buffer);
                clean_output.push('\n');
            }
            line_buffer.clear();
            trace!("Input required");
            sender.send(input).await?;
        }
    }
}

/// Strips the echoed command from the front and the prompt from the end.
fn strip_echo_and_prompt<'a>(all: &'a str, command: &str) -> &'a str {
    let mut content = all;
    if !command.is_empty() && content.starts_with(command) {
        content = content
            .strip_prefix(command)
            .unwrap_or(content)
            .trim_start_matches(['\n', '\r']);
    }
    match content.rfind('\n') {
        Some(pos) => &content[..pos],
        None => "",
    }
}

impl DeviceSession {
    /// Connects over `transport`, logs in, and prepares the terminal.
    ///
    /// On return the session sits at the device's first prompt (user or
    /// privileged exec) with paging disabled.
    pub async fn open(
        profile: &DeviceProfile,
        transport: Transport,
    ) -> Result<DeviceSession, ConnectError> {
        let handler = templates::by_device_type(&profile.device_type)?;
        let (channels, device_addr) = match transport {
            Transport::Ssh => (
                ssh::open_shell(profile).await?,
                format!("{}@{}:{}", profile.username, profile.host, profile.ssh_port),
            ),
            Transport::Telnet => (
                telnet::open_shell(profile).await?,
                format!(
                    "{}@{}:{}",
                    profile.username, profile.host, profile.telnet_port
                ),
            ),
        };
        let mut session =
            Self::from_channels(channels, handler, device_addr, profile.command_timeout());
        session
            .login(
                &profile.username,
                &profile.password,
                &profile.secret,
                profile.connect_timeout(),
            )
            .await?;
        session.prepare_terminal().await;
        Ok(session)
    }

    /// Builds a session over an already-connected channel pair.
    ///
    /// Call [`DeviceSession::login`] before sending commands.
    pub fn from_channels(
        channels: ShellChannels,
        handler: DeviceHandler,
        device_addr: impl Into<String>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            channels,
            handler,
            prompt: String::new(),
            device_addr: device_addr.into(),
            command_timeout,
        }
    }

    /// Waits for the first prompt, answering `Username:` and `Password:`
    /// with the login credentials. Afterwards `Password:` prompts get the
    /// enable secret.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        secret: &str,
        timeout: Duration,
    ) -> Result<(), ConnectError> {
        self.handler.set_param(USERNAME_PARAM, format!("{username}\n"));
        self.handler.set_param(PASSWORD_PARAM, format!("{password}\n"));

        let handler = &mut self.handler;
        let sender = &self.channels.sender;
        let recv = &mut self.channels.receiver;
        let mut initial_output = String::new();
        let mut tail = String::new();

        let result = tokio::time::timeout(
            timeout,
            read_until_prompt(handler, sender, recv, &mut initial_output, &mut tail),
        )
        .await;

        let prompt = match result {
            Ok(Ok((_, prompt))) => prompt,
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                initial_output.push_str(&tail);
                return Err(ConnectError::InitTimeout(if initial_output.is_empty() {
                    "waiting for initial prompt".to_string()
                } else {
                    initial_output
                }));
            }
        };

        self.handler.set_param(PASSWORD_PARAM, format!("{secret}\n"));
        debug!(
            "{} Logged in, prompt '{}' state '{}'",
            self.device_addr,
            prompt.trim(),
            self.handler.current_state()
        );
        self.prompt = prompt;
        Ok(())
    }

    /// Disables paging. IOS accepts this in user exec too.
    async fn prepare_terminal(&mut self) {
        match self.send_command("terminal length 0").await {
            Ok(output) if output.success => {}
            Ok(output) => debug!(
                "{} terminal length 0 rejected: {}",
                self.device_addr, output.content
            ),
            Err(e) => debug!("{} terminal length 0 failed: {}", self.device_addr, e),
        }
    }

    /// Checks if the underlying connection is still active.
    pub fn is_connected(&self) -> bool {
        !self.channels.sender.is_closed()
    }

    pub fn device_addr(&self) -> &str {
        &self.device_addr
    }

    /// Current CLI mode as named by the template.
    pub fn current_mode(&self) -> &str {
        self.handler.current_state()
    }

    /// Last prompt the device printed.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Executes a command in the current mode and waits for the next prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<Output, ConnectError> {
        self.send_command_with_timeout(command, self.command_timeout)
            .await
    }

    /// Executes a command with a custom timeout.
    ///
    /// # Errors
    ///
    /// `ExecTimeout` carries the partial output when no prompt arrives in
    /// time; `ChannelDisconnectError` when the device hangs up.
    pub async fn send_command_with_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<Output, ConnectError> {
        if !self.is_connected() {
            return Err(ConnectError::ConnectClosedError);
        }
        let handler = &mut self.handler;
        let sender = &self.channels.sender;
        let recv = &mut self.channels.receiver;

        // 1. Clear any residual data in the receiver
        while recv.try_recv().is_ok() {}

        // 2. Send command to remote shell
        sender.send(format!("{command}\n")).await?;

        // 3. Receive data
        let mut clean_output = String::new();
        let mut tail = String::new();
        let result = tokio::time::timeout(
            timeout,
            read_until_prompt(handler, sender, recv, &mut clean_output, &mut tail),
        )
        .await;

        let success = match result {
            Err(_) => {
                clean_output.push_str(&tail);
                debug!(
                    "{} Command '{}' timed out after {:?}",
                    self.device_addr, command, timeout
                );
                return Err(ConnectError::ExecTimeout(clean_output));
            }
            Ok(Err(err)) => return Err(err),
            Ok(Ok((success, prompt))) => {
                self.prompt = prompt;
                success
            }
        };

        let content = strip_echo_and_prompt(&clean_output, command).to_string();
        Ok(Output {
            success,
            content,
            all: clean_output,
            prompt: self.handler.current_prompt().map(|v| v.to_string()),
        })
    }

    /// Executes a command in a specific device mode.
    ///
    /// Runs the transition commands needed to reach `mode` first. If a
    /// transition fails, its output is returned with `success == false` and
    /// the command is not sent.
    pub async fn send_command_in_mode(
        &mut self,
        command: &str,
        mode: &str,
    ) -> Result<Output, ConnectError> {
        let mut transition = self.enter_mode(mode).await?;
        if !transition.success {
            return Ok(transition);
        }
        let mut cmd_output = self.send_command(command).await?;
        transition.all.push_str(&cmd_output.all);
        cmd_output.all = transition.all;
        Ok(cmd_output)
    }

    /// Runs a [`Command`], honoring its mode and timeout.
    pub async fn execute(&mut self, command: &Command) -> Result<Output, ConnectError> {
        let timeout = command
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(self.command_timeout);
        let mut all = String::new();
        if !command.mode.is_empty() {
            let transition = self.enter_mode(&command.mode).await?;
            if !transition.success {
                return Ok(transition);
            }
            all = transition.all;
        }
        let mut output = self
            .send_command_with_timeout(&command.command, timeout)
            .await?;
        all.push_str(&output.all);
        output.all = all;
        Ok(output)
    }

    /// Walks the transition graph to `target`.
    ///
    /// The returned output concatenates every transition command's output;
    /// `success` is false if a command failed or landed in the wrong mode.
    pub async fn enter_mode(&mut self, target: &str) -> Result<Output, ConnectError> {
        let target = target.to_ascii_lowercase();
        let path = self.handler.transition_path(&target)?;
        let mut all = String::new();
        for (t_cmd, target_state) in path {
            debug!("{} Trans state command: {}", self.device_addr, t_cmd);
            let mut mode_output = self.send_command(&t_cmd).await?;
            all.push_str(&mode_output.all);
            if !mode_output.success || self.handler.current_state() != target_state {
                mode_output.success = false;
                mode_output.all = all;
                return Ok(mode_output);
            }
        }
        Ok(Output {
            success: true,
            content: String::new(),
            all,
            prompt: self.handler.current_prompt().map(|v| v.to_string()),
        })
    }

    /// Enters privileged exec mode, answering the secret prompt.
    pub async fn enable(&mut self) -> Result<(), ConnectError> {
        let output = match self.enter_mode(mode::ENABLE).await {
            Ok(output) => output,
            Err(ConnectError::AuthenticationFailed(seen)) => {
                return Err(ConnectError::EnableFailed(seen));
            }
            Err(e) => return Err(e),
        };
        if !output.success {
            return Err(ConnectError::EnableFailed(if output.content.is_empty() {
                output.all
            } else {
                output.content
            }));
        }
        debug!("{} Entered enable mode", self.device_addr);
        Ok(())
    }

    /// Sends configuration lines from global config mode.
    ///
    /// Enters config mode, sends every line in order, and returns to
    /// privileged exec. A rejected line does not stop the push; the
    /// returned transcript shows what the device said and `success` is
    /// false if any line was rejected.
    pub async fn send_config_set<S: AsRef<str>>(
        &mut self,
        commands: &[S],
    ) -> Result<Output, ConnectError> {
        let entered = self.enter_mode(mode::CONFIG).await?;
        let mut all = entered.all;
        if !entered.success {
            return Ok(Output {
                success: false,
                content: all.clone(),
                all,
                prompt: entered.prompt,
            });
        }

        let mut success = true;
        for command in commands {
            let command = command.as_ref();
            let output = self.send_command(command).await?;
            if !output.success {
                warn!(
                    "{} rejected config line '{}': {}",
                    self.device_addr,
                    command,
                    output.content.trim()
                );
                success = false;
            }
            all.push_str(&output.all);
        }

        let exited = self.enter_mode(mode::ENABLE).await?;
        all.push_str(&exited.all);
        Ok(Output {
            success: success && exited.success,
            content: all.clone(),
            all,
            prompt: self.handler.current_prompt().map(|v| v.to_string()),
        })
    }

    /// Logs out and releases the connection.
    pub async fn close(mut self) {
        debug!("{} Closing session...", self.device_addr);
        if self.is_connected() {
            if let Err(e) = self.channels.sender.send("exit\n".to_string()).await {
                debug!("Failed to send exit command: {:?}", e);
            }
            // Give the device a moment to process the logout.
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        self.channels.receiver.close();
        debug!("{} Session closed", self.device_addr);
    }
}
