use crate::error::{Error, Result};
use crate::roles::Host;
use crate::utils::shell;
use std::path::Path;
use std::process::{Command, Stdio};

use super::{CommandOutput, Transport};

pub struct SshClient {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_files: Vec<String>,
    /// When true, all commands run locally instead of over SSH.
    /// Set automatically when the host is localhost/127.0.0.1/::1.
    pub is_local: bool,
}

impl SshClient {
    pub fn from_host(host: &Host, key_filenames: &[String]) -> Result<Self> {
        let mut identity_files = Vec::with_capacity(key_filenames.len());
        for path in key_filenames.iter().filter(|p| !p.is_empty()) {
            let expanded = shellexpand::tilde(path).to_string();
            if !Path::new(&expanded).exists() {
                return Err(Error::ssh_identity_file_not_found(host.label(), expanded));
            }
            identity_files.push(expanded);
        }

        let is_local = host.is_local();
        if is_local {
            log_status!("ssh", "Host '{}' is localhost, using local execution", host.label());
        }

        Ok(Self {
            host: host.address.clone(),
            user: host.user.clone(),
            port: host.port,
            identity_files,
            is_local,
        })
    }

    fn destination(&self) -> String {
        if self.host.contains(':') {
            format!("{}@[{}]", self.user, self.host)
        } else {
            format!("{}@{}", self.user, self.host)
        }
    }

    pub(crate) fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = Vec::new();

        for identity_file in &self.identity_files {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Fail fast on stalled connections or unexpected prompts.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-o".to_string(),
            "ServerAliveInterval=15".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]);

        // ssh treats the host as an address literal; brackets are scp-only.
        args.push(format!("{}@{}", self.user, self.host));
        args.push(command.to_string());

        args
    }

    pub(crate) fn build_scp_args(&self, remote_path: &str, local_path: &Path) -> Vec<String> {
        // Legacy protocol so the remote path goes through the remote shell.
        let mut args = vec!["-O".to_string(), "-B".to_string()];

        for identity_file in &self.identity_files {
            args.extend(["-i".to_string(), identity_file.clone()]);
        }

        if self.port != 22 {
            args.extend(["-P".to_string(), self.port.to_string()]);
        }

        args.push(format!(
            "{}:{}",
            self.destination(),
            shell::quote_remote_path(remote_path)
        ));
        args.push(local_path.to_string_lossy().to_string());

        args
    }
}

impl Transport for SshClient {
    fn execute(&self, command: &str) -> CommandOutput {
        if self.is_local {
            return execute_local_command(command);
        }

        // No terminal is attached; anything that prompts reads EOF.
        let output = Command::new("ssh")
            .args(self.build_ssh_args(command))
            .stdin(Stdio::null())
            .output();
        CommandOutput::from_process(output, "SSH error")
    }

    fn download(&self, remote_path: &str, local_path: &Path) -> CommandOutput {
        if self.is_local {
            return copy_local_file(remote_path, local_path);
        }

        let output = Command::new("scp")
            .args(self.build_scp_args(remote_path, local_path))
            .output();
        CommandOutput::from_process(output, "SCP error")
    }
}

pub fn execute_local_command(command: &str) -> CommandOutput {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    CommandOutput::from_process(cmd.stdin(Stdio::null()).output(), "Command error")
}

fn copy_local_file(source: &str, destination: &Path) -> CommandOutput {
    let expanded = shellexpand::tilde(source).to_string();
    match std::fs::copy(&expanded, destination) {
        Ok(_) => CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        },
        Err(e) => CommandOutput {
            stdout: String::new(),
            stderr: format!("Copy error: {}", e),
            success: false,
            exit_code: 1,
        },
    }
}
