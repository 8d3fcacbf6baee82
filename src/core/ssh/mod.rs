mod client;

pub use client::{execute_local_command, SshClient};

use std::path::Path;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub(crate) fn from_process(
        output: std::io::Result<std::process::Output>,
        error_label: &str,
    ) -> Self {
        match output {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput {
                stdout: String::new(),
                stderr: format!("{}: {}", error_label, e),
                success: false,
                exit_code: -1,
            },
        }
    }
}

/// A connection to one host: runs shell commands and fetches files.
pub trait Transport {
    fn execute(&self, command: &str) -> CommandOutput;
    fn download(&self, remote_path: &str, local_path: &Path) -> CommandOutput;
}
