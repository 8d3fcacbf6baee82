//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use caddie::error::Hint;
use caddie::{Error, ErrorCode, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn print_success<T: Serialize>(data: T) -> Result<()> {
    print_response(&CliResponse::success(data))
}

pub fn print_result<T: Serialize>(result: Result<T>) -> Result<()> {
    match result {
        Ok(data) => print_success(data),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

pub fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigMissingKey
        | ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationMissingArgument
        | ErrorCode::ValidationInvalidArgument => 2,

        ErrorCode::ConfigNotFound | ErrorCode::RoleNotFound => 4,

        ErrorCode::SshIdentityFileNotFound => 10,

        ErrorCode::RemoteCommandFailed | ErrorCode::TransferDownloadFailed => 20,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    print_result(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caddie::error::{RemoteCommandFailedDetails, TargetDetails};

    fn remote_failure() -> Error {
        Error::remote_command_failed(RemoteCommandFailedDetails {
            command: "supervisorctl restart shop".to_string(),
            exit_code: 7,
            stdout: "some stdout".to_string(),
            stderr: "shop: ERROR (no such process)".to_string(),
            target: TargetDetails {
                task: Some("restart".to_string()),
                host: Some("web1".to_string()),
            },
        })
    }

    #[test]
    fn remote_command_failed_serializes_stdout_stderr() {
        let json = CliResponse::<()>::from_error(&remote_failure())
            .to_json()
            .unwrap();

        assert!(json.contains("\"code\": \"remote.command_failed\""));
        assert!(json.contains("some stdout"));
        assert!(json.contains("no such process"));
        assert!(json.contains("\"exitCode\": 7"));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn remote_command_failed_maps_to_exit_code_20() {
        let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(remote_failure()));
        assert_eq!(exit_code, 20);
    }

    #[test]
    fn not_found_maps_to_exit_code_4() {
        let (_value, exit_code) =
            map_cmd_result_to_json::<serde_json::Value>(Err(Error::role_not_found("qa", vec![])));
        assert_eq!(exit_code, 4);
    }

    #[test]
    fn success_keeps_command_exit_code() {
        let (value, exit_code) = map_cmd_result_to_json(Ok((serde_json::json!({"ok": true}), 0)));
        assert_eq!(exit_code, 0);
        assert_eq!(value.unwrap()["ok"], true);
    }

    #[test]
    fn every_error_code_has_an_exit_code() {
        for code in caddie::error::all_codes() {
            assert!(exit_code_for_error(*code) > 0);
        }
    }
}
