use super::ErrorCode;

pub fn all_codes() -> &'static [ErrorCode] {
    &[
        ErrorCode::ConfigNotFound,
        ErrorCode::ConfigMissingKey,
        ErrorCode::ConfigInvalidJson,
        ErrorCode::ConfigInvalidValue,
        ErrorCode::ValidationMissingArgument,
        ErrorCode::ValidationInvalidArgument,
        ErrorCode::RoleNotFound,
        ErrorCode::SshIdentityFileNotFound,
        ErrorCode::RemoteCommandFailed,
        ErrorCode::TransferDownloadFailed,
        ErrorCode::InternalIoError,
        ErrorCode::InternalJsonError,
        ErrorCode::InternalUnexpected,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    #[test]
    fn code_strings_are_unique_and_dotted() {
        let mut seen = HashSet::new();
        for code in all_codes() {
            let s = code.as_str();
            assert!(s.contains('.'), "{}", s);
            assert!(seen.insert(s), "duplicate code {}", s);
        }
    }
}
