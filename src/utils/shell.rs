//! Shell escaping and quoting utilities.

/// Escape a value for use inside single quotes.
/// Replaces `'` with `'\''` (end quote, escaped quote, start quote).
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Quote a single argument for shell execution.
/// - Empty strings become `''`
/// - Strings with shell metacharacters are wrapped in single quotes
/// - Embedded single quotes are escaped
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", escape_single_quote_content(arg))
}

/// Quote a path for shell execution (always quotes).
pub fn quote_path(path: &str) -> String {
    format!("'{}'", escape_single_quote_content(path))
}

/// Quote a path handed to a remote shell, leaving a leading `~/` bare so
/// the remote side still expands it to the login user's home.
pub fn quote_remote_path(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => format!("~/{}", quote_path(rest)),
        None if path == "~" => path.to_string(),
        None => quote_path(path),
    }
}

/// Wrap a complete command for a remote shell invocation such as
/// `/bin/bash -l -c`. An empty shell leaves the command untouched.
pub fn wrap_in_shell(shell: &str, command: &str) -> String {
    let shell = shell.trim();
    if shell.is_empty() {
        return command.to_string();
    }
    format!("{} {}", shell, quote_path(command))
}
