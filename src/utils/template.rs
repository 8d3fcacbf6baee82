//! String template rendering utilities.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

pub struct TemplateVars;

impl TemplateVars {
    pub const PROJECT: &'static str = "project";
    pub const PATH: &'static str = "path";
    pub const REMOTE: &'static str = "remote";
    pub const BRANCH: &'static str = "branch";
    pub const PROGRAM: &'static str = "program";
    pub const PACKAGE: &'static str = "package";
    pub const MANAGE: &'static str = "manage";
}

pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap())
}

/// Names of `{{placeholders}}` still present in a string.
pub fn unresolved(rendered: &str) -> Vec<String> {
    placeholder_pattern()
        .captures_iter(rendered)
        .map(|c| c[1].to_string())
        .collect()
}

/// Render a configured command template, rejecting leftover placeholders.
///
/// `key` names the config entry the template came from.
pub fn render_strict(key: &str, template: &str, variables: &[(&str, &str)]) -> Result<String> {
    let rendered = render(template, variables);
    let leftover = unresolved(&rendered);
    if leftover.is_empty() {
        return Ok(rendered);
    }

    Err(Error::config_invalid_value(
        key,
        Some(template.to_string()),
        format!("Unknown placeholder(s): {}", leftover.join(", ")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_all_occurrences() {
        let out = render(
            "git pull {{remote}} {{branch}} && echo {{branch}}",
            &[("remote", "origin"), ("branch", "main")],
        );
        assert_eq!(out, "git pull origin main && echo main");
    }

    #[test]
    fn unresolved_finds_leftovers() {
        assert_eq!(unresolved("pip install {{ package }} {{pkg}}"), vec!["package", "pkg"]);
        assert!(unresolved("echo ${HOME} {x}").is_empty());
    }

    #[test]
    fn render_strict_rejects_unknown_placeholder() {
        let err = render_strict("commands.restart", "supervisorctl restart {{app}}", &[])
            .unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["key"], "commands.restart");
    }
}
