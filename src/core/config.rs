//! Deployment configuration: environment placeholders, role table and
//! command templates, loaded from `caddie.json`.

use crate::error::{Error, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(skip)]
    pub source: Option<PathBuf>,

    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub key_filename: Vec<String>,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Remote working directory of the project checkout.
    #[serde(default)]
    pub path: String,
    /// Shell snippet that activates the project's package environment.
    #[serde(default)]
    pub activate: String,
    /// Remote shell every command is wrapped in. Empty disables wrapping.
    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default)]
    pub roledefs: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_role")]
    pub default_role: String,

    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default = "default_manage")]
    pub manage: String,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitConfig {
    #[serde(default = "default_git_remote")]
    pub remote: String,
    #[serde(default = "default_git_branch")]
    pub branch: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: default_git_remote(),
            branch: default_git_branch(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorConfig {
    /// Supervisor program name; falls back to the project name.
    #[serde(default)]
    pub program: Option<String>,
}

/// Command templates. Placeholders use `{{name}}` syntax.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandsConfig {
    #[serde(default = "default_checkout_command")]
    pub checkout: String,
    #[serde(default = "default_pull_command")]
    pub pull: String,
    #[serde(default = "default_log_command")]
    pub log: String,
    #[serde(default = "default_syncdb_command")]
    pub syncdb: String,
    #[serde(default = "default_migrate_command")]
    pub migrate: String,
    #[serde(default = "default_collectstatic_command")]
    pub collectstatic: String,
    #[serde(default = "default_clear_thumbs_command")]
    pub clear_thumbs: String,
    #[serde(default = "default_restart_command")]
    pub restart: String,
    #[serde(default = "default_install_command")]
    pub install: String,
    #[serde(default = "default_uninstall_command")]
    pub uninstall: String,
    #[serde(default = "default_backup_command")]
    pub backup: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            checkout: default_checkout_command(),
            pull: default_pull_command(),
            log: default_log_command(),
            syncdb: default_syncdb_command(),
            migrate: default_migrate_command(),
            collectstatic: default_collectstatic_command(),
            clear_thumbs: default_clear_thumbs_command(),
            restart: default_restart_command(),
            install: default_install_command(),
            uninstall: default_uninstall_command(),
            backup: default_backup_command(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    #[serde(default = "default_database_host")]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default = "default_dump_dir")]
    pub dump_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_database_host(),
            user: String::new(),
            name: String::new(),
            password: String::new(),
            dump_dir: default_dump_dir(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_port() -> u16 {
    22
}

fn default_shell() -> String {
    "/bin/bash -l -c".to_string()
}

fn default_role() -> String {
    "production".to_string()
}

fn default_manage() -> String {
    "python manage.py".to_string()
}

fn default_git_remote() -> String {
    "origin".to_string()
}

fn default_git_branch() -> String {
    "master".to_string()
}

fn default_checkout_command() -> String {
    "git checkout -f".to_string()
}

fn default_pull_command() -> String {
    "git pull {{remote}} {{branch}}".to_string()
}

fn default_log_command() -> String {
    "git log -n 1".to_string()
}

fn default_syncdb_command() -> String {
    "{{manage}} syncdb".to_string()
}

fn default_migrate_command() -> String {
    "{{manage}} migrate".to_string()
}

fn default_collectstatic_command() -> String {
    "{{manage}} collectstatic --noinput".to_string()
}

fn default_clear_thumbs_command() -> String {
    "{{manage}} thumbnail clear".to_string()
}

fn default_restart_command() -> String {
    "supervisorctl restart {{program}}".to_string()
}

fn default_install_command() -> String {
    "pip install {{package}}".to_string()
}

fn default_uninstall_command() -> String {
    "pip uninstall -y {{package}}".to_string()
}

fn default_backup_command() -> String {
    "/etc/cron.hourly/automysqlbackup".to_string()
}

fn default_database_host() -> String {
    "localhost".to_string()
}

fn default_dump_dir() -> String {
    "/tmp/mysqldumps/".to_string()
}

// =============================================================================
// Loading
// =============================================================================

impl Config {
    /// Supervisor program to restart.
    pub fn program(&self) -> &str {
        self.supervisor
            .program
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.project)
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roledefs.keys().cloned().collect()
    }

    pub fn source_display(&self) -> Option<String> {
        self.source.as_ref().map(|p| p.display().to_string())
    }

    pub fn validate(&self) -> Result<()> {
        let source = self.source_display();
        let required = [
            ("project", &self.project),
            ("user", &self.user),
            ("path", &self.path),
            ("activate", &self.activate),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::config_missing_key(key, source.clone()));
            }
        }

        for (role, hosts) in &self.roledefs {
            if hosts.is_empty() {
                return Err(Error::config_invalid_value(
                    format!("roledefs.{}", role),
                    None,
                    "Role has no hosts",
                ));
            }
            if let Some(blank) = hosts.iter().find(|h| h.trim().is_empty()) {
                return Err(Error::config_invalid_value(
                    format!("roledefs.{}", role),
                    Some(blank.clone()),
                    "Host address is empty",
                ));
            }
        }

        Ok(())
    }
}

/// Parse and validate a config from raw JSON.
pub fn from_json(raw: &str, source: Option<&Path>) -> Result<Config> {
    let source_str = source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<inline>".to_string());
    let mut config: Config =
        serde_json::from_str(raw).map_err(|e| Error::config_invalid_json(source_str, e))?;
    config.source = source.map(Path::to_path_buf);
    config.validate()?;
    Ok(config)
}

pub fn load_from(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;
    from_json(&raw, Some(path))
}

/// Locate and load the config. See [`paths::config_candidates`] for lookup order.
pub fn load(explicit: Option<&str>) -> Result<Config> {
    let candidates = paths::config_candidates(explicit);

    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => load_from(path),
        None => Err(Error::config_not_found(
            candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"{
        "project": "shop",
        "user": "deploy",
        "path": "/srv/shop/",
        "activate": "source /srv/venv/bin/activate",
        "roledefs": { "production": ["10.0.0.1", "10.0.0.2"], "dev": ["dev.local"] }
    }"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = from_json(MINIMAL, None).unwrap();
        assert_eq!(config.port, 22);
        assert_eq!(config.default_role, "production");
        assert_eq!(config.git.remote, "origin");
        assert_eq!(config.git.branch, "master");
        assert_eq!(config.manage, "python manage.py");
        assert_eq!(config.commands.backup, "/etc/cron.hourly/automysqlbackup");
        assert_eq!(config.database.dump_dir, "/tmp/mysqldumps/");
        assert_eq!(config.program(), "shop");
        assert_eq!(config.roledefs["production"], vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn partial_command_override_keeps_other_defaults() {
        let raw = MINIMAL.replacen(
            "\"project\"",
            "\"commands\": { \"restart\": \"sudo systemctl restart {{program}}\" }, \"project\"",
            1,
        );
        let config = from_json(&raw, None).unwrap();
        assert_eq!(config.commands.restart, "sudo systemctl restart {{program}}");
        assert_eq!(config.commands.migrate, "{{manage}} migrate");
    }

    #[test]
    fn supervisor_program_overrides_project() {
        let raw = MINIMAL.replacen(
            "\"project\"",
            "\"supervisor\": { \"program\": \"shop-web\" }, \"project\"",
            1,
        );
        let config = from_json(&raw, None).unwrap();
        assert_eq!(config.program(), "shop-web");
    }

    #[test]
    fn missing_activate_is_reported() {
        let raw = r#"{ "project": "shop", "user": "deploy", "path": "/srv/shop/" }"#;
        let err = from_json(raw, None).unwrap_err();
        assert_eq!(err.code.as_str(), "config.missing_key");
        assert_eq!(err.details["key"], "activate");
    }

    #[test]
    fn empty_role_is_rejected() {
        let raw = MINIMAL.replace("\"dev\": [\"dev.local\"]", "\"dev\": []");
        let err = from_json(&raw, None).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["key"], "roledefs.dev");
    }

    #[test]
    fn invalid_json_names_source() {
        let err = from_json("{ not json", Some(Path::new("/tmp/caddie.json"))).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_json");
        assert_eq!(err.details["path"], "/tmp/caddie.json");
    }

    #[test]
    fn load_reads_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", MINIMAL).unwrap();

        let config = load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.project, "shop");
        assert_eq!(config.source.as_deref(), Some(file.path()));
    }

    #[test]
    fn load_reports_missing_explicit_file() {
        let err = load(Some("/nonexistent/caddie.json")).unwrap_err();
        assert_eq!(err.code.as_str(), "config.not_found");
        assert_eq!(err.details["tried"][0], "/nonexistent/caddie.json");
    }

    #[test]
    fn password_is_never_serialized() {
        let raw = MINIMAL.replacen(
            "\"project\"",
            "\"database\": { \"name\": \"shop\", \"user\": \"root\", \"password\": \"hunter2\" }, \"project\"",
            1,
        );
        let config = from_json(&raw, None).unwrap();
        assert_eq!(config.database.password, "hunter2");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
