//! Task catalogue and planning.
//!
//! A task expands into an ordered list of [`Step`]s. Planning is pure: it
//! only reads the config and the clock value it is given, so the exact
//! command strings can be checked without touching a host.

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::template::{render_strict, TemplateVars};
use crate::utils::shell;

/// Timestamp format used in database dump file names.
pub const DUMP_TIMESTAMP_FORMAT: &str = "%Y.%m.%d-%H.%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Deploy,
    Pull,
    SyncMigrateDb,
    Restart,
    Install { package: String },
    Uninstall { package: String },
    Collectstatic,
    ClearThumbs,
    Makedump,
    Getdump,
    Getfile { path: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub role_bound: bool,
    pub params: &'static [&'static str],
}

const CLEAR_THUMBS: TaskInfo = TaskInfo {
    name: "clear_thumbs",
    description: "Clear the thumbnail key/value store",
    role_bound: true,
    params: &[],
};

const COLLECTSTATIC: TaskInfo = TaskInfo {
    name: "collectstatic",
    description: "Collect static files",
    role_bound: true,
    params: &[],
};

const DEPLOY: TaskInfo = TaskInfo {
    name: "deploy",
    description: "Send files to server and restart webserver",
    role_bound: true,
    params: &[],
};

const GETDUMP: TaskInfo = TaskInfo {
    name: "getdump",
    description: "Run mysqldump and download the result",
    role_bound: true,
    params: &[],
};

const GETFILE: TaskInfo = TaskInfo {
    name: "getfile",
    description: "Download a file from the server",
    role_bound: true,
    params: &["path"],
};

const INSTALL: TaskInfo = TaskInfo {
    name: "install",
    description: "Install package into the project environment",
    role_bound: false,
    params: &["package"],
};

const MAKEDUMP: TaskInfo = TaskInfo {
    name: "makedump",
    description: "Generate a backup file with the configured backup command",
    role_bound: true,
    params: &[],
};

const PULL: TaskInfo = TaskInfo {
    name: "pull",
    description: "Pull files from git to server",
    role_bound: true,
    params: &[],
};

const RESTART: TaskInfo = TaskInfo {
    name: "restart",
    description: "Restart webserver",
    role_bound: true,
    params: &[],
};

const SYNC_MIGRATE_DB: TaskInfo = TaskInfo {
    name: "sync_migrate_db",
    description: "Migrate database",
    role_bound: true,
    params: &[],
};

const UNINSTALL: TaskInfo = TaskInfo {
    name: "uninstall",
    description: "Remove package from the project environment",
    role_bound: false,
    params: &["package"],
};

/// Every task, sorted by name.
pub const CATALOGUE: &[TaskInfo] = &[
    CLEAR_THUMBS,
    COLLECTSTATIC,
    DEPLOY,
    GETDUMP,
    GETFILE,
    INSTALL,
    MAKEDUMP,
    PULL,
    RESTART,
    SYNC_MIGRATE_DB,
    UNINSTALL,
];

impl Task {
    pub fn name(&self) -> &'static str {
        self.info().name
    }

    pub fn info(&self) -> &'static TaskInfo {
        match self {
            Task::Deploy => &DEPLOY,
            Task::Pull => &PULL,
            Task::SyncMigrateDb => &SYNC_MIGRATE_DB,
            Task::Restart => &RESTART,
            Task::Install { .. } => &INSTALL,
            Task::Uninstall { .. } => &UNINSTALL,
            Task::Collectstatic => &COLLECTSTATIC,
            Task::ClearThumbs => &CLEAR_THUMBS,
            Task::Makedump => &MAKEDUMP,
            Task::Getdump => &GETDUMP,
            Task::Getfile { .. } => &GETFILE,
        }
    }

    pub fn role_bound(&self) -> bool {
        self.info().role_bound
    }
}

/// A shell command plus the form safe to show in logs and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub command: String,
    pub display: String,
}

impl RemoteCommand {
    fn plain(command: String) -> Self {
        Self {
            display: command.clone(),
            command,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Notice(String),
    Run(RemoteCommand),
    Get { remote_path: String },
    Done(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Task the step belongs to; differs from the invoked task for `deploy`.
    pub task: &'static str,
    pub action: Action,
}

struct Planner<'a> {
    config: &'a Config,
    steps: Vec<Step>,
}

impl<'a> Planner<'a> {
    fn notice(&mut self, task: &'static str, message: &str) {
        self.steps.push(Step {
            task,
            action: Action::Notice(message.to_string()),
        });
    }

    fn done(&mut self, task: &'static str, message: &str) {
        self.steps.push(Step {
            task,
            action: Action::Done(message.to_string()),
        });
    }

    fn push_run(&mut self, task: &'static str, command: RemoteCommand) {
        self.steps.push(Step {
            task,
            action: Action::Run(command),
        });
    }

    fn get(&mut self, task: &'static str, remote_path: String) {
        self.steps.push(Step {
            task,
            action: Action::Get { remote_path },
        });
    }

    fn render(&self, key: &str, template: &str, extra: &[(&str, &str)]) -> Result<String> {
        let config = self.config;
        let mut vars = vec![
            (TemplateVars::PROJECT, config.project.as_str()),
            (TemplateVars::PATH, config.path.as_str()),
            (TemplateVars::REMOTE, config.git.remote.as_str()),
            (TemplateVars::BRANCH, config.git.branch.as_str()),
            (TemplateVars::PROGRAM, config.program()),
            (TemplateVars::MANAGE, config.manage.as_str()),
        ];
        vars.extend_from_slice(extra);
        render_strict(&format!("commands.{}", key), template, &vars)
    }

    /// Run a command as-is.
    fn run(&mut self, task: &'static str, key: &str, template: &str) -> Result<()> {
        let command = self.render(key, template, &[])?;
        self.push_run(task, RemoteCommand::plain(command));
        Ok(())
    }

    /// Run a command inside the project directory with the environment active.
    fn run_in_env(
        &mut self,
        task: &'static str,
        key: &str,
        template: &str,
        extra: &[(&str, &str)],
    ) -> Result<()> {
        let command = self.render(key, template, extra)?;
        let wrapped = in_environment(self.config, &command);
        self.push_run(task, RemoteCommand::plain(wrapped));
        Ok(())
    }

    fn plan<Tz: TimeZone>(&mut self, task: &Task, now: &DateTime<Tz>) -> Result<()>
    where
        Tz::Offset: std::fmt::Display,
    {
        let commands = self.config.commands.clone();
        match task {
            Task::Deploy => {
                for sub in [
                    Task::Makedump,
                    Task::Pull,
                    Task::SyncMigrateDb,
                    Task::Collectstatic,
                    Task::Restart,
                ] {
                    self.plan(&sub, now)?;
                }
            }
            Task::Pull => {
                let t = "pull";
                self.notice(t, "Reset Head");
                self.run_in_env(t, "checkout", &commands.checkout, &[])?;
                self.done(t, "Done");
                self.notice(t, "Pull files from server");
                self.run_in_env(t, "pull", &commands.pull, &[])?;
                self.done(t, "Done");
                self.run_in_env(t, "log", &commands.log, &[])?;
                self.done(t, "Done");
            }
            Task::SyncMigrateDb => {
                let t = "sync_migrate_db";
                self.notice(t, "Syncing and Migrating database");
                self.run_in_env(t, "syncdb", &commands.syncdb, &[])?;
                self.run_in_env(t, "migrate", &commands.migrate, &[])?;
                self.done(t, "Done");
            }
            Task::Restart => {
                let t = "restart";
                self.notice(t, "Restart server");
                self.run(t, "restart", &commands.restart)?;
                self.done(t, "Done");
            }
            Task::Install { package } => {
                let package = require_package(package)?;
                self.run_in_env(
                    "install",
                    "install",
                    &commands.install,
                    &[(TemplateVars::PACKAGE, package.as_str())],
                )?;
            }
            Task::Uninstall { package } => {
                let package = require_package(package)?;
                self.run_in_env(
                    "uninstall",
                    "uninstall",
                    &commands.uninstall,
                    &[(TemplateVars::PACKAGE, package.as_str())],
                )?;
            }
            Task::Collectstatic => {
                let t = "collectstatic";
                self.notice(t, "Collecting Files");
                self.run_in_env(t, "collectstatic", &commands.collectstatic, &[])?;
                self.done(t, "Collect static complete!");
            }
            Task::ClearThumbs => {
                let t = "clear_thumbs";
                self.notice(t, "Cleaning thumbs..");
                self.run_in_env(t, "clearThumbs", &commands.clear_thumbs, &[])?;
                self.done(t, "Cleaning thumbnails complete!");
            }
            Task::Makedump => {
                self.run("makedump", "backup", &commands.backup)?;
            }
            Task::Getdump => self.plan_getdump(now)?,
            Task::Getfile { path } => {
                if path.trim().is_empty() {
                    return Err(Error::validation_missing_argument(vec!["path".to_string()]));
                }
                self.get("getfile", path.clone());
            }
        }
        Ok(())
    }

    fn plan_getdump<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Result<()>
    where
        Tz::Offset: std::fmt::Display,
    {
        let t = "getdump";
        let db = &self.config.database;
        if db.name.trim().is_empty() {
            return Err(Error::config_missing_key(
                "database.name",
                self.config.source_display(),
            ));
        }
        if db.user.trim().is_empty() {
            return Err(Error::config_missing_key(
                "database.user",
                self.config.source_display(),
            ));
        }

        let dir = db.dump_dir.clone();
        let filename = join_remote(
            &dir,
            &format!("{}-{}.sql", db.name, now.format(DUMP_TIMESTAMP_FORMAT)),
        );
        let quoted_file = shell::quote_arg(&filename);

        self.push_run(
            t,
            RemoteCommand::plain(format!("mkdir -p {}", shell::quote_arg(&dir))),
        );

        let head = format!(
            "mysqldump --add-drop-table {} {}",
            shell::quote_arg(&format!("--host={}", db.host)),
            shell::quote_arg(&format!("-u{}", db.user)),
        );
        let tail = format!("{} > {}", shell::quote_arg(&db.name), quoted_file);
        let dump = if db.password.is_empty() {
            RemoteCommand::plain(format!("{} {}", head, tail))
        } else {
            RemoteCommand {
                command: format!(
                    "{} {} {}",
                    head,
                    shell::quote_arg(&format!("-p{}", db.password)),
                    tail
                ),
                display: format!("{} -p**** {}", head, tail),
            }
        };
        self.push_run(t, dump);

        self.push_run(t, RemoteCommand::plain(format!("gzip {}", quoted_file)));
        self.get(t, format!("{}.gz", filename));
        Ok(())
    }
}

/// `cd <path> && <activate> && <command>`
pub fn in_environment(config: &Config, command: &str) -> String {
    format!(
        "cd {} && {} && {}",
        shell::quote_arg(&config.path),
        config.activate.trim(),
        command
    )
}

fn require_package(package: &str) -> Result<String> {
    let package = package.trim();
    if package.is_empty() {
        return Err(Error::validation_missing_argument(vec![
            "package".to_string()
        ]));
    }
    Ok(shell::quote_arg(package))
}

/// Join a remote directory and file name the way a POSIX path join would.
pub fn join_remote(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return name.to_string();
    }
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

/// Expand a task into its steps.
pub fn plan<Tz: TimeZone>(task: &Task, config: &Config, now: &DateTime<Tz>) -> Result<Vec<Step>>
where
    Tz::Offset: std::fmt::Display,
{
    let mut planner = Planner {
        config,
        steps: Vec::new(),
    };
    planner.plan(task, now)?;
    Ok(planner.steps)
}
