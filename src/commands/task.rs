use serde::Serialize;
use std::path::PathBuf;

use caddie::config;
use caddie::log_status;
use caddie::roles;
use caddie::runner::{self, RunOptions, TaskReport};
use caddie::tasks::Task;

use super::{CmdResult, GlobalArgs};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutput {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    #[serde(flatten)]
    pub report: TaskReport,
}

/// Load config, resolve targets and run `task` on each host in turn.
pub(crate) fn run(
    task: Task,
    global: &GlobalArgs,
    local_dir: Option<PathBuf>,
) -> CmdResult<TaskOutput> {
    let config = config::load(global.config.as_deref())?;
    let hosts = roles::resolve_targets(&config, task.role_bound(), &global.roles, &global.hosts)?;

    let options = RunOptions {
        local_dir: local_dir.unwrap_or_else(|| PathBuf::from(".")),
        dry_run: global.dry_run,
    };

    let report = runner::run(&config, &task, &hosts, &options)?;

    if !options.dry_run {
        log_status!(task.name(), "Done on {} host(s)", report.hosts.len());
    }

    Ok((
        TaskOutput {
            command: format!("task.{}", task.name()),
            config_path: config.source_display(),
            report,
        },
        0,
    ))
}
