//! Sequential task execution: one host at a time, one step at a time.
//! The first failing step aborts the whole run.

use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{
    DownloadFailedDetails, Error, RemoteCommandFailedDetails, Result, TargetDetails,
};
use crate::roles::Host;
use crate::ssh::{SshClient, Transport};
use crate::tasks::{self, Action, Step, Task};
use crate::utils::shell;

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory downloads are stored in.
    pub local_dir: PathBuf,
    /// Print the plan without connecting.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from("."),
            dry_run: false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub task: String,
    pub dry_run: bool,
    pub hosts: Vec<HostReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostReport {
    pub host: String,
    pub steps: Vec<StepReport>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StepReport {
    #[serde(rename_all = "camelCase")]
    Run {
        task: String,
        command: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stdout: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Get {
        task: String,
        remote_path: String,
        local_path: String,
    },
}

/// Run `task` against `hosts` over SSH.
pub fn run(config: &Config, task: &Task, hosts: &[Host], options: &RunOptions) -> Result<TaskReport> {
    run_with(config, task, hosts, options, |host| {
        SshClient::from_host(host, &config.key_filename)
    })
}

/// Run `task` using `connect` to open a transport per host.
pub fn run_with<T, F>(
    config: &Config,
    task: &Task,
    hosts: &[Host],
    options: &RunOptions,
    mut connect: F,
) -> Result<TaskReport>
where
    T: Transport,
    F: FnMut(&Host) -> Result<T>,
{
    let steps = tasks::plan(task, config, &Local::now())?;

    let mut report = TaskReport {
        task: task.name().to_string(),
        dry_run: options.dry_run,
        hosts: Vec::with_capacity(hosts.len()),
    };

    for host in hosts {
        log_status!(task.name(), "Executing on {}", host.label());
        let local_dir = download_dir(&options.local_dir, host, hosts);

        let host_report = if options.dry_run {
            HostReport {
                host: host.label(),
                steps: steps
                    .iter()
                    .filter_map(|step| planned_step(step, &local_dir))
                    .collect(),
            }
        } else {
            let transport = connect(host)?;
            execute_steps(config, &transport, task, host, &steps, &local_dir)?
        };

        report.hosts.push(host_report);
    }

    Ok(report)
}

fn execute_steps<T: Transport>(
    config: &Config,
    transport: &T,
    task: &Task,
    host: &Host,
    steps: &[Step],
    local_dir: &Path,
) -> Result<HostReport> {
    let mut reports = Vec::new();

    for step in steps {
        match &step.action {
            Action::Notice(message) | Action::Done(message) => {
                log_status!(step.task, "{}", message);
            }
            Action::Run(command) => {
                log_status!(step.task, "[{}] run: {}", host.label(), command.display);
                let output = transport.execute(&shell::wrap_in_shell(&config.shell, &command.command));
                for line in output.stdout.lines() {
                    log_status!(step.task, "[{}] out: {}", host.label(), line);
                }

                if !output.success {
                    return Err(Error::remote_command_failed(RemoteCommandFailedDetails {
                        command: command.display.clone(),
                        exit_code: output.exit_code,
                        stdout: output.stdout,
                        stderr: output.stderr,
                        target: target(task, host),
                    }));
                }

                reports.push(StepReport::Run {
                    task: step.task.to_string(),
                    command: command.display.clone(),
                    exit_code: Some(output.exit_code),
                    stdout: Some(output.stdout),
                    stderr: Some(output.stderr),
                });
            }
            Action::Get { remote_path } => {
                let local_path = local_path_for(local_dir, remote_path)?;
                fs::create_dir_all(local_dir).map_err(|e| {
                    Error::internal_io(e.to_string(), Some(format!("create {}", local_dir.display())))
                })?;

                log_status!(
                    step.task,
                    "[{}] download: {} -> {}",
                    host.label(),
                    remote_path,
                    local_path.display()
                );
                let output = transport.download(remote_path, &local_path);
                if !output.success {
                    return Err(Error::download_failed(DownloadFailedDetails {
                        remote_path: remote_path.clone(),
                        local_path: local_path.display().to_string(),
                        exit_code: output.exit_code,
                        stderr: output.stderr,
                        target: target(task, host),
                    }));
                }

                reports.push(StepReport::Get {
                    task: step.task.to_string(),
                    remote_path: remote_path.clone(),
                    local_path: local_path.display().to_string(),
                });
            }
        }
    }

    Ok(HostReport {
        host: host.label(),
        steps: reports,
    })
}

fn planned_step(step: &Step, local_dir: &Path) -> Option<StepReport> {
    match &step.action {
        Action::Run(command) => Some(StepReport::Run {
            task: step.task.to_string(),
            command: command.display.clone(),
            exit_code: None,
            stdout: None,
            stderr: None,
        }),
        Action::Get { remote_path } => Some(StepReport::Get {
            task: step.task.to_string(),
            remote_path: remote_path.clone(),
            local_path: local_path_for(local_dir, remote_path)
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }),
        Action::Notice(_) | Action::Done(_) => None,
    }
}

fn target(task: &Task, host: &Host) -> TargetDetails {
    TargetDetails {
        task: Some(task.name().to_string()),
        host: Some(host.label()),
    }
}

/// With several hosts each one downloads into its own subdirectory, named
/// after the host label, or `user@label` when another target shares it.
pub fn download_dir(base: &Path, host: &Host, hosts: &[Host]) -> PathBuf {
    if hosts.len() <= 1 {
        return base.to_path_buf();
    }

    let label = host.label();
    let shared = hosts
        .iter()
        .any(|other| other.label() == label && other.user != host.user);
    let name = if shared {
        format!("{}@{}", host.user, label)
    } else {
        label
    };
    base.join(name.replace(':', "_"))
}

fn local_path_for(local_dir: &Path, remote_path: &str) -> Result<PathBuf> {
    let basename = remote_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .ok_or_else(|| {
            Error::validation_invalid_argument(
                "path",
                "Remote path must name a file",
                Some(remote_path.to_string()),
            )
        })?;
    Ok(local_dir.join(basename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::ssh::CommandOutput;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
        fail_on: Option<String>,
    }

    struct FakeTransport {
        host: String,
        log: Rc<RefCell<Log>>,
    }

    impl Transport for FakeTransport {
        fn execute(&self, command: &str) -> CommandOutput {
            let mut log = self.log.borrow_mut();
            log.events.push(format!("{} run {}", self.host, command));
            let fail = log
                .fail_on
                .as_deref()
                .is_some_and(|needle| command.contains(needle));
            CommandOutput {
                stdout: "ok\n".to_string(),
                stderr: if fail { "boom".to_string() } else { String::new() },
                success: !fail,
                exit_code: if fail { 1 } else { 0 },
            }
        }

        fn download(&self, remote_path: &str, local_path: &Path) -> CommandOutput {
            self.log.borrow_mut().events.push(format!(
                "{} get {} {}",
                self.host,
                remote_path,
                local_path.display()
            ));
            CommandOutput {
                stdout: String::new(),
                stderr: String::new(),
                success: true,
                exit_code: 0,
            }
        }
    }

    fn sample_config() -> Config {
        config::from_json(
            r#"{
                "project": "shop",
                "user": "deploy",
                "path": "/srv/shop",
                "activate": "source /srv/venv/bin/activate",
                "shell": "",
                "roledefs": { "production": ["web1", "web2"] }
            }"#,
            None,
        )
        .unwrap()
    }

    fn hosts() -> Vec<Host> {
        vec![
            Host::parse("web1", "deploy", 22).unwrap(),
            Host::parse("web2", "deploy", 22).unwrap(),
        ]
    }

    fn connector(log: &Rc<RefCell<Log>>) -> impl FnMut(&Host) -> Result<FakeTransport> + '_ {
        move |host| {
            Ok(FakeTransport {
                host: host.label(),
                log: Rc::clone(log),
            })
        }
    }

    #[test]
    fn hosts_run_one_after_another() {
        let log = Rc::new(RefCell::new(Log::default()));
        let report = run_with(
            &sample_config(),
            &Task::Restart,
            &hosts(),
            &RunOptions::default(),
            connector(&log),
        )
        .unwrap();

        assert_eq!(
            log.borrow().events,
            vec![
                "web1 run supervisorctl restart shop",
                "web2 run supervisorctl restart shop",
            ]
        );
        assert_eq!(report.hosts.len(), 2);
        assert_eq!(report.task, "restart");
    }

    #[test]
    fn commands_are_wrapped_in_configured_shell() {
        let mut config = sample_config();
        config.shell = "/bin/bash -l -c".to_string();
        let log = Rc::new(RefCell::new(Log::default()));

        run_with(
            &config,
            &Task::Restart,
            &hosts()[..1],
            &RunOptions::default(),
            connector(&log),
        )
        .unwrap();

        assert_eq!(
            log.borrow().events,
            vec!["web1 run /bin/bash -l -c 'supervisorctl restart shop'"]
        );
    }

    #[test]
    fn failing_step_aborts_remaining_steps_and_hosts() {
        let log = Rc::new(RefCell::new(Log {
            fail_on: Some("git pull".to_string()),
            ..Log::default()
        }));

        let err = run_with(
            &sample_config(),
            &Task::Deploy,
            &hosts(),
            &RunOptions::default(),
            connector(&log),
        )
        .unwrap_err();

        assert_eq!(err.code.as_str(), "remote.command_failed");
        assert_eq!(err.details["target"]["host"], "web1");
        assert_eq!(err.details["target"]["task"], "deploy");
        assert_eq!(err.details["stderr"], "boom");

        let events = &log.borrow().events;
        assert_eq!(events.len(), 3);
        assert!(events[0].ends_with("/etc/cron.hourly/automysqlbackup"));
        assert!(events[1].ends_with("git checkout -f"));
        assert!(events.iter().all(|e| e.starts_with("web1 ")));
    }

    #[test]
    fn dry_run_never_connects() {
        let report = run_with(
            &sample_config(),
            &Task::Deploy,
            &hosts(),
            &RunOptions {
                dry_run: true,
                ..RunOptions::default()
            },
            |_host: &Host| -> Result<FakeTransport> {
                Err(Error::internal_unexpected("should not connect"))
            },
        )
        .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.hosts[1].steps.len(), 8);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["hosts"][0]["steps"][0]["kind"], "run");
        assert_eq!(json["hosts"][0]["steps"][0]["task"], "makedump");
        assert!(json["hosts"][0]["steps"][0].get("exitCode").is_none());
    }

    #[test]
    fn single_host_downloads_into_local_dir() {
        let dir = TempDir::new().unwrap();
        let log = Rc::new(RefCell::new(Log::default()));
        let options = RunOptions {
            local_dir: dir.path().to_path_buf(),
            dry_run: false,
        };

        let report = run_with(
            &sample_config(),
            &Task::Getfile {
                path: "/var/log/app/error.log".to_string(),
            },
            &hosts()[..1],
            &options,
            connector(&log),
        )
        .unwrap();

        let expected = dir.path().join("error.log");
        assert_eq!(
            log.borrow().events,
            vec![format!("web1 get /var/log/app/error.log {}", expected.display())]
        );
        match &report.hosts[0].steps[0] {
            StepReport::Get { local_path, .. } => {
                assert_eq!(local_path, &expected.display().to_string())
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn several_hosts_download_into_per_host_dirs() {
        let dir = TempDir::new().unwrap();
        let log = Rc::new(RefCell::new(Log::default()));
        let options = RunOptions {
            local_dir: dir.path().to_path_buf(),
            dry_run: false,
        };

        run_with(
            &sample_config(),
            &Task::Getfile {
                path: "/etc/hosts".to_string(),
            },
            &hosts(),
            &options,
            connector(&log),
        )
        .unwrap();

        assert!(dir.path().join("web1").is_dir());
        assert!(dir.path().join("web2").is_dir());
        assert!(log.borrow().events[1].ends_with(&format!(
            "{}",
            dir.path().join("web2").join("hosts").display()
        )));
    }

    #[test]
    fn getfile_rejects_directory_like_path() {
        let log = Rc::new(RefCell::new(Log::default()));
        let err = run_with(
            &sample_config(),
            &Task::Getfile {
                path: "/".to_string(),
            },
            &hosts()[..1],
            &RunOptions::default(),
            connector(&log),
        )
        .unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
        assert!(log.borrow().events.is_empty());
    }

    #[test]
    fn download_dir_replaces_port_separator() {
        let host = Host::parse("web1:2222", "deploy", 22).unwrap();
        let both = vec![host.clone(), Host::parse("web2", "deploy", 22).unwrap()];
        assert_eq!(
            download_dir(Path::new("dumps"), &host, &both),
            PathBuf::from("dumps").join("web1_2222")
        );
        assert_eq!(
            download_dir(Path::new("dumps"), &host, &both[..1]),
            PathBuf::from("dumps")
        );
    }

    #[test]
    fn users_sharing_an_address_download_apart() {
        let dir = TempDir::new().unwrap();
        let log = Rc::new(RefCell::new(Log::default()));
        let targets = vec![
            Host::parse("alice@web1", "deploy", 22).unwrap(),
            Host::parse("bob@web1", "deploy", 22).unwrap(),
            Host::parse("web2", "deploy", 22).unwrap(),
        ];

        run_with(
            &sample_config(),
            &Task::Getfile {
                path: "/home/app/.bash_history".to_string(),
            },
            &targets,
            &RunOptions {
                local_dir: dir.path().to_path_buf(),
                dry_run: false,
            },
            connector(&log),
        )
        .unwrap();

        assert!(dir.path().join("alice@web1").is_dir());
        assert!(dir.path().join("bob@web1").is_dir());
        assert!(dir.path().join("web2").is_dir());
        assert!(!dir.path().join("web1").exists());
    }
}
