use clap::Args;

pub type CmdResult<T> = caddie::Result<(T, i32)>;

/// Options shared by every task.
#[derive(Args, Debug, Default)]
pub(crate) struct GlobalArgs {
    /// Config file (defaults: $CADDIE_CONFIG, ./caddie.json, ~/.config/caddie/caddie.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<String>,

    /// Run against this role instead of the task's default (repeatable)
    #[arg(short = 'R', long = "role", global = true, value_name = "ROLE")]
    pub roles: Vec<String>,

    /// Run against these hosts, comma separated (overrides --role)
    #[arg(
        short = 'H',
        long = "hosts",
        global = true,
        value_delimiter = ',',
        value_name = "HOSTS"
    )]
    pub hosts: Vec<String>,

    /// Show the commands each host would run without connecting
    #[arg(long, global = true)]
    pub dry_run: bool,
}

pub mod list;
pub mod package;
pub mod roles;
pub mod task;
pub mod transfer;

pub(crate) fn run_markdown(
    command: crate::Commands,
    global: &GlobalArgs,
) -> caddie::Result<(String, i32)> {
    match command {
        crate::Commands::List => list::run_markdown(global),
        _ => Err(caddie::Error::validation_invalid_argument(
            "output_mode",
            "Command does not support markdown output",
            None,
        )),
    }
}

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($result:expr) => {
        crate::output::map_cmd_result_to_json($result)
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (caddie::Result<serde_json::Value>, i32) {
    use caddie::tasks::Task;

    match command {
        crate::Commands::Deploy => dispatch!(task::run(Task::Deploy, global, None)),
        crate::Commands::Pull => dispatch!(task::run(Task::Pull, global, None)),
        crate::Commands::SyncMigrateDb => dispatch!(task::run(Task::SyncMigrateDb, global, None)),
        crate::Commands::Restart => dispatch!(task::run(Task::Restart, global, None)),
        crate::Commands::Collectstatic => dispatch!(task::run(Task::Collectstatic, global, None)),
        crate::Commands::ClearThumbs => dispatch!(task::run(Task::ClearThumbs, global, None)),
        crate::Commands::Makedump => dispatch!(task::run(Task::Makedump, global, None)),

        crate::Commands::Install(args) => dispatch!(package::install(args, global)),
        crate::Commands::Uninstall(args) => dispatch!(package::uninstall(args, global)),
        crate::Commands::Getdump(args) => dispatch!(transfer::getdump(args, global)),
        crate::Commands::Getfile(args) => dispatch!(transfer::getfile(args, global)),
        crate::Commands::Roles => dispatch!(roles::run(global)),

        // List uses raw output mode
        crate::Commands::List => {
            let err = caddie::Error::validation_invalid_argument(
                "output_mode",
                "List command uses raw output mode",
                None,
            );
            crate::output::map_cmd_result_to_json::<serde_json::Value>(Err(err))
        }
    }
}
