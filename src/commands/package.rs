use clap::Args;

use caddie::tasks::Task;

use super::task::{self, TaskOutput};
use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct PackageArgs {
    /// Package spec passed to pip (e.g. `Django==1.4.2`)
    pub package: String,
}

pub(crate) fn install(args: PackageArgs, global: &GlobalArgs) -> CmdResult<TaskOutput> {
    task::run(
        Task::Install {
            package: args.package,
        },
        global,
        None,
    )
}

pub(crate) fn uninstall(args: PackageArgs, global: &GlobalArgs) -> CmdResult<TaskOutput> {
    task::run(
        Task::Uninstall {
            package: args.package,
        },
        global,
        None,
    )
}
