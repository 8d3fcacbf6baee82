use clap::Args;
use std::path::PathBuf;

use caddie::tasks::Task;

use super::task::{self, TaskOutput};
use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct GetdumpArgs {
    /// Local directory to store the compressed dump in
    #[arg(long, default_value = ".")]
    pub local_dir: PathBuf,
}

#[derive(Args)]
pub struct GetfileArgs {
    /// Remote file path
    pub path: String,

    /// Local directory to store the file in
    #[arg(long, default_value = ".")]
    pub local_dir: PathBuf,
}

pub(crate) fn getdump(args: GetdumpArgs, global: &GlobalArgs) -> CmdResult<TaskOutput> {
    task::run(Task::Getdump, global, Some(args.local_dir))
}

pub(crate) fn getfile(args: GetfileArgs, global: &GlobalArgs) -> CmdResult<TaskOutput> {
    task::run(Task::Getfile { path: args.path }, global, Some(args.local_dir))
}
