use serde::Serialize;

use caddie::config;
use caddie::roles::{self, Host};

use super::{CmdResult, GlobalArgs};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleEntry {
    pub name: String,
    pub is_default: bool,
    pub hosts: Vec<Host>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolesOutput {
    pub command: String,
    pub project: String,
    pub default_role: String,
    pub roles: Vec<RoleEntry>,
}

pub(crate) fn run(global: &GlobalArgs) -> CmdResult<RolesOutput> {
    let config = config::load(global.config.as_deref())?;

    let mut entries = Vec::with_capacity(config.roledefs.len());
    for name in config.roledefs.keys() {
        entries.push(RoleEntry {
            name: name.clone(),
            is_default: *name == config.default_role,
            hosts: roles::hosts_for_role(&config, name)?,
        });
    }

    Ok((
        RolesOutput {
            command: "roles".to_string(),
            project: config.project.clone(),
            default_role: config.default_role.clone(),
            roles: entries,
        },
        0,
    ))
}
