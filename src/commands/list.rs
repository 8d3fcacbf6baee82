use caddie::config;
use caddie::tasks::{TaskInfo, CATALOGUE};

use super::GlobalArgs;

pub(crate) fn run_markdown(global: &GlobalArgs) -> caddie::Result<(String, i32)> {
    // The listing works without a config; it only names the default role when one loads.
    let default_role = config::load(global.config.as_deref())
        .ok()
        .map(|c| c.default_role);
    Ok((render_task_list(CATALOGUE, default_role.as_deref()), 0))
}

fn usage(task: &TaskInfo) -> String {
    let mut usage = task.name.to_string();
    for param in task.params {
        usage.push_str(&format!(" <{}>", param));
    }
    usage
}

pub(crate) fn render_task_list(tasks: &[TaskInfo], default_role: Option<&str>) -> String {
    let width = tasks.iter().map(|t| usage(t).len()).max().unwrap_or(0);

    let mut out = String::from("Available tasks:\n\n");
    for task in tasks {
        let target = if task.role_bound {
            format!("[role: {}]", default_role.unwrap_or("default"))
        } else {
            "[requires --role or --hosts]".to_string()
        };
        out.push_str(&format!(
            "    {:<width$}  {}  {}\n",
            usage(task),
            task.description,
            target,
            width = width
        ));
    }
    out
}
