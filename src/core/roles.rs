//! Role-based host selection.

use crate::config::Config;
use crate::error::{Error, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub user: String,
    pub address: String,
    pub port: u16,
}

impl Host {
    /// Parse a host string of the form `[user@]address[:port]`.
    ///
    /// IPv6 addresses with a port must be bracketed (`[::1]:2222`); a bare
    /// IPv6 address is taken as-is.
    pub fn parse(spec: &str, default_user: &str, default_port: u16) -> Result<Host> {
        let spec = spec.trim();
        let (user, rest) = match spec.split_once('@') {
            Some((user, rest)) => (user, rest),
            None => (default_user, spec),
        };

        let (address, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (address, after) = bracketed.split_once(']').ok_or_else(|| {
                Error::validation_invalid_argument(
                    "hosts",
                    "Unterminated '[' in host address",
                    Some(spec.to_string()),
                )
            })?;
            let port = match after.strip_prefix(':') {
                Some(port) => Some(port),
                None if after.is_empty() => None,
                None => {
                    return Err(Error::validation_invalid_argument(
                        "hosts",
                        "Unexpected characters after ']'",
                        Some(spec.to_string()),
                    ))
                }
            };
            (address, port)
        } else if rest.matches(':').count() == 1 {
            let (address, port) = rest.split_once(':').unwrap_or((rest, ""));
            (address, Some(port))
        } else {
            (rest, None)
        };

        if user.is_empty() || address.is_empty() {
            return Err(Error::validation_invalid_argument(
                "hosts",
                "Host must have a user and an address",
                Some(spec.to_string()),
            ));
        }

        let port = match port {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                Error::validation_invalid_argument(
                    "hosts",
                    format!("Invalid port '{}'", raw),
                    Some(spec.to_string()),
                )
            })?,
            None => default_port,
        };

        Ok(Host {
            user: user.to_string(),
            address: address.to_string(),
            port,
        })
    }

    /// Short label used in logs and local download directories.
    pub fn label(&self) -> String {
        if self.port == 22 {
            self.address.clone()
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.address.as_str(), "localhost" | "127.0.0.1" | "::1")
    }
}

/// Hosts configured for a role, in configured order.
pub fn hosts_for_role(config: &Config, role: &str) -> Result<Vec<Host>> {
    let specs = config
        .roledefs
        .get(role)
        .ok_or_else(|| Error::role_not_found(role, config.role_names()))?;

    specs
        .iter()
        .map(|spec| Host::parse(spec, &config.user, config.port))
        .collect()
}

/// Resolve the hosts a task runs against.
///
/// Explicit hosts win over roles; explicit roles win over the task's
/// default role. Role-less tasks without explicit targets are an error.
pub fn resolve_targets(
    config: &Config,
    role_bound: bool,
    roles: &[String],
    hosts: &[String],
) -> Result<Vec<Host>> {
    if !hosts.is_empty() {
        let targets = hosts
            .iter()
            .filter(|h| !h.trim().is_empty())
            .map(|spec| Host::parse(spec, &config.user, config.port))
            .collect::<Result<Vec<_>>>()?;
        if targets.is_empty() {
            return Err(Error::validation_invalid_argument(
                "hosts",
                "No host given",
                Some(hosts.join(",")),
            )
            .with_hint("Pass at least one host, e.g. --hosts web1.example.com"));
        }
        return Ok(targets);
    }

    if !roles.is_empty() {
        let mut targets = Vec::new();
        for role in roles {
            targets.extend(hosts_for_role(config, role)?);
        }
        return Ok(targets);
    }

    if role_bound {
        return hosts_for_role(config, &config.default_role);
    }

    Err(Error::validation_missing_argument(vec![
        "role".to_string(),
        "hosts".to_string(),
    ])
    .with_hint("This task has no default role. Pass --role <name> or --hosts <host,...>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn sample_config() -> Config {
        config::from_json(
            r#"{
                "project": "shop",
                "user": "deploy",
                "port": 2200,
                "path": "/srv/shop/",
                "activate": "source /srv/venv/bin/activate",
                "roledefs": {
                    "production": ["web1.example.com", "ops@web2.example.com:22"],
                    "dev": ["dev.local"]
                }
            }"#,
            None,
        )
        .unwrap()
    }

    #[test]
    fn parse_applies_defaults() {
        let host = Host::parse("10.0.0.1", "deploy", 22).unwrap();
        assert_eq!(
            host,
            Host {
                user: "deploy".into(),
                address: "10.0.0.1".into(),
                port: 22
            }
        );
    }

    #[test]
    fn parse_user_and_port() {
        let host = Host::parse("root@db.internal:2222", "deploy", 22).unwrap();
        assert_eq!(host.user, "root");
        assert_eq!(host.address, "db.internal");
        assert_eq!(host.port, 2222);
        assert_eq!(host.label(), "db.internal:2222");
    }

    #[test]
    fn parse_ipv6() {
        let bare = Host::parse("::1", "deploy", 22).unwrap();
        assert_eq!(bare.address, "::1");
        assert!(bare.is_local());

        let bracketed = Host::parse("[fe80::1]:2022", "deploy", 22).unwrap();
        assert_eq!(bracketed.address, "fe80::1");
        assert_eq!(bracketed.port, 2022);
    }

    #[test]
    fn parse_rejects_bad_port() {
        let err = Host::parse("web1:http", "deploy", 22).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }

    #[test]
    fn default_role_is_used_for_role_bound_tasks() {
        let config = sample_config();
        let hosts = resolve_targets(&config, true, &[], &[]).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].address, "web1.example.com");
        assert_eq!(hosts[0].port, 2200);
        assert_eq!(hosts[1].user, "ops");
        assert_eq!(hosts[1].port, 22);
    }

    #[test]
    fn explicit_roles_concatenate_in_order() {
        let config = sample_config();
        let roles = vec!["dev".to_string(), "production".to_string()];
        let hosts = resolve_targets(&config, true, &roles, &[]).unwrap();
        let addresses: Vec<_> = hosts.iter().map(|h| h.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec!["dev.local", "web1.example.com", "web2.example.com"]
        );
    }

    #[test]
    fn explicit_hosts_take_precedence() {
        let config = sample_config();
        let roles = vec!["dev".to_string()];
        let hosts = vec!["build@ci.local".to_string()];
        let resolved = resolve_targets(&config, true, &roles, &hosts).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].user, "build");
    }

    #[test]
    fn unknown_role_is_not_found() {
        let config = sample_config();
        let err = resolve_targets(&config, true, &["staging".to_string()], &[]).unwrap_err();
        assert_eq!(err.code.as_str(), "role.not_found");
        assert_eq!(err.details["available"][0], "dev");
    }

    #[test]
    fn roleless_task_requires_targets() {
        let config = sample_config();
        let err = resolve_targets(&config, false, &[], &[]).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.missing_argument");
    }

    #[test]
    fn blank_host_list_is_rejected() {
        let config = sample_config();
        let hosts = vec!["".to_string(), " ".to_string()];
        let err = resolve_targets(&config, true, &[], &hosts).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
        assert_eq!(err.details["field"], "hosts");
    }

    #[test]
    fn blank_entries_between_hosts_are_skipped() {
        let config = sample_config();
        let hosts = vec!["web9".to_string(), "".to_string()];
        let resolved = resolve_targets(&config, false, &[], &hosts).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].address, "web9");
    }
}
