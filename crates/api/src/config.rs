//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use softgate_commands::CommandRunner;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_JWT_SECRET: &str = "dev-secret";
const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not valid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub runner: CommandRunner,
    /// Messages queued per connection before the relay waits on the socket.
    pub outbound_capacity: usize,
}

impl AppConfig {
    /// Defaults suitable for tests and local runs.
    pub fn new(jwt_secret: impl Into<String>, runner: CommandRunner) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: jwt_secret.into(),
            runner,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDR", e))?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEFAULT_JWT_SECRET.to_string()
        });

        let mut runner = match lookup("COMMAND_RUNNER") {
            Some(invocation) => CommandRunner::from_invocation(&invocation)
                .ok_or_else(|| invalid("COMMAND_RUNNER", "empty invocation"))?,
            None => CommandRunner::default(),
        };
        if let Some(dir) = lookup("COMMAND_WORKDIR") {
            runner = runner.with_working_dir(dir);
        }
        if let Some(ms) = lookup("COMMAND_TERMINATE_GRACE_MS") {
            let ms: u64 = ms.parse().map_err(|e| invalid("COMMAND_TERMINATE_GRACE_MS", e))?;
            runner = runner.with_terminate_grace(Duration::from_millis(ms));
        }

        let outbound_capacity = match lookup("COMMAND_OUTBOUND_CAPACITY") {
            Some(n) => match n.parse::<usize>() {
                Ok(0) => return Err(invalid("COMMAND_OUTBOUND_CAPACITY", "must be positive")),
                Ok(n) => n,
                Err(e) => return Err(invalid("COMMAND_OUTBOUND_CAPACITY", e)),
            },
            None => DEFAULT_OUTBOUND_CAPACITY,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            runner,
            outbound_capacity,
        })
    }
}

fn invalid(var: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| vars.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.jwt_secret, DEFAULT_JWT_SECRET);
        assert_eq!(cfg.runner, CommandRunner::default());
        assert_eq!(cfg.outbound_capacity, DEFAULT_OUTBOUND_CAPACITY);
    }

    #[test]
    fn reads_runner_settings() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("COMMAND_RUNNER", "python3 /srv/app/manage.py"),
            ("COMMAND_TERMINATE_GRACE_MS", "250"),
            ("COMMAND_OUTBOUND_CAPACITY", "8"),
        ]))
        .unwrap();
        assert_eq!(cfg.runner.program(), "python3");
        assert_eq!(cfg.runner.argv("migrate"), vec!["/srv/app/manage.py", "migrate"]);
        assert_eq!(cfg.runner.terminate_grace(), Duration::from_millis(250));
        assert_eq!(cfg.outbound_capacity, 8);
    }

    #[test]
    fn rejects_bad_values() {
        let err = AppConfig::from_lookup(lookup(&[("BIND_ADDR", "nowhere")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "BIND_ADDR", .. }));

        let err = AppConfig::from_lookup(lookup(&[("COMMAND_RUNNER", "   ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "COMMAND_RUNNER", .. }));

        let err = AppConfig::from_lookup(lookup(&[("COMMAND_TERMINATE_GRACE_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "COMMAND_TERMINATE_GRACE_MS", .. }));

        let err = AppConfig::from_lookup(lookup(&[("COMMAND_OUTBOUND_CAPACITY", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "COMMAND_OUTBOUND_CAPACITY", .. }));
    }
}
