//! The administrative command runner invocation.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, Command};

use crate::process::{self, MergedOutput};

pub const DEFAULT_TERMINATE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to start `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fixed runner invocation that client command words are appended to.
///
/// The default is `python manage.py`, so `{"command": "migrate --plan"}`
/// runs `python manage.py migrate --plan`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRunner {
    program: String,
    base_args: Vec<String>,
    working_dir: Option<PathBuf>,
    terminate_grace: Duration,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new("python").with_args(["manage.py"])
    }
}

impl CommandRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            working_dir: None,
            terminate_grace: DEFAULT_TERMINATE_GRACE,
        }
    }

    /// Parse a whitespace-separated invocation such as `"python manage.py"`.
    pub fn from_invocation(invocation: &str) -> Option<Self> {
        let mut words = invocation.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program).with_args(words))
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_terminate_grace(mut self, grace: Duration) -> Self {
        self.terminate_grace = grace;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn terminate_grace(&self) -> Duration {
        self.terminate_grace
    }

    /// Arguments passed to the program for a client command line.
    pub fn argv(&self, command_line: &str) -> Vec<String> {
        self.base_args
            .iter()
            .cloned()
            .chain(command_line.split_whitespace().map(str::to_string))
            .collect()
    }

    pub(crate) fn spawn(&self, command_line: &str) -> Result<SpawnedCommand, SpawnError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.argv(command_line))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        let (child, output) = process::spawn_merged(cmd).map_err(|source| SpawnError::Io {
            program: self.program.clone(),
            source,
        })?;
        let pid = child.id();

        Ok(SpawnedCommand {
            // The child leads its own group, so the group id is its pid.
            group: if cfg!(unix) { pid.and_then(|p| i32::try_from(p).ok()) } else { None },
            pid,
            child,
            output,
        })
    }
}

pub(crate) struct SpawnedCommand {
    pub child: Child,
    pub output: MergedOutput,
    pub pid: Option<u32>,
    pub group: Option<i32>,
}
