use std::io;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

/// Failure of an external program.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("'{program}' could not be started: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' failed with {}{}", describe_code(.code), describe_stderr(.stderr))]
    Failed { program: String, code: Option<i32>, stderr: String },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() { String::new() } else { format!(": {trimmed}") }
}

/// Seam over process execution so stages can be driven without spawning anything.
pub trait CommandRunner {
    /// Run `program` with `args`. With `stream_output` the child shares our stdio,
    /// otherwise stdout is discarded and stderr captured for the error.
    fn run(&self, program: &str, args: &[String], stream_output: bool)
    -> Result<(), ExecutionError>;
}

/// Runs programs through `std::process`, resolving them via `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        stream_output: bool,
    ) -> Result<(), ExecutionError> {
        debug!(program, args = ?redact(args), stream_output, "running command");

        let mut command = Command::new(program);
        command.args(args);

        let spawn_error =
            |source: io::Error| ExecutionError::Spawn { program: program.to_string(), source };

        if stream_output {
            let status = command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map_err(spawn_error)?;
            if status.success() {
                return Ok(());
            }
            return Err(ExecutionError::Failed {
                program: program.to_string(),
                code: status.code(),
                stderr: String::new(),
            });
        }

        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(spawn_error)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ExecutionError::Failed {
                program: program.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}

/// Hide credential values before arguments reach the log.
pub fn redact(args: &[String]) -> Vec<String> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, _)) if key.ends_with("sonar.login") || key.ends_with("sonar.token") => {
                format!("{key}=***")
            }
            _ => arg.clone(),
        })
        .collect()
}

/// Convenience for building owned argument lists from literals.
pub fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}
