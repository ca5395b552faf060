//! Error taxonomy for the harness

use crate::process::Stream;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Problems with the environment, detected before any scenario runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "Set {var} to the workflow controller hostname for tests, such as:\n\n$ {var}=deis.10.245.1.3.xip.io cargo run -p workflow-e2e"
    )]
    MissingHost { var: &'static str },
    #[error("`{cli}` executable not found: {source}")]
    CliNotFound {
        cli: String,
        #[source]
        source: which::Error,
    },
    #[error("`{cli}` contains whitespace or shell metacharacters; put it on PATH or use a plain path")]
    UnsafeCliPath { cli: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template `{template}` has no argument for placeholder #{index}")]
    MissingArgument { template: String, index: usize },
    #[error("template `{template}` has {placeholders} placeholders but {given} arguments")]
    UnusedArguments {
        template: String,
        placeholders: usize,
        given: usize,
    },
    #[error("template `{template}` has an unmatched brace at byte {position}")]
    UnmatchedBrace { template: String, position: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` did not exit within {timeout:?}")]
    ExitTimeout { command: String, timeout: Duration },
    #[error("exit status of `{command}` could not be collected")]
    ExitUnknown { command: String },
    #[error(
        "`{command}` exited with code {actual:?}, expected {expected}\nstdout: {stdout}\nstderr: {stderr}"
    )]
    ExitCodeMismatch {
        command: String,
        expected: i32,
        /// `None` when the child was terminated by a signal.
        actual: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("{stream} of `{command}` did not contain {pattern:?} within {timeout:?}\n{stream}: {captured}")]
    OutputTimeout {
        command: String,
        stream: Stream,
        pattern: String,
        timeout: Duration,
        captured: String,
    },
    #[error("`{command}` failed with exit code {code:?}\nstderr: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("setup step `{step}` failed: {source}")]
    Setup {
        step: &'static str,
        #[source]
        source: Box<HarnessError>,
    },
    #[error("teardown failed for {}", describe_failures(.failures))]
    Teardown { failures: Vec<(String, HarnessError)> },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    pub(crate) fn during(self, step: &'static str) -> Self {
        HarnessError::Setup {
            step,
            source: Box::new(self),
        }
    }
}

fn describe_failures(failures: &[(String, HarnessError)]) -> String {
    failures
        .iter()
        .map(|(who, e)| format!("{who}: {e}"))
        .collect::<Vec<_>>()
        .join("; ")
}
