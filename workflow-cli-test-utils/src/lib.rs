//! Workflow CLI end-to-end testing utilities
//!
//! This crate handles the drudgery of driving the `deis` CLI against a live
//! Workflow controller:
//! - Shell command lines rendered from `{}` templates
//! - Process lifecycle with live stdout/stderr capture
//! - Polling assertions on exit codes and output with bounded timeouts
//! - Controller endpoint resolution from the environment
//! - Fixture identities, SSH key provisioning and suite setup/teardown
//! - A scripted fake CLI for exercising the harness offline

use std::path::PathBuf;
use std::time::Duration;

pub mod controller;
pub mod error;
pub mod fake;
pub mod fixtures;
pub mod process;
pub mod ssh;
pub mod suite;
pub mod template;
pub mod workflow_cmd;

pub use controller::Controller;
pub use error::{ConfigError, HarnessError, Result, TemplateError};
pub use fake::FakeWorkflow;
pub use fixtures::{Fixtures, Identity, random_app_name};
pub use process::{ProcessHandle, Runner, Stream};
pub use ssh::SshKey;
pub use suite::{Context, SuiteConfig, TeardownReport};
pub use template::Template;
pub use workflow_cmd::WorkflowCli;

/// Default wait for polling assertions when a caller does not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Harness-wide configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// CLI executable, looked up on `PATH` unless it contains a `/`.
    pub cli: String,
    /// Shell used to interpret rendered command lines.
    pub shell: PathBuf,
    pub default_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            cli: "deis".to_string(),
            shell: PathBuf::from("/bin/sh"),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}
