//! Suite-wide context, setup and teardown

use crate::ssh::DEFAULT_KEY_NAME;
use crate::{
    ConfigError, Controller, Fixtures, HarnessConfig, HarnessError, Identity, Result, Runner,
    SshKey, WorkflowCli,
};

/// Everything needed to build a [`Context`]
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    pub host: Option<String>,
    pub port: Option<String>,
    pub harness: HarnessConfig,
    pub ssh_key: SshKey,
    /// Generate the key if absent and add it to an agent before uploading.
    /// When off, the public key must already exist.
    pub provision_ssh_key: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            harness: HarnessConfig::default(),
            ssh_key: SshKey::in_home(DEFAULT_KEY_NAME),
            provision_ssh_key: true,
        }
    }
}

/// Validated suite state, built once and passed by reference to every scenario
#[derive(Debug)]
pub struct Context {
    controller: Controller,
    fixtures: Fixtures,
    cli: WorkflowCli,
    ssh_key: SshKey,
    provision_ssh_key: bool,
}

impl Context {
    /// Check the environment and generate fresh fixtures.
    ///
    /// Fails when the CLI cannot be found, or is named in a way that would not
    /// survive the shell, or no controller host is configured.
    pub fn new(config: SuiteConfig) -> std::result::Result<Self, ConfigError> {
        Self::with_fixtures(config, Fixtures::generate())
    }

    pub fn with_fixtures(
        config: SuiteConfig,
        fixtures: Fixtures,
    ) -> std::result::Result<Self, ConfigError> {
        // command lines are handed to the shell unquoted
        if !is_shell_safe(&config.harness.cli) {
            return Err(ConfigError::UnsafeCliPath {
                cli: config.harness.cli,
            });
        }
        let cli_path = which::which(&config.harness.cli).map_err(|source| {
            ConfigError::CliNotFound {
                cli: config.harness.cli.clone(),
                source,
            }
        })?;
        let controller = Controller::resolve(config.host.as_deref(), config.port.as_deref())?;

        tracing::info!(
            controller = %controller,
            cli = ?cli_path,
            admin = %fixtures.admin.username,
            user = %fixtures.user.username,
            "suite context ready"
        );

        Ok(Self {
            controller,
            fixtures,
            cli: WorkflowCli::new(Runner::new(config.harness)),
            ssh_key: config.ssh_key,
            provision_ssh_key: config.provision_ssh_key,
        })
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn url(&self) -> &str {
        self.controller.url()
    }

    pub fn admin(&self) -> &Identity {
        &self.fixtures.admin
    }

    pub fn user(&self) -> &Identity {
        &self.fixtures.user
    }

    pub fn cli(&self) -> &WorkflowCli {
        &self.cli
    }

    pub fn runner(&self) -> &Runner {
        self.cli.runner()
    }

    pub fn ssh_key(&self) -> &SshKey {
        &self.ssh_key
    }
}

fn is_shell_safe(cli: &str) -> bool {
    !cli.is_empty()
        && !cli
            .chars()
            .any(|c| c.is_whitespace() || "'\"`$;&|<>(){}[]*?!~#\\".contains(c))
}

/// Register both accounts, confirm admin privilege and give the regular
/// account an SSH key. Leaves the regular account logged in.
pub async fn setup(ctx: &Context) -> Result<()> {
    let cli = ctx.cli();

    tracing::info!(user = %ctx.admin().username, "registering admin");
    cli.register(ctx.url(), ctx.admin())
        .await
        .map_err(|e| e.during("register admin"))?;
    cli.users_list()
        .await
        .map_err(|e| e.during("verify admin privilege"))?;

    tracing::info!(user = %ctx.user().username, "registering user");
    cli.register(ctx.url(), ctx.user())
        .await
        .map_err(|e| e.during("register user"))?;

    if ctx.provision_ssh_key {
        ctx.ssh_key()
            .ensure(ctx.runner())
            .await
            .map_err(|e| e.during("provision ssh key"))?;
    }
    cli.keys_add(ctx.ssh_key())
        .await
        .map_err(|e| e.during("upload ssh key"))?;

    tracing::info!("suite setup complete");
    Ok(())
}

/// Outcome of cancelling each fixture account
#[derive(Debug)]
pub struct TeardownReport {
    pub user: Result<()>,
    pub admin: Result<()>,
}

impl TeardownReport {
    pub fn is_ok(&self) -> bool {
        self.user.is_ok() && self.admin.is_ok()
    }

    /// Fold both outcomes into one error listing every failed account
    pub fn into_result(self, ctx: &Context) -> Result<()> {
        let failures: Vec<_> = [
            (ctx.user().username.clone(), self.user),
            (ctx.admin().username.clone(), self.admin),
        ]
        .into_iter()
        .filter_map(|(who, outcome)| outcome.err().map(|e| (who, e)))
        .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::Teardown { failures })
        }
    }
}

/// Cancel both accounts. The second cancellation runs whatever happened to
/// the first.
pub async fn teardown(ctx: &Context) -> TeardownReport {
    let user = ctx.cli().cancel(ctx.url(), ctx.user()).await;
    if let Err(e) = &user {
        tracing::error!(user = %ctx.user().username, error = %e, "failed to cancel account");
    }

    let admin = ctx.cli().cancel(ctx.url(), ctx.admin()).await;
    if let Err(e) = &admin {
        tracing::error!(user = %ctx.admin().username, error = %e, "failed to cancel account");
    }

    TeardownReport { user, admin }
}

#[cfg(test)]
mod tests {
    use super::is_shell_safe;

    #[test]
    fn plain_paths_are_shell_safe() {
        for cli in ["deis", "/usr/local/bin/deis", "./bin/deis-v2.3", "/tmp/workflow-test-x_1/deis"] {
            assert!(is_shell_safe(cli), "{cli}");
        }
    }

    #[test]
    fn paths_the_shell_would_split_or_expand_are_rejected() {
        for cli in ["", "/opt/my tools/deis", "deis;rm", "$HOME/deis", "~/deis", "de'is", "/bin/de*"] {
            assert!(!is_shell_safe(cli), "{cli}");
        }
    }
}
