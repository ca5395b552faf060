//! Workflow CLI subcommands with the assertions each one is expected to pass

use crate::{Identity, ProcessHandle, Result, Runner, SshKey, Template, template};
use std::time::Duration;

/// Issues `<cli> <subcommand>` lines and checks their textual signatures
#[derive(Debug, Clone)]
pub struct WorkflowCli {
    runner: Runner,
}

impl WorkflowCli {
    pub fn new(runner: Runner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn timeout(&self) -> Duration {
        self.runner.default_timeout()
    }

    /// Start `<cli> <args>` without asserting anything
    pub fn start(&self, args: Template) -> Result<ProcessHandle> {
        self.runner.run(&args.prefixed(&self.runner.config().cli))
    }

    /// Start `<cli> <args>` and require exit code 0
    pub async fn succeed(&self, args: Template) -> Result<ProcessHandle> {
        let mut sess = self.start(args)?;
        sess.wait_for_exit(0, self.timeout()).await?;
        Ok(sess)
    }

    /// `register`, which also logs the new account in
    pub async fn register(&self, url: &str, id: &Identity) -> Result<()> {
        let mut sess = self.start(template!(
            "register {} --username={} --password={} --email={}",
            url,
            id.username,
            id.password,
            id.email
        ))?;
        sess.wait_for_output(&template!("Registered {}", id.username), self.timeout())
            .await?;
        sess.wait_for_output(&template!("Logged in as {}", id.username), self.timeout())
            .await?;
        sess.wait_for_exit(0, self.timeout()).await
    }

    pub async fn login(&self, url: &str, id: &Identity) -> Result<()> {
        let mut sess = self
            .succeed(template!(
                "login {} --username={} --password={}",
                url,
                id.username,
                id.password
            ))
            .await?;
        sess.wait_for_output(&template!("Logged in as {}", id.username), self.timeout())
            .await
    }

    pub async fn logout(&self) -> Result<()> {
        let mut sess = self.succeed("auth:logout".into()).await?;
        sess.wait_for_output(&"Logged out\n".into(), self.timeout())
            .await
    }

    /// `auth:whoami`, expecting `id` to be the session's account
    pub async fn whoami(&self, id: &Identity) -> Result<()> {
        let mut sess = self.succeed("auth:whoami".into()).await?;
        sess.wait_for_output(&template!("You are {}", id.username), self.timeout())
            .await
    }

    /// Log in as `id`, then irreversibly cancel the account
    pub async fn cancel(&self, url: &str, id: &Identity) -> Result<()> {
        self.login(url, id).await?;

        let mut sess = self
            .succeed(template!(
                "auth:cancel --username={} --password={} --yes",
                id.username,
                id.password
            ))
            .await?;
        sess.wait_for_output(&"Account cancelled".into(), self.timeout())
            .await
    }

    /// Upload the public half of `key` to the logged-in account
    pub async fn keys_add(&self, key: &SshKey) -> Result<()> {
        let mut sess = self
            .succeed(template!("keys:add {}", key.public_path().display()))
            .await?;
        sess.wait_for_output(
            &template!("Uploading {}.pub to deis... done", key.name()),
            self.timeout(),
        )
        .await
    }

    /// `users:list`, which only admins may run
    pub async fn users_list(&self) -> Result<ProcessHandle> {
        self.succeed("users:list".into()).await
    }

    pub async fn apps_create(&self, app: &str) -> Result<()> {
        let mut sess = self
            .succeed(template!("apps:create {} --no-remote", app))
            .await?;
        sess.wait_for_output(&template!("created {}", app), self.timeout())
            .await
    }

    pub async fn apps_destroy(&self, app: &str) -> Result<()> {
        let mut sess = self
            .succeed(template!("apps:destroy --app={} --confirm={}", app, app))
            .await?;
        sess.wait_for_output(&template!("Destroying {}", app), self.timeout())
            .await
    }
}
