//! SSH key provisioning for the test account

use crate::{Result, Runner, template};
use std::path::{Path, PathBuf};

pub const DEFAULT_KEY_NAME: &str = "deis-test";

/// An RSA keypair at `<dir>/<name>` and `<dir>/<name>.pub`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKey {
    name: String,
    path: PathBuf,
}

impl SshKey {
    /// Key under `~/.ssh` of the invoking user
    pub fn in_home(name: &str) -> Self {
        // without a known home the shell gets a literal `~` to expand
        let home = directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("~"));
        Self::in_dir(home.join(".ssh"), name)
    }

    pub fn in_dir(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: dir.as_ref().join(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Private key path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn public_path(&self) -> PathBuf {
        let mut path = self.path.clone().into_os_string();
        path.push(".pub");
        path.into()
    }

    /// Run `ssh-keygen` unless the private key already exists.
    ///
    /// Returns whether a key was generated. An existing key is never touched.
    pub async fn generate_if_absent(&self, runner: &Runner) -> Result<bool> {
        if tokio::fs::try_exists(&self.path).await? {
            tracing::debug!(path = ?self.path, "ssh key already present");
            return Ok(false);
        }

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        runner
            .run(&template!(
                "ssh-keygen -q -t rsa -b 4096 -C {} -f {} -N ''",
                self.name,
                self.path.display()
            ))?
            .wait_for_exit(0, runner.default_timeout())
            .await?;

        tracing::info!(path = ?self.path, "generated ssh key");
        Ok(true)
    }

    /// Start an agent for this shell and add the key to it
    pub async fn add_to_agent(&self, runner: &Runner) -> Result<()> {
        runner
            .run(&template!("eval $(ssh-agent) && ssh-add {}", self.path.display()))?
            .wait_for_exit(0, runner.default_timeout())
            .await
    }

    /// Generate if needed, then register with an agent
    pub async fn ensure(&self, runner: &Runner) -> Result<bool> {
        let generated = self.generate_if_absent(runner).await?;
        self.add_to_agent(runner).await?;
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HarnessError;

    #[test]
    fn paths() {
        let key = SshKey::in_dir("/home/ci/.ssh", DEFAULT_KEY_NAME);
        assert_eq!(key.name(), "deis-test");
        assert_eq!(key.path(), Path::new("/home/ci/.ssh/deis-test"));
        assert_eq!(key.public_path(), PathBuf::from("/home/ci/.ssh/deis-test.pub"));
    }

    #[test]
    fn home_key_lives_in_dot_ssh() {
        let key = SshKey::in_home("k");
        assert!(key.path().ends_with(".ssh/k"));
    }

    #[tokio::test]
    async fn existing_key_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let key = SshKey::in_dir(dir.path(), "existing");
        std::fs::write(key.path(), "not really a key").unwrap();

        let generated = key.generate_if_absent(&Runner::default()).await.unwrap();

        assert!(!generated);
        assert_eq!(std::fs::read_to_string(key.path()).unwrap(), "not really a key");
        assert!(!key.public_path().exists());
    }

    #[tokio::test]
    async fn missing_key_is_generated_once() {
        if which::which("ssh-keygen").is_err() {
            println!("⚠️  ssh-keygen not installed, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let key = SshKey::in_dir(dir.path().join("nested"), "fresh");
        let runner = Runner::default();

        assert!(key.generate_if_absent(&runner).await.unwrap());
        assert!(key.public_path().exists());
        let first = std::fs::read(key.path()).unwrap();

        assert!(!key.generate_if_absent(&runner).await.unwrap());
        assert_eq!(std::fs::read(key.path()).unwrap(), first);
    }

    #[tokio::test]
    async fn ensure_generates_then_reuses_and_loads_the_key() {
        for tool in ["ssh-keygen", "ssh-agent", "ssh-add"] {
            if which::which(tool).is_err() {
                println!("⚠️  {tool} not installed, skipping");
                return;
            }
        }
        let dir = tempfile::tempdir().unwrap();
        let key = SshKey::in_dir(dir.path(), "agent");
        let runner = Runner::default();

        assert!(key.ensure(&runner).await.unwrap());
        let first = std::fs::read(key.path()).unwrap();

        assert!(!key.ensure(&runner).await.unwrap());
        assert_eq!(std::fs::read(key.path()).unwrap(), first);
    }

    #[tokio::test]
    async fn agent_rejects_a_file_that_is_not_a_key() {
        if which::which("ssh-agent").is_err() || which::which("ssh-add").is_err() {
            println!("⚠️  ssh-agent not installed, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let key = SshKey::in_dir(dir.path(), "bogus");
        std::fs::write(key.path(), "not really a key").unwrap();

        let err = key.add_to_agent(&Runner::default()).await.unwrap_err();
        assert!(matches!(err, HarnessError::ExitCodeMismatch { .. }), "{err}");
    }
}
