//! A scripted stand-in for the `deis` CLI
//!
//! Lets the harness, setup and teardown be exercised without a controller.
//! The script keeps its state (registered users, current session, call log)
//! in a temporary directory that is removed on drop.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The first registered user is the admin, like on a fresh controller.
const SCRIPT: &str = r#"#!/bin/sh
state='__STATE__'
echo "$*" >> "$state/calls.log"

user=''
for arg in "$@"; do
  case "$arg" in
    --username=*) user="${arg#--username=}" ;;
  esac
done
current=$(cat "$state/session" 2>/dev/null)

case "$1" in
  register)
    if grep -qx "$user" "$state/fail-register" 2>/dev/null; then
      echo "Error: registration refused for $user" >&2
      exit 1
    fi
    echo "$user" >> "$state/users"
    echo "Registered $user"
    echo "$user" > "$state/session"
    echo "Logged in as $user"
    ;;
  login)
    if ! grep -qx "$user" "$state/users" 2>/dev/null; then
      echo "Error: unknown user $user" >&2
      exit 1
    fi
    echo "$user" > "$state/session"
    echo "Logged in as $user"
    ;;
  auth:logout)
    rm -f "$state/session"
    echo "Logged out"
    ;;
  auth:whoami)
    if [ -z "$current" ]; then
      echo "Error: not logged in" >&2
      exit 1
    fi
    echo "You are $current at __URL__"
    ;;
  auth:cancel)
    if [ "$current" != "$user" ]; then
      echo "Error: not logged in as $user" >&2
      exit 1
    fi
    if grep -qx "$user" "$state/fail-cancel" 2>/dev/null; then
      echo "Error: cancellation refused for $user" >&2
      exit 1
    fi
    grep -vx "$user" "$state/users" > "$state/users.next"
    mv "$state/users.next" "$state/users"
    rm -f "$state/session"
    echo "Please log in again in order to cancel this account"
    echo "Account cancelled"
    ;;
  users:list)
    if [ -z "$current" ] || [ "$current" != "$(head -n 1 "$state/users")" ]; then
      echo "Error: You do not have permission to perform this action." >&2
      exit 1
    fi
    echo "=== Users"
    cat "$state/users"
    ;;
  keys:add)
    echo "Uploading $(basename "$2") to deis... done"
    ;;
  apps:create)
    echo "Creating Application... done, created $2"
    ;;
  apps:destroy)
    app=''
    for arg in "$@"; do
      case "$arg" in
        --app=*) app="${arg#--app=}" ;;
      esac
    done
    echo "Destroying $app..."
    echo "done in 1s"
    ;;
  *)
    echo "Error: unknown command $1" >&2
    exit 2
    ;;
esac
"#;

/// Temporary fake CLI with inspectable state
#[derive(Debug)]
pub struct FakeWorkflow {
    temp_dir: TempDir,
    cli: PathBuf,
}

impl FakeWorkflow {
    /// Write the fake `deis` script into a fresh temporary directory
    pub fn new(test_name: &str, url: &str) -> std::io::Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("workflow-test-{test_name}-"))
            .tempdir()?;

        let cli = temp_dir.path().join("deis");
        let script = SCRIPT
            .replace("__STATE__", &temp_dir.path().display().to_string())
            .replace("__URL__", url);
        std::fs::write(&cli, script)?;
        std::fs::set_permissions(&cli, std::fs::Permissions::from_mode(0o755))?;

        Ok(Self { temp_dir, cli })
    }

    /// Path to pass as the harness CLI
    pub fn cli_path(&self) -> &Path {
        &self.cli
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Make `auth:cancel` fail for `username`
    pub fn fail_cancel_for(&self, username: &str) -> std::io::Result<()> {
        self.append_line("fail-cancel", username)
    }

    /// Make `register` fail for `username`
    pub fn fail_register_for(&self, username: &str) -> std::io::Result<()> {
        self.append_line("fail-register", username)
    }

    /// Arguments of every invocation, oldest first
    pub fn calls(&self) -> Vec<String> {
        self.read_lines("calls.log")
    }

    /// Accounts that are registered and not cancelled
    pub fn users(&self) -> Vec<String> {
        self.read_lines("users")
    }

    /// Account of the current session, if any
    pub fn session(&self) -> Option<String> {
        self.read_lines("session").into_iter().next()
    }

    fn append_line(&self, file: &str, line: &str) -> std::io::Result<()> {
        use std::io::Write;

        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir().join(file))?;
        writeln!(f, "{line}")
    }

    fn read_lines(&self, file: &str) -> Vec<String> {
        std::fs::read_to_string(self.dir().join(file))
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}
