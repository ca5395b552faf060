/// Suite setup/teardown against the scripted fake CLI
use std::time::Duration;
use workflow_cli_test_utils::suite::{self, Context, SuiteConfig};
use workflow_cli_test_utils::*;

const HOST: &str = "deis.example.com";
const URL: &str = "http://deis.example.com";

fn config(fake: &FakeWorkflow) -> SuiteConfig {
    SuiteConfig {
        host: Some(HOST.to_string()),
        port: None,
        harness: HarnessConfig {
            cli: fake.cli_path().display().to_string(),
            default_timeout: Duration::from_secs(2),
            ..HarnessConfig::default()
        },
        ssh_key: SshKey::in_dir(fake.dir(), "deis-test"),
        provision_ssh_key: false,
    }
}

fn context(fake: &FakeWorkflow) -> Context {
    Context::with_fixtures(config(fake), Fixtures::with_suffix(7)).expect("context should build")
}

#[tokio::test]
async fn test_setup_registers_accounts_and_uploads_key() {
    let fake = FakeWorkflow::new("setup", URL).expect("fake cli");
    let ctx = context(&fake);

    suite::setup(&ctx).await.expect("setup should succeed");

    assert_eq!(fake.users(), vec!["test-admin-7", "test-7"]);
    assert_eq!(fake.session().as_deref(), Some("test-7"));

    let calls = fake.calls();
    assert_eq!(calls.len(), 4, "unexpected calls: {calls:?}");
    assert_eq!(
        calls[0],
        format!("register {URL} --username=test-admin-7 --password=asdf1234 --email=test-admin-7@deis.io")
    );
    assert_eq!(calls[1], "users:list");
    assert!(calls[2].starts_with("register "));
    assert_eq!(
        calls[3],
        format!("keys:add {}", ctx.ssh_key().public_path().display())
    );
}

#[tokio::test]
async fn test_setup_stops_at_failed_registration() {
    let fake = FakeWorkflow::new("setup-fail", URL).expect("fake cli");
    fake.fail_register_for("test-admin-7").unwrap();
    let ctx = context(&fake);

    let err = suite::setup(&ctx).await.expect_err("setup should fail");

    match err {
        HarnessError::Setup { step, source } => {
            assert_eq!(step, "register admin");
            assert!(matches!(*source, HarnessError::OutputTimeout { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn test_teardown_cancels_both_accounts() {
    let fake = FakeWorkflow::new("teardown", URL).expect("fake cli");
    let ctx = context(&fake);
    suite::setup(&ctx).await.expect("setup should succeed");

    let report = suite::teardown(&ctx).await;

    assert!(report.is_ok(), "{report:?}");
    assert!(fake.users().is_empty());
    report.into_result(&ctx).expect("no failures");

    // each cancellation is preceded by a login as that account
    let calls = fake.calls();
    let tail: Vec<_> = calls[calls.len() - 4..]
        .iter()
        .map(|c| c.split(' ').next().unwrap_or_default())
        .collect();
    assert_eq!(tail, ["login", "auth:cancel", "login", "auth:cancel"]);
}

#[tokio::test]
async fn test_teardown_attempts_user_after_admin_failure() {
    let fake = FakeWorkflow::new("teardown-admin", URL).expect("fake cli");
    let ctx = context(&fake);
    suite::setup(&ctx).await.expect("setup should succeed");
    fake.fail_cancel_for("test-admin-7").unwrap();

    let report = suite::teardown(&ctx).await;

    assert!(report.user.is_ok());
    assert!(matches!(
        report.admin,
        Err(HarnessError::ExitCodeMismatch { actual: Some(1), .. })
    ));
    assert_eq!(fake.users(), vec!["test-admin-7"]);

    let err = report.into_result(&ctx).unwrap_err();
    match &err {
        HarnessError::Teardown { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "test-admin-7");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("test-admin-7"));
}

#[tokio::test]
async fn test_teardown_attempts_admin_after_user_failure() {
    let fake = FakeWorkflow::new("teardown-user", URL).expect("fake cli");
    let ctx = context(&fake);
    suite::setup(&ctx).await.expect("setup should succeed");
    fake.fail_cancel_for("test-7").unwrap();

    let report = suite::teardown(&ctx).await;

    assert!(report.user.is_err());
    assert!(report.admin.is_ok());
    assert_eq!(fake.users(), vec!["test-7"]);
}

#[tokio::test]
async fn test_teardown_reports_both_failures() {
    let fake = FakeWorkflow::new("teardown-both", URL).expect("fake cli");
    let ctx = context(&fake);
    // never registered: both logins fail

    let report = suite::teardown(&ctx).await;

    let err = report.into_result(&ctx).unwrap_err();
    match err {
        HarnessError::Teardown { failures } => {
            let who: Vec<_> = failures.iter().map(|(w, _)| w.as_str()).collect();
            assert_eq!(who, ["test-7", "test-admin-7"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(
        !fake.calls().iter().any(|c| c.starts_with("auth:cancel")),
        "cancel must not run without a successful login"
    );
}

#[test]
fn test_context_requires_cli_on_path() {
    let fake = FakeWorkflow::new("no-cli", URL).expect("fake cli");
    let mut config = config(&fake);
    config.harness.cli = "workflow-cli-that-does-not-exist".to_string();

    let err = Context::new(config).unwrap_err();
    assert!(matches!(err, ConfigError::CliNotFound { .. }));
}

#[test]
fn test_context_requires_host() {
    let fake = FakeWorkflow::new("no-host", URL).expect("fake cli");
    let mut config = config(&fake);
    config.host = None;

    let err = Context::new(config).unwrap_err();
    assert!(matches!(err, ConfigError::MissingHost { .. }));
}

#[test]
fn test_context_resolves_secure_endpoint() {
    let fake = FakeWorkflow::new("https", URL).expect("fake cli");
    let mut config = config(&fake);
    config.port = Some("443".to_string());

    let ctx = Context::new(config).expect("context should build");
    assert_eq!(ctx.url(), "https://deis.example.com");
    assert_ne!(ctx.admin().username, ctx.user().username);
}

#[test]
fn test_context_rejects_cli_path_the_shell_would_split() {
    let fake = FakeWorkflow::new("spaced-cli", URL).expect("fake cli");
    let spaced = fake.dir().join("my tools");
    std::fs::create_dir_all(&spaced).unwrap();
    let cli = spaced.join("deis");
    std::fs::copy(fake.cli_path(), &cli).unwrap();

    let mut config = config(&fake);
    config.harness.cli = cli.display().to_string();

    let err = Context::new(config).unwrap_err();
    assert!(matches!(err, ConfigError::UnsafeCliPath { .. }), "{err}");
    assert!(err.to_string().contains("my tools"));
}

#[tokio::test]
async fn test_setup_provisions_missing_ssh_key() {
    for tool in ["ssh-keygen", "ssh-agent", "ssh-add"] {
        if which::which(tool).is_err() {
            println!("⚠️  {tool} not installed, skipping");
            return;
        }
    }
    let fake = FakeWorkflow::new("provision", URL).expect("fake cli");
    let mut config = config(&fake);
    config.provision_ssh_key = true;
    config.harness.default_timeout = Duration::from_secs(10);
    let ctx = Context::with_fixtures(config, Fixtures::with_suffix(7)).expect("context");
    assert!(!ctx.ssh_key().path().exists());

    suite::setup(&ctx).await.expect("setup should succeed");

    assert!(ctx.ssh_key().public_path().exists());
    assert!(
        fake.calls().iter().any(|c| c.starts_with("keys:add ")),
        "{:?}",
        fake.calls()
    );
}
