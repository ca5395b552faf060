/// CLI subcommand helpers against the scripted fake CLI
use std::time::Duration;
use workflow_cli_test_utils::*;

const URL: &str = "http://deis.example.com";

fn cli(fake: &FakeWorkflow) -> WorkflowCli {
    WorkflowCli::new(Runner::new(HarnessConfig {
        cli: fake.cli_path().display().to_string(),
        default_timeout: Duration::from_secs(2),
        ..HarnessConfig::default()
    }))
}

#[tokio::test]
async fn test_only_first_account_is_privileged() {
    let fake = FakeWorkflow::new("privilege", URL).expect("fake cli");
    let cli = cli(&fake);
    let admin = Identity::new("first", "pw");
    let regular = Identity::new("second", "pw");

    cli.register(URL, &admin).await.expect("register admin");
    let mut listing = cli.users_list().await.expect("admin may list users");
    listing
        .wait_for_output(&"first".into(), cli.timeout())
        .await
        .expect("listing shows the admin");

    cli.register(URL, &regular).await.expect("register regular");
    let err = cli.users_list().await.expect_err("regular user may not list users");
    assert!(matches!(
        err,
        HarnessError::ExitCodeMismatch { actual: Some(1), .. }
    ));
}

#[tokio::test]
async fn test_cancel_needs_a_login() {
    let fake = FakeWorkflow::new("cancel-login", URL).expect("fake cli");
    let cli = cli(&fake);
    let ghost = Identity::new("ghost", "pw");

    let err = cli.cancel(URL, &ghost).await.expect_err("login should fail");
    assert!(matches!(err, HarnessError::ExitCodeMismatch { .. }));
    assert_eq!(fake.calls().len(), 1, "auth:cancel must not be attempted");
}

#[tokio::test]
async fn test_logout_login_whoami() {
    let fake = FakeWorkflow::new("auth", URL).expect("fake cli");
    let cli = cli(&fake);
    let id = Identity::new("test-1", "asdf1234");

    cli.register(URL, &id).await.expect("register");
    cli.logout().await.expect("logout");
    assert_eq!(fake.session(), None);
    assert!(cli.whoami(&id).await.is_err());

    cli.login(URL, &id).await.expect("login");
    cli.whoami(&id).await.expect("whoami");
}

#[tokio::test]
async fn test_keys_add_reports_upload() {
    let fake = FakeWorkflow::new("keys", URL).expect("fake cli");
    let cli = cli(&fake);
    let key = SshKey::in_dir("/nonexistent/.ssh", "deis-test");

    cli.keys_add(&key).await.expect("keys:add");
    assert_eq!(fake.calls(), vec!["keys:add /nonexistent/.ssh/deis-test.pub"]);
}

#[tokio::test]
async fn test_apps_create_and_destroy() {
    let fake = FakeWorkflow::new("apps", URL).expect("fake cli");
    let cli = cli(&fake);
    let app = random_app_name();

    cli.apps_create(&app).await.expect("apps:create");
    cli.apps_destroy(&app).await.expect("apps:destroy");
    assert_eq!(
        fake.calls(),
        vec![
            format!("apps:create {app} --no-remote"),
            format!("apps:destroy --app={app} --confirm={app}"),
        ]
    );
}

#[tokio::test]
async fn test_unknown_subcommand_fails() {
    let fake = FakeWorkflow::new("unknown", URL).expect("fake cli");
    let cli = cli(&fake);

    let mut sess = cli.start("frobnicate".into()).expect("spawn");
    sess.wait_for_exit(2, cli.timeout()).await.expect("exit 2");
    sess.wait_for_stderr(&"unknown command frobnicate".into(), cli.timeout())
        .await
        .expect("error message");
}
