use eyre::WrapErr;
use workflow_cli_test_utils::controller::{HOST_VAR, PORT_VAR};
use workflow_cli_test_utils::ssh::DEFAULT_KEY_NAME;
use workflow_cli_test_utils::{Context, HarnessConfig, SshKey, SuiteConfig};
use workflow_e2e::Scenario;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();

    // RUST_LOG wins over -v/-q, e.g. RUST_LOG="workflow_cli_test_utils=debug"
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(cli.verbose.log_level_filter().as_str().to_lowercase())
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let scenarios = if cli.scenarios.is_empty() {
        Scenario::ALL.to_vec()
    } else {
        cli.scenarios.clone()
    };

    let ctx = Context::new(cli.suite_config()).wrap_err("suite preconditions not met")?;

    tracing::info!(controller = %ctx.controller(), scenarios = ?scenarios, "starting suite");
    let outcome = workflow_e2e::run_suite(&ctx, &scenarios).await;
    workflow_e2e::print_summary(&outcome);

    if !outcome.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

#[derive(clap::Parser, Debug)]
#[command(version, about = "Run the Workflow end-to-end suite against a controller", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    #[arg(
        long,
        env = HOST_VAR,
        help = "Hostname of the Workflow controller under test."
    )]
    host: Option<String>,

    #[arg(
        long,
        env = PORT_VAR,
        help = "Controller port. 443 selects https, empty or 80 plain http."
    )]
    port: Option<String>,

    #[arg(long, default_value = "deis", help = "The CLI to drive, looked up on PATH.")]
    cli: String,

    #[arg(
        long,
        default_value_t = 10,
        help = "Seconds each exit code or output assertion may wait."
    )]
    timeout: u64,

    #[arg(
        long,
        default_value = DEFAULT_KEY_NAME,
        help = "Name of the SSH key under ~/.ssh to upload for the test user."
    )]
    key_name: String,

    #[arg(
        long,
        help = "Upload the existing public key without running ssh-keygen or ssh-agent."
    )]
    skip_ssh_provisioning: bool,

    #[arg(
        long = "scenario",
        value_enum,
        help = "Run only these scenarios (repeatable). Runs all by default."
    )]
    scenarios: Vec<Scenario>,
}

impl Cli {
    fn suite_config(&self) -> SuiteConfig {
        SuiteConfig {
            host: self.host.clone(),
            port: self.port.clone(),
            harness: HarnessConfig {
                cli: self.cli.clone(),
                default_timeout: std::time::Duration::from_secs(self.timeout),
                ..HarnessConfig::default()
            },
            ssh_key: SshKey::in_home(&self.key_name),
            provision_ssh_key: !self.skip_ssh_provisioning,
        }
    }
}
