//! End-to-end suite for a Workflow controller driven through its CLI

#![deny(unsafe_code)]

mod scenarios;

pub use scenarios::Scenario;

use workflow_cli_test_utils::suite::{self, TeardownReport};
use workflow_cli_test_utils::{Context, Result};

/// Results of one full suite run
#[derive(Debug)]
pub struct SuiteOutcome {
    pub setup: Result<()>,
    /// Empty when setup failed
    pub scenarios: Vec<(Scenario, Result<()>)>,
    pub teardown: TeardownReport,
}

impl SuiteOutcome {
    pub fn is_success(&self) -> bool {
        self.setup.is_ok()
            && self.scenarios.iter().all(|(_, outcome)| outcome.is_ok())
            && self.teardown.is_ok()
    }

    pub fn failed_scenarios(&self) -> impl Iterator<Item = Scenario> + '_ {
        self.scenarios
            .iter()
            .filter(|(_, outcome)| outcome.is_err())
            .map(|(scenario, _)| *scenario)
    }
}

/// Set up, run `selected` in order, then tear down.
///
/// Scenarios are skipped if setup fails; teardown always runs, since setup
/// may have registered one of the accounts before failing.
pub async fn run_suite(ctx: &Context, selected: &[Scenario]) -> SuiteOutcome {
    let setup = suite::setup(ctx).await;

    let mut scenarios = Vec::with_capacity(selected.len());
    match &setup {
        Ok(()) => {
            for &scenario in selected {
                let outcome = scenario.run(ctx).await;
                if let Err(e) = &outcome {
                    tracing::error!(%scenario, error = %e, "scenario failed");
                }
                scenarios.push((scenario, outcome));
            }
        }
        Err(e) => tracing::error!(error = %e, "suite setup failed, skipping scenarios"),
    }

    let teardown = suite::teardown(ctx).await;

    SuiteOutcome {
        setup,
        scenarios,
        teardown,
    }
}

pub fn print_summary(outcome: &SuiteOutcome) {
    use colored::Colorize;

    println!();
    print_line("setup", &outcome.setup);
    for (scenario, result) in &outcome.scenarios {
        print_line(scenario.name(), result);
    }
    print_line("teardown: cancel user", &outcome.teardown.user);
    print_line("teardown: cancel admin", &outcome.teardown.admin);

    if outcome.is_success() {
        println!("\n{}", "All checks passed".green());
    } else {
        println!("\n{}", "Suite failed".red());
    }
}

fn print_line(name: &str, result: &Result<()>) {
    use colored::Colorize;

    match result {
        Ok(()) => println!("{} {name}", "PASS".green().bold()),
        Err(e) => println!("{} {name}\n{}", "FAIL".red().bold(), e.to_string().dimmed()),
    }
}
