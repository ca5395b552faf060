//! Scenarios run between suite setup and teardown

mod apps;
mod auth;
mod users;

use workflow_cli_test_utils::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// The admin account can list users, including the regular account
    AdminPrivilege,
    /// Logging out and back in as the regular account
    AuthLogoutLogin,
    /// Creating and destroying an app as the regular account
    AppsCreateDestroy,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::AdminPrivilege,
        Scenario::AuthLogoutLogin,
        Scenario::AppsCreateDestroy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::AdminPrivilege => "admin-privilege",
            Scenario::AuthLogoutLogin => "auth-logout-login",
            Scenario::AppsCreateDestroy => "apps-create-destroy",
        }
    }

    /// Any failure aborts this scenario only
    pub async fn run(self, ctx: &Context) -> Result<()> {
        tracing::info!(scenario = self.name(), "starting scenario");
        match self {
            Scenario::AdminPrivilege => users::admin_can_list_users(ctx).await,
            Scenario::AuthLogoutLogin => auth::logout_then_login(ctx).await,
            Scenario::AppsCreateDestroy => apps::create_then_destroy(ctx).await,
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
