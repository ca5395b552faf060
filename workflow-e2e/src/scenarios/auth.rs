use workflow_cli_test_utils::{Context, Result};

pub(super) async fn logout_then_login(ctx: &Context) -> Result<()> {
    let cli = ctx.cli();
    cli.logout().await?;
    cli.login(ctx.url(), ctx.user()).await?;
    cli.whoami(ctx.user()).await
}
