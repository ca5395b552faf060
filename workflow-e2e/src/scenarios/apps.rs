use workflow_cli_test_utils::{Context, Result, random_app_name};

pub(super) async fn create_then_destroy(ctx: &Context) -> Result<()> {
    let cli = ctx.cli();
    let app = random_app_name();

    cli.login(ctx.url(), ctx.user()).await?;
    cli.apps_create(&app).await?;
    cli.apps_destroy(&app).await
}
