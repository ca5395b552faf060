use workflow_cli_test_utils::{Context, Result, template};

pub(super) async fn admin_can_list_users(ctx: &Context) -> Result<()> {
    let cli = ctx.cli();
    cli.login(ctx.url(), ctx.admin()).await?;

    let mut listing = cli.users_list().await?;
    listing
        .wait_for_output(&template!("{}", ctx.user().username), cli.timeout())
        .await?;

    cli.login(ctx.url(), ctx.user()).await
}
