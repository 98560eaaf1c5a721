use crate::core::roleplay::{footer, title, RolePlayAction};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

async fn perform(ctx: Context<'_>, action: RolePlayAction, member: serenity::Member) -> Result<(), Error> {
    let author = ctx.author();
    let count = ctx
        .data()
        .roleplay
        .record(action, author.id.get(), member.user.id.get())
        .await?;

    let embed = serenity::CreateEmbed::new()
        .title(title(action, &author.name, member.display_name()))
        .image(action.random_gif())
        .author(serenity::CreateEmbedAuthor::new(&author.name).icon_url(author.face()))
        .footer(serenity::CreateEmbedFooter::new(footer(
            action,
            &author.name,
            &member.user.name,
            count,
        )));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Bite another user
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn bite(ctx: Context<'_>, #[description = "Who to bite"] member: serenity::Member) -> Result<(), Error> {
    perform(ctx, RolePlayAction::Bite, member).await
}

/// Hug another user
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn hug(ctx: Context<'_>, #[description = "Who to hug"] member: serenity::Member) -> Result<(), Error> {
    perform(ctx, RolePlayAction::Hug, member).await
}

/// Kiss another user
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn kiss(ctx: Context<'_>, #[description = "Who to kiss"] member: serenity::Member) -> Result<(), Error> {
    perform(ctx, RolePlayAction::Kiss, member).await
}
