// Interactive replies: button pagination and confirm/decline prompts.
//
// Only the member who ran the command may press the buttons. Anyone else
// gets an ephemeral notice instead.

use crate::discord::embeds;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use std::time::Duration;

pub const PER_PAGE: usize = 10;
const PAGE_TIMEOUT: Duration = Duration::from_secs(60 * 2);
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// PAGE MATH
// ============================================================================

pub fn page_count(entries: usize, per_page: usize) -> usize {
    entries.div_ceil(per_page.max(1)).max(1)
}

/// Items on a 1-based page.
pub fn page_items<T>(items: &[T], page: usize, per_page: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(per_page).min(items.len());
    let end = (start + per_page).min(items.len());
    &items[start..end]
}

pub fn page_footer(page: usize, pages: usize, entries: usize) -> String {
    let noun = if entries == 1 { "Entry" } else { "Entries" };
    format!("Page {page}/{pages} ({entries} {noun})")
}

/// Prefix each item with its 1-based position, e.g. "`3` Moderator".
pub fn numbered<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: std::fmt::Display,
{
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| format!("`{}` {}", index + 1, item))
        .collect()
}

// ============================================================================
// PAGINATOR
// ============================================================================

fn page_embed(ctx: Context<'_>, title: &str, items: &[String], page: usize) -> serenity::CreateEmbed {
    let pages = page_count(items.len(), PER_PAGE);
    let author = ctx.author();

    serenity::CreateEmbed::new()
        .title(title)
        .color(embeds::MAIN)
        .author(serenity::CreateEmbedAuthor::new(&author.name).icon_url(author.face()))
        .description(page_items(items, page, PER_PAGE).join("\n"))
        .footer(serenity::CreateEmbedFooter::new(page_footer(page, pages, items.len())))
}

fn page_buttons(ctx_id: u64, page: usize, pages: usize) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(format!("{ctx_id}prev"))
            .emoji('◀')
            .style(serenity::ButtonStyle::Secondary)
            .disabled(page <= 1),
        serenity::CreateButton::new(format!("{ctx_id}next"))
            .emoji('▶')
            .style(serenity::ButtonStyle::Secondary)
            .disabled(page >= pages),
        serenity::CreateButton::new(format!("{ctx_id}delete"))
            .emoji('🗑')
            .style(serenity::ButtonStyle::Danger),
    ])]
}

async fn reject_stranger(
    ctx: Context<'_>,
    mci: &serenity::ComponentInteraction,
) -> Result<(), serenity::Error> {
    let embed = embeds::warning(Some(&mci.user), "You **aren't the owner** of this embed.");
    mci.create_response(
        ctx,
        serenity::CreateInteractionResponse::Message(
            serenity::CreateInteractionResponseMessage::new()
                .embed(embed)
                .ephemeral(true),
        ),
    )
    .await
}

/// Send `items` as a paged embed and drive the buttons until the timeout.
pub async fn paginate(ctx: Context<'_>, title: &str, items: &[String]) -> Result<(), Error> {
    let ctx_id = ctx.id();
    let pages = page_count(items.len(), PER_PAGE);
    let mut page = 1;

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .embed(page_embed(ctx, title, items, page))
                .components(page_buttons(ctx_id, page, pages)),
        )
        .await?;
    let msg_id = reply.message().await?.id;

    while let Some(mci) = serenity::ComponentInteractionCollector::new(ctx)
        .channel_id(ctx.channel_id())
        .timeout(PAGE_TIMEOUT)
        .filter(move |mci| mci.message.id == msg_id)
        .await
    {
        if mci.user.id != ctx.author().id {
            if let Err(e) = reject_stranger(ctx, &mci).await {
                tracing::warn!("Failed to answer a foreign paginator click: {}", e);
            }
            continue;
        }

        let action = mci.data.custom_id.strip_prefix(&ctx_id.to_string()).unwrap_or_default();
        match action {
            "prev" => page = page.saturating_sub(1).max(1),
            "next" => page = (page + 1).min(pages),
            "delete" => {
                mci.defer(ctx.http()).await?;
                reply.delete(ctx).await?;
                return Ok(());
            }
            _ => continue,
        }

        mci.create_response(
            ctx,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .embed(page_embed(ctx, title, items, page))
                    .components(page_buttons(ctx_id, page, pages)),
            ),
        )
        .await?;
    }

    // Timed out: keep the last page, drop the buttons.
    let _ = reply
        .edit(ctx, poise::CreateReply::default().components(vec![]))
        .await;
    Ok(())
}

// ============================================================================
// CONFIRMATION
// ============================================================================

/// Ask the invoker to confirm. A timeout counts as declining.
pub async fn confirm(ctx: Context<'_>, prompt: impl AsRef<str>) -> Result<bool, Error> {
    let ctx_id = ctx.id();
    let buttons = vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(format!("{ctx_id}confirm"))
            .label("Confirm")
            .style(serenity::ButtonStyle::Success),
        serenity::CreateButton::new(format!("{ctx_id}decline"))
            .label("Decline")
            .style(serenity::ButtonStyle::Danger),
    ])];

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .embed(embeds::warning(Some(ctx.author()), prompt))
                .components(buttons),
        )
        .await?;
    let msg_id = reply.message().await?.id;

    let mut answer = false;
    while let Some(mci) = serenity::ComponentInteractionCollector::new(ctx)
        .channel_id(ctx.channel_id())
        .timeout(CONFIRM_TIMEOUT)
        .filter(move |mci| mci.message.id == msg_id)
        .await
    {
        if mci.user.id != ctx.author().id {
            if let Err(e) = reject_stranger(ctx, &mci).await {
                tracing::warn!("Failed to answer a foreign confirmation click: {}", e);
            }
            continue;
        }

        answer = mci.data.custom_id == format!("{ctx_id}confirm");
        mci.defer(ctx.http()).await?;
        break;
    }

    let _ = reply
        .edit(ctx, poise::CreateReply::default().components(vec![]))
        .await;
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_never_drops_below_one() {
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(25, 10), 3);
    }

    #[test]
    fn page_items_clamp_to_the_list() {
        let items: Vec<u32> = (1..=25).collect();
        assert_eq!(page_items(&items, 1, 10), &items[0..10]);
        assert_eq!(page_items(&items, 3, 10), &items[20..25]);
        assert!(page_items(&items, 4, 10).is_empty());
        assert_eq!(page_items(&items, 0, 10), &items[0..10]);
    }

    #[test]
    fn footer_and_numbering() {
        assert_eq!(page_footer(1, 3, 25), "Page 1/3 (25 Entries)");
        assert_eq!(page_footer(1, 1, 1), "Page 1/1 (1 Entry)");
        assert_eq!(numbered(["a", "b"]), vec!["`1` a", "`2` b"]);
    }
}
