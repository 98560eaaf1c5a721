// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic and the cached document store (platform-agnostic)
// - `infra/` = Store backends (Postgres, in-memory) and the invalidation listener
// - `discord/` = Discord-specific adapters (commands, events, framework hooks)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize the document store and services
// 3. Set up the Discord framework
// 4. Start the background loops (status rotation, cache sweeping)

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;
mod settings;

use crate::core::presence::{PresenceService, ROTATION_INTERVAL};
use crate::core::storage::{DocumentService, DocumentStore};
use crate::discord::{framework, Data};
use crate::infra::storage::{InMemoryDocumentStore, InvalidationListener, PgDocumentStore};
use crate::settings::Settings;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Pick the store backend. Postgres also gets the invalidation listener so
/// edits made by other processes reach our cache.
async fn build_documents(settings: &Settings) -> anyhow::Result<Arc<DocumentService>> {
    let Some(database_url) = settings.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL is not set, documents are kept in memory only");
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        return Ok(Arc::new(DocumentService::new(store)));
    };

    let store = PgDocumentStore::connect(database_url)
        .await
        .context("Failed to connect to the document database")?;
    store
        .migrate()
        .await
        .context("Failed to migrate the document database")?;
    let pool = store.pool().clone();

    let store: Arc<dyn DocumentStore> = Arc::new(store);
    let documents = Arc::new(DocumentService::new(store));

    InvalidationListener::connect(&pool, Arc::clone(&documents))
        .await
        .context("Failed to start the invalidation listener")?
        .spawn();
    Ok(documents)
}

/// Rotate the custom status every `ROTATION_INTERVAL`.
fn spawn_status_rotation(ctx: serenity::Context, presence: Arc<PresenceService>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ROTATION_INTERVAL);
        loop {
            interval.tick().await;
            match presence.next_status().await {
                Ok(Some(status)) => {
                    tracing::debug!("Rotating status to {}", status);
                    ctx.set_activity(Some(serenity::ActivityData::custom(status)));
                }
                Ok(None) => {}
                Err(e) => tracing::error!("Failed to pick the next status: {}", e),
            }
        }
    });
}

fn spawn_cache_sweeper(documents: Arc<DocumentService>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = documents.cache().cleanup_expired();
            if removed > 0 {
                tracing::debug!("Swept {} expired cache entries", removed);
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,serenity=warn")),
        )
        .init();

    let settings = Settings::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let documents = build_documents(&settings).await?;
    spawn_cache_sweeper(Arc::clone(&documents));

    let data = Data::new(
        Arc::clone(&documents),
        &settings.fallback_prefix,
        settings.owner_ids.iter().copied(),
    );

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required for prefix commands
        | serenity::GatewayIntents::GUILD_VOICE_STATES
        | serenity::GatewayIntents::GUILD_MODERATION
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let framework = poise::Framework::builder()
        .options(framework::options(discord::commands::all()))
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!("Bot is starting up as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");

                spawn_status_rotation(ctx.clone(), Arc::clone(&data.presence));
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&settings.token, intents)
        .framework(framework)
        .await
        .context("Failed to create the Discord client")?;

    client.start().await.context("Discord client stopped")?;
    Ok(())
}
