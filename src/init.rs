use std::{str::FromStr, sync::Arc, time::Duration};

use anyhow::Context as _;
use futures::StreamExt;
use poise::serenity_prelude::{self as serenity, *};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use tracing::Instrument;

use crate::{
    commands,
    quotes::QuoteStore,
    storage::{MemoryStore, SqliteStore},
    sync::{self, HttpRemote, QuoteSync, SyncSettings},
    telemetry, Data,
};

async fn init_database() -> anyhow::Result<Pool<Sqlite>> {
    let db_url = std::env::var("DATABASE_URL").context("missing DATABASE_URL")?;

    tracing::info!("initializing database connection...");
    let opts = SqliteConnectOptions::from_str(&db_url)
        .context("invalid DATABASE_URL")?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);
    let db = SqlitePoolOptions::new()
        .max_connections(20)
        .connect_with(opts)
        .await?;

    tracing::info!("running migrations...");
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("finished running migrations!");

    Ok(db)
}

fn setting_or<T: FromStr>(var: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(value) => value.parse::<T>().unwrap_or_else(|_| {
            tracing::warn!(var = %var, value = %value, "couldn't parse environment variable, using default.");
            default
        }),
        None => default,
    }
}

// a zero period would panic `tokio::time::interval` and time out every request.
fn secs_or(var: &str, value: Option<String>, default: Duration) -> Duration {
    match setting_or(var, value, default.as_secs()) {
        0 => {
            tracing::warn!(var = %var, "environment variable must be greater than zero, using default.");
            default
        }
        secs => Duration::from_secs(secs),
    }
}

fn sync_settings_from(lookup: impl Fn(&str) -> Option<String>) -> SyncSettings {
    let defaults = SyncSettings::default();

    SyncSettings {
        endpoint: setting_or(
            "QUOTES_SYNC_ENDPOINT",
            lookup("QUOTES_SYNC_ENDPOINT"),
            defaults.endpoint,
        ),
        interval: secs_or(
            "QUOTES_SYNC_INTERVAL_SECS",
            lookup("QUOTES_SYNC_INTERVAL_SECS"),
            defaults.interval,
        ),
        limit: setting_or("QUOTES_SYNC_LIMIT", lookup("QUOTES_SYNC_LIMIT"), defaults.limit),
        timeout: secs_or(
            "QUOTES_SYNC_TIMEOUT_SECS",
            lookup("QUOTES_SYNC_TIMEOUT_SECS"),
            defaults.timeout,
        ),
    }
}

fn init_sync_settings() -> SyncSettings {
    let settings = sync_settings_from(|var| std::env::var(var).ok());

    tracing::info!(
        endpoint = %settings.endpoint,
        interval_secs = settings.interval.as_secs(),
        limit = settings.limit,
        "syncing quotes with server."
    );

    settings
}

fn init_sync_channel_id() -> Option<ChannelId> {
    let sync_channel_id = std::env::var("QUOTES_SYNC_CHANNEL_ID")
        .ok()
        .and_then(|id| id.parse::<u64>().ok())
        .map(|id| {
            tracing::info!("sending quote sync notifications to channel with id {}.", id);
            ChannelId::new(id)
        });

    if sync_channel_id.is_none() {
        tracing::warn!("no channel id found for quote sync notifications. they will not be sent.");
    }

    sync_channel_id
}

async fn init_quotes(
    db: Pool<Sqlite>,
    settings: &SyncSettings,
) -> anyhow::Result<(Arc<QuoteStore>, Arc<QuoteSync>)> {
    let local = Arc::new(SqliteStore::new(db));
    let session = Arc::new(MemoryStore::new());

    let store = Arc::new(QuoteStore::new(local.clone(), session));
    store
        .load()
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when loading quotes"))?;

    let remote = Arc::new(HttpRemote::new(settings)?);
    let sync = Arc::new(QuoteSync::new(store.clone(), remote, local));

    Ok((store, sync))
}

async fn init_discord_client(token: &str, data: Data) -> anyhow::Result<Client> {
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::help::help(),
                commands::status::status(),
                commands::quote::quote(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("q>".into()),
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands)
                    .await
                    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when registering commands"))?;

                Ok(data)
            }.in_current_span())
        })
        .build();

    let client = ClientBuilder::new(token, intents)
        .framework(framework)
        .activity(serenity::ActivityData::custom("collecting quotes"))
        .await?;

    Ok(client)
}

// the first tick waits a full period instead of firing at startup.
fn sync_interval(period: Duration) -> tokio::time::Interval {
    tokio::time::interval_at(tokio::time::Instant::now() + period, period)
}

fn spawn_background_tasks(client: &Client, data: &Data) {
    let sync_data = data.clone();
    let sync_http = client.http.clone();

    tracing::info!("initialized quote sync!");

    tokio::spawn(
        async move {
            let interval = sync_interval(sync_data.sync_settings.interval);
            let task = futures::stream::unfold(interval, |mut interval| async {
                interval.tick().await;

                let _ = sync::quote_sync(&sync_http, &sync_data).await;
                Some(((), interval))
            });

            task.for_each(|_| async {}).await;
        }
        .in_current_span(),
    );
}

pub async fn init() -> anyhow::Result<Client> {
    telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to initialize telemetry")?;

    tracing::info!("initializing... please wait warmly.");

    let token = std::env::var("DISCORD_TOKEN").context("missing DISCORD_TOKEN")?;

    let db = init_database().await?;
    let sync_settings = init_sync_settings();
    let sync_channel_id = init_sync_channel_id();
    let (quotes, sync) = init_quotes(db, &sync_settings).await?;

    let data = Data {
        sync_channel_id,
        sync_settings,
        quotes,
        sync,
    };

    let client = init_discord_client(&token, data.clone()).await?;
    spawn_background_tasks(&client, &data);

    tracing::info!("finished initializing!");
    Ok(client)
}
