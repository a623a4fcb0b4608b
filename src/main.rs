use std::sync::Arc;

use constants::STARTUP_TIME;
use poise::serenity_prelude::ChannelId;
use quotes::QuoteStore;
use sync::{QuoteSync, SyncSettings};

#[derive(Clone)]
struct Data {
    sync_channel_id: Option<ChannelId>,
    sync_settings: SyncSettings,
    quotes: Arc<QuoteStore>,
    sync: Arc<QuoteSync>,
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

mod commands;
mod constants;
mod init;
mod models;
mod quotes;
mod storage;
mod sync;
mod telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let _ = &*STARTUP_TIME;

    let mut client = init::init().await?;

    client
        .start()
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when running the client"))?;

    Ok(())
}
