use std::time::UNIX_EPOCH;

use crate::{
    commands::get_bot_avatar,
    constants::{version::get_version, POISE_VERSION, STARTUP_TIME},
    Context, Error,
};
use poise::serenity_prelude as serenity;
use thousands::Separable;

/// get the bot's status.
#[poise::command(prefix_command)]
#[tracing::instrument(skip_all)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();

    let count = data.quotes.len().await;
    let categories = data.quotes.categories().await.len();
    let selected = data.quotes.selected_category().await.inspect_err(
        |e| tracing::error!(err = ?e, "an error occurred when fetching selected category"),
    )?;
    let last_sync = data.sync.last_sync().await.inspect_err(
        |e| tracing::error!(err = ?e, "an error occurred when fetching last sync"),
    )?;

    let last_sync = match last_sync {
        Some(last_sync) => format!(
            "<t:{}:R> - {}",
            last_sync.finished_at.unix_timestamp(),
            last_sync.outcome
        ),
        None => "never".to_string(),
    };

    let uptime = STARTUP_TIME
        .duration_since(UNIX_EPOCH)
        .map(|startup| format!("<t:{}:R>", startup.as_secs()))
        .unwrap_or_else(|_| "unknown".to_string());

    ctx.send(poise::CreateReply::default().embed(
        serenity::CreateEmbed::new()
        .field(
            "about the bot",
            "quotebook keeps a shared collection of quotes, sorted into categories, and syncs it with a remote server.".to_string(),
            false
        )
        .field("version", get_version(), false)
        .field("rust", format!("[{0}](https://releases.rs/docs/{0})", rustc_version_runtime::version()), true)
        .field("poise", format!("[{0}](https://docs.rs/crate/poise/{0})", POISE_VERSION), true)
        .field("quotes", count.separate_with_commas(), true)
        .field("categories", categories.separate_with_commas(), true)
        .field("selected category", selected.to_string(), true)
        .field("sync endpoint", data.sync_settings.endpoint.clone(), false)
        .field("last sync", last_sync, false)
        .field("uptime", uptime, true)
        .thumbnail(get_bot_avatar(ctx))
    ))
    .await
    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}
