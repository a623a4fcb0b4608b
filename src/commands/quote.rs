use poise::serenity_prelude::*;

use crate::{
    models::quotes::{category_label, CategoryFilter, Quote},
    quotes::QuoteError,
    Context, Error,
};

const QUOTES_PER_PAGE: usize = 10;
const MAX_LISTED_TEXT_CHARS: usize = 200;
const MAX_IMPORT_BYTES: u64 = 1024 * 1024;

async fn reply(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .reply(true)
            .allowed_mentions(CreateAllowedMentions::new().replied_user(false))
            .content(content),
    )
    .await
    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}

async fn reply_or_raise(ctx: Context<'_>, e: anyhow::Error) -> Result<(), Error> {
    match e.downcast_ref::<QuoteError>() {
        Some(quote_error) => reply(ctx, quote_error.to_string()).await,
        None => Err(e.into()),
    }
}

/// show a random quote.
///
/// picks from the given category, or from the selected one (see `filter`) when no category is
/// given. use `all` to pick from every quote.
#[tracing::instrument(skip(ctx))]
#[poise::command(
    prefix_command,
    guild_only,
    aliases("quotes"),
    subcommands(
        "add_quote",
        "list_quotes",
        "list_categories",
        "select_category",
        "last_quote",
        "export_quotes",
        "import_quotes",
        "sync_quotes"
    )
)]
pub async fn quote(ctx: Context<'_>, #[rest] category: Option<String>) -> Result<(), Error> {
    let store = &ctx.data().quotes;

    let filter: CategoryFilter = match category {
        Some(category) => category.parse().unwrap_or_default(),
        None => store.selected_category().await.inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when fetching selected category"),
        )?,
    };

    let quote = store
        .show_random(&filter)
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when picking a quote"))?;

    match quote {
        Some(quote) => reply(ctx, quote.to_string()).await,
        None => reply(ctx, "no quotes available.").await,
    }
}

/// add a quote: `add <category> <text>`.
#[poise::command(prefix_command, rename = "add")]
#[tracing::instrument(skip(ctx))]
pub async fn add_quote(
    ctx: Context<'_>,
    category: String,
    #[rest] text: String,
) -> Result<(), Error> {
    match ctx.data().quotes.add(&text, &category).await {
        Ok(quote) => reply(ctx, format!("added quote {quote}.")).await,
        Err(e) => {
            tracing::warn!(err = ?e, "couldn't add quote");
            reply_or_raise(ctx, e).await
        }
    }
}

fn truncate_text(text: &str) -> String {
    if text.chars().count() <= MAX_LISTED_TEXT_CHARS {
        return text.to_string();
    }

    let truncated: String = text.chars().take(MAX_LISTED_TEXT_CHARS).collect();
    format!("{truncated}…")
}

fn paginate(quotes: &[Quote]) -> Vec<String> {
    quotes
        .chunks(QUOTES_PER_PAGE)
        .enumerate()
        .map(|(page, chunk)| {
            chunk
                .iter()
                .enumerate()
                .map(|(idx, quote)| {
                    format!(
                        "{}. \"{}\" - {}\n",
                        idx + 1 + page * QUOTES_PER_PAGE,
                        truncate_text(&quote.text),
                        quote.category_label()
                    )
                })
                .collect()
        })
        .collect()
}

fn page_embed(filter: &CategoryFilter, pages: &[String], current_page: usize) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("quotes ({filter})"))
        .description(pages[current_page].clone())
        .footer(CreateEmbedFooter::new(format!(
            "page {}/{}",
            current_page + 1,
            pages.len(),
        )))
}

fn page_buttons(ids: &[String; 4], current_page: usize, page_count: usize) -> Vec<CreateActionRow> {
    let [first_id, prev_id, next_id, last_id] = ids;
    let at_start = current_page == 0;
    let at_end = current_page == page_count - 1;

    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(first_id).emoji('⏮').disabled(at_start),
        CreateButton::new(prev_id).emoji('◀').disabled(at_start),
        CreateButton::new(next_id).emoji('▶').disabled(at_end),
        CreateButton::new(last_id).emoji('⏭').disabled(at_end),
    ])]
}

/// list the quotes of the selected category.
#[poise::command(prefix_command, rename = "list")]
#[tracing::instrument(skip_all)]
pub async fn list_quotes(ctx: Context<'_>) -> Result<(), Error> {
    let store = &ctx.data().quotes;

    let filter = store.selected_category().await.inspect_err(
        |e| tracing::error!(err = ?e, "an error occurred when fetching selected category"),
    )?;
    let pages = paginate(&store.filtered(&filter).await);

    if pages.is_empty() {
        return reply(ctx, "no quotes available.").await;
    }

    let ctx_id = ctx.id();
    let author_id = ctx.author().id;
    let ids = ["first", "prev", "next", "last"].map(|id| format!("{ctx_id}{id}"));
    let [first_id, prev_id, next_id, last_id] = &ids;
    let mut current_page: usize = 0;

    let msg = ctx
        .send(
            poise::CreateReply::default()
                .reply(true)
                .allowed_mentions(CreateAllowedMentions::new().replied_user(false))
                .embed(page_embed(&filter, &pages, current_page))
                .components(page_buttons(&ids, current_page, pages.len())),
        )
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    while let Some(press) = collector::ComponentInteractionCollector::new(ctx)
        .filter(move |press| press.data.custom_id.starts_with(&ctx_id.to_string()))
        .timeout(std::time::Duration::from_secs(60))
        .await
    {
        if press.user.id != author_id {
            press
                .create_response(
                    ctx,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("you cannot interact with another user's invoked command!")
                            .ephemeral(true),
                    ),
                )
                .await
                .inspect_err(
                    |e| tracing::error!(err = ?e, "an error occurred when creating response"),
                )?;

            continue;
        }

        if press.data.custom_id == *prev_id {
            current_page = current_page.saturating_sub(1);
        } else if press.data.custom_id == *next_id {
            current_page = (current_page + 1).min(pages.len() - 1);
        } else if press.data.custom_id == *first_id {
            current_page = 0;
        } else if press.data.custom_id == *last_id {
            current_page = pages.len() - 1;
        } else {
            continue;
        }

        press
            .create_response(
                ctx,
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .embed(page_embed(&filter, &pages, current_page))
                        .components(page_buttons(&ids, current_page, pages.len())),
                ),
            )
            .await
            .inspect_err(
                |e| tracing::error!(err = ?e, "an error occurred when creating response"),
            )?;
    }

    msg.into_message()
        .await?
        .edit(ctx, EditMessage::default().components(vec![]))
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when editing message"))?;

    Ok(())
}

fn describe_categories(quotes: &[Quote], categories: &[String], selected: &CategoryFilter) -> String {
    let mut lines = vec![format!(
        "- {} ({}){}",
        CategoryFilter::ALL,
        quotes.len(),
        if *selected == CategoryFilter::All { " ← selected" } else { "" }
    )];

    for category in categories {
        let count = quotes.iter().filter(|q| q.category == *category).count();
        let is_selected = matches!(selected, CategoryFilter::Category(c) if c == category);

        lines.push(format!(
            "- {} ({}){}",
            category_label(category),
            count,
            if is_selected { " ← selected" } else { "" }
        ));
    }

    lines.join("\n")
}

/// list the known categories.
#[poise::command(prefix_command, rename = "categories")]
#[tracing::instrument(skip_all)]
pub async fn list_categories(ctx: Context<'_>) -> Result<(), Error> {
    let store = &ctx.data().quotes;

    let selected = store.selected_category().await.inspect_err(
        |e| tracing::error!(err = ?e, "an error occurred when fetching selected category"),
    )?;
    let quotes = store.quotes().await;
    let categories = store.categories().await;

    ctx.send(
        poise::CreateReply::default()
            .reply(true)
            .allowed_mentions(CreateAllowedMentions::new().replied_user(false))
            .embed(
                CreateEmbed::default()
                    .title("categories")
                    .description(describe_categories(&quotes, &categories, &selected)),
            ),
    )
    .await
    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}

/// show or change the selected category: `filter <category>`, or `filter all`.
///
/// quotes fetched from the server have no category. select them with `filter uncategorized`.
#[poise::command(prefix_command, rename = "filter")]
#[tracing::instrument(skip(ctx))]
pub async fn select_category(
    ctx: Context<'_>,
    #[rest] category: Option<String>,
) -> Result<(), Error> {
    let store = &ctx.data().quotes;

    let Some(category) = category else {
        let selected = store.selected_category().await.inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when fetching selected category"),
        )?;

        return reply(ctx, format!("the selected category is \"{selected}\".")).await;
    };

    let filter: CategoryFilter = category.parse().unwrap_or_default();

    if let CategoryFilter::Category(name) = &filter {
        if !store.categories().await.contains(name) {
            return reply(ctx, format!("category \"{filter}\" does not exist.")).await;
        }
    }

    store.set_selected_category(&filter).await.inspect_err(
        |e| tracing::error!(err = ?e, "an error occurred when saving selected category"),
    )?;

    let quote = store
        .show_random(&filter)
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when picking a quote"))?;

    let content = match quote {
        Some(quote) => format!("now showing \"{filter}\" quotes.\n{quote}"),
        None => format!("now showing \"{filter}\" quotes.\nno quotes available."),
    };

    reply(ctx, content).await
}

/// show the last quote viewed since the bot started.
#[poise::command(prefix_command, rename = "last")]
#[tracing::instrument(skip_all)]
pub async fn last_quote(ctx: Context<'_>) -> Result<(), Error> {
    let quote = ctx.data().quotes.last_viewed().await.inspect_err(
        |e| tracing::error!(err = ?e, "an error occurred when fetching last viewed quote"),
    )?;

    match quote {
        Some(quote) => reply(ctx, format!("last viewed: {quote}")).await,
        None => reply(ctx, "no quote has been viewed yet.").await,
    }
}

/// export every quote as a JSON file.
#[poise::command(prefix_command, rename = "export")]
#[tracing::instrument(skip_all)]
pub async fn export_quotes(ctx: Context<'_>) -> Result<(), Error> {
    let json = ctx.data().quotes.export_json().await.inspect_err(
        |e| tracing::error!(err = ?e, "an error occurred when exporting quotes"),
    )?;

    ctx.send(
        poise::CreateReply::default()
            .reply(true)
            .allowed_mentions(CreateAllowedMentions::new().replied_user(false))
            .content("here's your quotes!")
            .attachment(CreateAttachment::bytes(json.into_bytes(), "quotes.json")),
    )
    .await
    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}

/// import quotes from an attached JSON file and add them to the collection.
#[poise::command(prefix_command, rename = "import")]
#[tracing::instrument(skip_all)]
pub async fn import_quotes(ctx: Context<'_>, file: Attachment) -> Result<(), Error> {
    if u64::from(file.size) > MAX_IMPORT_BYTES {
        return reply(ctx, "that file is too large to import.").await;
    }

    let bytes = file.download().await.inspect_err(
        |e| tracing::error!(err = ?e, filename = %file.filename, "an error occurred when downloading attachment"),
    )?;

    match ctx.data().quotes.import_json(&bytes).await {
        Ok(count) => reply(ctx, format!("imported {count} quote(s) successfully!")).await,
        Err(e) => reply_or_raise(ctx, e).await,
    }
}

/// sync the quotes with the server now.
#[poise::command(prefix_command, rename = "sync")]
#[tracing::instrument(skip_all)]
pub async fn sync_quotes(ctx: Context<'_>) -> Result<(), Error> {
    let outcome = ctx
        .data()
        .sync
        .run()
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when syncing quotes"))?;

    reply(ctx, format!("sync finished: {outcome}.")).await
}
