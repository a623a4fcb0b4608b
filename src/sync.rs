use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use poise::serenity_prelude::{CreateMessage, Http};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
    constants::{
        sync::{
            DEFAULT_SYNC_ENDPOINT, DEFAULT_SYNC_INTERVAL_SECS, DEFAULT_SYNC_LIMIT,
            DEFAULT_SYNC_TIMEOUT_SECS,
        },
        LAST_SYNC_KEY,
    },
    models::{
        quotes::Quote,
        sync::{LastSync, SyncOutcome},
    },
    quotes::QuoteStore,
    storage::{KeyValueStore, KeyValueStoreExt},
    Data, Error,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncSettings {
    pub endpoint: String,
    pub interval: Duration,
    pub limit: usize,
    pub timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SYNC_ENDPOINT.to_string(),
            interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            limit: DEFAULT_SYNC_LIMIT,
            timeout: Duration::from_secs(DEFAULT_SYNC_TIMEOUT_SECS),
        }
    }
}

#[async_trait]
pub trait RemoteQuotes: Send + Sync + 'static {
    async fn fetch_quotes(&self) -> anyhow::Result<Vec<Quote>>;
    async fn post_quote(&self, quote: &Quote) -> anyhow::Result<Quote>;
}

#[derive(Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    endpoint: String,
    limit: usize,
}

impl HttpRemote {
    pub fn new(settings: &SyncSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(HttpRemote {
            client,
            endpoint: settings.endpoint.clone(),
            limit: settings.limit,
        })
    }
}

fn parse_server_quotes(text: &str, limit: usize) -> serde_json::Result<Vec<Quote>> {
    let mut quotes: Vec<Quote> = serde_json::from_str(text)?;
    quotes.truncate(limit);

    Ok(quotes)
}

#[async_trait]
impl RemoteQuotes for HttpRemote {
    async fn fetch_quotes(&self) -> anyhow::Result<Vec<Quote>> {
        let resp = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .inspect_err(
                |e| tracing::error!(err = ?e, "an error occurred when fetching quotes from server"),
            )?;

        let text = resp.text().await.inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when receiving response text"),
        )?;

        let quotes = parse_server_quotes(&text, self.limit).inspect_err(
            |e| tracing::error!(err = ?e, text = %text, "an error occurred when parsing server quotes"),
        )?;

        Ok(quotes)
    }

    async fn post_quote(&self, quote: &Quote) -> anyhow::Result<Quote> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(quote)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .inspect_err(
                |e| tracing::error!(err = ?e, "an error occurred when posting quote to server"),
            )?;

        let echo = resp.json::<Quote>().await.inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when decoding posted quote"),
        )?;

        Ok(echo)
    }
}

// only sizes are compared, so edits that keep the count the same are never noticed.
#[tracing::instrument(skip_all)]
pub async fn sync_quotes(
    store: &QuoteStore,
    remote: &dyn RemoteQuotes,
) -> anyhow::Result<SyncOutcome> {
    let server_quotes = remote.fetch_quotes().await.unwrap_or_else(|e| {
        tracing::warn!(err = ?e, "couldn't fetch quotes from server, treating it as empty");
        vec![]
    });

    let local_quotes = store.persisted().await?;

    let outcome = if server_quotes.len() > local_quotes.len() {
        let count = server_quotes.len();
        store.replace(server_quotes).await?;

        SyncOutcome::Replaced { count }
    } else if local_quotes.len() > server_quotes.len() {
        let mut failed = 0;
        let pending = &local_quotes[server_quotes.len()..];

        for quote in pending {
            match remote.post_quote(quote).await {
                Ok(echo) => tracing::debug!(quote = %echo, "posted quote to server"),
                Err(e) => {
                    tracing::warn!(err = ?e, quote = %quote, "couldn't post quote to server");
                    failed += 1;
                }
            }
        }

        SyncOutcome::Pushed {
            attempted: pending.len(),
            failed,
        }
    } else {
        SyncOutcome::Unchanged
    };

    tracing::info!(
        local = local_quotes.len(),
        %outcome,
        "finished syncing quotes with server"
    );

    Ok(outcome)
}

pub struct QuoteSync {
    store: Arc<QuoteStore>,
    remote: Arc<dyn RemoteQuotes>,
    local: Arc<dyn KeyValueStore>,
    lock: Mutex<()>,
}

impl QuoteSync {
    pub fn new(
        store: Arc<QuoteStore>,
        remote: Arc<dyn RemoteQuotes>,
        local: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            store,
            remote,
            local,
            lock: Mutex::new(()),
        }
    }

    pub async fn run(&self) -> anyhow::Result<SyncOutcome> {
        let _guard = self.lock.lock().await;

        let outcome = sync_quotes(&self.store, self.remote.as_ref()).await?;

        let last_sync = LastSync {
            finished_at: OffsetDateTime::now_utc(),
            outcome,
        };

        self.local.set_json(LAST_SYNC_KEY, &last_sync).await?;

        Ok(outcome)
    }

    pub async fn last_sync(&self) -> anyhow::Result<Option<LastSync>> {
        self.local.get_json(LAST_SYNC_KEY).await
    }
}

#[tracing::instrument(skip_all)]
pub async fn quote_sync(http: &Http, data: &Data) -> Result<(), Error> {
    tracing::info!("started syncing quotes with server!");

    let outcome = data
        .sync
        .run()
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when syncing quotes"))?;

    if let (SyncOutcome::Replaced { count }, Some(channel_id)) = (outcome, data.sync_channel_id) {
        channel_id
            .send_message(
                &http,
                CreateMessage::new().content(format!(
                    "quotes synced with server! there are now {count} quotes."
                )),
            )
            .await
            .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending message"))?;
    }

    Ok(())
}
