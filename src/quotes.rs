use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::sync::RwLock;

use crate::{
    constants::{LAST_VIEWED_QUOTE_KEY, QUOTES_KEY, SEED_QUOTES, SELECTED_CATEGORY_KEY},
    models::quotes::{CategoryFilter, Quote},
    storage::{KeyValueStore, KeyValueStoreExt},
};

#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("please enter both a quote and a category.")]
    MissingFields,

    #[error("that file is not a valid list of quotes: {0}")]
    InvalidImport(#[source] serde_json::Error),
}

pub struct QuoteStore {
    local: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    quotes: RwLock<Vec<Quote>>,
}

impl QuoteStore {
    pub fn new(local: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self {
            local,
            session,
            quotes: RwLock::new(Vec::new()),
        }
    }

    /// seeds and persists the default quotes when nothing is stored yet.
    #[tracing::instrument(skip_all)]
    pub async fn load(&self) -> anyhow::Result<()> {
        let stored = self.local.get_json::<Vec<Quote>>(QUOTES_KEY).await?;

        let quotes = match stored {
            Some(quotes) => {
                tracing::info!(count = quotes.len(), "loaded quotes from storage");
                quotes
            }
            None => {
                tracing::info!("no stored quotes found, seeding defaults");
                let seed = SEED_QUOTES.clone();
                self.local.set_json(QUOTES_KEY, &seed).await?;
                seed
            }
        };

        *self.quotes.write().await = quotes;

        Ok(())
    }

    pub async fn quotes(&self) -> Vec<Quote> {
        self.quotes.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.quotes.read().await.len()
    }

    // may lag behind memory if a write failed.
    pub async fn persisted(&self) -> anyhow::Result<Vec<Quote>> {
        Ok(self
            .local
            .get_json::<Vec<Quote>>(QUOTES_KEY)
            .await?
            .unwrap_or_default())
    }

    #[tracing::instrument(skip(self))]
    pub async fn add(&self, text: &str, category: &str) -> anyhow::Result<Quote> {
        let text = text.trim();
        let category = category.trim();

        if text.is_empty() || category.is_empty() {
            return Err(QuoteError::MissingFields.into());
        }

        let quote = Quote::new(text, category);

        let mut quotes = self.quotes.write().await;
        quotes.push(quote.clone());
        self.local.set_json(QUOTES_KEY, &*quotes).await?;

        tracing::info!(count = quotes.len(), "added quote");

        Ok(quote)
    }

    pub async fn categories(&self) -> Vec<String> {
        let quotes = self.quotes.read().await;
        let mut categories: Vec<String> = vec![];

        for quote in quotes.iter() {
            if !categories.contains(&quote.category) {
                categories.push(quote.category.clone());
            }
        }

        categories
    }

    pub async fn filtered(&self, filter: &CategoryFilter) -> Vec<Quote> {
        self.quotes
            .read()
            .await
            .iter()
            .filter(|quote| filter.matches(quote))
            .cloned()
            .collect()
    }

    pub async fn selected_category(&self) -> anyhow::Result<CategoryFilter> {
        let stored = self.local.get(SELECTED_CATEGORY_KEY).await?;

        Ok(stored
            .map(|category| category.parse().unwrap_or_default())
            .unwrap_or_default())
    }

    pub async fn set_selected_category(&self, filter: &CategoryFilter) -> anyhow::Result<()> {
        self.local
            .set(SELECTED_CATEGORY_KEY, filter.to_string())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn show_random(&self, filter: &CategoryFilter) -> anyhow::Result<Option<Quote>> {
        let candidates = self.filtered(filter).await;

        let Some(quote) = pick_random(&candidates) else {
            return Ok(None);
        };

        self.session.set_json(LAST_VIEWED_QUOTE_KEY, &quote).await?;

        Ok(Some(quote))
    }

    pub async fn last_viewed(&self) -> anyhow::Result<Option<Quote>> {
        self.session.get_json(LAST_VIEWED_QUOTE_KEY).await
    }

    pub async fn export_json(&self) -> anyhow::Result<String> {
        let quotes = self.quotes.read().await;

        Ok(serde_json::to_string_pretty(&*quotes)?)
    }

    // nothing is appended when the input does not parse.
    #[tracing::instrument(skip_all, fields(len = bytes.len()))]
    pub async fn import_json(&self, bytes: &[u8]) -> anyhow::Result<usize> {
        let imported: Vec<Quote> = serde_json::from_slice(bytes)
            .inspect_err(|e| tracing::warn!(err = ?e, "rejected malformed quotes import"))
            .map_err(QuoteError::InvalidImport)?;

        let count = imported.len();

        let mut quotes = self.quotes.write().await;
        quotes.extend(imported);
        self.local.set_json(QUOTES_KEY, &*quotes).await?;

        tracing::info!(imported = count, total = quotes.len(), "imported quotes");

        Ok(count)
    }

    pub async fn replace(&self, replacement: Vec<Quote>) -> anyhow::Result<()> {
        let mut quotes = self.quotes.write().await;
        self.local.set_json(QUOTES_KEY, &replacement).await?;
        *quotes = replacement;

        Ok(())
    }
}

fn pick_random(quotes: &[Quote]) -> Option<Quote> {
    quotes.choose(&mut rand::thread_rng()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    async fn store_with(quotes: Vec<Quote>) -> (Arc<MemoryStore>, QuoteStore) {
        let local = Arc::new(MemoryStore::new());
        local.set_json(QUOTES_KEY, &quotes).await.unwrap();

        let store = QuoteStore::new(local.clone(), Arc::new(MemoryStore::new()));
        store.load().await.unwrap();

        (local, store)
    }

    fn sample() -> Vec<Quote> {
        vec![
            Quote::new("one", "Life"),
            Quote::new("two", "Motivation"),
            Quote::new("three", "Life"),
            Quote::new("four", "Humor"),
        ]
    }

    #[tokio::test]
    async fn load_seeds_and_persists_defaults() {
        let local = Arc::new(MemoryStore::new());
        let store = QuoteStore::new(local.clone(), Arc::new(MemoryStore::new()));

        store.load().await.unwrap();

        assert_eq!(store.quotes().await, *SEED_QUOTES);
        assert_eq!(store.persisted().await.unwrap(), *SEED_QUOTES);
    }

    #[tokio::test]
    async fn load_keeps_an_empty_stored_collection() {
        let (_, store) = store_with(vec![]).await;

        assert_eq!(store.len().await, 0);
        assert_eq!(store.show_random(&CategoryFilter::All).await.unwrap(), None);
    }

    #[tokio::test]
    async fn persisted_collection_survives_reload() {
        let (local, store) = store_with(sample()).await;
        store.add("five", "Humor").await.unwrap();

        let reloaded = QuoteStore::new(local, Arc::new(MemoryStore::new()));
        reloaded.load().await.unwrap();

        assert_eq!(reloaded.quotes().await, store.quotes().await);
    }

    #[tokio::test]
    async fn add_trims_and_validates() {
        let (_, store) = store_with(vec![]).await;

        let quote = store.add("  Be yourself.  ", " Life ").await.unwrap();
        assert_eq!(quote, Quote::new("Be yourself.", "Life"));

        for (text, category) in [("", "Life"), ("text", "   "), (" ", " ")] {
            let err = store.add(text, category).await.unwrap_err();
            assert!(matches!(
                err.downcast_ref::<QuoteError>(),
                Some(QuoteError::MissingFields)
            ));
        }

        assert_eq!(store.persisted().await.unwrap(), vec![quote]);
    }

    #[tokio::test]
    async fn categories_are_distinct_in_first_seen_order() {
        let (_, store) = store_with(sample()).await;

        assert_eq!(store.categories().await, vec!["Life", "Motivation", "Humor"]);
    }

    #[tokio::test]
    async fn filter_all_returns_everything() {
        let (_, store) = store_with(sample()).await;

        assert_eq!(store.filtered(&CategoryFilter::All).await, sample());
    }

    #[tokio::test]
    async fn filter_category_preserves_order() {
        let (_, store) = store_with(sample()).await;

        assert_eq!(
            store
                .filtered(&CategoryFilter::Category("Life".into()))
                .await,
            vec![Quote::new("one", "Life"), Quote::new("three", "Life")]
        );
        assert!(store
            .filtered(&CategoryFilter::Category("Nope".into()))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn random_quote_comes_from_filtered_set() {
        let (_, store) = store_with(sample()).await;
        let filter = CategoryFilter::Category("Life".into());
        let allowed = store.filtered(&filter).await;

        for _ in 0..50 {
            let quote = store.show_random(&filter).await.unwrap().unwrap();

            assert!(allowed.contains(&quote));
            assert_eq!(store.last_viewed().await.unwrap(), Some(quote));
        }
    }

    #[tokio::test]
    async fn empty_filter_result_keeps_last_viewed() {
        let (_, store) = store_with(sample()).await;

        let shown = store
            .show_random(&CategoryFilter::Category("Humor".into()))
            .await
            .unwrap();
        let missing = store
            .show_random(&CategoryFilter::Category("Nope".into()))
            .await
            .unwrap();

        assert_eq!(missing, None);
        assert_eq!(store.last_viewed().await.unwrap(), shown);
    }

    #[tokio::test]
    async fn selected_category_defaults_to_all() {
        let (local, store) = store_with(sample()).await;

        assert_eq!(store.selected_category().await.unwrap(), CategoryFilter::All);

        store
            .set_selected_category(&CategoryFilter::Category("Humor".into()))
            .await
            .unwrap();

        assert_eq!(
            local.get(SELECTED_CATEGORY_KEY).await.unwrap().as_deref(),
            Some("Humor")
        );
        assert_eq!(
            store.selected_category().await.unwrap(),
            CategoryFilter::Category("Humor".into())
        );
    }

    #[tokio::test]
    async fn import_appends_records() {
        let (_, store) = store_with(sample()).await;
        let before = store.len().await;

        let count = store
            .import_json(br#"[{"text":"X","category":"Y"}]"#)
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(store.len().await, before + 1);
        assert_eq!(
            store.persisted().await.unwrap().last(),
            Some(&Quote::new("X", "Y"))
        );
    }

    #[tokio::test]
    async fn malformed_import_changes_nothing() {
        let (_, store) = store_with(sample()).await;

        let err = store.import_json(b"{\"text\": ").await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<QuoteError>(),
            Some(QuoteError::InvalidImport(_))
        ));
        assert_eq!(store.quotes().await, sample());
    }

    #[tokio::test]
    async fn export_then_import_duplicates_collection() {
        let (_, store) = store_with(sample()).await;

        let exported = store.export_json().await.unwrap();
        store.import_json(exported.as_bytes()).await.unwrap();

        let mut expected = sample();
        expected.extend(sample());
        assert_eq!(store.quotes().await, expected);
    }

    #[tokio::test]
    async fn replace_overwrites_memory_and_storage() {
        let (_, store) = store_with(sample()).await;
        let remote = vec![Quote::new("remote", "Server")];

        store.replace(remote.clone()).await.unwrap();

        assert_eq!(store.quotes().await, remote);
        assert_eq!(store.persisted().await.unwrap(), remote);
    }
}
