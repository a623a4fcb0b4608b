use std::collections::HashMap;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Pool, Sqlite};
use tokio::sync::RwLock;

#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let raw = self.get(key).await?;

        raw.map(|value| serde_json::from_str(&value))
            .transpose()
            .inspect_err(
                |e| tracing::error!(err = ?e, key = %key, "an error occurred when decoding stored value"),
            )
            .map_err(Into::into)
    }

    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value)?;

        self.set(key, raw).await
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}

#[derive(Clone)]
pub struct SqliteStore {
    db: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            r#"
                SELECT
                    value
                FROM key_value_store
                WHERE key = $1;
            "#,
        )
        .bind(key)
        .fetch_optional(&self.db)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, key = %key, "an error occurred when reading key from db"),
        )?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        sqlx::query(
            r#"
                INSERT INTO
                    key_value_store (key, value)
                VALUES
                    ($1, $2)
                ON CONFLICT (key)
                DO UPDATE SET
                    value = excluded.value;
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, key = %key, "an error occurred when writing key to db"),
        )?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
                DELETE FROM key_value_store
                WHERE key = $1;
            "#,
        )
        .bind(key)
        .execute(&self.db)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, key = %key, "an error occurred when deleting key from db"),
        )?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.data.write().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::models::quotes::Quote;

    async fn sqlite_store() -> SqliteStore {
        // every connection to `sqlite::memory:` opens its own database.
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::migrate!("./migrations").run(&db).await.unwrap();

        SqliteStore::new(db)
    }

    #[tokio::test]
    async fn sqlite_store_overwrites_and_removes() {
        let store = sqlite_store().await;

        assert_eq!(store.get("selectedCategory").await.unwrap(), None);

        store.set("selectedCategory", "Life".into()).await.unwrap();
        store.set("selectedCategory", "Motivation".into()).await.unwrap();
        assert_eq!(
            store.get("selectedCategory").await.unwrap().as_deref(),
            Some("Motivation")
        );

        assert!(store.remove("selectedCategory").await.unwrap());
        assert!(!store.remove("selectedCategory").await.unwrap());
        assert_eq!(store.get("selectedCategory").await.unwrap(), None);
    }

    #[tokio::test]
    async fn sqlite_store_keeps_quote_order() {
        let store = sqlite_store().await;
        let quotes = vec![
            Quote::new("b", "Life"),
            Quote::new("a", "Motivation"),
            Quote::new("b", "Life"),
        ];

        store.set_json("quotes", &quotes).await.unwrap();

        let loaded: Option<Vec<Quote>> = store.get_json("quotes").await.unwrap();
        assert_eq!(loaded, Some(quotes));
    }

    #[tokio::test]
    async fn memory_store_json_helpers() {
        let store = MemoryStore::new();

        store
            .set_json("lastViewedQuote", &Quote::new("X", "Y"))
            .await
            .unwrap();

        let got: Option<Quote> = store.get_json("lastViewedQuote").await.unwrap();
        assert_eq!(got, Some(Quote::new("X", "Y")));

        let missing: Option<Quote> = store.get_json("nothing").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn get_json_reports_corrupt_values() {
        let store = MemoryStore::new();
        store.set("quotes", "not json".into()).await.unwrap();

        assert!(store.get_json::<Vec<Quote>>("quotes").await.is_err());
    }
}
