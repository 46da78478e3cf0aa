use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use crate::{
    error::{EntryError, Result},
    migration,
    models::{Entry, EntryPayload, NewEntry},
};

/// Owns the connection pool to the `entries` table. Cloning is cheap and
/// every clone talks to the same database.
#[derive(Clone, Debug)]
pub struct EntryStore {
    p: Pool<Sqlite>,
}

impl EntryStore {
    /// Opens a pool on `url`, creating the database file when missing.
    /// The schema is left untouched until [`EntryStore::init`] runs.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let p = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        log::debug!("connected to {url}");
        Ok(Self { p })
    }

    /// A private in-memory database, already initialized. It lives as long as
    /// the store's single connection does.
    pub async fn in_memory() -> Result<Self> {
        let p = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { p };
        store.init().await?;
        Ok(store)
    }

    pub async fn init(&self) -> Result<()> {
        migration::migrate(&self.p).await
    }

    pub async fn close(&self) {
        self.p.close().await;
    }

    pub async fn create(&self, payload: EntryPayload) -> Result<i64> {
        let entry = payload.validate()?;
        self.insert(&entry).await
    }

    pub async fn insert(&self, entry: &NewEntry) -> Result<i64> {
        let mut tx = self.p.begin().await?;
        let id = sqlx::query("INSERT INTO entries (name, amount, category) VALUES (?, ?, ?)")
            .bind(entry.name())
            .bind(entry.amount())
            .bind(entry.category())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        tx.commit().await?;

        log::debug!("created entry {id}");
        Ok(id)
    }

    pub async fn get(&self, id: i64) -> Result<Entry> {
        sqlx::query_as::<_, Entry>(
            "SELECT id, name, amount, category FROM entries WHERE id = ? LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.p)
        .await?
        .ok_or(EntryError::NotFound(id))
    }

    /// Every entry, in insertion order.
    pub async fn get_all(&self) -> Result<Vec<Entry>> {
        let entries = sqlx::query_as::<_, Entry>(
            "SELECT id, name, amount, category FROM entries ORDER BY id",
        )
        .fetch_all(&self.p)
        .await?;
        Ok(entries)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.p)
            .await?;
        Ok(count)
    }

    /// Sum of every amount, zero when the table is empty.
    pub async fn total(&self) -> Result<f64> {
        let total: f64 = sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0.0) FROM entries")
            .fetch_one(&self.p)
            .await?;
        Ok(total)
    }

    /// One page of [`EntryStore::get_all`].
    pub async fn page(&self, limit: i64, offset: i64) -> Result<Vec<Entry>> {
        let entries = sqlx::query_as::<_, Entry>(
            "SELECT id, name, amount, category FROM entries ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.p)
        .await?;
        Ok(entries)
    }

    pub async fn update(&self, id: i64, payload: EntryPayload) -> Result<()> {
        let entry = payload.validate()?;

        let mut tx = self.p.begin().await?;
        let res = sqlx::query("UPDATE entries SET name = ?, amount = ?, category = ? WHERE id = ?")
            .bind(entry.name())
            .bind(entry.amount())
            .bind(entry.category())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            return Err(EntryError::NotFound(id));
        }
        tx.commit().await?;

        log::debug!("updated entry {id}");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.p.begin().await?;
        let res = sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            return Err(EntryError::NotFound(id));
        }
        tx.commit().await?;

        log::debug!("deleted entry {id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test() -> EntryStore {
        EntryStore::in_memory()
            .await
            .expect("Failed to create test database")
    }

    fn payload(name: &str, amount: f64, category: Option<&str>) -> EntryPayload {
        EntryPayload::new(name, amount, category)
    }

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let store = setup_test().await;

        let id = store
            .create(payload("Coffee", 3.5, Some("Food")))
            .await
            .expect("Failed to create entry");
        let entry = store.get(id).await.expect("Failed to get entry");

        assert_eq!(
            entry,
            Entry {
                id,
                name: "Coffee".to_string(),
                amount: 3.5,
                category: Some("Food".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = setup_test().await;
        store.create(payload("Tea", 2.0, None)).await.unwrap();

        assert!(matches!(store.get(99).await, Err(EntryError::NotFound(99))));
        assert!(matches!(
            store.update(99, payload("Tea", 1.0, None)).await,
            Err(EntryError::NotFound(99))
        ));
        assert!(matches!(store.delete(99).await, Err(EntryError::NotFound(99))));

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_init_twice_keeps_rows() {
        let store = setup_test().await;
        store.create(payload("Coffee", 3.5, None)).await.unwrap();

        store.init().await.expect("Second init failed");
        store.init().await.expect("Third init failed");

        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_validation_happens_before_storage() {
        let store = setup_test().await;

        assert!(matches!(
            store.create(payload("", 10.0, None)).await,
            Err(EntryError::InvalidField { field: "name", .. })
        ));
        assert!(matches!(
            store.create(payload("ok", 0.0, None)).await,
            Err(EntryError::InvalidField { field: "amount", .. })
        ));
        assert_eq!(store.count().await.unwrap(), 0);

        let id = store.create(payload("ok", 10.0, Some(""))).await.unwrap();
        assert_eq!(store.get(id).await.unwrap().category, None);
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_row_untouched() {
        let store = setup_test().await;
        let id = store.create(payload("Coffee", 3.5, None)).await.unwrap();

        assert!(store.update(id, payload("Coffee", -4.0, None)).await.is_err());
        assert_eq!(store.get(id).await.unwrap().amount, 3.5);
    }

    #[tokio::test]
    async fn test_coffee_lifecycle() {
        let store = setup_test().await;

        let id = store
            .create(payload("Coffee", 3.5, Some("Food")))
            .await
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(
            store.get_all().await.unwrap(),
            vec![Entry {
                id: 1,
                name: "Coffee".to_string(),
                amount: 3.5,
                category: Some("Food".to_string()),
            }]
        );

        store
            .update(1, payload("Coffee", 4.0, Some("Food")))
            .await
            .unwrap();
        assert_eq!(store.get(1).await.unwrap().amount, 4.0);

        store.delete(1).await.unwrap();
        assert!(matches!(store.get(1).await, Err(EntryError::NotFound(1))));
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_total_sums_amounts() {
        let store = setup_test().await;
        assert_eq!(store.total().await.unwrap(), 0.0);

        store.create(payload("Coffee", 3.5, None)).await.unwrap();
        store.create(payload("Tea", 2.25, None)).await.unwrap();
        assert_eq!(store.total().await.unwrap(), 5.75);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = setup_test().await;
        let first = store.create(payload("Coffee", 3.5, None)).await.unwrap();
        store.delete(first).await.unwrap();

        let second = store.create(payload("Tea", 2.0, None)).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_page_follows_insertion_order() {
        let store = setup_test().await;
        for name in ["aa", "bb", "cc", "dd", "ee"] {
            store.create(payload(name, 1.0, None)).await.unwrap();
        }

        let names: Vec<String> = store
            .page(2, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["cc", "dd"]);
        assert_eq!(store.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_closed_pool_is_storage_unavailable() {
        let store = setup_test().await;
        let id = store.create(payload("Coffee", 3.5, None)).await.unwrap();
        store.close().await;

        assert!(matches!(
            store.get(id).await,
            Err(EntryError::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.update(id, payload("Coffee", 4.0, None)).await,
            Err(EntryError::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.delete(id).await,
            Err(EntryError::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.create(payload("Tea", 2.0, None)).await,
            Err(EntryError::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_file_database_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("entries.db").display());

        let store = EntryStore::connect(&url).await.unwrap();
        store.init().await.unwrap();
        store.create(payload("Coffee", 3.5, None)).await.unwrap();
        store.close().await;

        let store = EntryStore::connect(&url).await.unwrap();
        store.init().await.unwrap();
        assert_eq!(store.get_all().await.unwrap().len(), 1);
        store.close().await;
    }
}
