use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::AppError;

/// Durable key-value store backing local-only mode. Every collection lives
/// under one key as a single JSON array and is rewritten as a whole.
#[derive(Clone)]
pub struct LocalStore {
    db: SqlitePool,
}

impl LocalStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    pub async fn read_raw(&self, key: &str) -> Result<Option<String>, AppError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;
        Ok(value)
    }

    pub async fn write_raw(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        write_in(&mut tx, key, value).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Reads a whole collection. An absent key is an empty collection; a
    /// payload that does not parse is reported, never silently dropped.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, AppError> {
        match self.read_raw(key).await? {
            Some(raw) => decode(key, &raw),
            None => Ok(Vec::new()),
        }
    }

    /// Read-modify-write of one collection inside a single transaction.
    pub async fn transform<T, F, R>(&self, key: &str, f: F) -> Result<R, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> R,
    {
        let mut tx = self.db.begin().await?;

        let mut items: Vec<T> = read_in(&mut tx, key).await?;
        let result = f(&mut items);
        write_items_in(&mut tx, key, &items).await?;

        tx.commit().await?;
        Ok(result)
    }

    /// Like [`LocalStore::transform`] over two collections that must change
    /// together; either both keys are rewritten or neither is.
    pub async fn transform_pair<A, B, F, R>(&self, first: &str, second: &str, f: F) -> Result<R, AppError>
    where
        A: Serialize + DeserializeOwned,
        B: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<A>, &mut Vec<B>) -> R,
    {
        let mut tx = self.db.begin().await?;

        let mut a: Vec<A> = read_in(&mut tx, first).await?;
        let mut b: Vec<B> = read_in(&mut tx, second).await?;
        let result = f(&mut a, &mut b);
        write_items_in(&mut tx, first, &a).await?;
        write_items_in(&mut tx, second, &b).await?;

        tx.commit().await?;
        Ok(result)
    }

    pub async fn read_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.read_raw(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| AppError::CorruptPayload {
                    key: key.to_string(),
                    details: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    pub async fn write_record<T: Serialize>(&self, key: &str, record: &T) -> Result<(), AppError> {
        let raw = serde_json::to_string(record)?;
        self.write_raw(key, &raw).await
    }
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<Vec<T>, AppError> {
    serde_json::from_str(raw).map_err(|e| AppError::CorruptPayload {
        key: key.to_string(),
        details: e.to_string(),
    })
}

async fn read_in<T: DeserializeOwned>(tx: &mut Transaction<'_, Sqlite>, key: &str) -> Result<Vec<T>, AppError> {
    let raw = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?;
    match raw {
        Some(raw) => decode(key, &raw),
        None => Ok(Vec::new()),
    }
}

async fn write_items_in<T: Serialize>(
    tx: &mut Transaction<'_, Sqlite>,
    key: &str,
    items: &[T],
) -> Result<(), AppError> {
    let raw = serde_json::to_string(items)?;
    write_in(tx, key, &raw).await
}

async fn write_in(tx: &mut Transaction<'_, Sqlite>, key: &str, value: &str) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"
    )
    .bind(key)
    .bind(value)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
