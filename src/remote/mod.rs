pub mod dto;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::models::Session;

pub use dto::Record;
pub use memory::{FailureMode, InMemoryRemoteStore, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Tasks,
    Courses,
    Notes,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Courses => "courses",
            Self::Notes => "notes",
        }
    }

    /// Column used for the default newest-first presentation order.
    pub fn order_column(&self) -> &'static str {
        match self {
            Self::Tasks | Self::Courses => "created_at",
            Self::Notes => "updated_at",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
}

/// Authenticated CRUD over the owner-scoped remote collections. Rows are
/// snake_case JSON objects; mapping to entities happens in [`dto`].
///
/// `insert` and `update` return the rows the store reports as written. A
/// store that ignores the write (for instance a row-level policy) returns
/// an empty list rather than an error.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select(&self, session: &Session, collection: Collection) -> Result<Vec<Value>, AppError>;
    async fn insert(&self, session: &Session, collection: Collection, row: Value) -> Result<Vec<Value>, AppError>;
    async fn update(
        &self,
        session: &Session,
        collection: Collection,
        id: &str,
        patch: Value,
    ) -> Result<Vec<Value>, AppError>;
    async fn delete(&self, session: &Session, collection: Collection, id: &str) -> Result<(), AppError>;
}

/// PostgREST-style HTTP client.
pub struct RestStoreClient {
    client: Client,
    config: RemoteConfig,
}

impl RestStoreClient {
    pub fn new(config: RemoteConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, collection: Collection) -> Result<Url, AppError> {
        let base = self.config.url.trim_end_matches('/');
        Url::parse(&format!("{}/rest/v1/{}", base, collection.as_str()))
            .map_err(|e| AppError::BadRequest(format!("Invalid remote store url {}: {}", base, e)))
    }

    fn scoped(&self, collection: Collection, owner: &str, id: Option<&str>) -> Result<Url, AppError> {
        let mut url = self.endpoint(collection)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("user_id", &format!("eq.{}", owner));
            if let Some(id) = id {
                query.append_pair("id", &format!("eq.{}", id));
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        let token = if session.access_token.is_empty() {
            &self.config.api_key
        } else {
            &session.access_token
        };
        request
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", token))
    }

    async fn rows(response: Response, action: &str) -> Result<Vec<Value>, AppError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(AppError::RemoteRejected(format!("{} failed: {} {}", action, status, body)));
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str::<Vec<Value>>(&body).map_err(|e| {
            tracing::error!("Failed to parse {} response: {}", action, e);
            AppError::RemoteRejected(format!("Unreadable response to {}: {}", action, e))
        })
    }
}

#[async_trait]
impl RemoteStore for RestStoreClient {
    async fn select(&self, session: &Session, collection: Collection) -> Result<Vec<Value>, AppError> {
        let mut url = self.scoped(collection, &session.user_id, None)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", &format!("{}.desc", collection.order_column()));

        let response = self.authorize(self.client.get(url), session).send().await?;
        Self::rows(response, &format!("select {}", collection)).await
    }

    async fn insert(&self, session: &Session, collection: Collection, row: Value) -> Result<Vec<Value>, AppError> {
        let url = self.endpoint(collection)?;

        let response = self
            .authorize(self.client.post(url), session)
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;
        Self::rows(response, &format!("insert into {}", collection)).await
    }

    async fn update(
        &self,
        session: &Session,
        collection: Collection,
        id: &str,
        patch: Value,
    ) -> Result<Vec<Value>, AppError> {
        let url = self.scoped(collection, &session.user_id, Some(id))?;

        let response = self
            .authorize(self.client.patch(url), session)
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        Self::rows(response, &format!("update {}", collection)).await
    }

    async fn delete(&self, session: &Session, collection: Collection, id: &str) -> Result<(), AppError> {
        let url = self.scoped(collection, &session.user_id, Some(id))?;

        let response = self.authorize(self.client.delete(url), session).send().await?;
        Self::rows(response, &format!("delete from {}", collection)).await?;
        Ok(())
    }
}
