use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppError;
use crate::models::Session;
use crate::remote::{Collection, RemoteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// The store answers with an error.
    Error,
    /// The store answers with success but writes nothing.
    Silent,
}

#[derive(Default)]
struct Inner {
    rows: HashMap<Collection, Vec<Value>>,
    failures: HashMap<(Collection, Operation), FailureMode>,
    calls: HashMap<(Collection, Operation), usize>,
}

/// Owner-scoped in-process store with failure injection.
#[derive(Default)]
pub struct InMemoryRemoteStore {
    inner: Mutex<Inner>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every subsequent `operation` on `collection` fail until healed.
    pub fn fail(&self, collection: Collection, operation: Operation, mode: FailureMode) {
        self.state().failures.insert((collection, operation), mode);
    }

    pub fn heal(&self, collection: Collection, operation: Operation) {
        self.state().failures.remove(&(collection, operation));
    }

    pub fn calls(&self, collection: Collection, operation: Operation) -> usize {
        self.state()
            .calls
            .get(&(collection, operation))
            .copied()
            .unwrap_or(0)
    }

    /// Raw rows of every owner, in insertion order.
    pub fn rows(&self, collection: Collection) -> Vec<Value> {
        self.state().rows.get(&collection).cloned().unwrap_or_default()
    }

    fn begin(&self, collection: Collection, operation: Operation) -> (MutexGuard<'_, Inner>, Option<FailureMode>) {
        let mut state = self.state();
        *state.calls.entry((collection, operation)).or_default() += 1;
        let failure = state.failures.get(&(collection, operation)).copied();
        (state, failure)
    }
}

fn rejected(collection: Collection, operation: Operation) -> AppError {
    AppError::RemoteRejected(format!("{:?} on {} denied", operation, collection))
}

fn owned_by(row: &Value, owner: &str) -> bool {
    row.get("user_id").and_then(Value::as_str) == Some(owner)
}

fn has_id(row: &Value, id: &str) -> bool {
    row.get("id").and_then(Value::as_str) == Some(id)
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn select(&self, session: &Session, collection: Collection) -> Result<Vec<Value>, AppError> {
        let (state, failure) = self.begin(collection, Operation::Select);
        match failure {
            Some(FailureMode::Error) => return Err(rejected(collection, Operation::Select)),
            Some(FailureMode::Silent) => return Ok(Vec::new()),
            None => {}
        }

        let order = collection.order_column();
        let mut rows: Vec<Value> = state
            .rows
            .get(&collection)
            .map(|rows| rows.iter().filter(|r| owned_by(r, &session.user_id)).cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| {
            let a = a.get(order).and_then(Value::as_str).unwrap_or_default();
            let b = b.get(order).and_then(Value::as_str).unwrap_or_default();
            b.cmp(a)
        });
        Ok(rows)
    }

    async fn insert(&self, session: &Session, collection: Collection, row: Value) -> Result<Vec<Value>, AppError> {
        let (mut state, failure) = self.begin(collection, Operation::Insert);
        match failure {
            Some(FailureMode::Error) => return Err(rejected(collection, Operation::Insert)),
            Some(FailureMode::Silent) => return Ok(Vec::new()),
            None => {}
        }

        if !owned_by(&row, &session.user_id) {
            return Err(AppError::RemoteRejected(format!(
                "row for {} does not belong to the signed-in owner",
                collection
            )));
        }
        let id = row.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
        let rows = state.rows.entry(collection).or_default();
        if rows.iter().any(|r| has_id(r, &id)) {
            return Err(AppError::RemoteRejected(format!("duplicate key {} in {}", id, collection)));
        }
        rows.push(row.clone());
        Ok(vec![row])
    }

    async fn update(
        &self,
        session: &Session,
        collection: Collection,
        id: &str,
        patch: Value,
    ) -> Result<Vec<Value>, AppError> {
        let (mut state, failure) = self.begin(collection, Operation::Update);
        match failure {
            Some(FailureMode::Error) => return Err(rejected(collection, Operation::Update)),
            Some(FailureMode::Silent) => return Ok(Vec::new()),
            None => {}
        }

        let Some(row) = state
            .rows
            .entry(collection)
            .or_default()
            .iter_mut()
            .find(|r| has_id(r, id) && owned_by(r, &session.user_id))
        else {
            return Ok(Vec::new());
        };

        if let (Some(target), Value::Object(fields)) = (row.as_object_mut(), patch) {
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        Ok(vec![row.clone()])
    }

    async fn delete(&self, session: &Session, collection: Collection, id: &str) -> Result<(), AppError> {
        let (mut state, failure) = self.begin(collection, Operation::Delete);
        match failure {
            Some(FailureMode::Error) => return Err(rejected(collection, Operation::Delete)),
            Some(FailureMode::Silent) => return Ok(()),
            None => {}
        }

        state
            .rows
            .entry(collection)
            .or_default()
            .retain(|r| !(has_id(r, id) && owned_by(r, &session.user_id)));

        // notes reference their course by a real foreign key
        if collection == Collection::Courses {
            state.rows.entry(Collection::Notes).or_default().retain(|r| {
                !(r.get("course_id").and_then(Value::as_str) == Some(id) && owned_by(r, &session.user_id))
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(user: &str) -> Session {
        Session {
            user_id: user.to_string(),
            email: None,
            access_token: "token".to_string(),
        }
    }

    #[tokio::test]
    async fn test_select_is_scoped_and_newest_first() {
        let store = InMemoryRemoteStore::new();
        let alice = session("alice");
        let bob = session("bob");

        store
            .insert(&alice, Collection::Courses, json!({"id": "c1", "user_id": "alice", "created_at": "2025-01-01"}))
            .await
            .expect("insert");
        store
            .insert(&alice, Collection::Courses, json!({"id": "c2", "user_id": "alice", "created_at": "2025-02-01"}))
            .await
            .expect("insert");
        store
            .insert(&bob, Collection::Courses, json!({"id": "c3", "user_id": "bob", "created_at": "2025-03-01"}))
            .await
            .expect("insert");

        let rows = store.select(&alice, Collection::Courses).await.expect("select");
        let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1"]);
    }

    #[tokio::test]
    async fn test_update_of_foreign_row_affects_nothing() {
        let store = InMemoryRemoteStore::new();
        store
            .insert(&session("bob"), Collection::Tasks, json!({"id": "t1", "user_id": "bob", "title": "x"}))
            .await
            .expect("insert");

        let rows = store
            .update(&session("alice"), Collection::Tasks, "t1", json!({"title": "hijacked"}))
            .await
            .expect("update");
        assert!(rows.is_empty());
        assert_eq!(store.rows(Collection::Tasks)[0]["title"], "x");
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InMemoryRemoteStore::new();
        let alice = session("alice");

        store.fail(Collection::Tasks, Operation::Insert, FailureMode::Silent);
        let rows = store
            .insert(&alice, Collection::Tasks, json!({"id": "t1", "user_id": "alice"}))
            .await
            .expect("silent insert reports success");
        assert!(rows.is_empty());
        assert!(store.rows(Collection::Tasks).is_empty());

        store.fail(Collection::Tasks, Operation::Insert, FailureMode::Error);
        let result = store
            .insert(&alice, Collection::Tasks, json!({"id": "t1", "user_id": "alice"}))
            .await;
        assert!(matches!(result, Err(AppError::RemoteRejected(_))));
        assert_eq!(store.calls(Collection::Tasks, Operation::Insert), 2);

        store.heal(Collection::Tasks, Operation::Insert);
        store
            .insert(&alice, Collection::Tasks, json!({"id": "t1", "user_id": "alice"}))
            .await
            .expect("healed insert");
        assert_eq!(store.rows(Collection::Tasks).len(), 1);
    }
}
