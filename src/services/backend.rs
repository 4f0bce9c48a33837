use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::db::LocalStore;
use crate::error::AppError;
use crate::models::{Course, Entity, Note, Session};
use crate::remote::{Collection, Record, RemoteStore};

/// Where writes are persisted: the remote store, or the local key-value
/// store when no remote is configured.
#[derive(Clone)]
pub enum Backend {
    Remote(Arc<dyn RemoteStore>),
    Local(LocalStore),
}

impl Backend {
    pub fn is_local(&self) -> bool {
        matches!(self, Backend::Local(_))
    }

    pub async fn fetch_all<T: Record>(&self, session: &Session) -> Result<Vec<T>, AppError> {
        match self {
            Backend::Remote(store) => {
                let rows = store.select(session, T::COLLECTION).await?;
                let items = rows
                    .into_iter()
                    .filter_map(|row| match T::from_row(row) {
                        Ok(item) => Some(item),
                        Err(e) => {
                            warn!("Skipping unreadable {} row: {}", T::COLLECTION, e);
                            None
                        }
                    })
                    .collect();
                Ok(items)
            }
            Backend::Local(store) => store.load(T::COLLECTION.as_str()).await,
        }
    }

    /// Returns the rows the backend reports as written.
    pub async fn insert<T: Record>(&self, session: &Session, item: &T) -> Result<Vec<Value>, AppError> {
        match self {
            Backend::Remote(store) => {
                store
                    .insert(session, T::COLLECTION, item.to_row(&session.user_id)?)
                    .await
            }
            Backend::Local(store) => {
                let row = serde_json::to_value(item)?;
                store
                    .transform::<T, _, _>(T::COLLECTION.as_str(), |items| items.push(item.clone()))
                    .await?;
                Ok(vec![row])
            }
        }
    }

    pub async fn update<T: Record>(&self, session: &Session, item: &T) -> Result<Vec<Value>, AppError> {
        match self {
            Backend::Remote(store) => {
                store
                    .update(session, T::COLLECTION, item.id(), item.to_patch()?)
                    .await
            }
            Backend::Local(store) => {
                let row = serde_json::to_value(item)?;
                let replaced = store
                    .transform::<T, _, _>(T::COLLECTION.as_str(), |items| {
                        match items.iter_mut().find(|existing| existing.id() == item.id()) {
                            Some(slot) => {
                                *slot = item.clone();
                                true
                            }
                            None => false,
                        }
                    })
                    .await?;
                Ok(if replaced { vec![row] } else { Vec::new() })
            }
        }
    }

    pub async fn delete<T: Record>(&self, session: &Session, id: &str) -> Result<(), AppError> {
        match self {
            Backend::Remote(store) => store.delete(session, T::COLLECTION, id).await,
            // the remote schema cascades course deletion to notes
            Backend::Local(store) if T::COLLECTION == Collection::Courses => {
                store
                    .transform_pair::<Course, Note, _, _>(
                        Collection::Courses.as_str(),
                        Collection::Notes.as_str(),
                        |courses, notes| {
                            courses.retain(|course| course.id != id);
                            notes.retain(|note| note.course_id != id);
                        },
                    )
                    .await?;
                Ok(())
            }
            Backend::Local(store) => {
                store
                    .transform::<T, _, _>(T::COLLECTION.as_str(), |items| {
                        items.retain(|existing| existing.id() != id)
                    })
                    .await?;
                Ok(())
            }
        }
    }
}
