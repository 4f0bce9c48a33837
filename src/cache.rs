use serde::Serialize;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{Course, Entity, Note, Task};

/// Whether the cache reflects a completed load. An empty cache after a
/// failed load is not the same thing as an owner with no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityList<T> {
    items: Vec<T>,
}

impl<T> Default for EntityList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> EntityList<T> {
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn append(&mut self, item: T) {
        self.items.push(item);
    }

    /// Re-inserts at a remembered position, clamped to the current length.
    pub fn insert_at(&mut self, index: usize, item: T) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    /// Swaps in a new version in place, returning the prior one.
    pub fn replace(&mut self, item: T) -> Option<T> {
        let slot = self.items.iter_mut().find(|existing| existing.id() == item.id())?;
        Some(std::mem::replace(slot, item))
    }

    pub fn remove(&mut self, id: &str) -> Option<(usize, T)> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some((index, self.items.remove(index)))
    }

    /// Removes every matching item, returning them with their original
    /// positions in ascending order.
    pub fn remove_where<F>(&mut self, mut f: F) -> Vec<(usize, T)>
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.items.len());
        for (index, item) in std::mem::take(&mut self.items).into_iter().enumerate() {
            if f(&item) {
                removed.push((index, item));
            } else {
                kept.push(item);
            }
        }
        self.items = kept;
        removed
    }

    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[derive(Debug, Default)]
pub struct CacheState {
    pub tasks: EntityList<Task>,
    pub courses: EntityList<Course>,
    pub notes: EntityList<Note>,
    pub load_state: LoadState,
}

impl CacheState {
    pub fn find_course_by_name(&self, name: &str) -> Option<&Course> {
        self.courses.as_slice().iter().find(|c| c.matches_name(name))
    }
}

/// Maps an entity type to its list inside the cache.
pub trait Cached: Entity {
    fn list(state: &CacheState) -> &EntityList<Self>;
    fn list_mut(state: &mut CacheState) -> &mut EntityList<Self>;
}

impl Cached for Task {
    fn list(state: &CacheState) -> &EntityList<Self> {
        &state.tasks
    }

    fn list_mut(state: &mut CacheState) -> &mut EntityList<Self> {
        &mut state.tasks
    }
}

impl Cached for Course {
    fn list(state: &CacheState) -> &EntityList<Self> {
        &state.courses
    }

    fn list_mut(state: &mut CacheState) -> &mut EntityList<Self> {
        &mut state.courses
    }
}

impl Cached for Note {
    fn list(state: &CacheState) -> &EntityList<Self> {
        &state.notes
    }

    fn list_mut(state: &mut CacheState) -> &mut EntityList<Self> {
        &mut state.notes
    }
}

/// In-memory copy of the signed-in owner's data. Each structural change
/// happens under the write lock, so readers never see a partial update.
#[derive(Debug, Default)]
pub struct LocalCache {
    inner: RwLock<CacheState>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.inner.write().await
    }

    pub async fn all<T: Cached>(&self) -> Vec<T> {
        T::list(&*self.read().await).snapshot()
    }

    pub async fn get<T: Cached>(&self, id: &str) -> Option<T> {
        T::list(&*self.read().await).get(id).cloned()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.all().await
    }

    pub async fn courses(&self) -> Vec<Course> {
        self.all().await
    }

    pub async fn notes(&self) -> Vec<Note> {
        self.all().await
    }

    pub async fn load_state(&self) -> LoadState {
        self.read().await.load_state.clone()
    }

    pub async fn set_load_state(&self, load_state: LoadState) {
        self.write().await.load_state = load_state;
    }

    pub async fn clear(&self) {
        let mut state = self.write().await;
        state.tasks.clear();
        state.courses.clear();
        state.notes.clear();
        state.load_state = LoadState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: &str, name: &str) -> Course {
        Course {
            id: id.to_string(),
            name: name.to_string(),
            color: "#3B82F6".to_string(),
            icon: None,
            created_at: "2025-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut list = EntityList::default();
        list.append(course("a", "A"));
        list.append(course("b", "B"));
        list.append(course("c", "C"));

        let prior = list.replace(course("b", "B2")).expect("b is present");
        assert_eq!(prior.name, "B");
        assert_eq!(list.as_slice()[1].name, "B2");
        assert!(list.replace(course("zz", "Z")).is_none());
    }

    #[test]
    fn test_remove_then_insert_at_restores_order() {
        let mut list = EntityList::default();
        list.append(course("a", "A"));
        list.append(course("b", "B"));
        list.append(course("c", "C"));
        let before = list.clone();

        let (index, removed) = list.remove("b").expect("b is present");
        assert_eq!(index, 1);
        assert_eq!(list.len(), 2);

        list.insert_at(index, removed);
        assert_eq!(list, before);
    }

    #[test]
    fn test_remove_where_reports_positions() {
        let mut list = EntityList::default();
        list.append(course("a", "keep"));
        list.append(course("b", "drop"));
        list.append(course("c", "drop"));

        let removed = list.remove_where(|c| c.name == "drop");
        let positions: Vec<usize> = removed.iter().map(|(i, _)| *i).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn test_course_lookup_ignores_case() {
        let cache = LocalCache::new();
        cache.write().await.courses.append(course("a", "CS101"));

        let state = cache.read().await;
        assert!(state.find_course_by_name("cs101").is_some());
        assert!(state.find_course_by_name("cs102").is_none());
    }

    #[tokio::test]
    async fn test_clear_resets_load_state() {
        let cache = LocalCache::new();
        cache.write().await.courses.append(course("a", "CS101"));
        cache.set_load_state(LoadState::Loaded).await;

        cache.clear().await;

        assert!(cache.courses().await.is_empty());
        assert_eq!(cache.load_state().await, LoadState::Idle);
    }
}
