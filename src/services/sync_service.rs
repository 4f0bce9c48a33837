use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{error, info, warn};

use crate::cache::{CacheState, LoadState, LocalCache};
use crate::error::AppError;
use crate::models::*;
use crate::remote::Record;
use crate::services::backend::Backend;
use crate::services::notifier::Notifier;
use crate::services::session::{SessionEvent, SessionHub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Discipline {
    /// Apply to the cache first, persist afterwards, roll back on failure.
    #[default]
    Optimistic,
    /// Persist first, apply to the cache only after the store confirms.
    PersistFirst,
}

impl Discipline {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "persist-first" | "persist_first" | "verified" => Ok(Self::PersistFirst),
            other => Err(AppError::BadRequest(format!("Unknown sync discipline: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SyncStrategy {
    pub discipline: Discipline,
    /// Treat a write that returns zero rows as rejected.
    pub verify_writes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DeleteTarget {
    Task(String),
    Course(String),
    Note(String),
}

/// What a session notification did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionTransition {
    /// Same session as the one already established.
    Ignored,
    /// Same owner, new credentials; nothing refetched.
    Refreshed,
    Reloaded,
    Cleared,
}

/// Async per-identifier locks, so two mutations of the same entity run one
/// after the other and the later user action is the one that sticks.
#[derive(Default)]
struct EntityLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl EntityLocks {
    async fn acquire(&self, key: String) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// The signed-in session plus a counter bumped on every owner change, so
/// results of operations started under an earlier session can be spotted.
#[derive(Debug, Default)]
struct SessionSlot {
    session: Option<Session>,
    epoch: u64,
}

/// Identity captured when an operation starts.
#[derive(Debug, Clone)]
struct Scope {
    session: Session,
    epoch: u64,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

pub struct SyncService {
    backend: Backend,
    strategy: SyncStrategy,
    cache: LocalCache,
    notifier: Notifier,
    session: RwLock<SessionSlot>,
    pending_delete: Mutex<Option<DeleteTarget>>,
    locks: EntityLocks,
}

impl SyncService {
    pub fn new(backend: Backend, strategy: SyncStrategy) -> Self {
        Self {
            backend,
            strategy,
            cache: LocalCache::new(),
            notifier: Notifier::new(),
            session: RwLock::new(SessionSlot::default()),
            pending_delete: Mutex::new(None),
            locks: EntityLocks::default(),
        }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn strategy(&self) -> SyncStrategy {
        self.strategy
    }

    pub fn is_local(&self) -> bool {
        self.backend.is_local()
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.session.read().await.session.clone()
    }

    async fn establish(&self, session: Option<Session>) {
        let mut slot = self.session.write().await;
        slot.session = session;
        slot.epoch += 1;
    }

    pub async fn pending_delete(&self) -> Option<DeleteTarget> {
        self.pending_delete.lock().await.clone()
    }

    // --- session lifecycle ---

    /// Establishes the session the provider already holds and performs the
    /// first bulk load. Later notifications repeating this session are
    /// ignored by [`SyncService::apply_session`].
    pub async fn initialize(&self, sessions: &SessionHub) -> Result<(), AppError> {
        let session = sessions.current_session().await;
        let should_load = session.is_some() || self.backend.is_local();
        self.establish(session).await;

        if should_load {
            self.load().await
        } else {
            info!("No session yet, waiting for sign-in");
            Ok(())
        }
    }

    pub async fn handle_event(&self, event: SessionEvent) -> SessionTransition {
        match event {
            SessionEvent::SignedIn(session) => self.apply_session(Some(session)).await,
            SessionEvent::SignedOut => self.apply_session(None).await,
        }
    }

    /// Compares and switches the session in one critical section, so a
    /// notification handled twice (by the listener and by the caller that
    /// raised it) only reloads once.
    pub async fn apply_session(&self, next: Option<Session>) -> SessionTransition {
        let transition = {
            let mut slot = self.session.write().await;
            let transition = match (slot.session.as_ref(), next.as_ref()) {
                (Some(current), Some(next)) if current == next => SessionTransition::Ignored,
                (Some(current), Some(next)) if current.same_owner(next) => SessionTransition::Refreshed,
                (_, Some(_)) => SessionTransition::Reloaded,
                (None, None) if !self.backend.is_local() => SessionTransition::Ignored,
                (_, None) => SessionTransition::Cleared,
            };

            match transition {
                SessionTransition::Ignored => return transition,
                SessionTransition::Refreshed => {
                    slot.session = next;
                    return transition;
                }
                SessionTransition::Reloaded | SessionTransition::Cleared => {
                    slot.session = next;
                    slot.epoch += 1;
                    self.clear().await;
                }
            }
            transition
        };

        match transition {
            SessionTransition::Reloaded => {
                info!("Session established, reloading");
                if let Err(e) = self.load().await {
                    warn!("Load after sign-in failed: {}", e);
                }
            }
            _ => {
                info!("Session ended, cleared local state");
                if self.backend.is_local() {
                    if let Err(e) = self.load().await {
                        warn!("Reload of local data failed: {}", e);
                    }
                }
            }
        }
        transition
    }

    /// Empties the cache and forgets any pending deletion.
    pub async fn clear(&self) {
        self.cache.clear().await;
        *self.pending_delete.lock().await = None;
    }

    /// Owner for a new operation. Local-only mode never requires sign-in.
    async fn owner(&self) -> Result<Scope, AppError> {
        let slot = self.session.read().await;
        let session = match &slot.session {
            Some(session) => session.clone(),
            None if self.backend.is_local() => Session::local(),
            None => return Err(AppError::NotAuthenticated),
        };
        Ok(Scope {
            session,
            epoch: slot.epoch,
        })
    }

    /// Runs `f` on the cache only while `owner` is still the current
    /// session. The session lock is held across the cache write, so a
    /// concurrent sign-in cannot slip in between the check and the write.
    async fn apply_if_current<R, F>(&self, owner: &Scope, f: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut CacheState) -> R,
    {
        let slot = self.session.read().await;
        if slot.epoch != owner.epoch {
            warn!("Discarding result for {}: session changed", owner.session.user_id);
            return Err(AppError::SessionChanged);
        }
        let mut state = self.cache.write().await;
        Ok(f(&mut state))
    }

    /// Whether a failed write nevertheless reached the store. Only a
    /// persist-first write can be refused locally after the store accepted it.
    fn write_landed(&self, e: &AppError) -> bool {
        matches!(e, AppError::SessionChanged) && self.strategy.discipline == Discipline::PersistFirst
    }

    /// Bulk-fetches courses, tasks and notes. On failure the cache keeps its
    /// previous contents and the load state records the reason.
    pub async fn load(&self) -> Result<(), AppError> {
        let owner = self.owner().await?;
        self.apply_if_current(&owner, |state| state.load_state = LoadState::Loading)
            .await?;

        match self.fetch_everything(&owner).await {
            Ok((courses, tasks, notes)) => {
                let counts = (courses.len(), tasks.len(), notes.len());
                self.apply_if_current(&owner, |state| {
                    state.courses.replace_all(courses);
                    state.tasks.replace_all(tasks);
                    state.notes.replace_all(notes);
                    state.load_state = LoadState::Loaded;
                })
                .await?;
                info!("Loaded {} courses, {} tasks, {} notes", counts.0, counts.1, counts.2);
                Ok(())
            }
            Err(e) => {
                error!("Failed to load data: {}", e);
                let reason = e.to_string();
                // a newer session owns the load state now
                let _ = self
                    .apply_if_current(&owner, |state| state.load_state = LoadState::Failed(reason))
                    .await;
                Err(e)
            }
        }
    }

    async fn fetch_everything(&self, owner: &Scope) -> Result<(Vec<Course>, Vec<Task>, Vec<Note>), AppError> {
        let courses = self.backend.fetch_all::<Course>(&owner.session).await?;
        let tasks = self.backend.fetch_all::<Task>(&owner.session).await?;
        let notes = self.backend.fetch_all::<Note>(&owner.session).await?;
        Ok((courses, tasks, notes))
    }

    /// Turns a failed mutation into exactly one user-visible notification.
    async fn report<T>(&self, action: &str, result: Result<T, AppError>) -> Result<T, AppError> {
        if let Err(e) = &result {
            warn!("Failed to {}: {}", action, e);
            self.notifier.error(format!("Failed to {}: {}", action, e)).await;
        }
        result
    }

    // --- generic mutation disciplines ---

    fn verify<T: Record>(&self, id: &str, rows: &[serde_json::Value]) -> Result<(), AppError> {
        if self.strategy.verify_writes && rows.is_empty() {
            return Err(AppError::SilentRejection {
                collection: T::COLLECTION.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn persist_insert<T: Record>(&self, owner: &Scope, item: &T) -> Result<(), AppError> {
        let rows = self.backend.insert(&owner.session, item).await?;
        self.verify::<T>(item.id(), &rows)
    }

    async fn persist_update<T: Record>(&self, owner: &Scope, item: &T) -> Result<(), AppError> {
        let rows = self.backend.update(&owner.session, item).await?;
        self.verify::<T>(item.id(), &rows)
    }

    async fn insert_entity<T: Record>(&self, owner: &Scope, item: T) -> Result<T, AppError> {
        match self.strategy.discipline {
            Discipline::Optimistic => {
                self.apply_if_current(owner, |state| T::list_mut(state).append(item.clone()))
                    .await?;

                if let Err(e) = self.persist_insert(owner, &item).await {
                    warn!("Rolling back {} {}", T::COLLECTION, item.id());
                    let _ = self
                        .apply_if_current(owner, |state| T::list_mut(state).remove(item.id()))
                        .await;
                    return Err(e);
                }
                Ok(item)
            }
            Discipline::PersistFirst => {
                self.persist_insert(owner, &item).await?;
                self.apply_if_current(owner, |state| T::list_mut(state).append(item.clone()))
                    .await?;
                Ok(item)
            }
        }
    }

    async fn update_entity<T: Record>(&self, owner: &Scope, updated: T) -> Result<T, AppError> {
        match self.strategy.discipline {
            Discipline::Optimistic => {
                let prior = self
                    .apply_if_current(owner, |state| T::list_mut(state).replace(updated.clone()))
                    .await?
                    .ok_or(AppError::NotFound)?;

                if let Err(e) = self.persist_update(owner, &updated).await {
                    warn!("Restoring {} {} after failed update", T::COLLECTION, updated.id());
                    let _ = self
                        .apply_if_current(owner, |state| T::list_mut(state).replace(prior))
                        .await;
                    return Err(e);
                }
                Ok(updated)
            }
            Discipline::PersistFirst => {
                self.persist_update(owner, &updated).await?;
                self.apply_if_current(owner, |state| T::list_mut(state).replace(updated.clone()))
                    .await?;
                Ok(updated)
            }
        }
    }

    async fn delete_entity<T: Record>(&self, owner: &Scope, id: &str) -> Result<(), AppError> {
        match self.strategy.discipline {
            Discipline::Optimistic => {
                let (index, removed) = self
                    .apply_if_current(owner, |state| T::list_mut(state).remove(id))
                    .await?
                    .ok_or(AppError::NotFound)?;

                if let Err(e) = self.backend.delete::<T>(&owner.session, id).await {
                    warn!("Restoring {} {} after failed delete", T::COLLECTION, id);
                    let _ = self
                        .apply_if_current(owner, |state| T::list_mut(state).insert_at(index, removed))
                        .await;
                    return Err(e);
                }
                Ok(())
            }
            Discipline::PersistFirst => {
                if self.cache.get::<T>(id).await.is_none() {
                    return Err(AppError::NotFound);
                }
                self.backend.delete::<T>(&owner.session, id).await?;
                self.apply_if_current(owner, |state| T::list_mut(state).remove(id))
                    .await?;
                Ok(())
            }
        }
    }

    /// Undoes a course created on behalf of a task whose own write failed.
    /// A failure here leaves an orphan course in the store; it is logged
    /// and not retried.
    async fn compensate_course(&self, owner: &Scope, course: &Course) {
        match self.backend.delete::<Course>(&owner.session, &course.id).await {
            Ok(()) => info!("Removed auto-created course {}", course.name),
            Err(e) => {
                let failure = AppError::CompensationFailed(format!(
                    "course {} ({}) is orphaned in the store: {}",
                    course.name, course.id, e
                ));
                error!("{}", failure);
            }
        }
        let _ = self
            .apply_if_current(owner, |state| state.courses.remove(&course.id))
            .await;
    }

    // --- tasks ---

    pub async fn tasks(&self) -> Vec<Task> {
        self.cache.tasks().await
    }

    /// Creates a task, first creating its course when no course of that
    /// name (ignoring case) exists. Either both end up persisted or
    /// neither does.
    pub async fn create_task(&self, req: NewTaskRequest) -> Result<Task, AppError> {
        let result = self.try_create_task(req).await;
        self.report("save task", result).await
    }

    async fn try_create_task(&self, mut req: NewTaskRequest) -> Result<Task, AppError> {
        let owner = self.owner().await?;
        if req.title.trim().is_empty() {
            return Err(AppError::BadRequest("Task title is required".to_string()));
        }
        if req.course.trim().is_empty() {
            return Err(AppError::BadRequest("Course is required".to_string()));
        }
        req.course = req.course.trim().to_string();

        let _guard = self
            .locks
            .acquire(format!("course-name:{}", req.course.to_lowercase()))
            .await;

        let existing = self
            .cache
            .read()
            .await
            .find_course_by_name(&req.course)
            .cloned();

        let created_course = match existing {
            Some(course) => {
                req.course = course.name;
                None
            }
            None => {
                let course = Course::from_request(
                    NewCourseRequest {
                        name: req.course.clone(),
                        color: None,
                        icon: None,
                    },
                    now(),
                );
                match self.insert_entity(&owner, course.clone()).await {
                    Ok(course) => {
                        info!("Created course {} for new task", course.name);
                        Some(course)
                    }
                    Err(e) => {
                        if self.write_landed(&e) {
                            self.compensate_course(&owner, &course).await;
                        }
                        return Err(e);
                    }
                }
            }
        };

        let task = Task::from_request(req, now());
        match self.insert_entity(&owner, task).await {
            Ok(task) => Ok(task),
            Err(e) => {
                // a task that landed keeps its course
                if let Some(course) = created_course {
                    if !self.write_landed(&e) {
                        self.compensate_course(&owner, &course).await;
                    }
                }
                Err(e)
            }
        }
    }

    pub async fn update_task(&self, id: &str, req: UpdateTaskRequest) -> Result<Task, AppError> {
        let result = self.try_update_task(id, req).await;
        self.report("update task", result).await
    }

    async fn try_update_task(&self, id: &str, req: UpdateTaskRequest) -> Result<Task, AppError> {
        let owner = self.owner().await?;
        let _guard = self.locks.acquire(format!("task:{}", id)).await;

        let mut task = self.cache.get::<Task>(id).await.ok_or(AppError::NotFound)?;
        task.apply(req);
        self.update_entity(&owner, task).await
    }

    pub async fn set_task_status(&self, id: &str, status: TaskStatus) -> Result<Task, AppError> {
        let req = UpdateTaskRequest {
            status: Some(status),
            ..Default::default()
        };
        let result = self.try_update_task(id, req).await;
        self.report("update task status", result).await
    }

    pub async fn toggle_subtask(&self, id: &str, subtask_id: &str) -> Result<Task, AppError> {
        let result = self.try_toggle_subtask(id, subtask_id).await;
        self.report("update subtask", result).await
    }

    async fn try_toggle_subtask(&self, id: &str, subtask_id: &str) -> Result<Task, AppError> {
        let owner = self.owner().await?;
        let _guard = self.locks.acquire(format!("task:{}", id)).await;

        let mut task = self.cache.get::<Task>(id).await.ok_or(AppError::NotFound)?;
        if !task.toggle_subtask(subtask_id) {
            return Err(AppError::NotFound);
        }
        self.update_entity(&owner, task).await
    }

    // --- courses ---

    pub async fn courses(&self) -> Vec<Course> {
        self.cache.courses().await
    }

    pub async fn create_course(&self, req: NewCourseRequest) -> Result<Course, AppError> {
        let result = self.try_create_course(req).await;
        self.report("add course", result).await
    }

    async fn try_create_course(&self, mut req: NewCourseRequest) -> Result<Course, AppError> {
        let owner = self.owner().await?;
        req.name = req.name.trim().to_string();
        if req.name.is_empty() {
            return Err(AppError::BadRequest("Course name is required".to_string()));
        }

        let _guard = self
            .locks
            .acquire(format!("course-name:{}", req.name.to_lowercase()))
            .await;
        if self.cache.read().await.find_course_by_name(&req.name).is_some() {
            return Err(AppError::BadRequest(format!("Course {} already exists", req.name)));
        }

        let course = Course::from_request(req, now());
        self.insert_entity(&owner, course).await
    }

    /// Renaming does not touch tasks, which join to courses by name.
    pub async fn update_course(&self, id: &str, req: UpdateCourseRequest) -> Result<Course, AppError> {
        let result = self.try_update_course(id, req).await;
        self.report("update course", result).await
    }

    async fn try_update_course(&self, id: &str, req: UpdateCourseRequest) -> Result<Course, AppError> {
        let owner = self.owner().await?;
        let _guard = self.locks.acquire(format!("course:{}", id)).await;
        // a rename competes with creates for the target name
        let _name_guard = match &req.name {
            Some(name) => Some(
                self.locks
                    .acquire(format!("course-name:{}", name.trim().to_lowercase()))
                    .await,
            ),
            None => None,
        };

        let mut course = self.cache.get::<Course>(id).await.ok_or(AppError::NotFound)?;
        if let Some(name) = &req.name {
            let taken = self
                .cache
                .read()
                .await
                .find_course_by_name(name)
                .is_some_and(|other| other.id != id);
            if taken {
                return Err(AppError::BadRequest(format!("Course {} already exists", name)));
            }
        }
        course.apply(req);
        self.update_entity(&owner, course).await
    }

    /// Course deletion also drops the course's notes; a rollback restores
    /// both at their previous positions.
    async fn delete_course(&self, owner: &Scope, id: &str) -> Result<(), AppError> {
        let detach = |state: &mut CacheState| {
            let course = state.courses.remove(id)?;
            let notes = state.notes.remove_where(|note| note.course_id == id);
            Some((course, notes))
        };

        match self.strategy.discipline {
            Discipline::Optimistic => {
                let (removed_course, removed_notes) = self
                    .apply_if_current(owner, detach)
                    .await?
                    .ok_or(AppError::NotFound)?;

                if let Err(e) = self.backend.delete::<Course>(&owner.session, id).await {
                    warn!("Restoring course {} after failed delete", id);
                    let _ = self
                        .apply_if_current(owner, |state| {
                            let (index, course) = removed_course;
                            state.courses.insert_at(index, course);
                            for (index, note) in removed_notes {
                                state.notes.insert_at(index, note);
                            }
                        })
                        .await;
                    return Err(e);
                }
                Ok(())
            }
            Discipline::PersistFirst => {
                if self.cache.get::<Course>(id).await.is_none() {
                    return Err(AppError::NotFound);
                }
                self.backend.delete::<Course>(&owner.session, id).await?;
                self.apply_if_current(owner, detach).await?;
                Ok(())
            }
        }
    }

    // --- notes ---

    pub async fn notes_for_course(&self, course_id: &str) -> Vec<Note> {
        self.cache
            .read()
            .await
            .notes
            .as_slice()
            .iter()
            .filter(|note| note.course_id == course_id)
            .cloned()
            .collect()
    }

    pub async fn create_note(&self, course_id: &str, req: NewNoteRequest) -> Result<Note, AppError> {
        let result = self.try_create_note(course_id, req).await;
        self.report("save note", result).await
    }

    async fn try_create_note(&self, course_id: &str, req: NewNoteRequest) -> Result<Note, AppError> {
        let owner = self.owner().await?;
        if req.title.trim().is_empty() || req.content.trim().is_empty() {
            return Err(AppError::BadRequest("Note title and content are required".to_string()));
        }
        if self.cache.get::<Course>(course_id).await.is_none() {
            return Err(AppError::NotFound);
        }

        let note = Note::from_request(course_id, req, now());
        self.insert_entity(&owner, note).await
    }

    pub async fn update_note(&self, id: &str, req: UpdateNoteRequest) -> Result<Note, AppError> {
        let result = self.try_update_note(id, req).await;
        self.report("save note", result).await
    }

    async fn try_update_note(&self, id: &str, req: UpdateNoteRequest) -> Result<Note, AppError> {
        let owner = self.owner().await?;
        let _guard = self.locks.acquire(format!("note:{}", id)).await;

        let mut note = self.cache.get::<Note>(id).await.ok_or(AppError::NotFound)?;
        note.apply(req, now());
        self.update_entity(&owner, note).await
    }

    // --- two-phase deletion ---

    /// Records the candidate for deletion. Nothing is removed until
    /// [`SyncService::confirm_delete`].
    pub async fn request_delete(&self, target: DeleteTarget) {
        *self.pending_delete.lock().await = Some(target);
    }

    pub async fn cancel_delete(&self) -> Option<DeleteTarget> {
        self.pending_delete.lock().await.take()
    }

    /// Deletes the recorded candidate. Without one this is a no-op.
    pub async fn confirm_delete(&self) -> Result<Option<DeleteTarget>, AppError> {
        let Some(target) = self.pending_delete.lock().await.take() else {
            return Ok(None);
        };

        let result = self.try_delete(&target).await;
        self.report("delete", result).await.map(|()| Some(target))
    }

    async fn try_delete(&self, target: &DeleteTarget) -> Result<(), AppError> {
        let owner = self.owner().await?;
        match target {
            DeleteTarget::Task(id) => {
                let _guard = self.locks.acquire(format!("task:{}", id)).await;
                self.delete_entity::<Task>(&owner, id).await
            }
            DeleteTarget::Course(id) => {
                let _guard = self.locks.acquire(format!("course:{}", id)).await;
                self.delete_course(&owner, id).await
            }
            DeleteTarget::Note(id) => {
                let _guard = self.locks.acquire(format!("note:{}", id)).await;
                self.delete_entity::<Note>(&owner, id).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discipline_parse() {
        assert_eq!(Discipline::parse("optimistic").unwrap(), Discipline::Optimistic);
        assert_eq!(Discipline::parse(" Persist-First ").unwrap(), Discipline::PersistFirst);
        assert!(Discipline::parse("eventually").is_err());
    }

    #[tokio::test]
    async fn test_entity_locks_serialize_same_key() {
        let locks = Arc::new(EntityLocks::default());
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = locks.acquire("task:1".to_string()).await;

        let handle = {
            let locks = locks.clone();
            let order = order.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("task:1".to_string()).await;
                order.lock().await.push("second");
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        order.lock().await.push("first");
        drop(first);
        handle.await.expect("task panicked");

        assert_eq!(*order.lock().await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_entity_locks_do_not_block_other_keys() {
        let locks = EntityLocks::default();
        let _a = locks.acquire("task:1".to_string()).await;
        let _b = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            locks.acquire("task:2".to_string()),
        )
        .await
        .expect("independent keys must not contend");
    }
}
