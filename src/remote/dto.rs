use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::cache::Cached;
use crate::error::AppError;
use crate::models::{Course, Note, Priority, SubTask, Task, TaskStatus, TaskType};
use crate::remote::Collection;

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub course: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: String,
    #[serde(default)]
    pub subtasks: Option<Vec<SubTask>>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct TaskPatch<'a> {
    pub title: &'a str,
    pub course: &'a str,
    pub description: &'a str,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: &'a str,
    pub subtasks: &'a [SubTask],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CourseRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct CoursePatch<'a> {
    pub name: &'a str,
    pub color: &'a str,
    pub icon: Option<&'a str>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoteRow {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct NotePatch<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub updated_at: &'a str,
}

/// An entity that can round-trip through a remote collection.
pub trait Record: Cached + Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn to_row(&self, owner_id: &str) -> Result<Value, AppError>;
    fn to_patch(&self) -> Result<Value, AppError>;
    fn from_row(row: Value) -> Result<Self, AppError>;
}

impl Record for Task {
    const COLLECTION: Collection = Collection::Tasks;

    fn to_row(&self, owner_id: &str) -> Result<Value, AppError> {
        let row = TaskRow {
            id: self.id.clone(),
            user_id: owner_id.to_string(),
            title: self.title.clone(),
            course: self.course.clone(),
            description: Some(self.description.clone()),
            task_type: self.task_type,
            status: self.status,
            priority: self.priority,
            due_date: self.due_date.clone(),
            subtasks: Some(self.subtasks.clone()),
            created_at: self.created_at.clone(),
        };
        Ok(serde_json::to_value(row)?)
    }

    fn to_patch(&self) -> Result<Value, AppError> {
        let patch = TaskPatch {
            title: &self.title,
            course: &self.course,
            description: &self.description,
            task_type: self.task_type,
            status: self.status,
            priority: self.priority,
            due_date: &self.due_date,
            subtasks: &self.subtasks,
        };
        Ok(serde_json::to_value(patch)?)
    }

    fn from_row(row: Value) -> Result<Self, AppError> {
        let row: TaskRow = serde_json::from_value(row)?;
        Ok(Task {
            id: row.id,
            title: row.title,
            course: row.course,
            description: row.description.unwrap_or_default(),
            task_type: row.task_type,
            status: row.status,
            due_date: row.due_date,
            priority: row.priority,
            subtasks: row.subtasks.unwrap_or_default(),
            created_at: row.created_at,
        })
    }
}

impl Record for Course {
    const COLLECTION: Collection = Collection::Courses;

    fn to_row(&self, owner_id: &str) -> Result<Value, AppError> {
        let row = CourseRow {
            id: self.id.clone(),
            user_id: owner_id.to_string(),
            name: self.name.clone(),
            color: self.color.clone(),
            icon: self.icon.clone(),
            created_at: self.created_at.clone(),
        };
        Ok(serde_json::to_value(row)?)
    }

    fn to_patch(&self) -> Result<Value, AppError> {
        let patch = CoursePatch {
            name: &self.name,
            color: &self.color,
            icon: self.icon.as_deref(),
        };
        Ok(serde_json::to_value(patch)?)
    }

    fn from_row(row: Value) -> Result<Self, AppError> {
        let row: CourseRow = serde_json::from_value(row)?;
        Ok(Course {
            id: row.id,
            name: row.name,
            color: row.color,
            icon: row.icon,
            created_at: row.created_at,
        })
    }
}

impl Record for Note {
    const COLLECTION: Collection = Collection::Notes;

    fn to_row(&self, owner_id: &str) -> Result<Value, AppError> {
        let row = NoteRow {
            id: self.id.clone(),
            user_id: owner_id.to_string(),
            course_id: self.course_id.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        };
        Ok(serde_json::to_value(row)?)
    }

    fn to_patch(&self) -> Result<Value, AppError> {
        let patch = NotePatch {
            title: &self.title,
            content: &self.content,
            updated_at: &self.updated_at,
        };
        Ok(serde_json::to_value(patch)?)
    }

    fn from_row(row: Value) -> Result<Self, AppError> {
        let row: NoteRow = serde_json::from_value(row)?;
        Ok(Note {
            id: row.id,
            course_id: row.course_id,
            title: row.title,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
