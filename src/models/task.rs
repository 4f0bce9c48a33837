use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TaskType {
    #[default]
    Assignment,
    Quiz,
    Project,
    Exam,
    Reading,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: String,
    pub title: String,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub course: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub due_date: String,
    pub priority: Priority,
    #[serde(default)]
    pub subtasks: Vec<SubTask>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskRequest {
    pub title: String,
    pub course: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub task_type: Option<TaskType>,
    pub due_date: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub subtasks: Option<Vec<SubTask>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub course: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<TaskType>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
    pub subtasks: Option<Vec<SubTask>>,
}

impl Task {
    /// Builds a fresh task with a client-generated id. The course name is
    /// taken as given; callers resolve it against known courses first.
    pub fn from_request(req: NewTaskRequest, created_at: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: req.title,
            course: req.course,
            description: req.description.unwrap_or_default(),
            task_type: req.task_type.unwrap_or_default(),
            status: req.status.unwrap_or_default(),
            due_date: req.due_date,
            priority: req.priority.unwrap_or_default(),
            subtasks: req.subtasks.unwrap_or_default(),
            created_at,
        }
    }

    pub fn apply(&mut self, req: UpdateTaskRequest) {
        if let Some(title) = req.title {
            self.title = title;
        }
        if let Some(course) = req.course {
            self.course = course;
        }
        if let Some(description) = req.description {
            self.description = description;
        }
        if let Some(task_type) = req.task_type {
            self.task_type = task_type;
        }
        if let Some(status) = req.status {
            self.status = status;
        }
        if let Some(due_date) = req.due_date {
            self.due_date = due_date;
        }
        if let Some(priority) = req.priority {
            self.priority = priority;
        }
        if let Some(subtasks) = req.subtasks {
            self.subtasks = subtasks;
        }
    }

    /// Flips the completion flag of one subtask. Returns false when the
    /// subtask does not belong to this task.
    pub fn toggle_subtask(&mut self, subtask_id: &str) -> bool {
        match self.subtasks.iter_mut().find(|s| s.id == subtask_id) {
            Some(subtask) => {
                subtask.is_completed = !subtask.is_completed;
                true
            }
            None => false,
        }
    }
}
