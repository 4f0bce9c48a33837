pub mod course;
pub mod note;
pub mod session;
pub mod task;

pub use course::{Course, DEFAULT_COURSE_COLOR, NewCourseRequest, UpdateCourseRequest};
pub use note::{NewNoteRequest, Note, UpdateNoteRequest};
pub use session::Session;
pub use task::{NewTaskRequest, Priority, SubTask, Task, TaskStatus, TaskType, UpdateTaskRequest};

/// Anything held in the local cache, addressed by its client-generated id.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
}

impl Entity for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Course {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Note {
    fn id(&self) -> &str {
        &self.id
    }
}
