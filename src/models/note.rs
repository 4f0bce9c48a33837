use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNoteRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl Note {
    pub fn from_request(course_id: &str, req: NewNoteRequest, now: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            title: req.title,
            content: req.content,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn apply(&mut self, req: UpdateNoteRequest, now: String) {
        if let Some(title) = req.title {
            self.title = title;
        }
        if let Some(content) = req.content {
            self.content = content;
        }
        self.updated_at = now;
    }
}
