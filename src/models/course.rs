use serde::{Deserialize, Serialize};

pub const DEFAULT_COURSE_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCourseRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl Course {
    pub fn from_request(req: NewCourseRequest, created_at: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: req.name,
            color: req.color.unwrap_or_else(|| DEFAULT_COURSE_COLOR.to_string()),
            icon: req.icon,
            created_at,
        }
    }

    pub fn apply(&mut self, req: UpdateCourseRequest) {
        if let Some(name) = req.name {
            self.name = name;
        }
        if let Some(color) = req.color {
            self.color = color;
        }
        if req.icon.is_some() {
            self.icon = req.icon;
        }
    }

    /// Tasks reference courses by name, compared without regard to case.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}
