use serde::{Deserialize, Serialize};

/// Owner identifier used for local-only mode, where nothing is scoped by user.
pub const LOCAL_OWNER: &str = "local";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub access_token: String,
}

impl Session {
    pub fn local() -> Self {
        Self {
            user_id: LOCAL_OWNER.to_string(),
            email: None,
            access_token: String::new(),
        }
    }

    pub fn same_owner(&self, other: &Session) -> bool {
        self.user_id == other.user_id
    }
}
