use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;

/// A failed user action, as shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub message: String,
    pub at: String,
}

/// User-visible failures raised by the sync protocol, oldest first.
#[derive(Debug, Default)]
pub struct Notifier {
    entries: Mutex<Vec<Notification>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.entries.lock().await.push(Notification {
            message: message.into(),
            at: Utc::now().to_rfc3339(),
        });
    }

    pub async fn all(&self) -> Vec<Notification> {
        self.entries.lock().await.clone()
    }

    /// Hands every pending notification to the caller and forgets them.
    pub async fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_empties_the_log() {
        let notifier = Notifier::new();
        notifier.error("Failed to save task").await;
        notifier.error("Failed to delete").await;

        let drained = notifier.drain().await;
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "Failed to save task");
        assert!(notifier.all().await.is_empty());
    }
}
