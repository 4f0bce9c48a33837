pub mod backend;
pub mod notifier;
pub mod session;
pub mod sync_service;

pub use backend::Backend;
pub use notifier::{Notification, Notifier};
pub use session::{SessionEvent, SessionHub, SessionListener};
pub use sync_service::{DeleteTarget, Discipline, SessionTransition, SyncService, SyncStrategy};
