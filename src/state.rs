use std::sync::Arc;

use crate::db::LocalStore;
use crate::services::{SessionHub, SyncService};

#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SyncService>,
    pub sessions: SessionHub,
    pub local: LocalStore,
}
