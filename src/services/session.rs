use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::models::Session;
use crate::services::sync_service::SyncService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
}

/// The authentication provider's view of the current session. Every change
/// is broadcast to subscribers; a subscriber may also see a repeat of the
/// session it already knows about.
#[derive(Clone)]
pub struct SessionHub {
    current: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHub {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            current: Arc::new(RwLock::new(None)),
            events,
        }
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn sign_in(&self, session: Session) {
        *self.current.write().await = Some(session.clone());
        self.publish(SessionEvent::SignedIn(session));
    }

    pub async fn sign_out(&self) {
        *self.current.write().await = None;
        self.publish(SessionEvent::SignedOut);
    }

    fn publish(&self, event: SessionEvent) {
        // no receivers is fine before the listener starts
        if self.events.send(event).is_err() {
            debug!("Session event dropped, nobody is listening");
        }
    }
}

/// Feeds session notifications into the sync service until the hub is gone.
pub struct SessionListener {
    service: Arc<SyncService>,
    events: broadcast::Receiver<SessionEvent>,
}

impl SessionListener {
    pub fn new(service: Arc<SyncService>, hub: &SessionHub) -> Self {
        Self {
            service,
            events: hub.subscribe(),
        }
    }

    pub async fn start(mut self) {
        info!("Starting session listener");

        loop {
            match self.events.recv().await {
                Ok(event) => {
                    let transition = self.service.handle_event(event).await;
                    debug!("Session event handled: {:?}", transition);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // the newest events are still queued, so the final session wins
                    warn!("Session listener skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Session events closed, stopping listener");
                    break;
                }
            }
        }
    }
}
