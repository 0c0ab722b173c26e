use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::session::SessionController;

/// How long a session may go untouched before the sweeper ends it.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

struct Entry {
    session: Arc<SessionController>,
    last_seen: Instant,
}

/// Live sessions keyed by id. Sessions are only visible to their owner.
/// Sessions nobody has touched for `idle_ttl` are ended and dropped by `evict_idle`.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    idle_ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }
}

impl SessionRegistry {
    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub async fn insert(&self, session: Arc<SessionController>) {
        let entry = Entry {
            session: session.clone(),
            last_seen: Instant::now(),
        };
        self.sessions.write().await.insert(session.id(), entry);
    }

    /// Looks up a session for its owner and marks it as recently used.
    pub async fn get(&self, id: Uuid, user_id: &str) -> Result<Arc<SessionController>, AppError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
        if entry.session.owner_id() != user_id {
            return Err(AppError::Forbidden);
        }
        entry.last_seen = Instant::now();
        Ok(entry.session.clone())
    }

    /// Removes a session owned by `user_id` and returns it for teardown.
    pub async fn remove(&self, id: Uuid, user_id: &str) -> Result<Arc<SessionController>, AppError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&id) {
            None => Err(AppError::NotFound(format!("session {id}"))),
            Some(e) if e.session.owner_id() != user_id => Err(AppError::Forbidden),
            Some(_) => sessions
                .remove(&id)
                .map(|e| e.session)
                .ok_or_else(|| AppError::NotFound(format!("session {id}"))),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Ends and drops every session idle for longer than the TTL. Returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<_> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, e)| now.duration_since(e.last_seen) >= self.idle_ttl)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id))
                .map(|e| e.session)
                .collect()
        };
        let count = expired.len();
        for session in expired {
            debug!("Ending idle session {}", session.id());
            session.end().await;
        }
        count
    }

    /// Runs `evict_idle` every `every` until the returned handle is aborted.
    pub fn spawn_idle_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        info!(
            idle_ttl_secs = self.idle_ttl.as_secs(),
            interval_secs = every.as_secs(),
            "Idle session sweeper started"
        );
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let evicted = self.evict_idle().await;
                if evicted > 0 {
                    info!(evicted, "Ended idle sessions");
                }
            }
        })
    }

    /// Ends and drops every live session. Used on shutdown.
    pub async fn end_all(&self) {
        let drained: Vec<_> = self.sessions.write().await.drain().map(|(_, e)| e.session).collect();
        let count = drained.len();
        for session in drained {
            session.end().await;
        }
        info!("Ended {count} live sessions");
    }
}
