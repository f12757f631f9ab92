//! Process-wide registry of live sessions, keyed by name.
//!
//! Sessions are created lazily on the first join that names them. Creating
//! one spawns its event loop and its clock; the registry keeps only the
//! sending half of the event channel. A session whose loop has stopped
//! after its idle timeout is hidden from lookups and pruned on the next
//! creation. Lookups and creation are serialized
//! by a single mutex, so two concurrent joins to a new name end up in the
//! same session.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::config::{OddsConfig, SessionConfig};
use crate::game::Game;
use crate::runner::{SessionEvent, run_clock, run_event_loop};

/// Errors that can occur when talking to a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session's event loop is no longer running.
    #[error("session {session} is closed")]
    Closed {
        /// Session name.
        session: String,
    },
}

/// Cloneable handle to one running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    name: String,
    created_at: DateTime<Utc>,
    events: mpsc::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Session name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the session was created.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Queue an event for the session's loop, waiting for capacity.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the loop has stopped.
    pub async fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.events
            .send(event)
            .await
            .map_err(|_closed| SessionError::Closed {
                session: self.name.clone(),
            })
    }

    /// Listing entry for this session.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            name: self.name.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }

    fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

/// Listing entry for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Session name.
    pub name: String,
    /// Creation time, RFC 3339.
    pub created_at: String,
}

/// All live sessions.
#[derive(Debug)]
pub struct SessionRegistry {
    session_config: SessionConfig,
    odds: OddsConfig,
    sessions: Mutex<BTreeMap<String, SessionHandle>>,
}

impl SessionRegistry {
    /// Create an empty registry. Every session it creates uses this tuning.
    pub fn new(session_config: SessionConfig, odds: OddsConfig) -> Self {
        Self {
            session_config,
            odds,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Return the session called `name`, creating and starting it if it
    /// does not exist (or its loop has stopped).
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn find_or_create(&self, name: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock().await;
        if let Some(handle) = sessions.get(name) {
            if !handle.is_closed() {
                return handle.clone();
            }
            debug!(session = name, "replacing closed session");
        }
        sessions.retain(|_, handle| !handle.is_closed());

        let handle = self.spawn_session(name);
        sessions.insert(name.to_owned(), handle.clone());
        handle
    }

    /// Look up a session without creating it.
    pub async fn get(&self, name: &str) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .await
            .get(name)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Every session, ordered by name.
    pub async fn list(&self) -> Vec<SessionSummary> {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|handle| !handle.is_closed())
            .map(SessionHandle::summary)
            .collect()
    }

    fn spawn_session(&self, name: &str) -> SessionHandle {
        let (tx, rx) = mpsc::channel(self.session_config.event_channel_capacity);
        let game = Game::new(name, self.session_config.clone(), self.odds.clone());

        tokio::spawn(run_event_loop(game, rx));
        tokio::spawn(run_clock(self.session_config.tick_interval(), tx.clone()));

        info!(
            session = name,
            tick_interval_ms = self.session_config.tick_interval_ms,
            "session created"
        );
        SessionHandle {
            name: name.to_owned(),
            created_at: Utc::now(),
            events: tx,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use castaway_types::{ServerMessage, SessionPhase};

    use super::*;
    use crate::participant::Participant;
    use crate::runner::Connection;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(SessionConfig::default(), OddsConfig::quiet())
    }

    #[tokio::test]
    async fn same_name_returns_same_session() {
        let registry = registry();
        let first = registry.find_or_create("main").await;
        let second = registry.find_or_create("main").await;
        let _other = registry.find_or_create("other").await;

        assert_eq!(first.created_at(), second.created_at());
        let names: Vec<String> = registry.list().await.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["main".to_owned(), "other".to_owned()]);
    }

    #[tokio::test]
    async fn get_does_not_create() {
        let registry = registry();
        assert!(registry.get("nope").await.is_none());
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn idle_sessions_disappear_and_are_recreated() {
        let config = SessionConfig {
            tick_interval_ms: 1,
            idle_timeout_ms: Some(5),
            ..SessionConfig::default()
        };
        let registry = SessionRegistry::new(config, OddsConfig::quiet());
        let first = registry.find_or_create("ghost").await;

        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while !registry.list().await.is_empty() {
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();
        assert!(registry.get("ghost").await.is_none());

        let second = registry.find_or_create("ghost").await;
        assert_ne!(first.created_at(), second.created_at());
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn joining_through_a_handle_welcomes_participant() {
        let registry = registry();
        let handle = registry.find_or_create("beach-party").await;

        let (participant, mut outbox) = Participant::connect("alice");
        let (connection, admitted) = Connection::new(participant);
        handle.send(SessionEvent::Join(connection)).await.unwrap();
        admitted.await.unwrap();

        assert_eq!(
            outbox.recv().await.unwrap(),
            ServerMessage::Welcome {
                game: "beach-party".to_owned(),
                state: SessionPhase::Waiting,
            }
        );
    }
}
