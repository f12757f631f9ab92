//! The serialized event loop and the session clock task.
//!
//! All session mutation happens in [`run_event_loop`], which pulls one
//! [`SessionEvent`] at a time off a channel and processes it completely,
//! including any cascade of phase transitions, before pulling the next.
//! Producers never touch the session:
//!
//! - **Connections** push a `Join` when accepted, then decoded messages,
//!   then a `Leave` when the socket closes or fails
//! - **The clock** ([`run_clock`]) pushes a `Tick` carrying the accumulated
//!   session time after every interval
//!
//! A connection's reader must not start until its `Join` has been
//! processed. The loop signals this through the connection's admission
//! channel, so a participant's own messages can never overtake its join.

use std::time::Duration;

use castaway_types::{ClientMessage, ParticipantId, SessionPhase};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::game::{Game, Inbound};
use crate::participant::Participant;

/// A newly accepted connection waiting to be registered.
#[derive(Debug)]
pub struct Connection {
    /// The participant minted for this connection.
    pub participant: Participant,
    /// Fired once the participant is registered. Dropped unfired if the
    /// join was rejected.
    pub admitted: oneshot::Sender<()>,
}

impl Connection {
    /// Pair a participant with a fresh admission channel. The receiver
    /// resolves once the event loop has processed the join.
    pub fn new(participant: Participant) -> (Self, oneshot::Receiver<()>) {
        let (admitted, rx) = oneshot::channel();
        (
            Self {
                participant,
                admitted,
            },
            rx,
        )
    }
}

/// One entry in a session's event stream.
#[derive(Debug)]
pub enum SessionEvent {
    /// A connection was accepted.
    Join(Connection),
    /// A decoded client message.
    Message {
        /// Sender.
        from: ParticipantId,
        /// The message.
        message: ClientMessage,
    },
    /// A connection closed or failed.
    Leave(ParticipantId),
    /// The clock advanced.
    Tick {
        /// Session time since the clock started.
        elapsed: Duration,
    },
}

/// Result of a finished event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSummary {
    /// Number of events processed.
    pub events_processed: u64,
    /// Phase the session was in when the loop stopped.
    pub final_phase: SessionPhase,
}

/// Apply one event to the session.
pub fn dispatch(game: &mut Game, event: SessionEvent) {
    match event {
        SessionEvent::Join(connection) => {
            let id = connection.participant.id();
            if !game.connect(connection.participant) {
                warn!(session = game.name(), participant = %id, "duplicate join rejected");
                return;
            }
            if connection.admitted.send(()).is_err() {
                debug!(participant = %id, "connection closed before admission");
                game.receive_message(id, Inbound::Leave);
            }
        }
        SessionEvent::Message { from, message } => {
            game.receive_message(from, Inbound::from(message));
        }
        SessionEvent::Leave(id) => game.receive_message(id, Inbound::Leave),
        SessionEvent::Tick { elapsed } => game.tick(elapsed),
    }
}

/// Consume events until every sender is gone or the session has been
/// empty for its idle timeout.
pub async fn run_event_loop(
    mut game: Game,
    mut events: mpsc::Receiver<SessionEvent>,
) -> LoopSummary {
    info!(session = game.name(), "event loop started");
    let mut events_processed: u64 = 0;

    while let Some(event) = events.recv().await {
        dispatch(&mut game, event);
        events_processed = events_processed.saturating_add(1);
        if game.is_idle() {
            info!(session = game.name(), "session idle, closing");
            break;
        }
    }

    info!(
        session = game.name(),
        events_processed,
        phase = %game.phase(),
        "event loop stopped"
    );
    LoopSummary {
        events_processed,
        final_phase: game.phase(),
    }
}

/// Push a tick every `interval` until the event loop goes away.
pub async fn run_clock(interval: Duration, events: mpsc::Sender<SessionEvent>) {
    let mut elapsed = Duration::ZERO;
    loop {
        tokio::time::sleep(interval).await;
        elapsed = elapsed.saturating_add(interval);
        if events.send(SessionEvent::Tick { elapsed }).await.is_err() {
            debug!("event loop closed, clock stopping");
            break;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use castaway_types::ServerMessage;

    use super::*;
    use crate::config::{OddsConfig, SessionConfig};

    fn game() -> Game {
        Game::new("loop", SessionConfig::default(), OddsConfig::quiet())
    }

    #[tokio::test]
    async fn join_is_admitted_and_welcomed() {
        let mut game = game();
        let (participant, mut outbox) = Participant::connect("alice");
        let (connection, admitted) = Connection::new(participant);

        dispatch(&mut game, SessionEvent::Join(connection));

        admitted.await.unwrap();
        assert!(matches!(
            outbox.recv().await.unwrap(),
            ServerMessage::Welcome { .. }
        ));
    }

    #[tokio::test]
    async fn duplicate_join_is_not_admitted() {
        let mut game = game();
        let (participant, _outbox) = Participant::connect("alice");
        let (first, _first_admitted) = Connection::new(participant.clone());
        let (second, second_admitted) = Connection::new(participant);

        dispatch(&mut game, SessionEvent::Join(first));
        dispatch(&mut game, SessionEvent::Join(second));

        assert!(second_admitted.await.is_err());
        assert_eq!(game.context().roster().len(), 1);
    }

    #[test]
    fn abandoned_connection_is_removed_again() {
        let mut game = game();
        let (participant, _outbox) = Participant::connect("alice");
        let (connection, admitted) = Connection::new(participant);
        drop(admitted);

        dispatch(&mut game, SessionEvent::Join(connection));
        assert!(game.context().roster().is_empty());
    }

    #[tokio::test]
    async fn loop_processes_events_in_order_and_stops_when_senders_drop() {
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(run_event_loop(game(), rx));

        let (participant, _outbox) = Participant::connect("alice");
        let id = participant.id();
        let (connection, admitted) = Connection::new(participant);
        tx.send(SessionEvent::Join(connection)).await.unwrap();
        admitted.await.unwrap();
        tx.send(SessionEvent::Message {
            from: id,
            message: ClientMessage::Ready { ready: true },
        })
        .await
        .unwrap();
        drop(tx);

        let summary = handle.await.unwrap();
        assert_eq!(summary.events_processed, 2);
        assert_eq!(summary.final_phase, SessionPhase::SiteSelection);
    }

    #[tokio::test]
    async fn loop_stops_once_the_session_is_idle() {
        let (tx, rx) = mpsc::channel(16);
        let config = SessionConfig {
            idle_timeout_ms: Some(600),
            ..SessionConfig::default()
        };
        let handle = tokio::spawn(run_event_loop(
            Game::new("idle", config, OddsConfig::quiet()),
            rx,
        ));

        for millis in [300, 600, 900] {
            tx.send(SessionEvent::Tick {
                elapsed: Duration::from_millis(millis),
            })
            .await
            .unwrap();
        }

        let summary = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.events_processed, 3);
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn clock_accumulates_elapsed_time_and_stops_with_loop() {
        let (tx, mut rx) = mpsc::channel(4);
        let interval = Duration::from_millis(1);
        let clock = tokio::spawn(run_clock(interval, tx));

        let mut seen = Vec::new();
        for _ in 0..3 {
            if let Some(SessionEvent::Tick { elapsed }) = rx.recv().await {
                seen.push(elapsed);
            }
        }
        assert_eq!(
            seen,
            vec![
                Duration::from_millis(1),
                Duration::from_millis(2),
                Duration::from_millis(3)
            ]
        );

        drop(rx);
        tokio::time::timeout(Duration::from_secs(1), clock)
            .await
            .unwrap()
            .unwrap();
    }
}
