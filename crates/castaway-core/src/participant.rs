//! Participants, their outboxes, and the session roster.
//!
//! A [`Participant`] couples a stable [`ParticipantId`] with a mutable
//! display name and an [`Outbox`] used to deliver messages. The transport
//! layer drains the receiving half of the outbox and writes each message
//! to the connection; once the participant is dropped from the roster the
//! sender is dropped too, which ends that writer.

use std::collections::BTreeMap;

use castaway_types::{ParticipantId, ServerMessage};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Errors that can occur when delivering to a participant.
#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    /// The connection's writer is gone.
    #[error("outbox closed for participant {participant}")]
    Closed {
        /// The unreachable participant.
        participant: ParticipantId,
    },
}

/// Sending half of a participant's outbound message queue.
#[derive(Debug, Clone)]
pub struct Outbox {
    participant: ParticipantId,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl Outbox {
    /// Create an outbox for `participant` and the receiver the transport
    /// should drain.
    pub fn channel(participant: ParticipantId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { participant, tx }, rx)
    }

    /// Queue one message. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`OutboxError::Closed`] if the receiving side was dropped.
    pub fn send(&self, message: ServerMessage) -> Result<(), OutboxError> {
        self.tx.send(message).map_err(|_closed| OutboxError::Closed {
            participant: self.participant,
        })
    }
}

/// One connected participant.
#[derive(Debug, Clone)]
pub struct Participant {
    id: ParticipantId,
    name: String,
    outbox: Outbox,
}

impl Participant {
    /// Mint a participant with a fresh id, returning the outbox receiver.
    pub fn connect(name: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = ParticipantId::new();
        let (outbox, rx) = Outbox::channel(id);
        (
            Self {
                id,
                name: name.into(),
                outbox,
            },
            rx,
        )
    }

    /// Stable identity.
    pub const fn id(&self) -> ParticipantId {
        self.id
    }

    /// Current display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Deliver a message, logging instead of failing if the connection is
    /// gone. Delivery is fire-and-forget and never retried.
    pub fn deliver(&self, message: ServerMessage) {
        if let Err(e) = self.outbox.send(message) {
            warn!(participant = %self.id, name = self.name, error = %e, "message delivery failed");
        }
    }
}

/// Every participant currently connected to one session.
///
/// Ordered by id, so iteration follows join order.
#[derive(Debug, Default)]
pub struct Roster {
    members: BTreeMap<ParticipantId, Participant>,
}

impl Roster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant. Returns `false` if the id was already
    /// present, in which case the roster is unchanged.
    pub fn insert(&mut self, participant: Participant) -> bool {
        if self.members.contains_key(&participant.id) {
            return false;
        }
        debug!(participant = %participant.id, name = participant.name, "roster insert");
        self.members.insert(participant.id, participant);
        true
    }

    /// Remove a participant, dropping its outbox.
    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        self.members.remove(&id)
    }

    /// Look up a participant mutably.
    pub fn get_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.members.get_mut(&id)
    }

    /// Whether the id is registered.
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.members.contains_key(&id)
    }

    /// Number of registered participants.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Display name of a participant, or an empty string if unknown.
    pub fn name_of(&self, id: ParticipantId) -> &str {
        self.members.get(&id).map_or("", Participant::name)
    }

    /// Deliver a message to one participant; unknown ids are ignored.
    pub fn send_to(&self, id: ParticipantId, message: ServerMessage) {
        match self.members.get(&id) {
            Some(participant) => participant.deliver(message),
            None => debug!(participant = %id, "dropping message for unknown participant"),
        }
    }

    /// Deliver a message to every participant. A failed send is logged and
    /// does not stop delivery to the rest.
    pub fn broadcast(&self, message: &ServerMessage) {
        debug!(recipients = self.members.len(), ?message, "broadcast");
        for participant in self.members.values() {
            participant.deliver(message.clone());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use castaway_types::SessionPhase;

    use super::*;

    #[test]
    fn duplicate_insert_is_rejected() {
        let (alice, _rx) = Participant::connect("alice");
        let mut roster = Roster::new();
        assert!(roster.insert(alice.clone()));
        assert!(!roster.insert(alice));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn broadcast_survives_closed_outbox() {
        let (alice, alice_rx) = Participant::connect("alice");
        let (bob, mut bob_rx) = Participant::connect("bob");
        let mut roster = Roster::new();
        roster.insert(alice);
        roster.insert(bob);
        drop(alice_rx);

        roster.broadcast(&ServerMessage::GameStateChanged {
            new_state: SessionPhase::SiteSelection,
        });

        assert_eq!(
            bob_rx.try_recv().unwrap(),
            ServerMessage::GameStateChanged {
                new_state: SessionPhase::SiteSelection
            }
        );
    }

    #[test]
    fn removing_participant_closes_its_outbox() {
        let (alice, mut rx) = Participant::connect("alice");
        let id = alice.id();
        let mut roster = Roster::new();
        roster.insert(alice);
        assert!(roster.remove(id).is_some());
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn rename_is_visible_through_roster() {
        let (alice, _rx) = Participant::connect("alice");
        let id = alice.id();
        let mut roster = Roster::new();
        roster.insert(alice);
        roster.get_mut(id).unwrap().set_name("Alice");
        assert_eq!(roster.name_of(id), "Alice");
    }
}
