//! The session controller.
//!
//! [`Game`] owns the shared [`SessionContext`] and the active [`Phase`].
//! It handles the session-wide parts of every message (registration,
//! renaming, the trade handshake), forwards the message to the phase, and
//! performs whatever transition the phase asks for.

use std::time::Duration;

use castaway_types::{
    ClientMessage, EventResponse, ParticipantId, ServerMessage, SessionPhase, Site,
};
use tracing::{debug, info};

use crate::config::{OddsConfig, SessionConfig};
use crate::context::SessionContext;
use crate::participant::Participant;
use crate::phase::{Phase, Transition};
use crate::trade::PendingTrade;

/// A message as seen by the controller and the phases.
///
/// This is the client vocabulary plus the leave notice synthesized by the
/// transport when a connection goes away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The participant joined (or asked to be welcomed again).
    Join,
    /// The participant's connection closed.
    Leave,
    /// Rename.
    SetName {
        /// New display name.
        name: String,
    },
    /// Ready flag in the waiting room.
    Ready {
        /// Whether the participant is ready.
        ready: bool,
    },
    /// Site choice.
    SiteSelected {
        /// Chosen site.
        site: Site,
    },
    /// Answer to a site event.
    EventResponse(EventResponse),
    /// Trade proposal.
    Trade {
        /// Offered materials, opaque to the server.
        materials: String,
    },
}

impl From<ClientMessage> for Inbound {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::JoinGame => Self::Join,
            ClientMessage::SetName { name } => Self::SetName { name },
            ClientMessage::Ready { ready } => Self::Ready { ready },
            ClientMessage::SiteSelected { site } => Self::SiteSelected { site },
            ClientMessage::EventResponse(response) => Self::EventResponse(response),
            ClientMessage::Trade { materials } => Self::Trade { materials },
        }
    }
}

/// One multiplayer session.
#[derive(Debug)]
pub struct Game {
    ctx: SessionContext,
    phase: Phase,
    /// Session time at which the roster was last seen empty.
    empty_since: Option<Duration>,
}

impl Game {
    /// Create a session in the waiting room.
    pub fn new(name: impl Into<String>, config: SessionConfig, odds: OddsConfig) -> Self {
        let mut ctx = SessionContext::new(name, config, odds);
        let mut phase = Phase::enter(SessionPhase::Waiting, &mut ctx);
        let transition = phase.begin(&mut ctx);
        let mut game = Self {
            ctx,
            phase,
            empty_since: None,
        };
        game.follow(transition);
        game
    }

    /// Session name.
    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    /// The active phase.
    pub const fn phase(&self) -> SessionPhase {
        self.phase.kind()
    }

    /// The active phase's state.
    pub const fn phase_state(&self) -> &Phase {
        &self.phase
    }

    /// Shared session state.
    pub const fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// The trade proposal awaiting a counterpart.
    pub const fn pending_trade(&self) -> Option<&PendingTrade> {
        self.ctx.trades.pending()
    }

    /// Register a new participant and handle its join.
    ///
    /// Returns `false` without side effects if the id is already
    /// registered.
    pub fn connect(&mut self, participant: Participant) -> bool {
        let id = participant.id();
        let name = participant.name().to_owned();
        if !self.ctx.register(participant) {
            return false;
        }
        info!(session = self.ctx.name(), participant = %id, name, "participant joined");
        self.receive_message(id, Inbound::Join);
        true
    }

    /// Handle one message from a registered participant.
    ///
    /// Messages from unknown participants are dropped, except `Leave`,
    /// which is always safe to repeat.
    pub fn receive_message(&mut self, from: ParticipantId, message: Inbound) {
        if !self.ctx.roster.contains(from) && message != Inbound::Leave {
            debug!(participant = %from, ?message, "message from unregistered participant");
            return;
        }

        match &message {
            Inbound::Join => {
                self.ctx.sites.insert(from, None);
                self.ctx.send_to(
                    from,
                    ServerMessage::Welcome {
                        game: self.ctx.name().to_owned(),
                        state: self.phase.kind(),
                    },
                );
            }
            Inbound::Leave => {
                if !self.ctx.roster.contains(from) {
                    return;
                }
                info!(session = self.ctx.name(), participant = %from, "participant left");
                self.ctx.deregister(from);
            }
            Inbound::SetName { name } => {
                if let Some(participant) = self.ctx.roster.get_mut(from) {
                    participant.set_name(name.clone());
                }
            }
            Inbound::Trade { materials } => self.propose_trade(from, materials.clone()),
            _ => {}
        }

        let transition = self.phase.receive(from, &message, &mut self.ctx);
        self.follow(transition);
    }

    /// Advance the session clock, firing the timer if it has expired.
    pub fn tick(&mut self, elapsed: Duration) {
        if self.ctx.roster.is_empty() {
            self.empty_since.get_or_insert(elapsed);
        } else {
            self.empty_since = None;
        }

        if self.ctx.clock.advance_to(elapsed) {
            debug!(session = self.ctx.name(), ?elapsed, "timer fired");
            let transition = self.phase.on_timer(&mut self.ctx);
            self.follow(transition);
        }
    }

    /// Whether the session has had nobody in it for the configured idle
    /// timeout.
    pub fn is_idle(&self) -> bool {
        let (Some(timeout), Some(since)) = (self.ctx.config.idle_timeout(), self.empty_since) else {
            return false;
        };
        self.ctx.roster.is_empty() && self.ctx.clock.elapsed().saturating_sub(since) >= timeout
    }

    fn propose_trade(&mut self, from: ParticipantId, materials: String) {
        let now = self.ctx.clock.elapsed();
        let Some(done) = self.ctx.trades.propose(from, materials, now) else {
            debug!(participant = %from, "trade proposal staged");
            return;
        };
        info!(
            session = self.ctx.name(),
            first = %done.first,
            second = %done.second,
            "trade completed"
        );
        self.ctx.send_to(
            done.first,
            ServerMessage::TradeCompleted {
                materials: done.second_materials,
            },
        );
        self.ctx.send_to(
            done.second,
            ServerMessage::TradeCompleted {
                materials: done.first_materials,
            },
        );
    }

    /// Perform transitions until a phase settles. A phase may request
    /// another transition straight from `begin`.
    fn follow(&mut self, mut transition: Transition) {
        while let Some(next) = transition {
            transition = self.change_state(next);
        }
    }

    fn change_state(&mut self, next: SessionPhase) -> Transition {
        self.phase.end(&mut self.ctx);
        info!(
            session = self.ctx.name(),
            from = %self.phase.kind(),
            to = %next,
            "state changed"
        );
        self.ctx.clock.clear_timeout();
        self.ctx
            .broadcast(&ServerMessage::GameStateChanged { new_state: next });
        self.phase = Phase::enter(next, &mut self.ctx);
        self.phase.begin(&mut self.ctx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;

    type Inbox = UnboundedReceiver<ServerMessage>;

    fn game() -> Game {
        Game::new("island", SessionConfig::default(), OddsConfig::quiet())
    }

    fn join(game: &mut Game, name: &str) -> (ParticipantId, Inbox) {
        let (participant, rx) = Participant::connect(name);
        let id = participant.id();
        assert!(game.connect(participant));
        (id, rx)
    }

    fn drain(rx: &mut Inbox) -> Vec<ServerMessage> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn trade(materials: &str) -> Inbound {
        Inbound::Trade {
            materials: materials.to_owned(),
        }
    }

    #[test]
    fn join_sends_welcome_with_current_phase() {
        let mut game = game();
        let (_id, mut rx) = join(&mut game, "alice");
        assert_eq!(
            drain(&mut rx).first(),
            Some(&ServerMessage::Welcome {
                game: "island".to_owned(),
                state: SessionPhase::Waiting,
            })
        );
    }

    #[test]
    fn duplicate_connect_is_rejected() {
        let mut game = game();
        let (participant, _rx) = Participant::connect("alice");
        assert!(game.connect(participant.clone()));
        assert!(!game.connect(participant));
        assert_eq!(game.context().roster().len(), 1);
    }

    #[test]
    fn ready_moves_to_site_selection_and_broadcasts() {
        let mut game = game();
        let (id, mut rx) = join(&mut game, "alice");
        drain(&mut rx);

        game.receive_message(id, Inbound::Ready { ready: true });

        assert_eq!(game.phase(), SessionPhase::SiteSelection);
        assert!(drain(&mut rx).contains(&ServerMessage::GameStateChanged {
            new_state: SessionPhase::SiteSelection
        }));
    }

    #[test]
    fn set_name_renames_participant() {
        let mut game = game();
        let (id, _rx) = join(&mut game, "alice");
        game.receive_message(
            id,
            Inbound::SetName {
                name: "Alice".to_owned(),
            },
        );
        assert_eq!(game.context().roster().name_of(id), "Alice");
    }

    #[test]
    fn trade_within_window_swaps_materials() {
        let mut game = game();
        let (a, mut ra) = join(&mut game, "a");
        let (b, mut rb) = join(&mut game, "b");
        drain(&mut ra);
        drain(&mut rb);

        game.receive_message(a, trade("X"));
        game.receive_message(b, trade("Y"));

        assert_eq!(
            drain(&mut ra),
            vec![ServerMessage::TradeCompleted {
                materials: "Y".to_owned()
            }]
        );
        assert_eq!(
            drain(&mut rb),
            vec![ServerMessage::TradeCompleted {
                materials: "X".to_owned()
            }]
        );
        assert!(game.pending_trade().is_none());
    }

    #[test]
    fn trade_after_window_becomes_pending() {
        let mut game = game();
        let (a, mut ra) = join(&mut game, "a");
        let (b, _rb) = join(&mut game, "b");
        drain(&mut ra);

        game.receive_message(a, trade("X"));
        game.tick(Duration::from_millis(300));
        game.receive_message(b, trade("Y"));

        assert!(drain(&mut ra).is_empty());
        let pending = game.pending_trade().unwrap();
        assert_eq!(pending.proposer, b);
        assert_eq!(pending.materials, "Y");
    }

    #[test]
    fn leave_discards_own_pending_trade() {
        let mut game = game();
        let (a, _ra) = join(&mut game, "a");
        game.receive_message(a, trade("X"));
        game.receive_message(a, Inbound::Leave);
        assert!(game.pending_trade().is_none());
        assert!(game.context().roster().is_empty());
    }

    #[test]
    fn empty_session_goes_idle_after_timeout() {
        let config = SessionConfig {
            idle_timeout_ms: Some(600),
            ..SessionConfig::default()
        };
        let mut game = Game::new("idle", config, OddsConfig::quiet());

        game.tick(Duration::from_millis(300));
        game.tick(Duration::from_millis(600));
        assert!(!game.is_idle());
        game.tick(Duration::from_millis(900));
        assert!(game.is_idle());

        let (_id, _rx) = join(&mut game, "alice");
        assert!(!game.is_idle());
        game.tick(Duration::from_millis(1800));
        assert!(!game.is_idle());
    }

    #[test]
    fn idle_timeout_can_be_disabled() {
        let config = SessionConfig {
            idle_timeout_ms: None,
            ..SessionConfig::default()
        };
        let mut game = Game::new("forever", config, OddsConfig::quiet());
        game.tick(Duration::from_millis(300));
        game.tick(Duration::from_secs(3600));
        assert!(!game.is_idle());
    }

    #[test]
    fn messages_from_strangers_are_dropped() {
        let mut game = game();
        let stranger = ParticipantId::new();
        game.receive_message(stranger, Inbound::Ready { ready: true });
        game.receive_message(stranger, Inbound::Leave);
        assert_eq!(game.phase(), SessionPhase::Waiting);
    }

    #[test]
    fn client_messages_map_onto_inbound() {
        assert_eq!(Inbound::from(ClientMessage::JoinGame), Inbound::Join);
        assert_eq!(
            Inbound::from(ClientMessage::SiteSelected { site: Site::Beach }),
            Inbound::SiteSelected { site: Site::Beach }
        );
    }
}
