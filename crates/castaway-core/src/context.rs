//! Shared session state owned by the event loop.
//!
//! Everything here is mutated only from inside the single consumer of the
//! session's event stream, so nothing is locked. Phases receive it by
//! mutable reference for the duration of one call.

use std::collections::BTreeMap;
use std::time::Duration;

use castaway_types::{Commodity, MessageId, ParticipantId, ServerMessage, Site};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::clock::SessionClock;
use crate::config::{OddsConfig, SessionConfig};
use crate::participant::{Participant, Roster};
use crate::trade::TradeDesk;

/// Session-wide state shared by every phase.
#[derive(Debug)]
pub struct SessionContext {
    name: String,
    pub(crate) config: SessionConfig,
    pub(crate) odds: OddsConfig,
    pub(crate) roster: Roster,
    /// Chosen site per participant; `None` until chosen.
    pub(crate) sites: BTreeMap<ParticipantId, Option<Site>>,
    pub(crate) integrity: BTreeMap<Site, u64>,
    /// Yield rate per commodity; a pickup grants the rounded rate.
    pub(crate) yields: BTreeMap<Commodity, f64>,
    pub(crate) health: BTreeMap<ParticipantId, u32>,
    pub(crate) trades: TradeDesk,
    pub(crate) clock: SessionClock,
    next_message_id: u64,
    pub(crate) rng: StdRng,
}

impl SessionContext {
    /// Create the state for a new session.
    pub fn new(name: impl Into<String>, config: SessionConfig, odds: OddsConfig) -> Self {
        let integrity = Site::ALL
            .iter()
            .map(|site| (*site, config.initial_integrity))
            .collect();
        let yields = Commodity::ALL.iter().map(|c| (*c, 1.0)).collect();
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        Self {
            name: name.into(),
            trades: TradeDesk::new(config.trade_timeout()),
            config,
            odds,
            roster: Roster::new(),
            sites: BTreeMap::new(),
            integrity,
            yields,
            health: BTreeMap::new(),
            clock: SessionClock::new(),
            next_message_id: 1,
            rng,
        }
    }

    /// Session name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session tuning.
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Connected participants.
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Register a participant with no chosen site and full health.
    /// Returns `false` if already registered.
    pub(crate) fn register(&mut self, participant: Participant) -> bool {
        let id = participant.id();
        if !self.roster.insert(participant) {
            return false;
        }
        self.sites.insert(id, None);
        self.health.insert(id, self.config.starting_health);
        true
    }

    /// Drop every trace of a participant from the shared state.
    pub(crate) fn deregister(&mut self, id: ParticipantId) {
        self.roster.remove(id);
        self.sites.remove(&id);
        self.health.remove(&id);
        self.trades.withdraw(id);
    }

    /// Site chosen by a participant.
    pub fn site_of(&self, id: ParticipantId) -> Option<Site> {
        self.sites.get(&id).copied().flatten()
    }

    /// Participants whose chosen site is `site`, in join order.
    pub fn occupants(&self, site: Site) -> Vec<ParticipantId> {
        self.sites
            .iter()
            .filter(|(_, chosen)| **chosen == Some(site))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Participants that have chosen a site, paired with it.
    pub fn placed(&self) -> Vec<(ParticipantId, Site)> {
        self.sites
            .iter()
            .filter_map(|(id, chosen)| chosen.map(|site| (*id, site)))
            .collect()
    }

    /// Forget every site choice.
    pub(crate) fn reset_sites(&mut self) {
        for chosen in self.sites.values_mut() {
            *chosen = None;
        }
    }

    /// Current integrity of a site.
    pub fn integrity_of(&self, site: Site) -> u64 {
        self.integrity.get(&site).copied().unwrap_or_default()
    }

    /// Add `amount` to a site's integrity, saturating at the configured
    /// maximum. Returns the new integrity.
    pub(crate) fn repair(&mut self, site: Site, amount: u32) -> u64 {
        let repaired = self
            .integrity_of(site)
            .saturating_add(u64::from(amount))
            .min(self.config.max_integrity);
        self.integrity.insert(site, repaired);
        repaired
    }

    /// Current health of a participant.
    pub fn health_of(&self, id: ParticipantId) -> u32 {
        self.health.get(&id).copied().unwrap_or_default()
    }

    /// Apply attack damage. Returns the remaining health.
    pub(crate) fn wound(&mut self, id: ParticipantId) -> u32 {
        let remaining = self.health_of(id).saturating_sub(self.config.attack_damage);
        self.health.insert(id, remaining);
        remaining
    }

    /// Whole units granted by one pickup of `commodity`: the yield rate
    /// rounded, and never less than one.
    pub fn yield_of(&self, commodity: Commodity) -> u32 {
        let rate = self.yields.get(&commodity).copied().unwrap_or(1.0);
        whole_units(rate)
    }

    /// Allocate the next event correlation id. Ids start at 1 and are
    /// never reused within a session.
    pub(crate) fn next_message_id(&mut self) -> MessageId {
        let id = self.next_message_id;
        self.next_message_id = id.saturating_add(1);
        MessageId(id)
    }

    /// Arm the session timer, replacing any armed timer.
    pub(crate) fn set_timeout(&mut self, duration: Duration) {
        debug!(session = self.name, ?duration, "timer armed");
        self.clock.set_timeout(duration);
    }

    /// Deliver a message to one participant.
    pub(crate) fn send_to(&self, id: ParticipantId, message: ServerMessage) {
        self.roster.send_to(id, message);
    }

    /// Deliver a message to every participant.
    pub(crate) fn broadcast(&self, message: &ServerMessage) {
        self.roster.broadcast(message);
    }
}

/// Round a yield rate to whole units, at least one.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_units(rate: f64) -> u32 {
    // Clamped into u32 range first; NaN casts to 0.
    let units = rate.round().clamp(1.0, f64::from(u32::MAX)) as u32;
    units.max(1)
}
