//! Site visit: rounds of per-participant site events.
//!
//! The visit alternates between an event phase, which hands every
//! participant the next event from their queue, and a status phase, which
//! force-resolves whatever events with a follow-up are still unanswered.
//! Each phase is bounded by the session timer. The visit ends after the
//! configured number of rounds, or earlier once every queue is empty.
//!
//! Dispatched events are correlated with responses through session-wide
//! message ids. Resolving an id removes it, so a late or duplicate response
//! and a forced resolution can never both apply.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use castaway_types::{
    EventPrompt, EventResponse, MessageId, ParticipantId, PromptControls, ServerMessage,
    SessionPhase, Site,
};
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::{debug, info};

use super::Transition;
use crate::context::SessionContext;
use crate::game::Inbound;
use crate::site_event::{BeachStockpile, SiteEvent, generate_events, roll_observed_attacks};

/// Who an outstanding event was sent to, and where they were.
#[derive(Debug, Clone, Copy)]
struct Dispatched {
    participant: ParticipantId,
    site: Site,
    event: SiteEvent,
}

/// State of one site visit.
#[derive(Debug, Default)]
pub struct SiteVisit {
    queues: BTreeMap<ParticipantId, VecDeque<SiteEvent>>,
    outstanding: BTreeMap<MessageId, Dispatched>,
    /// Events with a follow-up dispatched this round, per participant.
    awaiting_status: BTreeMap<ParticipantId, MessageId>,
    in_status_phase: bool,
    rounds_completed: u32,
    beach: BeachStockpile,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl SiteVisit {
    /// An empty visit; queues are filled in `begin`.
    pub const fn new() -> Self {
        Self {
            queues: BTreeMap::new(),
            outstanding: BTreeMap::new(),
            awaiting_status: BTreeMap::new(),
            in_status_phase: false,
            rounds_completed: 0,
            beach: BeachStockpile::new(),
        }
    }

    /// Event phases run so far.
    pub const fn rounds_completed(&self) -> u32 {
        self.rounds_completed
    }

    /// Events still queued for a participant, next first.
    pub fn queue_of(&self, id: ParticipantId) -> Vec<SiteEvent> {
        self.queues
            .get(&id)
            .map(|queue| queue.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Supplies pooled at the beach during this visit.
    pub const fn beach(&self) -> &BeachStockpile {
        &self.beach
    }

    pub(super) fn begin(&mut self, ctx: &mut SessionContext) -> Transition {
        let cap = ctx.config.max_events_per_visit;
        let placed = ctx.placed();

        let mut generated: BTreeMap<ParticipantId, Vec<SiteEvent>> = BTreeMap::new();
        for (id, site) in &placed {
            let odds = ctx.odds.for_site(*site);
            generated.insert(*id, generate_events(*site, odds, cap, &mut ctx.rng));
        }

        // Observed attacks go to one random watchtower occupant. With nobody
        // watching they land unopposed on everyone at the target, right
        // after the opening repair.
        let mut unwatched: BTreeMap<ParticipantId, Vec<SiteEvent>> = BTreeMap::new();
        let watchers = ctx.occupants(Site::Watchtower);
        let chance = ctx.odds.observed_attack_chance;
        for target in roll_observed_attacks(chance, cap, &mut ctx.rng) {
            if let Some(watcher) = watchers.choose(&mut ctx.rng) {
                debug!(participant = %watcher, %target, "attack observed from watchtower");
                generated
                    .entry(*watcher)
                    .or_default()
                    .push(SiteEvent::ObservedAttack { target });
            } else {
                debug!(%target, "unwatched attack");
                for id in ctx.occupants(target) {
                    unwatched.entry(id).or_default().push(SiteEvent::Attack);
                }
            }
        }

        for (id, _) in placed {
            let mut events = generated.remove(&id).unwrap_or_default();
            events.shuffle(&mut ctx.rng);

            let mut queue = VecDeque::from([SiteEvent::Repair]);
            queue.extend(unwatched.remove(&id).unwrap_or_default());
            queue.extend(events);
            self.queues.insert(id, queue);
        }

        info!(
            session = ctx.name(),
            participants = self.queues.len(),
            "site visit started"
        );
        self.handle_phase(ctx)
    }

    pub(super) fn end(&self, ctx: &SessionContext) {
        info!(
            session = ctx.name(),
            rounds = self.rounds_completed,
            unresolved = self.outstanding.len(),
            "site visit finished"
        );
    }

    pub(super) fn on_timer(&mut self, ctx: &mut SessionContext) -> Transition {
        self.handle_phase(ctx)
    }

    pub(super) fn receive(
        &mut self,
        from: ParticipantId,
        message: &Inbound,
        ctx: &mut SessionContext,
    ) -> Transition {
        match message {
            Inbound::EventResponse(response) => {
                if let Some(follow_up) = self.resolve(response.message_id, from, response, ctx) {
                    ctx.send_to(from, ServerMessage::Event(follow_up));
                }
            }
            Inbound::Leave => self.forget(from),
            _ => {}
        }
        None
    }

    fn handle_phase(&mut self, ctx: &mut SessionContext) -> Transition {
        let transition = if self.in_status_phase {
            self.run_status_phase(ctx);
            None
        } else {
            self.run_event_phase(ctx)
        };
        self.in_status_phase = !self.in_status_phase;
        transition
    }

    fn run_event_phase(&mut self, ctx: &mut SessionContext) -> Transition {
        if self.rounds_completed >= ctx.config.site_visit_rounds {
            return Some(SessionPhase::SiteSelection);
        }

        let mut dispatched = false;
        let ids: Vec<ParticipantId> = self.queues.keys().copied().collect();
        for id in ids {
            let next = self.queues.get_mut(&id).and_then(VecDeque::pop_front);
            if let Some(event) = next {
                dispatched |= self.give_event(id, event, ctx);
            }
        }

        if !dispatched {
            debug!(session = ctx.name(), "every event queue is empty");
            return Some(SessionPhase::SiteSelection);
        }

        self.rounds_completed = self.rounds_completed.saturating_add(1);
        ctx.set_timeout(ctx.config.round_duration());
        None
    }

    fn give_event(&mut self, id: ParticipantId, event: SiteEvent, ctx: &mut SessionContext) -> bool {
        let Some(site) = ctx.site_of(id) else {
            debug!(participant = %id, event = event.kind(), "no site, dropping event");
            return false;
        };

        let (notice, controls) = event.open(site, ctx, &self.beach);
        let message_id = ctx.next_message_id();
        self.outstanding.insert(
            message_id,
            Dispatched {
                participant: id,
                site,
                event,
            },
        );

        // Events without a follow-up get the status phase's time too.
        let deadline = if event.has_follow_up() {
            self.awaiting_status.insert(id, message_id);
            ctx.config.round_duration()
        } else {
            ctx.config
                .round_duration()
                .saturating_add(ctx.config.status_duration())
        };

        debug!(participant = %id, %message_id, event = event.kind(), "event dispatched");
        ctx.send_to(id, ServerMessage::SetClock { time_ms: millis(deadline) });
        ctx.send_to(
            id,
            ServerMessage::Event(EventPrompt::new(
                message_id,
                notice.title,
                notice.description,
                controls,
            )),
        );
        true
    }

    fn run_status_phase(&mut self, ctx: &mut SessionContext) {
        let awaiting = std::mem::take(&mut self.awaiting_status);
        for (id, message_id) in awaiting {
            let response = EventResponse {
                message_id,
                ..EventResponse::default()
            };
            if let Some(follow_up) = self.resolve(message_id, id, &response, ctx) {
                ctx.send_to(id, ServerMessage::Event(follow_up));
                ctx.send_to(
                    id,
                    ServerMessage::SetClock {
                        time_ms: millis(ctx.config.status_duration()),
                    },
                );
            }
        }
        ctx.set_timeout(ctx.config.status_duration());
    }

    /// Resolve an outstanding event once. Returns the follow-up prompt, if
    /// the event has one. Unknown ids and responses from anyone but the
    /// recipient are ignored.
    fn resolve(
        &mut self,
        message_id: MessageId,
        responder: ParticipantId,
        response: &EventResponse,
        ctx: &mut SessionContext,
    ) -> Option<EventPrompt> {
        let Some(dispatched) = self.outstanding.get(&message_id).copied() else {
            debug!(participant = %responder, %message_id, "stale event response");
            return None;
        };
        if dispatched.participant != responder {
            debug!(participant = %responder, %message_id, "response to someone else's event");
            return None;
        }
        self.outstanding.remove(&message_id);

        let resolution =
            dispatched
                .event
                .resolve(responder, dispatched.site, response, ctx, &mut self.beach);
        debug!(participant = %responder, %message_id, event = dispatched.event.kind(), "event resolved");

        if let Some(target) = resolution.defense_failed {
            self.defense_failed(target, ctx);
        }

        resolution.follow_up.map(|notice| {
            EventPrompt::new(
                ctx.next_message_id(),
                notice.title,
                notice.description,
                PromptControls::Acknowledge,
            )
        })
    }

    /// Everyone at `target` faces the attack at the start of next round.
    fn defense_failed(&mut self, target: Site, ctx: &SessionContext) {
        let victims = ctx.occupants(target);
        info!(session = ctx.name(), %target, victims = victims.len(), "watchtower defense failed");
        for id in victims {
            self.queues.entry(id).or_default().push_front(SiteEvent::Attack);
        }
    }

    fn forget(&mut self, id: ParticipantId) {
        self.queues.remove(&id);
        self.awaiting_status.remove(&id);
        self.outstanding
            .retain(|_, dispatched| dispatched.participant != id);
    }
}
