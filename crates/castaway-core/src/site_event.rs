//! Site events: the per-participant prompts dispatched during a site visit.
//!
//! Every event has an opening prompt and a resolution. The resolution runs
//! either when the participant responds or, for events with a follow-up,
//! when the status phase forces it with a default response.

use castaway_types::{Commodity, EventResponse, ParticipantId, PromptControls, Site};
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::config::SiteOdds;
use crate::context::SessionContext;

/// One unit of interactive content queued for a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteEvent {
    /// Spend logs to raise the occupied site's integrity.
    Repair,
    /// Find the site's commodity. Has no follow-up.
    ResourcePickup,
    /// An animal attacks the participant.
    Attack,
    /// Seen from the watchtower: another site is about to be attacked.
    ObservedAttack {
        /// The threatened site.
        target: Site,
    },
    /// Contribute supplies towards leaving the island.
    BeachRendezvous,
}

/// Text of a prompt or follow-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Short heading.
    pub title: String,
    /// Body text.
    pub description: String,
}

impl Notice {
    fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Outcome of resolving an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Status message to send back, if the event has one.
    pub follow_up: Option<Notice>,
    /// Set when a watchtower defense failed against this site.
    pub defense_failed: Option<Site>,
}

/// Supplies contributed at the beach during one visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeachStockpile {
    contributed: u64,
}

impl BeachStockpile {
    /// An empty stockpile.
    pub const fn new() -> Self {
        Self { contributed: 0 }
    }

    /// Total contributed so far.
    pub const fn contributed(&self) -> u64 {
        self.contributed
    }

    /// Add a contribution and return the new total.
    pub fn contribute(&mut self, amount: u32) -> u64 {
        self.contributed = self.contributed.saturating_add(u64::from(amount));
        self.contributed
    }
}

/// Supplies needed before the group at the beach can depart.
fn supplies_required(ctx: &SessionContext) -> u64 {
    let at_beach = u64::try_from(ctx.occupants(Site::Beach).len()).unwrap_or(u64::MAX);
    u64::from(ctx.config.beach_supplies_per_participant).saturating_mul(at_beach)
}

const fn defended(response: &EventResponse) -> bool {
    response.clicked_action || response.resource_amount >= 1
}

fn shoot() -> PromptControls {
    PromptControls::Action {
        label: String::from("Shoot"),
        allocates: Commodity::Bullet,
    }
}

impl SiteEvent {
    /// Whether resolving this event produces a status message, which makes
    /// it subject to forced resolution in the status phase.
    pub const fn has_follow_up(self) -> bool {
        !matches!(self, Self::ResourcePickup)
    }

    /// Short name used in logs.
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Repair => "repair",
            Self::ResourcePickup => "resource_pickup",
            Self::Attack => "attack",
            Self::ObservedAttack { .. } => "observed_attack",
            Self::BeachRendezvous => "beach_rendezvous",
        }
    }

    /// Opening prompt for a participant at `site`.
    pub fn open(
        self,
        site: Site,
        ctx: &SessionContext,
        beach: &BeachStockpile,
    ) -> (Notice, PromptControls) {
        match self {
            Self::Repair => (
                Notice::new(
                    format!("Repair the {site}?"),
                    format!(
                        "The {site} looks about {}% functional.",
                        ctx.integrity_of(site)
                    ),
                ),
                PromptControls::Spend(Commodity::Log),
            ),
            Self::ResourcePickup => {
                let Some(commodity) = site.commodity() else {
                    return (
                        Notice::new("Nothing here", format!("You search the {site} but find nothing.")),
                        PromptControls::Acknowledge,
                    );
                };
                let amount = ctx.yield_of(commodity);
                let noun = commodity.noun(amount);
                (
                    Notice::new(
                        format!("Found {amount} {noun}"),
                        format!("While exploring the {site} you found {amount} {noun}."),
                    ),
                    PromptControls::Acknowledge,
                )
            }
            Self::Attack => {
                let animal = site.animal();
                (
                    Notice::new(
                        format!("A {animal} attacks!"),
                        format!("A {animal} charges at you in the {site}. Spend a bullet to fend it off."),
                    ),
                    shoot(),
                )
            }
            Self::ObservedAttack { target } => {
                let animal = target.animal();
                (
                    Notice::new(
                        format!("Attack on the {target}!"),
                        format!(
                            "From the watchtower you spot a {animal} heading for the {target}. Spend a bullet to defend it."
                        ),
                    ),
                    shoot(),
                )
            }
            Self::BeachRendezvous => (
                Notice::new(
                    "Rendezvous at the beach",
                    format!(
                        "Pool supplies for the voyage. {} of {} gathered so far.",
                        beach.contributed(),
                        supplies_required(ctx)
                    ),
                ),
                PromptControls::Spend(Commodity::Food),
            ),
        }
    }

    /// Apply a response from `participant`, who is at `site`.
    pub fn resolve(
        self,
        participant: ParticipantId,
        site: Site,
        response: &EventResponse,
        ctx: &mut SessionContext,
        beach: &mut BeachStockpile,
    ) -> Resolution {
        match self {
            Self::Repair => {
                let before = ctx.integrity_of(site);
                if response.resource_amount == 0 {
                    return Resolution {
                        follow_up: Some(Notice::new(
                            format!("You didn't repair the {site}"),
                            format!("The {site} is still about {before}% functional."),
                        )),
                        defense_failed: None,
                    };
                }
                let after = ctx.repair(site, response.resource_amount);
                Resolution {
                    follow_up: Some(Notice::new(
                        format!("You repaired the {site}"),
                        format!("The {site} went from {before}% to {after}% functional."),
                    )),
                    defense_failed: None,
                }
            }
            Self::ResourcePickup => Resolution::default(),
            Self::Attack => {
                let animal = site.animal();
                let follow_up = if defended(response) {
                    Notice::new(
                        format!("You fended off the {animal}"),
                        format!("The {animal} flees from the {site}."),
                    )
                } else {
                    let remaining = ctx.wound(participant);
                    Notice::new(
                        format!("The {animal} got you"),
                        format!(
                            "You lose {} health and have {remaining} left.",
                            ctx.config.attack_damage
                        ),
                    )
                };
                Resolution {
                    follow_up: Some(follow_up),
                    defense_failed: None,
                }
            }
            Self::ObservedAttack { target } => {
                if defended(response) {
                    Resolution {
                        follow_up: Some(Notice::new(
                            format!("You defended the {target}"),
                            format!("The {} turns away from the {target}.", target.animal()),
                        )),
                        defense_failed: None,
                    }
                } else {
                    Resolution {
                        follow_up: Some(Notice::new(
                            format!("The {target} is under attack"),
                            format!("Nobody stopped the {} from reaching the {target}.", target.animal()),
                        )),
                        defense_failed: Some(target),
                    }
                }
            }
            Self::BeachRendezvous => {
                let total = beach.contribute(response.resource_amount);
                let required = supplies_required(ctx);
                let follow_up = if total >= required {
                    Notice::new(
                        "Ready to depart",
                        format!("The group has gathered {total} supplies, enough to leave."),
                    )
                } else {
                    Notice::new(
                        "Not enough supplies",
                        format!(
                            "The group needs {} more supplies before it can leave.",
                            required.saturating_sub(total)
                        ),
                    )
                };
                Resolution {
                    follow_up: Some(follow_up),
                    defense_failed: None,
                }
            }
        }
    }
}

/// Roll one generated slot for a participant at `site`.
///
/// The roll falls into the pickup band, then the attack band, then the
/// rendezvous band, or into none of them. Pickups only happen where the
/// site has a commodity and rendezvous only at the beach.
pub fn roll_event(site: Site, odds: SiteOdds, rng: &mut impl Rng) -> Option<SiteEvent> {
    let roll: f64 = rng.random();
    let mut band = odds.resource_pickup;
    if roll < band {
        return site.commodity().map(|_| SiteEvent::ResourcePickup);
    }
    band += odds.animal_attack;
    if roll < band {
        return Some(SiteEvent::Attack);
    }
    band += odds.beach_rendezvous;
    if roll < band {
        return (site == Site::Beach).then_some(SiteEvent::BeachRendezvous);
    }
    None
}

/// Generate up to `cap` events for a participant at `site`.
pub fn generate_events(site: Site, odds: SiteOdds, cap: usize, rng: &mut impl Rng) -> Vec<SiteEvent> {
    (0..cap).filter_map(|_| roll_event(site, odds, rng)).collect()
}

/// Roll up to `cap` observed attacks, returning the threatened sites.
/// The watchtower never targets itself.
pub fn roll_observed_attacks(chance: f64, cap: usize, rng: &mut impl Rng) -> Vec<Site> {
    let targets: Vec<Site> = Site::ALL
        .into_iter()
        .filter(|site| *site != Site::Watchtower)
        .collect();
    let mut observed = Vec::new();
    for _ in 0..cap {
        if rng.random::<f64>() >= chance {
            continue;
        }
        if let Some(target) = targets.choose(rng) {
            observed.push(*target);
        }
    }
    observed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use castaway_types::MessageId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::{OddsConfig, SessionConfig};
    use crate::participant::Participant;

    fn context() -> SessionContext {
        SessionContext::new("test", SessionConfig::default(), OddsConfig::quiet())
    }

    fn respond(amount: u32, clicked_action: bool) -> EventResponse {
        EventResponse {
            message_id: MessageId(1),
            clicked_ok: true,
            clicked_action,
            resource_amount: amount,
        }
    }

    #[test]
    fn repair_with_logs_raises_integrity() {
        let mut ctx = context();
        let mut beach = BeachStockpile::default();
        let id = ParticipantId::new();

        let out = SiteEvent::Repair.resolve(id, Site::Forest, &respond(10, false), &mut ctx, &mut beach);

        assert_eq!(ctx.integrity_of(Site::Forest), 60);
        assert!(out.follow_up.unwrap().title.contains("repaired"));
    }

    #[test]
    fn repair_without_logs_changes_nothing() {
        let mut ctx = context();
        let mut beach = BeachStockpile::default();
        let id = ParticipantId::new();

        let out = SiteEvent::Repair.resolve(id, Site::Forest, &respond(0, false), &mut ctx, &mut beach);

        assert_eq!(ctx.integrity_of(Site::Forest), 50);
        assert!(out.follow_up.unwrap().title.contains("didn't repair"));
    }

    #[test]
    fn repair_prompt_reports_integrity_and_asks_for_logs() {
        let ctx = context();
        let (notice, controls) = SiteEvent::Repair.open(Site::Farm, &ctx, &BeachStockpile::default());
        assert_eq!(notice.title, "Repair the farm?");
        assert!(notice.description.contains("50%"));
        assert_eq!(controls, PromptControls::Spend(Commodity::Log));
    }

    #[test]
    fn undefended_attack_costs_health() {
        let mut ctx = context();
        let mut beach = BeachStockpile::default();
        let (alice, _rx) = Participant::connect("alice");
        let id = alice.id();
        ctx.register(alice);

        SiteEvent::Attack.resolve(id, Site::Farm, &EventResponse::default(), &mut ctx, &mut beach);
        assert_eq!(ctx.health_of(id), 80);

        SiteEvent::Attack.resolve(id, Site::Farm, &respond(1, false), &mut ctx, &mut beach);
        SiteEvent::Attack.resolve(id, Site::Farm, &respond(0, true), &mut ctx, &mut beach);
        assert_eq!(ctx.health_of(id), 80);
    }

    #[test]
    fn failed_watchtower_defense_reports_target() {
        let mut ctx = context();
        let mut beach = BeachStockpile::default();
        let event = SiteEvent::ObservedAttack { target: Site::Farm };
        let id = ParticipantId::new();

        let failed = event.resolve(id, Site::Watchtower, &EventResponse::default(), &mut ctx, &mut beach);
        assert_eq!(failed.defense_failed, Some(Site::Farm));

        let held = event.resolve(id, Site::Watchtower, &respond(0, true), &mut ctx, &mut beach);
        assert_eq!(held.defense_failed, None);
    }

    #[test]
    fn beach_rendezvous_compares_pool_with_requirement() {
        let mut ctx = context();
        let mut beach = BeachStockpile::default();
        let (alice, _a) = Participant::connect("alice");
        let (bob, _b) = Participant::connect("bob");
        let (a, b) = (alice.id(), bob.id());
        ctx.register(alice);
        ctx.register(bob);
        ctx.sites.insert(a, Some(Site::Beach));
        ctx.sites.insert(b, Some(Site::Beach));

        // Two at the beach need 10 supplies.
        let first = SiteEvent::BeachRendezvous.resolve(a, Site::Beach, &respond(6, false), &mut ctx, &mut beach);
        assert_eq!(first.follow_up.unwrap().title, "Not enough supplies");

        let second = SiteEvent::BeachRendezvous.resolve(b, Site::Beach, &respond(4, false), &mut ctx, &mut beach);
        assert_eq!(second.follow_up.unwrap().title, "Ready to depart");
        assert_eq!(beach.contributed(), 10);
    }

    #[test]
    fn only_pickups_lack_follow_up() {
        assert!(!SiteEvent::ResourcePickup.has_follow_up());
        assert!(SiteEvent::Repair.has_follow_up());
        assert!(SiteEvent::Attack.has_follow_up());
        assert!(SiteEvent::BeachRendezvous.has_follow_up());
        assert!(SiteEvent::ObservedAttack { target: Site::Forest }.has_follow_up());
    }

    #[test]
    fn certain_pickup_odds_fill_every_slot() {
        let mut rng = StdRng::seed_from_u64(7);
        let odds = SiteOdds {
            resource_pickup: 1.0,
            ..SiteOdds::default()
        };
        let events = generate_events(Site::Forest, odds, 4, &mut rng);
        assert_eq!(events, vec![SiteEvent::ResourcePickup; 4]);
    }

    #[test]
    fn pickup_names_the_yielded_amount() {
        let mut ctx = context();
        let beach = BeachStockpile::new();
        let (single, _) = SiteEvent::ResourcePickup.open(Site::Forest, &ctx, &beach);
        assert_eq!(single.title, "Found 1 log");

        ctx.yields.insert(Commodity::Log, 2.0);
        let (double, _) = SiteEvent::ResourcePickup.open(Site::Forest, &ctx, &beach);
        assert_eq!(double.title, "Found 2 logs");
        assert_eq!(double.description, "While exploring the forest you found 2 logs.");
    }

    #[test]
    fn zero_odds_generate_nothing() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(generate_events(Site::Hospital, SiteOdds::default(), 10, &mut rng).is_empty());
        assert!(roll_observed_attacks(0.0, 10, &mut rng).is_empty());
    }

    #[test]
    fn observed_attacks_never_target_watchtower() {
        let mut rng = StdRng::seed_from_u64(11);
        let targets = roll_observed_attacks(1.0, 50, &mut rng);
        assert_eq!(targets.len(), 50);
        assert!(targets.iter().all(|site| *site != Site::Watchtower));
    }

    #[test]
    fn pickups_never_happen_at_the_beach() {
        let mut rng = StdRng::seed_from_u64(3);
        let odds = SiteOdds {
            resource_pickup: 1.0,
            ..SiteOdds::default()
        };
        assert!(generate_events(Site::Beach, odds, 5, &mut rng).is_empty());
    }
}
