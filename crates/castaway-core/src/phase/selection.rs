//! Site selection: everyone picks where to spend the next visit.

use castaway_types::{ParticipantId, SessionPhase};
use tracing::{debug, info};

use super::Transition;
use crate::context::SessionContext;
use crate::game::Inbound;

/// Site selection has no private state; choices live in the session
/// context so the visit can read them.
#[derive(Debug, Default)]
pub struct SiteSelection;

impl SiteSelection {
    /// Enter site selection, clearing every previous choice.
    pub fn new(ctx: &mut SessionContext) -> Self {
        ctx.reset_sites();
        Self
    }

    pub(super) fn begin(ctx: &mut SessionContext) -> Transition {
        if let Some(timeout) = ctx.config.site_selection_timeout() {
            ctx.set_timeout(timeout);
        }
        None
    }

    pub(super) fn receive(
        from: ParticipantId,
        message: &Inbound,
        ctx: &mut SessionContext,
    ) -> Transition {
        match message {
            Inbound::SiteSelected { site } => {
                let Some(chosen) = ctx.sites.get_mut(&from) else {
                    debug!(participant = %from, "site choice from unknown participant");
                    return None;
                };
                *chosen = Some(*site);
                debug!(participant = %from, %site, "site chosen");
            }
            // The controller already dropped them; the rest may now be
            // complete.
            Inbound::Leave => {}
            _ => return None,
        }
        Self::proceed_if_chosen(ctx)
    }

    pub(super) fn on_timer(ctx: &SessionContext) -> Transition {
        let placed = ctx.placed().len();
        info!(session = ctx.name(), placed, "site selection timed out");
        Some(SessionPhase::SiteVisit)
    }

    fn proceed_if_chosen(ctx: &SessionContext) -> Transition {
        let everyone_chose = !ctx.sites.is_empty() && ctx.sites.values().all(Option::is_some);
        everyone_chose.then_some(SessionPhase::SiteVisit)
    }
}
