//! Waiting room: collect ready flags until everyone is ready.

use std::collections::BTreeMap;

use castaway_types::{ParticipantId, PlayerInfo, ServerMessage, SessionPhase};
use tracing::debug;

use super::Transition;
use crate::context::SessionContext;
use crate::game::Inbound;

/// Ready flag per known participant.
#[derive(Debug, Default)]
pub struct Waiting {
    ready: BTreeMap<ParticipantId, bool>,
}

impl Waiting {
    /// Track everyone already connected as not ready.
    pub fn new(ctx: &SessionContext) -> Self {
        let ready = ctx
            .sites
            .keys()
            .map(|id| (*id, false))
            .collect();
        Self { ready }
    }

    pub(super) fn begin(&self, ctx: &SessionContext) -> Transition {
        if !self.ready.is_empty() {
            self.broadcast_roster(ctx);
        }
        None
    }

    pub(super) fn receive(
        &mut self,
        from: ParticipantId,
        message: &Inbound,
        ctx: &SessionContext,
    ) -> Transition {
        match message {
            Inbound::Join => {
                self.ready.insert(from, false);
            }
            Inbound::Leave => {
                self.ready.remove(&from);
            }
            Inbound::Ready { ready } => {
                if !ctx.roster.contains(from) {
                    return None;
                }
                self.ready.insert(from, *ready);
            }
            // The controller already renamed them; only the roster needs
            // re-sending.
            Inbound::SetName { .. } => {}
            _ => return None,
        }

        self.broadcast_roster(ctx);
        self.proceed_if_ready(ctx)
    }

    /// Latest ready flag of a participant.
    pub fn is_ready(&self, id: ParticipantId) -> Option<bool> {
        self.ready.get(&id).copied()
    }

    fn broadcast_roster(&self, ctx: &SessionContext) {
        let info = self
            .ready
            .iter()
            .map(|(id, ready)| PlayerInfo {
                name: ctx.roster.name_of(*id).to_owned(),
                ready: *ready,
            })
            .collect();
        ctx.broadcast(&ServerMessage::PlayerInfoUpdated { info });
    }

    fn proceed_if_ready(&self, ctx: &SessionContext) -> Transition {
        let everyone_ready = self.ready.values().all(|ready| *ready);
        let count = self.ready.len();
        debug!(session = ctx.name(), count, everyone_ready, "ready check");

        // An empty room never starts, even with a minimum of zero.
        let enough = count >= ctx.config.min_players && count > 0;
        (everyone_ready && enough).then_some(SessionPhase::SiteSelection)
    }
}
