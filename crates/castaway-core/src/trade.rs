//! Two-party trade handshake.
//!
//! A proposal waits on the desk until a different participant proposes
//! within the trade window, at which point both sides receive the other's
//! materials. A proposal that arrives too late, or comes from the same
//! participant, simply replaces the one on the desk. There is no explicit
//! cancellation.

use std::time::Duration;

use castaway_types::ParticipantId;

/// The single proposal awaiting a counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTrade {
    /// Who proposed.
    pub proposer: ParticipantId,
    /// What they offered.
    pub materials: String,
    /// Session time of the proposal.
    pub proposed_at: Duration,
}

/// A completed exchange between two participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTrade {
    /// Proposer of the earlier offer.
    pub first: ParticipantId,
    /// Materials the first participant offered.
    pub first_materials: String,
    /// Participant whose proposal closed the deal.
    pub second: ParticipantId,
    /// Materials the second participant offered.
    pub second_materials: String,
}

/// Holds at most one pending proposal.
#[derive(Debug, Clone, Default)]
pub struct TradeDesk {
    window: Duration,
    pending: Option<PendingTrade>,
}

impl TradeDesk {
    /// Create an empty desk with the given completion window.
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// The proposal currently on the desk.
    pub const fn pending(&self) -> Option<&PendingTrade> {
        self.pending.as_ref()
    }

    /// Handle a proposal from `proposer` at session time `now`.
    ///
    /// Returns the completed trade if this proposal matched the pending
    /// one; otherwise it becomes the new pending proposal.
    pub fn propose(
        &mut self,
        proposer: ParticipantId,
        materials: String,
        now: Duration,
    ) -> Option<CompletedTrade> {
        let matches = self.pending.as_ref().is_some_and(|pending| {
            pending.proposer != proposer && now.saturating_sub(pending.proposed_at) < self.window
        });

        if matches {
            let pending = self.pending.take()?;
            return Some(CompletedTrade {
                first: pending.proposer,
                first_materials: pending.materials,
                second: proposer,
                second_materials: materials,
            });
        }

        self.pending = Some(PendingTrade {
            proposer,
            materials,
            proposed_at: now,
        });
        None
    }

    /// Discard the pending proposal if `participant` made it.
    pub fn withdraw(&mut self, participant: ParticipantId) {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.proposer == participant)
        {
            self.pending = None;
        }
    }
}
