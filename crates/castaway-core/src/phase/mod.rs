//! The session phases and their dispatch.
//!
//! The session cycles Waiting -> SiteSelection -> SiteVisit ->
//! SiteSelection -> ... and never terminates. Each handler returns the
//! phase the session should move to, if any; the controller performs the
//! transition so a phase never holds a reference back to it.

mod selection;
mod visit;
mod waiting;

pub use selection::SiteSelection;
pub use visit::SiteVisit;
pub use waiting::Waiting;

use castaway_types::{ParticipantId, SessionPhase};

use crate::context::SessionContext;
use crate::game::Inbound;

/// A requested move to another phase.
pub type Transition = Option<SessionPhase>;

/// The active phase and its private state.
#[derive(Debug)]
pub enum Phase {
    /// Collecting ready flags.
    Waiting(Waiting),
    /// Everyone picks a site.
    SiteSelection(SiteSelection),
    /// Rounds of site events.
    SiteVisit(SiteVisit),
}

impl Phase {
    /// Construct the state for `kind`. Constructors may touch shared state,
    /// e.g. site selection clears every chosen site.
    pub fn enter(kind: SessionPhase, ctx: &mut SessionContext) -> Self {
        match kind {
            SessionPhase::Waiting => Self::Waiting(Waiting::new(ctx)),
            SessionPhase::SiteSelection => Self::SiteSelection(SiteSelection::new(ctx)),
            SessionPhase::SiteVisit => Self::SiteVisit(SiteVisit::new()),
        }
    }

    /// Which phase this is.
    pub const fn kind(&self) -> SessionPhase {
        match self {
            Self::Waiting(_) => SessionPhase::Waiting,
            Self::SiteSelection(_) => SessionPhase::SiteSelection,
            Self::SiteVisit(_) => SessionPhase::SiteVisit,
        }
    }

    /// Called once after the phase becomes active.
    pub fn begin(&mut self, ctx: &mut SessionContext) -> Transition {
        match self {
            Self::Waiting(waiting) => waiting.begin(ctx),
            Self::SiteSelection(_) => SiteSelection::begin(ctx),
            Self::SiteVisit(visit) => visit.begin(ctx),
        }
    }

    /// Called once before the phase is replaced.
    pub fn end(&mut self, ctx: &mut SessionContext) {
        if let Self::SiteVisit(visit) = self {
            visit.end(ctx);
        }
    }

    /// Route a message. Kinds a phase does not handle are ignored.
    pub fn receive(
        &mut self,
        from: ParticipantId,
        message: &Inbound,
        ctx: &mut SessionContext,
    ) -> Transition {
        match self {
            Self::Waiting(waiting) => waiting.receive(from, message, ctx),
            Self::SiteSelection(_) => SiteSelection::receive(from, message, ctx),
            Self::SiteVisit(visit) => visit.receive(from, message, ctx),
        }
    }

    /// Called when the session timer fires.
    pub fn on_timer(&mut self, ctx: &mut SessionContext) -> Transition {
        match self {
            Self::Waiting(_) => None,
            Self::SiteSelection(_) => SiteSelection::on_timer(ctx),
            Self::SiteVisit(visit) => visit.on_timer(ctx),
        }
    }
}
