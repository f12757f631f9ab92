//! Enumeration types for Castaway sessions.
//!
//! All three sets are closed: sites, commodities and session phases are
//! fixed at compile time and never extended at runtime.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

/// A place on the island a participant can visit during a round.
///
/// "No site chosen" is represented as `Option<Site>::None` by the session,
/// never as a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    /// Timber and wolves.
    Forest,
    /// Crops and boars.
    Farm,
    /// Medical supplies.
    Hospital,
    /// Lookout over the other sites; ammunition store.
    Watchtower,
    /// Rendezvous point for departing the island.
    Beach,
}

impl Site {
    /// Every site, in display order.
    pub const ALL: [Self; 5] = [
        Self::Forest,
        Self::Farm,
        Self::Hospital,
        Self::Watchtower,
        Self::Beach,
    ];

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forest => "forest",
            Self::Farm => "farm",
            Self::Hospital => "hospital",
            Self::Watchtower => "watchtower",
            Self::Beach => "beach",
        }
    }

    /// The commodity a resource pickup yields at this site, if any.
    pub const fn commodity(self) -> Option<Commodity> {
        match self {
            Self::Forest => Some(Commodity::Log),
            Self::Farm => Some(Commodity::Food),
            Self::Hospital => Some(Commodity::Bandage),
            Self::Watchtower => Some(Commodity::Bullet),
            Self::Beach => None,
        }
    }

    /// The animal that attacks visitors at this site.
    pub const fn animal(self) -> &'static str {
        match self {
            Self::Forest => "wolf",
            Self::Farm => "wild boar",
            Self::Hospital => "pack of rats",
            Self::Watchtower => "bear",
            Self::Beach => "crocodile",
        }
    }
}

impl core::fmt::Display for Site {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Commodities
// ---------------------------------------------------------------------------

/// A tradeable, spendable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Commodity {
    /// Spent on repairs and beach supplies.
    Log,
    /// Eaten.
    Food,
    /// Heals.
    Bandage,
    /// Spent to fend off attacks.
    Bullet,
}

impl Commodity {
    /// Every commodity.
    pub const ALL: [Self; 4] = [Self::Log, Self::Food, Self::Bandage, Self::Bullet];

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Food => "food",
            Self::Bandage => "bandage",
            Self::Bullet => "bullet",
        }
    }

    /// The noun for `amount` units, e.g. "1 log" but "2 logs".
    pub const fn noun(self, amount: u32) -> &'static str {
        if amount == 1 {
            return self.as_str();
        }
        match self {
            Self::Log => "logs",
            Self::Food => "food",
            Self::Bandage => "bandages",
            Self::Bullet => "bullets",
        }
    }
}

impl core::fmt::Display for Commodity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Session phases
// ---------------------------------------------------------------------------

/// Top-level phase of a session.
///
/// A session cycles `Waiting -> SiteSelection -> SiteVisit -> SiteSelection`
/// and never terminates on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Gathering participants until everyone is ready.
    Waiting,
    /// Each participant picks a site.
    SiteSelection,
    /// Timed rounds of per-participant site events.
    SiteVisit,
}

impl SessionPhase {
    /// Snake-case wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::SiteSelection => "site_selection",
            Self::SiteVisit => "site_visit",
        }
    }
}

impl core::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
