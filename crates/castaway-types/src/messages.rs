//! Wire message vocabulary.
//!
//! Every payload carries an `action` discriminant that selects its schema.
//! [`ClientMessage`] covers everything a client may send; [`ServerMessage`]
//! covers everything the server pushes. The internal clock tick and the
//! server-synthesized leave are deliberately absent from [`ClientMessage`],
//! so a client that sends either gets a decode failure.

use serde::{Deserialize, Serialize};

use crate::enums::{Commodity, SessionPhase, Site};
use crate::ids::MessageId;

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

/// A message sent by a client over its connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Explicit join, sent by the client right after connecting.
    #[serde(alias = "join")]
    JoinGame,
    /// Change the display name.
    SetName {
        /// New display name.
        name: String,
    },
    /// Toggle the ready flag while waiting.
    Ready {
        /// Whether the participant is ready to start.
        ready: bool,
    },
    /// Choose a site during site selection.
    SiteSelected {
        /// The chosen site.
        site: Site,
    },
    /// Resolve a previously dispatched site event.
    EventResponse(EventResponse),
    /// Propose a trade to whoever proposes next.
    Trade {
        /// Free-form description of the offered materials.
        materials: String,
    },
}

impl ClientMessage {
    /// Every `action` value a client may send.
    pub const ACTIONS: [&'static str; 7] = [
        "join_game",
        "join",
        "set_name",
        "ready",
        "site_selected",
        "event_response",
        "trade",
    ];
}

/// A participant's answer to an event prompt.
///
/// A forced resolution (the participant never answered before the phase
/// ended) is represented by [`EventResponse::default`]: nothing clicked and
/// nothing spent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    /// Correlation id of the prompt being answered.
    pub message_id: MessageId,
    /// Whether the OK button was pressed.
    #[serde(default)]
    pub clicked_ok: bool,
    /// Whether the action button was pressed.
    #[serde(default)]
    pub clicked_action: bool,
    /// Amount of the prompt's resource the participant committed.
    #[serde(default)]
    pub resource_amount: u32,
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

/// A message pushed by the server to one or all participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to a join naming the session and its current phase.
    Welcome {
        /// Session name.
        game: String,
        /// Current phase.
        state: SessionPhase,
    },
    /// Full roster with ready flags, broadcast while waiting.
    PlayerInfoUpdated {
        /// One entry per tracked participant.
        info: Vec<PlayerInfo>,
    },
    /// The session moved to a new phase.
    GameStateChanged {
        /// The phase just entered.
        new_state: SessionPhase,
    },
    /// How long the client has to deal with the next prompt.
    SetClock {
        /// Remaining time in milliseconds.
        time_ms: u64,
    },
    /// A site event prompt or follow-up status.
    Event(EventPrompt),
    /// A trade handshake completed; carries the counterpart's materials.
    TradeCompleted {
        /// What the counterpart offered.
        materials: String,
    },
}

/// One roster entry in [`ServerMessage::PlayerInfoUpdated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Display name.
    pub name: String,
    /// Latest ready flag.
    pub ready: bool,
}

/// The buttons an event prompt offers, chosen in one step per event kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptControls {
    /// Only an OK button.
    Acknowledge,
    /// OK plus a resource slider for the given commodity.
    Spend(Commodity),
    /// OK plus a labelled action button that allocates one commodity.
    Action {
        /// Button label.
        label: String,
        /// Commodity spent by pressing the button.
        allocates: Commodity,
    },
}

/// A prompt shown to one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPrompt {
    /// Correlation id to echo back in an [`EventResponse`].
    pub message_id: MessageId,
    /// Short heading.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Whether an OK button is shown.
    pub has_ok: bool,
    /// Label on the OK button.
    pub ok_button_text: String,
    /// Whether a resource amount can be committed.
    pub uses_resource: bool,
    /// Commodity the resource amount refers to (empty when unused).
    pub used_resource_name: String,
    /// Whether an action button is shown.
    pub has_action_button: bool,
    /// Label on the action button (empty when unused).
    pub action_button_name: String,
    /// Commodity spent by the action button (empty when unused).
    pub action_button_resource_allocation: String,
}

impl EventPrompt {
    /// Build a complete prompt from its text and controls.
    pub fn new(
        message_id: MessageId,
        title: impl Into<String>,
        description: impl Into<String>,
        controls: PromptControls,
    ) -> Self {
        let mut prompt = Self {
            message_id,
            title: title.into(),
            description: description.into(),
            has_ok: true,
            ok_button_text: String::from("OK"),
            uses_resource: false,
            used_resource_name: String::new(),
            has_action_button: false,
            action_button_name: String::new(),
            action_button_resource_allocation: String::new(),
        };
        match controls {
            PromptControls::Acknowledge => {}
            PromptControls::Spend(commodity) => {
                prompt.uses_resource = true;
                prompt.used_resource_name = commodity.as_str().to_owned();
            }
            PromptControls::Action { label, allocates } => {
                prompt.has_action_button = true;
                prompt.action_button_name = label;
                prompt.action_button_resource_allocation = allocates.as_str().to_owned();
            }
        }
        prompt
    }
}
