//! Inbound player actions and the accepted-action history.
//!
//! Actions arrive from the transport layer already attributed to the
//! authenticated sender. They are tagged by `type` on the wire:
//!
//! ```
//! use speedway::core::PlayerAction;
//!
//! let action: PlayerAction = serde_json::from_str(r#"{"type":"SELECT_LANE","lane":3}"#).unwrap();
//! assert_eq!(action.name(), "SELECT_LANE");
//! ```

use serde::{Deserialize, Serialize};

use super::player::PlayerId;
use crate::cards::{CardId, Suit};
use crate::track::Lane;

/// Which racing die to roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiceKind {
    /// Movement dice (one or two six-sided dice).
    Standard,
    /// The lane-change die.
    LaneChange,
}

/// A player-submitted action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum PlayerAction {
    /// Reveal one face-down card of the dealer-selection grid.
    SelectDealerCard { card_id: CardId },
    /// Host-only: throw away the grid and start dealer selection over.
    RedealDealerCards,
    /// Play a card from hand onto the Storm discard pile.
    PlayCard {
        card_id: CardId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        called_suit: Option<Suit>,
    },
    /// Draw from the Storm stock (one card, or the toxic penalty).
    DrawCards,
    /// Claim a starting lane.
    SelectLane { lane: Lane },
    /// Put the next held coin on the track.
    PlaceCoin { position: u8, lane: Lane },
    /// Roll a racing die; the result waits for confirmation.
    RollDice { dice_type: DiceKind },
    /// Commit the pending movement.
    ConfirmMovement,
}

impl PlayerAction {
    /// Wire name of this action.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PlayerAction::SelectDealerCard { .. } => "SELECT_DEALER_CARD",
            PlayerAction::RedealDealerCards => "REDEAL_DEALER_CARDS",
            PlayerAction::PlayCard { .. } => "PLAY_CARD",
            PlayerAction::DrawCards => "DRAW_CARDS",
            PlayerAction::SelectLane { .. } => "SELECT_LANE",
            PlayerAction::PlaceCoin { .. } => "PLACE_COIN",
            PlayerAction::RollDice { .. } => "ROLL_DICE",
            PlayerAction::ConfirmMovement => "CONFIRM_MOVEMENT",
        }
    }
}

/// An accepted action with ordering metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// The player who took this action.
    pub player: PlayerId,

    /// The action taken.
    pub action: PlayerAction,

    /// Round number when the action was accepted.
    pub round: u32,

    /// Room-wide sequence number.
    pub sequence: u64,
}

impl ActionRecord {
    /// Create a new action record.
    #[must_use]
    pub fn new(player: PlayerId, action: PlayerAction, round: u32, sequence: u64) -> Self {
        Self {
            player,
            action,
            round,
            sequence,
        }
    }
}
