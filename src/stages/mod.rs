//! The five stage engines and the tagged stage state a room carries.
//!
//! Exactly one stage state exists at a time; [`Stage`] is the sum type
//! over them, so handing an action to the wrong stage is a match arm
//! rather than a missing-field check.

pub mod coins;
pub mod dealer;
pub mod lanes;
pub mod racing;
pub mod storm;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::PlayerAction;
use crate::rules::StageRules;

pub use coins::{Coin, CoinId, CoinStageState, CoinValue};
pub use dealer::DealerSelectionState;
pub use lanes::LaneSelectionState;
pub use racing::{
    BlockedBy, DiceResult, DiceRoll, LaneChangeFace, MovementResult, Obstruction, PawnPosition,
    PawnState, PendingMovement, RacingState,
};
pub use storm::StormState;

/// Which stage a room is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    DealerSelection,
    Storm,
    LaneSelection,
    Coin,
    Racing,
}

impl StageKind {
    /// Stage that accepts the given action.
    #[must_use]
    pub fn for_action(action: &PlayerAction) -> Self {
        match action {
            PlayerAction::SelectDealerCard { .. } | PlayerAction::RedealDealerCards => {
                StageKind::DealerSelection
            }
            PlayerAction::PlayCard { .. } | PlayerAction::DrawCards => StageKind::Storm,
            PlayerAction::SelectLane { .. } => StageKind::LaneSelection,
            PlayerAction::PlaceCoin { .. } => StageKind::Coin,
            PlayerAction::RollDice { .. } | PlayerAction::ConfirmMovement => StageKind::Racing,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::DealerSelection => "dealer-selection",
            StageKind::Storm => "storm",
            StageKind::LaneSelection => "lane-selection",
            StageKind::Coin => "coin",
            StageKind::Racing => "racing",
        };
        write!(f, "{name}")
    }
}

/// Per-stage state of a room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Stage {
    DealerSelection(DealerSelectionState),
    Storm(StormState),
    LaneSelection(LaneSelectionState),
    Coin(CoinStageState),
    Racing(RacingState),
}

impl Stage {
    /// Kind tag of this stage.
    #[must_use]
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::DealerSelection(_) => StageKind::DealerSelection,
            Stage::Storm(_) => StageKind::Storm,
            Stage::LaneSelection(_) => StageKind::LaneSelection,
            Stage::Coin(_) => StageKind::Coin,
            Stage::Racing(_) => StageKind::Racing,
        }
    }

    /// Rules engine for this stage.
    #[must_use]
    pub fn rules(&self) -> &dyn StageRules {
        match self {
            Stage::DealerSelection(state) => state,
            Stage::Storm(state) => state,
            Stage::LaneSelection(state) => state,
            Stage::Coin(state) => state,
            Stage::Racing(state) => state,
        }
    }

    /// Mutable rules engine for this stage.
    pub fn rules_mut(&mut self) -> &mut dyn StageRules {
        match self {
            Stage::DealerSelection(state) => state,
            Stage::Storm(state) => state,
            Stage::LaneSelection(state) => state,
            Stage::Coin(state) => state,
            Stage::Racing(state) => state,
        }
    }
}
