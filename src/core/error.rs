//! Action rejections.
//!
//! Every rejection leaves the room untouched; the message is meant to be
//! shown to the player as-is.

use thiserror::Error;

use super::player::PlayerId;
use crate::cards::{CardId, Suit};
use crate::stages::StageKind;
use crate::track::Lane;

/// Why a player action was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{action} is not allowed during {actual}, only during {expected}")]
    WrongStage {
        action: &'static str,
        expected: StageKind,
        actual: StageKind,
    },

    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),

    #[error("{0} is not seated in this room")]
    UnknownPlayer(PlayerId),

    #[error("only the host can do that")]
    NotHost,

    #[error("{0} is not on the table")]
    CardNotFound(CardId),

    #[error("{0} has already been revealed")]
    CardAlreadyRevealed(CardId),

    #[error("{0} is not in your hand")]
    CardNotInHand(CardId),

    #[error("{card} matches neither the suit {suit} nor the rank on top of the pile")]
    IllegalPlay { card: String, suit: Suit },

    #[error("a toxic seven is active: play a 7 or draw {0} cards")]
    ToxicSevenActive(u8),

    #[error("a queen needs a called suit unless it is your last card")]
    MissingCalledSuit,

    #[error("{0} is not available")]
    LaneUnavailable(Lane),

    #[error("position {0} is in the start/finish and pit zone")]
    RestrictedPosition(u8),

    #[error("position {position} is within the first spaces of starting {lane}")]
    StartingLaneBuffer { position: u8, lane: Lane },

    #[error("a coin already sits at position {position} in {lane}")]
    PositionOccupied { position: u8, lane: Lane },

    #[error("position {0} is not on the track")]
    PositionOutOfRange(u8),

    #[error("{0} has no coins left to place")]
    NoCoinsLeft(PlayerId),

    #[error("there is no rolled movement to confirm")]
    NoPendingMovement,

    #[error("this stage is already complete")]
    StageComplete,
}
