//! # speedway
//!
//! Authoritative stage engine for a 2-4 player card-and-racing board game.
//!
//! A room moves through five stages: dealer selection, Storm (a
//! card-shedding game), lane selection, coin placement and the race. The
//! Storm finishing order seeds the turn order of every later stage.
//!
//! ## Design Principles
//!
//! 1. **Engine owns truth**: every player action is validated against the
//!    current stage before anything changes. Rejections are side-effect
//!    free, RNG included.
//!
//! 2. **One stage at a time**: room state carries exactly one stage state
//!    ([`stages::Stage`]), so an action for the wrong stage is a match arm,
//!    not a missing field.
//!
//! 3. **Pull, don't push**: the caller broadcasts a
//!    [`manager::RoomSnapshot`] after each accepted action. The engine does
//!    no I/O.
//!
//! ## Architecture
//!
//! - **Per-room ownership**: a [`StageManager`] owns one room. Rooms share
//!   nothing, so separate rooms can run on separate threads.
//!
//! - **Persistent Data Structures**: per-player maps and the action history
//!   use `im-rs`, so snapshots clone in O(1).
//!
//! - **Deterministic RNG**: one seed per room, split into card, dice and
//!   purse streams.
//!
//! ## Modules
//!
//! - `core`: Players, roster, settings, actions, errors, RNG
//! - `cards`: Card model and deck
//! - `track`: Lanes, positions and board coordinates
//! - `rules`: `StageRules` trait every stage engine implements
//! - `stages`: The five stage engines
//! - `manager`: Stage manager and room snapshots

pub mod cards;
pub mod core;
pub mod manager;
pub mod rules;
pub mod stages;
pub mod track;

// Re-export commonly used types
pub use crate::core::{
    ActionError, ActionRecord, ConfigError, DeckCount, DiceKind, FinishedRacerTurns, GameRng,
    GameSettings, Player, PlayerAction, PlayerColor, PlayerId, PlayerMap, Roster, RosterError,
};

pub use crate::cards::{Card, CardId, Deck, Rank, Suit};

pub use crate::track::{Coordinates, Lane, Segment, Spot};

pub use crate::rules::{StageContext, StageRules};

pub use crate::stages::{
    Coin, CoinId, CoinStageState, CoinValue, DealerSelectionState, DiceResult, LaneChangeFace,
    LaneSelectionState, MovementResult, PawnPosition, PawnState, RacingState, Stage, StageKind,
    StormState,
};

pub use crate::manager::{ActionReceipt, GameState, RoomSnapshot, StageManager, StageTransition};
