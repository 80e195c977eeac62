//! Core engine types: players, roster, actions, errors, RNG, configuration.
//!
//! Nothing here knows about individual stages beyond the action shapes;
//! the stage engines in [`crate::stages`] build on these.

pub mod action;
pub mod config;
pub mod error;
pub mod player;
pub mod rng;
pub mod roster;

pub use action::{ActionRecord, DiceKind, PlayerAction};
pub use config::{ConfigError, DeckCount, FinishedRacerTurns, GameSettings};
pub use error::ActionError;
pub use player::{PlayerId, PlayerMap};
pub use rng::GameRng;
pub use roster::{Player, PlayerColor, Roster, RosterError, MAX_PLAYERS, MIN_PLAYERS};
