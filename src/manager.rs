//! Stage manager: owns one room and runs it from dealer selection to the
//! end of each race.
//!
//! ## Stage order
//!
//! ```text
//! dealer-selection -> storm -> lane-selection -> coin -> racing
//!                       ^                                  |
//!                       +---------- next round ------------+
//! ```
//!
//! Lane selection only happens in round 0; later rounds keep their lanes
//! and go straight from Storm to coin placement. The dealer button never
//! moves once dealer selection has resolved.
//!
//! ## Randomness
//!
//! A room seed is split into three streams: `cards` for dealer selection
//! and Storm, `dice` for racing and `purse` for coin values. Extra shuffles
//! never shift later dice rolls.

use im::Vector;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::{
    ActionError, ActionRecord, ConfigError, GameRng, GameSettings, PlayerAction, PlayerId,
    PlayerMap, Roster,
};
use crate::rules::StageContext;
use crate::stages::{
    CoinStageState, DealerSelectionState, LaneSelectionState, RacingState, Stage, StageKind,
    StormState,
};
use crate::track::Lane;

/// Authoritative state of one room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub roster: Roster,
    pub settings: GameSettings,
    /// Completed races so far.
    pub round_number: u32,
    pub dealer_button: Option<PlayerId>,
    /// Finishing order of the latest Storm.
    pub storm_winning_order: Vec<PlayerId>,
    /// Starting lanes, fixed after the first lane selection.
    pub selected_lanes: PlayerMap<Lane>,
    pub stage: Stage,
    /// Final standings of each completed race.
    pub race_history: Vec<Vec<PlayerId>>,
    /// Accepted actions, oldest first.
    pub history: Vector<ActionRecord>,
    next_sequence: u64,
    next_coin_id: u32,
}

/// What an accepted action did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReceipt {
    /// Room-wide sequence number of the action.
    pub sequence: u64,
    /// Stage the room is in after the action.
    pub stage: StageKind,
    /// Set when the action completed a stage.
    pub transition: Option<StageTransition>,
}

/// A stage change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: StageKind,
    pub to: StageKind,
}

/// Snapshot encoding failure.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Everything a client needs to redraw the room.
///
/// The action history is left out; read it from [`StageManager::history`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub roster: Roster,
    pub settings: GameSettings,
    pub round_number: u32,
    pub dealer_button: Option<PlayerId>,
    pub storm_winning_order: Vec<PlayerId>,
    pub selected_lanes: PlayerMap<Lane>,
    pub stage: Stage,
    pub current_actor: Option<PlayerId>,
    pub race_history: Vec<Vec<PlayerId>>,
    /// Sequence number of the last accepted action, 0 before any.
    pub last_sequence: u64,
}

impl RoomSnapshot {
    /// Encode for the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a snapshot produced by [`RoomSnapshot::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Runs one room.
///
/// ## Example
///
/// ```
/// use speedway::core::{GameSettings, Player, PlayerColor, PlayerId, Roster};
/// use speedway::manager::StageManager;
/// use speedway::stages::StageKind;
///
/// let roster = Roster::new(vec![
///     Player::new(PlayerId::new(1), "Ada", PlayerColor::Red, 1).host(),
///     Player::new(PlayerId::new(2), "Bo", PlayerColor::Blue, 2),
/// ])
/// .unwrap();
/// let manager = StageManager::new(roster, GameSettings::default(), 42).unwrap();
///
/// assert_eq!(manager.stage_kind(), StageKind::DealerSelection);
/// assert_eq!(manager.current_actor(), Some(PlayerId::new(1)));
/// ```
#[derive(Clone, Debug)]
pub struct StageManager {
    state: GameState,
    cards_rng: GameRng,
    dice_rng: GameRng,
    purse_rng: GameRng,
}

impl StageManager {
    /// Open a room in dealer selection.
    pub fn new(roster: Roster, settings: GameSettings, seed: u64) -> Result<Self, ConfigError> {
        settings.validate()?;

        let root = GameRng::new(seed);
        let mut cards_rng = root.for_context("cards");
        let dice_rng = root.for_context("dice");
        let purse_rng = root.for_context("purse");

        let stage = Stage::DealerSelection(DealerSelectionState::new(roster.seat_order(), &mut cards_rng));
        info!(players = roster.len(), seed, "room opened");

        Ok(Self {
            state: GameState {
                roster,
                settings,
                round_number: 0,
                dealer_button: None,
                storm_winning_order: Vec::new(),
                selected_lanes: PlayerMap::empty(),
                stage,
                race_history: Vec::new(),
                history: Vector::new(),
                next_sequence: 1,
                next_coin_id: 0,
            },
            cards_rng,
            dice_rng,
            purse_rng,
        })
    }

    /// Full room state.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Current stage state.
    #[must_use]
    pub fn stage(&self) -> &Stage {
        &self.state.stage
    }

    #[must_use]
    pub fn stage_kind(&self) -> StageKind {
        self.state.stage.kind()
    }

    /// Player the room is waiting on.
    #[must_use]
    pub fn current_actor(&self) -> Option<PlayerId> {
        self.state.stage.rules().current_actor()
    }

    /// Accepted actions, oldest first.
    #[must_use]
    pub fn history(&self) -> &Vector<ActionRecord> {
        &self.state.history
    }

    /// Update a player's connection flag. Turn order is unaffected.
    pub fn set_connected(&mut self, player: PlayerId, connected: bool) -> bool {
        self.state.roster.set_connected(player, connected)
    }

    /// Validate and apply an action, then transition if the stage is done.
    ///
    /// A rejected action leaves the room unchanged.
    pub fn handle_action(&mut self, player: PlayerId, action: PlayerAction) -> Result<ActionReceipt, ActionError> {
        if !self.state.roster.contains(player) {
            return Err(ActionError::UnknownPlayer(player));
        }
        let expected = StageKind::for_action(&action);
        let actual = self.state.stage.kind();
        if expected != actual {
            return Err(ActionError::WrongStage {
                action: action.name(),
                expected,
                actual,
            });
        }

        let rng = match actual {
            StageKind::DealerSelection | StageKind::Storm => &mut self.cards_rng,
            StageKind::Coin => &mut self.purse_rng,
            StageKind::LaneSelection | StageKind::Racing => &mut self.dice_rng,
        };
        let mut ctx = StageContext::new(&self.state.roster, &self.state.settings, rng);
        self.state.stage.rules_mut().apply(&mut ctx, player, &action)?;

        let sequence = self.state.next_sequence;
        self.state.next_sequence += 1;
        debug!(player = %player, action = action.name(), sequence, "action accepted");
        self.state
            .history
            .push_back(ActionRecord::new(player, action, self.state.round_number, sequence));

        let transition = if self.state.stage.rules().is_complete() {
            Some(self.advance())
        } else {
            None
        };

        Ok(ActionReceipt {
            sequence,
            stage: self.stage_kind(),
            transition,
        })
    }

    /// Pull the state clients need after a mutation.
    #[must_use]
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            roster: self.state.roster.clone(),
            settings: self.state.settings.clone(),
            round_number: self.state.round_number,
            dealer_button: self.state.dealer_button,
            storm_winning_order: self.state.storm_winning_order.clone(),
            selected_lanes: self.state.selected_lanes.clone(),
            stage: self.state.stage.clone(),
            current_actor: self.current_actor(),
            race_history: self.state.race_history.clone(),
            last_sequence: self.state.next_sequence - 1,
        }
    }

    /// Replace the completed stage with the next one.
    fn advance(&mut self) -> StageTransition {
        let from = self.state.stage.kind();
        let seats = self.state.roster.seat_order();
        let state = &mut self.state;

        let next = match &state.stage {
            Stage::DealerSelection(dealer) => {
                debug_assert!(dealer.dealer.is_some(), "dealer selection completed without a dealer");
                state.dealer_button = dealer.dealer;
                let button = state.dealer_button.unwrap_or(seats[0]);
                Stage::Storm(StormState::new(seats, button, &state.settings, &mut self.cards_rng))
            }
            Stage::Storm(storm) => {
                debug_assert_eq!(storm.finishing_order.len(), state.roster.len());
                state.storm_winning_order = storm.finishing_order.clone();
                if state.round_number == 0 {
                    Stage::LaneSelection(LaneSelectionState::new(state.storm_winning_order.clone()))
                } else {
                    Stage::Coin(open_coin_stage(state, &mut self.purse_rng))
                }
            }
            Stage::LaneSelection(lanes) => {
                state.selected_lanes = lanes.selected_lanes.clone();
                Stage::Coin(open_coin_stage(state, &mut self.purse_rng))
            }
            Stage::Coin(coins) => Stage::Racing(RacingState::new(
                state.storm_winning_order.clone(),
                &state.selected_lanes,
                coins.placed_coins.clone(),
                &state.settings,
            )),
            Stage::Racing(racing) => {
                state.race_history.push(racing.standings.clone());
                state.round_number += 1;
                info!(round = state.round_number, standings = ?racing.standings, "race complete");
                let button = state.dealer_button.unwrap_or(seats[0]);
                Stage::Storm(StormState::new(seats, button, &state.settings, &mut self.cards_rng))
            }
        };

        state.stage = next;
        let to = state.stage.kind();
        info!(%from, %to, round = state.round_number, "stage transition");
        StageTransition { from, to }
    }
}

fn open_coin_stage(state: &mut GameState, purse: &mut GameRng) -> CoinStageState {
    let coins = CoinStageState::new(
        state.storm_winning_order.clone(),
        &state.selected_lanes,
        state.settings.number_of_coins,
        state.next_coin_id,
        purse,
    );
    state.next_coin_id += coins
        .coin_distribution
        .values()
        .map(|n| u32::from(*n))
        .sum::<u32>();
    coins
}
