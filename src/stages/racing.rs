//! Racing: dice, movement, pit rules, coins and lap counting.
//!
//! ## Turn protocol
//!
//! A turn is two actions. `ROLL_DICE` rolls and computes where the pawn
//! would end up, storing it as the pending movement without touching the
//! pawn. `CONFIRM_MOVEMENT` commits it, resolves coins and passes the turn.
//! Rolling again before confirming replaces the pending movement.
//!
//! ## Movement
//!
//! - On track, the standard roll moves cell by cell and stops behind the
//!   first pawn in the way.
//! - The lane-change die shows L1, R1, L2, R2 or check-engine (two faces).
//!   L moves toward lane 1. The full shift is tried first, then smaller
//!   shifts in the same direction.
//! - From the pit a single die is rolled: 6 hits the wall, 1-5 enters the
//!   pit lane at that cell.
//! - In the pit lane a standard roll past cell 5 crashes back into the pit;
//!   R1/R2 merge onto position 1 of the pawn's lane if it is free.
//!
//! ## Laps
//!
//! Pawns start on the grid at 96 with lap 0. Every forward 96 to 1
//! crossing adds a lap and every backward 1 to 96 crossing takes one away,
//! so the first crossing only leaves the grid: laps completed is
//! `lap_number - 1`.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Reverse;
use tracing::{debug, info};

use crate::core::{
    ActionError, DiceKind, FinishedRacerTurns, GameRng, GameSettings, PlayerAction, PlayerId,
    PlayerMap,
};
use crate::rules::{StageContext, StageRules};
use crate::stages::coins::{Coin, CoinId};
use crate::stages::StageKind;
use crate::track::{
    self, Coordinates, Lane, Spot, PIT_BAYS, PIT_LANE_CELLS, START_POSITION,
};

/// Faces on each movement die.
pub const DIE_FACES: u8 = 6;

/// Where a pawn is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PawnPosition {
    /// Main-track position 1..=96.
    Track(u8),
    Pit,
    PitLane,
}

/// A racer's pawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PawnState {
    pub player: PlayerId,
    pub position: PawnPosition,
    pub lane: Lane,
    pub lap_number: u8,
    pub coordinates: Coordinates,
    /// Bay (1-4) while in the pit, cell (1-5) while in the pit lane.
    pub pit_position: Option<u8>,
}

impl PawnState {
    /// Pawn on the start grid in `lane`.
    #[must_use]
    pub fn on_grid(player: PlayerId, lane: Lane) -> Self {
        let mut pawn = Self {
            player,
            position: PawnPosition::Track(START_POSITION),
            lane,
            lap_number: 0,
            coordinates: Coordinates::default(),
            pit_position: None,
        };
        pawn.locate();
        pawn
    }

    /// Track cell, if on the main track.
    #[must_use]
    pub fn spot(&self) -> Option<Spot> {
        match self.position {
            PawnPosition::Track(position) => Some(Spot::new(position, self.lane)),
            PawnPosition::Pit | PawnPosition::PitLane => None,
        }
    }

    /// Full laps driven since leaving the grid.
    #[must_use]
    pub fn laps_completed(&self) -> u8 {
        self.lap_number.saturating_sub(1)
    }

    /// Recompute board coordinates from position.
    pub fn locate(&mut self) {
        let coords = match self.position {
            PawnPosition::Track(position) => track::coordinates(position, self.lane),
            PawnPosition::Pit => self.pit_position.and_then(track::pit_coordinates),
            PawnPosition::PitLane => self.pit_position.and_then(track::pit_lane_coordinates),
        };
        self.coordinates = coords.unwrap_or_default();
    }

    fn standing_position(&self) -> u8 {
        match self.position {
            PawnPosition::Track(position) => position,
            PawnPosition::Pit | PawnPosition::PitLane => 0,
        }
    }

    fn add_laps(&mut self, delta: i8) {
        self.lap_number = if delta >= 0 {
            self.lap_number.saturating_add(delta.unsigned_abs())
        } else {
            self.lap_number.saturating_sub(delta.unsigned_abs())
        };
    }
}

/// Face of the lane-change die.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneChangeFace {
    L1,
    R1,
    L2,
    R2,
    #[serde(rename = "check-engine")]
    CheckEngine,
}

impl LaneChangeFace {
    /// Die layout, face 1 first.
    pub const FACES: [LaneChangeFace; 6] = [
        LaneChangeFace::L1,
        LaneChangeFace::R1,
        LaneChangeFace::L2,
        LaneChangeFace::R2,
        LaneChangeFace::CheckEngine,
        LaneChangeFace::CheckEngine,
    ];

    /// Face shown for a die value 1..=6.
    #[must_use]
    pub fn from_roll(value: u8) -> Self {
        let idx = usize::from(value.clamp(1, DIE_FACES) - 1);
        Self::FACES[idx]
    }

    /// Signed lane shift; negative is toward lane 1.
    #[must_use]
    pub const fn shift(self) -> Option<i8> {
        match self {
            LaneChangeFace::L1 => Some(-1),
            LaneChangeFace::R1 => Some(1),
            LaneChangeFace::L2 => Some(-2),
            LaneChangeFace::R2 => Some(2),
            LaneChangeFace::CheckEngine => None,
        }
    }
}

/// What the dice showed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiceResult {
    Standard(SmallVec<[u8; 2]>),
    LaneChange(LaneChangeFace),
}

impl DiceResult {
    /// Standard roll from the given faces.
    #[must_use]
    pub fn standard(faces: &[u8]) -> Self {
        DiceResult::Standard(SmallVec::from_slice(faces))
    }

    /// Which die was rolled.
    #[must_use]
    pub fn kind(&self) -> DiceKind {
        match self {
            DiceResult::Standard(_) => DiceKind::Standard,
            DiceResult::LaneChange(_) => DiceKind::LaneChange,
        }
    }

    /// Sum of a standard roll; 0 for the lane-change die.
    #[must_use]
    pub fn total(&self) -> u8 {
        match self {
            DiceResult::Standard(faces) => faces.iter().copied().fold(0, u8::saturating_add),
            DiceResult::LaneChange(_) => 0,
        }
    }
}

/// A roll by one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub player: PlayerId,
    pub result: DiceResult,
}

/// What stopped a pawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockedBy {
    Wall,
    Pawn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstruction {
    pub blocked_by: BlockedBy,
    pub final_position: PawnPosition,
}

/// Outcome of a roll, prospective until confirmed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementResult {
    /// The pawn changed position or lane.
    pub success: bool,
    pub new_position: PawnPosition,
    pub new_lane: Lane,
    pub new_coordinates: Coordinates,
    pub pit_position: Option<u8>,
    /// Coins revealed while resolving, in trigger order.
    pub coins_triggered: Vec<Coin>,
    /// Net start/finish crossings (forward minus backward).
    pub lap_delta: i8,
    /// The pawn crossed the start/finish line going forward.
    pub lap_completed: bool,
    pub race_finished: bool,
    pub obstruction: Option<Obstruction>,
}

impl MovementResult {
    fn from_pawn(pawn: &PawnState, moved: bool, lap_delta: i8, blocked_by: Option<BlockedBy>) -> Self {
        Self {
            success: moved,
            new_position: pawn.position,
            new_lane: pawn.lane,
            new_coordinates: pawn.coordinates,
            pit_position: pawn.pit_position,
            coins_triggered: Vec::new(),
            lap_delta,
            lap_completed: lap_delta > 0,
            race_finished: false,
            obstruction: blocked_by.map(|blocked_by| Obstruction {
                blocked_by,
                final_position: pawn.position,
            }),
        }
    }
}

/// A rolled but unconfirmed movement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingMovement {
    pub roll: DiceRoll,
    pub result: MovementResult,
}

#[derive(Default)]
struct Walk {
    moved: u8,
    lap_delta: i8,
    blocked: bool,
}

/// State of the racing stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RacingState {
    pub pawns: PlayerMap<PawnState>,
    /// Coins on the track, keyed by id.
    pub coins: FxHashMap<CoinId, Coin>,
    /// Storm finishing order; turns go round it.
    pub order: Vec<PlayerId>,
    pub current_racing_player: PlayerId,
    pub race_finished: bool,
    pub finishing_order: Vec<PlayerId>,
    /// Snapshot of everyone's placing taken when the first racer finished.
    pub standings: Vec<PlayerId>,
    pub lap_target: u8,
    pub number_of_dice: u8,
    pub finished_racer_turns: FinishedRacerTurns,
    pub pending_movement: Option<PendingMovement>,
    pub last_movement: Option<MovementResult>,
}

impl RacingState {
    /// Line pawns up on the grid and put the placed coins on the track.
    ///
    /// `order` must be non-empty. Players without a lane take lane 1.
    #[must_use]
    pub fn new(
        order: Vec<PlayerId>,
        lanes: &PlayerMap<Lane>,
        placed_coins: Vec<Coin>,
        settings: &GameSettings,
    ) -> Self {
        debug_assert!(!order.is_empty(), "racing needs players");

        let pawns = PlayerMap::new(order.iter().copied(), |player| {
            let lane = lanes.get(player).copied().unwrap_or(Lane::ALL[0]);
            PawnState::on_grid(player, lane)
        });
        let coins = placed_coins
            .into_iter()
            .filter(|c| c.spot.is_some())
            .map(|c| (c.id, c))
            .collect();

        Self {
            pawns,
            coins,
            current_racing_player: order[0],
            order,
            race_finished: false,
            finishing_order: Vec::new(),
            standings: Vec::new(),
            lap_target: settings.number_of_laps,
            number_of_dice: settings.number_of_dice,
            finished_racer_turns: settings.finished_racer_turns,
            pending_movement: None,
            last_movement: None,
        }
    }

    /// Roll the chosen die for `player` and store the prospective result.
    pub fn roll_dice(
        &mut self,
        player: PlayerId,
        kind: DiceKind,
        rng: &mut GameRng,
    ) -> Result<MovementResult, ActionError> {
        self.check_turn(player)?;

        let result = match kind {
            DiceKind::Standard => {
                let dice = match self.pawns[player].position {
                    PawnPosition::Pit => 1,
                    _ => self.number_of_dice,
                };
                DiceResult::Standard((0..dice).map(|_| rng.roll_die(DIE_FACES)).collect())
            }
            DiceKind::LaneChange => DiceResult::LaneChange(LaneChangeFace::from_roll(rng.roll_die(DIE_FACES))),
        };
        self.apply_roll(player, result)
    }

    /// Store the prospective result of an already-rolled die.
    pub fn apply_roll(&mut self, player: PlayerId, result: DiceResult) -> Result<MovementResult, ActionError> {
        self.check_turn(player)?;

        let movement = self.prospective(player, &result);
        debug!(
            player = %player,
            roll = ?result,
            position = ?movement.new_position,
            lane = movement.new_lane.number(),
            "dice rolled"
        );
        self.pending_movement = Some(PendingMovement {
            roll: DiceRoll { player, result },
            result: movement.clone(),
        });
        Ok(movement)
    }

    /// Commit the pending movement, resolve coins and pass the turn.
    pub fn confirm_movement(&mut self, player: PlayerId) -> Result<MovementResult, ActionError> {
        self.check_turn(player)?;
        let pending = match &self.pending_movement {
            Some(pending) if pending.roll.player == player => pending.clone(),
            _ => return Err(ActionError::NoPendingMovement),
        };
        self.pending_movement = None;

        let mut result = pending.result;
        {
            let pawn = &mut self.pawns[player];
            pawn.position = result.new_position;
            pawn.lane = result.new_lane;
            pawn.pit_position = result.pit_position;
            pawn.add_laps(result.lap_delta);
            pawn.locate();
        }

        if result.success {
            self.trigger_coins(player, &mut result);
        }

        let pawn = &self.pawns[player];
        result.new_position = pawn.position;
        result.new_lane = pawn.lane;
        result.new_coordinates = pawn.coordinates;
        result.pit_position = pawn.pit_position;
        result.lap_completed = result.lap_delta > 0;
        if let Some(obstruction) = result.obstruction.as_mut() {
            obstruction.final_position = pawn.position;
        }

        if pawn.laps_completed() >= self.lap_target && !self.finishing_order.contains(&player) {
            self.finish(player);
        }
        result.race_finished = self.race_finished;

        debug!(
            player = %player,
            position = ?result.new_position,
            lane = result.new_lane.number(),
            lap = self.pawns[player].lap_number,
            coins = result.coins_triggered.len(),
            "movement confirmed"
        );

        if !self.is_complete() {
            self.current_racing_player = self.next_racer_after(player);
        }
        self.last_movement = Some(result.clone());
        Ok(result)
    }

    fn check_turn(&self, player: PlayerId) -> Result<(), ActionError> {
        if self.is_complete() {
            return Err(ActionError::StageComplete);
        }
        if self.current_racing_player != player {
            return Err(ActionError::NotYourTurn(player));
        }
        Ok(())
    }

    /// Another pawn on the main track at `spot`.
    fn occupied_by_other(&self, mover: PlayerId, spot: Spot) -> bool {
        self.pawns
            .iter()
            .any(|(player, pawn)| player != mover && pawn.spot() == Some(spot))
    }

    /// Lowest pit bay nobody else is parked in.
    fn free_pit_bay(&self, mover: PlayerId) -> u8 {
        (1..=PIT_BAYS)
            .find(|bay| {
                !self.pawns.iter().any(|(player, pawn)| {
                    player != mover && pawn.position == PawnPosition::Pit && pawn.pit_position == Some(*bay)
                })
            })
            .unwrap_or(1)
    }

    /// Move a pawn cell by cell, stopping behind the first pawn in the way.
    fn walk(&self, pawn: &mut PawnState, steps: i8) -> Walk {
        let mut walk = Walk::default();
        let PawnPosition::Track(mut position) = pawn.position else {
            return walk;
        };
        let forward = steps > 0;

        for _ in 0..steps.unsigned_abs() {
            let next = if forward {
                track::next_position(position)
            } else {
                track::previous_position(position)
            };
            if self.occupied_by_other(pawn.player, Spot::new(next, pawn.lane)) {
                walk.blocked = true;
                break;
            }
            if forward && position == START_POSITION && next == 1 {
                walk.lap_delta += 1;
            } else if !forward && position == 1 && next == START_POSITION {
                walk.lap_delta -= 1;
            }
            position = next;
            walk.moved += 1;
        }

        pawn.position = PawnPosition::Track(position);
        pawn.add_laps(walk.lap_delta);
        pawn.locate();
        walk
    }

    /// Where a roll would take `player`'s pawn, without moving it.
    fn prospective(&self, player: PlayerId, roll: &DiceResult) -> MovementResult {
        let mut pawn = self.pawns[player].clone();
        let lap_before = pawn.lap_number;

        let (moved, blocked_by, lap_delta) = match (pawn.position, roll) {
            (PawnPosition::Track(_), DiceResult::Standard(_)) => {
                let steps = i8::try_from(roll.total()).unwrap_or(i8::MAX);
                let walk = self.walk(&mut pawn, steps);
                (walk.moved > 0, walk.blocked.then_some(BlockedBy::Pawn), walk.lap_delta)
            }
            (PawnPosition::Pit, DiceResult::Standard(_)) => {
                let total = roll.total();
                if total >= DIE_FACES {
                    (false, Some(BlockedBy::Wall), 0)
                } else {
                    pawn.position = PawnPosition::PitLane;
                    pawn.pit_position = Some(total.clamp(1, PIT_LANE_CELLS));
                    (true, None, 0)
                }
            }
            (PawnPosition::PitLane, DiceResult::Standard(_)) => {
                let cell = pawn.pit_position.unwrap_or(1).saturating_add(roll.total());
                if cell > PIT_LANE_CELLS {
                    pawn.position = PawnPosition::Pit;
                    pawn.pit_position = Some(self.free_pit_bay(player));
                    (true, Some(BlockedBy::Wall), 0)
                } else {
                    pawn.pit_position = Some(cell);
                    (roll.total() > 0, None, 0)
                }
            }
            (PawnPosition::Track(position), DiceResult::LaneChange(face)) => match face.shift() {
                None => (false, None, 0),
                Some(shift) => {
                    let direction = shift.signum();
                    let mut blocked_by = BlockedBy::Wall;
                    let mut moved = false;
                    for magnitude in (1..=shift.abs()).rev() {
                        match pawn.lane.offset(direction * magnitude) {
                            None => continue,
                            Some(target) if self.occupied_by_other(player, Spot::new(position, target)) => {
                                blocked_by = BlockedBy::Pawn;
                            }
                            Some(target) => {
                                pawn.lane = target;
                                moved = true;
                                break;
                            }
                        }
                    }
                    (moved, (!moved).then_some(blocked_by), 0)
                }
            },
            (PawnPosition::PitLane, DiceResult::LaneChange(face)) => {
                let merges = matches!(face, LaneChangeFace::R1 | LaneChangeFace::R2);
                if !merges {
                    (false, None, 0)
                } else if self.occupied_by_other(player, Spot::new(1, pawn.lane)) {
                    (false, Some(BlockedBy::Pawn), 0)
                } else {
                    pawn.position = PawnPosition::Track(1);
                    pawn.pit_position = None;
                    (true, None, 0)
                }
            }
            (PawnPosition::Pit, DiceResult::LaneChange(_)) => (false, None, 0),
        };

        pawn.locate();
        debug_assert_eq!(
            i16::from(pawn.lap_number),
            (i16::from(lap_before) + i16::from(lap_delta)).max(0),
        );
        MovementResult::from_pawn(&pawn, moved, lap_delta, blocked_by)
    }

    /// Reveal and apply coins under the pawn until it comes to rest on a
    /// cell without a hidden coin.
    fn trigger_coins(&mut self, player: PlayerId, result: &mut MovementResult) {
        loop {
            let Some(spot) = self.pawns[player].spot() else {
                break;
            };
            let Some(coin) = self
                .coins
                .values_mut()
                .find(|c| !c.is_revealed && c.spot == Some(spot))
            else {
                break;
            };
            coin.is_revealed = true;
            let coin = coin.clone();
            debug!(player = %player, coin = %coin.id, value = ?coin.value, "coin triggered");
            result.coins_triggered.push(coin.clone());

            match coin.value.offset() {
                Some(offset) => {
                    let mut pawn = self.pawns[player].clone();
                    let walk = self.walk(&mut pawn, offset);
                    self.pawns[player] = pawn;
                    result.lap_delta = result.lap_delta.saturating_add(walk.lap_delta);
                    if walk.blocked {
                        result.obstruction = Some(Obstruction {
                            blocked_by: BlockedBy::Pawn,
                            final_position: self.pawns[player].position,
                        });
                    }
                    if walk.moved == 0 {
                        break;
                    }
                }
                None => {
                    let bay = self.free_pit_bay(player);
                    let pawn = &mut self.pawns[player];
                    pawn.position = PawnPosition::Pit;
                    pawn.pit_position = Some(bay);
                    pawn.locate();
                    break;
                }
            }
        }
    }

    fn finish(&mut self, player: PlayerId) {
        self.finishing_order.push(player);
        info!(player = %player, place = self.finishing_order.len(), "racer finished");

        if !self.race_finished {
            self.race_finished = true;
            self.standings = self.compute_standings();
            info!(standings = ?self.standings, "race finished");
        }
    }

    /// Everyone ordered by laps, then distance round the lap. Pit and pit
    /// lane count as position 0; remaining ties keep Storm order.
    #[must_use]
    pub fn compute_standings(&self) -> Vec<PlayerId> {
        let mut standings = self.order.clone();
        standings.sort_by_key(|player| {
            let pawn = &self.pawns[*player];
            (Reverse(pawn.lap_number), Reverse(pawn.standing_position()))
        });
        standings
    }

    fn next_racer_after(&self, player: PlayerId) -> PlayerId {
        let n = self.order.len();
        let start = self.order.iter().position(|p| *p == player).unwrap_or(0);
        (1..=n)
            .map(|step| self.order[(start + step) % n])
            .find(|candidate| match self.finished_racer_turns {
                FinishedRacerTurns::Keep => true,
                FinishedRacerTurns::Skip => !self.finishing_order.contains(candidate),
            })
            .unwrap_or(player)
    }
}

impl StageRules for RacingState {
    fn kind(&self) -> StageKind {
        StageKind::Racing
    }

    fn apply(
        &mut self,
        ctx: &mut StageContext<'_>,
        player: PlayerId,
        action: &PlayerAction,
    ) -> Result<(), ActionError> {
        match action {
            PlayerAction::RollDice { dice_type } => self.roll_dice(player, *dice_type, ctx.rng).map(|_| ()),
            PlayerAction::ConfirmMovement => self.confirm_movement(player).map(|_| ()),
            other => Err(self.wrong_stage(other)),
        }
    }

    /// Every racer has reached the lap target.
    fn is_complete(&self) -> bool {
        self.finishing_order.len() == self.order.len()
    }

    fn current_actor(&self) -> Option<PlayerId> {
        (!self.is_complete()).then_some(self.current_racing_player)
    }
}
