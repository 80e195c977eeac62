//! Coin stage: players hide coins on the track before the race.
//!
//! The Storm winner draws the configured number of coins, each later place
//! one fewer (never below one). Coin values come from an unlimited purse.
//! Players then place one coin per turn in Storm order, skipping anyone
//! who has nothing left to place.
//!
//! ## Placement rules
//!
//! Checked in this order:
//! 1. positions 93-96 are the start/finish and pit zone
//! 2. positions 1-6 of a lane somebody starts in stay clear
//! 3. one coin per cell

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info};

use crate::core::{ActionError, GameRng, PlayerAction, PlayerId, PlayerMap};
use crate::rules::{StageContext, StageRules};
use crate::stages::StageKind;
use crate::track::{self, Coordinates, Lane, Spot, LAST_COIN_POSITION, START_BUFFER};

/// Coin identifier, unique within a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoinId(pub u32);

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "coin-{}", self.0)
    }
}

/// Face value of a coin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoinValue {
    #[serde(rename = "+2")]
    Plus2,
    #[serde(rename = "+3")]
    Plus3,
    #[serde(rename = "+4")]
    Plus4,
    #[serde(rename = "+5")]
    Plus5,
    #[serde(rename = "-2")]
    Minus2,
    #[serde(rename = "-3")]
    Minus3,
    #[serde(rename = "-4")]
    Minus4,
    #[serde(rename = "-5")]
    Minus5,
    #[serde(rename = "tow-to-pit")]
    TowToPit,
}

impl CoinValue {
    /// Every value in the purse, equally likely.
    pub const ALL: [CoinValue; 9] = [
        CoinValue::Plus2,
        CoinValue::Plus3,
        CoinValue::Plus4,
        CoinValue::Plus5,
        CoinValue::Minus2,
        CoinValue::Minus3,
        CoinValue::Minus4,
        CoinValue::Minus5,
        CoinValue::TowToPit,
    ];

    /// Spaces moved when triggered; `None` for tow-to-pit.
    #[must_use]
    pub const fn offset(self) -> Option<i8> {
        match self {
            CoinValue::Plus2 => Some(2),
            CoinValue::Plus3 => Some(3),
            CoinValue::Plus4 => Some(4),
            CoinValue::Plus5 => Some(5),
            CoinValue::Minus2 => Some(-2),
            CoinValue::Minus3 => Some(-3),
            CoinValue::Minus4 => Some(-4),
            CoinValue::Minus5 => Some(-5),
            CoinValue::TowToPit => None,
        }
    }

    /// Draw a value uniformly from the purse.
    pub fn draw(rng: &mut GameRng) -> Self {
        Self::ALL[rng.gen_range_usize(0..Self::ALL.len())]
    }
}

/// A coin, held by its owner until placed on a track cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub id: CoinId,
    pub value: CoinValue,
    pub owner: PlayerId,
    /// Cell the coin was placed on; `None` while still held.
    pub spot: Option<Spot>,
    pub coordinates: Option<Coordinates>,
    /// Set once a pawn has triggered it. Revealed coins never trigger again.
    pub is_revealed: bool,
}

impl Coin {
    #[must_use]
    pub fn new(id: CoinId, value: CoinValue, owner: PlayerId) -> Self {
        Self {
            id,
            value,
            owner,
            spot: None,
            coordinates: None,
            is_revealed: false,
        }
    }
}

/// Coins awarded for finishing Storm in place `index` (0 = winner).
#[must_use]
pub fn coins_awarded(base: u8, index: usize) -> u8 {
    let index = u8::try_from(index).unwrap_or(u8::MAX);
    base.saturating_sub(index).max(1)
}

/// State of the coin stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoinStageState {
    /// Storm finishing order; also the placement order.
    pub order: Vec<PlayerId>,
    /// Lanes somebody starts the race in.
    pub starting_lanes: Vec<Lane>,
    pub coin_distribution: PlayerMap<u8>,
    /// Coins still held, placed front first.
    pub drawn_coins: PlayerMap<VecDeque<Coin>>,
    pub placed_coins: Vec<Coin>,
    pub current_placer: Option<PlayerId>,
    pub all_coins_placed: bool,
    occupied: FxHashSet<Spot>,
}

impl CoinStageState {
    /// Award and draw coins for every player.
    ///
    /// `first_coin_id` keeps ids unique across rounds.
    #[must_use]
    pub fn new(
        order: Vec<PlayerId>,
        lanes: &PlayerMap<Lane>,
        base_coins: u8,
        first_coin_id: u32,
        rng: &mut GameRng,
    ) -> Self {
        let mut next_id = first_coin_id;
        let mut coin_distribution = PlayerMap::empty();
        let mut drawn_coins = PlayerMap::empty();

        for (idx, player) in order.iter().enumerate() {
            let count = coins_awarded(base_coins, idx);
            let coins: VecDeque<Coin> = (0..count)
                .map(|_| {
                    let coin = Coin::new(CoinId(next_id), CoinValue::draw(rng), *player);
                    next_id += 1;
                    coin
                })
                .collect();
            coin_distribution.insert(*player, count);
            drawn_coins.insert(*player, coins);
        }

        let mut starting_lanes: Vec<Lane> = lanes.values().copied().collect();
        starting_lanes.sort();
        starting_lanes.dedup();

        let mut state = Self {
            current_placer: None,
            order,
            starting_lanes,
            coin_distribution,
            drawn_coins,
            placed_coins: Vec::new(),
            all_coins_placed: false,
            occupied: FxHashSet::default(),
        };
        state.current_placer = state.order.iter().copied().find(|p| state.holds_coins(*p));
        state.all_coins_placed = state.current_placer.is_none();
        info!(distribution = ?state.coin_distribution, "coins drawn");
        state
    }

    /// Coins `player` still has to place.
    #[must_use]
    pub fn coins_left(&self, player: PlayerId) -> usize {
        self.drawn_coins.get(player).map_or(0, VecDeque::len)
    }

    /// True if a coin sits on the cell.
    #[must_use]
    pub fn is_occupied(&self, spot: Spot) -> bool {
        self.occupied.contains(&spot)
    }

    /// Check a placement without performing it.
    pub fn check_placement(&self, position: u8, lane: Lane) -> Result<Spot, ActionError> {
        if !track::is_track_position(position) {
            return Err(ActionError::PositionOutOfRange(position));
        }
        if position > LAST_COIN_POSITION {
            return Err(ActionError::RestrictedPosition(position));
        }
        if position <= START_BUFFER && self.starting_lanes.contains(&lane) {
            return Err(ActionError::StartingLaneBuffer { position, lane });
        }
        let spot = Spot::new(position, lane);
        if self.is_occupied(spot) {
            return Err(ActionError::PositionOccupied { position, lane });
        }
        Ok(spot)
    }

    /// Place `player`'s next coin.
    pub fn place_coin(&mut self, player: PlayerId, position: u8, lane: Lane) -> Result<CoinId, ActionError> {
        if self.all_coins_placed {
            return Err(ActionError::StageComplete);
        }
        if self.current_placer != Some(player) {
            return Err(ActionError::NotYourTurn(player));
        }
        let spot = self.check_placement(position, lane)?;

        let mut coin = self
            .drawn_coins
            .get_mut(player)
            .and_then(VecDeque::pop_front)
            .ok_or(ActionError::NoCoinsLeft(player))?;
        coin.spot = Some(spot);
        coin.coordinates = spot.coordinates();
        let id = coin.id;
        debug!(player = %player, coin = %id, position, lane = lane.number(), "coin placed");
        self.placed_coins.push(coin);
        self.occupied.insert(spot);

        self.current_placer = self.next_placer_after(player);
        if self.current_placer.is_none() {
            self.all_coins_placed = true;
            info!(coins = self.placed_coins.len(), "all coins placed");
        }
        Ok(id)
    }

    fn holds_coins(&self, player: PlayerId) -> bool {
        self.coins_left(player) > 0
    }

    fn next_placer_after(&self, player: PlayerId) -> Option<PlayerId> {
        let n = self.order.len();
        let start = self.order.iter().position(|p| *p == player)?;
        (1..=n)
            .map(|step| self.order[(start + step) % n])
            .find(|p| self.holds_coins(*p))
    }
}

impl StageRules for CoinStageState {
    fn kind(&self) -> StageKind {
        StageKind::Coin
    }

    fn apply(
        &mut self,
        _ctx: &mut StageContext<'_>,
        player: PlayerId,
        action: &PlayerAction,
    ) -> Result<(), ActionError> {
        match action {
            PlayerAction::PlaceCoin { position, lane } => self.place_coin(player, *position, *lane).map(|_| ()),
            other => Err(self.wrong_stage(other)),
        }
    }

    fn is_complete(&self) -> bool {
        self.all_coins_placed
    }

    fn current_actor(&self) -> Option<PlayerId> {
        self.current_placer
    }
}
