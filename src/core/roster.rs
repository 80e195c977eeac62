//! Room roster as handed over by the lobby layer.
//!
//! The roster is read-only to the engine: seat slots give the canonical
//! turn order for dealer selection and Storm, and everything after Storm
//! orders players by their Storm finishing order instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::player::PlayerId;

/// Fewest players a room can start with.
pub const MIN_PLAYERS: usize = 2;
/// Most players a room can hold.
pub const MAX_PLAYERS: usize = 4;

/// Pawn colour, unique within a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerColor {
    Yellow,
    Orange,
    Red,
    Pink,
    Purple,
    Blue,
    Green,
    Black,
}

impl PlayerColor {
    /// All colours in lobby order.
    pub const ALL: [PlayerColor; 8] = [
        PlayerColor::Yellow,
        PlayerColor::Orange,
        PlayerColor::Red,
        PlayerColor::Pink,
        PlayerColor::Purple,
        PlayerColor::Blue,
        PlayerColor::Green,
        PlayerColor::Black,
    ];
}

/// A seated participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    /// Seat slot (1..=4), stable for the life of the room.
    pub slot: u8,
    pub is_host: bool,
    pub is_connected: bool,
}

impl Player {
    /// Create a connected, non-host player.
    pub fn new(id: PlayerId, name: impl Into<String>, color: PlayerColor, slot: u8) -> Self {
        Self {
            id,
            name: name.into(),
            color,
            slot,
            is_host: false,
            is_connected: true,
        }
    }

    /// Mark this player as the room host.
    #[must_use]
    pub fn host(mut self) -> Self {
        self.is_host = true;
        self
    }
}

/// Roster validation failures.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("need 2-4 players, got {0}")]
    PlayerCount(usize),
    #[error("seat slot {0} is outside 1-4")]
    InvalidSlot(u8),
    #[error("seat slot {0} is taken twice")]
    DuplicateSlot(u8),
    #[error("{0} is seated twice")]
    DuplicatePlayer(PlayerId),
    #[error("colour {0:?} is used twice")]
    DuplicateColor(PlayerColor),
}

/// Players of one room, sorted by seat slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    /// Validate and sort a set of players.
    pub fn new(mut players: Vec<Player>) -> Result<Self, RosterError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players.len()) {
            return Err(RosterError::PlayerCount(players.len()));
        }

        players.sort_by_key(|p| p.slot);

        for (i, player) in players.iter().enumerate() {
            if !(1..=MAX_PLAYERS as u8).contains(&player.slot) {
                return Err(RosterError::InvalidSlot(player.slot));
            }
            let earlier = &players[..i];
            if earlier.iter().any(|p| p.slot == player.slot) {
                return Err(RosterError::DuplicateSlot(player.slot));
            }
            if earlier.iter().any(|p| p.id == player.id) {
                return Err(RosterError::DuplicatePlayer(player.id));
            }
            if earlier.iter().any(|p| p.color == player.color) {
                return Err(RosterError::DuplicateColor(player.color));
            }
        }

        Ok(Self { players })
    }

    /// Number of seated players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Always false for a validated roster.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players sorted by seat slot.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Player ids in seat order.
    #[must_use]
    pub fn seat_order(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    /// Look up a seated player.
    #[must_use]
    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Check whether a player is seated in this room.
    #[must_use]
    pub fn contains(&self, id: PlayerId) -> bool {
        self.get(id).is_some()
    }

    /// The player seated directly after `id`, wrapping around the table.
    #[must_use]
    pub fn next_after(&self, id: PlayerId) -> Option<PlayerId> {
        let idx = self.players.iter().position(|p| p.id == id)?;
        Some(self.players[(idx + 1) % self.players.len()].id)
    }

    /// Current host, if any.
    #[must_use]
    pub fn host(&self) -> Option<PlayerId> {
        self.players.iter().find(|p| p.is_host).map(|p| p.id)
    }

    /// Update a player's connection flag.
    pub fn set_connected(&mut self, id: PlayerId, connected: bool) -> bool {
        match self.players.iter_mut().find(|p| p.id == id) {
            Some(player) => {
                player.is_connected = connected;
                true
            }
            None => false,
        }
    }
}
