//! Player identification and per-player data storage.
//!
//! ## PlayerId
//!
//! Opaque player identifier handed to the engine by the room layer.
//! The engine never interprets the value; turn order comes from seat slots
//! or the Storm finishing order, never from id arithmetic.
//!
//! ## PlayerMap
//!
//! Ordered per-player storage backed by `im::OrdMap`, so a whole room
//! aggregate clones in O(1) when a snapshot is pulled after a mutation.

use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Opaque player identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

/// Per-player data keyed by `PlayerId`.
///
/// Iteration is in ascending id order. Anything that cares about turn order
/// keeps its own ordered `Vec<PlayerId>` next to the map.
///
/// ## Example
///
/// ```
/// use speedway::core::{PlayerId, PlayerMap};
///
/// let players = [PlayerId::new(7), PlayerId::new(3)];
/// let mut coins: PlayerMap<u8> = PlayerMap::new(players, |_| 0);
///
/// coins[PlayerId::new(3)] += 2;
/// assert_eq!(coins[PlayerId::new(3)], 2);
/// assert_eq!(coins.get(PlayerId::new(9)), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: Deserialize<'de> + Clone"
))]
pub struct PlayerMap<T: Clone> {
    data: OrdMap<PlayerId, T>,
}

impl<T: Clone> Default for PlayerMap<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Clone> PlayerMap<T> {
    /// Create an empty map.
    #[must_use]
    pub fn empty() -> Self {
        Self { data: OrdMap::new() }
    }

    /// Create a map with one entry per player from a factory function.
    pub fn new(players: impl IntoIterator<Item = PlayerId>, factory: impl Fn(PlayerId) -> T) -> Self {
        let data = players.into_iter().map(|p| (p, factory(p))).collect();
        Self { data }
    }

    /// Create a map with every entry set to the same value.
    pub fn with_value(players: impl IntoIterator<Item = PlayerId>, value: T) -> Self {
        Self::new(players, |_| value.clone())
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when no player has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check whether a player has an entry.
    #[must_use]
    pub fn contains(&self, player: PlayerId) -> bool {
        self.data.contains_key(&player)
    }

    /// Get a player's entry.
    #[must_use]
    pub fn get(&self, player: PlayerId) -> Option<&T> {
        self.data.get(&player)
    }

    /// Get a mutable reference to a player's entry.
    pub fn get_mut(&mut self, player: PlayerId) -> Option<&mut T> {
        self.data.get_mut(&player)
    }

    /// Insert or replace a player's entry, returning the previous value.
    pub fn insert(&mut self, player: PlayerId, value: T) -> Option<T> {
        self.data.insert(player, value)
    }

    /// Remove a player's entry.
    pub fn remove(&mut self, player: PlayerId) -> Option<T> {
        self.data.remove(&player)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Iterate over (PlayerId, &T) pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &T)> {
        self.data.iter().map(|(p, v)| (*p, v))
    }

    /// Iterate over the values in id order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.data.values()
    }

    /// Iterate over all player IDs with an entry.
    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.data.keys().copied()
    }
}

impl<T: Clone> FromIterator<(PlayerId, T)> for PlayerMap<T> {
    fn from_iter<I: IntoIterator<Item = (PlayerId, T)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl<T: Clone> Index<PlayerId> for PlayerMap<T> {
    type Output = T;

    fn index(&self, player: PlayerId) -> &Self::Output {
        match self.data.get(&player) {
            Some(value) => value,
            None => panic!("{player} has no entry"),
        }
    }
}

impl<T: Clone> IndexMut<PlayerId> for PlayerMap<T> {
    fn index_mut(&mut self, player: PlayerId) -> &mut Self::Output {
        match self.data.get_mut(&player) {
            Some(value) => value,
            None => panic!("{player} has no entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<PlayerId> {
        raw.iter().copied().map(PlayerId::new).collect()
    }

    #[test]
    fn test_player_id_basics() {
        let p = PlayerId::new(12);
        assert_eq!(p.raw(), 12);
        assert_eq!(format!("{}", p), "Player 12");
    }

    #[test]
    fn test_player_map_new() {
        let map: PlayerMap<u32> = PlayerMap::new(ids(&[4, 1, 9]), |p| p.raw() * 10);

        assert_eq!(map.len(), 3);
        assert_eq!(map[PlayerId::new(1)], 10);
        assert_eq!(map[PlayerId::new(4)], 40);
        assert_eq!(map[PlayerId::new(9)], 90);
    }

    #[test]
    fn test_player_map_iterates_in_id_order() {
        let map: PlayerMap<u32> = PlayerMap::with_value(ids(&[4, 1, 9]), 0);
        let order: Vec<_> = map.player_ids().collect();
        assert_eq!(order, ids(&[1, 4, 9]));
    }

    #[test]
    fn test_player_map_mutation() {
        let mut map: PlayerMap<Vec<u8>> = PlayerMap::with_value(ids(&[1, 2]), Vec::new());

        map[PlayerId::new(1)].push(7);
        map.get_mut(PlayerId::new(2)).unwrap().push(8);

        assert_eq!(map[PlayerId::new(1)], vec![7]);
        assert_eq!(map[PlayerId::new(2)], vec![8]);
    }

    #[test]
    fn test_player_map_insert_remove() {
        let mut map: PlayerMap<u8> = PlayerMap::empty();
        assert!(map.is_empty());

        assert_eq!(map.insert(PlayerId::new(3), 1), None);
        assert_eq!(map.insert(PlayerId::new(3), 2), Some(1));
        assert!(map.contains(PlayerId::new(3)));

        assert_eq!(map.remove(PlayerId::new(3)), Some(2));
        assert!(!map.contains(PlayerId::new(3)));
    }

    #[test]
    fn test_player_map_clone_is_independent() {
        let mut original: PlayerMap<u8> = PlayerMap::with_value(ids(&[1, 2]), 5);
        let snapshot = original.clone();

        original[PlayerId::new(1)] = 0;

        assert_eq!(snapshot[PlayerId::new(1)], 5);
        assert_eq!(original[PlayerId::new(1)], 0);
    }

    #[test]
    fn test_player_map_serialization() {
        let map: PlayerMap<u8> = PlayerMap::new(ids(&[2, 5]), |p| p.raw() as u8 + 1);
        let json = serde_json::to_string(&map).unwrap();
        let deserialized: PlayerMap<u8> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, deserialized);
    }

    #[test]
    #[should_panic(expected = "Player 8 has no entry")]
    fn test_player_map_missing_index_panics() {
        let map: PlayerMap<u8> = PlayerMap::with_value(ids(&[1]), 0);
        let _ = map[PlayerId::new(8)];
    }
}
