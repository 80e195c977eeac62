//! Room configuration chosen by the host at room creation.
//!
//! Engines read these values but never re-validate them; call
//! [`GameSettings::validate`] once before handing settings to a
//! [`StageManager`](crate::manager::StageManager).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allowed lap counts.
pub const LAPS_RANGE: std::ops::RangeInclusive<u8> = 1..=5;
/// Allowed movement dice counts.
pub const DICE_RANGE: std::ops::RangeInclusive<u8> = 1..=2;
/// Allowed Storm hand sizes.
pub const CARDS_PER_HAND_RANGE: std::ops::RangeInclusive<u8> = 3..=5;
/// Allowed coin counts for the Storm winner.
pub const COINS_RANGE: std::ops::RangeInclusive<u8> = 1..=3;

/// Number of 32-card packs shuffled together. On the wire this is 1 or 2.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DeckCount {
    #[default]
    Single,
    Double,
}

impl DeckCount {
    /// Number of packs.
    #[must_use]
    pub const fn copies(self) -> u8 {
        match self {
            DeckCount::Single => 1,
            DeckCount::Double => 2,
        }
    }
}

impl TryFrom<u8> for DeckCount {
    type Error = ConfigError;

    fn try_from(copies: u8) -> Result<Self, Self::Error> {
        match copies {
            1 => Ok(DeckCount::Single),
            2 => Ok(DeckCount::Double),
            other => Err(ConfigError::Decks(other)),
        }
    }
}

impl From<DeckCount> for u8 {
    fn from(count: DeckCount) -> Self {
        count.copies()
    }
}

/// Whether a racer who already reached the lap target keeps taking turns.
///
/// `Keep` goes on offering finished racers their turn; `Skip` passes over
/// them instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishedRacerTurns {
    #[default]
    Keep,
    Skip,
}

/// Invalid room settings.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("number of laps must be 1-5, got {0}")]
    Laps(u8),
    #[error("number of dice must be 1-2, got {0}")]
    Dice(u8),
    #[error("number of decks must be 1-2, got {0}")]
    Decks(u8),
    #[error("cards per hand must be 3-5, got {0}")]
    CardsPerHand(u8),
    #[error("number of coins must be 1-3, got {0}")]
    Coins(u8),
}

/// Host-configured room settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// Laps a racer must complete to finish (1-5).
    pub number_of_laps: u8,

    /// Movement dice rolled on a standard roll (1-2).
    pub number_of_dice: u8,

    /// Single or double deck for Storm.
    pub number_of_decks: DeckCount,

    /// Cards dealt to each player at the start of Storm (3-5).
    pub cards_per_hand: u8,

    /// Coins awarded to the Storm winner (1-3).
    /// Each later place gets one fewer, never below one.
    pub number_of_coins: u8,

    /// Turn policy for racers that already finished.
    #[serde(default)]
    pub finished_racer_turns: FinishedRacerTurns,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            number_of_laps: 3,
            number_of_dice: 1,
            number_of_decks: DeckCount::Single,
            cards_per_hand: 5,
            number_of_coins: 3,
            finished_racer_turns: FinishedRacerTurns::Keep,
        }
    }
}

impl GameSettings {
    /// Set the lap target.
    #[must_use]
    pub fn with_laps(mut self, laps: u8) -> Self {
        self.number_of_laps = laps;
        self
    }

    /// Set the number of movement dice.
    #[must_use]
    pub fn with_dice(mut self, dice: u8) -> Self {
        self.number_of_dice = dice;
        self
    }

    /// Set the deck size.
    #[must_use]
    pub fn with_decks(mut self, decks: DeckCount) -> Self {
        self.number_of_decks = decks;
        self
    }

    /// Set the Storm hand size.
    #[must_use]
    pub fn with_cards_per_hand(mut self, cards: u8) -> Self {
        self.cards_per_hand = cards;
        self
    }

    /// Set the coins awarded to the Storm winner.
    #[must_use]
    pub fn with_coins(mut self, coins: u8) -> Self {
        self.number_of_coins = coins;
        self
    }

    /// Set the finished-racer turn policy.
    #[must_use]
    pub fn with_finished_racer_turns(mut self, policy: FinishedRacerTurns) -> Self {
        self.finished_racer_turns = policy;
        self
    }

    /// Check every value against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LAPS_RANGE.contains(&self.number_of_laps) {
            return Err(ConfigError::Laps(self.number_of_laps));
        }
        if !DICE_RANGE.contains(&self.number_of_dice) {
            return Err(ConfigError::Dice(self.number_of_dice));
        }
        if !CARDS_PER_HAND_RANGE.contains(&self.cards_per_hand) {
            return Err(ConfigError::CardsPerHand(self.cards_per_hand));
        }
        if !COINS_RANGE.contains(&self.number_of_coins) {
            return Err(ConfigError::Coins(self.number_of_coins));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = GameSettings::default();
        assert_eq!(settings.validate(), Ok(()));
        assert_eq!(settings.number_of_decks.copies(), 1);
        assert_eq!(settings.finished_racer_turns, FinishedRacerTurns::Keep);
    }

    #[test]
    fn test_settings_builder() {
        let settings = GameSettings::default()
            .with_laps(5)
            .with_dice(2)
            .with_decks(DeckCount::Double)
            .with_cards_per_hand(3)
            .with_coins(1)
            .with_finished_racer_turns(FinishedRacerTurns::Skip);

        assert_eq!(settings.number_of_laps, 5);
        assert_eq!(settings.number_of_dice, 2);
        assert_eq!(settings.number_of_decks, DeckCount::Double);
        assert_eq!(settings.cards_per_hand, 3);
        assert_eq!(settings.number_of_coins, 1);
        assert_eq!(settings.finished_racer_turns, FinishedRacerTurns::Skip);
        assert_eq!(settings.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let base = GameSettings::default();

        assert_eq!(base.clone().with_laps(0).validate(), Err(ConfigError::Laps(0)));
        assert_eq!(base.clone().with_laps(6).validate(), Err(ConfigError::Laps(6)));
        assert_eq!(base.clone().with_dice(3).validate(), Err(ConfigError::Dice(3)));
        assert_eq!(
            base.clone().with_cards_per_hand(2).validate(),
            Err(ConfigError::CardsPerHand(2))
        );
        assert_eq!(base.with_coins(4).validate(), Err(ConfigError::Coins(4)));
    }

    #[test]
    fn test_deck_count_from_copies() {
        assert_eq!(DeckCount::try_from(1), Ok(DeckCount::Single));
        assert_eq!(DeckCount::try_from(2), Ok(DeckCount::Double));
        assert_eq!(DeckCount::try_from(3), Err(ConfigError::Decks(3)));
        assert_eq!(u8::from(DeckCount::Double), 2);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ConfigError::Laps(9).to_string(), "number of laps must be 1-5, got 9");
    }

    #[test]
    fn test_settings_serde_defaults_policy() {
        let json = r#"{"numberOfLaps":2,"numberOfDice":1,"numberOfDecks":2,"cardsPerHand":4,"numberOfCoins":2}"#;
        let settings: GameSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.number_of_decks, DeckCount::Double);
        assert_eq!(settings.finished_racer_turns, FinishedRacerTurns::Keep);
    }

    #[test]
    fn test_settings_wire_shape() {
        let json = serde_json::to_value(GameSettings::default().with_decks(DeckCount::Double)).unwrap();
        assert_eq!(json["numberOfLaps"], 3);
        assert_eq!(json["numberOfDecks"], 2);
        assert_eq!(json["cardsPerHand"], 5);
        assert!(json.get("number_of_decks").is_none());

        let bad = r#"{"numberOfLaps":2,"numberOfDice":1,"numberOfDecks":3,"cardsPerHand":4,"numberOfCoins":2}"#;
        assert!(serde_json::from_str::<GameSettings>(bad).is_err());
    }
}
