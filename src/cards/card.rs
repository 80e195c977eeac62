//! Card model for the 32-card Storm pack (7 through Ace in four suits).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Card suit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    /// All suits in pack order.
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    const fn index(self) -> u16 {
        match self {
            Suit::Hearts => 0,
            Suit::Diamonds => 1,
            Suit::Clubs => 2,
            Suit::Spades => 3,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Suit::Hearts => "♥",
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
            Suit::Spades => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Card rank. Only 7 through Ace are in the pack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
}

impl Rank {
    /// All ranks, lowest first.
    pub const ALL: [Rank; 8] = [
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Comparison value used by dealer selection: 7 is 7, Jack 11, Ace 14.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten => 10,
            Rank::Jack => 11,
            Rank::Queen => 12,
            Rank::King => 13,
            Rank::Ace => 14,
        }
    }

    const fn index(self) -> u16 {
        self.value() as u16 - 7
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        };
        write!(f, "{repr}")
    }
}

/// Stable card identifier, unique within one deck instance.
///
/// Cards of the second pack in a double deck get their own ids, so
/// `7♥` from pack 0 and `7♥` from pack 1 never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(pub u16);

impl CardId {
    /// Id of a card in the given pack.
    #[must_use]
    pub const fn new(pack: u8, suit: Suit, rank: Rank) -> Self {
        Self(pack as u16 * 32 + suit.index() * 8 + rank.index())
    }

    /// Pack this card came from (0 or 1).
    #[must_use]
    pub const fn pack(self) -> u8 {
        (self.0 / 32) as u8
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Card({})", self.0)
    }
}

/// Cell of the 3x6 dealer-selection grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: u8,
    pub col: u8,
}

/// A physical card.
///
/// Only `is_flipped` changes after dealing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub suit: Suit,
    pub rank: Rank,
    /// Face up on the dealer-selection grid.
    pub is_flipped: bool,
    /// Grid cell, dealer selection only.
    pub position: Option<GridPosition>,
}

impl Card {
    /// Create a face-down card from the given pack.
    #[must_use]
    pub fn new(pack: u8, suit: Suit, rank: Rank) -> Self {
        Self {
            id: CardId::new(pack, suit, rank),
            suit,
            rank,
            is_flipped: false,
            position: None,
        }
    }

    /// Dealer-selection value of this card.
    #[must_use]
    pub fn value(&self) -> u8 {
        self.rank.value()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rank_values_are_ordered() {
        let values: Vec<u8> = Rank::ALL.iter().map(|r| r.value()).collect();
        assert_eq!(values, vec![7, 8, 9, 10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_card_ids_unique_across_packs() {
        let mut seen = HashSet::new();
        for pack in 0..2 {
            for suit in Suit::ALL {
                for rank in Rank::ALL {
                    let id = CardId::new(pack, suit, rank);
                    assert_eq!(id.pack(), pack);
                    assert!(seen.insert(id), "duplicate id {id}");
                }
            }
        }
        assert_eq!(seen.len(), 64);
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card::new(0, Suit::Diamonds, Rank::Nine).to_string(), "9♦");
        assert_eq!(Card::new(1, Suit::Spades, Rank::Ten).to_string(), "10♠");
    }

    #[test]
    fn test_card_wire_names() {
        let card = Card::new(0, Suit::Clubs, Rank::Queen);
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["suit"], "clubs");
        assert_eq!(json["rank"], "Q");

        let ranks: Vec<String> = Rank::ALL
            .iter()
            .map(|r| serde_json::to_value(r).unwrap().as_str().unwrap().to_owned())
            .collect();
        assert_eq!(ranks, vec!["7", "8", "9", "10", "J", "Q", "K", "A"]);
        assert_eq!(serde_json::from_str::<Rank>("\"10\"").unwrap(), Rank::Ten);
        assert_eq!(serde_json::from_str::<Suit>("\"hearts\"").unwrap(), Suit::Hearts);
        assert!(serde_json::from_str::<Suit>("\"Hearts\"").is_err());
    }

    #[test]
    fn test_new_card_is_face_down() {
        let card = Card::new(0, Suit::Clubs, Rank::Ace);
        assert!(!card.is_flipped);
        assert_eq!(card.position, None);
        assert_eq!(card.value(), 14);
    }
}
