//! Cards and decks.
//!
//! - `card`: Suits, ranks, stable card ids and the dealer-selection value
//! - `deck`: Shuffled draw/discard piles with reshuffle-on-empty

pub mod card;
pub mod deck;

pub use card::{Card, CardId, GridPosition, Rank, Suit};
pub use deck::{Deck, GRID_COLS, GRID_ROWS, GRID_SIZE, PACK_SIZE};
