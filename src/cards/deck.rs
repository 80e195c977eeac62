//! Draw and discard piles for one shuffled pack (or two packs together).
//!
//! ## Conservation
//!
//! A deck never creates or destroys cards: everything dealt out is either
//! held by the caller or handed back through [`Deck::discard`]. The draw
//! pile is ordered bottom-first, so the top card is the last element.
//!
//! ## Reshuffling
//!
//! When the draw pile runs out, the discard pile is shuffled back in.
//! [`Deck::draw_keeping_top`] leaves the top discard in place, which is what
//! Storm needs to keep the card to match visible.

use tracing::{debug, warn};

use super::card::{Card, GridPosition, Rank, Suit};
use crate::core::{DeckCount, GameRng};

/// Cards in one pack.
pub const PACK_SIZE: usize = 32;
/// Rows of the dealer-selection grid.
pub const GRID_ROWS: u8 = 3;
/// Columns of the dealer-selection grid.
pub const GRID_COLS: u8 = 6;
/// Cards dealt face down for dealer selection.
pub const GRID_SIZE: usize = (GRID_ROWS * GRID_COLS) as usize;

/// A 32- or 64-card deck with draw and discard piles.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Deck {
    count: DeckCount,
    draw_pile: Vec<Card>,
    discard_pile: Vec<Card>,
}

impl Deck {
    /// Build a fresh deck in pack order (unshuffled).
    #[must_use]
    pub fn new(count: DeckCount) -> Self {
        let mut draw_pile = Vec::with_capacity(PACK_SIZE * count.copies() as usize);
        for pack in 0..count.copies() {
            for suit in Suit::ALL {
                for rank in Rank::ALL {
                    draw_pile.push(Card::new(pack, suit, rank));
                }
            }
        }

        Self {
            count,
            draw_pile,
            discard_pile: Vec::new(),
        }
    }

    /// Build and shuffle a fresh deck.
    #[must_use]
    pub fn shuffled(count: DeckCount, rng: &mut GameRng) -> Self {
        let mut deck = Self::new(count);
        deck.shuffle(rng);
        deck
    }

    /// Rebuild a deck from explicit piles, e.g. when restoring a table.
    ///
    /// Cards held outside the deck are not tracked here; conservation is
    /// the caller's concern.
    #[must_use]
    pub fn from_piles(count: DeckCount, draw_pile: Vec<Card>, discard_pile: Vec<Card>) -> Self {
        Self {
            count,
            draw_pile,
            discard_pile,
        }
    }

    /// Gather every card back and shuffle.
    ///
    /// Callers must drop any cards they were holding from this deck.
    pub fn reset(&mut self, rng: &mut GameRng) {
        *self = Self::shuffled(self.count, rng);
    }

    /// Shuffle the draw pile.
    pub fn shuffle(&mut self, rng: &mut GameRng) {
        rng.shuffle(&mut self.draw_pile);
    }

    /// Single or double deck.
    #[must_use]
    pub fn count(&self) -> DeckCount {
        self.count
    }

    /// Total cards belonging to this deck (32 or 64).
    #[must_use]
    pub fn total_cards(&self) -> usize {
        PACK_SIZE * self.count.copies() as usize
    }

    /// Cards still in the draw pile, bottom first.
    #[must_use]
    pub fn draw_pile(&self) -> &[Card] {
        &self.draw_pile
    }

    /// Discard pile, bottom first.
    #[must_use]
    pub fn discard_pile(&self) -> &[Card] {
        &self.discard_pile
    }

    /// Number of cards left to draw.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.draw_pile.len()
    }

    /// Top of the discard pile.
    #[must_use]
    pub fn top_discard(&self) -> Option<&Card> {
        self.discard_pile.last()
    }

    /// Bottom card of the draw pile.
    #[must_use]
    pub fn bottom_card(&self) -> Option<&Card> {
        self.draw_pile.first()
    }

    /// Put a card on top of the discard pile.
    pub fn discard(&mut self, card: Card) {
        self.discard_pile.push(card);
    }

    /// Deal one card, reshuffling the whole discard pile if needed.
    pub fn deal_one(&mut self, rng: &mut GameRng) -> Option<Card> {
        self.take_one(false, rng)
    }

    /// Deal up to `n` cards. Fewer come back if both piles run dry.
    pub fn deal(&mut self, n: usize, rng: &mut GameRng) -> Vec<Card> {
        self.take(n, false, rng)
    }

    /// Draw up to `n` cards, reshuffling everything but the top discard.
    pub fn draw_keeping_top(&mut self, n: usize, rng: &mut GameRng) -> Vec<Card> {
        self.take(n, true, rng)
    }

    /// Deal the 3x6 face-down grid used for dealer selection.
    pub fn deal_grid(&mut self, rng: &mut GameRng) -> Vec<Card> {
        let mut grid = self.deal(GRID_SIZE, rng);
        for (i, card) in grid.iter_mut().enumerate() {
            card.is_flipped = false;
            card.position = Some(GridPosition {
                row: i as u8 / GRID_COLS,
                col: i as u8 % GRID_COLS,
            });
        }
        grid
    }

    fn take(&mut self, n: usize, keep_top: bool, rng: &mut GameRng) -> Vec<Card> {
        let mut dealt = Vec::with_capacity(n);
        for _ in 0..n {
            match self.take_one(keep_top, rng) {
                Some(card) => dealt.push(card),
                None => {
                    warn!(requested = n, dealt = dealt.len(), "deck exhausted, short deal");
                    break;
                }
            }
        }
        dealt
    }

    fn take_one(&mut self, keep_top: bool, rng: &mut GameRng) -> Option<Card> {
        if self.draw_pile.is_empty() {
            self.reshuffle_from_discard(keep_top, rng);
        }
        self.draw_pile.pop()
    }

    fn reshuffle_from_discard(&mut self, keep_top: bool, rng: &mut GameRng) {
        let top = if keep_top { self.discard_pile.pop() } else { None };

        if self.discard_pile.is_empty() {
            warn!("no cards available to reshuffle");
        } else {
            self.draw_pile.append(&mut self.discard_pile);
            for card in &mut self.draw_pile {
                card.is_flipped = false;
                card.position = None;
            }
            self.shuffle(rng);
            debug!(cards = self.draw_pile.len(), "reshuffled discard pile into draw pile");
        }

        if let Some(card) = top {
            self.discard_pile.push(card);
        }
    }
}
