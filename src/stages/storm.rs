//! Storm: the card-shedding stage that decides the finishing order.
//!
//! ## Legality
//!
//! A card may be played when:
//! - a toxic seven is active and the card is a 7, or
//! - no toxic seven is active and the card is a Queen (wild), or
//! - no toxic seven is active and the card matches the effective suit
//!   (called suit if a Queen set one, else the top card's suit) or the
//!   top card's rank.
//!
//! ## Effects
//!
//! - Ace: the next player in turn is skipped.
//! - Queen: sets the called suit. Any other card clears it.
//! - Seven: starts a toxic penalty of 2 cards, or adds 2 to an active one.
//!
//! Drawing takes the whole toxic penalty (or one card) and ends the turn.
//! The stage ends when all but one player have emptied their hands; the
//! last player is placed last automatically.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cards::{Card, CardId, Deck, Rank, Suit};
use crate::core::{ActionError, GameRng, GameSettings, PlayerAction, PlayerId, PlayerMap};
use crate::rules::{StageContext, StageRules};
use crate::stages::StageKind;

/// Toxic penalty added by each 7.
pub const TOXIC_STEP: u8 = 2;

/// State of the Storm stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StormState {
    deck: Deck,
    hands: PlayerMap<Vec<Card>>,
    /// Seat order; turns go round it skipping finished players.
    turn_order: Vec<PlayerId>,
    pub current_player: PlayerId,
    pub toxic_seven_active: bool,
    pub toxic_draw_amount: u8,
    pub called_suit: Option<Suit>,
    pub finishing_order: Vec<PlayerId>,
    pub is_complete: bool,
}

impl StormState {
    /// Shuffle, deal hands and turn up the first discard.
    ///
    /// `turn_order` must be non-empty and contain `dealer_button`; if the
    /// button is missing the first seat starts.
    #[must_use]
    pub fn new(
        turn_order: Vec<PlayerId>,
        dealer_button: PlayerId,
        settings: &GameSettings,
        rng: &mut GameRng,
    ) -> Self {
        let deck = Deck::shuffled(settings.number_of_decks, rng);
        Self::with_deck(turn_order, dealer_button, settings, deck, rng)
    }

    /// Deal from a deck already in playing order.
    ///
    /// Hands are dealt one card per player per pass, starting with the
    /// first seat, and the next card becomes the opening discard. An Ace
    /// there skips the first player; a Queen calls the suit of the bottom
    /// stock card.
    #[must_use]
    pub fn with_deck(
        turn_order: Vec<PlayerId>,
        dealer_button: PlayerId,
        settings: &GameSettings,
        mut deck: Deck,
        rng: &mut GameRng,
    ) -> Self {
        debug_assert!(!turn_order.is_empty(), "storm needs players");

        let mut hands = PlayerMap::new(turn_order.iter().copied(), |_| {
            Vec::with_capacity(settings.cards_per_hand as usize)
        });
        for _ in 0..settings.cards_per_hand {
            for player in &turn_order {
                if let Some(card) = deck.deal_one(rng) {
                    hands[*player].push(card);
                }
            }
        }

        let initial = deck.deal_one(rng);
        let button_seat = turn_order.iter().position(|p| *p == dealer_button);
        let mut first = match button_seat {
            Some(idx) => (idx + 1) % turn_order.len(),
            None => 0,
        };
        let mut called_suit = None;

        if let Some(card) = initial {
            if card.rank == Rank::Ace {
                first = (first + 1) % turn_order.len();
            }
            if card.rank == Rank::Queen {
                called_suit = deck.bottom_card().map(|c| c.suit);
            }
            debug!(card = %card, called = ?called_suit, "storm initial discard");
            deck.discard(card);
        }

        let state = Self {
            deck,
            hands,
            current_player: turn_order[first],
            turn_order,
            toxic_seven_active: false,
            toxic_draw_amount: 0,
            called_suit,
            finishing_order: Vec::new(),
            is_complete: false,
        };
        debug_assert!(state.cards_conserved());
        state
    }

    /// A player's hand.
    #[must_use]
    pub fn hand(&self, player: PlayerId) -> Option<&[Card]> {
        self.hands.get(player).map(Vec::as_slice)
    }

    /// Number of cards a player holds.
    #[must_use]
    pub fn hand_count(&self, player: PlayerId) -> usize {
        self.hands.get(player).map_or(0, Vec::len)
    }

    /// Top of the discard pile.
    #[must_use]
    pub fn top_card(&self) -> Option<&Card> {
        self.deck.top_discard()
    }

    /// Discard pile, bottom first.
    #[must_use]
    pub fn discard_pile(&self) -> &[Card] {
        self.deck.discard_pile()
    }

    /// Stock, bottom first.
    #[must_use]
    pub fn stock_pile(&self) -> &[Card] {
        self.deck.draw_pile()
    }

    /// Suit the next card must follow.
    #[must_use]
    pub fn effective_suit(&self) -> Option<Suit> {
        self.called_suit.or_else(|| self.top_card().map(|c| c.suit))
    }

    /// Check whether hands, stock and discard still add up to the deck.
    #[must_use]
    pub fn cards_conserved(&self) -> bool {
        let held: usize = self.hands.values().map(Vec::len).sum();
        held + self.deck.remaining() + self.deck.discard_pile().len() == self.deck.total_cards()
    }

    /// Check whether `card` could be played right now.
    ///
    /// `hand_len` is the size of the hand the card is played from.
    pub fn check_play(
        &self,
        card: &Card,
        hand_len: usize,
        called_suit: Option<Suit>,
    ) -> Result<(), ActionError> {
        if self.toxic_seven_active {
            return if card.rank == Rank::Seven {
                Ok(())
            } else {
                Err(ActionError::ToxicSevenActive(self.toxic_draw_amount))
            };
        }

        if card.rank == Rank::Queen {
            return if hand_len > 1 && called_suit.is_none() {
                Err(ActionError::MissingCalledSuit)
            } else {
                Ok(())
            };
        }

        let Some(top) = self.top_card() else {
            return Ok(());
        };
        let suit = self.effective_suit().unwrap_or(top.suit);
        if card.suit == suit || card.rank == top.rank {
            Ok(())
        } else {
            Err(ActionError::IllegalPlay {
                card: card.to_string(),
                suit,
            })
        }
    }

    /// Play a card from `player`'s hand.
    pub fn play_card(
        &mut self,
        player: PlayerId,
        card_id: CardId,
        called_suit: Option<Suit>,
    ) -> Result<(), ActionError> {
        self.check_turn(player)?;
        let hand = self.hands.get(player).ok_or(ActionError::NotYourTurn(player))?;
        let idx = hand
            .iter()
            .position(|c| c.id == card_id)
            .ok_or(ActionError::CardNotInHand(card_id))?;
        self.check_play(&hand[idx], hand.len(), called_suit)?;

        let card = self.hands[player].remove(idx);
        let rank = card.rank;
        debug!(player = %player, card = %card, called = ?called_suit, "storm card played");
        self.deck.discard(card);

        self.called_suit = if rank == Rank::Queen { called_suit } else { None };
        if rank == Rank::Seven {
            self.toxic_seven_active = true;
            self.toxic_draw_amount = self.toxic_draw_amount.saturating_add(TOXIC_STEP);
        }

        if self.hands[player].is_empty() {
            self.finishing_order.push(player);
            info!(player = %player, place = self.finishing_order.len(), "storm hand emptied");

            if self.finishing_order.len() + 1 >= self.turn_order.len() {
                self.complete();
                return Ok(());
            }
        }

        let skip = usize::from(rank == Rank::Ace);
        self.current_player = self.next_active_after(player, skip);
        debug_assert!(self.cards_conserved());
        Ok(())
    }

    /// Draw the toxic penalty (or one card) and pass the turn.
    ///
    /// Returns how many cards were actually drawn; a dry stock gives fewer.
    pub fn draw_cards(&mut self, player: PlayerId, rng: &mut GameRng) -> Result<usize, ActionError> {
        self.check_turn(player)?;

        let count = if self.toxic_seven_active {
            self.toxic_draw_amount as usize
        } else {
            1
        };
        let drawn = self.deck.draw_keeping_top(count, rng);
        let n = drawn.len();
        self.hands[player].extend(drawn);
        self.toxic_seven_active = false;
        self.toxic_draw_amount = 0;
        debug!(player = %player, requested = count, drawn = n, "storm draw");

        self.current_player = self.next_active_after(player, 0);
        debug_assert!(self.cards_conserved());
        Ok(n)
    }

    fn check_turn(&self, player: PlayerId) -> Result<(), ActionError> {
        if self.is_complete {
            return Err(ActionError::StageComplete);
        }
        if self.current_player != player {
            return Err(ActionError::NotYourTurn(player));
        }
        Ok(())
    }

    fn is_finished(&self, player: PlayerId) -> bool {
        self.finishing_order.contains(&player)
    }

    /// Next unfinished seat after `player`, passing over `skip` more.
    fn next_active_after(&self, player: PlayerId, skip: usize) -> PlayerId {
        let n = self.turn_order.len();
        let start = self.turn_order.iter().position(|p| *p == player).unwrap_or(0);
        let mut remaining = skip;

        for step in 1..=n * (skip + 1) {
            let candidate = self.turn_order[(start + step) % n];
            if self.is_finished(candidate) {
                continue;
            }
            if remaining == 0 {
                return candidate;
            }
            remaining -= 1;
        }
        player
    }

    fn complete(&mut self) {
        let last = self
            .turn_order
            .iter()
            .copied()
            .find(|p| !self.finishing_order.contains(p));
        if let Some(last) = last {
            self.finishing_order.push(last);
        }
        self.is_complete = true;
        info!(order = ?self.finishing_order, "storm complete");
    }
}

impl StageRules for StormState {
    fn kind(&self) -> StageKind {
        StageKind::Storm
    }

    fn apply(
        &mut self,
        ctx: &mut StageContext<'_>,
        player: PlayerId,
        action: &PlayerAction,
    ) -> Result<(), ActionError> {
        match action {
            PlayerAction::PlayCard { card_id, called_suit } => {
                self.play_card(player, *card_id, *called_suit)
            }
            PlayerAction::DrawCards => self.draw_cards(player, ctx.rng).map(|_| ()),
            other => Err(self.wrong_stage(other)),
        }
    }

    fn is_complete(&self) -> bool {
        self.is_complete
    }

    fn current_actor(&self) -> Option<PlayerId> {
        (!self.is_complete).then_some(self.current_player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DeckCount;

    fn seats(n: u32) -> Vec<PlayerId> {
        (1..=n).map(PlayerId::new).collect()
    }

    fn p(n: u32) -> PlayerId {
        PlayerId::new(n)
    }

    fn new_storm(n: u32, seed: u64) -> (StormState, GameRng) {
        let mut rng = GameRng::new(seed);
        let state = StormState::new(seats(n), p(1), &GameSettings::default(), &mut rng);
        (state, rng)
    }

    fn take(pool: &mut Vec<Card>, suit: Suit, rank: Rank) -> Card {
        let id = CardId::new(0, suit, rank);
        let i = pool.iter().position(|c| c.id == id).unwrap();
        pool.remove(i)
    }

    /// Rearrange the table: `top` goes on the discard pile and each listed
    /// player holds exactly the listed cards. Everyone else keeps their
    /// hand size with unclaimed cards.
    fn rig(state: &mut StormState, top: (Suit, Rank), hands: &[(PlayerId, &[(Suit, Rank)])]) {
        let sizes: Vec<(PlayerId, usize)> = state
            .turn_order
            .iter()
            .map(|p| (*p, state.hand_count(*p)))
            .collect();
        let mut pool: Vec<Card> = state.stock_pile().to_vec();
        pool.extend(state.discard_pile().iter().cloned());
        for hand in state.hands.values() {
            pool.extend(hand.iter().cloned());
        }

        let top_card = take(&mut pool, top.0, top.1);
        let mut new_hands = PlayerMap::new(state.turn_order.iter().copied(), |_| Vec::new());
        for (player, cards) in hands {
            for (suit, rank) in cards.iter() {
                new_hands[*player].push(take(&mut pool, *suit, *rank));
            }
        }
        for (player, size) in sizes {
            if hands.iter().any(|(p, _)| *p == player) {
                continue;
            }
            for _ in 0..size {
                new_hands[player].push(pool.pop().unwrap());
            }
        }

        state.hands = new_hands;
        state.deck = Deck::from_piles(state.deck.count(), pool, vec![top_card]);
        state.called_suit = None;
        assert!(state.cards_conserved());
    }

    #[test]
    fn test_deal_and_first_player() {
        let (state, _) = new_storm(3, 11);

        for player in seats(3) {
            assert_eq!(state.hand_count(player), 5);
        }
        assert_eq!(state.discard_pile().len(), 1);
        assert_eq!(state.stock_pile().len(), 32 - 15 - 1);
        assert!(state.cards_conserved());

        let top = state.top_card().unwrap();
        let expected = if top.rank == Rank::Ace { p(3) } else { p(2) };
        assert_eq!(state.current_player, expected);
        if top.rank == Rank::Queen {
            assert_eq!(state.called_suit, state.stock_pile().first().map(|c| c.suit));
        } else {
            assert_eq!(state.called_suit, None);
        }
        assert!(!state.toxic_seven_active);
    }

    #[test]
    fn test_double_deck_conserves_64() {
        let mut rng = GameRng::new(2);
        let settings = GameSettings::default().with_decks(DeckCount::Double);
        let state = StormState::new(seats(4), p(4), &settings, &mut rng);

        assert!(state.cards_conserved());
        assert_eq!(state.stock_pile().len(), 64 - 20 - 1);
        assert_eq!(state.current_player, if state.top_card().unwrap().rank == Rank::Ace { p(2) } else { p(1) });
    }

    #[test]
    fn test_called_suit_and_rank_match() {
        let (mut state, _) = new_storm(2, 5);
        rig(&mut state, (Suit::Diamonds, Rank::Nine), &[]);
        state.called_suit = Some(Suit::Clubs);

        let nine_spades = Card::new(0, Suit::Spades, Rank::Nine);
        let eight_clubs = Card::new(0, Suit::Clubs, Rank::Eight);
        let eight_diamonds = Card::new(0, Suit::Diamonds, Rank::Eight);

        assert_eq!(state.check_play(&nine_spades, 3, None), Ok(()));
        assert_eq!(state.check_play(&eight_clubs, 3, None), Ok(()));
        assert_eq!(
            state.check_play(&eight_diamonds, 3, None),
            Err(ActionError::IllegalPlay {
                card: "8♦".to_string(),
                suit: Suit::Clubs
            })
        );
    }

    #[test]
    fn test_queen_needs_called_suit_unless_last() {
        let (state, _) = new_storm(2, 5);
        let queen = Card::new(0, Suit::Hearts, Rank::Queen);

        assert_eq!(state.check_play(&queen, 2, None), Err(ActionError::MissingCalledSuit));
        assert_eq!(state.check_play(&queen, 2, Some(Suit::Spades)), Ok(()));
        assert_eq!(state.check_play(&queen, 1, None), Ok(()));
    }

    #[test]
    fn test_toxic_only_sevens() {
        let (mut state, _) = new_storm(2, 5);
        rig(&mut state, (Suit::Hearts, Rank::Seven), &[]);
        state.toxic_seven_active = true;
        state.toxic_draw_amount = 2;

        let seven = Card::new(0, Suit::Spades, Rank::Seven);
        let heart = Card::new(0, Suit::Hearts, Rank::Ten);
        let queen = Card::new(0, Suit::Clubs, Rank::Queen);

        assert_eq!(state.check_play(&seven, 3, None), Ok(()));
        assert_eq!(state.check_play(&heart, 3, None), Err(ActionError::ToxicSevenActive(2)));
        assert_eq!(
            state.check_play(&queen, 3, Some(Suit::Hearts)),
            Err(ActionError::ToxicSevenActive(2))
        );
    }

    #[test]
    fn test_sevens_stack_then_draw_clears() {
        let (mut state, mut rng) = new_storm(3, 21);
        rig(
            &mut state,
            (Suit::Hearts, Rank::Eight),
            &[
                (p(1), &[(Suit::Hearts, Rank::Seven), (Suit::Clubs, Rank::Ten)]),
                (p(2), &[(Suit::Spades, Rank::Seven), (Suit::Diamonds, Rank::Ten)]),
            ],
        );
        state.current_player = p(1);

        state.play_card(p(1), CardId::new(0, Suit::Hearts, Rank::Seven), None).unwrap();
        assert!(state.toxic_seven_active);
        assert_eq!(state.toxic_draw_amount, 2);
        assert_eq!(state.current_player, p(2));

        state.play_card(p(2), CardId::new(0, Suit::Spades, Rank::Seven), None).unwrap();
        assert_eq!(state.toxic_draw_amount, 4);
        assert_eq!(state.current_player, p(3));

        let before = state.hand_count(p(3));
        let drawn = state.draw_cards(p(3), &mut rng).unwrap();
        assert_eq!(drawn, 4);
        assert_eq!(state.hand_count(p(3)), before + 4);
        assert!(!state.toxic_seven_active);
        assert_eq!(state.toxic_draw_amount, 0);
        assert_eq!(state.current_player, p(1));
        assert!(state.cards_conserved());
    }

    #[test]
    fn test_ace_skips_next_player() {
        let (mut state, _) = new_storm(3, 8);
        rig(
            &mut state,
            (Suit::Spades, Rank::Nine),
            &[(p(1), &[(Suit::Spades, Rank::Ace), (Suit::Hearts, Rank::Ten)])],
        );
        state.current_player = p(1);

        state.play_card(p(1), CardId::new(0, Suit::Spades, Rank::Ace), None).unwrap();

        assert_eq!(state.current_player, p(3));
    }

    #[test]
    fn test_queen_sets_and_next_card_clears_suit() {
        let (mut state, _) = new_storm(2, 8);
        rig(
            &mut state,
            (Suit::Spades, Rank::Nine),
            &[
                (p(1), &[(Suit::Hearts, Rank::Queen), (Suit::Hearts, Rank::Ten)]),
                (p(2), &[(Suit::Diamonds, Rank::Eight), (Suit::Clubs, Rank::Eight)]),
            ],
        );
        state.current_player = p(1);

        state
            .play_card(p(1), CardId::new(0, Suit::Hearts, Rank::Queen), Some(Suit::Diamonds))
            .unwrap();
        assert_eq!(state.called_suit, Some(Suit::Diamonds));
        assert_eq!(state.effective_suit(), Some(Suit::Diamonds));

        state.play_card(p(2), CardId::new(0, Suit::Diamonds, Rank::Eight), None).unwrap();
        assert_eq!(state.called_suit, None);
        assert_eq!(state.effective_suit(), Some(Suit::Diamonds));
    }

    #[test]
    fn test_last_queen_without_suit_uses_queen_suit() {
        let (mut state, _) = new_storm(3, 8);
        rig(&mut state, (Suit::Spades, Rank::Nine), &[(p(1), &[(Suit::Hearts, Rank::Queen)])]);
        state.current_player = p(1);

        state.play_card(p(1), CardId::new(0, Suit::Hearts, Rank::Queen), None).unwrap();

        assert_eq!(state.called_suit, None);
        assert_eq!(state.effective_suit(), Some(Suit::Hearts));
        assert_eq!(state.finishing_order, vec![p(1)]);
        assert_eq!(state.current_player, p(2));
    }

    #[test]
    fn test_completion_appends_last_player() {
        let (mut state, _) = new_storm(2, 8);
        rig(&mut state, (Suit::Spades, Rank::Nine), &[(p(2), &[(Suit::Spades, Rank::Ten)])]);
        state.current_player = p(2);

        state.play_card(p(2), CardId::new(0, Suit::Spades, Rank::Ten), None).unwrap();

        assert!(state.is_complete);
        assert_eq!(state.finishing_order, vec![p(2), p(1)]);
        assert_eq!(state.current_actor(), None);
        assert_eq!(state.draw_cards(p(1), &mut GameRng::new(0)), Err(ActionError::StageComplete));
    }

    #[test]
    fn test_rejections_leave_state_untouched() {
        let (mut state, mut rng) = new_storm(3, 13);
        let current = state.current_player;
        let other = state.turn_order.iter().copied().find(|x| *x != current).unwrap();
        let before = state.clone();

        assert_eq!(state.draw_cards(other, &mut rng), Err(ActionError::NotYourTurn(other)));
        let foreign = state.hand(other).unwrap()[0].id;
        assert_eq!(
            state.play_card(current, foreign, None),
            Err(ActionError::CardNotInHand(foreign))
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_finished_players_are_skipped() {
        let (mut state, _) = new_storm(4, 8);
        state.finishing_order.push(p(2));

        assert_eq!(state.next_active_after(p(1), 0), p(3));
        assert_eq!(state.next_active_after(p(1), 1), p(4));
        assert_eq!(state.next_active_after(p(4), 1), p(3));
    }
}
