//! Dealer selection: lowest revealed card takes the dealer button.
//!
//! ## Flow
//!
//! 18 cards are dealt face down in a 3x6 grid. Players reveal one card each
//! in seat order. Once everyone in the round has picked, the lowest value
//! wins. If several players share the lowest value, a fresh grid is dealt
//! and only those players pick again, in seat order, for as many rounds
//! as it takes.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cards::{Card, CardId, Deck};
use crate::core::{ActionError, DeckCount, GameRng, PlayerAction, PlayerId, PlayerMap};
use crate::rules::{StageContext, StageRules};
use crate::stages::StageKind;

/// State of the dealer-selection stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealerSelectionState {
    deck: Deck,
    /// Face-down grid, row by row.
    pub grid: Vec<Card>,
    /// Cards revealed this round. Entries of players outside a tie-break
    /// keep the card they revealed earlier.
    pub selected_cards: PlayerMap<Card>,
    /// Players picking this round, in seat order.
    pub round_players: Vec<PlayerId>,
    pub current_selecting_player: Option<PlayerId>,
    pub dealer: Option<PlayerId>,
    /// Tied players while a tie-break is running, empty otherwise.
    pub tie_breaker_players: Vec<PlayerId>,
    /// Tie-break rounds played so far.
    pub tie_break_round: u32,
    seat_order: Vec<PlayerId>,
}

impl DealerSelectionState {
    /// Deal the first grid for the given seats.
    #[must_use]
    pub fn new(seat_order: Vec<PlayerId>, rng: &mut GameRng) -> Self {
        let mut deck = Deck::shuffled(DeckCount::Single, rng);
        let grid = deck.deal_grid(rng);

        Self {
            deck,
            grid,
            selected_cards: PlayerMap::empty(),
            current_selecting_player: seat_order.first().copied(),
            round_players: seat_order.clone(),
            dealer: None,
            tie_breaker_players: Vec::new(),
            tie_break_round: 0,
            seat_order,
        }
    }

    /// Look up a grid card.
    #[must_use]
    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.grid.iter().find(|c| c.id == id)
    }

    /// Cards left undealt behind the grid.
    #[must_use]
    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Reveal a grid card for `player`.
    pub fn select_card(
        &mut self,
        player: PlayerId,
        card_id: CardId,
        rng: &mut GameRng,
    ) -> Result<(), ActionError> {
        if self.dealer.is_some() {
            return Err(ActionError::StageComplete);
        }
        if self.current_selecting_player != Some(player) {
            return Err(ActionError::NotYourTurn(player));
        }
        let idx = self
            .grid
            .iter()
            .position(|c| c.id == card_id)
            .ok_or(ActionError::CardNotFound(card_id))?;
        if self.grid[idx].is_flipped {
            return Err(ActionError::CardAlreadyRevealed(card_id));
        }

        self.grid[idx].is_flipped = true;
        let card = self.grid[idx].clone();
        debug!(player = %player, card = %card, "dealer card revealed");
        self.selected_cards.insert(player, card);

        self.current_selecting_player = self
            .round_players
            .iter()
            .copied()
            .find(|p| !self.has_selected(*p));

        if self.current_selecting_player.is_none() {
            self.resolve(rng);
        }
        Ok(())
    }

    /// Throw the grid away and restart with every seat.
    pub fn redeal(&mut self, rng: &mut GameRng) {
        info!(round = self.tie_break_round, "dealer selection redealt");
        self.round_players = self.seat_order.clone();
        self.tie_breaker_players.clear();
        self.selected_cards.clear();
        self.deal_round(rng);
    }

    fn has_selected(&self, player: PlayerId) -> bool {
        self.selected_cards.contains(player)
    }

    fn resolve(&mut self, rng: &mut GameRng) {
        let values: Vec<(PlayerId, u8)> = self
            .round_players
            .iter()
            .filter_map(|p| self.selected_cards.get(*p).map(|c| (*p, c.value())))
            .collect();
        debug_assert_eq!(values.len(), self.round_players.len(), "resolving before everyone picked");

        let Some(lowest) = values.iter().map(|(_, v)| *v).min() else {
            return;
        };
        let tied: Vec<PlayerId> = values
            .iter()
            .filter(|(_, v)| *v == lowest)
            .map(|(p, _)| *p)
            .collect();

        if let [winner] = tied[..] {
            info!(dealer = %winner, value = lowest, "dealer selected");
            self.dealer = Some(winner);
            self.tie_breaker_players.clear();
            return;
        }

        self.tie_break_round += 1;
        info!(
            players = ?tied,
            value = lowest,
            round = self.tie_break_round,
            "dealer selection tied, dealing a tie-break grid"
        );
        for p in &tied {
            self.selected_cards.remove(*p);
        }
        self.tie_breaker_players = tied.clone();
        self.round_players = tied;
        self.deal_round(rng);
    }

    fn deal_round(&mut self, rng: &mut GameRng) {
        self.deck.reset(rng);
        self.grid = self.deck.deal_grid(rng);
        self.current_selecting_player = self.round_players.first().copied();
    }
}

impl StageRules for DealerSelectionState {
    fn kind(&self) -> StageKind {
        StageKind::DealerSelection
    }

    fn apply(
        &mut self,
        ctx: &mut StageContext<'_>,
        player: PlayerId,
        action: &PlayerAction,
    ) -> Result<(), ActionError> {
        match action {
            PlayerAction::SelectDealerCard { card_id } => self.select_card(player, *card_id, ctx.rng),
            PlayerAction::RedealDealerCards => {
                if ctx.roster.host() != Some(player) {
                    return Err(ActionError::NotHost);
                }
                if self.dealer.is_some() {
                    return Err(ActionError::StageComplete);
                }
                self.redeal(ctx.rng);
                Ok(())
            }
            other => Err(self.wrong_stage(other)),
        }
    }

    fn is_complete(&self) -> bool {
        self.dealer.is_some()
    }

    fn current_actor(&self) -> Option<PlayerId> {
        self.current_selecting_player
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Rank, Suit, GRID_SIZE};

    fn seats(n: u32) -> Vec<PlayerId> {
        (1..=n).map(PlayerId::new).collect()
    }

    /// Swap a chosen card into the grid so a test controls what gets revealed.
    fn plant(state: &mut DealerSelectionState, idx: usize, suit: Suit, rank: Rank) -> CardId {
        let position = state.grid[idx].position;
        let mut card = Card::new(0, suit, rank);
        card.position = position;
        state.grid[idx] = card;
        state.grid[idx].id
    }

    #[test]
    fn test_initial_grid() {
        let state = DealerSelectionState::new(seats(3), &mut GameRng::new(1));

        assert_eq!(state.grid.len(), GRID_SIZE);
        assert!(state.grid.iter().all(|c| !c.is_flipped));
        assert_eq!(state.current_selecting_player, Some(PlayerId::new(1)));
        assert_eq!(state.deck().remaining() + state.grid.len(), 32);
        assert!(!state.is_complete());
    }

    #[test]
    fn test_out_of_turn_rejected() {
        let mut rng = GameRng::new(1);
        let mut state = DealerSelectionState::new(seats(2), &mut rng);
        let card = state.grid[0].id;
        let before = state.clone();

        let err = state.select_card(PlayerId::new(2), card, &mut rng).unwrap_err();

        assert_eq!(err, ActionError::NotYourTurn(PlayerId::new(2)));
        assert_eq!(state, before);
    }

    #[test]
    fn test_unknown_and_flipped_cards_rejected() {
        let mut rng = GameRng::new(1);
        let mut state = DealerSelectionState::new(seats(3), &mut rng);
        let first = state.grid[0].id;

        // Ids not in the grid are rejected
        let missing = state.deck().draw_pile()[0].id;
        assert_eq!(
            state.select_card(PlayerId::new(1), missing, &mut rng),
            Err(ActionError::CardNotFound(missing))
        );

        state.select_card(PlayerId::new(1), first, &mut rng).unwrap();
        assert_eq!(
            state.select_card(PlayerId::new(2), first, &mut rng),
            Err(ActionError::CardAlreadyRevealed(first))
        );
        assert_eq!(state.current_selecting_player, Some(PlayerId::new(2)));
    }

    #[test]
    fn test_lowest_card_wins() {
        let mut rng = GameRng::new(4);
        let mut state = DealerSelectionState::new(seats(3), &mut rng);
        let a = plant(&mut state, 0, Suit::Hearts, Rank::King);
        let b = plant(&mut state, 1, Suit::Spades, Rank::Eight);
        let c = plant(&mut state, 2, Suit::Clubs, Rank::Ace);

        state.select_card(PlayerId::new(1), a, &mut rng).unwrap();
        state.select_card(PlayerId::new(2), b, &mut rng).unwrap();
        state.select_card(PlayerId::new(3), c, &mut rng).unwrap();

        assert_eq!(state.dealer, Some(PlayerId::new(2)));
        assert!(state.is_complete());
        assert_eq!(state.current_actor(), None);
        assert_eq!(
            state.select_card(PlayerId::new(1), state.grid[5].id, &mut rng),
            Err(ActionError::StageComplete)
        );
    }

    #[test]
    fn test_tie_restricts_next_round() {
        let mut rng = GameRng::new(4);
        let mut state = DealerSelectionState::new(seats(3), &mut rng);
        let a = plant(&mut state, 0, Suit::Hearts, Rank::Seven);
        let b = plant(&mut state, 1, Suit::Spades, Rank::King);
        let c = plant(&mut state, 2, Suit::Clubs, Rank::Seven);
        let old_grid = state.grid.clone();

        state.select_card(PlayerId::new(1), a, &mut rng).unwrap();
        state.select_card(PlayerId::new(2), b, &mut rng).unwrap();
        state.select_card(PlayerId::new(3), c, &mut rng).unwrap();

        assert!(!state.is_complete());
        assert_eq!(state.tie_break_round, 1);
        assert_eq!(state.tie_breaker_players, vec![PlayerId::new(1), PlayerId::new(3)]);
        assert_eq!(state.round_players, state.tie_breaker_players);
        assert_eq!(state.current_selecting_player, Some(PlayerId::new(1)));
        assert!(state.grid.iter().all(|c| !c.is_flipped));
        assert_ne!(state.grid, old_grid);

        // B sits the tie-break out
        assert!(!state.selected_cards.contains(PlayerId::new(1)));
        assert!(state.selected_cards.contains(PlayerId::new(2)));
        let next = state.grid[0].id;
        state.select_card(PlayerId::new(1), next, &mut rng).unwrap();
        assert_eq!(state.current_selecting_player, Some(PlayerId::new(3)));
    }

    #[test]
    fn test_redeal_restarts_with_everyone() {
        let mut rng = GameRng::new(8);
        let mut state = DealerSelectionState::new(seats(2), &mut rng);
        let first = state.grid[0].id;
        state.select_card(PlayerId::new(1), first, &mut rng).unwrap();

        state.redeal(&mut rng);

        assert!(state.selected_cards.is_empty());
        assert_eq!(state.round_players, seats(2));
        assert_eq!(state.current_selecting_player, Some(PlayerId::new(1)));
        assert!(state.grid.iter().all(|c| !c.is_flipped));
    }
}
