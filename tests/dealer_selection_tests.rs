//! Dealer selection: lowest card, tie-breaks and redeals.

use proptest::prelude::*;
use speedway::cards::{Card, Rank, Suit};
use speedway::core::{ActionError, GameRng, PlayerId};
use speedway::stages::DealerSelectionState;

fn seats(n: u32) -> Vec<PlayerId> {
    (1..=n).map(PlayerId::new).collect()
}

/// Replace the first grid cards with known ranks.
fn plant(state: &mut DealerSelectionState, cards: &[(Suit, Rank)]) -> Vec<Card> {
    cards
        .iter()
        .enumerate()
        .map(|(i, (suit, rank))| {
            let mut card = Card::new(0, *suit, *rank);
            card.position = state.grid[i].position;
            state.grid[i] = card.clone();
            card
        })
        .collect()
}

fn first_hidden(state: &DealerSelectionState) -> Card {
    state.grid.iter().find(|c| !c.is_flipped).cloned().unwrap()
}

#[test]
fn test_lowest_card_takes_the_button() {
    let mut rng = GameRng::new(1);
    let mut state = DealerSelectionState::new(seats(3), &mut rng);
    let cards = plant(
        &mut state,
        &[(Suit::Hearts, Rank::King), (Suit::Clubs, Rank::Eight), (Suit::Spades, Rank::Ten)],
    );

    for (player, card) in seats(3).into_iter().zip(&cards) {
        state.select_card(player, card.id, &mut rng).unwrap();
    }

    assert_eq!(state.dealer, Some(PlayerId::new(2)));
    assert_eq!(state.current_selecting_player, None);
    assert_eq!(state.tie_break_round, 0);
}

#[test]
fn test_tie_break_only_involves_tied_players() {
    let (a, b, c) = (PlayerId::new(1), PlayerId::new(2), PlayerId::new(3));
    let mut rng = GameRng::new(9);
    let mut state = DealerSelectionState::new(seats(3), &mut rng);
    let cards = plant(
        &mut state,
        &[(Suit::Hearts, Rank::Seven), (Suit::Spades, Rank::King), (Suit::Clubs, Rank::Seven)],
    );

    state.select_card(a, cards[0].id, &mut rng).unwrap();
    state.select_card(b, cards[1].id, &mut rng).unwrap();
    state.select_card(c, cards[2].id, &mut rng).unwrap();

    assert_eq!(state.dealer, None);
    assert_eq!(state.tie_break_round, 1);
    assert_eq!(state.tie_breaker_players, vec![a, c]);
    assert_eq!(state.round_players, vec![a, c]);
    assert_eq!(state.current_selecting_player, Some(a));
    assert!(state.grid.iter().all(|card| !card.is_flipped));
    assert_eq!(state.selected_cards.get(b).map(|card| card.rank), Some(Rank::King));

    // B sits the tie-break out
    let hidden = first_hidden(&state).id;
    assert_eq!(state.select_card(b, hidden, &mut rng), Err(ActionError::NotYourTurn(b)));

    while state.dealer.is_none() {
        assert!(!state.round_players.contains(&b));
        let player = state.current_selecting_player.unwrap();
        let card = first_hidden(&state).id;
        state.select_card(player, card, &mut rng).unwrap();
    }

    let dealer = state.dealer.unwrap();
    assert!(dealer == a || dealer == c);
    let other = if dealer == a { c } else { a };
    assert!(state.selected_cards[dealer].value() < state.selected_cards[other].value());
}

#[test]
fn test_revealed_card_cannot_be_picked_again() {
    let mut rng = GameRng::new(4);
    let mut state = DealerSelectionState::new(seats(2), &mut rng);
    let card = first_hidden(&state).id;

    state.select_card(PlayerId::new(1), card, &mut rng).unwrap();

    assert_eq!(
        state.select_card(PlayerId::new(2), card, &mut rng),
        Err(ActionError::CardAlreadyRevealed(card))
    );
    assert_eq!(state.current_selecting_player, Some(PlayerId::new(2)));
}

#[test]
fn test_redeal_restarts_with_every_seat() {
    let mut rng = GameRng::new(6);
    let mut state = DealerSelectionState::new(seats(4), &mut rng);
    let card = first_hidden(&state).id;
    state.select_card(PlayerId::new(1), card, &mut rng).unwrap();

    state.redeal(&mut rng);

    assert!(state.selected_cards.is_empty());
    assert_eq!(state.round_players, seats(4));
    assert_eq!(state.current_selecting_player, Some(PlayerId::new(1)));
    assert_eq!(state.grid.len(), 18);
    assert!(state.grid.iter().all(|card| !card.is_flipped));
}

proptest! {
    /// However the picks fall, selection ends with one dealer whose card
    /// beats everyone in the deciding round.
    #[test]
    fn test_selection_always_resolves(
        seed in any::<u64>(),
        players in 2u32..=4,
        picks in prop::collection::vec(any::<prop::sample::Index>(), 200),
    ) {
        let mut rng = GameRng::new(seed);
        let mut state = DealerSelectionState::new(seats(players), &mut rng);

        for pick in picks {
            if state.dealer.is_some() {
                break;
            }
            let hidden: Vec<Card> = state.grid.iter().filter(|c| !c.is_flipped).cloned().collect();
            let card = &hidden[pick.index(hidden.len())];
            let player = state.current_selecting_player.unwrap();
            state.select_card(player, card.id, &mut rng).unwrap();
        }

        // Four-way ties on every grid for 200 picks do not happen in practice
        prop_assume!(state.dealer.is_some());
        let dealer = state.dealer.unwrap();
        prop_assert!(state.round_players.contains(&dealer));
        let dealer_value = state.selected_cards[dealer].value();
        for other in state.round_players.iter().filter(|p| **p != dealer) {
            prop_assert!(dealer_value < state.selected_cards[*other].value());
        }
        prop_assert_eq!(state.selected_cards.len(), players as usize);
    }
}
