//! Blackjack rules for a single player against the dealer.
//!
//! A hand is dealt from a freshly shuffled 52-card deck: two cards to the
//! player, then two to the dealer. The player hits until they stand or bust;
//! on stand the dealer draws while under 17 and the totals are compared.

pub mod card;
pub mod table;

pub use card::{hand_codes, hand_value, Card, Deck, Suit};
pub use table::Table;

use crate::db::models::HandResult;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dealer stands on this total or higher.
pub const DEALER_STANDS_ON: u32 = 17;

/// Message shown while the player is still to act.
pub const IN_PLAY_MESSAGE: &str = "Game started. Hit or stand?";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("hand is already complete")]
    HandComplete,
    #[error("deck exhausted")]
    DeckExhausted,
    #[error("invalid card {0}")]
    InvalidCard(u8),
}

/// How a finished hand ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    PlayerBust,
    DealerBust,
    PlayerWins,
    DealerWins,
    Push,
}

impl Outcome {
    pub fn result(&self) -> HandResult {
        match self {
            Outcome::DealerBust | Outcome::PlayerWins => HandResult::Win,
            Outcome::PlayerBust | Outcome::DealerWins => HandResult::Loss,
            Outcome::Push => HandResult::Push,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Outcome::PlayerBust => "You busted! Dealer wins.",
            Outcome::DealerBust | Outcome::PlayerWins => "You win!",
            Outcome::DealerWins => "Dealer wins.",
            Outcome::Push => "Push (tie).",
        }
    }

    /// Compare final totals once the dealer has finished drawing.
    fn compare(player_total: u32, dealer_total: u32) -> Self {
        if dealer_total > 21 {
            Outcome::DealerBust
        } else if player_total > dealer_total {
            Outcome::PlayerWins
        } else if player_total < dealer_total {
            Outcome::DealerWins
        } else {
            Outcome::Push
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    PlayerTurn,
    Finished(Outcome),
}

/// One hand of Blackjack.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlackjackGame {
    deck: Deck,
    player: Vec<Card>,
    dealer: Vec<Card>,
    phase: Phase,
}

impl BlackjackGame {
    /// Shuffle a new deck and deal the opening cards.
    pub fn deal<R: Rng + ?Sized>(rng: &mut R) -> Result<Self, GameError> {
        Self::deal_from(Deck::shuffled(rng))
    }

    /// Deal the opening cards from a prepared deck.
    pub fn deal_from(mut deck: Deck) -> Result<Self, GameError> {
        let player = vec![deck.draw()?, deck.draw()?];
        let dealer = vec![deck.draw()?, deck.draw()?];

        Ok(Self {
            deck,
            player,
            dealer,
            phase: Phase::PlayerTurn,
        })
    }

    /// Draw one card for the player. Returns the outcome if the player busts.
    pub fn hit(&mut self) -> Result<Option<Outcome>, GameError> {
        if self.is_finished() {
            return Err(GameError::HandComplete);
        }

        let card = self.deck.draw()?;
        self.player.push(card);

        if hand_value(&self.player) > 21 {
            self.phase = Phase::Finished(Outcome::PlayerBust);
            return Ok(Some(Outcome::PlayerBust));
        }

        Ok(None)
    }

    /// Play out the dealer's hand and settle.
    pub fn stand(&mut self) -> Result<Outcome, GameError> {
        if self.is_finished() {
            return Err(GameError::HandComplete);
        }

        while hand_value(&self.dealer) < DEALER_STANDS_ON {
            let card = self.deck.draw()?;
            self.dealer.push(card);
        }

        let outcome = Outcome::compare(hand_value(&self.player), hand_value(&self.dealer));
        self.phase = Phase::Finished(outcome);
        Ok(outcome)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Finished(outcome) => Some(outcome),
            Phase::PlayerTurn => None,
        }
    }

    pub fn message(&self) -> &'static str {
        self.outcome().map_or(IN_PLAY_MESSAGE, |o| o.message())
    }

    pub fn player_cards(&self) -> &[Card] {
        &self.player
    }

    pub fn dealer_cards(&self) -> &[Card] {
        &self.dealer
    }

    /// Dealer cards the player may see: the hole card stays down until the hand ends.
    pub fn visible_dealer_cards(&self) -> &[Card] {
        if self.is_finished() {
            &self.dealer
        } else {
            &self.dealer[..1.min(self.dealer.len())]
        }
    }

    pub fn player_total(&self) -> u32 {
        hand_value(&self.player)
    }

    pub fn dealer_total(&self) -> u32 {
        hand_value(&self.dealer)
    }

    pub fn visible_dealer_total(&self) -> u32 {
        hand_value(self.visible_dealer_cards())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn c(rank: u8) -> Card {
        Card::new(rank, Suit::Clubs).unwrap()
    }

    /// Deals player, player, dealer, dealer, then the rest in order.
    fn stacked(cards: &[u8]) -> BlackjackGame {
        BlackjackGame::deal_from(Deck::stacked(cards.iter().map(|&r| c(r)).collect())).unwrap()
    }

    #[test]
    fn test_deal_gives_two_cards_each() {
        let mut rng = StdRng::seed_from_u64(42);
        let game = BlackjackGame::deal(&mut rng).unwrap();
        assert_eq!(game.player_cards().len(), 2);
        assert_eq!(game.dealer_cards().len(), 2);
        assert_eq!(game.phase(), Phase::PlayerTurn);
        assert_eq!(game.message(), IN_PLAY_MESSAGE);
    }

    #[test]
    fn test_hole_card_hidden_until_finished() {
        let mut game = stacked(&[10, 7, 13, 9]);
        assert_eq!(game.visible_dealer_cards(), &[c(13)]);
        assert_eq!(game.visible_dealer_total(), 10);

        game.stand().unwrap();
        assert_eq!(game.visible_dealer_cards().len(), 2);
    }

    #[test]
    fn test_player_bust_on_hit() {
        let mut game = stacked(&[10, 6, 9, 8, 13]);
        assert_eq!(game.hit().unwrap(), Some(Outcome::PlayerBust));
        assert!(game.is_finished());
        assert_eq!(game.message(), "You busted! Dealer wins.");
        assert_eq!(game.outcome().unwrap().result(), HandResult::Loss);
    }

    #[test]
    fn test_hit_without_bust_keeps_playing() {
        let mut game = stacked(&[2, 3, 9, 8, 4]);
        assert_eq!(game.hit().unwrap(), None);
        assert_eq!(game.player_total(), 9);
        assert!(!game.is_finished());
    }

    #[test]
    fn test_dealer_draws_to_seventeen() {
        // Player 20, dealer 6 + 5 then draws 2 and 4 to reach 17.
        let mut game = stacked(&[10, 13, 6, 5, 2, 4, 9]);
        let outcome = game.stand().unwrap();
        assert_eq!(game.dealer_total(), 17);
        assert_eq!(game.dealer_cards().len(), 4);
        assert_eq!(outcome, Outcome::PlayerWins);
        assert_eq!(game.message(), "You win!");
    }

    #[test]
    fn test_dealer_bust_is_a_win() {
        let mut game = stacked(&[10, 2, 10, 6, 13]);
        assert_eq!(game.stand().unwrap(), Outcome::DealerBust);
        assert_eq!(Outcome::DealerBust.result(), HandResult::Win);
    }

    #[test]
    fn test_dealer_higher_total_wins() {
        let mut game = stacked(&[10, 7, 10, 9]);
        assert_eq!(game.stand().unwrap(), Outcome::DealerWins);
        assert_eq!(game.message(), "Dealer wins.");
    }

    #[test]
    fn test_equal_totals_push() {
        let mut game = stacked(&[10, 8, 13, 8]);
        assert_eq!(game.stand().unwrap(), Outcome::Push);
        assert_eq!(game.message(), "Push (tie).");
        assert_eq!(game.outcome().unwrap().result(), HandResult::Push);
    }

    #[test]
    fn test_soft_seventeen_dealer_stands() {
        let mut game = stacked(&[10, 8, 1, 6, 5]);
        assert_eq!(game.stand().unwrap(), Outcome::PlayerWins);
        assert_eq!(game.dealer_cards().len(), 2);
    }

    #[test]
    fn test_actions_rejected_after_finish() {
        let mut game = stacked(&[10, 8, 13, 8]);
        game.stand().unwrap();
        assert_eq!(game.hit(), Err(GameError::HandComplete));
        assert_eq!(game.stand(), Err(GameError::HandComplete));
    }

    #[test]
    fn test_short_deck_reports_exhaustion() {
        let deck = Deck::stacked(vec![c(2), c(3), c(4)]);
        assert!(matches!(
            BlackjackGame::deal_from(deck),
            Err(GameError::DeckExhausted)
        ));
    }
}
