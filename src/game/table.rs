//! A player's seat at the table: the current hand plus the bookkeeping that
//! ties consecutive hands together in the hand history.

use super::{hand_codes, BlackjackGame, GameError, Outcome};
use crate::db::models::NewHand;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Table {
    pub user_id: i64,
    /// Identifies this run of hands in `hand_history`
    pub game_id: Uuid,
    /// 1-based, increments on every new deal
    pub hand_number: i64,
    pub bet: i64,
    pub game: BlackjackGame,
}

impl Table {
    /// Sit down and deal the first hand.
    pub fn open<R: Rng + ?Sized>(user_id: i64, bet: i64, rng: &mut R) -> Result<Self, GameError> {
        Ok(Self {
            user_id,
            game_id: Uuid::new_v4(),
            hand_number: 1,
            bet,
            game: BlackjackGame::deal(rng)?,
        })
    }

    /// Deal the next hand at the same table.
    pub fn next_hand<R: Rng + ?Sized>(&mut self, bet: i64, rng: &mut R) -> Result<(), GameError> {
        self.game = BlackjackGame::deal(rng)?;
        self.hand_number += 1;
        self.bet = bet;
        Ok(())
    }

    /// History row for a settled hand.
    pub fn settled_hand(&self, outcome: Outcome) -> NewHand {
        let result = outcome.result();
        NewHand {
            user_id: self.user_id,
            game_id: self.game_id.to_string(),
            hand_number: self.hand_number,
            result,
            bet_amount: self.bet,
            winnings: result.winnings(self.bet),
            player_hand: hand_codes(self.game.player_cards()),
            dealer_hand: hand_codes(self.game.dealer_cards()),
        }
    }
}
