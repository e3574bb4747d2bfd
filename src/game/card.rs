//! Cards, the shoe and hand totals.

use super::GameError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cards in a standard deck.
pub const DECK_SIZE: u8 = 52;

const RANK_LABELS: [&str; 13] = [
    "A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K",
];

/// Card suits, in encoding order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suit {
    Spades = 0,
    Hearts = 1,
    Diamonds = 2,
    Clubs = 3,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn letter(&self) -> char {
        match self {
            Suit::Spades => 'S',
            Suit::Hearts => 'H',
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Suit::Spades => '\u{2660}',
            Suit::Hearts => '\u{2665}',
            Suit::Diamonds => '\u{2666}',
            Suit::Clubs => '\u{2663}',
        }
    }

    pub fn is_red(&self) -> bool {
        matches!(self, Suit::Hearts | Suit::Diamonds)
    }
}

/// A playing card encoded as `suit * 13 + (rank - 1)`, so 0..52.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Card(u8);

impl Card {
    /// Build a card from a rank (1 = Ace .. 13 = King) and a suit.
    pub fn new(rank: u8, suit: Suit) -> Result<Self, GameError> {
        if !(1..=13).contains(&rank) {
            return Err(GameError::InvalidCard(rank));
        }
        Ok(Card(suit as u8 * 13 + rank - 1))
    }

    /// 1 = Ace, 2..=10 pips, 11 = Jack, 12 = Queen, 13 = King.
    pub fn rank(&self) -> u8 {
        self.0 % 13 + 1
    }

    pub fn suit(&self) -> Suit {
        Suit::ALL[usize::from(self.0 / 13)]
    }

    pub fn is_ace(&self) -> bool {
        self.rank() == 1
    }

    /// Blackjack value with aces counted high.
    pub fn value(&self) -> u32 {
        match self.rank() {
            1 => 11,
            r if r >= 10 => 10,
            r => u32::from(r),
        }
    }

    /// Compact code used in the hand history, e.g. `10H` or `KS`.
    pub fn code(&self) -> String {
        format!("{}{}", self.rank_label(), self.suit().letter())
    }

    pub fn rank_label(&self) -> &'static str {
        RANK_LABELS[usize::from(self.rank() - 1)]
    }
}

impl TryFrom<u8> for Card {
    type Error = GameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value < DECK_SIZE {
            Ok(Card(value))
        } else {
            Err(GameError::InvalidCard(value))
        }
    }
}

impl From<Card> for u8 {
    fn from(card: Card) -> u8 {
        card.0
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank_label(), self.suit().symbol())
    }
}

/// Total of a hand, demoting aces from 11 to 1 while the hand would bust.
pub fn hand_value(cards: &[Card]) -> u32 {
    let mut total: u32 = cards.iter().map(Card::value).sum();
    let mut aces = cards.iter().filter(|c| c.is_ace()).count();

    while total > 21 && aces > 0 {
        total -= 10;
        aces -= 1;
    }

    total
}

/// Space separated card codes, as stored in `hand_history`.
pub fn hand_codes(cards: &[Card]) -> String {
    cards.iter().map(Card::code).collect::<Vec<_>>().join(" ")
}

/// Remaining cards; draws come off the back.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A full 52-card deck shuffled with Fisher-Yates.
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut cards: Vec<Card> = (0..DECK_SIZE).map(Card).collect();
        cards.shuffle(rng);
        Self { cards }
    }

    /// A stacked deck that deals `cards` in the order given.
    pub fn stacked(mut cards: Vec<Card>) -> Self {
        cards.reverse();
        Self { cards }
    }

    pub fn draw(&mut self) -> Result<Card, GameError> {
        self.cards.pop().ok_or(GameError::DeckExhausted)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
