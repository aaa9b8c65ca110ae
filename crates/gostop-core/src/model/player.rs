use crate::model::captured::Captured;
use crate::model::card::{CardId, Month};
use crate::model::economy::STARTING_GOLD;
use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Seat {
    North = 0,
    South = 1,
}

impl Seat {
    pub const LOOP: [Seat; 2] = [Seat::North, Seat::South];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Seat::North),
            1 => Some(Seat::South),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn opponent(self) -> Self {
        match self {
            Seat::North => Seat::South,
            Seat::South => Seat::North,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Seat::North => "North",
            Seat::South => "South",
        };
        f.write_str(label)
    }
}

/// How the gukjin card (September five) scores for its owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GukjinMode {
    #[default]
    Five,
    Junk,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounters {
    pub shaking: u8,
    pub bomb: u8,
    pub ppuk: u8,
    pub jjob: u8,
    pub ddadak: u8,
    pub sweep: u8,
    pub stack_capture: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub hand: Vec<CardId>,
    /// Dummy turns granted after a bomb; each one flips without playing.
    pub pass_tokens: u8,
    pub captured: Captured,
    pub go_count: u8,
    pub last_go_base: u32,
    pub gold: i64,
    pub events: EventCounters,
    pub gukjin_mode: GukjinMode,
    pub gukjin_locked: bool,
    pub shaking_months: Vec<Month>,
    pub president_hold: Option<Month>,
    pub turn_count: u8,
    pub ppuk_streak: u8,
    pub declared_stop: bool,
}

impl Player {
    pub fn new(gold: i64) -> Self {
        Self {
            hand: Vec::new(),
            pass_tokens: 0,
            captured: Captured::default(),
            go_count: 0,
            last_go_base: 0,
            gold,
            events: EventCounters::default(),
            gukjin_mode: GukjinMode::Five,
            gukjin_locked: false,
            shaking_months: Vec::new(),
            president_hold: None,
            turn_count: 0,
            ppuk_streak: 0,
            declared_stop: false,
        }
    }

    /// Cards plus pass tokens: the number of turns this player still owes.
    pub fn turns_left(&self) -> usize {
        self.hand.len() + self.pass_tokens as usize
    }

    pub fn hand_month_count(&self, month: Month) -> usize {
        self.hand.iter().filter(|c| c.month() == month).count()
    }

    pub fn holds(&self, card: CardId) -> bool {
        self.hand.contains(&card)
    }

    pub fn remove_from_hand(&mut self, card: CardId) -> bool {
        match self.hand.iter().position(|c| *c == card) {
            Some(pos) => {
                self.hand.remove(pos);
                true
            }
            None => false,
        }
    }

    /// First month with all four of its cards in hand.
    pub fn president_month(&self) -> Option<Month> {
        (1..=12).find(|m| self.hand_month_count(*m) >= 4)
    }

    pub fn capture(&mut self, card: CardId) {
        self.captured.push(card, self.gukjin_mode);
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new(STARTING_GOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::{GukjinMode, Player, Seat};
    use crate::model::card::CardId;

    #[test]
    fn seat_opponent_round_trips() {
        for seat in Seat::LOOP {
            assert_eq!(seat.opponent().opponent(), seat);
            assert_eq!(Seat::from_index(seat.index()), Some(seat));
        }
        assert_eq!(Seat::from_index(2), None);
    }

    #[test]
    fn president_month_needs_four_of_a_kind() {
        let mut player = Player::default();
        player.hand = ["C0", "C1", "C2", "A0"]
            .iter()
            .map(|c| c.parse().expect("card"))
            .collect();
        assert_eq!(player.president_month(), None);
        player.hand.push("C3".parse().expect("card"));
        assert_eq!(player.president_month(), Some(3));
    }

    #[test]
    fn locked_junk_mode_files_gukjin_as_junk() {
        let mut player = Player::default();
        player.gukjin_mode = GukjinMode::Junk;
        player.gukjin_locked = true;
        player.capture(CardId::gukjin());
        assert_eq!(player.captured.pi_count(), 2);
        assert_eq!(player.captured.five_count(), 0);
    }

    #[test]
    fn turns_left_counts_pass_tokens() {
        let mut player = Player::default();
        player.hand = vec!["A0".parse().expect("card")];
        player.pass_tokens = 2;
        assert_eq!(player.turns_left(), 3);
    }
}
