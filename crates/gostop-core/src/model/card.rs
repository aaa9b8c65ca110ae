use crate::model::combo::Combo;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Months run 1..=12; bonus cards sit in the thirteenth band.
pub type Month = u8;

pub const BONUS_MONTH: Month = 13;
pub const DECK_SIZE: usize = 50;
pub const FILLER_COUNT: usize = 24;
const TABLE_SIZE: usize = DECK_SIZE + FILLER_COUNT;

/// Month of the bright that downgrades a three-bright set.
pub const RAIN_MONTH: Month = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Bright,
    Five,
    Ribbon,
    Junk,
    Bonus,
}

impl Category {
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Bright => "bright",
            Category::Five => "five",
            Category::Ribbon => "ribbon",
            Category::Junk => "junk",
            Category::Bonus => "bonus",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one physical card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub code: &'static str,
    pub month: Month,
    pub category: Category,
    /// Junk weight when the card sits in a junk pile (the gukjin card counts 2).
    pub pi: u8,
    /// Junk taken from the opponent when a bonus card is collected.
    pub steal: u8,
    pub combo: Option<Combo>,
}

impl Card {
    const fn new(index: u8, code: &'static str, month: Month, category: Category, pi: u8) -> Self {
        Self {
            id: CardId(index),
            code,
            month,
            category,
            pi,
            steal: 0,
            combo: None,
        }
    }

    const fn tagged(mut self, combo: Combo) -> Self {
        self.combo = Some(combo);
        self
    }

    const fn bonus(index: u8, code: &'static str, pi: u8) -> Self {
        let mut card = Self::new(index, code, BONUS_MONTH, Category::Bonus, pi);
        card.steal = 1;
        card
    }

    pub const fn is_bonus(&self) -> bool {
        matches!(self.category, Category::Bonus)
    }

    pub const fn is_bright(&self) -> bool {
        matches!(self.category, Category::Bright)
    }

    pub const fn is_five(&self) -> bool {
        matches!(self.category, Category::Five)
    }

    pub const fn is_ribbon(&self) -> bool {
        matches!(self.category, Category::Ribbon)
    }

    pub const fn is_junk(&self) -> bool {
        matches!(self.category, Category::Junk)
    }

    pub const fn is_gukjin(&self) -> bool {
        self.month == 9 && self.is_five()
    }

    pub const fn is_double_junk(&self) -> bool {
        (self.is_junk() || self.is_bonus()) && self.pi >= 2
    }

    pub const fn is_filler(&self) -> bool {
        self.id.is_filler()
    }
}

use Category::{Bright, Five, Junk, Ribbon};

const MONTH_CARDS: [Card; DECK_SIZE] = [
    Card::new(0, "A0", 1, Bright, 0),
    Card::new(1, "A1", 1, Ribbon, 0).tagged(Combo::RedRibbons),
    Card::new(2, "A2", 1, Junk, 1),
    Card::new(3, "A3", 1, Junk, 1),
    Card::new(4, "B0", 2, Five, 0).tagged(Combo::FiveBirds),
    Card::new(5, "B1", 2, Ribbon, 0).tagged(Combo::RedRibbons),
    Card::new(6, "B2", 2, Junk, 1),
    Card::new(7, "B3", 2, Junk, 1),
    Card::new(8, "C0", 3, Bright, 0),
    Card::new(9, "C1", 3, Ribbon, 0).tagged(Combo::RedRibbons),
    Card::new(10, "C2", 3, Junk, 1),
    Card::new(11, "C3", 3, Junk, 1),
    Card::new(12, "D0", 4, Five, 0).tagged(Combo::FiveBirds),
    Card::new(13, "D1", 4, Ribbon, 0).tagged(Combo::PlainRibbons),
    Card::new(14, "D2", 4, Junk, 1),
    Card::new(15, "D3", 4, Junk, 1),
    Card::new(16, "E0", 5, Five, 0),
    Card::new(17, "E1", 5, Ribbon, 0).tagged(Combo::PlainRibbons),
    Card::new(18, "E2", 5, Junk, 1),
    Card::new(19, "E3", 5, Junk, 1),
    Card::new(20, "F0", 6, Five, 0),
    Card::new(21, "F1", 6, Ribbon, 0).tagged(Combo::BlueRibbons),
    Card::new(22, "F2", 6, Junk, 1),
    Card::new(23, "F3", 6, Junk, 1),
    Card::new(24, "G0", 7, Five, 0),
    Card::new(25, "G1", 7, Ribbon, 0).tagged(Combo::PlainRibbons),
    Card::new(26, "G2", 7, Junk, 1),
    Card::new(27, "G3", 7, Junk, 1),
    Card::new(28, "H0", 8, Bright, 0),
    Card::new(29, "H1", 8, Five, 0).tagged(Combo::FiveBirds),
    Card::new(30, "H2", 8, Junk, 1),
    Card::new(31, "H3", 8, Junk, 1),
    Card::new(32, "I0", 9, Five, 2),
    Card::new(33, "I1", 9, Ribbon, 0).tagged(Combo::BlueRibbons),
    Card::new(34, "I2", 9, Junk, 1),
    Card::new(35, "I3", 9, Junk, 1),
    Card::new(36, "J0", 10, Five, 0),
    Card::new(37, "J1", 10, Ribbon, 0).tagged(Combo::BlueRibbons),
    Card::new(38, "J2", 10, Junk, 1),
    Card::new(39, "J3", 10, Junk, 1),
    Card::new(40, "K0", 11, Bright, 0),
    Card::new(41, "K1", 11, Junk, 2),
    Card::new(42, "K2", 11, Junk, 1),
    Card::new(43, "K3", 11, Junk, 1),
    Card::new(44, "L0", 12, Bright, 0),
    Card::new(45, "L1", 12, Five, 0),
    Card::new(46, "L2", 12, Ribbon, 0),
    Card::new(47, "L3", 12, Junk, 2),
    Card::bonus(48, "M0", 2),
    Card::bonus(49, "M1", 3),
];

const fn build_table() -> [Card; TABLE_SIZE] {
    let placeholder = Card::new(0, "??", 1, Junk, 1);
    let mut table = [placeholder; TABLE_SIZE];
    let mut i = 0;
    while i < DECK_SIZE {
        table[i] = MONTH_CARDS[i];
        i += 1;
    }
    let mut f = 0;
    while f < FILLER_COUNT {
        let index = DECK_SIZE + f;
        table[index] = Card::new(index as u8, "??", (f % 12) as u8 + 1, Junk, 1);
        f += 1;
    }
    table
}

static TABLE: [Card; TABLE_SIZE] = build_table();

/// Compact handle into the fixed card table.
///
/// Identifiers `0..DECK_SIZE` are the physical deck; the remaining slots are
/// low-confidence filler cards produced only by the determinization sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardId(u8);

impl CardId {
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < TABLE_SIZE {
            Some(CardId(index as u8))
        } else {
            None
        }
    }

    pub const fn filler(slot: usize) -> Option<Self> {
        if slot < FILLER_COUNT {
            Some(CardId((DECK_SIZE + slot) as u8))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_filler(self) -> bool {
        self.index() >= DECK_SIZE
    }

    pub fn card(self) -> &'static Card {
        &TABLE[self.index()]
    }

    pub fn month(self) -> Month {
        self.card().month
    }

    pub fn category(self) -> Category {
        self.card().category
    }

    /// Every physical card in catalogue order.
    pub fn deck() -> impl Iterator<Item = CardId> + Clone {
        (0..DECK_SIZE as u8).map(CardId)
    }

    pub fn of_month(month: Month) -> impl Iterator<Item = CardId> {
        Self::deck().filter(move |id| id.month() == month)
    }

    pub fn gukjin() -> CardId {
        CardId(32)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_filler() {
            write!(f, "X{}", self.index() - DECK_SIZE)
        } else {
            f.write_str(self.card().code)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCardError(pub String);

impl fmt::Display for ParseCardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown card code `{}`", self.0)
    }
}

impl std::error::Error for ParseCardError {}

impl FromStr for CardId {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(slot) = s.strip_prefix('X') {
            return slot
                .parse::<usize>()
                .ok()
                .and_then(CardId::filler)
                .ok_or_else(|| ParseCardError(s.to_string()));
        }
        Self::deck()
            .find(|id| id.card().code == s)
            .ok_or_else(|| ParseCardError(s.to_string()))
    }
}

impl TryFrom<String> for CardId {
    type Error = ParseCardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CardId> for String {
    fn from(id: CardId) -> Self {
        id.to_string()
    }
}

/// Bit set over months 1..=13.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthSet(u16);

impl MonthSet {
    pub const EMPTY: MonthSet = MonthSet(0);

    pub fn insert(&mut self, month: Month) {
        if month <= BONUS_MONTH {
            self.0 |= 1 << month;
        }
    }

    pub fn contains(self, month: Month) -> bool {
        month <= BONUS_MONTH && self.0 & (1 << month) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(self, other: MonthSet) -> MonthSet {
        MonthSet(self.0 | other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Month> {
        (1..=BONUS_MONTH).filter(move |m| self.contains(*m))
    }
}

impl FromIterator<Month> for MonthSet {
    fn from_iter<T: IntoIterator<Item = Month>>(iter: T) -> Self {
        let mut set = MonthSet::EMPTY;
        for month in iter {
            set.insert(month);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::{CardId, Category, DECK_SIZE, MonthSet};

    #[test]
    fn deck_has_four_cards_per_month_and_two_bonus() {
        for month in 1..=12 {
            assert_eq!(CardId::of_month(month).count(), 4, "month {month}");
        }
        let bonus: Vec<_> = CardId::deck().filter(|id| id.card().is_bonus()).collect();
        assert_eq!(bonus.len(), 2);
        assert_eq!(CardId::deck().count(), DECK_SIZE);
    }

    #[test]
    fn codes_round_trip_through_parse() {
        for id in CardId::deck() {
            let parsed: CardId = id.to_string().parse().expect("parse code");
            assert_eq!(parsed, id);
        }
        assert!("Z9".parse::<CardId>().is_err());
    }

    #[test]
    fn gukjin_is_september_five() {
        let gukjin = CardId::gukjin().card();
        assert_eq!(gukjin.code, "I0");
        assert!(gukjin.is_gukjin());
        assert_eq!(gukjin.category, Category::Five);
    }

    #[test]
    fn fillers_are_junk_and_flagged() {
        let filler = CardId::filler(3).expect("filler slot");
        assert!(filler.is_filler());
        assert_eq!(filler.card().category, Category::Junk);
        assert_eq!(filler.month(), 4);
        assert_eq!(filler.to_string(), "X3");
    }

    #[test]
    fn double_junk_flags_match_catalogue() {
        let doubles: Vec<String> = CardId::deck()
            .filter(|id| id.card().is_double_junk())
            .map(|id| id.to_string())
            .collect();
        assert_eq!(doubles, vec!["K1", "L3", "M0", "M1"]);
    }

    #[test]
    fn month_set_tracks_membership() {
        let set: MonthSet = [1, 3, 12].into_iter().collect();
        assert!(set.contains(3));
        assert!(!set.contains(4));
        assert_eq!(set.len(), 3);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 3, 12]);
    }
}
