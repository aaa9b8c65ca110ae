use crate::model::card::{CardId, Category, Month};
use crate::model::combo::ComboProgress;
use crate::model::player::GukjinMode;
use serde::{Deserialize, Serialize};

/// Captured cards grouped the way they score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Captured {
    pub bright: Vec<CardId>,
    pub five: Vec<CardId>,
    pub ribbon: Vec<CardId>,
    pub junk: Vec<CardId>,
}

impl Captured {
    /// Files `card` into its scoring pile. The gukjin card goes to the junk pile
    /// when its owner already committed to junk mode.
    pub fn push(&mut self, card: CardId, mode: GukjinMode) {
        if self.contains(card) {
            return;
        }
        let info = card.card();
        let pile = match info.category {
            Category::Bright => &mut self.bright,
            Category::Five if info.is_gukjin() && mode == GukjinMode::Junk => &mut self.junk,
            Category::Five => &mut self.five,
            Category::Ribbon => &mut self.ribbon,
            Category::Junk | Category::Bonus => &mut self.junk,
        };
        pile.push(card);
    }

    pub fn remove(&mut self, card: CardId) -> bool {
        for pile in [
            &mut self.bright,
            &mut self.five,
            &mut self.ribbon,
            &mut self.junk,
        ] {
            if let Some(pos) = pile.iter().position(|c| *c == card) {
                pile.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn contains(&self, card: CardId) -> bool {
        self.iter().any(|c| c == card)
    }

    pub fn iter(&self) -> impl Iterator<Item = CardId> + '_ {
        self.bright
            .iter()
            .chain(self.five.iter())
            .chain(self.ribbon.iter())
            .chain(self.junk.iter())
            .copied()
    }

    pub fn len(&self) -> usize {
        self.bright.len() + self.five.len() + self.ribbon.len() + self.junk.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Junk total: every card in the junk pile counts its pi weight.
    pub fn pi_count(&self) -> u32 {
        self.junk.iter().map(|c| c.card().pi as u32).sum()
    }

    pub fn five_count(&self) -> usize {
        self.five.len()
    }

    pub fn ribbon_count(&self) -> usize {
        self.ribbon.len()
    }

    pub fn bright_count(&self) -> usize {
        self.bright.len()
    }

    pub fn has_month_category(&self, month: Month, category: Category) -> bool {
        self.iter()
            .any(|c| c.month() == month && c.category() == category)
    }

    pub fn progress(&self) -> ComboProgress {
        let cards: Vec<CardId> = self.iter().collect();
        ComboProgress::from_cards(&cards)
    }

    /// Whether the gukjin card sits in the five pile and could still move.
    pub fn gukjin_in_five(&self) -> bool {
        self.five.contains(&CardId::gukjin())
    }

    /// Moves the gukjin card from the five pile to the junk pile.
    pub fn convert_gukjin_to_junk(&mut self) -> bool {
        let gukjin = CardId::gukjin();
        if let Some(pos) = self.five.iter().position(|c| *c == gukjin) {
            self.five.remove(pos);
            self.junk.push(gukjin);
            true
        } else {
            false
        }
    }

    /// Copy of the piles as they would score under `mode`.
    pub fn with_gukjin_as(&self, mode: GukjinMode) -> Captured {
        let mut copy = self.clone();
        if mode == GukjinMode::Junk {
            copy.convert_gukjin_to_junk();
        }
        copy
    }

    /// Picks the junk card the opponent loses to a steal: single junk first,
    /// then plain doubles, then the gukjin card, then triples. Later captures go first.
    pub fn steal_candidate(&self) -> Option<CardId> {
        let rank = |id: CardId| {
            let card = id.card();
            match card.pi {
                _ if card.is_gukjin() => 3,
                1 => 1,
                2 => 2,
                _ => 4,
            }
        };
        self.junk
            .iter()
            .enumerate()
            .min_by(|(ia, a), (ib, b)| {
                rank(**a)
                    .cmp(&rank(**b))
                    .then(ib.cmp(ia))
                    .then(a.cmp(b))
            })
            .map(|(_, id)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::Captured;
    use crate::model::card::CardId;
    use crate::model::player::GukjinMode;

    fn id(code: &str) -> CardId {
        code.parse().expect("card code")
    }

    #[test]
    fn cards_land_in_scoring_piles() {
        let mut captured = Captured::default();
        for code in ["A0", "A1", "B0", "K1", "M1"] {
            captured.push(id(code), GukjinMode::Five);
        }
        assert_eq!(captured.bright_count(), 1);
        assert_eq!(captured.ribbon_count(), 1);
        assert_eq!(captured.five_count(), 1);
        assert_eq!(captured.pi_count(), 5);
    }

    #[test]
    fn gukjin_counts_as_double_junk_after_conversion() {
        let mut captured = Captured::default();
        captured.push(CardId::gukjin(), GukjinMode::Five);
        assert_eq!(captured.five_count(), 1);
        assert!(captured.convert_gukjin_to_junk());
        assert_eq!(captured.five_count(), 0);
        assert_eq!(captured.pi_count(), 2);

        let mut locked = Captured::default();
        locked.push(CardId::gukjin(), GukjinMode::Junk);
        assert_eq!(locked.pi_count(), 2);
    }

    #[test]
    fn steal_prefers_latest_single_junk() {
        let mut captured = Captured::default();
        for code in ["K1", "A2", "B2", "M1"] {
            captured.push(id(code), GukjinMode::Five);
        }
        assert_eq!(captured.steal_candidate(), Some(id("B2")));
        captured.remove(id("B2"));
        captured.remove(id("A2"));
        assert_eq!(captured.steal_candidate(), Some(id("K1")));
    }
}
