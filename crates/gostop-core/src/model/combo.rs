use crate::model::card::{CardId, Category, Month};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Months holding a bright card.
pub const BRIGHT_MONTHS: [Month; 5] = [1, 3, 8, 11, 12];

/// Fixed three-card sets that pay a bonus once fully captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combo {
    RedRibbons,
    BlueRibbons,
    PlainRibbons,
    FiveBirds,
}

impl Combo {
    pub const ALL: [Combo; 4] = [
        Combo::RedRibbons,
        Combo::BlueRibbons,
        Combo::PlainRibbons,
        Combo::FiveBirds,
    ];

    pub const fn months(self) -> [Month; 3] {
        match self {
            Combo::RedRibbons => [1, 2, 3],
            Combo::BlueRibbons => [6, 9, 10],
            Combo::PlainRibbons => [4, 5, 7],
            Combo::FiveBirds => [2, 4, 8],
        }
    }

    pub const fn required_category(self) -> Category {
        match self {
            Combo::FiveBirds => Category::Five,
            _ => Category::Ribbon,
        }
    }

    pub const fn bonus(self) -> u32 {
        match self {
            Combo::FiveBirds => 5,
            _ => 3,
        }
    }

    pub const fn is_ribbon_set(self) -> bool {
        !matches!(self, Combo::FiveBirds)
    }

    pub fn contains_month(self, month: Month) -> bool {
        self.months().contains(&month)
    }

    pub fn card_for_month(self, month: Month) -> Option<CardId> {
        CardId::of_month(month).find(|id| id.card().combo == Some(self))
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Combo::RedRibbons => "red_ribbons",
            Combo::BlueRibbons => "blue_ribbons",
            Combo::PlainRibbons => "plain_ribbons",
            Combo::FiveBirds => "five_birds",
        }
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count of captured qualifying cards per combo plus the bright count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboProgress {
    counts: [u8; 4],
    pub brights: u8,
}

impl ComboProgress {
    pub fn from_cards<'a, I>(cards: I) -> Self
    where
        I: IntoIterator<Item = &'a CardId>,
    {
        let mut progress = ComboProgress::default();
        for id in cards {
            let card = id.card();
            if card.is_bright() {
                progress.brights += 1;
            }
            if let Some(combo) = card.combo {
                progress.counts[combo as usize] += 1;
            }
        }
        progress
    }

    pub fn count(&self, combo: Combo) -> u8 {
        self.counts[combo as usize]
    }

    pub fn is_complete(&self, combo: Combo) -> bool {
        self.count(combo) >= 3
    }

    /// Combos with at least `min` captured cards that are not yet complete.
    pub fn open_at_least(&self, min: u8) -> impl Iterator<Item = Combo> + '_ {
        Combo::ALL
            .into_iter()
            .filter(move |combo| self.count(*combo) >= min && !self.is_complete(*combo))
    }
}

/// Months of `combo` not represented among `cards`.
pub fn missing_months<'a, I>(cards: I, combo: Combo) -> Vec<Month>
where
    I: IntoIterator<Item = &'a CardId>,
{
    let owned: Vec<Month> = cards
        .into_iter()
        .filter(|id| id.card().combo == Some(combo))
        .map(|id| id.month())
        .collect();
    combo
        .months()
        .into_iter()
        .filter(|m| !owned.contains(m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Combo, ComboProgress, missing_months};
    use crate::model::card::CardId;

    fn ids(codes: &[&str]) -> Vec<CardId> {
        codes.iter().map(|c| c.parse().expect("card code")).collect()
    }

    #[test]
    fn every_combo_month_has_a_tagged_card() {
        for combo in Combo::ALL {
            for month in combo.months() {
                assert!(combo.card_for_month(month).is_some(), "{combo} {month}");
            }
        }
    }

    #[test]
    fn progress_counts_tags_and_brights() {
        let cards = ids(&["A0", "A1", "B1", "H0", "H1", "B0"]);
        let progress = ComboProgress::from_cards(&cards);
        assert_eq!(progress.count(Combo::RedRibbons), 2);
        assert_eq!(progress.count(Combo::FiveBirds), 2);
        assert_eq!(progress.brights, 2);
        let open: Vec<_> = progress.open_at_least(2).collect();
        assert_eq!(open, vec![Combo::RedRibbons, Combo::FiveBirds]);
    }

    #[test]
    fn missing_months_lists_uncaptured_members() {
        let cards = ids(&["A1", "C1"]);
        assert_eq!(missing_months(&cards, Combo::RedRibbons), vec![2]);
        assert_eq!(missing_months(&cards, Combo::BlueRibbons), vec![6, 9, 10]);
    }
}
