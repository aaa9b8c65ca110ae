use gostop_core::model::card::{BONUS_MONTH, CardId, Category, Month, MonthSet};
use gostop_core::model::combo::{BRIGHT_MONTHS, Combo, ComboProgress, missing_months};
use gostop_core::model::player::Player;

/// Dense per-month table, indexed 1..=12.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthMap<T>([T; BONUS_MONTH as usize]);

impl<T: Copy + Default> Default for MonthMap<T> {
    fn default() -> Self {
        Self([T::default(); BONUS_MONTH as usize])
    }
}

impl<T: Copy + Default + PartialOrd> MonthMap<T> {
    pub fn get(&self, month: Month) -> T {
        self.0.get(month as usize).copied().unwrap_or_default()
    }

    /// Keeps the larger of the stored and the offered value.
    pub fn raise(&mut self, month: Month, value: T) {
        if let Some(slot) = self.0.get_mut(month as usize) {
            if value > *slot {
                *slot = value;
            }
        }
    }

    /// Months holding a non-default value.
    pub fn iter(&self) -> impl Iterator<Item = (Month, T)> + '_ {
        (1..BONUS_MONTH)
            .map(|m| (m, self.get(m)))
            .filter(|(_, v)| *v > T::default())
    }

    pub fn max_value(&self) -> T {
        self.iter()
            .map(|(_, v)| v)
            .fold(T::default(), |acc, v| if v > acc { v } else { acc })
    }
}

pub fn combo_progress(player: &Player) -> ComboProgress {
    player.captured.progress()
}

fn captured_cards(player: &Player) -> Vec<CardId> {
    player.captured.iter().collect()
}

/// Months of `owner`'s open combos that `blocker` could still take away,
/// with the urgency level of each: 3 once the set is one card short of
/// paying off a third bright, else 2.
fn open_combo_months(owner: &Player, blocker: &Player) -> Vec<(Month, u8)> {
    let progress = combo_progress(owner);
    let cards = captured_cards(owner);
    let mut out = Vec::new();
    for combo in Combo::ALL {
        let got = progress.count(combo);
        if got < 2 {
            continue;
        }
        let level = if got >= 3 { 3 } else { 2 };
        for month in missing_months(&cards, combo) {
            if !blocker
                .captured
                .has_month_category(month, combo.required_category())
            {
                out.push((month, level));
            }
        }
    }

    let brights = owner.captured.bright_count();
    if brights >= 2 {
        let level = if brights >= 3 { 3 } else { 2 };
        for month in missing_bright_months(owner) {
            if !blocker.captured.has_month_category(month, Category::Bright) {
                out.push((month, level));
            }
        }
    }
    out
}

pub(crate) fn missing_bright_months(player: &Player) -> Vec<Month> {
    BRIGHT_MONTHS
        .into_iter()
        .filter(|m| !player.captured.bright.iter().any(|c| c.month() == *m))
        .collect()
}

/// Months where `owner` is two or more cards into a combo (ribbon sets,
/// five birds, brights) and `blocker` has not already taken the needed card.
pub fn blocking_months(owner: &Player, blocker: &Player) -> MonthSet {
    open_combo_months(owner, blocker)
        .into_iter()
        .map(|(m, _)| m)
        .collect()
}

pub fn blocking_urgency(owner: &Player, blocker: &Player) -> MonthMap<u8> {
    let mut map = MonthMap::default();
    for (month, level) in open_combo_months(owner, blocker) {
        map.raise(month, level);
    }
    map
}

/// How much capturing `month` advances `player`'s own ribbon and bird sets.
pub fn own_combo_opportunity(player: &Player, month: Month) -> f64 {
    let progress = combo_progress(player);
    Combo::ALL
        .into_iter()
        .filter(|combo| combo.contains_month(month))
        .map(|combo| {
            let (near, started) = match combo {
                Combo::RedRibbons | Combo::BlueRibbons => (1.1, 0.25),
                Combo::PlainRibbons => (1.0, 0.2),
                Combo::FiveBirds => (1.25, 0.3),
            };
            match progress.count(combo) {
                0 => 0.0,
                1 => started,
                _ => near,
            }
        })
        .sum()
}

/// Tie-break weight for months whose cards feed several scoring sets.
pub fn month_priority(month: Month) -> f64 {
    match month {
        3 | 8 | 12 => 2.8,
        2 | 10 | 11 => 2.0,
        1 | 6 | 9 => 1.35,
        4 | 5 | 7 => 0.9,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::{blocking_months, blocking_urgency, own_combo_opportunity};
    use crate::analyzer::fixtures::table;
    use gostop_core::model::player::Seat;

    #[test]
    fn two_ribbons_expose_the_third_month() {
        let state = table(&[], &[], &[], &[], &["A1", "B1"]);
        let owner = state.player(Seat::South);
        let blocker = state.player(Seat::North);
        let months = blocking_months(owner, blocker);
        assert!(months.contains(3));
        assert_eq!(months.len(), 1);
        assert_eq!(blocking_urgency(owner, blocker).get(3), 2);
    }

    #[test]
    fn captured_counter_card_closes_the_month() {
        let state = table(&[], &[], &[], &["C1"], &["A1", "B1"]);
        let months = blocking_months(state.player(Seat::South), state.player(Seat::North));
        assert!(months.is_empty());
    }

    #[test]
    fn three_brights_raise_urgency() {
        let state = table(&[], &[], &[], &[], &["A0", "C0", "H0"]);
        let urgency = blocking_urgency(state.player(Seat::South), state.player(Seat::North));
        assert_eq!(urgency.get(11), 3);
        assert_eq!(urgency.get(12), 3);
        assert_eq!(urgency.get(1), 0);
    }

    #[test]
    fn combo_opportunity_tracks_progress() {
        let state = table(&[], &[], &[], &["B0", "D0"], &[]);
        let player = state.player(Seat::North);
        assert_eq!(own_combo_opportunity(player, 8), 1.25);
        assert_eq!(own_combo_opportunity(player, 12), 0.0);
    }
}
