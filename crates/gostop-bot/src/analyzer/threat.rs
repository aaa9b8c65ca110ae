use super::combo::{MonthMap, missing_bright_months};
use super::{StateAnalyzer, Visibility, clamp01};
use gostop_core::model::card::{CardId, Category, Month, MonthSet};
use gostop_core::model::combo::{Combo, ComboProgress, missing_months};
use gostop_core::model::player::{Player, Seat};
use serde::Serialize;

/// How close the opponent is to closing a scoring set, with per-month urgency.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComboThreat {
    pub threat: f64,
    #[serde(skip)]
    pub month_urgency: MonthMap<u8>,
}

impl ComboThreat {
    pub fn urgency(&self, month: Month) -> u8 {
        self.month_urgency.get(month)
    }
}

/// Combined opponent pressure used by the phase-aware policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pressure {
    /// Weighted threat on a 0..=1.6 scale.
    pub threat: f64,
    /// Estimated chance (percent) the opponent is one capture from a payoff.
    pub one_away: f64,
    pub combo: ComboThreat,
    pub matchable_months: f64,
    pub deck: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ComboPotential {
    pub total: f64,
    pub near_complete: usize,
    pub one_away: usize,
}

/// Board cards that would finish an open set for their owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComboTargets {
    pub cards: Vec<CardId>,
    pub months: MonthSet,
    /// A set is one card short with three already in hand.
    pub imminent: bool,
}

/// Months of `combo` still open for `owner` that `blocker` has not closed.
fn available_missing(owner: &Player, blocker: &Player, combo: Combo) -> Vec<Month> {
    let cards: Vec<CardId> = owner.captured.iter().collect();
    missing_months(&cards, combo)
        .into_iter()
        .filter(|m| {
            !blocker
                .captured
                .has_month_category(*m, combo.required_category())
        })
        .collect()
}

fn available_missing_brights(owner: &Player, blocker: &Player) -> Vec<Month> {
    missing_bright_months(owner)
        .into_iter()
        .filter(|m| !blocker.captured.has_month_category(*m, Category::Bright))
        .collect()
}

fn any_ribbon_open(progress: &ComboProgress) -> bool {
    Combo::ALL
        .into_iter()
        .any(|c| c.is_ribbon_set() && progress.count(c) >= 2)
}

/// Value of a live match on `month` for an attacker with `progress`.
fn combo_month_bonus(progress: &ComboProgress, month: Month, birds: f64, ribbons: f64) -> f64 {
    Combo::ALL
        .into_iter()
        .filter(|c| progress.count(*c) >= 2 && c.contains_month(month))
        .map(|c| if c == Combo::FiveBirds { birds } else { ribbons })
        .sum()
}

impl StateAnalyzer<'_> {
    fn player_at(&self, seat: Seat) -> &Player {
        self.state().player(seat)
    }

    fn board_months(&self) -> MonthSet {
        self.state().board.iter().map(|c| c.month()).collect()
    }

    /// Opponent's progress toward ribbon sets, birds and brights, read
    /// against what this seat has already taken.
    pub fn opponent_combo_threat(&self) -> ComboThreat {
        let opp = self.opp();
        let me = self.me();
        let board = self.board_months();
        let progress = opp.captured.progress();
        let mut urgency = MonthMap::default();
        let mut threat: f64 = 0.0;

        for combo in Combo::ALL {
            let got = progress.count(combo);
            let missing = available_missing(opp, me, combo);
            if missing.is_empty() {
                continue;
            }
            if got >= 2 {
                let soon = missing.iter().any(|m| board.contains(*m));
                threat += if soon { 0.28 } else { 0.18 };
                for m in missing {
                    urgency.raise(m, if soon { 30 } else { 20 });
                }
            } else if got == 1 {
                threat += 0.05;
            }
        }

        let brights = opp.captured.bright_count();
        let missing = available_missing_brights(opp, me);
        if brights >= 2 && !missing.is_empty() {
            let soon = missing.iter().any(|m| board.contains(*m));
            let three = brights >= 3;
            threat += match (soon, three) {
                (true, true) => 0.24,
                (true, false) => 0.18,
                (false, true) => 0.16,
                (false, false) => 0.12,
            };
            let level = match (soon, three) {
                (true, true) => 28,
                (true, false) => 24,
                (false, true) => 20,
                (false, false) => 16,
            };
            for m in missing {
                urgency.raise(m, level);
            }
        } else if brights == 1 && !missing.is_empty() {
            threat += 0.03;
        }

        ComboThreat {
            threat: clamp01(threat),
            month_urgency: urgency,
        }
    }

    /// Board cards `owner` needs to close a set that is already two deep.
    pub fn combo_targets(&self, owner: Seat) -> ComboTargets {
        let player = self.player_at(owner);
        let blocker = self.player_at(owner.opponent());
        let progress = player.captured.progress();
        let mut targets = ComboTargets::default();

        let mut add = |months: Vec<Month>, category: Category, imminent: bool| {
            if months.is_empty() {
                return;
            }
            targets.imminent |= imminent;
            for month in months {
                targets.months.insert(month);
                for card in self.board_cards(month) {
                    if card.category() == category && !targets.cards.contains(&card) {
                        targets.cards.push(card);
                    }
                }
            }
        };

        for combo in Combo::ALL {
            let got = progress.count(combo);
            if got >= 2 {
                add(
                    available_missing(player, blocker, combo),
                    combo.required_category(),
                    got >= 3,
                );
            }
        }
        let brights = player.captured.bright_count();
        if brights >= 2 {
            add(
                available_missing_brights(player, blocker),
                Category::Bright,
                brights >= 3,
            );
        }
        targets
    }

    /// Chance-weighted value the opponent can take with their next hand card.
    pub fn next_turn_threat(&self) -> f64 {
        let progress = self.opp().captured.progress();
        let score: f64 = match self.visibility() {
            Visibility::Full => self
                .opp()
                .hand
                .iter()
                .map(|&card| {
                    let matches: Vec<CardId> = self.board_cards(card.month()).collect();
                    if matches.is_empty() {
                        return 0.0;
                    }
                    let has = |cat: Category| {
                        card.category() == cat || matches.iter().any(|m| m.category() == cat)
                    };
                    let mut local: f64 = 0.0;
                    if has(Category::Bright) {
                        local += 0.32;
                    }
                    if has(Category::Five) {
                        local += 0.22;
                    }
                    if has(Category::Junk) {
                        local += 0.1;
                    }
                    local + combo_month_bonus(&progress, card.month(), 0.28, 0.22)
                })
                .sum(),
            Visibility::Public => self
                .board_months()
                .iter()
                .map(|month| {
                    let chance = self.opponent_month_hold_probability(month);
                    if chance <= 0.0 {
                        return 0.0;
                    }
                    let has = |cat: Category| self.board_cards(month).any(|c| c.category() == cat);
                    let mut local: f64 = 0.0;
                    if has(Category::Bright) {
                        local += 0.3;
                    }
                    if has(Category::Five) {
                        local += 0.22;
                    }
                    if has(Category::Junk) {
                        local += 0.1;
                    }
                    local += combo_month_bonus(&progress, month, 0.24, 0.18);
                    local * chance
                })
                .sum(),
        };
        clamp01(score)
    }

    /// Blend of the opponent's score, piles, open sets and next-turn reach.
    pub fn opponent_threat(&self) -> f64 {
        let opp = self.opp();
        let opp_score = self.score_total(self.seat().opponent()) as f64;
        let progress = opp.captured.progress();
        let mut score = (opp_score / 7.0).min(1.0) * 0.55;
        score += (opp.captured.junk.len() as f64 / 10.0).min(1.0) * 0.15;
        score += (opp.captured.bright_count() as f64 / 3.0).min(1.0) * 0.1;
        if any_ribbon_open(&progress) {
            score += 0.12;
        }
        if progress.count(Combo::FiveBirds) >= 2 {
            score += 0.12;
        }
        score += self.next_turn_threat() * 0.28;
        clamp01(score)
    }

    /// The opponent can reach a bright, five, or blocking month on the board.
    pub fn opponent_board_high_value_threat(&self) -> bool {
        let blocks = super::combo::blocking_months(self.opp(), self.me());
        let high = |card: CardId| {
            matches!(card.category(), Category::Bright | Category::Five)
                || blocks.contains(card.month())
        };
        match self.visibility() {
            Visibility::Full => {
                let hand_months: MonthSet = self.opp().hand.iter().map(|c| c.month()).collect();
                self.state()
                    .board
                    .iter()
                    .any(|c| hand_months.contains(c.month()) && high(*c))
            }
            Visibility::Public => self
                .state()
                .board
                .iter()
                .any(|c| high(*c) && self.opponent_month_hold_probability(c.month()) >= 0.33),
        }
    }

    /// Board months the opponent can answer; an expectation under public view.
    pub fn opponent_matchable_months(&self) -> f64 {
        match self.visibility() {
            Visibility::Full => {
                let hand_months: MonthSet = self.opp().hand.iter().map(|c| c.month()).collect();
                hand_months
                    .iter()
                    .filter(|m| self.board_has_month(*m))
                    .count() as f64
            }
            Visibility::Public => self
                .board_months()
                .iter()
                .map(|m| self.opponent_month_hold_probability(m))
                .sum(),
        }
    }

    pub fn pressure(&self) -> Pressure {
        let combo = self.opponent_combo_threat();
        let progress = self.opponent_threat();
        let next = self.next_turn_threat();
        let board = if self.opponent_board_high_value_threat() {
            1.0
        } else {
            0.0
        };
        let matchable = self.opponent_matchable_months();
        let deck = self.deck_len();

        let threat = (progress * 0.45
            + combo.threat * 0.35
            + next * 0.2
            + board * 0.12
            + matchable * 0.04)
            .clamp(0.0, 1.6);
        let mut one_away = progress * 38.0
            + combo.threat * 32.0
            + next * 20.0
            + board * 10.0
            + matchable * 4.0;
        if deck <= 10 {
            one_away += 6.0;
        }
        if deck <= 6 {
            one_away += 8.0;
        }
        Pressure {
            threat,
            one_away: one_away.clamp(0.0, 100.0),
            combo,
            matchable_months: matchable,
            deck,
        }
    }

    pub fn threat_score(&self) -> f64 {
        self.pressure().threat
    }

    pub fn one_away_probability(&self) -> f64 {
        self.pressure().one_away
    }

    /// Chance that `actor` takes the `category` card of `month` before the round ends.
    fn month_capture_chance(&self, actor: Seat, month: Month, category: Category) -> f64 {
        let deck = self.deck_len();
        let draw = if deck <= 5 {
            0.68
        } else if deck <= 8 {
            0.82
        } else {
            1.0
        };
        let (hand_any, hand_required) = if actor == self.seat() || self.visibility() == Visibility::Full
        {
            let hand = &self.player_at(actor).hand;
            (
                hand.iter().any(|c| c.month() == month),
                hand.iter()
                    .any(|c| c.month() == month && c.category() == category),
            )
        } else {
            let revealed = self.knowledge().revealed();
            (
                self.opponent_month_hold_probability(month) >= 0.5,
                revealed
                    .iter()
                    .any(|c| c.month() == month && c.category() == category),
            )
        };
        let board_any = self.board_has_month(month);
        let board_required = self
            .board_cards(month)
            .filter(|c| c.category() == category)
            .count();

        let mut chance: f64 = 0.12 * draw;
        if hand_required {
            chance = chance.max(if board_any { 0.64 } else { 0.5 });
        }
        if board_required > 0 {
            chance = chance.max(if hand_any { 0.78 } else { 0.42 });
        }
        if hand_any {
            chance = chance.max(0.28);
        }
        if board_required >= 2 && hand_any {
            chance = chance.max(0.86);
        }
        chance.clamp(0.0, 0.92)
    }

    /// Expected set payoff still reachable by `actor`.
    pub fn combo_potential(&self, actor: Seat) -> ComboPotential {
        let player = self.player_at(actor);
        let blocker = self.player_at(actor.opponent());
        let progress = player.captured.progress();
        let mut potential = ComboPotential::default();
        let mut total: f64 = 0.0;

        let mut weigh = |missing: &[Month],
                         category: Category,
                         got: usize,
                         (near, mid, idle): (f64, f64, f64),
                         (avg_w, top_w): (f64, f64),
                         one_away_bonus: f64|
         -> f64 {
            if missing.is_empty() {
                return 0.0;
            }
            let chances: Vec<f64> = missing
                .iter()
                .map(|m| self.month_capture_chance(actor, *m, category))
                .collect();
            let avg = chances.iter().sum::<f64>() / chances.len() as f64;
            let top = chances.iter().copied().fold(0.0, f64::max);
            let base = match got {
                0 => idle,
                1 => mid,
                _ => near,
            };
            let mut value = base * (avg * avg_w + top * top_w);
            if got >= 2 {
                potential.near_complete += 1;
                if missing.len() == 1 {
                    value += one_away_bonus;
                    potential.one_away += 1;
                }
            }
            value
        };

        for combo in Combo::ALL {
            let weights = match combo {
                Combo::RedRibbons | Combo::BlueRibbons => (1.0, 0.38, 0.16),
                Combo::PlainRibbons => (0.92, 0.35, 0.16),
                Combo::FiveBirds => (1.12, 0.42, 0.16),
            };
            total += weigh(
                &available_missing(player, blocker, combo),
                combo.required_category(),
                progress.count(combo) as usize,
                weights,
                (0.65, 0.35),
                0.18,
            );
        }
        total += weigh(
            &available_missing_brights(player, blocker),
            Category::Bright,
            player.captured.bright_count(),
            (1.2, 0.42, 0.12),
            (0.6, 0.4),
            0.2,
        );
        potential.total = total.clamp(0.0, 3.5);
        potential
    }
}

#[cfg(test)]
mod tests {
    use crate::analyzer::fixtures::{id, table};
    use crate::analyzer::{StateAnalyzer, Visibility};
    use gostop_core::model::player::Seat;

    #[test]
    fn ribbon_pair_with_board_card_is_urgent() {
        let state = table(&[], &[], &["C1"], &[], &["A1", "B1"]);
        let analyzer = StateAnalyzer::new(&state, Seat::North, Visibility::Full);
        let threat = analyzer.opponent_combo_threat();
        assert_eq!(threat.urgency(3), 30);
        assert!((threat.threat - 0.28).abs() < 1e-9);

        let targets = analyzer.combo_targets(Seat::South);
        assert_eq!(targets.cards, vec![id("C1")]);
        assert!(!targets.imminent);
    }

    #[test]
    fn full_view_next_turn_threat_reads_the_hand() {
        let state = table(&["D2"], &["A2"], &["A0"], &[], &[]);
        let full = StateAnalyzer::new(&state, Seat::North, Visibility::Full);
        assert!((full.next_turn_threat() - 0.42).abs() < 1e-9);
        assert_eq!(full.opponent_matchable_months(), 1.0);
        assert!(full.opponent_board_high_value_threat());

        let public = StateAnalyzer::new(&state, Seat::North, Visibility::Public);
        let estimate = public.next_turn_threat();
        assert!(estimate > 0.0 && estimate < 0.42);
    }

    #[test]
    fn pressure_grows_with_opponent_progress() {
        let calm = table(&["D2"], &["E2"], &["F2"], &[], &[]);
        let tense = table(&["D2"], &["E2"], &["C1"], &[], &["A1", "B1", "A0", "H0"]);
        let calm = StateAnalyzer::new(&calm, Seat::North, Visibility::Public).pressure();
        let tense = StateAnalyzer::new(&tense, Seat::North, Visibility::Public).pressure();
        assert!(tense.threat > calm.threat);
        assert!(tense.one_away > calm.one_away);
    }

    #[test]
    fn one_away_set_counts_in_potential() {
        let state = table(&["C1"], &[], &[], &["A1", "B1"], &[]);
        let analyzer = StateAnalyzer::new(&state, Seat::North, Visibility::Full);
        let potential = analyzer.combo_potential(Seat::North);
        assert_eq!(potential.near_complete, 1);
        assert_eq!(potential.one_away, 1);
        assert!(potential.total > 0.18);
    }
}
