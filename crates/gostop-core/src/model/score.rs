use crate::model::captured::Captured;
use crate::model::card::RAIN_MONTH;
use crate::model::combo::Combo;
use crate::model::player::Player;
use serde::{Deserialize, Serialize};

/// Minimum base score that opens the go/stop decision.
pub const GO_MIN_SCORE: u32 = 7;
/// Fixed payout for three ppuk in one round.
pub const THREE_PPUK_POINTS: u32 = 7;
/// Fixed payout for a president (four of a month) stop.
pub const PRESIDENT_POINTS: u32 = 10;

const BAK_MULTIPLIER: u32 = 2;
const GO_BAK_MULTIPLIER: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseDetail {
    pub bright: u32,
    pub five: u32,
    pub ribbon: u32,
    pub junk: u32,
    pub ribbon_sets: u32,
    pub five_birds: u32,
    pub pi_count: u32,
}

impl BaseDetail {
    pub fn total(&self) -> u32 {
        self.bright + self.five + self.ribbon + self.junk + self.ribbon_sets + self.five_birds
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bak {
    pub gwang: bool,
    pub pi: bool,
    pub mong: bool,
    pub go: bool,
}

impl Bak {
    pub fn multiplier(&self) -> u32 {
        let mut multiplier = 1;
        for (hit, factor) in [
            (self.gwang, BAK_MULTIPLIER),
            (self.pi, BAK_MULTIPLIER),
            (self.mong, BAK_MULTIPLIER),
            (self.go, GO_BAK_MULTIPLIER),
        ] {
            if hit {
                multiplier *= factor;
            }
        }
        multiplier
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Card points plus the go bonus.
    pub base: u32,
    pub multiplier: u32,
    pub total: u32,
    pub bak: Bak,
    pub detail: BaseDetail,
    pub go_bonus: u32,
}

impl ScoreBreakdown {
    pub fn fixed(points: u32) -> Self {
        Self {
            base: points,
            multiplier: 1,
            total: points,
            ..Self::default()
        }
    }

    pub fn scaled(mut self, factor: u32) -> Self {
        self.multiplier *= factor;
        self.total *= factor;
        self
    }
}

fn bright_points(captured: &Captured) -> u32 {
    match captured.bright_count() {
        0..=2 => 0,
        3 => {
            if captured.bright.iter().any(|c| c.month() == RAIN_MONTH) {
                2
            } else {
                3
            }
        }
        4 => 4,
        _ => 15,
    }
}

fn over_threshold(count: usize, threshold: usize) -> u32 {
    if count >= threshold {
        (count - threshold + 1) as u32
    } else {
        0
    }
}

/// Card points only: no go bonus, no multipliers.
pub fn base_detail(captured: &Captured) -> BaseDetail {
    let pi_count = captured.pi_count();
    let progress = captured.progress();
    let ribbon_sets = Combo::ALL
        .into_iter()
        .filter(|c| c.is_ribbon_set() && progress.is_complete(*c))
        .map(Combo::bonus)
        .sum();
    let five_birds = if progress.is_complete(Combo::FiveBirds) {
        Combo::FiveBirds.bonus()
    } else {
        0
    };
    BaseDetail {
        bright: bright_points(captured),
        five: over_threshold(captured.five_count(), 5),
        ribbon: over_threshold(captured.ribbon_count(), 5),
        junk: over_threshold(pi_count as usize, 10),
        ribbon_sets,
        five_birds,
        pi_count,
    }
}

pub fn base_score(captured: &Captured) -> u32 {
    base_detail(captured).total()
}

pub fn detect_bak(player: &Captured, opponent: &Captured, opponent_went_go: bool) -> Bak {
    Bak {
        gwang: player.bright_count() >= 3 && opponent.bright_count() == 0,
        pi: player.pi_count() >= 10 && opponent.pi_count() <= 7,
        mong: player.five_count() >= 7 && opponent.five_count() == 0,
        go: opponent_went_go,
    }
}

/// Full round score of `player` against `opponent`.
pub fn score(player: &Player, opponent: &Player) -> ScoreBreakdown {
    score_captured(player, &player.captured, opponent)
}

/// Scores `player` as if their piles were `captured`; used for gukjin what-ifs.
pub fn score_captured(player: &Player, captured: &Captured, opponent: &Player) -> ScoreBreakdown {
    let detail = base_detail(captured);
    let go_bonus = player.go_count as u32;
    let base = detail.total() + go_bonus;

    let mut multiplier = 1u32;
    if player.go_count >= 3 {
        multiplier *= player.go_count as u32 - 1;
    }
    multiplier *= 1 << player.events.shaking.min(8);
    multiplier *= 1 << player.events.bomb.min(8);
    let bak = detect_bak(captured, &opponent.captured, opponent.go_count > 0);
    multiplier *= bak.multiplier();

    ScoreBreakdown {
        base,
        multiplier,
        total: base * multiplier,
        bak,
        detail,
        go_bonus,
    }
}

#[cfg(test)]
mod tests {
    use super::{base_score, score};
    use crate::model::captured::Captured;
    use crate::model::card::CardId;
    use crate::model::player::{GukjinMode, Player};

    fn captured(codes: &[&str]) -> Captured {
        let mut captured = Captured::default();
        for code in codes {
            captured.push(code.parse::<CardId>().expect("card"), GukjinMode::Five);
        }
        captured
    }

    #[test]
    fn three_brights_with_rain_score_two() {
        assert_eq!(base_score(&captured(&["A0", "C0", "H0"])), 3);
        assert_eq!(base_score(&captured(&["A0", "C0", "L0"])), 2);
        assert_eq!(base_score(&captured(&["A0", "C0", "H0", "L0"])), 4);
        assert_eq!(base_score(&captured(&["A0", "C0", "H0", "K0", "L0"])), 15);
    }

    #[test]
    fn ribbon_sets_and_birds_add_bonuses() {
        assert_eq!(base_score(&captured(&["A1", "B1", "C1"])), 3);
        assert_eq!(base_score(&captured(&["B0", "D0", "H1"])), 5);
    }

    #[test]
    fn junk_scores_from_ten_pi() {
        let junk = captured(&["A2", "A3", "B2", "B3", "C2", "C3", "D2", "D3", "K1"]);
        assert_eq!(junk.pi_count(), 10);
        assert_eq!(base_score(&junk), 1);
    }

    #[test]
    fn multipliers_stack_go_shaking_and_bak() {
        let mut winner = Player::default();
        winner.captured = captured(&["A0", "C0", "H0", "A1", "B1", "C1"]);
        winner.go_count = 3;
        winner.events.shaking = 1;
        let loser = Player::default();
        let breakdown = score(&winner, &loser);
        assert_eq!(breakdown.base, 6 + 3);
        assert!(breakdown.bak.gwang);
        assert_eq!(breakdown.multiplier, 2 * 2 * 2);
        assert_eq!(breakdown.total, 9 * 8);
    }

    #[test]
    fn opponent_go_doubles_the_winner() {
        let mut winner = Player::default();
        winner.captured = captured(&["A1", "B1", "C1", "F1", "I1", "J1", "D1"]);
        let mut loser = Player::default();
        loser.go_count = 1;
        loser.captured = captured(&["A0"]);
        let breakdown = score(&winner, &loser);
        assert!(breakdown.bak.go);
        assert_eq!(breakdown.base, 3 + 3 + 3);
        assert_eq!(breakdown.total, 18);
    }
}
