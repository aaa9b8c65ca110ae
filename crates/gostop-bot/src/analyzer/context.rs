use super::{StateAnalyzer, clamp01};
use gostop_core::model::card::CardId;
use gostop_core::model::player::{GukjinMode, Player};
use gostop_core::model::score::score;
use serde::Serialize;

const GOLD_RISK_RATIO: f64 = 0.1;
/// Weight of a gukjin card still lying on the board in branch projections.
const BOARD_GUKJIN_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    DefenseOpening,
    DesperateDefense,
    Aggressive,
    Endgame,
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MongStage {
    Safe,
    Watch,
    Elevated,
    High,
    Critical,
}

/// Exposure to the five-card bak penalty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MongRisk {
    pub danger: f64,
    pub stage: MongStage,
    pub self_five: f64,
    pub opp_five: f64,
}

impl MongRisk {
    fn compute(self_five: usize, opp_five: usize, deck: usize) -> Self {
        let base = match opp_five {
            f if f >= 7 => 1.0,
            6 => 0.82,
            5 => 0.58,
            4 => 0.34,
            _ => 0.0,
        };
        let guard = match self_five {
            0 => 1.0,
            1 => 0.55,
            _ => 0.3,
        };
        let mut danger = base * guard;
        if base > 0.0 && deck <= 8 {
            danger += 0.08;
        }
        if base > 0.0 && deck <= 5 {
            danger += 0.06;
        }
        let stage = if self_five == 0 && opp_five >= 6 {
            MongStage::Critical
        } else if opp_five >= 6 {
            MongStage::High
        } else if opp_five >= 5 && self_five == 0 {
            MongStage::Elevated
        } else if opp_five >= 4 {
            MongStage::Watch
        } else {
            MongStage::Safe
        };
        Self {
            danger: clamp01(danger),
            stage,
            self_five: self_five as f64,
            opp_five: opp_five as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoldRisk {
    pub initial_gold: i64,
    pub threshold: f64,
    pub self_gold: i64,
    pub opp_gold: i64,
    pub self_low: bool,
    pub opp_low: bool,
}

/// One what-if assignment of the gukjin mode to both players.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GukjinScenario {
    pub self_mode: GukjinMode,
    pub opp_mode: GukjinMode,
    pub self_pi: f64,
    pub self_five: f64,
    pub opp_pi: f64,
    pub opp_five: f64,
    pub my_score: f64,
    pub opp_score: f64,
    pub mong_risk_self: bool,
    pub can_mong_bak_self: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GukjinBranches {
    pub scenarios: Vec<GukjinScenario>,
}

impl GukjinBranches {
    pub fn enabled(&self) -> bool {
        !self.scenarios.is_empty()
    }

    pub fn find(&self, self_mode: GukjinMode, opp_mode: GukjinMode) -> Option<&GukjinScenario> {
        self.scenarios
            .iter()
            .find(|s| s.self_mode == self_mode && s.opp_mode == opp_mode)
    }

    pub fn min_of(&self, field: impl Fn(&GukjinScenario) -> f64) -> f64 {
        self.scenarios
            .iter()
            .map(field)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn max_of(&self, field: impl Fn(&GukjinScenario) -> f64) -> f64 {
        self.scenarios
            .iter()
            .map(field)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mong_risk_any(&self) -> bool {
        self.scenarios.iter().any(|s| s.mong_risk_self)
    }

    pub fn mong_bak_any(&self) -> bool {
        self.scenarios.iter().any(|s| s.can_mong_bak_self)
    }
}

/// Score and tempo snapshot used by every policy generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameContext {
    pub mode: PlayMode,
    pub is_second: bool,
    pub turn_seq: u32,
    pub defense_opening: bool,
    pub nagari_delay: bool,
    pub endgame_safe_pitch: bool,
    pub midgame_block_focus: bool,
    pub opponent_near_combo: bool,
    pub opponent_near_seven: bool,
    pub volatility_comeback: bool,
    pub my_score: f64,
    pub opp_score: f64,
    pub score_diff: f64,
    pub deck_count: usize,
    pub self_pi: f64,
    pub opp_pi: f64,
    pub self_five: f64,
    pub opp_five: f64,
    pub self_gwang: usize,
    pub opp_gwang: usize,
    pub mong: MongRisk,
    pub gukjin: GukjinBranches,
    pub opp_go_count: u8,
    pub self_go_count: u8,
    pub carry_over: u32,
    pub block_weight: f64,
    pub pi_weight: f64,
    pub puk_penalty: f64,
}

impl GameContext {
    pub fn trailing(&self) -> bool {
        self.score_diff < 0.0
    }

    pub fn leading(&self) -> bool {
        self.score_diff > 0.0
    }
}

/// Multipliers on the card-ranking terms of the rule-ordered policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DynamicWeights {
    pub pi: f64,
    pub combo: f64,
    pub block: f64,
    pub risk: f64,
    pub hold: f64,
    pub safety: f64,
}

impl DynamicWeights {
    pub fn build(ctx: &GameContext) -> Self {
        let mut w = DynamicWeights {
            pi: 1.0,
            combo: 1.0,
            block: 1.0,
            risk: 1.0,
            hold: 1.0,
            safety: 1.0,
        };
        if ctx.defense_opening {
            w.pi *= 1.35;
            w.combo *= 0.75;
            w.risk *= 1.2;
            w.block *= 1.2;
            w.hold *= 1.15;
            w.safety *= 1.15;
        }
        if ctx.deck_count <= 8 {
            w.pi *= 1.28;
            w.combo *= 0.86;
            w.risk *= 1.15;
            w.safety *= 1.12;
        }
        if ctx.deck_count <= 5 {
            w.pi *= 1.25;
            w.combo *= 0.82;
            w.block *= 1.1;
            w.safety *= 1.22;
        }
        if ctx.carry_over >= 2 {
            w.block *= 3.0;
            w.risk *= 1.45;
            w.hold *= 1.25;
            w.safety *= 1.2;
            w.combo *= 0.78;
        }
        if ctx.opp_go_count > 0 {
            w.block *= 1.55;
            w.risk *= 1.2;
            w.hold *= 1.15;
            w.pi *= 1.12;
        }
        if ctx.self_pi >= 8.0 {
            w.pi *= 1.22;
        }
        if ctx.opp_pi <= 6.0 {
            w.pi *= 1.15;
        }
        if ctx.mong.danger >= 0.7 {
            w.safety *= 1.22;
            w.risk *= 1.18;
            w.hold *= 1.12;
            w.combo *= 0.9;
        } else if ctx.mong.danger >= 0.4 {
            w.safety *= 1.1;
            w.risk *= 1.08;
        }
        if ctx.self_five <= 0.0 && ctx.opp_five >= 6.0 {
            w.block *= 1.18;
            w.hold *= 1.08;
        }
        if ctx.nagari_delay {
            w.combo *= 0.78;
            w.block *= 1.25;
            w.safety *= 1.18;
            w.hold *= 1.12;
        }
        w
    }
}

fn with_mode(player: &Player, mode: GukjinMode) -> Player {
    let mut copy = player.clone();
    if !player.gukjin_locked {
        copy.captured = player.captured.with_gukjin_as(mode);
        copy.gukjin_mode = mode;
    }
    copy
}

fn five_including_gukjin(player: &Player) -> usize {
    let gukjin = CardId::gukjin();
    let fives = player.captured.five_count();
    if !player.captured.gukjin_in_five() && player.captured.contains(gukjin) {
        fives + 1
    } else {
        fives
    }
}

fn preferred_mode(five_count: usize) -> GukjinMode {
    if five_count >= 7 {
        GukjinMode::Five
    } else {
        GukjinMode::Junk
    }
}

impl StateAnalyzer<'_> {
    pub fn gold_risk(&self) -> GoldRisk {
        let initial_gold = self.state().initial_gold;
        let threshold = initial_gold as f64 * GOLD_RISK_RATIO;
        let self_gold = self.me().gold;
        let opp_gold = self.opp().gold;
        GoldRisk {
            initial_gold,
            threshold,
            self_gold,
            opp_gold,
            self_low: self_gold as f64 <= threshold,
            opp_low: opp_gold as f64 <= threshold,
        }
    }

    pub fn mong_bak_risk(&self) -> MongRisk {
        MongRisk::compute(
            self.me().captured.five_count(),
            self.opp().captured.five_count(),
            self.deck_len(),
        )
    }

    /// Four scenarios over both players' gukjin modes, or none when the card
    /// is out of reach (still hidden, or already committed on both sides).
    pub fn gukjin_branches(&self) -> GukjinBranches {
        let gukjin = CardId::gukjin();
        let in_hand = self.me().holds(gukjin);
        let on_board = self.state().board.contains(&gukjin);
        let self_captured = self.me().captured.contains(gukjin);
        let opp_captured = self.opp().captured.contains(gukjin);
        if !(in_hand || on_board || self_captured || opp_captured) {
            return GukjinBranches::default();
        }

        let mut scenarios = Vec::with_capacity(4);
        for self_mode in [GukjinMode::Five, GukjinMode::Junk] {
            for opp_mode in [GukjinMode::Five, GukjinMode::Junk] {
                let mine = with_mode(self.me(), self_mode);
                let theirs = with_mode(self.opp(), opp_mode);
                let mut self_pi = mine.captured.pi_count() as f64;
                let mut self_five = mine.captured.five_count() as f64;
                let opp_pi = theirs.captured.pi_count() as f64;
                let opp_five = theirs.captured.five_count() as f64;
                let weight = match (in_hand, on_board) {
                    (true, _) => 1.0,
                    (false, true) => BOARD_GUKJIN_WEIGHT,
                    _ => 0.0,
                };
                match self_mode {
                    GukjinMode::Junk => self_pi += 2.0 * weight,
                    GukjinMode::Five => self_five += weight,
                }
                scenarios.push(GukjinScenario {
                    self_mode,
                    opp_mode,
                    self_pi,
                    self_five,
                    opp_pi,
                    opp_five,
                    my_score: score(&mine, &theirs).total as f64,
                    opp_score: score(&theirs, &mine).total as f64,
                    mong_risk_self: self_five <= 0.0 && opp_five >= 6.0,
                    can_mong_bak_self: self_five >= 7.0 && opp_five <= 0.0,
                });
            }
        }
        GukjinBranches { scenarios }
    }

    pub fn game_context(&self) -> GameContext {
        let me = self.me();
        let opp = self.opp();
        let deck_count = self.deck_len();
        let mut my_score = self.score_total(self.seat()) as f64;
        let mut opp_score = self.score_total(self.seat().opponent()) as f64;
        let mut self_pi = me.captured.pi_count() as f64;
        let mut opp_pi = opp.captured.pi_count() as f64;
        let mut mong = self.mong_bak_risk();
        let gukjin = self.gukjin_branches();

        if gukjin.enabled() {
            let preferred = gukjin.find(
                preferred_mode(five_including_gukjin(me)),
                preferred_mode(five_including_gukjin(opp)),
            );
            let (mut self_five, mut opp_five) = (mong.self_five, mong.opp_five);
            if let Some(s) = preferred {
                my_score = s.my_score;
                opp_score = s.opp_score;
                self_pi = s.self_pi;
                opp_pi = s.opp_pi;
                self_five = s.self_five;
                opp_five = s.opp_five;
            }
            self_five = self_five.min(gukjin.min_of(|s| s.self_five));
            opp_five = opp_five.max(gukjin.max_of(|s| s.opp_five));
            let critical = self_five <= 0.0 && opp_five >= 6.0;
            mong.self_five = self_five;
            mong.opp_five = opp_five;
            if critical {
                mong.danger = mong.danger.max(0.85);
                mong.stage = MongStage::Critical;
            } else if self_five <= 0.0 && opp_five >= 5.0 {
                mong.stage = MongStage::Elevated;
            }
        }

        let progress = opp.captured.progress();
        let opp_gwang = opp.captured.bright_count();
        let is_second = self.is_second_mover();
        let turn_seq = self.state().turn_seq;
        let defense_opening = is_second && turn_seq <= 6;
        let score_diff = my_score - opp_score;
        let trailing = score_diff < 0.0;
        let opponent_near_seven = opp_score >= 6.0;
        let opponent_near_combo = progress.open_at_least(2).next().is_some() || opp_gwang >= 2;
        let nagari_delay =
            is_second && trailing && (8..=12).contains(&deck_count) && opponent_near_seven;

        let mut mode = if defense_opening {
            PlayMode::DefenseOpening
        } else if opp_score >= 5.0 && my_score <= 2.0 {
            PlayMode::DesperateDefense
        } else if my_score >= 7.0 && opp_score <= 3.0 && deck_count >= 8 {
            PlayMode::Aggressive
        } else if deck_count <= 8 {
            PlayMode::Endgame
        } else {
            PlayMode::Balanced
        };
        if !defense_opening
            && (mong.stage == MongStage::Critical || gukjin.mong_risk_any())
            && my_score <= opp_score + 2.0
        {
            mode = PlayMode::DesperateDefense;
        }

        let (mut block_weight, mut pi_weight, mut puk_penalty) = match mode {
            PlayMode::DefenseOpening => (1.35, 1.35, 1.2),
            PlayMode::DesperateDefense => (1.45, 1.2, 1.35),
            PlayMode::Aggressive => (0.95, 1.15, 0.9),
            PlayMode::Endgame => (1.25, if opp_pi <= 5.0 { 1.4 } else { 1.2 }, 1.25),
            PlayMode::Balanced => (1.0, 1.0, 1.0),
        };
        if mong.danger >= 0.7 {
            block_weight *= 1.18;
            pi_weight *= 1.08;
            puk_penalty *= 1.12;
        } else if mong.danger >= 0.4 {
            block_weight *= 1.08;
            puk_penalty *= 1.05;
        }

        GameContext {
            mode,
            is_second,
            turn_seq,
            defense_opening,
            nagari_delay,
            endgame_safe_pitch: deck_count <= 8,
            midgame_block_focus: (8..=12).contains(&deck_count) && opponent_near_combo,
            opponent_near_combo,
            opponent_near_seven,
            volatility_comeback: is_second && score_diff <= -5.0,
            my_score,
            opp_score,
            score_diff,
            deck_count,
            self_pi,
            opp_pi,
            self_five: mong.self_five,
            opp_five: mong.opp_five,
            self_gwang: me.captured.bright_count(),
            opp_gwang,
            mong,
            gukjin,
            opp_go_count: opp.go_count,
            self_go_count: me.go_count,
            carry_over: self.state().carry_over,
            block_weight,
            pi_weight,
            puk_penalty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DynamicWeights, MongRisk, MongStage, PlayMode};
    use crate::analyzer::fixtures::table;
    use crate::analyzer::{StateAnalyzer, Visibility};
    use gostop_core::model::player::Seat;

    #[test]
    fn mong_stage_reflects_both_five_piles() {
        let risk = MongRisk::compute(0, 6, 12);
        assert_eq!(risk.stage, MongStage::Critical);
        assert!((risk.danger - 0.82).abs() < 1e-9);
        let guarded = MongRisk::compute(2, 6, 4);
        assert_eq!(guarded.stage, MongStage::High);
        assert!(guarded.danger < risk.danger);
        assert_eq!(MongRisk::compute(3, 2, 4).danger, 0.0);
    }

    #[test]
    fn second_mover_opens_defensively() {
        let mut state = table(&["A2"], &["B2"], &[], &[], &[]);
        state.starter = Seat::South;
        let ctx = StateAnalyzer::new(&state, Seat::North, Visibility::Full).game_context();
        assert!(ctx.is_second);
        assert_eq!(ctx.mode, PlayMode::DefenseOpening);
        let weights = DynamicWeights::build(&ctx);
        assert!(weights.pi > 1.0 && weights.combo < 1.0);
    }

    #[test]
    fn captured_gukjin_opens_four_branches() {
        let state = table(&[], &[], &[], &["I0", "B0", "D0"], &[]);
        let analyzer = StateAnalyzer::new(&state, Seat::North, Visibility::Full);
        let branches = analyzer.gukjin_branches();
        assert_eq!(branches.scenarios.len(), 4);
        assert_eq!(branches.max_of(|s| s.self_five), 3.0);
        assert_eq!(branches.min_of(|s| s.self_five), 2.0);
        assert_eq!(branches.max_of(|s| s.self_pi), 2.0);
        let ctx = analyzer.game_context();
        assert_eq!(ctx.self_five, 2.0);
    }
}
