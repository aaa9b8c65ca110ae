use crate::model::economy::{GoldTransfer, settle_points};
use crate::model::player::{Player, Seat};
use crate::model::score::{PRESIDENT_POINTS, ScoreBreakdown, THREE_PPUK_POINTS, score};
use crate::model::state::{GameState, HistoryEvent, NagariReason, Phase, ResultKind, RoundResult};

const PRESIDENT_WIN_MULTIPLIER: u32 = 4;

fn failed_go(player: &Player, breakdown: &ScoreBreakdown) -> bool {
    player.go_count > 0 && breakdown.base <= player.last_go_base
}

fn ppuk_winner(state: &GameState) -> Option<Seat> {
    let three = |seat: Seat| state.player(seat).events.ppuk >= 3;
    match (three(Seat::North), three(Seat::South)) {
        (true, false) => Some(Seat::North),
        (false, true) => Some(Seat::South),
        _ => None,
    }
}

fn finish(state: &mut GameState, result: RoundResult, next_carry_over: u32) {
    state.history.push(HistoryEvent::RoundEnd {
        winner: result.winner,
        nagari: result.nagari,
    });
    state.phase = Phase::Resolved;
    state.pending = None;
    state.next_carry_over = next_carry_over;
    state.result = Some(result);
}

/// Scores both sides, applies nagari and carry-over rules, and settles gold.
pub fn resolve_round(state: &mut GameState) {
    let north = state.player(Seat::North);
    let south = state.player(Seat::South);
    let mut scores = [score(north, south), score(south, north)];

    let ppuk = ppuk_winner(state);
    let (kind, winner) = match ppuk {
        Some(seat) => {
            scores[seat.index()] = ScoreBreakdown::fixed(THREE_PPUK_POINTS);
            scores[seat.opponent().index()] = ScoreBreakdown::fixed(0);
            (ResultKind::ThreePpuk, Some(seat))
        }
        None => {
            let [n, s] = [scores[0].total, scores[1].total];
            let winner = match n.cmp(&s) {
                core::cmp::Ordering::Greater => Some(Seat::North),
                core::cmp::Ordering::Less => Some(Seat::South),
                core::cmp::Ordering::Equal => None,
            };
            (ResultKind::Normal, winner)
        }
    };

    let mut reasons = Vec::new();
    if ppuk.is_none() {
        if winner.is_none() {
            reasons.push(NagariReason::Draw);
        }
        if scores.iter().all(|s| s.base == 0) {
            reasons.push(NagariReason::BothScoreless);
        }
        for seat in Seat::LOOP {
            if failed_go(state.player(seat), &scores[seat.index()]) {
                reasons.push(NagariReason::FailedGo(seat));
            }
        }
    }
    let nagari = !reasons.is_empty();

    let carry = state.carry_over.max(1);
    let mut gold = GoldTransfer::default();
    let (winner, next_carry) = if nagari {
        (None, carry * 2)
    } else {
        if let Some(seat) = winner {
            if carry > 1 {
                scores[seat.index()] = scores[seat.index()].scaled(carry);
            }
            let player = state.player(seat);
            let declared = player.events.shaking > 0 || player.events.bomb > 0;
            if player.president_hold.is_some() && declared {
                scores[seat.index()] = scores[seat.index()].scaled(PRESIDENT_WIN_MULTIPLIER);
            }
            gold = settle_points(&mut state.players, seat, scores[seat.index()].total);
        }
        (winner, 1)
    };

    finish(
        state,
        RoundResult {
            kind,
            winner,
            scores,
            nagari,
            nagari_reasons: reasons,
            gold,
        },
        next_carry,
    );
}

/// Ends the round on a president declaration: fixed points times the carry-over.
pub fn president_stop(state: &mut GameState, seat: Seat) {
    let carry = state.carry_over.max(1);
    let winning = ScoreBreakdown::fixed(PRESIDENT_POINTS).scaled(carry);
    let gold = settle_points(&mut state.players, seat, winning.total);
    let mut scores = [ScoreBreakdown::fixed(0); 2];
    scores[seat.index()] = winning;
    finish(
        state,
        RoundResult {
            kind: ResultKind::PresidentStop,
            winner: Some(seat),
            scores,
            nagari: false,
            nagari_reasons: Vec::new(),
            gold,
        },
        1,
    );
}

/// Four cards of one month on the opening board hand the starter a fixed win.
pub fn board_president(state: &mut GameState) {
    let seat = state.starter;
    let winning = ScoreBreakdown::fixed(PRESIDENT_POINTS);
    let gold = settle_points(&mut state.players, seat, winning.total);
    let mut scores = [ScoreBreakdown::fixed(0); 2];
    scores[seat.index()] = winning;
    finish(
        state,
        RoundResult {
            kind: ResultKind::BoardPresident,
            winner: Some(seat),
            scores,
            nagari: false,
            nagari_reasons: Vec::new(),
            gold,
        },
        1,
    );
}

#[cfg(test)]
mod tests {
    use super::{president_stop, resolve_round};
    use crate::model::card::CardId;
    use crate::model::economy::STARTING_GOLD;
    use crate::model::player::Seat;
    use crate::model::state::{GameState, NagariReason, Phase};

    fn capture(state: &mut GameState, seat: Seat, codes: &[&str]) {
        for code in codes {
            let card: CardId = code.parse().expect("card");
            state.player_mut(seat).capture(card);
        }
    }

    #[test]
    fn higher_total_wins_and_collects_gold() {
        let mut state = GameState::empty(Seat::North);
        capture(&mut state, Seat::North, &["A0", "C0", "H0", "A1", "B1", "C1"]);
        capture(&mut state, Seat::South, &["K0"]);
        resolve_round(&mut state);
        let result = state.result.as_ref().expect("result");
        assert_eq!(state.phase, Phase::Resolved);
        assert_eq!(result.winner, Some(Seat::North));
        assert_eq!(result.scores[0].total, 6);
        assert_eq!(result.gold.paid, 600);
        assert_eq!(state.players[1].gold, STARTING_GOLD - 600);
    }

    #[test]
    fn scoreless_round_is_nagari_and_doubles_carry() {
        let mut state = GameState::empty(Seat::North);
        state.carry_over = 2;
        resolve_round(&mut state);
        let result = state.result.as_ref().expect("result");
        assert!(result.nagari);
        assert!(result.nagari_reasons.contains(&NagariReason::BothScoreless));
        assert_eq!(state.next_carry_over, 4);
        assert_eq!(result.winner, None);
    }

    #[test]
    fn carry_over_multiplies_the_winner() {
        let mut state = GameState::empty(Seat::North);
        state.carry_over = 2;
        capture(&mut state, Seat::South, &["B0", "D0", "H1"]);
        capture(&mut state, Seat::North, &["A2"]);
        resolve_round(&mut state);
        let result = state.result.as_ref().expect("result");
        assert_eq!(result.winner, Some(Seat::South));
        assert_eq!(result.scores[1].total, 10);
        assert_eq!(state.next_carry_over, 1);
    }

    #[test]
    fn failed_go_voids_the_round() {
        let mut state = GameState::empty(Seat::North);
        capture(&mut state, Seat::North, &["B0", "D0", "H1", "A1", "B1"]);
        state.player_mut(Seat::North).go_count = 1;
        state.player_mut(Seat::North).last_go_base = 7;
        capture(&mut state, Seat::South, &["A2"]);
        resolve_round(&mut state);
        let result = state.result.as_ref().expect("result");
        assert!(result.nagari);
        assert!(result.nagari_reasons.contains(&NagariReason::FailedGo(Seat::North)));
    }

    #[test]
    fn president_stop_pays_ten_times_carry() {
        let mut state = GameState::empty(Seat::South);
        state.carry_over = 2;
        president_stop(&mut state, Seat::South);
        let result = state.result.as_ref().expect("result");
        assert_eq!(result.scores[1].total, 20);
        assert_eq!(result.gold.paid, 2_000);
    }
}
