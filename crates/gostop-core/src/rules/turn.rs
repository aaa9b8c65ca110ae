//! Turn mechanics: hand play, deck flip, steals, and the post-turn gate.

use crate::model::card::{CardId, Month};
use crate::model::economy::{points_to_gold, transfer_gold};
use crate::model::player::{GukjinMode, Seat};
use crate::model::score::{GO_MIN_SCORE, base_score, score_captured};
use crate::model::state::{GameState, HandOutcome, HistoryEvent, Pending, Phase, TurnScratch};
use crate::rules::matching::{MatchKind, best_match, needs_choice, resolve_match};
use crate::rules::resolution::resolve_round;

const BOMB_PASS_TOKENS: u8 = 2;

fn take_from_board(state: &mut GameState, seat: Seat, cards: &[CardId]) {
    state.board.retain(|c| !cards.contains(c));
    let player = state.player_mut(seat);
    for card in cards {
        player.capture(*card);
    }
    state.history.push(HistoryEvent::Captured {
        seat,
        cards: cards.to_vec(),
    });
}

/// Moves up to `count` junk cards from the opponent's pile to `taker`'s.
pub(crate) fn steal_pi(state: &mut GameState, taker: Seat, count: u8) {
    let giver = taker.opponent();
    for _ in 0..count {
        let Some(card) = state.player(giver).captured.steal_candidate() else {
            break;
        };
        state.player_mut(giver).captured.remove(card);
        state.player_mut(taker).captured.junk.push(card);
        state.history.push(HistoryEvent::PiStolen { from: giver, card });
    }
}

fn chain_shaking(state: &mut GameState, seat: Seat, armed: bool, last_hand: bool) {
    if armed && !last_hand {
        state.player_mut(seat).events.shaking += 1;
    }
}

/// Plays `card` from `seat`'s hand. The card must be in hand.
pub(crate) fn play_from_hand(state: &mut GameState, seat: Seat, card: CardId) {
    let player = state.player(seat);
    let last_hand = player.turns_left() == 1;
    let month = card.month();
    let president_chain =
        player.president_hold == Some(month) && player.hand_month_count(month) == 4;
    state.history.push(HistoryEvent::Played { seat, card });

    if card.card().is_bonus() {
        play_bonus(state, seat, card, last_hand);
        return;
    }

    let outcome = match resolve_match(month, &state.board) {
        MatchKind::None => {
            state.player_mut(seat).remove_from_hand(card);
            state.board.push(card);
            HandOutcome::ToBoard { card }
        }
        MatchKind::One(taken) => {
            state.player_mut(seat).remove_from_hand(card);
            state.player_mut(seat).capture(card);
            take_from_board(state, seat, &[taken]);
            chain_shaking(state, seat, president_chain, last_hand);
            HandOutcome::PairTaken { card, taken }
        }
        MatchKind::Two(options) if needs_choice(options) => {
            state.pending = Some(Pending::HandMatch {
                card,
                options,
                president_chain,
                last_hand,
            });
            state.phase = Phase::AwaitingMatchChoice;
            return;
        }
        MatchKind::Two(options) => {
            let taken = best_match(options);
            let left = if options[0] == taken {
                options[1]
            } else {
                options[0]
            };
            state.player_mut(seat).remove_from_hand(card);
            state.player_mut(seat).capture(card);
            take_from_board(state, seat, &[taken]);
            chain_shaking(state, seat, president_chain, last_hand);
            HandOutcome::PickedOne { card, taken, left }
        }
        MatchKind::Stack(cards) => {
            state.player_mut(seat).remove_from_hand(card);
            state.player_mut(seat).capture(card);
            take_from_board(state, seat, &cards);
            state.player_mut(seat).events.stack_capture += 1;
            chain_shaking(state, seat, president_chain, last_hand);
            HandOutcome::Stack
        }
    };

    let mut scratch = TurnScratch::new(last_hand, outcome);
    if !matches!(outcome, HandOutcome::ToBoard { .. }) {
        scratch.captured_any = true;
    }
    if matches!(outcome, HandOutcome::Stack) && !last_hand {
        scratch.steal += 1;
    }
    run_flip(state, seat, scratch);
}

/// Resolves a pending two-way hand match in favour of `chosen`.
pub(crate) fn resolve_hand_choice(state: &mut GameState, seat: Seat, chosen: CardId) {
    let Some(Pending::HandMatch {
        card,
        options,
        president_chain,
        last_hand,
    }) = state.pending.take()
    else {
        return;
    };
    let left = if options[0] == chosen {
        options[1]
    } else {
        options[0]
    };
    state.phase = Phase::Playing;
    state.player_mut(seat).remove_from_hand(card);
    state.player_mut(seat).capture(card);
    take_from_board(state, seat, &[chosen]);
    chain_shaking(state, seat, president_chain, last_hand);
    let mut scratch = TurnScratch::new(
        last_hand,
        HandOutcome::PickedOne {
            card,
            taken: chosen,
            left,
        },
    );
    scratch.captured_any = true;
    run_flip(state, seat, scratch);
}

/// Bonus cards are collected on the spot and replaced from the deck; the
/// same seat keeps the turn.
fn play_bonus(state: &mut GameState, seat: Seat, card: CardId, last_hand: bool) {
    let player = state.player_mut(seat);
    player.remove_from_hand(card);
    player.capture(card);
    if !state.deck.is_empty() {
        let drawn = state.deck.remove(0);
        state.player_mut(seat).hand.push(drawn);
    }
    if !last_hand {
        steal_pi(state, seat, card.card().steal);
    }

    let player = state.player(seat);
    if player.turns_left() == 0 {
        finalize_turn(state, seat, TurnScratch::new(true, HandOutcome::Silent));
        return;
    }
    if player.president_hold.is_none() {
        if let Some(month) = player.president_month() {
            state.pending = Some(Pending::President { month });
            state.phase = Phase::AwaitingSpecialConfirm;
        }
    }
}

/// Spends a pass token: flip only.
pub(crate) fn play_pass(state: &mut GameState, seat: Seat) {
    let player = state.player_mut(seat);
    let last_hand = player.turns_left() == 1;
    player.pass_tokens = player.pass_tokens.saturating_sub(1);
    state.history.push(HistoryEvent::Passed { seat });
    run_flip(state, seat, TurnScratch::new(last_hand, HandOutcome::Silent));
}

/// Bomb: take the lone board card of `month` with every hand card of that month.
pub(crate) fn declare_bomb(state: &mut GameState, seat: Seat, month: Month) {
    let Some(board_card) = state.board_month(month).next() else {
        return;
    };
    let player = state.player_mut(seat);
    let from_hand: Vec<CardId> = player
        .hand
        .iter()
        .copied()
        .filter(|c| c.month() == month)
        .collect();
    player.hand.retain(|c| c.month() != month);
    let last_hand = player.turns_left() == 0;
    for card in &from_hand {
        player.capture(*card);
    }
    player.events.bomb += 1;
    player.pass_tokens += BOMB_PASS_TOKENS;
    state.history.push(HistoryEvent::Bomb { seat, month });
    take_from_board(state, seat, &[board_card]);

    let mut scratch = TurnScratch::new(last_hand, HandOutcome::Silent);
    scratch.captured_any = true;
    scratch.steal = 1;
    run_flip(state, seat, scratch);
}

/// Shaking: reveal every hand card of `month`, then play `card` normally.
pub(crate) fn declare_shaking(state: &mut GameState, seat: Seat, month: Month, card: CardId) {
    let player = state.player_mut(seat);
    let revealed: Vec<CardId> = player
        .hand
        .iter()
        .copied()
        .filter(|c| c.month() == month)
        .collect();
    player.events.shaking += 1;
    player.shaking_months.push(month);
    state.history.push(HistoryEvent::Shaking {
        seat,
        month,
        revealed,
    });
    play_from_hand(state, seat, card);
}

fn run_flip(state: &mut GameState, seat: Seat, mut scratch: TurnScratch) {
    while !state.deck.is_empty() {
        let flip = state.deck.remove(0);
        state.history.push(HistoryEvent::Flipped { seat, card: flip });

        if flip.card().is_bonus() {
            state.player_mut(seat).capture(flip);
            scratch.captured_any = true;
            if !scratch.last_hand {
                scratch.steal += flip.card().steal;
            }
            continue;
        }

        let month = flip.month();
        if !scratch.last_hand && scratch.played_month() == Some(month) {
            match scratch.outcome {
                HandOutcome::ToBoard { card } => {
                    state.player_mut(seat).capture(flip);
                    take_from_board(state, seat, &[card]);
                    state.player_mut(seat).events.jjob += 1;
                    scratch.captured_any = true;
                    scratch.steal += 1;
                    break;
                }
                HandOutcome::PairTaken { card, taken } => {
                    let player = state.player_mut(seat);
                    player.captured.remove(card);
                    player.captured.remove(taken);
                    player.events.ppuk += 1;
                    state.board.extend([card, taken, flip]);
                    state.history.push(HistoryEvent::Ppuk { seat, month });
                    scratch.ppuk = true;
                    break;
                }
                HandOutcome::PickedOne { left, .. } => {
                    state.player_mut(seat).capture(flip);
                    take_from_board(state, seat, &[left]);
                    state.player_mut(seat).events.ddadak += 1;
                    scratch.captured_any = true;
                    scratch.steal += 1;
                    break;
                }
                HandOutcome::Silent | HandOutcome::Stack => {}
            }
        }

        match resolve_match(month, &state.board) {
            MatchKind::None => state.board.push(flip),
            MatchKind::One(taken) => {
                state.player_mut(seat).capture(flip);
                take_from_board(state, seat, &[taken]);
                scratch.captured_any = true;
            }
            MatchKind::Two(options) if needs_choice(options) => {
                state.pending = Some(Pending::FlipMatch {
                    flip,
                    options,
                    scratch,
                });
                state.phase = Phase::AwaitingMatchChoice;
                return;
            }
            MatchKind::Two(options) => {
                state.player_mut(seat).capture(flip);
                take_from_board(state, seat, &[best_match(options)]);
                scratch.captured_any = true;
            }
            MatchKind::Stack(cards) => {
                state.player_mut(seat).capture(flip);
                take_from_board(state, seat, &cards);
                state.player_mut(seat).events.stack_capture += 1;
                scratch.captured_any = true;
                if !scratch.last_hand {
                    scratch.steal += 1;
                }
            }
        }
        break;
    }
    finalize_turn(state, seat, scratch);
}

/// Resolves a pending two-way flip match in favour of `chosen`.
pub(crate) fn resolve_flip_choice(state: &mut GameState, seat: Seat, chosen: CardId) {
    let Some(Pending::FlipMatch {
        flip, mut scratch, ..
    }) = state.pending.take()
    else {
        return;
    };
    state.phase = Phase::Playing;
    state.player_mut(seat).capture(flip);
    take_from_board(state, seat, &[chosen]);
    scratch.captured_any = true;
    finalize_turn(state, seat, scratch);
}

fn ppuk_reward(turn_index: u8, streak: u8) -> u32 {
    match (turn_index, streak) {
        (0, _) => 7,
        (1, s) if s >= 2 => 14,
        (2, s) if s >= 3 => 21,
        _ => 0,
    }
}

fn finalize_turn(state: &mut GameState, seat: Seat, scratch: TurnScratch) {
    let player = state.player_mut(seat);
    let turn_index = player.turn_count;
    player.turn_count = player.turn_count.saturating_add(1);
    let reward = if scratch.ppuk {
        player.ppuk_streak += 1;
        ppuk_reward(turn_index, player.ppuk_streak)
    } else {
        player.ppuk_streak = 0;
        0
    };
    if reward > 0 {
        transfer_gold(&mut state.players, seat, points_to_gold(reward));
    }

    let mut steal = scratch.steal;
    if !scratch.last_hand && state.board.is_empty() && scratch.captured_any {
        state.player_mut(seat).events.sweep += 1;
        steal += 1;
    }
    if scratch.last_hand {
        steal = 0;
    }
    steal_pi(state, seat, steal);
    state.turn_seq += 1;
    state.pending = None;
    state.phase = Phase::Playing;

    if state.player(seat).events.ppuk >= 3 {
        resolve_round(state);
        return;
    }
    if gukjin_choice_matters(state, seat) {
        state.turn = seat;
        state.pending = Some(Pending::Wildcard);
        state.phase = Phase::AwaitingWildcard;
        return;
    }
    continue_after_turn(state, seat);
}

/// Whether picking the gukjin scoring mode now changes what happens next.
fn gukjin_choice_matters(state: &GameState, seat: Seat) -> bool {
    let player = state.player(seat);
    if player.gukjin_locked || !player.captured.gukjin_in_five() {
        return false;
    }
    let opponent = state.player(seat.opponent());
    let as_five = player.captured.clone();
    let as_junk = player.captured.with_gukjin_as(GukjinMode::Junk);
    let five_score = score_captured(player, &as_five, opponent);
    let junk_score = score_captured(player, &as_junk, opponent);
    let differs = five_score.base != junk_score.base
        || five_score.total != junk_score.total
        || five_score.multiplier != junk_score.multiplier
        || five_score.bak != junk_score.bak;

    let left = player.turns_left();
    let raised_five = base_score(&as_five) > player.last_go_base;
    let raised_junk = base_score(&as_junk) > player.last_go_base;
    let go_five = base_score(&as_five) >= GO_MIN_SCORE && raised_five && left > 0;
    let go_junk = base_score(&as_junk) >= GO_MIN_SCORE && raised_junk && left > 0;
    if go_five != go_junk || ((go_five || go_junk) && differs) {
        return true;
    }
    let went_go = player.go_count > 0 && left == 0;
    let auto_five = went_go && raised_five;
    let auto_junk = went_go && raised_junk;
    if auto_five != auto_junk || ((auto_five || auto_junk) && differs) {
        return true;
    }
    if state.players.iter().all(|p| p.turns_left() == 0) {
        return differs;
    }
    false
}

/// Post-turn gate: auto-stop, go/stop prompt, round end, or hand the turn over.
pub(crate) fn continue_after_turn(state: &mut GameState, seat: Seat) {
    let player = state.player(seat);
    let base = base_score(&player.captured);
    let eligible = base >= GO_MIN_SCORE && base > player.last_go_base;
    let left = player.turns_left();

    if eligible && left == 0 {
        state.player_mut(seat).declared_stop = true;
        state.history.push(HistoryEvent::Stop { seat });
        resolve_round(state);
        return;
    }
    if eligible {
        state.turn = seat;
        state.pending = Some(Pending::GoStop);
        state.phase = Phase::AwaitingGoStop;
        return;
    }
    if state.players.iter().all(|p| p.turns_left() == 0) {
        resolve_round(state);
        return;
    }
    start_turn(state, seat.opponent());
}

/// Gives `seat` the turn, offering the president choice on an untouched hand.
pub(crate) fn start_turn(state: &mut GameState, seat: Seat) {
    let seat = if state.player(seat).turns_left() == 0 {
        seat.opponent()
    } else {
        seat
    };
    state.turn = seat;
    state.pending = None;
    state.phase = Phase::Playing;
    let player = state.player(seat);
    if player.turn_count == 0 && player.president_hold.is_none() {
        if let Some(month) = player.president_month() {
            state.pending = Some(Pending::President { month });
            state.phase = Phase::AwaitingSpecialConfirm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{continue_after_turn, play_from_hand, steal_pi};
    use crate::model::card::CardId;
    use crate::model::player::Seat;
    use crate::model::state::{GameState, Pending, Phase};

    fn id(code: &str) -> CardId {
        code.parse().expect("card")
    }

    fn ids(codes: &[&str]) -> Vec<CardId> {
        codes.iter().map(|c| id(c)).collect()
    }

    fn table(north_hand: &[&str], south_hand: &[&str], board: &[&str], deck: &[&str]) -> GameState {
        let mut state = GameState::empty(Seat::North);
        state.player_mut(Seat::North).hand = ids(north_hand);
        state.player_mut(Seat::South).hand = ids(south_hand);
        state.board = ids(board);
        state.deck = ids(deck);
        state
    }

    #[test]
    fn single_match_captures_pair_and_passes_turn() {
        let mut state = table(&["A0", "E0"], &["F0", "G0"], &["A2", "B2"], &["C2", "D2"]);
        play_from_hand(&mut state, Seat::North, id("A0"));
        let north = state.player(Seat::North);
        assert!(north.captured.contains(id("A0")));
        assert!(north.captured.contains(id("A2")));
        assert_eq!(state.board, ids(&["B2", "C2"]));
        assert_eq!(state.turn, Seat::South);
        assert_eq!(state.phase, Phase::Playing);
    }

    #[test]
    fn flip_on_own_pair_makes_ppuk() {
        let mut state = table(&["A0", "E0"], &["F0", "G0"], &["A2", "B2"], &["A3", "D2"]);
        play_from_hand(&mut state, Seat::North, id("A0"));
        let north = state.player(Seat::North);
        assert_eq!(north.events.ppuk, 1);
        assert!(north.captured.is_empty());
        assert_eq!(state.board_month_count(1), 3);
    }

    #[test]
    fn flip_on_own_discard_is_jjob_and_steals() {
        let mut state = table(&["A0", "E0"], &["F0", "G0"], &["B2"], &["A2", "D2"]);
        state.player_mut(Seat::South).capture(id("C2"));
        play_from_hand(&mut state, Seat::North, id("A0"));
        let north = state.player(Seat::North);
        assert_eq!(north.events.jjob, 1);
        assert!(north.captured.contains(id("C2")));
        assert!(state.player(Seat::South).captured.is_empty());
    }

    #[test]
    fn mixed_two_way_match_waits_for_choice() {
        let mut state = table(&["A2", "E0"], &["F0", "G0"], &["A0", "A1"], &["C2"]);
        play_from_hand(&mut state, Seat::North, id("A2"));
        assert_eq!(state.phase, Phase::AwaitingMatchChoice);
        assert!(matches!(state.pending, Some(Pending::HandMatch { .. })));
        assert!(state.player(Seat::North).holds(id("A2")));
    }

    #[test]
    fn clearing_the_board_is_a_sweep() {
        let mut state = table(&["A0", "E0"], &["F0", "G0"], &["A2", "E3"], &["E2", "K2"]);
        play_from_hand(&mut state, Seat::North, id("A0"));
        let north = state.player(Seat::North);
        assert!(state.board.is_empty());
        assert_eq!(north.events.sweep, 1);
    }

    #[test]
    fn seven_points_with_cards_left_prompts_go_stop() {
        let mut state = table(&["A0", "E0"], &["F0", "G0"], &[], &[]);
        for code in ["B0", "D0", "H1", "A1", "B1"] {
            state.player_mut(Seat::North).capture(id(code));
        }
        continue_after_turn(&mut state, Seat::North);
        assert_eq!(state.phase, Phase::Playing);

        state.player_mut(Seat::North).capture(id("C1"));
        continue_after_turn(&mut state, Seat::North);
        assert_eq!(state.phase, Phase::AwaitingGoStop);
        assert_eq!(state.turn, Seat::North);
    }

    #[test]
    fn steal_stops_when_opponent_has_no_junk() {
        let mut state = GameState::empty(Seat::North);
        state.player_mut(Seat::South).capture(id("A2"));
        steal_pi(&mut state, Seat::North, 3);
        assert_eq!(state.player(Seat::North).captured.pi_count(), 1);
        assert!(state.player(Seat::South).captured.is_empty());
    }
}
