use crate::model::card::CardId;
use crate::model::economy::STARTING_GOLD;
use crate::model::player::{Player, Seat};
use crate::model::state::{GameState, HistoryEvent, Phase};
use crate::rules::resolution::board_president;
use crate::rules::turn::start_turn;
use rand::Rng;
use rand::seq::SliceRandom;

pub const HAND_SIZE: usize = 10;
pub const BOARD_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DealOptions {
    /// Fixed starter; drawn from the hands when absent.
    pub starter: Option<Seat>,
    pub carry_over: u32,
    pub gold: [i64; 2],
    pub initial_gold: i64,
}

impl Default for DealOptions {
    fn default() -> Self {
        Self {
            starter: None,
            carry_over: 1,
            gold: [STARTING_GOLD; 2],
            initial_gold: STARTING_GOLD,
        }
    }
}

fn pick_starter<R: Rng + ?Sized>(hands: &[Vec<CardId>; 2], rng: &mut R) -> Seat {
    let month = |seat: Seat| hands[seat.index()].first().map_or(0, |c| c.month());
    match month(Seat::North).cmp(&month(Seat::South)) {
        core::cmp::Ordering::Greater => Seat::North,
        core::cmp::Ordering::Less => Seat::South,
        core::cmp::Ordering::Equal if rng.gen_bool(0.5) => Seat::North,
        core::cmp::Ordering::Equal => Seat::South,
    }
}

/// Shuffles and deals a fresh round.
pub fn deal<R: Rng + ?Sized>(options: &DealOptions, rng: &mut R) -> GameState {
    let mut deck: Vec<CardId> = CardId::deck().collect();
    deck.shuffle(rng);

    let mut hands = [Vec::with_capacity(HAND_SIZE), Vec::with_capacity(HAND_SIZE)];
    for hand in hands.iter_mut() {
        hand.extend(deck.drain(..HAND_SIZE));
    }
    let board: Vec<CardId> = deck.drain(..BOARD_SIZE).collect();

    let starter = options.starter.unwrap_or_else(|| pick_starter(&hands, rng));
    let mut state = GameState::empty(starter);
    state.carry_over = options.carry_over.max(1);
    state.next_carry_over = state.carry_over;
    state.initial_gold = options.initial_gold;
    for (seat, hand) in Seat::LOOP.into_iter().zip(hands) {
        let mut player = Player::new(options.gold[seat.index()]);
        player.hand = hand;
        *state.player_mut(seat) = player;
    }
    state.board = board;
    state.deck = deck;
    state.phase = Phase::Dealing;
    state.history.push(HistoryEvent::Dealt { starter });

    collect_board_bonus(&mut state);
    if has_board_president(&state) {
        board_president(&mut state);
        return state;
    }
    start_turn(&mut state, starter);
    state
}

/// Bonus cards turned up on the board go to the starter and are replaced.
fn collect_board_bonus(state: &mut GameState) {
    let starter = state.starter;
    while let Some(pos) = state.board.iter().position(|c| c.card().is_bonus()) {
        let card = state.board.remove(pos);
        state.player_mut(starter).capture(card);
        state.history.push(HistoryEvent::Captured {
            seat: starter,
            cards: vec![card],
        });
        if !state.deck.is_empty() {
            let refill = state.deck.remove(0);
            state.board.push(refill);
        }
    }
}

fn has_board_president(state: &GameState) -> bool {
    (1..=12).any(|month| state.board_month_count(month) == 4)
}

#[cfg(test)]
mod tests {
    use super::{BOARD_SIZE, DealOptions, HAND_SIZE, deal};
    use crate::model::player::Seat;
    use crate::model::state::Phase;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn deal_fills_every_zone_and_keeps_all_cards() {
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let state = deal(&DealOptions::default(), &mut rng);
            assert_eq!(state.check_accounting(), Ok(()));
            assert!(state.board.iter().all(|c| !c.card().is_bonus()));
            if state.phase == Phase::Resolved {
                continue;
            }
            for seat in Seat::LOOP {
                assert_eq!(state.player(seat).hand.len(), HAND_SIZE);
            }
            let collected = state.player(state.starter).captured.len();
            assert_eq!(state.board.len(), BOARD_SIZE);
            assert_eq!(state.deck.len() + collected, 50 - 2 * HAND_SIZE - BOARD_SIZE);
        }
    }

    #[test]
    fn fixed_starter_is_respected() {
        let mut rng = StdRng::seed_from_u64(7);
        let options = DealOptions {
            starter: Some(Seat::South),
            ..DealOptions::default()
        };
        let state = deal(&options, &mut rng);
        assert_eq!(state.starter, Seat::South);
    }
}
