use crate::model::card::{BONUS_MONTH, CardId, DECK_SIZE, Month};
use crate::model::player::Seat;
use crate::model::state::GameState;

const CARDS_PER_MONTH: usize = 4;

/// What one seat can see of a round: its own hand, the board, both
/// captured piles, a flip awaiting its match choice, and opponent cards
/// shown by a shaking declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKnowledge {
    observer: Seat,
    known: [bool; DECK_SIZE],
    revealed: Vec<CardId>,
    hidden_opponent: usize,
    deck_len: usize,
}

impl PublicKnowledge {
    pub fn observe(state: &GameState, observer: Seat) -> Self {
        let opponent = observer.opponent();
        let revealed = state.revealed_hand_cards(opponent);
        let mut known = [false; DECK_SIZE];
        let mut mark = |card: CardId| {
            if !card.is_filler() {
                known[card.index()] = true;
            }
        };
        state.board.iter().copied().for_each(&mut mark);
        state.in_flight().into_iter().for_each(&mut mark);
        state.player(observer).hand.iter().copied().for_each(&mut mark);
        revealed.iter().copied().for_each(&mut mark);
        for player in &state.players {
            player.captured.iter().for_each(&mut mark);
        }

        let opponent_hand = state.player(opponent).hand.len();
        Self {
            observer,
            known,
            hidden_opponent: opponent_hand.saturating_sub(revealed.len()),
            revealed,
            deck_len: state.deck_len(),
        }
    }

    pub fn observer(&self) -> Seat {
        self.observer
    }

    pub fn is_known(&self, card: CardId) -> bool {
        !card.is_filler() && self.known[card.index()]
    }

    /// Opponent hand cards exposed by shaking and still held.
    pub fn revealed(&self) -> &[CardId] {
        &self.revealed
    }

    pub fn hidden_opponent_count(&self) -> usize {
        self.hidden_opponent
    }

    /// Hidden opponent cards plus the deck.
    pub fn hidden_pool_size(&self) -> usize {
        self.hidden_opponent + self.deck_len
    }

    /// Real cards the observer cannot place, in deck order.
    pub fn unknown_cards(&self) -> Vec<CardId> {
        CardId::deck().filter(|c| !self.is_known(*c)).collect()
    }

    pub fn known_month_count(&self, month: Month) -> usize {
        CardId::of_month(month).filter(|c| self.is_known(*c)).count()
    }

    pub fn unseen_month_count(&self, month: Month) -> usize {
        if month == 0 || month >= BONUS_MONTH {
            return 0;
        }
        CARDS_PER_MONTH.saturating_sub(self.known_month_count(month))
    }

    /// Probability that the opponent holds at least one card of `month`.
    pub fn opponent_hold_probability(&self, month: Month) -> f64 {
        if self.revealed.iter().any(|c| c.month() == month) {
            return 1.0;
        }
        let unseen = self.unseen_month_count(month);
        let pool = self.hidden_pool_size();
        if self.hidden_opponent == 0 || pool == 0 || unseen == 0 {
            return 0.0;
        }
        let miss = (1.0 - unseen as f64 / pool as f64).max(0.0);
        (1.0 - miss.powi(self.hidden_opponent as i32)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::PublicKnowledge;
    use crate::model::card::CardId;
    use crate::model::player::Seat;
    use crate::model::state::{GameState, HandOutcome, HistoryEvent, Pending, TurnScratch};

    fn ids(codes: &[&str]) -> Vec<CardId> {
        codes.iter().map(|c| c.parse().expect("card")).collect()
    }

    #[test]
    fn counts_follow_visible_zones() {
        let mut state = GameState::empty(Seat::North);
        state.player_mut(Seat::North).hand = ids(&["A0", "B0"]);
        state.player_mut(Seat::South).hand = ids(&["A1", "C0", "C1"]);
        state.board = ids(&["A2"]);
        state.deck = ids(&["D0", "D1"]);
        let view = PublicKnowledge::observe(&state, Seat::North);
        assert_eq!(view.known_month_count(1), 2);
        assert_eq!(view.unseen_month_count(1), 2);
        assert_eq!(view.hidden_pool_size(), 5);
        assert!(!view.is_known("A1".parse().expect("card")));
        let p = view.opponent_hold_probability(1);
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn pending_flip_is_public() {
        let mut state = GameState::empty(Seat::North);
        state.player_mut(Seat::South).hand = ids(&["B0"]);
        state.board = ids(&["A0", "A2"]);
        state.deck = ids(&["D0"]);
        let flip = ids(&["A1"])[0];
        state.pending = Some(Pending::FlipMatch {
            flip,
            options: [state.board[0], state.board[1]],
            scratch: TurnScratch::new(false, HandOutcome::Silent),
        });
        let view = PublicKnowledge::observe(&state, Seat::South);
        assert!(view.is_known(flip));
        assert_eq!(view.known_month_count(1), 3);
        assert!(!view.unknown_cards().contains(&flip));
    }

    #[test]
    fn shaking_reveal_is_certain() {
        let mut state = GameState::empty(Seat::North);
        let shown = ids(&["E0", "E1", "E2"]);
        state.player_mut(Seat::South).hand = shown.clone();
        state.history.push(HistoryEvent::Shaking {
            seat: Seat::South,
            month: 5,
            revealed: shown,
        });
        let view = PublicKnowledge::observe(&state, Seat::North);
        assert_eq!(view.opponent_hold_probability(5), 1.0);
        assert_eq!(view.hidden_opponent_count(), 0);
        assert_eq!(view.opponent_hold_probability(6), 0.0);
    }
}
