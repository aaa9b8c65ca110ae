//! Fills the hidden zones of a round with one concrete assignment.

use super::PublicKnowledge;
use crate::model::card::{CardId, FILLER_COUNT};
use crate::model::player::Seat;
use crate::model::state::GameState;
use rand::Rng;
use rand::seq::SliceRandom;
use std::fmt;

/// A state whose opponent hand and deck were sampled from the observer's unknowns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminizedState {
    pub state: GameState,
    /// Synthetic junk cards used because the unknown pool ran short.
    pub filler_count: usize,
}

impl DeterminizedState {
    pub fn is_low_confidence(&self) -> bool {
        self.filler_count > 0
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SamplingStats {
    pub samples: usize,
    pub padded: usize,
    pub fillers: usize,
}

impl SamplingStats {
    fn record(&mut self, sample: &DeterminizedState) {
        self.samples += 1;
        if sample.is_low_confidence() {
            self.padded += 1;
            self.fillers += sample.filler_count;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingError {
    /// More fillers were needed than the card table defines.
    FillerExhausted { required: usize },
    /// More cards are unaccounted for than there are hidden slots, so some
    /// real card would have to be dropped.
    Overfull { unknown: usize, required: usize },
}

impl fmt::Display for SamplingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingError::FillerExhausted { required } => write!(
                f,
                "hidden pool needs {required} filler cards, only {FILLER_COUNT} exist"
            ),
            SamplingError::Overfull { unknown, required } => write!(
                f,
                "{unknown} unplaced cards for {required} hidden slots"
            ),
        }
    }
}

impl std::error::Error for SamplingError {}

#[derive(Debug, Default)]
pub struct Determinizer;

impl Determinizer {
    pub fn determinize<R: Rng + ?Sized>(
        state: &GameState,
        observer: Seat,
        rng: &mut R,
    ) -> Result<DeterminizedState, SamplingError> {
        Self::determinize_with_stats(state, observer, rng, None)
    }

    /// Uniform sampling without replacement from every card the observer cannot place.
    /// Revealed opponent cards stay in the opponent hand.
    pub fn determinize_with_stats<R: Rng + ?Sized>(
        state: &GameState,
        observer: Seat,
        rng: &mut R,
        stats: Option<&mut SamplingStats>,
    ) -> Result<DeterminizedState, SamplingError> {
        let view = PublicKnowledge::observe(state, observer);
        let hidden_opponent = view.hidden_opponent_count();
        let required = view.hidden_pool_size();

        let mut pool = view.unknown_cards();
        if pool.len() > required {
            tracing::warn!(
                observer = %observer,
                required,
                unknown = pool.len(),
                "more unplaced cards than hidden slots; refusing to drop any"
            );
            return Err(SamplingError::Overfull {
                unknown: pool.len(),
                required,
            });
        }
        pool.shuffle(rng);

        let missing = required - pool.len();
        if missing > 0 {
            tracing::warn!(
                observer = %observer,
                required,
                available = pool.len(),
                missing,
                "hidden pool short; padding with filler cards"
            );
            for slot in 0..missing {
                let filler =
                    CardId::filler(slot).ok_or(SamplingError::FillerExhausted { required: missing })?;
                pool.push(filler);
            }
        }

        let mut next = state.clone();
        let mut opponent_hand = view.revealed().to_vec();
        opponent_hand.extend(pool.drain(..hidden_opponent));
        next.player_mut(observer.opponent()).hand = opponent_hand;
        next.deck = pool;

        let sample = DeterminizedState {
            state: next,
            filler_count: missing,
        };
        if let Some(stats) = stats {
            stats.record(&sample);
        }
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::{Determinizer, SamplingError, SamplingStats};
    use crate::model::player::Seat;
    use crate::rules::MatgoRules;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn sampled_state_keeps_observer_view() {
        let mut rng = StdRng::seed_from_u64(11);
        let state = MatgoRules.deal_with_starter(&mut rng, Seat::North);
        let mut stats = SamplingStats::default();
        let sample =
            Determinizer::determinize_with_stats(&state, Seat::North, &mut rng, Some(&mut stats))
                .expect("sample");
        assert_eq!(sample.filler_count, 0);
        assert_eq!(sample.state.check_accounting(), Ok(()));
        assert_eq!(sample.state.player(Seat::North), state.player(Seat::North));
        assert_eq!(sample.state.board, state.board);
        assert_eq!(
            sample.state.player(Seat::South).hand.len(),
            state.player(Seat::South).hand.len()
        );
        assert_eq!(sample.state.deck.len(), state.deck.len());
        assert_eq!(stats.samples, 1);
        assert_eq!(stats.padded, 0);
    }

    #[test]
    fn unplaced_surplus_is_an_error() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = MatgoRules.deal_with_starter(&mut rng, Seat::North);
        let lost = state.deck.pop().expect("deck card");
        let err = Determinizer::determinize(&state, Seat::North, &mut rng).expect_err("overfull");
        assert_eq!(
            err,
            SamplingError::Overfull {
                unknown: state.deck.len() + state.player(Seat::South).hand.len() + 1,
                required: state.deck.len() + state.player(Seat::South).hand.len(),
            }
        );
        assert!(!state.zones().any(|c| c == lost));
    }

    #[test]
    fn short_pool_is_padded_with_fillers() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = MatgoRules.deal_with_starter(&mut rng, Seat::North);
        // Stack the deck with cards the observer already sees.
        let extra: Vec<_> = state.player(Seat::North).hand.iter().take(3).copied().collect();
        state.deck.extend(extra);
        let sample = Determinizer::determinize(&state, Seat::North, &mut rng).expect("sample");
        assert_eq!(sample.filler_count, 3);
        assert!(sample.is_low_confidence());
        assert_eq!(sample.state.deck.len(), state.deck.len());
    }
}
