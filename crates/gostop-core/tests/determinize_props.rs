use gostop_core::belief::{Determinizer, PublicKnowledge};
use gostop_core::model::action::{Action, DecisionKind};
use gostop_core::model::player::Seat;
use gostop_core::model::state::{GameState, Pending, Phase};
use gostop_core::rules::{MatgoRules, RulesEngine};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Deals with `seed` and plays `plies` random legal actions.
fn advanced_state(seed: u64, plies: usize) -> GameState {
    let rules = MatgoRules;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = rules.deal(&mut rng);
    for _ in 0..plies {
        let (Some(seat), Some(kind)) = (rules.active_seat(&state), rules.pending_decision(&state))
        else {
            break;
        };
        let mut actions = rules.legal_candidates(&state, seat, kind);
        if kind == DecisionKind::PlayCard {
            actions.extend(rules.legal_candidates(&state, seat, DecisionKind::Bomb));
        }
        let Some(action) = actions.choose(&mut rng).copied() else {
            break;
        };
        state = rules
            .apply_action(&state, seat, action)
            .unwrap_or_else(|err| panic!("{action:?} rejected: {err}"));
    }
    state
}

fn seat_strategy() -> impl Strategy<Value = Seat> {
    prop_oneof![Just(Seat::North), Just(Seat::South)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn determinized_states_keep_every_card_once(
        deal_seed in any::<u64>(),
        sample_seed in any::<u64>(),
        plies in 0usize..30,
        observer in seat_strategy(),
    ) {
        let state = advanced_state(deal_seed, plies);
        let mut rng = StdRng::seed_from_u64(sample_seed);
        let sample = Determinizer::determinize(&state, observer, &mut rng)
            .expect("consistent state never runs out of fillers");

        prop_assert_eq!(sample.filler_count, 0);
        prop_assert_eq!(sample.state.check_accounting(), Ok(()));

        // Everything the observer could see is untouched.
        prop_assert_eq!(sample.state.player(observer), state.player(observer));
        prop_assert_eq!(&sample.state.board, &state.board);
        let opponent = observer.opponent();
        prop_assert_eq!(
            &sample.state.player(opponent).captured,
            &state.player(opponent).captured
        );
        prop_assert_eq!(
            sample.state.player(opponent).hand.len(),
            state.player(opponent).hand.len()
        );
        prop_assert_eq!(sample.state.deck.len(), state.deck.len());

        let view = PublicKnowledge::observe(&state, observer);
        for card in view.revealed() {
            prop_assert!(sample.state.player(opponent).hand.contains(card));
        }
        for card in sample.state.deck.iter().chain(&sample.state.player(opponent).hand) {
            prop_assert!(!view.is_known(*card) || view.revealed().contains(card));
        }
    }
}

#[test]
fn random_actions_reach_a_resolved_round() {
    for seed in 0..64 {
        let state = advanced_state(seed, 400);
        assert!(state.is_resolved(), "seed {seed} did not finish");
        assert_eq!(state.check_accounting(), Ok(()), "seed {seed}");
        assert!(state.result.is_some());
    }
}

#[test]
fn shaking_reveal_survives_determinization() {
    let rules = MatgoRules;
    for seed in 0..200 {
        let mut rng = StdRng::seed_from_u64(seed);
        let state = rules.deal(&mut rng);
        let Some(seat) = rules.active_seat(&state) else {
            continue;
        };
        let shakes = rules.legal_candidates(&state, seat, DecisionKind::Shaking);
        let Some(action @ Action::Shake { month, .. }) = shakes.first().copied() else {
            continue;
        };
        let next = rules.apply_action(&state, seat, action).expect("shake");
        if next.is_resolved() {
            continue;
        }
        let observer = seat.opponent();
        let sample = Determinizer::determinize(&next, observer, &mut rng).expect("sample");
        let kept = next
            .player(seat)
            .hand
            .iter()
            .filter(|c| c.month() == month)
            .count();
        let sampled = sample
            .state
            .player(seat)
            .hand
            .iter()
            .filter(|c| c.month() == month)
            .count();
        assert!(sampled >= kept, "seed {seed}: revealed cards dropped");
        return;
    }
}

#[test]
fn pending_flip_choice_survives_determinization() {
    let rules = MatgoRules;
    let mut checked = 0;
    for seed in 0..400u64 {
        for plies in 0..40 {
            let state = advanced_state(seed, plies);
            let Some(Pending::FlipMatch { flip, options, .. }) = state.pending.clone() else {
                continue;
            };
            assert_eq!(state.phase, Phase::AwaitingMatchChoice);
            assert_eq!(state.check_accounting(), Ok(()), "seed {seed} ply {plies}");

            let chooser = rules.active_seat(&state).expect("someone chooses");
            for observer in Seat::LOOP {
                let view = PublicKnowledge::observe(&state, observer);
                assert!(view.is_known(flip));
                let mut rng = StdRng::seed_from_u64(seed ^ plies as u64);
                let sample = Determinizer::determinize(&state, observer, &mut rng)
                    .expect("flip is placed, nothing is dropped");
                assert_eq!(sample.filler_count, 0);
                assert_eq!(sample.state.check_accounting(), Ok(()));

                let resolved = rules
                    .apply_action(&sample.state, chooser, Action::ChooseMatch { card: options[0] })
                    .expect("choice applies");
                assert_eq!(resolved.check_accounting(), Ok(()), "seed {seed} ply {plies}");
            }
            checked += 1;
            break;
        }
        if checked >= 8 {
            return;
        }
    }
    assert!(checked > 0, "no pending flip choice reached");
}
