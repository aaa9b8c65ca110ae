use crate::model::action::{Action, DecisionKind};
use crate::model::card::{BONUS_MONTH, Month};
use crate::model::player::{GukjinMode, Player, Seat};
use crate::model::score::base_score;
use crate::model::state::{GameState, HistoryEvent, Pending, Phase};
use crate::rules::dealer::{DealOptions, deal};
use crate::rules::resolution::{president_stop, resolve_round};
use crate::rules::turn;
use crate::rules::{RulesEngine, RulesError};
use rand::Rng;

/// Reference two-player rules engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatgoRules;

impl MatgoRules {
    pub fn deal<R: Rng + ?Sized>(&self, rng: &mut R) -> GameState {
        deal(&DealOptions::default(), rng)
    }

    pub fn deal_with<R: Rng + ?Sized>(&self, options: &DealOptions, rng: &mut R) -> GameState {
        deal(options, rng)
    }

    pub fn deal_with_starter<R: Rng + ?Sized>(&self, rng: &mut R, starter: Seat) -> GameState {
        let options = DealOptions {
            starter: Some(starter),
            ..DealOptions::default()
        };
        deal(&options, rng)
    }

    /// Months `player` may shake: three or more in hand, none on the board, not yet declared.
    pub fn shaking_months(state: &GameState, player: &Player) -> Vec<Month> {
        (1..BONUS_MONTH)
            .filter(|m| player.hand_month_count(*m) >= 3)
            .filter(|m| state.board_month_count(*m) == 0)
            .filter(|m| !player.shaking_months.contains(m))
            .collect()
    }

    /// Months `player` may bomb: three or more in hand and exactly one on the board.
    pub fn bomb_months(state: &GameState, player: &Player) -> Vec<Month> {
        (1..BONUS_MONTH)
            .filter(|m| player.hand_month_count(*m) >= 3)
            .filter(|m| state.board_month_count(*m) == 1)
            .collect()
    }

    fn owes_turn(state: &GameState, seat: Seat) -> bool {
        state.phase == Phase::Playing && state.turn == seat && state.pending.is_none()
    }

    fn choose_gukjin(state: &mut GameState, seat: Seat, mode: GukjinMode) {
        let player = state.player_mut(seat);
        if mode == GukjinMode::Junk {
            player.captured.convert_gukjin_to_junk();
        }
        player.gukjin_mode = mode;
        player.gukjin_locked = true;
        state.history.push(HistoryEvent::Gukjin { seat, mode });
        state.pending = None;
        state.phase = Phase::Playing;
        turn::continue_after_turn(state, seat);
    }

    fn declare_go(state: &mut GameState, seat: Seat) {
        let player = state.player_mut(seat);
        player.go_count += 1;
        player.last_go_base = base_score(&player.captured);
        let count = player.go_count;
        state.history.push(HistoryEvent::Go { seat, count });
        turn::start_turn(state, seat.opponent());
    }

    fn declare_stop(state: &mut GameState, seat: Seat) {
        state.player_mut(seat).declared_stop = true;
        state.history.push(HistoryEvent::Stop { seat });
        resolve_round(state);
    }

    fn hold_president(state: &mut GameState, seat: Seat) {
        if let Some(Pending::President { month }) = state.pending.take() {
            state.player_mut(seat).president_hold = Some(month);
            state.history.push(HistoryEvent::PresidentHold { seat, month });
        }
        state.phase = Phase::Playing;
    }
}

impl RulesEngine for MatgoRules {
    fn legal_candidates(&self, state: &GameState, seat: Seat, kind: DecisionKind) -> Vec<Action> {
        if state.is_resolved() || state.turn != seat {
            return Vec::new();
        }
        let player = state.player(seat);
        match kind {
            DecisionKind::PlayCard if Self::owes_turn(state, seat) => {
                let mut actions: Vec<Action> =
                    player.hand.iter().map(|&card| Action::Play { card }).collect();
                if player.pass_tokens > 0 {
                    actions.push(Action::Pass);
                }
                actions
            }
            DecisionKind::Shaking if Self::owes_turn(state, seat) => {
                Self::shaking_months(state, player)
                    .into_iter()
                    .flat_map(|month| {
                        player
                            .hand
                            .iter()
                            .filter(move |c| c.month() == month)
                            .map(move |&card| Action::Shake { month, card })
                    })
                    .collect()
            }
            DecisionKind::Bomb if Self::owes_turn(state, seat) => Self::bomb_months(state, player)
                .into_iter()
                .map(|month| Action::Bomb { month })
                .collect(),
            DecisionKind::ChooseMatch => match &state.pending {
                Some(Pending::HandMatch { options, .. }) | Some(Pending::FlipMatch { options, .. }) => {
                    options.iter().map(|&card| Action::ChooseMatch { card }).collect()
                }
                _ => Vec::new(),
            },
            DecisionKind::GoStop if state.pending == Some(Pending::GoStop) => {
                vec![Action::Go, Action::Stop]
            }
            DecisionKind::Wildcard if state.pending == Some(Pending::Wildcard) => vec![
                Action::Gukjin {
                    mode: GukjinMode::Five,
                },
                Action::Gukjin {
                    mode: GukjinMode::Junk,
                },
            ],
            DecisionKind::President
                if matches!(state.pending, Some(Pending::President { .. })) =>
            {
                vec![Action::PresidentStop, Action::PresidentHold]
            }
            _ => Vec::new(),
        }
    }

    fn apply_action(
        &self,
        state: &GameState,
        seat: Seat,
        action: Action,
    ) -> Result<GameState, RulesError> {
        if state.is_resolved() {
            return Err(RulesError::RoundOver);
        }
        if state.turn != seat {
            return Err(RulesError::NotYourTurn { seat });
        }
        if !self
            .legal_candidates(state, seat, action.kind())
            .contains(&action)
        {
            return Err(RulesError::IllegalAction {
                action,
                phase: state.phase,
            });
        }

        let mut next = state.clone();
        match action {
            Action::Play { card } => turn::play_from_hand(&mut next, seat, card),
            Action::Pass => turn::play_pass(&mut next, seat),
            Action::Shake { month, card } => turn::declare_shaking(&mut next, seat, month, card),
            Action::Bomb { month } => turn::declare_bomb(&mut next, seat, month),
            Action::ChooseMatch { card } => match next.pending {
                Some(Pending::HandMatch { .. }) => turn::resolve_hand_choice(&mut next, seat, card),
                _ => turn::resolve_flip_choice(&mut next, seat, card),
            },
            Action::Go => Self::declare_go(&mut next, seat),
            Action::Stop => Self::declare_stop(&mut next, seat),
            Action::PresidentStop => president_stop(&mut next, seat),
            Action::PresidentHold => Self::hold_president(&mut next, seat),
            Action::Gukjin { mode } => Self::choose_gukjin(&mut next, seat, mode),
        }
        Ok(next)
    }

    fn active_seat(&self, state: &GameState) -> Option<Seat> {
        match state.phase {
            Phase::Resolved | Phase::Dealing => None,
            _ => Some(state.turn),
        }
    }

    fn pending_decision(&self, state: &GameState) -> Option<DecisionKind> {
        match state.phase {
            Phase::Playing => Some(DecisionKind::PlayCard),
            Phase::AwaitingMatchChoice => Some(DecisionKind::ChooseMatch),
            Phase::AwaitingGoStop => Some(DecisionKind::GoStop),
            Phase::AwaitingWildcard => Some(DecisionKind::Wildcard),
            Phase::AwaitingSpecialConfirm => Some(DecisionKind::President),
            Phase::Dealing | Phase::Resolved => None,
        }
    }
}
