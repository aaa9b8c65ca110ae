use crate::model::card::{CardId, DECK_SIZE, Month};
use crate::model::economy::{GoldTransfer, STARTING_GOLD};
use crate::model::player::{GukjinMode, Player, Seat};
use crate::model::score::ScoreBreakdown;
use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Dealing,
    Playing,
    AwaitingMatchChoice,
    AwaitingGoStop,
    AwaitingWildcard,
    AwaitingSpecialConfirm,
    Resolved,
}

/// How the card played from hand met the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandOutcome {
    /// Pass token or bomb: nothing from hand interacts with the flip.
    Silent,
    ToBoard { card: CardId },
    PairTaken { card: CardId, taken: CardId },
    PickedOne { card: CardId, taken: CardId, left: CardId },
    Stack,
}

/// Bookkeeping carried across the hand and flip halves of one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnScratch {
    pub last_hand: bool,
    pub outcome: HandOutcome,
    pub steal: u8,
    pub captured_any: bool,
    pub ppuk: bool,
}

impl TurnScratch {
    pub fn new(last_hand: bool, outcome: HandOutcome) -> Self {
        Self {
            last_hand,
            outcome,
            steal: 0,
            captured_any: false,
            ppuk: false,
        }
    }

    pub fn played_month(&self) -> Option<Month> {
        match self.outcome {
            HandOutcome::ToBoard { card }
            | HandOutcome::PairTaken { card, .. }
            | HandOutcome::PickedOne { card, .. } => Some(card.month()),
            HandOutcome::Silent | HandOutcome::Stack => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pending {
    /// The played card meets two board cards of different categories.
    HandMatch {
        card: CardId,
        options: [CardId; 2],
        president_chain: bool,
        last_hand: bool,
    },
    /// The flipped card meets two board cards of different categories.
    FlipMatch {
        flip: CardId,
        options: [CardId; 2],
        scratch: TurnScratch,
    },
    GoStop,
    Wildcard,
    President { month: Month },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HistoryEvent {
    Dealt { starter: Seat },
    Played { seat: Seat, card: CardId },
    Passed { seat: Seat },
    Flipped { seat: Seat, card: CardId },
    Captured { seat: Seat, cards: Vec<CardId> },
    Shaking { seat: Seat, month: Month, revealed: Vec<CardId> },
    Bomb { seat: Seat, month: Month },
    Ppuk { seat: Seat, month: Month },
    PiStolen { from: Seat, card: CardId },
    Go { seat: Seat, count: u8 },
    Stop { seat: Seat },
    PresidentHold { seat: Seat, month: Month },
    Gukjin { seat: Seat, mode: GukjinMode },
    RoundEnd { winner: Option<Seat>, nagari: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NagariReason {
    Draw,
    BothScoreless,
    FailedGo(Seat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Normal,
    ThreePpuk,
    PresidentStop,
    BoardPresident,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub kind: ResultKind,
    pub winner: Option<Seat>,
    pub scores: [ScoreBreakdown; 2],
    pub nagari: bool,
    pub nagari_reasons: Vec<NagariReason>,
    pub gold: GoldTransfer,
}

/// Full round snapshot. Owned by the rules engine; decision code reads it only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub players: [Player; 2],
    pub board: Vec<CardId>,
    pub deck: Vec<CardId>,
    pub phase: Phase,
    pub turn: Seat,
    pub starter: Seat,
    pub pending: Option<Pending>,
    pub carry_over: u32,
    pub next_carry_over: u32,
    pub turn_seq: u32,
    pub initial_gold: i64,
    pub history: Vec<HistoryEvent>,
    pub result: Option<RoundResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountingError {
    Duplicate(CardId),
    Missing(CardId),
}

impl fmt::Display for AccountingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountingError::Duplicate(card) => write!(f, "card {card} appears more than once"),
            AccountingError::Missing(card) => write!(f, "card {card} is not in any zone"),
        }
    }
}

impl std::error::Error for AccountingError {}

impl GameState {
    /// Empty table; used by the dealer and by hand-built fixtures.
    pub fn empty(starter: Seat) -> Self {
        Self {
            players: [Player::default(), Player::default()],
            board: Vec::new(),
            deck: Vec::new(),
            phase: Phase::Playing,
            turn: starter,
            starter,
            pending: None,
            carry_over: 1,
            next_carry_over: 1,
            turn_seq: 0,
            initial_gold: STARTING_GOLD,
            history: Vec::new(),
            result: None,
        }
    }

    pub fn player(&self, seat: Seat) -> &Player {
        &self.players[seat.index()]
    }

    pub fn player_mut(&mut self, seat: Seat) -> &mut Player {
        &mut self.players[seat.index()]
    }

    pub fn is_resolved(&self) -> bool {
        self.phase == Phase::Resolved
    }

    pub fn deck_len(&self) -> usize {
        self.deck.len()
    }

    pub fn board_month(&self, month: Month) -> impl Iterator<Item = CardId> + '_ {
        self.board.iter().copied().filter(move |c| c.month() == month)
    }

    pub fn board_month_count(&self, month: Month) -> usize {
        self.board_month(month).count()
    }

    /// Cards of `seat`'s hand that were shown to the table by a shaking declaration.
    pub fn revealed_hand_cards(&self, seat: Seat) -> Vec<CardId> {
        let hand = &self.player(seat).hand;
        let mut revealed: Vec<CardId> = self
            .history
            .iter()
            .filter_map(|event| match event {
                HistoryEvent::Shaking {
                    seat: owner,
                    revealed,
                    ..
                } if *owner == seat => Some(revealed.iter().copied()),
                _ => None,
            })
            .flatten()
            .filter(|card| hand.contains(card))
            .collect();
        revealed.sort();
        revealed.dedup();
        revealed
    }

    /// Face-up card held by a pending prompt instead of a zone: the flip
    /// waiting for its match choice.
    pub fn in_flight(&self) -> Option<CardId> {
        match &self.pending {
            Some(Pending::FlipMatch { flip, .. }) => Some(*flip),
            _ => None,
        }
    }

    /// Every zone that holds cards, in a fixed order, then the in-flight card.
    pub fn zones(&self) -> impl Iterator<Item = CardId> + '_ {
        self.players
            .iter()
            .flat_map(|p| p.hand.iter().copied().chain(p.captured.iter()))
            .chain(self.board.iter().copied())
            .chain(self.deck.iter().copied())
            .chain(self.in_flight())
    }

    /// Checks that every physical card sits in exactly one zone.
    /// Filler cards are ignored.
    pub fn check_accounting(&self) -> Result<(), AccountingError> {
        let mut seen = [false; DECK_SIZE];
        for card in self.zones() {
            if card.is_filler() {
                continue;
            }
            let slot = &mut seen[card.index()];
            if *slot {
                return Err(AccountingError::Duplicate(card));
            }
            *slot = true;
        }
        match CardId::deck().find(|card| !seen[card.index()]) {
            Some(card) => Err(AccountingError::Missing(card)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccountingError, GameState, HandOutcome, HistoryEvent, Pending, TurnScratch};
    use crate::model::card::CardId;
    use crate::model::player::Seat;

    #[test]
    fn pending_flip_is_accounted_for() {
        let mut state = GameState::empty(Seat::North);
        state.deck = CardId::deck().collect();
        let flip = state.deck.pop().expect("card");
        assert_eq!(state.check_accounting(), Err(AccountingError::Missing(flip)));

        let options = [state.deck[0], state.deck[1]];
        state.pending = Some(Pending::FlipMatch {
            flip,
            options,
            scratch: TurnScratch::new(false, HandOutcome::Silent),
        });
        assert_eq!(state.in_flight(), Some(flip));
        assert_eq!(state.check_accounting(), Ok(()));
    }

    #[test]
    fn accounting_flags_missing_and_duplicate_cards() {
        let mut state = GameState::empty(Seat::North);
        state.deck = CardId::deck().collect();
        assert_eq!(state.check_accounting(), Ok(()));

        let moved = state.deck.pop().expect("card");
        assert_eq!(state.check_accounting(), Err(AccountingError::Missing(moved)));

        state.deck.push(moved);
        state.board.push(moved);
        assert_eq!(
            state.check_accounting(),
            Err(AccountingError::Duplicate(moved))
        );
    }

    #[test]
    fn revealed_cards_follow_the_hand() {
        let mut state = GameState::empty(Seat::North);
        let cards: Vec<CardId> = ["A0", "A1", "A2"]
            .iter()
            .map(|c| c.parse().expect("card"))
            .collect();
        state.player_mut(Seat::South).hand = cards[1..].to_vec();
        state.history.push(HistoryEvent::Shaking {
            seat: Seat::South,
            month: 1,
            revealed: cards.clone(),
        });
        assert_eq!(state.revealed_hand_cards(Seat::South), cards[1..].to_vec());
        assert!(state.revealed_hand_cards(Seat::North).is_empty());
    }
}
