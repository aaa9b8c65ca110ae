use crate::model::card::{CardId, Month};
use crate::model::player::GukjinMode;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Which question the rules engine is currently asking a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    PlayCard,
    Shaking,
    Bomb,
    ChooseMatch,
    GoStop,
    Wildcard,
    President,
}

impl DecisionKind {
    pub const ALL: [DecisionKind; 7] = [
        DecisionKind::PlayCard,
        DecisionKind::Shaking,
        DecisionKind::Bomb,
        DecisionKind::ChooseMatch,
        DecisionKind::GoStop,
        DecisionKind::Wildcard,
        DecisionKind::President,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            DecisionKind::PlayCard => "play_card",
            DecisionKind::Shaking => "shaking",
            DecisionKind::Bomb => "bomb",
            DecisionKind::ChooseMatch => "choose_match",
            DecisionKind::GoStop => "go_stop",
            DecisionKind::Wildcard => "wildcard",
            DecisionKind::President => "president",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Play { card: CardId },
    /// Spend a pass token: flip from the deck without playing a card.
    Pass,
    /// Declare shaking for `month`, then play `card` of that month.
    Shake { month: Month, card: CardId },
    Bomb { month: Month },
    ChooseMatch { card: CardId },
    Go,
    Stop,
    PresidentStop,
    PresidentHold,
    Gukjin { mode: GukjinMode },
}

impl Action {
    pub const fn kind(&self) -> DecisionKind {
        match self {
            Action::Play { .. } | Action::Pass => DecisionKind::PlayCard,
            Action::Shake { .. } => DecisionKind::Shaking,
            Action::Bomb { .. } => DecisionKind::Bomb,
            Action::ChooseMatch { .. } => DecisionKind::ChooseMatch,
            Action::Go | Action::Stop => DecisionKind::GoStop,
            Action::PresidentStop | Action::PresidentHold => DecisionKind::President,
            Action::Gukjin { .. } => DecisionKind::Wildcard,
        }
    }

    /// Card this action puts into play, if any.
    pub const fn card(&self) -> Option<CardId> {
        match self {
            Action::Play { card } | Action::Shake { card, .. } | Action::ChooseMatch { card } => {
                Some(*card)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Play { card } => write!(f, "play {card}"),
            Action::Pass => f.write_str("pass"),
            Action::Shake { month, card } => write!(f, "shake m{month} with {card}"),
            Action::Bomb { month } => write!(f, "bomb m{month}"),
            Action::ChooseMatch { card } => write!(f, "take {card}"),
            Action::Go => f.write_str("go"),
            Action::Stop => f.write_str("stop"),
            Action::PresidentStop => f.write_str("president stop"),
            Action::PresidentHold => f.write_str("president hold"),
            Action::Gukjin { mode } => write!(f, "gukjin as {mode:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, DecisionKind};
    use crate::model::card::CardId;

    #[test]
    fn actions_report_their_decision_kind() {
        let card: CardId = "A0".parse().expect("card");
        assert_eq!(Action::Play { card }.kind(), DecisionKind::PlayCard);
        assert_eq!(Action::Pass.kind(), DecisionKind::PlayCard);
        assert_eq!(Action::Stop.kind(), DecisionKind::GoStop);
        assert_eq!(Action::Shake { month: 1, card }.card(), Some(card));
        assert_eq!(Action::Go.card(), None);
    }

    #[test]
    fn actions_serialize_with_card_codes() {
        let card: CardId = "H0".parse().expect("card");
        let json = serde_json::to_string(&Action::Play { card }).expect("serialize");
        assert_eq!(json, r#"{"type":"play","card":"H0"}"#);
    }
}
