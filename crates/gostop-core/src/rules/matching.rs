use crate::model::card::{CardId, Month};

/// How a card meets the board cards of its month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKind {
    None,
    One(CardId),
    Two([CardId; 2]),
    /// Three board cards: the whole stack is taken.
    Stack(Vec<CardId>),
}

pub fn resolve_match(month: Month, board: &[CardId]) -> MatchKind {
    let matches: Vec<CardId> = board.iter().copied().filter(|c| c.month() == month).collect();
    match matches.as_slice() {
        [] => MatchKind::None,
        [one] => MatchKind::One(*one),
        [a, b] => MatchKind::Two([*a, *b]),
        _ => MatchKind::Stack(matches),
    }
}

/// Two candidates of different categories leave the choice to the player.
pub fn needs_choice(options: [CardId; 2]) -> bool {
    options[0].category() != options[1].category()
}

fn junk_weight(card: CardId) -> u8 {
    let info = card.card();
    if info.is_junk() || info.is_bonus() {
        info.pi
    } else {
        1
    }
}

/// Automatic pick between two same-category candidates: heavier junk first.
pub fn best_match(options: [CardId; 2]) -> CardId {
    let [a, b] = options;
    if junk_weight(b) > junk_weight(a) || (junk_weight(b) == junk_weight(a) && b < a) {
        b
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::{MatchKind, best_match, needs_choice, resolve_match};
    use crate::model::card::CardId;

    fn ids(codes: &[&str]) -> Vec<CardId> {
        codes.iter().map(|c| c.parse().expect("card")).collect()
    }

    #[test]
    fn match_kind_follows_board_month_count() {
        let board = ids(&["A0", "B2", "B3", "C0", "C1", "C2"]);
        assert_eq!(resolve_match(5, &board), MatchKind::None);
        assert_eq!(resolve_match(1, &board), MatchKind::One(board[0]));
        assert_eq!(resolve_match(2, &board), MatchKind::Two([board[1], board[2]]));
        assert!(matches!(resolve_match(3, &board), MatchKind::Stack(cards) if cards.len() == 3));
    }

    #[test]
    fn mixed_categories_need_a_choice() {
        let mixed = ids(&["A0", "A2"]);
        assert!(needs_choice([mixed[0], mixed[1]]));
        let junk = ids(&["K2", "K1"]);
        assert!(!needs_choice([junk[0], junk[1]]));
        assert_eq!(best_match([junk[0], junk[1]]), junk[1]);
    }
}
