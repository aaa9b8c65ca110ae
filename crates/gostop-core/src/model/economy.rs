//! Points to gold conversion and round settlement.

use crate::model::player::{Player, Seat};
use serde::{Deserialize, Serialize};

pub const STARTING_GOLD: i64 = 1_000_000;
pub const POINT_GOLD_UNIT: i64 = 100;

pub fn points_to_gold(points: u32) -> i64 {
    points as i64 * POINT_GOLD_UNIT
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldTransfer {
    pub requested: i64,
    pub paid: i64,
}

impl GoldTransfer {
    pub fn shortfall(&self) -> i64 {
        self.requested - self.paid
    }
}

/// Moves up to `amount` gold from the taker's opponent to the taker.
/// The payer never goes below zero.
pub fn transfer_gold(players: &mut [Player; 2], taker: Seat, amount: i64) -> GoldTransfer {
    let giver = taker.opponent();
    let available = players[giver.index()].gold.max(0);
    let paid = amount.clamp(0, available);
    players[giver.index()].gold = available - paid;
    players[taker.index()].gold += paid;
    GoldTransfer {
        requested: amount.max(0),
        paid,
    }
}

pub fn settle_points(players: &mut [Player; 2], winner: Seat, points: u32) -> GoldTransfer {
    transfer_gold(players, winner, points_to_gold(points))
}

pub fn is_bankrupt(player: &Player) -> bool {
    player.gold <= 0
}

#[cfg(test)]
mod tests {
    use super::{STARTING_GOLD, is_bankrupt, settle_points, transfer_gold};
    use crate::model::player::{Player, Seat};

    #[test]
    fn settlement_pays_points_in_gold() {
        let mut players = [Player::default(), Player::default()];
        let transfer = settle_points(&mut players, Seat::North, 12);
        assert_eq!(transfer.requested, 1_200);
        assert_eq!(transfer.paid, 1_200);
        assert_eq!(players[0].gold, STARTING_GOLD + 1_200);
        assert_eq!(players[1].gold, STARTING_GOLD - 1_200);
    }

    #[test]
    fn payer_is_capped_at_balance() {
        let mut players = [Player::new(500), Player::new(300)];
        let transfer = transfer_gold(&mut players, Seat::North, 1_000);
        assert_eq!(transfer.paid, 300);
        assert_eq!(transfer.shortfall(), 700);
        assert!(is_bankrupt(&players[1]));
        assert_eq!(players[0].gold, 800);
    }
}
