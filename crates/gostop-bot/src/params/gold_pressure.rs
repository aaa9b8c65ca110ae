tunable_params! {
    /// Constants of the gold-aware generation.
    pub struct GoldPressureParams as "gold_pressure" {
        /// Deck size above which the opening scoring applies.
        early_deck = 15.0,
        late_deck = 7.0,
        base_utility = 10.0,
        opponent_cost = 1.5,
        combo_synergy = 12.0,
        deny_bonus = 6.0,
        no_match_penalty = 100.0,
        /// Share of a card's own capture value lost by discarding it.
        discard_hold_mul = 0.1,
        combo_feed_penalty = 20.0,
        /// Score lead needed before a plain go.
        stop_lead_threshold = 5.0,
        threat_multiplier = 2.0,
        bomb_min_gain = 0.5,
        shake_threshold = 1.4,
        president_stop_diff = 2.0,
    }
}
