tunable_params! {
    /// Constants of the weighted-utility generation.
    pub struct WeightedParams as "weighted" {
        /// Fixed part of the score for a one-card match.
        match_one_base = 6.0,
        match_two_base = 10.0,
        match_three_base = 14.0,
        no_match_penalty = 2.5,
        high_value_match_bonus = 5.0,
        feed_risk_mul = 5.5,
        feed_risk_match_mul = 1.3,
        puk_risk_high_mul = 5.0,
        puk_risk_normal_mul = 3.5,
        blocking_bonus = 20.0,
        /// Discarding a card the opponent needs for a near-complete set.
        combo_feed_penalty = 14.0,
        combo_block_bonus = 6.0,
        first_turn_plan_bonus = 5.5,
        combo_base_bonus = 3.5,

        go_base_threshold = 0.52,
        go_opp_score_gate_low = 3.0,
        /// Opponent score at which go is never taken.
        go_opp_score_gate_high = 5.0,
        go_opp_one_away_gate = 35.0,
        go_score_diff_bonus = 0.06,
        go_deck_low_bonus = 0.05,
        go_unseen_high_pi_penalty = 0.08,

        bomb_min_gain = 1.0,
        /// Non-zero: a high-impact bomb is always declared.
        bomb_high_impact_override = 1.0,

        shaking_threshold = 0.60,
        shaking_immediate_mul = 1.25,
        shaking_combo_mul = 1.10,
        shaking_tempo_mul = 0.45,
        shaking_risk_mul = 1.0,
        shaking_ahead_penalty = 0.20,

        match_pi_gain_mul = 4.0,
        match_bright_bonus = 9.0,
        match_ribbon_bonus = 7.0,
        match_five_bonus = 5.0,
        match_double_pi_bonus = 14.0,
        match_combo_finish_mul = 1.5,
        match_block_mul = 1.0,
        match_mong_five_bonus = 42.0,

        early_deck_min = 20.0,
        late_deck_max = 10.0,
        endgame_deck_max = 5.0,
    }
}
