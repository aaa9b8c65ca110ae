tunable_params! {
    /// Constants of the phase-weighted generation: the weighted baseline with
    /// phase multipliers, a utility check behind the go gate and forward
    /// blocking in match choice.
    pub struct PhaseWeightedParams as "phase_weighted" {
        /// Deck size at or above which the opening multipliers apply.
        phase_early_deck = 18.0,
        phase_mid_deck = 10.0,
        late_deck_max = 10.0,

        match_zero_base = -48.1,
        match_one_base = 7.53,
        match_two_base = 14.80,
        match_three_base = 12.89,
        capture_gain_mul_three = 1.15,
        high_value_match_bonus = 3.77,
        pi_gain_mul = 6.25,
        pi_gain_self_high_mul = 1.8,
        pi_gain_opp_low_mul = 1.4,
        double_pi_match_bonus = 16.49,
        double_pi_match_extra = 6.0,
        double_pi_no_match_penalty = 14.0,
        combo_finish_bright = 32.0,
        combo_finish_ribbon = 27.0,
        combo_finish_birds = 30.0,
        combo_block_base = 19.08,
        combo_block_urgency_mul = 0.51,
        combo_block_next_threat_mul = 4.5,
        ribbon_four_bonus = 34.0,
        five_four_bonus = 36.0,
        mong_five_bonus = 33.83,
        mong_pi_penalty = 8.0,

        discard_live_pi_penalty = 24.0,
        discard_live_pi_penalty_late = 36.0,
        discard_double_pi_live_penalty = 16.0,
        discard_double_pi_live_penalty_late = 26.0,
        discard_double_pi_dead_bonus = 6.0,
        /// Discarding a month the opponent needs for a near-complete set.
        discard_combo_hold_penalty = 44.0,
        discard_combo_hold_penalty_late = 56.0,
        discard_one_away_penalty = 42.0,
        discard_one_away_penalty_late = 58.0,
        discard_block_penalty = 20.0,
        discard_block_penalty_late = 30.0,
        discard_mong_five_penalty = 28.0,
        discard_bonus_pi_bonus = 26.0,
        known_month_bonus = 1.9,
        unknown_month_penalty = 1.8,

        feed_risk_no_match_mul = 4.51,
        feed_risk_match_mul = 1.05,
        puk_risk_high_mul = 3.99,
        puk_risk_normal_mul = 3.33,
        first_turn_plan_bonus = 7.46,
        second_mover_go_gate_shrink = 4.0,
        second_mover_pi_bonus = 1.5,

        phase_early_combo_mul = 1.20,
        phase_early_block_mul = 0.90,
        phase_early_feed_mul = 0.85,
        phase_late_combo_mul = 0.85,
        phase_late_block_mul = 1.35,
        phase_late_feed_mul = 1.40,
        phase_late_double_pi_mul = 1.50,

        match_pi_gain_mul = 6.25,
        match_bright_bonus = 15.02,
        match_ribbon_bonus = 10.02,
        match_five_bonus = 8.0,
        match_double_pi_bonus = 18.0,
        match_mong_five_bonus = 33.83,
        /// Extra weight on match choices that take a card the opponent needs.
        match_forward_block_mul = 1.45,

        go_min_pi = 8.0,
        go_opp_score_gate_high = 6.0,
        go_opp_score_gate_low = 4.0,
        go_big_lead_score_diff = 4.0,
        go_big_lead_min_score = 8.0,
        go_big_lead_one_away_late = 35.0,
        go_big_lead_one_away_early = 55.0,
        go_big_lead_combo_threat = 0.45,
        go_big_lead_next_threat = 0.45,
        go_one_away_opp4_late = 40.0,
        go_one_away_opp4_early = 60.0,
        go_one_away_opp3 = 65.0,
        go_one_away_opp2 = 75.0,
        go_one_away_opp1 = 85.0,
        go_opp_low_combo_threat = 0.55,
        go_opp_low_next_threat = 0.55,
        go_zero_opp_one_away_late = 88.0,
        go_zero_opp_one_away_early = 95.0,
        /// A first go is refused at or below this deck size.
        first_go_min_deck = 7.0,

        go_upside_score_mul = 0.07,
        go_upside_pi_mul = 0.030,
        go_upside_certain_combo = 0.35,
        go_upside_carry_mul = 0.10,
        go_risk_pressure_mul = 0.35,
        go_risk_one_away_mul = 0.28,
        go_risk_combo_threat_mul = 0.30,
        go_risk_go_count_mul = 0.06,
        go_risk_late_deck_bonus = 0.08,
        go_risk_second_mover_mul = 0.12,
        stop_lead_mul = 0.09,
        stop_carry_mul = 0.12,
        stop_ten_bonus = 0.20,
        go_utility_threshold = 0.10,

        bomb_min_pi_advantage = 1.0,
        bomb_combo_threat_block = 0.4,

        shaking_immediate_mul = 1.35,
        shaking_combo_mul = 1.15,
        shaking_trailing_bonus = 0.28,
        shaking_threshold = 0.65,
        shaking_ahead_penalty = 0.05,
    }
}
