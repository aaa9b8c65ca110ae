tunable_params! {
    /// Constants of the phase-profile generation, including rollout blending.
    pub struct PhaseProfileParams as "phase_profile" {
        phase_early_deck = 13.0,
        phase_late_deck = 6.0,
        phase_end_deck = 4.0,

        attack_base = 1.0,
        defense_base = 1.0,
        risk_base = 1.0,
        tempo_base = 1.0,
        trailing_attack_boost = 0.008872760195410128,
        trailing_tempo_boost = 0.38505936587117007,
        leading_defense_boost = 0.292593042179272,
        leading_risk_boost = 0.2783896824374792,
        high_pressure_defense_boost = 0.16358117776570796,
        high_pressure_risk_boost = 0.06931772802833831,
        second_mover_tempo_boost = 0.08,

        no_match_base = -10.592066615960226,
        match_one_base = 5.501457388987572,
        match_two_base = 12.393813317648963,
        match_three_base = 17.145959227000624,
        capture_gain_mul = 1.4262171143895044,
        bright_capture_bonus = 6.0,
        five_capture_bonus = 4.4,
        ribbon_capture_bonus = 2.0,
        junk_pi_mul = 3.679603381675657,
        self_pi_window_mul = 2.3277844490611104,
        opp_pi_window_mul = 1.7806350667132298,
        double_pi_bonus = 5.0,
        double_pi_no_match_hold_penalty = 4.2,
        double_pi_month_pair_hold_penalty = 2.8,
        double_pi_month_triple_hold_penalty = 2.2,
        double_pi_pair_month_hold_penalty = 1.8,
        double_pi_month_anchor_hold_penalty = 2.0,
        /// Above this risk a held double junk is released more easily.
        double_pi_hold_risk_release = 8.5,
        double_pi_hold_risk_release_mul = 0.45,
        combo_opportunity_mul = 5.103301341324105,
        block_base = 6.893765969874818,
        block_urgency_mul = 1.4392001248555797,
        block_threat_mul = 1.8404701559048615,
        block_no_match_penalty = 4.8,
        first_turn_plan_bonus = 6.5,
        known_month_safe_bonus = 2.5,
        unknown_month_penalty = 1.8,
        trail_pi_tempo_mul = 1.8,
        lead_no_match_tempo_penalty = 2.2,
        endgame_safe_discard_bonus = 1.5,
        endgame_unknown_penalty = 2.2,
        bonus_card_use_base = 3.6,
        bonus_card_steal_pi_mul = 1.7,
        bonus_card_extra_turn_tempo = 1.2,
        bonus_card_early_hold_bias = 1.0,
        bonus_card_late_use_bonus = 1.4,
        bonus_card_hold_penalty_mul = 0.12,
        bonus_card_risk_mul = 0.18,
        bonus_card_opp_pi_empty_penalty = 0.6,

        feed_risk_no_match_mul = 3.8138224112332004,
        feed_risk_match_mul = 1.5641229988358645,
        danger_no_match_mul = 0.6561346056560479,
        danger_match_mul = 0.2625016967096827,
        release_risk_floor = 0.6,
        release_risk_mul = 2.552031704261033,
        puk_risk_mul = 1.2036440115948506,
        puk_opportunity_mul = 1.4,

        choose_match_base_mul = 1.0,
        choose_match_pi_mul = 5.0,
        choose_match_bright_bonus = 5.0,
        choose_match_five_bonus = 3.5,
        choose_match_ribbon_bonus = 1.8,
        choose_match_block_mul = 1.8,
        choose_match_combo_mul = 2.8,
        choose_match_opp_shake_month_bonus = 1.05,

        go_min_pi = 6.0,
        go_min_pi_desperate = 7.0,
        go_min_pi_second_trailing_delta = 2.0,
        go_hard_threat_cut = 1.0,
        go_hard_threat_deck_cut = 7.0,
        go_hard_opp_five_cut = 7.0,
        go_hard_opp_score_cut = 9.0,
        go_hard_late_one_away_cut = 70.0,
        go_hard_late_one_away_deck_cut = 8.0,
        go_hard_go_count_cap = 3.0,
        go_hard_go_count_threat_cut = 0.72,
        go_upside_score_mul = 0.13265527008132086,
        go_upside_pi_mul = 0.05925605015660167,
        go_upside_self_combo_mul = 0.44243820377938115,
        go_upside_one_away_mul = 0.12,
        go_upside_trail_bonus = 0.15,
        go_risk_pressure_mul = 0.17826732852080118,
        go_risk_one_away_mul = 0.01678201275303764,
        go_risk_opp_combo_mul = 0.31040947392931106,
        go_risk_opp_one_away_mul = 0.05117633658380274,
        go_risk_go_count_mul = 0.11,
        go_risk_late_deck_bonus = 0.12,
        stop_lead_mul = 0.06,
        stop_carry_mul = 0.10,
        stop_ten_bonus = 0.16,
        go_base_threshold = 0.030155494771391927,
        go_threshold_lead_up = 0.0797009468794747,
        go_threshold_trail_down = 0.1231700196104433,
        go_threshold_pressure_up = 0.12701873017352877,
        go_second_trail_bonus = 0.05,
        go_rally_pi_window_bonus = 0.02,
        go_rally_second_bonus = 0.01,
        go_rally_trail_bonus = 0.02,
        go_rally_end_deck_bonus = 0.0,
        go_soft_high_pi_threat_cap = 0.90,
        go_soft_high_pi_one_away_cap = 66.0,
        go_soft_high_pi_margin = 0.06,
        go_soft_trail_high_pi_margin = 0.04,
        go_soft_value_margin = 0.02,

        go_safe_stop_enabled = 1.0,
        go_safe_stop_min_score = 7.0,
        go_safe_stop_deck_cut = 7.0,
        go_safe_stop_lead_min = 2.0,
        go_lite_score_diff_mul = 0.04,
        go_lite_threat_penalty_mul = 0.05,
        go_lite_one_away_penalty_mul = 0.04,
        go_lite_late_penalty = 0.015,
        go_lite_opp_can_stop_penalty = 0.03,
        go_lite_self_can_stop_penalty = 0.01,
        go_lite_safe_attack_bonus = 0.06,
        go_lite_safe_attack_threat_cap = 0.58,
        go_lite_safe_attack_one_away_cap = 45.0,
        go_lite_safe_attack_deck_min = 5.0,

        /// Non-zero enables sampled look-ahead.
        rollout_enabled = 1.0,
        rollout_top_k = 3.0,
        rollout_max_steps = 28.0,
        rollout_samples = 5.0,
        rollout_card_weight = 1.2564898411883223,
        /// Bound on the card rollout delta before weighting.
        rollout_card_delta_cap = 3.0,
        rollout_go_weight = 1.3904323579427342,
        rollout_go_delta_cap = 0.3,
        rollout_selective_enabled = 1.0,
        rollout_card_score_gap = 1.25,
        rollout_card_threat_cut = 0.78,
        rollout_go_margin = 0.06,
        rollout_go_threat_cut = 0.72,
        rollout_go_one_away_cut = 60.0,

        bomb_immediate_mul = 0.9,
        bomb_board_gain_mul = 0.8,
        bomb_high_impact_bonus = 3.2,
        bomb_trail_bonus = 1.2,
        bomb_risk_mul = 1.0,
        bomb_threshold = 3.5,
        bomb_defense_threshold = 5.0,

        shake_immediate_mul = 0.7770168166124757,
        shake_combo_mul = 1.1244576604770598,
        shake_impact_bonus = 0.7,
        shake_pi_line_bonus = 0.45,
        shake_direct_bright_bonus = 0.45,
        shake_known_low_bonus = 0.25,
        shake_known_high_penalty = 0.2,
        shake_risk_mul = 0.8136178904285073,
        shake_trailing_bonus = 0.22,
        shake_first_plan_bonus = 0.28,
        shake_threshold = 0.7025090068640703,
        shake_lead_threshold_up = 0.18,
        shake_pressure_threshold_up = 0.15,

        opp_shake_recent_window = 8.0,
        opp_shake_block_bonus = 1.15,
        opp_shake_no_match_risk_bonus = 0.45,

        president_stop_lead = 3.0,
        president_carry_stop_max = 1.0,
        gukjin_score_diff_mul = 1.0,
        gukjin_pi_diff_mul = 0.22,
        gukjin_mong_bak_bonus = 1.8,
        gukjin_mong_risk_penalty = 2.2,
    }
}

impl PhaseProfileParams {
    /// Same constants with rollouts switched off, for nested simulation.
    pub fn without_rollout(mut self) -> Self {
        self.rollout_enabled = 0.0;
        self
    }

    pub fn rollout_active(&self) -> bool {
        self.rollout_enabled > 0.0
    }
}
