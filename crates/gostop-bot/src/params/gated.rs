tunable_params! {
    /// Thresholds of the gated generation, which hands each decision to an
    /// attacking or a defending expert.
    pub struct GatedParams as "gated" {
        /// Score difference at or below which the defender plays.
        defense_score_threshold = -2.0,
        attack_score_threshold = 3.0,
        /// Risk points (bak exposure, opponent threat, carry-over) that force defense.
        risk_threshold = 1.0,
        opp_threat_threshold = 0.55,
        carry_over_risk = 3.0,
    }
}
