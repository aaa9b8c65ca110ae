//! Tunable constants for each policy generation.
//!
//! Every set is a plain struct of `f64` fields with defaults. Overrides come
//! in as `(key, value)` pairs (a YAML or JSON map in practice) and are
//! validated once: unknown keys and non-finite values are rejected, missing
//! keys keep their default.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("unknown {set} parameter `{key}`")]
    UnknownKey { set: &'static str, key: String },
    #[error("{set} parameter `{key}` must be finite, got {value}")]
    NonFinite {
        set: &'static str,
        key: String,
        value: f64,
    },
    #[error("failed to parse parameter overrides: {0}")]
    Parse(String),
}

/// Declares a parameter set: the struct, its defaults, and keyed overrides.
macro_rules! tunable_params {
    (
        $(#[$meta:meta])*
        pub struct $name:ident as $label:literal {
            $(
                $(#[$field_meta:meta])*
                $field:ident = $default:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: f64,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default,)*
                }
            }
        }

        impl $name {
            pub const LABEL: &'static str = $label;

            pub fn keys() -> &'static [&'static str] {
                &[$(stringify!($field)),*]
            }

            pub fn set(&mut self, key: &str, value: f64) -> Result<(), $crate::params::ParamError> {
                if !value.is_finite() {
                    return Err($crate::params::ParamError::NonFinite {
                        set: $label,
                        key: key.to_string(),
                        value,
                    });
                }
                match key {
                    $(stringify!($field) => self.$field = value,)*
                    _ => {
                        return Err($crate::params::ParamError::UnknownKey {
                            set: $label,
                            key: key.to_string(),
                        })
                    }
                }
                Ok(())
            }

            pub fn from_overrides<I, K>(overrides: I) -> Result<Self, $crate::params::ParamError>
            where
                I: IntoIterator<Item = (K, f64)>,
                K: AsRef<str>,
            {
                let mut params = Self::default();
                for (key, value) in overrides {
                    params.set(key.as_ref(), value)?;
                }
                Ok(params)
            }

            /// Overrides from a flat JSON object of numbers.
            pub fn from_json(raw: &str) -> Result<Self, $crate::params::ParamError> {
                let map: std::collections::BTreeMap<String, f64> = serde_json::from_str(raw)
                    .map_err(|err| $crate::params::ParamError::Parse(err.to_string()))?;
                Self::from_overrides(map)
            }
        }
    };
}

mod gated;
mod gold_pressure;
mod phase_profile;
mod phase_weighted;
mod weighted;

pub use gated::GatedParams;
pub use gold_pressure::GoldPressureParams;
pub use phase_profile::PhaseProfileParams;
pub use phase_weighted::PhaseWeightedParams;
pub use weighted::WeightedParams;

#[cfg(test)]
mod tests {
    use super::{
        GatedParams, GoldPressureParams, ParamError, PhaseProfileParams, PhaseWeightedParams,
        WeightedParams,
    };

    #[test]
    fn missing_keys_keep_defaults() {
        let params = PhaseProfileParams::from_overrides([("rollout_samples", 9.0)]).unwrap();
        assert_eq!(params.rollout_samples, 9.0);
        assert_eq!(params.rollout_top_k, PhaseProfileParams::default().rollout_top_k);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = WeightedParams::from_overrides([("kwang_weight_typo", 1.0)]).unwrap_err();
        assert!(matches!(err, ParamError::UnknownKey { set: "weighted", .. }));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let err = GoldPressureParams::from_overrides([("deny_bonus", f64::NAN)]).unwrap_err();
        assert!(matches!(err, ParamError::NonFinite { .. }));
        let err = GoldPressureParams::from_overrides([("deny_bonus", f64::INFINITY)]).unwrap_err();
        assert!(matches!(err, ParamError::NonFinite { .. }));
    }

    #[test]
    fn json_overrides_parse() {
        let params = WeightedParams::from_json(r#"{"go_base_threshold": 0.4}"#).unwrap();
        assert_eq!(params.go_base_threshold, 0.4);
        assert!(matches!(
            WeightedParams::from_json("[1, 2]"),
            Err(ParamError::Parse(_))
        ));
    }

    #[test]
    fn every_key_is_settable() {
        for key in PhaseProfileParams::keys() {
            let mut params = PhaseProfileParams::default();
            params.set(key, 1.5).unwrap();
        }
        assert!(GoldPressureParams::keys().contains(&"stop_lead_threshold"));
    }

    #[test]
    fn gate_and_phase_weighted_sets_carry_their_labels() {
        let gate = GatedParams::from_overrides([("risk_threshold", 2.0)]).unwrap();
        assert_eq!(gate.risk_threshold, 2.0);
        assert_eq!(gate.attack_score_threshold, 3.0);
        let err = PhaseWeightedParams::from_overrides([("risk_threshold", 2.0)]).unwrap_err();
        assert!(matches!(err, ParamError::UnknownKey { set: "phase_weighted", .. }));
    }
}
