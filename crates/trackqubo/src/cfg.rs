//! Model configuration: physics cuts, QUBO shape, and strategy selection.
//!
//! Policy
//! - `Config` is an immutable value threaded through the builder, the pruning
//!   pass, and the encoder. Nothing mutates it once a build starts.
//! - Defaults are the "1 GeV" cuts. `Config::preset` reproduces the named model
//!   variants (base, mp, dj, d0, all).
//! - `set(key, value)` supports `key=value` overrides from the CLI; `validate`
//!   must pass before any graph work.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::prune::Pruning;
use crate::weight::{ImpactCfg, Weighting};

/// Full model configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Max |transverse curvature| (1/mm) of a triplet.
    pub tplet_max_curv: f64,
    /// Max rz-angle bend (rad) between the two doublets of a triplet.
    pub tplet_max_drz: f64,
    /// Max curvature difference between the two triplets of a quadruplet.
    pub qplet_max_dcurv: f64,
    /// Quadruplets with a strength above this (i.e. weaker reward) are rejected.
    pub qplet_max_strength: f64,
    pub xy_power: f64,
    /// Share of the xy term in the coupling strength, in [0, 1].
    pub xy_relative_strength: f64,
    pub rz_power: f64,
    pub volayer_power: f64,
    /// Sign/scale of inclusion couplers; negative rewards chained triplets.
    pub num_multiplier: f64,
    /// Penalty of exclusion couplers (types 1 and 2).
    pub conflict_strength: f64,
    pub pruning: Pruning,
    pub weighting: Weighting,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tplet_max_curv: 8e-4,
            tplet_max_drz: 0.1,
            qplet_max_dcurv: 1e-4,
            qplet_max_strength: -0.2,
            xy_power: 1.0,
            xy_relative_strength: 0.5,
            rz_power: 1.0,
            volayer_power: 2.0,
            num_multiplier: -1.0,
            conflict_strength: 1.0,
            pruning: Pruning::None,
            weighting: Weighting::Constant { bias_weight: 0.0 },
        }
    }
}

impl Config {
    /// Named model variants.
    ///
    /// - `base`: full graph, constant bias.
    /// - `mp`: MaxPath filter (`min_qplet_path = 2`).
    /// - `dj`: disjoint-set filter.
    /// - `d0`: MaxPath filter + impact-parameter bias.
    /// - `all`: disjoint-set filter + max-path bias, softer conflicts.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let base = Self::default();
        let cfg = match name {
            "base" => base,
            "mp" => Self {
                pruning: Pruning::MaxPath { min_qplet_path: 2 },
                ..base
            },
            "dj" => Self {
                pruning: Pruning::DisjointSets,
                ..base
            },
            "d0" => Self {
                pruning: Pruning::MaxPath { min_qplet_path: 2 },
                weighting: Weighting::ImpactParameter(ImpactCfg::default()),
                ..base
            },
            "all" => Self {
                pruning: Pruning::DisjointSets,
                weighting: Weighting::MaxPath {
                    bias_power: 2.0,
                    bias_denom: -500.0,
                },
                conflict_strength: 0.8,
                ..base
            },
            other => return Err(ConfigError::UnknownPreset(other.to_string())),
        };
        Ok(cfg)
    }

    /// Apply one `key=value` override.
    ///
    /// Strategy keys (`pruning`, `weighting`) switch the variant and reset its
    /// parameters to defaults; parameter keys only apply to the active variant.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let num = || parse_f64(key, value);
        match key {
            "tplet_max_curv" => self.tplet_max_curv = num()?,
            "tplet_max_drz" => self.tplet_max_drz = num()?,
            "qplet_max_dcurv" => self.qplet_max_dcurv = num()?,
            "qplet_max_strength" => self.qplet_max_strength = num()?,
            "xy_power" => self.xy_power = num()?,
            "xy_relative_strength" => self.xy_relative_strength = num()?,
            "rz_power" => self.rz_power = num()?,
            "volayer_power" => self.volayer_power = num()?,
            "num_multiplier" => self.num_multiplier = num()?,
            "conflict_strength" => self.conflict_strength = num()?,
            "pruning" => {
                self.pruning = match value.trim() {
                    "none" => Pruning::None,
                    "max_path" | "mp" => Pruning::MaxPath { min_qplet_path: 2 },
                    "disjoint_sets" | "dj" => Pruning::DisjointSets,
                    _ => return Err(unparsable(key, value)),
                }
            }
            "weighting" => {
                self.weighting = match value.trim() {
                    "constant" => Weighting::Constant { bias_weight: 0.0 },
                    "max_path" => Weighting::MaxPath {
                        bias_power: 2.0,
                        bias_denom: -100.0,
                    },
                    "impact" | "d0" => Weighting::ImpactParameter(ImpactCfg::default()),
                    _ => return Err(unparsable(key, value)),
                }
            }
            "min_qplet_path" => match &mut self.pruning {
                Pruning::MaxPath { min_qplet_path } => {
                    *min_qplet_path = value
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| unparsable(key, value))?
                }
                _ => return Err(inactive(key)),
            },
            _ => self.weighting.set(key, value)?,
        }
        Ok(())
    }

    /// Check every parameter before the build starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("tplet_max_curv", self.tplet_max_curv)?;
        positive("tplet_max_drz", self.tplet_max_drz)?;
        positive("qplet_max_dcurv", self.qplet_max_dcurv)?;
        finite("qplet_max_strength", self.qplet_max_strength)?;
        positive("xy_power", self.xy_power)?;
        positive("rz_power", self.rz_power)?;
        finite("volayer_power", self.volayer_power)?;
        finite("num_multiplier", self.num_multiplier)?;
        finite("conflict_strength", self.conflict_strength)?;
        if !(0.0..=1.0).contains(&self.xy_relative_strength) {
            return Err(ConfigError::OutOfRange {
                key: "xy_relative_strength",
                value: self.xy_relative_strength,
                reason: "must lie in [0, 1]",
            });
        }
        if let Pruning::MaxPath { min_qplet_path } = self.pruning {
            if min_qplet_path == 0 {
                return Err(ConfigError::OutOfRange {
                    key: "min_qplet_path",
                    value: 0.0,
                    reason: "path lengths start at 1",
                });
            }
        }
        self.weighting.validate()
    }
}

pub(crate) fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| unparsable(key, value))
}

pub(crate) fn unparsable(key: &str, value: &str) -> ConfigError {
    ConfigError::Unparsable {
        key: key.to_string(),
        value: value.to_string(),
    }
}

pub(crate) fn inactive(key: &str) -> ConfigError {
    ConfigError::Inactive(key.to_string())
}

pub(crate) fn finite(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value,
            reason: "must be finite",
        })
    }
}

pub(crate) fn positive(key: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(key, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value,
            reason: "must be > 0",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        for name in ["base", "mp", "dj", "d0", "all"] {
            let cfg = Config::preset(name).unwrap();
            assert!(cfg.validate().is_ok(), "preset {name}");
        }
        assert!(matches!(
            Config::preset("nope"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }

    #[test]
    fn set_overrides_and_rejects() {
        let mut cfg = Config::preset("mp").unwrap();
        cfg.set("min_qplet_path", "3").unwrap();
        assert_eq!(cfg.pruning, Pruning::MaxPath { min_qplet_path: 3 });
        cfg.set("conflict_strength", "0.5").unwrap();
        assert_eq!(cfg.conflict_strength, 0.5);

        assert!(matches!(
            cfg.set("does_not_exist", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("tplet_max_curv", "abc"),
            Err(ConfigError::Unparsable { .. })
        ));
        // d0 parameters belong to the impact-parameter weighting only.
        assert!(matches!(
            cfg.set("d0_denom", "2"),
            Err(ConfigError::Inactive(_))
        ));
        cfg.set("weighting", "impact").unwrap();
        cfg.set("d0_denom", "2").unwrap();
        match &cfg.weighting {
            Weighting::ImpactParameter(ic) => assert_eq!(ic.d0_denom, 2.0),
            other => panic!("unexpected weighting {other:?}"),
        }
    }

    #[test]
    fn validate_catches_out_of_range() {
        let mut cfg = Config::default();
        cfg.xy_relative_strength = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.qplet_max_dcurv = 0.0;
        assert!(cfg.validate().is_err());

        for key in ["xy_power", "rz_power"] {
            for value in ["0", "-1"] {
                let mut cfg = Config::default();
                cfg.set(key, value).unwrap();
                assert!(
                    matches!(cfg.validate(), Err(ConfigError::OutOfRange { key: k, .. }) if k == key),
                    "{key} = {value}"
                );
            }
        }

        let mut cfg = Config::preset("mp").unwrap();
        cfg.pruning = Pruning::MaxPath { min_qplet_path: 0 };
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.weighting = Weighting::MaxPath {
            bias_power: 2.0,
            bias_denom: 0.0,
        };
        assert!(cfg.validate().is_err());
    }
}
