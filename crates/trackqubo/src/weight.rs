//! Per-triplet bias weights (QUBO diagonal).
//!
//! - `Constant`: one bias for every triplet.
//! - `MaxPath`: `path^bias_power / bias_denom`, where `path` is the longest
//!   chain of triplets through the triplet. With a negative denominator long
//!   chains get a larger reward.
//! - `ImpactParameter`: penalty growing with the transverse (`d0`) and
//!   longitudinal (`z0`) distance of the triplet's extrapolation to the
//!   luminous region.
//!
//! Weights are returned in a `WeightTable` indexed by triplet id; the graph
//! itself stays frozen.

use serde::{Deserialize, Serialize};

use crate::cfg::{finite, inactive, parse_f64, positive, unparsable};
use crate::error::ConfigError;
use crate::geom::{circle_through, Circle};
use crate::graph::{ChainLengths, Graph, Triplet};

/// Impact-parameter weighting parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactCfg {
    pub d0_denom: f64,
    pub d0_factor: f64,
    pub z0_denom: f64,
    pub z0_factor: f64,
    /// Half-length (mm) of the luminous region along z.
    pub beamspot_width: f64,
    pub beamspot_center: [f64; 3],
    /// Weight used when the circle fit is undefined (collinear triplet).
    pub fallback_weight: f64,
}

impl Default for ImpactCfg {
    fn default() -> Self {
        Self {
            d0_denom: 3.0,
            d0_factor: 0.5,
            z0_denom: 1.0,
            z0_factor: 0.1,
            beamspot_width: 55.0 / 2.0,
            beamspot_center: [0.0, 0.0, 0.0],
            fallback_weight: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Weighting {
    Constant { bias_weight: f64 },
    MaxPath { bias_power: f64, bias_denom: f64 },
    ImpactParameter(ImpactCfg),
}

/// Impact parameters of one triplet.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ImpactParams {
    pub circle: Circle,
    pub d0: f64,
    pub z0: f64,
}

/// Output of `Weighting::compute_weights`, indexed by triplet id.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WeightTable {
    pub weights: Vec<f64>,
    /// Filled for the impact-parameter weighting; `None` where the fit failed.
    pub impact: Vec<Option<ImpactParams>>,
    /// Filled for the max-path weighting.
    pub paths: Vec<usize>,
    /// Triplets that received the fallback weight.
    pub n_fallback: usize,
}

impl Weighting {
    pub fn compute_weights(&self, graph: &Graph) -> WeightTable {
        let mut table = WeightTable::default();
        match self {
            Weighting::Constant { bias_weight } => {
                table.weights = vec![*bias_weight; graph.triplets.len()];
            }
            Weighting::MaxPath {
                bias_power,
                bias_denom,
            } => {
                let chains = ChainLengths::compute(graph);
                table.paths = (0..graph.triplets.len())
                    .map(|t| chains.inner[t] + chains.outer[t] - 1)
                    .collect();
                table.weights = table
                    .paths
                    .iter()
                    .map(|&p| (p as f64).powf(*bias_power) / bias_denom)
                    .collect();
                if let Some(longest) = table.paths.iter().max() {
                    tracing::debug!(longest, "max-path weights computed");
                }
            }
            Weighting::ImpactParameter(ic) => {
                table.weights.reserve(graph.triplets.len());
                table.impact.reserve(graph.triplets.len());
                for t in &graph.triplets {
                    let params = impact_params(graph, t, ic);
                    let w = params.map(|p| {
                        ic.d0_factor * (1.0 - (-p.d0.abs() / ic.d0_denom).exp())
                            + ic.z0_factor * (1.0 - (-p.z0 / ic.z0_denom).exp())
                    });
                    match w {
                        Some(w) if w.is_finite() => table.weights.push(w),
                        _ => {
                            tracing::warn!(triplet = %t.key, "impact fit failed, using fallback weight");
                            table.n_fallback += 1;
                            table.weights.push(ic.fallback_weight);
                        }
                    }
                    table.impact.push(params);
                }
                if table.n_fallback > 0 {
                    tracing::info!(n_fallback = table.n_fallback, "fallback weights applied");
                }
            }
        }
        table
    }

    /// Set one weighting parameter. Keys of another variant are `Inactive`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match (self, key) {
            (Weighting::Constant { bias_weight }, "bias_weight") => {
                *bias_weight = parse_f64(key, value)?
            }
            (Weighting::MaxPath { bias_power, .. }, "bias_power") => {
                *bias_power = parse_f64(key, value)?
            }
            (Weighting::MaxPath { bias_denom, .. }, "bias_denom") => {
                *bias_denom = parse_f64(key, value)?
            }
            (Weighting::ImpactParameter(ic), _) if ImpactCfg::KEYS.contains(&key) => {
                ic.set(key, value)?
            }
            (_, k) if Self::KEYS.contains(&k) || ImpactCfg::KEYS.contains(&k) => {
                return Err(inactive(k))
            }
            (_, k) => return Err(ConfigError::UnknownKey(k.to_string())),
        }
        Ok(())
    }

    const KEYS: [&'static str; 3] = ["bias_weight", "bias_power", "bias_denom"];

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Weighting::Constant { bias_weight } => finite("bias_weight", *bias_weight),
            Weighting::MaxPath {
                bias_power,
                bias_denom,
            } => {
                finite("bias_power", *bias_power)?;
                finite("bias_denom", *bias_denom)?;
                if *bias_denom == 0.0 {
                    return Err(ConfigError::OutOfRange {
                        key: "bias_denom",
                        value: 0.0,
                        reason: "must be non-zero",
                    });
                }
                Ok(())
            }
            Weighting::ImpactParameter(ic) => {
                positive("d0_denom", ic.d0_denom)?;
                positive("z0_denom", ic.z0_denom)?;
                finite("d0_factor", ic.d0_factor)?;
                finite("z0_factor", ic.z0_factor)?;
                finite("beamspot_width", ic.beamspot_width)?;
                if ic.beamspot_width < 0.0 {
                    return Err(ConfigError::OutOfRange {
                        key: "beamspot_width",
                        value: ic.beamspot_width,
                        reason: "must be >= 0",
                    });
                }
                for c in ic.beamspot_center {
                    finite("beamspot_center", c)?;
                }
                finite("fallback_weight", ic.fallback_weight)
            }
        }
    }
}

impl ImpactCfg {
    const KEYS: [&'static str; 7] = [
        "d0_denom",
        "d0_factor",
        "z0_denom",
        "z0_factor",
        "beamspot_width",
        "beamspot_center",
        "fallback_weight",
    ];

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "d0_denom" => self.d0_denom = parse_f64(key, value)?,
            "d0_factor" => self.d0_factor = parse_f64(key, value)?,
            "z0_denom" => self.z0_denom = parse_f64(key, value)?,
            "z0_factor" => self.z0_factor = parse_f64(key, value)?,
            "beamspot_width" => self.beamspot_width = parse_f64(key, value)?,
            "fallback_weight" => self.fallback_weight = parse_f64(key, value)?,
            "beamspot_center" => {
                let parts: Vec<&str> = value.split(',').collect();
                let [x, y, z] = parts.as_slice() else {
                    return Err(unparsable(key, value));
                };
                self.beamspot_center = [
                    parse_f64(key, x)?,
                    parse_f64(key, y)?,
                    parse_f64(key, z)?,
                ];
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

/// Circle through the triplet's transverse points, `d0` to the beamspot, and
/// `z0` from the first doublet's slope projected at the second doublet's hits.
fn impact_params(graph: &Graph, t: &Triplet, ic: &ImpactCfg) -> Option<ImpactParams> {
    let [h0, h1, h2] = t.hits.map(|h| graph.hit(h));
    let circle = circle_through(h0.hit.coord_2d(), h1.hit.coord_2d(), h2.hit.coord_2d())?;
    let [ox, oy, oz] = ic.beamspot_center;
    let d0 = (circle.center[0] - ox).hypot(circle.center[1] - oy) - circle.radius;

    let d1 = graph.doublet(t.doublets[0]);
    let slope = d1.dz / d1.dr;
    let z0_1 = ((h1.hit.z - oz) - slope * h1.r).abs();
    let z0_2 = ((h2.hit.z - oz) - slope * h2.r).abs();
    let outside = z0_1.max(z0_2).max(ic.beamspot_width) - ic.beamspot_width;
    let z0 = (outside * d1.rz_angle.sin()).abs();
    if !(d0.is_finite() && z0.is_finite()) {
        return None;
    }
    Some(ImpactParams { circle, d0, z0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::Config;
    use crate::graph::{build_graph, Hit};

    fn build(hits: &[Hit], doublets: &[(u64, u64)]) -> Graph {
        build_graph(hits, doublets, &Config::default()).unwrap().0
    }

    #[test]
    fn constant_weights_cover_every_triplet() {
        let hits = [
            Hit::new(1, 30.0, 0.0, 10.0),
            Hit::new(2, 70.0, 1.0, 20.0),
            Hit::new(3, 110.0, 3.0, 30.0),
        ];
        let g = build(&hits, &[(1, 2), (2, 3)]);
        let table = Weighting::Constant { bias_weight: 0.25 }.compute_weights(&g);
        assert_eq!(table.weights, vec![0.25]);
        assert!(table.impact.is_empty() && table.paths.is_empty());
    }

    #[test]
    fn max_path_weights_follow_chain_length() {
        let hits: Vec<Hit> = (0..5)
            .map(|k| Hit::new(k, 40.0 + 50.0 * k as f64, 0.0, 10.0 * k as f64))
            .collect();
        let doublets: Vec<(u64, u64)> = (0..4).map(|k| (k, k + 1)).collect();
        let g = build(&hits, &doublets);
        assert_eq!(g.triplets.len(), 3);
        let table = Weighting::MaxPath {
            bias_power: 2.0,
            bias_denom: -100.0,
        }
        .compute_weights(&g);
        assert_eq!(table.paths, vec![3, 3, 3]);
        for w in table.weights {
            assert!((w + 0.09).abs() < 1e-12);
        }
    }

    #[test]
    fn impact_parameter_is_small_for_tracks_from_origin_and_falls_back_when_collinear() {
        // Circle of radius 5000 through the origin, z = 0.3·r.
        let big_r = 5000.0_f64;
        let pt = |id: u64, r: f64| {
            let a = 2.0 * (r / (2.0 * big_r)).asin();
            Hit::new(
                id,
                big_r - big_r * a.cos(),
                big_r * a.sin(),
                0.3 * r,
            )
        };
        let hits = [pt(1, 30.0), pt(2, 70.0), pt(3, 110.0)];
        let g = build(&hits, &[(1, 2), (2, 3)]);
        let ic = ImpactCfg::default();
        let table = Weighting::ImpactParameter(ic.clone()).compute_weights(&g);
        let p = table.impact[0].unwrap();
        assert!(p.d0.abs() < 1e-6, "d0 = {}", p.d0);
        assert!(p.z0.abs() < 1e-9);
        assert!(table.weights[0].abs() < 1e-6);
        assert_eq!(table.n_fallback, 0);

        // Straight line offset from the origin: collinear, no circle.
        let line = [
            Hit::new(1, 30.0, 5.0, 0.0),
            Hit::new(2, 70.0, 5.0, 0.0),
            Hit::new(3, 110.0, 5.0, 0.0),
        ];
        let g = build(&line, &[(1, 2), (2, 3)]);
        let ic = ImpactCfg {
            fallback_weight: 0.7,
            ..ImpactCfg::default()
        };
        let table = Weighting::ImpactParameter(ic).compute_weights(&g);
        assert_eq!(table.weights, vec![0.7]);
        assert_eq!(table.impact, vec![None]);
        assert_eq!(table.n_fallback, 1);
    }

    #[test]
    fn beamspot_center_shifts_d0_and_z0() {
        // Circle of radius 5000 centered at (5000, 0), through the origin; z = 0.3·r.
        let big_r = 5000.0_f64;
        let pt = |id: u64, r: f64| {
            let a = 2.0 * (r / (2.0 * big_r)).asin();
            Hit::new(id, big_r - big_r * a.cos(), big_r * a.sin(), 0.3 * r)
        };
        let hits = [pt(1, 30.0), pt(2, 70.0), pt(3, 110.0)];
        let g = build(&hits, &[(1, 2), (2, 3)]);
        let impact_with = |center: [f64; 3]| {
            let ic = ImpactCfg {
                beamspot_center: center,
                ..ImpactCfg::default()
            };
            Weighting::ImpactParameter(ic).compute_weights(&g).impact[0].unwrap()
        };

        // Moving the beamspot to the circle center: d0 = -R.
        let p = impact_with([big_r, 0.0, 0.0]);
        assert!((p.d0 + big_r).abs() < 1e-3, "d0 = {}", p.d0);
        // Moving it 2R away along x: d0 = +R.
        let p = impact_with([3.0 * big_r, 0.0, 0.0]);
        assert!((p.d0 - big_r).abs() < 1e-3, "d0 = {}", p.d0);
        assert!(p.z0.abs() < 1e-9);

        // Shifting along z by 40 puts both projections 40 from the center,
        // 12.5 outside the luminous half-width of 27.5.
        let p = impact_with([0.0, 0.0, 40.0]);
        assert!(p.d0.abs() < 1e-6, "d0 = {}", p.d0);
        let expected = 12.5 / 1.09_f64.sqrt();
        assert!((p.z0 - expected).abs() < 1e-9, "z0 = {}", p.z0);
    }

    #[test]
    fn set_routes_keys_to_the_active_variant() {
        let mut w = Weighting::ImpactParameter(ImpactCfg::default());
        w.set("beamspot_center", "1, 2,3").unwrap();
        w.set("z0_factor", "0.4").unwrap();
        match &w {
            Weighting::ImpactParameter(ic) => {
                assert_eq!(ic.beamspot_center, [1.0, 2.0, 3.0]);
                assert_eq!(ic.z0_factor, 0.4);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            w.set("beamspot_center", "1,2"),
            Err(ConfigError::Unparsable { .. })
        ));
        assert!(matches!(w.set("bias_power", "2"), Err(ConfigError::Inactive(_))));
        assert!(matches!(w.set("nope", "2"), Err(ConfigError::UnknownKey(_))));
    }
}
