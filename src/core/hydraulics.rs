//! Field capacity and wilting point from texture, bulk density and organic carbon.
//!
//! Ad-hoc van Genuchten style pedotransfer function (shape parameters after
//! Woesten et al. 1999) evaluated at pF 2 (field capacity, 100 cm) and pF 4.2
//! (wilting point, 15800 cm). Inputs are fractions and g cm-3, percentages are used
//! internally.
use tracing::warn;

use crate::core::layer::LayerRecord;
use crate::error::{Error, Result};

/// Volumetric water contents derived for one layer [m3 m-3]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HydraulicProperties {
    pub field_capacity: f64,
    pub wilting_point: f64,
}

/// Gap kept between field capacity and a corrected wilting point [m3 m-3]
const CORRECTION_GAP: f64 = 0.01;

/// Raw pedotransfer evaluation, without consistency checks
pub fn pedotransfer(sand: f64, clay: f64, corg: f64, bd: f64) -> HydraulicProperties {
    let corg = corg * 100.0;
    let clay = clay * 100.0;
    let sand = sand * 100.0;

    let theta_r = 0.015 + 0.005 * clay + 0.014 * corg;
    let theta_s = 0.81 - 0.283 * bd + 0.001 * clay;

    let log_alpha = -2.486 + 0.025 * sand - 0.351 * corg - 2.617 * bd - 0.023 * clay;
    let log_n = 0.053 - 0.009 * sand - 0.013 * clay + 0.00015 * sand.powi(2);

    let alpha = log_alpha.exp();
    let n = log_n.exp();
    // texture classes are not used, m fixed to 1
    let m = 1.0;

    let retention = |head: f64| theta_r + (theta_s - theta_r) / (1.0 + (alpha * head).powf(n)).powf(m);
    HydraulicProperties {
        field_capacity: retention(100.0),
        wilting_point: retention(15800.0),
    }
}

/// Hydraulic properties of mineral layers; litter layers pass through unchanged
pub fn apply_hydraulic_properties(layer: LayerRecord) -> Result<LayerRecord> {
    if layer.litter {
        return Ok(layer);
    }
    calc_hydraulic_properties(layer)
}

/// Derive `wcmax`/`wcmin` for a layer.
///
/// Fails with `ParameterMissing` if corg, clay, sand or bd is absent. A field
/// capacity below the wilting point is corrected to `wilting_point = field_capacity - 0.01`
/// with a warning.
pub fn calc_hydraulic_properties(mut layer: LayerRecord) -> Result<LayerRecord> {
    let inputs = [
        ("corg", layer.corg),
        ("clay", layer.clay),
        ("sand", layer.sand),
        ("bd", layer.bd),
    ];
    let missing: Vec<&str> = inputs
        .iter()
        .filter(|(_, v)| !matches!(v, Some(x) if x.is_finite()))
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(Error::ParameterMissing {
            params: missing.join(", "),
        });
    }
    let [corg, clay, sand, bd] = inputs.map(|(_, v)| v.unwrap_or(f64::NAN));

    let mut props = pedotransfer(sand, clay, corg, bd);
    if props.field_capacity < props.wilting_point {
        warn!(
            "Field capacity {:.4} below wilting point {:.4} (sand={sand}, clay={clay}, corg={corg}, bd={bd}), lowering wilting point",
            props.field_capacity, props.wilting_point
        );
        props.wilting_point = props.field_capacity - CORRECTION_GAP;
    }

    layer.wcmax = Some(props.field_capacity * 1000.0);
    layer.wcmin = Some(props.wilting_point * 1000.0);
    Ok(layer)
}
