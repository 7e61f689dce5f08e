//! One soil layer of a site record and the layer-level policies: texture
//! correction, default split factors, depth translation and the top-layer split.
use tracing::warn;

use crate::core::schema::AttributeSchema;
use crate::core::units::{self, Unit};
use crate::error::{Error, Result};
use crate::types::NODATA;

/// Serialised layer attributes, in output order
pub const LAYER_FIELDS: [&str; 14] = [
    "depth", "split", "ph", "scel", "bd", "sks", "norg", "corg", "clay", "wcmin", "wcmax", "sand",
    "silt", "iron",
];

/// Default iron fraction applied to every layer
pub const DEFAULT_IRON: f64 = 0.01;

/// Depth of the fine layer created by the top-layer split [mm]
pub const EXTRA_SPLIT_DEPTH: f64 = 20.0;

/// Minimum top-layer depth for the split [mm]
pub const MIN_SPLIT_DEPTH: f64 = 40.0;

const EXTRA_SPLIT_FINE: u32 = 4;
const EXTRA_SPLIT_COARSE: u32 = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct LayerRecord {
    /// Layer thickness [mm]
    pub depth: Option<f64>,
    /// Number of model sub-layers
    pub split: u32,
    pub ph: Option<f64>,
    pub scel: Option<f64>,
    pub bd: Option<f64>,
    pub sks: Option<f64>,
    pub norg: Option<f64>,
    pub corg: Option<f64>,
    pub clay: Option<f64>,
    pub wcmin: Option<f64>,
    pub wcmax: Option<f64>,
    pub sand: Option<f64>,
    pub silt: Option<f64>,
    pub iron: Option<f64>,
    /// Top depth in source units, only used while translating
    pub topd: Option<f64>,
    /// Bottom depth in source units, only used while translating
    pub botd: Option<f64>,
    /// Organic litter layers skip the hydraulic model
    pub litter: bool,
}

impl Default for LayerRecord {
    fn default() -> Self {
        Self {
            depth: None,
            split: 1,
            ph: None,
            scel: None,
            bd: None,
            sks: None,
            norg: None,
            corg: None,
            clay: None,
            wcmin: None,
            wcmax: None,
            sand: None,
            silt: None,
            iron: None,
            topd: None,
            botd: None,
            litter: false,
        }
    }
}

impl LayerRecord {
    /// Build a layer from `(target name, value)` pairs
    pub fn from_values<'a, I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut layer = LayerRecord::default();
        for (name, value) in values {
            layer.set(name, value)?;
        }
        Ok(layer)
    }

    fn slot(&mut self, name: &str) -> Option<&mut Option<f64>> {
        let slot = match name {
            "depth" => &mut self.depth,
            "ph" => &mut self.ph,
            "scel" => &mut self.scel,
            "bd" => &mut self.bd,
            "sks" => &mut self.sks,
            "norg" => &mut self.norg,
            "corg" => &mut self.corg,
            "clay" => &mut self.clay,
            "wcmin" => &mut self.wcmin,
            "wcmax" => &mut self.wcmax,
            "sand" => &mut self.sand,
            "silt" => &mut self.silt,
            "iron" => &mut self.iron,
            "topd" => &mut self.topd,
            "botd" => &mut self.botd,
            _ => return None,
        };
        Some(slot)
    }

    /// Set an attribute by target name. NaN clears the value.
    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        if name == "split" {
            self.split = if value.is_finite() && value >= 0.0 {
                value.round() as u32
            } else {
                0
            };
            return Ok(());
        }
        let slot = self.slot(name).ok_or_else(|| Error::UnknownAttribute {
            name: name.to_string(),
        })?;
        *slot = value.is_finite().then_some(value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "depth" => self.depth,
            "split" => Some(f64::from(self.split)),
            "ph" => self.ph,
            "scel" => self.scel,
            "bd" => self.bd,
            "sks" => self.sks,
            "norg" => self.norg,
            "corg" => self.corg,
            "clay" => self.clay,
            "wcmin" => self.wcmin,
            "wcmax" => self.wcmax,
            "sand" => self.sand,
            "silt" => self.silt,
            "iron" => self.iron,
            "topd" => self.topd,
            "botd" => self.botd,
            _ => None,
        }
    }

    /// Output attributes with their schema precision. Absent values become `-99.99`;
    /// the transient depth fields are never part of the output.
    pub fn attributes(&self, schema: &AttributeSchema) -> Vec<(&'static str, String)> {
        LAYER_FIELDS
            .iter()
            .map(|&name| {
                let text = match self.get(name) {
                    Some(v) if v.is_finite() => format!("{:.*}", schema.precision(name), v),
                    _ => format!("{NODATA}"),
                };
                (name, text)
            })
            .collect()
    }

    /// Thickness from the transient top/bottom depths (cm), stored in mm
    pub fn apply_depth(&mut self) -> Result<()> {
        if let (Some(top), Some(bottom)) = (self.topd, self.botd) {
            if top >= 0.0 {
                self.depth = Some(units::convert(bottom - top, Unit::Centimeter, Unit::Millimeter)?);
            }
        }
        Ok(())
    }

    /// Rescale clay, sand and silt when their sum exceeds one. Returns whether the
    /// layer was changed.
    pub fn normalize_texture(&mut self) -> bool {
        let (Some(clay), Some(sand), Some(silt)) = (self.clay, self.sand, self.silt) else {
            return false;
        };
        let total = clay + sand + silt;
        if total <= 1.0 + 1e-9 {
            return false;
        }
        warn!("Texture fractions sum to {total:.3}, rescaling clay/sand/silt to 1.0");
        self.clay = Some(clay / total);
        self.sand = Some(sand / total);
        self.silt = Some(silt / total);
        true
    }
}

/// Split factor of the layer at `index` (0 = surface)
pub fn default_split(index: usize) -> u32 {
    match index {
        0 | 1 => 10,
        2 | 3 => 4,
        _ => 2,
    }
}

/// Split a top layer into a fine 20 mm band and the coarser remainder. Layers that
/// are too shallow, or have no depth, come back unchanged.
pub fn split_top_layer(layer: LayerRecord) -> Vec<LayerRecord> {
    match layer.depth {
        Some(depth) if depth >= MIN_SPLIT_DEPTH => {
            let fine = LayerRecord {
                depth: Some(EXTRA_SPLIT_DEPTH),
                split: EXTRA_SPLIT_FINE,
                ..layer.clone()
            };
            let coarse = LayerRecord {
                depth: Some(depth - EXTRA_SPLIT_DEPTH),
                split: EXTRA_SPLIT_COARSE,
                ..layer
            };
            vec![fine, coarse]
        }
        _ => vec![layer],
    }
}
