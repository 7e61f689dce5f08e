//! Shared types and enums used across the site pipeline.
//! Includes `Resolution`, `IdEncoding`, `BoundingBox`, the layer limit and the
//! no-data sentinel written for absent numeric fields.
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sentinel rendered for absent numeric fields in the site document.
pub const NODATA: f64 = -99.99;

/// Maximum number of soil layers per cell supported by the site format.
pub const MAX_LAYERS: usize = 5;

/// Source grid resolution. Selects the row multiplier of the row/column id encoding.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resolution {
    /// 0.5 x 0.5 deg
    #[value(name = "LR", alias = "lr")]
    Lr,
    /// 0.25 x 0.25 deg
    #[value(name = "MR", alias = "mr")]
    Mr,
    /// 0.083 x 0.083 deg
    #[value(name = "HR", alias = "hr")]
    Hr,
}

impl Resolution {
    /// Nominal cell size in degrees
    pub fn degrees(self) -> f64 {
        match self {
            Resolution::Lr => 0.5,
            Resolution::Mr => 0.25,
            Resolution::Hr => 1.0 / 12.0,
        }
    }

    /// Row multiplier `M` of the row/column id encoding (`id = row * M + col`)
    pub fn id_multiplier(self) -> u64 {
        match self {
            Resolution::Lr => 1000,
            Resolution::Mr | Resolution::Hr => 10000,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Lr => write!(f, "Low-res [0.5°]"),
            Resolution::Mr => write!(f, "Medium-res [0.25°]"),
            Resolution::Hr => write!(f, "High-res [0.083°]"),
        }
    }
}

/// Strategy used to derive the integer cell id from a coordinate.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdEncoding {
    /// Geohash string read as a base-32 integer; independent of the grid
    Geohash,
    /// `row * M + col`; depends on resolution and grid orientation
    Rowcol,
}

impl std::fmt::Display for IdEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdEncoding::Geohash => write!(f, "geohash"),
            IdEncoding::Rowcol => write!(f, "rowcol"),
        }
    }
}

/// File format of the companion raster.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Serialize, Deserialize, Default)]
pub enum RasterFormat {
    #[default]
    #[value(name = "netCDF")]
    NetCdf,
    #[value(name = "GTiff")]
    GTiff,
}

impl RasterFormat {
    /// GDAL driver short name
    pub fn driver_name(self) -> &'static str {
        match self {
            RasterFormat::NetCdf => "netCDF",
            RasterFormat::GTiff => "GTiff",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::NetCdf => "nc",
            RasterFormat::GTiff => "tif",
        }
    }
}

impl std::fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.driver_name())
    }
}

/// Geographic bounding box in degrees (x = lon, y = lat).
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            x1: -180.0,
            x2: 180.0,
            y1: -90.0,
            y2: 90.0,
        }
    }
}

impl BoundingBox {
    /// Validated constructor; corners must lie on the globe and be ordered
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self> {
        if !(-180.0..=180.0).contains(&x1) || !(-180.0..=180.0).contains(&x2) {
            return Err(Error::invalid("bbox", format!("lon {x1},{x2} outside [-180, 180]")));
        }
        if !(-90.0..=90.0).contains(&y1) || !(-90.0..=90.0).contains(&y2) {
            return Err(Error::invalid("bbox", format!("lat {y1},{y2} outside [-90, 90]")));
        }
        if x1 >= x2 || y1 >= y2 {
            return Err(Error::invalid(
                "bbox",
                format!("[{x1},{y1},{x2},{y2}] is not ordered (x1 < x2, y1 < y2)"),
            ));
        }
        Ok(Self { x1, x2, y1, y2 })
    }
}

impl FromStr for BoundingBox {
    type Err = Error;

    /// Parse `X1,Y1,X2,Y2`, optionally wrapped in brackets
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s
            .trim()
            .trim_start_matches(['[', '(', '{'])
            .trim_end_matches([']', ')', '}']);
        let values: Vec<f64> = trimmed
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| Error::invalid("bbox", s))?;
        match values.as_slice() {
            [x1, y1, x2, y2] => BoundingBox::new(*x1, *y1, *x2, *y2),
            _ => Err(Error::invalid("bbox", s)),
        }
    }
}
