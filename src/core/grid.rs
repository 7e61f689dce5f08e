//! Gridded soil data held in memory.
//!
//! `GridCoords` carries the shared latitude/longitude vectors, `SoilGrid` the named
//! per-layer variables with shape `(layer, lat, lon)`. Every variable of one grid
//! shares the same coordinates; `SoilGrid::insert` enforces that.
use std::collections::BTreeMap;

use ndarray::{Array3, Axis};

use crate::error::{Error, Result};

/// Cell-centre coordinates of a regular lat/lon grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCoords {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
}

impl GridCoords {
    pub fn new(lat: Vec<f64>, lon: Vec<f64>) -> Self {
        Self { lat, lon }
    }

    /// Build regular coordinates from a first cell centre and a step per axis
    pub fn regular(lat0: f64, dlat: f64, nlat: usize, lon0: f64, dlon: f64, nlon: usize) -> Self {
        Self {
            lat: (0..nlat).map(|i| lat0 + i as f64 * dlat).collect(),
            lon: (0..nlon).map(|j| lon0 + j as f64 * dlon).collect(),
        }
    }

    /// Cell-centre coordinates from a GDAL geotransform of a `cols x rows` raster
    pub fn from_geotransform(gt: &[f64; 6], cols: usize, rows: usize) -> Self {
        Self {
            lat: (0..rows).map(|i| gt[3] + (i as f64 + 0.5) * gt[5]).collect(),
            lon: (0..cols).map(|j| gt[0] + (j as f64 + 0.5) * gt[1]).collect(),
        }
    }

    /// (rows, cols) = (n_lat, n_lon)
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty() || self.lon.is_empty()
    }

    pub fn lat_step(&self) -> Option<f64> {
        step(&self.lat)
    }

    pub fn lon_step(&self) -> Option<f64> {
        step(&self.lon)
    }

    /// True when latitude increases with the row index (south-up storage)
    pub fn lat_ascending(&self) -> bool {
        matches!(self.lat_step(), Some(d) if d > 0.0)
    }

    /// Row whose latitude is closest to `lat`
    pub fn nearest_row(&self, lat: f64) -> Option<usize> {
        nearest(&self.lat, lat)
    }

    /// Column whose longitude is closest to `lon`
    pub fn nearest_col(&self, lon: f64) -> Option<usize> {
        nearest(&self.lon, lon)
    }

    /// GDAL geotransform of this grid. `fallback_res` is used on axes with a single cell.
    pub fn geotransform(&self, fallback_res: f64) -> [f64; 6] {
        let dlon = self.lon_step().unwrap_or(fallback_res);
        let dlat = self.lat_step().unwrap_or(-fallback_res);
        let lon0 = self.lon.first().copied().unwrap_or(0.0);
        let lat0 = self.lat.first().copied().unwrap_or(0.0);
        [lon0 - dlon / 2.0, dlon, 0.0, lat0 - dlat / 2.0, 0.0, dlat]
    }

    /// Sub-grid made of the given rows and columns, in the given order
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Self {
        Self {
            lat: rows.iter().map(|&i| self.lat[i]).collect(),
            lon: cols.iter().map(|&j| self.lon[j]).collect(),
        }
    }
}

fn step(values: &[f64]) -> Option<f64> {
    match values {
        [a, b, ..] => Some(b - a),
        _ => None,
    }
}

fn nearest(values: &[f64], target: f64) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
        .map(|(idx, _)| idx)
}

/// Named multi-layer variables over one `GridCoords`.
#[derive(Debug, Clone)]
pub struct SoilGrid {
    coords: GridCoords,
    layers: usize,
    variables: BTreeMap<String, Array3<f64>>,
}

impl SoilGrid {
    pub fn new(coords: GridCoords, layers: usize) -> Self {
        Self {
            coords,
            layers,
            variables: BTreeMap::new(),
        }
    }

    /// Add or replace a variable; its shape must be `(layers, n_lat, n_lon)`
    pub fn insert(&mut self, name: impl Into<String>, data: Array3<f64>) -> Result<()> {
        let name = name.into();
        let (rows, cols) = self.coords.shape();
        let expected = vec![self.layers, rows, cols];
        if data.shape() != expected.as_slice() {
            return Err(Error::ShapeMismatch {
                what: name,
                expected,
                found: data.shape().to_vec(),
            });
        }
        self.variables.insert(name, data);
        Ok(())
    }

    /// Builder-style `insert`
    pub fn with_variable(mut self, name: impl Into<String>, data: Array3<f64>) -> Result<Self> {
        self.insert(name, data)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Array3<f64>> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Array3<f64>)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn coords(&self) -> &GridCoords {
        &self.coords
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    /// (n_lat, n_lon)
    pub fn shape(&self) -> (usize, usize) {
        self.coords.shape()
    }

    /// Copy of the grid restricted to the given rows and columns
    pub fn subset(&self, rows: &[usize], cols: &[usize]) -> SoilGrid {
        let variables = self
            .variables
            .iter()
            .map(|(name, data)| {
                let picked = data.select(Axis(1), rows).select(Axis(2), cols);
                (name.clone(), picked)
            })
            .collect();
        SoilGrid {
            coords: self.coords.select(rows, cols),
            layers: self.layers,
            variables,
        }
    }

    /// Values of `name` at one cell, surface first
    pub fn profile(&self, name: &str, row: usize, col: usize) -> Option<Vec<f64>> {
        self.variables
            .get(name)
            .map(|data| (0..self.layers).map(|k| data[[k, row, col]]).collect())
    }
}
