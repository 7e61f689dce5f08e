//! Deterministic cell ids.
//!
//! A `CellIdentifier` turns a cell-centre coordinate into the integer id that joins
//! the site document and the id layer of the companion raster. Two encodings are
//! available, selected by `IdEncoding`:
//!
//! - `GeohashId`: geohash of the coordinate read as a base-32 number. Independent
//!   of grid resolution and orientation.
//! - `RowColId`: `row * M + col` over the source grid, `M` = 1000 (LR) or 10000
//!   (MR/HR). Rows count from the southernmost row when latitude ascends.
use crate::core::grid::GridCoords;
use crate::error::{Error, Result};
use crate::types::{IdEncoding, Resolution};

pub type CellId = u64;

pub trait CellIdentifier {
    fn name(&self) -> &'static str;

    /// Id of the cell containing (lat, lon)
    fn encode(&self, lat: f64, lon: f64) -> Result<CellId>;

    /// Cell-centre coordinate of an id
    fn decode(&self, id: CellId) -> Result<(f64, f64)>;
}

/// Identifier for `encoding` over the source grid `origin`
pub fn identifier(
    encoding: IdEncoding,
    origin: &GridCoords,
    resolution: Resolution,
    geohash_precision: usize,
) -> Result<Box<dyn CellIdentifier>> {
    Ok(match encoding {
        IdEncoding::Geohash => Box::new(GeohashId::new(geohash_precision)?),
        IdEncoding::Rowcol => Box::new(RowColId::new(origin.clone(), resolution)),
    })
}

#[derive(Debug, Clone, Copy)]
pub struct GeohashId {
    precision: usize,
}

impl GeohashId {
    pub const MAX_PRECISION: usize = 12;

    pub fn new(precision: usize) -> Result<Self> {
        if !(1..=Self::MAX_PRECISION).contains(&precision) {
            return Err(Error::invalid("geohash_precision", precision));
        }
        Ok(Self { precision })
    }

    pub fn precision(&self) -> usize {
        self.precision
    }
}

impl CellIdentifier for GeohashId {
    fn name(&self) -> &'static str {
        "geohash"
    }

    fn encode(&self, lat: f64, lon: f64) -> Result<CellId> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::invalid("coordinate", format!("({lat}, {lon})")));
        }
        geohash::to_decimal(&geohash::encode(lat, lon, self.precision))
    }

    fn decode(&self, id: CellId) -> Result<(f64, f64)> {
        let hash = geohash::from_decimal(id, self.precision)?;
        geohash::decode(&hash)
    }
}

#[derive(Debug, Clone)]
pub struct RowColId {
    coords: GridCoords,
    multiplier: u64,
    lat_step: f64,
    lon_step: f64,
}

impl RowColId {
    pub fn new(coords: GridCoords, resolution: Resolution) -> Self {
        let lat_step = coords.lat_step().unwrap_or(-resolution.degrees());
        let lon_step = coords.lon_step().unwrap_or(resolution.degrees());
        Self {
            coords,
            multiplier: resolution.id_multiplier(),
            lat_step,
            lon_step,
        }
    }

    fn locate(values: &[f64], target: f64, step: f64) -> Option<usize> {
        let tolerance = step.abs() * 0.5 * (1.0 + 1e-6);
        values
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
            .filter(|(_, v)| (*v - target).abs() <= tolerance)
            .map(|(idx, _)| idx)
    }

    fn row_index(&self, row: usize) -> usize {
        if self.coords.lat_ascending() {
            self.coords.lat.len() - 1 - row
        } else {
            row
        }
    }
}

impl CellIdentifier for RowColId {
    fn name(&self) -> &'static str {
        "rowcol"
    }

    fn encode(&self, lat: f64, lon: f64) -> Result<CellId> {
        let off_grid = || Error::invalid("coordinate", format!("({lat}, {lon}) is not on the grid"));
        let row = Self::locate(&self.coords.lat, lat, self.lat_step).ok_or_else(off_grid)?;
        let col = Self::locate(&self.coords.lon, lon, self.lon_step).ok_or_else(off_grid)?;
        let row_index = self.row_index(row) as u64;
        let col = col as u64;
        let id = row_index * self.multiplier + col;
        if col >= self.multiplier {
            return Err(Error::IdOverflow { id });
        }
        Ok(id)
    }

    fn decode(&self, id: CellId) -> Result<(f64, f64)> {
        let row_index = (id / self.multiplier) as usize;
        let col = (id % self.multiplier) as usize;
        let nlat = self.coords.lat.len();
        if row_index >= nlat || col >= self.coords.lon.len() {
            return Err(Error::invalid("cell id", id));
        }
        let row = self.row_index(row_index);
        Ok((self.coords.lat[row], self.coords.lon[col]))
    }
}

/// Plain geohash string encoding.
pub mod geohash {
    use crate::error::{Error, Result};

    const ALPHABET: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

    /// Geohash of `(lat, lon)` with `precision` characters
    pub fn encode(lat: f64, lon: f64, precision: usize) -> String {
        let (mut lat_lo, mut lat_hi) = (-90.0, 90.0);
        let (mut lon_lo, mut lon_hi) = (-180.0, 180.0);
        let mut hash = String::with_capacity(precision);
        let mut even = true;
        let mut bits = 0u8;
        let mut ch = 0usize;

        while hash.len() < precision {
            let (lo, hi, value) = if even {
                (&mut lon_lo, &mut lon_hi, lon)
            } else {
                (&mut lat_lo, &mut lat_hi, lat)
            };
            let mid = (*lo + *hi) / 2.0;
            ch <<= 1;
            if value >= mid {
                ch |= 1;
                *lo = mid;
            } else {
                *hi = mid;
            }
            even = !even;
            bits += 1;
            if bits == 5 {
                hash.push(ALPHABET[ch] as char);
                bits = 0;
                ch = 0;
            }
        }
        hash
    }

    fn char_value(c: char) -> Result<u64> {
        ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .map(|p| p as u64)
            .ok_or_else(|| Error::invalid("geohash", c))
    }

    /// Centre of the geohash cell as (lat, lon)
    pub fn decode(hash: &str) -> Result<(f64, f64)> {
        let (mut lat_lo, mut lat_hi) = (-90.0, 90.0);
        let (mut lon_lo, mut lon_hi) = (-180.0, 180.0);
        let mut even = true;
        for c in hash.chars() {
            let value = char_value(c)?;
            for shift in (0..5).rev() {
                let bit = (value >> shift) & 1 == 1;
                let (lo, hi) = if even {
                    (&mut lon_lo, &mut lon_hi)
                } else {
                    (&mut lat_lo, &mut lat_hi)
                };
                let mid = (*lo + *hi) / 2.0;
                if bit {
                    *lo = mid;
                } else {
                    *hi = mid;
                }
                even = !even;
            }
        }
        Ok(((lat_lo + lat_hi) / 2.0, (lon_lo + lon_hi) / 2.0))
    }

    /// Read a geohash as a base-32 number
    pub fn to_decimal(hash: &str) -> Result<u64> {
        if hash.len() > 12 {
            return Err(Error::invalid("geohash", hash));
        }
        hash.chars()
            .try_fold(0u64, |acc, c| Ok(acc * 32 + char_value(c)?))
    }

    /// Inverse of `to_decimal` for a hash of `precision` characters
    pub fn from_decimal(mut value: u64, precision: usize) -> Result<String> {
        let mut chars = vec![b'0'; precision];
        for slot in chars.iter_mut().rev() {
            *slot = ALPHABET[(value % 32) as usize];
            value /= 32;
        }
        if value != 0 {
            return Err(Error::invalid("geohash id", value));
        }
        String::from_utf8(chars).map_err(|e| Error::Processing(e.to_string()))
    }
}
