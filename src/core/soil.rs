//! `SoilDataset`: a raw soil grid together with its layer validity mask and the
//! lazily converted target-schema view.
//!
//! Clipping never mutates a dataset; every clip returns a new one. Bounding-box
//! clips drop rows and columns, geometry clips keep the extent and zero the layer
//! count of every cell outside the geometry and share the raw grid.
use std::cell::OnceCell;
use std::sync::Arc;

use gdal::vector::Geometry;
use ndarray::{Array2, Zip};
use tracing::{debug, info};

use crate::core::grid::{GridCoords, SoilGrid};
use crate::core::mask::{LayerValidityMask, is_valid};
use crate::core::schema::{AttributeSchema, ISRIC_WISE};
use crate::core::units;
use crate::error::Result;
use crate::types::BoundingBox;

/// Source variable, its target name and the unit factor between them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableConversion {
    pub source: &'static str,
    pub target: &'static str,
    pub factor: f64,
}

#[derive(Debug, Clone)]
pub struct SoilDataset {
    schema: &'static AttributeSchema,
    grid: Arc<SoilGrid>,
    origin: GridCoords,
    mask: LayerValidityMask,
    converted: OnceCell<SoilGrid>,
}

impl SoilDataset {
    /// Wrap a raw grid; fails if none of the schema's mask attributes is present
    pub fn new(grid: SoilGrid, schema: &'static AttributeSchema) -> Result<Self> {
        let mask = LayerValidityMask::build(&grid, schema)?;
        info!(
            "{} grid {}x{} with {} layers, {} valid cells",
            schema.name,
            grid.shape().0,
            grid.shape().1,
            grid.layers(),
            mask.site_count()
        );
        Ok(Self {
            schema,
            origin: grid.coords().clone(),
            grid: Arc::new(grid),
            mask,
            converted: OnceCell::new(),
        })
    }

    pub fn isric_wise(grid: SoilGrid) -> Result<Self> {
        Self::new(grid, &ISRIC_WISE)
    }

    fn derived(&self, grid: Arc<SoilGrid>, mask: LayerValidityMask) -> Self {
        Self {
            schema: self.schema,
            grid,
            origin: self.origin.clone(),
            mask,
            converted: OnceCell::new(),
        }
    }

    pub fn schema(&self) -> &'static AttributeSchema {
        self.schema
    }

    /// Raw source grid over the current extent
    pub fn original(&self) -> &SoilGrid {
        &self.grid
    }

    pub fn coords(&self) -> &GridCoords {
        self.grid.coords()
    }

    /// Coordinates of the unclipped source grid
    pub fn origin(&self) -> &GridCoords {
        &self.origin
    }

    /// Per-cell count of valid layers
    pub fn layer_mask(&self) -> &LayerValidityMask {
        &self.mask
    }

    /// Cells with at least one valid layer
    pub fn mask(&self) -> Array2<bool> {
        self.mask.binary()
    }

    pub fn site_count(&self) -> usize {
        self.mask.site_count()
    }

    /// Cell size in degrees of the source grid (lon step, 0.5 for single-column grids)
    pub fn cell_size(&self) -> f64 {
        self.origin
            .lon_step()
            .or_else(|| self.origin.lat_step())
            .map(f64::abs)
            .unwrap_or(0.5)
    }

    /// Keep cells whose centre lies in `[x1, x2) x [y1, y2)`. Adjacent boxes on a
    /// pixel-aligned grid never share a cell.
    pub fn clip_to_bbox(&self, bbox: &BoundingBox) -> SoilDataset {
        let coords = self.coords();
        let rows: Vec<usize> = coords
            .lat
            .iter()
            .enumerate()
            .filter(|(_, lat)| **lat >= bbox.y1 && **lat < bbox.y2)
            .map(|(i, _)| i)
            .collect();
        let cols: Vec<usize> = coords
            .lon
            .iter()
            .enumerate()
            .filter(|(_, lon)| **lon >= bbox.x1 && **lon < bbox.x2)
            .map(|(j, _)| j)
            .collect();
        let clipped = self.derived(
            Arc::new(self.grid.subset(&rows, &cols)),
            self.mask.subset(&rows, &cols),
        );
        info!(
            "Clipped to [{}, {}, {}, {}]: {}x{} cells, {} valid",
            bbox.x1,
            bbox.y1,
            bbox.x2,
            bbox.y2,
            rows.len(),
            cols.len(),
            clipped.site_count()
        );
        clipped
    }

    /// Keep cells covered by any of `geometries` (lon/lat, EPSG:4326). With
    /// `all_touched` every cell the outline touches counts as covered.
    pub fn clip_to_geometry(&self, geometries: &[Geometry], all_touched: bool) -> Result<SoilDataset> {
        let covered = crate::io::gdal::rasterize_geometry(
            self.coords(),
            geometries,
            all_touched,
            self.cell_size(),
        )?;
        let clipped = self.restrict_to_mask(&covered)?;
        info!(
            "Clipped to {} geometries: {} valid cells",
            geometries.len(),
            clipped.site_count()
        );
        Ok(clipped)
    }

    /// Keep only cells set in `keep`; extent unchanged
    pub fn restrict_to_mask(&self, keep: &Array2<bool>) -> Result<SoilDataset> {
        let mask = self.mask.restricted(keep)?;
        Ok(self.derived(Arc::clone(&self.grid), mask))
    }

    /// Target name and unit factor of every variable in the grid. Fails on the first
    /// variable the schema does not declare.
    pub fn conversions(&self) -> Result<Vec<VariableConversion>> {
        self.grid
            .names()
            .map(|name| {
                let mapping = self.schema.lookup(name)?;
                Ok(VariableConversion {
                    source: mapping.source.name,
                    target: mapping.target.name,
                    factor: units::conversion_factor(mapping.source.unit, mapping.target.unit)?,
                })
            })
            .collect()
    }

    /// Converted profiles of one cell as `(target name, value per layer)`, masked
    /// like `converted_data`
    pub fn converted_cell(
        &self,
        conversions: &[VariableConversion],
        row: usize,
        col: usize,
    ) -> Vec<(&'static str, Vec<f64>)> {
        let count = self.mask.count(row, col);
        conversions
            .iter()
            .filter_map(|c| {
                let raw = self.grid.get(c.source)?;
                let values = (0..self.grid.layers())
                    .map(|k| {
                        let v = raw[[k, row, col]];
                        if is_valid(v) && k < count { v * c.factor } else { f64::NAN }
                    })
                    .collect();
                Some((c.target, values))
            })
            .collect()
    }

    /// Converted data in target names and units. Layers at or below a cell's valid
    /// layer count and negative source values are NaN. Computed on first access.
    pub fn converted_data(&self) -> Result<&SoilGrid> {
        if let Some(grid) = self.converted.get() {
            return Ok(grid);
        }
        let grid = self.convert()?;
        Ok(self.converted.get_or_init(|| grid))
    }

    fn convert(&self) -> Result<SoilGrid> {
        let mut out = SoilGrid::new(self.coords().clone(), self.grid.layers());
        let counts = self.mask.counts();
        for (name, raw) in self.grid.variables() {
            let mapping = self.schema.lookup(name)?;
            let mut data = units::convert_array(raw, mapping.source.unit, mapping.target.unit)?;
            Zip::indexed(&mut data)
                .and(raw)
                .for_each(|(k, i, j), value, &source| {
                    if !is_valid(source) || k >= counts[[i, j]] {
                        *value = f64::NAN;
                    }
                });
            debug!("{} -> {} ({} -> {})", name, mapping.target.name, mapping.source.unit, mapping.target.unit);
            out.insert(mapping.target.name, data)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{fake_isric_wise, full_profile_grid};
    use crate::error::Error;
    use ndarray::Array3;

    #[test]
    fn converted_names_match_mapping_targets() {
        let ds = SoilDataset::isric_wise(fake_isric_wise()).unwrap();
        let mut expected: Vec<&str> = ds
            .original()
            .names()
            .map(|name| ds.schema().lookup(name).unwrap().target.name)
            .collect();
        expected.sort_unstable();
        let names: Vec<&str> = ds.converted_data().unwrap().names().collect();
        assert_eq!(names, expected);
        assert!(names.iter().all(|n| ds.schema().mapped_targets().any(|t| t == *n)));
    }

    #[test]
    fn converted_layers_beyond_count_are_nan() {
        let ds = SoilDataset::isric_wise(fake_isric_wise()).unwrap();
        let conv = ds.converted_data().unwrap();
        let bd = conv.get("bd").unwrap();
        // cell (1, 2) has one valid layer, bd itself is valid in all three
        assert_eq!(bd[[0, 1, 2]], 1.4);
        assert!(bd[[1, 1, 2]].is_nan());
        assert!(bd[[2, 1, 2]].is_nan());
        // cell (0, 0) has bulk density only, no valid layer
        assert!(bd[[0, 0, 0]].is_nan());
        let clay = conv.get("clay").unwrap();
        assert!((clay[[0, 0, 1]] - 0.003).abs() < 1e-12);
    }

    #[test]
    fn converted_view_is_cached() {
        let ds = SoilDataset::isric_wise(fake_isric_wise()).unwrap();
        let a = ds.converted_data().unwrap() as *const SoilGrid;
        let b = ds.converted_data().unwrap() as *const SoilGrid;
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_source_variable_is_fatal_on_conversion() {
        let grid = fake_isric_wise()
            .with_variable("PROP1", Array3::zeros((3, 3, 3)))
            .unwrap();
        let ds = SoilDataset::isric_wise(grid).unwrap();
        assert!(matches!(ds.converted_data(), Err(Error::UnknownAttribute { .. })));
    }

    #[test]
    fn bbox_clip_is_pure_and_half_open() {
        let ds = SoilDataset::isric_wise(full_profile_grid(8, 8)).unwrap();
        assert_eq!(ds.site_count(), 64);
        // centres 52.25..48.75 and 8.25..11.75
        let bbox = BoundingBox::new(8.0, 50.0, 10.0, 52.0).unwrap();
        let clipped = ds.clip_to_bbox(&bbox);
        assert_eq!(clipped.coords().shape(), (4, 4));
        assert_eq!(clipped.site_count(), 16);
        assert_eq!(ds.site_count(), 64);
        assert_eq!(clipped.origin(), ds.origin());

        let neighbour = ds.clip_to_bbox(&BoundingBox::new(10.0, 50.0, 12.0, 52.0).unwrap());
        assert_eq!(neighbour.site_count(), 16);
        assert!(
            neighbour
                .coords()
                .lon
                .iter()
                .all(|lon| !clipped.coords().lon.contains(lon))
        );
    }

    #[test]
    fn empty_bbox_intersection_gives_zero_sites() {
        let ds = SoilDataset::isric_wise(full_profile_grid(4, 4)).unwrap();
        let clipped = ds.clip_to_bbox(&BoundingBox::new(-120.0, -40.0, -100.0, -20.0).unwrap());
        assert_eq!(clipped.site_count(), 0);
        assert!(clipped.converted_data().unwrap().coords().is_empty());
    }

    #[test]
    fn cell_conversion_matches_converted_view() {
        let ds = SoilDataset::isric_wise(fake_isric_wise()).unwrap();
        let conversions = ds.conversions().unwrap();
        let conv = ds.converted_data().unwrap();
        for row in 0..3 {
            for col in 0..3 {
                for (name, values) in ds.converted_cell(&conversions, row, col) {
                    let expected = conv.profile(name, row, col).unwrap();
                    for (a, b) in values.iter().zip(&expected) {
                        assert!(a == b || (a.is_nan() && b.is_nan()), "{name} at ({row}, {col})");
                    }
                }
            }
        }
    }

    #[test]
    fn geometry_style_restriction_shares_raw_grid() {
        let ds = SoilDataset::isric_wise(full_profile_grid(3, 3)).unwrap();
        let restricted = ds.restrict_to_mask(&Array2::from_elem((3, 3), true)).unwrap();
        assert!(std::ptr::eq(ds.original(), restricted.original()));
    }

    #[test]
    fn mask_restriction_keeps_extent() {
        let ds = SoilDataset::isric_wise(full_profile_grid(3, 3)).unwrap();
        let mut keep = Array2::from_elem((3, 3), false);
        keep[[1, 1]] = true;
        let restricted = ds.restrict_to_mask(&keep).unwrap();
        assert_eq!(restricted.coords().shape(), (3, 3));
        assert_eq!(restricted.site_count(), 1);
        let bd = restricted.converted_data().unwrap().get("bd").unwrap();
        assert!(bd[[0, 0, 0]].is_nan());
        assert_eq!(bd[[0, 1, 1]], 1.2);
    }
}
