//! Per-cell layer validity.
//!
//! A layer value is valid when it is finite and non-negative. For every mask
//! attribute the number of leading valid layers is counted from the surface down;
//! the first invalid layer ends the profile even if deeper layers carry data. The
//! cell's layer count is the minimum over all mask attributes present in the grid.
use ndarray::{Array2, Axis, Zip};
use tracing::debug;

use crate::core::grid::SoilGrid;
use crate::core::schema::AttributeSchema;
use crate::error::{Error, Result};

/// True for values that count as data
pub fn is_valid(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Length of the valid prefix of a surface-first profile
pub fn count_leading_valid<I>(values: I) -> usize
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().take_while(|v| is_valid(*v)).count()
}

/// Number of usable layers per grid cell, shape `(n_lat, n_lon)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerValidityMask {
    counts: Array2<usize>,
}

impl LayerValidityMask {
    /// Build the mask from the schema's mask attributes present in `grid`
    pub fn build(grid: &SoilGrid, schema: &AttributeSchema) -> Result<Self> {
        let present: Vec<&str> = schema
            .mask_attributes()
            .iter()
            .copied()
            .filter(|name| grid.contains(name))
            .collect();
        if present.is_empty() {
            return Err(Error::MissingRequiredAttribute {
                required: schema.mask_attributes().join(", "),
            });
        }
        debug!("Building layer mask from {}", present.join(", "));

        let mut counts = Array2::from_elem(grid.shape(), usize::MAX);
        for name in present {
            let Some(data) = grid.get(name) else { continue };
            let per_attr =
                data.map_axis(Axis(0), |profile| count_leading_valid(profile.iter().copied()));
            Zip::from(&mut counts)
                .and(&per_attr)
                .for_each(|c, &n| *c = (*c).min(n));
        }
        Ok(Self { counts })
    }

    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    pub fn count(&self, row: usize, col: usize) -> usize {
        self.counts[[row, col]]
    }

    pub fn shape(&self) -> (usize, usize) {
        self.counts.dim()
    }

    /// Cells with at least one valid layer
    pub fn binary(&self) -> Array2<bool> {
        self.counts.mapv(|n| n >= 1)
    }

    pub fn site_count(&self) -> usize {
        self.counts.iter().filter(|&&n| n >= 1).count()
    }

    /// Cells without any valid layer
    pub fn empty_cells(&self) -> usize {
        self.counts.iter().filter(|&&n| n == 0).count()
    }

    /// Mask with every cell outside `keep` set to zero layers
    pub fn restricted(&self, keep: &Array2<bool>) -> Result<Self> {
        if keep.dim() != self.counts.dim() {
            return Err(Error::ShapeMismatch {
                what: "selection mask".into(),
                expected: self.counts.shape().to_vec(),
                found: keep.shape().to_vec(),
            });
        }
        let mut counts = self.counts.clone();
        Zip::from(&mut counts)
            .and(keep)
            .for_each(|c, &k| {
                if !k {
                    *c = 0
                }
            });
        Ok(Self { counts })
    }

    pub fn subset(&self, rows: &[usize], cols: &[usize]) -> Self {
        Self {
            counts: self.counts.select(Axis(0), rows).select(Axis(1), cols),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::fake_isric_wise;
    use crate::core::grid::GridCoords;
    use crate::core::schema::ISRIC_WISE;
    use ndarray::{Array3, array};

    #[test]
    fn count_layers_stops_at_first_invalid() {
        assert_eq!(count_leading_valid([1.0, 2.0, 3.0, 4.0, -1.0, -1.0]), 4);
        assert_eq!(count_leading_valid([-1.0, 1.0, 2.0, 3.0, 4.0, 5.0]), 0);
        assert_eq!(count_leading_valid([-1.0, 1.0, 2.0, -1.0]), 0);
        assert_eq!(count_leading_valid([0.5, f64::NAN, 2.0]), 1);
        assert_eq!(count_leading_valid(Vec::<f64>::new()), 0);
    }

    #[test]
    fn sparse_fixture_counts() {
        let mask = LayerValidityMask::build(&fake_isric_wise(), &ISRIC_WISE).unwrap();
        assert_eq!(mask.shape(), (3, 3));
        assert_eq!(mask.empty_cells(), 2);
        assert_eq!(mask.site_count(), 7);
        assert_eq!(
            mask.counts(),
            &array![[0, 3, 3], [3, 3, 1], [0, 3, 2]]
        );
        let mut distinct: Vec<usize> = mask.counts().iter().copied().filter(|&n| n > 0).collect();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct, vec![1, 2, 3]);
    }

    #[test]
    fn layer_count_is_minimum_over_attributes() {
        let grid = fake_isric_wise();
        let mask = LayerValidityMask::build(&grid, &ISRIC_WISE).unwrap();
        for ((row, col), &count) in mask.counts().indexed_iter() {
            let expected = ["PHAQ", "BULK", "CLPC"]
                .iter()
                .map(|v| count_leading_valid(grid.profile(v, row, col).unwrap()))
                .min()
                .unwrap();
            assert_eq!(count, expected);
        }
    }

    #[test]
    fn missing_mask_attributes_fail() {
        let coords = GridCoords::regular(0.0, 1.0, 2, 0.0, 1.0, 2);
        let grid = crate::core::grid::SoilGrid::new(coords, 1)
            .with_variable("SDTO", Array3::from_elem((1, 2, 2), 40.0))
            .unwrap();
        let err = LayerValidityMask::build(&grid, &ISRIC_WISE).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredAttribute { .. }));
    }

    #[test]
    fn restriction_zeroes_unselected_cells() {
        let mask = LayerValidityMask::build(&fake_isric_wise(), &ISRIC_WISE).unwrap();
        let keep = array![[true, true, false], [true, false, false], [true, true, true]];
        let restricted = mask.restricted(&keep).unwrap();
        assert_eq!(restricted.site_count(), 4);
        assert!(mask.restricted(&Array2::from_elem((2, 3), true)).is_err());
    }
}
