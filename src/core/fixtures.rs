//! In-memory grids shared by unit tests.
use ndarray::{Array3, array};

use crate::core::grid::{GridCoords, SoilGrid};

/// 3x3 grid with three layers and deliberately sparse data. Two cells carry no
/// valid surface layer; the counts per cell are `[[0,3,3],[3,3,1],[0,3,2]]`.
pub fn fake_isric_wise() -> SoilGrid {
    let ph = array![
        [[-1.0, 7.4, 5.2], [5.2, 6.5, 5.1], [-1.0, 6.2, 5.0]],
        [[-1.0, 7.6, 5.3], [5.5, 6.6, -1.0], [-1.0, 6.5, 5.3]],
        [[-1.0, 7.4, 5.2], [2.2, 6.8, -1.0], [-1.0, 6.4, -1.0]],
    ];
    let cl = array![
        [[-1.0, 0.30, 0.10], [0.1, 0.22, 0.1], [-1.0, 0.1, 0.15]],
        [[-1.0, 0.31, 0.09], [0.1, 0.16, 0.05], [-1.0, 0.11, 0.13]],
        [[-1.0, 0.29, 0.02], [0.05, 0.2, 0.2], [-1.0, 0.3, -1.0]],
    ];
    // one cell has bulk density but nothing else
    let bd = array![
        [[0.5, 0.9, 0.95], [1.4, 1.3, 1.4], [-1.0, 1.6, 1.5]],
        [[0.8, 0.95, 1.05], [1.3, 1.25, 1.35], [-1.0, 1.7, 1.85]],
        [[0.6, 1.20, 1.3], [1.25, 1.45, 1.5], [-1.0, 1.65, -1.0]],
    ];
    let coords = GridCoords::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0]);
    SoilGrid::new(coords, 3)
        .with_variable("PHAQ", ph)
        .and_then(|g| g.with_variable("CLPC", cl))
        .and_then(|g| g.with_variable("BULK", bd))
        .unwrap()
}

/// Fully populated low-resolution grid with five 20 cm layers per cell,
/// north-up, first cell centre at (52.25, 8.25).
pub fn full_profile_grid(nlat: usize, nlon: usize) -> SoilGrid {
    let coords = GridCoords::regular(52.25, -0.5, nlat, 8.25, 0.5, nlon);
    let shape = (5, nlat, nlon);
    let per_layer = |values: [f64; 5]| Array3::from_shape_fn(shape, |(k, _, _)| values[k]);
    SoilGrid::new(coords, 5)
        .with_variable("BULK", per_layer([1.2, 1.3, 1.4, 1.5, 1.55]))
        .and_then(|g| g.with_variable("PHAQ", per_layer([6.5, 6.6, 6.8, 7.0, 7.1])))
        .and_then(|g| g.with_variable("CLPC", per_layer([22.0, 24.0, 26.0, 28.0, 30.0])))
        .and_then(|g| g.with_variable("SDTO", per_layer([41.0, 40.0, 38.0, 37.0, 35.0])))
        .and_then(|g| g.with_variable("STPC", per_layer([37.0, 36.0, 36.0, 35.0, 35.0])))
        .and_then(|g| g.with_variable("TOTC", per_layer([14.0, 9.0, 5.0, 3.0, 2.0])))
        .and_then(|g| g.with_variable("TOTN", per_layer([1.4, 0.9, 0.5, 0.3, 0.2])))
        .and_then(|g| g.with_variable("CFRAG", per_layer([4.0, 5.0, 6.0, 8.0, 10.0])))
        .and_then(|g| g.with_variable("TopDep", per_layer([0.0, 20.0, 40.0, 60.0, 80.0])))
        .and_then(|g| g.with_variable("BotDep", per_layer([20.0, 40.0, 60.0, 80.0, 100.0])))
        .unwrap()
}
