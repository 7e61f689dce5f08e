//! Site record generation.
//!
//! `SiteRecordBuilder` walks the valid cells of a `SoilDataset` in row-major order,
//! in chunks of `chunk_size` cells, and turns each cell into a `SiteRecord` with
//! 1 to 5 layers. Cells with incomplete layer data are skipped, the run is not
//! aborted. The emitted ids are collected into a `CompanionRaster` aligned with the
//! dataset grid.
use std::collections::HashSet;

use ndarray::Array2;
use tracing::{debug, info, warn};

use crate::core::cellid::{CellId, CellIdentifier, identifier};
use crate::core::grid::GridCoords;
use crate::core::hydraulics::apply_hydraulic_properties;
use crate::core::layer::{DEFAULT_IRON, LayerRecord, default_split, split_top_layer};
use crate::core::params::{SiteMetadata, SiteParams};
use crate::core::progress::Progress;
use crate::core::soil::{SoilDataset, VariableConversion};
use crate::error::{Error, Result};
use crate::types::{IdEncoding, MAX_LAYERS, Resolution};

/// No-data value of the id layer
pub const ID_NODATA: i64 = -1;

/// One grid cell of the output document
#[derive(Debug, Clone, PartialEq)]
pub struct SiteRecord {
    pub id: CellId,
    pub lat: f64,
    pub lon: f64,
    /// Surface first
    pub layers: Vec<LayerRecord>,
}

/// All sites of one output file and their shared header
#[derive(Debug, Clone, PartialEq)]
pub struct SiteDocument {
    pub metadata: SiteMetadata,
    pub use_history: String,
    pub sites: Vec<SiteRecord>,
}

/// A requested coordinate, optionally with a caller-assigned id
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordPoint {
    pub lat: f64,
    pub lon: f64,
    pub id: Option<CellId>,
}

/// Which valid cells become sites
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Selection {
    #[default]
    All,
    /// Evenly spaced subset of this many valid cells
    Sample(usize),
    /// Cells whose computed id is listed
    Ids(Vec<CellId>),
    /// Per-cell ids replacing the computed ones; negative values skip the cell
    IdRaster(Array2<i64>),
    /// Cells nearest to the given coordinates
    Coords(Vec<CoordPoint>),
}

/// Validity mask and emitted ids on the dataset grid
#[derive(Debug, Clone, PartialEq)]
pub struct CompanionRaster {
    pub coords: GridCoords,
    /// Cell size used for single-row or single-column grids
    pub cell_size: f64,
    /// 1 where the cell has valid layers, 0 elsewhere
    pub mask: Array2<u8>,
    /// Id of every emitted site, `ID_NODATA` elsewhere
    pub ids: Array2<i64>,
}

/// Result of a build
#[derive(Debug, Clone)]
pub struct SiteBuildOutput {
    /// Rendered site document
    pub document: String,
    pub raster: CompanionRaster,
    /// Number of emitted sites
    pub sites: usize,
}

#[derive(Debug, Clone, Copy)]
struct CellTask {
    row: usize,
    col: usize,
    id: CellId,
}

pub struct SiteRecordBuilder<'a> {
    dataset: &'a SoilDataset,
    resolution: Resolution,
    extra_split: bool,
    chunk_size: usize,
    selection: Selection,
    id_encoding: IdEncoding,
    geohash_precision: usize,
    metadata: SiteMetadata,
    use_history: String,
}

impl<'a> SiteRecordBuilder<'a> {
    pub fn new(dataset: &'a SoilDataset, resolution: Resolution) -> Self {
        Self::from_params(
            dataset,
            &SiteParams {
                resolution,
                ..Default::default()
            },
        )
    }

    pub fn from_params(dataset: &'a SoilDataset, params: &SiteParams) -> Self {
        Self {
            dataset,
            resolution: params.resolution,
            extra_split: params.extra_split,
            chunk_size: params.chunk_size.max(1),
            selection: Selection::All,
            id_encoding: params.id_encoding,
            geohash_precision: params.geohash_precision,
            metadata: params.metadata.clone(),
            use_history: params.use_history.clone(),
        }
    }

    pub fn extra_split(mut self, extra_split: bool) -> Self {
        self.extra_split = extra_split;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn id_encoding(mut self, encoding: IdEncoding) -> Self {
        self.id_encoding = encoding;
        self
    }

    pub fn geohash_precision(mut self, precision: usize) -> Self {
        self.geohash_precision = precision;
        self
    }

    pub fn metadata(mut self, metadata: SiteMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn use_history(mut self, use_history: impl Into<String>) -> Self {
        self.use_history = use_history.into();
        self
    }

    /// Build the sites and render the document
    pub fn build(&self, progress: &mut dyn Progress) -> Result<SiteBuildOutput> {
        let (document, raster) = self.collect(progress)?;
        let rendered =
            crate::io::writers::site_xml::render_site_document(&document, self.dataset.schema())?;
        Ok(SiteBuildOutput {
            document: rendered,
            raster,
            sites: document.sites.len(),
        })
    }

    /// Build the sites without rendering
    pub fn collect(&self, progress: &mut dyn Progress) -> Result<(SiteDocument, CompanionRaster)> {
        let conversions = self.dataset.conversions()?;
        let ids = identifier(
            self.id_encoding,
            self.dataset.origin(),
            self.resolution,
            self.geohash_precision,
        )?;
        let tasks = self.enumerate(ids.as_ref())?;
        let total = tasks.len();

        let mut raster = CompanionRaster {
            coords: self.dataset.coords().clone(),
            cell_size: self.dataset.cell_size(),
            mask: self.dataset.mask().mapv(u8::from),
            ids: Array2::from_elem(self.dataset.coords().shape(), ID_NODATA),
        };
        let mut sites = Vec::with_capacity(total);

        if total == 0 {
            info!("No valid data to process for this region/bbox request.");
        } else {
            info!(
                "Building {} sites ({} ids, chunks of {})",
                total,
                ids.name(),
                self.chunk_size
            );
        }

        let mut emitted = HashSet::with_capacity(total);
        let mut done = 0usize;
        for chunk in tasks.chunks(self.chunk_size) {
            for task in chunk {
                if let Some(site) = self.build_site(&conversions, task)? {
                    if !emitted.insert(site.id) {
                        return Err(Error::DuplicateId { id: site.id });
                    }
                    raster.ids[[task.row, task.col]] = site.id as i64;
                    sites.push(site);
                }
            }
            done += chunk.len();
            progress.advance(done as f64 / total as f64);
        }
        progress.advance(1.0);

        if total > 0 {
            info!("Emitted {} of {} candidate sites", sites.len(), total);
        }
        let document = SiteDocument {
            metadata: SiteMetadata {
                date: Some(self.metadata.date_or_today()),
                ..self.metadata.clone()
            },
            use_history: self.use_history.clone(),
            sites,
        };
        Ok((document, raster))
    }

    /// Candidate cells in output order
    fn enumerate(&self, ids: &dyn CellIdentifier) -> Result<Vec<CellTask>> {
        let coords = self.dataset.coords();
        let mask = self.dataset.layer_mask();
        let valid = |row: usize, col: usize| mask.count(row, col) >= 1;
        let computed = |row: usize, col: usize| -> Result<CellTask> {
            Ok(CellTask {
                row,
                col,
                id: ids.encode(coords.lat[row], coords.lon[col])?,
            })
        };

        let mut all = Vec::new();
        if !matches!(self.selection, Selection::Coords(_)) {
            for ((row, col), &count) in mask.counts().indexed_iter() {
                if count >= 1 {
                    all.push((row, col));
                }
            }
        }

        let tasks = match &self.selection {
            Selection::All => all
                .into_iter()
                .map(|(r, c)| computed(r, c))
                .collect::<Result<Vec<_>>>()?,
            Selection::Sample(n) => {
                let total = all.len();
                let n = (*n).min(total);
                (0..n)
                    .map(|i| all[i * total / n])
                    .map(|(r, c)| computed(r, c))
                    .collect::<Result<Vec<_>>>()?
            }
            Selection::Ids(wanted) => {
                let wanted: HashSet<CellId> = wanted.iter().copied().collect();
                let mut tasks = Vec::new();
                for (r, c) in all {
                    let task = computed(r, c)?;
                    if wanted.contains(&task.id) {
                        tasks.push(task);
                    }
                }
                tasks
            }
            Selection::IdRaster(raster) => {
                if raster.dim() != coords.shape() {
                    return Err(Error::ShapeMismatch {
                        what: "id raster".into(),
                        expected: vec![coords.shape().0, coords.shape().1],
                        found: raster.shape().to_vec(),
                    });
                }
                all.into_iter()
                    .filter_map(|(row, col)| {
                        let id = raster[[row, col]];
                        (id >= 0).then_some(CellTask {
                            row,
                            col,
                            id: id as CellId,
                        })
                    })
                    .collect()
            }
            Selection::Coords(points) => {
                let mut seen = HashSet::new();
                let mut tasks = Vec::new();
                for point in points {
                    let (Some(row), Some(col)) =
                        (coords.nearest_row(point.lat), coords.nearest_col(point.lon))
                    else {
                        continue;
                    };
                    if !self.within_cell(coords, row, col, point) {
                        warn!("Coordinate ({}, {}) is outside the grid, skipped", point.lat, point.lon);
                        continue;
                    }
                    if !valid(row, col) || !seen.insert((row, col)) {
                        continue;
                    }
                    let task = match point.id {
                        Some(id) => CellTask { row, col, id },
                        None => computed(row, col)?,
                    };
                    tasks.push(task);
                }
                tasks
            }
        };
        Ok(tasks)
    }

    fn within_cell(&self, coords: &GridCoords, row: usize, col: usize, point: &CoordPoint) -> bool {
        let size = self.dataset.cell_size();
        let half_lat = coords.lat_step().map_or(size, f64::abs) * 0.5 * (1.0 + 1e-9);
        let half_lon = coords.lon_step().map_or(size, f64::abs) * 0.5 * (1.0 + 1e-9);
        (coords.lat[row] - point.lat).abs() <= half_lat && (coords.lon[col] - point.lon).abs() <= half_lon
    }

    /// Record for one cell, `None` if its layers are incomplete
    fn build_site(&self, conversions: &[VariableConversion], task: &CellTask) -> Result<Option<SiteRecord>> {
        let (row, col) = (task.row, task.col);
        let count = self.dataset.layer_mask().count(row, col);
        if count > MAX_LAYERS {
            return Err(Error::TooManyLayers {
                found: count,
                max: MAX_LAYERS,
            });
        }

        let profiles = self.dataset.converted_cell(conversions, row, col);
        let mut layers = Vec::with_capacity(count + 1);
        for k in 0..count {
            let values = profiles.iter().map(|(name, values)| (*name, values[k]));
            let mut layer = LayerRecord::from_values(values)?;

            if k == 0 {
                let usable = matches!((layer.topd, layer.botd), (Some(t), Some(b)) if t >= 0.0 && b - t > 0.0);
                if !usable {
                    debug!("Cell {} skipped: no usable top layer depth", task.id);
                    return Ok(None);
                }
            }
            layer.apply_depth()?;
            layer.split = default_split(k);
            layer.iron = Some(DEFAULT_IRON);

            let missing: Vec<&str> = [
                ("depth", layer.depth.filter(|d| *d > 0.0)),
                ("ph", layer.ph),
                ("bd", layer.bd),
                ("clay", layer.clay),
                ("sand", layer.sand),
            ]
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
            if !missing.is_empty() {
                debug!(
                    "Cell {} skipped: layer {} lacks {}",
                    task.id,
                    k + 1,
                    missing.join(", ")
                );
                return Ok(None);
            }
            layer.normalize_texture();

            layer = match apply_hydraulic_properties(layer) {
                Ok(layer) => layer,
                Err(Error::ParameterMissing { params }) => {
                    debug!("Cell {} skipped: missing hydraulic input {}", task.id, params);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            layer.topd = None;
            layer.botd = None;
            layers.push(layer);
        }
        if layers.is_empty() {
            return Ok(None);
        }

        if self.extra_split {
            let top = layers.remove(0);
            for (i, part) in split_top_layer(top).into_iter().enumerate() {
                layers.insert(i, part);
            }
        }

        let coords = self.dataset.coords();
        Ok(Some(SiteRecord {
            id: task.id,
            lat: coords.lat[row],
            lon: coords.lon[col],
            layers,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{fake_isric_wise, full_profile_grid};
    use crate::core::grid::SoilGrid;
    use crate::core::progress::NoProgress;
    use crate::types::BoundingBox;
    use ndarray::Array3;

    fn dataset(nlat: usize, nlon: usize) -> SoilDataset {
        SoilDataset::isric_wise(full_profile_grid(nlat, nlon)).unwrap()
    }

    #[test]
    fn every_valid_cell_becomes_a_site() {
        let ds = dataset(4, 5);
        let (doc, raster) = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .collect(&mut NoProgress)
            .unwrap();
        assert_eq!(doc.sites.len(), 20);
        assert!(doc.sites.iter().all(|s| s.layers.len() == 5));
        let first = &doc.sites[0].layers[0];
        assert_eq!(first.depth, Some(200.0));
        assert_eq!(first.split, 10);
        assert_eq!(first.iron, Some(DEFAULT_IRON));
        assert!(first.wcmin.unwrap() < first.wcmax.unwrap());
        assert!(first.topd.is_none());
        assert!(raster.ids.iter().all(|&id| id >= 0));
        assert_eq!(raster.mask.sum(), 20);
    }

    #[test]
    fn chunk_size_does_not_change_output() {
        let ds = dataset(5, 7);
        let reference = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .chunk_size(1000)
            .collect(&mut NoProgress)
            .unwrap();
        for chunk in [1, 3, 7, 200] {
            let other = SiteRecordBuilder::new(&ds, Resolution::Lr)
                .chunk_size(chunk)
                .collect(&mut NoProgress)
                .unwrap();
            assert_eq!(other.0.sites, reference.0.sites);
            assert_eq!(other.1, reference.1);
        }
    }

    #[test]
    fn ids_are_unique_and_match_raster() {
        for encoding in [IdEncoding::Geohash, IdEncoding::Rowcol] {
            let ds = dataset(6, 6);
            let (doc, raster) = SiteRecordBuilder::new(&ds, Resolution::Lr)
                .id_encoding(encoding)
                .collect(&mut NoProgress)
                .unwrap();
            let unique: HashSet<CellId> = doc.sites.iter().map(|s| s.id).collect();
            assert_eq!(unique.len(), doc.sites.len());
            for site in &doc.sites {
                let row = ds.coords().nearest_row(site.lat).unwrap();
                let col = ds.coords().nearest_col(site.lon).unwrap();
                assert_eq!(raster.ids[[row, col]], site.id as i64);
            }
        }
    }

    #[test]
    fn rowcol_ids_survive_bbox_clip() {
        let ds = dataset(6, 6);
        let full = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .id_encoding(IdEncoding::Rowcol)
            .collect(&mut NoProgress)
            .unwrap()
            .0;
        let clipped = ds.clip_to_bbox(&BoundingBox::new(9.0, 50.0, 11.0, 52.0).unwrap());
        let part = SiteRecordBuilder::new(&clipped, Resolution::Lr)
            .id_encoding(IdEncoding::Rowcol)
            .collect(&mut NoProgress)
            .unwrap()
            .0;
        assert_eq!(part.sites.len(), 16);
        for site in &part.sites {
            let same = full.sites.iter().find(|s| s.lat == site.lat && s.lon == site.lon).unwrap();
            assert_eq!(same.id, site.id);
        }
    }

    #[test]
    fn extra_split_adds_fine_top_layer() {
        let ds = dataset(2, 2);
        let (doc, _) = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .extra_split(true)
            .collect(&mut NoProgress)
            .unwrap();
        for site in &doc.sites {
            assert_eq!(site.layers.len(), 6);
            assert_eq!(site.layers[0].depth, Some(20.0));
            assert_eq!(site.layers[0].split, 4);
            assert_eq!(site.layers[1].depth, Some(180.0));
            assert_eq!(site.layers[1].split, 9);
            let total: f64 = site.layers.iter().filter_map(|l| l.depth).sum();
            assert_eq!(total, 1000.0);
        }
    }

    #[test]
    fn cell_missing_sand_is_skipped() {
        let mut grid = full_profile_grid(2, 2);
        let mut sand = grid.get("SDTO").unwrap().clone();
        sand[[1, 0, 1]] = f64::NAN;
        grid.insert("SDTO", sand).unwrap();
        let ds = SoilDataset::isric_wise(grid).unwrap();
        let (doc, raster) = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .collect(&mut NoProgress)
            .unwrap();
        assert_eq!(doc.sites.len(), 3);
        assert_eq!(raster.ids[[0, 1]], ID_NODATA);
        assert_eq!(raster.mask[[0, 1]], 1);
    }

    #[test]
    fn sparse_fixture_without_depths_emits_nothing() {
        let ds = SoilDataset::isric_wise(fake_isric_wise()).unwrap();
        assert_eq!(ds.site_count(), 7);
        let (doc, raster) = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .collect(&mut NoProgress)
            .unwrap();
        assert!(doc.sites.is_empty());
        assert_eq!(raster.mask.sum(), 7);
    }

    #[test]
    fn empty_selection_is_not_an_error() {
        let ds = dataset(3, 3);
        let clipped = ds.clip_to_bbox(&BoundingBox::new(-120.0, -40.0, -100.0, -20.0).unwrap());
        let mut last = 0.0;
        let mut progress = |f: f64| last = f;
        let out = SiteRecordBuilder::new(&clipped, Resolution::Lr)
            .build(&mut progress)
            .unwrap();
        assert_eq!(out.sites, 0);
        assert_eq!(last, 1.0);
        assert!(out.document.contains("<ldndcsite>"));
        assert!(!out.document.contains("<site "));
    }

    #[test]
    fn progress_reaches_one_in_order() {
        let ds = dataset(4, 4);
        let mut seen = Vec::new();
        let mut progress = |f: f64| seen.push(f);
        SiteRecordBuilder::new(&ds, Resolution::Lr)
            .chunk_size(5)
            .collect(&mut progress)
            .unwrap();
        assert_eq!(seen.len(), 5);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[test]
    fn more_than_five_layers_is_fatal() {
        let mut grid = SoilGrid::new(GridCoords::regular(0.25, 0.5, 1, 0.25, 0.5, 1), 6);
        for name in ["PHAQ", "BULK", "CLPC", "SDTO"] {
            grid.insert(name, Array3::from_elem((6, 1, 1), 30.0)).unwrap();
        }
        let ds = SoilDataset::isric_wise(grid).unwrap();
        let err = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .collect(&mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::TooManyLayers { found: 6, max: 5 }));
    }

    #[test]
    fn sample_is_evenly_spaced_and_bounded() {
        let ds = dataset(4, 4);
        let (doc, _) = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .selection(Selection::Sample(4))
            .collect(&mut NoProgress)
            .unwrap();
        let rows: Vec<f64> = doc.sites.iter().map(|s| s.lat).collect();
        assert_eq!(rows, ds.coords().lat);
        let (all, _) = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .selection(Selection::Sample(100))
            .collect(&mut NoProgress)
            .unwrap();
        assert_eq!(all.sites.len(), 16);
    }

    #[test]
    fn id_list_and_id_raster_selections() {
        let ds = dataset(3, 3);
        let (all, _) = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .collect(&mut NoProgress)
            .unwrap();
        let wanted = vec![all.sites[2].id, all.sites[7].id];
        let (picked, _) = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .selection(Selection::Ids(wanted.clone()))
            .collect(&mut NoProgress)
            .unwrap();
        assert_eq!(picked.sites.iter().map(|s| s.id).collect::<Vec<_>>(), wanted);

        let mut raster = Array2::from_elem((3, 3), -1i64);
        raster[[1, 2]] = 42;
        let (custom, companion) = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .selection(Selection::IdRaster(raster))
            .collect(&mut NoProgress)
            .unwrap();
        assert_eq!(custom.sites.len(), 1);
        assert_eq!(custom.sites[0].id, 42);
        assert_eq!(companion.ids[[1, 2]], 42);

        let wrong = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .selection(Selection::IdRaster(Array2::zeros((2, 2))))
            .collect(&mut NoProgress);
        assert!(matches!(wrong, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn coarse_geohash_collisions_are_fatal() {
        let ds = dataset(8, 8);
        let err = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .geohash_precision(2)
            .collect(&mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateId { .. }));

        let (doc, _) = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .geohash_precision(4)
            .collect(&mut NoProgress)
            .unwrap();
        assert_eq!(doc.sites.len(), 64);
    }

    #[test]
    fn repeated_raster_ids_are_fatal() {
        let ds = dataset(3, 3);
        let mut raster = Array2::from_elem((3, 3), -1i64);
        raster[[0, 0]] = 11;
        raster[[2, 1]] = 11;
        let err = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .selection(Selection::IdRaster(raster))
            .collect(&mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateId { id: 11 }));
    }

    #[test]
    fn repeated_coordinate_ids_are_fatal() {
        let ds = dataset(3, 3);
        let points = vec![
            CoordPoint { lat: 52.25, lon: 8.25, id: Some(5) },
            CoordPoint { lat: 51.25, lon: 9.25, id: Some(5) },
        ];
        let err = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .selection(Selection::Coords(points))
            .collect(&mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateId { id: 5 }));
    }

    #[test]
    fn coordinates_snap_to_nearest_cell() {
        let ds = dataset(3, 3);
        let points = vec![
            CoordPoint { lat: 51.3, lon: 8.7, id: Some(7) },
            CoordPoint { lat: 52.2, lon: 8.3, id: None },
            CoordPoint { lat: 51.2, lon: 8.8, id: Some(9) },
            CoordPoint { lat: 10.0, lon: 8.3, id: None },
        ];
        let (doc, _) = SiteRecordBuilder::new(&ds, Resolution::Lr)
            .selection(Selection::Coords(points))
            .collect(&mut NoProgress)
            .unwrap();
        assert_eq!(doc.sites.len(), 2);
        assert_eq!((doc.sites[0].id, doc.sites[0].lat, doc.sites[0].lon), (7, 51.25, 8.75));
        assert_eq!((doc.sites[1].lat, doc.sites[1].lon), (52.25, 8.25));
    }
}
