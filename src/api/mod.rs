//! High-level library API: open a soil grid, restrict it to a region, build the
//! site records and write the site document plus its companion raster. Prefer
//! these entrypoints over the low-level `core` modules when integrating.
use std::path::{Path, PathBuf};

use gdal::vector::Geometry;
use tracing::info;

use crate::core::params::SiteParams;
use crate::core::progress::Progress;
use crate::core::schema::ISRIC_WISE;
use crate::core::site::{SiteBuildOutput, SiteRecordBuilder, Selection};
use crate::core::soil::SoilDataset;
use crate::error::Result;
use crate::io::gdal::read_soil_grid;
use crate::io::writers::{write_companion_raster, write_site_file};
use crate::types::{BoundingBox, RasterFormat};

/// Spatial restriction applied before building
#[derive(Debug, Clone, Default)]
pub struct Region {
    /// Applied first; drops rows and columns outside the box
    pub bbox: Option<BoundingBox>,
    /// Cells outside every geometry are masked; empty means no geometry clip
    pub geometries: Vec<Geometry>,
    /// Count cells touched by a geometry outline as covered
    pub all_touched: bool,
}

impl Region {
    pub fn bbox(bbox: BoundingBox) -> Self {
        Self {
            bbox: Some(bbox),
            ..Default::default()
        }
    }

    /// Geometries with their bounding box; cells touched by the outline count
    pub fn geometries(geometries: Vec<Geometry>, bbox: Option<BoundingBox>) -> Self {
        Self {
            bbox,
            geometries,
            all_touched: true,
        }
    }
}

/// Open an ISRIC-WISE soil grid
pub fn open_soil_dataset(path: &Path) -> Result<SoilDataset> {
    SoilDataset::isric_wise(read_soil_grid(path, &ISRIC_WISE)?)
}

/// Clip a dataset to `region`
pub fn select_region(soil: &SoilDataset, region: &Region) -> Result<SoilDataset> {
    let clipped = match &region.bbox {
        Some(bbox) => soil.clip_to_bbox(bbox),
        None => soil.clone(),
    };
    if region.geometries.is_empty() {
        return Ok(clipped);
    }
    clipped.clip_to_geometry(&region.geometries, region.all_touched)
}

/// Clip, then build the site document and companion raster
pub fn create_dataset(
    soil: &SoilDataset,
    region: &Region,
    params: &SiteParams,
    selection: Selection,
    progress: &mut dyn Progress,
) -> Result<SiteBuildOutput> {
    let selected = select_region(soil, region)?;
    info!("{} valid cells in selection", selected.site_count());
    SiteRecordBuilder::from_params(&selected, params)
        .selection(selection)
        .build(progress)
}

/// `<stem>_mask.<ext>` next to the site file
pub fn companion_path(site_path: &Path, format: RasterFormat) -> PathBuf {
    let stem = site_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sites".to_string());
    site_path.with_file_name(format!("{}_mask.{}", stem, format.extension()))
}

/// Write the document to `site_path` and the raster next to it. Returns the raster
/// path, or `None` if the selection was empty and no raster was written.
pub fn write_outputs(
    output: &SiteBuildOutput,
    site_path: &Path,
    format: RasterFormat,
) -> Result<Option<PathBuf>> {
    write_site_file(site_path, &output.document)?;
    if output.raster.coords.is_empty() {
        info!("Empty selection, no companion raster written");
        return Ok(None);
    }
    let raster_path = companion_path(site_path, format);
    write_companion_raster(&output.raster, &raster_path, format.driver_name())?;
    Ok(Some(raster_path))
}
