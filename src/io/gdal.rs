use gdal::raster::{RasterizeOptions, rasterize};
use gdal::vector::{Geometry, LayerAccess};
use gdal::{Dataset, DriverManager, Metadata, errors::GdalError as GdalCrateError};
use ndarray::{Array2, Array3};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::grid::{GridCoords, SoilGrid};
use crate::core::schema::AttributeSchema;

/// Errors encountered when using the GDAL readers
#[derive(Debug, Error)]
pub enum GdalError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Dimension mismatch: expected {0}x{1}, got {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),
    #[error("No soil variables of schema {schema} found in {path}")]
    NoSoilVariables { schema: String, path: String },
}

/// Metadata extracted from a GDAL-supported raster
#[derive(Debug, Clone)]
pub struct GdalMetadata {
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    /// Number of raster bands (soil layers)
    pub bands: usize,
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: [f64; 6],
}

/// Reader for one gridded variable, one band per layer
pub struct GdalGridReader {
    pub dataset: Dataset,
    pub metadata: GdalMetadata,
}

impl GdalGridReader {
    /// Open a GDAL raster or subdataset name (e.g. `NETCDF:"soil.nc":PHAQ`)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GdalError> {
        let dataset = Dataset::open(path.as_ref())?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(GdalError::UnsupportedFormat("No raster bands found".into()));
        }
        let geotransform = match dataset.geo_transform() {
            Ok(gt) => gt,
            Err(_) => [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        };
        Ok(GdalGridReader {
            dataset,
            metadata: GdalMetadata {
                size_x: size_x as usize,
                size_y: size_y as usize,
                bands,
                geotransform,
            },
        })
    }

    /// Read one band (1-based) as (height, width); no-data values become NaN
    pub fn read_band(&self, index: usize) -> Result<Array2<f64>, GdalError> {
        if index == 0 || index > self.metadata.bands {
            return Err(GdalError::UnsupportedFormat(format!(
                "Band index {} out of range",
                index
            )));
        }
        let band = self.dataset.rasterband(index)?;
        let window = (self.metadata.size_x, self.metadata.size_y);
        let buf = band.read_as::<f64>((0, 0), window, window, None)?;
        let nodata = band.no_data_value();
        let data_vec: Vec<f64> = buf
            .data()
            .iter()
            .map(|&v| match nodata {
                Some(nd) if v == nd => f64::NAN,
                _ => v,
            })
            .collect();
        let found = data_vec.len();
        Array2::from_shape_vec((self.metadata.size_y, self.metadata.size_x), data_vec).map_err(
            |_| {
                GdalError::DimensionMismatch(
                    self.metadata.size_x,
                    self.metadata.size_y,
                    found,
                    1,
                )
            },
        )
    }

    /// Read all bands as (layer, height, width)
    pub fn read_layers(&self) -> Result<Array3<f64>, GdalError> {
        let (rows, cols) = (self.metadata.size_y, self.metadata.size_x);
        let mut out = Array3::<f64>::zeros((self.metadata.bands, rows, cols));
        for (k, mut layer) in out.outer_iter_mut().enumerate() {
            layer.assign(&self.read_band(k + 1)?);
        }
        Ok(out)
    }

    /// Cell-centre coordinates from the geotransform
    pub fn coords(&self) -> GridCoords {
        GridCoords::from_geotransform(
            &self.metadata.geotransform,
            self.metadata.size_x,
            self.metadata.size_y,
        )
    }
}

/// `(variable, subdataset name)` pairs listed in the SUBDATASETS domain
fn list_subdatasets(dataset: &Dataset) -> Vec<(String, String)> {
    dataset
        .metadata_domain("SUBDATASETS")
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| entry.split_once('='))
        .filter(|(key, _)| key.ends_with("_NAME"))
        .map(|(_, name)| {
            let var = name.rsplit(':').next().unwrap_or(name).trim_matches('"');
            (var.to_string(), name.to_string())
        })
        .collect()
}

/// Read every variable of `schema` found in a soil grid file.
///
/// Multi-variable containers (netCDF) are read per subdataset; variables the schema
/// does not declare are skipped. A plain single-variable raster is read under its
/// file stem (e.g. `PHAQ.tif`).
pub fn read_soil_grid(path: &Path, schema: &AttributeSchema) -> crate::Result<SoilGrid> {
    let dataset = Dataset::open(path)?;
    let mut sources: Vec<(String, String)> = list_subdatasets(&dataset);
    if sources.is_empty() {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        sources.push((stem, path.to_string_lossy().into_owned()));
    }

    let mut grid: Option<SoilGrid> = None;
    for (var, name) in sources {
        if !schema.is_source(&var) {
            debug!("Skipping variable {} (not part of {})", var, schema.name);
            continue;
        }
        let reader = GdalGridReader::open(&name)?;
        let layers = reader.read_layers()?;
        let target =
            grid.get_or_insert_with(|| SoilGrid::new(reader.coords(), reader.metadata.bands));
        target.insert(var.clone(), layers)?;
        debug!("Read {} ({} layers)", var, reader.metadata.bands);
    }

    let grid = grid.ok_or_else(|| GdalError::NoSoilVariables {
        schema: schema.name.to_string(),
        path: path.display().to_string(),
    })?;
    info!(
        "Loaded {} variables on a {}x{} grid from {}",
        grid.names().count(),
        grid.shape().0,
        grid.shape().1,
        path.display()
    );
    Ok(grid)
}

/// Cells of `coords` covered by `geometries`, burned through an in-memory raster
pub fn rasterize_geometry(
    coords: &GridCoords,
    geometries: &[Geometry],
    all_touched: bool,
    fallback_res: f64,
) -> crate::Result<Array2<bool>> {
    let (rows, cols) = coords.shape();
    if coords.is_empty() || geometries.is_empty() {
        return Ok(Array2::from_elem((rows, cols), false));
    }
    let driver = DriverManager::get_driver_by_name("MEM")?;
    let mut ds = driver.create_with_band_type::<u8, _>("", cols, rows, 1)?;
    ds.set_geo_transform(&coords.geotransform(fallback_res))?;

    let burn_values = vec![1.0; geometries.len()];
    let options = RasterizeOptions {
        all_touched,
        ..Default::default()
    };
    rasterize(&mut ds, &[1], geometries, &burn_values, Some(options))?;

    let band = ds.rasterband(1)?;
    let buf = band.read_as::<u8>((0, 0), (cols, rows), (cols, rows), None)?;
    let covered: Vec<bool> = buf.data().iter().map(|&v| v > 0).collect();
    Array2::from_shape_vec((rows, cols), covered)
        .map_err(|_| GdalError::DimensionMismatch(cols, rows, buf.data().len(), 1).into())
}

/// Country codes from a `+`-joined list, e.g. `deu+aut` -> `["DEU", "AUT"]`
pub fn parse_region_codes(codes: &str) -> Vec<String> {
    codes
        .split('+')
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Geometries of the first vector layer in `path`, optionally only features whose
/// `ADM0_A3` code is in `codes`
pub fn read_region_geometry(path: &Path, codes: &[String]) -> crate::Result<Vec<Geometry>> {
    let dataset = Dataset::open(path)?;
    let mut layer = dataset.layer(0)?;
    if !codes.is_empty() {
        let quoted: Vec<String> = codes
            .iter()
            .map(|c| format!("'{}'", c.replace('\'', "''")))
            .collect();
        layer.set_attribute_filter(&format!("ADM0_A3 IN ({})", quoted.join(",")))?;
    }
    let geometries: Vec<Geometry> = layer
        .features()
        .filter_map(|feature| feature.geometry().cloned())
        .collect();
    if geometries.is_empty() {
        warn!("No region geometry matched {:?} in {}", codes, path.display());
    } else {
        info!("Selected {} region geometries from {}", geometries.len(), path.display());
    }
    Ok(geometries)
}
