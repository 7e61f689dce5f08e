use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use ldndc_site::api::{Region, create_dataset, open_soil_dataset, write_outputs};
use ldndc_site::core::params::SiteParams;
use ldndc_site::core::progress::LogProgress;
use ldndc_site::core::site::Selection;
use ldndc_site::io::coords::read_coordinate_file;
use ldndc_site::io::gdal::{parse_region_codes, read_region_geometry};

use super::args::CliArgs;
use super::errors::AppError;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Config file from `-c`, else the stored default, else built-in defaults
fn load_params(args: &CliArgs) -> Result<SiteParams, AppError> {
    if let Some(path) = &args.config {
        let params = SiteParams::load(path)?;
        info!("Using config {:?}", path);
        if args.store_config {
            if let Some(default_path) = SiteParams::default_path() {
                params.store(&default_path)?;
                info!("Stored config as new default {:?}", default_path);
            }
        }
        return Ok(params);
    }
    match SiteParams::default_path() {
        Some(path) if path.is_file() => {
            info!("Using default config {:?}", path);
            Ok(SiteParams::load(&path)?)
        }
        _ => Ok(SiteParams::default()),
    }
}

fn resolve_region(args: &CliArgs) -> Result<Region, AppError> {
    let Some(shape) = &args.shape else {
        return Ok(Region {
            bbox: args.bbox,
            ..Default::default()
        });
    };
    let codes = args.region.as_deref().map(parse_region_codes).unwrap_or_default();
    let geometries = read_region_geometry(shape, &codes)?;
    if geometries.is_empty() {
        return Err(AppError::UnknownRegion {
            codes: args.region.clone().unwrap_or_default(),
            path: shape.display().to_string(),
        });
    }
    Ok(Region::geometries(geometries, args.bbox))
}

fn resolve_selection(coord_file: Option<&Path>) -> Result<Selection, AppError> {
    let Some(path) = coord_file else {
        return Ok(Selection::All);
    };
    let points = read_coordinate_file(path)?;
    if points.is_empty() {
        return Err(AppError::EmptyCoordinateFile {
            path: path.display().to_string(),
        });
    }
    Ok(Selection::Coords(points))
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.verbose);

    let mut params = load_params(&args)?;
    if let Some(resolution) = args.resolution {
        params.resolution = resolution;
    }
    if let Some(encoding) = args.id_encoding {
        params.id_encoding = encoding;
    }
    params.extra_split |= args.extra_split;

    let soil_path = args.soil.as_deref().ok_or(AppError::MissingArgument {
        arg: "--soil".to_string(),
    })?;
    info!("Soil grid: {:?} ({})", soil_path, params.resolution);
    let soil = open_soil_dataset(soil_path)?;

    let region = resolve_region(&args)?;
    let selection = resolve_selection(args.coord_file.as_deref())?;

    let mut progress = LogProgress::new("Building sites");
    let output = create_dataset(&soil, &region, &params, selection, &mut progress)?;

    let raster_path = write_outputs(&output, &args.outfile, args.mask_format)?;
    info!("Wrote {} sites to {:?}", output.sites, args.outfile);
    if let Some(path) = raster_path {
        info!("Companion raster: {:?}", path);
    }
    Ok(())
}
