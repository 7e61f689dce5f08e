use clap::Parser;
use std::path::PathBuf;

use ldndc_site::types::{BoundingBox, IdEncoding, RasterFormat, Resolution};

#[derive(Parser)]
#[command(
    name = "dlsc",
    version,
    about = "Create LandscapeDNDC site files from ISRIC-WISE soil grids"
)]
pub struct CliArgs {
    /// Output site file; the companion raster is written next to it as <stem>_mask.nc
    #[arg(default_value = "sites.xml")]
    pub outfile: PathBuf,

    /// Soil grid (netCDF with ISRIC-WISE variables)
    #[arg(long)]
    pub soil: Option<PathBuf>,

    /// Source grid resolution (overrides config)
    #[arg(short, long, value_enum)]
    pub resolution: Option<Resolution>,

    /// Bounding box X1,Y1,X2,Y2 in degrees (lon/lat)
    #[arg(short, long, allow_hyphen_values = true, value_parser = parse_bbox)]
    pub bbox: Option<BoundingBox>,

    /// Vector file with region outlines (e.g. Natural Earth admin-0 countries)
    #[arg(long)]
    pub shape: Option<PathBuf>,

    /// ADM0_A3 codes of the regions to select, joined with '+' (e.g. deu+aut)
    #[arg(long, requires = "shape")]
    pub region: Option<String>,

    /// Coordinate file with lines "lat lon [id]"; only these cells are emitted
    #[arg(short = 'f', long = "file")]
    pub coord_file: Option<PathBuf>,

    /// Cell id encoding (overrides config)
    #[arg(long, value_enum)]
    pub id_encoding: Option<IdEncoding>,

    /// Split the top layer into a 20 mm fine layer and the remainder
    #[arg(long, default_value_t = false)]
    pub extra_split: bool,

    /// Companion raster format
    #[arg(long, value_enum, default_value_t = RasterFormat::NetCdf)]
    pub mask_format: RasterFormat,

    /// Config file (JSON); defaults to ~/.ldndctools/dlsc.json when present
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Store the passed config as the new default
    #[arg(short = 'S', long = "store-config", requires = "config")]
    pub store_config: bool,

    /// Verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

fn parse_bbox(value: &str) -> Result<BoundingBox, String> {
    value.parse::<BoundingBox>().map_err(|e| e.to_string())
}
