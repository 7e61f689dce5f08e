//! I/O layer: GDAL-backed readers for soil grids and region geometries,
//! the coordinate list reader, and `writers` for the site document and the
//! companion raster.
pub mod coords;
pub use coords::read_coordinate_file;

pub mod gdal;
pub use gdal::{GdalError, GdalGridReader, GdalMetadata, read_region_geometry, read_soil_grid};

pub mod writers;
