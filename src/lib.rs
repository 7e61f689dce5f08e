#![doc = r#"
ldndc-site: LandscapeDNDC site files from gridded ISRIC-WISE soil data.

This crate turns a multi-layer soil grid into one LandscapeDNDC site record per
valid grid cell. It derives the number of usable layers per cell, converts source
units into the model's attributes, clips to a bounding box or region outline,
computes field capacity and wilting point with a pedotransfer function and writes
the site XML together with a companion raster (validity mask + cell ids) that
joins the records back to the grid. It powers the `dlsc` CLI and can be embedded
in your own Rust applications.

Requirements
------------
- GDAL development headers and runtime available on your system (netCDF driver
  for reading the soil grid and writing the default companion raster).
- Rust 2024 edition toolchain.

Quick start: soil grid to site file
-----------------------------------
```rust,no_run
use std::path::Path;
use ldndc_site::{
    create_dataset, open_soil_dataset, write_outputs,
    BoundingBox, NoProgress, RasterFormat, Region, Selection, SiteParams,
};

fn main() -> ldndc_site::Result<()> {
    let soil = open_soil_dataset(Path::new("/data/soil/GLOBAL_WISESOIL_S1_LR.nc"))?;
    let region = Region::bbox(BoundingBox::new(5.5, 47.0, 15.5, 55.0)?);

    let output = create_dataset(&soil, &region, &SiteParams::default(), Selection::All, &mut NoProgress)?;
    write_outputs(&output, Path::new("/out/sites.xml"), RasterFormat::NetCdf)?;
    Ok(())
}
```

Building from an in-memory grid
-------------------------------
```rust
use ndarray::Array3;
use ldndc_site::{GridCoords, SoilDataset, SoilGrid, SiteRecordBuilder, NoProgress, Resolution};

fn build(layers: Vec<(&str, Array3<f64>)>) -> ldndc_site::Result<String> {
    let coords = GridCoords::regular(52.25, -0.5, 2, 8.25, 0.5, 2);
    let mut grid = SoilGrid::new(coords, 5);
    for (name, values) in layers {
        grid.insert(name, values)?;
    }
    let soil = SoilDataset::isric_wise(grid)?;
    let output = SiteRecordBuilder::new(&soil, Resolution::Lr)
        .extra_split(true)
        .build(&mut NoProgress)?;
    Ok(output.document)
}
```

Error handling
--------------
All public functions return `ldndc_site::Result<T>`. Schema problems
(`Error::UnknownAttribute`, `Error::MissingRequiredAttribute`) and too many layers
abort a build; cells with incomplete layer data are skipped and logged at debug
level.

```rust,no_run
use std::path::Path;
use ldndc_site::{open_soil_dataset, Error};

fn main() {
    match open_soil_dataset(Path::new("/bad/soil.nc")) {
        Ok(soil) => println!("{} valid cells", soil.site_count()),
        Err(Error::Gdal(e)) => eprintln!("GDAL error: {e}"),
        Err(Error::MissingRequiredAttribute { required }) => eprintln!("not a soil grid: {required}"),
        Err(other) => eprintln!("Other error: {other}"),
    }
}
```

Useful modules
--------------
- [`api`] — high-level entry points.
- [`core`] — grids, schema, units, validity mask, hydraulics, cell ids, site builder.
- [`types`] — enums and shared types (e.g. `Resolution`, `IdEncoding`, `BoundingBox`).
- [`io`] — GDAL readers, coordinate lists, site XML and raster writers.
- [`error`] — crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use core::grid::{GridCoords, SoilGrid};
pub use core::params::{SiteMetadata, SiteParams};
pub use core::progress::{LogProgress, NoProgress, Progress};
pub use core::site::{CompanionRaster, CoordPoint, SiteBuildOutput, SiteRecordBuilder, Selection};
pub use core::soil::SoilDataset;
pub use error::{Error, Result};
pub use types::{BoundingBox, IdEncoding, RasterFormat, Resolution};

// Readers
pub use io::gdal::{GdalError, GdalGridReader, GdalMetadata};

// High-level API re-exports
pub use api::{Region, companion_path, create_dataset, open_soil_dataset, select_region, write_outputs};
