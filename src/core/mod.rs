//! Core building blocks of the site pipeline: gridded data (`grid`), attribute
//! schema and units, the layer validity mask, the `SoilDataset`, the hydraulic
//! model, cell ids, layer records and the `SiteRecordBuilder`. These are
//! consumed by the high-level `api` module.
pub mod cellid;
pub mod grid;
pub mod hydraulics;
pub mod layer;
pub mod mask;
pub mod params;
pub mod progress;
pub mod schema;
pub mod site;
pub mod soil;
pub mod units;

#[cfg(test)]
pub(crate) mod fixtures;
