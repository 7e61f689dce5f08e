//! Output writers: the site document (`site_xml`) and the companion id/mask
//! raster (`raster`).
pub mod raster;
pub mod site_xml;

pub use raster::write_companion_raster;
pub use site_xml::{render_site_document, write_site_file};
