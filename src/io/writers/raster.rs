//! Companion raster writer: band 1 `mask` (1 valid, 0 not), band 2 `ids` (no-data -1).
use std::path::Path;

use gdal::cpl::CslStringList;
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{DriverManager, Metadata};
use tracing::info;

use crate::core::site::{CompanionRaster, ID_NODATA};
use crate::error::{Error, Result};

/// Creation options used per GDAL driver
fn creation_options(driver_name: &str) -> Result<CslStringList> {
    let mut options = CslStringList::new();
    match driver_name {
        "netCDF" => {
            options.add_string("FORMAT=NC4")?;
            options.add_string("COMPRESS=DEFLATE")?;
        }
        "GTiff" => options.add_string("COMPRESS=DEFLATE")?,
        _ => {}
    }
    Ok(options)
}

/// Write `raster` with the GDAL driver `driver_name` (e.g. `netCDF`, `GTiff`)
pub fn write_companion_raster(raster: &CompanionRaster, path: &Path, driver_name: &str) -> Result<()> {
    let (rows, cols) = raster.coords.shape();
    if rows == 0 || cols == 0 {
        return Err(Error::invalid("companion raster", "empty grid"));
    }
    let ids: Vec<i32> = raster
        .ids
        .iter()
        .map(|&id| i32::try_from(id).map_err(|_| Error::IdOverflow { id: id as u64 }))
        .collect::<Result<_>>()?;
    let mask: Vec<i32> = raster.mask.iter().map(|&m| i32::from(m)).collect();

    let driver = DriverManager::get_driver_by_name(driver_name)?;
    let options = creation_options(driver_name)?;
    let mut ds = driver.create_with_band_type_with_options::<i32, _>(path, cols, rows, 2, &options)?;
    ds.set_geo_transform(&raster.coords.geotransform(raster.cell_size))?;
    let srs = SpatialRef::from_epsg(4326)?;
    ds.set_projection(&srs.to_wkt()?)?;

    let mut mask_band = ds.rasterband(1)?;
    mask_band.set_metadata_item("NETCDF_VARNAME", "mask", "")?;
    let mut mask_buf = Buffer::new((cols, rows), mask);
    mask_band.write((0, 0), (cols, rows), &mut mask_buf)?;

    let mut id_band = ds.rasterband(2)?;
    id_band.set_metadata_item("NETCDF_VARNAME", "ids", "")?;
    id_band.set_no_data_value(Some(ID_NODATA as f64))?;
    let mut id_buf = Buffer::new((cols, rows), ids);
    id_band.write((0, 0), (cols, rows), &mut id_buf)?;

    info!("Wrote companion raster {} ({})", path.display(), driver_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::GridCoords;
    use gdal::Dataset;
    use ndarray::{Array2, array};

    fn raster() -> CompanionRaster {
        CompanionRaster {
            coords: GridCoords::regular(52.25, -0.5, 2, 8.25, 0.5, 3),
            cell_size: 0.5,
            mask: array![[1, 1, 0], [0, 1, 1]],
            ids: array![[5, -1, -1], [-1, 7, 8]],
        }
    }

    #[test]
    fn geotiff_roundtrip_keeps_ids_and_georeference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sites_mask.tif");
        write_companion_raster(&raster(), &path, "GTiff").unwrap();

        let ds = Dataset::open(&path).unwrap();
        assert_eq!(ds.raster_count() as usize, 2);
        let gt = ds.geo_transform().unwrap();
        assert_eq!(gt[0], 8.0);
        assert_eq!(gt[3], 52.5);

        let ids = ds.rasterband(2).unwrap();
        assert_eq!(ids.no_data_value(), Some(-1.0));
        let buf = ids.read_as::<i32>((0, 0), (3, 2), (3, 2), None).unwrap();
        assert_eq!(buf.data(), &[5, -1, -1, -1, 7, 8]);

        let mask = ds.rasterband(1).unwrap();
        let buf = mask.read_as::<i32>((0, 0), (3, 2), (3, 2), None).unwrap();
        assert_eq!(buf.data(), &[1, 1, 0, 0, 1, 1]);
    }

    #[test]
    fn ids_beyond_i32_overflow() {
        let mut r = raster();
        r.ids[[0, 0]] = i64::from(i32::MAX) + 1;
        let dir = tempfile::tempdir().unwrap();
        let err = write_companion_raster(&r, &dir.path().join("x.tif"), "GTiff").unwrap_err();
        assert!(matches!(err, Error::IdOverflow { .. }));
    }

    #[test]
    fn empty_grid_is_rejected() {
        let r = CompanionRaster {
            coords: GridCoords::new(vec![], vec![]),
            cell_size: 0.5,
            mask: Array2::zeros((0, 0)),
            ids: Array2::zeros((0, 0)),
        };
        let dir = tempfile::tempdir().unwrap();
        assert!(write_companion_raster(&r, &dir.path().join("x.tif"), "GTiff").is_err());
    }
}
