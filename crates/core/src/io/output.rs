//! Encoded analysis output

use std::path::Path;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::cog::{encode_tiled, Compression, GeoTiffOptions};
use crate::io::native::read_dataset_from_buffer;
use crate::raster::{GeoTransform, Raster, RasterDataset};

/// A single-band float32 GeoTIFF held in memory, plus the metadata it was
/// written with.
#[derive(Debug, Clone)]
pub struct OutputRaster {
    bytes: Vec<u8>,
    width: usize,
    height: usize,
    transform: GeoTransform,
    crs: CRS,
    nodata: Option<f64>,
    compression: Compression,
    tile_size: u32,
}

impl OutputRaster {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &CRS {
        &self.crs
    }

    /// Nodata value recorded in the file's GDAL_NODATA tag
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Write the encoded bytes to disk
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), &self.bytes)?;
        Ok(())
    }

    /// Decode the bytes back into a dataset
    pub fn decode(&self) -> Result<RasterDataset> {
        read_dataset_from_buffer(&self.bytes)
    }
}

/// Encode a composite grid using the reference dataset's dimensions,
/// geotransform and CRS.
pub fn encode_output(
    composite: &Raster<f64>,
    reference: &RasterDataset,
    options: &GeoTiffOptions,
) -> Result<OutputRaster> {
    let (rows, cols) = reference.shape();
    if composite.shape() != (rows, cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: composite.rows(),
            ac: composite.cols(),
        });
    }
    let (transform, crs) = reference.georeference()?;

    let mut grid = Raster::from_array(composite.data().clone());
    grid.set_transform(Some(*transform));
    grid.set_crs(Some(crs.clone()));

    let bytes = encode_tiled(&grid, options)?;

    Ok(OutputRaster {
        bytes,
        width: cols,
        height: rows,
        transform: *transform,
        crs: crs.clone(),
        nodata: options.nodata,
        compression: options.compression,
        tile_size: options.tile_size,
    })
}
