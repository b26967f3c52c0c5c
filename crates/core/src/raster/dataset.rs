//! Decoded multi-band source dataset

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, SampleType};
use ndarray::{Array3, ArrayView2, Axis};

/// A decoded source raster with all of its bands.
///
/// Samples are widened to `f64` regardless of the stored type; `dtype`
/// records what the file actually declared. A dataset is owned by the
/// invocation that opened it and is never shared.
#[derive(Debug, Clone)]
pub struct RasterDataset {
    /// Pixel data, shape (bands, rows, cols)
    bands: Array3<f64>,
    dtype: SampleType,
    transform: Option<GeoTransform>,
    crs: Option<CRS>,
    nodata: Option<f64>,
}

impl RasterDataset {
    /// Assemble a dataset from decoded parts
    pub fn new(
        bands: Array3<f64>,
        dtype: SampleType,
        transform: Option<GeoTransform>,
        crs: Option<CRS>,
        nodata: Option<f64>,
    ) -> Result<Self> {
        let (count, rows, cols) = bands.dim();
        if count == 0 || rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        Ok(Self {
            bands,
            dtype,
            transform,
            crs,
            nodata,
        })
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.bands.len_of(Axis(2))
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.bands.len_of(Axis(1))
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.bands.len_of(Axis(0))
    }

    /// Stored sample type
    pub fn dtype(&self) -> SampleType {
        self.dtype
    }

    /// Affine transform, if the source carried one
    pub fn transform(&self) -> Option<&GeoTransform> {
        self.transform.as_ref()
    }

    /// Coordinate reference system, if the source carried one
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Nodata sentinel, if the source declared one
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Borrow one band (0-indexed) as a 2D view
    pub fn band_view(&self, band: usize) -> Result<ArrayView2<'_, f64>> {
        if band >= self.band_count() {
            return Err(Error::invalid_parameter(
                "band",
                band + 1,
                format!("dataset has {} band(s)", self.band_count()),
            ));
        }
        Ok(self.bands.index_axis(Axis(0), band))
    }

    /// Copy one band (0-indexed) out as a georeferenced raster
    pub fn band(&self, band: usize) -> Result<Raster<f64>> {
        let mut raster = Raster::from_array(self.band_view(band)?.to_owned());
        raster.set_transform(self.transform);
        raster.set_crs(self.crs.clone());
        raster.set_nodata(self.nodata);
        Ok(raster)
    }

    /// Transform and CRS together, or [`Error::Georeferencing`] naming what is missing
    pub fn georeference(&self) -> Result<(&GeoTransform, &CRS)> {
        let transform = self
            .transform
            .as_ref()
            .filter(|t| t.is_valid())
            .ok_or_else(|| Error::Georeferencing("source has no usable geotransform".into()))?;
        let crs = self
            .crs
            .as_ref()
            .ok_or_else(|| Error::Georeferencing("source has no coordinate reference system".into()))?;
        Ok((transform, crs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_band() -> RasterDataset {
        let mut data = Array3::<f64>::zeros((2, 3, 4));
        data[[1, 2, 3]] = 7.0;
        RasterDataset::new(
            data,
            SampleType::U8,
            Some(GeoTransform::new(0.0, 3.0, 1.0, -1.0)),
            Some(CRS::from_epsg(2154)),
            Some(255.0),
        )
        .unwrap()
    }

    #[test]
    fn dimensions_and_bands() {
        let ds = two_band();
        assert_eq!(ds.width(), 4);
        assert_eq!(ds.height(), 3);
        assert_eq!(ds.band_count(), 2);
        assert_eq!(ds.band(1).unwrap().get(2, 3).unwrap(), 7.0);
        assert!(ds.band(2).is_err());
    }

    #[test]
    fn band_carries_metadata() {
        let band = two_band().band(0).unwrap();
        assert_eq!(band.nodata(), Some(255.0));
        assert_eq!(band.crs().and_then(|c| c.epsg()), Some(2154));
        assert!(band.georeference().is_ok());
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let err = RasterDataset::new(Array3::zeros((1, 0, 4)), SampleType::F32, None, None, None);
        assert!(err.is_err());
    }
}
