//! # Proxima Core
//!
//! Core types and GeoTIFF I/O for proximity analysis.
//!
//! This crate provides:
//! - `Raster<T>`: Generic single-band raster grid
//! - `RasterDataset`: Decoded multi-band source with its metadata
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`: Coordinate Reference System handling
//! - A GeoTIFF decoder and a tiled, compressed GeoTIFF encoder

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use io::{Compression, GeoTiffOptions, OutputRaster};
pub use raster::{GeoTransform, Raster, RasterDataset, RasterElement, SampleType};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::io::{Compression, GeoTiffOptions, OutputRaster};
    pub use crate::raster::{GeoTransform, Raster, RasterDataset, RasterElement};
    pub use crate::Algorithm;
}

/// A raster operator with typed input, parameters and output.
pub trait Algorithm {
    type Input;
    type Output;
    type Params: Default;
    type Error: std::error::Error;

    /// Short operator name, used in log lines
    fn name(&self) -> &'static str;

    /// One-line description
    fn description(&self) -> &'static str;

    /// Run the operator
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Run with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
