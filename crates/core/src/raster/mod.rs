//! Raster data structures

mod dataset;
mod element;
mod geotransform;
mod grid;

pub use dataset::RasterDataset;
pub use element::{RasterElement, SampleType};
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
