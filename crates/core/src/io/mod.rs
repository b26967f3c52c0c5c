//! GeoTIFF reading and writing

pub mod cog;
pub mod geokeys;
pub mod ifd;
mod native;
mod output;

pub use cog::{Compression, GeoTiffOptions, DEFAULT_TILE_SIZE};
pub use geokeys::{read_geotiff_meta, GeoTiffMeta};
pub use native::{
    read_dataset, read_dataset_from_buffer, read_geotiff, read_geotiff_from_buffer, write_geotiff,
    write_geotiff_to_buffer,
};
pub use output::{encode_output, OutputRaster};
