//! Tiled, compressed GeoTIFF writer.
//!
//! Produces a single-band float32 GeoTIFF laid out the way Cloud Optimized
//! GeoTIFF readers expect: header, one IFD with all tag values, then the tile
//! data. Tiles are square, row-major, and edge tiles are padded to full size.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Error, Result};
use crate::io::geokeys::georeferencing_entries;
use crate::io::ifd::{self, tags, OutEntry};
use crate::raster::{Raster, RasterElement};

/// Default tile edge in pixels
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Lossless tile compression schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    None,
    #[default]
    Deflate,
    Lzw,
}

impl Compression {
    /// TIFF compression tag value
    pub fn code(&self) -> u16 {
        match self {
            Compression::None => 1,
            Compression::Lzw => 5,
            Compression::Deflate => 8,
        }
    }

    fn compress(&self, raw: Vec<u8>) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(raw),
            Compression::Deflate => {
                let mut encoder =
                    flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&raw)?;
                Ok(encoder.finish()?)
            }
            Compression::Lzw => {
                weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
                    .encode(&raw)
                    .map_err(|e| Error::Encode(format!("LZW: {}", e)))
            }
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Compression::None => "NONE",
            Compression::Deflate => "DEFLATE",
            Compression::Lzw => "LZW",
        })
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "deflate" | "zip" => Ok(Compression::Deflate),
            "lzw" => Ok(Compression::Lzw),
            other => Err(Error::invalid_parameter(
                "compression",
                other,
                "use deflate, lzw or none",
            )),
        }
    }
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Tile compression
    pub compression: Compression,
    /// Tile edge in pixels; must be a positive multiple of 16
    pub tile_size: u32,
    /// Value recorded in the GDAL_NODATA tag and used to pad edge tiles
    pub nodata: Option<f64>,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Deflate,
            tile_size: DEFAULT_TILE_SIZE,
            nodata: Some(-9999.0),
        }
    }
}

impl GeoTiffOptions {
    /// Tile size must be a positive multiple of 16 and nodata must fit in f32
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 || self.tile_size % 16 != 0 {
            return Err(Error::invalid_parameter(
                "tile_size",
                self.tile_size,
                "tile size must be a positive multiple of 16",
            ));
        }
        if let Some(nd) = self.nodata {
            if nd.is_finite() && (nd as f32).is_infinite() {
                return Err(Error::invalid_parameter(
                    "nodata",
                    nd,
                    "nodata must be representable as float32",
                ));
            }
        }
        Ok(())
    }
}

/// Encode a georeferenced raster as a tiled float32 GeoTIFF.
///
/// The raster must carry both a transform and a CRS.
pub fn encode_tiled<T: RasterElement>(raster: &Raster<T>, options: &GeoTiffOptions) -> Result<Vec<u8>> {
    options.validate()?;
    let (transform, crs) = raster.georeference()?;

    let (rows, cols) = raster.shape();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    let width = u32::try_from(cols).map_err(|_| Error::Encode("width exceeds u32".into()))?;
    let height = u32::try_from(rows).map_err(|_| Error::Encode("height exceeds u32".into()))?;

    let ts = options.tile_size as usize;
    let tiles_across = cols.div_ceil(ts);
    let tiles_down = rows.div_ceil(ts);
    let pad = options.nodata.unwrap_or(0.0) as f32;

    let data = raster.data();
    let mut tiles: Vec<Vec<u8>> = Vec::with_capacity(tiles_across * tiles_down);
    for tile_row in 0..tiles_down {
        for tile_col in 0..tiles_across {
            let mut raw = Vec::with_capacity(ts * ts * 4);
            for r in tile_row * ts..(tile_row + 1) * ts {
                for c in tile_col * ts..(tile_col + 1) * ts {
                    let v = if r < rows && c < cols {
                        data[(r, c)].to_f64().map_or(f32::NAN, |v| v as f32)
                    } else {
                        pad
                    };
                    raw.extend_from_slice(&v.to_le_bytes());
                }
            }
            tiles.push(options.compression.compress(raw)?);
        }
    }

    let byte_counts = tiles
        .iter()
        .map(|t| u32::try_from(t.len()))
        .collect::<std::result::Result<Vec<u32>, _>>()
        .map_err(|_| Error::Encode("tile exceeds 4 GiB".into()))?;

    let mut entries = vec![
        OutEntry::long(tags::IMAGE_WIDTH, &[width]),
        OutEntry::long(tags::IMAGE_LENGTH, &[height]),
        OutEntry::short(tags::BITS_PER_SAMPLE, &[32]),
        OutEntry::short(tags::COMPRESSION, &[options.compression.code()]),
        // BlackIsZero
        OutEntry::short(tags::PHOTOMETRIC, &[1]),
        OutEntry::short(tags::SAMPLES_PER_PIXEL, &[1]),
        OutEntry::short(tags::PLANAR_CONFIG, &[1]),
        OutEntry::long(tags::TILE_WIDTH, &[options.tile_size]),
        OutEntry::long(tags::TILE_LENGTH, &[options.tile_size]),
        // Placeholder with the right length; patched once the layout is known
        OutEntry::long(tags::TILE_OFFSETS, &vec![0; tiles.len()]),
        OutEntry::long(tags::TILE_BYTE_COUNTS, &byte_counts),
        // IEEE floating point
        OutEntry::short(tags::SAMPLE_FORMAT, &[3]),
    ];
    entries.extend(georeferencing_entries(transform, crs));
    if let Some(nd) = options.nodata {
        entries.push(OutEntry::ascii(tags::GDAL_NODATA, &format_nodata(nd)));
    }
    entries.sort_by_key(|e| e.tag);

    const HEADER_LEN: usize = 8;
    let external: usize = entries.iter().map(OutEntry::external_len).sum();
    let data_start = HEADER_LEN + ifd::ifd_table_len(entries.len()) + external;

    let mut offsets = Vec::with_capacity(tiles.len());
    let mut cursor = data_start as u64;
    for tile in &tiles {
        offsets.push(
            u32::try_from(cursor)
                .map_err(|_| Error::Encode("output exceeds the 4 GiB classic TIFF limit".into()))?,
        );
        cursor += tile.len() as u64;
    }
    if cursor > u32::MAX as u64 {
        return Err(Error::Encode("output exceeds the 4 GiB classic TIFF limit".into()));
    }
    if let Some(entry) = entries.iter_mut().find(|e| e.tag == tags::TILE_OFFSETS) {
        *entry = OutEntry::long(tags::TILE_OFFSETS, &offsets);
    }

    let mut out = Vec::with_capacity(cursor as usize);
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&(HEADER_LEN as u32).to_le_bytes());
    ifd::write_ifd(&mut out, &entries)?;
    debug_assert_eq!(out.len(), data_start);
    for tile in &tiles {
        out.extend_from_slice(tile);
    }

    debug!(
        "Encoded {}x{} raster as {} {} tile(s) of {}px, {} bytes",
        cols,
        rows,
        tiles.len(),
        options.compression,
        options.tile_size,
        out.len()
    );

    Ok(out)
}

fn format_nodata(nd: f64) -> String {
    if nd.is_nan() {
        "nan".to_string()
    } else {
        format!("{}", nd)
    }
}
