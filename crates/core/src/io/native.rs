//! Native GeoTIFF reading and writing
//!
//! Pixel decoding goes through the `tiff` crate; georeferencing tags are read
//! from the raw directory so any tag the decoder does not model is still seen.

use crate::error::{Error, Result};
use crate::io::cog::{encode_tiled, GeoTiffOptions};
use crate::io::geokeys::read_geotiff_meta;
use crate::io::ifd::{tags, Directory};
use crate::raster::{Raster, RasterDataset, RasterElement, SampleType};
use ndarray::Array3;
use std::io::Cursor;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tracing::debug;

/// Read every band of a GeoTIFF file
pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<RasterDataset> {
    let bytes = std::fs::read(path.as_ref())?;
    read_dataset_from_buffer(&bytes)
}

/// Decode every band of an in-memory GeoTIFF.
///
/// Chunky (pixel-interleaved) and planar layouts are both accepted. Samples
/// are widened to `f64`.
pub fn read_dataset_from_buffer(data: &[u8]) -> Result<RasterDataset> {
    let dir = Directory::parse(data)?;
    let meta = read_geotiff_meta(data)?;
    let samples = dir.value_u64(tags::SAMPLES_PER_PIXEL).unwrap_or(1).max(1) as usize;
    let planar = dir.value_u64(tags::PLANAR_CONFIG).unwrap_or(1);

    let mut decoder = Decoder::new(Cursor::new(data))
        .map_err(|e| Error::Decode(format!("TIFF decode error: {}", e)))?
        .with_limits(Limits::unlimited());

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Decode(format!("Cannot read dimensions: {}", e)))?;
    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Decode(format!("Cannot read image data: {}", e)))?;

    let (dtype, values) = widen(result)?;

    let pixels = rows * cols;
    if pixels == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    // Some decoders return only the first plane of a planar image
    let bands = if values.len() == pixels * samples {
        samples
    } else if values.len() % pixels == 0 {
        values.len() / pixels
    } else {
        return Err(Error::Decode(format!(
            "decoded {} samples for a {}x{} image with {} sample(s) per pixel",
            values.len(),
            cols,
            rows,
            samples
        )));
    };

    let array = if bands == 1 || planar == 2 {
        Array3::from_shape_vec((bands, rows, cols), values)
            .map_err(|e| Error::Decode(e.to_string()))?
    } else {
        Array3::from_shape_fn((bands, rows, cols), |(b, r, c)| {
            values[(r * cols + c) * bands + b]
        })
    };

    debug!(
        "Decoded {}x{} GeoTIFF with {} {} band(s), crs={}",
        cols,
        rows,
        bands,
        dtype,
        meta.crs.as_ref().map_or_else(|| "none".to_string(), |c| c.to_string())
    );

    RasterDataset::new(array, dtype, meta.transform, meta.crs, meta.nodata)
}

fn widen(result: DecodingResult) -> Result<(SampleType, Vec<f64>)> {
    fn all<T: Copy + Into<f64>>(buf: Vec<T>) -> Vec<f64> {
        buf.into_iter().map(Into::into).collect()
    }

    Ok(match result {
        DecodingResult::U8(buf) => (SampleType::U8, all(buf)),
        DecodingResult::U16(buf) => (SampleType::U16, all(buf)),
        DecodingResult::U32(buf) => (SampleType::U32, all(buf)),
        DecodingResult::I8(buf) => (SampleType::I8, all(buf)),
        DecodingResult::I16(buf) => (SampleType::I16, all(buf)),
        DecodingResult::I32(buf) => (SampleType::I32, all(buf)),
        DecodingResult::F32(buf) => (SampleType::F32, all(buf)),
        DecodingResult::F64(buf) => (SampleType::F64, buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    })
}

/// Read a single band of a GeoTIFF file into a Raster
///
/// `band` is 0-indexed and defaults to the first band.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let bytes = std::fs::read(path.as_ref())?;
    read_geotiff_from_buffer(&bytes, band)
}

/// Read a single band of an in-memory GeoTIFF into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    let dataset = read_dataset_from_buffer(data)?;
    let source = dataset.band(band.unwrap_or(0))?;

    let values = source.data().mapv(T::from_f64_or_nodata);
    let mut raster = Raster::from_array(values);
    raster.set_transform(source.transform().copied());
    raster.set_crs(source.crs().cloned());
    raster.set_nodata(dataset.nodata().map(T::from_f64_or_nodata));
    Ok(raster)
}

/// Write a Raster to a tiled GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let bytes = write_geotiff_to_buffer(raster, options)?;
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

/// Write a Raster to an in-memory tiled GeoTIFF
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    encode_tiled(raster, &options.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CRS;
    use crate::io::cog::Compression;
    use crate::raster::GeoTransform;
    use approx::assert_relative_eq;
    use tiff::encoder::{colortype, TiffEncoder};

    fn gradient(rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::from_vec(
            (0..rows * cols).map(|i| i as f64 * 0.25 - 3.0).collect(),
            rows,
            cols,
        )
        .unwrap();
        r.set_transform(Some(GeoTransform::new(700_000.0, 6_600_000.0, 25.0, -25.0)));
        r.set_crs(Some(CRS::from_epsg(2154)));
        r
    }

    fn assert_same_pixels(expected: &Raster<f64>, actual: &Raster<f64>) {
        assert_eq!(expected.shape(), actual.shape());
        for (a, b) in expected.data().iter().zip(actual.data().iter()) {
            assert_eq!((*a as f32).to_bits(), (*b as f32).to_bits());
        }
    }

    #[test]
    fn multi_tile_roundtrip_keeps_pixels_and_georeferencing() {
        let raster = gradient(270, 300);
        let bytes = write_geotiff_to_buffer(&raster, None).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes, None).unwrap();

        assert_same_pixels(&raster, &back);
        assert_eq!(back.crs(), raster.crs());
        let gt = back.transform().unwrap();
        assert_relative_eq!(gt.origin_x, 700_000.0);
        assert_relative_eq!(gt.origin_y, 6_600_000.0);
        assert_relative_eq!(gt.pixel_width, 25.0);
        assert_relative_eq!(gt.pixel_height, -25.0);
        assert_eq!(back.nodata(), Some(-9999.0));
    }

    #[test]
    fn lzw_and_uncompressed_roundtrip() {
        let raster = gradient(40, 33);
        for compression in [Compression::Lzw, Compression::None] {
            let opts = GeoTiffOptions {
                compression,
                tile_size: 32,
                nodata: None,
            };
            let bytes = write_geotiff_to_buffer(&raster, Some(opts)).unwrap();
            let back: Raster<f64> = read_geotiff_from_buffer(&bytes, None).unwrap();
            assert_same_pixels(&raster, &back);
            assert_eq!(back.nodata(), None);
        }
    }

    #[test]
    fn file_roundtrip_with_wkt_crs() {
        let mut raster = gradient(8, 8);
        raster.set_crs(Some(CRS::from_wkt("LOCAL_CS[\"plant grid\"]")));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");

        write_geotiff(&raster, &path, None).unwrap();
        let back: Raster<f64> = read_geotiff(&path, Some(0)).unwrap();

        assert_same_pixels(&raster, &back);
        assert_eq!(back.crs().and_then(|c| c.wkt()), Some("LOCAL_CS[\"plant grid\"]"));
    }

    #[test]
    fn chunky_rgb_is_split_into_bands() {
        let mut buf = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut buf)).unwrap();
            // 2x2 pixels, channel b of pixel p holds p * 10 + b
            let data: Vec<u8> = (0..4u8).flat_map(|p| (0..3u8).map(move |b| p * 10 + b)).collect();
            encoder.write_image::<colortype::RGB8>(2, 2, &data).unwrap();
        }

        let ds = read_dataset_from_buffer(&buf).unwrap();
        assert_eq!(ds.band_count(), 3);
        assert_eq!(ds.dtype(), SampleType::U8);
        assert_eq!(ds.shape(), (2, 2));
        let green = ds.band_view(1).unwrap();
        assert_eq!(green[(1, 0)], 21.0);
        assert_eq!(green[(1, 1)], 31.0);
        assert!(ds.transform().is_none());
        assert!(ds.crs().is_none());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = read_dataset_from_buffer(b"not a tiff at all").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
