//! GeoTIFF georeferencing tags.
//!
//! Reads tags 33550 (ModelPixelScale), 33922 (ModelTiepoint),
//! 34264 (ModelTransformation), 34735/34737 (GeoKeyDirectory and its ASCII
//! params) and 42113 (GDAL_NODATA), and builds the same set for writing.

use crate::crs::CRS;
use crate::error::Result;
use crate::io::ifd::{tags, Directory, OutEntry};
use crate::raster::GeoTransform;

/// GeoKey IDs understood by this crate.
mod keys {
    pub const GT_MODEL_TYPE: u16 = 1024;
    pub const GT_RASTER_TYPE: u16 = 1025;
    pub const GT_CITATION: u16 = 1026;
    pub const GEOGRAPHIC_TYPE: u16 = 2048;
    pub const GEOG_CITATION: u16 = 2049;
    pub const PROJECTED_CS_TYPE: u16 = 3072;
    pub const PCS_CITATION: u16 = 3073;
}

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// GeoTIFF metadata found in the first IFD.
#[derive(Debug, Clone, Default)]
pub struct GeoTiffMeta {
    pub transform: Option<GeoTransform>,
    pub crs: Option<CRS>,
    pub nodata: Option<f64>,
}

/// Extract georeferencing and nodata from an in-memory TIFF.
pub fn read_geotiff_meta(data: &[u8]) -> Result<GeoTiffMeta> {
    let dir = Directory::parse(data)?;
    let geokeys = parse_geokeys(&dir);
    Ok(GeoTiffMeta {
        transform: extract_transform(&dir, &geokeys),
        crs: extract_crs(&geokeys),
        nodata: extract_nodata(&dir),
    })
}

fn extract_transform(dir: &Directory, geokeys: &[(u16, KeyValue)]) -> Option<GeoTransform> {
    let scale = dir.values_f64(tags::MODEL_PIXEL_SCALE);
    let tiepoint = dir.values_f64(tags::MODEL_TIEPOINT);

    let gt = match (&scale, &tiepoint) {
        (Some(scale), Some(tiepoint)) => GeoTransform::from_tiepoint(tiepoint, scale),
        _ => None,
    }
    .or_else(|| {
        dir.values_f64(tags::MODEL_TRANSFORMATION)
            .and_then(|m| GeoTransform::from_model_transformation(&m))
    })?;

    if short_key(geokeys, keys::GT_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT) {
        Some(point_to_area(gt))
    } else {
        Some(gt)
    }
}

/// PixelIsPoint ties model coordinates to pixel centers; move the origin
/// back half a pixel so it names the upper-left corner, as GDAL does.
fn point_to_area(gt: GeoTransform) -> GeoTransform {
    GeoTransform {
        origin_x: gt.origin_x - 0.5 * gt.pixel_width - 0.5 * gt.row_rotation,
        origin_y: gt.origin_y - 0.5 * gt.col_rotation - 0.5 * gt.pixel_height,
        ..gt
    }
}

/// One parsed GeoKey value.
enum KeyValue {
    Short(u16),
    Ascii(String),
}

fn parse_geokeys(dir: &Directory) -> Vec<(u16, KeyValue)> {
    let Some(directory) = dir.values_u64(tags::GEO_KEY_DIRECTORY) else {
        return Vec::new();
    };
    // Header: [version, revision, minor, number_of_keys]
    if directory.len() < 4 {
        return Vec::new();
    }
    let ascii_params = dir.ascii(tags::GEO_ASCII_PARAMS).unwrap_or_default();

    let num_keys = directory[3] as usize;
    directory[4..]
        .chunks_exact(4)
        .take(num_keys)
        .filter_map(|key| {
            let (id, location, count, value) = (key[0] as u16, key[1] as u16, key[2] as usize, key[3] as usize);
            match location {
                0 => Some((id, KeyValue::Short(value as u16))),
                tags::GEO_ASCII_PARAMS => {
                    let text: String = ascii_params.chars().skip(value).take(count).collect();
                    let text = text.trim_end_matches('|').trim().to_string();
                    Some((id, KeyValue::Ascii(text)))
                }
                _ => None,
            }
        })
        .collect()
}

fn short_key(geokeys: &[(u16, KeyValue)], id: u16) -> Option<u16> {
    geokeys.iter().find_map(|(k, v)| match v {
        KeyValue::Short(s) if *k == id && *s > 0 && *s != USER_DEFINED => Some(*s),
        _ => None,
    })
}

fn extract_crs(geokeys: &[(u16, KeyValue)]) -> Option<CRS> {
    let short = |id: u16| short_key(geokeys, id);
    let text = |id: u16| {
        geokeys.iter().find_map(|(k, v)| match v {
            KeyValue::Ascii(s) if *k == id && !s.is_empty() => Some(s.clone()),
            _ => None,
        })
    };

    let model_type = short(keys::GT_MODEL_TYPE);

    if let Some(code) = short(keys::PROJECTED_CS_TYPE) {
        return Some(CRS::from_epsg(code as u32));
    }
    if model_type != Some(MODEL_TYPE_PROJECTED) {
        if let Some(code) = short(keys::GEOGRAPHIC_TYPE) {
            return Some(CRS::geographic_epsg(code as u32));
        }
    }
    if let Some(citation) = text(keys::PCS_CITATION)
        .or_else(|| text(keys::GT_CITATION))
        .or_else(|| text(keys::GEOG_CITATION))
    {
        return Some(CRS::from_wkt(citation));
    }
    // Projected model with only a datum code: better than nothing
    short(keys::GEOGRAPHIC_TYPE).map(|code| CRS::geographic_epsg(code as u32))
}

fn extract_nodata(dir: &Directory) -> Option<f64> {
    dir.ascii(tags::GDAL_NODATA)?.trim().parse::<f64>().ok()
}

/// Tags that georeference an image: transform, GeoKey directory and,
/// when needed, GeoAsciiParams.
pub(crate) fn georeferencing_entries(transform: &GeoTransform, crs: &CRS) -> Vec<OutEntry> {
    let mut entries = Vec::new();

    if transform.is_rotated() {
        entries.push(OutEntry::double(
            tags::MODEL_TRANSFORMATION,
            &transform.to_model_transformation(),
        ));
    } else {
        entries.push(OutEntry::double(
            tags::MODEL_PIXEL_SCALE,
            &[transform.pixel_width, -transform.pixel_height, 0.0],
        ));
        entries.push(OutEntry::double(
            tags::MODEL_TIEPOINT,
            &[0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0],
        ));
    }

    let mut geokeys: Vec<[u16; 4]> = Vec::new();
    let mut ascii = String::new();

    let model_type = if crs.is_geographic() {
        MODEL_TYPE_GEOGRAPHIC
    } else {
        MODEL_TYPE_PROJECTED
    };
    geokeys.push([keys::GT_MODEL_TYPE, 0, 1, model_type]);
    geokeys.push([keys::GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);

    if let Some(wkt) = crs.wkt() {
        // '|' terminates a GeoAsciiParams entry
        let citation = format!("{}|", wkt.replace('|', " "));
        let count = citation.chars().count() as u16;
        geokeys.push([keys::GT_CITATION, tags::GEO_ASCII_PARAMS, count, 0]);
        ascii.push_str(&citation);
    }

    match crs.epsg().and_then(|c| u16::try_from(c).ok()) {
        Some(code) if crs.is_geographic() => {
            geokeys.push([keys::GEOGRAPHIC_TYPE, 0, 1, code]);
        }
        Some(code) => geokeys.push([keys::PROJECTED_CS_TYPE, 0, 1, code]),
        None => {}
    }

    geokeys.sort_by_key(|k| k[0]);
    let mut directory: Vec<u16> = vec![1, 1, 0, geokeys.len() as u16];
    directory.extend(geokeys.iter().flatten());
    entries.push(OutEntry::short(tags::GEO_KEY_DIRECTORY, &directory));

    if !ascii.is_empty() {
        entries.push(OutEntry::ascii(tags::GEO_ASCII_PARAMS, &ascii));
    }

    entries
}
