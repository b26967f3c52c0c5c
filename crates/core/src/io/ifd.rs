//! Minimal TIFF IFD reader and writer.
//!
//! Reading walks the first IFD of an in-memory TIFF (classic or BigTIFF) and
//! resolves tag values straight from the buffer; pixel decoding is left to
//! the `tiff` crate. Writing serializes a single IFD for the tiled encoder.

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::{Error, Result};

/// Byte order of the TIFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffByteOrder {
    LittleEndian,
    BigEndian,
}

/// Well-known TIFF tag IDs.
pub mod tags {
    pub const IMAGE_WIDTH: u16 = 256;
    pub const IMAGE_LENGTH: u16 = 257;
    pub const BITS_PER_SAMPLE: u16 = 258;
    pub const COMPRESSION: u16 = 259;
    pub const PHOTOMETRIC: u16 = 262;
    pub const SAMPLES_PER_PIXEL: u16 = 277;
    pub const PLANAR_CONFIG: u16 = 284;
    pub const TILE_WIDTH: u16 = 322;
    pub const TILE_LENGTH: u16 = 323;
    pub const TILE_OFFSETS: u16 = 324;
    pub const TILE_BYTE_COUNTS: u16 = 325;
    pub const SAMPLE_FORMAT: u16 = 339;
    pub const MODEL_PIXEL_SCALE: u16 = 33550;
    pub const MODEL_TIEPOINT: u16 = 33922;
    pub const MODEL_TRANSFORMATION: u16 = 34264;
    pub const GEO_KEY_DIRECTORY: u16 = 34735;
    pub const GEO_DOUBLE_PARAMS: u16 = 34736;
    pub const GEO_ASCII_PARAMS: u16 = 34737;
    pub const GDAL_NODATA: u16 = 42113;
}

/// TIFF field type IDs used by this crate.
pub mod field_type {
    pub const ASCII: u16 = 2;
    pub const SHORT: u16 = 3;
    pub const LONG: u16 = 4;
    pub const DOUBLE: u16 = 12;
}

fn type_byte_size(type_id: u16) -> Option<usize> {
    match type_id {
        1 | 2 | 6 | 7 => Some(1),  // BYTE, ASCII, SBYTE, UNDEFINED
        3 | 8 => Some(2),          // SHORT, SSHORT
        4 | 9 | 11 | 13 => Some(4), // LONG, SLONG, FLOAT, IFD
        5 | 10 | 12 => Some(8),    // RATIONAL, SRATIONAL, DOUBLE
        16 | 17 | 18 => Some(8),   // LONG8, SLONG8, IFD8 (BigTIFF)
        _ => None,
    }
}

/// One IFD entry with its value bytes already resolved.
#[derive(Debug, Clone)]
pub struct TagEntry {
    pub tag: u16,
    pub type_id: u16,
    pub count: u64,
    /// Value bytes in file byte order
    pub value: Vec<u8>,
}

/// The first image directory of a TIFF buffer.
#[derive(Debug, Clone)]
pub struct Directory {
    pub byte_order: TiffByteOrder,
    pub big_tiff: bool,
    pub entries: Vec<TagEntry>,
}

impl Directory {
    /// Parse the header and first IFD of an in-memory TIFF.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::Decode("header too short".into()));
        }

        let byte_order = match (data[0], data[1]) {
            (b'I', b'I') => TiffByteOrder::LittleEndian,
            (b'M', b'M') => TiffByteOrder::BigEndian,
            _ => return Err(Error::Decode("invalid byte order marker".into())),
        };

        let magic = read_u16(byte_order, &data[2..4]);
        let (big_tiff, ifd_offset) = match magic {
            42 => (false, read_u32(byte_order, &data[4..8]) as u64),
            43 => {
                if data.len() < 16 {
                    return Err(Error::Decode("BigTIFF header too short".into()));
                }
                (true, read_u64(byte_order, &data[8..16]))
            }
            other => return Err(Error::Decode(format!("expected magic 42 or 43, got {}", other))),
        };

        let entries = parse_entries(data, byte_order, big_tiff, to_index(ifd_offset)?)?;

        Ok(Self {
            byte_order,
            big_tiff,
            entries,
        })
    }

    fn find(&self, tag: u16) -> Option<&TagEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// Whether the directory carries the given tag
    pub fn has(&self, tag: u16) -> bool {
        self.find(tag).is_some()
    }

    /// Integer values of a BYTE/SHORT/LONG/LONG8 tag
    pub fn values_u64(&self, tag: u16) -> Option<Vec<u64>> {
        let entry = self.find(tag)?;
        let bo = self.byte_order;
        let v = &entry.value;
        let values: Vec<u64> = match entry.type_id {
            1 => v.iter().map(|&b| b as u64).collect(),
            3 => v.chunks_exact(2).map(|c| read_u16(bo, c) as u64).collect(),
            4 => v.chunks_exact(4).map(|c| read_u32(bo, c) as u64).collect(),
            16 => v.chunks_exact(8).map(|c| read_u64(bo, c)).collect(),
            _ => return None,
        };
        Some(values)
    }

    /// First integer value of a tag
    pub fn value_u64(&self, tag: u16) -> Option<u64> {
        self.values_u64(tag)?.first().copied()
    }

    /// Floating point values of a FLOAT/DOUBLE tag
    pub fn values_f64(&self, tag: u16) -> Option<Vec<f64>> {
        let entry = self.find(tag)?;
        let bo = self.byte_order;
        let values: Vec<f64> = match entry.type_id {
            11 => entry.value.chunks_exact(4).map(|c| read_f32(bo, c) as f64).collect(),
            12 => entry.value.chunks_exact(8).map(|c| read_f64(bo, c)).collect(),
            _ => return None,
        };
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }

    /// NUL-terminated ASCII value of a tag
    pub fn ascii(&self, tag: u16) -> Option<String> {
        let entry = self.find(tag)?;
        if entry.type_id != field_type::ASCII {
            return None;
        }
        let bytes = &entry.value;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Some(String::from_utf8_lossy(&bytes[..end]).to_string())
    }
}

fn parse_entries(
    data: &[u8],
    byte_order: TiffByteOrder,
    big_tiff: bool,
    ifd_offset: usize,
) -> Result<Vec<TagEntry>> {
    let (count_size, entry_size, inline_size) = if big_tiff { (8, 20, 8) } else { (2, 12, 4) };

    let count_bytes = slice(data, ifd_offset, count_size)?;
    let entry_count = if big_tiff {
        to_index(read_u64(byte_order, count_bytes))?
    } else {
        read_u16(byte_order, count_bytes) as usize
    };

    let table = slice(data, ifd_offset.saturating_add(count_size), entry_count.saturating_mul(entry_size))?;

    let mut entries = Vec::with_capacity(entry_count);
    for raw in table.chunks_exact(entry_size) {
        let tag = read_u16(byte_order, &raw[0..2]);
        let type_id = read_u16(byte_order, &raw[2..4]);
        let (count, field) = if big_tiff {
            (read_u64(byte_order, &raw[4..12]), &raw[12..20])
        } else {
            (read_u32(byte_order, &raw[4..8]) as u64, &raw[8..12])
        };

        // Unknown field types are skipped
        let Some(elem) = type_byte_size(type_id) else {
            continue;
        };
        let total = to_index(count)?.saturating_mul(elem);

        let value = if total <= inline_size {
            field[..total].to_vec()
        } else {
            let offset = if big_tiff {
                read_u64(byte_order, field)
            } else {
                read_u32(byte_order, field) as u64
            };
            slice(data, to_index(offset)?, total)?.to_vec()
        };

        entries.push(TagEntry {
            tag,
            type_id,
            count,
            value,
        });
    }

    Ok(entries)
}

fn slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            Error::Decode(format!(
                "value at offset {} (+{} bytes) lies outside the {}-byte buffer",
                offset,
                len,
                data.len()
            ))
        })
}

fn to_index(v: u64) -> Result<usize> {
    usize::try_from(v).map_err(|_| Error::Decode(format!("offset {} does not fit in memory", v)))
}

// ---- Writing ----

/// A tag to be written, value bytes in little-endian order.
#[derive(Debug, Clone)]
pub(crate) struct OutEntry {
    pub tag: u16,
    pub type_id: u16,
    pub count: u32,
    pub value: Vec<u8>,
}

impl OutEntry {
    pub fn short(tag: u16, values: &[u16]) -> Self {
        let value = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self { tag, type_id: field_type::SHORT, count: values.len() as u32, value }
    }

    pub fn long(tag: u16, values: &[u32]) -> Self {
        let value = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self { tag, type_id: field_type::LONG, count: values.len() as u32, value }
    }

    pub fn double(tag: u16, values: &[f64]) -> Self {
        let value = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self { tag, type_id: field_type::DOUBLE, count: values.len() as u32, value }
    }

    pub fn ascii(tag: u16, text: &str) -> Self {
        let mut value = text.as_bytes().to_vec();
        value.push(0);
        Self { tag, type_id: field_type::ASCII, count: value.len() as u32, value }
    }

    /// Bytes this entry needs outside the IFD table, word aligned
    pub fn external_len(&self) -> usize {
        if self.value.len() <= 4 {
            0
        } else {
            self.value.len() + self.value.len() % 2
        }
    }
}

/// Size in bytes of a classic IFD table holding `n` entries
pub(crate) fn ifd_table_len(n: usize) -> usize {
    2 + n * 12 + 4
}

/// Append a classic little-endian IFD at `out.len()`, with out-of-line
/// values placed directly after the table. Entries must be sorted by tag.
pub(crate) fn write_ifd(out: &mut Vec<u8>, entries: &[OutEntry]) -> Result<()> {
    let table_start = out.len();
    let mut external_at = table_start + ifd_table_len(entries.len());
    let mut external = Vec::new();

    out.write_u16::<LittleEndian>(entries.len() as u16)?;
    for entry in entries {
        out.write_u16::<LittleEndian>(entry.tag)?;
        out.write_u16::<LittleEndian>(entry.type_id)?;
        out.write_u32::<LittleEndian>(entry.count)?;
        if entry.value.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.value.len()].copy_from_slice(&entry.value);
            out.extend_from_slice(&inline);
        } else {
            let offset = u32::try_from(external_at)
                .map_err(|_| Error::Encode("IFD exceeds the 4 GiB classic TIFF limit".into()))?;
            out.write_u32::<LittleEndian>(offset)?;
            external.extend_from_slice(&entry.value);
            if entry.value.len() % 2 == 1 {
                external.push(0);
            }
            external_at += entry.external_len();
        }
    }
    // Single-image file: no next IFD
    out.write_u32::<LittleEndian>(0)?;
    out.extend_from_slice(&external);
    Ok(())
}

// ---- Byte order helpers ----

fn read_u16(order: TiffByteOrder, data: &[u8]) -> u16 {
    match order {
        TiffByteOrder::LittleEndian => LittleEndian::read_u16(data),
        TiffByteOrder::BigEndian => BigEndian::read_u16(data),
    }
}

fn read_u32(order: TiffByteOrder, data: &[u8]) -> u32 {
    match order {
        TiffByteOrder::LittleEndian => LittleEndian::read_u32(data),
        TiffByteOrder::BigEndian => BigEndian::read_u32(data),
    }
}

fn read_u64(order: TiffByteOrder, data: &[u8]) -> u64 {
    match order {
        TiffByteOrder::LittleEndian => LittleEndian::read_u64(data),
        TiffByteOrder::BigEndian => BigEndian::read_u64(data),
    }
}

fn read_f32(order: TiffByteOrder, data: &[u8]) -> f32 {
    match order {
        TiffByteOrder::LittleEndian => LittleEndian::read_f32(data),
        TiffByteOrder::BigEndian => BigEndian::read_f32(data),
    }
}

fn read_f64(order: TiffByteOrder, data: &[u8]) -> f64 {
    match order {
        TiffByteOrder::LittleEndian => LittleEndian::read_f64(data),
        TiffByteOrder::BigEndian => BigEndian::read_f64(data),
    }
}
