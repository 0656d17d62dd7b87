//! Decode miniSEED v2 records from raw bytes.
//!
//! The main entry point is [`decode_record()`], which parses one record
//! into a [`Record`]. Decoding is split in two steps so that callers can
//! inspect the header (identity, times, blockettes) through
//! [`decode_header()`] and only pay for sample unpacking when the record is
//! wanted. For multi-record data, see [`RecordReader`](crate::RecordReader).

use crate::record::{Blockette, ChannelId, Record, Samples};
use crate::steim;
use crate::time::{BTime, HpTime};
use crate::types::{ByteOrder, EncodingFormat, SampleType};
use crate::{MseedError, Result};

/// Size of the SEED fixed header.
pub const FIXED_HEADER_LEN: usize = 48;

/// Smallest record length allowed by SEED 2.4.
pub const MIN_RECORD_LENGTH: usize = 128;

/// Options controlling how a single record is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Unpack the data section into [`Samples`].
    pub unpack_data: bool,
    /// Record length to assume when no Blockette 1000 is present. 0 means
    /// the record must carry Blockette 1000.
    pub record_length: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            unpack_data: true,
            record_length: 0,
        }
    }
}

/// A record whose header and blockettes are parsed but whose samples are
/// not yet unpacked.
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub record: Record,
    data_offset: usize,
    byte_order: ByteOrder,
}

impl RecordHeader {
    /// Unpack the data section of `data` (the record bytes this header was
    /// parsed from) and return the complete record.
    pub fn unpack(mut self, data: &[u8]) -> Result<Record> {
        let record_length = self.record.record_length;
        if data.len() < record_length {
            return Err(MseedError::RecordTooShort {
                expected: record_length,
                actual: data.len(),
            });
        }
        if self.data_offset > record_length {
            return Err(MseedError::InvalidHeader);
        }

        let count = self.record.sample_count;
        let samples = if count == 0 {
            empty_samples(self.record.sample_type)
        } else {
            let encoding = self.record.encoding.ok_or(MseedError::MissingBlockette1000)?;
            if self.data_offset < FIXED_HEADER_LEN {
                return Err(MseedError::InvalidHeader);
            }
            let section = &data[self.data_offset..record_length];
            decode_data(section, encoding, count, self.byte_order)?
        };

        self.record.samples = Some(samples);
        Ok(self.record)
    }
}

/// Decode a single miniSEED v2 record from the start of `data`.
///
/// `data` may extend past the end of the record.
pub fn decode_record(data: &[u8], options: &DecodeOptions) -> Result<Record> {
    let header = decode_header(data, options.record_length)?;
    if options.unpack_data {
        header.unpack(data)
    } else {
        Ok(header.record)
    }
}

/// Parse the fixed header and blockette chain at the start of `data`.
pub fn decode_header(data: &[u8], record_length_hint: usize) -> Result<RecordHeader> {
    if data.len() < FIXED_HEADER_LEN {
        return Err(MseedError::RecordTooShort {
            expected: FIXED_HEADER_LEN,
            actual: data.len(),
        });
    }

    let sequence_number = ascii_field(&data[0..6])?;
    if !sequence_number.bytes().all(|b| b.is_ascii_digit() || b == b' ') {
        return Err(MseedError::InvalidHeader);
    }
    let quality = data[6] as char;
    if !matches!(quality, 'D' | 'R' | 'Q' | 'M') {
        return Err(MseedError::InvalidQuality(quality));
    }
    let id = ChannelId {
        station: ascii_field(&data[8..13])?,
        location: ascii_field(&data[13..15])?,
        channel: ascii_field(&data[15..18])?,
        network: ascii_field(&data[18..20])?,
        quality,
    };

    let header_order = detect_header_order(data)?;
    let u16_at = |pos: usize| read_u16(data, pos, header_order);

    let btime = BTime {
        year: u16_at(20),
        day: u16_at(22),
        hour: data[24],
        minute: data[25],
        second: data[26],
        // byte 27 is unused
        fract: u16_at(28),
    };
    if btime.hour > 23 || btime.minute > 59 || btime.second > 60 || btime.fract > 9999 {
        return Err(MseedError::InvalidHeader);
    }

    let sample_count = u16_at(30) as usize;
    let factor = u16_at(32) as i16;
    let multiplier = u16_at(34) as i16;
    let activity_flags = data[36];
    let time_correction = read_u32(data, 40, header_order) as i32;
    let data_offset = u16_at(44) as usize;
    let first_blockette = u16_at(46) as usize;

    let blockettes = read_blockettes(data, first_blockette, data_offset, header_order)?;

    let mut sample_rate = compute_sample_rate(factor, multiplier);
    let mut start_time: HpTime = btime.to_hptime();
    let mut encoding = None;
    let mut data_order = header_order;
    let mut record_length = None;

    for blkt in &blockettes {
        match blkt.kind {
            100 if blkt.data.len() >= 4 => {
                let bytes = [blkt.data[0], blkt.data[1], blkt.data[2], blkt.data[3]];
                let actual = match header_order {
                    ByteOrder::Big => f32::from_be_bytes(bytes),
                    ByteOrder::Little => f32::from_le_bytes(bytes),
                };
                sample_rate = actual as f64;
            }
            1000 if blkt.data.len() >= 3 => {
                encoding = Some(EncodingFormat::from_code(blkt.data[0])?);
                data_order = if blkt.data[1] == 0 {
                    ByteOrder::Little
                } else {
                    ByteOrder::Big
                };
                let power = blkt.data[2] as u32;
                if !(7..=20).contains(&power) {
                    return Err(MseedError::InvalidHeader);
                }
                record_length = Some(1usize << power);
            }
            1001 if blkt.data.len() >= 2 => {
                start_time += blkt.data[1] as i8 as HpTime;
            }
            _ => {}
        }
    }

    // Bit 1 of the activity flags set means the correction is already
    // folded into the start time.
    if activity_flags & 0x02 == 0 && time_correction != 0 {
        start_time += time_correction as HpTime * 100;
    }

    let record_length = match record_length {
        Some(len) => len,
        None if record_length_hint > 0 => record_length_hint,
        None => return Err(MseedError::MissingBlockette1000),
    };

    Ok(RecordHeader {
        record: Record {
            id,
            sequence_number,
            start_time,
            sample_rate,
            encoding,
            sample_type: encoding.map_or(SampleType::Int, EncodingFormat::sample_type),
            sample_count,
            samples: None,
            blockettes,
            record_length,
        },
        data_offset,
        byte_order: data_order,
    })
}

/// Header fields are big-endian by convention, but some writers emit
/// little-endian headers. The year/day pair tells them apart.
fn detect_header_order(data: &[u8]) -> Result<ByteOrder> {
    let plausible = |order| {
        let year = read_u16(data, 20, order);
        let day = read_u16(data, 22, order);
        (1900..=2100).contains(&year) && (1..=366).contains(&day)
    };
    if plausible(ByteOrder::Big) {
        Ok(ByteOrder::Big)
    } else if plausible(ByteOrder::Little) {
        Ok(ByteOrder::Little)
    } else {
        Err(MseedError::InvalidHeader)
    }
}

fn ascii_field(bytes: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(bytes).map_err(|_| MseedError::InvalidHeader)?;
    Ok(text.trim_matches(|c| c == ' ' || c == '\0').to_string())
}

fn compute_sample_rate(factor: i16, multiplier: i16) -> f64 {
    let f = factor as f64;
    let m = multiplier as f64;
    if factor == 0 || multiplier == 0 {
        return 0.0;
    }
    match (factor > 0, multiplier > 0) {
        (true, true) => f * m,
        (true, false) => -f / m,
        (false, true) => -m / f,
        (false, false) => 1.0 / (f * m),
    }
}

/// Fixed blockette lengths (including the 4-byte header) from SEED 2.4.
pub(crate) fn fixed_blockette_length(kind: u16) -> Option<usize> {
    match kind {
        100 => Some(12),
        200 => Some(52),
        201 => Some(60),
        300 => Some(60),
        310 => Some(60),
        320 => Some(64),
        390 => Some(28),
        395 => Some(16),
        400 => Some(16),
        405 => Some(6),
        500 => Some(200),
        1000 => Some(8),
        1001 => Some(8),
        _ => None,
    }
}

/// Walk the blockette chain starting at `offset`.
///
/// Each next-offset must lie past the current blockette header, so
/// malformed chains can neither loop nor overlap a header. Blockettes of unknown length run up to the next blockette, or to
/// the data section for the last one.
fn read_blockettes(
    data: &[u8],
    mut offset: usize,
    data_offset: usize,
    order: ByteOrder,
) -> Result<Vec<Blockette>> {
    let mut blockettes = Vec::new();
    while offset != 0 {
        if offset < FIXED_HEADER_LEN || offset + 4 > data.len() {
            return Err(MseedError::InvalidBlockette { offset });
        }
        let kind = read_u16(data, offset, order);
        let next = read_u16(data, offset + 2, order) as usize;
        // The next blockette cannot start inside this one's 4-byte header.
        if next != 0 && next < offset + 4 {
            return Err(MseedError::InvalidBlockette { offset });
        }

        let length = match kind {
            2000 if offset + 6 <= data.len() => Some(read_u16(data, offset + 4, order) as usize),
            _ => fixed_blockette_length(kind),
        };
        let end = match length {
            Some(len) if len >= 4 => offset + len,
            Some(_) => return Err(MseedError::InvalidBlockette { offset }),
            None if next != 0 => next,
            None => data_offset.max(offset + 4),
        };
        if end > data.len() {
            return Err(MseedError::InvalidBlockette { offset });
        }

        blockettes.push(Blockette {
            kind,
            data: data[offset + 4..end].to_vec(),
        });
        offset = next;
    }
    Ok(blockettes)
}

fn empty_samples(sample_type: SampleType) -> Samples {
    match sample_type {
        SampleType::Ascii => Samples::Ascii(Vec::new()),
        SampleType::Int => Samples::Int(Vec::new()),
        SampleType::Float => Samples::Float(Vec::new()),
        SampleType::Double => Samples::Double(Vec::new()),
    }
}

fn decode_data(
    data: &[u8],
    encoding: EncodingFormat,
    num_samples: usize,
    byte_order: ByteOrder,
) -> Result<Samples> {
    match encoding {
        EncodingFormat::Ascii => {
            let bytes = checked_section(data, num_samples)?;
            Ok(Samples::Ascii(bytes.to_vec()))
        }
        EncodingFormat::Int16 => {
            let values = read_values(data, num_samples, byte_order, i16::from_be_bytes, i16::from_le_bytes)?;
            Ok(Samples::Int(values.into_iter().map(i32::from).collect()))
        }
        EncodingFormat::Int32 => Ok(Samples::Int(read_values(
            data,
            num_samples,
            byte_order,
            i32::from_be_bytes,
            i32::from_le_bytes,
        )?)),
        EncodingFormat::Float32 => Ok(Samples::Float(read_values(
            data,
            num_samples,
            byte_order,
            f32::from_be_bytes,
            f32::from_le_bytes,
        )?)),
        EncodingFormat::Float64 => Ok(Samples::Double(read_values(
            data,
            num_samples,
            byte_order,
            f64::from_be_bytes,
            f64::from_le_bytes,
        )?)),
        EncodingFormat::Steim1 => Ok(Samples::Int(steim::decode_steim1(
            data,
            num_samples,
            byte_order,
        )?)),
        EncodingFormat::Steim2 => Ok(Samples::Int(steim::decode_steim2(
            data,
            num_samples,
            byte_order,
        )?)),
    }
}

fn checked_section(data: &[u8], needed: usize) -> Result<&[u8]> {
    if data.len() < needed {
        return Err(MseedError::RecordTooShort {
            expected: needed,
            actual: data.len(),
        });
    }
    Ok(&data[..needed])
}

/// Read `count` fixed-width values of `N` bytes each.
fn read_values<const N: usize, T>(
    data: &[u8],
    count: usize,
    byte_order: ByteOrder,
    from_be: fn([u8; N]) -> T,
    from_le: fn([u8; N]) -> T,
) -> Result<Vec<T>> {
    let section = checked_section(data, count * N)?;
    let convert = match byte_order {
        ByteOrder::Big => from_be,
        ByteOrder::Little => from_le,
    };
    Ok(section
        .chunks_exact(N)
        .map(|chunk| {
            let mut bytes = [0u8; N];
            bytes.copy_from_slice(chunk);
            convert(bytes)
        })
        .collect())
}

fn read_u16(data: &[u8], offset: usize, order: ByteOrder) -> u16 {
    let bytes = [data[offset], data[offset + 1]];
    match order {
        ByteOrder::Big => u16::from_be_bytes(bytes),
        ByteOrder::Little => u16::from_le_bytes(bytes),
    }
}

fn read_u32(data: &[u8], offset: usize, order: ByteOrder) -> u32 {
    let bytes = [
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ];
    match order {
        ByteOrder::Big => u32::from_be_bytes(bytes),
        ByteOrder::Little => u32::from_le_bytes(bytes),
    }
}
