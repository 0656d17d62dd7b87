//! Write miniSEED v2 records.
//!
//! [`encode()`] serializes a [`RecordBuilder`] into a `Vec<u8>` of the
//! configured record length (default 512). The writer covers what test
//! fixtures and benchmarks need: uncompressed encodings, Blockette 1000,
//! and arbitrary extra blockettes such as 1001 or the calibration family.

use crate::decode::{FIXED_HEADER_LEN, fixed_blockette_length};
use crate::record::{Blockette, ChannelId, Samples};
use crate::time::{BTime, HpTime};
use crate::types::{ByteOrder, EncodingFormat};
use crate::{MseedError, Result};

/// Description of a record to write.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBuilder {
    id: ChannelId,
    sequence_number: String,
    start_time: HpTime,
    sample_rate: f64,
    encoding: EncodingFormat,
    byte_order: ByteOrder,
    record_length: u32,
    activity_flags: u8,
    time_correction: i32,
    blockettes: Vec<Blockette>,
    samples: Samples,
}

impl RecordBuilder {
    /// Create a new builder with sensible defaults.
    ///
    /// Defaults: sequence "000001", quality 'D', empty NSLC, epoch start,
    /// 1 Hz, big-endian, 512-byte records, INT32, no samples.
    pub fn new() -> Self {
        Self {
            id: ChannelId::new("", "", "", "", 'D'),
            sequence_number: "000001".into(),
            start_time: 0,
            sample_rate: 1.0,
            encoding: EncodingFormat::Int32,
            byte_order: ByteOrder::Big,
            record_length: 512,
            activity_flags: 0,
            time_correction: 0,
            blockettes: Vec::new(),
            samples: Samples::Int(vec![]),
        }
    }

    /// Set network, station, location, and channel codes.
    pub fn with_nslc(
        mut self,
        network: &str,
        station: &str,
        location: &str,
        channel: &str,
    ) -> Self {
        self.id.network = network.into();
        self.id.station = station.into();
        self.id.location = location.into();
        self.id.channel = channel.into();
        self
    }

    /// Set the data quality indicator.
    pub fn with_quality(mut self, quality: char) -> Self {
        self.id.quality = quality;
        self
    }

    pub fn with_sequence_number(mut self, seq: u32) -> Self {
        self.sequence_number = format!("{:06}", seq % 1_000_000);
        self
    }

    /// Set the start time. Written with 0.0001 s resolution.
    pub fn with_start_time(mut self, time: HpTime) -> Self {
        self.start_time = time;
        self
    }

    /// Set the sample rate in Hz. Zero writes an irregular-rate record.
    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Set the encoding format.
    pub fn with_encoding(mut self, enc: EncodingFormat) -> Self {
        self.encoding = enc;
        self
    }

    /// Set header and data byte order.
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    /// Set the record length (power of 2, 128 to 2^20).
    pub fn with_record_length(mut self, len: u32) -> Self {
        self.record_length = len;
        self
    }

    pub fn with_activity_flags(mut self, flags: u8) -> Self {
        self.activity_flags = flags;
        self
    }

    /// Set the header time correction in 0.0001 s units.
    pub fn with_time_correction(mut self, correction: i32) -> Self {
        self.time_correction = correction;
        self
    }

    /// Append a blockette after Blockette 1000. Bodies of fixed-length
    /// blockette types are zero-padded or truncated to their SEED size.
    pub fn with_blockette(mut self, kind: u16, data: Vec<u8>) -> Self {
        self.blockettes.push(Blockette { kind, data });
        self
    }

    /// Append a Blockette 1001 with the given timing quality and
    /// microsecond offset.
    pub fn with_timing_quality(self, quality: u8, usec: i8) -> Self {
        self.with_blockette(1001, vec![quality, usec as u8, 0, 0])
    }

    /// Set the sample data.
    pub fn with_samples(mut self, samples: Samples) -> Self {
        self.samples = samples;
        self
    }

    pub fn start_time(&self) -> HpTime {
        self.start_time
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a [`RecordBuilder`] into miniSEED v2 record bytes.
pub fn encode(record: &RecordBuilder) -> Result<Vec<u8>> {
    let rec_len = record.record_length as usize;
    if !record.record_length.is_power_of_two() || !(128..=1 << 20).contains(&rec_len) {
        return Err(MseedError::EncodeError(
            "record_length must be a power of 2 between 128 and 2^20".into(),
        ));
    }
    let rec_len_power = record.record_length.ilog2() as u8;
    let num_samples = u16::try_from(record.samples.len())
        .map_err(|_| MseedError::EncodeError("too many samples for one record".into()))?;

    let order = record.byte_order;
    let put_u16 = |buf: &mut [u8], pos: usize, v: u16| {
        let bytes = match order {
            ByteOrder::Big => v.to_be_bytes(),
            ByteOrder::Little => v.to_le_bytes(),
        };
        buf[pos..pos + 2].copy_from_slice(&bytes);
    };

    let mut buf = vec![0u8; rec_len];

    // --- Fixed header (48 bytes) ---
    write_padded(&mut buf[0..6], &record.sequence_number);
    buf[6] = record.id.quality as u8;
    buf[7] = b' ';
    write_padded(&mut buf[8..13], &record.id.station);
    write_padded(&mut buf[13..15], &record.id.location);
    write_padded(&mut buf[15..18], &record.id.channel);
    write_padded(&mut buf[18..20], &record.id.network);

    let bt = BTime::from_hptime(record.start_time);
    put_u16(&mut buf, 20, bt.year);
    put_u16(&mut buf, 22, bt.day);
    buf[24] = bt.hour;
    buf[25] = bt.minute;
    buf[26] = bt.second;
    put_u16(&mut buf, 28, bt.fract);

    put_u16(&mut buf, 30, num_samples);
    let (factor, multiplier) = decompose_sample_rate(record.sample_rate)?;
    put_u16(&mut buf, 32, factor as u16);
    put_u16(&mut buf, 34, multiplier as u16);

    buf[36] = record.activity_flags;
    buf[39] = (1 + record.blockettes.len()) as u8;
    let correction = match order {
        ByteOrder::Big => record.time_correction.to_be_bytes(),
        ByteOrder::Little => record.time_correction.to_le_bytes(),
    };
    buf[40..44].copy_from_slice(&correction);
    put_u16(&mut buf, 46, FIXED_HEADER_LEN as u16);

    // --- Blockette 1000, then any extra blockettes ---
    let mut chain = Vec::with_capacity(1 + record.blockettes.len());
    chain.push(Blockette {
        kind: 1000,
        data: vec![
            record.encoding.to_code(),
            matches!(order, ByteOrder::Big) as u8,
            rec_len_power,
            0,
        ],
    });
    for blkt in &record.blockettes {
        let mut data = blkt.data.clone();
        if let Some(len) = fixed_blockette_length(blkt.kind) {
            data.resize(len - 4, 0);
        }
        chain.push(Blockette {
            kind: blkt.kind,
            data,
        });
    }

    let mut offset = FIXED_HEADER_LEN;
    for (i, blkt) in chain.iter().enumerate() {
        let end = offset + 4 + blkt.data.len();
        if end > rec_len {
            return Err(MseedError::EncodeError("blockettes exceed record length".into()));
        }
        let next = if i + 1 < chain.len() { end as u16 } else { 0 };
        put_u16(&mut buf, offset, blkt.kind);
        put_u16(&mut buf, offset + 2, next);
        buf[offset + 4..end].copy_from_slice(&blkt.data);
        offset = end;
    }

    // --- Data section, 8-byte aligned after the blockettes ---
    let data_offset = offset.next_multiple_of(8);
    put_u16(&mut buf, 44, data_offset as u16);

    let encoded = encode_data(&record.samples, record.encoding, order)?;
    if data_offset + encoded.len() > rec_len {
        return Err(MseedError::EncodeError(format!(
            "encoded data ({} bytes) exceeds record capacity ({} bytes from offset {})",
            encoded.len(),
            rec_len - data_offset,
            data_offset,
        )));
    }
    buf[data_offset..data_offset + encoded.len()].copy_from_slice(&encoded);

    Ok(buf)
}

fn write_padded(dest: &mut [u8], src: &str) {
    let bytes = src.as_bytes();
    for (i, slot) in dest.iter_mut().enumerate() {
        *slot = if i < bytes.len() { bytes[i] } else { b' ' };
    }
}

/// Decompose a sample rate (Hz) into (factor, multiplier) pair.
fn decompose_sample_rate(rate: f64) -> Result<(i16, i16)> {
    if rate < 0.0 || !rate.is_finite() {
        return Err(MseedError::EncodeError(
            "sample rate must be finite and non-negative".into(),
        ));
    }

    if rate == 0.0 {
        Ok((0, 0))
    } else if rate >= 1.0 {
        Ok((rate.round() as i16, 1))
    } else {
        // Sub-hertz: factor < 0 encodes a period in seconds.
        let period = (1.0 / rate).round() as i16;
        Ok((-period, 1))
    }
}

fn encode_data(samples: &Samples, encoding: EncodingFormat, order: ByteOrder) -> Result<Vec<u8>> {
    let mismatch = || {
        MseedError::EncodeError(format!(
            "{encoding} encoding cannot hold {} samples",
            samples.sample_type()
        ))
    };
    let mut data = Vec::with_capacity(samples.byte_len());
    match (encoding, samples) {
        (EncodingFormat::Ascii, Samples::Ascii(v)) => data.extend_from_slice(v),
        (EncodingFormat::Int16, Samples::Int(v)) => {
            for &x in v {
                push_ordered(&mut data, (x as i16).to_be_bytes(), order);
            }
        }
        (EncodingFormat::Int32, Samples::Int(v)) => {
            for &x in v {
                push_ordered(&mut data, x.to_be_bytes(), order);
            }
        }
        (EncodingFormat::Float32, Samples::Float(v)) => {
            for &x in v {
                push_ordered(&mut data, x.to_be_bytes(), order);
            }
        }
        (EncodingFormat::Float64, Samples::Double(v)) => {
            for &x in v {
                push_ordered(&mut data, x.to_be_bytes(), order);
            }
        }
        (EncodingFormat::Steim1 | EncodingFormat::Steim2, _) => {
            return Err(MseedError::EncodeError(format!(
                "{encoding} output is not supported"
            )));
        }
        _ => return Err(mismatch()),
    }
    Ok(data)
}

/// Append big-endian `bytes`, reversed for little-endian output.
fn push_ordered<const N: usize>(out: &mut Vec<u8>, mut bytes: [u8; N], order: ByteOrder) {
    if order == ByteOrder::Little {
        bytes.reverse();
    }
    out.extend_from_slice(&bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{DecodeOptions, decode_record};

    #[test]
    fn test_encode_from_scratch() {
        let builder = RecordBuilder::new()
            .with_nslc("XX", "TEST", "00", "BHZ")
            .with_sample_rate(100.0)
            .with_samples(Samples::Int(vec![1, -2, 3, -4]));
        let bytes = encode(&builder).unwrap();

        assert_eq!(bytes.len(), 512);
        assert_eq!(&bytes[0..6], b"000001");
        assert_eq!(bytes[6], b'D');
        assert_eq!(&bytes[8..13], b"TEST ");
        assert_eq!(&bytes[18..20], b"XX");
        assert_eq!(u16::from_be_bytes([bytes[48], bytes[49]]), 1000);
        assert_eq!(u16::from_be_bytes([bytes[44], bytes[45]]), 56);
    }

    #[test]
    fn test_extra_blockettes_are_chained() {
        let builder = RecordBuilder::new()
            .with_nslc("XX", "TEST", "", "LHZ")
            .with_timing_quality(90, 0)
            .with_blockette(300, vec![1, 2, 3])
            .with_samples(Samples::Int(vec![5]));
        let record = decode_record(&encode(&builder).unwrap(), &DecodeOptions::default()).unwrap();

        let kinds: Vec<u16> = record.blockettes.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![1000, 1001, 300]);
        let b300 = record.blockette(300).unwrap();
        assert_eq!(b300.data.len(), 56);
        assert_eq!(&b300.data[..3], &[1, 2, 3]);
        assert_eq!(record.samples, Some(Samples::Int(vec![5])));
    }

    #[test]
    fn test_rejects_steim_and_mismatched_samples() {
        let steim = RecordBuilder::new()
            .with_encoding(EncodingFormat::Steim2)
            .with_samples(Samples::Int(vec![1]));
        assert!(matches!(encode(&steim), Err(MseedError::EncodeError(_))));

        let mismatch = RecordBuilder::new()
            .with_encoding(EncodingFormat::Float32)
            .with_samples(Samples::Int(vec![1]));
        assert!(matches!(encode(&mismatch), Err(MseedError::EncodeError(_))));
    }

    #[test]
    fn test_capacity_and_length_checks() {
        let too_many = RecordBuilder::new()
            .with_record_length(128)
            .with_samples(Samples::Int(vec![0; 100]));
        assert!(encode(&too_many).is_err());

        let bad_len = RecordBuilder::new().with_record_length(500);
        assert!(encode(&bad_len).is_err());
    }
}
