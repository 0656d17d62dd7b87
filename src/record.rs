//! Decoded miniSEED record and its channel identity.
//!
//! A [`Record`] is transient: it lives from the moment the reader decodes it
//! until the materializer has copied its samples into a segment buffer.

use std::fmt;

use crate::time::{HPTMODULUS, HpTime};
use crate::types::{EncodingFormat, SampleType};

/// Identity of a recording channel: NSLC codes plus data quality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ChannelId {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    /// Data quality indicator (`D`, `R`, `Q` or `M`). `'\0'` on the
    /// placeholder channel of an empty result.
    pub quality: char,
}

impl ChannelId {
    pub fn new(network: &str, station: &str, location: &str, channel: &str, quality: char) -> Self {
        Self {
            network: network.into(),
            station: station.into(),
            location: location.into(),
            channel: channel.into(),
            quality,
        }
    }

    /// Return the NSLC identifier: `"NET.STA.LOC.CHA"`.
    pub fn nslc(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }

    /// Return the source name `NET_STA_LOC_CHAN_Q` used by selection patterns.
    pub fn source_name(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.network, self.station, self.location, self.channel, self.quality
        )
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.nslc(), self.quality)
    }
}

/// A blockette kept verbatim from the record.
///
/// `data` is the blockette body, i.e. everything after the 4-byte
/// type/next-offset header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blockette {
    pub kind: u16,
    pub data: Vec<u8>,
}

/// Decoded sample data.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Ascii(Vec<u8>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Ascii(v) => v.len(),
            Samples::Int(v) => v.len(),
            Samples::Float(v) => v.len(),
            Samples::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Samples::Ascii(_) => SampleType::Ascii,
            Samples::Int(_) => SampleType::Int,
            Samples::Float(_) => SampleType::Float,
            Samples::Double(_) => SampleType::Double,
        }
    }

    /// Byte length of these samples in memory.
    pub fn byte_len(&self) -> usize {
        self.len() * self.sample_type().size()
    }

    /// Write the samples to `dest` in native byte order.
    ///
    /// Writing stops at whichever of `dest` or the samples ends first.
    pub fn write_ne_bytes(&self, dest: &mut [u8]) {
        match self {
            Samples::Ascii(v) => {
                for (d, s) in dest.iter_mut().zip(v) {
                    *d = *s;
                }
            }
            Samples::Int(v) => {
                for (chunk, x) in dest.chunks_exact_mut(4).zip(v) {
                    chunk.copy_from_slice(&x.to_ne_bytes());
                }
            }
            Samples::Float(v) => {
                for (chunk, x) in dest.chunks_exact_mut(4).zip(v) {
                    chunk.copy_from_slice(&x.to_ne_bytes());
                }
            }
            Samples::Double(v) => {
                for (chunk, x) in dest.chunks_exact_mut(8).zip(v) {
                    chunk.copy_from_slice(&x.to_ne_bytes());
                }
            }
        }
    }

    /// Reinterpret a native-byte-order buffer as typed samples.
    pub fn from_ne_bytes(sample_type: SampleType, bytes: &[u8]) -> Self {
        match sample_type {
            SampleType::Ascii => Samples::Ascii(bytes.to_vec()),
            SampleType::Int => Samples::Int(
                bytes
                    .chunks_exact(4)
                    .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            SampleType::Float => Samples::Float(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            SampleType::Double => Samples::Double(
                bytes
                    .chunks_exact(8)
                    .map(|c| f64::from_ne_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
        }
    }
}

/// A decoded miniSEED v2 record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: ChannelId,
    pub sequence_number: String,
    /// Start time including any B1001 microsecond offset and unapplied
    /// header time correction.
    pub start_time: HpTime,
    /// Sample rate in Hz. Zero for irregular or log data.
    pub sample_rate: f64,
    /// Encoding from Blockette 1000, if the record carries one.
    pub encoding: Option<EncodingFormat>,
    pub sample_type: SampleType,
    /// Sample count from the fixed header.
    pub sample_count: usize,
    /// Unpacked samples, `None` when sample decoding was not requested.
    pub samples: Option<Samples>,
    pub blockettes: Vec<Blockette>,
    pub record_length: usize,
}

impl Record {
    /// High-precision sample period, truncated. Zero when the rate is zero.
    pub fn hp_delta(&self) -> HpTime {
        hp_delta(self.sample_rate)
    }

    /// Time of the last sample in the record.
    pub fn end_time(&self) -> HpTime {
        if self.sample_rate > 0.0 && self.sample_count > 0 {
            let span = (self.sample_count - 1) as f64 / self.sample_rate * HPTMODULUS as f64;
            // Saturates for pathological rates from corrupt headers.
            self.start_time.saturating_add((span + 0.5) as HpTime)
        } else {
            self.start_time
        }
    }

    /// First blockette of the given type.
    pub fn blockette(&self, kind: u16) -> Option<&Blockette> {
        self.blockettes.iter().find(|b| b.kind == kind)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} Hz | {} samples ({})",
            self.id,
            crate::time::format_hptime(self.start_time),
            self.sample_rate,
            self.sample_count,
            self.sample_type,
        )
    }
}

/// High-precision sample period for a rate in Hz, truncated toward zero.
pub fn hp_delta(sample_rate: f64) -> HpTime {
    if sample_rate != 0.0 {
        (HPTMODULUS as f64 / sample_rate) as HpTime
    } else {
        0
    }
}
