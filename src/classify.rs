//! Continuity classification: does a record extend a channel's open segment?
//!
//! Besides time and rate, two records only belong to the same segment when
//! they agree on blockette-derived traits: the B1001 timing quality, the
//! kind of calibration blockette present, and a caller-defined fingerprint
//! of selected blockette bytes.

use crate::record::Record;
use crate::segment::Segment;
use crate::time::HpTime;

/// Timing quality recorded when a record has no Blockette 1001.
pub const TIMING_QUALITY_UNKNOWN: u8 = 0xFF;

/// Relative sample rate tolerance: `|1 - a/b|` must stay below this.
pub const RATE_TOLERANCE: f64 = 0.0001;

/// Calibration blockette present in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Calibration {
    #[default]
    None,
    /// Blockette 300.
    Step,
    /// Blockette 310.
    Sine,
    /// Blockette 320.
    PseudoRandom,
    /// Blockette 390.
    Generic,
    /// Blockette 395.
    Abort,
}

impl Calibration {
    pub fn from_blockette(kind: u16) -> Option<Self> {
        match kind {
            300 => Some(Self::Step),
            310 => Some(Self::Sine),
            320 => Some(Self::PseudoRandom),
            390 => Some(Self::Generic),
            395 => Some(Self::Abort),
            _ => None,
        }
    }

    /// Numeric code: 1 to 4 for blockettes 300 to 390, -2 for 395, -1 for none.
    pub fn code(self) -> i8 {
        match self {
            Self::None => -1,
            Self::Step => 1,
            Self::Sine => 2,
            Self::PseudoRandom => 3,
            Self::Generic => 4,
            Self::Abort => -2,
        }
    }
}

/// A byte range of one blockette type to include in the fingerprint.
///
/// `offset` is relative to the blockette body, after its 4-byte
/// type/next-offset header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDesc {
    pub blockette: u16,
    pub offset: usize,
    pub length: usize,
}

impl FieldDesc {
    pub fn new(blockette: u16, offset: usize, length: usize) -> Self {
        Self {
            blockette,
            offset,
            length,
        }
    }
}

/// Blockette-derived values a record must share with its segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTraits<'a> {
    pub timing_quality: u8,
    pub calibration: Calibration,
    pub fingerprint: &'a [u8],
}

/// Derives [`RecordTraits`] for each record of an assembly pass.
///
/// Owns the fingerprint scratch buffer, which is reused for every record.
#[derive(Debug, Clone)]
pub struct TraitExtractor {
    fields: Vec<FieldDesc>,
    details: bool,
    scratch: Vec<u8>,
}

impl TraitExtractor {
    pub fn new(fields: Vec<FieldDesc>, details: bool) -> Self {
        let len = fields.iter().map(|f| f.length).sum();
        Self {
            fields,
            details,
            scratch: vec![0; len],
        }
    }

    /// Whether any trait is derived at all. When not, every record gets
    /// the same neutral traits and segments merge on time, rate, and sample
    /// type alone.
    pub fn is_active(&self) -> bool {
        self.details || !self.scratch.is_empty()
    }

    pub fn extract(&mut self, record: &Record) -> RecordTraits<'_> {
        let mut traits = RecordTraits {
            timing_quality: TIMING_QUALITY_UNKNOWN,
            calibration: Calibration::None,
            fingerprint: &[],
        };
        if !self.is_active() {
            return traits;
        }

        self.scratch.fill(0);
        for blkt in &record.blockettes {
            let mut step = 0;
            for field in &self.fields {
                if field.blockette == blkt.kind {
                    let src = blkt.data.get(field.offset..).unwrap_or(&[]);
                    let n = field.length.min(src.len());
                    self.scratch[step..step + n].copy_from_slice(&src[..n]);
                }
                step += field.length;
            }

            if let Some(calibration) = Calibration::from_blockette(blkt.kind) {
                traits.calibration = calibration;
            }
            if blkt.kind == 1001 {
                if let Some(&quality) = blkt.data.first() {
                    traits.timing_quality = quality;
                }
            }
        }

        traits.fingerprint = &self.scratch;
        traits
    }
}

/// Outcome of classifying a record against a channel's open segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    Extend,
    StartNew,
}

/// Decide whether `record` extends `open` or must start a new segment.
///
/// The record extends the segment only when its start time is one sample
/// period after the segment end, within half a period either way, and it
/// agrees on sample type, rate, and all [`RecordTraits`]. Records that
/// arrive out of time order fail the gap test; they are never reordered.
pub fn classify<B>(open: Option<&Segment<B>>, record: &Record, traits: &RecordTraits<'_>) -> Continuity {
    let Some(segment) = open else {
        return Continuity::StartNew;
    };

    let hp_delta = segment.hp_delta();
    let tolerance = (0.5 * hp_delta as f64) as HpTime;
    // A zero tolerance keeps the window at [0, 0].
    let lower = if tolerance != 0 { -tolerance } else { 0 };
    let gap = record
        .start_time
        .saturating_sub(segment.end_time())
        .saturating_sub(hp_delta);

    let continuous = segment.sample_type() == record.sample_type
        && rate_tolerable(segment.sample_rate(), record.sample_rate)
        && (lower..=tolerance).contains(&gap)
        && segment.timing_quality() == traits.timing_quality
        && segment.calibration() == traits.calibration
        && segment.fingerprint() == traits.fingerprint;

    if continuous {
        Continuity::Extend
    } else {
        Continuity::StartNew
    }
}

/// Two zero rates give NaN here and so never compare as tolerable.
pub fn rate_tolerable(a: f64, b: f64) -> bool {
    (1.0 - a / b).abs() < RATE_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Blockette, ChannelId};
    use crate::types::{EncodingFormat, SampleType};

    fn record(start: HpTime, rate: f64, count: usize, blockettes: Vec<Blockette>) -> Record {
        Record {
            id: ChannelId::new("IU", "ANMO", "00", "BHZ", 'D'),
            sequence_number: "000001".into(),
            start_time: start,
            sample_rate: rate,
            encoding: Some(EncodingFormat::Int32),
            sample_type: SampleType::Int,
            sample_count: count,
            samples: None,
            blockettes,
            record_length: 512,
        }
    }

    fn open_segment(first: &Record, traits: &RecordTraits<'_>) -> Segment<Vec<u8>> {
        Segment::start(first.clone(), traits)
    }

    const NEUTRAL: RecordTraits<'static> = RecordTraits {
        timing_quality: TIMING_QUALITY_UNKNOWN,
        calibration: Calibration::None,
        fingerprint: &[],
    };

    #[test]
    fn test_no_open_segment_starts_new() {
        let r = record(0, 100.0, 10, vec![]);
        assert_eq!(classify::<Vec<u8>>(None, &r, &NEUTRAL), Continuity::StartNew);
    }

    #[test]
    fn test_gap_window_is_half_a_sample() {
        // 100 Hz, 10 samples from t=0: last sample at 90_000, next due 100_000.
        let seg = open_segment(&record(0, 100.0, 10, vec![]), &NEUTRAL);
        for (start, expected) in [
            (100_000, Continuity::Extend),
            (95_000, Continuity::Extend),
            (105_000, Continuity::Extend),
            (94_999, Continuity::StartNew),
            (105_001, Continuity::StartNew),
            (0, Continuity::StartNew),
        ] {
            let next = record(start, 100.0, 10, vec![]);
            assert_eq!(classify(Some(&seg), &next, &NEUTRAL), expected, "start {start}");
        }
    }

    #[test]
    fn test_extreme_times_do_not_overflow() {
        let slow = 1.0 / (32_767.0 * 32_767.0);
        let seg = open_segment(&record(0, slow, 65_535, vec![]), &NEUTRAL);
        assert_eq!(seg.end_time(), HpTime::MAX);
        let next = record(HpTime::MIN, slow, 1, vec![]);
        assert_eq!(classify(Some(&seg), &next, &NEUTRAL), Continuity::StartNew);
    }

    #[test]
    fn test_rate_tolerance() {
        let seg = open_segment(&record(0, 100.0, 10, vec![]), &NEUTRAL);
        let close = record(100_000, 100.005, 10, vec![]);
        let far = record(100_000, 100.02, 10, vec![]);
        assert_eq!(classify(Some(&seg), &close, &NEUTRAL), Continuity::Extend);
        assert_eq!(classify(Some(&seg), &far, &NEUTRAL), Continuity::StartNew);
    }

    #[test]
    fn test_zero_rate_never_merges() {
        let seg = open_segment(&record(0, 0.0, 1, vec![]), &NEUTRAL);
        let next = record(0, 0.0, 1, vec![]);
        assert_eq!(classify(Some(&seg), &next, &NEUTRAL), Continuity::StartNew);
        assert!(!rate_tolerable(0.0, 0.0));
    }

    #[test]
    fn test_sample_type_must_match() {
        let seg = open_segment(&record(0, 100.0, 10, vec![]), &NEUTRAL);
        let mut next = record(100_000, 100.0, 10, vec![]);
        next.sample_type = SampleType::Float;
        assert_eq!(classify(Some(&seg), &next, &NEUTRAL), Continuity::StartNew);
    }

    #[test]
    fn test_traits_must_match() {
        let seg = open_segment(&record(0, 100.0, 10, vec![]), &NEUTRAL);
        let next = record(100_000, 100.0, 10, vec![]);
        let calibrated = RecordTraits {
            calibration: Calibration::Sine,
            ..NEUTRAL
        };
        let timed = RecordTraits {
            timing_quality: 90,
            ..NEUTRAL
        };
        let fingerprinted = RecordTraits {
            fingerprint: &[1],
            ..NEUTRAL
        };
        for traits in [calibrated, timed, fingerprinted] {
            assert_eq!(classify(Some(&seg), &next, &traits), Continuity::StartNew);
        }
    }

    #[test]
    fn test_extractor_inactive_by_default() {
        let mut extractor = TraitExtractor::new(vec![], false);
        let r = record(
            0,
            1.0,
            1,
            vec![
                Blockette {
                    kind: 1001,
                    data: vec![50, 0, 0, 0],
                },
                Blockette {
                    kind: 300,
                    data: vec![0; 56],
                },
            ],
        );
        assert!(!extractor.is_active());
        assert_eq!(extractor.extract(&r), NEUTRAL);
    }

    #[test]
    fn test_extractor_details() {
        let mut extractor = TraitExtractor::new(vec![], true);
        let r = record(
            0,
            1.0,
            1,
            vec![
                Blockette {
                    kind: 310,
                    data: vec![0; 56],
                },
                Blockette {
                    kind: 1001,
                    data: vec![50, 0, 0, 0],
                },
                Blockette {
                    kind: 395,
                    data: vec![0; 12],
                },
            ],
        );
        let traits = extractor.extract(&r);
        assert_eq!(traits.timing_quality, 50);
        assert_eq!(traits.calibration, Calibration::Abort);
        assert_eq!(traits.calibration.code(), -2);
    }

    #[test]
    fn test_fingerprint_fields_in_descriptor_order() {
        let fields = vec![
            FieldDesc::new(1001, 2, 2),
            FieldDesc::new(500, 0, 3),
            FieldDesc::new(1001, 0, 1),
        ];
        let mut extractor = TraitExtractor::new(fields, false);
        assert!(extractor.is_active());

        let with_1001 = record(
            0,
            1.0,
            1,
            vec![Blockette {
                kind: 1001,
                data: vec![77, 1, 9, 8],
            }],
        );
        assert_eq!(extractor.extract(&with_1001).fingerprint, &[9, 8, 0, 0, 0, 77]);

        // Scratch is reset between records.
        let bare = record(0, 1.0, 1, vec![]);
        assert_eq!(extractor.extract(&bare).fingerprint, &[0; 6]);

        // Short blockette bodies copy what is there.
        let short = record(
            0,
            1.0,
            1,
            vec![Blockette {
                kind: 500,
                data: vec![4],
            }],
        );
        assert_eq!(extractor.extract(&short).fingerprint, &[0, 0, 4, 0, 0, 0]);
    }
}
