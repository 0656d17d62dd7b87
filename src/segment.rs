//! Channels and their segments: maximal runs of contiguous, compatible
//! records.
//!
//! While a segment is open it queues the records appended to it. When the
//! next record of its channel starts a new segment, the open one is closed
//! and materialized: its samples are copied into one buffer and the queued
//! records are dropped. Only the last segment of each channel ever holds
//! queued records, which bounds memory to one segment's worth of raw
//! records per channel.

use std::fmt;

use tracing::trace;

use crate::Result;
use crate::classify::{Calibration, Continuity, RecordTraits, classify};
use crate::materialize::{BufferAllocator, materialize};
use crate::record::{ChannelId, Record, Samples};
use crate::time::{HpTime, format_hptime};
use crate::types::SampleType;

/// A run of time-contiguous records of one channel.
///
/// `B` is the sample buffer type handed out by the
/// [`BufferAllocator`](crate::BufferAllocator).
#[derive(Debug)]
pub struct Segment<B> {
    start_time: HpTime,
    end_time: HpTime,
    sample_rate: f64,
    sample_type: SampleType,
    sample_count: usize,
    hp_delta: HpTime,
    timing_quality: u8,
    calibration: Calibration,
    fingerprint: Box<[u8]>,
    record_count: usize,
    pub(crate) records: Vec<Record>,
    pub(crate) samples: Option<B>,
}

impl<B> Segment<B> {
    /// Open a segment seeded with `record`.
    pub fn start(record: Record, traits: &RecordTraits<'_>) -> Self {
        Self {
            start_time: record.start_time,
            end_time: record.end_time(),
            sample_rate: record.sample_rate,
            sample_type: record.sample_type,
            sample_count: record.sample_count,
            hp_delta: record.hp_delta(),
            timing_quality: traits.timing_quality,
            calibration: traits.calibration,
            fingerprint: traits.fingerprint.into(),
            record_count: 1,
            records: vec![record],
            samples: None,
        }
    }

    /// Append a record classified as continuing this segment.
    pub(crate) fn extend(&mut self, record: Record) {
        self.sample_count += record.sample_count;
        self.end_time = record.end_time();
        self.record_count += 1;
        self.records.push(record);
    }

    pub fn start_time(&self) -> HpTime {
        self.start_time
    }

    /// Time of the last sample.
    pub fn end_time(&self) -> HpTime {
        self.end_time
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Sample period in high-precision ticks, fixed by the first record.
    pub fn hp_delta(&self) -> HpTime {
        self.hp_delta
    }

    pub fn timing_quality(&self) -> u8 {
        self.timing_quality
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn fingerprint(&self) -> &[u8] {
        &self.fingerprint
    }

    /// Number of records merged into this segment.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Records still waiting to be materialized.
    pub fn pending_records(&self) -> &[Record] {
        &self.records
    }

    /// `true` once the record queue has been drained.
    pub fn is_materialized(&self) -> bool {
        self.records.is_empty()
    }

    /// The materialized sample buffer, if samples were unpacked.
    pub fn samples(&self) -> Option<&B> {
        self.samples.as_ref()
    }

    pub fn into_samples(self) -> Option<B> {
        self.samples
    }
}

impl<B: AsRef<[u8]>> Segment<B> {
    /// View the materialized buffer as typed samples.
    pub fn samples_typed(&self) -> Option<Samples> {
        self.samples
            .as_ref()
            .map(|buf| Samples::from_ne_bytes(self.sample_type, buf.as_ref()))
    }
}

impl<B> fmt::Display for Segment<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} | {} Hz | {} samples ({})",
            format_hptime(self.start_time),
            format_hptime(self.end_time),
            self.sample_rate,
            self.sample_count,
            self.sample_type,
        )
    }
}

/// All segments of one channel, in arrival order.
#[derive(Debug)]
pub struct Channel<B> {
    id: ChannelId,
    segments: Vec<Segment<B>>,
}

impl<B> Channel<B> {
    pub fn new(id: ChannelId) -> Self {
        Self {
            id,
            segments: Vec::new(),
        }
    }

    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn segments(&self) -> &[Segment<B>] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment<B>> {
        self.segments
    }

    /// The open (last) segment, if any.
    pub fn last_segment_mut(&mut self) -> Option<&mut Segment<B>> {
        self.segments.last_mut()
    }

    /// Add `record` to this channel.
    ///
    /// Either it extends the open segment, or the open segment is
    /// materialized through `allocator` and a new one is started.
    pub fn append<A>(
        &mut self,
        record: Record,
        traits: &RecordTraits<'_>,
        unpack_data: bool,
        allocator: &mut A,
    ) -> Result<()>
    where
        A: BufferAllocator<Buffer = B>,
    {
        let continuity = classify(self.segments.last(), &record, traits);
        if let Some(open) = self.segments.last_mut() {
            if continuity == Continuity::Extend {
                open.extend(record);
                return Ok(());
            }
            trace!(channel = %self.id, segment = %open, "closing segment");
            materialize(open, unpack_data, allocator)?;
        }
        self.segments.push(Segment::start(record, traits));
        Ok(())
    }
}
