//! The assembly pass: records in, [`TraceList`] out.
//!
//! [`assemble()`] reads every record of a buffer and feeds it to an
//! [`Assembler`]. Records whose decoding fails are skipped; only a failing
//! [`BufferAllocator`] aborts the pass.

use tracing::{debug, warn};

use crate::Result;
use crate::classify::{FieldDesc, TraitExtractor};
use crate::decode::DecodeOptions;
use crate::index::ChannelIndex;
use crate::materialize::{BufferAllocator, materialize};
use crate::reader::RecordReader;
use crate::record::Record;
use crate::selection::Selection;
use crate::tracelist::TraceList;

/// Configuration of an assembly pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Unpack samples and materialize them into allocator buffers.
    pub unpack_data: bool,
    /// Record length to assume for records without Blockette 1000; 0 means
    /// detect it from each record.
    pub record_length: usize,
    /// Log records that fail to decode.
    pub verbose: bool,
    /// Derive timing quality and calibration traits even without
    /// fingerprint fields.
    pub details: bool,
    /// Blockette byte ranges that must match for records to merge.
    pub fingerprint: Vec<FieldDesc>,
}

impl AssembleOptions {
    /// Create options with the defaults: unpack samples, detect record
    /// length, no logging of skipped records.
    pub fn new() -> Self {
        Self {
            unpack_data: true,
            record_length: 0,
            verbose: false,
            details: false,
            fingerprint: Vec::new(),
        }
    }

    /// Set whether samples are unpacked and materialized.
    pub fn with_unpack_data(mut self, unpack: bool) -> Self {
        self.unpack_data = unpack;
        self
    }

    /// Set the record length assumed without Blockette 1000 (0 detects it).
    pub fn with_record_length(mut self, len: usize) -> Self {
        self.record_length = len;
        self
    }

    /// Set whether skipped records are logged.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set whether timing quality and calibration traits are derived.
    pub fn with_details(mut self, details: bool) -> Self {
        self.details = details;
        self
    }

    /// Set the blockette fields that must match for records to merge.
    pub fn with_fingerprint(mut self, fields: Vec<FieldDesc>) -> Self {
        self.fingerprint = fields;
        self
    }

    /// Options for decoding the individual records of this pass.
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            unpack_data: self.unpack_data,
            record_length: self.record_length,
        }
    }
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental assembler: push records one at a time, then finish.
pub struct Assembler<A: BufferAllocator> {
    index: ChannelIndex<A::Buffer>,
    extractor: TraitExtractor,
    allocator: A,
    unpack_data: bool,
    record_count: usize,
}

impl<A: BufferAllocator> Assembler<A> {
    pub fn new(options: &AssembleOptions, allocator: A) -> Self {
        Self {
            index: ChannelIndex::new(),
            extractor: TraitExtractor::new(options.fingerprint.clone(), options.details),
            allocator,
            unpack_data: options.unpack_data,
            record_count: 0,
        }
    }

    /// Add one decoded record to its channel.
    pub fn push(&mut self, record: Record) -> Result<()> {
        self.record_count += 1;
        let traits = self.extractor.extract(&record);
        let channel = self.index.find_or_create(&record.id);
        channel.append(record, &traits, self.unpack_data, &mut self.allocator)
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Materialize the open segment of every channel and return the list.
    pub fn finish(mut self) -> Result<TraceList<A::Buffer>> {
        if self.record_count == 0 {
            return Ok(TraceList::placeholder());
        }
        for channel in self.index.channels_mut() {
            if let Some(open) = channel.last_segment_mut() {
                materialize(open, self.unpack_data, &mut self.allocator)?;
            }
        }
        Ok(TraceList::new(self.index.into_channels(), self.record_count))
    }
}

/// Assemble all records of `data` into per-channel contiguous segments.
///
/// Records not accepted by `selection` are ignored. Records that fail to
/// decode are skipped (and logged at `warn` level when
/// [`verbose`](AssembleOptions::verbose) is set). An error is only returned
/// when `allocator` fails.
///
/// # Example
///
/// ```
/// use mseed_tracelist::{AssembleOptions, RecordBuilder, Samples, VecAllocator, assemble, encode};
///
/// let mut data = Vec::new();
/// for (i, chunk) in [[1, 2], [3, 4]].iter().enumerate() {
///     let record = RecordBuilder::new()
///         .with_nslc("IU", "ANMO", "00", "BHZ")
///         .with_sample_rate(1.0)
///         .with_start_time(i as i64 * 2_000_000)
///         .with_samples(Samples::Int(chunk.to_vec()));
///     data.extend_from_slice(&encode(&record).unwrap());
/// }
///
/// let traces = assemble(&data, None, &AssembleOptions::default(), VecAllocator).unwrap();
/// let segments = traces.channels()[0].segments();
/// assert_eq!(segments.len(), 1);
/// assert_eq!(segments[0].samples_typed(), Some(Samples::Int(vec![1, 2, 3, 4])));
/// ```
pub fn assemble<A: BufferAllocator>(
    data: &[u8],
    selection: Option<&dyn Selection>,
    options: &AssembleOptions,
    allocator: A,
) -> Result<TraceList<A::Buffer>> {
    let mut reader = RecordReader::new(data).with_options(options.decode_options());
    if let Some(selection) = selection {
        reader = reader.with_selection(selection);
    }

    let mut assembler = Assembler::new(options, allocator);
    let mut failures = 0usize;
    while let Some(item) = reader.next() {
        match item {
            Ok(record) => assembler.push(record)?,
            Err(e) => {
                failures += 1;
                if options.verbose {
                    warn!(offset = reader.record_offset(), error = %e, "error parsing record");
                }
            }
        }
    }

    let list = assembler.finish()?;
    debug!(
        records = list.record_count(),
        failures,
        channels = list.len(),
        segments = list.segment_count(),
        "assembled trace list"
    );
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Calibration;
    use crate::encode::{RecordBuilder, encode};
    use crate::materialize::VecAllocator;
    use crate::record::{ChannelId, Samples};
    use crate::time::HPTMODULUS;
    use crate::types::SampleType;

    fn bhz(start: i64, samples: Vec<i32>) -> RecordBuilder {
        RecordBuilder::new()
            .with_nslc("IU", "ANMO", "00", "BHZ")
            .with_sample_rate(10.0)
            .with_start_time(start)
            .with_samples(Samples::Int(samples))
    }

    fn stream(builders: &[RecordBuilder]) -> Vec<u8> {
        builders.iter().flat_map(|b| encode(b).unwrap()).collect()
    }

    #[test]
    fn test_merges_contiguous_and_splits_at_gap() {
        let data = stream(&[
            bhz(0, vec![1, 2, 3]),
            bhz(300_000, vec![4, 5]),
            bhz(10 * HPTMODULUS, vec![6]),
        ]);
        let list = assemble(&data, None, &AssembleOptions::default(), VecAllocator).unwrap();

        assert_eq!(list.record_count(), 3);
        let segs = list.channels()[0].segments();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].samples_typed(), Some(Samples::Int(vec![1, 2, 3, 4, 5])));
        assert_eq!(segs[1].samples_typed(), Some(Samples::Int(vec![6])));
        assert!(segs.iter().all(|s| s.is_materialized()));
    }

    #[test]
    fn test_calibration_splits_only_with_details() {
        let data = stream(&[
            bhz(0, vec![1, 2]),
            bhz(200_000, vec![3, 4]).with_blockette(300, vec![]),
        ]);

        let plain = assemble(&data, None, &AssembleOptions::default(), VecAllocator).unwrap();
        assert_eq!(plain.segment_count(), 1);

        let options = AssembleOptions::new().with_details(true);
        let detailed = assemble(&data, None, &options, VecAllocator).unwrap();
        let segs = detailed.channels()[0].segments();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].calibration(), Calibration::None);
        assert_eq!(segs[1].calibration(), Calibration::Step);
    }

    #[test]
    fn test_timing_quality_change_splits() {
        let data = stream(&[
            bhz(0, vec![1, 2]).with_timing_quality(100, 0),
            bhz(200_000, vec![3, 4]).with_timing_quality(100, 0),
            bhz(400_000, vec![5, 6]).with_timing_quality(60, 0),
        ]);
        let options = AssembleOptions::new().with_details(true);
        let list = assemble(&data, None, &options, VecAllocator).unwrap();
        let qualities: Vec<u8> = list.channels()[0]
            .segments()
            .iter()
            .map(|s| s.timing_quality())
            .collect();
        assert_eq!(qualities, vec![100, 60]);
    }

    #[test]
    fn test_fingerprint_fields_split_segments() {
        let data = stream(&[
            bhz(0, vec![1]).with_blockette(500, vec![7; 196]),
            bhz(100_000, vec![2]).with_blockette(500, vec![7; 196]),
            bhz(200_000, vec![3]).with_blockette(500, vec![8; 196]),
        ]);
        let options = AssembleOptions::new().with_fingerprint(vec![FieldDesc::new(500, 4, 2)]);
        let list = assemble(&data, None, &options, VecAllocator).unwrap();
        let segs = list.channels()[0].segments();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].fingerprint(), &[7, 7]);
        assert_eq!(segs[1].fingerprint(), &[8, 8]);
    }

    #[test]
    fn test_header_only_pass() {
        let data = stream(&[bhz(0, vec![1, 2]), bhz(200_000, vec![3])]);
        let options = AssembleOptions::new().with_unpack_data(false);
        let mut calls = 0;
        let alloc = |n: usize, t: SampleType| {
            calls += 1;
            VecAllocator.allocate(n, t)
        };
        let list = assemble(&data, None, &options, alloc).unwrap();
        assert_eq!(calls, 0);
        let seg = &list.channels()[0].segments()[0];
        assert_eq!(seg.sample_count(), 3);
        assert!(seg.samples().is_none());
        assert!(seg.is_materialized());
    }

    #[test]
    fn test_selection_is_applied() {
        let data = stream(&[
            bhz(0, vec![1]),
            RecordBuilder::new()
                .with_nslc("IU", "ANMO", "00", "LHZ")
                .with_samples(Samples::Int(vec![2])),
        ]);
        let only_lhz = |id: &ChannelId, _: i64, _: i64| id.channel == "LHZ";
        let list = assemble(&data, Some(&only_lhz), &AssembleOptions::default(), VecAllocator).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.channels()[0].id().channel, "LHZ");
    }

    #[test]
    fn test_incremental_assembler() {
        let mut assembler = Assembler::new(&AssembleOptions::default(), VecAllocator);
        for b in [bhz(0, vec![1]), bhz(100_000, vec![2])] {
            let record = crate::decode::decode_record(&encode(&b).unwrap(), &DecodeOptions::default())
                .unwrap();
            assembler.push(record).unwrap();
        }
        assert_eq!(assembler.record_count(), 2);
        let list = assembler.finish().unwrap();
        assert_eq!(list.total_samples(), 2);
    }
}
