//! Iterator-based reader for multi-record miniSEED data.
//!
//! Use [`RecordReader`] to iterate over concatenated records in a byte slice.

use crate::decode::{self, DecodeOptions, FIXED_HEADER_LEN, MIN_RECORD_LENGTH};
use crate::record::Record;
use crate::selection::Selection;
use crate::Result;

/// Iterator over miniSEED v2 records in a byte slice.
///
/// Each call to `next()` decodes the next selected record and advances past
/// it. A record that fails to decode is yielded as an `Err` and iteration
/// resumes after it, so one corrupt record never hides the rest of the
/// buffer. The cursor moves forward on every step; iteration always ends.
///
/// # Example
///
/// ```
/// use mseed_tracelist::{RecordBuilder, RecordReader, Samples, encode};
///
/// let record = RecordBuilder::new()
///     .with_nslc("XX", "TEST", "00", "BHZ")
///     .with_samples(Samples::Int(vec![1, 2, 3]));
/// let data = encode(&record).unwrap();
///
/// let records: Vec<_> = RecordReader::new(&data)
///     .collect::<Result<Vec<_>, _>>()
///     .unwrap();
/// assert_eq!(records.len(), 1);
/// ```
pub struct RecordReader<'a> {
    data: &'a [u8],
    offset: usize,
    record_offset: usize,
    options: DecodeOptions,
    selection: Option<&'a dyn Selection>,
}

impl<'a> RecordReader<'a> {
    /// Create a new reader over the given byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            record_offset: 0,
            options: DecodeOptions::default(),
            selection: None,
        }
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Only return records accepted by `selection`.
    pub fn with_selection(mut self, selection: &'a dyn Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Byte offset at which the next record will be looked for.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Byte offset of the record most recently yielded (or failed).
    pub fn record_offset(&self) -> usize {
        self.record_offset
    }
}

impl Iterator for RecordReader<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let remaining = self.data.get(self.offset..)?;
            if remaining.len() < FIXED_HEADER_LEN {
                self.offset = self.data.len();
                return None;
            }
            self.record_offset = self.offset;

            let header = match decode::decode_header(remaining, self.options.record_length) {
                Ok(header) => header,
                Err(e) => {
                    // Resynchronise on the next minimum-length boundary.
                    self.offset += MIN_RECORD_LENGTH;
                    return Some(Err(e));
                }
            };

            let record_length = header.record.record_length;
            self.offset += record_length;

            if let Some(selection) = self.selection {
                let record = &header.record;
                if !selection.matches(&record.id, record.start_time, record.end_time()) {
                    continue;
                }
            }

            if !self.options.unpack_data {
                if remaining.len() < record_length {
                    return Some(Err(crate::MseedError::RecordTooShort {
                        expected: record_length,
                        actual: remaining.len(),
                    }));
                }
                return Some(Ok(header.record));
            }
            return Some(header.unpack(remaining));
        }
    }
}
