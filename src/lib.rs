//! Assemble miniSEED v2 records into contiguous per-channel trace segments.
//!
//! Zero `unsafe`, zero C dependencies. A buffer of concatenated records is
//! decoded record by record (uncompressed INT16/32, FLOAT32/64, ASCII and
//! Steim1/2 payloads), grouped by channel, and merged into segments of
//! evenly sampled data. Each segment's samples end up in one buffer handed
//! out by a caller-supplied [`BufferAllocator`].
//!
//! # Assembling a trace list
//!
//! ```
//! use mseed_tracelist::{AssembleOptions, RecordBuilder, Samples, VecAllocator, assemble, encode};
//!
//! // Two contiguous 1 Hz records and one after a gap
//! let mut data = Vec::new();
//! for (start, samples) in [(0, vec![1, 2]), (2_000_000, vec![3]), (60_000_000, vec![4])] {
//!     let record = RecordBuilder::new()
//!         .with_nslc("IU", "ANMO", "00", "BHZ")
//!         .with_sample_rate(1.0)
//!         .with_start_time(start)
//!         .with_samples(Samples::Int(samples));
//!     data.extend_from_slice(&encode(&record).unwrap());
//! }
//!
//! let traces = assemble(&data, None, &AssembleOptions::default(), VecAllocator).unwrap();
//! assert_eq!(traces.len(), 1);
//!
//! let segments = traces.channels()[0].segments();
//! assert_eq!(segments.len(), 2);
//! assert_eq!(segments[0].sample_count(), 3);
//! assert_eq!(segments[1].samples_typed(), Some(Samples::Int(vec![4])));
//! ```
//!
//! # Selecting channels and time windows
//!
//! ```
//! use mseed_tracelist::{
//!     AssembleOptions, RecordBuilder, Samples, SelectionList, VecAllocator, assemble, encode,
//! };
//!
//! let mut data = Vec::new();
//! for cha in ["BHZ", "BHN", "LHZ"] {
//!     let record = RecordBuilder::new()
//!         .with_nslc("IU", "ANMO", "00", cha)
//!         .with_samples(Samples::Int(vec![1, 2, 3]));
//!     data.extend_from_slice(&encode(&record).unwrap());
//! }
//!
//! let selection = SelectionList::new().with_pattern("IU_ANMO_*_BH?");
//! let traces = assemble(&data, Some(&selection), &AssembleOptions::default(), VecAllocator).unwrap();
//!
//! let channels: Vec<_> = traces.iter().map(|c| c.id().channel.as_str()).collect();
//! // Newest channel first
//! assert_eq!(channels, ["BHN", "BHZ"]);
//! ```
//!
//! # Reading individual records
//!
//! ```
//! use mseed_tracelist::{BTime, RecordBuilder, RecordReader, Samples, encode};
//!
//! let start = BTime { year: 2025, day: 100, hour: 12, minute: 30, second: 45, fract: 0 };
//! let record = RecordBuilder::new()
//!     .with_nslc("XX", "TEST", "00", "BHZ")
//!     .with_start_time(start.to_hptime())
//!     .with_sample_rate(20.0)
//!     .with_samples(Samples::Int(vec![1, -2, 3, -4]));
//!
//! let bytes = encode(&record).unwrap();
//! assert_eq!(bytes.len(), 512);
//!
//! let decoded = RecordReader::new(&bytes).next().unwrap().unwrap();
//! assert_eq!(decoded.id.station, "TEST");
//! assert_eq!(decoded.start_time, start.to_hptime());
//! assert_eq!(decoded.samples, Some(Samples::Int(vec![1, -2, 3, -4])));
//! ```

pub mod assemble;
pub mod classify;
pub mod decode;
pub mod encode;
pub mod error;
pub mod index;
pub mod materialize;
pub mod reader;
pub mod record;
pub mod segment;
pub mod selection;
pub mod steim;
pub mod time;
pub mod tracelist;
pub mod types;

pub use error::{MseedError, Result};
pub use reader::RecordReader;
pub use record::{Blockette, ChannelId, Record, Samples};
pub use time::{BTime, HPTMODULUS, HpTime};
pub use types::{ByteOrder, EncodingFormat, SampleType};

pub use classify::{Calibration, FieldDesc};
pub use materialize::{BufferAllocator, VecAllocator};
pub use segment::{Channel, Segment};
pub use selection::{Selection, SelectionList, TimeWindow};
pub use tracelist::TraceList;

pub use assemble::{AssembleOptions, Assembler, assemble};
pub use decode::{DecodeOptions, decode_record};
pub use encode::{RecordBuilder, encode};
