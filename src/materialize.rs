//! Copying a closed segment's samples into one caller-allocated buffer.
//!
//! Records are queued on their segment until it closes. Materialization
//! asks the [`BufferAllocator`] for a single buffer sized for the whole
//! segment, copies each record's samples into it in arrival order, and drops
//! each record as soon as it has been copied. No buffer is ever grown
//! incrementally.

use crate::record::Samples;
use crate::segment::Segment;
use crate::types::SampleType;
use crate::{MseedError, Result};

/// Source of destination buffers for materialized segments.
///
/// Buffers receive samples in native byte order, `sample_count *
/// sample_type.size()` bytes. Any `FnMut(usize, SampleType) -> Result<B>`
/// closure is an allocator.
pub trait BufferAllocator {
    type Buffer: AsMut<[u8]>;

    fn allocate(&mut self, sample_count: usize, sample_type: SampleType) -> Result<Self::Buffer>;
}

/// Allocates zeroed `Vec<u8>` buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct VecAllocator;

impl BufferAllocator for VecAllocator {
    type Buffer = Vec<u8>;

    fn allocate(&mut self, sample_count: usize, sample_type: SampleType) -> Result<Vec<u8>> {
        let len = sample_count
            .checked_mul(sample_type.size())
            .ok_or_else(|| MseedError::AllocationFailed(format!("{sample_count} samples overflow")))?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|e| MseedError::AllocationFailed(e.to_string()))?;
        buf.resize(len, 0);
        Ok(buf)
    }
}

impl<F, B> BufferAllocator for F
where
    F: FnMut(usize, SampleType) -> Result<B>,
    B: AsMut<[u8]>,
{
    type Buffer = B;

    fn allocate(&mut self, sample_count: usize, sample_type: SampleType) -> Result<B> {
        self(sample_count, sample_type)
    }
}

/// Materialize `segment`: copy all queued records into one buffer.
///
/// With `unpack_data` off no buffer is requested and the records are only
/// dropped. A segment with an empty queue is already materialized and is
/// left untouched, so calling this twice never duplicates samples.
pub fn materialize<A>(
    segment: &mut Segment<A::Buffer>,
    unpack_data: bool,
    allocator: &mut A,
) -> Result<()>
where
    A: BufferAllocator,
{
    if segment.records.is_empty() {
        return Ok(());
    }

    // Replace, never append to, a previous buffer.
    segment.samples = None;

    let sample_size = segment.sample_type().size();
    let mut dest = if unpack_data {
        let mut buf = allocator.allocate(segment.sample_count(), segment.sample_type())?;
        let needed = segment.sample_count() * sample_size;
        let got = buf.as_mut().len();
        if got < needed {
            return Err(MseedError::AllocationFailed(format!(
                "allocator returned {got} bytes, {needed} needed"
            )));
        }
        Some(buf)
    } else {
        None
    };

    let mut offset = 0;
    for record in segment.records.drain(..) {
        let len = record.sample_count * sample_size;
        if let (Some(buf), Some(samples)) = (dest.as_mut(), record.samples.as_ref()) {
            copy_samples(samples, &mut buf.as_mut()[offset..offset + len]);
        }
        offset += len;
    }

    segment.samples = dest;
    Ok(())
}

fn copy_samples(samples: &Samples, dest: &mut [u8]) {
    let n = samples.byte_len().min(dest.len());
    samples.write_ne_bytes(&mut dest[..n]);
}
