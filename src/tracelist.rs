//! The result of an assembly pass.

use crate::record::ChannelId;
use crate::segment::Channel;

/// Channels with their materialized segments, newest channel first.
///
/// Owns every segment and sample buffer; dropping the list releases them
/// all. A pass that decodes no record at all yields a list holding a single
/// placeholder channel with a default identity and no segments.
#[derive(Debug)]
pub struct TraceList<B> {
    channels: Vec<Channel<B>>,
    record_count: usize,
}

impl<B> TraceList<B> {
    pub(crate) fn new(channels: Vec<Channel<B>>, record_count: usize) -> Self {
        Self {
            channels,
            record_count,
        }
    }

    pub(crate) fn placeholder() -> Self {
        Self::new(vec![Channel::new(ChannelId::default())], 0)
    }

    /// Number of records that went into this list.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channels(&self) -> &[Channel<B>] {
        &self.channels
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Channel<B>> {
        self.channels.iter()
    }

    pub fn into_channels(self) -> Vec<Channel<B>> {
        self.channels
    }

    /// Channel with exactly this identity.
    pub fn get(&self, id: &ChannelId) -> Option<&Channel<B>> {
        self.channels.iter().find(|c| c.id() == id)
    }

    /// Total number of segments over all channels.
    pub fn segment_count(&self) -> usize {
        self.channels.iter().map(|c| c.segments().len()).sum()
    }

    /// Total number of samples over all segments.
    pub fn total_samples(&self) -> usize {
        self.channels
            .iter()
            .flat_map(|c| c.segments())
            .map(|s| s.sample_count())
            .sum()
    }
}

impl<'a, B> IntoIterator for &'a TraceList<B> {
    type Item = &'a Channel<B>;
    type IntoIter = std::slice::Iter<'a, Channel<B>>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter()
    }
}

impl<B> IntoIterator for TraceList<B> {
    type Item = Channel<B>;
    type IntoIter = std::vec::IntoIter<Channel<B>>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder() {
        let list: TraceList<Vec<u8>> = TraceList::placeholder();
        assert_eq!(list.len(), 1);
        assert_eq!(list.record_count(), 0);
        assert_eq!(list.segment_count(), 0);
        assert_eq!(list.channels()[0].id(), &ChannelId::default());
    }
}
