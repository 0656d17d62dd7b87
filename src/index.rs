//! Channel lookup during an assembly pass.

use crate::record::ChannelId;
use crate::segment::Channel;

/// Channels seen so far.
///
/// Stored in creation order; handed out newest first. Lookups try the most
/// recently used channel first, then scan from the newest channel backward:
/// consecutive records usually share a channel, and the number of distinct
/// channels is small next to the number of records.
#[derive(Debug)]
pub struct ChannelIndex<B> {
    channels: Vec<Channel<B>>,
    last_used: Option<usize>,
}

impl<B> ChannelIndex<B> {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            last_used: None,
        }
    }

    /// Return the channel for `id`, creating it if this is its first record.
    pub fn find_or_create(&mut self, id: &ChannelId) -> &mut Channel<B> {
        let hit = self
            .last_used
            .filter(|&i| self.channels[i].id() == id)
            .or_else(|| self.channels.iter().rposition(|c| c.id() == id));

        let index = match hit {
            Some(i) => i,
            None => {
                self.channels.push(Channel::new(id.clone()));
                self.channels.len() - 1
            }
        };
        self.last_used = Some(index);
        &mut self.channels[index]
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut Channel<B>> {
        self.channels.iter_mut()
    }

    /// All channels, most recently created first.
    pub fn into_channels(self) -> Vec<Channel<B>> {
        let mut channels = self.channels;
        channels.reverse();
        channels
    }
}

impl<B> Default for ChannelIndex<B> {
    fn default() -> Self {
        Self::new()
    }
}
