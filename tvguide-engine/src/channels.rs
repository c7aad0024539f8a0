//! Channel list with display renumbering.

use std::collections::HashSet;

use log::warn;
use tvguide_types::{Channel, ChannelId};

/// Outcome of [`ChannelList::renumber_and_check`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenumberReport {
    /// Number of visible channels (the `N` of `1..N`).
    pub visible: usize,
    /// Number of hidden channels kept in the list.
    pub hidden: usize,
    /// Channels removed because they were malformed.
    pub dropped: Vec<ChannelId>,
    /// Channels that received a placeholder name.
    pub renamed: Vec<ChannelId>,
}

/// Ordered list of channels known to the guide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelList {
    channels: Vec<Channel>,
}

impl ChannelList {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self { channels }
    }

    pub fn push(&mut self, channel: Channel) {
        self.channels.push(channel);
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// All channels, hidden ones included, in list order.
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    /// Visible channels in display order.
    pub fn visible(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| c.is_visible())
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }

    pub fn by_id(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Look up a visible channel by display number.
    pub fn by_number(&self, number: u32) -> Option<&Channel> {
        if number == 0 {
            return None;
        }
        self.channels.iter().find(|c| c.number == number)
    }

    /// Look up a channel by the number the backend assigned to it.
    pub fn by_backend_number(&self, backend_number: u32) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|c| c.backend_number == backend_number)
    }

    /// Validate every channel and assign dense display numbers.
    ///
    /// Channels without a backend number, or repeating a storage id, are
    /// dropped. Channels without a name get `"Channel <n>"`. Visible channels
    /// are then numbered `1..N` in list order; hidden channels get 0.
    pub fn renumber_and_check(&mut self) -> RenumberReport {
        let mut report = RenumberReport::default();
        let mut seen = HashSet::new();

        self.channels.retain(|channel| {
            if channel.backend_number == 0 {
                warn!(
                    "Dropping channel {} ({:?}): no backend number",
                    channel.id, channel.name
                );
                report.dropped.push(channel.id);
                return false;
            }
            if !seen.insert(channel.id) {
                warn!("Dropping channel {}: duplicate storage id", channel.id);
                report.dropped.push(channel.id);
                return false;
            }
            true
        });

        let mut next_number = 1;
        for channel in &mut self.channels {
            if channel.name.trim().is_empty() {
                channel.name = format!("Channel {}", channel.backend_number);
                warn!(
                    "Channel {} has no name, using {:?}",
                    channel.id, channel.name
                );
                report.renamed.push(channel.id);
            }

            if channel.is_visible() {
                channel.number = next_number;
                next_number += 1;
                report.visible += 1;
            } else {
                channel.number = 0;
                report.hidden += 1;
            }
        }

        report
    }
}

impl FromIterator<Channel> for ChannelList {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
