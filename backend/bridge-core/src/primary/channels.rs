//! Channel registry seam.
//!
//! The real registry belongs to the application's chat layer; the bridge only
//! needs to resolve a channel by name and point the "watching" slot at it.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

#[derive(Debug, PartialEq, Eq)]
pub struct Channel {
    name: String,
}

impl Channel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Shared reference to a channel. Identity is pointer identity.
pub type ChannelHandle = Arc<Channel>;

/// Channel state owned by the primary context.
pub trait ChannelRegistry: Send {
    /// Look up `name`, creating the channel on first use.
    fn get_or_add_channel(&mut self, name: &str) -> ChannelHandle;

    /// Channel the user is currently watching in the browser.
    fn watching_channel(&self) -> Option<ChannelHandle>;

    fn set_watching_channel(&mut self, channel: ChannelHandle);
}

/// Registry that keeps channels in a map. Enough for the standalone app.
#[derive(Debug, Default)]
pub struct InMemoryChannelRegistry {
    channels: HashMap<String, ChannelHandle>,
    watching: Option<ChannelHandle>,
}

impl InMemoryChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl ChannelRegistry for InMemoryChannelRegistry {
    fn get_or_add_channel(&mut self, name: &str) -> ChannelHandle {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Adding channel {name}");
                Arc::new(Channel::new(name))
            })
            .clone()
    }

    fn watching_channel(&self) -> Option<ChannelHandle> {
        self.watching.clone()
    }

    fn set_watching_channel(&mut self, channel: ChannelHandle) {
        self.watching = Some(channel);
    }
}
