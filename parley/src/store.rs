//! Client-side mirror of the server's channels and messages.

use parley_core::{Channel, ChannelId, InitialData, Message};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no channel with id {0}")]
    UnknownChannel(ChannelId),
}

#[derive(Debug, Default)]
pub struct Store {
    channels: Vec<Channel>,
    messages: Vec<Message>,
    current_channel_id: Option<ChannelId>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with what the server sent.
    pub fn hydrate(&mut self, data: InitialData) {
        self.channels = data.channels;
        self.messages = data.messages;
        self.current_channel_id = data
            .current_channel_id
            .filter(|id| self.channel(*id).is_some());
        if self.current_channel_id.is_none() {
            self.current_channel_id = self.default_channel_id();
        }
    }

    fn default_channel_id(&self) -> Option<ChannelId> {
        self.channels.first().map(|c| c.id)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Look up a channel by name, with or without leading `#`, or by id.
    pub fn find_channel(&self, query: &str) -> Option<&Channel> {
        let name = query.strip_prefix('#').unwrap_or(query);
        self.channels
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.channel(query.parse().ok()?))
    }

    pub fn current_channel_id(&self) -> Option<ChannelId> {
        self.current_channel_id
    }

    pub fn current_channel(&self) -> Option<&Channel> {
        self.channel(self.current_channel_id?)
    }

    pub fn select_channel(&mut self, id: ChannelId) -> Result<&Channel, Error> {
        let index = self
            .channels
            .iter()
            .position(|c| c.id == id)
            .ok_or(Error::UnknownChannel(id))?;
        self.current_channel_id = Some(id);
        Ok(&self.channels[index])
    }

    /// Returns whether the channel was new.
    pub fn add_channel(&mut self, channel: Channel) -> bool {
        if self.channel(channel.id).is_some() {
            return false;
        }
        self.channels.push(channel);
        if self.current_channel_id.is_none() {
            self.current_channel_id = self.default_channel_id();
        }
        true
    }

    pub fn rename_channel(&mut self, id: ChannelId, name: String) -> Result<(), Error> {
        let channel = self
            .channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(Error::UnknownChannel(id))?;
        channel.name = name;
        Ok(())
    }

    /// Remove a channel along with its messages.
    ///
    /// If the channel was the current one, the first remaining channel
    /// becomes current.
    pub fn remove_channel(&mut self, id: ChannelId) -> Result<Channel, Error> {
        let index = self
            .channels
            .iter()
            .position(|c| c.id == id)
            .ok_or(Error::UnknownChannel(id))?;
        let channel = self.channels.remove(index);
        self.messages.retain(|m| m.channel_id != id);
        if self.current_channel_id == Some(id) {
            self.current_channel_id = self.default_channel_id();
        }
        Ok(channel)
    }

    /// Append a message unless one with the same id is already known.
    ///
    /// Returns whether the message was new.
    pub fn add_message(&mut self, message: Message) -> bool {
        if self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn channel_messages(&self, id: ChannelId) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.channel_id == id)
    }

    pub fn message_count(&self, id: ChannelId) -> usize {
        self.channel_messages(id).count()
    }
}
