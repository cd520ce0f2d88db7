use serde::{Deserialize, Serialize};

use crate::{ChannelId, MessageId};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default)]
    pub removable: bool,
}

/// A message as stored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub username: Option<String>,
    pub text: String,
    /// Milliseconds since the unix epoch, as generated by the sending client.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A message before the server has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub text: String,
    pub username: Option<String>,
    pub channel_id: ChannelId,
    pub timestamp: i64,
}

/// Everything the server knows about at the time of the initial fetch.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub current_channel_id: Option<ChannelId>,
}
