//! Socket events exchanged with the chat server.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Channel, ChannelId, Message};

pub const NEW_MESSAGE: &str = "newMessage";
pub const NEW_CHANNEL: &str = "newChannel";
pub const REMOVE_CHANNEL: &str = "removeChannel";
pub const RENAME_CHANNEL: &str = "renameChannel";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewChannel {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RenameChannel {
    pub id: ChannelId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoveChannel {
    pub id: ChannelId,
}

/// The first argument the server passed to an acknowledgement callback.
///
/// The server only documents `{"status": "ok"}`. Anything else, including
/// a missing argument, counts as not ok.
#[derive(Debug, Clone, PartialEq)]
pub struct Ack(pub Value);

impl Ack {
    pub fn status(&self) -> Option<&str> {
        self.0.get("status")?.as_str()
    }

    pub fn is_ok(&self) -> bool {
        self.status() == Some("ok")
    }

    /// The `data` field some acknowledgements carry, e.g. the channel created
    /// by a `newChannel` event.
    pub fn data<T: DeserializeOwned>(&self) -> Option<T> {
        let data = self.0.get("data")?.clone();
        serde_json::from_value(data).ok()
    }
}

/// An event pushed by the server without being asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    NewMessage(Message),
    NewChannel(Channel),
    RemoveChannel(RemoveChannel),
    RenameChannel(RenameChannel),
    Unknown(String),
}

impl ServerEvent {
    pub fn parse(name: &str, mut args: Vec<Value>) -> serde_json::Result<Self> {
        let first = if args.is_empty() {
            Value::Null
        } else {
            args.swap_remove(0)
        };

        Ok(match name {
            NEW_MESSAGE => Self::NewMessage(serde_json::from_value(first)?),
            NEW_CHANNEL => Self::NewChannel(serde_json::from_value(first)?),
            REMOVE_CHANNEL => Self::RemoveChannel(serde_json::from_value(first)?),
            RENAME_CHANNEL => Self::RenameChannel(serde_json::from_value(first)?),
            _ => Self::Unknown(name.to_string()),
        })
    }
}
