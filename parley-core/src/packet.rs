//! Text encoding of Engine.IO (protocol 4) and Socket.IO (protocol 5) packets.
//!
//! Only the websocket transport is supported, so every websocket text frame
//! holds exactly one Engine.IO packet. Binary attachments are not supported.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("empty packet")]
    Empty,
    #[error("unknown packet type {0:?}")]
    UnknownType(char),
    #[error("binary packets are not supported")]
    Binary,
    #[error("ack without id")]
    MissingAckId,
    #[error("invalid ack id")]
    InvalidAckId,
    #[error("event payload is not a non-empty array starting with a name")]
    MalformedEvent,
    #[error("ack payload is not an array")]
    MalformedAck,
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Payload of the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds.
    pub ping_interval: u64,
    /// Milliseconds.
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn parse(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(Error::Empty)?;
        let rest = chars.as_str();
        Ok(match kind {
            '0' => Self::Open(serde_json::from_str(rest)?),
            '1' => Self::Close,
            '2' => Self::Ping(rest.to_string()),
            '3' => Self::Pong(rest.to_string()),
            '4' => Self::Message(rest.to_string()),
            '5' => Self::Upgrade,
            '6' => Self::Noop,
            // Engine.IO marks base64 binary payloads with a leading 'b'
            'b' => return Err(Error::Binary),
            c => return Err(Error::UnknownType(c)),
        })
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Open(handshake) => {
                let json = serde_json::to_string(handshake).expect("handshake is serializable");
                format!("0{json}")
            }
            Self::Close => "1".to_string(),
            Self::Ping(payload) => format!("2{payload}"),
            Self::Pong(payload) => format!("3{payload}"),
            Self::Message(payload) => format!("4{payload}"),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Option<Value>,
    },
}

impl SocketPacket {
    pub fn parse(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(Error::Empty)?;
        let rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(Error::Binary);
        }
        if !matches!(kind, '0'..='4') {
            return Err(Error::UnknownType(kind));
        }

        let (namespace, rest) = match rest.strip_prefix('/') {
            Some(_) => match rest.split_once(',') {
                Some((namespace, rest)) => (namespace.to_string(), rest),
                None => (rest.to_string(), ""),
            },
            None => (DEFAULT_NAMESPACE.to_string(), rest),
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (id, rest) = rest.split_at(digits);
        let id = if id.is_empty() {
            None
        } else {
            Some(id.parse::<u64>().map_err(|_| Error::InvalidAckId)?)
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(rest)?)
        };

        Ok(match kind {
            '0' => Self::Connect { namespace, data },
            '1' => Self::Disconnect { namespace },
            '2' => {
                let Some(Value::Array(mut args)) = data else {
                    return Err(Error::MalformedEvent);
                };
                if args.is_empty() {
                    return Err(Error::MalformedEvent);
                }
                let Value::String(name) = args.remove(0) else {
                    return Err(Error::MalformedEvent);
                };
                Self::Event {
                    namespace,
                    id,
                    name,
                    args,
                }
            }
            '3' => {
                let id = id.ok_or(Error::MissingAckId)?;
                let args = match data {
                    Some(Value::Array(args)) => args,
                    None => vec![],
                    Some(_) => return Err(Error::MalformedAck),
                };
                Self::Ack {
                    namespace,
                    id,
                    args,
                }
            }
            _ => Self::ConnectError { namespace, data },
        })
    }

    pub fn encode(&self) -> String {
        let (kind, namespace, id, data) = match self {
            Self::Connect { namespace, data } => ('0', namespace, None, data.clone()),
            Self::Disconnect { namespace } => ('1', namespace, None, None),
            Self::Event {
                namespace,
                id,
                name,
                args,
            } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                ('2', namespace, *id, Some(Value::Array(array)))
            }
            Self::Ack {
                namespace,
                id,
                args,
            } => ('3', namespace, Some(*id), Some(Value::Array(args.clone()))),
            Self::ConnectError { namespace, data } => ('4', namespace, None, data.clone()),
        };

        let mut result = String::new();
        result.push(kind);
        if namespace != DEFAULT_NAMESPACE {
            result.push_str(namespace);
            result.push(',');
        }
        if let Some(id) = id {
            let _ = write!(result, "{id}");
        }
        if let Some(data) = data {
            result.push_str(&data.to_string());
        }
        result
    }

    /// Wrap this packet into an Engine.IO message, ready to be sent.
    pub fn into_engine(self) -> EnginePacket {
        EnginePacket::Message(self.encode())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{EnginePacket, Error, Handshake, SocketPacket};

    #[test]
    fn engine_open() {
        let packet = EnginePacket::parse(
            r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();
        assert_eq!(
            packet,
            EnginePacket::Open(Handshake {
                sid: "lv_VI97HAXpY6yYWAAAC".to_string(),
                upgrades: vec![],
                ping_interval: 25000,
                ping_timeout: 20000,
                max_payload: Some(1_000_000),
            })
        );
    }

    #[test]
    fn engine_simple() {
        assert_eq!(EnginePacket::parse("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(EnginePacket::Pong(String::new()).encode(), "3");
        assert_eq!(
            EnginePacket::parse("40").unwrap(),
            EnginePacket::Message("0".to_string())
        );
        assert!(matches!(EnginePacket::parse(""), Err(Error::Empty)));
        assert!(matches!(EnginePacket::parse("bAQID"), Err(Error::Binary)));
        assert!(matches!(EnginePacket::parse("9"), Err(Error::UnknownType('9'))));
    }

    #[test]
    fn event_with_ack_id() {
        let packet = SocketPacket::parse(r#"212["newMessage",{"text":"hi"}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/".to_string(),
                id: Some(12),
                name: "newMessage".to_string(),
                args: vec![json!({ "text": "hi" })],
            }
        );
        assert_eq!(packet.encode(), r#"212["newMessage",{"text":"hi"}]"#);
    }

    #[test]
    fn namespaced_ack() {
        let packet = SocketPacket::parse(r#"3/admin,7[{"status":"ok"}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Ack {
                namespace: "/admin".to_string(),
                id: 7,
                args: vec![json!({ "status": "ok" })],
            }
        );
        assert_eq!(packet.encode(), r#"3/admin,7[{"status":"ok"}]"#);
    }

    #[test]
    fn connect() {
        let packet = SocketPacket::Connect {
            namespace: "/".to_string(),
            data: Some(json!({ "token": "abc" })),
        };
        assert_eq!(packet.into_engine().encode(), r#"40{"token":"abc"}"#);

        assert_eq!(
            SocketPacket::parse(r#"0{"sid":"wZX3oN0bSVIhsaknAAAI"}"#).unwrap(),
            SocketPacket::Connect {
                namespace: "/".to_string(),
                data: Some(json!({ "sid": "wZX3oN0bSVIhsaknAAAI" })),
            }
        );
        assert_eq!(
            SocketPacket::parse("0/chat").unwrap(),
            SocketPacket::Connect {
                namespace: "/chat".to_string(),
                data: None,
            }
        );
    }

    #[test]
    fn malformed() {
        assert!(matches!(SocketPacket::parse("2"), Err(Error::MalformedEvent)));
        assert!(matches!(SocketPacket::parse("2[]"), Err(Error::MalformedEvent)));
        assert!(matches!(SocketPacket::parse("2[1]"), Err(Error::MalformedEvent)));
        assert!(matches!(SocketPacket::parse("3[]"), Err(Error::MissingAckId)));
        assert!(matches!(SocketPacket::parse("31{}"), Err(Error::MalformedAck)));
        assert!(matches!(SocketPacket::parse(r#"51-["a"]"#), Err(Error::Binary)));
        assert!(matches!(SocketPacket::parse("2[oops"), Err(Error::Json(_))));
    }

    #[test]
    fn connect_error() {
        assert_eq!(
            SocketPacket::parse(r#"4{"message":"Not authorized"}"#).unwrap(),
            SocketPacket::ConnectError {
                namespace: "/".to_string(),
                data: Some(json!({ "message": "Not authorized" })),
            }
        );
    }
}
