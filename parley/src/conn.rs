//! Socket.IO connection to the chat server.
//!
//! The connection runs as its own task. [`ConnTx`] emits events and waits for
//! their acknowledgements, [`ConnRx`] receives events pushed by the server.
//! Once all handles are dropped, the task ends and the websocket is closed.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use parley_core::packet::{self, EnginePacket, Handshake, SocketPacket, DEFAULT_NAMESPACE};
use parley_core::{Ack, ServerEvent};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::{select, task, time};
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use crate::replies::{self, PendingReply, Replies};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("acknowledgement timed out")]
    TimedOut,
    #[error("server sent no heartbeat")]
    NoHeartbeat,
    #[error("unexpected packet during handshake")]
    Handshake,
    #[error("server refused connection: {0}")]
    Refused(String),
    #[error("websocket error: {0}")]
    Ws(#[from] tungstenite::Error),
    #[error("invalid packet: {0}")]
    Packet(#[from] packet::Error),
}

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
enum Event {
    Message(tungstenite::Message),
    Emit {
        name: String,
        data: Value,
        reply_tx: oneshot::Sender<PendingReply<Vec<Value>>>,
    },
}

struct State {
    ws_tx: SplitSink<WsStream, tungstenite::Message>,
    next_id: u64,
    replies: Replies<u64, Vec<Value>>,
    packet_tx: mpsc::UnboundedSender<ServerEvent>,
}

impl State {
    async fn run(
        ws: WsStream,
        heartbeat: Duration,
        ack_timeout: Option<Duration>,
        tx_canary: oneshot::Receiver<Infallible>,
        rx_canary: oneshot::Receiver<Infallible>,
        event_tx: mpsc::UnboundedSender<Event>,
        mut event_rx: mpsc::UnboundedReceiver<Event>,
        packet_tx: mpsc::UnboundedSender<ServerEvent>,
    ) {
        let (ws_tx, mut ws_rx) = ws.split();
        let state = Self {
            ws_tx,
            next_id: 0,
            replies: Replies::new(ack_timeout),
            packet_tx,
        };

        let result = select! {
            _ = tx_canary => Ok(()),
            _ = rx_canary => Ok(()),
            result = Self::listen(&mut ws_rx, &event_tx, heartbeat) => result,
            result = state.handle_events(&mut event_rx) => result,
        };

        match result {
            Ok(()) => debug!("connection closed"),
            Err(err) => warn!("connection lost: {err}"),
        }
    }

    async fn listen(
        ws_rx: &mut SplitStream<WsStream>,
        event_tx: &mpsc::UnboundedSender<Event>,
        heartbeat: Duration,
    ) -> Result<()> {
        loop {
            // The server pings regularly, so silence means the connection is
            // dead even if the socket is still open.
            let msg = match time::timeout(heartbeat, ws_rx.next()).await {
                Err(_) => return Err(Error::NoHeartbeat),
                Ok(None) => return Ok(()),
                Ok(Some(msg)) => msg?,
            };
            event_tx
                .send(Event::Message(msg))
                .map_err(|_| Error::ConnectionClosed)?;
        }
    }

    async fn handle_events(mut self, event_rx: &mut mpsc::UnboundedReceiver<Event>) -> Result<()> {
        while let Some(event) = event_rx.recv().await {
            match event {
                Event::Message(msg) => self.on_msg(msg).await?,
                Event::Emit {
                    name,
                    data,
                    reply_tx,
                } => self.on_emit(name, data, reply_tx).await?,
            }
        }
        Ok(())
    }

    async fn on_msg(&mut self, msg: tungstenite::Message) -> Result<()> {
        match msg {
            tungstenite::Message::Text(text) => self.on_text(&text).await,
            tungstenite::Message::Binary(_) => Err(packet::Error::Binary.into()),
            tungstenite::Message::Close(_) => Err(Error::ConnectionClosed),
            // Tungstenite answers websocket pings by itself
            tungstenite::Message::Ping(_)
            | tungstenite::Message::Pong(_)
            | tungstenite::Message::Frame(_) => Ok(()),
        }
    }

    async fn on_text(&mut self, text: &str) -> Result<()> {
        debug!("↓ {}", text.trim());
        match EnginePacket::parse(text)? {
            EnginePacket::Ping(payload) => self.send(EnginePacket::Pong(payload)).await,
            EnginePacket::Message(payload) => self.on_packet(SocketPacket::parse(&payload)?).await,
            EnginePacket::Close => Err(Error::ConnectionClosed),
            EnginePacket::Open(_)
            | EnginePacket::Pong(_)
            | EnginePacket::Upgrade
            | EnginePacket::Noop => Ok(()),
        }
    }

    async fn on_packet(&mut self, packet: SocketPacket) -> Result<()> {
        match packet {
            SocketPacket::Ack { id, args, .. } => {
                if !self.replies.complete(&id, args) {
                    debug!("nobody is waiting for ack {id}");
                }
                self.replies.purge();
            }
            SocketPacket::Event { id, name, args, .. } => {
                if let Some(id) = id {
                    // We don't have anything to say, but the server expects an
                    // answer nonetheless.
                    self.send(
                        SocketPacket::Ack {
                            namespace: DEFAULT_NAMESPACE.to_string(),
                            id,
                            args: vec![],
                        }
                        .into_engine(),
                    )
                    .await?;
                }
                match ServerEvent::parse(&name, args) {
                    Ok(event) => {
                        let _ = self.packet_tx.send(event);
                    }
                    Err(err) => warn!("ignoring malformed {name:?} event: {err}"),
                }
            }
            SocketPacket::Disconnect { .. } => return Err(Error::ConnectionClosed),
            SocketPacket::ConnectError { data, .. } => {
                return Err(Error::Refused(describe_refusal(data)))
            }
            SocketPacket::Connect { .. } => {}
        }
        Ok(())
    }

    async fn on_emit(
        &mut self,
        name: String,
        data: Value,
        reply_tx: oneshot::Sender<PendingReply<Vec<Value>>>,
    ) -> Result<()> {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let pending_reply = self.replies.wait_for(id);
        let packet = SocketPacket::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            id: Some(id),
            name,
            args: vec![data],
        };
        self.send(packet.into_engine()).await?;

        debug!("waiting for {} ack(s)", self.replies.len());
        let _ = reply_tx.send(pending_reply);
        Ok(())
    }

    async fn send(&mut self, packet: EnginePacket) -> Result<()> {
        let text = packet.encode();
        debug!("↑ {}", text.trim());
        self.ws_tx.send(tungstenite::Message::Text(text)).await?;
        Ok(())
    }
}

fn describe_refusal(data: Option<Value>) -> String {
    match data {
        Some(Value::Object(map)) => match map.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => Value::Object(map).to_string(),
        },
        Some(value) => value.to_string(),
        None => "no reason given".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct ConnTx {
    #[allow(dead_code)]
    canary: Arc<oneshot::Sender<Infallible>>,
    event_tx: mpsc::UnboundedSender<Event>,
}

impl ConnTx {
    /// Emit an event and wait for the server to acknowledge it.
    ///
    /// Unless an ack timeout was configured, this waits until either the ack
    /// arrives or the connection closes.
    pub async fn emit(&self, name: &str, data: Value) -> Result<Ack> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let event = Event::Emit {
            name: name.to_string(),
            data,
            reply_tx,
        };
        self.event_tx
            .send(event)
            .map_err(|_| Error::ConnectionClosed)?;

        let pending_reply = reply_rx.await.map_err(|_| Error::ConnectionClosed)?;
        match pending_reply.get().await {
            Ok(args) => Ok(Ack(args.into_iter().next().unwrap_or(Value::Null))),
            Err(replies::Error::TimedOut) => Err(Error::TimedOut),
            Err(replies::Error::Canceled) => Err(Error::ConnectionClosed),
        }
    }
}

#[derive(Debug)]
pub struct ConnRx {
    #[allow(dead_code)]
    canary: oneshot::Sender<Infallible>,
    packet_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl ConnRx {
    pub async fn recv(&mut self) -> Result<ServerEvent> {
        self.packet_rx.recv().await.ok_or(Error::ConnectionClosed)
    }
}

async fn next_packet(ws: &mut WsStream) -> Result<EnginePacket> {
    loop {
        let text = match ws.next().await.ok_or(Error::ConnectionClosed)?? {
            tungstenite::Message::Text(text) => text,
            tungstenite::Message::Binary(_) => return Err(packet::Error::Binary.into()),
            tungstenite::Message::Close(_) => return Err(Error::ConnectionClosed),
            _ => continue,
        };
        debug!("↓ {}", text.trim());
        return Ok(EnginePacket::parse(&text)?);
    }
}

async fn send_packet(ws: &mut WsStream, packet: EnginePacket) -> Result<()> {
    let text = packet.encode();
    debug!("↑ {}", text.trim());
    ws.send(tungstenite::Message::Text(text)).await?;
    Ok(())
}

async fn handshake(ws: &mut WsStream, auth: Option<Value>) -> Result<Handshake> {
    let EnginePacket::Open(handshake) = next_packet(ws).await? else {
        return Err(Error::Handshake);
    };

    let connect = SocketPacket::Connect {
        namespace: DEFAULT_NAMESPACE.to_string(),
        data: auth,
    };
    send_packet(ws, connect.into_engine()).await?;

    loop {
        match next_packet(ws).await? {
            EnginePacket::Message(payload) => match SocketPacket::parse(&payload)? {
                SocketPacket::Connect { .. } => return Ok(handshake),
                SocketPacket::ConnectError { data, .. } => {
                    return Err(Error::Refused(describe_refusal(data)))
                }
                _ => return Err(Error::Handshake),
            },
            EnginePacket::Ping(payload) => send_packet(ws, EnginePacket::Pong(payload)).await?,
            EnginePacket::Noop => {}
            _ => return Err(Error::Handshake),
        }
    }
}

/// Connect to a Socket.IO endpoint like
/// `ws://localhost:5001/socket.io/?EIO=4&transport=websocket`.
///
/// The `auth` payload is sent along with the namespace connect packet.
pub async fn connect(
    url: &str,
    auth: Option<Value>,
    ack_timeout: Option<Duration>,
) -> Result<(ConnTx, ConnRx)> {
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await?;
    let handshake = handshake(&mut ws, auth).await?;
    debug!("connected with sid {}", handshake.sid);

    let heartbeat = Duration::from_millis(handshake.ping_interval + handshake.ping_timeout);
    Ok(wrap(ws, heartbeat, ack_timeout))
}

fn wrap(ws: WsStream, heartbeat: Duration, ack_timeout: Option<Duration>) -> (ConnTx, ConnRx) {
    let (tx_canary_tx, tx_canary_rx) = oneshot::channel();
    let (rx_canary_tx, rx_canary_rx) = oneshot::channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (packet_tx, packet_rx) = mpsc::unbounded_channel();

    task::spawn(State::run(
        ws,
        heartbeat,
        ack_timeout,
        tx_canary_rx,
        rx_canary_rx,
        event_tx.clone(),
        event_rx,
        packet_tx,
    ));

    let tx = ConnTx {
        canary: Arc::new(tx_canary_tx),
        event_tx,
    };
    let rx = ConnRx {
        canary: rx_canary_tx,
        packet_rx,
    };
    (tx, rx)
}
