use std::time::Duration;

use serde::Deserialize;

fn default_url() -> String {
    "http://localhost:5001".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Server {
    /// Base URL of the chat server.
    ///
    /// The HTTP API lives below `/api/v1/` and the socket is opened at
    /// `/socket.io/` on the same host. `https` URLs use `wss` for the socket.
    #[serde(default = "default_url")]
    pub url: String,

    /// Seconds to wait for the server to acknowledge an emitted event.
    ///
    /// By default, parley waits forever. A message whose acknowledgement never
    /// arrives stays pending until it is cancelled with `/cancel`.
    #[serde(default)]
    pub ack_timeout: Option<u64>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            url: default_url(),
            ack_timeout: None,
        }
    }
}

impl Server {
    pub fn ack_timeout(&self) -> Option<Duration> {
        self.ack_timeout.map(Duration::from_secs)
    }
}
