//! HTTP part of the chat server API.

use async_trait::async_trait;
use log::debug;
use parley_core::InitialData;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

const LOGIN: &str = "api/v1/login";
const SIGNUP: &str = "api/v1/signup";
const DATA: &str = "api/v1/data";
const SOCKET: &str = "socket.io/";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid server url {0:?}")]
    InvalidUrl(String),
    #[error("username is already taken")]
    Conflict,
    #[error("server rejected request with status {0}")]
    Status(StatusCode),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// What the server hands out after a successful login or signup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, Error>;

    async fn signup(&self, username: &str, password: &str) -> Result<AuthResponse, Error>;

    async fn fetch_data(&self, token: &str) -> Result<InitialData, Error>;

    /// The websocket url the Socket.IO connection should be opened at.
    fn socket_url(&self) -> Result<String, Error>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(url: &str) -> Result<Self, Error> {
        let mut base = Url::parse(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(url.to_string()));
        }
        // Without a trailing slash, joining would replace the last segment.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base
            .join(path)
            .map_err(|_| Error::InvalidUrl(format!("{}{path}", self.base)))
    }

    async fn authenticate(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthResponse, Error> {
        let url = self.endpoint(path)?;
        debug!("POST {url}");
        let response = self
            .client
            .post(url)
            .json(&AuthRequest { username, password })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::CONFLICT => Err(Error::Conflict),
            status => Err(Error::Status(status)),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, Error> {
        self.authenticate(LOGIN, username, password).await
    }

    async fn signup(&self, username: &str, password: &str) -> Result<AuthResponse, Error> {
        self.authenticate(SIGNUP, username, password).await
    }

    async fn fetch_data(&self, token: &str) -> Result<InitialData, Error> {
        let url = self.endpoint(DATA)?;
        debug!("GET {url}");
        let response = self.client.get(url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }
        Ok(response.json().await?)
    }

    fn socket_url(&self) -> Result<String, Error> {
        let mut url = self.endpoint(SOCKET)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| Error::InvalidUrl(url.to_string()))?;
        url.set_query(Some("EIO=4&transport=websocket"));
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::{Backend, HttpBackend};

    #[test]
    fn socket_url_follows_scheme() {
        let backend = HttpBackend::new("http://localhost:5001").unwrap();
        assert_eq!(
            backend.socket_url().unwrap(),
            "ws://localhost:5001/socket.io/?EIO=4&transport=websocket"
        );

        let backend = HttpBackend::new("https://chat.example.com/prefix").unwrap();
        assert_eq!(
            backend.socket_url().unwrap(),
            "wss://chat.example.com/prefix/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn endpoints_keep_base_path() {
        let backend = HttpBackend::new("https://chat.example.com/prefix/").unwrap();
        assert_eq!(
            backend.endpoint(super::LOGIN).unwrap().as_str(),
            "https://chat.example.com/prefix/api/v1/login"
        );
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(HttpBackend::new("ftp://example.com").is_err());
        assert!(HttpBackend::new("not a url").is_err());
    }
}
