mod server;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::Deserialize;

pub use crate::server::*;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config file")]
    Io(#[from] io::Error),
    #[error("failed to parse config file")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The directory that parley stores its session in when not running in
    /// ephemeral mode.
    ///
    /// Relative paths are interpreted relative to the user's home directory.
    ///
    /// See also the `--data-dir` command line option.
    pub data_dir: Option<PathBuf>,

    /// Whether to start in ephemeral mode.
    ///
    /// In ephemeral mode, parley doesn't remember the login token between
    /// runs. It completely ignores any options related to the data dir.
    ///
    /// See also the `--ephemeral` command line option.
    #[serde(default)]
    pub ephemeral: bool,

    /// Time zone that chat timestamps should be displayed in.
    ///
    /// This option is interpreted as a POSIX TZ string. The string
    /// `"localtime"` as well as names from the tz database like
    /// `"Europe/Berlin"` are valid.
    ///
    /// If the `TZ` environment variable exists, it overrides this option. If
    /// neither exist, parley uses the system's local time zone.
    #[serde(default)]
    pub time_zone: Option<String>,

    /// Channel to switch to after the initial fetch, by name.
    ///
    /// If unset or unknown, the channel chosen by the server is used.
    #[serde(default)]
    pub default_channel: Option<String>,

    #[serde(default)]
    pub server: Server,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Error> {
        Ok(match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Self::default(),
            Err(err) => Err(err)?,
        })
    }

    pub fn time_zone_ref(&self) -> Option<&str> {
        self.time_zone.as_ref().map(|s| s as &str)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Config;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.ephemeral);
        assert_eq!(config.data_dir, None);
        assert_eq!(config.server.url, "http://localhost:5001");
        assert_eq!(config.server.ack_timeout(), None);
    }

    #[test]
    fn server_section() {
        let config: Config = toml::from_str(
            r#"
            ephemeral = true
            default_channel = "random"

            [server]
            url = "https://chat.example.com"
            ack_timeout = 30
            "#,
        )
        .unwrap();
        assert!(config.ephemeral);
        assert_eq!(config.default_channel.as_deref(), Some("random"));
        assert_eq!(config.server.url, "https://chat.example.com");
        assert_eq!(config.server.ack_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("autojoin = true").is_err());
    }

    #[test]
    fn missing_file_is_default() {
        let path = std::env::temp_dir().join("parley-config-does-not-exist.toml");
        let config = Config::load(&path).unwrap();
        assert!(config.time_zone.is_none());
    }
}
