mod api;
mod composer;
mod conn;
mod logger;
mod login;
mod replies;
mod route;
mod session;
mod store;
mod ui;
mod util;
mod version;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use directories::{BaseDirs, ProjectDirs};
use log::info;
use parley_config::Config;
use parley_core::NEW_MESSAGE;
use serde_json::json;
use tokio::sync::mpsc;

use crate::api::{Backend, HttpBackend};
use crate::composer::{Composer, Outcome};
use crate::logger::Logger;
use crate::login::{Failure, Form, Mode};
use crate::route::Route;
use crate::session::{Auth, CredentialStore};
use crate::store::Store;
use crate::ui::Ui;
use crate::version::{NAME, VERSION};

#[derive(Debug, clap::Parser)]
enum Command {
    /// Run the client interactively (default).
    Run {
        /// Path to open first, like `/`, `/login` or `/signup`.
        #[arg(default_value = "/")]
        path: String,
    },
    /// Log in and remember the session.
    Login { username: String },
    /// Create an account and remember the session.
    Signup { username: String },
    /// Forget the remembered session.
    Logout,
    /// List the channels of the server.
    Channels,
    /// Send a single message and wait for the server to accept it.
    Send {
        /// Channel name or id. Defaults to the channel chosen by the server.
        #[arg(long, short)]
        channel: Option<String>,
        text: String,
    },
}

impl Default for Command {
    fn default() -> Self {
        Self::Run {
            path: "/".to_string(),
        }
    }
}

#[derive(Debug, clap::Parser)]
#[command(version)]
struct Args {
    /// Show more detailed log messages.
    #[arg(long, short)]
    verbose: bool,

    /// Path to the config file.
    ///
    /// Relative paths are interpreted relative to the current directory.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Path to a directory for parley to store its session in.
    ///
    /// Relative paths are interpreted relative to the current directory.
    #[arg(long, short)]
    data_dir: Option<PathBuf>,

    /// If set, parley won't remember the session.
    #[arg(long, short)]
    ephemeral: bool,

    /// Url of the chat server, overriding the config file.
    #[arg(long, short)]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

fn config_path(args: &Args, dirs: &ProjectDirs) -> PathBuf {
    args.config
        .clone()
        .unwrap_or_else(|| dirs.config_dir().join("config.toml"))
}

fn data_dir(config: &Config, dirs: &ProjectDirs) -> PathBuf {
    config
        .data_dir
        .clone()
        .unwrap_or_else(|| dirs.data_dir().to_path_buf())
}

fn update_config_with_args(config: &mut Config, args: &Args) -> anyhow::Result<()> {
    if let Some(data_dir) = args.data_dir.clone() {
        // The data dir specified via args_data_dir is relative to the current
        // directory and needs no resolving.
        config.data_dir = Some(data_dir);
    } else if let Some(data_dir) = &config.data_dir {
        // Resolve the data dir specified in the config file relative to the
        // user's home directory, if possible.
        let base_dirs = BaseDirs::new().context("failed to find home directory")?;
        config.data_dir = Some(base_dirs.home_dir().join(data_dir));
    }

    if let Some(url) = args.server.clone() {
        config.server.url = url;
    }
    config.ephemeral |= args.ephemeral;
    Ok(())
}

fn open_auth(config: &Config, dirs: &ProjectDirs) -> Auth {
    let store = if config.ephemeral {
        CredentialStore::Memory
    } else {
        let data_dir = data_dir(config, dirs);
        eprintln!("Data dir:    {}", data_dir.to_string_lossy());
        CredentialStore::File(data_dir.join("session.json"))
    };
    Auth::hydrate(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (logger, logger_guard, logger_rx) = Logger::init(args.verbose);
    let dirs = ProjectDirs::from("org", "parley", "parley")
        .context("failed to find config directory")?;

    // Locate config
    let config_path = config_path(&args, &dirs);
    eprintln!("Config file: {}", config_path.to_string_lossy());

    // Load config
    let mut config = Config::load(&config_path)?;
    update_config_with_args(&mut config, &args)?;
    let config = Box::leak(Box::new(config));

    let mut auth = open_auth(config, &dirs);
    let backend = HttpBackend::new(&config.server.url)?;

    match args.command.unwrap_or_default() {
        Command::Run { path } => {
            let backend = Box::new(backend);
            run(config, backend, auth, &path, logger, logger_rx, args.verbose).await?
        }
        Command::Login { username } => {
            authenticate(&backend, &mut auth, Mode::Login, username).await?
        }
        Command::Signup { username } => {
            authenticate(&backend, &mut auth, Mode::Signup, username).await?
        }
        Command::Logout => {
            auth.log_out()?;
            eprintln!("Logged out");
        }
        Command::Channels => channels(&backend, &auth).await?,
        Command::Send { channel, text } => send(config, &backend, &auth, channel, text).await?,
    }

    // Print all logged errors. This should always happen, even if parley
    // panics, because the errors may be key in diagnosing what happened.
    drop(logger_guard);

    eprintln!("Goodbye!");
    Ok(())
}

async fn run(
    config: &'static Config,
    backend: Box<dyn Backend>,
    auth: Auth,
    path: &str,
    logger: Logger,
    logger_rx: mpsc::UnboundedReceiver<()>,
    verbose: bool,
) -> anyhow::Result<()> {
    info!("Welcome to {NAME} {VERSION}");
    eprintln!("Type /help for a list of commands");

    let start = Route::parse(path);
    Ui::run(config, backend, auth, start, logger, logger_rx, verbose).await
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password (input hidden): ");
    io::stderr().flush()?;
    match util::read_hidden_line().context("failed to read password")? {
        Some(password) => Ok(password),
        None => bail!("No password entered"),
    }
}

async fn authenticate(
    backend: &dyn Backend,
    auth: &mut Auth,
    mode: Mode,
    username: String,
) -> anyhow::Result<()> {
    let mut form = Form::new(mode);
    form.username = username;
    form.password = read_password()?;

    if !form.submit(backend, auth).await {
        match form.failure() {
            Some(Failure::UsernameTaken) => bail!("Username is already taken"),
            _ => bail!("Invalid username/password"),
        }
    }

    eprintln!("Logged in as {}", auth.username().unwrap_or("?"));
    Ok(())
}

async fn fetch_store(backend: &dyn Backend, auth: &Auth) -> anyhow::Result<Store> {
    let Some(token) = auth.token() else {
        bail!("Not logged in, run `{NAME} login <username>` first");
    };
    let data = backend
        .fetch_data(token)
        .await
        .context("failed to fetch channels")?;

    let mut store = Store::new();
    store.hydrate(data);
    Ok(store)
}

async fn channels(backend: &dyn Backend, auth: &Auth) -> anyhow::Result<()> {
    let store = fetch_store(backend, auth).await?;
    let current = store.current_channel_id();
    for channel in store.channels() {
        let marker = if Some(channel.id) == current { "*" } else { " " };
        println!(
            "{marker} {}\t#{}\t{} messages",
            channel.id,
            channel.name,
            store.message_count(channel.id)
        );
    }
    Ok(())
}

async fn send(
    config: &Config,
    backend: &dyn Backend,
    auth: &Auth,
    channel: Option<String>,
    text: String,
) -> anyhow::Result<()> {
    let mut store = fetch_store(backend, auth).await?;
    if let Some(query) = channel.as_deref().or(config.default_channel.as_deref()) {
        let Some(id) = store.find_channel(query).map(|c| c.id) else {
            bail!("No channel {query:?}");
        };
        store.select_channel(id)?;
    }

    let mut composer = Composer::new();
    composer.set_text(text)?;
    let submission = composer.begin(store.current_channel_id(), auth.username())?;

    let url = backend.socket_url()?;
    let socket_auth = auth.token().map(|token| json!({ "token": token }));
    let (conn_tx, _conn_rx) = conn::connect(&url, socket_auth, config.server.ack_timeout())
        .await
        .with_context(|| format!("failed to connect to {url}"))?;

    let ack = conn_tx
        .emit(NEW_MESSAGE, json!(submission.message))
        .await?;
    match composer.acknowledge(submission.id, &ack) {
        Outcome::Sent => {
            eprintln!("Sent");
            Ok(())
        }
        Outcome::Pending | Outcome::Stale => {
            bail!("Server did not accept the message: {}", ack.0)
        }
    }
}
