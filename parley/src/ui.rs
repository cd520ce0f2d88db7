mod command;
mod render;

use std::io::{self, Write};
use std::thread;

use anyhow::Context;
use crossterm::style::Stylize;
use jiff::tz::TimeZone;
use log::{debug, info, warn, Level};
use parley_config::Config;
use parley_core::{
    Ack, Channel, ChannelId, Message, NewChannel, RemoveChannel, RenameChannel, ServerEvent,
    NEW_CHANNEL, NEW_MESSAGE, REMOVE_CHANNEL, RENAME_CHANNEL,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{self, JoinHandle};

use crate::api::{self, Backend};
use crate::composer::{Composer, Outcome};
use crate::conn::{self, ConnRx, ConnTx};
use crate::logger::Logger;
use crate::login::{Failure, Form, Mode};
use crate::route::Route;
use crate::session::Auth;
use crate::store::Store;
use crate::util;

use self::command::Command;

/// Acknowledgements of events emitted on behalf of the user.
#[derive(Debug)]
enum Acked {
    /// The acknowledgement of the submission with the given id.
    Message(u64, Result<Ack, conn::Error>),
    NewChannel(Result<Ack, conn::Error>),
    RenameChannel(Result<Ack, conn::Error>),
    RemoveChannel(Result<Ack, conn::Error>),
}

/// How the input thread should read the next line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Visible,
    Hidden,
}

#[derive(Debug)]
enum UiEvent {
    Line(String),
    /// A line read without echo. `None` if it was aborted.
    Password(Option<String>),
    InputClosed,
    LogChanged,
    Server(ServerEvent),
    /// The connection with the given generation was lost.
    Disconnected(u64),
    Acked(Acked),
}

enum EventHandleResult {
    Continue,
    Stop,
}

struct Connection {
    tx: ConnTx,
    forwarder: JoinHandle<()>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Dropping the receiving end closes the connection.
        self.forwarder.abort();
    }
}

pub struct Ui {
    config: &'static Config,
    backend: Box<dyn Backend>,
    event_tx: UnboundedSender<UiEvent>,
    /// Answers every line from the input thread with how to read the next.
    input_tx: UnboundedSender<InputMode>,
    time_zone: TimeZone,

    logger: Logger,
    /// Log messages at or above this level are printed as they come in.
    live_log_level: Level,
    log_printed: usize,

    route: Route,
    auth: Auth,
    /// A login or signup form waiting for its password.
    prompt: Option<Form>,
    store: Store,
    composer: Composer,

    conn: Option<Connection>,
    conn_generation: u64,
    message_task: Option<JoinHandle<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Ui {
    pub async fn run(
        config: &'static Config,
        backend: Box<dyn Backend>,
        auth: Auth,
        start: Route,
        logger: Logger,
        logger_rx: UnboundedReceiver<()>,
        verbose: bool,
    ) -> anyhow::Result<()> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();

        // Reading stdin blocks, so it gets its own thread. The thread is never
        // joined and simply dies with the process.
        Self::spawn_input_thread(event_tx.clone(), input_rx)
            .context("failed to read from stdin")?;

        let mut ui = Self::new(
            config,
            backend,
            auth,
            logger,
            event_tx.clone(),
            input_tx,
            verbose,
        )?;
        ui.navigate(start).await;
        tokio::select! {
            () = ui.run_main(event_rx) => (),
            () = Self::update_on_log_event(logger_rx, &event_tx) => (),
        }
        ui.shut_down();
        Ok(())
    }

    fn new(
        config: &'static Config,
        backend: Box<dyn Backend>,
        auth: Auth,
        logger: Logger,
        event_tx: UnboundedSender<UiEvent>,
        input_tx: UnboundedSender<InputMode>,
        verbose: bool,
    ) -> anyhow::Result<Self> {
        let time_zone =
            util::load_time_zone(config.time_zone_ref()).context("failed to load time zone")?;
        let log_printed = logger.len();
        Ok(Self {
            config,
            backend,
            event_tx,
            input_tx,
            time_zone,
            logger,
            live_log_level: if verbose { Level::Debug } else { Level::Warn },
            log_printed,
            route: Route::Home,
            auth,
            prompt: None,
            store: Store::new(),
            composer: Composer::new(),
            conn: None,
            conn_generation: 0,
            message_task: None,
            tasks: vec![],
        })
    }

    fn spawn_input_thread(
        event_tx: UnboundedSender<UiEvent>,
        mut input_rx: UnboundedReceiver<InputMode>,
    ) -> io::Result<()> {
        thread::Builder::new()
            .name("input".to_string())
            .spawn(move || {
                let mut mode = InputMode::Visible;
                loop {
                    let event = match mode {
                        InputMode::Visible => {
                            let mut line = String::new();
                            match io::stdin().read_line(&mut line) {
                                Ok(0) | Err(_) => UiEvent::InputClosed,
                                Ok(_) => UiEvent::Line(
                                    line.trim_end_matches(['\r', '\n']).to_string(),
                                ),
                            }
                        }
                        InputMode::Hidden => match util::read_hidden_line() {
                            Ok(password) => UiEvent::Password(password),
                            Err(_) => UiEvent::InputClosed,
                        },
                    };

                    let closed = matches!(event, UiEvent::InputClosed);
                    if event_tx.send(event).is_err() || closed {
                        return;
                    }
                    match input_rx.blocking_recv() {
                        Some(next) => mode = next,
                        None => return,
                    }
                }
            })?;
        Ok(())
    }

    async fn update_on_log_event(
        mut logger_rx: UnboundedReceiver<()>,
        event_tx: &UnboundedSender<UiEvent>,
    ) {
        loop {
            if logger_rx.recv().await.is_none() {
                return;
            }
            if event_tx.send(UiEvent::LogChanged).is_err() {
                return;
            }
        }
    }

    async fn run_main(&mut self, mut event_rx: UnboundedReceiver<UiEvent>) {
        while let Some(event) = event_rx.recv().await {
            match self.handle_event(event).await {
                EventHandleResult::Continue => {}
                EventHandleResult::Stop => return,
            }
        }
    }

    async fn handle_event(&mut self, event: UiEvent) -> EventHandleResult {
        match event {
            UiEvent::Line(line) => {
                if let EventHandleResult::Stop = self.on_line(line).await {
                    return EventHandleResult::Stop;
                }
                self.request_input();
            }
            UiEvent::Password(password) => {
                self.on_password(password).await;
                self.request_input();
            }
            UiEvent::InputClosed => return EventHandleResult::Stop,
            UiEvent::LogChanged => self.print_new_logs(),
            UiEvent::Server(event) => self.on_server_event(event),
            UiEvent::Disconnected(generation) => {
                if generation == self.conn_generation && self.conn.take().is_some() {
                    warn!("disconnected from server, use /reconnect to try again");
                }
            }
            UiEvent::Acked(acked) => self.on_acked(acked),
        }
        EventHandleResult::Continue
    }

    //////////
    // Output

    fn notice(&self, text: &str) {
        println!("{}", format!("-- {text}").dark_grey().italic());
    }

    fn error(&self, text: &str) {
        println!("{}", format!("!! {text}").red());
    }

    fn print_header(&self) {
        println!("{}", render::header(&self.store, self.auth.username()));
    }

    fn print_messages(&self) {
        let Some(id) = self.store.current_channel_id() else {
            return;
        };
        for msg in self.store.channel_messages(id) {
            println!("{}", render::message(msg, &self.time_zone));
        }
    }

    fn print_new_logs(&mut self) {
        let msgs = self.logger.messages_from(self.log_printed);
        self.log_printed += msgs.len();
        for msg in msgs {
            if msg.level() <= self.live_log_level {
                eprintln!("{}", msg.styled());
            }
        }
    }

    fn print_log(&self) {
        for msg in self.logger.messages_from(0) {
            println!("{}", msg.styled());
        }
    }

    ////////////////
    // Navigation

    async fn navigate(&mut self, route: Route) {
        let resolved = route.resolve(&self.auth);
        if resolved != route {
            debug!("redirecting from {route} to {resolved}");
        }
        self.route = resolved;

        match resolved {
            Route::Home => self.enter_home().await,
            Route::Login => {
                self.notice("Log in with /login <username> or create an account with /signup <username>")
            }
            Route::Signup => self.notice("Create an account with /signup <username>"),
            Route::NotFound => self.error("404, try /open /"),
        }
    }

    async fn enter_home(&mut self) {
        let Some(token) = self.auth.token().map(|t| t.to_string()) else {
            return;
        };

        match self.backend.fetch_data(&token).await {
            Ok(data) => self.store.hydrate(data),
            Err(api::Error::Status(StatusCode::UNAUTHORIZED)) => {
                warn!("session is no longer valid, please log in again");
                self.log_out();
                self.route = Route::Login;
                self.notice("Log in with /login <username>");
                return;
            }
            Err(err) => warn!("failed to fetch channels: {err}"),
        }

        if let Some(name) = &self.config.default_channel {
            match self.store.find_channel(name).map(|c| c.id) {
                Some(id) => {
                    let _ = self.store.select_channel(id);
                }
                None => warn!("default channel {name:?} does not exist"),
            }
        }

        self.connect().await;
        self.print_header();
        self.print_messages();
    }

    async fn connect(&mut self) {
        self.conn = None;

        let url = match self.backend.socket_url() {
            Ok(url) => url,
            Err(err) => {
                warn!("{err}");
                return;
            }
        };
        let auth = self.auth.token().map(|token| json!({ "token": token }));

        match conn::connect(&url, auth, self.config.server.ack_timeout()).await {
            Ok((tx, rx)) => {
                self.conn_generation += 1;
                let forwarder = task::spawn(Self::forward_server_events(
                    rx,
                    self.event_tx.clone(),
                    self.conn_generation,
                ));
                self.conn = Some(Connection { tx, forwarder });
                info!("connected to {url}");
            }
            Err(err) => warn!("failed to connect to {url}: {err}"),
        }
    }

    async fn forward_server_events(
        mut rx: ConnRx,
        event_tx: UnboundedSender<UiEvent>,
        generation: u64,
    ) {
        loop {
            let event = match rx.recv().await {
                Ok(event) => UiEvent::Server(event),
                Err(_) => {
                    let _ = event_tx.send(UiEvent::Disconnected(generation));
                    return;
                }
            };
            if event_tx.send(event).is_err() {
                return;
            }
        }
    }

    fn log_out(&mut self) {
        if let Err(err) = self.auth.log_out() {
            warn!("{err}");
        }
        self.shut_down();
        self.store = Store::new();
        self.composer = Composer::new();
        self.prompt = None;
    }

    fn shut_down(&mut self) {
        self.conn = None;
        if let Some(task) = self.message_task.take() {
            task.abort();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    //////////
    // Input

    fn request_input(&self) {
        let mode = if self.prompt.is_some() {
            InputMode::Hidden
        } else {
            InputMode::Visible
        };
        let _ = self.input_tx.send(mode);
    }

    async fn on_password(&mut self, password: Option<String>) {
        let Some(mut form) = self.prompt.take() else {
            return;
        };
        match password {
            Some(password) => {
                form.password = password;
                self.submit(form).await;
            }
            None => self.notice("Cancelled"),
        }
    }

    async fn on_line(&mut self, line: String) -> EventHandleResult {
        let command = Command::parse(&line);
        let needs_home = matches!(
            command,
            Command::Say(_)
                | Command::Channels
                | Command::Join(_)
                | Command::Messages
                | Command::New(_)
                | Command::Rename(_)
                | Command::Remove
                | Command::Cancel
        );
        if needs_home && self.route != Route::Home {
            self.error("You need to log in first, see /help");
            return EventHandleResult::Continue;
        }

        match command {
            Command::Say(text) => self.say(text),
            Command::Channels => {
                for line in render::channels(&self.store) {
                    println!("{line}");
                }
            }
            Command::Join(query) => self.join(&query),
            Command::Messages => {
                self.print_header();
                self.print_messages();
            }
            Command::New(name) => self.new_channel(name),
            Command::Rename(name) => self.rename_channel(name),
            Command::Remove => self.remove_channel(),
            Command::Cancel => self.cancel(),
            Command::Login(username) => self.start_form(Mode::Login, username),
            Command::Signup(username) => self.start_form(Mode::Signup, username),
            Command::Logout => {
                self.log_out();
                self.navigate(Route::Login).await;
            }
            Command::Open(path) => self.navigate(Route::parse(&path)).await,
            Command::Reconnect => {
                if self.route == Route::Home {
                    self.connect().await;
                } else {
                    self.error("You need to log in first, see /help");
                }
            }
            Command::Log => self.print_log(),
            Command::Help => {
                for line in render::help() {
                    println!("{line}");
                }
            }
            Command::Quit => return EventHandleResult::Stop,
            Command::Usage(usage) => self.error(&format!("Usage: {usage}")),
            Command::Unknown(name) => self.error(&format!("Unknown command /{name}, see /help")),
            Command::Empty => {}
        }
        EventHandleResult::Continue
    }

    fn start_form(&mut self, mode: Mode, username: String) {
        if self.auth.logged_in() {
            self.error("Already logged in, /logout first");
            return;
        }
        let mut form = Form::new(mode);
        form.username = username;
        self.prompt = Some(form);
        print!("Password (input hidden): ");
        let _ = io::stdout().flush();
    }

    async fn submit(&mut self, mut form: Form) {
        let action = match form.mode() {
            Mode::Login => "Logging in",
            Mode::Signup => "Signing up",
        };
        self.notice(&format!("{action} as {}", form.username));

        if form.submit(&*self.backend, &mut self.auth).await {
            self.navigate(Route::Home).await;
            return;
        }
        if form.is_invalid() {
            match form.failure() {
                Some(Failure::UsernameTaken) => self.error("Username is already taken"),
                _ => self.error("Invalid username/password"),
            }
        }
    }

    fn emit(
        &mut self,
        name: &'static str,
        data: Value,
        wrap: impl FnOnce(Result<Ack, conn::Error>) -> Acked + Send + 'static,
    ) -> Option<JoinHandle<()>> {
        let Some(conn) = &self.conn else {
            self.error("Not connected, use /reconnect");
            return None;
        };
        let conn_tx = conn.tx.clone();
        let event_tx = self.event_tx.clone();
        Some(task::spawn(async move {
            let result = conn_tx.emit(name, data).await;
            let _ = event_tx.send(UiEvent::Acked(wrap(result)));
        }))
    }

    fn emit_tracked(
        &mut self,
        name: &'static str,
        data: Value,
        wrap: fn(Result<Ack, conn::Error>) -> Acked,
    ) {
        self.tasks.retain(|task| !task.is_finished());
        if let Some(task) = self.emit(name, data, wrap) {
            self.tasks.push(task);
        }
    }

    fn say(&mut self, text: String) {
        if self.conn.is_none() {
            self.error("Not connected, use /reconnect");
            return;
        }
        if let Err(err) = self.composer.set_text(text) {
            self.error(&err.to_string());
            return;
        }
        let submission = match self
            .composer
            .begin(self.store.current_channel_id(), self.auth.username())
        {
            Ok(submission) => submission,
            Err(err) => {
                self.error(&err.to_string());
                return;
            }
        };

        let id = submission.id;
        self.message_task = self.emit(NEW_MESSAGE, json!(submission.message), move |result| {
            Acked::Message(id, result)
        });
        if self.message_task.is_none() {
            self.composer.abandon();
        }
    }

    fn cancel(&mut self) {
        if !self.composer.is_submitting() {
            self.notice("Nothing to cancel");
            return;
        }
        self.composer.abandon();
        if let Some(task) = self.message_task.take() {
            task.abort();
        }
        self.notice(&format!(
            "Stopped waiting for {:?}, it might still arrive",
            self.composer.text()
        ));
    }

    fn join(&mut self, query: &str) {
        let Some(id) = self.store.find_channel(query).map(|c| c.id) else {
            self.error(&format!("No channel {query:?}"));
            return;
        };
        if self.store.select_channel(id).is_ok() {
            self.print_header();
            self.print_messages();
        }
    }

    fn removable_current_channel(&self) -> Option<ChannelId> {
        let channel = self.store.current_channel()?;
        if channel.removable {
            Some(channel.id)
        } else {
            self.error(&format!("#{} can't be changed", channel.name));
            None
        }
    }

    fn new_channel(&mut self, name: String) {
        if self.store.channels().iter().any(|c| c.name == name) {
            self.error(&format!("#{name} already exists"));
            return;
        }
        self.emit_tracked(NEW_CHANNEL, json!(NewChannel { name }), Acked::NewChannel);
    }

    fn rename_channel(&mut self, name: String) {
        let Some(id) = self.removable_current_channel() else {
            return;
        };
        self.emit_tracked(
            RENAME_CHANNEL,
            json!(RenameChannel { id, name }),
            Acked::RenameChannel,
        );
    }

    fn remove_channel(&mut self) {
        let Some(id) = self.removable_current_channel() else {
            return;
        };
        self.emit_tracked(
            REMOVE_CHANNEL,
            json!(RemoveChannel { id }),
            Acked::RemoveChannel,
        );
    }

    ///////////////////
    // Server events

    fn add_message(&mut self, msg: Message) {
        let visible = Some(msg.channel_id) == self.store.current_channel_id();
        let line = render::message(&msg, &self.time_zone);
        if self.store.add_message(msg) && visible {
            println!("{line}");
        }
    }

    fn on_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::NewMessage(msg) => self.add_message(msg),
            ServerEvent::NewChannel(channel) => {
                let name = channel.name.clone();
                if self.store.add_channel(channel) {
                    self.notice(&format!("#{name} was created"));
                }
            }
            ServerEvent::RemoveChannel(RemoveChannel { id }) => {
                let was_current = self.store.current_channel_id() == Some(id);
                if let Ok(channel) = self.store.remove_channel(id) {
                    self.notice(&format!("#{} was removed", channel.name));
                    if was_current {
                        self.print_header();
                        self.print_messages();
                    }
                }
            }
            ServerEvent::RenameChannel(RenameChannel { id, name }) => {
                let old = self.store.channel(id).map(|c| c.name.clone());
                if let (Some(old), Ok(())) = (old, self.store.rename_channel(id, name.clone())) {
                    self.notice(&format!("#{old} was renamed to #{name}"));
                }
            }
            ServerEvent::Unknown(name) => debug!("ignoring {name:?} event"),
        }
    }

    fn on_acked(&mut self, acked: Acked) {
        match acked {
            Acked::Message(id, Ok(ack)) => match self.composer.acknowledge(id, &ack) {
                Outcome::Sent => {
                    self.message_task = None;
                    if let Some(msg) = ack.data::<Message>() {
                        self.add_message(msg);
                    }
                }
                Outcome::Pending => warn!(
                    "server answered {} to the message, still waiting (/cancel to give up)",
                    ack.0
                ),
                Outcome::Stale => debug!("ignoring acknowledgement of earlier message {id}"),
            },
            Acked::Message(id, Err(err)) => {
                if self.composer.is_current(id) {
                    warn!("message not delivered: {err}, still waiting (/cancel to give up)");
                } else {
                    debug!("earlier message {id} not delivered: {err}");
                }
            }
            Acked::NewChannel(Ok(ack)) if ack.is_ok() => {
                if let Some(channel) = ack.data::<Channel>() {
                    let id = channel.id;
                    self.store.add_channel(channel);
                    if self.store.select_channel(id).is_ok() {
                        self.print_header();
                    }
                }
            }
            Acked::NewChannel(Ok(ack)) => self.error(&format!("Channel not created: {}", ack.0)),
            Acked::RenameChannel(Ok(ack)) | Acked::RemoveChannel(Ok(ack)) if ack.is_ok() => {}
            Acked::RenameChannel(Ok(ack)) => self.error(&format!("Channel not renamed: {}", ack.0)),
            Acked::RemoveChannel(Ok(ack)) => self.error(&format!("Channel not removed: {}", ack.0)),
            Acked::NewChannel(Err(err))
            | Acked::RenameChannel(Err(err))
            | Acked::RemoveChannel(Err(err)) => warn!("channel change failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use parley_config::Config;
    use parley_core::{
        Ack, Channel, ChannelId, InitialData, Message, MessageId, RemoveChannel, RenameChannel,
        ServerEvent,
    };
    use serde_json::json;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::{Acked, EventHandleResult, InputMode, Ui, UiEvent};
    use crate::logger::Logger;
    use crate::login::tests::FakeBackend;
    use crate::route::Route;
    use crate::session::{Auth, CredentialStore, Credentials};

    fn ui(token: Option<&str>) -> (Ui, UnboundedReceiver<InputMode>) {
        let config = Box::leak(Box::new(Config::default()));
        let mut auth = Auth::hydrate(CredentialStore::Memory);
        if let Some(token) = token {
            auth.log_in(Credentials {
                token: token.to_string(),
                username: Some("admin".to_string()),
            })
            .unwrap();
        }
        let (logger, _) = Logger::new();
        let (event_tx, _) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let ui = Ui::new(
            config,
            Box::new(FakeBackend),
            auth,
            logger,
            event_tx,
            input_tx,
            false,
        )
        .unwrap();
        (ui, input_rx)
    }

    fn data() -> InitialData {
        InitialData {
            channels: vec![
                Channel {
                    id: ChannelId(1),
                    name: "general".to_string(),
                    removable: false,
                },
                Channel {
                    id: ChannelId(2),
                    name: "memes".to_string(),
                    removable: true,
                },
            ],
            messages: vec![],
            current_channel_id: Some(ChannelId(2)),
        }
    }

    fn ok() -> Ack {
        Ack(json!({ "status": "ok" }))
    }

    fn begin(ui: &mut Ui, text: &str) -> u64 {
        ui.composer.set_text(text).unwrap();
        let channel = ui.store.current_channel_id();
        ui.composer.begin(channel, None).unwrap().id
    }

    #[test]
    fn earlier_ack_does_not_complete_later_message() {
        let (mut ui, _input_rx) = ui(Some("token-admin"));
        ui.store.hydrate(data());

        let first = begin(&mut ui, "A");
        ui.cancel();
        let second = begin(&mut ui, "B");

        ui.on_acked(Acked::Message(first, Ok(ok())));
        assert!(ui.composer.is_submitting());
        assert_eq!(ui.composer.text(), "B");

        ui.on_acked(Acked::Message(second, Ok(ok())));
        assert!(!ui.composer.is_submitting());
        assert_eq!(ui.composer.text(), "");
    }

    #[test]
    fn sent_message_is_not_duplicated_by_broadcast() {
        let (mut ui, _input_rx) = ui(Some("token-admin"));
        ui.store.hydrate(data());

        let id = begin(&mut ui, "hi");
        let msg = Message {
            id: MessageId(7),
            channel_id: ChannelId(2),
            username: Some("admin".to_string()),
            text: "hi".to_string(),
            timestamp: Some(1_700_000_000_000),
        };
        let ack = Ack(json!({ "status": "ok", "data": msg.clone() }));
        ui.on_acked(Acked::Message(id, Ok(ack)));
        assert_eq!(ui.store.message_count(ChannelId(2)), 1);

        ui.on_server_event(ServerEvent::NewMessage(msg));
        assert_eq!(ui.store.message_count(ChannelId(2)), 1);
    }

    #[test]
    fn cancel_gives_up_and_keeps_text() {
        let (mut ui, _input_rx) = ui(Some("token-admin"));
        ui.store.hydrate(data());

        let id = begin(&mut ui, "hi");
        ui.on_acked(Acked::Message(id, Ok(Ack(json!({ "status": "error" })))));
        assert!(ui.composer.is_submitting());
        assert_eq!(ui.composer.text(), "hi");

        ui.cancel();
        assert!(!ui.composer.is_submitting());
        assert_eq!(ui.composer.text(), "hi");

        // The server may still answer the abandoned submission
        ui.on_acked(Acked::Message(id, Ok(ok())));
        assert_eq!(ui.composer.text(), "hi");
        assert_eq!(ui.store.message_count(ChannelId(2)), 0);
    }

    #[test]
    fn channel_events_follow_current_channel() {
        let (mut ui, _input_rx) = ui(Some("token-admin"));
        ui.store.hydrate(data());

        ui.on_server_event(ServerEvent::RenameChannel(RenameChannel {
            id: ChannelId(2),
            name: "dank".to_string(),
        }));
        assert_eq!(ui.store.current_channel().unwrap().name, "dank");

        ui.on_server_event(ServerEvent::RemoveChannel(RemoveChannel { id: ChannelId(2) }));
        assert_eq!(ui.store.current_channel_id(), Some(ChannelId(1)));
        assert_eq!(ui.store.channels().len(), 1);
    }

    #[test]
    fn created_channel_is_selected() {
        let (mut ui, _input_rx) = ui(Some("token-admin"));
        ui.store.hydrate(data());

        let ack = Ack(json!({
            "status": "ok",
            "data": { "id": 3, "name": "dev", "removable": true },
        }));
        ui.on_acked(Acked::NewChannel(Ok(ack)));
        assert_eq!(ui.store.current_channel_id(), Some(ChannelId(3)));
    }

    #[tokio::test]
    async fn rejected_token_leads_to_login() {
        let (mut ui, _input_rx) = ui(Some("expired"));
        ui.navigate(Route::Home).await;

        assert_eq!(ui.route, Route::Login);
        assert!(!ui.auth.logged_in());
        assert!(ui.store.channels().is_empty());
    }

    #[tokio::test]
    async fn home_loads_channels() {
        let (mut ui, _input_rx) = ui(Some("token-admin"));
        ui.navigate(Route::Home).await;

        assert_eq!(ui.route, Route::Home);
        assert_eq!(ui.store.current_channel().unwrap().name, "general");
        // The backend offers no socket
        assert!(ui.conn.is_none());
    }

    #[tokio::test]
    async fn login_reads_password_hidden() {
        let (mut ui, mut input_rx) = ui(None);
        ui.navigate(Route::Home).await;
        assert_eq!(ui.route, Route::Login);

        let result = ui.handle_event(UiEvent::Line("/login admin".to_string())).await;
        assert!(matches!(result, EventHandleResult::Continue));
        assert_eq!(input_rx.try_recv().unwrap(), InputMode::Hidden);

        ui.handle_event(UiEvent::Password(Some("admin".to_string())))
            .await;
        assert_eq!(input_rx.try_recv().unwrap(), InputMode::Visible);
        assert!(ui.auth.logged_in());
        assert_eq!(ui.route, Route::Home);
        assert_eq!(ui.store.current_channel().unwrap().name, "general");
    }

    #[tokio::test]
    async fn wrong_or_aborted_password_stays_on_login() {
        let (mut ui, mut input_rx) = ui(None);
        ui.navigate(Route::Login).await;

        ui.handle_event(UiEvent::Line("/login admin".to_string())).await;
        assert_eq!(input_rx.try_recv().unwrap(), InputMode::Hidden);
        ui.handle_event(UiEvent::Password(Some("wrong".to_string())))
            .await;
        assert_eq!(input_rx.try_recv().unwrap(), InputMode::Visible);
        assert!(!ui.auth.logged_in());
        assert_eq!(ui.route, Route::Login);

        ui.handle_event(UiEvent::Line("/signup newbie".to_string())).await;
        assert_eq!(input_rx.try_recv().unwrap(), InputMode::Hidden);
        ui.handle_event(UiEvent::Password(None)).await;
        assert_eq!(input_rx.try_recv().unwrap(), InputMode::Visible);
        assert!(ui.prompt.is_none());
        assert!(!ui.auth.logged_in());
    }

    #[tokio::test]
    async fn quit_stops() {
        let (mut ui, mut input_rx) = ui(None);
        let result = ui.handle_event(UiEvent::Line("/quit".to_string())).await;
        assert!(matches!(result, EventHandleResult::Stop));
        assert!(input_rx.try_recv().is_err());
    }
}
