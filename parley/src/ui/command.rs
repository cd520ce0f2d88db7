#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text, to be sent as a message.
    Say(String),
    Channels,
    Join(String),
    Messages,
    New(String),
    Rename(String),
    Remove,
    Cancel,
    Login(String),
    Signup(String),
    Logout,
    Open(String),
    Reconnect,
    Log,
    Help,
    Quit,
    /// A known command was used without its argument.
    Usage(&'static str),
    Unknown(String),
    Empty,
}

pub const HELP: &[(&str, &str)] = &[
    ("<text>", "send a message to the current channel (start with // to send a /)"),
    ("/channels", "list channels"),
    ("/join <channel>", "switch to a channel by name or id"),
    ("/messages", "show the messages of the current channel"),
    ("/new <name>", "create a channel"),
    ("/rename <name>", "rename the current channel"),
    ("/remove", "remove the current channel"),
    ("/cancel", "stop waiting for the pending message"),
    ("/login <username>", "log in (asks for the password next)"),
    ("/signup <username>", "create an account (asks for the password next)"),
    ("/logout", "log out and forget the session"),
    ("/open <path>", "navigate to /, /login or /signup"),
    ("/reconnect", "reconnect the socket"),
    ("/log", "show log messages"),
    ("/help", "show this help"),
    ("/quit", "exit parley"),
];

fn arg(rest: &str, usage: &'static str, f: fn(String) -> Command) -> Command {
    let rest = rest.trim();
    if rest.is_empty() {
        Command::Usage(usage)
    } else {
        f(rest.to_string())
    }
}

impl Command {
    pub fn parse(line: &str) -> Self {
        if line.trim().is_empty() {
            return Self::Empty;
        }
        if let Some(text) = line.strip_prefix("//") {
            return Self::Say(format!("/{text}"));
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
        match name {
            "channels" | "c" => Self::Channels,
            "join" | "j" => arg(rest, "/join <channel>", Self::Join),
            "messages" | "m" => Self::Messages,
            "new" => arg(rest, "/new <name>", Self::New),
            "rename" => arg(rest, "/rename <name>", Self::Rename),
            "remove" => Self::Remove,
            "cancel" => Self::Cancel,
            "login" => arg(rest, "/login <username>", Self::Login),
            "signup" => arg(rest, "/signup <username>", Self::Signup),
            "logout" => Self::Logout,
            "open" => arg(rest, "/open <path>", Self::Open),
            "reconnect" => Self::Reconnect,
            "log" => Self::Log,
            "help" | "h" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            _ => Self::Unknown(name.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Command;

    #[test]
    fn text_is_said() {
        assert_eq!(Command::parse("hello"), Command::Say("hello".to_string()));
        assert_eq!(Command::parse("//shrug"), Command::Say("/shrug".to_string()));
        assert_eq!(Command::parse("   "), Command::Empty);
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(
            Command::parse("/join  random "),
            Command::Join("random".to_string())
        );
        assert_eq!(
            Command::parse("/new dev chat"),
            Command::New("dev chat".to_string())
        );
        assert_eq!(Command::parse("/join"), Command::Usage("/join <channel>"));
        assert_eq!(Command::parse("/login "), Command::Usage("/login <username>"));
    }

    #[test]
    fn aliases_and_unknown() {
        assert_eq!(Command::parse("/q"), Command::Quit);
        assert_eq!(Command::parse("/c"), Command::Channels);
        assert_eq!(Command::parse("/dance"), Command::Unknown("dance".to_string()));
    }
}
