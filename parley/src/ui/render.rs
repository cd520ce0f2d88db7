//! Plain text rendering of store contents.

use crossterm::style::Stylize;
use jiff::tz::TimeZone;
use parley_core::{Channel, Message};

use crate::store::Store;
use crate::util;

use super::command::HELP;

pub fn message(msg: &Message, tz: &TimeZone) -> String {
    let time = msg
        .timestamp
        .and_then(|millis| util::format_time(millis, tz))
        .unwrap_or_else(|| "--:--".to_string());
    let nick = msg.username.as_deref().unwrap_or("anonymous");
    format!("{} {} {}", time.dark_grey(), format!("{nick}:").bold().cyan(), msg.text)
}

fn messages_line(count: usize) -> String {
    match count {
        1 => "1 message".to_string(),
        n => format!("{n} messages"),
    }
}

pub fn header(store: &Store, username: Option<&str>) -> String {
    let (name, count) = match store.current_channel() {
        Some(channel) => (channel.name.as_str(), store.message_count(channel.id)),
        None => ("", 0),
    };
    let welcome = match username {
        Some(username) => format!("Welcome, {username}!"),
        None => "Welcome!".to_string(),
    };
    format!(
        "{} {}  {}",
        format!("# {name}").bold(),
        format!("({})", messages_line(count)).dark_grey(),
        welcome
    )
}

pub fn channel(channel: &Channel, count: usize, current: bool) -> String {
    let marker = if current { "*" } else { " " };
    let name = format!("#{}", channel.name);
    let name = if current { name.bold() } else { name.stylize() };
    let mut line = format!("{marker} {name} {}", format!("({count})").dark_grey());
    if !channel.removable {
        line.push_str(&format!(" {}", "[fixed]".dark_grey()));
    }
    line
}

pub fn channels(store: &Store) -> Vec<String> {
    let current = store.current_channel_id();
    store
        .channels()
        .iter()
        .map(|c| channel(c, store.message_count(c.id), Some(c.id) == current))
        .collect()
}

pub fn help() -> Vec<String> {
    let width = HELP.iter().map(|(cmd, _)| cmd.len()).max().unwrap_or(0);
    HELP.iter()
        .map(|(cmd, text)| format!("{cmd:<width$}  {text}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use parley_core::{Channel, ChannelId, InitialData, Message, MessageId};

    use super::messages_line;
    use crate::store::Store;

    #[test]
    fn pluralizes() {
        assert_eq!(messages_line(0), "0 messages");
        assert_eq!(messages_line(1), "1 message");
        assert_eq!(messages_line(2), "2 messages");
    }

    #[test]
    fn lists_channels_with_counts() {
        let mut store = Store::new();
        store.hydrate(InitialData {
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
            messages: vec![Message {
                id: MessageId(1),
                channel_id: ChannelId(2),
                username: None,
                text: "lol".to_string(),
                timestamp: None,
            }],
            current_channel_id: Some(ChannelId(2)),
        });

        let lines = super::channels(&store);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  "));
        assert!(lines[0].contains("general"));
        assert!(lines[0].contains("[fixed]"));
        assert!(lines[1].starts_with("* "));
        assert!(lines[1].contains("(1)"));
        assert!(!lines[1].contains("[fixed]"));
    }
}
