use std::env;
use std::io::{self, BufRead, IsTerminal};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use jiff::tz::TimeZone;
use jiff::Timestamp;

/// Load a [`TimeZone`] specified by the `TZ` environment varible, or by the
/// provided string if the environment variable does not exist.
///
/// If a string is provided, it is interpreted in the same format that the `TZ`
/// environment variable uses.
///
/// If no `TZ` environment variable could be found and no string is provided,
/// the system local time (or UTC on Windows) is used.
pub fn load_time_zone(tz_string: Option<&str>) -> Result<TimeZone, jiff::Error> {
    let env_string = env::var("TZ").ok();
    let tz_string = env_string.as_ref().map(|s| s as &str).or(tz_string);

    let Some(tz_string) = tz_string else {
        return Ok(TimeZone::system());
    };

    if tz_string == "localtime" {
        return Ok(TimeZone::system());
    }

    if let Some(tz_string) = tz_string.strip_prefix(':') {
        return TimeZone::get(tz_string);
    }

    // Parsing as a POSIX TZ string first avoids a tz database lookup.
    if let Ok(tz) = TimeZone::posix(tz_string) {
        return Ok(tz);
    }

    TimeZone::get(tz_string)
}

/// Format a message timestamp (milliseconds since the unix epoch).
pub fn format_time(millis: i64, tz: &TimeZone) -> Option<String> {
    let time = Timestamp::from_millisecond(millis).ok()?;
    Some(time.to_zoned(tz.clone()).strftime("%H:%M").to_string())
}

/// Read a line from stdin without echoing it, e.g. a password.
///
/// Returns `None` if the input was aborted with Ctrl+C or Ctrl+D or stdin
/// reached its end. If stdin is not a terminal, the line is read as is.
pub fn read_hidden_line() -> io::Result<Option<String>> {
    if !io::stdin().is_terminal() {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        return Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()));
    }

    terminal::enable_raw_mode()?;
    let result = read_hidden_keys();
    terminal::disable_raw_mode()?;
    // Raw mode swallowed the enter key
    println!();
    result
}

fn read_hidden_keys() -> io::Result<Option<String>> {
    let mut line = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(Some(line)),
            KeyCode::Backspace => {
                line.pop();
            }
            KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None)
            }
            KeyCode::Char(c) => line.push(c),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::tz::TimeZone;

    use super::format_time;

    #[test]
    fn formats_in_time_zone() {
        // 2023-11-14 22:13:20 UTC
        let millis = 1_700_000_000_000;
        assert_eq!(format_time(millis, &TimeZone::UTC).as_deref(), Some("22:13"));

        let plus_one = TimeZone::fixed(jiff::tz::offset(1));
        assert_eq!(format_time(millis, &plus_one).as_deref(), Some("23:13"));
    }

    #[test]
    fn out_of_range() {
        assert_eq!(format_time(i64::MAX, &TimeZone::UTC), None);
    }
}
