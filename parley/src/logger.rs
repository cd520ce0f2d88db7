use std::sync::Arc;

use crossterm::style::Stylize;
use jiff::Zoned;
use log::{Level, LevelFilter, Log};
use parking_lot::Mutex;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct LogMsg {
    time: Zoned,
    level: Level,
    content: String,
}

impl LogMsg {
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn styled(&self) -> String {
        let level = format!("{:<5}", self.level);
        let level = match self.level {
            Level::Error => level.bold().red(),
            Level::Warn => level.bold().yellow(),
            Level::Info => level.bold().green(),
            Level::Debug => level.bold().blue(),
            Level::Trace => level.bold().magenta(),
        };
        let time = self.time.strftime("%H:%M:%S").to_string().dark_grey();
        format!("{time} {level} {}", self.content)
    }
}

/// Prints all error messages when dropped.
pub struct LoggerGuard {
    messages: Arc<Mutex<Vec<LogMsg>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let guard = self.messages.lock();
        let mut error_encountered = false;
        for msg in &*guard {
            if msg.level == Level::Error {
                if !error_encountered {
                    eprintln!();
                    eprintln!("The following errors occurred while parley was running:");
                }
                error_encountered = true;
                eprintln!("{}", msg.content);
            }
        }
        if error_encountered {
            eprintln!();
        }
    }
}

#[derive(Debug, Clone)]
pub struct Logger {
    event_tx: mpsc::UnboundedSender<()>,
    messages: Arc<Mutex<Vec<LogMsg>>>,
}

impl Log for Logger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        if metadata.level() <= Level::Info {
            return true;
        }

        metadata.target().starts_with("parley")
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let msg = LogMsg {
            time: Zoned::now(),
            level: record.level(),
            content: format!("<{}> {}", record.target(), record.args()),
        };
        self.messages.lock().push(msg);

        let _ = self.event_tx.send(());
    }

    fn flush(&self) {}
}

impl Logger {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let logger = Self {
            event_tx,
            messages: Arc::new(Mutex::new(Vec::new())),
        };
        (logger, event_rx)
    }

    pub fn init(verbose: bool) -> (Self, LoggerGuard, mpsc::UnboundedReceiver<()>) {
        let (logger, event_rx) = Self::new();
        let guard = LoggerGuard {
            messages: logger.messages.clone(),
        };

        log::set_max_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        });

        log::set_boxed_logger(Box::new(logger.clone())).expect("logger already set");

        (logger, guard, event_rx)
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// All messages logged since the first `from` messages.
    pub fn messages_from(&self, from: usize) -> Vec<LogMsg> {
        self.messages
            .lock()
            .get(from..)
            .map(|msgs| msgs.to_vec())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use log::{Level, Log, Record};

    use super::Logger;

    fn record(logger: &Logger, level: Level, target: &str, text: &str) {
        logger.log(
            &Record::builder()
                .level(level)
                .target(target)
                .args(format_args!("{text}"))
                .build(),
        );
    }

    #[test]
    fn filters_foreign_debug_messages() {
        let (logger, mut event_rx) = Logger::new();
        record(&logger, Level::Debug, "parley::conn", "mine");
        record(&logger, Level::Debug, "hyper::proto", "noise");
        record(&logger, Level::Warn, "hyper::proto", "important");

        assert_eq!(logger.len(), 2);
        let msgs = logger.messages_from(1);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].level(), Level::Warn);
        assert!(msgs[0].styled().contains("<hyper::proto> important"));
        assert!(logger.messages_from(5).is_empty());

        assert!(event_rx.try_recv().is_ok());
    }
}
