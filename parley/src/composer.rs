//! The message input and the state of its submission.

use jiff::Timestamp;
use parley_core::{Ack, ChannelId, NewMessage};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("the previous message is still being sent")]
    Submitting,
    #[error("no channel selected")]
    NoChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    /// The acknowledgement was not ok. The text stays in the input and the
    /// submission doesn't complete until [`Composer::abandon`] is called.
    Pending,
    /// The acknowledgement belongs to a submission that was abandoned or has
    /// already completed. Nothing changes.
    Stale,
}

/// A message on its way to the server, tagged with the submission it belongs
/// to. Only the acknowledgement for this id can complete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: u64,
    pub message: NewMessage,
}

#[derive(Debug, Default)]
pub struct Composer {
    text: String,
    submission: Option<u64>,
    next_submission: u64,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_submitting(&self) -> bool {
        self.submission.is_some()
    }

    /// Replace the input text. Ignored while submitting.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), Error> {
        if self.is_submitting() {
            return Err(Error::Submitting);
        }
        self.text = text.into();
        Ok(())
    }

    /// Turn the current input into a message for the given channel and start
    /// submitting it.
    pub fn begin(
        &mut self,
        channel_id: Option<ChannelId>,
        username: Option<&str>,
    ) -> Result<Submission, Error> {
        if self.is_submitting() {
            return Err(Error::Submitting);
        }
        let channel_id = channel_id.ok_or(Error::NoChannel)?;

        let id = self.next_submission;
        self.next_submission += 1;
        self.submission = Some(id);
        Ok(Submission {
            id,
            message: NewMessage {
                text: self.text.clone(),
                username: username.map(|s| s.to_string()),
                channel_id,
                timestamp: Timestamp::now().as_millisecond(),
            },
        })
    }

    /// Whether `submission` is the one waiting for its acknowledgement.
    pub fn is_current(&self, submission: u64) -> bool {
        self.submission == Some(submission)
    }

    pub fn acknowledge(&mut self, submission: u64, ack: &Ack) -> Outcome {
        if !self.is_current(submission) {
            return Outcome::Stale;
        }
        if ack.is_ok() {
            self.text.clear();
            self.submission = None;
            Outcome::Sent
        } else {
            Outcome::Pending
        }
    }

    /// Give up on the current submission, keeping the text.
    pub fn abandon(&mut self) {
        self.submission = None;
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use parley_core::{Ack, ChannelId};
    use serde_json::json;

    use super::{Composer, Error, Outcome};

    fn composer(text: &str) -> Composer {
        let mut composer = Composer::new();
        composer.set_text(text).unwrap();
        composer
    }

    #[test]
    fn begin_builds_message() {
        let before = Timestamp::now().as_millisecond();
        let mut composer = composer("hello");
        let msg = composer
            .begin(Some(ChannelId(2)), Some("admin"))
            .unwrap()
            .message;

        assert_eq!(msg.text, "hello");
        assert_eq!(msg.username.as_deref(), Some("admin"));
        assert_eq!(msg.channel_id, ChannelId(2));
        assert!(msg.timestamp >= before);
        assert!(composer.is_submitting());
    }

    #[test]
    fn ok_ack_clears_input() {
        let mut composer = composer("hello");
        let id = composer.begin(Some(ChannelId(1)), None).unwrap().id;

        let outcome = composer.acknowledge(id, &Ack(json!({ "status": "ok" })));
        assert_eq!(outcome, Outcome::Sent);
        assert_eq!(composer.text(), "");
        assert!(!composer.is_submitting());
    }

    #[test]
    fn other_ack_stays_pending() {
        let mut composer = composer("hello");
        let id = composer.begin(Some(ChannelId(1)), None).unwrap().id;

        for ack in [json!({ "status": "error" }), json!(null), json!("ok")] {
            assert_eq!(composer.acknowledge(id, &Ack(ack)), Outcome::Pending);
            assert_eq!(composer.text(), "hello");
            assert!(composer.is_submitting());
        }

        assert_eq!(
            composer.begin(Some(ChannelId(1)), None),
            Err(Error::Submitting)
        );
        assert_eq!(composer.set_text("other"), Err(Error::Submitting));

        composer.abandon();
        assert!(!composer.is_submitting());
        assert_eq!(composer.text(), "hello");
        assert!(composer.begin(Some(ChannelId(1)), None).is_ok());
    }

    #[test]
    fn earlier_ack_does_not_complete_later_message() {
        let ok = Ack(json!({ "status": "ok" }));
        let mut composer = composer("first");
        let first = composer.begin(Some(ChannelId(1)), None).unwrap().id;
        composer.abandon();

        composer.set_text("second").unwrap();
        let second = composer.begin(Some(ChannelId(1)), None).unwrap().id;
        assert_ne!(first, second);

        assert_eq!(composer.acknowledge(first, &ok), Outcome::Stale);
        assert!(composer.is_submitting());
        assert_eq!(composer.text(), "second");

        assert_eq!(composer.acknowledge(second, &ok), Outcome::Sent);
        assert_eq!(composer.acknowledge(second, &ok), Outcome::Stale);
        assert_eq!(composer.text(), "");
    }

    #[test]
    fn needs_channel() {
        let mut composer = composer("hello");
        assert_eq!(composer.begin(None, None), Err(Error::NoChannel));
        assert!(!composer.is_submitting());
    }
}
