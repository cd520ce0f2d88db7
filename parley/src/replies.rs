use std::collections::HashMap;
use std::hash::Hash;
use std::result;
use std::time::Duration;

use tokio::sync::oneshot::{self, Receiver, Sender};
use tokio::time;

#[derive(Debug)]
pub enum Error {
    TimedOut,
    Canceled,
}

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct PendingReply<R> {
    timeout: Option<Duration>,
    result: Receiver<R>,
}

impl<R> PendingReply<R> {
    /// Wait for the reply. Without a timeout, this only returns once the reply
    /// arrives or the reply table is dropped.
    pub async fn get(self) -> Result<R> {
        let result = match self.timeout {
            Some(timeout) => match time::timeout(timeout, self.result).await {
                Ok(result) => result,
                Err(_) => return Err(Error::TimedOut),
            },
            None => self.result.await,
        };
        result.map_err(|_| Error::Canceled)
    }
}

#[derive(Debug)]
pub struct Replies<I, R> {
    timeout: Option<Duration>,
    pending: HashMap<I, Sender<R>>,
}

impl<I: Eq + Hash, R> Replies<I, R> {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            pending: HashMap::new(),
        }
    }

    pub fn wait_for(&mut self, id: I) -> PendingReply<R> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        PendingReply {
            timeout: self.timeout,
            result: rx,
        }
    }

    /// Returns whether anybody was waiting for this reply.
    pub fn complete(&mut self, id: &I, result: R) -> bool {
        match self.pending.remove(id) {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    pub fn purge(&mut self) {
        self.pending.retain(|_, tx| !tx.is_closed());
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
