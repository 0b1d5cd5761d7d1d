//! Per-connection deadlines.
//!
//! Armed once when the connection is accepted. Every read (request head and
//! body) must finish before the read deadline; the response write must finish
//! before the write deadline. An established event stream is not bounded.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{timeout_at, Instant};

use crate::config::TimeoutConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeadlineExceeded {
    #[error("read deadline exceeded")]
    Read,
    #[error("write deadline exceeded")]
    Write,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Deadlines {
    read: Option<Instant>,
    write: Option<Instant>,
}

fn deadline(now: Instant, secs: Option<u64>) -> Option<Instant> {
    secs.filter(|s| *s > 0)
        .map(|s| now + Duration::from_secs(s))
}

impl Deadlines {
    /// Arm the configured deadlines relative to now.
    pub fn arm(config: &TimeoutConfig) -> Self {
        let now = Instant::now();
        Self {
            read: deadline(now, config.read_secs),
            write: deadline(now, config.write_secs),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.read.is_some() || self.write.is_some()
    }

    pub async fn read<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineExceeded> {
        match self.read {
            Some(at) => timeout_at(at, fut).await.map_err(|_| DeadlineExceeded::Read),
            None => Ok(fut.await),
        }
    }

    pub async fn write<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineExceeded> {
        match self.write {
            Some(at) => timeout_at(at, fut).await.map_err(|_| DeadlineExceeded::Write),
            None => Ok(fut.await),
        }
    }
}
