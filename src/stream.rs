//! Incremental line capture from a running process's output.
//!
//! A reader thread feeds lines into a channel; the control thread
//! consumes them with wall-clock deadlines. The source is any
//! `BufRead`, so tests inject in-memory streams instead of real pipes.

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of waiting on a line stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The predicate matched a line.
    Ready,
    /// The stream closed before the predicate matched.
    Closed,
    /// The deadline elapsed first.
    TimedOut,
}

/// Single-consumer view of a process's combined output, line by line.
///
/// Every observed line is appended to an accumulated buffer regardless
/// of outcome, so partial output up to a timeout or forced kill is
/// never lost.
pub struct LineStream {
    rx: Receiver<String>,
    captured: String,
    closed: bool,
}

impl LineStream {
    /// Spawn the reader thread for `reader`.
    ///
    /// The thread exits when the stream hits EOF (the process exited or
    /// was killed, closing the write end) or when this `LineStream` is
    /// dropped.
    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self {
            rx,
            captured: String::new(),
            closed: false,
        }
    }

    /// Consume lines until `pred` matches one, the stream closes, or
    /// `timeout` elapses.
    pub fn wait_for<P: Fn(&str) -> bool>(&mut self, pred: P, timeout: Duration) -> WaitOutcome {
        if self.closed {
            return WaitOutcome::Closed;
        }
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::TimedOut;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(line) => {
                    let matched = pred(&line);
                    self.push(line);
                    if matched {
                        return WaitOutcome::Ready;
                    }
                }
                Err(RecvTimeoutError::Timeout) => return WaitOutcome::TimedOut,
                Err(RecvTimeoutError::Disconnected) => {
                    self.closed = true;
                    return WaitOutcome::Closed;
                }
            }
        }
    }

    /// Capture everything remaining. Returns `true` if the stream
    /// closed within `timeout`, `false` if lines may still be pending.
    pub fn drain(&mut self, timeout: Duration) -> bool {
        if self.closed {
            return true;
        }
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(line) => self.push(line),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => {
                    self.closed = true;
                    return true;
                }
            }
        }
    }

    /// Everything captured so far, newline-terminated per line.
    pub fn captured(&self) -> &str {
        &self.captured
    }

    pub fn into_captured(self) -> String {
        self.captured
    }

    fn push(&mut self, line: String) {
        self.captured.push_str(&line);
        self.captured.push('\n');
    }
}
