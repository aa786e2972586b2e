//! # Progress Stream
//!
//! Transfers report completion as integer percentages (0–100) over an
//! unbounded channel. The sending half, [`Progress`], drops any value that is
//! not strictly greater than the last one sent, so the receiver observes a
//! monotonically increasing sequence even when a fetch falls back across
//! several gateways.
//!
//! [`ProgressWindow`] maps bytes transferred into a sub-range of the overall
//! percentage, e.g. the preferred-gateway attempt reports inside 10–90.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

#[derive(Debug)]
struct Inner {
    tx: Option<mpsc::UnboundedSender<u8>>,
    last: AtomicU8,
}

/// Sending half of a progress stream. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct Progress {
    inner: Arc<Inner>,
}

impl Progress {
    /// Create a connected sender/receiver pair.
    pub fn channel() -> (Self, ProgressReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let progress = Self {
            inner: Arc::new(Inner {
                tx: Some(tx),
                last: AtomicU8::new(0),
            }),
        };
        (progress, ProgressReceiver { rx })
    }

    /// A sender that records the high-water mark but emits nothing.
    pub fn silent() -> Self {
        Self {
            inner: Arc::new(Inner {
                tx: None,
                last: AtomicU8::new(0),
            }),
        }
    }

    /// Report `percent` (clamped to 100). Values at or below the last
    /// reported value are ignored.
    pub fn report(&self, percent: u8) {
        let pct = percent.min(100);
        let prev = self.inner.last.fetch_max(pct, Ordering::SeqCst);
        if pct > prev {
            if let Some(tx) = &self.inner.tx {
                // A dropped receiver just means nobody is listening.
                let _ = tx.send(pct);
            }
        }
    }

    /// Highest percentage reported so far.
    pub fn current(&self) -> u8 {
        self.inner.last.load(Ordering::SeqCst)
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::silent()
    }
}

/// Receiving half of a progress stream.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::UnboundedReceiver<u8>,
}

impl ProgressReceiver {
    /// Wait for the next percentage. Returns `None` once every sender is
    /// dropped and the buffer is empty.
    pub async fn recv(&mut self) -> Option<u8> {
        self.rx.recv().await
    }

    /// Collect everything currently buffered without waiting.
    pub fn drain(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(p) = self.rx.try_recv() {
            out.push(p);
        }
        out
    }
}

/// A sub-range `[start, end]` of the overall percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressWindow {
    start: u8,
    end: u8,
}

impl ProgressWindow {
    /// Create a window. `end` is clamped to 100 and to at least `start`.
    pub const fn new(start: u8, end: u8) -> Self {
        let start = if start > 100 { 100 } else { start };
        let end = if end > 100 {
            100
        } else if end < start {
            start
        } else {
            end
        };
        Self { start, end }
    }

    /// Lower bound.
    pub fn start(&self) -> u8 {
        self.start
    }

    /// Upper bound.
    pub fn end(&self) -> u8 {
        self.end
    }

    /// Percentage for `done` of `total` bytes. Unknown or zero totals map to
    /// the window start.
    pub fn at(&self, done: u64, total: Option<u64>) -> u8 {
        match total {
            Some(total) if total > 0 => {
                let span = u64::from(self.end - self.start);
                let done = done.min(total);
                // u128 keeps multi-gigabyte totals from overflowing.
                let offset = (u128::from(done) * u128::from(span) / u128::from(total)) as u8;
                self.start + offset
            }
            _ => self.start,
        }
    }

    /// The `index`-th of `count` equal consecutive slices of this window.
    /// Slices never overlap and are ordered, so progress across successive
    /// slices stays monotonic.
    pub fn slice(&self, index: usize, count: usize) -> Self {
        if count == 0 {
            return *self;
        }
        let span = usize::from(self.end - self.start);
        let index = index.min(count - 1);
        let lo = self.start as usize + span * index / count;
        let hi = self.start as usize + span * (index + 1) / count;
        Self::new(lo as u8, hi as u8)
    }
}
