//! Bounded command inbox.
//!
//! Bridges the pub/sub callback (which may run on another task) with the
//! synchronous control loop.  The transport pushes raw payloads; the loop
//! drains the queue once per cycle and applies each command to completion.
//!
//! ```text
//! ┌──────────────┐  raw frame  ┌──────────────┐
//! │  Transport   │────────────▶│ Control Loop │
//! │  callback    │   (push)    │   (drain)    │
//! └──────────────┘             └──────────────┘
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use log::warn;

/// Maximum accepted payload size in bytes.
pub const MAX_FRAME_LEN: usize = 512;

/// Queue depth.
pub const INBOX_DEPTH: usize = 8;

pub type Frame = Vec<u8, MAX_FRAME_LEN>;

pub struct CommandInbox {
    channel: Channel<CriticalSectionRawMutex, Frame, INBOX_DEPTH>,
    dropped: AtomicU32,
}

impl Default for CommandInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandInbox {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Queue a payload.  Returns `false` (and counts a drop) if the payload
    /// is oversized or the inbox is full.
    pub fn push(&self, payload: &[u8]) -> bool {
        let Ok(frame) = Frame::from_slice(payload) else {
            warn!("inbox: {}-byte payload exceeds {MAX_FRAME_LEN}, dropped", payload.len());
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        if self.channel.try_send(frame).is_err() {
            warn!("inbox: full, command dropped");
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Hand every queued payload to `f`, oldest first.  Returns how many
    /// were processed.
    pub fn drain(&self, mut f: impl FnMut(&[u8])) -> usize {
        let mut n = 0;
        while let Ok(frame) = self.channel.try_receive() {
            f(&frame);
            n += 1;
        }
        n
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Payloads rejected since startup.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
