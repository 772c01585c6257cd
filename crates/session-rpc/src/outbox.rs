//! Channel-backed plugin runtime.
//!
//! Stands in for a plugin connection: frames written to a session are queued
//! until an RPC caller drains them.

use session_core::{AccessAction, PluginRuntime};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

/// A frame delivered through the write path.
#[derive(Debug, Clone)]
pub struct OutboxFrame {
    pub session_id: String,
    pub action: AccessAction,
    pub payload: Vec<u8>,
}

/// Bounded queue of frames for one session.
#[derive(Debug)]
pub struct Outbox {
    tx: mpsc::Sender<OutboxFrame>,
    rx: Mutex<mpsc::Receiver<OutboxFrame>>,
}

impl Outbox {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Take every queued frame.
    pub fn drain(&self) -> Vec<OutboxFrame> {
        let mut rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

impl PluginRuntime for Outbox {
    fn write(&self, session_id: &str, action: AccessAction, payload: Vec<u8>) {
        let frame = OutboxFrame {
            session_id: session_id.to_string(),
            action,
            payload,
        };
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(frame)) => {
                warn!(session_id = %frame.session_id, "Outbox full, dropping frame");
            }
            Err(TrySendError::Closed(frame)) => {
                warn!(session_id = %frame.session_id, "Outbox closed, dropping frame");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_frames_in_order() {
        let outbox = Outbox::new(8);
        outbox.write("s", AccessAction::InvokeTool, b"1".to_vec());
        outbox.write("s", AccessAction::InvokeLlm, b"2".to_vec());

        let frames = outbox.drain();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].payload, b"1");
        assert_eq!(frames[1].action, AccessAction::InvokeLlm);
        assert!(outbox.drain().is_empty());
    }

    #[test]
    fn test_full_outbox_drops_newest() {
        let outbox = Outbox::new(1);
        outbox.write("s", AccessAction::InvokeTool, b"kept".to_vec());
        outbox.write("s", AccessAction::InvokeTool, b"dropped".to_vec());

        let frames = outbox.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"kept");
    }
}
