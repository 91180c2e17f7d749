//! Microphone frame gate. Frames only leave while the session is active;
//! anything captured before or after is dropped on the floor.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::live::Blob;
use crate::pcm::{self, INPUT_MIME_TYPE};

#[derive(Debug, Default)]
pub struct CaptureGate {
    open: AtomicBool,
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl CaptureGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Encode one capture frame for the wire, or `None` if the gate is closed.
    pub fn encode(&self, frame: &[f32]) -> Option<Blob> {
        if !self.is_open() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.sent.fetch_add(1, Ordering::Relaxed);
        Some(Blob {
            mime_type: INPUT_MIME_TYPE.to_string(),
            data: pcm::encode_frame(frame),
        })
    }

    /// (frames sent, frames dropped)
    pub fn counters(&self) -> (u64, u64) {
        (
            self.sent.load(Ordering::Relaxed),
            self.dropped.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_gate_drops_frames() {
        let gate = CaptureGate::new();
        assert!(gate.encode(&[0.1; 16]).is_none());
        gate.open();
        let blob = gate.encode(&[0.0; 16]).unwrap();
        assert_eq!(blob.mime_type, "audio/pcm;rate=16000");
        gate.close();
        assert!(gate.encode(&[0.1; 16]).is_none());
        assert_eq!(gate.counters(), (1, 2));
    }
}
