//! Gapless scheduling of streamed response audio.
//!
//! Each chunk becomes one playback unit starting at
//! `max(next_free, clock.now())`; the marker then advances by the unit's
//! duration. Marker and outstanding units share one lock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

use crate::error::VoiceError;
use crate::pcm::{self, OUTPUT_SAMPLE_RATE};

/// Clock of the audio output, in seconds.
pub trait OutputClock: Send + Sync {
    fn now(&self) -> f64;
}

/// Seconds since the clock was created. The browser starts its own audio
/// context clock when the session opens and plays against this timeline.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputClock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Externally driven clock, microsecond resolution.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, secs: f64) {
        self.micros
            .store((secs * 1_000_000.0).round() as u64, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        self.micros
            .fetch_add((secs * 1_000_000.0).round() as u64, Ordering::SeqCst);
    }
}

impl OutputClock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}

impl<C: OutputClock + ?Sized> OutputClock for std::sync::Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// One schedulable piece of audio.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledUnit {
    pub id: u64,
    pub start_at: f64,
    pub duration: f64,
    pub sample_rate: u32,
    #[serde(skip)]
    pub samples: Vec<f32>,
}

impl ScheduledUnit {
    pub fn end_at(&self) -> f64 {
        self.start_at + self.duration
    }
}

#[derive(Debug, Default)]
struct ScheduleState {
    next_free: f64,
    next_id: u64,
    // id -> end time
    outstanding: BTreeMap<u64, f64>,
}

pub struct PlaybackScheduler<C: OutputClock> {
    clock: C,
    state: Mutex<ScheduleState>,
    muted: AtomicBool,
}

impl<C: OutputClock> PlaybackScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: Mutex::new(ScheduleState::default()),
            muted: AtomicBool::new(false),
        }
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Decode a base64 PCM16 chunk and schedule it. Muted chunks are still
    /// decoded (and so validated) but yield no unit.
    pub fn schedule_chunk(
        &self,
        mime_type: &str,
        data: &str,
    ) -> Result<Option<ScheduledUnit>, VoiceError> {
        let samples = pcm::decode_chunk(data)?;
        let rate = pcm::sample_rate_from_mime(mime_type).unwrap_or(OUTPUT_SAMPLE_RATE);
        Ok(self.schedule(samples, rate))
    }

    pub fn schedule(&self, samples: Vec<f32>, sample_rate: u32) -> Option<ScheduledUnit> {
        if self.is_muted() {
            return None;
        }
        let duration = samples.len() as f64 / sample_rate.max(1) as f64;

        let mut state = self.state.lock();
        let now = self.clock.now();
        state.outstanding.retain(|_, end| *end > now);

        let start_at = state.next_free.max(now);
        state.next_free = start_at + duration;
        state.next_id += 1;
        let id = state.next_id;
        state.outstanding.insert(id, start_at + duration);

        Some(ScheduledUnit {
            id,
            start_at,
            duration,
            sample_rate,
            samples,
        })
    }

    /// Stop everything in flight: returns the ids to stop and rewinds the
    /// marker so the next chunk plays immediately.
    pub fn interrupt(&self) -> Vec<u64> {
        let mut state = self.state.lock();
        let stopped: Vec<u64> = std::mem::take(&mut state.outstanding).into_keys().collect();
        state.next_free = 0.0;
        stopped
    }

    /// Units scheduled and not yet finished.
    pub fn outstanding(&self) -> Vec<u64> {
        let mut state = self.state.lock();
        let now = self.clock.now();
        state.outstanding.retain(|_, end| *end > now);
        state.outstanding.keys().copied().collect()
    }

    pub fn next_free(&self) -> f64 {
        self.state.lock().next_free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
    use base64::Engine;
    use std::sync::Arc;

    fn scheduler() -> (Arc<ManualClock>, PlaybackScheduler<Arc<ManualClock>>) {
        let clock = Arc::new(ManualClock::new());
        (clock.clone(), PlaybackScheduler::new(clock))
    }

    #[test]
    fn test_units_never_overlap() {
        let (clock, sched) = scheduler();
        clock.set(1.0);
        let a = sched.schedule(vec![0.0; 24_000], 24_000).unwrap(); // 1s
        clock.advance(0.1);
        let b = sched.schedule(vec![0.0; 12_000], 24_000).unwrap(); // 0.5s
        clock.advance(0.05);
        let c = sched.schedule(vec![0.0; 2_400], 24_000).unwrap(); // 0.1s

        assert_eq!(a.start_at, 1.0);
        assert!(b.start_at >= a.end_at());
        assert!(c.start_at >= b.end_at());
        assert!((c.end_at() - 2.6).abs() < 1e-9);
    }

    #[test]
    fn test_late_chunk_starts_at_clock() {
        let (clock, sched) = scheduler();
        let a = sched.schedule(vec![0.0; 2_400], 24_000).unwrap();
        assert_eq!(a.start_at, 0.0);
        clock.set(5.0);
        let b = sched.schedule(vec![0.0; 2_400], 24_000).unwrap();
        assert_eq!(b.start_at, 5.0);
        assert!(sched.next_free() >= clock.now());
    }

    #[test]
    fn test_interrupt_resets_marker() {
        let (clock, sched) = scheduler();
        clock.set(2.0);
        let a = sched.schedule(vec![0.0; 240_000], 24_000).unwrap(); // 10s
        let b = sched.schedule(vec![0.0; 24_000], 24_000).unwrap();
        clock.advance(0.5);

        let mut stopped = sched.interrupt();
        stopped.sort();
        assert_eq!(stopped, vec![a.id, b.id]);
        assert_eq!(sched.next_free(), 0.0);
        assert!(sched.outstanding().is_empty());

        let c = sched.schedule(vec![0.0; 2_400], 24_000).unwrap();
        assert_eq!(c.start_at, 2.5);
        assert!(c.start_at < b.end_at());
    }

    #[test]
    fn test_finished_units_are_pruned() {
        let (clock, sched) = scheduler();
        let a = sched.schedule(vec![0.0; 24_000], 24_000).unwrap();
        assert_eq!(sched.outstanding(), vec![a.id]);
        clock.set(1.5);
        assert!(sched.outstanding().is_empty());
    }

    #[test]
    fn test_muted_chunks_are_not_scheduled() {
        let (_clock, sched) = scheduler();
        sched.set_muted(true);
        let data = BASE64_STANDARD.encode([0u8; 480]);
        assert!(sched.schedule_chunk("audio/pcm;rate=24000", &data).unwrap().is_none());
        assert!(sched.schedule_chunk("audio/pcm", "%%%").is_err());
        assert_eq!(sched.next_free(), 0.0);

        sched.set_muted(false);
        let unit = sched
            .schedule_chunk("audio/pcm;rate=24000", &data)
            .unwrap()
            .unwrap();
        assert_eq!(unit.samples.len(), 240);
        assert!((unit.duration - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_concurrent_scheduling_stays_sequential() {
        let clock = Arc::new(ManualClock::new());
        let sched = Arc::new(PlaybackScheduler::new(clock));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sched = sched.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| sched.schedule(vec![0.0; 240], 24_000).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut units: Vec<ScheduledUnit> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        units.sort_by(|a, b| a.start_at.partial_cmp(&b.start_at).unwrap());
        for pair in units.windows(2) {
            assert!(pair[1].start_at >= pair[0].end_at() - 1e-9);
        }
    }
}
