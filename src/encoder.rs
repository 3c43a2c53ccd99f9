//! Quadrature encoder position tracking for the three instrument axes.
//!
//! The pulse counting itself happens outside this module (hardware counter
//! units on the target, injected values on the host); this module owns the
//! shared counters and turns signed pulse counts into physical positions.
//!
//! Counters are atomics because the dispatch thread, the stream thread and
//! the counting context all touch them concurrently — lock-free reads keep
//! the acquisition paths from ever blocking on a position sample.

use core::sync::atomic::{AtomicI32, Ordering};

/// X, Y, Z.
pub const AXES: usize = 3;

/// Shared three-axis pulse counters with a fixed position scale.
pub struct EncoderBank {
    counts: [AtomicI32; AXES],
    /// Position units per quadrature pulse.
    scale: f32,
}

impl EncoderBank {
    pub fn new(scale: f32) -> Self {
        Self {
            counts: [AtomicI32::new(0), AtomicI32::new(0), AtomicI32::new(0)],
            scale,
        }
    }

    /// Fold pulses from the counting context into an axis. Out-of-range
    /// axes are ignored rather than panicking in a counting path.
    pub fn record_pulses(&self, axis: usize, delta: i32) {
        if let Some(c) = self.counts.get(axis) {
            c.fetch_add(delta, Ordering::Relaxed);
        }
    }

    /// Overwrite an axis count outright (simulation and tests).
    pub fn set_pulses(&self, axis: usize, pulses: i32) {
        if let Some(c) = self.counts.get(axis) {
            c.store(pulses, Ordering::Relaxed);
        }
    }

    /// Current positions, pulses × scale, in axis order.
    pub fn positions(&self) -> [f32; AXES] {
        let mut pos = [0.0f32; AXES];
        for (p, c) in pos.iter_mut().zip(&self.counts) {
            *p = c.load(Ordering::Relaxed) as f32 * self.scale;
        }
        pos
    }

    /// Zero all axes; the streaming session does this so positions are
    /// relative to the stream start.
    pub fn reset(&self) {
        for c in &self.counts {
            c.store(0, Ordering::Relaxed);
        }
    }
}
