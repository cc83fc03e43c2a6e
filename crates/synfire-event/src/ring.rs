//! Per-channel delay accumulator
//!
//! Incoming events deposit weighted contributions tagged with a future
//! arrival step; the owning entity drains the slot for the current step
//! exactly once per tick. The buffer guarantees that no contribution is lost
//! and none is consumed twice: [`RingBuffer::take`] reads and clears
//! atomically, and a second take within the same tick yields zero.

use crate::error::{ProtocolError, Result};

/// Fixed-horizon accumulator of weighted contributions per future tick.
///
/// The horizon bounds the longest delay the owning entity will ever receive;
/// it is fixed at setup time. A write beyond the horizon indicates a
/// misconfigured delay, not a data race, and is rejected as such.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<f64>,
    head: usize,
}

impl RingBuffer {
    /// Create an accumulator covering `horizon` future ticks (at least 1)
    pub fn new(horizon: usize) -> Self {
        Self {
            slots: vec![0.0; horizon.max(1)],
            head: 0,
        }
    }

    /// Number of future ticks the accumulator can hold
    pub fn horizon(&self) -> usize {
        self.slots.len()
    }

    /// Accumulate `weight` into the slot `rel_step` ticks ahead of the
    /// current one (0 = due at the next take)
    pub fn add(&mut self, rel_step: usize, weight: f64) -> Result<()> {
        if rel_step >= self.slots.len() {
            return Err(ProtocolError::delay_horizon(
                rel_step as i64,
                self.slots.len(),
            ));
        }
        let index = (self.head + rel_step) % self.slots.len();
        self.slots[index] += weight;
        Ok(())
    }

    /// Drain the current slot: returns its accumulated total and resets it
    /// to zero, so repeated takes within one tick yield zero
    pub fn take(&mut self) -> f64 {
        let value = self.slots[self.head];
        self.slots[self.head] = 0.0;
        value
    }

    /// Rotate to the next tick's slot; call once at the end of every tick
    pub fn advance(&mut self) {
        self.head = (self.head + 1) % self.slots.len();
    }

    /// Reset all slots to zero
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = 0.0);
        self.head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_accumulates_per_slot() {
        let mut buffer = RingBuffer::new(4);
        buffer.add(0, 1.0).unwrap();
        buffer.add(0, 2.5).unwrap();
        buffer.add(2, 4.0).unwrap();

        assert_eq!(buffer.take(), 3.5);
        buffer.advance();
        assert_eq!(buffer.take(), 0.0);
        buffer.advance();
        assert_eq!(buffer.take(), 4.0);
    }

    #[test]
    fn test_take_is_idempotent_within_tick() {
        let mut buffer = RingBuffer::new(2);
        buffer.add(0, 7.0).unwrap();
        assert_eq!(buffer.take(), 7.0);
        assert_eq!(buffer.take(), 0.0);
    }

    #[test]
    fn test_horizon_violation() {
        let mut buffer = RingBuffer::new(3);
        let result = buffer.add(3, 1.0);
        assert!(matches!(result, Err(ProtocolError::DelayHorizon { .. })));
    }

    #[test]
    fn test_wraparound_reuses_slots() {
        let mut buffer = RingBuffer::new(2);
        for round in 0..5 {
            buffer.add(1, round as f64).unwrap();
            buffer.take();
            buffer.advance();
            assert_eq!(buffer.take(), round as f64);
            // slot cleared by take, safe to reuse after advance
            buffer.advance();
        }
    }

    #[test]
    fn test_clear() {
        let mut buffer = RingBuffer::new(3);
        buffer.add(1, 2.0).unwrap();
        buffer.clear();
        for _ in 0..3 {
            assert_eq!(buffer.take(), 0.0);
            buffer.advance();
        }
    }

    proptest! {
        /// Every written contribution is drained exactly once, regardless of
        /// how writes interleave with ticks.
        #[test]
        fn prop_no_loss_no_double_count(
            writes in prop::collection::vec((0usize..8, -10.0f64..10.0), 0..64)
        ) {
            let horizon = 8;
            let mut buffer = RingBuffer::new(horizon);
            let mut expected = vec![0.0f64; 64 + horizon];
            let mut drained = 0.0f64;
            let mut written = 0.0f64;

            for (tick, &(rel, weight)) in writes.iter().enumerate() {
                buffer.add(rel, weight).unwrap();
                expected[tick + rel] += weight;
                written += weight;

                let got = buffer.take();
                prop_assert!((got - expected[tick]).abs() < 1e-9);
                drained += got;
                buffer.advance();
            }

            // drain the tail of the horizon
            for tick in writes.len()..writes.len() + horizon {
                let got = buffer.take();
                prop_assert!((got - expected[tick]).abs() < 1e-9);
                drained += got;
                buffer.advance();
            }

            prop_assert!((drained - written).abs() < 1e-9);
        }
    }
}
