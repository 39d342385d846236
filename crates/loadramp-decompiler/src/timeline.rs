//! Piecewise-linear concurrency functions.
//!
//! A [`Timeline`] is a list of breakpoints sorted by time, with an implicit
//! origin at `(0, 0)`. Two consecutive breakpoints at the same instant encode
//! a vertical jump. Every breakpoint goes through [`Timeline::push`], which
//! keeps runs of collinear points down to their endpoints.

use std::time::Duration;

use loadramp_core::{Batch, BatchSchedule, RampError, RampResult, DEFAULT_SLOPE_TOLERANCE};
use serde::{Deserialize, Serialize};

/// Concurrency `level` reached at instant `at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Breakpoint {
    pub at: Duration,
    pub level: u32,
}

impl Breakpoint {
    #[must_use]
    pub const fn new(at: Duration, level: u32) -> Self {
        Self { at, level }
    }

    const ORIGIN: Self = Self::new(Duration::ZERO, 0);

    /// Threads per second from `self` to `next`. Jumps are infinite, signed
    /// by direction.
    fn slope_to(&self, next: &Self) -> f64 {
        let rise = f64::from(next.level) - f64::from(self.level);
        let run = next.at.saturating_sub(self.at);
        if run.is_zero() {
            if rise >= 0.0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            }
        } else {
            rise / run.as_secs_f64()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    points: Vec<Breakpoint>,
    tolerance: f64,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(DEFAULT_SLOPE_TOLERANCE)
    }
}

impl Timeline {
    /// Empty timeline merging segments whose slopes differ by less than `tolerance`.
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        Self {
            points: Vec::new(),
            tolerance,
        }
    }

    /// Trapezoid of a single batch. A batch that ends where it starts never
    /// runs a thread and yields an empty timeline.
    #[must_use]
    pub fn from_batch(batch: &Batch, tolerance: f64) -> Self {
        let mut timeline = Self::new(tolerance);
        if batch.end() == batch.delay {
            return timeline;
        }
        if !batch.delay.is_zero() {
            timeline.push(batch.delay, 0);
        }
        timeline.push(batch.ramp_up_end(), batch.concurrency);
        if !batch.hold.is_zero() {
            timeline.push(batch.hold_end(), batch.concurrency);
        }
        timeline.push(batch.end(), 0);
        timeline
    }

    /// Sum of every batch of a schedule.
    ///
    /// # Errors
    ///
    /// Returns `RampError::InvalidSchedule` when the summed concurrency
    /// exceeds `u32::MAX` at some instant.
    pub fn from_schedule(schedule: &BatchSchedule, tolerance: f64) -> RampResult<Self> {
        schedule
            .iter()
            .map(|batch| Self::from_batch(batch, tolerance))
            .try_fold(Self::new(tolerance), |sum, timeline| sum.plus(&timeline))
    }

    /// Adds a breakpoint after the existing ones.
    ///
    /// The last kept point is dropped while it sits on the line between its
    /// predecessor and the new point, and a point equal to the last one is
    /// ignored. At a single instant only the levels before and after the jump
    /// are kept.
    pub fn push(&mut self, at: Duration, level: u32) {
        let point = Breakpoint::new(at, level);
        loop {
            let last = self.points.last().copied().unwrap_or(Breakpoint::ORIGIN);
            if point == last {
                return;
            }
            let len = self.points.len();
            if len == 0 {
                break;
            }
            let prev = if len >= 2 {
                self.points[len - 2]
            } else {
                Breakpoint::ORIGIN
            };
            if prev == last || !self.collinear(&prev, &last, &point) {
                break;
            }
            self.points.pop();
        }
        self.points.push(point);
    }

    fn collinear(&self, prev: &Breakpoint, last: &Breakpoint, next: &Breakpoint) -> bool {
        if prev.at == last.at && last.at == next.at {
            return true;
        }
        let before = prev.slope_to(last);
        let after = last.slope_to(next);
        if before.is_infinite() || after.is_infinite() {
            return before == after;
        }
        (before - after).abs() < self.tolerance
    }

    /// Pointwise sum with `other`.
    ///
    /// Breakpoints of both sides are merged in time order. At each one the
    /// other side is read off its current segment, rounded to the nearest
    /// thread, and holds its last level once it has no breakpoints left.
    ///
    /// # Errors
    ///
    /// Returns `RampError::InvalidSchedule` when a summed level overflows `u32`.
    pub fn plus(&self, other: &Self) -> RampResult<Self> {
        let mut sum = Self::new(self.tolerance);
        let (mut left, mut right) = (self.points.iter().peekable(), other.points.iter().peekable());
        let (mut left_prev, mut right_prev) = (Breakpoint::ORIGIN, Breakpoint::ORIGIN);

        loop {
            let (next_left, next_right) = (left.peek().copied(), right.peek().copied());
            let at = match (next_left, next_right) {
                (Some(l), Some(r)) => l.at.min(r.at),
                (Some(l), None) => l.at,
                (None, Some(r)) => r.at,
                (None, None) => break,
            };

            let left_level = match next_left {
                Some(l) if l.at == at => {
                    left.next();
                    left_prev = *l;
                    l.level
                }
                _ => level_on_segment(left_prev, next_left.copied(), at),
            };
            let right_level = match next_right {
                Some(r) if r.at == at => {
                    right.next();
                    right_prev = *r;
                    r.level
                }
                _ => level_on_segment(right_prev, next_right.copied(), at),
            };

            let level = left_level.checked_add(right_level).ok_or_else(|| {
                RampError::invalid_schedule(format!(
                    "concurrency at {at:?} exceeds {} threads",
                    u32::MAX
                ))
            })?;
            sum.push(at, level);
        }
        Ok(sum)
    }

    /// Re-applies compaction to every breakpoint. A no-op on timelines built
    /// through [`Timeline::push`].
    #[must_use]
    pub fn compact(&self) -> Self {
        let mut compacted = Self::new(self.tolerance);
        for point in &self.points {
            compacted.push(point.at, point.level);
        }
        compacted
    }

    #[must_use]
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

/// Level at `at` on the segment from `prev` to `next`, rounded half away
/// from zero. Past the last breakpoint the level stays at `prev`.
fn level_on_segment(prev: Breakpoint, next: Option<Breakpoint>, at: Duration) -> u32 {
    let Some(next) = next else {
        return prev.level;
    };
    if at <= prev.at || next.at <= prev.at {
        return prev.level;
    }
    let span = (next.at - prev.at).as_nanos() as i128;
    let offset = (at - prev.at).as_nanos() as i128;
    let scaled = (i128::from(next.level) - i128::from(prev.level)) * offset;
    let delta = (2 * scaled + span * scaled.signum()) / (2 * span);
    u32::try_from(i128::from(prev.level) + delta).unwrap_or(prev.level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn point(s: u64, level: u32) -> Breakpoint {
        Breakpoint::new(secs(s), level)
    }

    #[test]
    fn test_batch_trapezoid() {
        let timeline = Timeline::from_batch(
            &Batch::new(3, secs(5), secs(10), secs(20), secs(5)),
            DEFAULT_SLOPE_TOLERANCE,
        );
        assert_eq!(
            timeline.breakpoints(),
            &[point(5, 0), point(15, 3), point(35, 3), point(40, 0)]
        );
    }

    #[test]
    fn test_batch_without_delay_or_hold() {
        let timeline = Timeline::from_batch(
            &Batch::new(2, Duration::ZERO, secs(10), Duration::ZERO, secs(10)),
            DEFAULT_SLOPE_TOLERANCE,
        );
        assert_eq!(timeline.breakpoints(), &[point(10, 2), point(20, 0)]);
    }

    #[test]
    fn test_push_drops_collinear_points() {
        let mut timeline = Timeline::default();
        timeline.push(secs(10), 1);
        timeline.push(secs(20), 2);
        timeline.push(secs(30), 3);
        timeline.push(secs(40), 3);
        timeline.push(secs(50), 3);
        assert_eq!(timeline.breakpoints(), &[point(30, 3), point(50, 3)]);
    }

    #[test]
    fn test_push_keeps_jumps() {
        let mut timeline = Timeline::default();
        timeline.push(secs(10), 4);
        timeline.push(secs(10), 2);
        timeline.push(secs(10), 0);
        timeline.push(secs(10), 0);
        assert_eq!(timeline.breakpoints(), &[point(10, 4), point(10, 0)]);
    }

    #[test]
    fn test_push_keeps_only_jump_ends() {
        let mut timeline = Timeline::default();
        timeline.push(secs(10), 4);
        timeline.push(secs(10), 1);
        timeline.push(secs(10), 6);
        assert_eq!(timeline.breakpoints(), &[point(10, 4), point(10, 6)]);

        let mut spike = Timeline::default();
        spike.push(secs(10), 4);
        spike.push(secs(10), 9);
        spike.push(secs(10), 4);
        assert_eq!(spike.breakpoints(), &[point(10, 4)]);
    }

    #[test]
    fn test_overlapping_batches_sum_compacts() {
        let a = Batch::new(2, Duration::ZERO, secs(10), secs(10), Duration::ZERO);
        let b = Batch::new(2, secs(10), secs(10), Duration::ZERO, secs(10));
        let schedule = BatchSchedule::new(vec![a, b]);

        let timeline = Timeline::from_schedule(&schedule, DEFAULT_SLOPE_TOLERANCE).unwrap();

        assert_eq!(
            timeline.breakpoints(),
            &[point(20, 4), point(20, 2), point(30, 0)]
        );
    }

    #[test]
    fn test_plus_carries_levels_forward() {
        let mut left = Timeline::default();
        left.push(secs(10), 2);
        left.push(secs(40), 2);
        left.push(secs(40), 0);
        let mut right = Timeline::default();
        right.push(secs(20), 0);
        right.push(secs(20), 3);
        right.push(secs(30), 3);
        right.push(secs(30), 0);

        let sum = left.plus(&right).unwrap();

        assert_eq!(
            sum.breakpoints(),
            &[
                point(10, 2),
                point(20, 2),
                point(20, 5),
                point(30, 5),
                point(30, 2),
                point(40, 2),
                point(40, 0),
            ]
        );
    }

    #[test]
    fn test_plus_reads_other_side_mid_ramp() {
        let mut ramp = Timeline::default();
        ramp.push(secs(14), 6);
        ramp.push(secs(18), 10);
        let mut jump = Timeline::default();
        jump.push(secs(15), 0);
        jump.push(secs(15), 1);
        jump.push(secs(20), 1);
        jump.push(secs(20), 0);

        let sum = ramp.plus(&jump).unwrap();

        assert_eq!(
            sum.breakpoints(),
            &[
                point(14, 6),
                point(15, 7),
                point(15, 8),
                point(18, 11),
                point(20, 11),
                point(20, 10),
            ]
        );
        assert_eq!(jump.plus(&ramp).unwrap(), sum);
    }

    #[test]
    fn test_plus_with_empty_is_identity() {
        let timeline = Timeline::from_batch(
            &Batch::new(3, secs(1), secs(2), secs(3), secs(4)),
            DEFAULT_SLOPE_TOLERANCE,
        );
        assert_eq!(timeline.plus(&Timeline::default()).unwrap(), timeline);
        assert_eq!(Timeline::default().plus(&timeline).unwrap(), timeline);
    }

    #[test]
    fn test_zero_length_batch_contributes_nothing() {
        let spike = Batch::new(5, secs(10), Duration::ZERO, Duration::ZERO, Duration::ZERO);
        assert!(Timeline::from_batch(&spike, DEFAULT_SLOPE_TOLERANCE).is_empty());

        let base = Batch::new(2, Duration::ZERO, secs(10), Duration::ZERO, Duration::ZERO);
        let schedule = BatchSchedule::new(vec![base, spike]);
        assert_eq!(
            Timeline::from_schedule(&schedule, DEFAULT_SLOPE_TOLERANCE).unwrap(),
            Timeline::from_batch(&base, DEFAULT_SLOPE_TOLERANCE)
        );
    }

    #[test]
    fn test_plus_rejects_level_overflow() {
        let mut left = Timeline::default();
        left.push(secs(1), u32::MAX);
        let mut right = Timeline::default();
        right.push(secs(1), 1);

        let err = left.plus(&right).unwrap_err();
        assert!(matches!(err, RampError::InvalidSchedule { .. }));
        assert_eq!(err.kind(), "invalid_schedule");
    }

    #[test]
    fn test_compact_is_idempotent() {
        let mut timeline = Timeline::default();
        for (s, level) in [(5, 1), (10, 2), (10, 6), (15, 6), (20, 3), (25, 0)] {
            timeline.push(secs(s), level);
        }
        assert_eq!(timeline.compact(), timeline);
        assert_eq!(timeline.compact().compact(), timeline);
    }

    #[test]
    fn test_tolerance_controls_merging() {
        let mut strict = Timeline::new(0.0);
        let mut loose = Timeline::new(0.5);
        for timeline in [&mut strict, &mut loose] {
            timeline.push(secs(10), 10);
            timeline.push(secs(20), 21);
        }
        assert_eq!(strict.len(), 2);
        assert_eq!(loose.breakpoints(), &[point(20, 21)]);
    }
}
