//! Decomposition of arbitrary literal profiles into trapezoidal batches.
//!
//! The walk keeps a stack of open batches. Rising stages open a new batch on
//! top of the stack; falling stages close batches from the top, splitting the
//! last one when the drop only removes part of it. A closed batch gives its
//! whole lifetime back to its parent as hold time, since the parent keeps its
//! threads running underneath it.
//!
//! Invariant kept after every stage: the counts of the current batch and all
//! stacked batches add up to the stage's target level.

use std::time::Duration;

use loadramp_core::{Batch, BatchSchedule, RampError, RampResult, Stage};
use tracing::{debug, trace};

use crate::planner::SchedulePlanner;

/// Compiles literal stage sequences into a [`BatchSchedule`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchDecomposer;

impl BatchDecomposer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Decomposes `stages` into batches sorted by start delay.
    ///
    /// # Errors
    ///
    /// - `RampError::NonLiteralStage` when a stage holds an expression.
    /// - `RampError::MissingDuration` when a stage holds for iterations.
    /// - `RampError::Internal` if the open-batch stack is exhausted, which
    ///   well-formed input never causes.
    pub fn decompose(&self, stages: &[Stage]) -> RampResult<BatchSchedule> {
        let mut walk = Walk::default();

        for (index, stage) in stages.iter().enumerate() {
            let (target, duration) = literal_stage(index, stage)?;
            walk.apply(target, duration)?;
            debug_assert_eq!(walk.open_threads(), u64::from(target));
        }

        let Walk {
            mut current,
            mut open,
            mut closed,
            ..
        } = walk;
        while !open.is_empty() {
            complete(&mut current, &mut open, &mut closed)?;
        }
        closed.sort_by_key(|batch| batch.delay);

        debug!(
            stages = stages.len(),
            batches = closed.len(),
            "decomposed profile into batches"
        );
        Ok(BatchSchedule::new(closed))
    }
}

impl SchedulePlanner for BatchDecomposer {
    type Output = BatchSchedule;

    fn plan(&self, stages: &[Stage]) -> RampResult<BatchSchedule> {
        self.decompose(stages)
    }
}

fn literal_stage(index: usize, stage: &Stage) -> RampResult<(u32, Duration)> {
    let target = *stage
        .concurrency
        .as_literal()
        .ok_or(RampError::NonLiteralStage { index })?;
    let duration = stage
        .duration
        .as_ref()
        .ok_or(RampError::MissingDuration { index })?;
    let duration = *duration
        .as_literal()
        .ok_or(RampError::NonLiteralStage { index })?;
    Ok((target, duration))
}

/// State of the stage walk. The zero-count batch at the bottom only collects
/// hold time and is never emitted.
#[derive(Debug, Default)]
struct Walk {
    current: Batch,
    open: Vec<Batch>,
    closed: Vec<Batch>,
    threads: u32,
    elapsed: Duration,
}

impl Walk {
    fn apply(&mut self, target: u32, duration: Duration) -> RampResult<()> {
        if target == self.threads {
            self.current.hold += duration;
        } else if target > self.threads {
            let added = Batch::new(
                target - self.threads,
                self.elapsed,
                duration,
                Duration::ZERO,
                Duration::ZERO,
            );
            self.open.push(std::mem::replace(&mut self.current, added));
        } else {
            self.ramp_down(self.threads - target, duration)?;
        }
        trace!(level = target, elapsed_ms = self.elapsed.as_millis() as u64, "applied stage");
        self.threads = target;
        self.elapsed += duration;
        Ok(())
    }

    /// Removes `diff` threads over `duration`, closing batches from the top.
    fn ramp_down(&mut self, mut diff: u32, duration: Duration) -> RampResult<()> {
        let mut remaining = duration;

        while diff > self.current.concurrency {
            let share = interpolate(remaining, self.current.concurrency, diff);
            self.current.ramp_down = share;
            diff -= self.current.concurrency;
            remaining -= share;
            complete(&mut self.current, &mut self.open, &mut self.closed)?;
        }

        if diff < self.current.concurrency {
            // Split: the top `diff` threads of the ramp close, the rest stays open.
            let top_ramp = interpolate(self.current.ramp_up, diff, self.current.concurrency);
            let closing = Batch::new(
                diff,
                self.current.ramp_up_end() - top_ramp,
                top_ramp,
                self.current.hold,
                remaining,
            );
            let kept = Batch::new(
                self.current.concurrency - diff,
                self.current.delay,
                self.current.ramp_up - top_ramp,
                Duration::ZERO,
                Duration::ZERO,
            );
            self.open.push(kept);
            self.current = closing;
        } else {
            self.current.ramp_down = remaining;
        }
        complete(&mut self.current, &mut self.open, &mut self.closed)
    }

    fn open_threads(&self) -> u64 {
        self.open
            .iter()
            .chain(std::iter::once(&self.current))
            .map(|batch| u64::from(batch.concurrency))
            .sum()
    }
}

/// Closes the current batch and makes its parent current again. The parent
/// holds through the whole life of the closed batch.
fn complete(current: &mut Batch, open: &mut Vec<Batch>, closed: &mut Vec<Batch>) -> RampResult<()> {
    let parent = open
        .pop()
        .ok_or_else(|| RampError::internal("no open batch left to return to"))?;
    let finished = std::mem::replace(current, parent);
    current.hold += finished.ramp_up + finished.hold + finished.ramp_down;
    closed.push(finished);
    Ok(())
}

/// `duration * part / total`, rounded down to the nanosecond.
///
/// Cut points stay within a nanosecond of the ramp they split, so the summed
/// timeline compacts them back into a single segment.
fn interpolate(duration: Duration, part: u32, total: u32) -> Duration {
    if total == 0 {
        return Duration::ZERO;
    }
    let nanos = duration.as_nanos() * u128::from(part) / u128::from(total);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
