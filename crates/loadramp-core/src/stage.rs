//! Profile stages and the uniform-shape predicate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RampResult;
use crate::param::Param;

/// One requested step of a load profile: reach (or keep) `concurrency`
/// during `duration`, or keep it for `iterations` loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Target concurrency level at the end of the stage.
    pub concurrency: Param<u32>,
    /// Time taken to reach or hold the level. `None` for iteration holds.
    pub duration: Option<Param<Duration>>,
    /// Iterations each thread executes. Only meaningful on the terminal stage.
    pub iterations: Option<Param<u32>>,
}

impl Stage {
    /// Creates a stage from already typed values.
    #[must_use]
    pub fn new(
        concurrency: Param<u32>,
        duration: Option<Param<Duration>>,
        iterations: Option<Param<u32>>,
    ) -> Self {
        Self {
            concurrency,
            duration,
            iterations,
        }
    }

    /// Literal stage ramping (or holding) to `concurrency` over `duration`.
    #[must_use]
    pub fn ramp(concurrency: u32, duration: Duration) -> Self {
        Self::new(Param::Literal(concurrency), Some(Param::Literal(duration)), None)
    }

    /// Creates a stage from textual values, parsing plain digit strings into
    /// literals (durations in seconds) and keeping the rest as expressions.
    ///
    /// # Errors
    ///
    /// Returns `RampError::InvalidStage` when a digit string overflows.
    pub fn parse(
        concurrency: &str,
        duration: Option<&str>,
        iterations: Option<&str>,
    ) -> RampResult<Self> {
        Ok(Self {
            concurrency: Param::<u32>::parse_count(concurrency)?,
            duration: duration.map(Param::<Duration>::parse_duration).transpose()?,
            iterations: iterations.map(Param::<u32>::parse_count).transpose()?,
        })
    }

    /// `true` when every present value is a literal.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.concurrency.is_literal()
            && self.duration.as_ref().map_or(true, Param::is_literal)
            && self.iterations.as_ref().map_or(true, Param::is_literal)
    }

    /// `true` when the stage holds for iterations instead of a duration.
    #[must_use]
    pub fn is_iteration_hold(&self) -> bool {
        self.duration.is_none()
    }
}

/// Whether a stage sequence can be expressed as a single delay, ramp and hold.
///
/// Accepted shapes: no stages, one stage, `[delay, ramp]`, `[ramp, hold]` and
/// `[delay, ramp, hold]`, where a delay is a zero-level stage and a hold keeps
/// the level of the ramp before it. Levels are compared structurally so the
/// check also applies to expression values.
#[must_use]
pub fn fits_uniform(stages: &[Stage]) -> bool {
    match stages {
        [] | [_] => true,
        [first, second] => {
            first.concurrency.is_zero() || first.concurrency == second.concurrency
        }
        [first, second, third] => {
            first.concurrency.is_zero() && second.concurrency == third.concurrency
        }
        _ => false,
    }
}
