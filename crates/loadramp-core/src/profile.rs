//! Fluent construction of stage sequences.
//!
//! [`ProfileBuilder`] validates each step as it is added, so a finished
//! builder always holds a sequence the compiler can turn into a schedule.
//! [`ProfileOp`] is the data form of the same steps, which is what the
//! decompiler produces.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RampError, RampResult};
use crate::param::Param;
use crate::stage::{fits_uniform, Stage};

/// One builder step, as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum ProfileOp {
    /// Move linearly to `concurrency` over `duration`.
    RampTo {
        concurrency: Param<u32>,
        duration: Param<Duration>,
    },
    /// Keep the previous level for a duration.
    HoldFor { duration: Param<Duration> },
    /// `RampTo` immediately followed by `HoldFor`.
    RampToAndHold {
        concurrency: Param<u32>,
        ramp: Param<Duration>,
        hold: Param<Duration>,
    },
    /// Keep the previous level until each thread ran `iterations` loops.
    HoldIterating { iterations: Param<u32> },
    /// Start `concurrency` threads at once and keep them for `duration`.
    ThreadsFor { concurrency: u32, duration: Duration },
    /// Start `concurrency` threads at once, each running `iterations` loops.
    ThreadsIterating { concurrency: u32, iterations: u32 },
}

/// Builds a validated list of [`Stage`]s.
///
/// ```
/// use std::time::Duration;
/// use loadramp_core::ProfileBuilder;
///
/// let mut builder = ProfileBuilder::new();
/// builder
///     .hold_for(Duration::from_secs(10))?
///     .ramp_to_and_hold(5, Duration::from_secs(20), Duration::from_secs(60))?
///     .ramp_to(0, Duration::from_secs(10))?;
/// assert_eq!(builder.stages().len(), 4);
/// # Ok::<(), loadramp_core::RampError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBuilder {
    stages: Vec<Stage>,
}

impl ProfileBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile starting `threads` at once and keeping them for `duration`.
    ///
    /// # Errors
    ///
    /// Returns `RampError::InvalidStage` when `threads < 1`.
    pub fn threads_for(threads: i64, duration: Duration) -> RampResult<Self> {
        let threads = positive_threads(threads)?;
        Ok(Self {
            stages: vec![
                Stage::ramp(threads, Duration::ZERO),
                Stage::ramp(threads, duration),
            ],
        })
    }

    /// Profile starting `threads` at once, each running `iterations` loops.
    ///
    /// # Errors
    ///
    /// Returns `RampError::InvalidStage` when `threads < 1` or `iterations < 1`.
    pub fn threads_iterating(threads: i64, iterations: i64) -> RampResult<Self> {
        let threads = positive_threads(threads)?;
        if iterations <= 0 {
            return Err(RampError::invalid_stage(format!(
                "iterations must be >= 1, got {iterations}"
            )));
        }
        let iterations = Param::<u32>::count(iterations, "iterations")?;
        Ok(Self {
            stages: vec![
                Stage::ramp(threads, Duration::ZERO),
                Stage::new(Param::Literal(threads), None, Some(iterations)),
            ],
        })
    }

    /// Replays a sequence of operations on an empty builder.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`ProfileBuilder::apply`].
    pub fn from_ops<'a>(ops: impl IntoIterator<Item = &'a ProfileOp>) -> RampResult<Self> {
        let mut builder = Self::new();
        for op in ops {
            builder.apply(op)?;
        }
        Ok(builder)
    }

    /// Replays a JSON list of operations, as stored after decompiling a schedule.
    ///
    /// # Errors
    ///
    /// `RampError::Serialization` for malformed JSON, then the first error
    /// raised by [`ProfileBuilder::apply`].
    pub fn from_json(json: &str) -> RampResult<Self> {
        let ops: Vec<ProfileOp> = serde_json::from_str(json)?;
        Self::from_ops(&ops)
    }

    /// Applies one operation.
    ///
    /// # Errors
    ///
    /// Same as the matching builder method. The `Threads*` shortcuts are only
    /// valid on an empty builder and return `RampError::InvalidState` otherwise.
    pub fn apply(&mut self, op: &ProfileOp) -> RampResult<&mut Self> {
        match op {
            ProfileOp::RampTo {
                concurrency,
                duration,
            } => self.push_ramp(concurrency.clone(), duration.clone()),
            ProfileOp::HoldFor { duration } => self.push_hold(duration.clone()),
            ProfileOp::RampToAndHold {
                concurrency,
                ramp,
                hold,
            } => {
                self.push_ramp(concurrency.clone(), ramp.clone())?;
                self.push_hold(hold.clone())
            }
            ProfileOp::HoldIterating { iterations } => self.push_iterations(iterations.clone()),
            ProfileOp::ThreadsFor {
                concurrency,
                duration,
            } => {
                self.ensure_empty()?;
                *self = Self::threads_for(i64::from(*concurrency), *duration)?;
                Ok(self)
            }
            ProfileOp::ThreadsIterating {
                concurrency,
                iterations,
            } => {
                self.ensure_empty()?;
                *self = Self::threads_iterating(i64::from(*concurrency), i64::from(*iterations))?;
                Ok(self)
            }
        }
    }

    /// Moves linearly from the previous level to `threads` over `duration`.
    ///
    /// # Errors
    ///
    /// `InvalidStage` for negative counts, `InvalidState` after an iteration
    /// hold, `UnsupportedProfile` when expressions are mixed with a
    /// multi-ramp shape.
    pub fn ramp_to(&mut self, threads: i64, duration: Duration) -> RampResult<&mut Self> {
        let threads = Param::<u32>::count(threads, "thread count")?;
        self.push_ramp(threads, Param::Literal(duration))
    }

    /// [`ProfileBuilder::ramp_to`] with textual values, which may be engine expressions.
    ///
    /// # Errors
    ///
    /// Same as [`ProfileBuilder::ramp_to`].
    pub fn ramp_to_expr(&mut self, threads: &str, duration: &str) -> RampResult<&mut Self> {
        let threads = Param::<u32>::parse_count(threads)?;
        let duration = Param::<Duration>::parse_duration(duration)?;
        self.push_ramp(threads, duration)
    }

    /// Keeps the previous level (zero when first) for `duration`.
    ///
    /// # Errors
    ///
    /// `InvalidState` after an iteration hold.
    pub fn hold_for(&mut self, duration: Duration) -> RampResult<&mut Self> {
        self.push_hold(Param::Literal(duration))
    }

    /// # Errors
    ///
    /// Same as [`ProfileBuilder::hold_for`].
    pub fn hold_for_expr(&mut self, duration: &str) -> RampResult<&mut Self> {
        let duration = Param::<Duration>::parse_duration(duration)?;
        self.push_hold(duration)
    }

    /// Keeps the previous level until each thread ran `iterations` loops.
    ///
    /// Only allowed right after a single non-zero ramp, or after a zero hold
    /// followed by a non-zero ramp.
    ///
    /// # Errors
    ///
    /// `InvalidStage` for negative counts, `InvalidState` when the profile
    /// shape does not allow it.
    pub fn hold_iterating(&mut self, iterations: i64) -> RampResult<&mut Self> {
        let iterations = Param::<u32>::count(iterations, "iterations")?;
        self.push_iterations(iterations)
    }

    /// # Errors
    ///
    /// Same as [`ProfileBuilder::hold_iterating`].
    pub fn hold_iterating_expr(&mut self, iterations: &str) -> RampResult<&mut Self> {
        let iterations = Param::<u32>::parse_count(iterations)?;
        self.push_iterations(iterations)
    }

    /// Shorthand for `ramp_to(threads, ramp)` followed by `hold_for(hold)`.
    ///
    /// # Errors
    ///
    /// Same as the two underlying calls.
    pub fn ramp_to_and_hold(
        &mut self,
        threads: i64,
        ramp: Duration,
        hold: Duration,
    ) -> RampResult<&mut Self> {
        self.ramp_to(threads, ramp)?.hold_for(hold)
    }

    /// # Errors
    ///
    /// Same as [`ProfileBuilder::ramp_to_and_hold`].
    pub fn ramp_to_and_hold_expr(
        &mut self,
        threads: &str,
        ramp: &str,
        hold: &str,
    ) -> RampResult<&mut Self> {
        self.ramp_to_expr(threads, ramp)?.hold_for_expr(hold)
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[must_use]
    pub fn into_stages(self) -> Vec<Stage> {
        self.stages
    }

    fn push_ramp(
        &mut self,
        threads: Param<u32>,
        duration: Param<Duration>,
    ) -> RampResult<&mut Self> {
        if self.holds_iterations() {
            return Err(RampError::invalid_state(
                "ramping after holding for iterations is not supported; \
                 use ramp_to(X, Y) followed by hold_iterating(Z) instead",
            ));
        }
        self.add_stage(Stage::new(threads, Some(duration), None))
    }

    fn push_hold(&mut self, duration: Param<Duration>) -> RampResult<&mut Self> {
        if self.holds_iterations() {
            return Err(RampError::invalid_state(
                "holding for a duration after holding for iterations is not supported",
            ));
        }
        let threads = self.previous_threads();
        self.add_stage(Stage::new(threads, Some(duration), None))
    }

    fn push_iterations(&mut self, iterations: Param<u32>) -> RampResult<&mut Self> {
        let allowed = match self.stages.as_slice() {
            [ramp] => !ramp.concurrency.is_zero(),
            [delay, ramp] => delay.concurrency.is_zero() && !ramp.concurrency.is_zero(),
            _ => false,
        };
        if !allowed {
            return Err(RampError::invalid_state(
                "holding for iterations is only supported after a ramp, or after an initial hold and a ramp",
            ));
        }
        let threads = self.previous_threads();
        self.add_stage(Stage::new(threads, None, Some(iterations)))
    }

    fn add_stage(&mut self, stage: Stage) -> RampResult<&mut Self> {
        self.stages.push(stage);
        if !fits_uniform(&self.stages) && self.stages.iter().any(|s| !s.is_literal()) {
            self.stages.pop();
            debug!(
                stages = self.stages.len(),
                "rejected stage: expressions only fit a single ramp"
            );
            return Err(RampError::unsupported(
                "multiple ramps cannot use engine expressions for thread counts or durations",
            ));
        }
        Ok(self)
    }

    fn ensure_empty(&self) -> RampResult<()> {
        if self.stages.is_empty() {
            Ok(())
        } else {
            Err(RampError::invalid_state(
                "thread shortcuts can only start a profile",
            ))
        }
    }

    fn holds_iterations(&self) -> bool {
        self.stages.last().is_some_and(Stage::is_iteration_hold)
    }

    fn previous_threads(&self) -> Param<u32> {
        self.stages
            .last()
            .map_or(Param::Literal(0), |s| s.concurrency.clone())
    }
}

fn positive_threads(threads: i64) -> RampResult<u32> {
    if threads <= 0 {
        return Err(RampError::invalid_stage(format!(
            "thread count must be >= 1, got {threads}"
        )));
    }
    u32::try_from(threads)
        .map_err(|_| RampError::invalid_stage(format!("thread count {threads} is out of range")))
}
