//! Compiled schedule representations.
//!
//! Two targets exist:
//! - [`UniformRampSchedule`]: single delay, ramp and hold. Natively supported by
//!   the engine's plain thread group and tolerant of runtime expressions.
//! - [`BatchSchedule`]: a set of independently timed trapezoidal [`Batch`]es whose
//!   pointwise sum reproduces an arbitrary profile. Literal values only.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RampError, RampResult};
use crate::expr::sum_durations;
use crate::param::{duration_to_seconds, Param};

/// What the steady part of a uniform schedule is bounded by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hold {
    /// Keep the target level for a duration after the ramp-up.
    Duration(Param<Duration>),
    /// Keep the target level until each thread ran this many iterations.
    Iterations(Param<u32>),
}

/// Single delay + single ramp + single hold representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformRampSchedule {
    /// Target concurrency.
    pub concurrency: Param<u32>,
    /// Time to go from zero to `concurrency`.
    pub ramp_up: Param<Duration>,
    /// Steady part after the ramp-up.
    pub hold: Hold,
    /// Time before the first thread starts.
    pub initial_delay: Option<Param<Duration>>,
}

impl UniformRampSchedule {
    /// Duration measured from load start, inclusive of the ramp-up, which is
    /// how the engine's plain thread group expects it.
    ///
    /// Returns `None` when the hold is bounded by iterations. Expression
    /// operands are combined into a deferred runtime expression.
    #[must_use]
    pub fn scheduled_duration(&self) -> Option<Param<Duration>> {
        match &self.hold {
            Hold::Iterations(_) => None,
            Hold::Duration(hold) if self.ramp_up.is_zero() => Some(hold.clone()),
            Hold::Duration(hold) if hold.is_zero() => Some(self.ramp_up.clone()),
            Hold::Duration(hold) => Some(sum_durations(hold, &self.ramp_up)),
        }
    }

    /// `true` when every value is a literal.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        let hold_literal = match &self.hold {
            Hold::Duration(d) => d.is_literal(),
            Hold::Iterations(i) => i.is_literal(),
        };
        self.concurrency.is_literal()
            && self.ramp_up.is_literal()
            && hold_literal
            && self.initial_delay.as_ref().map_or(true, Param::is_literal)
    }
}

/// One trapezoidal contribution of a batch schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Batch {
    /// Threads this batch adds at its plateau.
    pub concurrency: u32,
    /// Time before the batch starts ramping up.
    pub delay: Duration,
    /// Time to go from zero to `concurrency`.
    pub ramp_up: Duration,
    /// Time spent at `concurrency`.
    pub hold: Duration,
    /// Time to go back to zero.
    pub ramp_down: Duration,
}

impl Batch {
    /// Creates a batch.
    #[must_use]
    pub const fn new(
        concurrency: u32,
        delay: Duration,
        ramp_up: Duration,
        hold: Duration,
        ramp_down: Duration,
    ) -> Self {
        Self {
            concurrency,
            delay,
            ramp_up,
            hold,
            ramp_down,
        }
    }

    /// Instant at which the batch reaches its plateau.
    #[must_use]
    pub fn ramp_up_end(&self) -> Duration {
        self.delay + self.ramp_up
    }

    /// Instant at which the batch starts ramping down.
    #[must_use]
    pub fn hold_end(&self) -> Duration {
        self.ramp_up_end() + self.hold
    }

    /// Instant at which the batch has no threads left.
    #[must_use]
    pub fn end(&self) -> Duration {
        self.hold_end() + self.ramp_down
    }

    /// Threads contributed at `at`.
    ///
    /// Steps are evaluated from the left: a zero-length ramp-up counts as not
    /// started at its own instant, a zero-length ramp-down counts as still holding.
    #[must_use]
    pub fn level_at(&self, at: Duration) -> f64 {
        let concurrency = f64::from(self.concurrency);
        if at <= self.delay {
            0.0
        } else if at < self.ramp_up_end() {
            concurrency * (at - self.delay).as_secs_f64() / self.ramp_up.as_secs_f64()
        } else if at <= self.hold_end() {
            concurrency
        } else if at < self.end() {
            concurrency
                - concurrency * (at - self.hold_end()).as_secs_f64()
                    / self.ramp_down.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Renders the batch as an engine table row, durations in whole seconds.
    #[must_use]
    pub fn to_row(&self) -> ScheduleRow {
        ScheduleRow {
            cells: [
                self.concurrency.to_string(),
                duration_to_seconds(self.delay).to_string(),
                duration_to_seconds(self.ramp_up).to_string(),
                duration_to_seconds(self.hold).to_string(),
                duration_to_seconds(self.ramp_down).to_string(),
            ],
        }
    }

    /// Parses an engine table row.
    ///
    /// # Errors
    ///
    /// Returns `RampError::InvalidRow` when a cell is not a non-negative
    /// integer or the concurrency is zero.
    pub fn from_row(row: &ScheduleRow) -> RampResult<Self> {
        let [concurrency, delay, ramp_up, hold, ramp_down] = &row.cells;
        let concurrency = u32::try_from(parse_cell("concurrency", concurrency)?)
            .map_err(|_| RampError::invalid_row(format!("concurrency `{concurrency}` is out of range")))?;
        if concurrency == 0 {
            return Err(RampError::invalid_row("concurrency must be >= 1, got 0"));
        }
        Ok(Self {
            concurrency,
            delay: Duration::from_secs(parse_cell("delay", delay)?),
            ramp_up: Duration::from_secs(parse_cell("ramp up", ramp_up)?),
            hold: Duration::from_secs(parse_cell("hold", hold)?),
            ramp_down: Duration::from_secs(parse_cell("ramp down", ramp_down)?),
        })
    }
}

fn parse_cell(column: &str, cell: &str) -> RampResult<u64> {
    let value: i64 = cell
        .trim()
        .parse()
        .map_err(|_| RampError::invalid_row(format!("{column} `{cell}` is not a number")))?;
    u64::try_from(value)
        .map_err(|_| RampError::invalid_row(format!("{column} must be >= 0, got {value}")))
}

/// Persisted table row: `[concurrency, delay, ramp up, hold, ramp down]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub cells: [String; 5],
}

impl ScheduleRow {
    /// Builds a row from its textual cells.
    #[must_use]
    pub fn new(
        concurrency: impl Into<String>,
        delay: impl Into<String>,
        ramp_up: impl Into<String>,
        hold: impl Into<String>,
        ramp_down: impl Into<String>,
    ) -> Self {
        Self {
            cells: [
                concurrency.into(),
                delay.into(),
                ramp_up.into(),
                hold.into(),
                ramp_down.into(),
            ],
        }
    }
}

/// Set of batches whose pointwise sum reproduces a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchSchedule {
    batches: Vec<Batch>,
}

impl BatchSchedule {
    /// Wraps a list of batches, keeping their order.
    #[must_use]
    pub fn new(batches: Vec<Batch>) -> Self {
        Self { batches }
    }

    #[must_use]
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }

    #[must_use]
    pub fn into_batches(self) -> Vec<Batch> {
        self.batches
    }

    /// Total threads active at `at`, summing every batch's trapezoid.
    #[must_use]
    pub fn level_at(&self, at: Duration) -> f64 {
        self.batches.iter().map(|b| b.level_at(at)).sum()
    }

    /// Instant at which the last batch finishes.
    #[must_use]
    pub fn end(&self) -> Duration {
        self.batches
            .iter()
            .map(Batch::end)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    #[must_use]
    pub fn to_rows(&self) -> Vec<ScheduleRow> {
        self.batches.iter().map(Batch::to_row).collect()
    }

    /// Reads back a persisted schedule table.
    ///
    /// # Errors
    ///
    /// Returns `RampError::InvalidRow` for the first malformed row.
    pub fn from_rows(rows: &[ScheduleRow]) -> RampResult<Self> {
        rows.iter()
            .map(Batch::from_row)
            .collect::<RampResult<Vec<_>>>()
            .map(Self::new)
    }
}

impl From<Vec<Batch>> for BatchSchedule {
    fn from(batches: Vec<Batch>) -> Self {
        Self::new(batches)
    }
}

impl<'a> IntoIterator for &'a BatchSchedule {
    type Item = &'a Batch;
    type IntoIter = std::slice::Iter<'a, Batch>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter()
    }
}

/// Output of profile compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompiledSchedule {
    Uniform(UniformRampSchedule),
    Batches(BatchSchedule),
}

impl CompiledSchedule {
    /// Label of the compilation path that produced the schedule.
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Self::Uniform(_) => "uniform",
            Self::Batches(_) => "batches",
        }
    }

    #[must_use]
    pub fn as_uniform(&self) -> Option<&UniformRampSchedule> {
        match self {
            Self::Uniform(schedule) => Some(schedule),
            Self::Batches(_) => None,
        }
    }

    #[must_use]
    pub fn as_batches(&self) -> Option<&BatchSchedule> {
        match self {
            Self::Uniform(_) => None,
            Self::Batches(schedule) => Some(schedule),
        }
    }

    /// Serializes the schedule for storage next to the test plan.
    ///
    /// # Errors
    ///
    /// Returns `RampError::Serialization` if encoding fails.
    pub fn to_json(&self) -> RampResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reads back a schedule written by [`CompiledSchedule::to_json`].
    ///
    /// # Errors
    ///
    /// - `RampError::Serialization` for malformed JSON.
    /// - `RampError::InvalidSchedule` when a batch has no threads.
    pub fn from_json(json: &str) -> RampResult<Self> {
        let schedule: Self = serde_json::from_str(json)?;
        if let Self::Batches(batches) = &schedule {
            if let Some(index) = batches.iter().position(|batch| batch.concurrency == 0) {
                return Err(RampError::invalid_schedule(format!(
                    "batch {index} has no threads"
                )));
            }
        }
        Ok(schedule)
    }
}
