use loadramp_core::metrics::{DECOMPILATIONS, TIMELINE_BREAKPOINTS};
use loadramp_core::{
    BatchSchedule, CompiledSchedule, DecompilerConfig, Hold, Param, ProfileOp, RampResult,
    UniformRampSchedule,
};
use tracing::{debug, info, warn};

use crate::emitter::emit_ops;
use crate::timeline::Timeline;

/// Rebuilds profile operations from compiled schedules.
#[derive(Debug, Clone, Default)]
pub struct ScheduleDecompiler {
    config: DecompilerConfig,
}

impl ScheduleDecompiler {
    #[must_use]
    pub fn new(config: DecompilerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &DecompilerConfig {
        &self.config
    }

    /// Summed and compacted timeline of a batch schedule.
    ///
    /// # Errors
    ///
    /// Returns `RampError::InvalidSchedule` when the summed concurrency
    /// overflows `u32`.
    pub fn timeline(&self, schedule: &BatchSchedule) -> RampResult<Timeline> {
        Timeline::from_schedule(schedule, self.config.slope_tolerance)
    }

    /// Operations reproducing the concurrency of a batch schedule.
    ///
    /// # Errors
    ///
    /// Same as [`ScheduleDecompiler::timeline`].
    pub fn decompile(&self, schedule: &BatchSchedule) -> RampResult<Vec<ProfileOp>> {
        let timeline = self.timeline(schedule).map_err(|error| {
            warn!(batches = schedule.len(), error = %error, "failed to decompile batch schedule");
            error
        })?;
        let ops = emit_ops(timeline.breakpoints());

        info!(
            batches = schedule.len(),
            breakpoints = timeline.len(),
            ops = ops.len(),
            "decompiled batch schedule"
        );
        if self.config.record_metrics {
            DECOMPILATIONS.inc();
            TIMELINE_BREAKPOINTS.observe(timeline.len() as f64);
        }
        Ok(ops)
    }

    /// Operations reproducing a uniform schedule.
    ///
    /// A literal schedule starting all threads at once maps to a thread
    /// shortcut. Anything else maps to an optional `HoldFor` for the delay
    /// followed by the ramp and its hold.
    #[must_use]
    pub fn decompile_uniform(&self, schedule: &UniformRampSchedule) -> Vec<ProfileOp> {
        if let Some(shortcut) = thread_shortcut(schedule) {
            debug!("decompiled uniform schedule into a thread shortcut");
            return vec![shortcut];
        }

        let mut ops = Vec::with_capacity(3);
        if let Some(delay) = &schedule.initial_delay {
            ops.push(ProfileOp::HoldFor {
                duration: delay.clone(),
            });
        }
        match &schedule.hold {
            Hold::Duration(hold) if hold.is_zero() => ops.push(ProfileOp::RampTo {
                concurrency: schedule.concurrency.clone(),
                duration: schedule.ramp_up.clone(),
            }),
            Hold::Duration(hold) => ops.push(ProfileOp::RampToAndHold {
                concurrency: schedule.concurrency.clone(),
                ramp: schedule.ramp_up.clone(),
                hold: hold.clone(),
            }),
            Hold::Iterations(iterations) => {
                ops.push(ProfileOp::RampTo {
                    concurrency: schedule.concurrency.clone(),
                    duration: schedule.ramp_up.clone(),
                });
                ops.push(ProfileOp::HoldIterating {
                    iterations: iterations.clone(),
                });
            }
        }
        debug!(ops = ops.len(), "decompiled uniform schedule");
        ops
    }

    /// Dispatches on the schedule representation.
    ///
    /// # Errors
    ///
    /// Same as [`ScheduleDecompiler::decompile`]. Uniform schedules never fail.
    pub fn decompile_compiled(&self, schedule: &CompiledSchedule) -> RampResult<Vec<ProfileOp>> {
        match schedule {
            CompiledSchedule::Uniform(uniform) => Ok(self.decompile_uniform(uniform)),
            CompiledSchedule::Batches(batches) => self.decompile(batches),
        }
    }
}

fn thread_shortcut(schedule: &UniformRampSchedule) -> Option<ProfileOp> {
    let no_delay = schedule
        .initial_delay
        .as_ref()
        .map_or(true, |delay| delay.is_zero());
    if !no_delay || !schedule.ramp_up.is_zero() {
        return None;
    }
    let concurrency = *schedule.concurrency.as_literal()?;
    if concurrency == 0 {
        return None;
    }
    match &schedule.hold {
        Hold::Duration(Param::Literal(duration)) if !duration.is_zero() => {
            Some(ProfileOp::ThreadsFor {
                concurrency,
                duration: *duration,
            })
        }
        Hold::Iterations(Param::Literal(iterations)) if *iterations > 0 => {
            Some(ProfileOp::ThreadsIterating {
                concurrency,
                iterations: *iterations,
            })
        }
        _ => None,
    }
}
