use std::time::Duration;

use loadramp_core::{fits_uniform, Hold, Param, RampError, RampResult, Stage, UniformRampSchedule};
use tracing::debug;

use crate::planner::SchedulePlanner;

/// Maps profiles of shape `[]`, `[ramp]`, `[delay, ramp]`, `[ramp, hold]` or
/// `[delay, ramp, hold]` onto a single delay + ramp + hold schedule.
///
/// Works with expression values: nothing is evaluated, values are only moved
/// to the right slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSynthesizer;

impl UniformSynthesizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Builds the uniform schedule for `stages`.
    ///
    /// An empty profile yields one thread running one iteration. Only the
    /// first three stages are read: callers check [`fits_uniform`] first, or
    /// go through [`SchedulePlanner::plan`], which does.
    #[must_use]
    pub fn synthesize(&self, stages: &[Stage]) -> UniformRampSchedule {
        let mut concurrency = Param::Literal(1);
        let mut iterations = Some(Param::Literal(1));
        let mut ramp_up = None;
        let mut duration = None;
        let mut initial_delay = None;

        if let Some(first) = stages.first() {
            let delayed = first.concurrency.is_zero();
            if delayed {
                initial_delay = first.duration.clone();
            } else {
                ramp_up = first.duration.clone();
                concurrency = first.concurrency.clone();
            }
            iterations = first.iterations.clone();

            if let Some(second) = stages.get(1) {
                concurrency = second.concurrency.clone();
                iterations = second.iterations.clone();
                if delayed {
                    ramp_up = second.duration.clone();
                    if let Some(third) = stages.get(2) {
                        duration = third.duration.clone();
                        iterations = third.iterations.clone();
                    }
                } else {
                    duration = second.duration.clone();
                }
            }
        }

        let hold = match (duration, iterations) {
            (Some(duration), _) => Hold::Duration(duration),
            (None, Some(iterations)) => Hold::Iterations(iterations),
            (None, None) => Hold::Duration(Param::Literal(Duration::ZERO)),
        };

        let schedule = UniformRampSchedule {
            concurrency,
            ramp_up: ramp_up.unwrap_or(Param::Literal(Duration::ZERO)),
            hold,
            initial_delay,
        };
        debug!(
            concurrency = %schedule.concurrency,
            ramp_up = %schedule.ramp_up,
            "synthesized uniform schedule"
        );
        schedule
    }
}

impl SchedulePlanner for UniformSynthesizer {
    type Output = UniformRampSchedule;

    /// [`UniformSynthesizer::synthesize`], rejecting profiles outside the
    /// uniform shape with `RampError::UnsupportedProfile`.
    fn plan(&self, stages: &[Stage]) -> RampResult<UniformRampSchedule> {
        if !fits_uniform(stages) {
            return Err(RampError::unsupported(format!(
                "{} stages do not fit a single delay, ramp and hold",
                stages.len()
            )));
        }
        Ok(self.synthesize(stages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadramp_core::ProfileBuilder;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn literal(s: u64) -> Param<Duration> {
        Param::Literal(secs(s))
    }

    #[test]
    fn test_empty_profile_runs_once() {
        let schedule = UniformSynthesizer::new().synthesize(&[]);
        assert_eq!(schedule.concurrency, Param::Literal(1));
        assert_eq!(schedule.hold, Hold::Iterations(Param::Literal(1)));
        assert_eq!(schedule.ramp_up, literal(0));
        assert_eq!(schedule.initial_delay, None);
        assert_eq!(schedule.scheduled_duration(), None);
    }

    #[test]
    fn test_single_ramp() {
        let schedule = UniformSynthesizer::new().synthesize(&[Stage::ramp(3, secs(10))]);
        assert_eq!(schedule.concurrency, Param::Literal(3));
        assert_eq!(schedule.ramp_up, literal(10));
        assert_eq!(schedule.hold, Hold::Duration(literal(0)));
        assert_eq!(schedule.initial_delay, None);
        assert_eq!(schedule.scheduled_duration(), Some(literal(10)));
    }

    #[test]
    fn test_hold_and_ramp() {
        let mut builder = ProfileBuilder::new();
        builder.hold_for(secs(10)).unwrap().ramp_to(5, secs(15)).unwrap();
        let schedule = UniformSynthesizer::new().synthesize(builder.stages());
        assert_eq!(schedule.initial_delay, Some(literal(10)));
        assert_eq!(schedule.ramp_up, literal(15));
        assert_eq!(schedule.scheduled_duration(), Some(literal(15)));
    }

    #[test]
    fn test_hold_ramp_hold() {
        let mut builder = ProfileBuilder::new();
        builder
            .hold_for(secs(10))
            .unwrap()
            .ramp_to_and_hold(5, secs(15), secs(20))
            .unwrap();
        let schedule = UniformSynthesizer::new().synthesize(builder.stages());
        assert_eq!(schedule.concurrency, Param::Literal(5));
        assert_eq!(schedule.initial_delay, Some(literal(10)));
        assert_eq!(schedule.hold, Hold::Duration(literal(20)));
        assert_eq!(schedule.scheduled_duration(), Some(literal(35)));
    }

    #[test]
    fn test_ramp_hold() {
        let mut builder = ProfileBuilder::new();
        builder.ramp_to_and_hold(5, secs(10), secs(15)).unwrap();
        let schedule = UniformSynthesizer::new().synthesize(builder.stages());
        assert_eq!(schedule.initial_delay, None);
        assert_eq!(schedule.scheduled_duration(), Some(literal(25)));
    }

    #[test]
    fn test_ramp_and_iterations() {
        let mut builder = ProfileBuilder::new();
        builder
            .hold_for(secs(5))
            .unwrap()
            .ramp_to(4, secs(10))
            .unwrap()
            .hold_iterating(20)
            .unwrap();
        let schedule = UniformSynthesizer::new().synthesize(builder.stages());
        assert_eq!(schedule.concurrency, Param::Literal(4));
        assert_eq!(schedule.hold, Hold::Iterations(Param::Literal(20)));
        assert_eq!(schedule.ramp_up, literal(10));
        assert_eq!(schedule.scheduled_duration(), None);
    }

    #[test]
    fn test_thread_shortcut() {
        let builder = ProfileBuilder::threads_for(7, secs(30)).unwrap();
        let schedule = UniformSynthesizer::new().synthesize(builder.stages());
        assert_eq!(schedule.concurrency, Param::Literal(7));
        assert_eq!(schedule.ramp_up, literal(0));
        assert_eq!(schedule.scheduled_duration(), Some(literal(30)));
    }

    #[test]
    fn test_expressions_moved_untouched() {
        let mut builder = ProfileBuilder::new();
        builder
            .hold_for_expr("${DELAY}")
            .unwrap()
            .ramp_to_expr("${THREADS}", "${RAMP}")
            .unwrap();
        let schedule = UniformSynthesizer::new().synthesize(builder.stages());
        let ramp = Param::Expression("${RAMP}".to_string());
        assert_eq!(schedule.concurrency, Param::Expression("${THREADS}".to_string()));
        assert_eq!(
            schedule.initial_delay,
            Some(Param::Expression("${DELAY}".to_string()))
        );
        assert_eq!(schedule.ramp_up, ramp);
        assert_eq!(schedule.scheduled_duration(), Some(ramp));
    }

    #[test]
    fn test_plan_rejects_multi_ramp() {
        let stages = [
            Stage::ramp(3, secs(10)),
            Stage::ramp(5, secs(10)),
        ];
        assert!(matches!(
            UniformSynthesizer::new().plan(&stages),
            Err(RampError::UnsupportedProfile { .. })
        ));
    }

    #[test]
    fn test_plan_matches_synthesize_on_fitting_profiles() {
        let synthesizer = UniformSynthesizer::new();
        let stages = [Stage::ramp(0, secs(5)), Stage::ramp(4, secs(10))];
        assert_eq!(synthesizer.plan(&stages).unwrap(), synthesizer.synthesize(&stages));
    }
}
