use std::time::Instant;

use loadramp_core::metrics::{BATCHES_PER_SCHEDULE, COMPILATIONS, COMPILE_DURATION, COMPILE_ERRORS};
use loadramp_core::{
    fits_uniform, CompiledSchedule, CompilerConfig, ProfileBuilder, RampError, RampResult, Stage,
};
use tracing::{info, warn};

use crate::batch::BatchDecomposer;
use crate::planner::SchedulePlanner;
use crate::uniform::UniformSynthesizer;

/// Chooses between the uniform and the batch representation of a profile.
///
/// Profiles with a single delay, ramp and hold always compile to a uniform
/// schedule, even when every value is a literal. Anything else needs literal
/// values and compiles to batches.
#[derive(Debug, Clone, Default)]
pub struct ScheduleCompiler {
    config: CompilerConfig,
    uniform: UniformSynthesizer,
    batches: BatchDecomposer,
}

impl ScheduleCompiler {
    #[must_use]
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            uniform: UniformSynthesizer::new(),
            batches: BatchDecomposer::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles a stage sequence.
    ///
    /// # Errors
    ///
    /// - `RampError::UnsupportedProfile` when expressions appear in a profile
    ///   outside the uniform shape.
    /// - Any error raised by [`BatchDecomposer::decompose`].
    pub fn compile(&self, stages: &[Stage]) -> RampResult<CompiledSchedule> {
        let start = Instant::now();
        let result = self.dispatch(stages);

        match &result {
            Ok(schedule) => {
                info!(
                    path = schedule.path(),
                    stages = stages.len(),
                    "compiled load profile"
                );
                if self.config.record_metrics {
                    COMPILATIONS.with_label_values(&[schedule.path()]).inc();
                    COMPILE_DURATION
                        .with_label_values(&[schedule.path()])
                        .observe(start.elapsed().as_secs_f64());
                    if let CompiledSchedule::Batches(batches) = schedule {
                        BATCHES_PER_SCHEDULE.observe(batches.len() as f64);
                    }
                }
            }
            Err(error) => {
                warn!(stages = stages.len(), error = %error, "failed to compile load profile");
                if self.config.record_metrics {
                    COMPILE_ERRORS.with_label_values(&[error.kind()]).inc();
                }
            }
        }

        result
    }

    /// Compiles the stages collected by a builder.
    ///
    /// # Errors
    ///
    /// Same as [`ScheduleCompiler::compile`].
    pub fn compile_profile(&self, profile: &ProfileBuilder) -> RampResult<CompiledSchedule> {
        self.compile(profile.stages())
    }

    fn dispatch(&self, stages: &[Stage]) -> RampResult<CompiledSchedule> {
        if fits_uniform(stages) {
            return Ok(CompiledSchedule::Uniform(self.uniform.synthesize(stages)));
        }
        if let Some(index) = stages.iter().position(|stage| !stage.is_literal()) {
            return Err(RampError::unsupported(format!(
                "stage {index} uses an engine expression, which is only supported \
                 for a single delay, ramp and hold"
            )));
        }
        self.batches.plan(stages).map(CompiledSchedule::Batches)
    }
}

impl SchedulePlanner for ScheduleCompiler {
    type Output = CompiledSchedule;

    fn plan(&self, stages: &[Stage]) -> RampResult<CompiledSchedule> {
        self.compile(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadramp_core::{Hold, Param};
    use std::time::Duration;

    fn init_tracing() {
        use std::sync::Once;
        static INIT: Once = Once::new();

        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_env_filter("loadramp_compiler=debug")
                .with_test_writer()
                .try_init()
                .ok();
        });
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_single_ramp_compiles_uniform() {
        init_tracing();
        let compiled = ScheduleCompiler::default()
            .compile(&[Stage::ramp(3, secs(10))])
            .unwrap();
        let uniform = compiled.as_uniform().unwrap();
        assert_eq!(uniform.concurrency, Param::Literal(3));
        assert_eq!(uniform.ramp_up, Param::Literal(secs(10)));
        assert_eq!(uniform.hold, Hold::Duration(Param::Literal(Duration::ZERO)));
        assert_eq!(uniform.scheduled_duration(), Some(Param::Literal(secs(10))));
    }

    #[test]
    fn test_rise_and_fall_compiles_batches() {
        init_tracing();
        let compiled = ScheduleCompiler::default()
            .compile(&[Stage::ramp(3, secs(10)), Stage::ramp(0, secs(10))])
            .unwrap();
        assert_eq!(compiled.path(), "batches");
        let batches = compiled.as_batches().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches.batches()[0],
            loadramp_core::Batch::new(3, Duration::ZERO, secs(10), Duration::ZERO, secs(10))
        );
    }

    #[test]
    fn test_expression_outside_uniform_shape_rejected() {
        init_tracing();
        let stages = [
            Stage::ramp(3, secs(10)),
            Stage::new(
                Param::Literal(5),
                Some(Param::Expression("${RAMP}".to_string())),
                None,
            ),
        ];
        let err = ScheduleCompiler::default().compile(&stages).unwrap_err();
        assert!(matches!(err, RampError::UnsupportedProfile { .. }));
        assert!(err.to_string().contains("stage 1"));
    }

    #[test]
    fn test_expression_uniform_profile_compiles() {
        init_tracing();
        let mut builder = ProfileBuilder::new();
        builder
            .ramp_to_and_hold_expr("${THREADS}", "${RAMP}", "${HOLD}")
            .unwrap();
        let compiled = ScheduleCompiler::default().compile_profile(&builder).unwrap();
        assert_eq!(compiled.path(), "uniform");
        assert!(!compiled.as_uniform().unwrap().is_literal());
    }

    #[test]
    fn test_metrics_can_be_disabled() {
        let compiler = ScheduleCompiler::new(CompilerConfig {
            record_metrics: false,
        });
        assert!(!compiler.config().record_metrics);
        assert!(compiler.compile(&[Stage::ramp(1, secs(1))]).is_ok());
    }
}
