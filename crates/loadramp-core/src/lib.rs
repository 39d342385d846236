//! Core types for load profile scheduling: stages, parameters, compiled
//! schedules, configuration and metrics.

pub mod config;
pub mod error;
pub mod expr;
pub mod metrics;
pub mod param;
pub mod profile;
pub mod schedule;
pub mod stage;

pub use config::{CompilerConfig, DecompilerConfig, RampConfig, DEFAULT_SLOPE_TOLERANCE};
pub use error::{RampError, RampResult};
pub use param::{duration_to_seconds, Param};
pub use profile::{ProfileBuilder, ProfileOp};
pub use schedule::{Batch, BatchSchedule, CompiledSchedule, Hold, ScheduleRow, UniformRampSchedule};
pub use stage::{fits_uniform, Stage};
