//! Compiles load profiles into engine schedules.
//!
//! Profiles that fit a single delay, ramp and hold go through
//! [`UniformSynthesizer`]; every other literal profile is decomposed into
//! overlapping trapezoids by [`BatchDecomposer`]. [`ScheduleCompiler`] picks
//! the path.

pub mod batch;
pub mod compiler;
pub mod planner;
pub mod uniform;

pub use batch::BatchDecomposer;
pub use compiler::ScheduleCompiler;
pub use planner::SchedulePlanner;
pub use uniform::UniformSynthesizer;
