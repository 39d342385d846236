use loadramp_core::{RampResult, Stage};

/// Planner turns a stage sequence into a schedule representation.
pub trait SchedulePlanner: Send + Sync {
    type Output;

    fn plan(&self, stages: &[Stage]) -> RampResult<Self::Output>;
}
